//! Model factory registry.
//!
//! The default builders look model references up in a [`ModelRegistry`] and
//! delegate to the registered [`ModelFactory`]. Registries are plain values:
//! each engine owns (or shares through an `Arc`) its own registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{FixtureError, FixtureResult};
use crate::value::{Mapping, ObjectRef, Record, Value};

/// Constructs and persists instances of one model.
///
/// Implement this for each model the fixtures reference.
pub trait ModelFactory: Send + Sync {
	/// Model identifier used in definitions (e.g. `"Toaster"`).
	fn model_id(&self) -> &str;

	/// Builds a new instance from resolved fields.
	fn construct(&self, fields: Mapping) -> FixtureResult<Value>;

	/// Retrieves an existing instance by identifier.
	///
	/// The default implementation does not support fetching.
	fn fetch(&self, _id: &Value) -> FixtureResult<Value> {
		Err(FixtureError::FetchUnsupported(self.model_id().to_string()))
	}

	/// Persists an instance. The default implementation does nothing.
	fn save(&self, _instance: &Value) -> FixtureResult<()> {
		Ok(())
	}

	/// Removes a persisted instance. The default implementation does nothing.
	fn delete(&self, _instance: &Value) -> FixtureResult<()> {
		Ok(())
	}
}

type ConstructFn = dyn Fn(Mapping) -> FixtureResult<Value> + Send + Sync;

/// Factory backed by a closure. Save and delete are no-ops.
///
/// # Example
///
/// ```
/// # use fixtura_core::builder::{FnFactory, ModelRegistry};
/// # use fixtura_core::value::Value;
/// let registry = ModelRegistry::new();
/// registry.register(FnFactory::new("Point", |fields| Ok(Value::Mapping(fields))));
/// assert!(registry.contains("Point"));
/// ```
pub struct FnFactory {
	model_id: String,
	construct: Box<ConstructFn>,
}

impl FnFactory {
	/// Creates a factory for `model_id` constructing through `construct`.
	pub fn new(
		model_id: impl Into<String>,
		construct: impl Fn(Mapping) -> FixtureResult<Value> + Send + Sync + 'static,
	) -> Self {
		Self {
			model_id: model_id.into(),
			construct: Box::new(construct),
		}
	}
}

impl fmt::Debug for FnFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnFactory")
			.field("model_id", &self.model_id)
			.finish_non_exhaustive()
	}
}

impl ModelFactory for FnFactory {
	fn model_id(&self) -> &str {
		&self.model_id
	}

	fn construct(&self, fields: Mapping) -> FixtureResult<Value> {
		(self.construct)(fields)
	}
}

/// Factory producing [`Record`] objects kept in an in-memory store.
///
/// Saved records can be fetched back by their `id` attribute.
#[derive(Debug)]
pub struct RecordFactory {
	model_id: String,
	saved: RwLock<Vec<ObjectRef>>,
}

impl RecordFactory {
	/// Creates a factory for `model_id`.
	pub fn new(model_id: impl Into<String>) -> Self {
		Self {
			model_id: model_id.into(),
			saved: RwLock::new(Vec::new()),
		}
	}

	/// Currently saved records, in save order.
	pub fn saved(&self) -> Vec<ObjectRef> {
		self.saved.read().clone()
	}

	/// Number of currently saved records.
	pub fn saved_count(&self) -> usize {
		self.saved.read().len()
	}
}

impl ModelFactory for RecordFactory {
	fn model_id(&self) -> &str {
		&self.model_id
	}

	fn construct(&self, fields: Mapping) -> FixtureResult<Value> {
		Ok(Value::Object(ObjectRef::new(Record::with_attributes(
			self.model_id.clone(),
			fields,
		))))
	}

	fn fetch(&self, id: &Value) -> FixtureResult<Value> {
		self.saved
			.read()
			.iter()
			.find(|object| object.read().get_attribute("id").as_ref() == Some(id))
			.cloned()
			.map(Value::Object)
			.ok_or_else(|| {
				FixtureError::Builder(format!("no {} with id {}", self.model_id, id))
			})
	}

	fn save(&self, instance: &Value) -> FixtureResult<()> {
		let Value::Object(object) = instance else {
			return Ok(());
		};
		let mut saved = self.saved.write();
		if !saved.iter().any(|existing| existing.ptr_eq(object)) {
			saved.push(object.clone());
		}
		Ok(())
	}

	fn delete(&self, instance: &Value) -> FixtureResult<()> {
		if let Value::Object(object) = instance {
			self.saved.write().retain(|existing| !existing.ptr_eq(object));
		}
		Ok(())
	}
}

/// Registry of model factories keyed by model identifier.
#[derive(Default)]
pub struct ModelRegistry {
	factories: RwLock<HashMap<String, Arc<dyn ModelFactory>>>,
}

impl ModelRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `factory` under its model identifier, replacing any
	/// previous factory for that identifier.
	pub fn register<F: ModelFactory + 'static>(&self, factory: F) -> Arc<F> {
		let factory = Arc::new(factory);
		self.register_shared(factory.clone());
		factory
	}

	/// Registers an already shared factory.
	pub fn register_shared(&self, factory: Arc<dyn ModelFactory>) {
		let model_id = factory.model_id().to_string();
		tracing::debug!(model = %model_id, "Registering model factory");
		self.factories.write().insert(model_id, factory);
	}

	/// Gets the factory for `model_id`.
	pub fn get(&self, model_id: &str) -> Option<Arc<dyn ModelFactory>> {
		self.factories.read().get(model_id).cloned()
	}

	/// Gets the factory for `model_id` or fails with
	/// [`FixtureError::ModelNotFound`].
	pub fn require(&self, model_id: &str) -> FixtureResult<Arc<dyn ModelFactory>> {
		self.get(model_id)
			.ok_or_else(|| FixtureError::ModelNotFound(model_id.to_string()))
	}

	/// Checks if a factory is registered for `model_id`.
	pub fn contains(&self, model_id: &str) -> bool {
		self.factories.read().contains_key(model_id)
	}

	/// All registered model identifiers.
	pub fn model_ids(&self) -> Vec<String> {
		let mut ids: Vec<_> = self.factories.read().keys().cloned().collect();
		ids.sort();
		ids
	}

	/// Number of registered factories.
	pub fn len(&self) -> usize {
		self.factories.read().len()
	}

	/// Returns true if no factories are registered.
	pub fn is_empty(&self) -> bool {
		self.factories.read().is_empty()
	}

	/// Removes every factory.
	pub fn clear(&self) {
		self.factories.write().clear();
	}
}

impl fmt::Debug for ModelRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModelRegistry")
			.field("models", &self.model_ids())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_register_and_require() {
		// Arrange
		let registry = ModelRegistry::new();
		registry.register(RecordFactory::new("Toaster"));

		// Act
		let factory = registry.require("Toaster").unwrap();
		let missing = registry.require("Kettle");

		// Assert
		assert_eq!(factory.model_id(), "Toaster");
		assert!(matches!(missing, Err(FixtureError::ModelNotFound(name)) if name == "Kettle"));
		assert_eq!(registry.model_ids(), vec!["Toaster"]);
	}

	#[rstest]
	fn test_record_factory_constructs_records() {
		let factory = RecordFactory::new("Toaster");
		let mut fields = Mapping::new();
		fields.insert("slots".into(), Value::from(2));

		let value = factory.construct(fields).unwrap();

		let object = value.as_object().unwrap();
		assert_eq!(object.read().get_attribute("slots"), Some(Value::from(2)));
		let model = object.with_downcast(|record: &Record| record.model().to_string());
		assert_eq!(model.as_deref(), Some("Toaster"));
	}

	#[rstest]
	fn test_record_factory_save_fetch_delete() {
		// Arrange
		let factory = RecordFactory::new("Toaster");
		let mut fields = Mapping::new();
		fields.insert("id".into(), Value::from(7));
		let value = factory.construct(fields).unwrap();

		// Act
		factory.save(&value).unwrap();
		factory.save(&value).unwrap();
		let fetched = factory.fetch(&Value::from(7)).unwrap();

		// Assert
		assert_eq!(factory.saved_count(), 1);
		assert_eq!(fetched, value);

		factory.delete(&value).unwrap();
		assert_eq!(factory.saved_count(), 0);
		assert!(factory.fetch(&Value::from(7)).is_err());
	}

	#[rstest]
	fn test_fn_factory_defaults() {
		let factory = FnFactory::new("Point", |fields| Ok(Value::Mapping(fields)));

		assert!(matches!(
			factory.fetch(&Value::from(1)),
			Err(FixtureError::FetchUnsupported(_))
		));
		assert!(factory.save(&Value::Null).is_ok());
		assert!(factory.delete(&Value::Null).is_ok());
	}
}
