//! Built host objects.
//!
//! Builders hand back host objects wrapped in an [`ObjectRef`]. The handle is
//! shared: cloning it never copies the object, so a fixture resolved twice from
//! the cache is the same object both times.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Mapping, Value};
use crate::error::{FixtureError, FixtureResult};

/// Attribute access implemented by objects that builders construct.
///
/// Relationship tokens of the form `key.attribute` read through
/// [`Model::get_attribute`], and `post_creation` assignments write through
/// [`Model::set_attribute`].
pub trait Model: Any + Send + Sync + fmt::Debug {
	/// Returns the value of an attribute, or `None` if it does not exist.
	fn get_attribute(&self, name: &str) -> Option<Value>;

	/// Assigns an attribute after construction.
	fn set_attribute(&mut self, name: &str, value: Value) -> FixtureResult<()>;

	/// Returns the object as `Any` for downcasting.
	fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a built host object.
#[derive(Clone)]
pub struct ObjectRef {
	inner: Arc<RwLock<Box<dyn Model>>>,
}

impl ObjectRef {
	/// Wraps a model instance.
	pub fn new<M: Model>(model: M) -> Self {
		Self {
			inner: Arc::new(RwLock::new(Box::new(model))),
		}
	}

	/// Acquires shared access to the object.
	pub fn read(&self) -> RwLockReadGuard<'_, Box<dyn Model>> {
		self.inner.read()
	}

	/// Acquires exclusive access to the object.
	pub fn write(&self) -> RwLockWriteGuard<'_, Box<dyn Model>> {
		self.inner.write()
	}

	/// Returns true if both handles point to the same object.
	pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Runs `f` against the object if it is of type `M`.
	///
	/// # Example
	///
	/// ```
	/// # use fixtura_core::value::{ObjectRef, Record};
	/// let object = ObjectRef::new(Record::new("Toaster"));
	/// let model = object.with_downcast(|record: &Record| record.model().to_string());
	/// assert_eq!(model.as_deref(), Some("Toaster"));
	/// ```
	pub fn with_downcast<M: Model, R>(&self, f: impl FnOnce(&M) -> R) -> Option<R> {
		let guard = self.inner.read();
		guard.as_any().downcast_ref::<M>().map(f)
	}

	/// Number of live handles to the object.
	pub fn strong_count(&self) -> usize {
		Arc::strong_count(&self.inner)
	}
}

impl fmt::Debug for ObjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&**self.inner.read(), f)
	}
}

impl PartialEq for ObjectRef {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

/// Generic model instance: a model identifier plus an attribute mapping.
///
/// [`RecordFactory`](crate::builder::RecordFactory) builds these, which is
/// enough for hosts that only need named bags of attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
	model: String,
	attributes: Mapping,
}

impl Record {
	/// Creates an empty record for `model`.
	pub fn new(model: impl Into<String>) -> Self {
		Self {
			model: model.into(),
			attributes: Mapping::new(),
		}
	}

	/// Creates a record from a resolved field mapping.
	pub fn with_attributes(model: impl Into<String>, attributes: Mapping) -> Self {
		Self {
			model: model.into(),
			attributes,
		}
	}

	/// Model identifier the record was built for.
	pub fn model(&self) -> &str {
		&self.model
	}

	/// Attribute mapping.
	pub fn attributes(&self) -> &Mapping {
		&self.attributes
	}

	/// Returns a single attribute.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.attributes.get(name)
	}
}

impl Model for Record {
	fn get_attribute(&self, name: &str) -> Option<Value> {
		self.attributes.get(name).cloned()
	}

	fn set_attribute(&mut self, name: &str, value: Value) -> FixtureResult<()> {
		self.attributes.insert(name.to_string(), value);
		Ok(())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

/// Wraps a [`Model`] that refuses every assignment.
///
/// Useful for hosts whose objects are immutable after construction.
#[derive(Debug)]
pub struct Frozen<M: Model>(pub M);

impl<M: Model> Model for Frozen<M> {
	fn get_attribute(&self, name: &str) -> Option<Value> {
		self.0.get_attribute(name)
	}

	fn set_attribute(&mut self, name: &str, _value: Value) -> FixtureResult<()> {
		Err(FixtureError::AttributeAssignment {
			attribute: name.to_string(),
			message: "object is frozen".to_string(),
		})
	}

	fn as_any(&self) -> &dyn Any {
		self.0.as_any()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_clones_share_identity() {
		// Arrange
		let object = ObjectRef::new(Record::new("Toaster"));

		// Act
		let clone = object.clone();

		// Assert
		assert!(object.ptr_eq(&clone));
		assert_eq!(object, clone);
		assert_ne!(object, ObjectRef::new(Record::new("Toaster")));
	}

	#[rstest]
	fn test_writes_are_visible_through_every_handle() {
		let object = ObjectRef::new(Record::new("Toaster"));
		let clone = object.clone();

		object
			.write()
			.set_attribute("slots", Value::Integer(4))
			.unwrap();

		assert_eq!(
			clone.read().get_attribute("slots"),
			Some(Value::Integer(4))
		);
	}

	#[rstest]
	fn test_downcast_to_wrong_type_is_none() {
		#[derive(Debug)]
		struct Other;
		impl Model for Other {
			fn get_attribute(&self, _name: &str) -> Option<Value> {
				None
			}
			fn set_attribute(&mut self, _name: &str, _value: Value) -> FixtureResult<()> {
				Ok(())
			}
			fn as_any(&self) -> &dyn Any {
				self
			}
		}

		let object = ObjectRef::new(Other);
		assert!(object.with_downcast(|_: &Record| ()).is_none());
		assert!(object.with_downcast(|_: &Other| ()).is_some());
	}

	#[rstest]
	fn test_frozen_rejects_assignment() {
		let mut frozen = Frozen(Record::new("Toaster"));
		let result = frozen.set_attribute("slots", Value::Integer(2));
		assert!(matches!(
			result,
			Err(FixtureError::AttributeAssignment { .. })
		));
	}
}
