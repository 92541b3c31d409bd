//! Construction and teardown strategies.
//!
//! The engine never knows how instances are made or persisted. It hands a
//! model reference and resolved fields to a [`Builder`], and instances being
//! torn down to a [`DeleteBuilder`]. [`InstantiateAndSave`] and
//! [`DeleteAndCommit`] are the defaults, both dispatching through a
//! [`ModelRegistry`].

mod registry;

pub use registry::{FnFactory, ModelFactory, ModelRegistry, RecordFactory};

use std::sync::Arc;

use crate::error::{FixtureError, FixtureResult};
use crate::value::{Mapping, Value};

/// Turns a model reference and resolved fields into an instance.
pub trait Builder: Send + Sync {
	/// Constructs a new instance of `model`.
	fn build(&self, model: &str, fields: Mapping) -> FixtureResult<Value>;

	/// Retrieves an existing instance of `model` by identifier.
	///
	/// The default implementation does not support fetching.
	fn fetch(&self, model: &str, _id: &Value) -> FixtureResult<Value> {
		Err(FixtureError::FetchUnsupported(model.to_string()))
	}

	/// Persists an instance. `model` is `None` for values that were not built
	/// from a model, such as plain mappings.
	fn save(&self, _model: Option<&str>, _instance: &Value) -> FixtureResult<()> {
		Ok(())
	}
}

impl<F> Builder for F
where
	F: Fn(&str, Mapping) -> FixtureResult<Value> + Send + Sync,
{
	fn build(&self, model: &str, fields: Mapping) -> FixtureResult<Value> {
		self(model, fields)
	}
}

/// Removes an instance when its fixture is uninstalled.
pub trait DeleteBuilder: Send + Sync {
	/// Deletes `instance`. `model` is `None` for values that were not built
	/// from a model.
	fn delete(&self, model: Option<&str>, instance: &Value) -> FixtureResult<()>;
}

/// Builds through the registry's factory and saves through it on install.
#[derive(Debug, Clone)]
pub struct InstantiateAndSave {
	registry: Arc<ModelRegistry>,
}

impl InstantiateAndSave {
	/// Creates a builder over `registry`.
	pub fn new(registry: Arc<ModelRegistry>) -> Self {
		Self { registry }
	}

	/// The backing registry.
	pub fn registry(&self) -> &Arc<ModelRegistry> {
		&self.registry
	}
}

impl Builder for InstantiateAndSave {
	fn build(&self, model: &str, fields: Mapping) -> FixtureResult<Value> {
		self.registry.require(model)?.construct(fields)
	}

	fn fetch(&self, model: &str, id: &Value) -> FixtureResult<Value> {
		self.registry.require(model)?.fetch(id)
	}

	fn save(&self, model: Option<&str>, instance: &Value) -> FixtureResult<()> {
		match model {
			Some(model) => self.registry.require(model)?.save(instance),
			None => Ok(()),
		}
	}
}

/// Deletes through the registry's factory.
#[derive(Debug, Clone)]
pub struct DeleteAndCommit {
	registry: Arc<ModelRegistry>,
}

impl DeleteAndCommit {
	/// Creates a delete builder over `registry`.
	pub fn new(registry: Arc<ModelRegistry>) -> Self {
		Self { registry }
	}
}

impl DeleteBuilder for DeleteAndCommit {
	fn delete(&self, model: Option<&str>, instance: &Value) -> FixtureResult<()> {
		match model {
			Some(model) => self.registry.require(model)?.delete(instance),
			None => Ok(()),
		}
	}
}

/// Delete builder that leaves instances in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelete;

impl DeleteBuilder for NoDelete {
	fn delete(&self, _model: Option<&str>, _instance: &Value) -> FixtureResult<()> {
		Ok(())
	}
}
