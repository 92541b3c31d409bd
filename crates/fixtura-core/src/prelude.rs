//! Convenience re-exports for common usage.
//!
//! ```
//! use fixtura_core::prelude::*;
//!
//! let manager = FixturesManager::default();
//! assert!(manager.keys().is_empty());
//! ```

// Error types
pub use crate::error::{FixtureError, FixtureResult};

// Values
pub use crate::value::{
	Deferred, Frozen, Mapping, Model, ObjectRef, Record, RelationshipToken, Value,
};

// Definitions
pub use crate::fixtures::{
	AggregateFormat, CollectionKind, FixtureCollection, FixtureDefinition, FixtureSet, MergeMode,
};

// Engine
pub use crate::builder::{
	Builder, DeleteAndCommit, DeleteBuilder, FnFactory, InstantiateAndSave, ModelFactory,
	ModelRegistry, RecordFactory,
};
pub use crate::config::FixturesConfig;
pub use crate::graph::DepGraph;
pub use crate::hooks::{HookContext, HookName};
pub use crate::manager::{FixturesManager, InstallOptions, UninstallOptions};
