//! Dependency-ordered fixture resolution.
//!
//! This crate turns a declarative set of named fixture definitions into
//! built, fully wired instances:
//!
//! - **Definitions**: single fixtures and collections, with inheritance
//!   between them and relationship tokens pointing at other fixtures
//! - **Dependency graph**: topological ordering, cycle detection and
//!   ancestor queries over fixture keys
//! - **Resolution engine**: builds ancestors first, memoizes instances,
//!   and tears them down in reverse order
//! - **Builders**: pluggable construction, persistence and deletion,
//!   with a registry-backed default
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use fixtura_core::prelude::*;
//! use serde_json::json;
//!
//! let registry = Arc::new(ModelRegistry::new());
//! registry.register(RecordFactory::new("Parent"));
//! let children = registry.register(RecordFactory::new("Child"));
//!
//! let mut manager = FixturesManager::new(registry);
//! manager.load_value(&Value::from_marked_json(json!({
//!     "child": {"model": "Child", "fields": {"parent": {"$rel": "parent"}}},
//!     "parent": {"model": "Parent", "fields": {"name": "p"}},
//! })).unwrap()).unwrap();
//!
//! manager.install_fixture("child").unwrap();
//! assert_eq!(manager.installed_keys(), &["parent", "child"]);
//! assert_eq!(children.saved_count(), 1);
//!
//! manager.uninstall_all_fixtures().unwrap();
//! assert_eq!(children.saved_count(), 0);
//! ```
//!
//! # Architecture
//!
//! - [`FixtureSet`](fixtures::FixtureSet) - Parsed definitions keyed by name
//! - [`DepGraph`](graph::DepGraph) - Dependency graph between fixture keys
//! - [`FixturesManager`](manager::FixturesManager) - The resolution engine
//! - [`Builder`](builder::Builder) / [`DeleteBuilder`](builder::DeleteBuilder) -
//!   Construction and teardown strategies
//! - [`FixturesConfig`](config::FixturesConfig) - Engine settings

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod graph;
pub mod hooks;
pub mod manager;
pub mod prelude;
pub mod value;

// Re-export commonly used types at crate root
pub use error::{FixtureError, FixtureResult};
pub use fixtures::{FixtureCollection, FixtureDefinition, FixtureSet};
pub use graph::DepGraph;
pub use manager::{FixturesManager, InstallOptions, UninstallOptions};
pub use value::{Mapping, Value};
