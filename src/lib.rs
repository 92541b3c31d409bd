//! # Fixtura
//!
//! Declarative test fixtures with dependency-ordered resolution.
//!
//! Fixtures are named definitions of objects to build for a test. A fixture
//! may reference other fixtures, inherit fields from another definition, or
//! group several objects into a collection. Fixtura builds every dependency
//! first, caches what it built, and tears everything down in reverse order.
//!
//! ## Feature Flags
//!
//! - `yaml` (default) - YAML definition files with `!rel`/`!now` tags
//! - `json` (default) - JSON definition files with `$rel`/`$now` markers
//! - `test` - [`FixturesTestCase`](test::FixturesTestCase) and rstest fixtures
//! - `full` - All of the above
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fixtura::prelude::*;
//! use serde_json::json;
//!
//! let registry = Arc::new(ModelRegistry::new());
//! registry.register(RecordFactory::new("Color"));
//! registry.register(RecordFactory::new("Toaster"));
//!
//! let mut manager = FixturesManager::new(registry);
//! manager.load_value(&Value::from_marked_json(json!({
//!     "red_color": {"model": "Color", "fields": {"name": "red"}},
//!     "toasters": {
//!         "model": "Toaster",
//!         "objects": {"small": {"slots": 2, "color": {"$rel": "red_color"}}},
//!     },
//! })).unwrap()).unwrap();
//!
//! let small = manager.get_fixture("toasters.small").unwrap();
//! assert_eq!(small.get_attribute("slots"), Some(Value::from(2)));
//! ```

#![warn(missing_docs)]

pub mod core;
#[cfg(feature = "loader")]
pub mod loader;

pub use fixtura_core::{
	DepGraph, FixtureCollection, FixtureDefinition, FixtureError, FixtureResult, FixtureSet,
	FixturesManager, InstallOptions, Mapping, UninstallOptions, Value,
};

#[cfg(feature = "loader")]
pub use fixtura_loader::{LoadFromFile, LoaderError, LoaderResult, SourceFormat};

#[cfg(feature = "test")]
pub use fixtura_test::FixturesTestCase;

/// Convenience re-exports for common usage.
pub mod prelude {
	pub use fixtura_core::prelude::*;

	#[cfg(feature = "loader")]
	pub use fixtura_loader::{LoadFromFile, SourceFormat};

	#[cfg(feature = "test")]
	pub use fixtura_test::FixturesTestCase;
}
