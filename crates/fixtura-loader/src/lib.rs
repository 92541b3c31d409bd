//! # Fixtura Loader
//!
//! Reads fixture definition files and feeds them to a
//! [`FixturesManager`](fixtura_core::FixturesManager).
//!
//! ## Formats
//!
//! - **YAML** (`.yaml`, `.yml`, feature `yaml`): relationships and time
//!   values are written with tags such as `!rel red_color` and `!now +1d`.
//! - **JSON** (`.json`, feature `json`): the same markers are written as
//!   single-key objects such as `{"$rel": "red_color"}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fixtura_core::FixturesManager;
//! use fixtura_core::builder::{ModelRegistry, RecordFactory};
//! use fixtura_loader::LoadFromFile;
//!
//! let registry = Arc::new(ModelRegistry::new());
//! registry.register(RecordFactory::new("Toaster"));
//!
//! let mut manager = FixturesManager::new(registry);
//! manager.load_file("fixtures/toasters.yaml").unwrap();
//! let toaster = manager.get_fixture("toaster").unwrap();
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod load;
pub mod parser;
#[cfg(feature = "yaml")]
mod yaml;

pub use error::{LoaderError, LoaderResult};
pub use format::{SourceDocument, SourceFormat};
pub use load::LoadFromFile;
pub use parser::SourceParser;
