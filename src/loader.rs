//! Definition file loading module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fixtura::FixturesManager;
//! use fixtura::loader::LoadFromFile;
//!
//! let mut manager = FixturesManager::default();
//! manager.load_file("fixtures/colors.yaml").unwrap();
//! ```

pub use fixtura_loader::*;
