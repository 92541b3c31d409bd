//! rstest fixtures for fixture-driven tests.
//!
//! ```
//! use fixtura_test::FixturesTestCase;
//! use fixtura_test::fixtures::fixtures_case;
//! use rstest::*;
//!
//! #[rstest]
//! fn test_starts_empty(fixtures_case: FixturesTestCase) {
//!     assert!(fixtures_case.manager().keys().is_empty());
//! }
//! ```

use std::sync::Arc;

use fixtura_core::FixturesManager;
use fixtura_core::builder::ModelRegistry;
use rstest::*;

use crate::testcase::FixturesTestCase;

/// Fixture providing an empty model registry.
#[fixture]
pub fn model_registry() -> Arc<ModelRegistry> {
	Arc::new(ModelRegistry::new())
}

/// Fixture providing a manager over [`model_registry`] with nothing loaded.
#[fixture]
pub fn fixtures_manager(model_registry: Arc<ModelRegistry>) -> FixturesManager {
	FixturesManager::new(model_registry)
}

/// Fixture providing a test case over [`fixtures_manager`].
#[fixture]
pub fn fixtures_case(fixtures_manager: FixturesManager) -> FixturesTestCase {
	FixturesTestCase::new(fixtures_manager)
}

/// Builds a manager over `registry` and loads definitions from `path`.
///
/// # Panics
///
/// Panics if the file cannot be loaded, failing the calling test.
#[cfg(feature = "loader")]
pub fn manager_from_file(
	registry: Arc<ModelRegistry>,
	path: impl AsRef<std::path::Path>,
) -> FixturesManager {
	use fixtura_loader::LoadFromFile;

	let path = path.as_ref();
	let mut manager = FixturesManager::new(registry);
	if let Err(error) = manager.load_file(path) {
		panic!("failed to load fixtures from {}: {}", path.display(), error);
	}
	manager
}
