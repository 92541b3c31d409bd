//! Scoped fixture installation for a single test.

use fixtura_core::{FixtureResult, FixturesManager, InstallOptions, Value};
use indexmap::IndexMap;

/// Installs fixtures for one test and tears them down afterwards.
///
/// Creating a case cleans the manager cache so every test starts from an
/// empty installed set. Fixtures installed through the case are uninstalled
/// in reverse resolution order by [`teardown`](Self::teardown), which runs
/// automatically on drop if it was not called explicitly.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fixtura_core::builder::{ModelRegistry, RecordFactory};
/// use fixtura_core::{FixturesManager, Value};
/// use fixtura_test::FixturesTestCase;
/// use serde_json::json;
///
/// let registry = Arc::new(ModelRegistry::new());
/// let colors = registry.register(RecordFactory::new("Color"));
/// let mut manager = FixturesManager::new(registry);
/// manager.load_value(&Value::from_marked_json(json!({
///     "red_color": {"model": "Color", "fields": {"name": "red"}},
/// })).unwrap()).unwrap();
///
/// {
///     let case = FixturesTestCase::with_fixtures(manager, &["red_color"]).unwrap();
///     assert!(case.fixture("red_color").is_some());
///     assert_eq!(colors.saved_count(), 1);
/// }
/// assert_eq!(colors.saved_count(), 0);
/// ```
#[derive(Debug)]
pub struct FixturesTestCase {
	manager: FixturesManager,
	fixtures: IndexMap<String, Value>,
	torn_down: bool,
}

impl FixturesTestCase {
	/// Wraps `manager`, dropping anything it had cached.
	pub fn new(mut manager: FixturesManager) -> Self {
		manager.clean_cache();
		Self {
			manager,
			fixtures: IndexMap::new(),
			torn_down: false,
		}
	}

	/// Wraps `manager` and installs `keys` as the test's setup.
	pub fn with_fixtures<S: AsRef<str>>(
		manager: FixturesManager,
		keys: &[S],
	) -> FixtureResult<Self> {
		let mut case = Self::new(manager);
		case.install_fixtures(keys)?;
		Ok(case)
	}

	/// The wrapped manager.
	pub fn manager(&self) -> &FixturesManager {
		&self.manager
	}

	/// Mutable access to the wrapped manager.
	pub fn manager_mut(&mut self) -> &mut FixturesManager {
		&mut self.manager
	}

	/// Installs a fixture and remembers it under its key.
	pub fn install_fixture(&mut self, key: &str) -> FixtureResult<Value> {
		let instance = self.manager.install_fixture(key)?;
		self.fixtures.insert(key.to_string(), instance.clone());
		self.torn_down = false;
		Ok(instance)
	}

	/// Installs several fixtures in order.
	pub fn install_fixtures<S: AsRef<str>>(&mut self, keys: &[S]) -> FixtureResult<Vec<Value>> {
		keys.iter()
			.map(|key| self.install_fixture(key.as_ref()))
			.collect()
	}

	/// Resolves a fixture without saving it.
	pub fn get_fixture(&mut self, key: &str) -> FixtureResult<Value> {
		self.torn_down = false;
		self.manager.get_fixture(key)
	}

	/// Resolves every loaded fixture without saving any of them.
	pub fn create_all_fixtures(&mut self) -> FixtureResult<Vec<Value>> {
		self.torn_down = false;
		self.manager
			.install_all_fixtures_with(&InstallOptions::new().do_not_save())
	}

	/// A fixture previously installed through this case.
	pub fn fixture(&self, key: &str) -> Option<&Value> {
		self.fixtures.get(key)
	}

	/// Keys installed through this case, in installation order.
	pub fn fixture_keys(&self) -> impl Iterator<Item = &str> {
		self.fixtures.keys().map(String::as_str)
	}

	/// Uninstalls everything the manager resolved, most recent first.
	///
	/// Calling it again without installing anything in between is a no-op.
	pub fn teardown(&mut self) -> FixtureResult<()> {
		if self.torn_down {
			return Ok(());
		}
		self.torn_down = true;
		self.fixtures.clear();
		let removed = self.manager.uninstall_all_fixtures()?;
		tracing::debug!(removed = removed.len(), "Fixtures test case torn down");
		Ok(())
	}

	/// Tears down and hands the manager back.
	pub fn into_manager(mut self) -> FixtureResult<FixturesManager> {
		self.teardown()?;
		let manager = std::mem::take(&mut self.manager);
		Ok(manager)
	}
}

impl Drop for FixturesTestCase {
	fn drop(&mut self) {
		if let Err(error) = self.teardown() {
			tracing::warn!(%error, "Fixture teardown failed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fixtura_core::builder::{ModelRegistry, RecordFactory};
	use rstest::rstest;
	use serde_json::json;
	use std::sync::Arc;

	fn manager(registry: Arc<ModelRegistry>) -> FixturesManager {
		let mut manager = FixturesManager::new(registry);
		let source = Value::from_marked_json(json!({
			"red_color": {"model": "Color", "fields": {"name": "red"}},
			"toaster": {"model": "Toaster", "fields": {"color": {"$rel": "red_color"}}},
		}))
		.unwrap();
		manager.load_value(&source).unwrap();
		manager
	}

	#[rstest]
	fn test_new_cleans_cache() {
		let registry = Arc::new(ModelRegistry::new());
		registry.register(RecordFactory::new("Color"));
		let mut manager = manager(registry);
		manager.get_fixture("red_color").unwrap();

		let case = FixturesTestCase::new(manager);

		assert!(case.manager().installed_keys().is_empty());
	}

	#[rstest]
	fn test_teardown_is_idempotent() {
		// Arrange
		let registry = Arc::new(ModelRegistry::new());
		let colors = registry.register(RecordFactory::new("Color"));
		registry.register(RecordFactory::new("Toaster"));
		let mut case = FixturesTestCase::new(manager(registry));
		case.install_fixture("toaster").unwrap();

		// Act
		case.teardown().unwrap();
		case.teardown().unwrap();

		// Assert
		assert!(case.fixture("toaster").is_none());
		assert!(case.manager().installed_keys().is_empty());
		assert_eq!(colors.saved_count(), 0);
	}

	#[rstest]
	fn test_into_manager_returns_clean_manager() {
		let registry = Arc::new(ModelRegistry::new());
		registry.register(RecordFactory::new("Color"));
		let mut case = FixturesTestCase::new(manager(registry));
		case.install_fixture("red_color").unwrap();

		let manager = case.into_manager().unwrap();

		assert!(manager.installed_keys().is_empty());
		assert_eq!(manager.keys(), vec!["red_color", "toaster"]);
	}
}
