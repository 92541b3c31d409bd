//! Fixtures test case integration tests
//!
//! Exercises scoped installation and teardown through the rstest fixtures.

use std::io::Write;
use std::sync::Arc;

use fixtura_core::builder::{ModelRegistry, RecordFactory};
use fixtura_core::{FixturesManager, Value};
use fixtura_test::FixturesTestCase;
use fixtura_test::fixtures::{fixtures_case, manager_from_file, model_registry};
use parking_lot::Mutex;
use rstest::*;
use serde_json::json;

struct Store {
	colors: Arc<RecordFactory>,
	toasters: Arc<RecordFactory>,
}

fn loaded(registry: Arc<ModelRegistry>) -> (FixturesManager, Store) {
	let store = Store {
		colors: registry.register(RecordFactory::new("Color")),
		toasters: registry.register(RecordFactory::new("Toaster")),
	};
	let mut manager = FixturesManager::new(registry);
	let source = Value::from_marked_json(json!({
		"red_color": {"model": "Color", "fields": {"name": "red"}},
		"toaster": {"model": "Toaster", "fields": {"slots": 2, "color": {"$rel": "red_color"}}},
		"toasters": {"model": "Toaster", "objects": [{"slots": 1}, {"slots": 4}]},
	}))
	.unwrap();
	manager.load_value(&source).unwrap();
	(manager, store)
}

/// Test: drop tears down installed fixtures
///
/// Category: Integration
/// Verifies that leaving the test scope deletes everything that was saved.
#[rstest]
fn test_drop_uninstalls(model_registry: Arc<ModelRegistry>) {
	// Arrange
	let (manager, store) = loaded(model_registry);

	// Act
	{
		let case = FixturesTestCase::with_fixtures(manager, &["toaster"]).unwrap();
		assert_eq!(store.toasters.saved_count(), 1);
		assert!(case.fixture("toaster").is_some());
		assert!(case.fixture("red_color").is_none());
	}

	// Assert
	assert_eq!(store.toasters.saved_count(), 0);
	assert_eq!(store.colors.saved_count(), 0);
}

/// Test: teardown order
///
/// Category: Integration
/// Verifies that dependents are uninstalled before their dependencies.
#[rstest]
fn test_teardown_runs_in_reverse(model_registry: Arc<ModelRegistry>) {
	// Arrange
	let (mut manager, _store) = loaded(model_registry);
	let order = Arc::new(Mutex::new(Vec::new()));
	let recorder = order.clone();
	manager
		.set_hook("before_uninstall", move |ctx| recorder.lock().push(ctx.key.to_string()))
		.unwrap();
	let mut case = FixturesTestCase::new(manager);
	case.install_fixtures(&["toaster", "toasters"]).unwrap();

	// Act
	case.teardown().unwrap();

	// Assert
	assert_eq!(
		*order.lock(),
		vec!["toasters", "toasters.1", "toasters.0", "toaster", "red_color"]
	);
}

/// Test: create_all_fixtures does not save
///
/// Category: Integration
#[rstest]
fn test_create_all_fixtures_skips_save(model_registry: Arc<ModelRegistry>) {
	let (manager, store) = loaded(model_registry);
	let mut case = FixturesTestCase::new(manager);

	let all = case.create_all_fixtures().unwrap();

	assert_eq!(all.len(), 3);
	assert_eq!(store.colors.saved_count(), 0);
	assert_eq!(store.toasters.saved_count(), 0);
	assert!(case.manager().is_cached("toasters.1"));
}

/// Test: get_fixture resolves through the case
///
/// Category: Integration
#[rstest]
fn test_get_fixture_resolves_attribute(model_registry: Arc<ModelRegistry>) {
	let (manager, _store) = loaded(model_registry);
	let mut case = FixturesTestCase::new(manager);

	let name = case.get_fixture("red_color.name").unwrap();

	assert_eq!(name, Value::from("red"));
	assert!(case.fixture("red_color").is_none());
}

/// Test: default case fixture
///
/// Category: Edge Case
#[rstest]
fn test_default_case_is_empty(mut fixtures_case: FixturesTestCase) {
	assert!(fixtures_case.manager().keys().is_empty());
	assert!(fixtures_case.teardown().is_ok());
}

/// Test: manager loaded from a file
///
/// Category: Integration
#[rstest]
fn test_manager_from_file(model_registry: Arc<ModelRegistry>) {
	// Arrange
	let colors = model_registry.register(RecordFactory::new("Color"));
	let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
	writeln!(file, "blue_color:\n  model: Color\n  fields:\n    name: blue").unwrap();

	// Act
	let manager = manager_from_file(model_registry, file.path());
	let case = FixturesTestCase::with_fixtures(manager, &["blue_color"]).unwrap();

	// Assert
	assert_eq!(colors.saved_count(), 1);
	drop(case);
	assert_eq!(colors.saved_count(), 0);
}
