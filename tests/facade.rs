//! Facade crate integration tests
//!
//! Drives the engine through the `fixtura` re-exports only.

use std::io::Write;
use std::sync::Arc;

use fixtura::prelude::*;
use rstest::*;

const FIXTURES: &str = r#"
red_color:
  model: Color
  fields:
    name: red
toaster:
  model: Toaster
  fields:
    slots: 2
    color: !rel red_color
"#;

#[fixture]
fn registry() -> Arc<ModelRegistry> {
	let registry = Arc::new(ModelRegistry::new());
	registry.register(RecordFactory::new("Color"));
	registry.register(RecordFactory::new("Toaster"));
	registry
}

/// Test: load and install through the facade
///
/// Category: Integration
/// Verifies that a YAML file loaded via the prelude installs its dependencies
/// first and uninstalls them in reverse.
#[rstest]
fn test_facade_load_and_install(registry: Arc<ModelRegistry>) {
	// Arrange
	let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
	write!(file, "{}", FIXTURES).unwrap();
	let mut manager = FixturesManager::new(registry);
	manager.load_file(file.path()).unwrap();

	// Act
	let toaster = manager.install_fixture("toaster").unwrap();

	// Assert
	assert_eq!(manager.installed_keys(), ["red_color", "toaster"]);
	assert_eq!(toaster.get_attribute("slots"), Some(Value::from(2)));
	let removed = manager.uninstall_all_fixtures().unwrap();
	assert_eq!(removed.len(), 2);
	assert!(manager.installed_keys().is_empty());
}

/// Test: loader errors surface through the facade
///
/// Category: Error Path
#[rstest]
fn test_facade_unknown_extension(registry: Arc<ModelRegistry>) {
	let mut manager = FixturesManager::new(registry);

	let result = manager.load_file("fixtures.txt");

	assert!(matches!(
		result,
		Err(fixtura::LoaderError::UnsupportedExtension(_))
	));
}

/// Test: in-memory JSON source
///
/// Category: Integration
#[rstest]
fn test_facade_load_str_json(registry: Arc<ModelRegistry>) {
	let mut manager = FixturesManager::new(registry);
	manager
		.load_str(
			r#"{"red_color": {"model": "Color", "fields": {"name": "red"}}}"#,
			SourceFormat::Json,
		)
		.unwrap();

	let name = manager.get_fixture("red_color.name").unwrap();

	assert_eq!(name, Value::from("red"));
	assert!(!manager.is_cached("red_color.name"));
}
