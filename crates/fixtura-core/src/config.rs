//! Engine configuration.
//!
//! Settings can come from code, a TOML document, or environment variables:
//!
//! ```toml
//! [fixtures]
//! deep_inherit = true
//! models_package = "app.models"
//! timezone_aware = false
//! ```

use serde::Deserialize;

use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::MergeMode;

/// Environment variable enabling deep inheritance merges.
pub const ENV_DEEP_INHERIT: &str = "FIXTURA_DEEP_INHERIT";
/// Environment variable naming the default models package.
pub const ENV_MODELS_PACKAGE: &str = "FIXTURA_MODELS_PACKAGE";
/// Environment variable controlling timezone-aware timestamps.
pub const ENV_TIMEZONE_AWARE: &str = "FIXTURA_TIMEZONE_AWARE";

/// Settings for a [`FixturesManager`](crate::manager::FixturesManager).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
	/// Merge nested mappings recursively when inheriting.
	pub deep_inherit: bool,
	/// Prefix joined onto model references that carry no package.
	pub models_package: Option<String>,
	/// Produce timezone-aware timestamps for `now` markers.
	pub timezone_aware: bool,
}

impl Default for FixturesConfig {
	fn default() -> Self {
		Self {
			deep_inherit: false,
			models_package: None,
			timezone_aware: true,
		}
	}
}

#[derive(Deserialize)]
struct Document {
	fixtures: Option<FixturesConfig>,
}

impl FixturesConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets [`deep_inherit`](Self::deep_inherit).
	pub fn with_deep_inherit(mut self, enabled: bool) -> Self {
		self.deep_inherit = enabled;
		self
	}

	/// Sets [`models_package`](Self::models_package).
	pub fn with_models_package(mut self, package: impl Into<String>) -> Self {
		self.models_package = Some(package.into());
		self
	}

	/// Sets [`timezone_aware`](Self::timezone_aware).
	pub fn with_timezone_aware(mut self, enabled: bool) -> Self {
		self.timezone_aware = enabled;
		self
	}

	/// Reads the `[fixtures]` table of a TOML document, or the document
	/// itself when it has no such table.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Config`] if the document does not parse.
	pub fn from_toml_str(text: &str) -> FixtureResult<Self> {
		let parse_error = |e: toml::de::Error| FixtureError::Config(e.to_string());
		let document: toml::Table = toml::from_str(text).map_err(parse_error)?;
		if document.contains_key("fixtures") {
			let document: Document = toml::from_str(text).map_err(parse_error)?;
			return Ok(document.fixtures.unwrap_or_default());
		}
		toml::from_str(text).map_err(parse_error)
	}

	/// Reads settings from the `FIXTURA_*` environment variables, keeping
	/// defaults for unset ones.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Config`] if a boolean variable holds
	/// something other than a recognized boolean.
	pub fn from_env() -> FixtureResult<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Like [`from_env`](Self::from_env), reading variables through `lookup`.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FixtureResult<Self> {
		let mut config = Self::default();
		if let Some(value) = lookup(ENV_DEEP_INHERIT) {
			config.deep_inherit = parse_bool(ENV_DEEP_INHERIT, &value)?;
		}
		if let Some(value) = lookup(ENV_MODELS_PACKAGE).filter(|v| !v.trim().is_empty()) {
			config.models_package = Some(value.trim().to_string());
		}
		if let Some(value) = lookup(ENV_TIMEZONE_AWARE) {
			config.timezone_aware = parse_bool(ENV_TIMEZONE_AWARE, &value)?;
		}
		Ok(config)
	}

	/// Inheritance merge mode selected by [`deep_inherit`](Self::deep_inherit).
	pub fn merge_mode(&self) -> MergeMode {
		if self.deep_inherit {
			MergeMode::Deep
		} else {
			MergeMode::Shallow
		}
	}

	/// Qualifies `model` with the models package unless it already names one.
	pub fn qualify_model(&self, model: &str) -> String {
		match &self.models_package {
			Some(package) if !model.contains('.') => format!("{}.{}", package, model),
			_ => model.to_string(),
		}
	}
}

fn parse_bool(name: &str, value: &str) -> FixtureResult<bool> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" => Ok(false),
		other => Err(FixtureError::Config(format!(
			"{} must be a boolean, got '{}'",
			name, other
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::collections::HashMap;

	#[rstest]
	fn test_defaults() {
		let config = FixturesConfig::default();
		assert!(!config.deep_inherit);
		assert!(config.models_package.is_none());
		assert!(config.timezone_aware);
		assert_eq!(config.merge_mode(), MergeMode::Shallow);
	}

	#[rstest]
	fn test_from_toml_with_table() {
		let config = FixturesConfig::from_toml_str(
			r#"
[fixtures]
deep_inherit = true
models_package = "app.models"
"#,
		)
		.unwrap();

		assert!(config.deep_inherit);
		assert_eq!(config.models_package.as_deref(), Some("app.models"));
		assert!(config.timezone_aware);
	}

	#[rstest]
	fn test_from_toml_bare_table() {
		let config = FixturesConfig::from_toml_str("timezone_aware = false").unwrap();
		assert!(!config.timezone_aware);
	}

	#[rstest]
	fn test_from_toml_rejects_wrong_types() {
		let result = FixturesConfig::from_toml_str("deep_inherit = \"maybe\"");
		assert!(matches!(result, Err(FixtureError::Config(_))));
	}

	#[rstest]
	#[case("yes", true)]
	#[case("0", false)]
	#[case(" TRUE ", true)]
	fn test_from_lookup_parses_booleans(#[case] raw: &str, #[case] expected: bool) {
		let vars: HashMap<&str, String> = HashMap::from([(ENV_DEEP_INHERIT, raw.to_string())]);

		let config = FixturesConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();

		assert_eq!(config.deep_inherit, expected);
	}

	#[rstest]
	fn test_from_lookup_rejects_garbage() {
		let result = FixturesConfig::from_lookup(|name| {
			(name == ENV_TIMEZONE_AWARE).then(|| "sometimes".to_string())
		});
		assert!(matches!(result, Err(FixtureError::Config(_))));
	}

	#[rstest]
	#[serial(fixtura_env)]
	fn test_from_env_reads_process_environment() {
		// SAFETY: Environment access is serialized by #[serial].
		unsafe {
			std::env::set_var(ENV_MODELS_PACKAGE, "shop.models");
			std::env::set_var(ENV_TIMEZONE_AWARE, "false");
		}

		let config = FixturesConfig::from_env().unwrap();

		// SAFETY: Environment access is serialized by #[serial].
		unsafe {
			std::env::remove_var(ENV_MODELS_PACKAGE);
			std::env::remove_var(ENV_TIMEZONE_AWARE);
		}
		assert_eq!(config.models_package.as_deref(), Some("shop.models"));
		assert!(!config.timezone_aware);
	}

	#[rstest]
	#[case(None, "Toaster", "Toaster")]
	#[case(Some("app.models"), "Toaster", "app.models.Toaster")]
	#[case(Some("app.models"), "other.Toaster", "other.Toaster")]
	fn test_qualify_model(
		#[case] package: Option<&str>,
		#[case] model: &str,
		#[case] expected: &str,
	) {
		let mut config = FixturesConfig::default();
		config.models_package = package.map(str::to_string);
		assert_eq!(config.qualify_model(model), expected);
	}
}
