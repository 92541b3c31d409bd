//! Source formats and parsed documents.

use std::fmt;
use std::path::Path;

use fixtura_core::Mapping;

/// Supported definition source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SourceFormat {
	/// YAML with `!rel`/`!now`-style tags (default).
	#[default]
	Yaml,

	/// JSON with `$`-prefixed marker objects.
	Json,
}

impl SourceFormat {
	/// Determines the format from a file extension.
	///
	/// # Example
	///
	/// ```
	/// # use fixtura_loader::SourceFormat;
	/// assert_eq!(SourceFormat::from_extension("yml"), Some(SourceFormat::Yaml));
	/// assert_eq!(SourceFormat::from_extension("JSON"), Some(SourceFormat::Json));
	/// assert_eq!(SourceFormat::from_extension("toml"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"yaml" | "yml" => Some(Self::Yaml),
			"json" => Some(Self::Json),
			_ => None,
		}
	}

	/// Determines the format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}

	/// Default file extension for this format.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Yaml => "yaml",
			Self::Json => "json",
		}
	}
}

impl fmt::Display for SourceFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Yaml => write!(f, "YAML"),
			Self::Json => write!(f, "JSON"),
		}
	}
}

/// A parsed definition document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
	/// Top-level definitions, keyed by fixture key.
	pub definitions: Mapping,

	/// Format the document was parsed from.
	pub format: SourceFormat,

	/// Source file path, when read from disk.
	pub source: Option<String>,
}

impl SourceDocument {
	/// Wraps parsed definitions.
	pub fn new(definitions: Mapping, format: SourceFormat) -> Self {
		Self {
			definitions,
			format,
			source: None,
		}
	}

	/// Sets the source file path.
	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}

	/// Number of top-level definitions.
	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	/// Returns true if the document defines nothing.
	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("fixtures.yaml", Some(SourceFormat::Yaml))]
	#[case("fixtures.YML", Some(SourceFormat::Yaml))]
	#[case("dir/fixtures.json", Some(SourceFormat::Json))]
	#[case("fixtures.xml", None)]
	#[case("fixtures", None)]
	fn test_from_path(#[case] path: &str, #[case] expected: Option<SourceFormat>) {
		assert_eq!(SourceFormat::from_path(Path::new(path)), expected);
	}

	#[rstest]
	fn test_extension_round_trips() {
		for format in [SourceFormat::Yaml, SourceFormat::Json] {
			assert_eq!(SourceFormat::from_extension(format.extension()), Some(format));
		}
	}
}
