//! Definition source parsing.
//!
//! This module reads fixture definition files in YAML and JSON formats.

use std::path::Path;

use fixtura_core::{Mapping, Value};

use crate::error::{LoaderError, LoaderResult};
use crate::format::{SourceDocument, SourceFormat};

/// Parser for definition sources.
///
/// Supports YAML (requires the `yaml` feature) and JSON (requires the `json`
/// feature).
#[derive(Debug, Default)]
pub struct SourceParser;

impl SourceParser {
	/// Creates a new parser.
	pub fn new() -> Self {
		Self
	}

	/// Parses a definition file.
	///
	/// The format is detected from the file extension.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The file extension is not recognized
	/// - The file does not exist or cannot be read
	/// - The content is not a mapping of definitions
	pub fn parse_file(&self, path: &Path) -> LoaderResult<SourceDocument> {
		let format = SourceFormat::from_path(path).ok_or_else(|| {
			LoaderError::UnsupportedExtension(
				path.extension()
					.and_then(|e| e.to_str())
					.unwrap_or("(none)")
					.to_string(),
			)
		})?;

		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				LoaderError::FileNotFound(path.display().to_string())
			} else {
				LoaderError::Io(e)
			}
		})?;

		let document = self
			.parse_str(&content, format)?
			.with_source(path.display().to_string());
		tracing::debug!(
			path = %path.display(),
			%format,
			definitions = document.len(),
			"Parsed fixture source"
		);
		Ok(document)
	}

	/// Parses definitions from a string.
	pub fn parse_str(&self, content: &str, format: SourceFormat) -> LoaderResult<SourceDocument> {
		let definitions = match format {
			SourceFormat::Yaml => self.parse_yaml(content)?,
			SourceFormat::Json => self.parse_json(content)?,
		};
		Ok(SourceDocument::new(definitions, format))
	}

	/// Parses several files into one document.
	///
	/// # Errors
	///
	/// Besides the errors of [`parse_file`](Self::parse_file), a key defined
	/// in more than one file is rejected.
	pub fn parse_files(&self, paths: &[&Path]) -> LoaderResult<SourceDocument> {
		let format = paths
			.first()
			.and_then(|p| SourceFormat::from_path(p))
			.unwrap_or_default();

		let mut definitions = Mapping::new();
		for path in paths {
			let document = self.parse_file(path)?;
			for (key, definition) in document.definitions {
				if definitions.contains_key(&key) {
					return Err(LoaderError::Parse(format!(
						"fixture '{}' in {} is already defined",
						key,
						path.display()
					)));
				}
				definitions.insert(key, definition);
			}
		}

		Ok(SourceDocument::new(definitions, format))
	}

	#[cfg(feature = "json")]
	fn parse_json(&self, content: &str) -> LoaderResult<Mapping> {
		let json: serde_json::Value = serde_json::from_str(content)?;
		match Value::from_marked_json(json)? {
			Value::Null => Ok(Mapping::new()),
			Value::Mapping(definitions) => Ok(definitions),
			other => Err(LoaderError::Parse(format!(
				"expected a mapping of fixture definitions, found {}",
				other.kind()
			))),
		}
	}

	/// Stub for JSON parsing when the feature is not enabled.
	#[cfg(not(feature = "json"))]
	fn parse_json(&self, _content: &str) -> LoaderResult<Mapping> {
		Err(LoaderError::UnsupportedExtension(
			"JSON support requires the 'json' feature".to_string(),
		))
	}

	#[cfg(feature = "yaml")]
	fn parse_yaml(&self, content: &str) -> LoaderResult<Mapping> {
		crate::yaml::parse(content)
	}

	/// Stub for YAML parsing when the feature is not enabled.
	#[cfg(not(feature = "yaml"))]
	fn parse_yaml(&self, _content: &str) -> LoaderResult<Mapping> {
		Err(LoaderError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}
}
