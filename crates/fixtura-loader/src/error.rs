//! Error types for the loader.

use fixtura_core::FixtureError;
use thiserror::Error;

/// Errors raised while reading definition sources.
#[derive(Debug, Error)]
pub enum LoaderError {
	/// Source file does not exist.
	#[error("Fixture file not found: {0}")]
	FileNotFound(String),

	/// File extension does not name a supported format.
	#[error("Unsupported file extension: {0}")]
	UnsupportedExtension(String),

	/// Source content is not a valid definition document.
	#[error("Parse error: {0}")]
	Parse(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON syntax error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// YAML syntax error.
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	/// The parsed definitions were rejected by the engine.
	#[error(transparent)]
	Fixture(#[from] FixtureError),
}

/// Result type alias for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
