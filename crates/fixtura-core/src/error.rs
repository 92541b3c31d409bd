//! Error types for fixture resolution.
//!
//! This module defines the error types used throughout the fixtura-core crate.

use thiserror::Error;

/// Errors that can occur while loading, resolving, installing or
/// uninstalling fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// The dependency graph contains a cycle.
	#[error("Cycle detected between fixtures: {}", .nodes.join(", "))]
	CycleDetected {
		/// Nodes still carrying unresolved edges when the sort stopped.
		nodes: Vec<String>,
	},

	/// No fixture is registered under the requested key or path segment.
	#[error("No such fixture: {0}")]
	NoSuchFixture(String),

	/// A fixture definition is malformed.
	#[error("Invalid definition for '{key}': {message}")]
	InvalidDefinition {
		/// Key of the offending definition.
		key: String,
		/// What is wrong with it.
		message: String,
	},

	/// An unsupported aggregate format or source shape was requested.
	#[error("Invalid format: {0}")]
	InvalidFormat(String),

	/// The parent named by `inherit_from` does not exist.
	#[error("Fixture '{key}' inherits from unknown fixture '{parent}'")]
	InheritanceTargetNotFound {
		/// Key of the inheriting definition.
		key: String,
		/// The missing parent key.
		parent: String,
	},

	/// `inherit_from` chains loop back on themselves.
	#[error("Inheritance cycle detected at fixture '{0}'")]
	InheritanceCycle(String),

	/// A fixture was requested while it was already being built.
	#[error("Fixture requested while being built: {}", .0.join(" -> "))]
	ResolutionCycle(Vec<String>),

	/// The builder failed to construct an instance.
	#[error("Error while building {model} with {fields}: {source}")]
	Construction {
		/// Model reference that was being built.
		model: String,
		/// Rendered field mapping handed to the builder.
		fields: String,
		/// Underlying failure.
		#[source]
		source: Box<FixtureError>,
	},

	/// No factory is registered for a model reference.
	#[error("Model not found: {0}")]
	ModelNotFound(String),

	/// The factory for a model cannot fetch instances by identifier.
	#[error("Model '{0}' does not support fetching by id")]
	FetchUnsupported(String),

	/// An attribute referenced by a relationship does not exist on the
	/// resolved instance.
	#[error("Fixture '{key}' has no attribute '{attribute}'")]
	AttributeNotFound {
		/// Fixture key the attribute was read from.
		key: String,
		/// Missing attribute name.
		attribute: String,
	},

	/// Relationship paths may only reach one attribute deep.
	#[error("Unsupported attribute path in relationship: {0}")]
	UnsupportedAttributePath(String),

	/// Assigning an attribute onto a built value failed.
	#[error("Cannot assign attribute '{attribute}': {message}")]
	AttributeAssignment {
		/// Attribute name.
		attribute: String,
		/// Why the assignment failed.
		message: String,
	},

	/// Uninstall was asked for a path below a fixture, such as an attribute
	/// or an aggregate format.
	#[error("Only fixtures and collection members can be uninstalled, not '{0}'")]
	NotUninstallable(String),

	/// A hook name outside the allow-list was used.
	#[error("'{0}' is not an allowed hook")]
	UnknownHook(String),

	/// A hook was registered twice.
	#[error("Hook '{0}' is already set")]
	HookAlreadySet(String),

	/// A time offset could not be parsed.
	#[error("Invalid time delta: {0}")]
	InvalidDelta(String),

	/// Configuration could not be read.
	#[error("Configuration error: {0}")]
	Config(String),

	/// Free-form failure raised by a host factory or builder.
	#[error("Builder error: {0}")]
	Builder(String),
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_no_such_fixture_error() {
		let error = FixtureError::NoSuchFixture("toaster".to_string());
		assert_eq!(error.to_string(), "No such fixture: toaster");
	}

	#[rstest]
	fn test_cycle_detected_lists_nodes() {
		let error = FixtureError::CycleDetected {
			nodes: vec!["a".to_string(), "d".to_string()],
		};
		assert_eq!(error.to_string(), "Cycle detected between fixtures: a, d");
	}

	#[rstest]
	fn test_construction_error_keeps_source() {
		let error = FixtureError::Construction {
			model: "Toaster".to_string(),
			fields: "{slots: 2}".to_string(),
			source: Box::new(FixtureError::Builder("missing color".to_string())),
		};
		assert_eq!(
			error.to_string(),
			"Error while building Toaster with {slots: 2}: Builder error: missing color"
		);
		assert!(std::error::Error::source(&error).is_some());
	}

	#[rstest]
	fn test_resolution_cycle_renders_path() {
		let error = FixtureError::ResolutionCycle(vec!["a".to_string(), "b".to_string()]);
		assert_eq!(error.to_string(), "Fixture requested while being built: a -> b");
	}
}
