//! Single fixture definitions.

use crate::error::{FixtureError, FixtureResult};
use crate::value::{Mapping, Value};

use super::inheritance::Inheritable;

/// Source keys accepted in a fixture definition.
pub(crate) const FIXTURE_KEYS: &[&str] = &[
	"model",
	"fields",
	"post_creation",
	"id",
	"inherit_from",
	"depend_on",
];

/// A named, declarative description of one object to build.
///
/// # Example
///
/// ```
/// # use fixtura_core::fixtures::FixtureDefinition;
/// # use fixtura_core::value::Value;
/// let toaster = FixtureDefinition::new("toaster")
///     .with_model("Toaster")
///     .with_field("slots", 2)
///     .with_field("color", Value::relationship("red_color"));
///
/// assert_eq!(toaster.key(), "toaster");
/// assert_eq!(toaster.model(), Some("Toaster"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDefinition {
	key: String,
	attrs: Inheritable,
	id: Option<Value>,
	inherit_from: Option<String>,
}

impl FixtureDefinition {
	/// Creates an empty definition under `key`.
	pub fn new(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			attrs: Inheritable::default(),
			id: None,
			inherit_from: None,
		}
	}

	/// Sets the model reference handed to the builder.
	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.attrs.model = Some(model.into());
		self
	}

	/// Replaces the whole field value (a mapping or a sequence).
	pub fn with_fields(mut self, fields: impl Into<Value>) -> Self {
		self.attrs.fields = fields.into();
		self
	}

	/// Sets a single field, turning the fields into a mapping if needed.
	pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		if !matches!(self.attrs.fields, Value::Mapping(_)) {
			self.attrs.fields = Value::Mapping(Mapping::new());
		}
		if let Value::Mapping(map) = &mut self.attrs.fields {
			map.insert(name.into(), value.into());
		}
		self
	}

	/// Adds an attribute assignment applied after construction.
	pub fn with_post_creation(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attrs.post_creation.insert(name.into(), value.into());
		self
	}

	/// Fetches an existing instance by identifier instead of constructing one.
	pub fn with_id(mut self, id: impl Into<Value>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Names the definition whose attributes fill in unset ones here.
	pub fn inherit_from(mut self, parent: impl Into<String>) -> Self {
		self.inherit_from = Some(parent.into());
		self
	}

	/// Adds a fixture that must be built first.
	pub fn depend_on(mut self, key: impl Into<String>) -> Self {
		self.attrs.depend_on.push(key.into());
		self
	}

	/// Parses a definition from its source mapping.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidDefinition`] for unknown keys, values of
	/// the wrong shape, or when both `id` and `fields` are given.
	pub fn from_source(key: impl Into<String>, source: &Value) -> FixtureResult<Self> {
		let key = key.into();
		let map = match source {
			Value::Mapping(map) => map,
			Value::Null => {
				return Ok(Self::new(key));
			}
			other => {
				return Err(invalid(
					&key,
					format!("expected a mapping, found {}", other.kind()),
				));
			}
		};

		if let Some(unknown) = map.keys().find(|k| !FIXTURE_KEYS.contains(&k.as_str())) {
			return Err(invalid(&key, format!("unknown attribute '{}'", unknown)));
		}

		let definition = Self {
			attrs: Inheritable::from_source(&key, map)?,
			id: map.get("id").filter(|v| !v.is_null()).cloned(),
			inherit_from: optional_string(&key, map, "inherit_from")?,
			key,
		};
		definition.validate()?;
		Ok(definition)
	}

	/// Checks the definition's invariants.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidDefinition`] if both `id` and `fields`
	/// are set, or if `fields` is neither a mapping nor a sequence.
	pub fn validate(&self) -> FixtureResult<()> {
		if self.id.is_some() && !self.attrs.fields.is_empty() {
			return Err(invalid(
				&self.key,
				"cannot provide both id and fields".to_string(),
			));
		}
		match &self.attrs.fields {
			Value::Null | Value::Mapping(_) | Value::Sequence(_) => Ok(()),
			other => Err(invalid(
				&self.key,
				format!("fields must be a mapping or a sequence, found {}", other.kind()),
			)),
		}
	}

	/// Fully qualified key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Declared model reference, before inheritance.
	pub fn model(&self) -> Option<&str> {
		self.attrs.model.as_deref()
	}

	/// Declared fields, before inheritance.
	pub fn fields(&self) -> &Value {
		&self.attrs.fields
	}

	/// Declared post-creation assignments, before inheritance.
	pub fn post_creation(&self) -> &Mapping {
		&self.attrs.post_creation
	}

	/// Explicit identifier, if any.
	pub fn id(&self) -> Option<&Value> {
		self.id.as_ref()
	}

	/// Parent key, if any.
	pub fn parent(&self) -> Option<&str> {
		self.inherit_from.as_deref()
	}

	/// Declared extra dependencies, before inheritance.
	pub fn dependencies(&self) -> &[String] {
		&self.attrs.depend_on
	}

	pub(crate) fn attrs(&self) -> &Inheritable {
		&self.attrs
	}

	pub(crate) fn set_default_parent(&mut self, parent: &str) {
		if self.inherit_from.is_none() {
			self.inherit_from = Some(parent.to_string());
		}
	}
}

pub(crate) fn invalid(key: &str, message: String) -> FixtureError {
	FixtureError::InvalidDefinition {
		key: key.to_string(),
		message,
	}
}

pub(crate) fn optional_string(
	key: &str,
	map: &Mapping,
	name: &str,
) -> FixtureResult<Option<String>> {
	match map.get(name) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) => Ok(Some(s.clone())),
		Some(other) => Err(invalid(
			key,
			format!("'{}' must be a string, found {}", name, other.kind()),
		)),
	}
}
