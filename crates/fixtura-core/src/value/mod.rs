//! Dynamic values carried by fixture definitions and built fixtures.
//!
//! Definitions hold [`Value`]s that may embed [`RelationshipToken`]s and
//! [`Deferred`] computations. Resolution replaces both with concrete values,
//! and builders may return host objects wrapped in [`ObjectRef`].

mod deferred;
mod markers;
mod object;
mod relationship;

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;

use crate::error::{FixtureError, FixtureResult};

pub use deferred::{ComputeFn, Deferred, format_delta, parse_delta};
pub use markers::{
	EPOCH_NOW_MARKER, EPOCH_NOW_MS_MARKER, NOW_MARKER, NOW_NAIVE_MARKER, REL_MARKER,
};
pub use object::{Frozen, Model, ObjectRef, Record};
pub use relationship::RelationshipToken;

/// Insertion-ordered string-keyed mapping.
pub type Mapping = IndexMap<String, Value>;

/// A value in a fixture definition or a built fixture.
#[derive(Debug, Clone, Default)]
pub enum Value {
	/// Absent value.
	#[default]
	Null,
	/// Boolean.
	Bool(bool),
	/// Signed integer.
	Integer(i64),
	/// Floating point number.
	Float(f64),
	/// UTF-8 string.
	String(String),
	/// Timezone-aware timestamp.
	DateTime(DateTime<Utc>),
	/// Timestamp without timezone.
	NaiveDateTime(NaiveDateTime),
	/// Ordered sequence.
	Sequence(Vec<Value>),
	/// Ordered mapping.
	Mapping(Mapping),
	/// Reference to another fixture, replaced during resolution.
	Relationship(RelationshipToken),
	/// Computation replaced during resolution.
	Deferred(Deferred),
	/// Host object returned by a builder.
	Object(ObjectRef),
}

impl Value {
	/// Shorthand for a relationship token value.
	pub fn relationship(path: impl Into<String>) -> Self {
		Self::Relationship(RelationshipToken::new(path))
	}

	/// Returns true for `Null`.
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Returns true for values that count as unset when inheriting:
	/// `Null`, the empty string, the empty sequence and the empty mapping.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Null => true,
			Self::String(s) => s.is_empty(),
			Self::Sequence(seq) => seq.is_empty(),
			Self::Mapping(map) => map.is_empty(),
			_ => false,
		}
	}

	/// Returns the string slice of a `String` value.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the integer of an `Integer` value.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Integer(i) => Some(*i),
			_ => None,
		}
	}

	/// Returns the float of a `Float` or `Integer` value.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Float(f) => Some(*f),
			Self::Integer(i) => Some(*i as f64),
			_ => None,
		}
	}

	/// Returns the boolean of a `Bool` value.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the mapping of a `Mapping` value.
	pub fn as_mapping(&self) -> Option<&Mapping> {
		match self {
			Self::Mapping(map) => Some(map),
			_ => None,
		}
	}

	/// Returns the mutable mapping of a `Mapping` value.
	pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
		match self {
			Self::Mapping(map) => Some(map),
			_ => None,
		}
	}

	/// Returns the elements of a `Sequence` value.
	pub fn as_sequence(&self) -> Option<&[Value]> {
		match self {
			Self::Sequence(seq) => Some(seq),
			_ => None,
		}
	}

	/// Returns the host object of an `Object` value.
	pub fn as_object(&self) -> Option<&ObjectRef> {
		match self {
			Self::Object(object) => Some(object),
			_ => None,
		}
	}

	/// Returns the token of a `Relationship` value.
	pub fn as_relationship(&self) -> Option<&RelationshipToken> {
		match self {
			Self::Relationship(token) => Some(token),
			_ => None,
		}
	}

	/// Reads an attribute off a built value.
	///
	/// Mappings are read by key, sequences by integer index and objects
	/// through [`Model::get_attribute`].
	pub fn get_attribute(&self, name: &str) -> Option<Value> {
		match self {
			Self::Mapping(map) => map.get(name).cloned(),
			Self::Sequence(seq) => name.parse::<usize>().ok().and_then(|i| seq.get(i).cloned()),
			Self::Object(object) => object.read().get_attribute(name),
			_ => None,
		}
	}

	/// Assigns an attribute onto a built value.
	///
	/// Mappings gain or replace a key; objects go through
	/// [`Model::set_attribute`]. Any other value cannot carry attributes.
	pub fn set_attribute(&mut self, name: &str, value: Value) -> FixtureResult<()> {
		match self {
			Self::Mapping(map) => {
				map.insert(name.to_string(), value);
				Ok(())
			}
			Self::Object(object) => object.write().set_attribute(name, value),
			other => Err(FixtureError::AttributeAssignment {
				attribute: name.to_string(),
				message: format!("{} values have no attributes", other.kind()),
			}),
		}
	}

	/// Replaces every deferred value, at any depth, with its concrete value.
	///
	/// # Errors
	///
	/// Fails if a time offset leaves the representable date range.
	pub fn resolve_deferred(
		&mut self,
		now: DateTime<Utc>,
		timezone_aware: bool,
	) -> FixtureResult<()> {
		match self {
			Self::Deferred(deferred) => *self = deferred.resolve(now, timezone_aware)?,
			Self::Sequence(seq) => {
				for item in seq {
					item.resolve_deferred(now, timezone_aware)?;
				}
			}
			Self::Mapping(map) => {
				for item in map.values_mut() {
					item.resolve_deferred(now, timezone_aware)?;
				}
			}
			_ => {}
		}
		Ok(())
	}

	/// Short name of the variant, used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "boolean",
			Self::Integer(_) => "integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::DateTime(_) => "datetime",
			Self::NaiveDateTime(_) => "naive datetime",
			Self::Sequence(_) => "sequence",
			Self::Mapping(_) => "mapping",
			Self::Relationship(_) => "relationship",
			Self::Deferred(_) => "deferred",
			Self::Object(_) => "object",
		}
	}

	/// Converts the value into JSON.
	///
	/// Relationship tokens and deferred values are rendered in the marker
	/// object form understood by the JSON loader (`{"$rel": "key"}`); host
	/// objects render through their `Debug` representation.
	pub fn to_json(&self) -> serde_json::Value {
		use serde_json::Value as Json;
		match self {
			Self::Null => Json::Null,
			Self::Bool(b) => Json::Bool(*b),
			Self::Integer(i) => Json::from(*i),
			Self::Float(f) => serde_json::Number::from_f64(*f)
				.map(Json::Number)
				.unwrap_or(Json::Null),
			Self::String(s) => Json::String(s.clone()),
			Self::DateTime(dt) => Json::String(dt.to_rfc3339()),
			Self::NaiveDateTime(dt) => Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
			Self::Sequence(seq) => Json::Array(seq.iter().map(Value::to_json).collect()),
			Self::Mapping(map) => Json::Object(
				map.iter()
					.map(|(k, v)| (k.clone(), v.to_json()))
					.collect(),
			),
			Self::Relationship(token) => serde_json::json!({ "$rel": token.path() }),
			Self::Deferred(deferred) => deferred.to_json(),
			Self::Object(object) => Json::String(format!("{:?}", object)),
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Integer(a), Self::Integer(b)) => a == b,
			(Self::Float(a), Self::Float(b)) => a == b,
			(Self::String(a), Self::String(b)) => a == b,
			(Self::DateTime(a), Self::DateTime(b)) => a == b,
			(Self::NaiveDateTime(a), Self::NaiveDateTime(b)) => a == b,
			(Self::Sequence(a), Self::Sequence(b)) => a == b,
			(Self::Mapping(a), Self::Mapping(b)) => a == b,
			(Self::Relationship(a), Self::Relationship(b)) => a == b,
			(Self::Deferred(a), Self::Deferred(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("null"),
			Self::Bool(b) => write!(f, "{}", b),
			Self::Integer(i) => write!(f, "{}", i),
			Self::Float(x) => write!(f, "{}", x),
			Self::String(s) => write!(f, "{:?}", s),
			Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
			Self::NaiveDateTime(dt) => write!(f, "{}", dt),
			Self::Sequence(seq) => {
				f.write_str("[")?;
				for (i, item) in seq.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}", item)?;
				}
				f.write_str("]")
			}
			Self::Mapping(map) => {
				f.write_str("{")?;
				for (i, (key, item)) in map.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{}: {}", key, item)?;
				}
				f.write_str("}")
			}
			Self::Relationship(token) => write!(f, "{}", token),
			Self::Deferred(deferred) => write!(f, "{:?}", deferred),
			Self::Object(object) => write!(f, "{:?}", object),
		}
	}
}

/// Overlays `overrides` onto `target`, merging nested mappings key by key
/// instead of replacing them.
///
/// # Example
///
/// ```
/// # use fixtura_core::value::{deep_update, Value};
/// # use serde_json::json;
/// let mut target = Value::from(json!({"hello": {"value": 1, "no_change": 1}}));
/// let overrides = Value::from(json!({"hello": {"value": 2}}));
/// deep_update(
///     target.as_mapping_mut().unwrap(),
///     overrides.as_mapping().unwrap(),
/// );
/// assert_eq!(target, Value::from(json!({"hello": {"value": 2, "no_change": 1}})));
/// ```
pub fn deep_update(target: &mut Mapping, overrides: &Mapping) {
	for (key, value) in overrides {
		match (target.get_mut(key), value) {
			(Some(Value::Mapping(existing)), Value::Mapping(nested)) if !nested.is_empty() => {
				deep_update(existing, nested);
			}
			_ => {
				target.insert(key.clone(), value.clone());
			}
		}
	}
}

impl From<serde_json::Value> for Value {
	fn from(json: serde_json::Value) -> Self {
		use serde_json::Value as Json;
		match json {
			Json::Null => Self::Null,
			Json::Bool(b) => Self::Bool(b),
			Json::Number(n) => match n.as_i64() {
				Some(i) => Self::Integer(i),
				None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			Json::String(s) => Self::String(s),
			Json::Array(items) => Self::Sequence(items.into_iter().map(Value::from).collect()),
			Json::Object(map) => Self::Mapping(
				map.into_iter()
					.map(|(k, v)| (k, Value::from(v)))
					.collect(),
			),
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Self::Integer(i)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Self::Integer(i64::from(i))
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Self::Float(f)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::String(s)
	}
}

impl From<Vec<Value>> for Value {
	fn from(seq: Vec<Value>) -> Self {
		Self::Sequence(seq)
	}
}

impl From<Mapping> for Value {
	fn from(map: Mapping) -> Self {
		Self::Mapping(map)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(dt: DateTime<Utc>) -> Self {
		Self::DateTime(dt)
	}
}

impl From<RelationshipToken> for Value {
	fn from(token: RelationshipToken) -> Self {
		Self::Relationship(token)
	}
}

impl From<Deferred> for Value {
	fn from(deferred: Deferred) -> Self {
		Self::Deferred(deferred)
	}
}

impl From<ObjectRef> for Value {
	fn from(object: ObjectRef) -> Self {
		Self::Object(object)
	}
}
