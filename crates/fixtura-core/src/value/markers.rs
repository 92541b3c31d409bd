//! JSON marker objects.
//!
//! JSON has no tags, so relationship and time markers are written as
//! single-key objects whose key starts with `$`:
//!
//! | Marker                         | Value                          |
//! |--------------------------------|--------------------------------|
//! | `{"$rel": "red_color"}`        | [`Value::Relationship`]        |
//! | `{"$now": "+1d"}`              | [`Deferred::Now`] (aware)      |
//! | `{"$now_naive": ""}`           | [`Deferred::Now`] (naive)      |
//! | `{"$epoch_now": "-1h"}`        | [`Deferred::EpochNow`]         |
//! | `{"$epoch_now_in_ms": null}`   | [`Deferred::EpochNowMs`]       |
//!
//! Any other object, including single-key objects with an unrecognized `$`
//! key, is an ordinary mapping.

use serde_json::Value as Json;

use super::{Deferred, Mapping, RelationshipToken, Value};
use crate::error::{FixtureError, FixtureResult};

/// Relationship marker key.
pub const REL_MARKER: &str = "$rel";
/// Aware current-time marker key.
pub const NOW_MARKER: &str = "$now";
/// Naive current-time marker key.
pub const NOW_NAIVE_MARKER: &str = "$now_naive";
/// Epoch seconds marker key.
pub const EPOCH_NOW_MARKER: &str = "$epoch_now";
/// Epoch milliseconds marker key.
pub const EPOCH_NOW_MS_MARKER: &str = "$epoch_now_in_ms";

impl Value {
	/// Converts JSON into a value, decoding marker objects.
	///
	/// # Errors
	///
	/// - [`FixtureError::InvalidFormat`] if a marker argument has the wrong type
	/// - [`FixtureError::InvalidDelta`] if a time offset is malformed
	///
	/// # Example
	///
	/// ```
	/// # use fixtura_core::value::{RelationshipToken, Value};
	/// # use serde_json::json;
	/// let value = Value::from_marked_json(json!({"color": {"$rel": "red_color"}})).unwrap();
	/// assert_eq!(
	///     value.get_attribute("color"),
	///     Some(Value::Relationship(RelationshipToken::new("red_color")))
	/// );
	/// ```
	pub fn from_marked_json(json: Json) -> FixtureResult<Self> {
		match json {
			Json::Array(items) => items
				.into_iter()
				.map(Self::from_marked_json)
				.collect::<FixtureResult<Vec<_>>>()
				.map(Self::Sequence),
			Json::Object(map) => {
				if map.len() == 1
					&& let Some((key, argument)) = map.iter().next()
					&& let Some(marker) = decode_marker(key, argument)
				{
					return marker;
				}
				map.into_iter()
					.map(|(k, v)| Self::from_marked_json(v).map(|v| (k, v)))
					.collect::<FixtureResult<Mapping>>()
					.map(Self::Mapping)
			}
			scalar => Ok(Self::from(scalar)),
		}
	}
}

fn decode_marker(key: &str, argument: &Json) -> Option<FixtureResult<Value>> {
	let decoded = match key {
		REL_MARKER => match argument {
			Json::String(path) => Ok(Value::Relationship(RelationshipToken::new(path.clone()))),
			other => Err(FixtureError::InvalidFormat(format!(
				"{} expects a string, found {}",
				REL_MARKER, other
			))),
		},
		NOW_MARKER => delta_text(key, argument)
			.and_then(Deferred::now)
			.map(Value::from),
		NOW_NAIVE_MARKER => delta_text(key, argument)
			.and_then(Deferred::now_naive)
			.map(Value::from),
		EPOCH_NOW_MARKER => delta_text(key, argument)
			.and_then(Deferred::epoch_now)
			.map(Value::from),
		EPOCH_NOW_MS_MARKER => delta_text(key, argument)
			.and_then(Deferred::epoch_now_ms)
			.map(Value::from),
		_ => return None,
	};
	Some(decoded)
}

fn delta_text<'a>(key: &str, argument: &'a Json) -> FixtureResult<&'a str> {
	match argument {
		Json::Null => Ok(""),
		Json::String(text) => Ok(text),
		other => Err(FixtureError::InvalidFormat(format!(
			"{} expects an offset string, found {}",
			key, other
		))),
	}
}
