//! YAML documents with fixture tags.
//!
//! | Tag                 | Argument              | Value                     |
//! |---------------------|-----------------------|---------------------------|
//! | `!rel`              | dotted path           | relationship token        |
//! | `!now`              | offset, may be empty  | aware current time        |
//! | `!now_naive`        | offset, may be empty  | naive current time        |
//! | `!epoch_now`        | offset, may be empty  | epoch seconds             |
//! | `!epoch_now_in_ms`  | offset, may be empty  | epoch milliseconds        |

use fixtura_core::value::{Deferred, RelationshipToken};
use fixtura_core::{FixtureResult, Mapping, Value};
use serde_yaml::Value as Yaml;
use serde_yaml::value::TaggedValue;

use crate::error::{LoaderError, LoaderResult};

/// Parses a YAML document into top-level definitions.
pub(crate) fn parse(content: &str) -> LoaderResult<Mapping> {
	let document: Yaml = serde_yaml::from_str(content)?;
	match convert(document)? {
		Value::Null => Ok(Mapping::new()),
		Value::Mapping(definitions) => Ok(definitions),
		other => Err(LoaderError::Parse(format!(
			"expected a mapping of fixture definitions, found {}",
			other.kind()
		))),
	}
}

/// Converts a YAML node, decoding fixture tags.
pub(crate) fn convert(node: Yaml) -> LoaderResult<Value> {
	Ok(match node {
		Yaml::Null => Value::Null,
		Yaml::Bool(b) => Value::Bool(b),
		Yaml::Number(n) => {
			if let Some(i) = n.as_i64() {
				Value::Integer(i)
			} else {
				Value::Float(n.as_f64().unwrap_or(f64::NAN))
			}
		}
		Yaml::String(s) => Value::String(s),
		Yaml::Sequence(items) => Value::Sequence(
			items
				.into_iter()
				.map(convert)
				.collect::<LoaderResult<Vec<_>>>()?,
		),
		Yaml::Mapping(map) => {
			let mut mapping = Mapping::with_capacity(map.len());
			for (key, value) in map {
				mapping.insert(mapping_key(key)?, convert(value)?);
			}
			Value::Mapping(mapping)
		}
		Yaml::Tagged(tagged) => decode_tag(*tagged)?,
	})
}

fn mapping_key(key: Yaml) -> LoaderResult<String> {
	match key {
		Yaml::String(s) => Ok(s),
		Yaml::Number(n) => Ok(n.to_string()),
		Yaml::Bool(b) => Ok(b.to_string()),
		other => Err(LoaderError::Parse(format!(
			"mapping keys must be scalars, found {:?}",
			other
		))),
	}
}

fn decode_tag(tagged: TaggedValue) -> LoaderResult<Value> {
	let tag = tagged.tag.to_string();
	let name = tag.trim_start_matches('!');
	let deferred: fn(&str) -> FixtureResult<Deferred> = match name {
		"rel" => {
			return match tagged.value {
				Yaml::String(path) => Ok(Value::Relationship(RelationshipToken::new(path))),
				other => Err(LoaderError::Parse(format!(
					"!rel expects a string path, found {:?}",
					other
				))),
			};
		}
		"now" => Deferred::now,
		"now_naive" => Deferred::now_naive,
		"epoch_now" => Deferred::epoch_now,
		"epoch_now_in_ms" => Deferred::epoch_now_ms,
		_ => return Err(LoaderError::Parse(format!("unknown tag {}", tag))),
	};

	let offset = match &tagged.value {
		Yaml::Null => "",
		Yaml::String(text) => text.as_str(),
		other => {
			return Err(LoaderError::Parse(format!(
				"{} expects an offset string, found {:?}",
				tag, other
			)));
		}
	};
	Ok(Value::Deferred(deferred(offset)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use fixtura_core::FixtureError;
	use rstest::rstest;

	#[rstest]
	fn test_rel_tag_becomes_token() {
		// Arrange
		let content = "toaster:\n  model: Toaster\n  fields:\n    color: !rel red_color\n";

		// Act
		let definitions = parse(content).unwrap();

		// Assert
		let fields = definitions["toaster"].get_attribute("fields").unwrap();
		assert_eq!(
			fields.get_attribute("color"),
			Some(Value::Relationship(RelationshipToken::new("red_color")))
		);
	}

	#[rstest]
	#[case("!now '+1d'", Deferred::now("+1d").unwrap())]
	#[case("!now_naive ''", Deferred::now_naive("").unwrap())]
	#[case("!epoch_now '-1h'", Deferred::epoch_now("-1h").unwrap())]
	#[case("!epoch_now_in_ms", Deferred::epoch_now_ms("").unwrap())]
	fn test_time_tags(#[case] node: &str, #[case] expected: Deferred) {
		let definitions = parse(&format!("x:\n  fields:\n    at: {}\n", node)).unwrap();
		let fields = definitions["x"].get_attribute("fields").unwrap();
		assert_eq!(fields.get_attribute("at"), Some(Value::Deferred(expected)));
	}

	#[rstest]
	fn test_unknown_tag_is_parse_error() {
		let result = parse("x:\n  fields:\n    a: !color red\n");
		assert!(matches!(result, Err(LoaderError::Parse(msg)) if msg.contains("!color")));
	}

	#[rstest]
	fn test_bad_offset_is_fixture_error() {
		let result = parse("x:\n  fields:\n    a: !now soon\n");
		assert!(matches!(
			result,
			Err(LoaderError::Fixture(FixtureError::InvalidDelta(_)))
		));
	}

	#[rstest]
	fn test_top_level_must_be_mapping() {
		assert!(matches!(parse("- a\n- b\n"), Err(LoaderError::Parse(_))));
		assert!(parse("").unwrap().is_empty());
	}

	#[rstest]
	fn test_numeric_keys_and_scalars() {
		let definitions = parse("x:\n  fields:\n    1: 2.5\n    on: true\n").unwrap();
		let fields = definitions["x"].get_attribute("fields").unwrap();
		assert_eq!(fields.get_attribute("1"), Some(Value::Float(2.5)));
		assert_eq!(fields.get_attribute("on"), Some(Value::Bool(true)));
	}
}
