//! Relationship discovery and substitution in field values.
//!
//! Tokens are recognized as direct values of the fields container and as
//! elements of sequences one level below it. Tokens nested deeper are left
//! untouched.

use crate::error::FixtureResult;
use crate::value::{RelationshipToken, Value};

/// Collects the relationship tokens in `fields`.
pub fn extract_relationships(fields: &Value) -> Vec<&RelationshipToken> {
	let mut tokens = Vec::new();
	for_each_slot(fields, |value| {
		if let Value::Relationship(token) = value {
			tokens.push(token);
		}
	});
	tokens
}

/// Collects the tokens in a single slot: the value itself, or the elements
/// of a sequence.
pub fn slot_relationships(value: &Value) -> Vec<&RelationshipToken> {
	match value {
		Value::Relationship(token) => vec![token],
		Value::Sequence(items) => items.iter().filter_map(Value::as_relationship).collect(),
		_ => Vec::new(),
	}
}

fn for_each_slot<'a>(fields: &'a Value, mut visit: impl FnMut(&'a Value)) {
	let top: Box<dyn Iterator<Item = &'a Value> + 'a> = match fields {
		Value::Mapping(map) => Box::new(map.values()),
		Value::Sequence(items) => Box::new(items.iter()),
		_ => return,
	};
	for value in top {
		match value {
			Value::Sequence(items) => items.iter().for_each(&mut visit),
			other => visit(other),
		}
	}
}

/// Replaces every recognized token in `fields` with the value returned by
/// `resolve`.
pub fn substitute_relationships(
	fields: &mut Value,
	mut resolve: impl FnMut(&RelationshipToken) -> FixtureResult<Value>,
) -> FixtureResult<()> {
	let top: Vec<&mut Value> = match fields {
		Value::Mapping(map) => map.values_mut().collect(),
		Value::Sequence(items) => items.iter_mut().collect(),
		_ => return Ok(()),
	};
	for value in top {
		substitute_slot(value, &mut resolve)?;
	}
	Ok(())
}

/// Replaces `value` if it is a token, or its token elements if it is a
/// sequence.
pub fn substitute_slot(
	value: &mut Value,
	resolve: &mut impl FnMut(&RelationshipToken) -> FixtureResult<Value>,
) -> FixtureResult<()> {
	match value {
		Value::Relationship(token) => {
			*value = resolve(token)?;
		}
		Value::Sequence(items) => {
			for item in items.iter_mut() {
				if let Value::Relationship(token) = item {
					*item = resolve(token)?;
				}
			}
		}
		_ => {}
	}
	Ok(())
}

/// Removes every slot holding a recognized token: a token value, or a
/// sequence with a token among its elements, is dropped as a whole.
pub fn strip_relationships(fields: &mut Value) {
	match fields {
		Value::Mapping(map) => map.retain(|_, value| slot_relationships(value).is_empty()),
		Value::Sequence(items) => items.retain(|value| slot_relationships(value).is_empty()),
		_ => {}
	}
}
