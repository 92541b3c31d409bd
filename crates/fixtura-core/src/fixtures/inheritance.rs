//! Attribute inheritance between definitions.
//!
//! A definition names a parent through `inherit_from`; collection members
//! implicitly inherit from their collection. Inheritance is resolved once per
//! key when a set is loaded and memoized, so definitions themselves are never
//! mutated.

use std::collections::HashMap;

use crate::error::{FixtureError, FixtureResult};
use crate::value::{Mapping, Value, deep_update};

use super::FixtureSet;
use super::definition::{invalid, optional_string};

/// How mapping-valued attributes are combined with the parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
	/// Child keys replace parent keys one level deep.
	#[default]
	Shallow,
	/// Nested mappings are merged recursively.
	Deep,
}

/// The attributes that pass from parent to child.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Inheritable {
	pub(crate) model: Option<String>,
	pub(crate) fields: Value,
	pub(crate) post_creation: Mapping,
	pub(crate) depend_on: Vec<String>,
}

impl Inheritable {
	pub(crate) fn from_source(key: &str, map: &Mapping) -> FixtureResult<Self> {
		let post_creation = match map.get("post_creation") {
			None | Some(Value::Null) => Mapping::new(),
			Some(Value::Mapping(m)) => m.clone(),
			Some(other) => {
				return Err(invalid(
					key,
					format!("'post_creation' must be a mapping, found {}", other.kind()),
				));
			}
		};

		let depend_on = match map.get("depend_on") {
			None | Some(Value::Null) => Vec::new(),
			Some(Value::String(s)) => vec![s.clone()],
			Some(Value::Sequence(items)) => items
				.iter()
				.map(|item| {
					item.as_str().map(str::to_string).ok_or_else(|| {
						invalid(key, "'depend_on' entries must be strings".to_string())
					})
				})
				.collect::<FixtureResult<Vec<_>>>()?,
			Some(other) => {
				return Err(invalid(
					key,
					format!("'depend_on' must be a string or a list, found {}", other.kind()),
				));
			}
		};

		Ok(Self {
			model: optional_string(key, map, "model")?,
			fields: map.get("fields").cloned().unwrap_or_default(),
			post_creation,
			depend_on,
		})
	}

	/// Fills unset attributes of `self` from `parent`.
	///
	/// Model: the child's wins when set. Fields and post-creation: an empty
	/// child takes the parent's value, a mapping child is laid over the
	/// parent's mapping, anything else wins outright. Dependencies: an empty
	/// child list takes the parent's list.
	pub fn inherit(&self, parent: &Self, mode: MergeMode) -> Self {
		let post_creation = match merge_value(
			&Value::Mapping(self.post_creation.clone()),
			&Value::Mapping(parent.post_creation.clone()),
			mode,
		) {
			Value::Mapping(map) => map,
			_ => Mapping::new(),
		};

		Self {
			model: self.model.clone().or_else(|| parent.model.clone()),
			fields: merge_value(&self.fields, &parent.fields, mode),
			post_creation,
			depend_on: if self.depend_on.is_empty() {
				parent.depend_on.clone()
			} else {
				self.depend_on.clone()
			},
		}
	}
}

fn merge_value(child: &Value, parent: &Value, mode: MergeMode) -> Value {
	if child.is_empty() {
		return parent.clone();
	}
	match (child, parent) {
		(Value::Mapping(child_map), Value::Mapping(parent_map)) => {
			let mut merged = parent_map.clone();
			match mode {
				MergeMode::Shallow => {
					for (k, v) in child_map {
						merged.insert(k.clone(), v.clone());
					}
				}
				MergeMode::Deep => deep_update(&mut merged, child_map),
			}
			Value::Mapping(merged)
		}
		_ => child.clone(),
	}
}

/// A definition with inheritance applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDefinition {
	/// Fully qualified key.
	pub key: String,
	/// Effective model reference.
	pub model: Option<String>,
	/// Effective fields.
	pub fields: Value,
	/// Effective post-creation assignments.
	pub post_creation: Mapping,
	/// Effective explicit dependencies.
	pub depend_on: Vec<String>,
	/// Explicit identifier. Never inherited.
	pub id: Option<Value>,
}

/// Memoizing inheritance resolver over a [`FixtureSet`].
pub struct InheritanceResolver<'a> {
	set: &'a FixtureSet,
	mode: MergeMode,
	resolved: HashMap<String, Inheritable>,
}

impl<'a> InheritanceResolver<'a> {
	/// Creates a resolver over `set`.
	pub fn new(set: &'a FixtureSet, mode: MergeMode) -> Self {
		Self {
			set,
			mode,
			resolved: HashMap::new(),
		}
	}

	/// Effective inheritable attributes for `key`.
	///
	/// # Errors
	///
	/// - [`FixtureError::NoSuchFixture`] if `key` is unknown
	/// - [`FixtureError::InheritanceTargetNotFound`] if a parent is unknown
	/// - [`FixtureError::InheritanceCycle`] if the parent chain loops
	pub fn resolve(&mut self, key: &str) -> FixtureResult<Inheritable> {
		let mut chain = Vec::new();
		self.resolve_chain(key, &mut chain)
	}

	/// Effective definition for a fixture or collection member.
	pub fn resolve_definition(&mut self, key: &str) -> FixtureResult<ResolvedDefinition> {
		let set = self.set;
		let definition = set
			.definition(key)
			.ok_or_else(|| FixtureError::NoSuchFixture(key.to_string()))?;
		let attrs = self.resolve(key)?;
		Ok(ResolvedDefinition {
			key: key.to_string(),
			model: attrs.model,
			fields: attrs.fields,
			post_creation: attrs.post_creation,
			depend_on: attrs.depend_on,
			id: definition.id().cloned(),
		})
	}

	fn resolve_chain(&mut self, key: &str, chain: &mut Vec<String>) -> FixtureResult<Inheritable> {
		if let Some(done) = self.resolved.get(key) {
			return Ok(done.clone());
		}
		if chain.iter().any(|k| k == key) {
			return Err(FixtureError::InheritanceCycle(key.to_string()));
		}

		let set = self.set;
		let (attrs, parent) = set
			.inheritable(key)
			.ok_or_else(|| FixtureError::NoSuchFixture(key.to_string()))?;

		let merged = match parent {
			None => attrs.clone(),
			Some(parent) => {
				if set.inheritable(parent).is_none() {
					return Err(FixtureError::InheritanceTargetNotFound {
						key: key.to_string(),
						parent: parent.to_string(),
					});
				}
				chain.push(key.to_string());
				let parent_attrs = self.resolve_chain(parent, chain)?;
				chain.pop();
				attrs.inherit(&parent_attrs, self.mode)
			}
		};

		self.resolved.insert(key.to_string(), merged.clone());
		Ok(merged)
	}
}
