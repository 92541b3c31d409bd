//! Fixture definitions and the set that holds them.
//!
//! A [`FixtureSet`] is the parsed form of a fixture source: root keys map to
//! either a single [`FixtureDefinition`] or a [`FixtureCollection`]. The set
//! answers key lookups and splits relationship paths into a fixture key and an
//! optional attribute.
//!
//! ## Source shape
//!
//! ```yaml
//! red_color:
//!   model: Color
//!   fields: {name: red}
//! toasters:
//!   model: Toaster
//!   objects:
//!     small: {slots: 2, color: !rel red_color}
//!     big:
//!       fields: {slots: 4}
//!       post_creation: {label: large}
//! ```

mod collection;
mod definition;
mod inheritance;
mod relationships;

pub use collection::{AggregateFormat, CollectionKind, FixtureCollection};
pub use definition::FixtureDefinition;
pub use inheritance::{Inheritable, InheritanceResolver, MergeMode, ResolvedDefinition};
pub use relationships::{
	extract_relationships, slot_relationships, strip_relationships, substitute_relationships,
	substitute_slot,
};

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{FixtureError, FixtureResult};
use crate::value::{Mapping, Value};

/// A root entry of a [`FixtureSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureNode {
	/// A single definition.
	Fixture(FixtureDefinition),
	/// A group of definitions.
	Collection(FixtureCollection),
}

/// Borrowed view of anything addressable by key.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
	/// A root fixture or a collection member.
	Fixture(&'a FixtureDefinition),
	/// A collection.
	Collection(&'a FixtureCollection),
}

/// Parsed fixture definitions keyed by root name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureSet {
	roots: IndexMap<String, FixtureNode>,
	/// Qualified member key to owning collection key.
	members: HashMap<String, String>,
}

impl FixtureSet {
	/// Creates an empty set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses every root entry of `source`.
	///
	/// Entries with an `objects` key become collections, all others single
	/// definitions.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidDefinition`] for malformed entries.
	pub fn from_source(source: &Mapping) -> FixtureResult<Self> {
		let mut set = Self::new();
		for (key, entry) in source {
			match entry {
				Value::Mapping(map) if map.contains_key("objects") => {
					set.insert_collection(FixtureCollection::from_source(key.clone(), map)?)?;
				}
				_ => set.insert_fixture(FixtureDefinition::from_source(key.clone(), entry)?)?,
			}
		}
		Ok(set)
	}

	/// Like [`from_source`](Self::from_source), for a value that must be a
	/// mapping.
	pub fn from_value(source: &Value) -> FixtureResult<Self> {
		match source {
			Value::Mapping(map) => Self::from_source(map),
			Value::Null => Ok(Self::new()),
			other => Err(FixtureError::InvalidFormat(format!(
				"fixture source must be a mapping, found {}",
				other.kind()
			))),
		}
	}

	/// Adds a root definition.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidDefinition`] if the definition is
	/// invalid or its key is taken.
	pub fn insert_fixture(&mut self, definition: FixtureDefinition) -> FixtureResult<()> {
		definition.validate()?;
		self.ensure_free(definition.key())?;
		self.roots.insert(
			definition.key().to_string(),
			FixtureNode::Fixture(definition),
		);
		Ok(())
	}

	/// Adds a collection and registers its members.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::InvalidDefinition`] if a member is invalid or
	/// any key is taken.
	pub fn insert_collection(&mut self, collection: FixtureCollection) -> FixtureResult<()> {
		self.ensure_free(collection.key())?;
		for member in collection.members() {
			member.validate()?;
			self.ensure_free(member.key())?;
		}
		for member in collection.members() {
			self.members
				.insert(member.key().to_string(), collection.key().to_string());
		}
		self.roots.insert(
			collection.key().to_string(),
			FixtureNode::Collection(collection),
		);
		Ok(())
	}

	fn ensure_free(&self, key: &str) -> FixtureResult<()> {
		if self.contains(key) {
			return Err(FixtureError::InvalidDefinition {
				key: key.to_string(),
				message: "duplicate fixture key".to_string(),
			});
		}
		Ok(())
	}

	/// Root keys in declaration order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.roots.keys().map(String::as_str)
	}

	/// Every addressable key: root keys in declaration order, each collection
	/// followed by its members.
	pub fn all_keys(&self) -> Vec<String> {
		let mut keys = Vec::with_capacity(self.roots.len() + self.members.len());
		for (key, node) in &self.roots {
			keys.push(key.clone());
			if let FixtureNode::Collection(collection) = node {
				keys.extend(collection.member_keys());
			}
		}
		keys
	}

	/// Number of root entries.
	pub fn len(&self) -> usize {
		self.roots.len()
	}

	/// Returns true if the set has no entries.
	pub fn is_empty(&self) -> bool {
		self.roots.is_empty()
	}

	/// Returns true if `key` names a root entry or a collection member.
	pub fn contains(&self, key: &str) -> bool {
		self.roots.contains_key(key) || self.members.contains_key(key)
	}

	/// Looks up anything addressable by its exact key.
	pub fn entry(&self, key: &str) -> Option<Entry<'_>> {
		if let Some(node) = self.roots.get(key) {
			return Some(match node {
				FixtureNode::Fixture(definition) => Entry::Fixture(definition),
				FixtureNode::Collection(collection) => Entry::Collection(collection),
			});
		}
		self.member(key).map(Entry::Fixture)
	}

	/// The root fixture or collection member stored under `key`.
	pub fn definition(&self, key: &str) -> Option<&FixtureDefinition> {
		match self.entry(key)? {
			Entry::Fixture(definition) => Some(definition),
			Entry::Collection(_) => None,
		}
	}

	/// The collection stored under `key`.
	pub fn collection(&self, key: &str) -> Option<&FixtureCollection> {
		match self.roots.get(key)? {
			FixtureNode::Collection(collection) => Some(collection),
			FixtureNode::Fixture(_) => None,
		}
	}

	/// Every single definition: root fixtures and collection members.
	pub fn definitions(&self) -> impl Iterator<Item = &FixtureDefinition> {
		let mut definitions = Vec::with_capacity(self.roots.len() + self.members.len());
		for node in self.roots.values() {
			match node {
				FixtureNode::Fixture(definition) => definitions.push(definition),
				FixtureNode::Collection(collection) => definitions.extend(collection.members()),
			}
		}
		definitions.into_iter()
	}

	/// Every collection.
	pub fn collections(&self) -> impl Iterator<Item = &FixtureCollection> {
		self.roots.values().filter_map(|node| match node {
			FixtureNode::Collection(collection) => Some(collection),
			FixtureNode::Fixture(_) => None,
		})
	}

	fn member(&self, key: &str) -> Option<&FixtureDefinition> {
		let collection = self.collection(self.members.get(key)?)?;
		let name = key.strip_prefix(collection.key())?.strip_prefix('.')?;
		collection.get(name).ok().map(|(definition, _)| definition)
	}

	pub(crate) fn inheritable(&self, key: &str) -> Option<(&Inheritable, Option<&str>)> {
		match self.entry(key)? {
			Entry::Fixture(definition) => Some((definition.attrs(), definition.parent())),
			Entry::Collection(collection) => Some((collection.attrs(), collection.parent())),
		}
	}

	/// Finds the longest known key that prefixes `path` on a segment
	/// boundary, and returns it with the rest of the path.
	pub fn locate<'p>(&self, path: &'p str) -> Option<(&'p str, Option<&'p str>)> {
		let mut end = path.len();
		loop {
			let candidate = &path[..end];
			if self.contains(candidate) {
				let rest = (end < path.len()).then(|| &path[end + 1..]);
				return Some((candidate, rest));
			}
			end = candidate.rfind('.')?;
		}
	}

	/// Splits a relationship path into the referenced key and an optional
	/// attribute.
	///
	/// A collection may be followed by an aggregate format (`as_list`,
	/// `as_dict`); the format is returned in the attribute slot.
	///
	/// # Errors
	///
	/// - [`FixtureError::NoSuchFixture`] if no known key prefixes the path
	/// - [`FixtureError::UnsupportedAttributePath`] if more than one
	///   attribute segment follows the key
	///
	/// # Example
	///
	/// ```
	/// # use fixtura_core::fixtures::FixtureSet;
	/// # use fixtura_core::value::Value;
	/// # use serde_json::json;
	/// let set = FixtureSet::from_value(&Value::from(json!({
	///     "red_color": {"fields": {"name": "red"}},
	/// }))).unwrap();
	///
	/// let (key, attribute) = set.split_reference("red_color.name").unwrap();
	/// assert_eq!(key, "red_color");
	/// assert_eq!(attribute.as_deref(), Some("name"));
	/// ```
	pub fn split_reference(&self, path: &str) -> FixtureResult<(String, Option<String>)> {
		let (key, rest) = self
			.locate(path)
			.ok_or_else(|| FixtureError::NoSuchFixture(path.to_string()))?;

		let Some(rest) = rest else {
			return Ok((key.to_string(), None));
		};

		if let Some(collection) = self.collection(key) {
			if rest.parse::<AggregateFormat>().is_err() {
				// Surfaces the collection's own lookup error.
				collection.get(rest)?;
			}
		} else if rest.contains('.') {
			return Err(FixtureError::UnsupportedAttributePath(path.to_string()));
		}

		Ok((key.to_string(), Some(rest.to_string())))
	}

	/// Applies inheritance to every single definition.
	///
	/// # Errors
	///
	/// Returns the first inheritance error encountered.
	pub fn resolve_inheritance(
		&self,
		mode: MergeMode,
	) -> FixtureResult<HashMap<String, ResolvedDefinition>> {
		let mut resolver = InheritanceResolver::new(self, mode);
		for collection in self.collections() {
			resolver.resolve(collection.key())?;
		}
		self.definitions()
			.map(|definition| {
				resolver
					.resolve_definition(definition.key())
					.map(|resolved| (definition.key().to_string(), resolved))
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn set() -> FixtureSet {
		FixtureSet::from_value(&Value::from(json!({
			"red_color": {"model": "Color", "fields": {"name": "red"}},
			"toasters": {
				"model": "Toaster",
				"objects": {"small": {"slots": 2}, "big": {"slots": 4}},
			},
			"queue": {"objects": [{"n": 1}, {"n": 2}]},
		})))
		.unwrap()
	}

	#[rstest]
	fn test_keys_keep_declaration_order(set: FixtureSet) {
		assert_eq!(set.keys().collect::<Vec<_>>(), vec!["red_color", "toasters", "queue"]);
	}

	#[rstest]
	fn test_all_keys_include_members(set: FixtureSet) {
		assert_eq!(
			set.all_keys(),
			vec![
				"red_color",
				"toasters",
				"toasters.big",
				"toasters.small",
				"queue",
				"queue.0",
				"queue.1",
			]
		);
	}

	#[rstest]
	fn test_entry_lookup(set: FixtureSet) {
		assert!(matches!(set.entry("red_color"), Some(Entry::Fixture(_))));
		assert!(matches!(set.entry("toasters"), Some(Entry::Collection(_))));
		assert_eq!(
			set.definition("toasters.small").map(FixtureDefinition::key),
			Some("toasters.small")
		);
		assert_eq!(set.definition("queue.1").map(FixtureDefinition::key), Some("queue.1"));
		assert!(set.entry("toasters.huge").is_none());
	}

	#[rstest]
	#[case("red_color", "red_color", None)]
	#[case("red_color.name", "red_color", Some("name"))]
	#[case("toasters.small", "toasters.small", None)]
	#[case("toasters.small.slots", "toasters.small", Some("slots"))]
	#[case("toasters.as_list", "toasters", Some("as_list"))]
	#[case("queue.0.n", "queue.0", Some("n"))]
	fn test_split_reference(
		set: FixtureSet,
		#[case] path: &str,
		#[case] key: &str,
		#[case] attribute: Option<&str>,
	) {
		let (found_key, found_attribute) = set.split_reference(path).unwrap();
		assert_eq!(found_key, key);
		assert_eq!(found_attribute.as_deref(), attribute);
	}

	#[rstest]
	fn test_split_reference_rejects_deep_paths(set: FixtureSet) {
		assert!(matches!(
			set.split_reference("red_color.name.first"),
			Err(FixtureError::UnsupportedAttributePath(_))
		));
	}

	#[rstest]
	#[case("ghost")]
	#[case("toasters.huge")]
	#[case("queue.7")]
	fn test_split_reference_unknown(set: FixtureSet, #[case] path: &str) {
		assert!(matches!(
			set.split_reference(path),
			Err(FixtureError::NoSuchFixture(_))
		));
	}

	#[rstest]
	fn test_duplicate_key_is_rejected() {
		let mut set = FixtureSet::new();
		set.insert_fixture(FixtureDefinition::new("a")).unwrap();

		let result = set.insert_fixture(FixtureDefinition::new("a"));

		assert!(matches!(
			result,
			Err(FixtureError::InvalidDefinition { .. })
		));
	}

	#[rstest]
	fn test_member_key_collision_is_rejected() {
		let mut set = FixtureSet::new();
		set.insert_fixture(FixtureDefinition::new("toasters.a")).unwrap();
		let collection = FixtureCollection::new("toasters", CollectionKind::Keyed)
			.with_member("a", json!({}));

		assert!(set.insert_collection(collection).is_err());
	}

	#[rstest]
	fn test_dotted_root_keys_are_addressable() {
		let mut set = FixtureSet::new();
		set.insert_fixture(FixtureDefinition::new("app.user").with_field("name", "bob"))
			.unwrap();

		let (key, attribute) = set.split_reference("app.user.name").unwrap();

		assert_eq!(key, "app.user");
		assert_eq!(attribute.as_deref(), Some("name"));
	}

	#[rstest]
	fn test_resolve_inheritance_covers_members(set: FixtureSet) {
		let resolved = set.resolve_inheritance(MergeMode::Shallow).unwrap();

		assert_eq!(resolved.len(), 5);
		assert_eq!(resolved["toasters.big"].model.as_deref(), Some("Toaster"));
		assert_eq!(resolved["red_color"].model.as_deref(), Some("Color"));
	}

	#[rstest]
	fn test_non_mapping_source_is_rejected() {
		assert!(matches!(
			FixtureSet::from_value(&Value::from(json!([1, 2]))),
			Err(FixtureError::InvalidFormat(_))
		));
	}
}
