//! Named groups of fixture definitions.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{FixtureError, FixtureResult};
use crate::value::{Mapping, Value};

use super::definition::{FIXTURE_KEYS, FixtureDefinition, invalid, optional_string};
use super::inheritance::Inheritable;

/// Source keys accepted in a collection definition.
const COLLECTION_KEYS: &[&str] = &[
	"model",
	"fields",
	"post_creation",
	"inherit_from",
	"depend_on",
	"objects",
];

/// Whether members are addressed by name or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
	/// Members declared as a mapping.
	Keyed,
	/// Members declared as a list.
	Indexed,
}

/// Shape of an aggregated collection value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFormat {
	/// Mapping from member name to instance.
	AsDict,
	/// Instances in member order.
	AsList,
}

impl AggregateFormat {
	/// Path suffix selecting this format.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::AsDict => "as_dict",
			Self::AsList => "as_list",
		}
	}
}

impl fmt::Display for AggregateFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AggregateFormat {
	type Err = FixtureError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"as_dict" => Ok(Self::AsDict),
			"as_list" => Ok(Self::AsList),
			other => Err(FixtureError::InvalidFormat(other.to_string())),
		}
	}
}

/// A group of member definitions sharing defaults.
///
/// Member keys are qualified with the collection key: `toasters.small` for a
/// keyed collection, `toasters.0` for an indexed one.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureCollection {
	key: String,
	kind: CollectionKind,
	members: IndexMap<String, FixtureDefinition>,
	attrs: Inheritable,
	inherit_from: Option<String>,
}

impl FixtureCollection {
	/// Creates an empty collection.
	pub fn new(key: impl Into<String>, kind: CollectionKind) -> Self {
		Self {
			key: key.into(),
			kind,
			members: IndexMap::new(),
			attrs: Inheritable::default(),
			inherit_from: None,
		}
	}

	/// Sets the default model for members.
	pub fn with_model(mut self, model: impl Into<String>) -> Self {
		self.attrs.model = Some(model.into());
		self
	}

	/// Sets default fields for members.
	pub fn with_fields(mut self, fields: impl Into<Value>) -> Self {
		self.attrs.fields = fields.into();
		self
	}

	/// Names the definition this collection inherits from.
	pub fn inherit_from(mut self, parent: impl Into<String>) -> Self {
		self.inherit_from = Some(parent.into());
		self
	}

	/// Adds a member whose fields are `fields`.
	///
	/// For an indexed collection the name is ignored and the next position
	/// is used.
	pub fn with_member(self, name: &str, fields: impl Into<Value>) -> Self {
		let fields = fields.into();
		self.with_definition(name, |key| FixtureDefinition::new(key).with_fields(fields))
	}

	/// Adds a fully specified member.
	pub fn with_definition(
		mut self,
		name: &str,
		build: impl FnOnce(String) -> FixtureDefinition,
	) -> Self {
		let name = match self.kind {
			CollectionKind::Keyed => name.to_string(),
			CollectionKind::Indexed => self.members.len().to_string(),
		};
		let mut definition = build(format!("{}.{}", self.key, name));
		definition.set_default_parent(&self.key);
		self.members.insert(name, definition);
		self
	}

	/// Parses a collection from its source mapping.
	///
	/// Each entry under `objects` is either a full definition (it has a
	/// `fields` or `id` key) or a plain field mapping.
	pub fn from_source(key: impl Into<String>, map: &Mapping) -> FixtureResult<Self> {
		let key = key.into();
		if let Some(unknown) = map.keys().find(|k| !COLLECTION_KEYS.contains(&k.as_str())) {
			return Err(invalid(&key, format!("unknown attribute '{}'", unknown)));
		}

		let entries: Vec<(String, &Value)> = match map.get("objects") {
			Some(Value::Mapping(objects)) => objects.iter().map(|(k, v)| (k.clone(), v)).collect(),
			Some(Value::Sequence(objects)) => objects
				.iter()
				.enumerate()
				.map(|(i, v)| (i.to_string(), v))
				.collect(),
			Some(other) => {
				return Err(invalid(
					&key,
					format!("'objects' must be a mapping or a list, found {}", other.kind()),
				));
			}
			None => return Err(invalid(&key, "missing 'objects'".to_string())),
		};
		let kind = match map.get("objects") {
			Some(Value::Sequence(_)) => CollectionKind::Indexed,
			_ => CollectionKind::Keyed,
		};

		let mut members = IndexMap::with_capacity(entries.len());
		for (name, entry) in entries {
			if name.contains('.') {
				return Err(invalid(
					&key,
					format!("member name '{}' must not contain '.'", name),
				));
			}
			let member_key = format!("{}.{}", key, name);
			let mut definition = member_from_source(&member_key, entry)?;
			definition.set_default_parent(&key);
			members.insert(name, definition);
		}

		Ok(Self {
			attrs: Inheritable::from_source(&key, map)?,
			inherit_from: optional_string(&key, map, "inherit_from")?,
			key,
			kind,
			members,
		})
	}

	/// Collection key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Keyed or indexed.
	pub fn kind(&self) -> CollectionKind {
		self.kind
	}

	/// Number of members.
	pub fn len(&self) -> usize {
		self.members.len()
	}

	/// Returns true if there are no members.
	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	/// Aggregate shape used when none is requested.
	pub fn default_format(&self) -> AggregateFormat {
		match self.kind {
			CollectionKind::Keyed => AggregateFormat::AsDict,
			CollectionKind::Indexed => AggregateFormat::AsList,
		}
	}

	/// Finds the member named by the first segment of `path`.
	///
	/// Returns the member and whatever follows the first segment.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::NoSuchFixture`] if no member matches. For an
	/// indexed collection the segment must be an in-range position.
	pub fn get(&self, path: &str) -> FixtureResult<(&FixtureDefinition, Option<String>)> {
		let (head, rest) = match path.split_once('.') {
			Some((head, rest)) => (head, Some(rest.to_string())),
			None => (path, None),
		};
		let missing = || FixtureError::NoSuchFixture(format!("{}.{}", self.key, path));

		let member = match self.kind {
			CollectionKind::Keyed => self.members.get(head),
			CollectionKind::Indexed => head
				.parse::<usize>()
				.ok()
				.and_then(|index| self.members.get_index(index))
				.map(|(_, definition)| definition),
		};
		member.map(|definition| (definition, rest)).ok_or_else(missing)
	}

	/// Members in aggregation order: sorted by name when keyed, by position
	/// when indexed.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &FixtureDefinition)> {
		let mut entries: Vec<_> = self
			.members
			.iter()
			.map(|(name, definition)| (name.as_str(), definition))
			.collect();
		if self.kind == CollectionKind::Keyed {
			entries.sort_by(|a, b| a.0.cmp(b.0));
		}
		entries.into_iter()
	}

	/// Qualified member keys in aggregation order.
	pub fn member_keys(&self) -> Vec<String> {
		self.iter().map(|(_, d)| d.key().to_string()).collect()
	}

	/// Resolves every member through `resolve` and aggregates the results.
	///
	/// `resolve` receives each qualified member key in aggregation order.
	pub fn get_all_instances(
		&self,
		format: Option<AggregateFormat>,
		mut resolve: impl FnMut(&str) -> FixtureResult<Value>,
	) -> FixtureResult<Value> {
		let format = format.unwrap_or_else(|| self.default_format());
		match format {
			AggregateFormat::AsDict => {
				let mut out = Mapping::with_capacity(self.len());
				for (name, definition) in self.iter() {
					out.insert(name.to_string(), resolve(definition.key())?);
				}
				Ok(Value::Mapping(out))
			}
			AggregateFormat::AsList => self
				.iter()
				.map(|(_, definition)| resolve(definition.key()))
				.collect::<FixtureResult<Vec<_>>>()
				.map(Value::Sequence),
		}
	}

	pub(crate) fn attrs(&self) -> &Inheritable {
		&self.attrs
	}

	pub(crate) fn parent(&self) -> Option<&str> {
		self.inherit_from.as_deref()
	}

	pub(crate) fn members(&self) -> impl Iterator<Item = &FixtureDefinition> {
		self.members.values()
	}
}

/// A member entry is a full definition only when it carries `fields` and
/// nothing outside the definition keys. Anything else is field data, even
/// when it has an `id` column.
fn is_member_definition(map: &Mapping) -> bool {
	map.contains_key("fields") && map.keys().all(|k| FIXTURE_KEYS.contains(&k.as_str()))
}

fn member_from_source(key: &str, entry: &Value) -> FixtureResult<FixtureDefinition> {
	match entry {
		Value::Mapping(map) if is_member_definition(map) => {
			FixtureDefinition::from_source(key, entry)
		}
		Value::Null => Ok(FixtureDefinition::new(key)),
		Value::Mapping(_) | Value::Sequence(_) => {
			Ok(FixtureDefinition::new(key).with_fields(entry.clone()))
		}
		other => Err(invalid(
			key,
			format!("expected a mapping, found {}", other.kind()),
		)),
	}
}
