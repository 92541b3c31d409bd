//! The fixture resolution engine.
//!
//! [`FixturesManager`] owns a loaded [`FixtureSet`], its dependency graph and
//! the cache of built instances. Resolving a key builds every ancestor first,
//! then the fixture itself, and memoizes the result. Installing additionally
//! saves the instance through the [`Builder`]; uninstalling removes it from
//! the cache and deletes it through the [`DeleteBuilder`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fixtura_core::builder::{ModelRegistry, RecordFactory};
//! use fixtura_core::manager::FixturesManager;
//! use fixtura_core::value::Value;
//! use serde_json::json;
//!
//! let registry = Arc::new(ModelRegistry::new());
//! registry.register(RecordFactory::new("Color"));
//! registry.register(RecordFactory::new("Toaster"));
//!
//! let mut manager = FixturesManager::new(registry);
//! manager.load_value(&Value::from_marked_json(json!({
//!     "red_color": {"model": "Color", "fields": {"name": "red"}},
//!     "toaster": {"model": "Toaster", "fields": {"slots": 2, "color": {"$rel": "red_color"}}},
//! })).unwrap()).unwrap();
//!
//! let toaster = manager.get_fixture("toaster").unwrap();
//! let color = manager.get_fixture("red_color").unwrap();
//! assert_eq!(toaster.get_attribute("color"), Some(color));
//! ```

mod cache;

pub use cache::{CachedFixture, FixtureCache};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::builder::{Builder, DeleteAndCommit, DeleteBuilder, InstantiateAndSave, ModelRegistry};
use crate::config::FixturesConfig;
use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::{
	AggregateFormat, Entry, FixtureCollection, FixtureSet, ResolvedDefinition,
	extract_relationships, slot_relationships, strip_relationships, substitute_relationships,
	substitute_slot,
};
use crate::graph::DepGraph;
use crate::hooks::{HookContext, HookName, Hooks};
use crate::value::{Mapping, RelationshipToken, Value};

/// Options for installing fixtures.
#[derive(Debug, Clone)]
pub struct InstallOptions {
	/// Resolve without saving through the builder.
	pub do_not_save: bool,
	/// Field overrides for the requested fixture. Overridden builds are not
	/// cached.
	pub overrides: Option<Mapping>,
	/// Resolve relationship fields of the requested fixture. When unset, those
	/// fields are dropped before construction and the build is not cached.
	pub include_relationships: bool,
}

impl Default for InstallOptions {
	fn default() -> Self {
		Self {
			do_not_save: false,
			overrides: None,
			include_relationships: true,
		}
	}
}

impl InstallOptions {
	/// Default options: save, no overrides, resolve relationships.
	pub fn new() -> Self {
		Self::default()
	}

	/// Drops relationship fields instead of resolving them.
	pub fn without_relationships(mut self) -> Self {
		self.include_relationships = false;
		self
	}

	/// Skips saving.
	pub fn do_not_save(mut self) -> Self {
		self.do_not_save = true;
		self
	}

	/// Sets field overrides.
	pub fn with_overrides(mut self, overrides: Mapping) -> Self {
		self.overrides = Some(overrides);
		self
	}
}

/// Options for uninstalling fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
	/// Drop from the cache without deleting through the delete builder.
	pub do_not_delete: bool,
}

impl UninstallOptions {
	/// Default options: delete.
	pub fn new() -> Self {
		Self::default()
	}

	/// Skips deleting.
	pub fn do_not_delete(mut self) -> Self {
		self.do_not_delete = true;
		self
	}
}

/// How the requested fixture is built. Ancestors always use [`Self::PLAIN`].
#[derive(Debug, Clone, Copy)]
struct BuildRequest<'a> {
	overrides: Option<&'a Mapping>,
	include_relationships: bool,
}

impl BuildRequest<'static> {
	const PLAIN: Self = Self {
		overrides: None,
		include_relationships: true,
	};
}

impl<'a> BuildRequest<'a> {
	fn new(overrides: Option<&'a Mapping>, include_relationships: bool) -> Self {
		Self {
			overrides: overrides.filter(|o| !o.is_empty()),
			include_relationships,
		}
	}

	fn from_options(options: &'a InstallOptions) -> Self {
		Self::new(options.overrides.as_ref(), options.include_relationships)
	}

	fn is_cacheable(&self) -> bool {
		self.overrides.is_none() && self.include_relationships
	}
}

/// Loads fixture definitions and resolves them into built instances.
pub struct FixturesManager {
	config: FixturesConfig,
	builder: Arc<dyn Builder>,
	delete_builder: Arc<dyn DeleteBuilder>,
	hooks: Hooks,
	set: Arc<FixtureSet>,
	definitions: Arc<HashMap<String, ResolvedDefinition>>,
	depgraph: DepGraph,
	cache: FixtureCache,
	building: Vec<String>,
}

impl FixturesManager {
	/// Creates an engine building and deleting through `registry`.
	pub fn new(registry: Arc<ModelRegistry>) -> Self {
		Self::with_builders(
			InstantiateAndSave::new(registry.clone()),
			DeleteAndCommit::new(registry),
		)
	}

	/// Creates an engine with custom construction and teardown strategies.
	pub fn with_builders(
		builder: impl Builder + 'static,
		delete_builder: impl DeleteBuilder + 'static,
	) -> Self {
		Self {
			config: FixturesConfig::default(),
			builder: Arc::new(builder),
			delete_builder: Arc::new(delete_builder),
			hooks: Hooks::new(),
			set: Arc::new(FixtureSet::new()),
			definitions: Arc::new(HashMap::new()),
			depgraph: DepGraph::new(),
			cache: FixtureCache::new(),
			building: Vec::new(),
		}
	}

	/// Replaces the configuration. Inheritance settings apply from the next
	/// load.
	pub fn with_config(mut self, config: FixturesConfig) -> Self {
		self.config = config;
		self
	}

	/// Current configuration.
	pub fn config(&self) -> &FixturesConfig {
		&self.config
	}

	/// Parses and loads a definition source, replacing anything loaded before.
	///
	/// # Errors
	///
	/// Fails on malformed definitions, unknown relationship or inheritance
	/// targets, and dependency cycles. On failure the previously loaded set
	/// stays in place.
	pub fn load(&mut self, source: &Mapping) -> FixtureResult<()> {
		self.load_set(FixtureSet::from_source(source)?)
	}

	/// Like [`load`](Self::load), for a value that must be a mapping.
	pub fn load_value(&mut self, source: &Value) -> FixtureResult<()> {
		self.load_set(FixtureSet::from_value(source)?)
	}

	/// Loads an already parsed set, replacing anything loaded before.
	///
	/// Inheritance is resolved for every definition, the dependency graph is
	/// built from relationships and `depend_on`, and the graph is checked for
	/// cycles. The cache is cleared.
	pub fn load_set(&mut self, set: FixtureSet) -> FixtureResult<()> {
		let definitions = set.resolve_inheritance(self.config.merge_mode())?;
		let depgraph = build_graph(&set, &definitions)?;
		depgraph.topo_sort()?;

		tracing::info!(
			fixtures = depgraph.len(),
			edges = depgraph.edge_count(),
			"Loaded fixture definitions"
		);

		self.set = Arc::new(set);
		self.definitions = Arc::new(definitions);
		self.depgraph = depgraph;
		self.clean_cache();
		Ok(())
	}

	/// Root keys of the loaded set, in declaration order.
	pub fn keys(&self) -> Vec<String> {
		self.set.keys().map(str::to_string).collect()
	}

	/// The loaded definitions.
	pub fn fixture_set(&self) -> &FixtureSet {
		&self.set
	}

	/// The dependency graph of the loaded set.
	pub fn depgraph(&self) -> &DepGraph {
		&self.depgraph
	}

	/// The collection stored under `key`.
	pub fn collection(&self, key: &str) -> Option<&FixtureCollection> {
		self.set.collection(key)
	}

	/// The definition under `key` with inheritance applied.
	pub fn resolved_definition(&self, key: &str) -> Option<&ResolvedDefinition> {
		self.definitions.get(key)
	}

	/// Returns true if `key` has a cached instance.
	pub fn is_cached(&self, key: &str) -> bool {
		self.cache.contains(key)
	}

	/// Cached keys in first-resolution order.
	pub fn installed_keys(&self) -> &[String] {
		self.cache.installed()
	}

	/// Drops every cached instance without deleting anything.
	pub fn clean_cache(&mut self) {
		self.cache.clear();
		self.building.clear();
	}

	/// Registers a lifecycle hook.
	///
	/// # Errors
	///
	/// - [`FixtureError::UnknownHook`] if `name` is not a hook point
	/// - [`FixtureError::HookAlreadySet`] if the hook was registered before
	pub fn set_hook(
		&mut self,
		name: &str,
		hook: impl Fn(&HookContext<'_>) + Send + Sync + 'static,
	) -> FixtureResult<()> {
		self.hooks.set(name, hook)
	}

	/// Resolves a fixture by key or path.
	///
	/// Accepted paths: a root key, a collection member (`toasters.small`), a
	/// collection with an aggregate format (`toasters.as_list`), or any fixture
	/// followed by one attribute (`red_color.name`).
	///
	/// # Errors
	///
	/// - [`FixtureError::NoSuchFixture`] for unknown keys
	/// - [`FixtureError::AttributeNotFound`] for missing attributes
	/// - [`FixtureError::Construction`] when the builder fails
	pub fn get_fixture(&mut self, key: &str) -> FixtureResult<Value> {
		self.resolve_path(key, BuildRequest::PLAIN)
	}

	/// Resolves a fixture with field overrides.
	///
	/// Overrides are laid over the definition's fields one level deep and
	/// apply only to the requested fixture, not its ancestors. The result is
	/// never cached. An empty mapping behaves like [`get_fixture`](Self::get_fixture).
	pub fn get_fixture_with(&mut self, key: &str, overrides: &Mapping) -> FixtureResult<Value> {
		self.resolve_path(key, BuildRequest::new(Some(overrides), true))
	}

	/// Resolves a fixture with the overrides and relationship setting of
	/// `options`, without saving it. `do_not_save` is ignored.
	///
	/// With `include_relationships` unset, fields holding relationships are
	/// dropped from the requested fixture and the result is not cached.
	pub fn get_fixture_with_options(
		&mut self,
		key: &str,
		options: &InstallOptions,
	) -> FixtureResult<Value> {
		self.resolve_path(key, BuildRequest::from_options(options))
	}

	/// Resolves several fixtures in order.
	pub fn get_fixtures<S: AsRef<str>>(&mut self, keys: &[S]) -> FixtureResult<Vec<Value>> {
		keys.iter().map(|key| self.get_fixture(key.as_ref())).collect()
	}

	/// Resolves every member of a collection into an aggregate.
	///
	/// `None` uses the collection's own shape: a mapping for keyed
	/// collections, a sequence for indexed ones.
	pub fn get_all_instances(
		&mut self,
		collection: &str,
		format: Option<AggregateFormat>,
	) -> FixtureResult<Value> {
		self.aggregate(collection, format, BuildRequest::PLAIN)
	}

	/// Resolves and saves a fixture, running the install hooks.
	pub fn install_fixture(&mut self, key: &str) -> FixtureResult<Value> {
		self.install_fixture_with(key, &InstallOptions::default())
	}

	/// Like [`install_fixture`](Self::install_fixture), with options.
	///
	/// `after_install` runs whether or not installation succeeded and sees
	/// the error, which is then returned.
	pub fn install_fixture_with(
		&mut self,
		key: &str,
		options: &InstallOptions,
	) -> FixtureResult<Value> {
		tracing::debug!(key, "Installing fixture");
		self.hooks.run(HookName::BeforeInstall, key, None, None);

		let result = self.resolve_and_save(key, options);

		self.hooks.run(
			HookName::AfterInstall,
			key,
			result.as_ref().ok(),
			result.as_ref().err(),
		);
		result
	}

	/// Installs several fixtures in order.
	pub fn install_fixtures<S: AsRef<str>>(&mut self, keys: &[S]) -> FixtureResult<Vec<Value>> {
		self.install_fixtures_with(keys, &InstallOptions::default())
	}

	/// Like [`install_fixtures`](Self::install_fixtures), with options.
	pub fn install_fixtures_with<S: AsRef<str>>(
		&mut self,
		keys: &[S],
		options: &InstallOptions,
	) -> FixtureResult<Vec<Value>> {
		keys.iter()
			.map(|key| self.install_fixture_with(key.as_ref(), options))
			.collect()
	}

	/// Installs every root fixture and collection.
	pub fn install_all_fixtures(&mut self) -> FixtureResult<Vec<Value>> {
		self.install_all_fixtures_with(&InstallOptions::default())
	}

	/// Like [`install_all_fixtures`](Self::install_all_fixtures), with options.
	pub fn install_all_fixtures_with(
		&mut self,
		options: &InstallOptions,
	) -> FixtureResult<Vec<Value>> {
		let keys = self.keys();
		self.install_fixtures_with(&keys, options)
	}

	/// Removes a fixture from the cache and deletes it, running the
	/// uninstall hooks.
	///
	/// Returns `None` if the fixture was not installed.
	pub fn uninstall_fixture(&mut self, key: &str) -> FixtureResult<Option<Value>> {
		self.uninstall_fixture_with(key, UninstallOptions::default())
	}

	/// Like [`uninstall_fixture`](Self::uninstall_fixture), with options.
	///
	/// Uninstalling a collection also uninstalls its members, last member
	/// first. Instances saved with overrides or without relationships under
	/// the same key are deleted as well.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::NotUninstallable`] for paths that go past a
	/// fixture, such as `red_color.name` or `toasters.as_list`.
	pub fn uninstall_fixture_with(
		&mut self,
		key: &str,
		options: UninstallOptions,
	) -> FixtureResult<Option<Value>> {
		self.uninstall_key(key, options, true)
	}

	/// Uninstalls several fixtures in the given order, returning the
	/// instances that were installed.
	pub fn uninstall_fixtures<S: AsRef<str>>(&mut self, keys: &[S]) -> FixtureResult<Vec<Value>> {
		self.uninstall_fixtures_with(keys, UninstallOptions::default())
	}

	/// Like [`uninstall_fixtures`](Self::uninstall_fixtures), with options.
	pub fn uninstall_fixtures_with<S: AsRef<str>>(
		&mut self,
		keys: &[S],
		options: UninstallOptions,
	) -> FixtureResult<Vec<Value>> {
		let mut removed = Vec::new();
		for key in keys {
			if let Some(value) = self.uninstall_fixture_with(key.as_ref(), options)? {
				removed.push(value);
			}
		}
		Ok(removed)
	}

	/// Uninstalls everything in reverse order of first resolution, so
	/// dependents go before their dependencies.
	///
	/// Instances saved outside the cache go first, most recent first. Nothing
	/// cached depends on them.
	pub fn uninstall_all_fixtures(&mut self) -> FixtureResult<Vec<Value>> {
		self.uninstall_all_fixtures_with(UninstallOptions::default())
	}

	/// Like [`uninstall_all_fixtures`](Self::uninstall_all_fixtures), with
	/// options.
	pub fn uninstall_all_fixtures_with(
		&mut self,
		options: UninstallOptions,
	) -> FixtureResult<Vec<Value>> {
		let mut removed = Vec::new();
		for (key, entry) in self.cache.take_all_detached() {
			removed.push(self.uninstall_detached(&key, entry, options)?);
		}

		let keys: Vec<String> = self.cache.installed().iter().rev().cloned().collect();
		for key in keys {
			if let Some(value) = self.uninstall_key(&key, options, false)? {
				removed.push(value);
			}
		}
		Ok(removed)
	}

	fn uninstall_key(
		&mut self,
		key: &str,
		options: UninstallOptions,
		cascade: bool,
	) -> FixtureResult<Option<Value>> {
		tracing::debug!(key, "Uninstalling fixture");
		self.hooks.run(HookName::BeforeUninstall, key, None, None);

		let result = self.remove_and_delete(key, options, cascade);

		let instance = match &result {
			Ok(Some(value)) => Some(value),
			_ => None,
		};
		self.hooks.run(
			HookName::AfterUninstall,
			key,
			instance,
			result.as_ref().err(),
		);
		result
	}

	fn uninstall_detached(
		&self,
		key: &str,
		entry: CachedFixture,
		options: UninstallOptions,
	) -> FixtureResult<Value> {
		tracing::debug!(key, "Uninstalling detached fixture instance");
		self.hooks.run(HookName::BeforeUninstall, key, None, None);
		let result = self.delete_entry(key, entry, options);
		self.hooks.run(
			HookName::AfterUninstall,
			key,
			result.as_ref().ok(),
			result.as_ref().err(),
		);
		result
	}

	fn resolve_and_save(&mut self, key: &str, options: &InstallOptions) -> FixtureResult<Value> {
		let request = BuildRequest::from_options(options);
		let instance = self.resolve_path(key, request)?;
		if !options.do_not_save {
			let saved = self.save_instance(key, &instance)?;
			if !request.is_cacheable() {
				for (key, entry) in saved {
					self.cache.track_detached(&key, entry);
				}
			}
		}
		Ok(instance)
	}

	/// Saves `instance`, or each member for a collection, and returns what
	/// was saved.
	fn save_instance(
		&self,
		path: &str,
		instance: &Value,
	) -> FixtureResult<Vec<(String, CachedFixture)>> {
		let Some((key, rest)) = self.set.locate(path) else {
			return Err(FixtureError::NoSuchFixture(path.to_string()));
		};

		if let Some(collection) = self.set.collection(key) {
			let members: Vec<&Value> = match instance {
				Value::Mapping(map) => map.values().collect(),
				Value::Sequence(items) => items.iter().collect(),
				_ => Vec::new(),
			};
			let mut saved = Vec::new();
			for (member, value) in collection.member_keys().into_iter().zip(members) {
				let model = self.model_for(&member);
				saved.push(self.save_one(member, model, value)?);
			}
			return Ok(saved);
		}

		let model = match rest {
			None => self.model_for(key),
			Some(_) => None,
		};
		Ok(vec![self.save_one(path.to_string(), model, instance)?])
	}

	fn save_one(
		&self,
		key: String,
		model: Option<String>,
		instance: &Value,
	) -> FixtureResult<(String, CachedFixture)> {
		self.hooks.run(HookName::BeforeSave, &key, Some(instance), None);
		let result = self.builder.save(model.as_deref(), instance);
		self.hooks
			.run(HookName::AfterSave, &key, Some(instance), result.as_ref().err());
		result?;
		let entry = CachedFixture {
			value: instance.clone(),
			model,
		};
		Ok((key, entry))
	}

	fn remove_and_delete(
		&mut self,
		path: &str,
		options: UninstallOptions,
		cascade: bool,
	) -> FixtureResult<Option<Value>> {
		let key = match self.set.locate(path) {
			Some((key, None)) => key.to_string(),
			Some((_, Some(_))) => {
				return Err(FixtureError::NotUninstallable(path.to_string()));
			}
			None => path.to_string(),
		};

		let mut removed = None;
		for entry in self.cache.take_detached(&key) {
			removed = Some(self.delete_entry(&key, entry, options)?);
		}
		if let Some(entry) = self.cache.remove(&key) {
			removed = Some(self.delete_entry(&key, entry, options)?);
		}

		if cascade {
			let members = self
				.set
				.collection(&key)
				.map(FixtureCollection::member_keys)
				.unwrap_or_default();
			for member in members.iter().rev() {
				if self.cache.holds(member) {
					self.uninstall_key(member, options, true)?;
				}
			}
		}
		Ok(removed)
	}

	fn delete_entry(
		&self,
		key: &str,
		entry: CachedFixture,
		options: UninstallOptions,
	) -> FixtureResult<Value> {
		if !options.do_not_delete {
			self.hooks
				.run(HookName::BeforeDelete, key, Some(&entry.value), None);
			let result = self
				.delete_builder
				.delete(entry.model.as_deref(), &entry.value);
			self.hooks.run(
				HookName::AfterDelete,
				key,
				Some(&entry.value),
				result.as_ref().err(),
			);
			result?;
		}
		Ok(entry.value)
	}

	fn model_for(&self, key: &str) -> Option<String> {
		self.definitions
			.get(key)?
			.model
			.as_deref()
			.map(|model| self.config.qualify_model(model))
	}

	fn resolve_path(&mut self, path: &str, request: BuildRequest<'_>) -> FixtureResult<Value> {
		let (key, rest) = self.set.split_reference(path)?;

		let Some(attribute) = rest else {
			return self.resolve_key(&key, request);
		};

		if self.set.collection(&key).is_some() {
			let format = attribute.parse::<AggregateFormat>()?;
			return self.aggregate(&key, Some(format), request);
		}

		self.resolve_key(&key, request)?
			.get_attribute(&attribute)
			.ok_or(FixtureError::AttributeNotFound { key, attribute })
	}

	fn aggregate(
		&mut self,
		key: &str,
		format: Option<AggregateFormat>,
		request: BuildRequest<'_>,
	) -> FixtureResult<Value> {
		let set = Arc::clone(&self.set);
		let collection = set
			.collection(key)
			.ok_or_else(|| FixtureError::NoSuchFixture(key.to_string()))?;
		collection.get_all_instances(format, |member| self.resolve_key(member, request))
	}

	fn resolve_key(&mut self, key: &str, request: BuildRequest<'_>) -> FixtureResult<Value> {
		let ancestors = self.depgraph.ancestors_of(key)?;
		for ancestor in &ancestors {
			self.resolve_key(ancestor, BuildRequest::PLAIN)?;
		}

		if request.is_cacheable()
			&& let Some(entry) = self.cache.get(key)
		{
			tracing::debug!(key, "Fixture cache hit");
			return Ok(entry.value.clone());
		}

		if self.building.iter().any(|k| k == key) {
			let mut chain = self.building.clone();
			chain.push(key.to_string());
			return Err(FixtureError::ResolutionCycle(chain));
		}

		self.building.push(key.to_string());
		let built = self.build_node(key, request);
		self.building.pop();
		let value = built?;

		if request.is_cacheable() {
			tracing::debug!(key, "Built fixture");
			self.cache.insert(
				key,
				CachedFixture {
					value: value.clone(),
					model: self.model_for(key),
				},
			);
		}
		Ok(value)
	}

	fn build_node(&mut self, key: &str, request: BuildRequest<'_>) -> FixtureResult<Value> {
		let set = Arc::clone(&self.set);
		match set.entry(key) {
			Some(Entry::Collection(collection)) => {
				collection.get_all_instances(None, |member| self.resolve_key(member, request))
			}
			Some(Entry::Fixture(_)) => self.build_fixture(key, request),
			None => Err(FixtureError::NoSuchFixture(key.to_string())),
		}
	}

	fn build_fixture(&mut self, key: &str, request: BuildRequest<'_>) -> FixtureResult<Value> {
		let definitions = Arc::clone(&self.definitions);
		let definition = definitions
			.get(key)
			.ok_or_else(|| FixtureError::NoSuchFixture(key.to_string()))?;
		let model = self.model_for(key);
		let now = Utc::now();
		let timezone_aware = self.config.timezone_aware;

		let mut instance = if let Some(id) = &definition.id {
			let model = model.ok_or_else(|| missing_model(key))?;
			self.builder
				.fetch(&model, id)
				.map_err(|source| FixtureError::Construction {
					fields: format!("{{id: {}}}", id),
					model,
					source: Box::new(source),
				})?
		} else {
			let mut fields = definition.fields.clone();
			if let Some(overrides) = request.overrides {
				apply_overrides(key, &mut fields, overrides)?;
			}
			fields.resolve_deferred(now, timezone_aware)?;
			if request.include_relationships {
				substitute_relationships(&mut fields, |token| self.resolve_token(token))?;
			} else {
				strip_relationships(&mut fields);
			}

			match model {
				None => fields,
				Some(model) => {
					let fields = match fields {
						Value::Mapping(map) => map,
						Value::Null => Mapping::new(),
						other => {
							return Err(FixtureError::InvalidDefinition {
								key: key.to_string(),
								message: format!(
									"fields of a model fixture must be a mapping, found {}",
									other.kind()
								),
							});
						}
					};
					let rendered = Value::Mapping(fields.clone()).to_string();
					self.builder
						.build(&model, fields)
						.map_err(|source| FixtureError::Construction {
							model,
							fields: rendered,
							source: Box::new(source),
						})?
				}
			}
		};

		let mut resolve = |token: &RelationshipToken| self.resolve_token(token);
		for (attribute, value) in &definition.post_creation {
			if !request.include_relationships && !slot_relationships(value).is_empty() {
				continue;
			}
			let mut value = value.clone();
			value.resolve_deferred(now, timezone_aware)?;
			substitute_slot(&mut value, &mut resolve)?;
			instance.set_attribute(attribute, value)?;
		}

		Ok(instance)
	}

	fn resolve_token(&mut self, token: &RelationshipToken) -> FixtureResult<Value> {
		self.resolve_path(token.path(), BuildRequest::PLAIN)
	}
}

impl Default for FixturesManager {
	fn default() -> Self {
		Self::new(Arc::new(ModelRegistry::new()))
	}
}

impl fmt::Debug for FixturesManager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixturesManager")
			.field("config", &self.config)
			.field("fixtures", &self.set.len())
			.field("installed", &self.cache.installed())
			.field("hooks", &self.hooks)
			.finish_non_exhaustive()
	}
}

fn missing_model(key: &str) -> FixtureError {
	FixtureError::InvalidDefinition {
		key: key.to_string(),
		message: "an id requires a model to fetch from".to_string(),
	}
}

fn apply_overrides(key: &str, fields: &mut Value, overrides: &Mapping) -> FixtureResult<()> {
	match fields {
		Value::Mapping(map) => {
			for (name, value) in overrides {
				map.insert(name.clone(), value.clone());
			}
			Ok(())
		}
		Value::Null => {
			*fields = Value::Mapping(overrides.clone());
			Ok(())
		}
		other => Err(FixtureError::InvalidDefinition {
			key: key.to_string(),
			message: format!("cannot override fields of a {} fixture", other.kind()),
		}),
	}
}

/// Builds the dependency graph of `set`.
///
/// Every key becomes a node. Edges run from dependency to dependent: from
/// each relationship target and `depend_on` entry to the definition using
/// it, and from each collection member to its collection.
fn build_graph(
	set: &FixtureSet,
	definitions: &HashMap<String, ResolvedDefinition>,
) -> FixtureResult<DepGraph> {
	let keys = set.all_keys();
	let mut graph = DepGraph::new();
	for key in &keys {
		graph.add_node(key);
	}

	for key in &keys {
		if let Some(collection) = set.collection(key) {
			for member in collection.member_keys() {
				graph.add_edge(&member, key);
			}
			continue;
		}

		let definition = definitions
			.get(key)
			.ok_or_else(|| FixtureError::NoSuchFixture(key.clone()))?;

		if definition.id.is_some() {
			if definition.model.is_none() {
				return Err(missing_model(key));
			}
		} else {
			for token in extract_relationships(&definition.fields) {
				let (dependency, _) = set.split_reference(token.path())?;
				graph.add_edge(&dependency, key);
			}
		}

		// Post-creation targets are checked here but resolved lazily.
		for value in definition.post_creation.values() {
			for token in slot_relationships(value) {
				set.split_reference(token.path())?;
			}
		}

		for dependency in &definition.depend_on {
			if !set.contains(dependency) {
				return Err(FixtureError::NoSuchFixture(dependency.clone()));
			}
			graph.add_edge(dependency, key);
		}
	}

	Ok(graph)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::RecordFactory;
	use parking_lot::Mutex;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn registry() -> Arc<ModelRegistry> {
		let registry = Arc::new(ModelRegistry::new());
		registry.register(RecordFactory::new("Color"));
		registry.register(RecordFactory::new("Toaster"));
		registry
	}

	fn load(manager: &mut FixturesManager, source: serde_json::Value) {
		let source = Value::from_marked_json(source).unwrap();
		manager.load_value(&source).unwrap();
	}

	#[rstest]
	fn test_relationship_is_substituted(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(
			&mut manager,
			json!({
				"toaster": {"model": "Toaster", "fields": {"color": {"$rel": "red_color"}}},
				"red_color": {"model": "Color", "fields": {"name": "red"}},
			}),
		);

		// Act
		let toaster = manager.get_fixture("toaster").unwrap();

		// Assert
		let color = manager.get_fixture("red_color").unwrap();
		assert_eq!(toaster.get_attribute("color"), Some(color));
		assert_eq!(manager.installed_keys(), &["red_color", "toaster"]);
	}

	#[rstest]
	fn test_cache_returns_identical_instance(registry: Arc<ModelRegistry>) {
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"toaster": {"model": "Toaster", "fields": {"slots": 2}}}));

		let first = manager.get_fixture("toaster").unwrap();
		let second = manager.get_fixture("toaster").unwrap();

		assert!(first.as_object().unwrap().ptr_eq(second.as_object().unwrap()));
	}

	#[rstest]
	fn test_overrides_bypass_cache(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"toaster": {"model": "Toaster", "fields": {"slots": 2}}}));
		let mut overrides = Mapping::new();
		overrides.insert("slots".into(), Value::from(4));

		// Act
		let overridden = manager.get_fixture_with("toaster", &overrides).unwrap();
		let cached_before = manager.is_cached("toaster");
		let plain = manager.get_fixture("toaster").unwrap();

		// Assert
		assert!(!cached_before);
		assert_eq!(overridden.get_attribute("slots"), Some(Value::from(4)));
		assert_eq!(plain.get_attribute("slots"), Some(Value::from(2)));
	}

	#[rstest]
	fn test_attribute_path(registry: Arc<ModelRegistry>) {
		let mut manager = FixturesManager::new(registry);
		load(
			&mut manager,
			json!({
				"red_color": {"model": "Color", "fields": {"name": "red"}},
				"label": {"fields": {"text": {"$rel": "red_color.name"}}},
			}),
		);

		assert_eq!(manager.get_fixture("red_color.name").unwrap(), Value::from("red"));
		assert_eq!(
			manager.get_fixture("label").unwrap(),
			Value::from(json!({"text": "red"}))
		);
		assert!(matches!(
			manager.get_fixture("red_color.hue"),
			Err(FixtureError::AttributeNotFound { .. })
		));
	}

	#[rstest]
	fn test_modelless_fixture_returns_fields() {
		let mut manager = FixturesManager::default();
		load(&mut manager, json!({"point": {"fields": {"x": 1, "y": 2}}}));

		assert_eq!(
			manager.get_fixture("point").unwrap(),
			Value::from(json!({"x": 1, "y": 2}))
		);
	}

	#[rstest]
	fn test_unknown_key() {
		let mut manager = FixturesManager::default();
		assert!(matches!(
			manager.get_fixture("ghost"),
			Err(FixtureError::NoSuchFixture(_))
		));
	}

	#[rstest]
	fn test_load_rejects_unknown_relationship_target() {
		let mut manager = FixturesManager::default();
		let source = Value::from_marked_json(json!({
			"toaster": {"fields": {"color": {"$rel": "ghost"}}},
		}))
		.unwrap();

		let result = manager.load_value(&source);
		assert!(matches!(result, Err(FixtureError::NoSuchFixture(key)) if key == "ghost"));
	}

	#[rstest]
	fn test_failed_load_keeps_previous_set() {
		let mut manager = FixturesManager::default();
		load(&mut manager, json!({"a": {"fields": {"x": 1}}}));

		let result = manager.load_value(&Value::from(json!({
			"b": {"depend_on": "c"},
			"c": {"depend_on": "b"},
		})));

		assert!(matches!(result, Err(FixtureError::CycleDetected { .. })));
		assert_eq!(manager.keys(), vec!["a"]);
	}

	#[rstest]
	fn test_construction_error_is_wrapped(registry: Arc<ModelRegistry>) {
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"kettle": {"model": "Kettle", "fields": {"volume": 2}}}));

		match manager.get_fixture("kettle") {
			Err(FixtureError::Construction { model, fields, source }) => {
				assert_eq!(model, "Kettle");
				assert_eq!(fields, "{volume: 2}");
				assert!(matches!(*source, FixtureError::ModelNotFound(_)));
			}
			other => panic!("Expected Construction, got {:?}", other),
		}
	}

	#[rstest]
	fn test_post_creation_cycle_is_caught() {
		let mut manager = FixturesManager::default();
		load(
			&mut manager,
			json!({
				"a": {"fields": {"n": 1}, "post_creation": {"peer": {"$rel": "b"}}},
				"b": {"fields": {"peer": {"$rel": "a"}}},
			}),
		);

		assert!(matches!(
			manager.get_fixture("a"),
			Err(FixtureError::ResolutionCycle(_))
		));
	}

	#[rstest]
	fn test_post_creation_resolves_tokens() {
		let mut manager = FixturesManager::default();
		load(
			&mut manager,
			json!({
				"owner": {"fields": {"name": "ann"}},
				"toaster": {"fields": {"slots": 2}, "post_creation": {"owner": {"$rel": "owner.name"}}},
			}),
		);

		let toaster = manager.get_fixture("toaster").unwrap();

		assert_eq!(toaster.get_attribute("owner"), Some(Value::from("ann")));
	}

	#[rstest]
	fn test_fetch_by_id(registry: Arc<ModelRegistry>) {
		// Arrange
		let toasters = registry.register(RecordFactory::new("Toaster"));
		let mut manager = FixturesManager::new(registry);
		load(
			&mut manager,
			json!({
				"stored": {"model": "Toaster", "fields": {"id": 9}},
				"found": {"model": "Toaster", "id": 9},
			}),
		);
		manager.install_fixture("stored").unwrap();

		// Act
		let found = manager.get_fixture("found").unwrap();

		// Assert
		assert_eq!(toasters.saved_count(), 1);
		assert_eq!(found, manager.get_fixture("stored").unwrap());
	}

	#[rstest]
	fn test_install_saves_and_uninstall_deletes(registry: Arc<ModelRegistry>) {
		// Arrange
		let toasters = registry.register(RecordFactory::new("Toaster"));
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"toaster": {"model": "Toaster", "fields": {"slots": 2}}}));

		// Act
		manager.install_fixture("toaster").unwrap();
		let saved = toasters.saved_count();
		let removed = manager.uninstall_fixture("toaster").unwrap();

		// Assert
		assert_eq!(saved, 1);
		assert!(removed.is_some());
		assert_eq!(toasters.saved_count(), 0);
		assert!(manager.uninstall_fixture("toaster").unwrap().is_none());
	}

	#[rstest]
	fn test_do_not_save_and_do_not_delete(registry: Arc<ModelRegistry>) {
		let toasters = registry.register(RecordFactory::new("Toaster"));
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"toaster": {"model": "Toaster", "fields": {"slots": 2}}}));

		manager
			.install_fixture_with("toaster", &InstallOptions::new().do_not_save())
			.unwrap();
		assert_eq!(toasters.saved_count(), 0);

		manager.install_fixture("toaster").unwrap();
		manager
			.uninstall_fixture_with("toaster", UninstallOptions::new().do_not_delete())
			.unwrap();
		assert_eq!(toasters.saved_count(), 1);
		assert!(!manager.is_cached("toaster"));
	}

	#[rstest]
	fn test_hooks_run_around_install_and_uninstall(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"toaster": {"model": "Toaster", "fields": {"slots": 2}}}));
		let calls = Arc::new(Mutex::new(Vec::new()));
		for hook in HookName::ALL {
			let calls = calls.clone();
			manager
				.set_hook(hook.as_str(), move |ctx| calls.lock().push(ctx.hook))
				.unwrap();
		}

		// Act
		manager.install_fixture("toaster").unwrap();
		manager.uninstall_all_fixtures().unwrap();

		// Assert
		assert_eq!(
			*calls.lock(),
			vec![
				HookName::BeforeInstall,
				HookName::BeforeSave,
				HookName::AfterSave,
				HookName::AfterInstall,
				HookName::BeforeUninstall,
				HookName::BeforeDelete,
				HookName::AfterDelete,
				HookName::AfterUninstall,
			]
		);
	}

	#[rstest]
	fn test_after_install_sees_error_before_it_propagates(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"kettle": {"model": "Kettle"}}));
		let seen = Arc::new(Mutex::new(None));
		let sink = seen.clone();
		manager
			.set_hook("after_install", move |ctx| {
				*sink.lock() = ctx.error.map(|e| e.to_string());
			})
			.unwrap();

		// Act
		let result = manager.install_fixture("kettle");

		// Assert
		let error = result.unwrap_err().to_string();
		assert_eq!(seen.lock().as_deref(), Some(error.as_str()));
	}

	#[rstest]
	fn test_collection_aggregates(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(
			&mut manager,
			json!({
				"toasters": {
					"model": "Toaster",
					"objects": {"b": {"slots": 4}, "a": {"slots": 2}},
				},
			}),
		);

		// Act
		let as_dict = manager.get_fixture("toasters").unwrap();
		let as_list = manager.get_fixture("toasters.as_list").unwrap();

		// Assert
		let keys: Vec<_> = as_dict.as_mapping().unwrap().keys().cloned().collect();
		assert_eq!(keys, vec!["a", "b"]);
		let slots: Vec<_> = as_list
			.as_sequence()
			.unwrap()
			.iter()
			.map(|t| t.get_attribute("slots"))
			.collect();
		assert_eq!(slots, vec![Some(Value::from(2)), Some(Value::from(4))]);
		assert_eq!(
			manager.get_fixture("toasters.a").unwrap(),
			as_dict.get_attribute("a").unwrap()
		);
	}

	#[rstest]
	fn test_installing_collection_saves_members(registry: Arc<ModelRegistry>) {
		let toasters = registry.register(RecordFactory::new("Toaster"));
		let mut manager = FixturesManager::new(registry);
		load(
			&mut manager,
			json!({"toasters": {"model": "Toaster", "objects": [{"slots": 1}, {"slots": 2}]}}),
		);

		manager.install_fixture("toasters").unwrap();

		assert_eq!(toasters.saved_count(), 2);
	}

	#[rstest]
	fn test_without_relationships_drops_token_fields(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(
			&mut manager,
			json!({
				"red_color": {"model": "Color", "fields": {"name": "red"}},
				"toaster": {
					"model": "Toaster",
					"fields": {
						"slots": 2,
						"color": {"$rel": "red_color"},
						"trims": [{"$rel": "red_color"}, "chrome"],
					},
				},
			}),
		);
		let options = InstallOptions::new().without_relationships();

		// Act
		let toaster = manager.get_fixture_with_options("toaster", &options).unwrap();

		// Assert
		assert_eq!(toaster.get_attribute("slots"), Some(Value::from(2)));
		assert_eq!(toaster.get_attribute("color"), None);
		assert_eq!(toaster.get_attribute("trims"), None);
		assert!(!manager.is_cached("toaster"));
		let full = manager.get_fixture("toaster").unwrap();
		assert!(full.get_attribute("color").is_some());
	}

	#[rstest]
	fn test_uninstall_rejects_attribute_path(registry: Arc<ModelRegistry>) {
		// Arrange
		let mut manager = FixturesManager::new(registry);
		load(&mut manager, json!({"red_color": {"model": "Color", "fields": {"name": "red"}}}));
		manager.install_fixture("red_color").unwrap();

		// Act
		let result = manager.uninstall_fixture("red_color.name");

		// Assert
		match result {
			Err(FixtureError::NotUninstallable(path)) => assert_eq!(path, "red_color.name"),
			other => panic!("Expected NotUninstallable, got {:?}", other),
		}
		assert!(manager.is_cached("red_color"));
	}

	#[rstest]
	fn test_offset_overflow_fails_resolution() {
		let mut manager = FixturesManager::default();
		load(&mut manager, json!({"t": {"fields": {"at": {"$now": "+1000000y"}}}}));

		let result = manager.get_fixture("t");

		assert!(matches!(result, Err(FixtureError::InvalidDelta(_))));
		assert!(!manager.is_cached("t"));
	}

	#[rstest]
	fn test_deep_inherit_config() {
		let mut manager =
			FixturesManager::default().with_config(FixturesConfig::new().with_deep_inherit(true));
		load(
			&mut manager,
			json!({
				"base": {"fields": {"size": {"w": 1, "h": 2}}},
				"child": {"inherit_from": "base", "fields": {"size": {"h": 3}}},
			}),
		);

		assert_eq!(
			manager.get_fixture("child").unwrap(),
			Value::from(json!({"size": {"w": 1, "h": 3}}))
		);
	}
}
