//! Built-instance cache with first-resolution order.

use std::collections::HashMap;

use crate::value::Value;

/// A cached instance and the model it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFixture {
	/// The built value.
	pub value: Value,
	/// Qualified model reference, `None` for plain values and aggregates.
	pub model: Option<String>,
}

/// Memoized instances keyed by fixture key.
///
/// Keys are remembered in the order they were first stored so teardown can
/// run in reverse. Saved instances that bypass the cache, such as builds with
/// overrides, are kept in a separate detached list so they can still be torn
/// down.
#[derive(Debug, Default)]
pub struct FixtureCache {
	entries: HashMap<String, CachedFixture>,
	installed: Vec<String>,
	detached: Vec<(String, CachedFixture)>,
}

impl FixtureCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Cached entry for `key`.
	pub fn get(&self, key: &str) -> Option<&CachedFixture> {
		self.entries.get(key)
	}

	/// Returns true if `key` is cached.
	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Stores an entry. A key already present keeps its original position.
	pub fn insert(&mut self, key: &str, entry: CachedFixture) {
		if self.entries.insert(key.to_string(), entry).is_none() {
			self.installed.push(key.to_string());
		}
	}

	/// Removes `key` from the cache and the installed order.
	pub fn remove(&mut self, key: &str) -> Option<CachedFixture> {
		let entry = self.entries.remove(key)?;
		self.installed.retain(|k| k != key);
		Some(entry)
	}

	/// Records a saved instance that is not memoized under `key`.
	pub fn track_detached(&mut self, key: &str, entry: CachedFixture) {
		self.detached.push((key.to_string(), entry));
	}

	/// Removes the detached instances saved under `key`, most recent first.
	pub fn take_detached(&mut self, key: &str) -> Vec<CachedFixture> {
		let (taken, kept) = std::mem::take(&mut self.detached)
			.into_iter()
			.partition::<Vec<_>, _>(|(k, _)| k == key);
		self.detached = kept;
		taken.into_iter().rev().map(|(_, entry)| entry).collect()
	}

	/// Removes every detached instance, most recent first.
	pub fn take_all_detached(&mut self) -> Vec<(String, CachedFixture)> {
		let mut taken = std::mem::take(&mut self.detached);
		taken.reverse();
		taken
	}

	/// Detached instances in the order they were saved.
	pub fn detached(&self) -> &[(String, CachedFixture)] {
		&self.detached
	}

	/// Returns true if `key` is cached or has detached instances.
	pub fn holds(&self, key: &str) -> bool {
		self.contains(key) || self.detached.iter().any(|(k, _)| k == key)
	}

	/// Keys in first-resolution order.
	pub fn installed(&self) -> &[String] {
		&self.installed
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Drops every entry, the installed order and the detached instances.
	pub fn clear(&mut self) {
		self.entries.clear();
		self.installed.clear();
		self.detached.clear();
	}
}
