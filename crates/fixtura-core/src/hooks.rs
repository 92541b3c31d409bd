//! Lifecycle hooks around install and uninstall.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{FixtureError, FixtureResult};
use crate::value::Value;

/// The fixed set of hook points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
	/// Before a fixture is resolved for installation.
	BeforeInstall,
	/// After installation, successful or not.
	AfterInstall,
	/// Before an installed instance is saved.
	BeforeSave,
	/// After saving, successful or not.
	AfterSave,
	/// Before a fixture is removed from the cache.
	BeforeUninstall,
	/// After uninstallation, successful or not.
	AfterUninstall,
	/// Before an instance is deleted.
	BeforeDelete,
	/// After deletion, successful or not.
	AfterDelete,
}

impl HookName {
	/// Every hook point.
	pub const ALL: [HookName; 8] = [
		Self::BeforeInstall,
		Self::AfterInstall,
		Self::BeforeSave,
		Self::AfterSave,
		Self::BeforeUninstall,
		Self::AfterUninstall,
		Self::BeforeDelete,
		Self::AfterDelete,
	];

	/// Name used when registering the hook.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::BeforeInstall => "before_install",
			Self::AfterInstall => "after_install",
			Self::BeforeSave => "before_save",
			Self::AfterSave => "after_save",
			Self::BeforeUninstall => "before_uninstall",
			Self::AfterUninstall => "after_uninstall",
			Self::BeforeDelete => "before_delete",
			Self::AfterDelete => "after_delete",
		}
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for HookName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for HookName {
	type Err = FixtureError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|hook| hook.as_str() == s)
			.ok_or_else(|| FixtureError::UnknownHook(s.to_string()))
	}
}

/// What a hook is told about the current step.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
	/// The hook point being run.
	pub hook: HookName,
	/// Fixture key being processed.
	pub key: &'a str,
	/// Instance involved, when one exists at this point.
	pub instance: Option<&'a Value>,
	/// Failure of the step, for `after_*` hooks.
	pub error: Option<&'a FixtureError>,
}

/// A hook callback.
pub type Hook = Arc<dyn Fn(&HookContext<'_>) + Send + Sync>;

/// Registered hooks, one slot per [`HookName`].
#[derive(Default, Clone)]
pub struct Hooks {
	slots: [Option<Hook>; 8],
}

impl Hooks {
	/// Creates a set with every hook unset.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `hook` under `name`.
	///
	/// # Errors
	///
	/// - [`FixtureError::UnknownHook`] if `name` is not a hook point
	/// - [`FixtureError::HookAlreadySet`] if the hook was registered before
	pub fn set(
		&mut self,
		name: &str,
		hook: impl Fn(&HookContext<'_>) + Send + Sync + 'static,
	) -> FixtureResult<()> {
		let name: HookName = name.parse()?;
		let slot = &mut self.slots[name.index()];
		if slot.is_some() {
			return Err(FixtureError::HookAlreadySet(name.as_str().to_string()));
		}
		*slot = Some(Arc::new(hook));
		Ok(())
	}

	/// Returns true if a hook is registered under `name`.
	pub fn is_set(&self, name: HookName) -> bool {
		self.slots[name.index()].is_some()
	}

	/// Runs the hook for `name`, if any.
	pub fn run(
		&self,
		name: HookName,
		key: &str,
		instance: Option<&Value>,
		error: Option<&FixtureError>,
	) {
		if let Some(hook) = &self.slots[name.index()] {
			hook(&HookContext {
				hook: name,
				key,
				instance,
				error,
			});
		}
	}
}

impl fmt::Debug for Hooks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let set: Vec<_> = HookName::ALL
			.into_iter()
			.filter(|name| self.is_set(*name))
			.map(|name| name.as_str())
			.collect();
		f.debug_struct("Hooks").field("set", &set).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use rstest::rstest;

	#[rstest]
	#[case("before_install", HookName::BeforeInstall)]
	#[case("after_delete", HookName::AfterDelete)]
	#[case("before_save", HookName::BeforeSave)]
	fn test_parse_hook_name(#[case] text: &str, #[case] expected: HookName) {
		assert_eq!(text.parse::<HookName>().unwrap(), expected);
		assert_eq!(expected.to_string(), text);
	}

	#[rstest]
	fn test_unknown_hook_fails_immediately() {
		let mut hooks = Hooks::new();
		let result = hooks.set("before_lunch", |_| {});
		assert!(matches!(result, Err(FixtureError::UnknownHook(name)) if name == "before_lunch"));
	}

	#[rstest]
	fn test_hook_can_only_be_set_once() {
		let mut hooks = Hooks::new();
		hooks.set("after_install", |_| {}).unwrap();

		let result = hooks.set("after_install", |_| {});

		assert!(matches!(result, Err(FixtureError::HookAlreadySet(_))));
	}

	#[rstest]
	fn test_run_passes_context() {
		// Arrange
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let mut hooks = Hooks::new();
		hooks
			.set("after_save", move |ctx| {
				sink.lock()
					.push((ctx.hook, ctx.key.to_string(), ctx.error.is_some()));
			})
			.unwrap();

		// Act
		hooks.run(HookName::AfterSave, "toaster", None, None);
		hooks.run(
			HookName::AfterSave,
			"kettle",
			None,
			Some(&FixtureError::Builder("boom".into())),
		);
		hooks.run(HookName::BeforeSave, "ignored", None, None);

		// Assert
		assert_eq!(
			*seen.lock(),
			vec![
				(HookName::AfterSave, "toaster".to_string(), false),
				(HookName::AfterSave, "kettle".to_string(), true),
			]
		);
	}
}
