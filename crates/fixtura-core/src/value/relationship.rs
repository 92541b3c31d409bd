//! Relationship markers.

use std::fmt;

/// Marks a field value as a reference to another fixture.
///
/// The text is either a fixture key (`"red_color"`), a qualified collection
/// member (`"toasters.a"`), or either of those followed by a single attribute
/// (`"red_color.name"`). Splitting the text into key and attribute needs the
/// set of known keys, see [`FixtureSet::split_reference`].
///
/// [`FixtureSet::split_reference`]: crate::fixtures::FixtureSet::split_reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipToken(String);

impl RelationshipToken {
	/// Creates a token referencing `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self(path.into())
	}

	/// The referenced path as written in the definition.
	pub fn path(&self) -> &str {
		&self.0
	}

	/// Dotted segments of the path.
	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('.')
	}
}

impl fmt::Display for RelationshipToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "!rel {}", self.0)
	}
}

impl From<&str> for RelationshipToken {
	fn from(path: &str) -> Self {
		Self::new(path)
	}
}

impl From<String> for RelationshipToken {
	fn from(path: String) -> Self {
		Self(path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_segments() {
		let token = RelationshipToken::new("toasters.a.color");
		assert_eq!(
			token.segments().collect::<Vec<_>>(),
			vec!["toasters", "a", "color"]
		);
	}

	#[rstest]
	fn test_display_uses_tag_form() {
		assert_eq!(RelationshipToken::from("red_color").to_string(), "!rel red_color");
	}
}
