//! Loading parsed sources into a [`FixturesManager`].

use std::path::Path;

use fixtura_core::FixturesManager;

use crate::error::LoaderResult;
use crate::format::SourceFormat;
use crate::parser::SourceParser;

/// Extension methods that parse a source and load it in one call.
pub trait LoadFromFile {
	/// Parses `path` and replaces the loaded definitions with its contents.
	fn load_file(&mut self, path: impl AsRef<Path>) -> LoaderResult<()>;

	/// Parses several files and loads their union.
	fn load_files(&mut self, paths: &[&Path]) -> LoaderResult<()>;

	/// Parses `content` in `format` and loads it.
	fn load_str(&mut self, content: &str, format: SourceFormat) -> LoaderResult<()>;
}

impl LoadFromFile for FixturesManager {
	fn load_file(&mut self, path: impl AsRef<Path>) -> LoaderResult<()> {
		let document = SourceParser::new().parse_file(path.as_ref())?;
		self.load(&document.definitions)?;
		Ok(())
	}

	fn load_files(&mut self, paths: &[&Path]) -> LoaderResult<()> {
		let document = SourceParser::new().parse_files(paths)?;
		self.load(&document.definitions)?;
		Ok(())
	}

	fn load_str(&mut self, content: &str, format: SourceFormat) -> LoaderResult<()> {
		let document = SourceParser::new().parse_str(content, format)?;
		self.load(&document.definitions)?;
		Ok(())
	}
}
