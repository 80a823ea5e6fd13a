use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::Diagnostics;
use crate::FormatOptions;
use crate::TsdocError;
use crate::TsdocResult;
use crate::format_source;

/// File extensions treated as TypeScript or JavaScript sources.
pub const SOURCE_EXTENSIONS: [&str; 8] = ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// A file whose formatted content differs from what is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
	pub path: PathBuf,
	pub original: String,
	pub formatted: String,
}

/// Result of formatting every source file under a root.
#[derive(Debug, Default)]
pub struct FormatResult {
	/// Files that would change, sorted by path.
	pub changed: Vec<ChangedFile>,
	/// Number of files that were read and formatted.
	pub checked_count: usize,
}

impl FormatResult {
	/// Returns true when every file is already formatted.
	pub fn is_ok(&self) -> bool {
		self.changed.is_empty()
	}
}

/// Whether `path` has one of the [`SOURCE_EXTENSIONS`].
pub fn is_source_file(path: &Path) -> bool {
	path.extension()
		.and_then(|extension| extension.to_str())
		.is_some_and(|extension| SOURCE_EXTENSIONS.contains(&extension))
}

/// Build a `Gitignore` matcher from the `exclude` patterns in the config.
/// These follow `.gitignore` syntax and are applied on top of any
/// `.gitignore` rules.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> TsdocResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|e| {
			TsdocError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {e}"))
		})?;
	}
	builder
		.build()
		.map_err(|e| TsdocError::ConfigParse(format!("failed to build exclude rules: {e}")))
}

/// Collect every source file under `root`, respecting `.gitignore` and the
/// configured `exclude` patterns. Paths are sorted for deterministic output.
pub fn collect_files(root: &Path, exclude: &[String]) -> TsdocResult<Vec<PathBuf>> {
	let exclude = build_exclude_matcher(root, exclude)?;
	let mut files = Vec::new();

	let walker = WalkBuilder::new(root)
		.hidden(true)
		.git_ignore(true)
		.require_git(false)
		.build();

	for entry in walker {
		let entry = entry.map_err(|e| TsdocError::Io(std::io::Error::other(e.to_string())))?;
		let path = entry.path();
		if !entry.file_type().is_some_and(|file_type| file_type.is_file()) || !is_source_file(path) {
			continue;
		}
		if exclude
			.matched_path_or_any_parents(path, false)
			.is_ignore()
		{
			tracing::trace!(path = %path.display(), "excluded");
			continue;
		}
		files.push(path.to_path_buf());
	}

	files.sort();
	Ok(files)
}

/// Format every source file under `root` without writing anything.
pub fn check_project(
	root: &Path,
	options: &FormatOptions,
	diagnostics: &dyn Diagnostics,
) -> TsdocResult<FormatResult> {
	let files = collect_files(root, &options.exclude)?;
	let mut changed = BTreeMap::new();

	for path in &files {
		let original = std::fs::read_to_string(path)?;
		let formatted = format_source(&original, options, diagnostics);
		if formatted != original {
			tracing::debug!(path = %path.display(), "file needs formatting");
			changed.insert(path.clone(), (original, formatted));
		}
	}

	Ok(FormatResult {
		changed: changed
			.into_iter()
			.map(|(path, (original, formatted))| {
				ChangedFile {
					path,
					original,
					formatted,
				}
			})
			.collect(),
		checked_count: files.len(),
	})
}

/// Write the formatted contents back to disk.
pub fn write_updates(result: &FormatResult) -> TsdocResult<()> {
	for file in &result.changed {
		std::fs::write(&file.path, &file.formatted)?;
	}
	Ok(())
}
