use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::TsdocError;
use crate::TsdocResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"tsdocfmt.toml",
	".tsdocfmt.toml",
	".config/tsdocfmt.toml",
];

/// Default maximum line width for rendered comments.
pub const DEFAULT_PRINT_WIDTH: usize = 80;

/// Default release tag inserted when a comment has none.
pub const DEFAULT_RELEASE_TAG: &str = "@internal";

/// Narrowest content width the layout will wrap to, regardless of how deeply
/// the comment is indented.
pub const MIN_CONTENT_WIDTH: usize = 20;

/// How fenced code lines are prefixed inside a rendered comment.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FencedIndent {
	/// Code lines carry the usual ` * ` comment prefix.
	#[default]
	Space,
	/// Code lines carry only the host indentation, so they can be copied out
	/// of the comment verbatim.
	None,
}

/// Which release tag survives when a comment carries more than one.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseTagStrategy {
	#[default]
	KeepFirst,
	KeepLast,
}

/// Whether fenced code blocks are passed to embedded formatters.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddedLanguageFormatting {
	#[default]
	Auto,
	Off,
}

/// The `default_release_tag` setting.
///
/// ```toml
/// default_release_tag = "@beta"   # insert `@beta`
/// default_release_tag = ""        # disabled
/// default_release_tag = false     # disabled
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
#[non_exhaustive]
#[allow(variant_size_differences)]
pub enum ReleaseTagSetting {
	/// `false` disables insertion. `true` selects [`DEFAULT_RELEASE_TAG`].
	Enabled(bool),
	/// An explicit tag name. The leading `@` is optional.
	Tag(String),
}

impl ReleaseTagSetting {
	/// Returns the normalized tag to insert, or `None` when insertion is
	/// disabled (including the empty string).
	pub fn tag(&self) -> Option<String> {
		match self {
			Self::Enabled(false) => None,
			Self::Enabled(true) => Some(DEFAULT_RELEASE_TAG.to_string()),
			Self::Tag(tag) => {
				let tag = tag.trim();
				if tag.is_empty() || tag == "@" {
					None
				} else {
					Some(normalize_tag_name(tag))
				}
			}
		}
	}
}

impl Default for ReleaseTagSetting {
	fn default() -> Self {
		Self::Tag(DEFAULT_RELEASE_TAG.to_string())
	}
}

/// Formatting options, loaded from `tsdocfmt.toml`.
///
/// ```toml
/// print_width = 100
/// align_param_tags = true
/// default_release_tag = "@public"
/// only_exported_api = true
/// release_tag_strategy = "keep-last"
/// extra_tags = ["@category"]
///
/// [normalize_tags]
/// "@desc" = "@remarks"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct FormatOptions {
	/// Maximum width of a rendered line, including indentation and the
	/// ` * ` prefix.
	pub print_width: usize,
	/// Column width of a tab in the host indentation.
	pub tab_width: usize,
	/// Prefix style for fenced code lines.
	pub fenced_indent: FencedIndent,
	/// Expand single-line comments even when they would fit on one line.
	pub force_format_tsdoc: bool,
	/// Reorder tags into a conventional sequence.
	pub normalize_tag_order: bool,
	/// Collapse multiple release tags into one.
	pub dedupe_release_tags: bool,
	/// Render each modifier tag on its own line.
	pub split_modifiers: bool,
	/// Keep only the first sentence in the summary, moving the rest to
	/// `@remarks`.
	pub single_sentence_summary: bool,
	/// Additional block tags to recognize.
	pub extra_tags: Vec<String>,
	/// Tag renames applied after the built-in table, e.g. `"@desc" = "@remarks"`.
	pub normalize_tags: BTreeMap<String, String>,
	/// Which release tag survives deduplication.
	pub release_tag_strategy: ReleaseTagStrategy,
	/// Align the hyphen column of `@param` and `@typeParam` tags.
	pub align_param_tags: bool,
	/// Tag inserted into comments without a release tag.
	pub default_release_tag: ReleaseTagSetting,
	/// Only insert the default release tag for exported declarations.
	pub only_exported_api: bool,
	/// Members of classes, interfaces and `@enum` objects inherit their
	/// container's release tag instead of receiving a default.
	pub inheritance_aware: bool,
	/// Whether fenced code is handed to embedded formatters.
	pub embedded_language_formatting: EmbeddedLanguageFormatting,
	/// Rewrite obsolete JSDoc spellings before parsing.
	pub legacy_compatibility: bool,
	/// Gitignore-style patterns skipped by the command line walker.
	pub exclude: Vec<String>,
}

impl Default for FormatOptions {
	fn default() -> Self {
		Self {
			print_width: DEFAULT_PRINT_WIDTH,
			tab_width: 2,
			fenced_indent: FencedIndent::default(),
			force_format_tsdoc: false,
			normalize_tag_order: false,
			dedupe_release_tags: true,
			split_modifiers: true,
			single_sentence_summary: false,
			extra_tags: Vec::new(),
			normalize_tags: BTreeMap::new(),
			release_tag_strategy: ReleaseTagStrategy::default(),
			align_param_tags: false,
			default_release_tag: ReleaseTagSetting::default(),
			only_exported_api: true,
			inheritance_aware: true,
			embedded_language_formatting: EmbeddedLanguageFormatting::default(),
			legacy_compatibility: true,
			exclude: Vec::new(),
		}
	}
}

impl FormatOptions {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load options from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> TsdocResult<Option<FormatOptions>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		Self::from_toml(&content).map(Some)
	}

	/// Parse options from TOML text.
	pub fn from_toml(content: &str) -> TsdocResult<FormatOptions> {
		toml::from_str(content).map_err(|e| TsdocError::ConfigParse(e.to_string()))
	}

	/// The normalized default release tag, or `None` when disabled.
	pub fn default_release_tag(&self) -> Option<String> {
		self.default_release_tag.tag()
	}

	/// The sorted, `@`-prefixed set of extra tags. This is the key used by the
	/// parser cache.
	pub fn extra_tag_set(&self) -> BTreeSet<String> {
		self.extra_tags
			.iter()
			.map(|tag| tag.trim())
			.filter(|tag| !tag.is_empty() && *tag != "@")
			.map(normalize_tag_name)
			.collect()
	}

	/// Width available for comment content once the host indentation and the
	/// ` * ` prefix are accounted for.
	pub fn effective_width(&self, indent_width: usize) -> usize {
		self.print_width
			.saturating_sub(indent_width)
			.saturating_sub(3)
			.max(MIN_CONTENT_WIDTH)
	}

	/// Measure host indentation, expanding tabs to `tab_width` columns.
	pub fn indent_width(&self, indent: &str) -> usize {
		indent
			.chars()
			.map(|ch| if ch == '\t' { self.tab_width } else { 1 })
			.sum()
	}
}

/// Ensure a tag name carries its leading `@`.
pub fn normalize_tag_name(tag: &str) -> String {
	let tag = tag.trim();
	if tag.starts_with('@') {
		tag.to_string()
	} else {
		format!("@{tag}")
	}
}
