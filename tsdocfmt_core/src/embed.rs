use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::LazyLock;

use crate::Diagnostics;
use crate::EmbeddedLanguageFormatting;
use crate::FormatOptions;
use crate::Stage;
use crate::TsdocError;
use crate::TsdocResult;
use crate::engine::format_source;
use crate::markdown_layout::clean_snippet;

static DEFAULT_REGISTRY: LazyLock<EmbeddedFormatterRegistry> =
	LazyLock::new(EmbeddedFormatterRegistry::default);

/// Language aliases resolved before a formatter is looked up.
pub const LANGUAGE_ALIASES: [(&str, &str); 10] = [
	("ts", "typescript"),
	("tsx", "typescript"),
	("mts", "typescript"),
	("cts", "typescript"),
	("js", "javascript"),
	("jsx", "javascript"),
	("mjs", "javascript"),
	("cjs", "javascript"),
	("node", "javascript"),
	("json5", "jsonc"),
];

/// Formats the content of fenced code blocks for one or more languages.
pub trait EmbeddedFormatter: Send + Sync {
	/// Canonical language names handled by this formatter.
	fn languages(&self) -> &[&str];

	fn format(
		&self,
		code: &str,
		options: &FormatOptions,
		diagnostics: &dyn Diagnostics,
	) -> TsdocResult<String>;
}

/// An embedded formatter that completes asynchronously, e.g. by calling out to
/// another process.
pub trait AsyncEmbeddedFormatter {
	fn format(&self, language: &str, code: &str) -> impl Future<Output = TsdocResult<String>>;
}

/// Runs TypeScript and JavaScript through [`format_source`]. Code is left
/// alone; only complete doc comments are formatted, so a snippet taken from
/// inside another doc comment is just trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptFormatter;

impl EmbeddedFormatter for ScriptFormatter {
	fn languages(&self) -> &[&str] {
		&["typescript", "javascript"]
	}

	fn format(
		&self,
		code: &str,
		options: &FormatOptions,
		diagnostics: &dyn Diagnostics,
	) -> TsdocResult<String> {
		Ok(format_source(code, options, diagnostics))
	}
}

/// Pretty prints JSON with two space indentation, keeping key order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl EmbeddedFormatter for JsonFormatter {
	fn languages(&self) -> &[&str] {
		&["json"]
	}

	fn format(
		&self,
		code: &str,
		_options: &FormatOptions,
		_diagnostics: &dyn Diagnostics,
	) -> TsdocResult<String> {
		let value: serde_json::Value =
			serde_json::from_str(code).map_err(|e| TsdocError::embedded("json", e))?;
		serde_json::to_string_pretty(&value).map_err(|e| TsdocError::embedded("json", e))
	}
}

/// Embedded formatters keyed by language.
#[derive(Clone)]
pub struct EmbeddedFormatterRegistry {
	formatters: BTreeMap<String, Arc<dyn EmbeddedFormatter>>,
}

impl Default for EmbeddedFormatterRegistry {
	/// The built in TypeScript, JavaScript and JSON formatters.
	fn default() -> Self {
		let mut registry = Self::empty();
		registry.register(Arc::new(ScriptFormatter));
		registry.register(Arc::new(JsonFormatter));
		registry
	}
}

impl std::fmt::Debug for EmbeddedFormatterRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EmbeddedFormatterRegistry")
			.field("languages", &self.formatters.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl EmbeddedFormatterRegistry {
	pub fn empty() -> Self {
		Self {
			formatters: BTreeMap::new(),
		}
	}

	/// The shared registry with the built in formatters.
	pub fn global() -> &'static EmbeddedFormatterRegistry {
		&DEFAULT_REGISTRY
	}

	/// Register `formatter` for each of its languages, replacing any existing
	/// entry.
	pub fn register(&mut self, formatter: Arc<dyn EmbeddedFormatter>) {
		for language in formatter.languages() {
			self.formatters
				.insert(language.to_ascii_lowercase(), Arc::clone(&formatter));
		}
	}

	pub fn get(&self, language: &str) -> Option<&dyn EmbeddedFormatter> {
		self.formatters
			.get(&canonical_language(language))
			.map(AsRef::as_ref)
	}

	pub fn languages(&self) -> impl Iterator<Item = &str> {
		self.formatters.keys().map(String::as_str)
	}

	/// Format a fenced snippet, falling back to the cleaned original when the
	/// language is unknown or the formatter fails.
	pub fn format_snippet(
		&self,
		language: &str,
		code: &str,
		options: &FormatOptions,
		diagnostics: &dyn Diagnostics,
	) -> String {
		if options.embedded_language_formatting == EmbeddedLanguageFormatting::Off {
			return clean_snippet(code);
		}

		let Some(formatter) = self.get(language) else {
			return clean_snippet(code);
		};

		match formatter.format(code, options, diagnostics) {
			Ok(formatted) => clean_snippet(&formatted),
			Err(error) => {
				diagnostics.report(Stage::EmbeddedFormat, &error);
				clean_snippet(code)
			}
		}
	}
}

/// Lowercase the first word of an info string and resolve aliases.
pub fn canonical_language(info: &str) -> String {
	let language = info
		.split(|ch: char| ch.is_whitespace() || ch == '{' || ch == ',')
		.next()
		.unwrap_or_default()
		.to_ascii_lowercase();

	LANGUAGE_ALIASES
		.iter()
		.find(|(alias, _)| *alias == language)
		.map_or(language, |(_, canonical)| (*canonical).to_string())
}
