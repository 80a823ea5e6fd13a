use std::sync::Once;

use metrics::counter;
use metrics::describe_counter;

use crate::CommentModel;
use crate::ContextSource;
use crate::Diagnostics;
use crate::EmbeddedFormatterRegistry;
use crate::FormatOptions;
use crate::ParserCache;
use crate::RenderContext;
use crate::Stage;
use crate::analyze;
use crate::legacy;
use crate::parser::try_parse_comment_with;
use crate::policy;
use crate::render_with;
use crate::source_scanner::CommentTarget;
use crate::source_scanner::scan_source;

pub const COMMENTS_FORMATTED_TOTAL: &str = "tsdocfmt_comments_formatted_total";
pub const COMMENTS_SKIPPED_TOTAL: &str = "tsdocfmt_comments_skipped_total";

static DESCRIBE_METRICS: Once = Once::new();

fn describe_metrics() {
	DESCRIBE_METRICS.call_once(|| {
		describe_counter!(
			COMMENTS_FORMATTED_TOTAL,
			"Documentation comments rendered by the formatter."
		);
		describe_counter!(
			COMMENTS_SKIPPED_TOTAL,
			"Documentation comments left unchanged after a render failure."
		);
	});
}

/// The body of a `/** ... */` comment with its delimiters and line prefixes
/// removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedComment {
	pub body: String,
	/// The comment opened and closed on the same line.
	pub single_line: bool,
}

/// Strip the `/**` and `*/` delimiters and the ` * ` prefix of every line.
///
/// Lines without a leading `*` (fenced code written with
/// `fenced_indent = "none"`) lose only the host `indent`. Leading and trailing
/// blank lines are dropped. Returns `None` when `raw` is not a documentation
/// comment.
pub fn extract_body(raw: &str, indent: &str) -> Option<ExtractedComment> {
	let inner = raw.strip_prefix("/**")?.strip_suffix("*/")?;

	if !inner.contains('\n') {
		return Some(ExtractedComment {
			body: inner.trim().to_string(),
			single_line: true,
		});
	}

	let mut lines: Vec<&str> = Vec::new();
	for (index, line) in inner.split('\n').enumerate() {
		let line = line.strip_suffix('\r').unwrap_or(line);
		let stripped = if index == 0 {
			line.trim()
		} else if let Some(rest) = line.trim_start().strip_prefix('*') {
			rest.strip_prefix(' ').unwrap_or(rest)
		} else {
			line.strip_prefix(indent).unwrap_or(line)
		};
		lines.push(stripped.trim_end());
	}

	let start = lines.iter().position(|line| !line.is_empty());
	let end = lines.iter().rposition(|line| !line.is_empty());
	let body = match (start, end) {
		(Some(start), Some(end)) => lines[start..=end].join("\n"),
		_ => String::new(),
	};

	Some(ExtractedComment {
		body,
		single_line: false,
	})
}

/// Format a single documentation comment using the built in embedded
/// formatters.
///
/// Never fails: any stage that cannot complete is reported to `diagnostics`
/// and the comment is returned unchanged.
pub fn format_comment(
	raw: &str,
	indent: &str,
	source: ContextSource<'_>,
	options: &FormatOptions,
	diagnostics: &dyn Diagnostics,
) -> String {
	format_comment_with(
		raw,
		indent,
		source,
		options,
		EmbeddedFormatterRegistry::global(),
		diagnostics,
	)
}

/// Format a single documentation comment with a custom embedded formatter
/// registry.
pub fn format_comment_with(
	raw: &str,
	indent: &str,
	source: ContextSource<'_>,
	options: &FormatOptions,
	registry: &EmbeddedFormatterRegistry,
	diagnostics: &dyn Diagnostics,
) -> String {
	describe_metrics();

	let Some(extracted) = extract_body(raw, indent) else {
		return raw.to_string();
	};

	let body = legacy::transform(&extracted.body, options);
	let parser = ParserCache::global().get_or_create(&options.extra_tag_set());
	let mut model = try_parse_comment_with(parser.as_ref(), &body, options).unwrap_or_else(|error| {
		diagnostics.report(Stage::Parse, &error);
		CommentModel::unstructured(extracted.body.clone())
	});

	let context = analyze(source, options, diagnostics);
	policy::apply(&mut model, &context, options);

	let render_context = RenderContext {
		indent,
		single_line: extracted.single_line,
		registry,
		diagnostics,
	};

	match render_with(&model, options, &render_context) {
		Ok(formatted) => {
			counter!(COMMENTS_FORMATTED_TOTAL).increment(1);
			formatted
		}
		Err(error) => {
			diagnostics.report(Stage::Render, &error);
			counter!(COMMENTS_SKIPPED_TOTAL).increment(1);
			raw.to_string()
		}
	}
}

/// Format every documentation comment in a TypeScript or JavaScript source
/// file. Code outside of comments is never touched.
pub fn format_source(source: &str, options: &FormatOptions, diagnostics: &dyn Diagnostics) -> String {
	format_source_with(source, options, EmbeddedFormatterRegistry::global(), diagnostics)
}

pub fn format_source_with(
	source: &str,
	options: &FormatOptions,
	registry: &EmbeddedFormatterRegistry,
	diagnostics: &dyn Diagnostics,
) -> String {
	let scanned = scan_source(source);
	let mut result = source.to_string();

	// Process comments in reverse offset order so earlier replacements don't
	// shift the positions of later ones.
	for comment in scanned.comments.iter().rev() {
		let context = match comment.target {
			CommentTarget::FileHeader => ContextSource::FileHeader,
			CommentTarget::Declaration(id) => {
				ContextSource::Tree {
					provider: &scanned.tree,
					id,
				}
			}
			CommentTarget::Detached => ContextSource::Detached,
		};

		let Some(raw) = source.get(comment.range.clone()) else {
			continue;
		};
		let formatted = format_comment_with(raw, &comment.indent, context, options, registry, diagnostics);
		if formatted != raw {
			result.replace_range(comment.range.clone(), &formatted);
		}
	}

	result
}
