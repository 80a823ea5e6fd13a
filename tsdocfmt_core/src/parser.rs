use std::collections::BTreeSet;
use std::ops::Range;

use crate::FormatOptions;
use crate::TsdocResult;
use crate::config::normalize_tag_name;
use crate::lexer::split_sections;
use crate::model::CommentModel;
use crate::model::FILE_OVERVIEW_TAGS;
use crate::model::PACKAGE_DOCUMENTATION_TAG;
use crate::model::ParamKind;
use crate::model::ParamTag;
use crate::model::ReturnsTag;
use crate::model::TagKind;
use crate::model::Tag;
use crate::parser_cache::ParserCache;

/// Built-in tag renames. User `normalize_tags` entries are applied on top.
pub const TAG_NORMALIZATIONS: [(&str, &str); 7] = [
	("@return", "@returns"),
	("@prop", "@property"),
	("@template", "@typeParam"),
	("@arg", "@param"),
	("@argument", "@param"),
	("@exception", "@throws"),
	("@typeparam", "@typeParam"),
];

/// A tag section as produced by a [`CommentParser`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSection {
	/// The tag that opened the section, `None` for the leading summary.
	pub tag: Option<String>,
	/// Everything after the tag name up to the next section.
	pub content: String,
	/// Byte range of the section in the body.
	pub span: Range<usize>,
}

/// Splits a comment body into tag sections.
pub trait CommentParser {
	fn parse_sections(&self, body: &str) -> TsdocResult<Vec<RawSection>>;
}

/// The default parser. Immutable once built, so a single instance is shared
/// through the [`ParserCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsdocParser {
	extra_tags: BTreeSet<String>,
}

impl TsdocParser {
	pub fn new(extra_tags: BTreeSet<String>) -> Self {
		Self { extra_tags }
	}

	pub fn extra_tags(&self) -> &BTreeSet<String> {
		&self.extra_tags
	}

	/// Whether `name` starts a section even in the middle of a line.
	pub fn is_recognized(&self, name: &str) -> bool {
		TagKind::of(name, &self.extra_tags).starts_section()
			|| FILE_OVERVIEW_TAGS.contains(&name)
			|| TAG_NORMALIZATIONS.iter().any(|(from, _)| *from == name)
	}
}

impl CommentParser for TsdocParser {
	fn parse_sections(&self, body: &str) -> TsdocResult<Vec<RawSection>> {
		split_sections(body, |name| self.is_recognized(name))
	}
}

/// Apply the built-in table and then the user's renames.
pub fn normalize_tag(name: &str, options: &FormatOptions) -> String {
	let mut name = TAG_NORMALIZATIONS
		.iter()
		.find(|(from, _)| *from == name)
		.map_or(name, |(_, to)| to)
		.to_string();

	if let Some(target) = options
		.normalize_tags
		.iter()
		.find(|(from, _)| normalize_tag_name(from) == name)
		.map(|(_, to)| normalize_tag_name(to))
	{
		name = target;
	}

	name
}

/// Parse a comment body with the cached parser for `options`, falling back to
/// an unstructured model when the body cannot be parsed.
pub fn parse_comment(body: &str, options: &FormatOptions) -> CommentModel {
	let parser = ParserCache::global().get_or_create(&options.extra_tag_set());
	try_parse_comment_with(parser.as_ref(), body, options)
		.unwrap_or_else(|_| CommentModel::unstructured(body))
}

/// Parse a comment body with an explicit parser.
pub fn try_parse_comment_with(
	parser: &dyn CommentParser,
	body: &str,
	options: &FormatOptions,
) -> TsdocResult<CommentModel> {
	let sections = parser.parse_sections(body)?;
	let mut model = CommentModel::default();
	let mut file_overview = false;

	for section in sections {
		let content = trim_content(&section.content);
		let Some(tag) = section.tag.as_deref() else {
			model.summary = non_empty(content);
			continue;
		};

		let name = normalize_tag(tag, options);
		match name.as_str() {
			"@remarks" => append_text(&mut model.remarks, content),
			"@param" | "@typeParam" => {
				let kind = if name == "@param" {
					ParamKind::Param
				} else {
					ParamKind::TypeParam
				};
				let (param_name, description) = split_param(content);
				model.params.push(ParamTag {
					kind,
					name: param_name,
					description,
					source: Some(section.span.into()),
				});
			}
			"@returns" if model.returns.is_none() => {
				model.returns = Some(ReturnsTag {
					description: content.to_string(),
					source: Some(section.span.into()),
				});
			}
			_ if FILE_OVERVIEW_TAGS.contains(&name.as_str()) => {
				if model.summary.is_some() {
					append_text(&mut model.remarks, content);
				} else {
					model.summary = non_empty(content);
				}
				if !file_overview {
					file_overview = true;
					model
						.other_tags
						.push(Tag::new(PACKAGE_DOCUMENTATION_TAG, "", section.span));
				}
			}
			_ => model.other_tags.push(Tag::new(name, content, section.span)),
		}
	}

	if file_overview {
		dedupe_package_documentation(&mut model);
	}

	if options.single_sentence_summary {
		split_summary(&mut model);
	}

	Ok(model)
}

fn dedupe_package_documentation(model: &mut CommentModel) {
	let mut seen = false;
	model.other_tags.retain(|tag| {
		if tag.name != PACKAGE_DOCUMENTATION_TAG {
			return true;
		}
		let keep = !seen;
		seen = true;
		keep
	});
}

/// Move everything after the first sentence of a single paragraph summary
/// into `@remarks`.
fn split_summary(model: &mut CommentModel) {
	if model.remarks.is_some() {
		return;
	}
	let Some(summary) = model.summary.as_deref() else {
		return;
	};
	if summary.contains("\n\n") || summary.contains("```") || summary.contains("~~~") {
		return;
	}
	let Some(end) = first_sentence_end(summary) else {
		return;
	};

	let rest = summary[end..].trim();
	if rest.is_empty() {
		return;
	}

	model.remarks = Some(rest.to_string());
	model.summary = Some(summary[..end].trim_end().to_string());
}

/// Byte offset just past the sentence terminator of the first sentence, when
/// more text follows it.
fn first_sentence_end(text: &str) -> Option<usize> {
	let bytes = text.as_bytes();
	let mut in_code = false;
	let mut brace_depth = 0usize;

	for (index, &byte) in bytes.iter().enumerate() {
		match byte {
			b'`' => in_code = !in_code,
			b'{' if !in_code => brace_depth += 1,
			b'}' if !in_code => brace_depth = brace_depth.saturating_sub(1),
			b'.' | b'!' | b'?' if !in_code && brace_depth == 0 => {
				let next = bytes.get(index + 1).copied();
				let after = bytes.get(index + 2).copied();
				if matches!(next, Some(b' ' | b'\n'))
					&& after.is_some_and(|ch| ch.is_ascii_uppercase() || ch == b'`' || ch == b'{')
				{
					return Some(index + 1);
				}
			}
			_ => {}
		}
	}

	None
}

/// Split `@param` content into the parameter name and its description. A
/// leading hyphen separator is dropped.
pub fn split_param(content: &str) -> (String, String) {
	let content = content.trim_start();
	let name_end = if content.starts_with('[') {
		matching_bracket(content).map_or_else(|| token_end(content), |end| end + 1)
	} else {
		token_end(content)
	};

	let name = content[..name_end].to_string();
	let rest = content[name_end..].trim_start_matches([' ', '\t']);
	let rest = match rest.strip_prefix('-') {
		Some(stripped) if stripped.is_empty() || stripped.starts_with([' ', '\t', '\n']) => {
			stripped.trim_start_matches([' ', '\t'])
		}
		_ => rest,
	};
	let rest = rest.strip_prefix('\n').unwrap_or(rest);

	(name, trim_content(rest).to_string())
}

fn token_end(text: &str) -> usize {
	text.find(char::is_whitespace).unwrap_or(text.len())
}

fn matching_bracket(text: &str) -> Option<usize> {
	let mut depth = 0usize;
	for (index, ch) in text.char_indices() {
		match ch {
			'[' => depth += 1,
			']' => {
				depth = depth.saturating_sub(1);
				if depth == 0 {
					return Some(index);
				}
			}
			'\n' => return None,
			_ => {}
		}
	}
	None
}

/// Trim surrounding blank space. Lines after the first keep their
/// indentation.
pub(crate) fn trim_content(content: &str) -> &str {
	content.trim()
}

fn non_empty(text: &str) -> Option<String> {
	(!text.is_empty()).then(|| text.to_string())
}

fn append_text(target: &mut Option<String>, text: &str) {
	if text.is_empty() {
		return;
	}
	match target {
		Some(existing) => {
			existing.push_str("\n\n");
			existing.push_str(text);
		}
		None => *target = Some(text.to_string()),
	}
}
