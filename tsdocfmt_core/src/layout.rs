use std::collections::HashMap;

use crate::AsyncEmbeddedFormatter;
use crate::CommentModel;
use crate::Diagnostics;
use crate::EmbeddedFormatterRegistry;
use crate::EmbeddedLanguageFormatting;
use crate::FormatOptions;
use crate::NoopDiagnostics;
use crate::ParamTag;
use crate::Stage;
use crate::Tag;
use crate::TsdocError;
use crate::TsdocResult;
use crate::doc::Doc;
use crate::doc::PrintedLine;
use crate::doc::print;
use crate::doc::text_width;
use crate::markdown_layout::FormatCode;
use crate::markdown_layout::MarkdownLayout;
use crate::markdown_layout::clean_snippet;
use crate::markdown_layout::fenced_snippets;
use crate::markdown_layout::join_blocks;

/// Everything `render_with` needs besides the model and options.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
	/// Host indentation in front of the comment's `/**`.
	pub indent: &'a str,
	/// The comment was written on a single line.
	pub single_line: bool,
	pub registry: &'a EmbeddedFormatterRegistry,
	pub diagnostics: &'a dyn Diagnostics,
}

impl Default for RenderContext<'_> {
	fn default() -> Self {
		Self {
			indent: "",
			single_line: false,
			registry: EmbeddedFormatterRegistry::global(),
			diagnostics: &NoopDiagnostics,
		}
	}
}

/// Render a comment model as a `/** ... */` comment with no host
/// indentation.
pub fn render(model: &CommentModel, options: &FormatOptions) -> TsdocResult<String> {
	render_with(model, options, &RenderContext::default())
}

/// Render a comment model using the registry in `context` for fenced code.
pub fn render_with(
	model: &CommentModel,
	options: &FormatOptions,
	context: &RenderContext<'_>,
) -> TsdocResult<String> {
	let format_code = |language: &str, code: &str| {
		context
			.registry
			.format_snippet(language, code, &nested_options(options, context.indent), context.diagnostics)
	};

	CommentLayout::new(options, context.indent, context.single_line, &format_code).render(model)
}

/// Render a comment model, formatting fenced code with an asynchronous
/// formatter first. A snippet whose formatter fails keeps its cleaned
/// content.
pub async fn render_async<F: AsyncEmbeddedFormatter>(
	model: &CommentModel,
	options: &FormatOptions,
	indent: &str,
	formatter: &F,
	diagnostics: &dyn Diagnostics,
) -> TsdocResult<String> {
	let mut formatted: HashMap<(String, String), String> = HashMap::new();

	if options.embedded_language_formatting == EmbeddedLanguageFormatting::Auto && !model.unstructured {
		for text in model.text_fields() {
			for snippet in fenced_snippets(text) {
				let key = (snippet.language, snippet.code);
				if formatted.contains_key(&key) {
					continue;
				}
				match formatter.format(&key.0, &key.1).await {
					Ok(code) => {
						formatted.insert(key, clean_snippet(&code));
					}
					Err(error) => diagnostics.report(Stage::EmbeddedFormat, &error),
				}
			}
		}
	}

	let format_code = |language: &str, code: &str| {
		formatted
			.get(&(language.to_string(), code.to_string()))
			.cloned()
			.unwrap_or_else(|| clean_snippet(code))
	};

	CommentLayout::new(options, indent, false, &format_code).render(model)
}

/// Options for code nested in a comment: the comment prefix and host
/// indentation reduce the available width.
fn nested_options(options: &FormatOptions, indent: &str) -> FormatOptions {
	let mut nested = options.clone();
	nested.print_width = options.effective_width(options.indent_width(indent));
	nested
}

struct CommentLayout<'a> {
	options: &'a FormatOptions,
	indent: &'a str,
	single_line: bool,
	markdown: MarkdownLayout<'a>,
}

impl<'a> CommentLayout<'a> {
	fn new(
		options: &'a FormatOptions,
		indent: &'a str,
		single_line: bool,
		format_code: &'a FormatCode<'a>,
	) -> Self {
		Self {
			options,
			indent,
			single_line,
			markdown: MarkdownLayout {
				fenced_indent: options.fenced_indent,
				format_code,
			},
		}
	}

	fn width(&self) -> usize {
		self.options
			.effective_width(self.options.indent_width(self.indent))
	}

	fn render(&self, model: &CommentModel) -> TsdocResult<String> {
		if model.unstructured {
			return self.frame(unstructured_lines(model));
		}

		if let Some(single) = self.single_line_form(model) {
			return Ok(single);
		}

		let lines = print(&self.body(model), self.width()).into_inner();
		self.frame(lines)
	}

	fn body(&self, model: &CommentModel) -> Doc {
		let mut sections = Vec::new();

		if let Some(summary) = &model.summary {
			sections.push(self.markdown.document(summary));
		}

		if let Some(remarks) = &model.remarks {
			sections.push(Doc::Concat(vec![
				Doc::text("@remarks"),
				Doc::HardLine,
				self.markdown.document(remarks),
			]));
		}

		let mut params: Vec<Doc> = self.params(&model.params);
		if let Some(returns) = &model.returns {
			params.push(self.tag_content("@returns", &returns.description));
		}
		if !params.is_empty() {
			sections.push(Doc::join_lines(params));
		}

		sections.extend(self.other_tags(&model.other_tags));

		join_blocks(sections)
	}

	fn params(&self, params: &[ParamTag]) -> Vec<Doc> {
		let heads: Vec<String> = params
			.iter()
			.map(|param| {
				if param.name.is_empty() {
					param.kind.tag_name().to_string()
				} else {
					format!("{} {}", param.kind.tag_name(), param.name)
				}
			})
			.collect();
		let column = if self.options.align_param_tags {
			heads.iter().map(|head| text_width(head)).max().unwrap_or(0)
		} else {
			0
		};

		params
			.iter()
			.zip(heads)
			.map(|(param, head)| {
				if param.description.is_empty() {
					return Doc::text(head);
				}
				let padding = column.saturating_sub(text_width(&head));
				let prefix = format!("{head}{} -", " ".repeat(padding));
				self.tag_content(&prefix, &param.description)
			})
			.collect()
	}

	/// Modifier runs and block tags, each its own section.
	fn other_tags(&self, tags: &[Tag]) -> Vec<Doc> {
		let mut sections = Vec::new();
		let mut modifiers: Vec<&str> = Vec::new();

		for tag in tags {
			if tag.content.is_empty() {
				modifiers.push(&tag.name);
				continue;
			}
			if !modifiers.is_empty() {
				sections.push(self.modifier_run(&std::mem::take(&mut modifiers)));
			}
			sections.push(self.tag_content(&tag.name, &tag.content));
		}

		if !modifiers.is_empty() {
			sections.push(self.modifier_run(&modifiers));
		}

		sections
	}

	fn modifier_run(&self, names: &[&str]) -> Doc {
		if self.options.split_modifiers {
			Doc::join_lines(names.iter().map(|name| Doc::text(*name)))
		} else {
			Doc::text(names.join(" "))
		}
	}

	/// A tag followed by markdown content. A leading paragraph continues on
	/// the tag line.
	fn tag_content(&self, prefix: &str, content: &str) -> Doc {
		let mut blocks = self.markdown.blocks(content).into_iter();
		let Some(first) = blocks.next() else {
			return Doc::text(prefix);
		};

		let head = if first.is_paragraph {
			Doc::Concat(vec![Doc::text(format!("{prefix} ")), first.doc])
		} else {
			Doc::Concat(vec![Doc::text(prefix), Doc::HardLine, first.doc])
		};

		let mut parts = vec![head];
		parts.extend(blocks.map(|block| block.doc));
		join_blocks(parts)
	}

	/// `/** text */` for a single line comment that only has a short summary.
	fn single_line_form(&self, model: &CommentModel) -> Option<String> {
		if !self.single_line || self.options.force_format_tsdoc {
			return None;
		}
		if model.is_empty() {
			return Some("/** */".to_string());
		}
		if !model.is_summary_only() {
			return None;
		}

		let summary = model.summary.as_deref()?;
		let blocks = self.markdown.blocks(summary);
		if blocks.len() != 1 || !blocks[0].is_paragraph {
			return None;
		}
		let text = summary.split_whitespace().collect::<Vec<_>>().join(" ");

		let width = self.options.indent_width(self.indent) + text_width(&text) + "/**  */".len();
		if width > self.options.print_width || text.contains("*/") {
			return None;
		}

		Some(format!("/** {text} */"))
	}

	/// Wrap printed lines in comment delimiters.
	fn frame(&self, lines: Vec<PrintedLine>) -> TsdocResult<String> {
		let indent = self.indent;
		let mut output = String::from("/**");

		for line in lines {
			if line.text.contains("*/") {
				return Err(TsdocError::Render(format!(
					"line `{}` would close the comment early",
					line.text
				)));
			}

			output.push('\n');
			match (line.prefixed, line.text.is_empty()) {
				(true, true) => {
					output.push_str(indent);
					output.push_str(" *");
				}
				(true, false) => {
					output.push_str(indent);
					output.push_str(" * ");
					output.push_str(&line.text);
				}
				(false, true) => {}
				(false, false) => {
					output.push_str(indent);
					output.push_str(&line.text);
				}
			}
		}

		output.push('\n');
		output.push_str(indent);
		output.push_str(" */");

		Ok(output)
	}
}

/// The body of an unstructured model, line for line.
fn unstructured_lines(model: &CommentModel) -> Vec<PrintedLine> {
	model
		.summary
		.as_deref()
		.unwrap_or_default()
		.lines()
		.map(|line| {
			PrintedLine {
				text: line.trim_end().to_string(),
				prefixed: true,
			}
		})
		.collect()
}
