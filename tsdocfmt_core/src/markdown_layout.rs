use markdown::ParseOptions;
use markdown::mdast::Code;
use markdown::mdast::List;
use markdown::mdast::ListItem;
use markdown::mdast::Node;
use markdown::to_mdast;

use crate::FencedIndent;
use crate::doc::Doc;

/// Minimum indentation of wrapped lines in the first paragraph of a list
/// item.
pub const LIST_CONTINUATION_INDENT: usize = 3;

/// A fenced code block found in a text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedSnippet {
	/// The first word of the info string, empty when absent.
	pub language: String,
	pub code: String,
}

/// A top level markdown block.
pub(crate) struct LaidOutBlock {
	pub doc: Doc,
	/// Paragraphs may continue on the line of a preceding tag.
	pub is_paragraph: bool,
}

/// Formats the content of a fenced code block. Receives the language and the
/// raw code and returns the replacement code.
pub(crate) type FormatCode<'a> = dyn Fn(&str, &str) -> String + 'a;

/// Lays out markdown text fields as [`Doc`]s.
pub(crate) struct MarkdownLayout<'a> {
	pub fenced_indent: FencedIndent,
	pub format_code: &'a FormatCode<'a>,
}

impl MarkdownLayout<'_> {
	/// Lay out every top level block of `text`.
	pub fn blocks(&self, text: &str) -> Vec<LaidOutBlock> {
		match parse_markdown(text) {
			Some(Node::Root(root)) => {
				root.children
					.iter()
					.map(|node| {
						LaidOutBlock {
							doc: self.block(text, node),
							is_paragraph: matches!(node, Node::Paragraph(_)),
						}
					})
					.collect()
			}
			_ => {
				vec![LaidOutBlock {
					doc: verbatim_lines(text, 0),
					is_paragraph: false,
				}]
			}
		}
	}

	/// Lay out `text` with blank lines between blocks.
	pub fn document(&self, text: &str) -> Doc {
		join_blocks(self.blocks(text).into_iter().map(|block| block.doc).collect())
	}

	fn block(&self, source: &str, node: &Node) -> Doc {
		let Some(slice) = node_slice(source, node) else {
			return Doc::Concat(vec![]);
		};

		match node {
			Node::Paragraph(_) => paragraph(slice),
			Node::Code(code) if is_fenced(slice) => self.fenced_code(slice, code),
			Node::List(list) => self.list(source, list),
			_ => verbatim_lines(slice, start_column(node)),
		}
	}

	fn fenced_code(&self, slice: &str, code: &Code) -> Doc {
		let mut lines = slice.lines();
		let opening = lines.next().unwrap_or_default().trim().to_string();
		let marker_char = opening.chars().next().unwrap_or('`');
		let marker_len = opening.chars().take_while(|&ch| ch == marker_char).count();
		let closing = slice
			.lines()
			.last()
			.map(str::trim)
			.filter(|line| {
				slice.lines().count() > 1
					&& line.chars().take_while(|&ch| ch == marker_char).count() >= marker_len
			})
			.map_or_else(|| marker_char.to_string().repeat(marker_len), str::to_string);

		let language = code
			.lang
			.as_deref()
			.unwrap_or_default()
			.to_string();
		let formatted = (self.format_code)(&language, &code.value);

		let mut parts = vec![Doc::text(opening)];
		for line in formatted.lines() {
			parts.push(Doc::HardLine);
			parts.push(match self.fenced_indent {
				FencedIndent::Space => Doc::text(line),
				FencedIndent::None => Doc::Verbatim(line.to_string()),
			});
		}
		parts.push(Doc::HardLine);
		parts.push(Doc::text(closing));

		Doc::Concat(parts)
	}

	fn list(&self, source: &str, list: &List) -> Doc {
		let spread = list.spread || list.children.iter().any(|child| match child {
			Node::ListItem(item) => item.spread,
			_ => false,
		});

		let mut parts = Vec::new();
		for child in &list.children {
			let Node::ListItem(item) = child else {
				continue;
			};
			if !parts.is_empty() {
				parts.push(Doc::HardLine);
				if spread {
					parts.push(Doc::HardLine);
				}
			}
			parts.push(self.list_item(source, child, item));
		}

		Doc::Concat(parts)
	}

	fn list_item(&self, source: &str, node: &Node, item: &ListItem) -> Doc {
		let Some(item_start) = node.position().map(|position| position.start.offset) else {
			return Doc::Concat(vec![]);
		};
		let content_start = item
			.children
			.first()
			.and_then(Node::position)
			.map(|position| position.start.offset);

		let marker = match content_start {
			Some(start) => source[item_start..start].trim_end(),
			None => {
				node_slice(source, node)
					.map(str::trim_end)
					.unwrap_or_default()
			}
		};
		let content_offset = marker.chars().count() + 1;

		let Some((first, rest)) = item.children.split_first() else {
			return Doc::text(marker);
		};

		let mut parts = vec![Doc::text(format!("{marker} "))];
		let first_doc = self.block(source, first);
		if matches!(first, Node::Paragraph(_)) {
			let continuation = LIST_CONTINUATION_INDENT.max(content_offset);
			parts.push(Doc::indent(continuation, first_doc));
		} else {
			parts.push(Doc::indent(content_offset, first_doc));
		}

		for child in rest {
			let mut nested = vec![Doc::HardLine];
			if item.spread {
				nested.push(Doc::HardLine);
			}
			nested.push(self.block(source, child));
			parts.push(Doc::indent(content_offset, Doc::Concat(nested)));
		}

		Doc::Concat(parts)
	}
}

/// Join blocks with a blank line between each.
pub(crate) fn join_blocks(blocks: Vec<Doc>) -> Doc {
	let mut parts = Vec::new();
	for block in blocks {
		if !parts.is_empty() {
			parts.push(Doc::HardLine);
			parts.push(Doc::HardLine);
		}
		parts.push(block);
	}
	Doc::Concat(parts)
}

fn parse_markdown(text: &str) -> Option<Node> {
	to_mdast(text, &ParseOptions::gfm()).ok()
}

fn node_slice<'a>(source: &'a str, node: &Node) -> Option<&'a str> {
	let position = node.position()?;
	source.get(position.start.offset..position.end.offset)
}

fn start_column(node: &Node) -> usize {
	node.position()
		.map_or(0, |position| position.start.column.saturating_sub(1))
}

fn is_fenced(slice: &str) -> bool {
	let trimmed = slice.trim_start();
	trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// A paragraph as a fill of words. Words that would change the block
/// structure when starting a line are kept on the previous word's line.
fn paragraph(slice: &str) -> Doc {
	let mut words: Vec<String> = Vec::new();
	for word in slice.split_whitespace() {
		match words.last_mut() {
			Some(previous) if must_not_start_line(word) => {
				previous.push(' ');
				previous.push_str(word);
			}
			_ => words.push(word.to_string()),
		}
	}

	Doc::fill_words(words.iter().map(String::as_str))
}

/// Whether `word` could be read as block syntax or a tag at the start of a
/// line.
pub(crate) fn must_not_start_line(word: &str) -> bool {
	if matches!(word, "-" | "+" | "*") {
		return true;
	}
	if word.starts_with(['@', '>', '<']) || word.starts_with("```") || word.starts_with("~~~") {
		return true;
	}
	if word.chars().all(|ch| ch == '#') || word.chars().all(|ch| ch == '=') {
		return true;
	}
	if word.len() >= 2 && word.chars().all(|ch| matches!(ch, '-' | '*' | '_')) {
		return true;
	}

	let digits = word.chars().take_while(char::is_ascii_digit).count();
	digits > 0 && digits <= 9 && matches!(&word[digits..], "." | ")")
}

/// Emit each line of `slice` unchanged, removing up to `column` leading spaces
/// from every line after the first.
fn verbatim_lines(slice: &str, column: usize) -> Doc {
	let lines = slice.trim_end().lines().enumerate().map(|(index, line)| {
		if index == 0 {
			Doc::text(line)
		} else {
			Doc::text(strip_indent(line, column))
		}
	});
	Doc::join_lines(lines)
}

fn strip_indent(line: &str, column: usize) -> &str {
	let leading = line
		.chars()
		.take(column)
		.take_while(|ch| *ch == ' ')
		.count();
	&line[leading..]
}

/// Collect every fenced code block in `text`, including those nested in
/// lists and block quotes.
pub fn fenced_snippets(text: &str) -> Vec<FencedSnippet> {
	let mut snippets = Vec::new();
	if let Some(root) = parse_markdown(text) {
		collect_snippets(text, &root, &mut snippets);
	}
	snippets
}

fn collect_snippets(source: &str, node: &Node, snippets: &mut Vec<FencedSnippet>) {
	match node {
		Node::Code(code) if node_slice(source, node).is_some_and(is_fenced) => {
			snippets.push(FencedSnippet {
				language: code.lang.clone().unwrap_or_default(),
				code: code.value.clone(),
			});
		}
		_ => {
			if let Some(children) = node.children() {
				for child in children {
					collect_snippets(source, child, snippets);
				}
			}
		}
	}
}

/// Strip trailing whitespace from every line and drop leading and trailing
/// blank lines.
pub fn clean_snippet(code: &str) -> String {
	let lines: Vec<&str> = code.lines().map(str::trim_end).collect();
	let start = lines.iter().position(|line| !line.is_empty());
	let end = lines.iter().rposition(|line| !line.is_empty());

	match (start, end) {
		(Some(start), Some(end)) => lines[start..=end].join("\n"),
		_ => String::new(),
	}
}
