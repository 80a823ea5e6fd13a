use std::ops::Range;
use std::sync::LazyLock;

use regex::Captures;
use regex::Regex;

use crate::context::Declaration;
use crate::context::DeclarationId;
use crate::context::DeclarationTree;
use crate::model::FILE_OVERVIEW_TAGS;
use crate::model::PACKAGE_DOCUMENTATION_TAG;

/// How a line relates to fenced code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceLine {
	Text,
	Open,
	Code,
	Close,
}

impl FenceLine {
	/// `true` for the fence lines themselves and everything between them.
	pub fn is_code(self) -> bool {
		!matches!(self, Self::Text)
	}
}

/// Tracks fenced code blocks across lines of markdown text.
#[derive(Debug, Clone, Default)]
pub struct FenceTracker {
	/// Marker character and length of the open fence.
	open: Option<(char, usize)>,
}

impl FenceTracker {
	pub fn observe(&mut self, line: &str) -> FenceLine {
		let stripped = line.trim_start();

		if let Some((fence_char, fence_len)) = self.open {
			// Check for closing fence: same char, at least same length, no
			// info string.
			let closing_fence_len = stripped.chars().take_while(|&c| c == fence_char).count();
			let after_fence = &stripped[closing_fence_len * fence_char.len_utf8()..];
			if closing_fence_len >= fence_len && after_fence.trim().is_empty() {
				self.open = None;
				return FenceLine::Close;
			}
			return FenceLine::Code;
		}

		match fence_opening(stripped) {
			Some(fence) => {
				self.open = Some(fence);
				FenceLine::Open
			}
			None => FenceLine::Text,
		}
	}

	pub fn is_open(&self) -> bool {
		self.open.is_some()
	}
}

/// Check for an opening fence: 3+ backticks or tildes. A backtick fence may
/// not have backticks in its info string.
fn fence_opening(stripped: &str) -> Option<(char, usize)> {
	let backtick_len = stripped.chars().take_while(|&c| c == '`').count();
	let tilde_len = stripped.chars().take_while(|&c| c == '~').count();

	if backtick_len >= 3 {
		(!stripped[backtick_len..].contains('`')).then_some(('`', backtick_len))
	} else if tilde_len >= 3 {
		Some(('~', tilde_len))
	} else {
		None
	}
}

/// What a scanned documentation comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentTarget {
	FileHeader,
	Declaration(DeclarationId),
	Detached,
}

/// A `/** ... */` comment found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedComment {
	/// Byte range of the comment including its delimiters.
	pub range: Range<usize>,
	/// Leading whitespace of the line the comment starts on.
	pub indent: String,
	pub target: CommentTarget,
}

/// Every documentation comment in a file together with the declarations they
/// document.
#[derive(Debug, Clone, Default)]
pub struct ScannedSource {
	pub comments: Vec<ScannedComment>,
	pub tree: DeclarationTree,
}

static DECLARATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"^(?:@[\w$.]+(?:\([^)]*\))?\s*)*(export\s+)?(default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(function\s*\*?|class|interface|type|namespace|module|global|const\s+enum|enum|const|let|var)(?:\s+|\s*\{|$)([A-Za-z_$][\w$]*)?",
	)
	.ok()
});
static OBJECT_INITIALIZER: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^\s*(?::[^=;\n]*)?=\s*\{").ok());
static DEFAULT_OBJECT: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^export\s+default\s*\{").ok());
static EXPORT_LIST: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^export(?:\s+type)?$").ok());
static DEFAULT_EXPORT_NAME: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^export\s+default\s+([A-Za-z_$][\w$]*)$").ok());
static MEMBER_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r#"^(?:(?:public|private|protected|static|readonly|abstract|async|declare|override|get|set|accessor)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*|'[^']*'|"[^"]*"|\d+|\[[^\]]*\])"#,
	)
	.ok()
});

/// The kind of body a brace opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
	Class,
	Interface,
	Namespace,
	ObjectLiteral,
	Block,
	ExportList,
	/// A `${` substitution inside a template literal.
	Template,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
	kind: FrameKind,
	owner: Option<DeclarationId>,
	start: usize,
}

/// Walks TypeScript or JavaScript source, skipping strings, templates,
/// regular expressions and ordinary comments while tracking brace nesting.
struct SourceScanner<'a> {
	text: &'a str,
	bytes: &'a [u8],
	pos: usize,
	frames: Vec<Frame>,
	/// Offset of the first significant character of the current statement.
	statement_start: Option<usize>,
	/// Comments waiting for the declaration that follows them.
	pending: Vec<usize>,
	seen_code: bool,
	/// The most recent declaration and the offset its statement starts at.
	last_declaration: Option<(usize, DeclarationId)>,
	last_significant: Option<u8>,
	comments: Vec<ScannedComment>,
	tree: DeclarationTree,
}

impl<'a> SourceScanner<'a> {
	fn new(text: &'a str) -> Self {
		Self {
			text,
			bytes: text.as_bytes(),
			pos: 0,
			frames: Vec::new(),
			statement_start: None,
			pending: Vec::new(),
			seen_code: false,
			last_declaration: None,
			last_significant: None,
			comments: Vec::new(),
			tree: DeclarationTree::new(),
		}
	}

	fn frame_kind(&self) -> Option<FrameKind> {
		self.frames.last().map(|frame| frame.kind)
	}

	fn owner(&self) -> Option<DeclarationId> {
		self.frames.last().and_then(|frame| frame.owner)
	}

	fn starts_with(&self, needle: &str) -> bool {
		self.bytes[self.pos..].starts_with(needle.as_bytes())
	}

	fn scan(mut self) -> ScannedSource {
		while self.pos < self.bytes.len() {
			let byte = self.bytes[self.pos];
			match byte {
				b'/' if self.starts_with("/**") && !self.starts_with("/**/") => {
					self.doc_comment();
				}
				b'/' if self.starts_with("/*") => self.skip_block_comment(),
				b'/' if self.starts_with("//") => self.skip_line(),
				b'/' if self.regex_allowed() => {
					self.significant(self.pos);
					self.skip_regex();
					self.last_significant = Some(b'/');
				}
				b'\'' | b'"' => {
					self.significant(self.pos);
					self.skip_string(byte);
					self.last_significant = Some(byte);
				}
				b'`' => {
					self.significant(self.pos);
					self.pos += 1;
					self.skip_template();
				}
				b'{' => self.open_brace(),
				b'}' => self.close_brace(),
				b';' => {
					self.end_statement();
					self.pos += 1;
					self.last_significant = Some(b';');
				}
				b',' if self.frame_kind() == Some(FrameKind::ObjectLiteral) => {
					self.statement_start = None;
					self.pos += 1;
					self.last_significant = Some(b',');
				}
				_ if byte.is_ascii_whitespace() => self.pos += 1,
				_ if is_identifier_byte(byte) => {
					self.significant(self.pos);
					while self.pos < self.bytes.len() && is_identifier_byte(self.bytes[self.pos]) {
						self.pos += 1;
					}
					self.last_significant = Some(b'a');
				}
				_ => {
					self.significant(self.pos);
					self.pos += 1;
					self.last_significant = Some(byte);
				}
			}
		}

		self.resolve_pending_as_detached();
		ScannedSource {
			comments: self.comments,
			tree: self.tree,
		}
	}

	fn doc_comment(&mut self) {
		let start = self.pos;
		let end = memstr(&self.bytes[start + 3..], b"*/").map_or(self.bytes.len(), |offset| start + 3 + offset + 2);
		self.pos = end;
		if end > self.bytes.len() || !self.text[start..end].ends_with("*/") {
			return;
		}

		self.comments.push(ScannedComment {
			range: start..end,
			indent: line_indent(self.text, start),
			target: CommentTarget::Detached,
		});
		self.pending.push(self.comments.len() - 1);
		// A documentation comment always precedes a new declaration.
		if self.frame_kind() != Some(FrameKind::Template) {
			self.statement_start = None;
		}
	}

	fn skip_block_comment(&mut self) {
		self.pos = memstr(&self.bytes[self.pos + 2..], b"*/")
			.map_or(self.bytes.len(), |offset| self.pos + 2 + offset + 2);
	}

	fn skip_line(&mut self) {
		self.pos = memstr(&self.bytes[self.pos..], b"\n").map_or(self.bytes.len(), |offset| self.pos + offset);
	}

	fn skip_string(&mut self, quote: u8) {
		self.pos += 1;
		while self.pos < self.bytes.len() {
			match self.bytes[self.pos] {
				b'\\' => self.pos += 2,
				b'\n' => return,
				byte if byte == quote => {
					self.pos += 1;
					return;
				}
				_ => self.pos += 1,
			}
		}
	}

	/// Skip template literal text up to the closing backtick or the next
	/// `${` substitution.
	fn skip_template(&mut self) {
		while self.pos < self.bytes.len() {
			match self.bytes[self.pos] {
				b'\\' => self.pos += 2,
				b'`' => {
					self.pos += 1;
					self.last_significant = Some(b'`');
					return;
				}
				b'$' if self.bytes.get(self.pos + 1) == Some(&b'{') => {
					self.frames.push(Frame {
						kind: FrameKind::Template,
						owner: self.owner(),
						start: self.pos + 1,
					});
					self.pos += 2;
					self.last_significant = Some(b'{');
					return;
				}
				_ => self.pos += 1,
			}
		}
	}

	fn regex_allowed(&self) -> bool {
		self.last_significant
			.is_none_or(|byte| b"(,=:[!&|?{};+-*%<>~^".contains(&byte))
	}

	fn skip_regex(&mut self) {
		let mut in_class = false;
		self.pos += 1;
		while self.pos < self.bytes.len() {
			match self.bytes[self.pos] {
				b'\\' => self.pos += 2,
				b'\n' => return,
				b'[' => {
					in_class = true;
					self.pos += 1;
				}
				b']' => {
					in_class = false;
					self.pos += 1;
				}
				b'/' if !in_class => {
					self.pos += 1;
					while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphabetic() {
						self.pos += 1;
					}
					return;
				}
				_ => self.pos += 1,
			}
		}
	}

	/// Record the first significant character of a statement and attach any
	/// waiting comments.
	fn significant(&mut self, pos: usize) {
		if self.statement_start.is_none() {
			self.statement_start = Some(pos);
		}

		if !self.pending.is_empty() {
			self.attach_pending(pos);
		}
		self.seen_code = true;
	}

	fn attach_pending(&mut self, pos: usize) {
		let pending = std::mem::take(&mut self.pending);
		let Some((&last, earlier)) = pending.split_last() else {
			return;
		};

		let mut earlier = earlier.to_vec();
		let statement = &self.text[pos..];
		let header_index = (!self.seen_code)
			.then(|| pending.first().copied())
			.flatten()
			.filter(|&first| {
				pending.len() > 1 || self.is_file_header(first, statement)
			});

		if header_index == Some(last) {
			self.comments[last].target = CommentTarget::FileHeader;
			return;
		}
		if let Some(header) = header_index {
			self.comments[header].target = CommentTarget::FileHeader;
			earlier.retain(|&index| index != header);
		}
		for index in earlier {
			self.comments[index].target = CommentTarget::Detached;
		}

		let declaration = self.parse_declaration(statement);
		let doc = self.text[self.comments[last].range.clone()].to_string();
		let id = self.tree.push(declaration, self.owner(), Some(doc));
		self.comments[last].target = CommentTarget::Declaration(id);
		self.last_declaration = Some((pos, id));
	}

	fn is_file_header(&self, index: usize, statement: &str) -> bool {
		let comment = &self.text[self.comments[index].range.clone()];
		FILE_OVERVIEW_TAGS
			.iter()
			.chain([&PACKAGE_DOCUMENTATION_TAG, &"@module"])
			.any(|tag| contains_tag(comment, tag))
			|| statement.starts_with("import ")
			|| statement.starts_with("import{")
			|| statement.starts_with("'use strict'")
			|| statement.starts_with("\"use strict\"")
	}

	fn resolve_pending_as_detached(&mut self) {
		let pending = std::mem::take(&mut self.pending);
		for index in pending {
			let is_header = !self.seen_code && index == 0;
			self.comments[index].target = if is_header {
				CommentTarget::FileHeader
			} else {
				CommentTarget::Detached
			};
		}
	}

	/// Build the declaration a statement starting at `statement` introduces,
	/// given the body it appears in.
	fn parse_declaration(&self, statement: &str) -> Declaration {
		let first_line = statement.lines().next().unwrap_or_default();
		match self.frame_kind() {
			Some(FrameKind::Class | FrameKind::Interface) => {
				Declaration::Member {
					name: member_name(first_line),
				}
			}
			Some(FrameKind::ObjectLiteral) => {
				Declaration::ObjectLiteralProperty {
					name: member_name(first_line),
				}
			}
			Some(FrameKind::Block | FrameKind::ExportList | FrameKind::Template) => {
				Declaration::Other { exported: false }
			}
			None | Some(FrameKind::Namespace) => parse_statement(statement),
		}
	}

	fn open_brace(&mut self) {
		let pos = self.pos;
		let statement_start = self.statement_start.unwrap_or(pos);
		if self.statement_start.is_none() && !self.pending.is_empty() {
			self.attach_pending(pos);
		}
		let header = self.text[statement_start..pos].trim();
		let kind = self.classify_brace(header);

		let owner = match self.last_declaration {
			Some((start, id)) if start == statement_start && self.statement_start.is_some() => Some(id),
			_ => self.undocumented_owner(kind, header),
		};

		self.frames.push(Frame {
			kind,
			owner,
			start: pos,
		});
		self.statement_start = None;
		self.seen_code = true;
		self.pos += 1;
		self.last_significant = Some(b'{');
	}

	/// Create a node for an undocumented container so its members still know
	/// their parent.
	fn undocumented_owner(&mut self, kind: FrameKind, header: &str) -> Option<DeclarationId> {
		match kind {
			FrameKind::Class | FrameKind::Interface | FrameKind::Namespace | FrameKind::ObjectLiteral => {}
			FrameKind::Block | FrameKind::ExportList | FrameKind::Template => return None,
		}

		let declaration = match (self.frame_kind(), kind) {
			(Some(FrameKind::ObjectLiteral), _) => {
				Declaration::ObjectLiteralProperty {
					name: member_name(header),
				}
			}
			(Some(FrameKind::Class | FrameKind::Interface), _) => {
				Declaration::Member {
					name: member_name(header),
				}
			}
			(_, FrameKind::ObjectLiteral) if !is_declaration_header(header) => return None,
			_ => parse_statement(&format!("{header} {{")),
		};
		Some(self.tree.push(declaration, self.owner(), None))
	}

	fn classify_brace(&self, header: &str) -> FrameKind {
		if header.is_empty() {
			return match self.frame_kind() {
				Some(FrameKind::ObjectLiteral) => FrameKind::ObjectLiteral,
				_ if matches!(self.last_significant, Some(b'(' | b',' | b'=' | b':' | b'[' | b'?')) => {
					FrameKind::ObjectLiteral
				}
				_ => FrameKind::Block,
			};
		}

		if header.ends_with("=>") {
			return FrameKind::Block;
		}
		if header.ends_with(['=', '(', ',', '[', '?']) || header.ends_with("return") {
			return FrameKind::ObjectLiteral;
		}
		if header.ends_with(':') {
			return if self.frame_kind() == Some(FrameKind::ObjectLiteral) {
				FrameKind::ObjectLiteral
			} else {
				FrameKind::Block
			};
		}
		if is_match(&EXPORT_LIST, header) {
			return FrameKind::ExportList;
		}
		if is_match(&DEFAULT_OBJECT, &format!("{header}{{")) {
			return FrameKind::ObjectLiteral;
		}

		if matches!(self.frame_kind(), None | Some(FrameKind::Namespace)) {
			if let Some(caps) = DECLARATION.as_ref().and_then(|regex| regex.captures(header)) {
				return match keyword(&caps).as_str() {
					"class" => FrameKind::Class,
					"interface" => FrameKind::Interface,
					"namespace" | "module" | "global" => FrameKind::Namespace,
					_ => FrameKind::Block,
				};
			}
		}

		FrameKind::Block
	}

	fn close_brace(&mut self) {
		self.resolve_pending_as_detached_in_frame();
		let frame = self.frames.pop();
		self.pos += 1;
		self.last_significant = Some(b'}');

		match frame.map(|frame| (frame.kind, frame.start)) {
			Some((FrameKind::Template, _)) => {
				self.skip_template();
				return;
			}
			Some((FrameKind::ExportList, start)) => {
				let after = self.text[self.pos..].trim_start();
				if !after.starts_with("from") {
					for name in export_list_names(&self.text[start + 1..self.pos - 1]) {
						self.tree.add_re_export(name);
					}
				}
			}
			_ => {}
		}

		self.statement_start = None;
	}

	fn resolve_pending_as_detached_in_frame(&mut self) {
		for index in std::mem::take(&mut self.pending) {
			self.comments[index].target = CommentTarget::Detached;
		}
	}

	fn end_statement(&mut self) {
		if let Some(start) = self.statement_start.take() {
			let statement = self.text[start..self.pos].trim();
			if matches!(self.frame_kind(), None | Some(FrameKind::Namespace)) {
				if let Some(name) = DEFAULT_EXPORT_NAME
					.as_ref()
					.and_then(|regex| regex.captures(statement))
					.and_then(|caps| caps.get(1))
				{
					self.tree.add_re_export(name.as_str());
				}
			}
		}
	}
}

/// Scan `text` for documentation comments and the declarations they document.
pub fn scan_source(text: &str) -> ScannedSource {
	SourceScanner::new(text).scan()
}

fn is_identifier_byte(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

fn is_match(regex: &LazyLock<Option<Regex>>, text: &str) -> bool {
	regex.as_ref().is_some_and(|regex| regex.is_match(text))
}

fn contains_tag(comment: &str, tag: &str) -> bool {
	comment.match_indices(tag).any(|(index, _)| {
		!comment[index + tag.len()..]
			.chars()
			.next()
			.is_some_and(|ch| ch.is_ascii_alphanumeric())
	})
}

fn keyword(caps: &Captures<'_>) -> String {
	caps.get(3)
		.map(|keyword| keyword.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
		.unwrap_or_default()
}

fn is_declaration_header(header: &str) -> bool {
	is_match(&DECLARATION, header) || is_match(&DEFAULT_OBJECT, &format!("{header}{{"))
}

/// Parse a top level or namespace statement into a declaration.
fn parse_statement(statement: &str) -> Declaration {
	let statement = statement.trim_start();
	if is_match(&DEFAULT_OBJECT, statement) {
		return Declaration::Variable {
			name: "default".to_string(),
			exported: true,
			object_literal: true,
		};
	}

	let Some(caps) = DECLARATION.as_ref().and_then(|regex| regex.captures(statement)) else {
		return Declaration::Other {
			exported: crate::context::starts_with_export(statement),
		};
	};

	let exported = caps.get(1).is_some();
	let is_default = caps.get(2).is_some();
	let name = caps
		.get(4)
		.map(|name| name.as_str().to_string())
		.unwrap_or_else(|| if is_default { "default".to_string() } else { String::new() });
	let rest = caps.get(0).map_or("", |whole| &statement[whole.end()..]);
	let keyword = keyword(&caps);

	match keyword.as_str() {
		"class" => Declaration::Class { name, exported },
		"interface" => Declaration::Interface { name, exported },
		"type" => Declaration::TypeAlias { name, exported },
		"namespace" | "module" | "global" => Declaration::Namespace { name, exported },
		"const" | "let" | "var" => {
			Declaration::Variable {
				name,
				exported,
				object_literal: is_match(&OBJECT_INITIALIZER, rest),
			}
		}
		"enum" | "const enum" => Declaration::Other { exported },
		_ => Declaration::Function { name, exported },
	}
}

/// The name of a class member or object property, without quotes.
fn member_name(line: &str) -> String {
	MEMBER_NAME
		.as_ref()
		.and_then(|regex| regex.captures(line.trim_start()))
		.and_then(|caps| caps.get(1))
		.map(|name| name.as_str().trim_matches(['\'', '"']).to_string())
		.unwrap_or_default()
}

/// Local names listed in `export { a, b as c, type d }`.
fn export_list_names(list: &str) -> Vec<String> {
	list.split(',')
		.filter_map(|entry| {
			let entry = entry.trim();
			let entry = entry.strip_prefix("type ").unwrap_or(entry).trim();
			entry
				.split_whitespace()
				.next()
				.filter(|name| !name.is_empty())
				.map(str::to_string)
		})
		.collect()
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> String {
	let line_start = text[..offset].rfind('\n').map_or(0, |newline| newline + 1);
	text[line_start..offset]
		.chars()
		.take_while(|ch| *ch == ' ' || *ch == '\t')
		.collect()
}

/// Byte offset of the first occurrence of `needle` in `haystack`.
fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	if needle.is_empty() {
		return Some(0);
	}

	haystack
		.windows(needle.len())
		.position(|window| window == needle)
}
