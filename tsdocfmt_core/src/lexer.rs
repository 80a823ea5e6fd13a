use std::ops::Range;

use logos::Logos;

use crate::TsdocError;
use crate::TsdocResult;
use crate::parser::RawSection;

/// Raw tokens produced by logos for flat tokenization of a comment body.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
	#[regex(r"`+")]
	Backticks,
	#[regex(r"~+")]
	Tildes,
	#[regex(r"\{@[A-Za-z][A-Za-z0-9_]*")]
	InlineTagOpen,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[regex(r"@[A-Za-z][A-Za-z0-9_]*")]
	TagName,
	#[regex(r"\\[^\n]")]
	Escaped,
	#[token("\n")]
	Newline,
	#[regex(r"[ \t\r]+")]
	Whitespace,
	#[regex(r"[^`~{}@\\\n \t\r]+")]
	Text,
	#[token("@")]
	At,
}

/// An open fenced code block.
#[derive(Debug, Clone, Copy)]
struct Fence {
	len: usize,
	line: usize,
}

/// Walks the logos token stream, splitting the body into tag sections while
/// skipping code spans, fenced code blocks and inline tags.
struct SectionWalker<'a, F> {
	/// The comment body being split.
	source: &'a str,
	/// The collected raw tokens and their byte spans.
	raw_tokens: Vec<(Result<RawToken, ()>, Range<usize>)>,
	/// Current index into `raw_tokens`.
	cursor: usize,
	/// Zero-based line of the current token.
	line: usize,
	/// Only whitespace has been seen since the last newline.
	at_line_start: bool,
	/// The previous token was whitespace or a newline.
	after_whitespace: bool,
	/// Decides whether a tag name mid-line starts a section.
	is_recognized: F,
	/// Tag and content start of the section being built.
	current: (Option<String>, usize, usize),
	sections: Vec<RawSection>,
}

impl<'a, F: Fn(&str) -> bool> SectionWalker<'a, F> {
	fn new(source: &'a str, is_recognized: F) -> Self {
		let raw_tokens: Vec<_> = RawToken::lexer(source).spanned().collect();

		Self {
			source,
			raw_tokens,
			cursor: 0,
			line: 0,
			at_line_start: true,
			after_whitespace: true,
			is_recognized,
			current: (None, 0, 0),
			sections: vec![],
		}
	}

	fn kind_at(&self, index: usize) -> Option<RawToken> {
		self.raw_tokens
			.get(index)
			.map(|(kind, _)| kind.unwrap_or(RawToken::Text))
	}

	fn span_at(&self, index: usize) -> Range<usize> {
		self.raw_tokens
			.get(index)
			.map_or(self.source.len()..self.source.len(), |(_, span)| {
				span.clone()
			})
	}

	fn slice_at(&self, index: usize) -> &'a str {
		&self.source[self.span_at(index)]
	}

	/// Move past the current token, keeping line state up to date.
	fn advance(&mut self) {
		match self.kind_at(self.cursor) {
			Some(RawToken::Newline) => {
				self.line += 1;
				self.at_line_start = true;
				self.after_whitespace = true;
			}
			Some(RawToken::Whitespace) => {
				self.after_whitespace = true;
			}
			Some(_) => {
				self.at_line_start = false;
				self.after_whitespace = false;
			}
			None => {}
		}
		self.cursor += 1;
	}

	/// Skip to the end of the current line, leaving the cursor on the newline.
	fn skip_to_line_end(&mut self) {
		while let Some(kind) = self.kind_at(self.cursor) {
			if kind == RawToken::Newline {
				break;
			}
			self.advance();
		}
	}

	/// Returns `true` when only whitespace remains before the end of the line
	/// starting at `index`.
	fn rest_of_line_is_blank(&self, mut index: usize) -> bool {
		while let Some(kind) = self.kind_at(index) {
			match kind {
				RawToken::Newline => return true,
				RawToken::Whitespace => index += 1,
				_ => return false,
			}
		}
		true
	}

	fn finish_section(&mut self, end: usize) {
		let (tag, start, content_start) = std::mem::take(&mut self.current);
		let content_start = content_start.min(end);
		self.sections.push(RawSection {
			tag,
			content: self.source[content_start..end].to_string(),
			span: start..end,
		});
	}

	fn process(mut self) -> TsdocResult<Vec<RawSection>> {
		while let Some(kind) = self.kind_at(self.cursor) {
			match kind {
				RawToken::Backticks | RawToken::Tildes => {
					let len = self.slice_at(self.cursor).len();
					if self.at_line_start && len >= 3 {
						self.skip_fence(kind, len)?;
					} else if kind == RawToken::Backticks {
						self.skip_code_span(len);
					} else {
						self.advance();
					}
				}
				RawToken::InlineTagOpen => self.skip_inline_tag()?,
				RawToken::TagName => {
					let name = self.slice_at(self.cursor);
					let span = self.span_at(self.cursor);
					let starts_section = self.after_whitespace
						&& (self.at_line_start || (self.is_recognized)(name));
					if starts_section {
						self.finish_section(span.start);
						self.current = (Some(name.to_string()), span.start, span.end);
					}
					self.advance();
				}
				_ => self.advance(),
			}
		}

		self.finish_section(self.source.len());
		Ok(self.sections)
	}

	/// Skip a fenced code block, including its closing fence line.
	fn skip_fence(&mut self, kind: RawToken, len: usize) -> TsdocResult<()> {
		let fence = Fence {
			len,
			line: self.line,
		};

		// Info string.
		self.skip_to_line_end();

		while let Some(current) = self.kind_at(self.cursor) {
			let closes = current == kind
				&& self.at_line_start
				&& self.slice_at(self.cursor).len() >= fence.len
				&& self.rest_of_line_is_blank(self.cursor + 1);
			self.advance();
			if closes {
				return Ok(());
			}
		}

		Err(TsdocError::UnterminatedFence {
			line: fence.line + 1,
		})
	}

	/// Find the closing run of a code span opened at the cursor. The search
	/// stops at a blank line or at a line that starts with a tag.
	fn closing_code_span(&self, len: usize) -> Option<usize> {
		let mut index = self.cursor + 1;
		let mut line_start = false;

		while let Some(kind) = self.kind_at(index) {
			match kind {
				RawToken::Newline if line_start => return None,
				RawToken::Newline => line_start = true,
				RawToken::Whitespace => {}
				RawToken::TagName if line_start => return None,
				RawToken::Backticks if self.slice_at(index).len() == len => return Some(index),
				_ => line_start = false,
			}
			index += 1;
		}

		None
	}

	/// Skip a code span when a closing run of the same length exists in the
	/// same paragraph. An unmatched run is literal text.
	fn skip_code_span(&mut self, len: usize) {
		match self.closing_code_span(len) {
			Some(index) => {
				while self.cursor < index {
					self.advance();
				}
				self.advance();
			}
			None => self.advance(),
		}
	}

	/// Skip `{@tag ...}` including nested braces.
	fn skip_inline_tag(&mut self) -> TsdocResult<()> {
		let open = self.span_at(self.cursor);
		let name = self.source[open.start + 1..open.end].to_string();
		let mut depth = 0usize;

		while let Some(kind) = self.kind_at(self.cursor) {
			match kind {
				RawToken::InlineTagOpen | RawToken::BraceOpen => depth += 1,
				RawToken::BraceClose => depth = depth.saturating_sub(1),
				_ => {}
			}
			self.advance();
			if depth == 0 {
				return Ok(());
			}
		}

		Err(TsdocError::UnterminatedInlineTag {
			name,
			offset: open.start,
		})
	}
}

/// Split a comment body into sections. The first section is always the
/// untagged summary (possibly empty). A tag name starts a new section when it
/// follows whitespace and either begins a line or satisfies `is_recognized`.
pub(crate) fn split_sections(
	body: &str,
	is_recognized: impl Fn(&str) -> bool,
) -> TsdocResult<Vec<RawSection>> {
	SectionWalker::new(body, is_recognized).process()
}

