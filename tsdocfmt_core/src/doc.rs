use derive_more::Deref;
use derive_more::DerefMut;

/// A layout document. The printer decides where `Line`s break based on the
/// available width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Doc {
	Text(String),
	/// A space when the enclosing group fits on the line, otherwise a newline.
	Line,
	/// Always a newline.
	HardLine,
	/// Printed flat when the whole group fits, otherwise every `Line` breaks.
	Group(Vec<Doc>),
	/// Alternating content and separators. Each separator breaks only when the
	/// content after it would not fit.
	Fill(Vec<Doc>),
	Concat(Vec<Doc>),
	/// Increase the indentation of lines started inside by the given columns.
	Indent(usize, Box<Doc>),
	/// A complete line printed without the comment prefix.
	Verbatim(String),
}

impl Doc {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(text.into())
	}

	pub fn indent(columns: usize, doc: Doc) -> Self {
		Self::Indent(columns, Box::new(doc))
	}

	/// Words separated by breakable lines.
	pub fn fill_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
		let mut parts = Vec::new();
		for word in words {
			if !parts.is_empty() {
				parts.push(Self::Line);
			}
			parts.push(Self::text(word));
		}
		Self::Fill(parts)
	}

	/// Join documents with hard lines.
	pub fn join_lines(docs: impl IntoIterator<Item = Doc>) -> Self {
		let mut parts = Vec::new();
		for doc in docs {
			if !parts.is_empty() {
				parts.push(Self::HardLine);
			}
			parts.push(doc);
		}
		Self::Concat(parts)
	}

	/// Whether printing this document always produces a line break.
	pub fn has_hard_break(&self) -> bool {
		match self {
			Self::HardLine | Self::Verbatim(_) => true,
			Self::Text(_) | Self::Line => false,
			Self::Group(docs) | Self::Fill(docs) | Self::Concat(docs) => {
				docs.iter().any(Self::has_hard_break)
			}
			Self::Indent(_, doc) => doc.has_hard_break(),
		}
	}

	/// Width of the document printed on a single line. `None` when it cannot
	/// be printed flat.
	fn flat_width(&self) -> Option<usize> {
		match self {
			Self::Text(text) => Some(text_width(text)),
			Self::Line => Some(1),
			Self::HardLine | Self::Verbatim(_) => None,
			Self::Group(docs) | Self::Fill(docs) | Self::Concat(docs) => {
				docs.iter().try_fold(0, |total, doc| Some(total + doc.flat_width()?))
			}
			Self::Indent(_, doc) => doc.flat_width(),
		}
	}
}

pub fn text_width(text: &str) -> usize {
	text.chars().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	Flat,
	Break,
}

/// A printed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedLine {
	pub text: String,
	/// `false` for lines produced by [`Doc::Verbatim`].
	pub prefixed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct PrintedLines(Vec<PrintedLine>);

impl PrintedLines {
	pub fn into_inner(self) -> Vec<PrintedLine> {
		self.0
	}
}

struct Printer {
	width: usize,
	lines: Vec<PrintedLine>,
	current: String,
	/// Indentation to write before the first text of the current line.
	pending_indent: Option<usize>,
	/// The last line was verbatim, so the next newline only ends it.
	after_verbatim: bool,
}

impl Printer {
	fn new(width: usize) -> Self {
		Self {
			width,
			lines: Vec::new(),
			current: String::new(),
			pending_indent: Some(0),
			after_verbatim: false,
		}
	}

	fn column(&self) -> usize {
		match self.pending_indent {
			Some(indent) => indent,
			None => text_width(&self.current),
		}
	}

	fn remaining(&self) -> usize {
		self.width.saturating_sub(self.column())
	}

	fn push_text(&mut self, text: &str) {
		self.after_verbatim = false;
		if let Some(indent) = self.pending_indent.take() {
			self.current.push_str(&" ".repeat(indent));
		}
		self.current.push_str(text);
	}

	fn newline(&mut self, indent: usize) {
		if self.after_verbatim {
			self.after_verbatim = false;
			self.pending_indent = Some(indent);
			return;
		}
		let line = std::mem::take(&mut self.current);
		self.lines.push(PrintedLine {
			text: line.trim_end().to_string(),
			prefixed: true,
		});
		self.pending_indent = Some(indent);
	}

	fn verbatim(&mut self, text: &str, indent: usize) {
		if self.pending_indent.is_none() {
			self.newline(indent);
		}
		let text = text.trim_end();
		let text = if text.is_empty() {
			String::new()
		} else {
			format!("{}{text}", " ".repeat(indent))
		};
		self.lines.push(PrintedLine {
			text,
			prefixed: false,
		});
		self.pending_indent = Some(indent);
		self.after_verbatim = true;
	}

	fn fits(&self, doc: &Doc) -> bool {
		doc.flat_width()
			.is_some_and(|width| width <= self.remaining())
	}

	fn print(&mut self, doc: &Doc, indent: usize, mode: Mode) {
		match doc {
			Doc::Text(text) => self.push_text(text),
			Doc::Line => {
				match mode {
					Mode::Flat => self.push_text(" "),
					Mode::Break => self.newline(indent),
				}
			}
			Doc::HardLine => self.newline(indent),
			Doc::Verbatim(text) => self.verbatim(text, indent),
			Doc::Concat(docs) => {
				for doc in docs {
					self.print(doc, indent, mode);
				}
			}
			Doc::Indent(columns, doc) => self.print(doc, indent + columns, mode),
			Doc::Group(docs) => {
				let mode = if !doc.has_hard_break() && self.fits(doc) {
					Mode::Flat
				} else {
					Mode::Break
				};
				for doc in docs {
					self.print(doc, indent, mode);
				}
			}
			Doc::Fill(parts) => self.print_fill(parts, indent),
		}
	}

	fn print_fill(&mut self, parts: &[Doc], indent: usize) {
		let mut index = 0;
		while let Some(content) = parts.get(index) {
			let content_mode = if self.fits(content) {
				Mode::Flat
			} else {
				Mode::Break
			};
			self.print(content, indent, content_mode);

			let Some(separator) = parts.get(index + 1) else {
				break;
			};
			let next_fits = match parts.get(index + 2) {
				Some(next) => {
					separator
						.flat_width()
						.zip(next.flat_width())
						.is_some_and(|(sep, next)| sep + next <= self.remaining())
				}
				None => true,
			};
			// A separator at the start of a line is dropped.
			if self.pending_indent.is_none() {
				let mode = if next_fits { Mode::Flat } else { Mode::Break };
				self.print(separator, indent, mode);
			}
			index += 2;
		}
	}

	fn finish(mut self) -> PrintedLines {
		if self.pending_indent.is_none() {
			let line = std::mem::take(&mut self.current);
			self.lines.push(PrintedLine {
				text: line.trim_end().to_string(),
				prefixed: true,
			});
		}
		PrintedLines(self.lines)
	}
}

/// Lay out `doc` into lines no wider than `width` where possible. Words wider
/// than `width` overflow on their own line.
pub fn print(doc: &Doc, width: usize) -> PrintedLines {
	let mut printer = Printer::new(width);
	printer.print(doc, 0, Mode::Break);
	printer.finish()
}
