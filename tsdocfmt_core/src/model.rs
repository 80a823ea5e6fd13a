use std::collections::BTreeSet;
use std::ops::Range;

/// Release tags, in the order they are recognized.
pub const RELEASE_TAGS: [&str; 5] = ["@public", "@beta", "@alpha", "@internal", "@experimental"];

/// Modifier tags. A modifier carries no content of its own.
pub const MODIFIER_TAGS: [&str; 12] = [
	"@alpha",
	"@beta",
	"@public",
	"@internal",
	"@experimental",
	"@readonly",
	"@override",
	"@sealed",
	"@virtual",
	"@eventProperty",
	"@packageDocumentation",
	"@enum",
];

/// Block tags recognized without configuration.
pub const BLOCK_TAGS: [&str; 12] = [
	"@remarks",
	"@privateRemarks",
	"@param",
	"@typeParam",
	"@returns",
	"@example",
	"@deprecated",
	"@see",
	"@throws",
	"@defaultValue",
	"@decorator",
	"@property",
];

/// Inline tags. These never start a section.
pub const INLINE_TAGS: [&str; 3] = ["@link", "@inheritDoc", "@label"];

/// Legacy file overview tags folded into `@packageDocumentation`.
pub const FILE_OVERVIEW_TAGS: [&str; 3] = ["@fileoverview", "@file", "@overview"];

pub const PACKAGE_DOCUMENTATION_TAG: &str = "@packageDocumentation";

pub fn is_release_tag(name: &str) -> bool {
	RELEASE_TAGS.contains(&name)
}

pub fn is_modifier_tag(name: &str) -> bool {
	MODIFIER_TAGS.contains(&name)
}

pub fn is_inline_tag(name: &str) -> bool {
	INLINE_TAGS.contains(&name)
}

/// How a tag participates in a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagKind {
	Block,
	Modifier,
	Inline,
	Unknown,
}

impl TagKind {
	/// Classify a normalized tag name. `extra_tags` are treated as block tags.
	pub fn of(name: &str, extra_tags: &BTreeSet<String>) -> Self {
		if is_modifier_tag(name) {
			Self::Modifier
		} else if is_inline_tag(name) {
			Self::Inline
		} else if BLOCK_TAGS.contains(&name) || extra_tags.contains(name) {
			Self::Block
		} else {
			Self::Unknown
		}
	}

	/// Block and modifier tags start a section even in the middle of a line.
	pub fn starts_section(self) -> bool {
		matches!(self, Self::Block | Self::Modifier)
	}
}

/// Where a tag was found in the comment body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSource {
	/// Byte range of the section within the parsed body.
	pub span: Range<usize>,
}

impl From<Range<usize>> for TagSource {
	fn from(span: Range<usize>) -> Self {
		Self { span }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
	Param,
	TypeParam,
}

impl ParamKind {
	pub fn tag_name(self) -> &'static str {
		match self {
			Self::Param => "@param",
			Self::TypeParam => "@typeParam",
		}
	}
}

/// A `@param` or `@typeParam` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTag {
	pub kind: ParamKind,
	pub name: String,
	pub description: String,
	pub source: Option<TagSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnsTag {
	pub description: String,
	pub source: Option<TagSource>,
}

/// Any tag that is not a summary, remarks, param or returns section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
	pub name: String,
	pub content: String,
	/// `None` marks a tag inserted by the release policy.
	pub source: Option<TagSource>,
}

impl Tag {
	pub fn new(name: impl Into<String>, content: impl Into<String>, span: Range<usize>) -> Self {
		Self {
			name: name.into(),
			content: content.into(),
			source: Some(span.into()),
		}
	}

	/// Create a tag with no content and no source.
	pub fn synthetic(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			content: String::new(),
			source: None,
		}
	}

	pub fn is_synthetic(&self) -> bool {
		self.source.is_none()
	}

	pub fn is_release(&self) -> bool {
		is_release_tag(&self.name)
	}

	/// Whether this is one of the known [`MODIFIER_TAGS`].
	pub fn is_modifier(&self) -> bool {
		is_modifier_tag(&self.name)
	}
}

/// The structured form of a single documentation comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentModel {
	pub summary: Option<String>,
	pub remarks: Option<String>,
	pub params: Vec<ParamTag>,
	pub returns: Option<ReturnsTag>,
	pub other_tags: Vec<Tag>,
	/// The body could not be parsed and is carried verbatim in `summary`.
	pub unstructured: bool,
}

impl CommentModel {
	/// Build a model that carries `body` verbatim.
	pub fn unstructured(body: impl Into<String>) -> Self {
		let body = body.into();
		Self {
			summary: (!body.trim().is_empty()).then_some(body),
			unstructured: true,
			..Self::default()
		}
	}

	/// Number of release tags in `other_tags`.
	pub fn release_tag_count(&self) -> usize {
		self.other_tags.iter().filter(|tag| tag.is_release()).count()
	}

	pub fn release_tag(&self) -> Option<&Tag> {
		self.other_tags.iter().find(|tag| tag.is_release())
	}

	pub fn has_tag(&self, name: &str) -> bool {
		self.other_tags.iter().any(|tag| tag.name == name)
	}

	/// `true` when the comment has nothing besides a summary.
	pub fn is_summary_only(&self) -> bool {
		self.remarks.is_none()
			&& self.params.is_empty()
			&& self.returns.is_none()
			&& self.other_tags.is_empty()
	}

	pub fn is_empty(&self) -> bool {
		self.summary.is_none() && self.is_summary_only()
	}

	/// Iterate over every text field that may contain markdown, including tag
	/// content.
	pub fn text_fields(&self) -> impl Iterator<Item = &str> {
		self.summary
			.iter()
			.chain(self.remarks.iter())
			.map(String::as_str)
			.chain(self.params.iter().map(|param| param.description.as_str()))
			.chain(self.returns.iter().map(|returns| returns.description.as_str()))
			.chain(self.other_tags.iter().map(|tag| tag.content.as_str()))
	}
}
