use std::collections::BTreeSet;

use crate::CommentModel;
use crate::Diagnostics;
use crate::FormatOptions;
use crate::Stage;
use crate::TsdocError;
use crate::TsdocResult;
use crate::engine::extract_body;
use crate::legacy;
use crate::parser::parse_comment;

/// The kind of body a container member is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
	Interface,
	Class,
}

/// Export and inheritance facts about the declaration a comment documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExportContext {
	pub is_exported: bool,
	pub is_container_member: bool,
	pub container_kind: Option<ContainerKind>,
	pub is_enum_property: bool,
	pub enclosing_enum_has_release_tag: bool,
	pub should_inherit_release_tag: bool,
}

impl ExportContext {
	/// Compute `should_inherit_release_tag` from the other fields.
	fn derive_inheritance(mut self, options: &FormatOptions) -> Self {
		self.should_inherit_release_tag = options.inheritance_aware
			&& (self.is_container_member
				|| (self.is_enum_property && self.enclosing_enum_has_release_tag));
		self
	}
}

/// Index of a node in a [`DeclarationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclarationId(pub usize);

/// A declaration in the host source, carrying only what the context analyzer
/// needs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Declaration {
	Function { name: String, exported: bool },
	Class { name: String, exported: bool },
	Interface { name: String, exported: bool },
	TypeAlias { name: String, exported: bool },
	Namespace { name: String, exported: bool },
	/// `const`, `let` or `var`. `object_literal` is set when the initializer
	/// is an object literal.
	Variable {
		name: String,
		exported: bool,
		object_literal: bool,
	},
	/// A property of an object literal initializer.
	ObjectLiteralProperty { name: String },
	/// A member of a class or interface body.
	Member { name: String },
	Other { exported: bool },
}

impl Declaration {
	pub fn name(&self) -> Option<&str> {
		match self {
			Self::Function { name, .. }
			| Self::Class { name, .. }
			| Self::Interface { name, .. }
			| Self::TypeAlias { name, .. }
			| Self::Namespace { name, .. }
			| Self::Variable { name, .. }
			| Self::ObjectLiteralProperty { name }
			| Self::Member { name } => Some(name),
			Self::Other { .. } => None,
		}
	}

	/// Whether the declaration carries its own `export` modifier.
	pub fn has_export_modifier(&self) -> bool {
		match self {
			Self::Function { exported, .. }
			| Self::Class { exported, .. }
			| Self::Interface { exported, .. }
			| Self::TypeAlias { exported, .. }
			| Self::Namespace { exported, .. }
			| Self::Variable { exported, .. }
			| Self::Other { exported } => *exported,
			Self::ObjectLiteralProperty { .. } | Self::Member { .. } => false,
		}
	}

	pub fn container_kind(&self) -> Option<ContainerKind> {
		match self {
			Self::Class { .. } => Some(ContainerKind::Class),
			Self::Interface { .. } => Some(ContainerKind::Interface),
			_ => None,
		}
	}

	pub fn is_object_literal(&self) -> bool {
		matches!(
			self,
			Self::Variable {
				object_literal: true,
				..
			} | Self::ObjectLiteralProperty { .. }
		)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationNode {
	pub declaration: Declaration,
	pub parent: Option<DeclarationId>,
	/// The raw documentation comment attached to the declaration.
	pub doc: Option<String>,
}

/// Read access to a typed declaration tree.
pub trait DeclarationProvider {
	fn node(&self, id: DeclarationId) -> TsdocResult<&DeclarationNode>;

	/// Whether `name` is exported through an `export { name }` list or
	/// `export default name`.
	fn is_re_exported(&self, name: &str) -> bool;

	fn parent(&self, id: DeclarationId) -> TsdocResult<Option<&DeclarationNode>> {
		match self.node(id)?.parent {
			Some(parent) => self.node(parent).map(Some),
			None => Ok(None),
		}
	}

	/// Direct `export` modifier or a re-export by name.
	fn is_exported(&self, id: DeclarationId) -> TsdocResult<bool> {
		let node = self.node(id)?;
		Ok(node.declaration.has_export_modifier()
			|| node
				.declaration
				.name()
				.is_some_and(|name| self.is_re_exported(name)))
	}
}

/// An arena of declarations built by the source scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationTree {
	nodes: Vec<DeclarationNode>,
	re_exports: BTreeSet<String>,
}

impl DeclarationTree {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(
		&mut self,
		declaration: Declaration,
		parent: Option<DeclarationId>,
		doc: Option<String>,
	) -> DeclarationId {
		let id = DeclarationId(self.nodes.len());
		self.nodes.push(DeclarationNode {
			declaration,
			parent,
			doc,
		});
		id
	}

	pub fn add_re_export(&mut self, name: impl Into<String>) {
		self.re_exports.insert(name.into());
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (DeclarationId, &DeclarationNode)> {
		self.nodes
			.iter()
			.enumerate()
			.map(|(index, node)| (DeclarationId(index), node))
	}
}

impl DeclarationProvider for DeclarationTree {
	fn node(&self, id: DeclarationId) -> TsdocResult<&DeclarationNode> {
		self.nodes
			.get(id.0)
			.ok_or_else(|| TsdocError::Context(format!("no declaration with id {}", id.0)))
	}

	fn is_re_exported(&self, name: &str) -> bool {
		self.re_exports.contains(name)
	}
}

/// The container a host reports for a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContainer {
	pub kind: ContainerKind,
	/// The container's raw documentation comment, if any.
	pub comment: Option<String>,
}

/// Context facts supplied directly by a host that has already analyzed the
/// source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostContext {
	pub is_exported: bool,
	pub is_class_member: bool,
	/// The enclosing body. For an enum property this is the `@enum` object and
	/// only its comment is read.
	pub container: Option<HostContainer>,
	pub is_const_enum_property: bool,
	pub const_enum_has_release_tag: Option<bool>,
}

/// Where the context of a comment comes from.
#[derive(Clone, Copy)]
#[non_exhaustive]
pub enum ContextSource<'a> {
	/// The code following the comment.
	Snippet(&'a str),
	Host(&'a HostContext),
	Tree {
		provider: &'a dyn DeclarationProvider,
		id: DeclarationId,
	},
	/// The leading comment of a file.
	FileHeader,
	/// A comment that documents nothing.
	Detached,
}

impl std::fmt::Debug for ContextSource<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Snippet(snippet) => f.debug_tuple("Snippet").field(snippet).finish(),
			Self::Host(host) => f.debug_tuple("Host").field(host).finish(),
			Self::Tree { id, .. } => f.debug_struct("Tree").field("id", id).finish(),
			Self::FileHeader => f.write_str("FileHeader"),
			Self::Detached => f.write_str("Detached"),
		}
	}
}

/// Compute the export context for a comment. Errors degrade to the default
/// context and are reported to `diagnostics`.
pub fn analyze(
	source: ContextSource<'_>,
	options: &FormatOptions,
	diagnostics: &dyn Diagnostics,
) -> ExportContext {
	try_analyze(source, options).unwrap_or_else(|error| {
		diagnostics.report(Stage::Context, &error);
		ExportContext::default()
	})
}

pub fn try_analyze(source: ContextSource<'_>, options: &FormatOptions) -> TsdocResult<ExportContext> {
	let context = match source {
		ContextSource::Snippet(snippet) => {
			ExportContext {
				is_exported: starts_with_export(snippet),
				..ExportContext::default()
			}
		}
		ContextSource::Host(host) => analyze_host(host, options),
		ContextSource::Tree { provider, id } => analyze_tree(provider, id, options)?,
		ContextSource::FileHeader => {
			ExportContext {
				is_exported: true,
				..ExportContext::default()
			}
		}
		ContextSource::Detached => ExportContext::default(),
	};

	Ok(context.derive_inheritance(options))
}

fn analyze_host(host: &HostContext, options: &FormatOptions) -> ExportContext {
	// The container of an enum property is the `@enum` object, not a body.
	let container_kind = if host.is_const_enum_property {
		None
	} else {
		host.container
			.as_ref()
			.map(|container| container.kind)
			.or(host.is_class_member.then_some(ContainerKind::Class))
	};
	let enclosing_enum_has_release_tag = host.is_const_enum_property
		&& host.const_enum_has_release_tag.unwrap_or_else(|| {
			host.container
				.as_ref()
				.and_then(|container| container.comment.as_deref())
				.is_some_and(|comment| comment_has_release_tag(comment, options))
		});

	ExportContext {
		is_exported: host.is_exported,
		is_container_member: container_kind.is_some(),
		container_kind,
		is_enum_property: host.is_const_enum_property,
		enclosing_enum_has_release_tag,
		should_inherit_release_tag: false,
	}
}

fn analyze_tree(
	provider: &dyn DeclarationProvider,
	id: DeclarationId,
	options: &FormatOptions,
) -> TsdocResult<ExportContext> {
	let node = provider.node(id)?;
	let Some(parent_id) = node.parent else {
		return Ok(ExportContext {
			is_exported: provider.is_exported(id)?,
			..ExportContext::default()
		});
	};
	let parent = provider.node(parent_id)?;

	if let Some(container_kind) = parent.declaration.container_kind() {
		// Members take the export status of their container.
		return Ok(ExportContext {
			is_exported: provider.is_exported(parent_id)?,
			is_container_member: true,
			container_kind: Some(container_kind),
			..ExportContext::default()
		});
	}

	let parent_doc = parent.doc.as_deref();
	let is_enum_property = matches!(node.declaration, Declaration::ObjectLiteralProperty { .. })
		&& parent.declaration.is_object_literal()
		&& parent_doc.is_some_and(|doc| comment_has_tag(doc, "@enum", options));

	if is_enum_property {
		return Ok(ExportContext {
			is_exported: provider.is_exported(parent_id)?,
			is_enum_property: true,
			enclosing_enum_has_release_tag: parent_doc
				.is_some_and(|doc| comment_has_release_tag(doc, options)),
			..ExportContext::default()
		});
	}

	Ok(ExportContext {
		is_exported: provider.is_exported(id)?,
		..ExportContext::default()
	})
}

/// `true` when the code starts with the `export` keyword.
pub fn starts_with_export(snippet: &str) -> bool {
	let snippet = snippet.trim_start();
	snippet.strip_prefix("export").is_some_and(|rest| {
		rest.is_empty() || rest.starts_with(|ch: char| ch.is_whitespace() || ch == '{' || ch == '*')
	})
}

fn parse_raw_comment(raw: &str, options: &FormatOptions) -> Option<CommentModel> {
	let extracted = extract_body(raw, "")?;
	let body = legacy::transform(&extracted.body, options);
	Some(parse_comment(&body, options))
}

fn comment_has_tag(raw: &str, name: &str, options: &FormatOptions) -> bool {
	parse_raw_comment(raw, options).is_some_and(|model| model.has_tag(name))
}

fn comment_has_release_tag(raw: &str, options: &FormatOptions) -> bool {
	parse_raw_comment(raw, options).is_some_and(|model| model.release_tag().is_some())
}
