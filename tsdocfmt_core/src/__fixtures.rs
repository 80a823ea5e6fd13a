use crate::CommentModel;
use crate::ContainerKind;
use crate::ContextSource;
use crate::ExportContext;
use crate::FormatOptions;
use crate::NoopDiagnostics;
use crate::Tag;
use crate::format_comment;
use crate::format_source;

pub(crate) fn options() -> FormatOptions {
	FormatOptions::default()
}

/// Options with a narrow print width, useful for wrapping tests.
pub(crate) fn narrow_options(print_width: usize) -> FormatOptions {
	FormatOptions {
		print_width,
		..FormatOptions::default()
	}
}

/// Build a multi-line documentation comment from body lines.
pub(crate) fn comment(lines: &[&str]) -> String {
	let mut raw = String::from("/**");
	for line in lines {
		raw.push('\n');
		if line.is_empty() {
			raw.push_str(" *");
		} else {
			raw.push_str(" * ");
			raw.push_str(line);
		}
	}
	raw.push_str("\n */");
	raw
}

/// Format a comment that documents nothing.
pub(crate) fn format_detached(raw: &str, options: &FormatOptions) -> String {
	format_comment(raw, "", ContextSource::Detached, options, &NoopDiagnostics)
}

/// Format a comment followed by `code`.
pub(crate) fn format_before(raw: &str, code: &str, options: &FormatOptions) -> String {
	format_comment(raw, "", ContextSource::Snippet(code), options, &NoopDiagnostics)
}

pub(crate) fn format_file(source: &str, options: &FormatOptions) -> String {
	format_source(source, options, &NoopDiagnostics)
}

pub(crate) fn model_with_tags(names: &[&str]) -> CommentModel {
	CommentModel {
		summary: Some("Summary.".to_string()),
		other_tags: names
			.iter()
			.enumerate()
			.map(|(index, name)| Tag::new(*name, "", index..index + 1))
			.collect(),
		..CommentModel::default()
	}
}

pub(crate) fn release_tag_names(model: &CommentModel) -> Vec<&str> {
	model
		.other_tags
		.iter()
		.filter(|tag| tag.is_release())
		.map(|tag| tag.name.as_str())
		.collect()
}

pub(crate) fn exported_context() -> ExportContext {
	ExportContext {
		is_exported: true,
		..ExportContext::default()
	}
}

pub(crate) fn class_member_context() -> ExportContext {
	ExportContext {
		is_exported: true,
		is_container_member: true,
		container_kind: Some(ContainerKind::Class),
		should_inherit_release_tag: true,
		..ExportContext::default()
	}
}

pub(crate) fn enum_source() -> &'static str {
	"/**\n * Colors.\n * @enum\n * @public\n */\nexport const Colors = {\n  /** Red. */\n  Red: \
	 'red',\n  /** Blue. */\n  Blue: 'blue',\n};\n"
}
