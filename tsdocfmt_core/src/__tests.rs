use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;
use crate::doc::Doc;
use crate::doc::print;
use crate::legacy;
use crate::policy;

#[rstest]
#[case::multi_line("/**\n * Summary line.\n *\n * @param a - first\n */", "Summary line.\n\n@param a - first", false)]
#[case::text_after_opening("/** Summary\n * more\n */", "Summary\nmore", false)]
#[case::single_line("/**   Hello there.  */", "Hello there.", true)]
#[case::empty("/** */", "", true)]
#[case::keeps_code_indent("/**\n * ```ts\n *   nested();\n * ```\n */", "```ts\n  nested();\n```", false)]
#[case::unprefixed_line("/**\n  * Code:\n  * ```ts\n  run();\n  * ```\n  */", "Code:\n```ts\nrun();\n```", false)]
fn extract_comment_body(#[case] raw: &str, #[case] body: &str, #[case] single_line: bool) {
	let extracted = extract_body(raw, "  ").unwrap_or_else(|| panic!("not a doc comment: {raw}"));
	assert_eq!(extracted.body, body);
	assert_eq!(extracted.single_line, single_line);
}

#[rstest]
#[case::block_comment("/* plain */")]
#[case::empty_block("/**/")]
#[case::line_comment("// nope")]
fn extract_rejects_non_doc_comments(#[case] raw: &str) {
	assert!(extract_body(raw, "").is_none());
}

#[rstest]
#[case::typed_param("@param {string} id - The id", "@param id - The id")]
#[case::typed_returns("@returns {Promise<void>} done", "@returns done")]
#[case::nested_type("@param {{ a: string }} opts", "@param opts")]
#[case::inline_tag_kept("@param {@link Foo} bar", "@param {@link Foo} bar")]
#[case::export_visibility("@export", "@public")]
#[case::private_visibility("@private", "@internal")]
#[case::protected_visibility("  @protected", "  @internal")]
#[case::obsolete_removed("Summary\n@constructor", "Summary")]
#[case::heritage_removed("Summary\n@extends {Base}", "Summary")]
#[case::implements_removed("Summary\n@implements {X}", "Summary")]
#[case::extends_without_braces("@extends Base", "@extends Base")]
#[case::throws_bare("@throws {Error}", "@throws")]
#[case::throws_description("@throws {Error} when empty", "@throws when empty")]
#[case::this_bare("@this {Foo}", "@this")]
#[case::see_dotted("@see foo.bar", "@see {@link foo.bar}")]
#[case::see_url("@see https://example.com", "@see {@link https://example.com}")]
#[case::see_lowercase("@see helper", "@see {@link helper}")]
#[case::see_lead_in("@see Also", "@see Also")]
#[case::see_prose("@see the docs", "@see the docs")]
#[case::fence_protected("```\n@param {x} y\n@private\n```", "```\n@param {x} y\n@private\n```")]
fn legacy_transform(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(legacy::transform(input, &options()), expected);
}

#[test]
fn legacy_transform_disabled() {
	let options = FormatOptions {
		legacy_compatibility: false,
		..options()
	};
	let input = "@param {string} id\n@export";
	assert_eq!(legacy::transform(input, &options), input);
}

#[test]
fn parse_summary_params_and_returns() {
	let model = parse_comment(
		"Finds a user.\n\n@typeParam T - the record\n@param id - The id.\n@return the user",
		&options(),
	);

	assert_eq!(model.summary.as_deref(), Some("Finds a user."));
	assert_eq!(model.params.len(), 2);
	assert_eq!(model.params[0].kind, ParamKind::TypeParam);
	assert_eq!(model.params[0].name, "T");
	assert_eq!(model.params[0].description, "the record");
	assert_eq!(model.params[1].kind, ParamKind::Param);
	assert_eq!(model.params[1].name, "id");
	assert_eq!(model.params[1].description, "The id.");
	assert_eq!(
		model.returns.as_ref().map(|returns| returns.description.as_str()),
		Some("the user")
	);
	assert!(model.other_tags.is_empty());
	assert!(!model.unstructured);
}

#[test]
fn parse_keeps_duplicate_returns_as_other_tags() {
	let model = parse_comment("@returns a\n@returns b", &options());
	assert_eq!(
		model.returns.map(|returns| returns.description),
		Some("a".to_string())
	);
	assert_eq!(model.other_tags.len(), 1);
	assert_eq!(model.other_tags[0].name, "@returns");
	assert_eq!(model.other_tags[0].content, "b");
}

#[rstest]
#[case::argument("@argument id the id", "@param")]
#[case::prop("@prop name", "@property")]
#[case::exception("@exception Error", "@throws")]
#[case::template("@template T", "@typeParam")]
fn parse_normalizes_tag_names(#[case] body: &str, #[case] expected: &str) {
	let model = parse_comment(body, &options());
	let names: Vec<&str> = model
		.params
		.iter()
		.map(|param| param.kind.tag_name())
		.chain(model.other_tags.iter().map(|tag| tag.name.as_str()))
		.collect();
	assert_eq!(names, vec![expected]);
}

#[test]
fn parse_applies_user_normalizations_last() {
	let options = FormatOptions {
		normalize_tags: BTreeMap::from([
			("desc".to_string(), "remarks".to_string()),
			("@returns".to_string(), "@yields".to_string()),
		]),
		..options()
	};
	let model = parse_comment("Summary.\n@desc More text.\n@return value", &options);

	assert_eq!(model.remarks.as_deref(), Some("More text."));
	assert!(model.returns.is_none());
	assert!(model.has_tag("@yields"));
}

#[test]
fn parse_file_overview_into_package_documentation() {
	let model = parse_comment("@fileoverview Utilities.\n@file Helpers.", &options());
	assert_eq!(model.summary.as_deref(), Some("Utilities."));
	assert_eq!(model.remarks.as_deref(), Some("Helpers."));
	let names: Vec<&str> = model.other_tags.iter().map(|tag| tag.name.as_str()).collect();
	assert_eq!(names, vec!["@packageDocumentation"]);
}

#[rstest]
#[case::code_span("Use `@param` here.")]
#[case::inline_tag("See {@link Foo | @param thing} here.")]
#[case::unknown_mid_line("Email the team @ support or @someone.")]
fn parse_keeps_tag_like_text_in_summary(#[case] body: &str) {
	let model = parse_comment(body, &options());
	assert_eq!(model.summary.as_deref(), Some(body));
	assert!(model.other_tags.is_empty());
	assert!(model.params.is_empty());
}

#[rstest]
#[case::blank_line("Avoid the ` character.\n\n@param a - uses `x`")]
#[case::tag_line("Avoid the ` character.\n@param a - uses `x`")]
fn parse_unmatched_backtick_stops_at_paragraph(#[case] body: &str) {
	let model = parse_comment(body, &options());
	assert_eq!(model.summary.as_deref(), Some("Avoid the ` character."));
	assert_eq!(model.params.len(), 1);
	assert_eq!(model.params[0].name, "a");
	assert_eq!(model.params[0].description, "uses `x`");
}

#[test]
fn parse_code_span_spans_soft_line_break() {
	let body = "Use `a\nb` here.";
	let model = parse_comment(body, &options());
	assert_eq!(model.summary.as_deref(), Some(body));
}

#[test]
fn parse_recognizes_extra_tags_mid_line() {
	let body = "Text @category Utilities";
	let plain = parse_comment(body, &options());
	assert_eq!(plain.summary.as_deref(), Some(body));

	let options = FormatOptions {
		extra_tags: vec!["category".to_string()],
		..options()
	};
	let model = parse_comment(body, &options);
	assert_eq!(model.summary.as_deref(), Some("Text"));
	assert_eq!(model.other_tags.len(), 1);
	assert_eq!(model.other_tags[0].name, "@category");
	assert_eq!(model.other_tags[0].content, "Utilities");
}

#[test]
fn parse_single_sentence_summary() {
	let options = FormatOptions {
		single_sentence_summary: true,
		..options()
	};
	let model = parse_comment("First sentence. Second sentence here.", &options);
	assert_eq!(model.summary.as_deref(), Some("First sentence."));
	assert_eq!(model.remarks.as_deref(), Some("Second sentence here."));
}

#[test]
fn parse_reports_unterminated_fence() {
	let result = TsdocParser::default().parse_sections("Summary\n```ts\ncode");
	assert!(matches!(result, Err(TsdocError::UnterminatedFence { line: 2 })));
	assert!(result.is_err_and(|error| error.is_parse_error()));
}

#[test]
fn parse_falls_back_to_unstructured() {
	let model = parse_comment("Text {@link Foo", &options());
	assert!(model.unstructured);
	assert_eq!(model.summary.as_deref(), Some("Text {@link Foo"));
}

#[rstest]
#[case::hyphen("id - The id", "id", "The id")]
#[case::no_hyphen("id The id", "id", "The id")]
#[case::optional("[opts.x=1] desc", "[opts.x=1]", "desc")]
#[case::name_only("name", "name", "")]
#[case::dangling_hyphen("a -", "a", "")]
#[case::negative_number("a -1 is allowed", "a", "-1 is allowed")]
fn split_param_content(#[case] content: &str, #[case] name: &str, #[case] description: &str) {
	assert_eq!(split_param(content), (name.to_string(), description.to_string()));
}

#[rstest]
#[case::block("@remarks", TagKind::Block)]
#[case::modifier("@sealed", TagKind::Modifier)]
#[case::release("@public", TagKind::Modifier)]
#[case::inline("@link", TagKind::Inline)]
#[case::extra("@category", TagKind::Block)]
#[case::unknown("@foo", TagKind::Unknown)]
fn tag_kind_classification(#[case] name: &str, #[case] expected: TagKind) {
	let extra = BTreeSet::from(["@category".to_string()]);
	assert_eq!(TagKind::of(name, &extra), expected);
}

#[test]
fn inline_tags_do_not_start_sections() {
	let parser = TsdocParser::new(BTreeSet::new());
	assert!(!parser.is_recognized("@link"));
	assert!(parser.is_recognized("@return"));
	assert!(!TagKind::Inline.starts_section());
}

#[rstest]
#[case::keep_first(ReleaseTagStrategy::KeepFirst, "@public")]
#[case::keep_last(ReleaseTagStrategy::KeepLast, "@internal")]
fn policy_dedupes_by_strategy(#[case] strategy: ReleaseTagStrategy, #[case] kept: &str) {
	let options = FormatOptions {
		release_tag_strategy: strategy,
		..options()
	};
	let mut model = model_with_tags(&["@public", "@readonly", "@beta", "@internal"]);
	policy::apply(&mut model, &exported_context(), &options);

	assert_eq!(release_tag_names(&model), vec![kept]);
	assert!(model.has_tag("@readonly"));
}

#[test]
fn policy_dedup_invariant() {
	let tags = ["@public", "@beta", "@alpha"];
	for count in 0..=tags.len() {
		let mut model = model_with_tags(&tags[..count]);
		policy::apply(&mut model, &ExportContext::default(), &options());
		assert_eq!(model.release_tag_count(), count.min(1), "with {count} release tags");
	}
}

#[test]
fn policy_keeps_duplicates_when_dedup_is_disabled() {
	let options = FormatOptions {
		dedupe_release_tags: false,
		..options()
	};
	let mut model = model_with_tags(&["@public", "@beta"]);
	policy::apply(&mut model, &exported_context(), &options);
	assert_eq!(release_tag_names(&model), vec!["@public", "@beta"]);
}

#[test]
fn policy_inserts_default_for_exported_declarations() {
	let mut model = model_with_tags(&[]);
	policy::apply(&mut model, &exported_context(), &options());

	assert_eq!(release_tag_names(&model), vec!["@internal"]);
	assert!(model.other_tags[0].is_synthetic());
}

#[test]
fn policy_inheritance_invariant() {
	let mut untagged = model_with_tags(&[]);
	policy::apply(&mut untagged, &class_member_context(), &options());
	assert_eq!(untagged.release_tag_count(), 0);

	let mut tagged = model_with_tags(&["@beta"]);
	policy::apply(&mut tagged, &class_member_context(), &options());
	assert_eq!(release_tag_names(&tagged), vec!["@beta"]);
}

#[rstest]
#[case::empty_string(ReleaseTagSetting::Tag(String::new()))]
#[case::bare_at(ReleaseTagSetting::Tag("@".to_string()))]
#[case::disabled(ReleaseTagSetting::Enabled(false))]
fn policy_disabled_default_never_inserts(#[case] setting: ReleaseTagSetting) {
	let options = FormatOptions {
		default_release_tag: setting,
		only_exported_api: false,
		..options()
	};
	let mut model = model_with_tags(&[]);
	policy::apply(&mut model, &exported_context(), &options);
	assert_eq!(model.release_tag_count(), 0);
}

#[test]
fn policy_uses_configured_default() {
	let options = FormatOptions {
		default_release_tag: ReleaseTagSetting::Tag("beta".to_string()),
		..options()
	};
	let mut model = model_with_tags(&[]);
	policy::apply(&mut model, &exported_context(), &options);
	assert_eq!(release_tag_names(&model), vec!["@beta"]);
}

#[test]
fn policy_leaves_unstructured_models_alone() {
	let mut model = CommentModel::unstructured("Text {@link Foo");
	policy::apply(&mut model, &exported_context(), &options());
	assert!(model.other_tags.is_empty());
}

#[test]
fn policy_normalizes_tag_order() {
	let options = FormatOptions {
		normalize_tag_order: true,
		..options()
	};
	let mut model = model_with_tags(&["@see", "@example", "@beta", "@deprecated", "@readonly", "@custom"]);
	policy::apply(&mut model, &ExportContext::default(), &options);

	let names: Vec<&str> = model.other_tags.iter().map(|tag| tag.name.as_str()).collect();
	assert_eq!(
		names,
		vec!["@deprecated", "@beta", "@readonly", "@custom", "@example", "@see"]
	);
}

#[test]
fn host_context_for_enum_property_inherits() {
	let host = HostContext {
		is_exported: true,
		is_const_enum_property: true,
		const_enum_has_release_tag: Some(true),
		..HostContext::default()
	};
	let context = analyze(ContextSource::Host(&host), &options(), &NoopDiagnostics);

	assert!(context.is_enum_property);
	assert!(context.enclosing_enum_has_release_tag);
	assert!(context.should_inherit_release_tag);
	assert!(!context.is_container_member);
}

#[rstest]
#[case::tagged_container("/** Shape. @public */", true)]
#[case::untagged_container("/** Shape. */", false)]
fn host_context_reads_enum_container_comment(#[case] comment: &str, #[case] tagged: bool) {
	let host = HostContext {
		is_exported: true,
		is_const_enum_property: true,
		container: Some(HostContainer {
			kind: ContainerKind::Interface,
			comment: Some(comment.to_string()),
		}),
		const_enum_has_release_tag: None,
		..HostContext::default()
	};
	let context = analyze(ContextSource::Host(&host), &options(), &NoopDiagnostics);

	assert_eq!(context.container_kind, None);
	assert!(!context.is_container_member);
	assert_eq!(context.enclosing_enum_has_release_tag, tagged);
	assert_eq!(context.should_inherit_release_tag, tagged);
}

#[test]
fn host_context_untagged_enum_receives_default() {
	let host = HostContext {
		is_exported: true,
		is_const_enum_property: true,
		container: Some(HostContainer {
			kind: ContainerKind::Interface,
			comment: Some("/** Shape. @enum */".to_string()),
		}),
		..HostContext::default()
	};
	let raw = "/** Square. */";
	let formatted = format_comment(
		raw,
		"",
		ContextSource::Host(&host),
		&options(),
		&NoopDiagnostics,
	);
	assert_eq!(formatted, "/**\n * Square.\n *\n * @internal\n */");
}

#[test]
fn host_context_without_container_does_not_inherit() {
	let host = HostContext {
		is_exported: true,
		is_const_enum_property: true,
		..HostContext::default()
	};
	let context = analyze(ContextSource::Host(&host), &options(), &NoopDiagnostics);
	assert!(!context.enclosing_enum_has_release_tag);
	assert!(!context.should_inherit_release_tag);
}

#[rstest]
#[case::exported("export function find() {}", true)]
#[case::export_list("export { find }", true)]
#[case::plain("function find() {}", false)]
#[case::exporter("exporter()", false)]
fn snippet_context_export_detection(#[case] snippet: &str, #[case] exported: bool) {
	let context = analyze(ContextSource::Snippet(snippet), &options(), &NoopDiagnostics);
	assert_eq!(context.is_exported, exported);
}

#[test]
fn context_errors_degrade_to_default() {
	let tree = DeclarationTree::new();
	let diagnostics = CollectedDiagnostics::new();
	let context = analyze(
		ContextSource::Tree {
			provider: &tree,
			id: DeclarationId(3),
		},
		&options(),
		&diagnostics,
	);

	assert_eq!(context, ExportContext::default());
	assert!(diagnostics.has_stage(Stage::Context));
}

#[test]
fn tree_context_for_members_and_re_exports() -> TsdocResult<()> {
	let mut tree = DeclarationTree::new();
	let class = tree.push(
		Declaration::Class {
			name: "Service".to_string(),
			exported: false,
		},
		None,
		None,
	);
	let member = tree.push(
		Declaration::Member {
			name: "start".to_string(),
		},
		Some(class),
		None,
	);
	tree.add_re_export("Service");

	let context = try_analyze(
		ContextSource::Tree {
			provider: &tree,
			id: member,
		},
		&options(),
	)?;
	assert!(context.is_exported);
	assert!(context.is_container_member);
	assert!(context.should_inherit_release_tag);

	let options = FormatOptions {
		inheritance_aware: false,
		..options()
	};
	let context = try_analyze(
		ContextSource::Tree {
			provider: &tree,
			id: member,
		},
		&options,
	)?;
	assert!(context.is_exported);
	assert!(!context.should_inherit_release_tag);

	Ok(())
}

#[test]
fn format_legacy_param_scenario() {
	let raw = comment(&["Finds a user.", "@param {string} id - The user id."]);
	let formatted = format_before(&raw, "export function find(id: string) {}", &options());
	let expected = comment(&["Finds a user.", "", "@param id - The user id.", "", "@internal"]);
	assert_eq!(formatted, expected);
}

#[test]
fn format_enum_scenario() {
	let formatted = format_file(enum_source(), &options());
	let expected = "/**\n * Colors.\n *\n * @enum\n * @public\n */\nexport const Colors = {\n  /** Red. \
	                */\n  Red: 'red',\n  /** Blue. */\n  Blue: 'blue',\n};\n";

	assert_eq!(formatted, expected);
	assert_eq!(formatted.matches("@public").count(), 1);
	assert_eq!(formatted.matches("@internal").count(), 0);
}

#[test]
fn format_enum_without_inheritance() {
	let options = FormatOptions {
		inheritance_aware: false,
		..options()
	};
	let formatted = format_file(enum_source(), &options);

	assert_eq!(formatted.matches("@public").count(), 1);
	assert_eq!(formatted.matches("@internal").count(), 2);
	assert!(formatted.contains("  /**\n   * Red.\n   *\n   * @internal\n   */\n  Red: 'red',"));
}

#[test]
fn format_non_exported_function_scenario() {
	let source = "/** Helper. */\nfunction helper() {}\n";
	assert_eq!(format_file(source, &options()), source);

	let options = FormatOptions {
		only_exported_api: false,
		..options()
	};
	assert_eq!(
		format_file(source, &options),
		"/**\n * Helper.\n *\n * @internal\n */\nfunction helper() {}\n"
	);
}

#[test]
fn format_unknown_fence_language_scenario() {
	let raw = comment(&["Example:", "", "```weird", "  code here   ", "", "```"]);
	let expected = comment(&["Example:", "", "```weird", "  code here", "```"]);
	assert_eq!(format_detached(&raw, &options()), expected);
}

#[test]
fn format_class_members_inherit() {
	let source = "/** A service. */\nexport class Service {\n  /** Starts it. */\n  start(): void {}\n}\n";
	assert_eq!(
		format_file(source, &options()),
		"/**\n * A service.\n *\n * @internal\n */\nexport class Service {\n  /** Starts it. */\n  \
		 start(): void {}\n}\n"
	);

	let options = FormatOptions {
		inheritance_aware: false,
		..options()
	};
	assert_eq!(
		format_file(source, &options),
		"/**\n * A service.\n *\n * @internal\n */\nexport class Service {\n  /**\n   * Starts \
		 it.\n   *\n   * @internal\n   */\n  start(): void {}\n}\n"
	);
}

#[test]
fn format_re_exported_declaration() {
	let source = "/** Helper. */\nfunction helper() {}\nexport { helper };\n";
	assert_eq!(
		format_file(source, &options()),
		"/**\n * Helper.\n *\n * @internal\n */\nfunction helper() {}\nexport { helper };\n"
	);
}

#[test]
fn format_file_header() {
	let source = "/**\n * @fileoverview Utilities for strings.\n */\n\nimport { x } from './x';\n";
	assert_eq!(
		format_file(source, &options()),
		"/**\n * Utilities for strings.\n *\n * @packageDocumentation\n * @internal\n */\n\nimport { \
		 x } from './x';\n"
	);
}

#[rstest]
#[case::fits("/** Short summary. */", "/** Short summary. */")]
#[case::collapses_spaces("/**   Short   summary.   */", "/** Short summary. */")]
#[case::empty("/** */", "/** */")]
#[case::expands_tags("/** Short. @beta */", "/**\n * Short.\n *\n * @beta\n */")]
fn format_single_line_comments(#[case] raw: &str, #[case] expected: &str) {
	assert_eq!(format_detached(raw, &options()), expected);
}

#[test]
fn format_single_line_too_wide_expands() {
	let raw = "/** This summary is far too long to fit within the narrow width. */";
	assert_eq!(
		format_detached(raw, &narrow_options(40)),
		"/**\n * This summary is far too long to fit\n * within the narrow width.\n */"
	);
}

#[test]
fn format_force_expands_single_line() {
	let options = FormatOptions {
		force_format_tsdoc: true,
		..options()
	};
	assert_eq!(format_detached("/** Short. */", &options), "/**\n * Short.\n */");
}

#[test]
fn format_wraps_paragraphs() {
	let raw = comment(&["The quick brown fox jumps over the lazy dog and keeps running far away."]);
	let expected = comment(&["The quick brown fox jumps over the", "lazy dog and keeps running far away."]);
	assert_eq!(format_detached(&raw, &narrow_options(40)), expected);
}

#[test]
fn format_wraps_list_items_with_continuation_indent() {
	let raw = comment(&[
		"Options:",
		"",
		"- first item that is long enough to wrap around the line width limit",
		"- second",
	]);
	let expected = comment(&[
		"Options:",
		"",
		"- first item that is long enough to",
		"   wrap around the line width limit",
		"- second",
	]);
	assert_eq!(format_detached(&raw, &narrow_options(40)), expected);
}

#[test]
fn format_aligns_param_tags() {
	let options = FormatOptions {
		align_param_tags: true,
		..options()
	};
	let raw = comment(&["@param a first", "@param longName second"]);
	let expected = comment(&["@param a        - first", "@param longName - second"]);
	assert_eq!(format_detached(&raw, &options), expected);
}

#[test]
fn format_returns_and_remarks() {
	let raw = comment(&["Gets.", "@remarks More detail.", "@return the value"]);
	let expected = comment(&["Gets.", "", "@remarks", "More detail.", "", "@returns the value"]);
	assert_eq!(format_detached(&raw, &options()), expected);
}

#[rstest]
#[case::split(true, vec!["Thing.", "", "@beta", "@readonly"])]
#[case::joined(false, vec!["Thing.", "", "@beta @readonly"])]
fn format_modifier_runs(#[case] split_modifiers: bool, #[case] lines: Vec<&str>) {
	let options = FormatOptions {
		split_modifiers,
		..options()
	};
	let raw = comment(&["Thing.", "@beta", "@readonly"]);
	let formatted = format_detached(&raw, &options);
	assert_eq!(formatted, comment(&lines));
	assert_eq!(format_detached(&formatted, &options), formatted);
}

#[test]
fn format_example_block() {
	let raw = comment(&["Summary.", "@example", "```ts", "add(1, 2);", "```"]);
	let expected = comment(&["Summary.", "", "@example", "```ts", "add(1, 2);", "```"]);
	assert_eq!(format_detached(&raw, &options()), expected);
}

#[test]
fn format_embedded_json() {
	let raw = comment(&["Config:", "", "```json", "{\"a\":1}", "```"]);
	let expected = comment(&["Config:", "", "```json", "{", "  \"a\": 1", "}", "```"]);
	assert_eq!(format_detached(&raw, &options()), expected);
}

#[test]
fn format_embedded_failure_keeps_snippet() {
	let raw = comment(&["Config:", "", "```json", "{a:1}", "```"]);
	let diagnostics = CollectedDiagnostics::new();
	let formatted = format_comment(&raw, "", ContextSource::Detached, &options(), &diagnostics);

	assert_eq!(formatted, raw);
	assert!(diagnostics.has_stage(Stage::EmbeddedFormat));
}

#[test]
fn format_embedded_off_keeps_snippet() {
	let options = FormatOptions {
		embedded_language_formatting: EmbeddedLanguageFormatting::Off,
		..options()
	};
	let raw = comment(&["Config:", "", "```json", "{\"a\":1}", "```"]);
	assert_eq!(format_detached(&raw, &options), raw);
}

#[test]
fn format_parse_failure_leaves_comment() {
	let raw = comment(&["Text {@link Foo"]);
	let diagnostics = CollectedDiagnostics::new();
	let formatted = format_comment(&raw, "", ContextSource::Snippet("export const a = 1;"), &options(), &diagnostics);

	assert_eq!(formatted, raw);
	assert!(diagnostics.has_stage(Stage::Parse));
}

#[test]
fn render_rejects_early_comment_close() {
	let model = CommentModel {
		summary: Some("a */ b".to_string()),
		..CommentModel::default()
	};
	assert!(matches!(render(&model, &options()), Err(TsdocError::Render(_))));
}

#[test]
fn render_unfenced_code_with_fenced_indent_none() {
	let options = FormatOptions {
		fenced_indent: FencedIndent::None,
		..options()
	};
	let model = parse_comment("Example:\n\n```ts\nconst a = 1;\n```", &options);
	let context = RenderContext {
		indent: "  ",
		..RenderContext::default()
	};
	let rendered = render_with(&model, &options, &context).unwrap_or_else(|e| panic!("render: {e}"));

	assert_eq!(
		rendered,
		"/**\n   * Example:\n   *\n   * ```ts\n  const a = 1;\n   * ```\n   */"
	);
	let again = format_comment(&rendered, "  ", ContextSource::Detached, &options, &NoopDiagnostics);
	assert_eq!(again, rendered);
}

#[test]
fn script_fence_inside_comment_is_only_trimmed() {
	let raw = comment(&["Example:", "", "```ts", "const a  =  1;   ", "add( a )", "```"]);
	let expected = comment(&["Example:", "", "```ts", "const a  =  1;", "add( a )", "```"]);
	assert_eq!(format_detached(&raw, &options()), expected);
}

#[test]
fn script_formatter_formats_free_standing_code() {
	let registry = EmbeddedFormatterRegistry::default();
	let code = "/**   Adds.   */\nexport function add() {}";
	let formatted = registry.format_snippet("ts", code, &options(), &NoopDiagnostics);
	assert_eq!(
		formatted,
		"/**\n * Adds.\n *\n * @internal\n */\nexport function add() {}"
	);
}

#[rstest]
#[case::alias("ts", "typescript")]
#[case::info_string("tsx {1,3}", "typescript")]
#[case::uppercase("JSON", "json")]
#[case::node("node", "javascript")]
#[case::unknown("weird", "weird")]
fn canonical_language_names(#[case] info: &str, #[case] expected: &str) {
	assert_eq!(canonical_language(info), expected);
}

#[derive(Debug)]
struct UppercaseSql;

impl EmbeddedFormatter for UppercaseSql {
	fn languages(&self) -> &[&str] {
		&["sql"]
	}

	fn format(
		&self,
		code: &str,
		_options: &FormatOptions,
		_diagnostics: &dyn Diagnostics,
	) -> TsdocResult<String> {
		Ok(code.to_uppercase())
	}
}

impl AsyncEmbeddedFormatter for UppercaseSql {
	async fn format(&self, language: &str, code: &str) -> TsdocResult<String> {
		if language == "sql" {
			Ok(code.to_uppercase())
		} else {
			Err(TsdocError::embedded(language, "unsupported"))
		}
	}
}

#[test]
fn registry_accepts_custom_formatters() {
	let mut registry = EmbeddedFormatterRegistry::empty();
	registry.register(Arc::new(UppercaseSql));
	assert_eq!(registry.languages().collect::<Vec<_>>(), vec!["sql"]);

	let raw = comment(&["Query:", "", "```sql", "select 1", "```"]);
	let formatted = format_comment_with(
		&raw,
		"",
		ContextSource::Detached,
		&options(),
		&registry,
		&NoopDiagnostics,
	);
	assert_eq!(formatted, comment(&["Query:", "", "```sql", "SELECT 1", "```"]));
}

#[tokio::test]
async fn render_async_uses_preformatted_snippets() -> TsdocResult<()> {
	let model = parse_comment(
		"Query:\n\n```sql\nselect 1\n```\n\n```weird\nkeep me\n```",
		&options(),
	);
	let diagnostics = CollectedDiagnostics::new();
	let rendered = render_async(&model, &options(), "", &UppercaseSql, &diagnostics).await?;

	assert_eq!(
		rendered,
		comment(&[
			"Query:",
			"",
			"```sql",
			"SELECT 1",
			"```",
			"",
			"```weird",
			"keep me",
			"```",
		])
	);
	assert!(diagnostics.has_stage(Stage::EmbeddedFormat));

	Ok(())
}

#[test]
fn scan_builds_declaration_tree() {
	let source = "/** A. */\nexport interface Shape {\n  /** Area. */\n  area(): number;\n}\n";
	let scanned = scan_source(source);

	assert_eq!(scanned.comments.len(), 2);
	assert_eq!(scanned.comments[0].target, CommentTarget::Declaration(DeclarationId(0)));
	assert_eq!(scanned.comments[1].target, CommentTarget::Declaration(DeclarationId(1)));
	assert_eq!(scanned.comments[1].indent, "  ");

	let nodes: Vec<_> = scanned.tree.iter().map(|(_, node)| node.clone()).collect();
	assert_eq!(
		nodes[0].declaration,
		Declaration::Interface {
			name: "Shape".to_string(),
			exported: true,
		}
	);
	assert_eq!(
		nodes[1].declaration,
		Declaration::Member {
			name: "area".to_string(),
		}
	);
	assert_eq!(nodes[1].parent, Some(DeclarationId(0)));
}

#[test]
fn scan_skips_strings_templates_and_regexes() {
	let source = "const s = `/** not ${x} a comment */`;\nconst r = /\\/\\*\\*/;\nconst q = '/** nope \
	              */';\n/** Real. */\nexport const y = 1;\n";
	let scanned = scan_source(source);

	assert_eq!(scanned.comments.len(), 1);
	assert_eq!(&source[scanned.comments[0].range.clone()], "/** Real. */");
}

#[test]
fn scan_marks_detached_comments() {
	let source = "const a = 1;\n/** First. */\n/** Second. */\nexport const b = 2;\n/** Trailing. */\n";
	let scanned = scan_source(source);
	let targets: Vec<_> = scanned.comments.iter().map(|comment| comment.target).collect();

	assert_eq!(
		targets,
		vec![
			CommentTarget::Detached,
			CommentTarget::Declaration(DeclarationId(0)),
			CommentTarget::Detached,
		]
	);
}

#[test]
fn scan_records_default_exports() {
	let source = "/** Helper. */\nfunction helper() {}\nexport default helper;\n";
	let scanned = scan_source(source);
	assert!(scanned.tree.is_re_exported("helper"));
}

#[test]
fn fence_tracker_marks_code_lines() {
	let mut fences = FenceTracker::default();
	let kinds: Vec<FenceLine> = ["text", "```ts", "code", "```", "after"]
		.iter()
		.map(|line| fences.observe(line))
		.collect();

	assert_eq!(
		kinds,
		vec![
			FenceLine::Text,
			FenceLine::Open,
			FenceLine::Code,
			FenceLine::Close,
			FenceLine::Text,
		]
	);
	assert!(!fences.is_open());
}

#[test]
fn printer_fills_and_overflows() {
	let lines = print(&Doc::fill_words(["aaa", "bbb", "ccc"]), 7);
	let texts: Vec<&str> = lines.iter().map(|line| line.text.as_str()).collect();
	assert_eq!(texts, vec!["aaa bbb", "ccc"]);

	let lines = print(&Doc::fill_words(["abcdefghij", "x"]), 5);
	let texts: Vec<&str> = lines.iter().map(|line| line.text.as_str()).collect();
	assert_eq!(texts, vec!["abcdefghij", "x"]);
}

#[test]
fn printer_groups_break_when_too_wide() {
	let group = Doc::Group(vec![Doc::text("one"), Doc::Line, Doc::text("two")]);
	let flat = print(&group, 20);
	assert_eq!(flat[0].text, "one two");

	let broken = print(&group, 5);
	let texts: Vec<&str> = broken.iter().map(|line| line.text.as_str()).collect();
	assert_eq!(texts, vec!["one", "two"]);
}

#[rstest]
#[case::summary("/**   Adds.   */\nexport function add() {}\n")]
#[case::enum_object(enum_source())]
#[case::params("/**\n * Finds.\n * @param {string} id   the id that is being looked up in the store for the user record\n * @returns {User}   the user\n */\nexport function find(id) {}\n")]
#[case::list("/**\n * Items:\n * - one\n * - two that wraps because it is a very long list item indeed and goes on\n *\n * 1. first\n * 2. second\n */\nexport const x = 1;\n")]
#[case::fence("/**\n * @example\n * ```json\n * {\"b\":[1,2]}\n * ```\n */\nexport const y = 2;\n")]
#[case::class("export class A {\n  /**\n   * Method.\n   * @beta @readonly\n   */\n  m() {}\n}\n")]
#[case::quote("/**\n * > quoted text\n * > continues\n *\n * | a | b |\n * | - | - |\n */\nconst z = 3;\n")]
fn formatting_is_idempotent(#[case] source: &str) {
	for width in [40, 80, 120] {
		let options = narrow_options(width);
		let once = format_file(source, &options);
		let twice = format_file(&once, &options);
		assert_eq!(once, twice, "width {width}");
	}
}

#[test]
fn parser_cache_reuses_parsers() {
	let cache = ParserCache::new(NonZeroUsize::MIN.saturating_add(1));
	let extra = BTreeSet::from(["@category".to_string()]);
	let first = cache.get_or_create(&extra);
	let second = cache.get_or_create(&extra);

	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(cache.len(), 1);
	assert!(first.is_recognized("@category"));
	assert_eq!(first.extra_tags(), &extra);

	cache.clear();
	assert!(cache.is_empty());
}

#[test]
fn parser_cache_emits_metrics() {
	let recorder = DebuggingRecorder::new();
	let snapshotter = recorder.snapshotter();

	metrics::with_local_recorder(&recorder, || {
		let cache = ParserCache::new(NonZeroUsize::MIN);
		cache.get_or_create(&BTreeSet::new());
		cache.get_or_create(&BTreeSet::new());
		cache.get_or_create(&BTreeSet::from(["@category".to_string()]));
		assert_eq!(cache.len(), 1);
	});

	let names: HashSet<String> = snapshotter
		.snapshot()
		.into_vec()
		.into_iter()
		.map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
		.collect();

	for expected in [
		PARSER_CACHE_HIT_TOTAL,
		PARSER_CACHE_MISS_TOTAL,
		PARSER_CACHE_EVICT_TOTAL,
	] {
		assert!(names.contains(expected), "missing metric {expected}");
	}
}

#[test]
fn engine_emits_comment_metrics() {
	let recorder = DebuggingRecorder::new();
	let snapshotter = recorder.snapshotter();

	metrics::with_local_recorder(&recorder, || {
		format_detached("/** Fine. */", &options());
	});

	let names: HashSet<String> = snapshotter
		.snapshot()
		.into_vec()
		.into_iter()
		.map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
		.collect();
	assert!(names.contains(COMMENTS_FORMATTED_TOTAL));
}

#[test]
#[traced_test]
fn tracing_diagnostics_logs_skipped_comments() {
	TracingDiagnostics.report(Stage::Render, &TsdocError::Render("boom".to_string()));

	assert!(logs_contain("comment left unformatted"));
	assert!(logs_contain("stage=render"));
}

#[test]
fn collected_diagnostics_records_messages() {
	let diagnostics = CollectedDiagnostics::new();
	diagnostics.report(Stage::EmbeddedFormat, &TsdocError::embedded("json", "bad"));

	assert_eq!(diagnostics.len(), 1);
	assert_eq!(
		diagnostics.records()[0].message,
		"failed to format embedded `json` snippet: bad"
	);
}

#[test]
fn config_defaults() {
	let options = FormatOptions::default();
	assert_eq!(options.print_width, 80);
	assert_eq!(options.default_release_tag(), Some("@internal".to_string()));
	assert_eq!(options.effective_width(4), 73);
	assert_eq!(options.effective_width(70), MIN_CONTENT_WIDTH);
	assert_eq!(options.indent_width("\t  "), 4);
}

#[test]
fn config_loads_from_candidates() -> TsdocResult<()> {
	let tmp = tempfile::tempdir()?;
	assert!(FormatOptions::load(tmp.path())?.is_none());

	std::fs::write(
		tmp.path().join(".tsdocfmt.toml"),
		"print_width = 100\ndefault_release_tag = false\nrelease_tag_strategy = \
		 \"keep-last\"\nfenced_indent = \"none\"\nextra_tags = [\"category\", \"@group\"]\n\n[normalize_tags]\n\"@desc\" = \
		 \"@remarks\"\n",
	)?;

	let options = FormatOptions::load(tmp.path())?.unwrap_or_else(|| panic!("config not found"));
	assert_eq!(options.print_width, 100);
	assert_eq!(options.default_release_tag(), None);
	assert_eq!(options.release_tag_strategy, ReleaseTagStrategy::KeepLast);
	assert_eq!(options.fenced_indent, FencedIndent::None);
	assert_eq!(
		options.extra_tag_set(),
		BTreeSet::from(["@category".to_string(), "@group".to_string()])
	);
	assert_eq!(options.normalize_tags.get("@desc").map(String::as_str), Some("@remarks"));

	Ok(())
}

#[test]
fn config_prefers_first_candidate() -> TsdocResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::create_dir_all(tmp.path().join(".config"))?;
	std::fs::write(tmp.path().join("tsdocfmt.toml"), "print_width = 90\n")?;
	std::fs::write(tmp.path().join(".config/tsdocfmt.toml"), "print_width = 60\n")?;

	assert_eq!(
		FormatOptions::resolve_path(tmp.path()),
		Some(tmp.path().join("tsdocfmt.toml"))
	);
	let options = FormatOptions::load(tmp.path())?.unwrap_or_else(|| panic!("config not found"));
	assert_eq!(options.print_width, 90);

	Ok(())
}

#[test]
fn config_rejects_unknown_keys() {
	let result = FormatOptions::from_toml("prinWidth = 3\n");
	assert!(matches!(result, Err(TsdocError::ConfigParse(_))));
}

#[test]
fn project_check_and_write() -> TsdocResult<()> {
	let tmp = tempfile::tempdir()?;
	let root = tmp.path();
	let unformatted = "/**   Adds.   */\nfunction add() {}\n";
	std::fs::write(root.join("a.ts"), unformatted)?;
	std::fs::write(root.join("notes.md"), unformatted)?;
	std::fs::write(root.join(".gitignore"), "ignored/\n")?;
	std::fs::create_dir_all(root.join("ignored"))?;
	std::fs::write(root.join("ignored/b.ts"), unformatted)?;
	std::fs::create_dir_all(root.join("vendor"))?;
	std::fs::write(root.join("vendor/c.js"), unformatted)?;

	let options = FormatOptions {
		exclude: vec!["vendor/".to_string()],
		..options()
	};
	let files = collect_files(root, &options.exclude)?;
	assert_eq!(files, vec![root.join("a.ts")]);

	let result = check_project(root, &options, &NoopDiagnostics)?;
	assert!(!result.is_ok());
	assert_eq!(result.checked_count, 1);
	assert_eq!(result.changed[0].formatted, "/** Adds. */\nfunction add() {}\n");

	write_updates(&result)?;
	assert_eq!(
		std::fs::read_to_string(root.join("a.ts"))?,
		"/** Adds. */\nfunction add() {}\n"
	);
	assert!(check_project(root, &options, &NoopDiagnostics)?.is_ok());

	Ok(())
}
