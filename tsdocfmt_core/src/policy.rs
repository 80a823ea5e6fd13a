use crate::CommentModel;
use crate::ExportContext;
use crate::FormatOptions;
use crate::ReleaseTagStrategy;
use crate::Tag;

/// Sort rank used when `normalize_tag_order` is set.
fn tag_rank(tag: &Tag) -> u8 {
	match tag.name.as_str() {
		"@deprecated" => 0,
		_ if tag.is_release() => 1,
		_ if tag.is_modifier() => 2,
		"@example" => 4,
		"@see" => 5,
		_ => 3,
	}
}

/// Enforce the release tag policy on `model`: dedupe release tags, insert the
/// configured default where the declaration needs one, and optionally reorder
/// tags.
pub fn apply<'a>(
	model: &'a mut CommentModel,
	context: &ExportContext,
	options: &FormatOptions,
) -> &'a mut CommentModel {
	if model.unstructured {
		return model;
	}

	if options.dedupe_release_tags {
		dedupe_release_tags(model, options.release_tag_strategy);
	}

	if model.release_tag_count() == 0 && should_insert(context, options) {
		if let Some(tag) = options.default_release_tag() {
			tracing::trace!(tag = %tag, "inserting default release tag");
			model.other_tags.push(Tag::synthetic(tag));
		}
	}

	if options.normalize_tag_order {
		model.other_tags.sort_by_key(tag_rank);
	}

	model
}

/// Whether a comment without a release tag should receive the default.
pub fn should_insert(context: &ExportContext, options: &FormatOptions) -> bool {
	if context.should_inherit_release_tag {
		return false;
	}

	!options.only_exported_api || context.is_exported
}

/// Keep exactly one release tag, chosen by `strategy`.
pub fn dedupe_release_tags(model: &mut CommentModel, strategy: ReleaseTagStrategy) {
	let positions: Vec<usize> = model
		.other_tags
		.iter()
		.enumerate()
		.filter(|(_, tag)| tag.is_release())
		.map(|(index, _)| index)
		.collect();

	if positions.len() < 2 {
		return;
	}

	let keep = match strategy {
		ReleaseTagStrategy::KeepFirst => positions.first(),
		ReleaseTagStrategy::KeepLast => positions.last(),
	}
	.copied();

	let mut index = 0;
	model.other_tags.retain(|tag| {
		let current = index;
		index += 1;
		!tag.is_release() || Some(current) == keep
	});
}
