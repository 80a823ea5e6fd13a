use std::sync::LazyLock;

use regex::Regex;

use crate::FormatOptions;
use crate::source_scanner::FenceTracker;

/// Words that introduce prose after `@see` rather than naming a target.
pub const SEE_LEAD_IN_WORDS: [&str; 24] = [
	"also", "for", "when", "the", "this", "that", "see", "and", "or", "in", "on", "at", "to", "of",
	"a", "an", "if", "e.g", "i.e", "note", "below", "above", "here", "there",
];

static VISIBILITY_TAG: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^(\s*)@(export|protected|private)\b").ok());
static TYPED_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"^(\s*@(?:param|arg|argument|throws|exception|this|returns|return))\b\s*\{").ok()
});
static HERITAGE_TAG: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^\s*@(?:extends|implements)\s*\{").ok());
static OBSOLETE_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"^\s*@(?:constructor|const|define|noalias|nosideeffects)\b").ok()
});
static SEE_TAG: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^(\s*)@see\s+(\S+)\s*$").ok());
static SEE_URL: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$").ok());
static SEE_DOTTED: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*)+(?:#[A-Za-z_$][A-Za-z0-9_$]*)?$").ok()
});
static SEE_LOWERCASE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"^[a-z_$][A-Za-z0-9_$]*$").ok());

/// Rewrite obsolete JSDoc annotations in a comment body into their modern
/// equivalents. Fenced code is never touched. Returns the input unchanged when
/// `legacy_compatibility` is off.
pub fn transform(body: &str, options: &FormatOptions) -> String {
	if !options.legacy_compatibility {
		return body.to_string();
	}

	let mut fences = FenceTracker::default();
	let mut lines: Vec<String> = Vec::new();

	for line in body.split('\n') {
		if fences.observe(line).is_code() {
			lines.push(line.to_string());
			continue;
		}

		if is_match(&HERITAGE_TAG, line) || is_match(&OBSOLETE_TAG, line) {
			continue;
		}

		let line = rewrite_visibility(line);
		let line = strip_inline_type(&line);
		let line = link_see_target(&line);
		lines.push(line);
	}

	lines.join("\n")
}

fn is_match(regex: &LazyLock<Option<Regex>>, text: &str) -> bool {
	regex.as_ref().is_some_and(|regex| regex.is_match(text))
}

/// `@export` becomes `@public`; `@protected` and `@private` become
/// `@internal`.
fn rewrite_visibility(line: &str) -> String {
	let Some(regex) = VISIBILITY_TAG.as_ref() else {
		return line.to_string();
	};

	regex
		.replace(line, |caps: &regex::Captures<'_>| {
			let replacement = if &caps[2] == "export" {
				"@public"
			} else {
				"@internal"
			};
			format!("{}{replacement}", &caps[1])
		})
		.into_owned()
}

/// Remove a balanced `{Type}` annotation following a typed tag.
fn strip_inline_type(line: &str) -> String {
	let Some(caps) = TYPED_TAG.as_ref().and_then(|regex| regex.captures(line)) else {
		return line.to_string();
	};
	let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
		return line.to_string();
	};

	let open = whole.end() - 1;
	if line[open..].starts_with("{@") {
		return line.to_string();
	}
	let Some(close) = balanced_close(&line[open..]) else {
		return line.to_string();
	};

	let rest = line[open + close + 1..].trim_start();
	if rest.is_empty() {
		tag.as_str().to_string()
	} else {
		format!("{} {rest}", tag.as_str())
	}
}

/// Offset of the brace closing the group that opens at the start of `text`.
fn balanced_close(text: &str) -> Option<usize> {
	let mut depth = 0usize;
	for (index, ch) in text.char_indices() {
		match ch {
			'{' => depth += 1,
			'}' => {
				depth = depth.checked_sub(1)?;
				if depth == 0 {
					return Some(index);
				}
			}
			_ => {}
		}
	}
	None
}

/// `@see target` becomes `@see {@link target}` when the target is a single
/// URL or identifier.
fn link_see_target(line: &str) -> String {
	let Some(caps) = SEE_TAG.as_ref().and_then(|regex| regex.captures(line)) else {
		return line.to_string();
	};

	let target = &caps[2];
	if !is_see_target(target) {
		return line.to_string();
	}

	format!("{}@see {{@link {target}}}", &caps[1])
}

fn is_see_target(target: &str) -> bool {
	let word = target.trim_end_matches(['.', ',', ':']).to_ascii_lowercase();
	if SEE_LEAD_IN_WORDS.contains(&word.as_str()) {
		return false;
	}

	is_match(&SEE_URL, target) || is_match(&SEE_DOTTED, target) || is_match(&SEE_LOWERCASE, target)
}
