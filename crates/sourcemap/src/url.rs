//! Emitting the `sourceMappingURL` comment that links generated content back
//! to its map.

const MODERN_PREFIX: &str = "//# sourceMappingURL=";
const BLOCK_PREFIX: &str = "/*# sourceMappingURL=";
const LEGACY_PREFIX: &str = "//@ sourceMappingURL=";

/// Replace an existing `sourceMappingURL` comment in `content` with one
/// pointing at `url`, or append one if none is present.
///
/// Recognizes the modern `//#`/`/*# ... */` forms and the legacy `//@` form.
/// When appending to multi-line content, a block comment is used so the
/// comment does not need to be the last line; `single_line` content (e.g. a
/// minified one-liner) gets a `//#` comment appended directly with no
/// preceding newline.
#[must_use]
pub fn emit_source_map_url(content: &str, url: &str, single_line: bool) -> String {
	if let Some(replaced) = replace_existing(content, url) {
		return replaced;
	}

	if single_line {
		format!("{content}//# sourceMappingURL={url}")
	} else {
		format!("{content}\n/*# sourceMappingURL={url} */")
	}
}

fn replace_existing(content: &str, url: &str) -> Option<String> {
	for line in content.lines() {
		let trimmed = line.trim_end();
		if let Some(rest) = trimmed.strip_prefix(MODERN_PREFIX) {
			let _ = rest;
			return Some(content.replacen(trimmed, &format!("{MODERN_PREFIX}{url}"), 1));
		}
		if let Some(rest) = trimmed.strip_prefix(LEGACY_PREFIX) {
			let _ = rest;
			return Some(content.replacen(trimmed, &format!("{LEGACY_PREFIX}{url}"), 1));
		}
		if trimmed.starts_with(BLOCK_PREFIX) && trimmed.ends_with("*/") {
			return Some(content.replacen(trimmed, &format!("{BLOCK_PREFIX}{url} */"), 1));
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replaces_modern_line_comment() {
		let out = emit_source_map_url("//# sourceMappingURL=b.js", "a.js", true);
		assert_eq!(out, "//# sourceMappingURL=a.js");
	}

	#[test]
	fn replaces_legacy_comment() {
		let out = emit_source_map_url("//@ sourceMappingURL=b.js", "a.js", true);
		assert_eq!(out, "//@ sourceMappingURL=a.js");
	}

	#[test]
	fn replaces_block_comment() {
		let out = emit_source_map_url("/*# sourceMappingURL=b.js */", "a.js", false);
		assert_eq!(out, "/*# sourceMappingURL=a.js */");
	}

	#[test]
	fn appends_block_comment_for_multi_line_content() {
		let out = emit_source_map_url("console.log(1);", "a.js", false);
		assert_eq!(out, "console.log(1);\n/*# sourceMappingURL=a.js */");
	}

	#[test]
	fn appends_line_comment_for_single_line_content() {
		let out = emit_source_map_url("console.log(1);", "a.js", true);
		assert_eq!(out, "console.log(1);//# sourceMappingURL=a.js");
	}
}
