//! Glob pattern compilation.
//!
//! Syntax (spec ??4.1): `*` matches a run of non-`/` characters, `**` matches
//! any run including `/`, `?` matches one non-`/` character, `[abc]`/`[^abc]`
//! are character classes, `\` escapes the next character, a trailing `/`
//! marks "directory only", a pattern with no `/` (other than a trailing one)
//! matches by basename anywhere in the tree, `./` anchors to the matcher's
//! cwd, and an absolute pattern anchors at the filesystem root.
//!
//! Compilation is total: every string compiles to something, even if it's
//! nonsensical as a glob — unsupported escapes just become literals.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::path::{host_is_case_insensitive, normalize};

/// A single compiled glob, ready to test absolute paths.
#[derive(Debug, Clone)]
pub struct CompiledGlob {
	/// The longest fixed (metacharacter-free) directory prefix.
	pub base: PathBuf,
	/// Whether this pattern only matches directories (trailing `/`).
	pub dir_only: bool,
	regex: Regex,
}

impl CompiledGlob {
	/// Compile a glob string anchored at `cwd`.
	///
	/// `cwd` is used to resolve relative (non-basename) patterns and as the
	/// base when the pattern has no fixed literal prefix.
	#[must_use]
	pub fn compile(pattern: &str, cwd: &Path) -> Self {
		let dir_only = pattern.ends_with('/') && pattern.len() > 1;
		let trimmed = if dir_only {
			&pattern[..pattern.len() - 1]
		} else {
			pattern
		};

		let anchored = anchor(trimmed, cwd);
		let (fixed_prefix, body) = split_fixed_prefix(&anchored);
		let base = if fixed_prefix.is_empty() {
			cwd.to_path_buf()
		} else {
			fixed_base_dir(&fixed_prefix, cwd)
		};

		let case_insensitive = host_is_case_insensitive();
		let pattern_str = translate(&anchored);
		let regex = Regex::new(&pattern_str).map_or_else(
			|_| Regex::new(&regex::escape(&anchored)).expect("escaped literal always compiles"),
			|r| r,
		);
		let regex = if case_insensitive {
			Regex::new(&format!("(?i){}", regex.as_str())).unwrap_or(regex)
		} else {
			regex
		};

		let _ = body;
		Self { base, dir_only, regex }
	}

	/// Test whether `path` (absolute, normalized) matches.
	#[must_use]
	pub fn test(&self, path: &Path) -> bool {
		let candidate = normalize(path);
		let text = candidate.to_string_lossy().replace('\\', "/");
		self.regex.is_match(&text)
	}
}

/// Anchor a trimmed glob body to `cwd`, per the spec's anchoring rules.
fn anchor(pattern: &str, cwd: &Path) -> String {
	let is_absolute = pattern.starts_with('/') || has_windows_drive(pattern);
	if is_absolute {
		pattern.replace('\\', "/")
	} else if let Some(rest) = pattern.strip_prefix("./") {
		join_forward(cwd, rest)
	} else if !contains_unescaped_slash(pattern) {
		// bare basename: matches anywhere in the tree under cwd
		join_forward(cwd, &format!("**/{pattern}"))
	} else {
		join_forward(cwd, pattern)
	}
}

fn has_windows_drive(pattern: &str) -> bool {
	let bytes = pattern.as_bytes();
	bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn contains_unescaped_slash(pattern: &str) -> bool {
	let mut chars = pattern.chars().peekable();
	while let Some(c) = chars.next() {
		if c == '\\' {
			chars.next();
		} else if c == '/' {
			return true;
		}
	}
	false
}

fn join_forward(cwd: &Path, rest: &str) -> String {
	let cwd = normalize(cwd).to_string_lossy().replace('\\', "/");
	let cwd = cwd.trim_end_matches('/');
	format!("{cwd}/{rest}")
}

/// Split off the longest prefix that contains no unescaped glob
/// metacharacter, returning (fixed_prefix, remaining_body).
fn split_fixed_prefix(pattern: &str) -> (String, String) {
	let mut fixed = String::new();
	let mut chars = pattern.char_indices().peekable();
	let mut cut = pattern.len();

	while let Some((i, c)) = chars.peek().copied() {
		match c {
			'\\' => {
				chars.next();
				if let Some(&(_, next)) = chars.peek() {
					fixed.push(next);
					chars.next();
				}
			}
			'*' | '?' | '[' => {
				cut = i;
				break;
			}
			_ => {
				fixed.push(c);
				chars.next();
			}
		}
	}

	let body = pattern[cut..].to_string();
	(fixed, body)
}

fn fixed_base_dir(fixed_prefix: &str, cwd: &Path) -> PathBuf {
	let dir = match fixed_prefix.rfind('/') {
		Some(idx) => &fixed_prefix[..idx],
		None => "",
	};
	if dir.is_empty() {
		cwd.to_path_buf()
	} else {
		PathBuf::from(dir)
	}
}

/// Translate an anchored glob (already `/`-separated, absolute) into an
/// anchored regex pattern string.
fn translate(pattern: &str) -> String {
	let mut out = String::from("^");
	let chars: Vec<char> = pattern.chars().collect();
	let mut i = 0;

	while i < chars.len() {
		let c = chars[i];
		match c {
			'\\' => {
				if i + 1 < chars.len() {
					out.push_str(&regex::escape(&chars[i + 1].to_string()));
					i += 2;
				} else {
					i += 1;
				}
			}
			'*' => {
				if chars.get(i + 1) == Some(&'*') {
					// `**` — consume an optional following `/`
					if chars.get(i + 2) == Some(&'/') {
						out.push_str("(?:.*/)?");
						i += 3;
					} else {
						out.push_str(".*");
						i += 2;
					}
				} else {
					out.push_str("[^/]*");
					i += 1;
				}
			}
			'?' => {
				out.push_str("[^/]");
				i += 1;
			}
			'[' => {
				let mut j = i + 1;
				let negate = chars.get(j) == Some(&'^');
				if negate {
					j += 1;
				}
				let class_start = j;
				while j < chars.len() && chars[j] != ']' {
					j += 1;
				}
				if j < chars.len() {
					let class: String = chars[class_start..j].iter().collect();
					out.push('[');
					if negate {
						out.push('^');
					}
					out.push_str(&class.replace('\\', "\\\\"));
					out.push(']');
					i = j + 1;
				} else {
					// unterminated class: treat `[` as a literal
					out.push_str("\\[");
					i += 1;
				}
			}
			other => {
				out.push_str(&regex::escape(&other.to_string()));
				i += 1;
			}
		}
	}

	out.push('$');
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cwd() -> PathBuf {
		PathBuf::from("/project")
	}

	#[test]
	fn basename_pattern_matches_anywhere() {
		let g = CompiledGlob::compile("*.txt", &cwd());
		assert!(g.test(Path::new("/project/a.txt")));
		assert!(g.test(Path::new("/project/sub/deep/b.txt")));
		assert!(!g.test(Path::new("/project/a.rs")));
	}

	#[test]
	fn double_star_crosses_slashes() {
		let g = CompiledGlob::compile("src/**/*.rs", &cwd());
		assert!(g.test(Path::new("/project/src/lib.rs")));
		assert!(g.test(Path::new("/project/src/a/b/c.rs")));
		assert!(!g.test(Path::new("/project/other/a.rs")));
	}

	#[test]
	fn single_star_stops_at_slash() {
		let g = CompiledGlob::compile("src/*.rs", &cwd());
		assert!(g.test(Path::new("/project/src/lib.rs")));
		assert!(!g.test(Path::new("/project/src/sub/lib.rs")));
	}

	#[test]
	fn character_class() {
		let g = CompiledGlob::compile("file.[ch]", &cwd());
		assert!(g.test(Path::new("/project/file.c")));
		assert!(g.test(Path::new("/project/file.h")));
		assert!(!g.test(Path::new("/project/file.x")));
	}

	#[test]
	fn dot_slash_anchors_to_cwd() {
		let g = CompiledGlob::compile("./rel/*.txt", &cwd());
		assert!(g.test(Path::new("/project/rel/a.txt")));
	}

	#[test]
	fn absolute_pattern_anchors_at_root() {
		let g = CompiledGlob::compile("/etc/*.conf", &cwd());
		assert!(g.test(Path::new("/etc/foo.conf")));
		assert!(!g.test(Path::new("/project/etc/foo.conf")));
	}

	#[test]
	fn fixed_base_is_longest_literal_prefix() {
		let g = CompiledGlob::compile("src/assets/*.png", &cwd());
		assert_eq!(g.base, PathBuf::from("/project/src/assets"));
	}

	#[test]
	fn directory_only_trailing_slash() {
		let g = CompiledGlob::compile("build/", &cwd());
		assert!(g.dir_only);
	}
}
