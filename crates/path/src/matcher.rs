//! The compiled [`Matcher`]: a disjunction of include patterns plus an
//! optional nested exclude matcher.

use std::{
	fmt,
	path::{Path, PathBuf},
	sync::Arc,
};

use regex::Regex;
use tracing::trace;

use crate::{
	glob::CompiledGlob,
	path::{common_dir_of, normalize},
};

/// A pattern to feed into [`Matcher::new`].
///
/// A glob string with a leading `!` marks it as an exclude pattern: it's
/// peeled off into the matcher's nested exclude set rather than its
/// includes.
#[derive(Clone)]
pub enum Pattern {
	/// A glob string, per the syntax documented on [`crate::glob`].
	Glob(String),
	/// A pre-compiled regular expression, tested against the absolute path.
	Regex(Regex),
	/// An arbitrary predicate over the absolute path.
	Predicate(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
	/// A previously compiled matcher, nested as a sub-pattern.
	Nested(Matcher),
}

impl fmt::Debug for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Glob(g) => f.debug_tuple("Glob").field(g).finish(),
			Self::Regex(r) => f.debug_tuple("Regex").field(&r.as_str()).finish(),
			Self::Predicate(_) => f.debug_tuple("Predicate").field(&"..").finish(),
			Self::Nested(m) => f.debug_tuple("Nested").field(m).finish(),
		}
	}
}

impl From<&str> for Pattern {
	fn from(s: &str) -> Self {
		Self::Glob(s.to_owned())
	}
}

impl From<String> for Pattern {
	fn from(s: String) -> Self {
		Self::Glob(s)
	}
}

impl From<Regex> for Pattern {
	fn from(r: Regex) -> Self {
		Self::Regex(r)
	}
}

impl From<Matcher> for Pattern {
	fn from(m: Matcher) -> Self {
		Self::Nested(m)
	}
}

#[derive(Clone)]
enum Compiled {
	Glob(CompiledGlob),
	Regex { base: PathBuf, regex: Regex },
	Predicate { base: PathBuf, test: Arc<dyn Fn(&Path) -> bool + Send + Sync> },
	Nested(Matcher),
}

impl fmt::Debug for Compiled {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Glob(g) => f.debug_tuple("Glob").field(&g.base).finish(),
			Self::Regex { base, regex } => f
				.debug_struct("Regex")
				.field("base", base)
				.field("pattern", &regex.as_str())
				.finish(),
			Self::Predicate { base, .. } => f.debug_tuple("Predicate").field(base).finish(),
			Self::Nested(m) => f.debug_tuple("Nested").field(m).finish(),
		}
	}
}

impl Compiled {
	fn base(&self) -> &Path {
		match self {
			Self::Glob(g) => &g.base,
			Self::Regex { base, .. } | Self::Predicate { base, .. } => base,
			Self::Nested(m) => &m.base,
		}
	}

	fn test(&self, path: &Path) -> bool {
		match self {
			Self::Glob(g) => g.test(path),
			Self::Regex { regex, .. } => regex.is_match(&path.to_string_lossy()),
			Self::Predicate { test, .. } => test(path),
			Self::Nested(m) => m.test(path),
		}
	}
}

/// A compiled matcher: true iff any include pattern matches and no exclude
/// pattern matches. An empty include set is treated as "all included",
/// still subject to excludes.
#[derive(Clone, Debug)]
pub struct Matcher {
	includes: Vec<Compiled>,
	excludes: Option<Box<Matcher>>,
	/// The common directory of the include patterns' bases.
	pub base: PathBuf,
}

impl Matcher {
	/// Compile a matcher from an iterable of patterns, anchored at `cwd`.
	///
	/// Glob strings beginning with `!` are peeled into the exclude set.
	pub fn new<I, P>(patterns: I, cwd: &Path) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<Pattern>,
	{
		let cwd = normalize(cwd);
		let mut includes = Vec::new();
		let mut exclude_patterns = Vec::new();

		for pattern in patterns {
			match pattern.into() {
				Pattern::Glob(g) => {
					if let Some(rest) = g.strip_prefix('!') {
						exclude_patterns.push(Pattern::Glob(rest.to_owned()));
					} else {
						includes.push(Compiled::Glob(CompiledGlob::compile(&g, &cwd)));
					}
				}
				Pattern::Regex(r) => includes.push(Compiled::Regex { base: cwd.clone(), regex: r }),
				Pattern::Predicate(f) => includes.push(Compiled::Predicate { base: cwd.clone(), test: f }),
				Pattern::Nested(m) => includes.push(Compiled::Nested(m)),
			}
		}

		let base = common_dir_of(includes.iter().map(Compiled::base)).unwrap_or(cwd.clone());

		let excludes = if exclude_patterns.is_empty() {
			None
		} else {
			Some(Box::new(Self::new(exclude_patterns, &cwd)))
		};

		Self { includes, excludes, base }
	}

	/// An empty matcher: matches everything (subject to no excludes).
	#[must_use]
	pub fn all(cwd: &Path) -> Self {
		Self { includes: Vec::new(), excludes: None, base: normalize(cwd) }
	}

	/// Test an absolute path against this matcher.
	#[must_use]
	pub fn test(&self, path: &Path) -> bool {
		let path = normalize(path);
		let included = self.includes.is_empty() || self.includes.iter().any(|p| p.test(&path));
		if !included {
			trace!(?path, "matcher: no include pattern matched");
			return false;
		}
		if let Some(excludes) = &self.excludes {
			if excludes.test(&path) {
				trace!(?path, "matcher: excluded");
				return false;
			}
		}
		true
	}

	/// Attach (or replace) a nested exclude matcher.
	#[must_use]
	pub fn with_excludes(mut self, excludes: Matcher) -> Self {
		self.excludes = Some(Box::new(excludes));
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn cwd() -> PathBuf {
		PathBuf::from("/project")
	}

	#[test]
	fn empty_matcher_matches_all() {
		let m = Matcher::all(&cwd());
		assert!(m.test(Path::new("/project/anything.txt")));
	}

	#[test]
	fn include_and_exclude() {
		let m = Matcher::new(vec!["*.txt", "!secret.txt"], &cwd());
		assert!(m.test(Path::new("/project/a.txt")));
		assert!(!m.test(Path::new("/project/secret.txt")));
	}

	#[test]
	fn base_is_common_dir_of_includes() {
		let m = Matcher::new(vec!["src/a/*.rs", "src/b/*.rs"], &cwd());
		assert_eq!(m.base, PathBuf::from("/project/src"));
	}

	#[test]
	fn nested_matcher_as_exclude() {
		let excludes = Matcher::new(vec!["*.log"], &cwd());
		let m = Matcher::new(vec!["*"], &cwd()).with_excludes(excludes);
		assert!(!m.test(Path::new("/project/debug.log")));
		assert!(m.test(Path::new("/project/a.txt")));
	}

	#[test]
	fn predicate_pattern() {
		let m = Matcher::new(
			vec![Pattern::Predicate(Arc::new(|p: &Path| {
				p.extension().map_or(false, |e| e == "rs")
			}))],
			&cwd(),
		);
		assert!(m.test(Path::new("/project/a.rs")));
		assert!(!m.test(Path::new("/project/a.txt")));
	}
}
