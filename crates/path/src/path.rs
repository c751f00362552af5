//! Path normalization helpers.
//!
//! Logical names inside a [`crate::Matcher`] and the pipeline's [`File`
//! entity](https://docs.rs/loom-file) always use `/`; these helpers operate on
//! platform-native [`Path`]s and convert at the edges.

use std::path::{Component, Path, PathBuf};

use normalize_path::NormalizePath;

/// Case sensitivity follows the host path separator: case-insensitive
/// matching applies only where the platform's own separator is `\`.
#[must_use]
pub const fn host_is_case_insensitive() -> bool {
	cfg!(windows)
}

/// Normalize a path: resolve `.`/`..` components lexically (no filesystem
/// access) and simplify Windows UNC prefixes.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
	dunce::simplified(&path.normalize()).to_path_buf()
}

/// Join `base` and `rel`, then normalize.
#[must_use]
pub fn resolve(base: &Path, rel: &Path) -> PathBuf {
	if rel.is_absolute() {
		normalize(rel)
	} else {
		normalize(&base.join(rel))
	}
}

/// The longest shared prefix of `a` and `b`, ending on a component boundary.
#[must_use]
pub fn common_dir(a: &Path, b: &Path) -> PathBuf {
	let a = normalize(a);
	let b = normalize(b);

	let mut out = PathBuf::new();
	for (ca, cb) in a.components().zip(b.components()) {
		if components_eq(&ca, &cb) {
			out.push(ca.as_os_str());
		} else {
			break;
		}
	}
	out
}

fn components_eq(a: &Component<'_>, b: &Component<'_>) -> bool {
	if host_is_case_insensitive() {
		a.as_os_str().to_string_lossy().to_lowercase() == b.as_os_str().to_string_lossy().to_lowercase()
	} else {
		a == b
	}
}

/// The common directory of an arbitrary number of paths.
///
/// Returns `None` if the iterator is empty.
pub fn common_dir_of<I, P>(paths: I) -> Option<PathBuf>
where
	I: IntoIterator<Item = P>,
	P: AsRef<Path>,
{
	let mut iter = paths.into_iter();
	let first = normalize(iter.next()?.as_ref());
	Some(iter.fold(first, |acc, p| common_dir(&acc, p.as_ref())))
}

/// True iff `child` is contained within `parent`, after normalization.
#[must_use]
pub fn in_dir(parent: &Path, child: &Path) -> bool {
	let parent = normalize(parent);
	let child = normalize(child);
	child.starts_with(&parent)
}

/// Express `path` relative to `base`, using `/` as the separator regardless
/// of host platform. Returns `None` if `path` is not under `base`.
#[must_use]
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
	let base = normalize(base);
	let path = normalize(path);
	let rel = path.strip_prefix(&base).ok()?;
	Some(to_logical(rel))
}

/// Convert a platform-native relative path to a `/`-separated logical name.
#[must_use]
pub fn to_logical(path: &Path) -> String {
	path.components()
		.map(|c| c.as_os_str().to_string_lossy().into_owned())
		.collect::<Vec<_>>()
		.join("/")
}

/// Convert a `/`-separated logical name back to a platform-native relative
/// [`PathBuf`].
#[must_use]
pub fn from_logical(name: &str) -> PathBuf {
	name.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn common_dir_of_siblings() {
		let a = Path::new("/a/b/c.txt");
		let b = Path::new("/a/b/d/e.txt");
		assert_eq!(common_dir(a, b), PathBuf::from("/a/b"));
	}

	#[test]
	fn common_dir_of_disjoint() {
		let a = Path::new("/a/b");
		let b = Path::new("/x/y");
		assert_eq!(common_dir(a, b), PathBuf::from("/"));
	}

	#[test]
	fn in_dir_true_and_false() {
		assert!(in_dir(Path::new("/a/b"), Path::new("/a/b/c")));
		assert!(!in_dir(Path::new("/a/b"), Path::new("/a/x")));
	}

	#[test]
	fn relative_to_round_trips_through_logical() {
		let base = Path::new("/proj/src");
		let path = Path::new("/proj/src/sub/file.txt");
		let rel = relative_to(base, path).unwrap();
		assert_eq!(rel, "sub/file.txt");
		assert_eq!(resolve(base, &from_logical(&rel)), normalize(path));
	}

	#[test]
	fn resolve_absolute_ignores_base() {
		let base = Path::new("/proj/src");
		let abs = Path::new("/etc/hosts");
		assert_eq!(resolve(base, abs), normalize(abs));
	}
}
