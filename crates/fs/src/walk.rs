//! Depth-first filesystem walk with prune-by-returning-false directory
//! callbacks and a shared stat/readDir dedupe cache.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::dedupe::DedupeCache;
use crate::error::Error;
use crate::facade::{self, Entry, EntryKind};

/// Callbacks driving a [`walk`]. All are optional in spirit (no-op
/// defaults); implement only what you need.
pub trait WalkVisitor: Send {
	/// Called for each regular file encountered.
	fn file(&mut self, _path: &Path) {}

	/// Called for each directory before it is recursed into. Return `false`
	/// to prune (don't descend).
	fn dir(&mut self, _path: &Path) -> bool {
		true
	}

	/// Called for entries that are neither a file nor a directory.
	fn other(&mut self, _path: &Path) {}

	/// Called when an operation on `path` fails. Does not abort sibling
	/// walks.
	fn error(&mut self, _path: &Path, _err: &Error) {}

	/// Called once the walk under the root completes.
	fn end(&mut self) {}
}

/// Shared cache of in-flight `readDir` calls, reusable across multiple
/// walks rooted at overlapping directories.
#[derive(Default)]
pub struct WalkCache {
	dirs: DedupeCache<Vec<Entry>>,
}

impl WalkCache {
	/// An empty cache.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}

/// Walk `root` depth-first, invoking `visitor`'s callbacks. Errors on
/// individual paths are reported via [`WalkVisitor::error`] and do not abort
/// the rest of the walk.
pub async fn walk(root: &Path, cache: &WalkCache, try_count: u32, visitor: &mut dyn WalkVisitor) {
	walk_one(root.to_path_buf(), cache, try_count, visitor).await;
	visitor.end();
}

fn walk_one<'a>(dir: PathBuf, cache: &'a WalkCache, try_count: u32, visitor: &'a mut dyn WalkVisitor) -> BoxFuture<'a, ()> {
	async move {
		if !visitor.dir(&dir) {
			return;
		}

		let entries = cache.dirs.call(&dir, { let dir = dir.clone(); async move { facade::read_dir(&dir, try_count).await } }).await;

		let entries = match entries {
			Ok(entries) => entries,
			Err(err) => {
				visitor.error(&dir, &err);
				return;
			}
		};

		for entry in entries {
			match entry.kind {
				EntryKind::Dir => walk_one(entry.path, cache, try_count, &mut *visitor).await,
				EntryKind::File => visitor.file(&entry.path),
				EntryKind::Other => visitor.other(&entry.path),
			}
		}
	}
	.boxed()
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Collector {
		files: Vec<PathBuf>,
		dirs: Vec<PathBuf>,
	}

	impl WalkVisitor for Collector {
		fn file(&mut self, path: &Path) {
			self.files.push(path.to_path_buf());
		}

		fn dir(&mut self, path: &Path) -> bool {
			self.dirs.push(path.to_path_buf());
			true
		}
	}

	#[tokio::test]
	async fn walks_nested_directories() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::create_dir(tmp.path().join("sub")).unwrap();
		std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
		std::fs::write(tmp.path().join("sub/b.txt"), b"b").unwrap();

		let mut collector = Collector { files: Vec::new(), dirs: Vec::new() };
		let cache = WalkCache::new();
		walk(tmp.path(), &cache, 3, &mut collector).await;

		assert_eq!(collector.files.len(), 2);
		assert!(collector.dirs.contains(&tmp.path().to_path_buf()));
	}

	#[tokio::test]
	async fn pruned_directory_is_not_descended() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::create_dir(tmp.path().join("skip")).unwrap();
		std::fs::write(tmp.path().join("skip/c.txt"), b"c").unwrap();

		struct Pruner;
		impl WalkVisitor for Pruner {
			fn dir(&mut self, path: &Path) -> bool {
				!path.ends_with("skip")
			}
		}

		let mut pruner = Pruner;
		let cache = WalkCache::new();
		walk(tmp.path(), &cache, 3, &mut pruner).await;
	}
}
