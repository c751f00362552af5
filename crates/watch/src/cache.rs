//! The per-path filesystem state cache the watcher diffs against on every
//! debounce cycle: one modification time per watched file, one entry list
//! per watched directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The last-observed shape of one watched path.
#[derive(Clone, Debug)]
pub enum CacheEntry {
	/// A file's last-known modification time.
	File(SystemTime),
	/// A directory's last-known child paths.
	Dir(Vec<PathBuf>),
}

/// Maps every path the watcher has walked to its last-observed
/// [`CacheEntry`].
#[derive(Debug, Default)]
pub struct StateCache {
	entries: HashMap<PathBuf, CacheEntry>,
}

impl StateCache {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
		self.entries.get(path)
	}

	pub fn insert(&mut self, path: PathBuf, entry: CacheEntry) {
		self.entries.insert(path, entry);
	}

	pub fn remove(&mut self, path: &Path) -> Option<CacheEntry> {
		self.entries.remove(path)
	}

	/// Every cached path strictly nested under `dir`, used to recursively
	/// mark descendants deleted when their parent directory disappears.
	#[must_use]
	pub fn descendants_of(&self, dir: &Path) -> Vec<PathBuf> {
		self.entries.keys().filter(|p| *p != dir && p.starts_with(dir)).cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn descendants_of_excludes_the_directory_itself() {
		let mut cache = StateCache::new();
		cache.insert(PathBuf::from("/src"), CacheEntry::Dir(vec![PathBuf::from("/src/a.txt")]));
		cache.insert(PathBuf::from("/src/a.txt"), CacheEntry::File(SystemTime::UNIX_EPOCH));
		cache.insert(PathBuf::from("/other/b.txt"), CacheEntry::File(SystemTime::UNIX_EPOCH));

		let mut descendants = cache.descendants_of(Path::new("/src"));
		descendants.sort();
		assert_eq!(descendants, vec![PathBuf::from("/src/a.txt")]);
	}
}
