//! The watcher's small built-in ignore list: editor swap files and common OS
//! temporaries that would otherwise trigger spurious rebuilds.

use std::path::Path;

const IGNORE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];
const IGNORE_SUFFIXES: &[&str] = &[".swp", ".swx", ".swpx", "~", ".tmp"];
const IGNORE_PREFIXES: &[&str] = &[".#", "#"];

/// Whether `path`'s file name matches the built-in ignore list.
#[must_use]
pub fn is_ignored(path: &Path) -> bool {
	let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
		return false;
	};
	IGNORE_NAMES.contains(&name) || IGNORE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) || IGNORE_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn recognizes_common_noise() {
		assert!(is_ignored(&PathBuf::from("/src/.#a.txt.swp")));
		assert!(is_ignored(&PathBuf::from("/src/a.txt~")));
		assert!(is_ignored(&PathBuf::from("/src/.DS_Store")));
		assert!(!is_ignored(&PathBuf::from("/src/a.txt")));
	}
}
