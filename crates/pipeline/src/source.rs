//! Glob-driven source discovery: walks a root list's matcher base, admits
//! matching files, and closes the root list once the walk completes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use loom_fs::{Error, WalkCache, WalkVisitor};

use crate::list::List;
use crate::observer::Observer;

struct Collector<'a> {
	matcher: &'a loom_path::Matcher,
	observer: &'a Arc<dyn Observer>,
	matches: Vec<PathBuf>,
}

impl WalkVisitor for Collector<'_> {
	fn dir(&mut self, path: &Path) -> bool {
		self.observer.add_dir(path);
		true
	}

	fn file(&mut self, path: &Path) {
		if self.matcher.test(path) {
			self.matches.push(path.to_path_buf());
		} else {
			tracing::trace!(path = %path.display(), "source: ignored, no pattern matched");
		}
	}

	fn error(&mut self, path: &Path, err: &Error) {
		tracing::warn!(path = %path.display(), %err, "source: walk error, continuing");
	}
}

/// Walk `list`'s matcher from its common base, admitting every matching
/// file and closing the list once the walk completes. Walk errors on
/// individual paths are logged and don't abort discovery of the rest of
/// the tree.
///
/// The upstream behavior walks from each include pattern's own base
/// directory; since [`loom_path::Matcher`] only exposes the *combined*
/// common base of all its include patterns, this walks that single base and
/// relies on `matcher.test` to reject anything outside any individual
/// pattern's scope.
pub async fn drive(list: &List, cache: &WalkCache, try_count: u32, observer: &Arc<dyn Observer>) {
	let Some(matcher) = list.matcher().cloned() else {
		tracing::trace!(list = list.name(), "source: not a root list, nothing to drive");
		list.end_upstream().await;
		return;
	};

	let mut collector = Collector { matcher: &matcher, observer, matches: Vec::new() };
	loom_fs::walk(&matcher.base, cache, try_count, &mut collector).await;

	for path in std::mem::take(&mut collector.matches) {
		let Some(name) = loom_path::relative_to(&matcher.base, &path) else {
			tracing::trace!(path = %path.display(), "source: matched file outside matcher base, skipping");
			continue;
		};
		let file = loom_file::File::from_disk(path, matcher.base.clone(), name);
		list.add(file).await;
	}

	list.end_upstream().await;
}
