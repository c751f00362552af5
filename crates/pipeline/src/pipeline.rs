//! [`Pipeline`]: the entry point that creates root lists bound to glob
//! patterns and drives source discovery for them.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use loom_fs::WalkCache;
use loom_path::{Matcher, Pattern};
use loom_queue::AsyncQueue;

use crate::config::Options;
use crate::list::List;
use crate::observer::{NoopObserver, Observer};
use crate::source;

/// Owns the engine-wide async queue and observer, and mints root lists.
pub struct Pipeline {
	cwd: PathBuf,
	queue: Arc<AsyncQueue>,
	observer: Arc<dyn Observer>,
	roots: Mutex<Vec<List>>,
}

impl Pipeline {
	/// A pipeline rooted at `cwd`, reporting to `observer`.
	#[must_use]
	pub fn new(cwd: impl Into<PathBuf>, observer: Arc<dyn Observer>) -> Self {
		Self::with_queue(cwd, observer, AsyncQueue::new())
	}

	/// A pipeline driven by an externally-created queue, for a caller (the
	/// task runner) that needs to hand the same queue to a watcher before
	/// the pipeline's observer is finalized.
	#[must_use]
	pub fn with_queue(cwd: impl Into<PathBuf>, observer: Arc<dyn Observer>, queue: Arc<AsyncQueue>) -> Self {
		Self { cwd: cwd.into(), queue, observer, roots: Mutex::new(Vec::new()) }
	}

	/// A pipeline with no observer wired up.
	#[must_use]
	pub fn with_default_observer(cwd: impl Into<PathBuf>) -> Self {
		Self::new(cwd, Arc::new(NoopObserver))
	}

	/// The queue every stage transition is sequenced through.
	#[must_use]
	pub fn queue(&self) -> &Arc<AsyncQueue> {
		&self.queue
	}

	/// Create a root list bound to `patterns` and spawn its source-discovery
	/// walk. The root list holds a queue lock until discovery completes, so
	/// dependent stages never drain ahead of it.
	pub fn src<I, P>(&self, patterns: I, options: Options) -> List
	where
		I: IntoIterator<Item = P>,
		P: Into<Pattern>,
	{
		let matcher = Matcher::new(patterns, &self.cwd);
		let list = List::new_root("src", matcher, options, Arc::clone(&self.observer), &self.queue);
		self.roots.lock().expect("pipeline roots lock poisoned").push(list.clone());

		let driven = list.clone();
		let observer = Arc::clone(&self.observer);
		let try_count = 3;
		tokio::spawn(async move {
			let cache = WalkCache::new();
			source::drive(&driven, &cache, try_count, &observer).await;
		});

		list
	}

	/// This pipeline's working directory, used as the base for relative
	/// patterns passed to [`Self::src`].
	#[must_use]
	pub fn cwd(&self) -> &Path {
		&self.cwd
	}

	/// Every root list minted by [`Self::src`] so far, for a caller (the
	/// task runner's watch mode) that needs to register them with a watcher
	/// after the task that built the graph has run.
	#[must_use]
	pub fn roots(&self) -> Vec<List> {
		self.roots.lock().expect("pipeline roots lock poisoned").clone()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use crate::{AddHook, Processor};

	use super::*;

	#[tokio::test]
	async fn glob_driven_source_admits_matching_files() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
		std::fs::write(tmp.path().join("b.rs"), b"b").unwrap();
		std::fs::create_dir(tmp.path().join("sub")).unwrap();
		std::fs::write(tmp.path().join("sub/c.txt"), b"c").unwrap();

		let pipeline = Pipeline::with_default_observer(tmp.path());
		let root = pipeline.src(vec!["**/*.txt"], Options::default());

		let names: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
		let names_for_hook = Arc::clone(&names);
		let processor = Processor {
			add: Some(AddHook::Sync(Arc::new(move |file: loom_file::File, _options: &Options| {
				names_for_hook.lock().unwrap().push(file.name().unwrap_or_default().to_owned());
				(file, true)
			}))),
			..Processor::passthrough()
		};
		root.pipe(processor, Options::default()).await;

		pipeline.queue().idle().await;

		let mut seen = names.lock().unwrap().clone();
		seen.sort();
		assert_eq!(seen, vec!["a.txt".to_owned(), "sub/c.txt".to_owned()]);
	}

	#[tokio::test]
	async fn queue_goes_idle_once_discovery_completes() {
		let tmp = tempfile::tempdir().unwrap();
		let pipeline = Pipeline::with_default_observer(tmp.path());
		let _root = pipeline.src(vec!["*.txt"], Options::default());
		pipeline.queue().idle().await;
		assert!(pipeline.queue().is_idle());
	}
}
