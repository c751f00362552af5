//! Ties the watch backend, state cache, debounce, and dependency graph
//! together: raw filesystem events flow in, and matching root lists are
//! re-seeded and closed so the async queue drains the pipeline again.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use loom_file::{Diagnostic, File, SaveOutcome};
use loom_path::Matcher;
use loom_pipeline::{List, Observer};
use loom_queue::AsyncQueue;

use crate::backend::{watch_recursive, WatchBackend};
use crate::cache::{CacheEntry, StateCache};
use crate::counters::Counters;
use crate::debounce::{self, DEFAULT_DEBOUNCE};
use crate::ignore::is_ignored;
use crate::Error;

struct RootBinding {
	list: List,
	matcher: Matcher,
}

struct Shared {
	roots: StdMutex<Vec<RootBinding>>,
	deps: StdMutex<HashMap<PathBuf, HashSet<PathBuf>>>,
	cache: StdMutex<StateCache>,
	counters: Arc<Counters>,
	try_count: u32,
	watch_requests: mpsc::UnboundedSender<PathBuf>,
}

/// Watches the filesystem under every registered root list's matcher base,
/// debounces bursts of raw events, diffs them against a state cache, and
/// re-seeds + closes the affected root lists so their chains re-run.
pub struct Watcher {
	shared: Arc<Shared>,
	queue: Arc<AsyncQueue>,
}

impl Watcher {
	/// Construct a watcher backed by `backend`, sharing `queue` with the
	/// pipeline it rebuilds and `counters` with the task runner's summary.
	pub fn new(backend: WatchBackend, queue: Arc<AsyncQueue>, counters: Arc<Counters>, try_count: u32) -> Result<Self, Error> {
		let (raw_tx, raw_rx) = mpsc::unbounded_channel();
		let (watch_tx, watch_rx) = mpsc::unbounded_channel();

		let handler_tx = raw_tx;
		let inner = backend.create(move |event: Result<notify::Event, notify::Error>| match event {
			Ok(ev) => {
				for path in ev.paths {
					if handler_tx.send(path).is_err() {
						trace!("watch: raw event dropped, no receiver");
					}
				}
			}
			Err(err) => warn!(%err, "watch: backend reported an error"),
		})?;

		tokio::spawn(apply_watch_requests(inner, watch_rx));

		let shared = Arc::new(Shared {
			roots: StdMutex::new(Vec::new()),
			deps: StdMutex::new(HashMap::new()),
			cache: StdMutex::new(StateCache::new()),
			counters,
			try_count,
			watch_requests: watch_tx,
		});

		tokio::spawn(rebuild_loop(Arc::clone(&shared), Arc::clone(&queue), raw_rx));

		Ok(Self { shared, queue })
	}

	/// Register `list` (a root list, bound to a matcher) for watching: its
	/// matcher base is added to the backend's watch set, and future raw
	/// events under it are diffed against the state cache to decide whether
	/// to re-seed it.
	pub fn add_root(&self, list: List) -> Result<(), Error> {
		let matcher = list.matcher().cloned().ok_or(Error::NotARoot)?;
		let base = matcher.base.clone();
		self.shared.roots.lock().expect("watch roots lock poisoned").push(RootBinding { list, matcher });
		self.shared.watch_requests.send(base).ok();
		Ok(())
	}

	/// An [`Observer`] wrapper that, layered over `inner`, also feeds this
	/// watcher's dependency map and run counters from the same hooks.
	#[must_use]
	pub fn tracking_observer(&self, inner: Arc<dyn Observer>) -> Arc<dyn Observer> {
		Arc::new(TrackingObserver { inner, shared: Arc::clone(&self.shared) })
	}

	/// The async queue this watcher drains through on every rebuild.
	#[must_use]
	pub fn queue(&self) -> &Arc<AsyncQueue> {
		&self.queue
	}
}

async fn apply_watch_requests(mut watcher: Box<dyn notify::Watcher + Send>, mut requests: mpsc::UnboundedReceiver<PathBuf>) {
	while let Some(path) = requests.recv().await {
		if let Err(err) = watch_recursive(watcher.as_mut(), &path) {
			warn!(path = %path.display(), %err, "watch: could not add path to backend");
		}
	}
}

async fn rebuild_loop(shared: Arc<Shared>, queue: Arc<AsyncQueue>, mut raw_rx: mpsc::UnboundedReceiver<PathBuf>) {
	while let Some(batch) = debounce::collect(&mut raw_rx, DEFAULT_DEBOUNCE).await {
		let batch: HashSet<PathBuf> = batch.into_iter().filter(|path| !is_ignored(path)).collect();
		if batch.is_empty() {
			continue;
		}

		let try_count = shared.try_count;
		let (mut changed, deleted) = resolve_changes(&shared, batch, try_count).await;
		propagate_dependents(&shared, &mut changed, &deleted);

		if changed.is_empty() && deleted.is_empty() {
			trace!("watch: nothing changed after stat diff");
			continue;
		}

		debug!(changed = changed.len(), deleted = deleted.len(), "watch: rebuild triggered");
		shared.counters.reset();

		let lock = queue.lock();
		rebuild_roots(&shared, try_count, &changed, &deleted).await;
		drop(lock);
	}
}

/// Resolves a batch of raw paths into changed/deleted sets by statting each
/// one against the cache, recursing into directories to diff their entry
/// lists.
async fn resolve_changes(shared: &Shared, pending: HashSet<PathBuf>, try_count: u32) -> (HashSet<PathBuf>, HashSet<PathBuf>) {
	let mut changed = HashSet::new();
	let mut deleted = HashSet::new();
	let mut queue: VecDeque<PathBuf> = pending.into_iter().collect();

	while let Some(path) = queue.pop_front() {
		match loom_fs::stat_if_exists(&path, try_count).await {
			Ok(None) => mark_deleted_recursive(shared, &path, &mut deleted),
			Ok(Some(meta)) if meta.is_dir => {
				diff_dir(shared, &path, try_count, &mut deleted, &mut queue).await;
			}
			Ok(Some(meta)) => {
				let prior = shared.cache.lock().expect("watch cache lock poisoned").get(&path).cloned();
				let is_new_or_changed = match (&prior, meta.modified) {
					(Some(CacheEntry::File(old)), Some(new)) => *old != new,
					_ => true,
				};
				if is_new_or_changed {
					if let Some(modified) = meta.modified {
						shared.cache.lock().expect("watch cache lock poisoned").insert(path.clone(), CacheEntry::File(modified));
					}
					changed.insert(path);
				}
			}
			Err(err) => warn!(path = %path.display(), %err, "watch: stat failed, skipping"),
		}
	}

	(changed, deleted)
}

fn mark_deleted_recursive(shared: &Shared, path: &Path, deleted: &mut HashSet<PathBuf>) {
	let mut cache = shared.cache.lock().expect("watch cache lock poisoned");
	let descendants = cache.descendants_of(path);
	cache.remove(path);
	deleted.insert(path.to_path_buf());
	for descendant in descendants {
		cache.remove(&descendant);
		deleted.insert(descendant);
	}
}

async fn diff_dir(shared: &Shared, dir: &Path, try_count: u32, deleted: &mut HashSet<PathBuf>, queue: &mut VecDeque<PathBuf>) {
	let entries = match loom_fs::read_dir(dir, try_count).await {
		Ok(entries) => entries,
		Err(err) => {
			warn!(path = %dir.display(), %err, "watch: read_dir failed during diff");
			return;
		}
	};
	let fresh: Vec<PathBuf> = entries.into_iter().map(|entry| entry.path).filter(|path| !is_ignored(path)).collect();

	let prior = {
		let mut cache = shared.cache.lock().expect("watch cache lock poisoned");
		let prior = match cache.get(dir) {
			Some(CacheEntry::Dir(children)) => children.clone(),
			_ => Vec::new(),
		};
		cache.insert(dir.to_path_buf(), CacheEntry::Dir(fresh.clone()));
		prior
	};

	let prior_set: HashSet<&PathBuf> = prior.iter().collect();
	let fresh_set: HashSet<&PathBuf> = fresh.iter().collect();

	for removed in prior_set.difference(&fresh_set) {
		mark_deleted_recursive(shared, removed, deleted);
	}
	for added in fresh_set.difference(&prior_set) {
		queue.push_back((*added).clone());
	}
}

/// Marks any file whose declared deps contain a changed or deleted path as
/// changed too, transitively.
fn propagate_dependents(shared: &Shared, changed: &mut HashSet<PathBuf>, deleted: &HashSet<PathBuf>) {
	let deps = shared.deps.lock().expect("watch deps lock poisoned");
	let mut frontier: Vec<PathBuf> = changed.iter().chain(deleted.iter()).cloned().collect();
	let mut seen: HashSet<PathBuf> = frontier.iter().cloned().collect();

	while let Some(path) = frontier.pop() {
		for (consumer, declared) in deps.iter() {
			if declared.contains(&path) && seen.insert(consumer.clone()) {
				changed.insert(consumer.clone());
				frontier.push(consumer.clone());
			}
		}
	}
}

async fn rebuild_roots(shared: &Shared, try_count: u32, changed: &HashSet<PathBuf>, deleted: &HashSet<PathBuf>) {
	let bindings: Vec<(List, Matcher)> = {
		let roots = shared.roots.lock().expect("watch roots lock poisoned");
		roots.iter().map(|binding| (binding.list.clone(), binding.matcher.clone())).collect()
	};

	for (list, matcher) in bindings {
		let matched_changed: Vec<&PathBuf> = changed.iter().filter(|path| matcher.test(path)).collect();
		let matched_deleted: Vec<&PathBuf> = deleted.iter().filter(|path| matcher.test(path)).collect();
		if matched_changed.is_empty() && matched_deleted.is_empty() {
			continue;
		}

		debug!(list = list.name(), changed = matched_changed.len(), deleted = matched_deleted.len(), "watch: reseeding root list");

		for path in matched_changed {
			let Some(name) = loom_path::relative_to(&matcher.base, path) else { continue };
			let mut file = File::from_disk(path.clone(), matcher.base.clone(), name);
			file.load(try_count).await;
			list.add(file).await;
		}
		for path in matched_deleted {
			let Some(name) = loom_path::relative_to(&matcher.base, path) else { continue };
			let mut file = File::from_disk(path.clone(), matcher.base.clone(), name);
			file.mark_deleted();
			list.add(file).await;
		}

		list.end_upstream().await;
	}
}

/// Wraps another [`Observer`], additionally recording file-save dependency
/// edges and run counters from the same hooks the inner observer sees.
struct TrackingObserver {
	inner: Arc<dyn Observer>,
	shared: Arc<Shared>,
}

impl Observer for TrackingObserver {
	fn add_list(&self, list: &List) {
		self.inner.add_list(list);
	}

	fn add_file(&self, file: &File) {
		self.shared.counters.record_file();
		self.inner.add_file(file);
	}

	fn add_dir(&self, dir: &Path) {
		self.inner.add_dir(dir);
	}

	fn file_save(&self, file: &File, outcome: SaveOutcome) {
		self.track_deps(file);
		self.inner.file_save(file, outcome);
	}

	fn file_delete(&self, file: &File) {
		self.inner.file_delete(file);
	}

	fn file_log(&self, file: &File, diagnostic: &Diagnostic) {
		self.shared.counters.record_diagnostic(diagnostic);
		self.inner.file_log(file, diagnostic);
	}

	fn file_dep(&self, file: &File, dep: &Path) {
		self.inner.file_dep(file, dep);
	}

	fn file_ref(&self, file: &File, reference: &Path) {
		self.inner.file_ref(file, reference);
	}

	fn file_validate(&self, file: &File) -> bool {
		self.inner.file_validate(file)
	}

	fn source_map_validate(&self, file: &File) -> bool {
		self.inner.source_map_validate(file)
	}
}

impl TrackingObserver {
	fn track_deps(&self, file: &File) {
		let Some(consumer) = file.path() else { return };
		let mut deps = self.shared.deps.lock().expect("watch deps lock poisoned");
		let entry = deps.entry(consumer).or_default();
		for dep in file.deps() {
			if entry.insert(dep.clone()) {
				self.shared.watch_requests.send(dep.clone()).ok();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, SystemTime};

	use loom_pipeline::{AddHook, Options, Pipeline, Processor};

	use super::*;

	fn test_shared(try_count: u32) -> (Arc<Shared>, mpsc::UnboundedReceiver<PathBuf>) {
		let (watch_tx, watch_rx) = mpsc::unbounded_channel();
		let shared = Arc::new(Shared {
			roots: StdMutex::new(Vec::new()),
			deps: StdMutex::new(HashMap::new()),
			cache: StdMutex::new(StateCache::new()),
			counters: Arc::new(Counters::new()),
			try_count,
			watch_requests: watch_tx,
		});
		(shared, watch_rx)
	}

	#[test]
	fn propagate_dependents_marks_reverse_dependents_changed() {
		let (shared, _rx) = test_shared(1);
		shared.deps.lock().unwrap().insert(PathBuf::from("/out/bundle.js"), HashSet::from([PathBuf::from("/src/util.js")]));

		let mut changed = HashSet::from([PathBuf::from("/src/util.js")]);
		let deleted = HashSet::new();
		propagate_dependents(&shared, &mut changed, &deleted);

		assert!(changed.contains(&PathBuf::from("/out/bundle.js")));
	}

	#[test]
	fn propagate_dependents_is_transitive() {
		let (shared, _rx) = test_shared(1);
		{
			let mut deps = shared.deps.lock().unwrap();
			deps.insert(PathBuf::from("/out/b.js"), HashSet::from([PathBuf::from("/src/a.js")]));
			deps.insert(PathBuf::from("/out/c.js"), HashSet::from([PathBuf::from("/out/b.js")]));
		}

		let mut changed = HashSet::from([PathBuf::from("/src/a.js")]);
		propagate_dependents(&shared, &mut changed, &HashSet::new());

		assert!(changed.contains(&PathBuf::from("/out/b.js")));
		assert!(changed.contains(&PathBuf::from("/out/c.js")));
	}

	#[tokio::test]
	async fn resolve_changes_detects_new_and_modified_files() {
		let tmp = tempfile::tempdir().unwrap();
		let a = tmp.path().join("a.txt");
		std::fs::write(&a, b"one").unwrap();
		let b = tmp.path().join("b.txt");
		std::fs::write(&b, b"two").unwrap();

		let (shared, _rx) = test_shared(1);
		let stale = std::fs::metadata(&a).unwrap().modified().unwrap() - Duration::from_secs(10);
		shared.cache.lock().unwrap().insert(a.clone(), CacheEntry::File(stale));

		let pending = HashSet::from([a.clone(), b.clone()]);
		let (changed, deleted) = resolve_changes(&shared, pending, 1).await;

		assert!(changed.contains(&a));
		assert!(changed.contains(&b));
		assert!(deleted.is_empty());
	}

	#[tokio::test]
	async fn resolve_changes_detects_a_deletion() {
		let tmp = tempfile::tempdir().unwrap();
		let gone = tmp.path().join("gone.txt");

		let (shared, _rx) = test_shared(1);
		shared.cache.lock().unwrap().insert(gone.clone(), CacheEntry::File(SystemTime::now()));

		let pending = HashSet::from([gone.clone()]);
		let (changed, deleted) = resolve_changes(&shared, pending, 1).await;

		assert!(changed.is_empty());
		assert!(deleted.contains(&gone));
	}

	#[tokio::test]
	async fn resolve_changes_diffs_a_directory_recursively() {
		let tmp = tempfile::tempdir().unwrap();
		let sub = tmp.path().join("sub");
		std::fs::create_dir(&sub).unwrap();
		let kept = sub.join("kept.txt");
		std::fs::write(&kept, b"kept").unwrap();
		let removed = sub.join("removed.txt");

		let (shared, _rx) = test_shared(1);
		shared.cache.lock().unwrap().insert(sub.clone(), CacheEntry::Dir(vec![kept.clone(), removed.clone()]));

		let pending = HashSet::from([sub.clone()]);
		let (changed, deleted) = resolve_changes(&shared, pending, 1).await;

		assert!(changed.contains(&kept));
		assert!(deleted.contains(&removed));
	}

	#[tokio::test]
	async fn watcher_reseeds_root_list_on_file_change() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("a.txt"), b"one").unwrap();

		let pipeline = Pipeline::with_default_observer(tmp.path());
		let root = pipeline.src(vec!["*.txt"], Options::default());

		let seen: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
		let seen_for_hook = Arc::clone(&seen);
		let processor = Processor {
			add: Some(AddHook::Sync(Arc::new(move |file: File, _options: &Options| {
				seen_for_hook.lock().unwrap().push(file.name().unwrap_or_default().to_owned());
				(file, true)
			}))),
			..Processor::passthrough()
		};
		root.pipe(processor, Options::default()).await;

		pipeline.queue().idle().await;
		assert_eq!(*seen.lock().unwrap(), vec!["a.txt".to_owned()]);
		seen.lock().unwrap().clear();

		let watcher = Watcher::new(WatchBackend::Native, Arc::clone(pipeline.queue()), Arc::new(Counters::new()), 3).unwrap();
		watcher.add_root(root).unwrap();

		tokio::time::sleep(Duration::from_millis(50)).await;
		std::fs::write(tmp.path().join("b.txt"), b"two").unwrap();
		tokio::time::sleep(Duration::from_millis(500)).await;
		watcher.queue().idle().await;

		assert_eq!(*seen.lock().unwrap(), vec!["b.txt".to_owned()]);
	}
}
