//! [`List`]: one stage of a file-processing chain.
//!
//! Lists are cheap `Arc`-backed handles; cloning one clones the handle, not
//! the stage (use [`List::fork`] to actually branch a chain in two).
//! Downstream-ness is an index-free linked chain: each list owns (behind a
//! lock) zero or more `next` handles it forwards admitted files to.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use loom_file::{BuildMode, File};
use loom_path::Matcher;
use loom_queue::{AsyncQueue, LockGuard};

use crate::config::Options;
use crate::observer::Observer;
use crate::processor::{AddHook, Processor};

struct ListState {
	processor: Processor,
	options: Options,
	next: Vec<List>,
	buffer: IndexMap<String, File>,
	started: bool,
	finished: bool,
	/// Held by a root list from creation until it ends, so downstream
	/// stages can't drain ahead of source discovery completing.
	root_lock: Option<LockGuard>,
}

/// One stage of a file-processing chain: an optional [`Processor`], a set of
/// downstream lists it forwards admitted files to, and (for root lists) the
/// [`Matcher`] it was created from.
#[derive(Clone)]
pub struct List {
	name: String,
	matcher: Option<Matcher>,
	pending: Arc<AtomicI64>,
	state: Arc<Mutex<ListState>>,
	observer: Arc<dyn Observer>,
}

impl List {
	pub(crate) fn new(name: impl Into<String>, processor: Processor, options: Options, observer: Arc<dyn Observer>) -> Self {
		Self::with_root_lock(name, None, processor, options, observer, None)
	}

	pub(crate) fn new_root(name: impl Into<String>, matcher: Matcher, options: Options, observer: Arc<dyn Observer>, queue: &Arc<AsyncQueue>) -> Self {
		Self::with_root_lock(name, Some(matcher), Processor::passthrough(), options, observer, Some(queue.lock()))
	}

	fn with_root_lock(name: impl Into<String>, matcher: Option<Matcher>, processor: Processor, options: Options, observer: Arc<dyn Observer>, root_lock: Option<LockGuard>) -> Self {
		Self {
			name: name.into(),
			matcher,
			pending: Arc::new(AtomicI64::new(1)),
			state: Arc::new(Mutex::new(ListState { processor, options, next: Vec::new(), buffer: IndexMap::new(), started: false, finished: false, root_lock })),
			observer,
		}
	}

	/// This list's diagnostic name.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The matcher this list was created from, if it's a root list.
	#[must_use]
	pub fn matcher(&self) -> Option<&Matcher> {
		self.matcher.as_ref()
	}

	async fn options_snapshot(&self) -> Options {
		self.state.lock().await.options.clone()
	}

	/// Append a new list downstream of this one, running `processor`'s hooks
	/// as files pass through.
	pub async fn pipe(&self, processor: Processor, options: Options) -> Self {
		let next = Self::new(format!("{}>{}", self.name, self.state.lock().await.next.len()), processor, options, Arc::clone(&self.observer));
		if let Some(init) = next.state.lock().await.processor.init.clone() {
			let opts = next.options_snapshot().await;
			init(&opts, &next);
		}
		self.state.lock().await.next.push(next.clone());
		self.observer.add_list(&next);
		next
	}

	/// Duplicate this list's downstream into two independent chains that
	/// both see every file admitted here.
	pub async fn fork(&self) -> (Self, Self) {
		let options = self.options_snapshot().await;
		let a = self.pipe(Processor::passthrough(), options.clone()).await;
		let b = self.pipe(Processor::passthrough(), options).await;
		(a, b)
	}

	/// A passthrough stage that forwards a file only when its destination
	/// path matches `matcher`.
	pub async fn src_filter(&self, matcher: Matcher) -> Self {
		let options = self.options_snapshot().await;
		let processor = Processor {
			add: Some(AddHook::Sync(Arc::new(move |file: File, _options: &Options| {
				let keep = matcher.test(&file.dest_path());
				(file, keep)
			}))),
			..Processor::passthrough()
		};
		self.pipe(processor, options).await
	}

	/// Save each admitted file under `dir`, continuing processing even if
	/// the write fails (the failure is logged against the file). A file
	/// re-admitted by a watcher rebuild as deleted is removed instead of
	/// saved. In [`BuildMode::Server`][loom_file::BuildMode::Server],
	/// `options.server_sink` redirects the write in-memory instead of
	/// touching disk.
	pub async fn dest(&self, dir: impl Into<PathBuf>) -> Self {
		let dir = dir.into();
		let mut options = self.options_snapshot().await;
		options.dest = Some(dir.clone());
		let observer = Arc::clone(&self.observer);

		let processor = Processor {
			add: Some(AddHook::Async(Arc::new(move |mut file: File, options: Options| {
				let dir = dir.clone();
				let observer = Arc::clone(&observer);
				async move {
					file.set_base(dir);
					if file.is_deleted() {
						let stop_at = file.base().to_path_buf();
						file.delete(&stop_at, true, options.try_count).await;
						observer.file_delete(&file);
						return (file, true);
					}
					let save_opts = loom_file::SaveOptions {
						mode: options.mode,
						overwrite: options.overwrite,
						try_count: options.try_count,
						source_map_emit: options.source_map_emit.resolve(&file),
						source_map_inline: options.source_map_inline.resolve(&file),
					};
					let sink = options.server_sink.as_deref();
					let outcome = file.save(&save_opts, sink).await;
					observer.file_save(&file, outcome);
					(file, true)
				}
				.boxed()
			}))),
			..Processor::passthrough()
		};
		self.pipe(processor, options).await
	}

	/// Delete each admitted file's on-disk counterpart, pruning now-empty
	/// parent directories up to the file's base directory.
	pub async fn delete(&self) -> Self {
		let options = self.options_snapshot().await;
		let observer = Arc::clone(&self.observer);

		let processor = Processor {
			add: Some(AddHook::Async(Arc::new(move |mut file: File, options: Options| {
				let observer = Arc::clone(&observer);
				async move {
					let stop_at = file.base().to_path_buf();
					file.delete(&stop_at, true, options.try_count).await;
					observer.file_delete(&file);
					(file, true)
				}
				.boxed()
			}))),
			..Processor::passthrough()
		};
		self.pipe(processor, options).await
	}

	/// End with a callback run once every upstream file has settled. `cb`
	/// is awaited, so a synchronous callback should just return a future
	/// that's immediately ready (e.g. via `Box::pin(async move { cb() })`).
	pub async fn then<F>(&self, cb: impl Fn() -> F + Send + Sync + 'static) -> Self
	where
		F: std::future::Future<Output = ()> + Send + 'static,
	{
		let options = self.options_snapshot().await;
		let cb = Arc::new(cb);
		let processor = Processor {
			end: Some(Arc::new(move |_files: Vec<File>, _options: Options, _list: Self| {
				let cb = Arc::clone(&cb);
				async move { cb().await }.boxed()
			})),
			..Processor::passthrough()
		};
		self.pipe(processor, options).await
	}

	/// Admit a file to this list: run `load` if requested, run `before` on
	/// first admission, run `add`, then (if kept) clone into the collect
	/// buffer and/or forward to every downstream list.
	pub async fn add(&self, mut file: File) {
		self.rearm_if_closed().await;
		self.pending.fetch_add(1, Ordering::SeqCst);

		if !self.observer.file_validate(&file) {
			self.complete_one().await;
			return;
		}
		self.observer.add_file(&file);

		let load = self.state.lock().await.processor.load;
		if load {
			let try_count = self.state.lock().await.options.try_count;
			file.load(try_count).await;
		}

		self.ensure_started().await;

		let options = self.options_snapshot().await;
		let processor = { self.state.lock().await.processor.clone() };
		let (file, keep) = processor.run_add(file, &options).await;

		if keep {
			if processor.collect {
				let key = file.src_path();
				let mut state = self.state.lock().await;
				if file.is_deleted() || state.options.mode == Some(BuildMode::Clean) {
					state.buffer.shift_remove(&key);
				} else {
					state.buffer.insert(key, file.snapshot());
				}
			}

			let nexts = { self.state.lock().await.next.clone() };
			if let Some((last, rest)) = nexts.split_last() {
				for next in rest {
					Box::pin(next.add(file.snapshot())).await;
				}
				Box::pin(last.add(file)).await;
			}
		}

		self.complete_one().await;
	}

	/// Signal that no more files will arrive from upstream. Once every
	/// in-flight `add` has also settled, this list finishes and, in turn,
	/// signals its own downstream lists.
	pub async fn end_upstream(&self) {
		self.rearm_if_closed().await;
		self.complete_one().await;
	}

	/// A closed list re-armed by a new upstream cycle (a watcher rebuild
	/// re-seeding a root) stands up the same pending-counter sentinel a
	/// fresh list starts with, so `finish` can fire again once this cycle's
	/// `add`/`end_upstream` calls settle.
	async fn rearm_if_closed(&self) {
		let was_closed = {
			let mut state = self.state.lock().await;
			if state.finished {
				state.finished = false;
				true
			} else {
				false
			}
		};
		if was_closed {
			self.pending.fetch_add(1, Ordering::SeqCst);
		}
	}

	async fn ensure_started(&self) {
		let before = {
			let mut state = self.state.lock().await;
			if state.started {
				None
			} else {
				state.started = true;
				state.processor.before.clone()
			}
		};
		if let Some(before) = before {
			let options = self.options_snapshot().await;
			before(&options, self);
		}
	}

	async fn complete_one(&self) {
		if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
			self.finish().await;
		}
	}

	async fn finish(&self) {
		let (after, end, buffer, options) = {
			let mut state = self.state.lock().await;
			if state.finished {
				return;
			}
			state.finished = true;
			// Cloned, not drained: a collecting stage keeps its accumulated
			// buffer across rebuild cycles, so a watcher re-seeding only the
			// changed files still hands `end` the full known set.
			let buffer = if state.processor.collect { Some(state.buffer.values().cloned().collect::<Vec<_>>()) } else { None };
			(state.processor.after.clone(), state.processor.end.clone(), buffer, state.options.clone())
		};

		if let Some(after) = after {
			after(&options, self);
		}
		if let Some(end) = end {
			end(buffer.unwrap_or_default(), options, self.clone()).await;
		}

		let (next, root_lock) = {
			let mut state = self.state.lock().await;
			(state.next.clone(), state.root_lock.take())
		};
		drop(root_lock);

		for next in next {
			Box::pin(next.end_upstream()).await;
		}
	}
}
