//! [`Runner`]: ties a build-script task to a [`Pipeline`], dispatching it
//! across build/clean/preview/watch/server modes and releasing a dormant
//! main task the same way `Watchexec::new`/`main` does.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use atomic_take::AtomicTake;
use futures::future::BoxFuture;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use loom_file::{BuildMode, Diagnostic, File};
use loom_pipeline::{List, Observer, Options, Pipeline};
use loom_queue::AsyncQueue;
use loom_watch::{Counters, WatchBackend, Watcher};

use crate::sink::InMemorySink;
use crate::summary::{Status, Summary};
use crate::Error;

/// A build-script task: given a pipeline handle and pre-populated options
/// (mode, try-count, and in server mode a sink), builds and runs a file
/// graph.
pub type Task = Arc<dyn Fn(Arc<Pipeline>, Options) -> BoxFuture<'static, ()> + Send + Sync>;

/// Called once in server mode with the in-memory sink, so the (external)
/// HTTP layer can start serving it; returns the address to report in the
/// summary, if known.
pub type ServerHook = Arc<dyn Fn(Arc<InMemorySink>) -> Option<String> + Send + Sync>;

/// Dispatches one task across its execution modes and emits an aggregated
/// [`Summary`] once its queue drains. `mode = None` runs the task ad hoc,
/// with no watcher or server sink installed.
pub struct Runner {
	handle: Arc<AtomicTake<JoinHandle<Summary>>>,
	start_lock: Arc<Notify>,
	shutdown: Arc<Notify>,
	pipeline: Arc<Pipeline>,
}

impl Runner {
	/// Wires a dormant main task for `task` under `mode`. Call [`Self::run`]
	/// to release it.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		task: Task,
		name: impl Into<String>,
		mode: Option<BuildMode>,
		cwd: impl Into<PathBuf>,
		observer: Arc<dyn Observer>,
		watch_backend: WatchBackend,
		try_count: u32,
		server_hook: Option<ServerHook>,
	) -> Result<Arc<Self>, Error> {
		let name = name.into();
		let counters = Arc::new(Counters::new());
		let queue = AsyncQueue::new();

		let watcher = if mode == Some(BuildMode::Watch) {
			Some(Watcher::new(watch_backend, Arc::clone(&queue), Arc::clone(&counters), try_count)?)
		} else {
			None
		};

		// A watcher's `tracking_observer` both counts files/diagnostics and
		// records dependency edges for invalidation; outside watch mode
		// there's no watcher to ask, so count directly.
		let observer: Arc<dyn Observer> = match &watcher {
			Some(watcher) => watcher.tracking_observer(observer),
			None => Arc::new(CountingObserver { inner: observer, counters: Arc::clone(&counters) }),
		};

		let pipeline = Arc::new(Pipeline::with_queue(cwd, observer, queue));

		let sink = if mode == Some(BuildMode::Server) { Some(InMemorySink::new()) } else { None };

		let start_lock = Arc::new(Notify::new());
		let shutdown = Arc::new(Notify::new());

		let notify = Arc::clone(&start_lock);
		let task_pipeline = Arc::clone(&pipeline);
		let task_shutdown = Arc::clone(&shutdown);
		let handle = tokio::spawn(async move {
			trace!("runner: waiting for start lock");
			notify.notified().await;
			debug!(task = %name, ?mode, "runner: starting");

			counters.record_task();
			let started = Instant::now();

			let mut options = mode.map_or_else(Options::default, Options::for_mode);
			options.try_count = try_count;
			if let Some(sink) = &sink {
				options.server_sink = Some(sink.as_hook());
			}

			match mode {
				Some(BuildMode::Watch | BuildMode::Server) => {
					task(Arc::clone(&task_pipeline), options).await;
					task_pipeline.queue().idle().await;
				}
				_ => {
					let job_task = Arc::clone(&task);
					let job_pipeline = Arc::clone(&task_pipeline);
					let job_options = options.clone();
					task_pipeline.queue().enqueue(async move { job_task(job_pipeline, job_options).await });
					task_pipeline.queue().idle().await;
				}
			}

			if let Some(watcher) = &watcher {
				for root in task_pipeline.roots() {
					if let Err(err) = watcher.add_root(root) {
						warn!(%err, "runner: could not register root with watcher");
					}
				}
			}

			let server_addr = if mode == Some(BuildMode::Server) {
				sink.as_ref().and_then(|sink| server_hook.as_ref().and_then(|hook| hook(Arc::clone(sink))))
			} else {
				None
			};

			let elapsed = started.elapsed();
			let status = match mode {
				None => Status::Done,
				Some(BuildMode::Build) => {
					if counters.errors() > 0 {
						Status::BuildCompletedWithErrors
					} else {
						Status::BuildSuccess
					}
				}
				Some(BuildMode::Clean) => Status::CleanCompleted,
				Some(BuildMode::Preview) => Status::PreviewCompleted,
				Some(BuildMode::Watch) => Status::StartWatching,
				Some(BuildMode::Server) => Status::ServerRunning(server_addr),
			};

			let summary = Summary { status, errors: counters.errors(), warnings: counters.warnings(), files: counters.files(), elapsed };
			debug!(%summary, "runner: queue drained");

			if matches!(mode, Some(BuildMode::Watch | BuildMode::Server)) {
				task_shutdown.notified().await;
				debug!("runner: shut down");
			}

			summary
		});

		Ok(Arc::new(Self { handle: Arc::new(AtomicTake::new(handle)), start_lock, shutdown, pipeline }))
	}

	/// Release the dormant main task and obtain its handle.
	///
	/// # Errors
	/// Returns [`Error::AlreadyStarted`] if called more than once.
	pub fn run(&self) -> Result<JoinHandle<Summary>, Error> {
		trace!("runner: releasing start lock");
		self.start_lock.notify_one();
		self.handle.take().ok_or(Error::AlreadyStarted)
	}

	/// Release a resident watch/server mode run, letting its main task
	/// return its summary.
	pub fn stop(&self) {
		self.shutdown.notify_one();
	}

	/// The pipeline this runner's task builds its file graph on.
	#[must_use]
	pub fn pipeline(&self) -> &Arc<Pipeline> {
		&self.pipeline
	}
}

/// Records file/diagnostic counts against [`Counters`] before forwarding to
/// another observer. [`Watcher::tracking_observer`] does this plus
/// dependency-edge tracking; outside watch mode there's no watcher to wrap
/// with, so this does the counting half on its own.
struct CountingObserver {
	inner: Arc<dyn Observer>,
	counters: Arc<Counters>,
}

impl Observer for CountingObserver {
	fn add_list(&self, list: &List) {
		self.inner.add_list(list);
	}

	fn add_file(&self, file: &File) {
		self.counters.record_file();
		self.inner.add_file(file);
	}

	fn add_dir(&self, dir: &std::path::Path) {
		self.inner.add_dir(dir);
	}

	fn file_save(&self, file: &File, outcome: loom_file::SaveOutcome) {
		self.inner.file_save(file, outcome);
	}

	fn file_delete(&self, file: &File) {
		self.inner.file_delete(file);
	}

	fn file_log(&self, file: &File, diagnostic: &Diagnostic) {
		self.counters.record_diagnostic(diagnostic);
		self.inner.file_log(file, diagnostic);
	}

	fn file_dep(&self, file: &File, dep: &std::path::Path) {
		self.inner.file_dep(file, dep);
	}

	fn file_ref(&self, file: &File, reference: &std::path::Path) {
		self.inner.file_ref(file, reference);
	}

	fn file_validate(&self, file: &File) -> bool {
		self.inner.file_validate(file)
	}

	fn source_map_validate(&self, file: &File) -> bool {
		self.inner.source_map_validate(file)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	use loom_pipeline::{AddHook, NoopObserver, Processor};

	use super::*;

	fn passthrough_task(seen: Arc<Mutex<Vec<String>>>) -> Task {
		Arc::new(move |pipeline: Arc<Pipeline>, options: Options| {
			let seen = Arc::clone(&seen);
			Box::pin(async move {
				let root = pipeline.src(vec!["*.txt"], options.clone());
				let seen_for_hook = Arc::clone(&seen);
				let processor = Processor {
					add: Some(AddHook::Sync(Arc::new(move |file: loom_file::File, _options: &Options| {
						seen_for_hook.lock().unwrap().push(file.name().unwrap_or_default().to_owned());
						(file, true)
					}))),
					..Processor::passthrough()
				};
				root.pipe(processor, options).await;
			})
		})
	}

	#[tokio::test]
	async fn build_mode_runs_once_and_reports_success() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();

		let seen = Arc::new(Mutex::new(Vec::new()));
		let task = passthrough_task(Arc::clone(&seen));

		let runner = Runner::new(task, "build", Some(BuildMode::Build), tmp.path(), Arc::new(NoopObserver), WatchBackend::Native, 3, None).unwrap();
		let summary = runner.run().unwrap().await.unwrap();

		assert_eq!(summary.status, Status::BuildSuccess);
		assert_eq!(summary.files, 1);
		assert_eq!(*seen.lock().unwrap(), vec!["a.txt".to_owned()]);
	}

	#[tokio::test]
	async fn ad_hoc_mode_reports_done() {
		let tmp = tempfile::tempdir().unwrap();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let task = passthrough_task(Arc::clone(&seen));

		let runner = Runner::new(task, "adhoc", None, tmp.path(), Arc::new(NoopObserver), WatchBackend::Native, 3, None).unwrap();
		let summary = runner.run().unwrap().await.unwrap();

		assert_eq!(summary.status, Status::Done);
	}

	#[tokio::test]
	async fn watch_mode_starts_resident_and_stops_on_request() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();

		let seen = Arc::new(Mutex::new(Vec::new()));
		let task = passthrough_task(Arc::clone(&seen));

		let runner = Runner::new(task, "watch", Some(BuildMode::Watch), tmp.path(), Arc::new(NoopObserver), WatchBackend::Native, 3, None).unwrap();
		let handle = runner.run().unwrap();

		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		assert!(!handle.is_finished());

		runner.stop();
		let summary = handle.await.unwrap();
		assert_eq!(summary.status, Status::StartWatching);
	}

	#[tokio::test]
	async fn server_mode_installs_sink_and_reports_hook_address() {
		let tmp = tempfile::tempdir().unwrap();
		std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();

		let seen = Arc::new(Mutex::new(Vec::new()));
		let task = passthrough_task(Arc::clone(&seen));

		let calls = Arc::new(AtomicUsize::new(0));
		let calls_for_hook = Arc::clone(&calls);
		let server_hook: ServerHook = Arc::new(move |_sink| {
			calls_for_hook.fetch_add(1, Ordering::SeqCst);
			Some("127.0.0.1:7331".to_owned())
		});

		let runner = Runner::new(task, "server", Some(BuildMode::Server), tmp.path(), Arc::new(NoopObserver), WatchBackend::Native, 3, Some(server_hook)).unwrap();
		let handle = runner.run().unwrap();

		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		runner.stop();
		let summary = handle.await.unwrap();
		assert_eq!(summary.status, Status::ServerRunning(Some("127.0.0.1:7331".to_owned())));
	}
}
