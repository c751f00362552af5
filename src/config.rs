//! Configuration for a [`crate::Config::runner`]-constructed run.
//!
//! Almost every field is a [`Changeable`], so it can be changed from a
//! `&self` method while a run is live. The builder methods also set the
//! config's change signal; if you poke a field directly, call
//! [`Config::signal_change`] yourself.

use std::{
	io,
	path::{Path, PathBuf},
	pin::{pin, Pin},
	sync::Arc,
};

use futures::{
	task::{Context, Poll},
	Future, Stream,
};
use tokio::sync::Notify;
use tracing::{debug, warn};

use loom_file::{BuildMode, Encoding};
use loom_path::Pattern;
use loom_pipeline::{Computed, Observer, Options};
use loom_runner::{Runner, ServerHook, Task};
use loom_watch::WatchBackend;

use crate::changeable::{Changeable, ChangeableFn};
use crate::error::CriticalError;
use crate::reporting::{ConsoleObserver, ReportingOptions};
use crate::RuntimeError;

/// Configuration for a run of the engine.
///
/// Fields are public for advanced use, but changes should generally go
/// through the methods provided: each calls `debug!` on the new value and
/// signals the change, so an embedder gets a quick log of what was set and
/// (if it's subscribed via [`Config::watch`]) a chance to react.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Config {
	/// Notified whenever a builder method below replaces a value.
	pub(crate) change_signal: Arc<Notify>,

	/// Working directory patterns passed to [`loom_pipeline::Pipeline::src`]
	/// are resolved against.
	pub cwd: Changeable<PathBuf>,
	/// The active build mode. `None` runs a task ad hoc, with no watcher or
	/// server sink installed.
	pub build_mode: Changeable<Option<BuildMode>>,
	/// Which `notify` backend the watcher uses, in watch mode.
	pub watch_backend: Changeable<WatchBackend>,
	/// Retry budget for transient filesystem errors.
	pub try_count: Changeable<u32>,

	/// Default text encoding, or a per-file function.
	pub encoding: Changeable<Computed<Encoding>>,
	/// Whether a `.dest` stage may write back onto a file's own source path.
	pub overwrite: Changeable<bool>,
	/// Extra include globs contributed to every root list's matcher.
	pub filter: Changeable<Vec<String>>,
	/// Extra exclude globs contributed to every root list's matcher. A
	/// leading `!` is optional; it's added if missing.
	pub ignore: Changeable<Vec<String>>,
	/// A file of newline-separated ignore globs (`#`-prefixed lines and
	/// blank lines skipped), read once per [`Config::patterns`] call.
	pub ignore_file: Changeable<Option<PathBuf>>,

	/// Enable source map generation, as a constant or per-file predicate.
	pub source_map: Changeable<Computed<bool>>,
	/// Inline the map as a data URI rather than writing a sidecar file.
	pub source_map_inline: Changeable<Computed<bool>>,
	/// Append the `sourceMappingURL` comment after writing.
	pub source_map_emit: Changeable<Computed<bool>>,
	/// Value of the emitted map's `sourceRoot` field.
	pub source_map_root: Changeable<Option<String>>,
	/// Include each source's content inline in the map.
	pub source_map_include_sources_content: Changeable<bool>,
	/// Include a top-level `file` field in the map.
	pub source_map_include_file: Changeable<bool>,
	/// Include the `names` table in the map.
	pub source_map_include_names: Changeable<bool>,

	/// Observer-side reporting knobs (progress/report/log level/silent/
	/// colors/full path).
	pub reporting: Changeable<ReportingOptions>,
	/// The file-graph observer a constructed [`Runner`] is wired with.
	/// Defaults to a [`ConsoleObserver`] reading [`Self::reporting`].
	pub observer: Changeable<Arc<dyn Observer>>,
	/// Called with every [`RuntimeError`] the engine surfaces. The default
	/// is a no-op; most embedders will want to log or collect these.
	pub error_handler: ChangeableFn<RuntimeError, ()>,
}

impl Default for Config {
	fn default() -> Self {
		let reporting = Changeable::new(ReportingOptions::default());
		let observer: Arc<dyn Observer> = Arc::new(ConsoleObserver::new(reporting.clone()));

		Self {
			change_signal: Arc::new(Notify::new()),
			cwd: Changeable::new(PathBuf::from(".")),
			build_mode: Changeable::default(),
			watch_backend: Changeable::default(),
			try_count: Changeable::new(3),
			encoding: Changeable::new(Computed::Const(Encoding::Utf8)),
			overwrite: Changeable::new(false),
			filter: Changeable::default(),
			ignore: Changeable::default(),
			ignore_file: Changeable::default(),
			source_map: Changeable::new(Computed::Const(false)),
			source_map_inline: Changeable::new(Computed::Const(false)),
			source_map_emit: Changeable::new(Computed::Const(false)),
			source_map_root: Changeable::default(),
			source_map_include_sources_content: Changeable::new(false),
			source_map_include_file: Changeable::new(true),
			source_map_include_names: Changeable::new(true),
			reporting,
			observer: Changeable::new(observer),
			error_handler: ChangeableFn::default(),
		}
	}
}

impl Config {
	/// Signal that the configuration has changed.
	///
	/// Called automatically by every other method here; exposed for direct
	/// field mutation via the public `Changeable`s.
	#[must_use]
	pub fn signal_change(&self) -> &Self {
		self.change_signal.notify_waiters();
		self
	}

	/// Watch the config for a change, but run once first.
	///
	/// Nothing in this crate subscribes to this automatically — a
	/// constructed [`Runner`] takes a snapshot of this config at
	/// construction time and does not react to later edits by itself. Wire
	/// this stream up yourself if a long-running watch/server session
	/// should pick up configuration edits.
	#[must_use]
	pub fn watch(&self) -> ConfigWatched {
		ConfigWatched::new(Arc::clone(&self.change_signal))
	}

	/// Set the working directory.
	pub fn cwd(&self, cwd: impl Into<PathBuf>) -> &Self {
		let cwd = cwd.into();
		debug!(?cwd, "config: cwd");
		self.cwd.replace(cwd);
		self.signal_change()
	}

	/// Set the build mode.
	pub fn build_mode(&self, mode: Option<BuildMode>) -> &Self {
		debug!(?mode, "config: build mode");
		self.build_mode.replace(mode);
		self.signal_change()
	}

	/// Set the watch backend.
	pub fn watch_backend(&self, backend: WatchBackend) -> &Self {
		debug!(?backend, "config: watch backend");
		self.watch_backend.replace(backend);
		self.signal_change()
	}

	/// Set the retry budget for transient filesystem errors.
	pub fn try_count(&self, count: u32) -> &Self {
		debug!(count, "config: try count");
		self.try_count.replace(count);
		self.signal_change()
	}

	/// Set the default text encoding, or a per-file function.
	pub fn encoding(&self, encoding: impl Into<Computed<Encoding>>) -> &Self {
		debug!("config: encoding");
		self.encoding.replace(encoding.into());
		self.signal_change()
	}

	/// Allow (or forbid) a `.dest` stage writing back onto a source path.
	pub fn overwrite(&self, allow: bool) -> &Self {
		debug!(allow, "config: overwrite");
		self.overwrite.replace(allow);
		self.signal_change()
	}

	/// Add extra include globs.
	pub fn filter<I, P>(&self, patterns: I) -> &Self
	where
		I: IntoIterator<Item = P>,
		P: Into<String>,
	{
		let patterns = patterns.into_iter().map(Into::into).collect::<Vec<_>>();
		debug!(?patterns, "config: filter");
		self.filter.replace(patterns);
		self.signal_change()
	}

	/// Add extra exclude globs.
	pub fn ignore<I, P>(&self, patterns: I) -> &Self
	where
		I: IntoIterator<Item = P>,
		P: Into<String>,
	{
		let patterns = patterns.into_iter().map(Into::into).collect::<Vec<_>>();
		debug!(?patterns, "config: ignore");
		self.ignore.replace(patterns);
		self.signal_change()
	}

	/// Set a file of newline-separated ignore globs.
	pub fn ignore_file(&self, path: impl Into<PathBuf>) -> &Self {
		let path = path.into();
		debug!(?path, "config: ignore file");
		self.ignore_file.replace(Some(path));
		self.signal_change()
	}

	/// Enable (or disable) source map generation.
	pub fn source_map(&self, value: impl Into<Computed<bool>>) -> &Self {
		debug!("config: source map");
		self.source_map.replace(value.into());
		self.signal_change()
	}

	/// Inline the map as a data URI rather than a sidecar file.
	pub fn source_map_inline(&self, value: impl Into<Computed<bool>>) -> &Self {
		debug!("config: source map inline");
		self.source_map_inline.replace(value.into());
		self.signal_change()
	}

	/// Append the `sourceMappingURL` comment after writing.
	pub fn source_map_emit(&self, value: impl Into<Computed<bool>>) -> &Self {
		debug!("config: source map emit");
		self.source_map_emit.replace(value.into());
		self.signal_change()
	}

	/// Set the emitted map's `sourceRoot` field.
	pub fn source_map_root(&self, root: impl Into<String>) -> &Self {
		let root = root.into();
		debug!(root, "config: source map root");
		self.source_map_root.replace(Some(root));
		self.signal_change()
	}

	/// Toggle the map's `sourcesContent`, `file`, and `names` fields.
	pub fn source_map_fields(&self, sources_content: bool, file: bool, names: bool) -> &Self {
		debug!(sources_content, file, names, "config: source map fields");
		self.source_map_include_sources_content.replace(sources_content);
		self.source_map_include_file.replace(file);
		self.source_map_include_names.replace(names);
		self.signal_change()
	}

	/// Replace the reporting knobs.
	pub fn reporting(&self, options: ReportingOptions) -> &Self {
		debug!(?options, "config: reporting");
		self.reporting.replace(options);
		self.signal_change()
	}

	/// Replace the observer a constructed [`Runner`] is wired with.
	pub fn observer(&self, observer: Arc<dyn Observer>) -> &Self {
		debug!("config: observer");
		self.observer.replace(observer);
		self.signal_change()
	}

	/// Replace the runtime error handler.
	pub fn on_error(&self, handler: impl Fn(RuntimeError) + Send + Sync + 'static) -> &Self {
		debug!("config: error handler");
		self.error_handler.replace(handler);
		self.signal_change()
	}

	/// Build the pattern list for a `src()` call: the task's own patterns,
	/// plus [`Self::filter`] as extra includes, plus [`Self::ignore`] and
	/// [`Self::ignore_file`]'s lines as extra excludes.
	#[must_use]
	pub fn patterns<I, P>(&self, task_patterns: I) -> Vec<Pattern>
	where
		I: IntoIterator<Item = P>,
		P: Into<String>,
	{
		let mut out: Vec<Pattern> = task_patterns.into_iter().map(|p| Pattern::Glob(p.into())).collect();
		out.extend(self.filter.get().into_iter().map(Pattern::Glob));
		out.extend(self.ignore.get().into_iter().map(|p| Pattern::Glob(as_exclude(p))));

		if let Some(path) = self.ignore_file.get() {
			match read_ignore_file(&path) {
				Ok(lines) => out.extend(lines.into_iter().map(|p| Pattern::Glob(as_exclude(p)))),
				Err(err) => warn!(path = %path.display(), %err, "config: could not read ignore file"),
			}
		}

		out
	}

	/// Build the per-list [`Options`] a task should pass to `src`/`pipe`/
	/// `dest` calls, reflecting the current configuration.
	#[must_use]
	pub fn options(&self) -> Options {
		let mode = self.build_mode.get();
		let mut options = mode.map_or_else(Options::default, Options::for_mode);
		options.overwrite = self.overwrite.get();
		options.try_count = self.try_count.get();
		options.encoding = self.encoding.get();
		options.source_map_emit = self.source_map_emit.get();
		options.source_map_inline = self.source_map_inline.get();
		options
	}

	/// Construct a [`Runner`] for `task`, wiring it with this config's
	/// working directory, build mode, watch backend, retry budget, and
	/// observer.
	///
	/// # Errors
	/// Returns [`CriticalError::Watch`] if watch mode is active and the
	/// watch backend could not be started.
	pub fn runner(&self, task: Task, name: impl Into<String>, server_hook: Option<ServerHook>) -> Result<Arc<Runner>, CriticalError> {
		let mode = self.build_mode.get();
		let cwd = self.cwd.get();
		let observer = self.observer.get();
		let watch_backend = self.watch_backend.get();
		let try_count = self.try_count.get();

		Runner::new(task, name, mode, cwd, observer, watch_backend, try_count, server_hook).map_err(CriticalError::from)
	}
}

fn as_exclude(pattern: String) -> String {
	if pattern.starts_with('!') {
		pattern
	} else {
		format!("!{pattern}")
	}
}

fn read_ignore_file(path: &Path) -> io::Result<Vec<String>> {
	let content = std::fs::read_to_string(path)?;
	Ok(content.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with('#')).map(str::to_owned).collect())
}

/// The [`Stream`] returned by [`Config::watch`]: yields immediately once,
/// then again every time the config changes.
pub struct ConfigWatched {
	first_run: bool,
	notify: Arc<Notify>,
}

impl ConfigWatched {
	fn new(notify: Arc<Notify>) -> Self {
		Self { first_run: true, notify }
	}
}

impl Stream for ConfigWatched {
	type Item = ();

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		if self.first_run {
			self.first_run = false;
			return Poll::Ready(Some(()));
		}

		// Config changes made between a Notified resolving and a new one
		// being issued are missed; same caveat as the upstream pattern this
		// is ported from.
		let notified = self.notify.notified();
		match Pin::new(&mut pin!(notified)).poll(cx) {
			Poll::Pending => Poll::Pending,
			Poll::Ready(()) => Poll::Ready(Some(())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn patterns_turns_ignore_into_excludes() {
		let config = Config::default();
		config.ignore(["*.log"]);
		let patterns = config.patterns(["**/*.rs"]);
		let globs: Vec<String> = patterns
			.into_iter()
			.map(|p| match p {
				Pattern::Glob(g) => g,
				_ => unreachable!(),
			})
			.collect();
		assert_eq!(globs, vec!["**/*.rs".to_owned(), "!*.log".to_owned()]);
	}

	#[test]
	fn ignore_file_lines_become_excludes() {
		let tmp = tempfile::tempdir().unwrap();
		let ignore_path = tmp.path().join(".loomignore");
		std::fs::write(&ignore_path, "# comment\n\nnode_modules/**\n!keep.txt\n").unwrap();

		let config = Config::default();
		config.ignore_file(&ignore_path);
		let patterns = config.patterns(["**/*.rs"]);

		let globs: Vec<String> = patterns
			.into_iter()
			.map(|p| match p {
				Pattern::Glob(g) => g,
				_ => unreachable!(),
			})
			.collect();
		assert_eq!(globs, vec!["**/*.rs".to_owned(), "!node_modules/**".to_owned(), "!keep.txt".to_owned()]);
	}

	#[test]
	fn options_reflects_current_values() {
		let config = Config::default();
		config.overwrite(true);
		config.try_count(5);
		config.build_mode(Some(BuildMode::Build));

		let options = config.options();
		assert!(options.overwrite);
		assert_eq!(options.try_count, 5);
		assert_eq!(options.mode, Some(BuildMode::Build));
	}

	#[tokio::test]
	async fn watch_yields_immediately_on_first_poll() {
		use futures::StreamExt;

		let config = Config::default();
		let mut stream = pin!(config.watch());
		assert_eq!(stream.next().await, Some(()));
	}
}
