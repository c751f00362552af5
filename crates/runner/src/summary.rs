//! The aggregated report a [`crate::Runner`] emits once its queue drains.

use std::time::Duration;

/// The headline status of a completed (or, for watch/server, started) run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
	/// A build run with no file-level errors.
	BuildSuccess,
	/// A build run where at least one file logged an error.
	BuildCompletedWithErrors,
	/// A clean run finished.
	CleanCompleted,
	/// A preview run finished without touching disk.
	PreviewCompleted,
	/// A task ran with no declared build mode.
	Done,
	/// The initial build settled and the watcher is now resident.
	StartWatching,
	/// The initial build settled and the in-memory sink is serving; `Some`
	/// carries the address the (external) HTTP layer reported back.
	ServerRunning(Option<String>),
}

impl std::fmt::Display for Status {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::BuildSuccess => write!(f, "Build success"),
			Self::BuildCompletedWithErrors => write!(f, "Build completed (with errors)"),
			Self::CleanCompleted => write!(f, "Clean completed"),
			Self::PreviewCompleted => write!(f, "Preview completed"),
			Self::Done => write!(f, "Done"),
			Self::StartWatching => write!(f, "Start watching"),
			Self::ServerRunning(Some(url)) => write!(f, "Server running at {url}"),
			Self::ServerRunning(None) => write!(f, "Server running"),
		}
	}
}

/// Error/warning/file counts, elapsed time, and headline status for one
/// queue drain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
	/// The headline status.
	pub status: Status,
	/// File-level errors logged during this run.
	pub errors: u64,
	/// File-level warnings logged during this run.
	pub warnings: u64,
	/// Files admitted during this run.
	pub files: u64,
	/// Wall-clock time from task invocation to queue drain.
	pub elapsed: Duration,
}

impl std::fmt::Display for Summary {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({} files, {} errors, {} warnings, {:?})", self.status, self.files, self.errors, self.warnings, self.elapsed)
	}
}
