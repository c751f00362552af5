//! The two-tier error model: recoverable [`RuntimeError`]s are reported
//! through a [`Config`][crate::Config] error hook and don't stop the run;
//! [`CriticalError`]s are fatal.

use std::path::PathBuf;

/// A recoverable, per-file or per-operation error. Reported through the
/// configured error hook; processing of sibling files continues.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RuntimeError {
	/// A filesystem operation failed and wasn't an expected absence.
	#[error("filesystem: {0}")]
	#[diagnostic(code(loom::runtime::fs))]
	Fs(#[from] loom_fs::Error),

	/// A source map could not be parsed or composed.
	#[error("source map: {0}")]
	#[diagnostic(code(loom::runtime::source_map))]
	SourceMap(#[from] loom_sourcemap::Error),

	/// A `.dest` stage tried to write back onto a file's own source path
	/// with `overwrite` disabled.
	#[error("refusing to overwrite source file: {path}", path = path.display())]
	#[diagnostic(code(loom::runtime::overwrite_refused))]
	OverwriteRefused {
		/// The path the write was refused against.
		path: PathBuf,
	},

	/// A processor hook panicked or returned an error the engine caught at
	/// the boundary; captured against the current file rather than
	/// propagated.
	#[error("processor error on {path}: {message}", path = path.display())]
	#[diagnostic(code(loom::runtime::processor))]
	Processor {
		/// The file being processed when the error occurred.
		path: PathBuf,
		/// The captured message.
		message: String,
	},

	/// A batch-collected stage's `end` hook failed; downstream stages past
	/// that list are aborted.
	#[error("collector end hook failed: {0}")]
	#[diagnostic(code(loom::runtime::collector_end))]
	CollectorEnd(String),
}

/// A fatal, engine-level error. Stops the task runner; the process should
/// exit non-zero.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CriticalError {
	/// The watch backend could not be started.
	#[error("watch backend: {0}")]
	#[diagnostic(code(loom::critical::watch_backend))]
	Watch(#[from] loom_watch::Error),

	/// The runner was asked to run a second time.
	#[error("runner already started")]
	#[diagnostic(code(loom::critical::already_started))]
	AlreadyStarted,

	/// The named task doesn't exist in the loaded build script.
	///
	/// The build script loader itself is an external collaborator; this
	/// variant exists so an embedder that implements one has somewhere to
	/// report a lookup failure.
	#[error("no such task: {0}")]
	#[diagnostic(code(loom::critical::task_not_found))]
	TaskNotFound(String),

	/// The build script could not be loaded.
	///
	/// As with [`Self::TaskNotFound`], loading scripts is out of scope for
	/// this crate; this variant is the reporting seam for whatever does it.
	#[error("build script not loadable: {0}")]
	#[diagnostic(code(loom::critical::script_not_loadable))]
	ScriptNotLoadable(String),
}

impl From<loom_runner::Error> for CriticalError {
	fn from(err: loom_runner::Error) -> Self {
		match err {
			loom_runner::Error::Watch(err) => Self::Watch(err),
			loom_runner::Error::AlreadyStarted => Self::AlreadyStarted,
		}
	}
}
