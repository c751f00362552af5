//! Observer-side reporting knobs (spec section 6's `progress`/`report`/
//! `logLevel`/`silent`/`colors`/`fullPath` row) and a default [`Observer`]
//! that forwards file-graph events to `tracing` at the configured level.

use loom_file::{Diagnostic, File, SaveOutcome, Severity};
use loom_pipeline::{List, Observer};
use std::path::Path;
use tracing::Level;

use crate::changeable::Changeable;

/// How verbose [`ConsoleObserver`] should be. Independent of `RUST_LOG`:
/// this gates which file-graph events get logged at all, `RUST_LOG` still
/// governs whether a given `tracing` subscriber prints them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
	/// Only errors.
	Error,
	/// Errors and warnings.
	Warn,
	/// Errors, warnings, and lifecycle events (file added, file saved).
	#[default]
	Info,
	/// Everything, including per-path matcher decisions.
	Debug,
}

impl LogLevel {
	const fn tracing_level(self) -> Level {
		match self {
			Self::Error => Level::ERROR,
			Self::Warn => Level::WARN,
			Self::Info => Level::INFO,
			Self::Debug => Level::DEBUG,
		}
	}
}

/// The reporting knobs from spec section 6, bundled so they can be
/// replaced atomically.
#[derive(Clone, Copy, Debug)]
pub struct ReportingOptions {
	/// Emit a progress indicator for long-running tasks. Interpreted by an
	/// external console/progress-bar sink; this crate only preserves the
	/// value.
	pub progress: bool,
	/// Emit the final per-run summary.
	pub report: bool,
	/// Verbosity of [`ConsoleObserver`]'s own logging.
	pub log_level: LogLevel,
	/// Suppress all reporting, including the final summary.
	pub silent: bool,
	/// Color the report. Interpreted by an external console sink.
	pub colors: bool,
	/// Report absolute paths rather than paths relative to the working
	/// directory. Interpreted by an external console sink.
	pub full_path: bool,
}

impl Default for ReportingOptions {
	fn default() -> Self {
		Self { progress: true, report: true, log_level: LogLevel::default(), silent: false, colors: true, full_path: false }
	}
}

/// An [`Observer`] that logs file-graph events through `tracing`, gated by
/// [`ReportingOptions`].
#[derive(Clone, Debug, Default)]
pub struct ConsoleObserver {
	options: Changeable<ReportingOptions>,
}

impl ConsoleObserver {
	/// A console observer reading its knobs from `options`, kept in sync
	/// with whatever a [`crate::Config`] does to it.
	#[must_use]
	pub fn new(options: Changeable<ReportingOptions>) -> Self {
		Self { options }
	}

	fn enabled(&self, at: LogLevel) -> Option<ReportingOptions> {
		let options = self.options.get();
		if options.silent || at > options.log_level {
			None
		} else {
			Some(options)
		}
	}
}

impl Observer for ConsoleObserver {
	fn add_list(&self, list: &List) {
		if self.enabled(LogLevel::Debug).is_some() {
			tracing::event!(Level::DEBUG, name = list.name(), "list added to chain");
		}
	}

	fn add_file(&self, file: &File) {
		if self.enabled(LogLevel::Info).is_some() {
			tracing::event!(Level::INFO, name = file.name().unwrap_or_default(), "file added");
		}
	}

	fn add_dir(&self, dir: &Path) {
		if self.enabled(LogLevel::Debug).is_some() {
			tracing::event!(Level::DEBUG, dir = %dir.display(), "directory walked");
		}
	}

	fn file_save(&self, file: &File, outcome: SaveOutcome) {
		if self.enabled(LogLevel::Info).is_some() {
			tracing::event!(Level::INFO, name = file.name().unwrap_or_default(), ?outcome, "file saved");
		}
	}

	fn file_delete(&self, file: &File) {
		if self.enabled(LogLevel::Info).is_some() {
			tracing::event!(Level::INFO, name = file.name().unwrap_or_default(), "file deleted");
		}
	}

	fn file_log(&self, file: &File, diagnostic: &Diagnostic) {
		let level = match diagnostic.severity {
			Severity::Error => LogLevel::Error,
			Severity::Warning => LogLevel::Warn,
			Severity::Log | Severity::Verbose => LogLevel::Info,
		};
		if self.enabled(level).is_some() {
			tracing::event!(Level::WARN, name = file.name().unwrap_or_default(), message = %diagnostic.message, "diagnostic");
		}
	}

	fn file_dep(&self, file: &File, dep: &Path) {
		if self.enabled(LogLevel::Debug).is_some() {
			tracing::event!(Level::DEBUG, name = file.name().unwrap_or_default(), dep = %dep.display(), "dependency edge added");
		}
	}

	fn file_ref(&self, file: &File, reference: &Path) {
		if self.enabled(LogLevel::Debug).is_some() {
			tracing::event!(Level::DEBUG, name = file.name().unwrap_or_default(), reference = %reference.display(), "reference edge added");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn silent_disables_every_level() {
		let observer = ConsoleObserver::new(Changeable::new(ReportingOptions { silent: true, ..ReportingOptions::default() }));
		assert!(observer.enabled(LogLevel::Error).is_none());
	}

	#[test]
	fn log_level_gates_more_verbose_events() {
		let observer = ConsoleObserver::new(Changeable::new(ReportingOptions { log_level: LogLevel::Warn, ..ReportingOptions::default() }));
		assert!(observer.enabled(LogLevel::Error).is_some());
		assert!(observer.enabled(LogLevel::Warn).is_some());
		assert!(observer.enabled(LogLevel::Info).is_none());
		assert!(observer.enabled(LogLevel::Debug).is_none());
	}
}
