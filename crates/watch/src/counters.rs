//! Aggregated run counters, reset at the start of every build and every
//! watcher-triggered rebuild, and read back by the task runner's summary.

use std::sync::atomic::{AtomicU64, Ordering};

use loom_file::{Diagnostic, Severity};

/// Error/warning/file/task totals for the active run.
#[derive(Debug, Default)]
pub struct Counters {
	errors: AtomicU64,
	warnings: AtomicU64,
	files: AtomicU64,
	tasks: AtomicU64,
}

impl Counters {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_file(&self) {
		self.files.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_task(&self) {
		self.tasks.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_diagnostic(&self, diagnostic: &Diagnostic) {
		match diagnostic.severity {
			Severity::Error => {
				self.errors.fetch_add(1, Ordering::Relaxed);
			}
			Severity::Warning => {
				self.warnings.fetch_add(1, Ordering::Relaxed);
			}
			Severity::Verbose | Severity::Log => {}
		}
	}

	#[must_use]
	pub fn errors(&self) -> u64 {
		self.errors.load(Ordering::Relaxed)
	}

	#[must_use]
	pub fn warnings(&self) -> u64 {
		self.warnings.load(Ordering::Relaxed)
	}

	#[must_use]
	pub fn files(&self) -> u64 {
		self.files.load(Ordering::Relaxed)
	}

	#[must_use]
	pub fn tasks(&self) -> u64 {
		self.tasks.load(Ordering::Relaxed)
	}

	/// Zero every counter, at the start of a fresh build or rebuild.
	pub fn reset(&self) {
		self.errors.store(0, Ordering::Relaxed);
		self.warnings.store(0, Ordering::Relaxed);
		self.files.store(0, Ordering::Relaxed);
		self.tasks.store(0, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;

	#[test]
	fn diagnostics_classify_into_the_right_bucket() {
		let counters = Counters::new();
		counters.record_diagnostic(&Diagnostic::new(Severity::Error, "boom", PathBuf::from("a.txt")));
		counters.record_diagnostic(&Diagnostic::new(Severity::Warning, "hmm", PathBuf::from("a.txt")));
		counters.record_diagnostic(&Diagnostic::new(Severity::Verbose, "fyi", PathBuf::from("a.txt")));

		assert_eq!(counters.errors(), 1);
		assert_eq!(counters.warnings(), 1);
	}

	#[test]
	fn reset_zeroes_everything() {
		let counters = Counters::new();
		counters.record_file();
		counters.record_task();
		counters.reset();
		assert_eq!(counters.files(), 0);
		assert_eq!(counters.tasks(), 0);
	}
}
