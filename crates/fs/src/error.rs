use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// An error from a filesystem operation, carrying the path it failed on.
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct Error {
	/// The path the operation was acting on.
	pub path: PathBuf,
	/// The underlying I/O error.
	#[source]
	pub source: io::Error,
}

impl Error {
	/// Wrap an [`io::Error`] with the path it occurred on.
	pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self { path: path.into(), source }
	}

	/// Whether this is an "expected absence" error: a stat/read against a
	/// path that may simply not exist.
	#[must_use]
	pub fn is_not_found(&self) -> bool {
		self.source.kind() == io::ErrorKind::NotFound
	}

	/// Whether this is a transient condition the caller should back off and
	/// retry: too many open files, process-wide or system-wide.
	#[must_use]
	pub fn is_transient(&self) -> bool {
		matches!(self.source.raw_os_error(), Some(code) if is_emfile_or_enfile(code))
	}
}

#[cfg(unix)]
fn is_emfile_or_enfile(code: i32) -> bool {
	code == libc_emfile() || code == libc_enfile()
}

#[cfg(unix)]
const fn libc_emfile() -> i32 {
	24 // EMFILE on Linux and most Unixes
}

#[cfg(unix)]
const fn libc_enfile() -> i32 {
	23 // ENFILE on Linux and most Unixes
}

#[cfg(not(unix))]
fn is_emfile_or_enfile(_code: i32) -> bool {
	false
}

pub(crate) fn wrap(path: &Path, source: io::Error) -> Error {
	Error::new(path.to_path_buf(), source)
}
