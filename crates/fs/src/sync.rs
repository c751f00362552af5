//! Blocking counterparts to the async facade, for callers running outside
//! a Tokio context (e.g. a synchronous processor hook).

use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use crate::error::{self, Error};
use crate::facade::Metadata;

const BACKOFF_BASE: Duration = Duration::from_millis(50);

fn retry<T>(try_count: u32, mut op: impl FnMut() -> io::Result<T>, path: &Path) -> Result<T, Error> {
	let mut attempt = 0;
	loop {
		match op() {
			Ok(value) => return Ok(value),
			Err(e) => {
				let err = error::wrap(path, e);
				if err.is_transient() && attempt + 1 < try_count {
					attempt += 1;
					sleep(BACKOFF_BASE * attempt);
				} else {
					return Err(err);
				}
			}
		}
	}
}

/// Blocking `stat`.
pub fn stat(path: &Path, try_count: u32) -> Result<Metadata, Error> {
	retry(try_count, || std::fs::metadata(path).map(Metadata::from), path)
}

/// Blocking file read.
pub fn read_file(path: &Path, try_count: u32) -> Result<Vec<u8>, Error> {
	retry(try_count, || std::fs::read(path), path)
}

/// Blocking file write, creating the parent directory on `ENOENT`.
pub fn write_file(path: &Path, contents: &[u8], try_count: u32) -> Result<(), Error> {
	retry(
		try_count,
		|| match std::fs::write(path, contents) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				if let Some(parent) = path.parent() {
					std::fs::create_dir_all(parent)?;
				}
				std::fs::write(path, contents)
			}
			Err(e) => Err(e),
		},
		path,
	)
}

/// Blocking delete; `ENOENT` is treated as success.
pub fn delete_file(path: &Path, try_count: u32) -> Result<(), Error> {
	match retry(try_count, || std::fs::remove_file(path), path) {
		Err(err) if err.is_not_found() => Ok(()),
		other => other,
	}
}
