//! Async filesystem operations with retry and parent-directory creation.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::trace;

use crate::error::{self, Error};
use crate::retry::retry;

/// The kind of a directory entry, as returned by [`read_dir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
	/// A regular file.
	File,
	/// A directory.
	Dir,
	/// A symlink, socket, fifo, or other non-regular entry.
	Other,
}

/// One entry returned by [`read_dir`].
#[derive(Clone, Debug)]
pub struct Entry {
	/// The entry's full path.
	pub path: PathBuf,
	/// The entry's kind.
	pub kind: EntryKind,
}

/// The result of [`stat`].
#[derive(Clone, Debug)]
pub struct Metadata {
	/// Whether the path is a directory.
	pub is_dir: bool,
	/// Whether the path is a regular file.
	pub is_file: bool,
	/// Last-modified time, if the platform reports one.
	pub modified: Option<SystemTime>,
	/// Size in bytes.
	pub len: u64,
}

impl From<std::fs::Metadata> for Metadata {
	fn from(meta: std::fs::Metadata) -> Self {
		Self { is_dir: meta.is_dir(), is_file: meta.is_file(), modified: meta.modified().ok(), len: meta.len() }
	}
}

/// `stat` a path, retrying transient failures up to `try_count` times.
pub async fn stat(path: &Path, try_count: u32) -> Result<Metadata, Error> {
	retry(try_count, || async { tokio::fs::metadata(path).await.map(Metadata::from).map_err(|e| error::wrap(path, e)) }).await
}

/// Like [`stat`], but returns `Ok(None)` instead of erroring on a missing
/// path.
pub async fn stat_if_exists(path: &Path, try_count: u32) -> Result<Option<Metadata>, Error> {
	match stat(path, try_count).await {
		Ok(meta) => Ok(Some(meta)),
		Err(err) if err.is_not_found() => Ok(None),
		Err(err) => Err(err),
	}
}

/// List the immediate children of a directory.
pub async fn read_dir(path: &Path, try_count: u32) -> Result<Vec<Entry>, Error> {
	retry(try_count, || async {
		let mut entries = Vec::new();
		let mut reader = tokio::fs::read_dir(path).await.map_err(|e| error::wrap(path, e))?;
		while let Some(entry) = reader.next_entry().await.map_err(|e| error::wrap(path, e))? {
			let file_type = entry.file_type().await.map_err(|e| error::wrap(path, e))?;
			let kind = if file_type.is_dir() {
				EntryKind::Dir
			} else if file_type.is_file() {
				EntryKind::File
			} else {
				EntryKind::Other
			};
			entries.push(Entry { path: entry.path(), kind });
		}
		Ok(entries)
	})
	.await
}

/// Read a whole file into memory.
pub async fn read_file(path: &Path, try_count: u32) -> Result<Vec<u8>, Error> {
	retry(try_count, || async { tokio::fs::read(path).await.map_err(|e| error::wrap(path, e)) }).await
}

/// Write a file, creating its parent directory on `ENOENT` and retrying
/// once.
pub async fn write_file(path: &Path, contents: &[u8], try_count: u32) -> Result<(), Error> {
	write_with_parent_creation(path, try_count, || tokio::fs::write(path, contents)).await
}

/// Append to a file, creating it (and its parent directory) if absent.
pub async fn append_file(path: &Path, contents: &[u8], try_count: u32) -> Result<(), Error> {
	use tokio::io::AsyncWriteExt;
	write_with_parent_creation(path, try_count, || async {
		let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
		file.write_all(contents).await
	})
	.await
}

/// Copy a file, creating the destination's parent directory on `ENOENT`.
pub async fn copy_file(from: &Path, to: &Path, try_count: u32) -> Result<(), Error> {
	write_with_parent_creation(to, try_count, || async { tokio::fs::copy(from, to).await.map(|_| ()) }).await
}

/// Move (rename) a file.
pub async fn move_file(from: &Path, to: &Path, try_count: u32) -> Result<(), Error> {
	write_with_parent_creation(to, try_count, || tokio::fs::rename(from, to)).await
}

/// Delete a file. `ENOENT` is treated as success (already gone).
pub async fn delete_file(path: &Path, try_count: u32) -> Result<(), Error> {
	let result = retry(try_count, || async { tokio::fs::remove_file(path).await.map_err(|e| error::wrap(path, e)) }).await;
	match result {
		Err(err) if err.is_not_found() => Ok(()),
		other => other,
	}
}

/// Create a directory and any missing ancestors.
pub async fn create_dir(path: &Path, try_count: u32) -> Result<(), Error> {
	retry(try_count, || async { tokio::fs::create_dir_all(path).await.map_err(|e| error::wrap(path, e)) }).await
}

/// Delete a directory and everything under it. `ENOENT` is treated as
/// success.
pub async fn delete_dir(path: &Path, try_count: u32) -> Result<(), Error> {
	let result = retry(try_count, || async { tokio::fs::remove_dir_all(path).await.map_err(|e| error::wrap(path, e)) }).await;
	match result {
		Err(err) if err.is_not_found() => Ok(()),
		other => other,
	}
}

/// Delete a directory only if it is empty; used to prune empty parent
/// chains after a file delete. Non-empty and missing directories are
/// silently ignored.
pub async fn delete_dir_if_empty(path: &Path) -> Result<(), Error> {
	match tokio::fs::remove_dir(path).await {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
		Err(e) if e.raw_os_error() == Some(39) /* ENOTEMPTY */ => Ok(()),
		Err(e) => Err(error::wrap(path, e)),
	}
}

/// Walk upward from `path`'s parent, deleting each ancestor while it is
/// empty, stopping at `stop_at` (exclusive) or the first non-empty one.
pub async fn prune_empty_parents(path: &Path, stop_at: &Path) -> Result<(), Error> {
	let mut current = path.parent().map(Path::to_path_buf);
	while let Some(dir) = current {
		if !dir.starts_with(stop_at) || dir == stop_at {
			break;
		}
		trace!(dir = %dir.display(), "pruning empty parent");
		delete_dir_if_empty(&dir).await?;
		if tokio::fs::metadata(&dir).await.is_ok() {
			// still there, meaning it wasn't empty; stop climbing
			break;
		}
		current = dir.parent().map(Path::to_path_buf);
	}
	Ok(())
}

async fn write_with_parent_creation<F, Fut>(target: &Path, try_count: u32, op: F) -> Result<(), Error>
where
	F: Fn() -> Fut,
	Fut: std::future::Future<Output = io::Result<()>>,
{
	retry(try_count, || async {
		match op().await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				if let Some(parent) = target.parent() {
					tokio::fs::create_dir_all(parent).await.map_err(|e| error::wrap(parent, e))?;
				}
				op().await.map_err(|e| error::wrap(target, e))
			}
			Err(e) => Err(error::wrap(target, e)),
		}
	})
	.await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn write_creates_missing_parent() {
		let tmp = tempfile::tempdir().unwrap();
		let target = tmp.path().join("nested/dir/out.txt");
		write_file(&target, b"hi", 3).await.unwrap();
		assert_eq!(read_file(&target, 1).await.unwrap(), b"hi");
	}

	#[tokio::test]
	async fn delete_missing_file_is_ok() {
		let tmp = tempfile::tempdir().unwrap();
		let target = tmp.path().join("absent.txt");
		delete_file(&target, 1).await.unwrap();
	}

	#[tokio::test]
	async fn stat_if_exists_is_none_for_missing_path() {
		let tmp = tempfile::tempdir().unwrap();
		let missing = tmp.path().join("nope");
		assert!(stat_if_exists(&missing, 1).await.unwrap().is_none());
	}
}
