//! Per-list options and the const-or-computed knobs that resolve against a
//! [`loom_file::File`] at the point they're needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use loom_file::{BuildMode, Encoding, File};

/// A value that's either fixed or derived from the file it applies to.
#[derive(Clone)]
pub enum Computed<T> {
	/// The same value for every file.
	Const(T),
	/// Derived per file.
	Computed(Arc<dyn Fn(&File) -> T + Send + Sync>),
}

impl<T> Computed<T> {
	/// Wrap a closure that derives the value from the file it applies to.
	pub fn from_fn(f: impl Fn(&File) -> T + Send + Sync + 'static) -> Self {
		Self::Computed(Arc::new(f))
	}
}

impl<T: Clone> Computed<T> {
	/// Resolve against `file`.
	pub fn resolve(&self, file: &File) -> T {
		match self {
			Self::Const(v) => v.clone(),
			Self::Computed(f) => f(file),
		}
	}
}

impl<T: Clone> From<T> for Computed<T> {
	fn from(v: T) -> Self {
		Self::Const(v)
	}
}

/// Options threaded through a list's hooks and into any `save`/`load` calls
/// its sugar stages perform.
#[derive(Clone)]
pub struct Options {
	/// The active build mode, if the list is running under a task.
	pub mode: Option<BuildMode>,
	/// Destination directory for a `.dest(dir)` stage.
	pub dest: Option<PathBuf>,
	/// Whether a `.dest` stage may overwrite a file's own source path.
	pub overwrite: bool,
	/// Retry budget passed through to the filesystem facade.
	pub try_count: u32,
	/// Target encoding for files passing through a `.dest` stage.
	pub encoding: Computed<Encoding>,
	/// Whether to emit a source map alongside a `.dest` stage's output.
	pub source_map_emit: Computed<bool>,
	/// Whether an emitted source map is inlined as a data URI.
	pub source_map_inline: Computed<bool>,
	/// In [`BuildMode::Server`], redirects a `.dest` stage's writes here
	/// instead of the filesystem.
	pub server_sink: Option<Arc<dyn Fn(&Path, &[u8]) + Send + Sync>>,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			mode: None,
			dest: None,
			overwrite: false,
			try_count: 3,
			encoding: Computed::Const(Encoding::Utf8),
			source_map_emit: Computed::Const(false),
			source_map_inline: Computed::Const(false),
			server_sink: None,
		}
	}
}

impl Options {
	/// Default options for the given build mode.
	#[must_use]
	pub fn for_mode(mode: BuildMode) -> Self {
		Self { mode: Some(mode), ..Self::default() }
	}
}
