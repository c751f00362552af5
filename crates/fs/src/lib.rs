//! Filesystem facade: stat/read/write/walk/copy/move/delete in sync and
//! async forms, with retry and a process-wide open-file backpressure queue.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

mod backpressure;
mod dedupe;
mod error;
mod facade;
mod retry;
pub mod sync;
mod walk;

#[doc(inline)]
pub use error::Error;
#[doc(inline)]
pub use facade::{
	append_file, copy_file, create_dir, delete_dir, delete_dir_if_empty, delete_file, move_file, prune_empty_parents, read_dir, read_file,
	stat, stat_if_exists, write_file, Entry, EntryKind, Metadata,
};
#[doc(inline)]
pub use walk::{walk, WalkCache, WalkVisitor};
