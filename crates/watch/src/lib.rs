//! Native filesystem watching: debounces raw backend events, diffs them
//! against a state cache, propagates invalidation through declared
//! dependency edges, and re-seeds affected root lists so a pipeline's async
//! queue drains again.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

mod backend;
mod cache;
mod counters;
mod debounce;
mod ignore;
mod watcher;

#[doc(inline)]
pub use backend::WatchBackend;
#[doc(inline)]
pub use counters::Counters;
#[doc(inline)]
pub use watcher::Watcher;

/// Errors the watcher surfaces on construction or root registration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The backend (native or poll) could not be created.
	#[error("watch backend: {0}")]
	Backend(#[from] notify::Error),
	/// [`Watcher::add_root`] was called with a list that isn't bound to a
	/// matcher.
	#[error("cannot watch a list with no matcher; only root lists are watchable")]
	NotARoot,
}
