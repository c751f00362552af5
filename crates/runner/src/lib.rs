//! Dispatches a build-script task across its five execution modes and emits
//! one aggregated [`Summary`] once the async queue drains.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

mod runner;
mod sink;
mod summary;

#[doc(inline)]
pub use runner::{Runner, ServerHook, Task};
#[doc(inline)]
pub use sink::InMemorySink;
#[doc(inline)]
pub use summary::{Status, Summary};

/// Errors the runner surfaces on construction or a second [`Runner::run`].
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum Error {
	/// The watch backend could not be started.
	#[error("watch backend: {0}")]
	#[diagnostic(code(loom::runner::watch_backend))]
	Watch(#[from] loom_watch::Error),
	/// [`Runner::run`] was called twice.
	#[error("runner already started")]
	#[diagnostic(code(loom::runner::already_started))]
	AlreadyStarted,
}
