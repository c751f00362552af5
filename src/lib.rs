//! Loom: a rule-driven build engine that transforms file trees through
//! user-declared pipelines.
//!
//! A build script (an external collaborator; this crate doesn't load one)
//! exposes named tasks. Each task uses [`loom_pipeline::Pipeline::src`] to
//! select files by glob pattern, [`loom_pipeline::List::pipe`] to push them
//! through a chain of processors, and [`loom_pipeline::List::dest`] to write
//! results back to disk. [`Config`] holds the options a task reads to build
//! its patterns and per-list [`loom_pipeline::Options`], and constructs the
//! [`loom_runner::Runner`] that dispatches the task across build, clean,
//! preview, watch, and server modes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use loom::Config;
//! use loom_file::BuildMode;
//! use loom_pipeline::{Options, Pipeline};
//!
//! # async fn build_site(pipeline: Arc<Pipeline>, options: Options) {
//! #     let root = pipeline.src(vec!["**/*.html"], options.clone());
//! #     root.dest(".", options).await;
//! # }
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let config = Config::default();
//!     config.cwd(".").build_mode(Some(BuildMode::Build));
//!
//!     let task = Arc::new(move |pipeline: Arc<Pipeline>, options: Options| {
//!         Box::pin(build_site(pipeline, options)) as futures::future::BoxFuture<'static, ()>
//!     });
//!
//!     let runner = config.runner(task, "build", None)?;
//!     let summary = runner.run()?.await.expect("runner task panicked");
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! Note that the engine itself never logs above `debug` by default: wire
//! [`Config::on_error`] if you want runtime errors surfaced to your own
//! reporting, and [`Config::reporting`] to adjust [`reporting::ConsoleObserver`]'s
//! verbosity.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

pub mod changeable;
pub mod config;
pub mod error;
pub mod reporting;

#[doc(no_inline)]
pub use crate::config::Config;
#[doc(inline)]
pub use crate::error::{CriticalError, RuntimeError};

#[doc(no_inline)]
pub use loom_file as file;
#[doc(no_inline)]
pub use loom_fs as fs;
#[doc(no_inline)]
pub use loom_path as path;
#[doc(no_inline)]
pub use loom_pipeline as pipeline;
#[doc(no_inline)]
pub use loom_queue as queue;
#[doc(no_inline)]
pub use loom_runner as runner;
#[doc(no_inline)]
pub use loom_sourcemap as sourcemap;
#[doc(no_inline)]
pub use loom_watch as watch;
#[doc(no_inline)]
pub use loom_writer as writer;
