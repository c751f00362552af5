//! The processor descriptor: optional lifecycle hooks attached to a list.
//!
//! The upstream shape let a single `add` field be either a short-arity
//! synchronous function or a long-arity one taking a `done` callback. Here
//! that's two explicit variants chosen at construction, rather than
//! dispatching on a closure's arity at runtime.

use std::sync::Arc;

use futures::future::BoxFuture;
use loom_file::File;

use crate::config::Options;
use crate::list::List;

/// A plain per-list lifecycle hook (`init`, `before`, `after`): no file, no
/// result, run for effect.
pub type LifecycleHook = Arc<dyn Fn(&Options, &List) + Send + Sync>;

/// A list's terminal hook, called once after every in-flight `add` (and any
/// collected buffer) is ready. Always asynchronous: a synchronous `end` is
/// just one that returns an already-ready future.
pub type EndHook = Arc<dyn Fn(Vec<File>, Options, List) -> BoxFuture<'static, ()> + Send + Sync>;

/// How a processor's `add` hook is invoked.
#[derive(Clone)]
pub enum AddHook {
	/// Runs to completion before the next file is considered.
	Sync(Arc<dyn Fn(File, &Options) -> (File, bool) + Send + Sync>),
	/// Runs concurrently with other in-flight adds.
	Async(Arc<dyn Fn(File, Options) -> BoxFuture<'static, (File, bool)> + Send + Sync>),
}

impl AddHook {
	async fn call(&self, file: File, options: &Options) -> (File, bool) {
		match self {
			Self::Sync(f) => f(file, options),
			Self::Async(f) => f(file, options.clone()).await,
		}
	}
}

/// Hooks and flags attached to a list, driving how files are transformed and
/// whether they're buffered for a batched `end`.
#[derive(Clone, Default)]
pub struct Processor {
	/// Force the file to load its source content before `add` runs.
	pub load: bool,
	/// Clone admitted files into a keyed buffer, handed to `end` as a batch.
	pub collect: bool,
	/// Runs once, when the list is constructed.
	pub init: Option<LifecycleHook>,
	/// Runs once, on the list's first `add`.
	pub before: Option<LifecycleHook>,
	/// Runs once per admitted file.
	pub add: Option<AddHook>,
	/// Runs once, after every in-flight `add` has settled.
	pub after: Option<LifecycleHook>,
	/// Runs once, after `after`, with the collected buffer if `collect`.
	pub end: Option<EndHook>,
}

impl Processor {
	/// A processor with no hooks: files pass through untouched.
	#[must_use]
	pub fn passthrough() -> Self {
		Self::default()
	}

	pub(crate) async fn run_add(&self, file: File, options: &Options) -> (File, bool) {
		match &self.add {
			Some(hook) => hook.call(file, options).await,
			None => (file, true),
		}
	}
}
