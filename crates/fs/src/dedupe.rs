//! Coalesces concurrent stat/readDir calls that race on the same path: the
//! first caller issues the real operation, later callers on the same path
//! while it's in flight just await its result.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::Error;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, Arc<Error>>>>;

/// A cache of in-flight operations keyed by path, used to dedupe racing
/// calls to the same stat/readDir.
pub struct DedupeCache<T: Clone + Send + 'static> {
	inflight: Mutex<HashMap<PathBuf, SharedResult<T>>>,
}

impl<T: Clone + Send + 'static> Default for DedupeCache<T> {
	fn default() -> Self {
		Self { inflight: Mutex::new(HashMap::new()) }
	}
}

impl<T: Clone + Send + 'static> DedupeCache<T> {
	/// Create an empty cache.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Run `op` for `path`, or await an identical in-flight call if one is
	/// already running.
	pub async fn call<F>(&self, path: &Path, op: F) -> Result<T, Error>
	where
		F: Future<Output = Result<T, Error>> + Send + 'static,
	{
		let shared = {
			let mut inflight = self.inflight.lock().expect("dedupe cache lock poisoned");
			if let Some(existing) = inflight.get(path) {
				existing.clone()
			} else {
				let shared: SharedResult<T> = op.map(|r| r.map_err(Arc::new)).boxed().shared();
				inflight.insert(path.to_path_buf(), shared.clone());
				shared
			}
		};

		let result = shared.await;

		// Only the caller that sees the entry still pointing at this exact
		// shared future removes it; a newer call for the same path may have
		// already replaced it.
		{
			let mut inflight = self.inflight.lock().expect("dedupe cache lock poisoned");
			if let Some(current) = inflight.get(path) {
				if current.ptr_eq(&shared) {
					inflight.remove(path);
				}
			}
		}

		result.map_err(|arc_err| Error::new(arc_err.path.clone(), std::io::Error::new(arc_err.source.kind(), arc_err.source.to_string())))
	}
}
