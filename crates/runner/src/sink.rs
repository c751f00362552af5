//! The in-memory sink a `.dest` stage writes to under
//! [`loom_file::BuildMode::Server`], read back by the HTTP layer (an
//! external collaborator; starting the actual server is out of scope here).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Captures bytes a server-mode build would otherwise have written to disk,
/// keyed by destination path.
#[derive(Default)]
pub struct InMemorySink {
	entries: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl InMemorySink {
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// The closure form [`loom_pipeline::Options::server_sink`] expects.
	#[must_use]
	pub fn as_hook(self: &Arc<Self>) -> Arc<dyn Fn(&Path, &[u8]) + Send + Sync> {
		let this = Arc::clone(self);
		Arc::new(move |path: &Path, bytes: &[u8]| {
			this.entries.lock().expect("sink lock poisoned").insert(path.to_path_buf(), bytes.to_vec());
		})
	}

	/// The last-written bytes for `path`, if anything has been saved there.
	#[must_use]
	pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
		self.entries.lock().expect("sink lock poisoned").get(path).cloned()
	}

	/// Every path currently held in the sink.
	#[must_use]
	pub fn paths(&self) -> Vec<PathBuf> {
		self.entries.lock().expect("sink lock poisoned").keys().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hook_writes_are_readable_back() {
		let sink = InMemorySink::new();
		let hook = sink.as_hook();
		hook(Path::new("/out/a.js"), b"content");

		assert_eq!(sink.get(Path::new("/out/a.js")), Some(b"content".to_vec()));
		assert_eq!(sink.paths(), vec![PathBuf::from("/out/a.js")]);
	}
}
