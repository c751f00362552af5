//! The native/poll watch backend, a thin wrapper over `notify`.

use std::path::Path;
use std::time::Duration;

use notify::{Config as NotifyConfig, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher as _};
use tracing::error;

use crate::Error;

/// Which `notify` implementation to construct.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[non_exhaustive]
pub enum WatchBackend {
	/// The notify-recommended watcher for the host platform: a native
	/// implementation where one exists, polling otherwise.
	#[default]
	Native,
	/// `notify`'s poll watcher, for filesystems that don't surface native
	/// events (network shares, some container overlays).
	Poll(Duration),
}

impl WatchBackend {
	pub(crate) fn create(self, handler: impl notify::EventHandler) -> Result<Box<dyn notify::Watcher + Send>, Error> {
		match self {
			Self::Native => RecommendedWatcher::new(handler, NotifyConfig::default()).map(|w| Box::new(w) as _),
			Self::Poll(interval) => PollWatcher::new(handler, NotifyConfig::default().with_poll_interval(interval)).map(|w| Box::new(w) as _),
		}
		.map_err(Error::Backend)
	}
}

pub(crate) fn watch_recursive(watcher: &mut dyn notify::Watcher, path: &Path) -> Result<(), Error> {
	watcher.watch(path, RecursiveMode::Recursive).map_err(|err| {
		error!(path = %path.display(), %err, "watch: failed to add path to backend");
		Error::Backend(err)
	})
}
