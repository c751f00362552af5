//! Collapses a burst of raw watch events into one batch, on a trailing-edge
//! schedule: the first event opens a window, any further event resets it,
//! and the batch is handed off once the window elapses untouched.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::trace;

/// Default debounce window for collapsing a burst of saves into one rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Waits on `raw` for the next batch of distinct paths. Returns `None` once
/// `raw` is closed with nothing left pending.
pub async fn collect(raw: &mut mpsc::UnboundedReceiver<PathBuf>, debounce: Duration) -> Option<HashSet<PathBuf>> {
	let mut set: HashSet<PathBuf> = HashSet::new();
	let mut last = Instant::now();

	loop {
		let maxtime = if set.is_empty() { Duration::from_secs(u64::MAX) } else { debounce.saturating_sub(last.elapsed()) };

		if maxtime.is_zero() {
			trace!(count = set.len(), "watch: debounce window elapsed");
			return Some(set);
		}

		match timeout(maxtime, raw.recv()).await {
			Err(_elapsed) => {
				trace!(count = set.len(), "watch: debounce window elapsed");
				return Some(set);
			}
			Ok(None) => return if set.is_empty() { None } else { Some(set) },
			Ok(Some(path)) => {
				if set.is_empty() {
					last = Instant::now();
				}
				trace!(path = %path.display(), "watch: raw event collected");
				set.insert(path);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn collapses_a_burst_into_one_batch() {
		let (tx, mut rx) = mpsc::unbounded_channel();
		tx.send(PathBuf::from("/a.txt")).unwrap();
		tx.send(PathBuf::from("/b.txt")).unwrap();
		tx.send(PathBuf::from("/a.txt")).unwrap();

		let batch = collect(&mut rx, Duration::from_millis(20)).await.unwrap();
		let mut paths: Vec<_> = batch.into_iter().collect();
		paths.sort();
		assert_eq!(paths, vec![PathBuf::from("/a.txt"), PathBuf::from("/b.txt")]);
	}

	#[tokio::test]
	async fn closed_empty_channel_yields_none() {
		let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
		drop(tx);
		assert!(collect(&mut rx, Duration::from_millis(20)).await.is_none());
	}
}
