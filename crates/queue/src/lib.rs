//! A FIFO job queue that drains only while an external lock counter is at
//! zero, used to sequence pipeline stage transitions and let observers
//! (a watcher setup, a source-discovery walk) hold off the drain until
//! their own work finishes.
#![warn(clippy::unwrap_used, missing_docs)]
#![deny(rust_2018_idioms)]

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::trace;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

struct State {
	jobs: VecDeque<Job>,
	lock_count: i64,
	draining: bool,
}

/// A FIFO queue of pending jobs, gated by a non-negative lock counter.
///
/// Always used behind an `Arc`, since the drain loop needs to hold a handle
/// to the queue across a spawned task.
pub struct AsyncQueue {
	state: Mutex<State>,
	idle: Notify,
}

impl fmt::Debug for AsyncQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock().expect("queue lock poisoned");
		f.debug_struct("AsyncQueue").field("pending", &state.jobs.len()).field("lock_count", &state.lock_count).finish()
	}
}

impl Default for AsyncQueue {
	fn default() -> Self {
		Self { state: Mutex::new(State { jobs: VecDeque::new(), lock_count: 0, draining: false }), idle: Notify::new() }
	}
}

impl AsyncQueue {
	/// An empty, unlocked queue.
	#[must_use]
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Append a job to the back of the queue. If the queue is currently
	/// unlocked and idle, this also starts (or resumes) the drain.
	pub fn enqueue(self: &Arc<Self>, job: impl Future<Output = ()> + Send + 'static) {
		{
			let mut state = self.state.lock().expect("queue lock poisoned");
			state.jobs.push_back(Box::pin(job));
		}
		self.kick();
	}

	/// Increment the lock counter. The queue will not drain while any lock
	/// is held. Nests safely: the counter, not a boolean, gates draining.
	#[must_use]
	pub fn lock(self: &Arc<Self>) -> LockGuard {
		{
			let mut state = self.state.lock().expect("queue lock poisoned");
			state.lock_count += 1;
		}
		LockGuard { queue: Arc::clone(self) }
	}

	/// Whether the queue currently has no pending jobs and no locks held.
	#[must_use]
	pub fn is_idle(&self) -> bool {
		let state = self.state.lock().expect("queue lock poisoned");
		state.jobs.is_empty() && state.lock_count == 0
	}

	/// A future that resolves the next time the queue becomes idle (empty
	/// and unlocked). If it is already idle, resolves immediately.
	pub async fn idle(&self) {
		loop {
			let notified = self.idle.notified();
			if self.is_idle() {
				return;
			}
			notified.await;
		}
	}

	fn kick(self: &Arc<Self>) {
		let should_spawn = {
			let mut state = self.state.lock().expect("queue lock poisoned");
			if state.draining || state.lock_count > 0 || state.jobs.is_empty() {
				false
			} else {
				state.draining = true;
				true
			}
		};

		if should_spawn {
			let this = Arc::clone(self);
			tokio::spawn(async move { this.drain().await });
		} else if self.is_idle() {
			self.idle.notify_waiters();
		}
	}

	async fn drain(self: Arc<Self>) {
		loop {
			let next = {
				let mut state = self.state.lock().expect("queue lock poisoned");
				if state.lock_count > 0 {
					state.draining = false;
					None
				} else {
					state.jobs.pop_front()
				}
			};

			let Some(job) = next else { break };
			job.await;
		}

		let became_idle = {
			let mut state = self.state.lock().expect("queue lock poisoned");
			let idle = state.jobs.is_empty() && state.lock_count == 0;
			if idle {
				state.draining = false;
			}
			idle
		};

		if became_idle {
			trace!("queue drained to idle");
			self.idle.notify_waiters();
		} else {
			// lock_count was raised mid-drain; `unlock` will kick us again.
		}
	}
}

/// A held lock on an [`AsyncQueue`]; decrements the counter on drop and, if
/// it reached zero, resumes the drain.
pub struct LockGuard {
	queue: Arc<AsyncQueue>,
}

impl Drop for LockGuard {
	fn drop(&mut self) {
		{
			let mut state = self.queue.state.lock().expect("queue lock poisoned");
			state.lock_count -= 1;
			debug_assert!(state.lock_count >= 0, "AsyncQueue lock count went negative");
		}
		self.queue.kick();
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn jobs_run_fifo() {
		let queue = AsyncQueue::new();
		let order = Arc::new(Mutex::new(Vec::new()));

		for i in 0..5 {
			let order = Arc::clone(&order);
			queue.enqueue(async move {
				tokio::time::sleep(Duration::from_millis(1)).await;
				order.lock().unwrap().push(i);
			});
		}

		queue.idle().await;
		assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
	}

	#[tokio::test]
	async fn never_drains_while_locked() {
		let queue = AsyncQueue::new();
		let ran = Arc::new(AtomicUsize::new(0));

		let guard = queue.lock();
		{
			let ran = Arc::clone(&ran);
			queue.enqueue(async move {
				ran.fetch_add(1, Ordering::SeqCst);
			});
		}

		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(ran.load(Ordering::SeqCst), 0);

		drop(guard);
		queue.idle().await;
		assert_eq!(ran.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn idle_resolves_immediately_on_empty_queue() {
		let queue = AsyncQueue::new();
		queue.idle().await;
	}
}
