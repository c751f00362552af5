//! Process-wide backpressure for `EMFILE`/`ENFILE`.
//!
//! There is no explicit concurrency limit on filesystem calls; the only
//! throttle is this queue. A call that hits `EMFILE`/`ENFILE` waits here
//! until another in-flight call completes (any completion, not necessarily
//! one for the same path), or until a watchdog timeout forces it to retry
//! anyway.

use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::sync::Notify;

const WATCHDOG: Duration = Duration::from_secs(5);

static QUEUE: Lazy<Notify> = Lazy::new(Notify::new);

/// Wait for a turn: either another fs operation completes and wakes us, or
/// the watchdog fires and we retry unconditionally.
pub(crate) async fn wait_turn() {
	let notified = QUEUE.notified();
	tokio::select! {
		() = notified => {}
		() = tokio::time::sleep(WATCHDOG) => {}
	}
}

/// Called by every fs operation on completion (success or failure) to wake
/// one pending caller, if any.
pub(crate) fn notify_complete() {
	QUEUE.notify_one();
}
