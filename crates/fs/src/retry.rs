use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace};

use crate::backpressure;
use crate::error::Error;

const BACKOFF_BASE: Duration = Duration::from_millis(50);

/// Retry `op` up to `try_count` times. Transient errors ([`Error::is_transient`])
/// wait on the shared backpressure queue before retrying; any other error
/// short-circuits immediately.
pub(crate) async fn retry<T, F, Fut>(try_count: u32, mut op: F) -> Result<T, Error>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, Error>>,
{
	let mut attempt = 0;
	loop {
		let result = op().await;
		backpressure::notify_complete();

		match result {
			Ok(value) => return Ok(value),
			Err(err) if err.is_transient() && attempt + 1 < try_count => {
				attempt += 1;
				debug!(path = %err.path, attempt, "transient fs error, retrying");
				backpressure::wait_turn().await;
				tokio::time::sleep(BACKOFF_BASE * attempt).await;
			}
			Err(err) => {
				trace!(path = %err.path, attempt, "fs error, not retrying");
				return Err(err);
			}
		}
	}
}
