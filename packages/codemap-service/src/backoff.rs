use std::{future::Future, time::Duration};

use rand::Rng;

use crate::{Error, Result};

/// Retries throttled calls with exponential backoff and uniform jitter.
///
/// The delay before retry `n` (0-based) is `base * 2^n` plus jitter drawn from `[0, base)`.
/// Errors other than [`Error::Throttled`] are returned immediately. The executor sleeps on the
/// calling task, so a worker stays occupied with its record while it waits.
#[derive(Clone, Debug)]
pub struct BackoffExecutor {
	max_attempts: u32,
	base_delay: Duration,
}
impl BackoffExecutor {
	pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
		Self { max_attempts: max_attempts.max(1), base_delay }
	}

	pub fn from_config(cfg: &codemap_config::Backoff) -> Self {
		Self::new(cfg.max_attempts, Duration::from_millis(cfg.base_delay_ms))
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 0;

		loop {
			let message = match operation().await {
				Ok(value) => return Ok(value),
				Err(Error::Throttled { message }) => message,
				Err(err) => return Err(err),
			};

			attempt += 1;

			if attempt >= self.max_attempts {
				tracing::warn!(label, attempts = attempt, "Retries exhausted while throttled.");

				return Err(Error::RetriesExhausted {
					label: label.to_string(),
					attempts: attempt,
					last: message,
				});
			}

			let delay = self.delay_for_retry(attempt - 1);

			tracing::debug!(
				label,
				attempt,
				delay_ms = delay.as_millis() as u64,
				"Throttled. Backing off."
			);

			tokio::time::sleep(delay).await;
		}
	}

	/// Exponential part of the delay before retry `retry` (0-based), without jitter.
	pub fn base_delay_for_retry(&self, retry: u32) -> Duration {
		self.base_delay.saturating_mul(1_u32 << retry.min(16))
	}

	fn delay_for_retry(&self, retry: u32) -> Duration {
		self.base_delay_for_retry(retry).saturating_add(self.jitter())
	}

	fn jitter(&self) -> Duration {
		let base_ms = self.base_delay.as_millis() as u64;

		if base_ms == 0 {
			return Duration::ZERO;
		}

		Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use tokio::time::Instant;

	use super::*;

	fn throttled() -> Error {
		Error::Throttled { message: "Rate exceeded".to_string() }
	}

	#[tokio::test(start_paused = true)]
	async fn retries_until_success() {
		let executor = BackoffExecutor::new(8, Duration::from_secs(1));
		let calls = AtomicU32::new(0);
		let started = Instant::now();
		let result = executor
			.execute("embed", || async {
				let call = calls.fetch_add(1, Ordering::SeqCst);

				if call < 2 { Err(throttled()) } else { Ok(call) }
			})
			.await;

		assert_eq!(result.expect("Expected success."), 2);
		assert_eq!(calls.load(Ordering::SeqCst), 3);

		// 1s + 2s of backoff plus at most 1s of jitter per retry.
		let elapsed = started.elapsed();

		assert!(elapsed >= Duration::from_secs(3), "Elapsed {elapsed:?}");
		assert!(elapsed < Duration::from_secs(5), "Elapsed {elapsed:?}");
	}

	#[tokio::test(start_paused = true)]
	async fn exhausts_after_max_attempts() {
		let executor = BackoffExecutor::new(4, Duration::from_millis(10));
		let calls = AtomicU32::new(0);
		let result: Result<()> = executor
			.execute("rank", || async {
				calls.fetch_add(1, Ordering::SeqCst);

				Err(throttled())
			})
			.await;

		assert_eq!(calls.load(Ordering::SeqCst), 4);

		match result {
			Err(Error::RetriesExhausted { label, attempts, last }) => {
				assert_eq!(label, "rank");
				assert_eq!(attempts, 4);
				assert_eq!(last, "Rate exceeded");
			},
			other => panic!("Unexpected result: {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn other_errors_are_not_retried() {
		let executor = BackoffExecutor::new(8, Duration::from_secs(1));
		let calls = AtomicU32::new(0);
		let result: Result<()> = executor
			.execute("embed", || async {
				calls.fetch_add(1, Ordering::SeqCst);

				Err(Error::Provider { message: "bad request".to_string() })
			})
			.await;

		assert!(matches!(result, Err(Error::Provider { .. })));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn delay_doubles_per_retry() {
		let executor = BackoffExecutor::new(8, Duration::from_millis(500));

		assert_eq!(executor.base_delay_for_retry(0), Duration::from_millis(500));
		assert_eq!(executor.base_delay_for_retry(3), Duration::from_millis(4_000));

		for _ in 0..32 {
			let delay = executor.delay_for_retry(1);

			assert!(delay >= Duration::from_millis(1_000) && delay < Duration::from_millis(1_500));
		}
	}
}
