//! Storage retry logic
//!
//! Exponential backoff for retryable storage and upstream errors, bounded by
//! `storage.max_retry_wait_ms`.

use crate::error::PipelineResult;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Retry an operation while it fails with a retryable error and `max_wait_ms` has not elapsed.
///
/// **Backoff Strategy:**
/// - Initial delay: 10ms
/// - Max delay: 1000ms
/// - Multiplier: 2.0
///
/// Non-retryable errors return immediately. When the wait budget is spent the last
/// error is returned unchanged, so callers still see `StorageTimeout`.
pub async fn retry_retryable<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = PipelineResult<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        error = %err,
                        "Giving up: max retry time exceeded"
                    );
                    return Err(err);
                }

                let sleep_ms = backoff_ms.min(max_duration.saturating_sub(elapsed).as_millis() as u64);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = sleep_ms,
                    error = %err,
                    "Retryable failure, backing off"
                );

                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}
