//! Retry utilities for upstream requests.
//!
//! Transient failures (network errors, timeouts, 429, 5xx) are retried with
//! exponential backoff. Everything else, including a well-formed response
//! that reports `correcto: false`, is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429.
/// - [`ScraperError::Http`]: network-level failure (connection reset, etc.).
/// - [`ScraperError::Timeout`]: the per-request deadline elapsed.
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) | ScraperError::Timeout { .. } => {
            true
        }
        ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Delay before retry number `attempt + 1`: `base_ms * 2^attempt`, capped.
fn backoff_delay(backoff_base_ms: u64, attempt: u32) -> Duration {
    let delay_ms = backoff_base_ms
        .saturating_mul(1u64 << attempt.min(20))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// With `max_retries = 2` the operation is attempted at most 3 times. If all
/// retries are exhausted the last error is returned; non-retriable errors are
/// returned immediately without sleeping.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_ms, attempt);
        tracing::debug!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient upstream error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
