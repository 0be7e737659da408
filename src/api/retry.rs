use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::constants;
use crate::errors::ApiError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per invocation, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::SYNC_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(constants::SYNC_BASE_BACKOFF_MS),
        }
    }
}

/// Run a remote call with exponential backoff.
///
/// Only transient failures are retried; structural 401/403 responses
/// repeat identically until the credential or enrollment changes, so the
/// loop gives up on them immediately.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                debug!(
                    "{} attempt {}/{} failed ({}), retrying in {:?}",
                    operation, attempt, policy.max_attempts, e, delay
                );
                sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => {
                warn!("{} failed after {} attempt(s): {}", operation, attempt, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_with_doubling_delays() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), ApiError> = retry_with_backoff(&policy(), "test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Transient("boom".into())) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Transient(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 1000ms + 2000ms of backoff between the three attempts.
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_mid_sequence() {
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff(&policy(), "test", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 1 {
                    Err(ApiError::Transient("boom".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn structural_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), ApiError> = retry_with_backoff(&policy(), "test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::NotEnrolled) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::NotEnrolled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
