//! Generic bounded-retry combinator.
//!
//! Navigation and transfer steps share the same retry shape: a fixed number
//! of attempts, a fixed back-off between them, and an optional per-attempt
//! deadline. Only transient failures are retried; structural failures
//! surface immediately.

use std::time::Duration;

use tracing::warn;

use crate::error::{Result, WatchError};

/// Attempt count, back-off, and per-attempt deadline for a retried operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before the operation is reported failed. Minimum 1.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
    /// Per-attempt deadline. `None` = no deadline.
    pub timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Policy with a per-attempt deadline.
    pub fn new(attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
            timeout: Some(timeout),
        }
    }

    /// Policy without a per-attempt deadline.
    pub fn without_timeout(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
            timeout: None,
        }
    }
}

/// Run `op` under the given policy, retrying transient failures.
///
/// `op` receives the 1-based attempt number. A non-transient error returns
/// immediately; exhausting the attempt budget returns the last error.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        let fut = op(attempt);
        let outcome = match policy.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, fut).await {
                Ok(result) => result,
                Err(_) => Err(WatchError::timeout(operation, deadline.as_secs())),
            },
            None => fut.await,
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("retry loop returns on the final attempt");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_policy() -> RetryPolicy {
        RetryPolicy::without_timeout(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result = retry(&counting_policy(), "op", move |_| {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, WatchError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result = retry(&counting_policy(), "op", move |attempt| {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(WatchError::Transfer("connection reset".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error() {
        let result: Result<()> = retry(&counting_policy(), "op", |_| async {
            Err(WatchError::Transfer("still down".into()))
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, WatchError::Transfer(_)));
    }

    #[tokio::test]
    async fn non_transient_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = calls.clone();

        let result: Result<()> = retry(&counting_policy(), "op", move |_| {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(WatchError::validation("zero-byte artifact"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deadline_converts_to_timeout_error() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(10));

        let result: Result<()> = retry(&policy, "slow op", |_| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result.unwrap_err(), WatchError::Timeout { .. }));
    }
}
