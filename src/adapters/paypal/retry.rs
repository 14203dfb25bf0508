//! Bounded retry with exponential backoff for gateway calls.
//!
//! Only transient failures are retried (network, timeout, 429, 5xx). Backoff
//! sleeps watch the shutdown channel so a stopping process is never held up
//! by a pending retry.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::GatewayConfig;
use crate::ports::GatewayError;

/// Retry schedule: `initial * multiplier^(attempt-1)`, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.retry_initial_backoff_ms),
            multiplier: config.retry_backoff_multiplier.max(1),
            max_backoff: Duration::from_millis(config.retry_max_backoff_ms),
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        let millis = (self.initial_backoff.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(millis).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Run `call` until it succeeds, fails permanently, or attempts run out.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    shutdown: &watch::Receiver<bool>,
    operation: &str,
    mut call: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.retryable || attempt >= policy.max_attempts => {
                if e.retryable {
                    tracing::error!(operation, attempts = attempt, error = %e, "Gateway call failed after retries");
                }
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying gateway call after transient error"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown_requested(shutdown.clone()) => {
                        tracing::info!(operation, attempt, "Gateway retry abandoned for shutdown");
                        return Err(GatewayError::cancelled(operation));
                    }
                }
                attempt += 1;
            }
        }
    }
}

/// Resolves once shutdown is signalled; never resolves if the sender is gone.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[test]
    fn default_schedule_doubles_from_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(10), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let (_tx, rx) = no_shutdown();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&RetryPolicy::immediate(3), &rx, "capture_order", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GatewayError::from_status(503, "unavailable"))
                } else {
                    Ok("captured")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "captured");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (_tx, rx) = no_shutdown();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = with_retry(&RetryPolicy::immediate(3), &rx, "create_order", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::network("connection reset")) }
        })
        .await;

        assert_eq!(result.unwrap_err().code, GatewayErrorCode::Network);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_fail_fast() {
        let (_tx, rx) = no_shutdown();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = with_retry(&RetryPolicy::immediate(3), &rx, "create_order", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(GatewayError::from_status(400, "bad amount")) }
        })
        .await;

        assert_eq!(result.unwrap_err().code, GatewayErrorCode::InvalidRequest);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() {
        let (tx, rx) = no_shutdown();
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(60),
            multiplier: 2,
            max_backoff: Duration::from_secs(120),
        };

        let call = tokio::spawn(async move {
            with_retry::<(), _, _>(&policy, &rx, "fetch_subscription", || async {
                Err(GatewayError::timeout("elapsed"))
            })
            .await
        });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Cancelled);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn dropped_shutdown_sender_does_not_cancel() {
        let (tx, rx) = no_shutdown();
        drop(tx);
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            ..RetryPolicy::default()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = with_retry(&policy, &rx, "capture_order", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GatewayError::from_status(429, "slow down"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
