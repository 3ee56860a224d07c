//! Bounded retry for idempotent upstream reads.
//!
//! Only timeouts and transport failures are retried. Writes to the payment
//! gateway or the courier (order creation, shipment booking, AWB assignment)
//! never go through here: a retried write can duplicate a remote record.

use bazaar_core::IntegrationResult;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_millis(250),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        self.initial_delay * self.multiplier.saturating_pow(attempt as u32)
    }
}

pub async fn retry_read<F, Fut, T>(policy: RetryPolicy, mut operation: F) -> IntegrationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = IntegrationResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Upstream read succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    service = err.service(),
                    attempt = attempt + 1,
                    ?delay,
                    "Retrying upstream read: {}",
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::IntegrationError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_transport_failure_is_retried_once() {
        let calls = AtomicUsize::new(0);
        let result = retry_read(RetryPolicy::immediate(1), || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(IntegrationError::Timeout { service: "shiprocket" })
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_api_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: IntegrationResult<()> = retry_read(RetryPolicy::immediate(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(IntegrationError::Api {
                service: "shiprocket",
                status: 422,
                message: "bad pincode".to_string(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicUsize::new(0);
        let result: IntegrationResult<()> = retry_read(RetryPolicy::immediate(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(IntegrationError::Transport {
                service: "shiprocket",
                message: "connection reset".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(IntegrationError::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
