//! Bounded retry for lost optimistic-concurrency races, and operation deadlines.

use std::future::Future;
use std::time::Duration;

use tender_shared::config::EngineSettings;
use tracing::{debug, warn};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base delay, multiplied by the attempt number.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            max_attempts: settings.max_retries.max(1),
            backoff: settings.retry_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. The last error is returned unchanged.
pub async fn retry_on_conflict<T, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    mut attempt: F,
) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    let mut tries: u32 = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(e) if e.is_retryable() && tries < policy.max_attempts => {
                debug!(operation, attempt = tries, "Retrying after conflict: {}", e);
                tokio::time::sleep(policy.backoff * tries).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(operation, attempts = tries, "Giving up after repeated conflicts: {}", e);
                }
                return Err(e);
            }
            Ok(value) => return Ok(value),
        }
    }
}

/// Fails with [`DomainError::Timeout`] when `fut` does not finish in time.
/// The inner future is dropped on expiry.
pub async fn with_deadline<T, Fut>(
    timeout: Duration,
    operation: &'static str,
    fut: Fut,
) -> Result<T, DomainError>
where
    Fut: Future<Output = Result<T, DomainError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "Operation timed out");
            Err(DomainError::Timeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}
