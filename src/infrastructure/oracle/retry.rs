//! Bounded retry with a fixed inter-attempt delay.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::domain::models::RetryConfig;
use crate::domain::ports::OracleError;

/// Retries an operation on transient failures only. Hard failures and
/// exhaustion propagate immediately; the delay between attempts is fixed.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self { max_attempts: max_attempts.max(1), delay: Duration::from_millis(delay_ms) }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay_ms)
    }

    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(OracleError::Transient(detail)) if attempt < self.max_attempts => {
                    warn!(attempt, max_attempts = self.max_attempts, %detail, "transient oracle failure, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
