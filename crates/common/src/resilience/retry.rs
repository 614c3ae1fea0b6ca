//! Bounded retry with fixed backoff
//!
//! [`RetryExecutor::execute_with_retry`] runs an operation up to
//! `max_retries` times while swallowing failures, sleeping `backoff` between
//! attempts, and then makes one final attempt whose outcome is returned to
//! the caller as-is. A policy with `max_retries = 0` therefore performs a
//! single, unguarded attempt.
//!
//! The backoff sleep can be interrupted through a
//! [`CancellationToken`]; an interrupted sleep surfaces as a
//! `ClientRequest` error instead of silently abandoning the operation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use warden_domain::{RetryConfig, WardenError};

/// Immutable retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }

    /// A single attempt without retries.
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub const fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Total number of times the operation may run.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.backoff())
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, cancel: None }
    }

    /// Abort backoff sleeps once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute `operation` with `max_retries` guarded attempts followed by a
    /// final unguarded one.
    ///
    /// # Errors
    /// Returns the error of the final attempt, or a `ClientRequest` error
    /// when a backoff sleep is interrupted.
    #[instrument(skip(self, operation), fields(max_retries = self.policy.max_retries))]
    pub async fn execute_with_retry<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + From<WardenError>,
    {
        for attempt in 1..=self.policy.max_retries {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation_succeeded_after_retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        backoff_ms = self.policy.backoff.as_millis() as u64,
                        error = %error,
                        "operation_failed_retrying"
                    );
                    self.sleep_backoff().await?;
                }
            }
        }

        operation().await
    }

    /// Sleep for at least the policy backoff, re-measuring the elapsed time
    /// after every wakeup.
    async fn sleep_backoff(&self) -> Result<(), WardenError> {
        let backoff = self.policy.backoff;
        let started = Instant::now();

        loop {
            let elapsed = started.elapsed();
            if elapsed >= backoff {
                return Ok(());
            }
            let remaining = backoff - elapsed;

            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            warn!(elapsed_ms = elapsed.as_millis() as u64, "retry_backoff_interrupted");
                            return Err(WardenError::interrupted("retry backoff cancelled"));
                        }
                        () = tokio::time::sleep(remaining) => {}
                    }
                }
                None => tokio::time::sleep(remaining).await,
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::from(&RetryConfig::default()))
    }
}
