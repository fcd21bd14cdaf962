//! Retry with linear backoff for provider calls
//!
//! Classification prefers the structured status carried by the error; the
//! substring table is the fallback for providers that only surface text.
//! Retries use blocking sleeps on the calling task - there is no overlap
//! with other work.

use std::future::Future;
use std::time::Duration;
use taskrun_error::{Error, Result};
use tokio::time::sleep;

/// Message fragments that mark a provider error as transient
pub const RETRYABLE_MARKERS: &[&str] =
    &["overloaded", "timeout", "rate limit", "502", "503", "504"];

/// Linear-backoff retry policy for provider calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Maximum number of attempts (first try included)
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay before the attempt after `attempt` (1-based): `base * attempt`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.base_delay * attempt as u32
    }

    /// Decide whether an error is worth retrying.
    ///
    /// Structured status first; case-insensitive substring match on the
    /// rendered error as the fallback.
    pub fn is_retryable(error: &Error) -> bool {
        if error.is_retryable() {
            return true;
        }
        let rendered = error.to_string().to_lowercase();
        RETRYABLE_MARKERS.iter().any(|marker| rendered.contains(marker))
    }

    /// Run `operation` under this policy.
    ///
    /// Non-retryable errors return immediately. Exhausting the cap returns
    /// the last error, marked persistent.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(attempt, "provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !Self::is_retryable(&error) {
                        return Err(error);
                    }

                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "retryable provider error"
                    );

                    if attempt < self.max_attempts {
                        sleep(self.delay_for(attempt)).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .expect("retry loop ran at least once")
            .persist()
            .with_context("attempts", self.max_attempts.to_string()))
    }
}
