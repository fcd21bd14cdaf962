//! Error status - how an error should be handled

use std::fmt;

/// The status of an error: how callers should react to it.
///
/// - `Permanent`: retrying will not help, fail fast
/// - `Temporary`: transient, safe to retry with backoff
/// - `Persistent`: was temporary, but retries were exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// The error is not recoverable by retrying
    Permanent,
    /// The error is transient and may succeed on retry
    Temporary,
    /// The error was temporary but retries have been exhausted
    Persistent,
}

impl ErrorStatus {
    /// Check if an error with this status should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Transition after retries are exhausted.
    ///
    /// Temporary becomes Persistent; other statuses are unchanged.
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        };
        write!(f, "{}", s)
    }
}
