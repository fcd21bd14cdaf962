//! Agent configuration
//!
//! One explicit value, constructed by the embedding program and passed into
//! [`crate::Agent`]. There is no global accessor; two agents in one process
//! can run with different settings.

use std::time::Duration;

/// Configuration for the agent loop
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Hard cap on loop iterations before soft termination
    pub max_iterations: usize,
    /// Maximum provider call attempts (first try included)
    pub max_retries: usize,
    /// Base retry delay; attempt N sleeps `base * N`
    pub retry_base_delay: Duration,
    /// Transcript length that triggers compaction
    pub transcript_max: usize,
    /// Messages kept from the tail when compacting
    pub transcript_tail: usize,
    /// Print progress to stdout
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 12,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
            transcript_max: 10,
            transcript_tail: 6,
            verbose: true,
        }
    }
}

impl AgentConfig {
    /// Override the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Override the retry cap
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the base retry delay
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set progress printing
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 12);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.transcript_max, 10);
        assert_eq!(config.transcript_tail, 6);
    }

    #[test]
    fn test_builders() {
        let config = AgentConfig::default()
            .with_max_iterations(3)
            .with_retry_base_delay(Duration::from_millis(10))
            .with_verbose(false);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(10));
        assert!(!config.verbose);
    }
}
