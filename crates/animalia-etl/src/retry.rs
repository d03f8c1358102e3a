//! Bounded retry with backoff for transport-level network failures
//!
//! Only connect failures and timeouts are retried. Upstream HTTP errors
//! (non-2xx responses) are never retried: the server answered, and asking
//! again with the same request will not change that answer.

use animalia_common::{EtlError, PipelineConfig};
use std::time::Duration;
use tracing::warn;

/// Base backoff applied before the first retry; doubled on each attempt.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Retry policy for a single HTTP request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    enabled: bool,
    max_retries: u32,
    base_backoff: Duration,
}

impl RetryPolicy {
    /// Build the policy from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            enabled: config.enable_retry,
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }

    /// Build a policy with an explicit backoff (tests use short delays).
    pub fn new(enabled: bool, max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            enabled,
            max_retries,
            base_backoff,
        }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(false, 0, Duration::ZERO)
    }

    /// Whether a failed attempt should be retried.
    ///
    /// `attempt` is the zero-based index of the attempt that just failed.
    pub fn should_retry(&self, error: &EtlError, attempt: u32) -> bool {
        self.enabled && attempt < self.max_retries && error.is_network()
    }

    /// Sleep for the backoff interval of the given attempt.
    pub async fn backoff(&self, attempt: u32, what: &str) {
        let delay = self.base_backoff * 2u32.saturating_pow(attempt);
        warn!(
            what,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "network error, backing off before retry"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_errors_are_never_retried() {
        let policy = RetryPolicy::new(true, 3, Duration::ZERO);
        let err = EtlError::upstream(500, "boom");
        assert!(!policy.should_retry(&err, 0));
    }

    #[test]
    fn test_io_errors_are_never_retried() {
        let policy = RetryPolicy::new(true, 3, Duration::ZERO);
        let err = EtlError::Io(std::io::Error::other("disk"));
        assert!(!policy.should_retry(&err, 0));
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let policy = RetryPolicy::disabled();
        let err = EtlError::upstream(500, "boom");
        assert!(!policy.should_retry(&err, 0));
    }

    #[test]
    fn test_from_config_respects_flags() {
        let mut config = PipelineConfig::default();
        config.enable_retry = false;
        let policy = RetryPolicy::from_config(&config);
        assert!(!policy.enabled);

        config.enable_retry = true;
        config.max_retries = 5;
        let policy = RetryPolicy::from_config(&config);
        assert!(policy.enabled);
        assert_eq!(policy.max_retries, 5);
    }
}
