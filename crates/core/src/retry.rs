//! Retry configuration for establishing transport connections.
//!
//! Connection failures are fatal only once the retry budget is spent.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Default maximum connection attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Default initial backoff delay in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 300;

/// Default maximum backoff delay in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10000;

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts including the first one (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Initial backoff delay in milliseconds (default: 300ms).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds (default: 10000ms).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RetryConfig {
    /// Creates a tokio-retry strategy with exponential backoff.
    ///
    /// Backoff sequence with defaults (300ms initial, 10s max):
    /// 300ms, 600ms, 1.2s, 2.4s.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.initial_backoff_ms / 2)
            .max_delay(Duration::from_millis(self.max_backoff_ms))
            .take(self.max_attempts.saturating_sub(1))
    }
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.initial_backoff_ms, DEFAULT_INITIAL_BACKOFF_MS);
        assert_eq!(config.max_backoff_ms, DEFAULT_MAX_BACKOFF_MS);
    }

    #[test]
    fn test_retry_strategy_length() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 1000,
        };

        let delays: Vec<Duration> = config.strategy().collect();
        assert_eq!(delays.len(), 2);
    }

    #[test]
    fn test_retry_strategy_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 6,
            initial_backoff_ms: 300,
            max_backoff_ms: 1000,
        };

        let delays: Vec<Duration> = config.strategy().collect();
        assert_eq!(delays[0], Duration::from_millis(300));
        assert_eq!(delays[1], Duration::from_millis(600));
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(1000)));
    }

    #[test]
    fn test_single_attempt_has_no_delays() {
        let config = RetryConfig {
            max_attempts: 1,
            ..Default::default()
        };
        assert_eq!(config.strategy().count(), 0);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RetryConfig = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.initial_backoff_ms, DEFAULT_INITIAL_BACKOFF_MS);
    }
}
