//! Allocator configuration: transaction bounds and retry budget.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the concurrent seat allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Upper bound for one claim attempt (begin, lock, claim, commit), in milliseconds.
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_ms: u64,
    /// Total claim attempts per requester, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds. Doubles after each
    /// further attempt.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Ceiling for the backoff delay, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Add a random component of up to half the delay to each backoff.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl AllocatorConfig {
    /// Per-attempt transaction bound.
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    /// First backoff delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Maximum backoff delay.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: default_transaction_timeout(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            jitter: default_true(),
        }
    }
}

fn default_transaction_timeout() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    5
}

fn default_max_backoff() -> u64 {
    200
}

fn default_true() -> bool {
    true
}
