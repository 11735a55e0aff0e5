//! Bounded exponential backoff between claim attempts.

use std::time::Duration;

use rand::Rng;

use seatbook_core::config::AllocatorConfig;

/// How often and how patiently a requester retries a lost race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` attempts in total (at least
    /// one), sleeping `initial_backoff` after the first failure and doubling
    /// up to `max_backoff`. Jitter is off.
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
            jitter: false,
        }
    }

    /// Build the policy described by the allocator configuration.
    pub fn from_config(config: &AllocatorConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.initial_backoff(),
            config.max_backoff(),
        )
        .with_jitter(config.jitter)
    }

    /// Enable or disable random jitter of up to half the delay.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts allowed, including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deterministic delay after `failed_attempts` consecutive failures.
    pub fn base_delay(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Delay to sleep after `failed_attempts` consecutive failures, with
    /// jitter applied when enabled. Never exceeds the maximum backoff.
    pub fn delay(&self, failed_attempts: u32) -> Duration {
        let base = self.base_delay(failed_attempts);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let spread = base.mul_f64(rand::rng().random_range(0.0..0.5));
        (base + spread).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AllocatorConfig::default())
    }
}
