//! Reconnect backoff
//!
//! Long-lived connections retry forever on an exponential schedule that is
//! reset after every successful connection. The schedule itself comes from
//! the `backoff` crate; [`BackoffConfig`] is the serializable description of
//! it.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for reconnect backoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackoffConfig {
    /// Delay before the first retry
    #[serde(with = "crate::duration_ms", rename = "initialIntervalMs")]
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    #[serde(with = "crate::duration_ms", rename = "maxIntervalMs")]
    pub max_interval: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Jitter as a fraction of the current delay (0.0 disables jitter)
    pub randomization_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            multiplier: 2.0,
            randomization_factor: 0.2,
        }
    }
}

impl BackoffConfig {
    /// Set the initial delay
    pub fn with_initial_interval(mut self, delay: Duration) -> Self {
        self.initial_interval = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_interval(mut self, delay: Duration) -> Self {
        self.max_interval = delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Set the jitter factor
    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor;
        self
    }

    /// Build a fresh schedule
    pub fn build(&self) -> ReconnectBackoff {
        let mut inner = ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: self.randomization_factor.clamp(0.0, 1.0),
            multiplier: self.multiplier,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        inner.reset();

        ReconnectBackoff { inner, max_interval: self.max_interval, attempts: 0 }
    }
}

/// Unbounded exponential reconnect schedule
#[derive(Debug)]
pub struct ReconnectBackoff {
    inner: ExponentialBackoff,
    max_interval: Duration,
    attempts: u32,
}

impl ReconnectBackoff {
    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        // No elapsed-time limit is configured, so the schedule never ends
        self.inner.next_backoff().unwrap_or(self.max_interval)
    }

    /// Start over after a successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.inner.reset();
    }

    /// Consecutive failed attempts since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
