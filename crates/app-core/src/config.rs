//! Monitor configuration

use networking::BackoffConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the notification monitor
///
/// Every field has a default, so a partial JSON object is accepted:
///
/// ```rust
/// use app_core::config::MonitorConfig;
/// use std::time::Duration;
///
/// let config: MonitorConfig = serde_json::from_str(r#"{"readTimeoutMs": 5000}"#).unwrap();
/// assert_eq!(config.read_timeout, Duration::from_secs(5));
/// assert_eq!(config.backoff.max_interval, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Upper bound on any single remote read
    ///
    /// Should exceed the source's long-poll wait, otherwise idle polls are
    /// treated as dropped connections.
    #[serde(with = "networking::duration_ms", rename = "readTimeoutMs")]
    pub read_timeout: Duration,
    /// Reconnect schedule
    pub backoff: BackoffConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { read_timeout: Duration::from_secs(30), backoff: BackoffConfig::default() }
    }
}

impl MonitorConfig {
    /// Set the remote read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the reconnect schedule
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.backoff.initial_interval, Duration::from_secs(1));
        assert_eq!(config.backoff.multiplier, 2.0);
    }

    #[test]
    fn test_nested_backoff_from_json() {
        let config: MonitorConfig = serde_json::from_value(serde_json::json!({
            "backoff": {"initialIntervalMs": 10, "randomizationFactor": 0.0}
        }))
        .unwrap();

        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.backoff.initial_interval, Duration::from_millis(10));
        assert_eq!(config.backoff.randomization_factor, 0.0);
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::default()
            .with_read_timeout(Duration::from_secs(45))
            .with_backoff(BackoffConfig::default().with_max_interval(Duration::from_secs(5)));

        assert_eq!(config.read_timeout, Duration::from_secs(45));
        assert_eq!(config.backoff.max_interval, Duration::from_secs(5));
    }
}
