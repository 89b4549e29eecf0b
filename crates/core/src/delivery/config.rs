//! Delivery orchestration configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the delivery orchestration core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Completion code that terminates an item's delivery loop.
    /// The carrier is expected to return this once a confirmed cycle is
    /// truly final.
    #[serde(default = "default_confirmation_code")]
    pub confirmation_code: String,

    /// Completion code signalling a confirmed-but-not-final cycle.
    /// Any code other than this one is treated as terminal.
    #[serde(default = "default_retry_code")]
    pub retry_code: String,

    /// Optional upper bound on one confirmation wait, in seconds.
    /// When set, an item that waits this long without confirmation is
    /// treated as still pending and starts a fresh delivery cycle.
    /// Unset means wait indefinitely (the default).
    #[serde(default)]
    pub confirmation_deadline_secs: Option<u64>,

    /// Buffer size of the inbound message channel.
    #[serde(default = "default_inbox_buffer")]
    pub inbox_buffer: usize,
}

fn default_confirmation_code() -> String {
    "Confirmed".to_string()
}

fn default_retry_code() -> String {
    "Retry".to_string()
}

fn default_inbox_buffer() -> usize {
    256
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            confirmation_code: default_confirmation_code(),
            retry_code: default_retry_code(),
            confirmation_deadline_secs: None,
            inbox_buffer: default_inbox_buffer(),
        }
    }
}

impl DeliveryConfig {
    /// Confirmation deadline as a `Duration`, if configured.
    pub fn confirmation_deadline(&self) -> Option<Duration> {
        self.confirmation_deadline_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeliveryConfig::default();
        assert_eq!(config.confirmation_code, "Confirmed");
        assert_eq!(config.retry_code, "Retry");
        assert_eq!(config.confirmation_deadline_secs, None);
        assert_eq!(config.inbox_buffer, 256);
        assert!(config.confirmation_deadline().is_none());
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = "";
        let config: DeliveryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.confirmation_code, "Confirmed");
        assert_eq!(config.retry_code, "Retry");
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            confirmation_code = "Delivered"
            retry_code = "Partial"
            confirmation_deadline_secs = 120
            inbox_buffer = 64
        "#;
        let config: DeliveryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.confirmation_code, "Delivered");
        assert_eq!(config.retry_code, "Partial");
        assert_eq!(
            config.confirmation_deadline(),
            Some(Duration::from_secs(120))
        );
        assert_eq!(config.inbox_buffer, 64);
    }
}
