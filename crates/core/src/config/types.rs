use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::delivery::DeliveryConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub carrier: CarrierConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Carrier configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CarrierConfig {
    /// Carrier backend type
    #[serde(default)]
    pub backend: CarrierBackend,
    /// Webhook-specific configuration (required when backend = "webhook")
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

/// Available carrier backends
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CarrierBackend {
    /// In-process carrier acknowledging everything immediately (demos, tests)
    #[default]
    Instant,
    /// External carrier service reached over HTTP
    Webhook,
}

/// Webhook carrier backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Carrier service base URL (e.g., "http://localhost:9200")
    pub url: String,
    /// Optional bearer token for the carrier service
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Attempts per call before a transport failure surfaces (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Backoff between attempts in milliseconds (default: 500)
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

fn default_timeout() -> u32 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub delivery: DeliveryConfig,
    pub carrier: SanitizedCarrierConfig,
}

/// Sanitized carrier config (auth token redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCarrierConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<SanitizedWebhookConfig>,
}

/// Sanitized webhook config (auth token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedWebhookConfig {
    pub url: String,
    pub auth_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            delivery: config.delivery.clone(),
            carrier: SanitizedCarrierConfig {
                backend: match config.carrier.backend {
                    CarrierBackend::Instant => "instant".to_string(),
                    CarrierBackend::Webhook => "webhook".to_string(),
                },
                webhook: config.carrier.webhook.as_ref().map(|w| {
                    SanitizedWebhookConfig {
                        url: w.url.clone(),
                        auth_token_configured: w
                            .auth_token
                            .as_ref()
                            .is_some_and(|t| !t.is_empty()),
                        timeout_secs: w.timeout_secs,
                    }
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.carrier.backend, CarrierBackend::Instant);
        assert_eq!(config.delivery.confirmation_code, "Confirmed");
    }

    #[test]
    fn test_deserialize_custom_server() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_webhook_carrier() {
        let toml = r#"
[carrier]
backend = "webhook"

[carrier.webhook]
url = "http://localhost:9200"
auth_token = "secret-token"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.carrier.backend, CarrierBackend::Webhook);
        let webhook = config.carrier.webhook.as_ref().unwrap();
        assert_eq!(webhook.url, "http://localhost:9200");
        assert_eq!(webhook.timeout_secs, 30);
        assert_eq!(webhook.retry_attempts, 3);
        assert_eq!(webhook.retry_backoff_ms, 500);
    }

    #[test]
    fn test_sanitized_config_hides_auth_token() {
        let toml = r#"
[carrier]
backend = "webhook"

[carrier.webhook]
url = "http://localhost:9200"
auth_token = "secret-token"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert_eq!(sanitized.carrier.backend, "webhook");
        let webhook = sanitized.carrier.webhook.unwrap();
        assert!(webhook.auth_token_configured);

        let json = serde_json::to_string(&webhook).unwrap();
        assert!(!json.contains("secret-token"));
    }

    #[test]
    fn test_sanitized_config_default_backend() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.carrier.backend, "instant");
        assert!(sanitized.carrier.webhook.is_none());
    }

    #[test]
    fn test_deserialize_delivery_section() {
        let toml = r#"
[delivery]
confirmation_deadline_secs = 300
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.delivery.confirmation_deadline_secs, Some(300));
    }
}
