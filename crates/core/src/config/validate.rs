use super::types::{CarrierBackend, Config};
use super::ConfigError;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Webhook backend comes with a webhook section and a non-empty URL
/// - Retry and confirmation codes are distinct
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Carrier validation
    if config.carrier.backend == CarrierBackend::Webhook {
        match &config.carrier.webhook {
            None => {
                return Err(ConfigError::ValidationError(
                    "carrier.webhook section is required when backend = \"webhook\""
                        .to_string(),
                ));
            }
            Some(webhook) if webhook.url.is_empty() => {
                return Err(ConfigError::ValidationError(
                    "carrier.webhook.url cannot be empty".to_string(),
                ));
            }
            Some(_) => {}
        }
    }

    // Delivery validation: a retry code equal to the confirmation code
    // would loop every item forever.
    if config.delivery.retry_code == config.delivery.confirmation_code {
        return Err(ConfigError::ValidationError(
            "delivery.retry_code must differ from delivery.confirmation_code".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CarrierConfig, ServerConfig, WebhookConfig};
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_webhook_without_section_fails() {
        let config = Config {
            carrier: CarrierConfig {
                backend: CarrierBackend::Webhook,
                webhook: None,
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_webhook_empty_url_fails() {
        let config = Config {
            carrier: CarrierConfig {
                backend: CarrierBackend::Webhook,
                webhook: Some(WebhookConfig {
                    url: String::new(),
                    auth_token: None,
                    timeout_secs: 30,
                    retry_attempts: 3,
                    retry_backoff_ms: 500,
                }),
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_same_codes_fail() {
        let mut config = Config::default();
        config.delivery.retry_code = "Confirmed".to_string();
        assert!(validate_config(&config).is_err());
    }
}
