//! Webhook carrier implementation.
//!
//! Talks to an external carrier service over plain HTTP/JSON. Every call
//! carries the configured request timeout, and transport-level failures
//! (connect errors, timeouts, 5xx) are retried with a fixed backoff before
//! an error is surfaced to the orchestration core.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::WebhookConfig;
use crate::item::Item;

use super::{Carrier, CarrierError};

/// Carrier backed by an external HTTP service.
pub struct WebhookCarrier {
    client: Client,
    config: WebhookConfig,
}

/// Request body for delivery operations.
#[derive(Debug, Serialize)]
struct DeliveryRequest<'a> {
    id: u64,
    payload: &'a str,
}

/// Response body for completion/compensation operations.
#[derive(Debug, Deserialize)]
struct CodeResponse {
    code: String,
}

impl WebhookCarrier {
    /// Create a new webhook carrier.
    pub fn new(config: WebhookConfig) -> Result<Self, CarrierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| CarrierError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, retrying transport failures and 5xx responses.
    async fn send_with_retry(
        &self,
        op: &str,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response, CarrierError> {
        let attempts = self.config.retry_attempts.max(1);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_error = CarrierError::Internal("no attempt made".to_string());

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(backoff).await;
            }

            match self.authorize(build()).send().await {
                Ok(response) if response.status().is_server_error() => {
                    warn!(
                        "Carrier {} returned {} (attempt {}/{})",
                        op,
                        response.status(),
                        attempt,
                        attempts
                    );
                    last_error = CarrierError::Endpoint(format!(
                        "{} returned HTTP {}",
                        op,
                        response.status()
                    ));
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    warn!("Carrier {} timed out (attempt {}/{})", op, attempt, attempts);
                    last_error = CarrierError::Timeout;
                }
                Err(e) if e.is_connect() => {
                    warn!(
                        "Carrier {} connection failed (attempt {}/{}): {}",
                        op, attempt, attempts, e
                    );
                    last_error = CarrierError::ConnectionFailed(e.to_string());
                }
                Err(e) => return Err(CarrierError::Endpoint(e.to_string())),
            }
        }

        Err(last_error)
    }

    /// Check a response for client-side rejection.
    fn check_status(op: &str, status: StatusCode) -> Result<(), CarrierError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(CarrierError::Endpoint(format!(
                "{} returned HTTP {}",
                op, status
            )))
        }
    }

    async fn post_code(&self, op: &str, path: &str, item: &Item) -> Result<String, CarrierError> {
        let url = format!("{}{}", self.base_url(), path);
        let body = DeliveryRequest {
            id: item.id.0,
            payload: &item.payload,
        };

        let response = self
            .send_with_retry(op, || self.client.post(&url).json(&body))
            .await?;
        Self::check_status(op, response.status())?;

        let code: CodeResponse = response
            .json()
            .await
            .map_err(|e| CarrierError::InvalidResponse(e.to_string()))?;

        debug!("Carrier {} for item {} returned code {}", op, item.id, code.code);
        Ok(code.code)
    }
}

#[async_trait]
impl Carrier for WebhookCarrier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn generate_items(&self) -> Result<Vec<Item>, CarrierError> {
        let url = format!("{}/items", self.base_url());

        let response = self
            .send_with_retry("generate_items", || self.client.get(&url))
            .await?;
        Self::check_status("generate_items", response.status())?;

        let items: Vec<Item> = response
            .json()
            .await
            .map_err(|e| CarrierError::InvalidResponse(e.to_string()))?;

        debug!("Carrier generated {} items", items.len());
        Ok(items)
    }

    async fn perform_delivery(&self, item: &Item) -> Result<(), CarrierError> {
        let url = format!("{}/deliveries", self.base_url());
        let body = DeliveryRequest {
            id: item.id.0,
            payload: &item.payload,
        };

        let response = self
            .send_with_retry("perform_delivery", || self.client.post(&url).json(&body))
            .await?;
        Self::check_status("perform_delivery", response.status())
    }

    async fn complete_delivery(&self, item: &Item) -> Result<String, CarrierError> {
        self.post_code("complete_delivery", "/deliveries/complete", item)
            .await
    }

    async fn compensate_delivery(&self, item: &Item) -> Result<String, CarrierError> {
        self.post_code("compensate_delivery", "/deliveries/compensate", item)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> WebhookConfig {
        WebhookConfig {
            url: url.to_string(),
            auth_token: None,
            timeout_secs: 1,
            retry_attempts: 1,
            retry_backoff_ms: 10,
        }
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let carrier = WebhookCarrier::new(test_config("http://localhost:9999/")).unwrap();
        assert_eq!(carrier.base_url(), "http://localhost:9999");
    }

    #[tokio::test]
    async fn test_unreachable_carrier_reports_connection_failure() {
        // Port 9 (discard) is assumed closed.
        let carrier = WebhookCarrier::new(test_config("http://127.0.0.1:9")).unwrap();
        let item = Item::new(1u64, "payload");

        let result = carrier.perform_delivery(&item).await;
        assert!(matches!(
            result,
            Err(CarrierError::ConnectionFailed(_)) | Err(CarrierError::Timeout)
        ));
    }
}
