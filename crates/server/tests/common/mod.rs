//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock carrier injected, enabling comprehensive E2E testing
//! without external infrastructure.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use parcelo_core::{
    create_message_inbox, Config, DeliveryConfig, ItemProcessManager, testing::MockCarrier,
};
use parcelo_server::state::AppState;

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Test fixture for E2E testing with a mock carrier.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_run_creation() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/runs", json!({
///         "items": [{ "id": 1, "payload": "parcel" }]
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock carrier - script completion codes, inject failures
    pub carrier: Arc<MockCarrier>,
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub async fn new() -> Self {
        let delivery = DeliveryConfig::default();
        let carrier = Arc::new(MockCarrier::new());

        let config = Config {
            delivery: delivery.clone(),
            ..Default::default()
        };

        let manager = Arc::new(ItemProcessManager::new(
            Arc::clone(&carrier) as Arc<dyn parcelo_core::Carrier>,
            delivery.clone(),
        ));

        let (messages, dispatcher) = create_message_inbox(manager.router(), delivery.inbox_buffer);
        tokio::spawn(dispatcher.run());

        let state = Arc::new(AppState::new(config, manager, messages));
        let router = parcelo_server::api::create_router(state);

        Self { router, carrier }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Poll a GET endpoint until the predicate holds or the timeout hits.
    pub async fn wait_for(
        &self,
        path: &str,
        predicate: impl Fn(&Value) -> bool,
        timeout: Duration,
    ) -> Value {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let response = self.get(path).await;
            if predicate(&response.body) {
                return response.body;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("Timed out waiting for {}: last body {}", path, response.body);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
