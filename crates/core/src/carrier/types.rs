//! Types for carrier operations.

use async_trait::async_trait;
use thiserror::Error;

use crate::item::Item;

/// Errors that can occur during carrier operations.
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Carrier endpoint error: {0}")]
    Endpoint(String),

    #[error("Invalid carrier response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for carrier backends.
///
/// All calls are side-effecting against the external system and carry their
/// own bounded timeout; transient failures are retried by the backend's own
/// policy before an error surfaces here. `perform_delivery` is NOT assumed
/// idempotent, so the caller must invoke it at most once per delivery cycle.
#[async_trait]
pub trait Carrier: Send + Sync {
    /// Backend name (for logging and status endpoints).
    fn name(&self) -> &str;

    /// Produce the initial batch of items for a generated run.
    async fn generate_items(&self) -> Result<Vec<Item>, CarrierError>;

    /// Attempt delivery of one item.
    async fn perform_delivery(&self, item: &Item) -> Result<(), CarrierError>;

    /// Finalize a confirmed delivery cycle, returning the completion code.
    async fn complete_delivery(&self, item: &Item) -> Result<String, CarrierError>;

    /// Reconcile a cancellation with a delivery already underway,
    /// returning the compensation code.
    async fn compensate_delivery(&self, item: &Item) -> Result<String, CarrierError>;
}
