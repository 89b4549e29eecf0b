//! In-process carrier that acknowledges everything immediately.
//!
//! Useful for demos and integration tests: deliveries are log statements,
//! completion always returns the configured confirmation code. Items still
//! wait for an external confirmation message, so the orchestration flow is
//! exercised end to end without a real carrier service.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::item::Item;

use super::{Carrier, CarrierError};

/// Carrier that performs deliveries instantly and completes with a fixed code.
pub struct InstantCarrier {
    confirmation_code: String,
    items: RwLock<Vec<Item>>,
}

impl InstantCarrier {
    /// Create an instant carrier completing with the given code.
    pub fn new(confirmation_code: impl Into<String>) -> Self {
        Self {
            confirmation_code: confirmation_code.into(),
            items: RwLock::new(Vec::new()),
        }
    }

    /// Preset the batch returned by `generate_items`.
    pub fn with_items(self, items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
            ..self
        }
    }
}

#[async_trait]
impl Carrier for InstantCarrier {
    fn name(&self) -> &str {
        "instant"
    }

    async fn generate_items(&self) -> Result<Vec<Item>, CarrierError> {
        Ok(self.items.read().await.clone())
    }

    async fn perform_delivery(&self, item: &Item) -> Result<(), CarrierError> {
        debug!("Instant delivery of item {} ({})", item.id, item.payload);
        Ok(())
    }

    async fn complete_delivery(&self, item: &Item) -> Result<String, CarrierError> {
        debug!("Instant completion of item {}", item.id);
        Ok(self.confirmation_code.clone())
    }

    async fn compensate_delivery(&self, item: &Item) -> Result<String, CarrierError> {
        debug!("Instant compensation of item {}", item.id);
        Ok("Compensated".to_string())
    }
}
