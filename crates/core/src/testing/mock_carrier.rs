//! Mock carrier for testing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::carrier::{Carrier, CarrierError};
use crate::item::{Item, ItemId};

/// A recorded carrier call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Operation name ("perform", "complete", "compensate").
    pub operation: &'static str,
    /// Item the call was made for.
    pub item_id: ItemId,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
}

/// Mock implementation of the `Carrier` trait.
///
/// Provides controllable behavior for testing:
/// - Record every carrier call for assertions
/// - Script per-item completion codes (retry cycles, custom terminals)
/// - Simulate failures, globally or per item
#[derive(Debug, Default)]
pub struct MockCarrier {
    /// Recorded calls, in order.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Batch returned by `generate_items`.
    items: Arc<RwLock<Vec<Item>>>,
    /// Scripted completion codes per item, consumed front to back.
    completion_codes: Arc<RwLock<HashMap<ItemId, VecDeque<String>>>>,
    /// Items whose delivery attempts always fail.
    failing_deliveries: Arc<RwLock<HashSet<ItemId>>>,
    /// If set, the next operation fails with this error.
    next_error: Arc<RwLock<Option<CarrierError>>>,
}

impl MockCarrier {
    /// Create a new mock carrier. Completions default to `"Confirmed"`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch returned by `generate_items`.
    pub async fn set_items(&self, items: Vec<Item>) {
        *self.items.write().await = items;
    }

    /// Script the completion codes returned for an item, in order.
    /// Once the script runs out, completions return `"Confirmed"` again.
    pub async fn script_completion_codes(&self, id: ItemId, codes: Vec<&str>) {
        self.completion_codes
            .write()
            .await
            .insert(id, codes.into_iter().map(String::from).collect());
    }

    /// Make every delivery attempt for this item fail.
    pub async fn fail_delivery_for(&self, id: ItemId) {
        self.failing_deliveries.write().await.insert(id);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CarrierError) {
        *self.next_error.write().await = Some(error);
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of delivery attempts performed for an item.
    pub async fn performed_count(&self, id: ItemId) -> usize {
        self.count_calls("perform", id).await
    }

    /// Number of completions performed for an item.
    pub async fn completed_count(&self, id: ItemId) -> usize {
        self.count_calls("complete", id).await
    }

    /// Items that have been compensated.
    pub async fn compensated_ids(&self) -> Vec<ItemId> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.operation == "compensate")
            .map(|call| call.item_id)
            .collect()
    }

    async fn count_calls(&self, operation: &str, id: ItemId) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.operation == operation && call.item_id == id)
            .count()
    }

    async fn record(&self, operation: &'static str, item_id: ItemId) {
        self.calls.write().await.push(RecordedCall {
            operation,
            item_id,
            timestamp: Utc::now(),
        });
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<CarrierError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Carrier for MockCarrier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_items(&self) -> Result<Vec<Item>, CarrierError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(self.items.read().await.clone())
    }

    async fn perform_delivery(&self, item: &Item) -> Result<(), CarrierError> {
        self.record("perform", item.id).await;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.failing_deliveries.read().await.contains(&item.id) {
            return Err(CarrierError::ConnectionFailed(format!(
                "scripted delivery failure for item {}",
                item.id
            )));
        }
        Ok(())
    }

    async fn complete_delivery(&self, item: &Item) -> Result<String, CarrierError> {
        self.record("complete", item.id).await;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut scripts = self.completion_codes.write().await;
        let code = scripts
            .get_mut(&item.id)
            .and_then(|codes| codes.pop_front())
            .unwrap_or_else(|| "Confirmed".to_string());
        Ok(code)
    }

    async fn compensate_delivery(&self, item: &Item) -> Result<String, CarrierError> {
        self.record("compensate", item.id).await;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok("Compensated".to_string())
    }
}
