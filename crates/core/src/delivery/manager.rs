//! Item process manager.
//!
//! Owns the registry mapping item id to live process entry. `introduce` is
//! the registry's only writer; the router, the aggregator and diagnostic
//! queries are read-only consumers, so a single `RwLock` with one writer
//! and many readers is all the coordination needed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::carrier::Carrier;
use crate::item::{Item, ItemId};
use crate::metrics;

use super::config::DeliveryConfig;
use super::entry::{CompletionSignal, ItemEntry};
use super::process::ItemProcess;
use super::router::ConfirmationRouter;
use super::types::{DeliveryError, DeliveryStatus, ItemOutcome, ItemState};

/// The registry: insert-only, shared between the manager (writer) and the
/// router/aggregator/queries (readers). Stale terminal entries are harmless
/// and never evicted.
pub(crate) type SharedRegistry = Arc<RwLock<HashMap<ItemId, Arc<ItemEntry>>>>;

/// Creates, registers and tracks item processes.
pub struct ItemProcessManager {
    carrier: Arc<dyn Carrier>,
    config: DeliveryConfig,
    registry: SharedRegistry,
}

impl ItemProcessManager {
    /// Create a manager driving deliveries through the given carrier.
    pub fn new(carrier: Arc<dyn Carrier>, config: DeliveryConfig) -> Self {
        Self {
            carrier,
            config,
            registry: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A router dispatching into this manager's registry.
    pub fn router(&self) -> ConfirmationRouter {
        ConfirmationRouter::new(Arc::clone(&self.registry))
    }

    /// Introduce one item: register it, spawn its process, and return the
    /// completion signal that resolves when the process reaches a terminal
    /// state. The only failure is a duplicate id.
    pub async fn introduce(&self, item: Item) -> Result<CompletionSignal, DeliveryError> {
        let id = item.id;
        let entry = {
            let mut registry = self.registry.write().await;
            if registry.contains_key(&id) {
                return Err(DeliveryError::DuplicateItem(id));
            }
            let entry = Arc::new(ItemEntry::new(item));
            registry.insert(id, Arc::clone(&entry));
            entry
        };

        let signal = entry.signal();
        let process = ItemProcess::new(
            Arc::clone(&entry),
            Arc::clone(&self.carrier),
            self.config.clone(),
        );

        // Supervised spawn: a panicked process must still resolve its
        // signal, or the aggregator would wait on it forever.
        tokio::spawn(async move {
            if tokio::spawn(process.run()).await.is_err() {
                entry.resolve_failed("item process panicked").await;
            }
        });

        metrics::ITEMS_INTRODUCED.inc();
        debug!("Introduced item {}", id);
        Ok(signal)
    }

    /// Ask the carrier for the initial batch and introduce every item.
    pub async fn introduce_generated(
        &self,
    ) -> Result<Vec<(ItemId, CompletionSignal)>, DeliveryError> {
        let items = self.carrier.generate_items().await?;

        let mut signals = Vec::with_capacity(items.len());
        for item in items {
            let id = item.id;
            let signal = self.introduce(item).await?;
            signals.push((id, signal));
        }
        Ok(signals)
    }

    /// Items whose process state currently satisfies the predicate.
    pub async fn query<F>(&self, predicate: F) -> Vec<Item>
    where
        F: Fn(&ItemState) -> bool,
    {
        let registry = self.registry.read().await;
        let mut items = Vec::new();
        for entry in registry.values() {
            if predicate(&entry.state().await) {
                items.push(entry.item().clone());
            }
        }
        items.sort_by_key(|item| item.id);
        items
    }

    /// Items currently awaiting an external confirmation.
    pub async fn pending_confirmation(&self) -> Vec<Item> {
        self.query(ItemState::is_awaiting_confirmation).await
    }

    /// Look up a registered item by id.
    pub async fn item_of(&self, id: ItemId) -> Option<Item> {
        let registry = self.registry.read().await;
        registry.get(&id).map(|entry| entry.item().clone())
    }

    /// Current state of one item, if registered.
    pub async fn state_of(&self, id: ItemId) -> Option<ItemState> {
        let entry = self.registry.read().await.get(&id).cloned();
        match entry {
            Some(entry) => Some(entry.state().await),
            None => None,
        }
    }

    /// Resolved outcome of one item, if it reached a terminal state.
    pub async fn outcome_of(&self, id: ItemId) -> Option<ItemOutcome> {
        let registry = self.registry.read().await;
        registry.get(&id).and_then(|entry| entry.outcome())
    }

    /// A fresh completion signal for an already-registered item.
    pub async fn signal_of(&self, id: ItemId) -> Option<CompletionSignal> {
        let registry = self.registry.read().await;
        registry.get(&id).map(|entry| entry.signal())
    }

    /// Per-state counts across the whole registry.
    pub async fn status(&self) -> DeliveryStatus {
        let registry = self.registry.read().await;
        let mut status = DeliveryStatus {
            total: registry.len(),
            ..Default::default()
        };
        for entry in registry.values() {
            match entry.state().await {
                ItemState::Pending => status.pending += 1,
                ItemState::DeliveryInFlight { .. } => status.delivery_in_flight += 1,
                ItemState::AwaitingConfirmation { .. } => status.awaiting_confirmation += 1,
                ItemState::CompletingDelivery { .. } => status.completing_delivery += 1,
                ItemState::Done { .. } => status.done += 1,
                ItemState::Cancelled { .. } => status.cancelled += 1,
                ItemState::Failed { .. } => status.failed += 1,
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::MockCarrier;

    fn manager() -> (ItemProcessManager, Arc<MockCarrier>) {
        let carrier = Arc::new(MockCarrier::new());
        let manager = ItemProcessManager::new(
            Arc::clone(&carrier) as Arc<dyn Carrier>,
            DeliveryConfig::default(),
        );
        (manager, carrier)
    }

    #[tokio::test]
    async fn test_introduce_rejects_duplicate_id() {
        let (manager, _carrier) = manager();

        manager.introduce(Item::new(1u64, "a")).await.unwrap();
        let result = manager.introduce(Item::new(1u64, "b")).await;

        assert!(matches!(result, Err(DeliveryError::DuplicateItem(id)) if id == ItemId(1)));
    }

    #[tokio::test]
    async fn test_introduce_spawns_live_process() {
        let (manager, _carrier) = manager();
        let signal = manager.introduce(Item::new(1u64, "a")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let pending = manager.pending_confirmation().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, ItemId(1));

        manager.router().confirm_delivery(ItemId(1)).await;
        let outcome = tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("process did not finish");
        assert_eq!(outcome.outcome_type(), "delivered");
    }

    #[tokio::test]
    async fn test_introduce_generated_uses_carrier_batch() {
        let (manager, carrier) = manager();
        carrier
            .set_items(vec![Item::new(1u64, "a"), Item::new(2u64, "b")])
            .await;

        let signals = manager.introduce_generated().await.unwrap();
        assert_eq!(signals.len(), 2);

        let status = manager.status().await;
        assert_eq!(status.total, 2);
    }

    #[tokio::test]
    async fn test_query_by_state() {
        let (manager, _carrier) = manager();
        manager.introduce(Item::new(1u64, "a")).await.unwrap();
        manager.introduce(Item::new(2u64, "b")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let awaiting = manager
            .query(|state| state.is_awaiting_confirmation())
            .await;
        assert_eq!(awaiting.len(), 2);

        let done = manager.query(|state| state.is_terminal()).await;
        assert!(done.is_empty());
    }

    #[tokio::test]
    async fn test_state_and_outcome_lookups() {
        let (manager, _carrier) = manager();
        let signal = manager.introduce(Item::new(7u64, "x")).await.unwrap();

        assert!(manager.state_of(ItemId(7)).await.is_some());
        assert!(manager.state_of(ItemId(8)).await.is_none());
        assert!(manager.outcome_of(ItemId(7)).await.is_none());

        manager.router().confirm_delivery(ItemId(7)).await;
        signal.wait().await;

        assert!(matches!(
            manager.outcome_of(ItemId(7)).await,
            Some(ItemOutcome::Delivered { .. })
        ));
    }
}
