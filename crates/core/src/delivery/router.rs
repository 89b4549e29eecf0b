//! Confirmation router.
//!
//! Translates externally received confirmation/cancellation messages into
//! mutations on the right item process, by id. The router owns nothing but
//! a reference to the manager's registry; dispatch is a single map lookup.

use tracing::{debug, info};

use crate::item::ItemId;
use crate::metrics;

use super::manager::SharedRegistry;
use super::types::CancelRequest;

/// Routes confirmation and cancellation messages to item processes.
///
/// Messages for unknown ids are not an error: they may belong to items
/// never introduced in this run, or arrive after an entry was dropped.
/// They are logged and counted, nothing more.
#[derive(Clone)]
pub struct ConfirmationRouter {
    registry: SharedRegistry,
}

impl ConfirmationRouter {
    pub(crate) fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Mark an item's current delivery attempt as confirmed.
    pub async fn confirm_delivery(&self, item_id: ItemId) {
        let entry = self.registry.read().await.get(&item_id).cloned();
        match entry {
            Some(entry) => {
                entry.confirm();
                metrics::CONFIRMATIONS_ROUTED
                    .with_label_values(&["routed"])
                    .inc();
                debug!("Confirmation routed to item {}", item_id);
            }
            None => {
                metrics::CONFIRMATIONS_ROUTED
                    .with_label_values(&["unknown"])
                    .inc();
                debug!("Ignoring confirmation for unknown item {}", item_id);
            }
        }
    }

    /// Request cancellation of an item's delivery.
    ///
    /// A no-op when the item is unknown or its completion signal already
    /// resolved; the race against natural completion always goes to
    /// whichever transition resolved the signal first.
    pub async fn cancel_delivery(&self, item_id: ItemId, reason: impl Into<String>) {
        let entry = self.registry.read().await.get(&item_id).cloned();
        match entry {
            Some(entry) => {
                if entry.request_cancel(CancelRequest::new(reason)) {
                    metrics::CANCELLATIONS_ROUTED
                        .with_label_values(&["routed"])
                        .inc();
                    debug!("Cancellation routed to item {}", item_id);
                } else {
                    metrics::CANCELLATIONS_ROUTED
                        .with_label_values(&["resolved"])
                        .inc();
                    info!(
                        "Ignoring cancellation for item {}: already resolved",
                        item_id
                    );
                }
            }
            None => {
                metrics::CANCELLATIONS_ROUTED
                    .with_label_values(&["unknown"])
                    .inc();
                debug!("Ignoring cancellation for unknown item {}", item_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use tokio::sync::RwLock;

    use super::super::entry::ItemEntry;
    use super::super::types::ItemOutcome;
    use super::*;
    use crate::item::Item;

    fn router_with_item(id: u64) -> (ConfirmationRouter, Arc<ItemEntry>) {
        let entry = Arc::new(ItemEntry::new(Item::new(id, "payload")));
        let mut map = HashMap::new();
        map.insert(ItemId(id), Arc::clone(&entry));
        let registry: SharedRegistry = Arc::new(RwLock::new(map));
        (ConfirmationRouter::new(registry), entry)
    }

    #[tokio::test]
    async fn test_confirm_sets_flag() {
        let (router, entry) = router_with_item(1);

        router.confirm_delivery(ItemId(1)).await;

        let mut rx = entry.subscribe_confirmed();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_confirm_unknown_id_is_silent() {
        let (router, entry) = router_with_item(1);

        router.confirm_delivery(ItemId(99)).await;

        // The registered item is untouched.
        let mut rx = entry.subscribe_confirmed();
        assert!(!*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_silent() {
        let (router, entry) = router_with_item(1);

        router.cancel_delivery(ItemId(99), "nope").await;

        assert!(entry.subscribe_cancel().borrow().is_none());
    }

    #[tokio::test]
    async fn test_cancel_routes_request() {
        let (router, entry) = router_with_item(1);

        router.cancel_delivery(ItemId(1), "timeout").await;

        let request = entry.subscribe_cancel().borrow().clone();
        assert_eq!(request.map(|r| r.reason), Some("timeout".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_after_resolution_keeps_outcome() {
        let (router, entry) = router_with_item(1);
        entry.resolve(ItemOutcome::Delivered {
            code: "Confirmed".to_string(),
        });

        router.cancel_delivery(ItemId(1), "too late").await;

        assert_eq!(
            entry.outcome(),
            Some(ItemOutcome::Delivered {
                code: "Confirmed".to_string(),
            })
        );
        assert!(entry.subscribe_cancel().borrow().is_none());
    }
}
