//! Inbound message surface.
//!
//! Confirmation and cancellation messages are fire-and-forget: senders get
//! no response, and delivery into the router preserves arrival order. The
//! surface is an mpsc channel with a cheaply cloneable handle on one side
//! and a dispatcher task draining into the router on the other.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::item::ItemId;

use super::router::ConfirmationRouter;

/// An inbound delivery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMessage {
    /// Confirm the item's current delivery attempt.
    Confirm { item_id: ItemId },
    /// Cancel the item's delivery.
    Cancel { item_id: ItemId, reason: String },
}

/// Handle for sending delivery messages.
///
/// Cheaply cloneable and shareable across tasks. Sends are fire-and-forget:
/// if the dispatcher is gone the message is logged and dropped, the caller
/// is never failed.
#[derive(Clone)]
pub struct MessageHandle {
    tx: mpsc::Sender<DeliveryMessage>,
}

impl MessageHandle {
    /// Send a confirmation for an item.
    pub async fn confirm(&self, item_id: ItemId) {
        self.send(DeliveryMessage::Confirm { item_id }).await;
    }

    /// Send a cancellation for an item.
    pub async fn cancel(&self, item_id: ItemId, reason: impl Into<String>) {
        self.send(DeliveryMessage::Cancel {
            item_id,
            reason: reason.into(),
        })
        .await;
    }

    /// Try to send a message without blocking. Returns true if enqueued.
    pub fn try_send(&self, message: DeliveryMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to enqueue delivery message: {}", e);
                false
            }
        }
    }

    async fn send(&self, message: DeliveryMessage) {
        if let Err(e) = self.tx.send(message).await {
            tracing::error!("Failed to enqueue delivery message: {}", e);
        }
    }
}

/// Background task draining inbound messages into the router, in order.
pub struct MessageDispatcher {
    rx: mpsc::Receiver<DeliveryMessage>,
    router: ConfirmationRouter,
}

impl MessageDispatcher {
    /// Run the dispatcher until every `MessageHandle` is dropped.
    ///
    /// Spawn this as a background task.
    pub async fn run(mut self) {
        info!("Message dispatcher started");

        while let Some(message) = self.rx.recv().await {
            debug!("Dispatching {:?}", message);
            match message {
                DeliveryMessage::Confirm { item_id } => {
                    self.router.confirm_delivery(item_id).await;
                }
                DeliveryMessage::Cancel { item_id, reason } => {
                    self.router.cancel_delivery(item_id, reason).await;
                }
            }
        }

        info!("Message dispatcher shutting down");
    }
}

/// Create the inbound message surface for a router.
///
/// Returns the handle (clone to share) and the dispatcher (spawn with
/// `tokio::spawn(dispatcher.run())`).
pub fn create_message_inbox(
    router: ConfirmationRouter,
    buffer_size: usize,
) -> (MessageHandle, MessageDispatcher) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (MessageHandle { tx }, MessageDispatcher { rx, router })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::RwLock;

    use super::super::entry::ItemEntry;
    use super::super::manager::SharedRegistry;
    use super::*;
    use crate::item::Item;

    fn inbox_with_item(id: u64) -> (MessageHandle, MessageDispatcher, Arc<ItemEntry>) {
        let entry = Arc::new(ItemEntry::new(Item::new(id, "payload")));
        let mut map = HashMap::new();
        map.insert(ItemId(id), Arc::clone(&entry));
        let registry: SharedRegistry = Arc::new(RwLock::new(map));
        let router = ConfirmationRouter::new(registry);
        let (handle, dispatcher) = create_message_inbox(router, 16);
        (handle, dispatcher, entry)
    }

    #[tokio::test]
    async fn test_confirm_message_reaches_item() {
        let (handle, dispatcher, entry) = inbox_with_item(1);
        let dispatcher_task = tokio::spawn(dispatcher.run());

        handle.confirm(ItemId(1)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut rx = entry.subscribe_confirmed();
        assert!(*rx.borrow_and_update());

        drop(handle);
        dispatcher_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_messages_dispatched_in_order() {
        let (handle, dispatcher, entry) = inbox_with_item(1);

        // Enqueue before the dispatcher runs: cancel after confirm.
        handle.confirm(ItemId(1)).await;
        handle.cancel(ItemId(1), "late abort").await;
        drop(handle);

        dispatcher.run().await;

        let mut confirmed = entry.subscribe_confirmed();
        assert!(*confirmed.borrow_and_update());
        let request = entry.subscribe_cancel().borrow().clone();
        assert_eq!(request.map(|r| r.reason), Some("late abort".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_ids_never_fail_the_sender() {
        let (handle, dispatcher, _entry) = inbox_with_item(1);
        let dispatcher_task = tokio::spawn(dispatcher.run());

        handle.confirm(ItemId(404)).await;
        handle.cancel(ItemId(404), "nobody home").await;

        drop(handle);
        dispatcher_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_after_dispatcher_gone_is_logged_not_fatal() {
        let (handle, dispatcher, _entry) = inbox_with_item(1);
        drop(dispatcher);

        // Must not panic.
        handle.confirm(ItemId(1)).await;
        assert!(!handle.try_send(DeliveryMessage::Confirm { item_id: ItemId(1) }));
    }
}
