//! Per-item runtime cell and completion signal.
//!
//! An `ItemEntry` is the registry's view of one live item: the item value,
//! its current state, and the three watch channels that connect the router
//! and the aggregator to the item's process task. All channel senders live
//! here, so a registered entry keeps every signal alive for as long as the
//! registry does.

use chrono::Utc;
use tokio::sync::{watch, RwLock};

use crate::item::Item;

use super::types::{CancelRequest, ItemOutcome, ItemState};

/// Runtime cell for one registered item.
///
/// The confirmation flag and the cancel request are `watch` channels: a
/// writer sets the value first, and a waiter's `wait_for` inspects the
/// current value before suspending, so a message that arrives before the
/// process starts waiting is still observed (set-then-check, never
/// check-then-set).
pub(crate) struct ItemEntry {
    item: Item,
    state: RwLock<ItemState>,
    confirmed: watch::Sender<bool>,
    cancel: watch::Sender<Option<CancelRequest>>,
    outcome: watch::Sender<Option<ItemOutcome>>,
}

impl ItemEntry {
    pub(crate) fn new(item: Item) -> Self {
        let (confirmed, _) = watch::channel(false);
        let (cancel, _) = watch::channel(None);
        let (outcome, _) = watch::channel(None);

        Self {
            item,
            state: RwLock::new(ItemState::Pending),
            confirmed,
            cancel,
            outcome,
        }
    }

    pub(crate) fn item(&self) -> &Item {
        &self.item
    }

    pub(crate) async fn state(&self) -> ItemState {
        self.state.read().await.clone()
    }

    pub(crate) async fn set_state(&self, state: ItemState) {
        *self.state.write().await = state;
    }

    /// Mark the item confirmed. Idempotent: repeated confirmations before
    /// the process consumes the flag collapse into one.
    pub(crate) fn confirm(&self) {
        self.confirmed.send_replace(true);
    }

    /// Clear the confirmation flag after a consumed delivery cycle.
    pub(crate) fn reset_confirmation(&self) {
        self.confirmed.send_replace(false);
    }

    /// Record a cancellation request if the item is still unresolved.
    /// Returns false (and does nothing) when the completion signal has
    /// already resolved, or when a cancellation is already pending.
    pub(crate) fn request_cancel(&self, request: CancelRequest) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.cancel.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(request);
                true
            } else {
                false
            }
        })
    }

    /// True once the completion signal carries a terminal outcome.
    pub(crate) fn is_resolved(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Resolve the completion signal. First writer wins; returns whether
    /// this call was the one that resolved it.
    pub(crate) fn resolve(&self, outcome: ItemOutcome) -> bool {
        self.outcome.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(outcome);
                true
            } else {
                false
            }
        })
    }

    /// Peek at the resolved outcome, if any.
    pub(crate) fn outcome(&self) -> Option<ItemOutcome> {
        self.outcome.borrow().clone()
    }

    /// A fresh completion signal for this item.
    pub(crate) fn signal(&self) -> CompletionSignal {
        CompletionSignal {
            rx: self.outcome.subscribe(),
        }
    }

    pub(crate) fn subscribe_confirmed(&self) -> watch::Receiver<bool> {
        self.confirmed.subscribe()
    }

    pub(crate) fn subscribe_cancel(&self) -> watch::Receiver<Option<CancelRequest>> {
        self.cancel.subscribe()
    }

    /// Resolve as failed and stamp the matching terminal state.
    /// Used when the process task itself dies unexpectedly.
    pub(crate) async fn resolve_failed(&self, error: impl Into<String>) {
        let error = error.into();
        if self.resolve(ItemOutcome::Failed {
            error: error.clone(),
        }) {
            self.set_state(ItemState::Failed {
                error,
                failed_at: Utc::now(),
            })
            .await;
        }
    }
}

/// Future-like handle resolved exactly once when an item process reaches a
/// terminal state. Cheap to create; any number can exist per item.
pub struct CompletionSignal {
    rx: watch::Receiver<Option<ItemOutcome>>,
}

impl CompletionSignal {
    /// Wait until the item resolves and return its terminal outcome.
    pub async fn wait(mut self) -> ItemOutcome {
        match self.rx.wait_for(|outcome| outcome.is_some()).await {
            Ok(outcome) => outcome
                .clone()
                .unwrap_or_else(|| ItemOutcome::Failed {
                    error: "completion signal resolved empty".to_string(),
                }),
            // Sender dropped unresolved: the registry entry is gone.
            Err(_) => ItemOutcome::Failed {
                error: "item process dropped before resolving".to_string(),
            },
        }
    }

    /// True once the signal has resolved.
    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The resolved outcome, if available.
    pub fn peek(&self) -> Option<ItemOutcome> {
        self.rx.borrow().clone()
    }
}
