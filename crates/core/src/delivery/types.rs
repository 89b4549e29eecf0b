//! Types for the delivery orchestration core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::ItemId;

/// Errors that can occur while orchestrating deliveries.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// An item with this id is already registered.
    #[error("item already introduced: {0}")]
    DuplicateItem(ItemId),

    /// Carrier error while producing the initial batch.
    #[error("carrier error: {0}")]
    Carrier(#[from] crate::carrier::CarrierError),
}

/// A cancellation request delivered to an item process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Why the cancellation was requested.
    pub reason: String,
    /// When the request was routed.
    pub requested_at: DateTime<Utc>,
}

impl CancelRequest {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            requested_at: Utc::now(),
        }
    }
}

/// Current state of an item process.
///
/// State machine flow:
/// ```text
/// Pending -> DeliveryInFlight -> AwaitingConfirmation -> CompletingDelivery
///                 ^                                            |
///                 |          (completion code == retry)        |
///                 +--------------------------------------------+
///                                                              |
///                                  (any other code)            v
///                                                            Done
///
/// Any non-Done state can transition to Cancelled; a carrier call that
/// fails past its own retry policy transitions to Failed.
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemState {
    /// Process created, first delivery cycle not started yet.
    Pending,

    /// A delivery attempt is running at the carrier.
    DeliveryInFlight {
        /// Delivery cycle number (1-based, bumped on each retry).
        cycle: u32,
        started_at: DateTime<Utc>,
    },

    /// Delivered, waiting for the external confirmation message.
    AwaitingConfirmation {
        cycle: u32,
        since: DateTime<Utc>,
    },

    /// Confirmation received, finalizing the cycle at the carrier.
    CompletingDelivery {
        cycle: u32,
        started_at: DateTime<Utc>,
    },

    /// Terminal: delivery finished with a completion code.
    Done {
        code: String,
        completed_at: DateTime<Utc>,
    },

    /// Terminal: cancelled before completion.
    Cancelled {
        reason: String,
        cancelled_at: DateTime<Utc>,
    },

    /// Terminal: a carrier call failed past its retry policy.
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl ItemState {
    /// Returns the state type as a string (for filtering/metrics).
    pub fn state_type(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::DeliveryInFlight { .. } => "delivery_in_flight",
            ItemState::AwaitingConfirmation { .. } => "awaiting_confirmation",
            ItemState::CompletingDelivery { .. } => "completing_delivery",
            ItemState::Done { .. } => "done",
            ItemState::Cancelled { .. } => "cancelled",
            ItemState::Failed { .. } => "failed",
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Done { .. } | ItemState::Cancelled { .. } | ItemState::Failed { .. }
        )
    }

    /// Returns true if the process is waiting for a confirmation message.
    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, ItemState::AwaitingConfirmation { .. })
    }
}

/// Terminal outcome of one item process, carried by its completion signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Delivery finished with the carrier's completion code.
    Delivered { code: String },
    /// Cancelled before completion.
    Cancelled { reason: String },
    /// The process hit an unrecoverable error.
    Failed { error: String },
}

impl ItemOutcome {
    /// Returns the outcome type as a string (for metrics and API responses).
    pub fn outcome_type(&self) -> &'static str {
        match self {
            ItemOutcome::Delivered { .. } => "delivered",
            ItemOutcome::Cancelled { .. } => "cancelled",
            ItemOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one item within a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: ItemId,
    pub outcome: ItemOutcome,
}

/// Aggregate result of a batch: every introduced item in a terminal state.
///
/// Partial failure is per-item data, not an error; the batch itself always
/// resolves once all completion signals do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub items: Vec<ItemResult>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn delivered_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Delivered { .. }))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Cancelled { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    /// True when every item finished with a delivered outcome.
    pub fn is_all_delivered(&self) -> bool {
        self.delivered_count() == self.items.len()
    }

    /// Look up the outcome recorded for one item.
    pub fn outcome_of(&self, id: ItemId) -> Option<&ItemOutcome> {
        self.items.iter().find(|r| r.id == id).map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Per-state item counts, for status endpoints and gauges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Total items ever introduced.
    pub total: usize,
    pub pending: usize,
    pub delivery_in_flight: usize,
    pub awaiting_confirmation: usize,
    pub completing_delivery: usize,
    pub done: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl DeliveryStatus {
    /// Items that have not reached a terminal state yet.
    pub fn in_progress(&self) -> usize {
        self.total - self.done - self.cancelled - self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_type_strings() {
        assert_eq!(ItemState::Pending.state_type(), "pending");
        assert_eq!(
            ItemState::Done {
                code: "Confirmed".to_string(),
                completed_at: Utc::now(),
            }
            .state_type(),
            "done"
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ItemState::Pending.is_terminal());
        assert!(!ItemState::AwaitingConfirmation {
            cycle: 1,
            since: Utc::now(),
        }
        .is_terminal());
        assert!(ItemState::Cancelled {
            reason: "timeout".to_string(),
            cancelled_at: Utc::now(),
        }
        .is_terminal());
        assert!(ItemState::Failed {
            error: "boom".to_string(),
            failed_at: Utc::now(),
        }
        .is_terminal());
    }

    #[test]
    fn test_state_serialization() {
        let state = ItemState::AwaitingConfirmation {
            cycle: 2,
            since: Utc::now(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"awaiting_confirmation\""));
        let parsed: ItemState = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_awaiting_confirmation());
    }

    #[test]
    fn test_batch_outcome_counts() {
        let batch = BatchOutcome {
            items: vec![
                ItemResult {
                    id: ItemId(1),
                    outcome: ItemOutcome::Delivered {
                        code: "Confirmed".to_string(),
                    },
                },
                ItemResult {
                    id: ItemId(2),
                    outcome: ItemOutcome::Cancelled {
                        reason: "timeout".to_string(),
                    },
                },
                ItemResult {
                    id: ItemId(3),
                    outcome: ItemOutcome::Delivered {
                        code: "Confirmed".to_string(),
                    },
                },
            ],
        };

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.delivered_count(), 2);
        assert_eq!(batch.cancelled_count(), 1);
        assert_eq!(batch.failed_count(), 0);
        assert!(!batch.is_all_delivered());
        assert!(matches!(
            batch.outcome_of(ItemId(2)),
            Some(ItemOutcome::Cancelled { .. })
        ));
        assert_eq!(batch.outcome_of(ItemId(9)), None);
    }

    #[test]
    fn test_error_display() {
        let err = DeliveryError::DuplicateItem(ItemId(4));
        assert_eq!(err.to_string(), "item already introduced: 4");
    }

    #[test]
    fn test_delivery_status_in_progress() {
        let status = DeliveryStatus {
            total: 5,
            done: 2,
            cancelled: 1,
            ..Default::default()
        };
        assert_eq!(status.in_progress(), 2);
    }
}
