//! Per-item delivery process.
//!
//! One `ItemProcess` task drives one item through repeated delivery cycles:
//! perform the delivery, wait for the external confirmation, finalize the
//! cycle at the carrier, and loop until the carrier returns a terminal
//! completion code. Cancellation is cooperative: it is observed at the
//! suspension points of this loop, never by preempting an in-flight
//! carrier call.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::carrier::Carrier;
use crate::metrics;

use super::config::DeliveryConfig;
use super::entry::ItemEntry;
use super::types::{CancelRequest, ItemOutcome, ItemState};

/// What ended one confirmation wait.
enum Wakeup {
    Confirmed,
    Cancelled(CancelRequest),
    DeadlineElapsed,
    /// Registry gone while we were waiting; cannot happen while the entry
    /// is registered, handled as a process failure rather than a panic.
    Disconnected,
}

/// State machine task bound 1:1 to an item.
pub(crate) struct ItemProcess {
    entry: Arc<ItemEntry>,
    carrier: Arc<dyn Carrier>,
    config: DeliveryConfig,
}

impl ItemProcess {
    pub(crate) fn new(
        entry: Arc<ItemEntry>,
        carrier: Arc<dyn Carrier>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            entry,
            carrier,
            config,
        }
    }

    /// Drive the item to a terminal state and resolve its completion signal.
    pub(crate) async fn run(self) {
        let id = self.entry.item().id;
        let outcome = self.drive().await;

        metrics::ITEMS_COMPLETED
            .with_label_values(&[outcome.outcome_type()])
            .inc();

        let final_state = match &outcome {
            ItemOutcome::Delivered { code } => ItemState::Done {
                code: code.clone(),
                completed_at: Utc::now(),
            },
            ItemOutcome::Cancelled { reason } => ItemState::Cancelled {
                reason: reason.clone(),
                cancelled_at: Utc::now(),
            },
            ItemOutcome::Failed { error } => ItemState::Failed {
                error: error.clone(),
                failed_at: Utc::now(),
            },
        };
        self.entry.set_state(final_state).await;

        // State write first, so queries woken by the signal already see
        // the terminal state.
        if !self.entry.resolve(outcome.clone()) {
            warn!("Item {} resolved twice, keeping first outcome", id);
        }

        debug!("Item {} finished: {}", id, outcome.outcome_type());
    }

    async fn drive(&self) -> ItemOutcome {
        let item = self.entry.item().clone();
        let mut confirmed_rx = self.entry.subscribe_confirmed();
        let mut cancel_rx = self.entry.subscribe_cancel();
        let mut cycle: u32 = 1;

        loop {
            // Cancellation observed between cycles: nothing is in flight,
            // so no compensation is owed.
            let pending_cancel = cancel_rx.borrow_and_update().clone();
            if let Some(request) = pending_cancel {
                return self.cancelled(request, false).await;
            }

            self.entry
                .set_state(ItemState::DeliveryInFlight {
                    cycle,
                    started_at: Utc::now(),
                })
                .await;
            metrics::DELIVERY_ATTEMPTS.inc();

            if let Err(e) = self.carrier.perform_delivery(&item).await {
                warn!("Delivery attempt for item {} failed: {}", item.id, e);
                return ItemOutcome::Failed {
                    error: format!("perform_delivery: {}", e),
                };
            }

            self.entry
                .set_state(ItemState::AwaitingConfirmation {
                    cycle,
                    since: Utc::now(),
                })
                .await;

            match self
                .await_confirmation(&mut confirmed_rx, &mut cancel_rx)
                .await
            {
                Wakeup::Confirmed => {}
                Wakeup::Cancelled(request) => {
                    // The delivery for this cycle is already underway.
                    return self.cancelled(request, true).await;
                }
                Wakeup::DeadlineElapsed => {
                    debug!(
                        "Item {} confirmation deadline elapsed in cycle {}, still pending",
                        item.id, cycle
                    );
                    cycle += 1;
                    continue;
                }
                Wakeup::Disconnected => {
                    return ItemOutcome::Failed {
                        error: "confirmation channel closed".to_string(),
                    };
                }
            }

            self.entry
                .set_state(ItemState::CompletingDelivery {
                    cycle,
                    started_at: Utc::now(),
                })
                .await;

            let code = match self.carrier.complete_delivery(&item).await {
                Ok(code) => code,
                Err(e) => {
                    warn!("Completing delivery for item {} failed: {}", item.id, e);
                    return ItemOutcome::Failed {
                        error: format!("complete_delivery: {}", e),
                    };
                }
            };

            // The confirmation is consumed by this cycle either way.
            self.entry.reset_confirmation();

            if code == self.config.retry_code {
                debug!(
                    "Item {} confirmed but cycle {} not final (code {}), retrying",
                    item.id, cycle, code
                );
                cycle += 1;
                continue;
            }

            metrics::DELIVERY_CYCLES.observe(cycle as f64);
            return ItemOutcome::Delivered { code };
        }
    }

    /// Suspend until confirmed or cancelled, bounded by the configured
    /// confirmation deadline when one is set.
    async fn await_confirmation(
        &self,
        confirmed_rx: &mut watch::Receiver<bool>,
        cancel_rx: &mut watch::Receiver<Option<CancelRequest>>,
    ) -> Wakeup {
        let wait = Self::confirmation_or_cancel(confirmed_rx, cancel_rx);
        match self.config.confirmation_deadline() {
            Some(deadline) => match tokio::time::timeout(deadline, wait).await {
                Ok(wakeup) => wakeup,
                Err(_) => Wakeup::DeadlineElapsed,
            },
            None => wait.await,
        }
    }

    async fn confirmation_or_cancel(
        confirmed_rx: &mut watch::Receiver<bool>,
        cancel_rx: &mut watch::Receiver<Option<CancelRequest>>,
    ) -> Wakeup {
        loop {
            // Current values first: a message that landed before this wait
            // (or between iterations) is picked up here, not lost.
            if let Some(request) = cancel_rx.borrow_and_update().clone() {
                return Wakeup::Cancelled(request);
            }
            if *confirmed_rx.borrow_and_update() {
                return Wakeup::Confirmed;
            }

            let changed = tokio::select! {
                changed = confirmed_rx.changed() => changed,
                changed = cancel_rx.changed() => changed,
            };
            if changed.is_err() {
                return Wakeup::Disconnected;
            }
        }
    }

    async fn cancelled(&self, request: CancelRequest, delivery_underway: bool) -> ItemOutcome {
        let item = self.entry.item();

        if delivery_underway {
            match self.carrier.compensate_delivery(item).await {
                Ok(code) => debug!("Item {} compensated with code {}", item.id, code),
                // Compensation failure never blocks the cancellation itself.
                Err(e) => warn!("Compensation for item {} failed: {}", item.id, e),
            }
        }

        ItemOutcome::Cancelled {
            reason: request.reason,
        }
    }
}
