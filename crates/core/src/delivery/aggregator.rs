//! Completion aggregator.
//!
//! Collects the completion signals handed out by `introduce` and blocks
//! until every one of them resolves, in whatever order that happens. The
//! wait set is re-drained after each round, so signals registered while a
//! wait is already in progress (dynamically added items) are picked up too.

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

use crate::item::ItemId;

use super::entry::CompletionSignal;
use super::types::{BatchOutcome, ItemResult};

/// Waits for all registered item processes to reach a terminal state.
#[derive(Default)]
pub struct CompletionAggregator {
    pending: Mutex<Vec<(ItemId, CompletionSignal)>>,
}

impl CompletionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completion signal to the wait set. Safe to call while
    /// `wait_all` is running; the signal joins the next drain round.
    pub async fn register(&self, id: ItemId, signal: CompletionSignal) {
        self.pending.lock().await.push((id, signal));
    }

    /// Block until every registered signal has resolved and return the
    /// per-item outcomes, sorted by item id.
    ///
    /// Completion order between items is irrelevant; each round awaits all
    /// currently-known signals together, then checks whether new ones were
    /// registered in the meantime. Returns once a drain finds nothing new.
    pub async fn wait_all(&self) -> BatchOutcome {
        let mut results: Vec<ItemResult> = Vec::new();

        loop {
            let batch: Vec<(ItemId, CompletionSignal)> = {
                let mut pending = self.pending.lock().await;
                pending.drain(..).collect()
            };
            if batch.is_empty() {
                break;
            }

            debug!("Aggregator waiting on {} completion signals", batch.len());
            let waits = batch.into_iter().map(|(id, signal)| async move {
                ItemResult {
                    id,
                    outcome: signal.wait().await,
                }
            });
            results.extend(join_all(waits).await);
        }

        results.sort_by_key(|result| result.id);
        BatchOutcome { items: results }
    }
}
