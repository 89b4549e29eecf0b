use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parcelo_core::{
    BatchOutcome, CompletionAggregator, CompletionSignal, Config, DeliveryError, Item, ItemId,
    ItemProcessManager, MessageHandle, SanitizedConfig,
};
use tokio::sync::{watch, RwLock};
use tracing::info;
use uuid::Uuid;

/// One submitted batch of items and its aggregate outcome.
#[derive(Clone)]
pub struct RunEntry {
    pub item_ids: Vec<ItemId>,
    pub started_at: DateTime<Utc>,
    outcome_rx: watch::Receiver<Option<BatchOutcome>>,
}

impl RunEntry {
    /// The aggregate outcome, once every item in the run has resolved.
    pub fn outcome(&self) -> Option<BatchOutcome> {
        self.outcome_rx.borrow().clone()
    }
}

/// Shared application state
pub struct AppState {
    config: Config,
    manager: Arc<ItemProcessManager>,
    messages: MessageHandle,
    runs: RwLock<HashMap<Uuid, RunEntry>>,
}

impl AppState {
    pub fn new(config: Config, manager: Arc<ItemProcessManager>, messages: MessageHandle) -> Self {
        Self {
            config,
            manager,
            messages,
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn manager(&self) -> &ItemProcessManager {
        &self.manager
    }

    pub fn messages(&self) -> &MessageHandle {
        &self.messages
    }

    /// Introduce a batch and track it as a run. The aggregate outcome
    /// resolves in the background once every item reaches a terminal state.
    pub async fn launch_run(&self, items: Vec<Item>) -> Result<(Uuid, usize), DeliveryError> {
        let mut signals = Vec::with_capacity(items.len());
        for item in items {
            let id = item.id;
            let signal = self.manager.introduce(item).await?;
            signals.push((id, signal));
        }
        Ok(self.track_run(signals).await)
    }

    /// Launch a run from the carrier's generated batch.
    pub async fn launch_generated_run(&self) -> Result<(Uuid, usize), DeliveryError> {
        let signals = self.manager.introduce_generated().await?;
        Ok(self.track_run(signals).await)
    }

    async fn track_run(&self, signals: Vec<(ItemId, CompletionSignal)>) -> (Uuid, usize) {
        let aggregator = CompletionAggregator::new();
        let mut item_ids = Vec::with_capacity(signals.len());
        for (id, signal) in signals {
            aggregator.register(id, signal).await;
            item_ids.push(id);
        }

        let (outcome_tx, outcome_rx) = watch::channel(None);
        tokio::spawn(async move {
            let outcome = aggregator.wait_all().await;
            let _ = outcome_tx.send(Some(outcome));
        });

        let run_id = Uuid::new_v4();
        let count = item_ids.len();
        self.runs.write().await.insert(
            run_id,
            RunEntry {
                item_ids,
                started_at: Utc::now(),
                outcome_rx,
            },
        );

        info!("Launched run {} with {} items", run_id, count);
        (run_id, count)
    }

    pub async fn run(&self, run_id: Uuid) -> Option<RunEntry> {
        self.runs.read().await.get(&run_id).cloned()
    }

    pub async fn run_count(&self) -> usize {
        self.runs.read().await.len()
    }
}
