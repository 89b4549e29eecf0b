//! Run API handlers.
//!
//! A run is one submitted batch of items. The create endpoint returns as
//! soon as every process is introduced; the aggregate outcome appears on
//! the run status endpoint once all items reach a terminal state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use parcelo_core::{BatchOutcome, DeliveryError, Item, ItemOutcome, ItemState};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a run.
///
/// When `items` is empty the batch is requested from the carrier instead.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRunRequest {
    #[serde(default)]
    pub items: Vec<ItemSpec>,
}

/// One item in a create-run request.
#[derive(Debug, Deserialize)]
pub struct ItemSpec {
    pub id: u64,
    pub payload: String,
}

/// Response for a created run.
#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run_id: Uuid,
    pub item_count: usize,
}

/// Per-item entry in a run status response.
#[derive(Debug, Serialize)]
pub struct RunItemStatus {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ItemState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ItemOutcome>,
}

/// Run status response.
#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// True once every item in the run reached a terminal state.
    pub finished: bool,
    pub items: Vec<RunItemStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcomeSummary>,
}

/// Aggregate counters of a finished run.
#[derive(Debug, Serialize)]
pub struct RunOutcomeSummary {
    pub delivered: usize,
    pub cancelled: usize,
    pub failed: usize,
    pub all_delivered: bool,
}

impl From<&BatchOutcome> for RunOutcomeSummary {
    fn from(outcome: &BatchOutcome) -> Self {
        Self {
            delivered: outcome.delivered_count(),
            cancelled: outcome.cancelled_count(),
            failed: outcome.failed_count(),
            all_delivered: outcome.is_all_delivered(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct RunErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a batch of items as a new run.
pub async fn create_run(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateRunRequest>>,
) -> Result<(StatusCode, Json<CreateRunResponse>), (StatusCode, Json<RunErrorResponse>)> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let result = if request.items.is_empty() {
        state.launch_generated_run().await
    } else {
        let items: Vec<Item> = request
            .items
            .into_iter()
            .map(|spec| Item::new(spec.id, spec.payload))
            .collect();
        state.launch_run(items).await
    };

    match result {
        Ok((run_id, item_count)) => Ok((
            StatusCode::CREATED,
            Json(CreateRunResponse { run_id, item_count }),
        )),
        Err(e @ DeliveryError::DuplicateItem(_)) => Err((
            StatusCode::CONFLICT,
            Json(RunErrorResponse {
                error: e.to_string(),
            }),
        )),
        Err(e @ DeliveryError::Carrier(_)) => Err((
            StatusCode::BAD_GATEWAY,
            Json(RunErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// Current status of a run, including per-item states and, once finished,
/// the aggregate outcome.
pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunStatusResponse>, (StatusCode, Json<RunErrorResponse>)> {
    let Some(run) = state.run(run_id).await else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(RunErrorResponse {
                error: format!("Unknown run: {}", run_id),
            }),
        ));
    };

    let manager = state.manager();
    let mut items = Vec::with_capacity(run.item_ids.len());
    for id in &run.item_ids {
        items.push(RunItemStatus {
            id: id.0,
            state: manager.state_of(*id).await,
            outcome: manager.outcome_of(*id).await,
        });
    }

    let outcome = run.outcome();
    Ok(Json(RunStatusResponse {
        run_id,
        started_at: run.started_at,
        finished: outcome.is_some(),
        items,
        outcome: outcome.as_ref().map(RunOutcomeSummary::from),
    }))
}
