//! Item API handlers: the inbound message surface and item queries.
//!
//! Confirm and cancel are fire-and-forget: the message is enqueued for the
//! dispatcher and the caller gets 202 regardless of whether the id is
//! known. Unknown ids are dropped by the router, never an API error.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use parcelo_core::{Item, ItemId, ItemOutcome, ItemState};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for cancellation.
#[derive(Debug, Default, Deserialize)]
pub struct CancelItemRequest {
    /// Why the delivery is being cancelled.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Item status response
#[derive(Debug, Serialize)]
pub struct ItemStatusResponse {
    pub item: Item,
    pub state: ItemState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ItemOutcome>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ItemErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Confirm an item's current delivery attempt (fire-and-forget).
pub async fn confirm_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<MessageResponse>) {
    state.messages().confirm(ItemId(id)).await;
    (
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: format!("Confirmation accepted for item {}", id),
        }),
    )
}

/// Cancel an item's delivery (fire-and-forget).
pub async fn cancel_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    body: Option<Json<CancelItemRequest>>,
) -> (StatusCode, Json<MessageResponse>) {
    let reason = body
        .and_then(|Json(request)| request.reason)
        .unwrap_or_else(|| "unspecified".to_string());

    state.messages().cancel(ItemId(id), reason).await;
    (
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: format!("Cancellation accepted for item {}", id),
        }),
    )
}

/// Items currently awaiting an external confirmation.
pub async fn pending_items(State(state): State<Arc<AppState>>) -> Json<Vec<Item>> {
    Json(state.manager().pending_confirmation().await)
}

/// Current state of one item.
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ItemStatusResponse>, (StatusCode, Json<ItemErrorResponse>)> {
    let id = ItemId(id);
    let manager = state.manager();

    let (item, item_state) = match (manager.item_of(id).await, manager.state_of(id).await) {
        (Some(item), Some(item_state)) => (item, item_state),
        _ => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ItemErrorResponse {
                    error: format!("Unknown item: {}", id),
                }),
            ));
        }
    };

    Ok(Json(ItemStatusResponse {
        item,
        state: item_state,
        outcome: manager.outcome_of(id).await,
    }))
}
