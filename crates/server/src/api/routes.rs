use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, items, middleware::metrics_middleware, runs};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        // Runs
        .route("/runs", post(runs::create_run))
        .route("/runs/{id}", get(runs::get_run))
        // Items (message surface + queries)
        .route("/items/pending", get(items::pending_items))
        .route("/items/{id}", get(items::get_item))
        .route("/items/{id}/confirm", post(items::confirm_item))
        .route("/items/{id}/cancel", post(items::cancel_item))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
