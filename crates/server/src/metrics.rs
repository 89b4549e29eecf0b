//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the parcelo server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - Item state gauges (collected dynamically from the registry)
//! - Run bookkeeping

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "parcelo_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("parcelo_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "parcelo_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Item Metrics (collected dynamically)
// =============================================================================

/// Items by current state.
pub static ITEMS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("parcelo_items_by_state", "Current item count by state"),
        &["state"],
    )
    .unwrap()
});

/// Tracked runs.
pub static RUNS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("parcelo_runs_tracked", "Number of runs being tracked").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Items and runs
    registry
        .register(Box::new(ITEMS_BY_STATE.clone()))
        .unwrap();
    registry.register(Box::new(RUNS_TRACKED.clone())).unwrap();

    // Core metrics (item processes, routing)
    for metric in parcelo_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current
/// values from the item registry and run tracker.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.manager().status().await;
    for (state_type, count) in [
        ("pending", status.pending),
        ("delivery_in_flight", status.delivery_in_flight),
        ("awaiting_confirmation", status.awaiting_confirmation),
        ("completing_delivery", status.completing_delivery),
        ("done", status.done),
        ("cancelled", status.cancelled),
        ("failed", status.failed),
    ] {
        ITEMS_BY_STATE
            .with_label_values(&[state_type])
            .set(count as i64);
    }

    RUNS_TRACKED.set(state.run_count().await as i64);
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/runs/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/runs/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/items/42/confirm";
        assert_eq!(normalize_path(path), "/api/v1/items/{id}/confirm");
    }

    #[test]
    fn test_normalize_path_plain() {
        let path = "/api/v1/items/pending";
        assert_eq!(normalize_path(path), "/api/v1/items/pending");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/api/v1/health", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("parcelo_http_requests_total"));
    }
}
