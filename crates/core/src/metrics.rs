//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Item processes (deliveries, cycles, outcomes)
//! - Message routing (confirmations, cancellations)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Item Process Metrics
// =============================================================================

/// Items introduced total.
pub static ITEMS_INTRODUCED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("parcelo_items_introduced_total", "Total items introduced").unwrap()
});

/// Delivery attempts total (one per cycle).
pub static DELIVERY_ATTEMPTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "parcelo_delivery_attempts_total",
        "Total delivery attempts across all items and cycles",
    )
    .unwrap()
});

/// Items finished, by terminal outcome.
pub static ITEMS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "parcelo_items_completed_total",
            "Items that reached a terminal state",
        ),
        &["outcome"], // "delivered", "cancelled", "failed"
    )
    .unwrap()
});

/// Delivery cycles needed per delivered item.
pub static DELIVERY_CYCLES: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "parcelo_delivery_cycles",
            "Number of delivery cycles per delivered item",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0]),
    )
    .unwrap()
});

// =============================================================================
// Message Routing Metrics
// =============================================================================

/// Confirmation messages routed, by result.
pub static CONFIRMATIONS_ROUTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "parcelo_confirmations_routed_total",
            "Confirmation messages received",
        ),
        &["result"], // "routed", "unknown"
    )
    .unwrap()
});

/// Cancellation messages routed, by result.
pub static CANCELLATIONS_ROUTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "parcelo_cancellations_routed_total",
            "Cancellation messages received",
        ),
        &["result"], // "routed", "resolved", "unknown"
    )
    .unwrap()
});

/// All core metrics, for registration in a server-side registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Item processes
        Box::new(ITEMS_INTRODUCED.clone()),
        Box::new(DELIVERY_ATTEMPTS.clone()),
        Box::new(ITEMS_COMPLETED.clone()),
        Box::new(DELIVERY_CYCLES.clone()),
        // Routing
        Box::new(CONFIRMATIONS_ROUTED.clone()),
        Box::new(CANCELLATIONS_ROUTED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }

    #[test]
    fn test_counters_increment() {
        let before = DELIVERY_ATTEMPTS.get();
        DELIVERY_ATTEMPTS.inc();
        assert_eq!(DELIVERY_ATTEMPTS.get(), before + 1);
    }
}
