//! Server library: HTTP API, metrics, and shared application state.
//!
//! Exposed as a library so integration tests can build the router
//! in-process with a mock carrier injected.

pub mod api;
pub mod metrics;
pub mod state;
