//! Testing utilities and mock implementations.
//!
//! Provides a controllable in-memory carrier so orchestration behavior can
//! be tested without any external service.
//!
//! # Example
//!
//! ```rust,ignore
//! use parcelo_core::testing::MockCarrier;
//!
//! let carrier = MockCarrier::new();
//!
//! // Script a confirmed-but-not-final cycle before the terminal one.
//! carrier.script_completion_codes(ItemId(1), vec!["Retry", "Confirmed"]).await;
//!
//! // Make one item's deliveries fail outright.
//! carrier.fail_delivery_for(ItemId(2)).await;
//! ```

mod mock_carrier;

pub use mock_carrier::{MockCarrier, RecordedCall};
