//! Delivery orchestration core.
//!
//! Manages a dynamically growing set of independent per-item delivery state
//! machines, each retrying until an externally-delivered confirmation
//! arrives, with the parent blocking until every item reaches a terminal
//! state:
//!
//! - **Item process**: one task per item, looping delivery cycles until the
//!   carrier returns a terminal completion code.
//! - **Confirmation router**: routes confirm/cancel messages by item id.
//! - **Item process manager**: owns the registry and spawns processes.
//! - **Completion aggregator**: waits for all completion signals.
//! - **Message inbox**: ordered fire-and-forget inbound message surface.

mod aggregator;
mod config;
mod entry;
mod inbox;
mod manager;
mod process;
mod router;
mod types;

pub use aggregator::CompletionAggregator;
pub use config::DeliveryConfig;
pub use entry::CompletionSignal;
pub use inbox::{create_message_inbox, DeliveryMessage, MessageDispatcher, MessageHandle};
pub use manager::ItemProcessManager;
pub use router::ConfirmationRouter;
pub use types::{
    BatchOutcome, CancelRequest, DeliveryError, DeliveryStatus, ItemOutcome, ItemResult,
    ItemState,
};
