pub mod carrier;
pub mod config;
pub mod delivery;
pub mod item;
pub mod metrics;
pub mod testing;

pub use carrier::{Carrier, CarrierError, InstantCarrier, WebhookCarrier};
pub use config::{
    load_config, load_config_from_str, validate_config, CarrierBackend, Config, ConfigError,
    SanitizedConfig, WebhookConfig,
};
pub use delivery::{
    create_message_inbox, BatchOutcome, CancelRequest, CompletionAggregator, CompletionSignal,
    ConfirmationRouter, DeliveryConfig, DeliveryError, DeliveryMessage, DeliveryStatus,
    ItemOutcome, ItemProcessManager, ItemResult, ItemState, MessageDispatcher, MessageHandle,
};
pub use item::{Item, ItemId};
