//! Core item data types.

mod types;

pub use types::{Item, ItemId};
