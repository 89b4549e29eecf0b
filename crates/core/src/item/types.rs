//! Items are the unit of work: something that must be delivered once and
//! confirmed by an external party before it counts as done.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an item, unique across a running process.
///
/// Newtype over `u64` so ids can't be confused with cycle counters or
/// other plain integers floating around the delivery loop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id)
    }
}

/// A unit of work to be delivered and confirmed.
///
/// The payload is opaque to the orchestration core; only the carrier layer
/// interprets it. Runtime delivery state (confirmation flag, cancel request,
/// outcome) lives in the registry entry, not here, so an `Item` stays a
/// plain serializable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item identifier, unique within a run.
    pub id: ItemId,
    /// Opaque delivery content.
    pub payload: String,
}

impl Item {
    /// Create a new item.
    pub fn new(id: impl Into<ItemId>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_display() {
        assert_eq!(ItemId(42).to_string(), "42");
    }

    #[test]
    fn test_item_serialization_roundtrip() {
        let item = Item::new(7u64, "parcel for dock 3");
        let json = serde_json::to_string(&item).unwrap();
        let parsed: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn test_item_id_serializes_transparent() {
        let json = serde_json::to_string(&ItemId(3)).unwrap();
        assert_eq!(json, "3");
    }
}
