//! Room model.
//!
//! Rooms host sessions. Each room has a seat capacity, a set of feature
//! tags (e.g. `"lab"`, `"projector"`), and optionally a set of slots in
//! which it cannot be booked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A bookable room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: String,
    /// Number of seats.
    pub capacity: u32,
    /// Equipment and property tags.
    pub features: BTreeSet<String>,
    /// Slot IDs in which the room is not available.
    pub unavailable: BTreeSet<String>,
}

impl Room {
    /// Creates a room with the given capacity and no features.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            features: BTreeSet::new(),
            unavailable: BTreeSet::new(),
        }
    }

    /// Adds a feature tag.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    /// Marks a slot as unavailable.
    pub fn with_unavailable(mut self, slot_id: impl Into<String>) -> Self {
        self.unavailable.insert(slot_id.into());
        self
    }

    /// Whether the room provides every required feature.
    pub fn has_features(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.features)
    }

    /// Whether the room can be booked in the given slot.
    pub fn is_available(&self, slot_id: &str) -> bool {
        !self.unavailable.contains(slot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_features() {
        let lab = Room::new("R1", 24).with_feature("lab").with_feature("projector");
        let mut required = BTreeSet::new();
        required.insert("lab".to_string());
        assert!(lab.has_features(&required));

        required.insert("organ".to_string());
        assert!(!lab.has_features(&required));

        assert!(Room::new("R2", 10).has_features(&BTreeSet::new()));
    }

    #[test]
    fn test_room_availability() {
        let r = Room::new("R1", 30).with_unavailable("mon-1");
        assert!(!r.is_available("mon-1"));
        assert!(r.is_available("mon-2"));
    }
}
