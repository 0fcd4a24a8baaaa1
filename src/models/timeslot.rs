//! Time slot model.
//!
//! A time slot is one teaching period of the week: a day index plus a
//! half-open `[start, end)` interval in minutes since midnight.
//!
//! # Ordering
//! Slots order by `(day, start, id)`. The catalog stores them in this
//! order, so slot indices are a stable function of the input.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A teaching period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique slot identifier.
    pub id: String,
    /// Day index (0 = first teaching day of the week).
    pub day: u32,
    /// Start (minutes since midnight, inclusive).
    pub start: u32,
    /// End (minutes since midnight, exclusive).
    pub end: u32,
}

impl TimeSlot {
    /// Minutes since midnight at noon.
    pub const NOON: u32 = 720;

    /// Creates a new time slot.
    pub fn new(id: impl Into<String>, day: u32, start: u32, end: u32) -> Self {
        Self {
            id: id.into(),
            day,
            start,
            end,
        }
    }

    /// Length of the slot in minutes.
    #[inline]
    pub fn duration_min(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the slot ends by noon.
    pub fn is_forenoon(&self) -> bool {
        self.end <= Self::NOON
    }

    /// Whether two slots overlap in time (same day, intersecting intervals).
    pub fn overlaps(&self, other: &Self) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

impl PartialOrd for TimeSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.day, self.start, &self.id).cmp(&(other.day, other.start, &other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ordering() {
        let mut slots = vec![
            TimeSlot::new("tue-1", 1, 480, 570),
            TimeSlot::new("mon-2", 0, 600, 690),
            TimeSlot::new("mon-1", 0, 480, 570),
        ];
        slots.sort();
        let ids: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["mon-1", "mon-2", "tue-1"]);
    }

    #[test]
    fn test_overlaps() {
        let a = TimeSlot::new("a", 0, 480, 570);
        let b = TimeSlot::new("b", 0, 540, 630);
        let c = TimeSlot::new("c", 0, 570, 660);
        let d = TimeSlot::new("d", 1, 480, 570);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // half-open: touching is fine
        assert!(!a.overlaps(&d)); // different day
        assert_eq!(a.duration_min(), 90);
    }

    #[test]
    fn test_forenoon() {
        assert!(TimeSlot::new("a", 0, 630, 720).is_forenoon());
        assert!(!TimeSlot::new("b", 0, 690, 780).is_forenoon());
    }
}
