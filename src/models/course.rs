//! Course and session models.
//!
//! A course needs a fixed number of weekly sessions. Each session is the
//! unit of assignment: it receives exactly one (slot, room) pair. All
//! sessions of a course share the course's teachers, groups, and room
//! requirements.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::TimeSlot;

/// A course to be timetabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique course identifier.
    pub id: String,
    /// Number of sessions per week (always > 0 in a loaded catalog).
    pub sessions_per_week: u32,
    /// Features every hosting room must provide.
    pub required_features: BTreeSet<String>,
    /// Teacher IDs giving every session.
    pub teachers: BTreeSet<String>,
    /// Enrolled student group IDs.
    pub groups: BTreeSet<String>,
    /// Room whitelist. Empty = any suitable room.
    pub allowed_rooms: BTreeSet<String>,
    /// Slot whitelist. Empty = any slot.
    pub allowed_slots: BTreeSet<String>,
    /// Slots the course would like to be held in (soft).
    pub preferred_slots: BTreeSet<String>,
    /// Whether several sessions may fall on the same day.
    pub allow_same_day: bool,
    /// Sessions must end by noon.
    pub only_forenoon: bool,
    /// Counts toward teachers' daily lecture limits.
    pub is_lecture: bool,
    /// A teacher gives at most one such course per day.
    pub one_per_day: bool,
}

impl Course {
    /// Creates a course with the given weekly session count.
    pub fn new(id: impl Into<String>, sessions_per_week: u32) -> Self {
        Self {
            id: id.into(),
            sessions_per_week,
            required_features: BTreeSet::new(),
            teachers: BTreeSet::new(),
            groups: BTreeSet::new(),
            allowed_rooms: BTreeSet::new(),
            allowed_slots: BTreeSet::new(),
            preferred_slots: BTreeSet::new(),
            allow_same_day: false,
            only_forenoon: false,
            is_lecture: false,
            one_per_day: false,
        }
    }

    /// Adds a required room feature.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.required_features.insert(feature.into());
        self
    }

    /// Adds a teacher.
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teachers.insert(teacher_id.into());
        self
    }

    /// Adds an enrolled group.
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.groups.insert(group_id.into());
        self
    }

    /// Adds a preferred slot.
    pub fn with_preferred_slot(mut self, slot_id: impl Into<String>) -> Self {
        self.preferred_slots.insert(slot_id.into());
        self
    }

    /// Whether the course accepts the given room (whitelist only).
    pub fn accepts_room(&self, room_id: &str) -> bool {
        self.allowed_rooms.is_empty() || self.allowed_rooms.contains(room_id)
    }

    /// Whether the course accepts the given slot (whitelist only).
    pub fn accepts_slot(&self, slot_id: &str) -> bool {
        self.allowed_slots.is_empty() || self.allowed_slots.contains(slot_id)
    }

    /// Whether the course may be held in the slot's time of day.
    pub fn accepts_time(&self, slot: &TimeSlot) -> bool {
        !self.only_forenoon || slot.is_forenoon()
    }

    /// Whether a session in this slot misses the course's preferences.
    ///
    /// Courses without preferences never miss.
    pub fn misses_preference(&self, slot_id: &str) -> bool {
        !self.preferred_slots.is_empty() && !self.preferred_slots.contains(slot_id)
    }

    /// ID of the `ordinal`-th session (1-based).
    pub fn session_id(&self, ordinal: u32) -> String {
        format!("{}/{}", self.id, ordinal)
    }
}

/// One meeting of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier (`"{course}/{ordinal}"`).
    pub id: String,
    /// Parent course ID.
    pub course_id: String,
    /// Position within the course (1-based).
    pub ordinal: u32,
}

impl Session {
    /// Creates the `ordinal`-th session of a course.
    pub fn of(course: &Course, ordinal: u32) -> Self {
        Self {
            id: course.session_id(ordinal),
            course_id: course.id.clone(),
            ordinal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_whitelists() {
        let mut c = Course::new("C1", 2);
        assert!(c.accepts_room("R1"));
        assert!(c.accepts_slot("mon-1"));

        c.allowed_rooms.insert("R2".into());
        c.allowed_slots.insert("mon-2".into());
        assert!(!c.accepts_room("R1"));
        assert!(c.accepts_room("R2"));
        assert!(!c.accepts_slot("mon-1"));
    }

    #[test]
    fn test_forenoon_courses() {
        let morning = TimeSlot::new("mon-1", 0, 480, 570);
        let afternoon = TimeSlot::new("mon-5", 0, 780, 870);
        let mut c = Course::new("C1", 1);
        assert!(c.accepts_time(&afternoon));
        c.only_forenoon = true;
        assert!(c.accepts_time(&morning));
        assert!(!c.accepts_time(&afternoon));
    }

    #[test]
    fn test_preference_miss() {
        let c = Course::new("C1", 1);
        assert!(!c.misses_preference("mon-1"));

        let c = c.with_preferred_slot("mon-1");
        assert!(!c.misses_preference("mon-1"));
        assert!(c.misses_preference("tue-1"));
    }

    #[test]
    fn test_session_ids() {
        let c = Course::new("ALG", 3);
        let s = Session::of(&c, 2);
        assert_eq!(s.id, "ALG/2");
        assert_eq!(s.course_id, "ALG");
        assert_eq!(s.ordinal, 2);
    }
}
