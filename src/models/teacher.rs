//! Teacher model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Two candidate study days, in order of preference.
///
/// The teacher keeps at least one of them free; keeping the first one free
/// is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDays {
    pub first: u32,
    pub second: u32,
}

/// A teacher who gives sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    /// Unique teacher identifier.
    pub id: String,
    /// Slot IDs in which the teacher cannot teach.
    pub unavailable: BTreeSet<String>,
    /// Maximum sessions per day. `None` = unlimited.
    pub max_sessions_per_day: Option<u32>,
    /// Maximum lecture sessions per day. `None` = unlimited.
    pub max_lectures_per_day: Option<u32>,
    /// Study day choices, if the teacher has any.
    pub study_days: Option<StudyDays>,
    /// Penalize idle days between teaching days.
    pub avoid_day_gaps: bool,
}

impl Teacher {
    /// Creates a teacher with no restrictions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unavailable: BTreeSet::new(),
            max_sessions_per_day: None,
            max_lectures_per_day: None,
            study_days: None,
            avoid_day_gaps: false,
        }
    }

    /// Marks a slot as unavailable.
    pub fn with_unavailable(mut self, slot_id: impl Into<String>) -> Self {
        self.unavailable.insert(slot_id.into());
        self
    }

    /// Sets the daily session limit.
    pub fn with_max_sessions_per_day(mut self, max: u32) -> Self {
        self.max_sessions_per_day = Some(max);
        self
    }

    /// Sets the study day choices.
    pub fn with_study_days(mut self, first: u32, second: u32) -> Self {
        self.study_days = Some(StudyDays { first, second });
        self
    }

    /// Whether the teacher can teach in the given slot.
    pub fn is_available(&self, slot_id: &str) -> bool {
        !self.unavailable.contains(slot_id)
    }
}
