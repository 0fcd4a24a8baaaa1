//! Raw input records.
//!
//! The shape in which a data source hands rows to the engine: one flat list
//! per entity kind plus the enrollment and teaching relationships. Records
//! are untrusted; [`Catalog::load`](super::Catalog::load) validates them.
//!
//! The fluent helpers exist for in-memory construction (tests, embedding
//! applications); data sources typically deserialize records instead.

use serde::{Deserialize, Serialize};

use crate::models::StudyDays;

/// A time slot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimeSlot {
    pub id: String,
    pub day: u32,
    pub start: u32,
    pub end: u32,
}

/// A room row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRoom {
    pub id: String,
    pub capacity: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub unavailable: Vec<String>,
}

/// A teacher row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTeacher {
    pub id: String,
    #[serde(default)]
    pub unavailable: Vec<String>,
    #[serde(default)]
    pub max_sessions_per_day: Option<u32>,
    #[serde(default)]
    pub max_lectures_per_day: Option<u32>,
    #[serde(default)]
    pub study_days: Option<StudyDays>,
    #[serde(default)]
    pub avoid_day_gaps: bool,
}

/// A student group row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGroup {
    pub id: String,
    pub size: u32,
    #[serde(default)]
    pub max_sessions_per_day: Option<u32>,
    #[serde(default)]
    pub free_day: Option<u32>,
}

/// A course row.
///
/// `sessions_per_week` is signed so that bad rows surface as data issues
/// instead of deserialization failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCourse {
    pub id: String,
    pub sessions_per_week: i64,
    #[serde(default)]
    pub required_features: Vec<String>,
    #[serde(default)]
    pub allowed_rooms: Vec<String>,
    #[serde(default)]
    pub allowed_slots: Vec<String>,
    #[serde(default)]
    pub preferred_slots: Vec<String>,
    #[serde(default)]
    pub allow_same_day: bool,
    #[serde(default)]
    pub only_forenoon: bool,
    #[serde(default)]
    pub is_lecture: bool,
    #[serde(default)]
    pub one_per_day: bool,
}

/// Group ↔ course relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub group: String,
    pub course: String,
}

/// Teacher ↔ course relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingAssignment {
    pub teacher: String,
    pub course: String,
}

/// All rows of one timetabling problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecords {
    /// Declared feature vocabulary. Empty = tags are not checked.
    pub features: Vec<String>,
    pub slots: Vec<RawTimeSlot>,
    pub rooms: Vec<RawRoom>,
    pub teachers: Vec<RawTeacher>,
    pub groups: Vec<RawGroup>,
    pub courses: Vec<RawCourse>,
    pub enrollments: Vec<Enrollment>,
    pub teaching: Vec<TeachingAssignment>,
}

impl RawCourse {
    /// Creates a course row with no requirements.
    pub fn new(id: impl Into<String>, sessions_per_week: i64) -> Self {
        Self {
            id: id.into(),
            sessions_per_week,
            required_features: Vec::new(),
            allowed_rooms: Vec::new(),
            allowed_slots: Vec::new(),
            preferred_slots: Vec::new(),
            allow_same_day: false,
            only_forenoon: false,
            is_lecture: false,
            one_per_day: false,
        }
    }

    /// Adds a required room feature.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.required_features.push(feature.into());
        self
    }

    /// Adds a room to the whitelist.
    pub fn with_allowed_room(mut self, room: impl Into<String>) -> Self {
        self.allowed_rooms.push(room.into());
        self
    }

    /// Adds a slot to the whitelist.
    pub fn with_allowed_slot(mut self, slot: impl Into<String>) -> Self {
        self.allowed_slots.push(slot.into());
        self
    }

    /// Adds a preferred slot.
    pub fn with_preferred_slot(mut self, slot: impl Into<String>) -> Self {
        self.preferred_slots.push(slot.into());
        self
    }

    /// Allows several sessions on one day.
    pub fn allowing_same_day(mut self) -> Self {
        self.allow_same_day = true;
        self
    }

    /// Restricts sessions to slots ending by noon.
    pub fn forenoon_only(mut self) -> Self {
        self.only_forenoon = true;
        self
    }

    /// Marks the course as a lecture.
    pub fn lecture(mut self) -> Self {
        self.is_lecture = true;
        self
    }

    /// Lets each teacher give at most one such course per day.
    pub fn one_per_day(mut self) -> Self {
        self.one_per_day = true;
        self
    }
}

impl RawTeacher {
    /// Creates a teacher row with no restrictions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            unavailable: Vec::new(),
            max_sessions_per_day: None,
            max_lectures_per_day: None,
            study_days: None,
            avoid_day_gaps: false,
        }
    }

    /// Marks a slot as unavailable.
    pub fn with_unavailable(mut self, slot: impl Into<String>) -> Self {
        self.unavailable.push(slot.into());
        self
    }

    /// Sets the daily session limit.
    pub fn with_max_sessions_per_day(mut self, max: u32) -> Self {
        self.max_sessions_per_day = Some(max);
        self
    }

    /// Sets the daily lecture limit.
    pub fn with_max_lectures_per_day(mut self, max: u32) -> Self {
        self.max_lectures_per_day = Some(max);
        self
    }

    /// Sets the study day choices, preferred first.
    pub fn with_study_days(mut self, first: u32, second: u32) -> Self {
        self.study_days = Some(StudyDays { first, second });
        self
    }

    /// Penalizes idle days between teaching days.
    pub fn avoiding_day_gaps(mut self) -> Self {
        self.avoid_day_gaps = true;
        self
    }
}

impl RawRoom {
    /// Creates a room row with no features.
    pub fn new(id: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            capacity,
            features: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    /// Adds a feature tag.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Marks a slot as unavailable.
    pub fn with_unavailable(mut self, slot: impl Into<String>) -> Self {
        self.unavailable.push(slot.into());
        self
    }
}

impl RawGroup {
    /// Creates a group row.
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            size,
            max_sessions_per_day: None,
            free_day: None,
        }
    }

    /// Sets the daily session limit.
    pub fn with_max_sessions_per_day(mut self, max: u32) -> Self {
        self.max_sessions_per_day = Some(max);
        self
    }

    /// Requests a free day.
    pub fn with_free_day(mut self, day: u32) -> Self {
        self.free_day = Some(day);
        self
    }
}

impl RawRecords {
    /// Creates an empty record set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a feature tag.
    pub fn feature(mut self, tag: impl Into<String>) -> Self {
        self.features.push(tag.into());
        self
    }

    /// Adds a slot row.
    pub fn slot(mut self, id: impl Into<String>, day: u32, start: u32, end: u32) -> Self {
        self.slots.push(RawTimeSlot {
            id: id.into(),
            day,
            start,
            end,
        });
        self
    }

    /// Adds a room row.
    pub fn room(mut self, room: RawRoom) -> Self {
        self.rooms.push(room);
        self
    }

    /// Adds a teacher row.
    pub fn teacher(mut self, teacher: RawTeacher) -> Self {
        self.teachers.push(teacher);
        self
    }

    /// Adds a group row.
    pub fn group(mut self, group: RawGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds a course row.
    pub fn course(mut self, course: RawCourse) -> Self {
        self.courses.push(course);
        self
    }

    /// Enrolls a group in a course.
    pub fn enroll(mut self, group: impl Into<String>, course: impl Into<String>) -> Self {
        self.enrollments.push(Enrollment {
            group: group.into(),
            course: course.into(),
        });
        self
    }

    /// Assigns a teacher to a course.
    pub fn teach(mut self, teacher: impl Into<String>, course: impl Into<String>) -> Self {
        self.teaching.push(TeachingAssignment {
            teacher: teacher.into(),
            course: course.into(),
        });
        self
    }

    /// Number of rows across all record kinds.
    pub fn row_count(&self) -> usize {
        self.slots.len()
            + self.rooms.len()
            + self.teachers.len()
            + self.groups.len()
            + self.courses.len()
            + self.enrollments.len()
            + self.teaching.len()
    }
}
