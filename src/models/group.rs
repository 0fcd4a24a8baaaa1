//! Student group model.
//!
//! A student group attends every session of each course it is enrolled in.
//! Its size drives room capacity checks; its daily limit and requested
//! free day shape the hard and soft rules built for it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A cohort of students with a fixed enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentGroup {
    /// Unique group identifier.
    pub id: String,
    /// Number of students.
    pub size: u32,
    /// Enrolled course IDs.
    pub courses: BTreeSet<String>,
    /// Maximum sessions per day. `None` = unlimited.
    pub max_sessions_per_day: Option<u32>,
    /// Day the group would like to keep free (soft).
    pub free_day: Option<u32>,
}

impl StudentGroup {
    /// Creates a group with no enrollments.
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            size,
            courses: BTreeSet::new(),
            max_sessions_per_day: None,
            free_day: None,
        }
    }

    /// Enrolls the group in a course.
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.courses.insert(course_id.into());
        self
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

    /// Whether the group attends the given course.
    pub fn attends(&self, course_id: &str) -> bool {
        self.courses.contains(course_id)
    }
}
