//! Domain catalog.
//!
//! An immutable, validated snapshot of one timetabling problem. The catalog
//! is built once per solve from [`RawRecords`] and shared read-only (behind an
//! `Arc`) by the model builder, the extractor, and diagnostics.
//!
//! # Ordering
//! Every entity list is sorted: slots by `(day, start, id)`, everything else
//! by id. Sessions follow course order, then ordinal. Positions in these
//! lists are the indices used throughout the crate, so they are a pure
//! function of the input records.

mod load;
mod records;

pub use records::{
    Enrollment, RawCourse, RawGroup, RawRecords, RawRoom, RawTeacher, RawTimeSlot,
    TeachingAssignment,
};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::models::{Course, Room, Session, StudentGroup, Teacher, TimeSlot};

/// Validated timetabling problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    slots: Vec<TimeSlot>,
    rooms: Vec<Room>,
    teachers: Vec<Teacher>,
    groups: Vec<StudentGroup>,
    courses: Vec<Course>,
    sessions: Vec<Session>,
    features: BTreeSet<String>,

    slot_index: BTreeMap<String, usize>,
    room_index: BTreeMap<String, usize>,
    teacher_index: BTreeMap<String, usize>,
    group_index: BTreeMap<String, usize>,
    course_index: BTreeMap<String, usize>,

    /// Distinct days in ascending order.
    days: Vec<u32>,
    /// Slot indices per day position, in slot order.
    day_slots: Vec<Vec<usize>>,
    /// Day position of each slot.
    slot_day: Vec<usize>,
    /// 1-based period of each slot within its day.
    slot_period: Vec<u32>,
    /// Course index of each session.
    session_course: Vec<usize>,
    /// Session index range of each course.
    course_sessions: Vec<Range<usize>>,
}

impl Catalog {
    /// Time slots in `(day, start, id)` order.
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    /// Rooms in id order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Teachers in id order.
    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    /// Student groups in id order.
    pub fn groups(&self) -> &[StudentGroup] {
        &self.groups
    }

    /// Courses in id order.
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Sessions in course order, then ordinal.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Declared feature vocabulary (empty when none was declared).
    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    /// Index of a slot.
    pub fn slot_idx(&self, id: &str) -> Option<usize> {
        self.slot_index.get(id).copied()
    }

    /// Index of a room.
    pub fn room_idx(&self, id: &str) -> Option<usize> {
        self.room_index.get(id).copied()
    }

    /// Index of a teacher.
    pub fn teacher_idx(&self, id: &str) -> Option<usize> {
        self.teacher_index.get(id).copied()
    }

    /// Index of a group.
    pub fn group_idx(&self, id: &str) -> Option<usize> {
        self.group_index.get(id).copied()
    }

    /// Index of a course.
    pub fn course_idx(&self, id: &str) -> Option<usize> {
        self.course_index.get(id).copied()
    }

    /// Looks up a slot by id.
    pub fn slot(&self, id: &str) -> Option<&TimeSlot> {
        self.slot_idx(id).map(|i| &self.slots[i])
    }

    /// Looks up a room by id.
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.room_idx(id).map(|i| &self.rooms[i])
    }

    /// Looks up a teacher by id.
    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teacher_idx(id).map(|i| &self.teachers[i])
    }

    /// Looks up a group by id.
    pub fn group(&self, id: &str) -> Option<&StudentGroup> {
        self.group_idx(id).map(|i| &self.groups[i])
    }

    /// Looks up a course by id.
    pub fn course(&self, id: &str) -> Option<&Course> {
        self.course_idx(id).map(|i| &self.courses[i])
    }

    /// Distinct teaching days in ascending order.
    pub fn days(&self) -> &[u32] {
        &self.days
    }

    /// Slot indices of the `day_pos`-th day, in slot order.
    pub fn day_slots(&self, day_pos: usize) -> &[usize] {
        &self.day_slots[day_pos]
    }

    /// Day position (index into [`days`](Self::days)) of a slot.
    pub fn day_of_slot(&self, slot_idx: usize) -> usize {
        self.slot_day[slot_idx]
    }

    /// Day position of a calendar day, if the catalog has slots on it.
    pub fn day_pos(&self, day: u32) -> Option<usize> {
        self.days.binary_search(&day).ok()
    }

    /// 1-based position of a slot within its day.
    pub fn period(&self, slot_idx: usize) -> u32 {
        self.slot_period[slot_idx]
    }

    /// Course index of a session.
    pub fn course_idx_of(&self, session_idx: usize) -> usize {
        self.session_course[session_idx]
    }

    /// Course of a session.
    pub fn course_of(&self, session_idx: usize) -> &Course {
        &self.courses[self.session_course[session_idx]]
    }

    /// Session indices of a course.
    pub fn sessions_of(&self, course_idx: usize) -> Range<usize> {
        self.course_sessions[course_idx].clone()
    }

    /// Total number of students attending a course.
    pub fn enrolled_size(&self, course: &Course) -> u32 {
        course
            .groups
            .iter()
            .filter_map(|g| self.group(g))
            .map(|g| g.size)
            .sum()
    }

    /// Weekly sessions given by a teacher.
    pub fn teacher_load(&self, teacher_id: &str) -> u32 {
        self.courses
            .iter()
            .filter(|c| c.teachers.contains(teacher_id))
            .map(|c| c.sessions_per_week)
            .sum()
    }

    /// Weekly sessions attended by a group.
    pub fn group_load(&self, group_id: &str) -> u32 {
        self.courses
            .iter()
            .filter(|c| c.groups.contains(group_id))
            .map(|c| c.sessions_per_week)
            .sum()
    }

    /// Number of sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
