//! Timetabling domain models.
//!
//! Provides the typed entities of a timetabling problem and its solution.
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School | Training Center |
//! |-------------|-----------|--------|-----------------|
//! | Course | Module | Subject | Workshop |
//! | Session | Lecture/Tutorial | Lesson | Sitting |
//! | StudentGroup | Semester cohort | Class | Cohort |
//! | TimeSlot | Teaching period | Period | Block |
//! | Timetable | Semester plan | Weekly plan | Roster |

mod constraint;
mod course;
mod group;
mod room;
mod teacher;
mod timeslot;
mod timetable;

pub use constraint::{Constraint, EntityKind, EntityRef, HardConstraint, SoftConstraint};
pub use course::{Course, Session};
pub use group::StudentGroup;
pub use room::Room;
pub use teacher::{StudyDays, Teacher};
pub use timeslot::TimeSlot;
pub use timetable::{SoftScore, SolveStatus, Timetable, TimetableEntry};
