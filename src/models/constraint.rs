//! Timetabling constraints.
//!
//! Every rule the engine knows about is a [`Constraint`]: either HARD (must
//! hold in any accepted timetable) or SOFT (contributes a weighted penalty).
//! Each variant is keyed on the entity it concerns, so one value names one
//! constraint *group*, e.g. "no overlap for teacher T1" covers every slot.
//!
//! Group keys are what diagnostics relax and what conflict reports name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hard or soft timetabling rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// Must hold in every valid timetable.
    Hard(HardConstraint),
    /// Weighted preference.
    Soft(SoftConstraint),
}

/// Hard rule groups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HardConstraint {
    /// A session receives exactly one (slot, room).
    SessionAssigned { session: String },
    /// A teacher's sessions never share a slot.
    TeacherNoOverlap { teacher: String },
    /// A room hosts at most one session per slot.
    RoomNoOverlap { room: String },
    /// A group's sessions never share a slot.
    GroupNoOverlap { group: String },
    /// At most one session of the course per day (unless repeats are allowed).
    CourseDistribution { course: String },
    /// A teacher is never booked in an unavailable slot.
    TeacherAvailability { teacher: String },
    /// A room is never booked in an unavailable slot.
    RoomAvailability { room: String },
    /// A teacher's daily session limit.
    TeacherDailyLimit { teacher: String },
    /// A group's daily session limit.
    GroupDailyLimit { group: String },
    /// A course's slot whitelist.
    CourseSlots { course: String },
    /// A course's room whitelist.
    CourseRooms { course: String },
    /// Hosting rooms seat every enrolled student.
    RoomCapacity { course: String },
    /// Hosting rooms provide every required feature.
    RoomFeatures { course: String },
    /// Forenoon-only courses end by noon.
    CourseForenoon { course: String },
    /// A teacher keeps one of the two study days free.
    TeacherStudyDay { teacher: String },
    /// A teacher's daily lecture limit.
    TeacherLectureLimit { teacher: String },
    /// A teacher gives at most one one-per-day course per day.
    OneCoursePerDay { teacher: String },
}

/// Soft rule groups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoftConstraint {
    /// Sessions held outside the course's preferred slots.
    PreferredSlot { course: String },
    /// Sessions held in a penalized period of the day.
    PeriodPenalty { period: u32 },
    /// Sessions on a group's requested free day.
    FreeDay { group: String },
    /// Idle periods between two sessions of a group within a day.
    Compactness { group: String },
    /// Teaching on the first study day choice.
    StudyDay { teacher: String },
    /// Idle days between two teaching days of a teacher.
    TeacherDayGap { teacher: String },
    /// Teacher sessions above the even daily share.
    TeacherLoad { teacher: String },
    /// Group sessions above the even daily share.
    GroupLoad { group: String },
}

/// Kind of catalog entity a constraint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Teacher,
    Room,
    Group,
    Course,
    Session,
}

/// A reference to a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    fn new(kind: EntityKind, id: &str) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

impl HardConstraint {
    /// The entity this group is keyed on.
    pub fn entity(&self) -> EntityRef {
        use HardConstraint::*;
        match self {
            SessionAssigned { session } => EntityRef::new(EntityKind::Session, session),
            TeacherNoOverlap { teacher }
            | TeacherAvailability { teacher }
            | TeacherDailyLimit { teacher }
            | TeacherStudyDay { teacher }
            | TeacherLectureLimit { teacher }
            | OneCoursePerDay { teacher } => EntityRef::new(EntityKind::Teacher, teacher),
            RoomNoOverlap { room } | RoomAvailability { room } => {
                EntityRef::new(EntityKind::Room, room)
            }
            GroupNoOverlap { group } | GroupDailyLimit { group } => {
                EntityRef::new(EntityKind::Group, group)
            }
            CourseDistribution { course }
            | CourseSlots { course }
            | CourseRooms { course }
            | RoomCapacity { course }
            | RoomFeatures { course }
            | CourseForenoon { course } => EntityRef::new(EntityKind::Course, course),
        }
    }

    /// Whether diagnostics may lift this group while searching for a conflict.
    ///
    /// Assignment, capacity, and features describe physical facts about
    /// the problem and are never relaxed.
    pub fn is_relaxable(&self) -> bool {
        !matches!(
            self,
            HardConstraint::SessionAssigned { .. }
                | HardConstraint::RoomCapacity { .. }
                | HardConstraint::RoomFeatures { .. }
        )
    }

    /// Short rule name without the entity.
    pub fn rule_name(&self) -> &'static str {
        use HardConstraint::*;
        match self {
            SessionAssigned { .. } => "session-assigned",
            TeacherNoOverlap { .. } => "teacher-no-overlap",
            RoomNoOverlap { .. } => "room-no-overlap",
            GroupNoOverlap { .. } => "group-no-overlap",
            CourseDistribution { .. } => "course-distribution",
            TeacherAvailability { .. } => "teacher-availability",
            RoomAvailability { .. } => "room-availability",
            TeacherDailyLimit { .. } => "teacher-daily-limit",
            GroupDailyLimit { .. } => "group-daily-limit",
            CourseSlots { .. } => "course-slots",
            CourseRooms { .. } => "course-rooms",
            RoomCapacity { .. } => "room-capacity",
            RoomFeatures { .. } => "room-features",
            CourseForenoon { .. } => "course-forenoon",
            TeacherStudyDay { .. } => "teacher-study-day",
            TeacherLectureLimit { .. } => "teacher-lecture-limit",
            OneCoursePerDay { .. } => "one-course-per-day",
        }
    }
}

impl SoftConstraint {
    /// Short rule name without the entity.
    pub fn rule_name(&self) -> &'static str {
        match self {
            SoftConstraint::PreferredSlot { .. } => "preferred-slot",
            SoftConstraint::PeriodPenalty { .. } => "period-penalty",
            SoftConstraint::FreeDay { .. } => "free-day",
            SoftConstraint::Compactness { .. } => "compactness",
            SoftConstraint::StudyDay { .. } => "study-day",
            SoftConstraint::TeacherDayGap { .. } => "teacher-day-gap",
            SoftConstraint::TeacherLoad { .. } => "teacher-load",
            SoftConstraint::GroupLoad { .. } => "group-load",
        }
    }
}

impl Constraint {
    /// Whether this is a hard rule.
    pub fn is_hard(&self) -> bool {
        matches!(self, Constraint::Hard(_))
    }
}

impl From<HardConstraint> for Constraint {
    fn from(c: HardConstraint) -> Self {
        Constraint::Hard(c)
    }
}

impl From<SoftConstraint> for Constraint {
    fn from(c: SoftConstraint) -> Self {
        Constraint::Soft(c)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Teacher => "teacher",
            EntityKind::Room => "room",
            EntityKind::Group => "group",
            EntityKind::Course => "course",
            EntityKind::Session => "session",
        };
        f.write_str(name)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.id)
    }
}

impl fmt::Display for HardConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.rule_name(), self.entity().id)
    }
}

impl fmt::Display for SoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftConstraint::PeriodPenalty { period } => {
                write!(f, "{}({})", self.rule_name(), period)
            }
            SoftConstraint::PreferredSlot { course } => write!(f, "{}({course})", self.rule_name()),
            SoftConstraint::FreeDay { group }
            | SoftConstraint::Compactness { group }
            | SoftConstraint::GroupLoad { group } => write!(f, "{}({group})", self.rule_name()),
            SoftConstraint::TeacherLoad { teacher }
            | SoftConstraint::StudyDay { teacher }
            | SoftConstraint::TeacherDayGap { teacher } => {
                write!(f, "{}({teacher})", self.rule_name())
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Hard(c) => write!(f, "HARD {c}"),
            Constraint::Soft(c) => write!(f, "SOFT {c}"),
        }
    }
}
