//! Catalog loading and integrity checks.
//!
//! Detects:
//! - Duplicate IDs per entity kind
//! - Dangling references between records
//! - Non-positive session counts
//! - Empty or overlapping time slots
//! - Courses without teachers
//! - Feature tags outside a declared vocabulary
//!
//! All issues are collected before failing so callers can fix the data in
//! one pass.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::{Catalog, RawRecords};
use crate::error::{DataError, DataIssue, DataIssueKind};
use crate::models::{Course, Room, Session, StudentGroup, Teacher, TimeSlot};

/// Records IDs of one entity kind, reporting duplicates.
fn collect_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<DataIssue>,
) -> BTreeSet<&'a str> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            issues.push(DataIssue::new(
                DataIssueKind::DuplicateId,
                id,
                format!("Duplicate {kind} ID: {id}"),
            ));
        }
    }
    seen
}

fn check_refs<'a>(
    owner: &str,
    target: &str,
    refs: impl Iterator<Item = &'a String>,
    known: &BTreeSet<&str>,
    issues: &mut Vec<DataIssue>,
) {
    for r in refs {
        if !known.contains(r.as_str()) {
            issues.push(DataIssue::new(
                DataIssueKind::UnknownReference,
                owner,
                format!("'{owner}' references unknown {target} '{r}'"),
            ));
        }
    }
}

fn check_features<'a>(
    owner: &str,
    tags: impl Iterator<Item = &'a String>,
    vocabulary: &BTreeSet<&str>,
    issues: &mut Vec<DataIssue>,
) {
    if vocabulary.is_empty() {
        return;
    }
    for tag in tags {
        if !vocabulary.contains(tag.as_str()) {
            issues.push(DataIssue::new(
                DataIssueKind::UnknownFeature,
                owner,
                format!("'{owner}' uses undeclared feature '{tag}'"),
            ));
        }
    }
}

impl Catalog {
    /// Validates raw records and builds the catalog.
    ///
    /// # Errors
    /// [`DataError`] listing every issue found.
    pub fn load(records: RawRecords) -> Result<Self, DataError> {
        let mut issues = Vec::new();

        let slot_ids = collect_ids("slot", records.slots.iter().map(|s| s.id.as_str()), &mut issues);
        let room_ids = collect_ids("room", records.rooms.iter().map(|r| r.id.as_str()), &mut issues);
        let teacher_ids = collect_ids(
            "teacher",
            records.teachers.iter().map(|t| t.id.as_str()),
            &mut issues,
        );
        let group_ids = collect_ids(
            "group",
            records.groups.iter().map(|g| g.id.as_str()),
            &mut issues,
        );
        let course_ids = collect_ids(
            "course",
            records.courses.iter().map(|c| c.id.as_str()),
            &mut issues,
        );
        let vocabulary: BTreeSet<&str> = records.features.iter().map(String::as_str).collect();

        // Slots: valid ranges, no overlap within a day
        for s in &records.slots {
            if s.end <= s.start {
                issues.push(DataIssue::new(
                    DataIssueKind::InvalidTimeRange,
                    &s.id,
                    format!("Slot '{}' ends at {} before it starts at {}", s.id, s.end, s.start),
                ));
            }
        }
        let mut ordered: Vec<_> = records.slots.iter().filter(|s| s.end > s.start).collect();
        ordered.sort_by(|a, b| (a.day, a.start, &a.id).cmp(&(b.day, b.start, &b.id)));
        let mut latest: Option<(u32, u32, &str)> = None;
        for s in ordered {
            match latest {
                Some((day, end, id)) if day == s.day && s.start < end => {
                    issues.push(DataIssue::new(
                        DataIssueKind::OverlappingSlots,
                        &s.id,
                        format!("Slot '{}' overlaps slot '{id}' on day {day}", s.id),
                    ));
                    if s.end > end {
                        latest = Some((day, s.end, &s.id));
                    }
                }
                _ => latest = Some((s.day, s.end, &s.id)),
            }
        }

        for r in &records.rooms {
            check_refs(&r.id, "slot", r.unavailable.iter(), &slot_ids, &mut issues);
            check_features(&r.id, r.features.iter(), &vocabulary, &mut issues);
        }
        for t in &records.teachers {
            check_refs(&t.id, "slot", t.unavailable.iter(), &slot_ids, &mut issues);
        }

        for c in &records.courses {
            if c.sessions_per_week <= 0 || u32::try_from(c.sessions_per_week).is_err() {
                issues.push(DataIssue::new(
                    DataIssueKind::NonPositiveSessionCount,
                    &c.id,
                    format!(
                        "Course '{}' has invalid session count {}",
                        c.id, c.sessions_per_week
                    ),
                ));
            }
            check_refs(&c.id, "room", c.allowed_rooms.iter(), &room_ids, &mut issues);
            check_refs(&c.id, "slot", c.allowed_slots.iter(), &slot_ids, &mut issues);
            check_refs(&c.id, "slot", c.preferred_slots.iter(), &slot_ids, &mut issues);
            check_features(&c.id, c.required_features.iter(), &vocabulary, &mut issues);
        }

        for e in &records.enrollments {
            let owner = format!("{}->{}", e.group, e.course);
            check_refs(&owner, "group", std::iter::once(&e.group), &group_ids, &mut issues);
            check_refs(&owner, "course", std::iter::once(&e.course), &course_ids, &mut issues);
        }
        let mut taught: BTreeSet<&str> = BTreeSet::new();
        for t in &records.teaching {
            let owner = format!("{}->{}", t.teacher, t.course);
            check_refs(&owner, "teacher", std::iter::once(&t.teacher), &teacher_ids, &mut issues);
            check_refs(&owner, "course", std::iter::once(&t.course), &course_ids, &mut issues);
            if teacher_ids.contains(t.teacher.as_str()) {
                taught.insert(t.course.as_str());
            }
        }
        for c in &records.courses {
            if !taught.contains(c.id.as_str()) {
                issues.push(DataIssue::new(
                    DataIssueKind::MissingTeacher,
                    &c.id,
                    format!("Course '{}' has no teacher", c.id),
                ));
            }
        }

        if !issues.is_empty() {
            info!(issues = issues.len(), "catalog rejected");
            return Err(DataError { issues });
        }

        let catalog = Self::assemble(records);
        debug!(
            slots = catalog.slots.len(),
            rooms = catalog.rooms.len(),
            teachers = catalog.teachers.len(),
            groups = catalog.groups.len(),
            courses = catalog.courses.len(),
            sessions = catalog.sessions.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Builds typed entities and indices from validated records.
    fn assemble(records: RawRecords) -> Self {
        let mut slots: Vec<TimeSlot> = records
            .slots
            .into_iter()
            .map(|s| TimeSlot::new(s.id, s.day, s.start, s.end))
            .collect();
        slots.sort();

        let mut rooms: Vec<Room> = records
            .rooms
            .into_iter()
            .map(|r| Room {
                id: r.id,
                capacity: r.capacity,
                features: r.features.into_iter().collect(),
                unavailable: r.unavailable.into_iter().collect(),
            })
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));

        let mut teachers: Vec<Teacher> = records
            .teachers
            .into_iter()
            .map(|t| Teacher {
                id: t.id,
                unavailable: t.unavailable.into_iter().collect(),
                max_sessions_per_day: t.max_sessions_per_day,
                max_lectures_per_day: t.max_lectures_per_day,
                study_days: t.study_days,
                avoid_day_gaps: t.avoid_day_gaps,
            })
            .collect();
        teachers.sort_by(|a, b| a.id.cmp(&b.id));

        let mut course_teachers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for t in records.teaching {
            course_teachers.entry(t.course).or_default().insert(t.teacher);
        }
        let mut course_groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut group_courses: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for e in records.enrollments {
            group_courses
                .entry(e.group.clone())
                .or_default()
                .insert(e.course.clone());
            course_groups.entry(e.course).or_default().insert(e.group);
        }

        let mut groups: Vec<StudentGroup> = records
            .groups
            .into_iter()
            .map(|g| StudentGroup {
                courses: group_courses.remove(&g.id).unwrap_or_default(),
                id: g.id,
                size: g.size,
                max_sessions_per_day: g.max_sessions_per_day,
                free_day: g.free_day,
            })
            .collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));

        let mut courses: Vec<Course> = records
            .courses
            .into_iter()
            .map(|c| {
                let sessions = u32::try_from(c.sessions_per_week).unwrap_or(0);
                let mut course = Course::new(c.id, sessions);
                course.required_features = c.required_features.into_iter().collect();
                course.allowed_rooms = c.allowed_rooms.into_iter().collect();
                course.allowed_slots = c.allowed_slots.into_iter().collect();
                course.preferred_slots = c.preferred_slots.into_iter().collect();
                course.allow_same_day = c.allow_same_day;
                course.only_forenoon = c.only_forenoon;
                course.is_lecture = c.is_lecture;
                course.one_per_day = c.one_per_day;
                course.teachers = course_teachers.remove(&course.id).unwrap_or_default();
                course.groups = course_groups.remove(&course.id).unwrap_or_default();
                course
            })
            .collect();
        courses.sort_by(|a, b| a.id.cmp(&b.id));

        let mut sessions = Vec::new();
        let mut session_course = Vec::new();
        let mut course_sessions = Vec::with_capacity(courses.len());
        for (ci, course) in courses.iter().enumerate() {
            let first = sessions.len();
            for n in 1..=course.sessions_per_week {
                sessions.push(Session::of(course, n));
                session_course.push(ci);
            }
            course_sessions.push(first..sessions.len());
        }

        let mut days: Vec<u32> = slots.iter().map(|s| s.day).collect();
        days.dedup();
        let mut day_slots = vec![Vec::new(); days.len()];
        let mut slot_day = Vec::with_capacity(slots.len());
        let mut slot_period = Vec::with_capacity(slots.len());
        for (si, slot) in slots.iter().enumerate() {
            let d = days.binary_search(&slot.day).unwrap_or_default();
            day_slots[d].push(si);
            slot_day.push(d);
            slot_period.push(day_slots[d].len() as u32);
        }

        fn index_of<T>(items: &[T], id: impl Fn(&T) -> &String) -> BTreeMap<String, usize> {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (id(item).clone(), i))
                .collect()
        }

        Self {
            slot_index: index_of(&slots, |s| &s.id),
            room_index: index_of(&rooms, |r| &r.id),
            teacher_index: index_of(&teachers, |t| &t.id),
            group_index: index_of(&groups, |g| &g.id),
            course_index: index_of(&courses, |c| &c.id),
            features: records.features.into_iter().collect(),
            slots,
            rooms,
            teachers,
            groups,
            courses,
            sessions,
            days,
            day_slots,
            slot_day,
            slot_period,
            session_course,
            course_sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::three_courses;
    use crate::catalog::{RawCourse, RawRoom, RawTeacher};

    #[test]
    fn test_valid_records_load() {
        let c = Catalog::load(three_courses()).unwrap();
        assert_eq!(c.session_count(), 3);
        assert!(c.course("ALG").unwrap().teachers.contains("T1"));
    }

    #[test]
    fn test_duplicate_ids() {
        let records = three_courses()
            .room(RawRoom::new("R1", 10))
            .teacher(RawTeacher::new("T2"));
        let err = Catalog::load(records).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.issues.iter().all(|i| i.kind == DataIssueKind::DuplicateId));
        assert!(err.issues.iter().any(|i| i.record_id == "R1"));
    }

    #[test]
    fn test_dangling_references() {
        let records = three_courses()
            .teach("T9", "ALG")
            .enroll("G1", "NOPE")
            .course(RawCourse::new("DAT", 1).with_allowed_room("R9"))
            .teach("T1", "DAT");
        let err = Catalog::load(records).unwrap_err();
        let unknown: Vec<_> = err
            .issues
            .iter()
            .filter(|i| i.kind == DataIssueKind::UnknownReference)
            .collect();
        assert_eq!(unknown.len(), 3);
        assert!(unknown.iter().any(|i| i.message.contains("'T9'")));
        assert!(unknown.iter().any(|i| i.record_id == "DAT"));
    }

    #[test]
    fn test_non_positive_sessions() {
        let records = three_courses()
            .course(RawCourse::new("Z", 0))
            .course(RawCourse::new("N", -2))
            .teach("T1", "Z")
            .teach("T1", "N");
        let err = Catalog::load(records).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.has(DataIssueKind::NonPositiveSessionCount));
    }

    #[test]
    fn test_slot_ranges_and_overlap() {
        let records = three_courses()
            .slot("bad", 3, 600, 600)
            .slot("mon-x", 0, 500, 560);
        let err = Catalog::load(records).unwrap_err();
        assert!(err.has(DataIssueKind::InvalidTimeRange));
        assert!(err.has(DataIssueKind::OverlappingSlots));
        let overlap = err
            .issues
            .iter()
            .find(|i| i.kind == DataIssueKind::OverlappingSlots)
            .unwrap();
        assert_eq!(overlap.record_id, "mon-x");
    }

    #[test]
    fn test_adjacent_slots_do_not_overlap() {
        let records = three_courses().slot("mon-2", 0, 570, 660);
        assert!(Catalog::load(records).is_ok());
    }

    #[test]
    fn test_missing_teacher() {
        let records = three_courses().course(RawCourse::new("ORPHAN", 1));
        let err = Catalog::load(records).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].kind, DataIssueKind::MissingTeacher);
        assert_eq!(err.issues[0].record_id, "ORPHAN");
    }

    #[test]
    fn test_feature_vocabulary() {
        let records = three_courses()
            .feature("lab")
            .room(RawRoom::new("R3", 20).with_feature("lab").with_feature("piano"))
            .course(RawCourse::new("DAT", 1).with_feature("gpu"))
            .teach("T1", "DAT");
        let err = Catalog::load(records).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.issues.iter().all(|i| i.kind == DataIssueKind::UnknownFeature));
    }

    #[test]
    fn test_undeclared_vocabulary_is_unchecked() {
        let records = three_courses()
            .room(RawRoom::new("R3", 20).with_feature("lab"))
            .course(RawCourse::new("DAT", 1).with_feature("gpu"))
            .teach("T1", "DAT");
        assert!(Catalog::load(records).is_ok());
    }

    #[test]
    fn test_collects_all_issues() {
        let records = three_courses()
            .room(RawRoom::new("R1", 10))
            .course(RawCourse::new("Z", 0))
            .slot("bad", 4, 700, 600);
        let err = Catalog::load(records).unwrap_err();
        // duplicate room, bad count, no teacher for Z, bad range
        assert_eq!(err.issues.len(), 4);
    }
}
