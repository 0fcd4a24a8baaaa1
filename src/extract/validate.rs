//! Hard-rule re-check.
//!
//! Validates an assignment directly against the catalog, without looking at
//! the model rows that produced it. Time conflicts use [`TimeSlot::overlaps`]
//! rather than slot identity.
//!
//! [`TimeSlot::overlaps`]: crate::models::TimeSlot::overlaps

use std::collections::{BTreeMap, BTreeSet};

use super::Placement;
use crate::catalog::Catalog;
use crate::error::{HardViolation, ValidationError};
use crate::models::{HardConstraint, Timetable};

struct Checker<'a> {
    catalog: &'a Catalog,
    relaxed: &'a BTreeSet<HardConstraint>,
    violations: Vec<HardViolation>,
}

impl<'a> Checker<'a> {
    fn report(&mut self, constraint: HardConstraint, sessions: &[usize], message: String) {
        if self.relaxed.contains(&constraint) {
            return;
        }
        let sessions = sessions
            .iter()
            .map(|&s| self.catalog.sessions()[s].id.clone())
            .collect();
        self.violations.push(HardViolation {
            constraint,
            sessions,
            message,
        });
    }

    /// Reports every pair of placements whose slots overlap.
    fn clashes(&mut self, constraint: HardConstraint, placed: &[&Placement]) {
        let catalog = self.catalog;
        let slots = catalog.slots();
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                if slots[a.slot].overlaps(&slots[b.slot]) {
                    let message = format!(
                        "{constraint}: {} and {} meet at {}",
                        catalog.sessions()[a.session].id,
                        catalog.sessions()[b.session].id,
                        slots[b.slot].id
                    );
                    self.report(constraint.clone(), &[a.session, b.session], message);
                }
            }
        }
    }

    /// Reports days on which a teacher gives more than one one-per-day
    /// course.
    fn one_per_day(&mut self, teacher_id: &str, placed: &[&Placement]) {
        let catalog = self.catalog;
        let mut per_day: BTreeMap<usize, BTreeMap<usize, Vec<usize>>> = BTreeMap::new();
        for p in placed {
            if catalog.course_of(p.session).one_per_day {
                per_day
                    .entry(catalog.day_of_slot(p.slot))
                    .or_default()
                    .entry(catalog.course_idx_of(p.session))
                    .or_default()
                    .push(p.session);
            }
        }
        for (d, courses) in per_day {
            if courses.len() < 2 {
                continue;
            }
            let ids: Vec<&str> = courses
                .keys()
                .map(|&c| catalog.courses()[c].id.as_str())
                .collect();
            let message = format!(
                "{teacher_id}: courses {} share day {}",
                ids.join(", "),
                catalog.days()[d]
            );
            let sessions: Vec<usize> = courses.into_values().flatten().collect();
            self.report(
                HardConstraint::OneCoursePerDay {
                    teacher: teacher_id.to_string(),
                },
                &sessions,
                message,
            );
        }
    }

    /// Reports days on which more than `max` placements fall.
    fn daily(&mut self, constraint: HardConstraint, placed: &[&Placement], max: u32) {
        let catalog = self.catalog;
        let mut per_day: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for p in placed {
            per_day
                .entry(catalog.day_of_slot(p.slot))
                .or_default()
                .push(p.session);
        }
        for (d, sessions) in per_day {
            if sessions.len() > max as usize {
                let message = format!(
                    "{constraint}: {} sessions on day {} (max {max})",
                    sessions.len(),
                    catalog.days()[d]
                );
                self.report(constraint.clone(), &sessions, message);
            }
        }
    }
}

/// Checks every hard rule not listed in `relaxed`.
pub(crate) fn check(
    catalog: &Catalog,
    assignment: &[Option<Placement>],
    relaxed: &BTreeSet<HardConstraint>,
) -> Vec<HardViolation> {
    let mut ck = Checker {
        catalog,
        relaxed,
        violations: Vec::new(),
    };

    for (s, p) in assignment.iter().enumerate() {
        if p.is_none() {
            let session = &catalog.sessions()[s];
            ck.report(
                HardConstraint::SessionAssigned {
                    session: session.id.clone(),
                },
                &[s],
                format!("session {} has no single placement", session.id),
            );
        }
    }
    let placed: Vec<&Placement> = assignment.iter().flatten().collect();

    // Per-placement rules
    for p in &placed {
        let course = catalog.course_of(p.session);
        let slot = &catalog.slots()[p.slot];
        let room = &catalog.rooms()[p.room];
        let session = &catalog.sessions()[p.session].id;

        for teacher_id in &course.teachers {
            if let Some(teacher) = catalog.teacher(teacher_id) {
                if !teacher.is_available(&slot.id) {
                    ck.report(
                        HardConstraint::TeacherAvailability {
                            teacher: teacher_id.clone(),
                        },
                        &[p.session],
                        format!("{session}: teacher {teacher_id} is unavailable at {}", slot.id),
                    );
                }
            }
        }
        if !room.is_available(&slot.id) {
            ck.report(
                HardConstraint::RoomAvailability {
                    room: room.id.clone(),
                },
                &[p.session],
                format!("{session}: room {} is unavailable at {}", room.id, slot.id),
            );
        }
        let size = catalog.enrolled_size(course);
        if room.capacity < size {
            ck.report(
                HardConstraint::RoomCapacity {
                    course: course.id.clone(),
                },
                &[p.session],
                format!(
                    "{session}: room {} seats {} of {size} students",
                    room.id, room.capacity
                ),
            );
        }
        if !room.has_features(&course.required_features) {
            ck.report(
                HardConstraint::RoomFeatures {
                    course: course.id.clone(),
                },
                &[p.session],
                format!("{session}: room {} lacks required features", room.id),
            );
        }
        if !course.accepts_slot(&slot.id) {
            ck.report(
                HardConstraint::CourseSlots {
                    course: course.id.clone(),
                },
                &[p.session],
                format!("{session}: slot {} is not allowed", slot.id),
            );
        }
        if !course.accepts_time(slot) {
            ck.report(
                HardConstraint::CourseForenoon {
                    course: course.id.clone(),
                },
                &[p.session],
                format!("{session}: slot {} ends after noon", slot.id),
            );
        }
        if !course.accepts_room(&room.id) {
            ck.report(
                HardConstraint::CourseRooms {
                    course: course.id.clone(),
                },
                &[p.session],
                format!("{session}: room {} is not allowed", room.id),
            );
        }
    }

    // Overlaps and daily limits
    for teacher in catalog.teachers() {
        let mine: Vec<&Placement> = placed
            .iter()
            .copied()
            .filter(|p| catalog.course_of(p.session).teachers.contains(&teacher.id))
            .collect();
        ck.clashes(
            HardConstraint::TeacherNoOverlap {
                teacher: teacher.id.clone(),
            },
            &mine,
        );
        if let Some(max) = teacher.max_sessions_per_day {
            ck.daily(
                HardConstraint::TeacherDailyLimit {
                    teacher: teacher.id.clone(),
                },
                &mine,
                max,
            );
        }
        if let Some(max) = teacher.max_lectures_per_day {
            let lectures: Vec<&Placement> = mine
                .iter()
                .copied()
                .filter(|p| catalog.course_of(p.session).is_lecture)
                .collect();
            ck.daily(
                HardConstraint::TeacherLectureLimit {
                    teacher: teacher.id.clone(),
                },
                &lectures,
                max,
            );
        }
        if let Some(sd) = teacher.study_days {
            let on_study_day: Vec<usize> = mine
                .iter()
                .filter(|p| {
                    let day = catalog.slots()[p.slot].day;
                    day == sd.first || day == sd.second
                })
                .map(|p| p.session)
                .collect();
            let worked: BTreeSet<u32> = mine.iter().map(|p| catalog.slots()[p.slot].day).collect();
            if worked.contains(&sd.first) && worked.contains(&sd.second) {
                ck.report(
                    HardConstraint::TeacherStudyDay {
                        teacher: teacher.id.clone(),
                    },
                    &on_study_day,
                    format!(
                        "{}: teaches on both study days {} and {}",
                        teacher.id, sd.first, sd.second
                    ),
                );
            }
        }
        ck.one_per_day(&teacher.id, &mine);
    }
    for (r, room) in catalog.rooms().iter().enumerate() {
        let mine: Vec<&Placement> = placed.iter().copied().filter(|p| p.room == r).collect();
        ck.clashes(
            HardConstraint::RoomNoOverlap {
                room: room.id.clone(),
            },
            &mine,
        );
    }
    for group in catalog.groups() {
        let mine: Vec<&Placement> = placed
            .iter()
            .copied()
            .filter(|p| catalog.course_of(p.session).groups.contains(&group.id))
            .collect();
        ck.clashes(
            HardConstraint::GroupNoOverlap {
                group: group.id.clone(),
            },
            &mine,
        );
        if let Some(max) = group.max_sessions_per_day {
            ck.daily(
                HardConstraint::GroupDailyLimit {
                    group: group.id.clone(),
                },
                &mine,
                max,
            );
        }
    }
    for (ci, course) in catalog.courses().iter().enumerate() {
        if course.allow_same_day {
            continue;
        }
        let range = catalog.sessions_of(ci);
        let mine: Vec<&Placement> = placed
            .iter()
            .copied()
            .filter(|p| range.contains(&p.session))
            .collect();
        ck.daily(
            HardConstraint::CourseDistribution {
                course: course.id.clone(),
            },
            &mine,
            1,
        );
    }

    ck.violations
}

/// Validates a finished timetable against a catalog.
///
/// Entries naming unknown sessions, slots, or rooms count as unplaced
/// sessions.
///
/// # Errors
/// [`ValidationError`] listing every violated hard rule.
pub fn check_timetable(catalog: &Catalog, timetable: &Timetable) -> Result<(), ValidationError> {
    let mut assignment: Vec<Option<Placement>> = vec![None; catalog.session_count()];
    let mut seen = vec![0usize; catalog.session_count()];
    for entry in &timetable.entries {
        let Some(session) = catalog
            .sessions()
            .iter()
            .position(|s| s.id == entry.session_id)
        else {
            continue;
        };
        seen[session] += 1;
        let slot = catalog.slot_idx(&entry.slot_id);
        let room = catalog.room_idx(&entry.room_id);
        if let (Some(slot), Some(room)) = (slot, room) {
            assignment[session] = Some(Placement { session, slot, room });
        }
    }
    for (s, count) in seen.into_iter().enumerate() {
        if count != 1 {
            assignment[s] = None;
        }
    }

    let violations = check(catalog, &assignment, &BTreeSet::new());
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}
