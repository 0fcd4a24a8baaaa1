//! Catalog → model translation.
//!
//! # Pruning
//! Each course's candidate placements are filtered before any variable is
//! created, in stages: room features, room capacity, room whitelist, slots
//! (teacher availability, slot whitelist, forenoon-only courses), then room
//! availability per (slot, room). A session left without candidates is a
//! [`ModelError`].
//!
//! # Hard groups
//! Emitted in a fixed order, each entity sorted by id and each slot in
//! `(day, start, id)` order:
//! 1. exactly one placement per session
//! 2. teacher × slot ≤ 1
//! 3. room × slot ≤ 1
//! 4. group × slot ≤ 1
//! 5. course × day ≤ 1 (unless the course allows repeats)
//! 6. teacher × day ≤ daily limit, teacher lectures × day ≤ lecture limit
//! 7. group × day ≤ daily limit
//! 8. one-per-day courses of a teacher: at most one course per day
//! 9. study days: `w_first + w_second ≤ 1` over teacher day indicators
//!
//! A day indicator `w` is a binary with `n·w >= Σ x` and `w <= Σ x` over the
//! teacher's (or course's) choice variables on that day.
//!
//! # Soft terms
//! Preferred slots, period penalties, and free days are direct penalties on
//! choice variables. The rest are linearized with auxiliary variables:
//! - gaps: for every busy cell `a`, `k` idle cells, busy cell `b`,
//!   `g >= o_a + o_b - Σ o_mid - 1` with `g` weighted by the penalty for
//!   `k`; cells are periods of a group's day or teaching days of a teacher;
//! - study day: the first choice's day indicator;
//! - load: `over_d >= load_d - ⌈n / days⌉`.
//!
//! Each auxiliary's first row is the one that fixes its least value.
//!
//! # Reference
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, warn};

use super::model::{Choice, LinearConstraint, Model, ObjectiveTerm, Sense, VarId, VarKind, Variable};
use crate::catalog::Catalog;
use crate::config::SoftWeights;
use crate::error::{EmptyDomain, ModelError, PruneStage};
use crate::models::{Constraint, Course, HardConstraint, SoftConstraint};

/// Builds a [`Model`] from a catalog.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use u_timetable::catalog::{Catalog, RawCourse, RawRecords, RawRoom, RawTeacher};
/// use u_timetable::cp::ModelBuilder;
///
/// let records = RawRecords::new()
///     .slot("mon-1", 0, 480, 570)
///     .slot("tue-1", 1, 480, 570)
///     .room(RawRoom::new("R1", 30))
///     .teacher(RawTeacher::new("T1"))
///     .course(RawCourse::new("ALG", 2))
///     .teach("T1", "ALG");
/// let catalog = Arc::new(Catalog::load(records).unwrap());
///
/// let model = ModelBuilder::new(catalog).build().unwrap();
/// assert_eq!(model.choices(0).len(), 2);
/// ```
pub struct ModelBuilder {
    catalog: Arc<Catalog>,
    weights: SoftWeights,
    relaxed: BTreeSet<HardConstraint>,
}

/// Candidate placements of one course.
struct Domain {
    pairs: Vec<(usize, usize)>,
}

impl ModelBuilder {
    /// Creates a builder with default weights and no relaxation.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            weights: SoftWeights::default(),
            relaxed: BTreeSet::new(),
        }
    }

    /// Sets the soft-constraint weights.
    pub fn with_weights(mut self, weights: SoftWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Leaves the given hard groups out of the model.
    ///
    /// Groups that cannot be relaxed (assignment, capacity, features) are
    /// ignored.
    pub fn relaxing(mut self, groups: impl IntoIterator<Item = HardConstraint>) -> Self {
        for g in groups {
            if g.is_relaxable() {
                self.relaxed.insert(g);
            } else {
                warn!(group = %g, "ignoring relaxation of a non-relaxable group");
            }
        }
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    /// [`ModelError`] listing every session with an empty domain.
    pub fn build(&self) -> Result<Model, ModelError> {
        let catalog = &self.catalog;
        let mut pruned_by = BTreeSet::new();
        let mut empty = Vec::new();
        let mut domains = Vec::with_capacity(catalog.courses().len());

        for course in catalog.courses() {
            match self.prune(course, &mut pruned_by) {
                Ok(domain) => domains.push(domain),
                Err((stage, message)) => {
                    for n in 1..=course.sessions_per_week {
                        empty.push(EmptyDomain {
                            session_id: course.session_id(n),
                            course_id: course.id.clone(),
                            stage,
                            message: message.clone(),
                        });
                    }
                    domains.push(Domain { pairs: Vec::new() });
                }
            }
        }
        if !empty.is_empty() {
            debug!(sessions = empty.len(), "empty domains after pruning");
            return Err(ModelError { sessions: empty });
        }

        let mut model = Model {
            catalog: Arc::clone(catalog),
            weights: self.weights.clone(),
            relaxed: self.relaxed.clone(),
            variables: Vec::new(),
            choices: Vec::with_capacity(catalog.session_count()),
            constraints: Vec::new(),
            objective: Vec::new(),
            pruned_by,
        };

        for (si, session) in catalog.sessions().iter().enumerate() {
            let domain = &domains[catalog.course_idx_of(si)];
            let mut choices = Vec::with_capacity(domain.pairs.len());
            for &(slot, room) in &domain.pairs {
                let var = add_var(
                    &mut model.variables,
                    VarKind::Binary,
                    format!(
                        "x[{}@{}/{}]",
                        session.id,
                        catalog.slots()[slot].id,
                        catalog.rooms()[room].id
                    ),
                );
                choices.push(Choice { var, slot, room });
            }
            model.choices.push(choices);
        }

        self.emit_assignment(&mut model);
        self.emit_no_overlap(&mut model);
        self.emit_distribution(&mut model);
        self.emit_daily_limits(&mut model);
        self.emit_one_per_day(&mut model);
        self.emit_teacher_days(&mut model);
        self.emit_soft(&mut model);

        debug!(
            sessions = model.session_count(),
            variables = model.variables.len(),
            constraints = model.constraints.len(),
            objective_terms = model.objective.len(),
            relaxed = model.relaxed.len(),
            "model built"
        );
        Ok(model)
    }

    fn is_relaxed(&self, group: &HardConstraint) -> bool {
        self.relaxed.contains(group)
    }

    /// Filters candidate placements of a course.
    ///
    /// Records in `pruned_by` every relaxable group that removed something.
    fn prune(
        &self,
        course: &Course,
        pruned_by: &mut BTreeSet<HardConstraint>,
    ) -> Result<Domain, (PruneStage, String)> {
        let catalog = &self.catalog;
        let rooms = catalog.rooms();

        let mut candidates: Vec<usize> = (0..rooms.len())
            .filter(|&r| rooms[r].has_features(&course.required_features))
            .collect();
        if candidates.is_empty() {
            return Err((
                PruneStage::Features,
                format!(
                    "no room provides features [{}]",
                    course
                        .required_features
                        .iter()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        }

        let size = catalog.enrolled_size(course);
        candidates.retain(|&r| rooms[r].capacity >= size);
        if candidates.is_empty() {
            return Err((
                PruneStage::Capacity,
                format!("no suitable room seats {size} students"),
            ));
        }

        let whitelist = HardConstraint::CourseRooms {
            course: course.id.clone(),
        };
        if !self.is_relaxed(&whitelist) {
            let before = candidates.len();
            candidates.retain(|&r| course.accepts_room(&rooms[r].id));
            if candidates.len() < before {
                pruned_by.insert(whitelist);
            }
            if candidates.is_empty() {
                return Err((
                    PruneStage::AllowedRooms,
                    "allowed rooms exclude every suitable room".to_string(),
                ));
            }
        }

        let slots = catalog.slots();
        let mut slot_ids: Vec<usize> = (0..slots.len()).collect();
        for teacher_id in &course.teachers {
            let group = HardConstraint::TeacherAvailability {
                teacher: teacher_id.clone(),
            };
            let Some(teacher) = catalog.teacher(teacher_id) else {
                continue;
            };
            if self.is_relaxed(&group) {
                continue;
            }
            let before = slot_ids.len();
            slot_ids.retain(|&s| teacher.is_available(&slots[s].id));
            if slot_ids.len() < before {
                pruned_by.insert(group);
            }
        }
        let slot_list = HardConstraint::CourseSlots {
            course: course.id.clone(),
        };
        if !self.is_relaxed(&slot_list) {
            let before = slot_ids.len();
            slot_ids.retain(|&s| course.accepts_slot(&slots[s].id));
            if slot_ids.len() < before {
                pruned_by.insert(slot_list);
            }
        }
        let forenoon = HardConstraint::CourseForenoon {
            course: course.id.clone(),
        };
        if course.only_forenoon && !self.is_relaxed(&forenoon) {
            let before = slot_ids.len();
            slot_ids.retain(|&s| course.accepts_time(&slots[s]));
            if slot_ids.len() < before {
                pruned_by.insert(forenoon);
            }
        }
        if slot_ids.is_empty() {
            return Err((
                PruneStage::Slots,
                "no slot passes teacher availability and the course's slot limits".to_string(),
            ));
        }

        let mut pairs = Vec::with_capacity(slot_ids.len() * candidates.len());
        for &s in &slot_ids {
            for &r in &candidates {
                let room = &rooms[r];
                if room.is_available(&slots[s].id) {
                    pairs.push((s, r));
                    continue;
                }
                let group = HardConstraint::RoomAvailability {
                    room: room.id.clone(),
                };
                if self.is_relaxed(&group) {
                    pairs.push((s, r));
                } else {
                    pruned_by.insert(group);
                }
            }
        }
        if pairs.is_empty() {
            return Err((
                PruneStage::RoomAvailability,
                "every suitable room is unavailable in every remaining slot".to_string(),
            ));
        }
        Ok(Domain { pairs })
    }

    fn emit_assignment(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);
        for (si, session) in catalog.sessions().iter().enumerate() {
            let terms = model.choices[si].iter().map(|c| (c.var, 1)).collect();
            model.constraints.push(LinearConstraint {
                origin: HardConstraint::SessionAssigned {
                    session: session.id.clone(),
                }
                .into(),
                terms,
                sense: Sense::Eq,
                rhs: 1,
            });
        }
    }

    fn emit_no_overlap(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);

        for teacher in catalog.teachers() {
            let group = HardConstraint::TeacherNoOverlap {
                teacher: teacher.id.clone(),
            };
            if self.is_relaxed(&group) {
                continue;
            }
            let sessions = sessions_where(&catalog, |c| c.teachers.contains(&teacher.id));
            let by_slot = group_by(model, &sessions, |c| Some(c.slot));
            push_bounded(model, &group, by_slot, 1);
        }

        let all: Vec<usize> = (0..catalog.session_count()).collect();
        let mut by_room: BTreeMap<usize, BTreeMap<usize, Vec<(usize, VarId)>>> = BTreeMap::new();
        for &s in &all {
            for c in &model.choices[s] {
                by_room
                    .entry(c.room)
                    .or_default()
                    .entry(c.slot)
                    .or_default()
                    .push((s, c.var));
            }
        }
        for (room_idx, by_slot) in by_room {
            let group = HardConstraint::RoomNoOverlap {
                room: catalog.rooms()[room_idx].id.clone(),
            };
            if self.is_relaxed(&group) {
                continue;
            }
            push_bounded(model, &group, by_slot, 1);
        }

        for g in catalog.groups() {
            let group = HardConstraint::GroupNoOverlap { group: g.id.clone() };
            if self.is_relaxed(&group) {
                continue;
            }
            let sessions = sessions_where(&catalog, |c| c.groups.contains(&g.id));
            let by_slot = group_by(model, &sessions, |c| Some(c.slot));
            push_bounded(model, &group, by_slot, 1);
        }
    }

    fn emit_distribution(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);
        for (ci, course) in catalog.courses().iter().enumerate() {
            let group = HardConstraint::CourseDistribution {
                course: course.id.clone(),
            };
            if course.allow_same_day || course.sessions_per_week < 2 || self.is_relaxed(&group) {
                continue;
            }
            let sessions: Vec<usize> = catalog.sessions_of(ci).collect();
            let by_day = group_by(model, &sessions, |c| Some(catalog.day_of_slot(c.slot)));
            push_bounded(model, &group, by_day, 1);
        }
    }

    fn emit_daily_limits(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);
        for teacher in catalog.teachers() {
            let Some(max) = teacher.max_sessions_per_day else {
                continue;
            };
            let group = HardConstraint::TeacherDailyLimit {
                teacher: teacher.id.clone(),
            };
            if self.is_relaxed(&group) {
                continue;
            }
            let sessions = sessions_where(&catalog, |c| c.teachers.contains(&teacher.id));
            let by_day = group_by(model, &sessions, |c| Some(catalog.day_of_slot(c.slot)));
            push_bounded(model, &group, by_day, max);
        }
        for teacher in catalog.teachers() {
            let Some(max) = teacher.max_lectures_per_day else {
                continue;
            };
            let group = HardConstraint::TeacherLectureLimit {
                teacher: teacher.id.clone(),
            };
            if self.is_relaxed(&group) {
                continue;
            }
            let lectures =
                sessions_where(&catalog, |c| c.is_lecture && c.teachers.contains(&teacher.id));
            let by_day = group_by(model, &lectures, |c| Some(catalog.day_of_slot(c.slot)));
            push_bounded(model, &group, by_day, max);
        }
        for g in catalog.groups() {
            let Some(max) = g.max_sessions_per_day else {
                continue;
            };
            let group = HardConstraint::GroupDailyLimit { group: g.id.clone() };
            if self.is_relaxed(&group) {
                continue;
            }
            let sessions = sessions_where(&catalog, |c| c.groups.contains(&g.id));
            let by_day = group_by(model, &sessions, |c| Some(catalog.day_of_slot(c.slot)));
            push_bounded(model, &group, by_day, max);
        }
    }

    fn emit_one_per_day(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);
        for teacher in catalog.teachers() {
            let group = HardConstraint::OneCoursePerDay {
                teacher: teacher.id.clone(),
            };
            let courses: Vec<usize> = catalog
                .courses()
                .iter()
                .enumerate()
                .filter(|(_, c)| c.one_per_day && c.teachers.contains(&teacher.id))
                .map(|(ci, _)| ci)
                .collect();
            if courses.len() < 2 || self.is_relaxed(&group) {
                continue;
            }

            let mut by_day: BTreeMap<usize, Vec<VarId>> = BTreeMap::new();
            for ci in courses {
                let sessions: Vec<usize> = catalog.sessions_of(ci).collect();
                let days = group_by(model, &sessions, |c| Some(catalog.day_of_slot(c.slot)));
                for (d, entries) in days {
                    let u = indicator(
                        model,
                        group.clone().into(),
                        format!("on[{}@day{}]", catalog.courses()[ci].id, catalog.days()[d]),
                        &entries,
                    );
                    by_day.entry(d).or_default().push(u);
                }
            }
            for (_, courses_on_day) in by_day {
                if courses_on_day.len() < 2 {
                    continue;
                }
                model.constraints.push(LinearConstraint {
                    origin: group.clone().into(),
                    terms: courses_on_day.into_iter().map(|u| (u, 1)).collect(),
                    sense: Sense::Le,
                    rhs: 1,
                });
            }
        }
    }

    /// Study days (hard and soft) and teacher day gaps, over one day
    /// indicator per teacher and teaching day.
    fn emit_teacher_days(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);
        let w = &self.weights;
        for teacher in catalog.teachers() {
            let hard = HardConstraint::TeacherStudyDay {
                teacher: teacher.id.clone(),
            };
            let study = teacher.study_days.filter(|_| !self.is_relaxed(&hard));
            let preferred = teacher
                .study_days
                .filter(|sd| sd.first != sd.second && w.study_day_miss != 0)
                .and_then(|sd| catalog.day_pos(sd.first));
            let day_gaps = teacher.avoid_day_gaps
                && w.day_gap_penalties.iter().any(|p| *p != 0)
                && catalog.teacher_load(&teacher.id) > 1;
            if study.is_none() && preferred.is_none() && !day_gaps {
                continue;
            }

            let study_pos: Vec<usize> = study
                .iter()
                .flat_map(|sd| [sd.first, sd.second])
                .filter_map(|day| catalog.day_pos(day))
                .collect();
            let sessions = sessions_where(&catalog, |c| c.teachers.contains(&teacher.id));
            let by_day = group_by(model, &sessions, |c| Some(catalog.day_of_slot(c.slot)));
            let mut works: Vec<Option<VarId>> = vec![None; catalog.days().len()];
            for (d, entries) in by_day {
                let origin: Constraint = if study_pos.contains(&d) {
                    hard.clone().into()
                } else if preferred == Some(d) {
                    SoftConstraint::StudyDay {
                        teacher: teacher.id.clone(),
                    }
                    .into()
                } else if day_gaps {
                    SoftConstraint::TeacherDayGap {
                        teacher: teacher.id.clone(),
                    }
                    .into()
                } else {
                    continue;
                };
                let name = format!("works[{}@day{}]", teacher.id, catalog.days()[d]);
                works[d] = Some(indicator(model, origin, name, &entries));
            }

            if let Some(sd) = study {
                let first = catalog.day_pos(sd.first).and_then(|d| works[d]);
                let second = catalog.day_pos(sd.second).and_then(|d| works[d]);
                let terms = match (first, second) {
                    (Some(a), _) if sd.first == sd.second => vec![(a, 1)],
                    (Some(a), Some(b)) => vec![(a, 1), (b, 1)],
                    _ => Vec::new(),
                };
                if !terms.is_empty() {
                    let rhs = terms.len() as i64 - 1;
                    model.constraints.push(LinearConstraint {
                        origin: hard.clone().into(),
                        terms,
                        sense: Sense::Le,
                        rhs,
                    });
                }
            }
            if let Some(var) = preferred.and_then(|d| works[d]) {
                model.objective.push(ObjectiveTerm {
                    origin: SoftConstraint::StudyDay {
                        teacher: teacher.id.clone(),
                    },
                    var,
                    coef: w.study_day_miss,
                });
            }
            if day_gaps {
                let cells: Vec<Vec<VarId>> = works.iter().map(|v| v.iter().copied().collect()).collect();
                let origin = SoftConstraint::TeacherDayGap {
                    teacher: teacher.id.clone(),
                };
                emit_gaps(model, &origin, &teacher.id, &cells, &w.day_gap_penalties);
            }
        }
    }

    fn emit_soft(&self, model: &mut Model) {
        let catalog = Arc::clone(&model.catalog);
        let w = &self.weights;

        // Direct penalties on choice variables
        for si in 0..catalog.session_count() {
            let course = catalog.course_of(si);
            for c in model.choices[si].clone() {
                let slot = &catalog.slots()[c.slot];
                if w.preferred_slot_miss != 0 && course.misses_preference(&slot.id) {
                    model.objective.push(ObjectiveTerm {
                        origin: SoftConstraint::PreferredSlot {
                            course: course.id.clone(),
                        },
                        var: c.var,
                        coef: w.preferred_slot_miss,
                    });
                }
                let period = catalog.period(c.slot);
                let penalty = w.period_penalty(period);
                if penalty != 0 {
                    model.objective.push(ObjectiveTerm {
                        origin: SoftConstraint::PeriodPenalty { period },
                        var: c.var,
                        coef: penalty,
                    });
                }
            }
        }

        for g in catalog.groups() {
            let sessions = sessions_where(&catalog, |c| c.groups.contains(&g.id));
            if sessions.is_empty() {
                continue;
            }
            if let Some(day) = g.free_day.filter(|_| w.free_day != 0) {
                for &s in &sessions {
                    for c in model.choices[s].clone() {
                        if catalog.slots()[c.slot].day == day {
                            model.objective.push(ObjectiveTerm {
                                origin: SoftConstraint::FreeDay { group: g.id.clone() },
                                var: c.var,
                                coef: w.free_day,
                            });
                        }
                    }
                }
            }
            // Occupancy counts are only 0/1 while the group cannot overlap.
            let overlap = HardConstraint::GroupNoOverlap { group: g.id.clone() };
            let gaps = w.gap_penalties.iter().any(|p| *p != 0);
            if gaps && sessions.len() >= 2 && !self.is_relaxed(&overlap) {
                self.emit_compactness(model, &g.id, &sessions);
            }
            if w.uneven_load != 0 {
                let origin = SoftConstraint::GroupLoad { group: g.id.clone() };
                let total = catalog.group_load(&g.id);
                emit_load(model, origin, &sessions, total, w.uneven_load);
            }
        }

        if w.uneven_load != 0 {
            for teacher in catalog.teachers() {
                let sessions = sessions_where(&catalog, |c| c.teachers.contains(&teacher.id));
                if sessions.is_empty() {
                    continue;
                }
                let origin = SoftConstraint::TeacherLoad {
                    teacher: teacher.id.clone(),
                };
                let total = catalog.teacher_load(&teacher.id);
                emit_load(model, origin, &sessions, total, w.uneven_load);
            }
        }
    }

    fn emit_compactness(&self, model: &mut Model, group_id: &str, sessions: &[usize]) {
        let catalog = Arc::clone(&model.catalog);
        let origin = SoftConstraint::Compactness {
            group: group_id.to_string(),
        };
        let occupancy = group_by(model, sessions, |c| Some(c.slot));

        for d in 0..catalog.days().len() {
            let cells: Vec<Vec<VarId>> = catalog
                .day_slots(d)
                .iter()
                .map(|s| {
                    occupancy
                        .get(s)
                        .map(|v| v.iter().map(|(_, var)| *var).collect())
                        .unwrap_or_default()
                })
                .collect();
            let label = format!("{group_id}@day{}", catalog.days()[d]);
            emit_gaps(model, &origin, &label, &cells, &self.weights.gap_penalties);
        }
    }
}

fn add_var(variables: &mut Vec<Variable>, kind: VarKind, name: String) -> VarId {
    variables.push(Variable { kind, name });
    VarId(variables.len() - 1)
}

/// Session indices of courses matching `pred`, in session order.
fn sessions_where(catalog: &Catalog, pred: impl Fn(&Course) -> bool) -> Vec<usize> {
    (0..catalog.session_count())
        .filter(|&s| pred(catalog.course_of(s)))
        .collect()
}

/// Choice variables of `sessions` bucketed by `key`.
fn group_by(
    model: &Model,
    sessions: &[usize],
    key: impl Fn(&Choice) -> Option<usize>,
) -> BTreeMap<usize, Vec<(usize, VarId)>> {
    let mut buckets: BTreeMap<usize, Vec<(usize, VarId)>> = BTreeMap::new();
    for &s in sessions {
        for c in &model.choices[s] {
            if let Some(k) = key(c) {
                buckets.entry(k).or_default().push((s, c.var));
            }
        }
    }
    buckets
}

/// Emits `Σ vars <= bound` per bucket when more than `bound` sessions could
/// meet in it.
fn push_bounded(
    model: &mut Model,
    group: &HardConstraint,
    buckets: BTreeMap<usize, Vec<(usize, VarId)>>,
    bound: u32,
) {
    for (_, entries) in buckets {
        let distinct: BTreeSet<usize> = entries.iter().map(|(s, _)| *s).collect();
        if distinct.len() <= bound as usize {
            continue;
        }
        model.constraints.push(LinearConstraint {
            origin: Constraint::Hard(group.clone()),
            terms: entries.into_iter().map(|(_, v)| (v, 1)).collect(),
            sense: Sense::Le,
            rhs: i64::from(bound),
        });
    }
}

/// Binary indicator of "any of `entries` is set":
/// `n·w - Σ x >= 0` (n = distinct sessions) and `w - Σ x <= 0`.
fn indicator(
    model: &mut Model,
    origin: Constraint,
    name: String,
    entries: &[(usize, VarId)],
) -> VarId {
    let w = add_var(&mut model.variables, VarKind::Binary, name);
    let n = entries.iter().map(|(s, _)| *s).collect::<BTreeSet<_>>().len() as i64;

    let mut at_least = vec![(w, n)];
    at_least.extend(entries.iter().map(|(_, v)| (*v, -1)));
    model.constraints.push(LinearConstraint {
        origin: origin.clone(),
        terms: at_least,
        sense: Sense::Ge,
        rhs: 0,
    });
    let mut at_most = vec![(w, 1)];
    at_most.extend(entries.iter().map(|(_, v)| (*v, -1)));
    model.constraints.push(LinearConstraint {
        origin,
        terms: at_most,
        sense: Sense::Le,
        rhs: 0,
    });
    w
}

/// Emits one gap variable per (busy cell, `k` idle cells, busy cell)
/// pattern, weighted by `penalties[k - 1]`. A cell is busy when one of its
/// variables is set; cells without variables are never busy.
fn emit_gaps(
    model: &mut Model,
    origin: &SoftConstraint,
    label: &str,
    cells: &[Vec<VarId>],
    penalties: &[i64],
) {
    for (k, &penalty) in (1..).zip(penalties) {
        if penalty == 0 {
            continue;
        }
        for a in 0..cells.len() {
            let b = a + k + 1;
            if b >= cells.len() {
                break;
            }
            if cells[a].is_empty() || cells[b].is_empty() {
                continue;
            }
            let g = add_var(
                &mut model.variables,
                VarKind::NonNegative { upper: Some(1) },
                format!("gap[{label}:{}+{k}]", a + 1),
            );
            let mut terms = vec![(g, 1)];
            terms.extend(cells[a].iter().chain(&cells[b]).map(|v| (*v, -1)));
            terms.extend(cells[a + 1..b].iter().flatten().map(|v| (*v, 1)));
            model.constraints.push(LinearConstraint {
                origin: origin.clone().into(),
                terms,
                sense: Sense::Ge,
                rhs: -1,
            });
            model.objective.push(ObjectiveTerm {
                origin: origin.clone(),
                var: g,
                coef: penalty,
            });
        }
    }
}

/// Emits `over_d >= load_d - cap` per day for one teacher or group with
/// `total` weekly sessions.
fn emit_load(
    model: &mut Model,
    origin: SoftConstraint,
    sessions: &[usize],
    total: u32,
    weight: i64,
) {
    let catalog = Arc::clone(&model.catalog);
    let days = catalog.days().len();
    if days == 0 {
        return;
    }
    let cap = (total as usize).div_ceil(days);
    let by_day = group_by(model, sessions, |c| Some(catalog.day_of_slot(c.slot)));
    for (d, entries) in by_day {
        let distinct: BTreeSet<usize> = entries.iter().map(|(s, _)| *s).collect();
        if distinct.len() <= cap {
            continue;
        }
        let over = add_var(
            &mut model.variables,
            VarKind::NonNegative {
                upper: Some((distinct.len() - cap) as i64),
            },
            format!("over[{origin}@day{}]", catalog.days()[d]),
        );
        let mut terms = vec![(over, 1)];
        terms.extend(entries.iter().map(|(_, v)| (*v, -1)));
        model.constraints.push(LinearConstraint {
            origin: origin.clone().into(),
            terms,
            sense: Sense::Ge,
            rhs: -(cap as i64),
        });
        model.objective.push(ObjectiveTerm {
            origin: origin.clone(),
            var: over,
            coef: weight,
        });
    }
}
