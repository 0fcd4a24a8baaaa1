//! Infeasibility diagnostics.
//!
//! Explains an infeasible model by relaxing hard constraint groups (one
//! teacher's bookings, one room's availability, ...) and re-probing
//! feasibility.
//!
//! # Algorithm (deletion filter)
//!
//! 1. Candidates: every relaxable hard group that shaped the model, sorted.
//! 2. Trial with all candidates relaxed. Still infeasible: the conflict lies
//!    in rules that cannot be relaxed (assignment, capacity, features).
//! 3. Otherwise re-impose candidates one at a time. A group stays relaxed
//!    only when re-imposing it breaks feasibility.
//! 4. Stop after `max_trials` trials.
//!
//! The remaining relaxed groups form the conflict set. It is irreducible
//! when every candidate was tested and every trial was conclusive.
//!
//! Trials ignore soft weights and stop at the first valid assignment.
//!
//! # Reference
//! Chinneck (2008), "Feasibility and Infeasibility in Optimization", Ch. 6

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DiagnosticsConfig, SoftWeights, SolveLimits};
use crate::cp::{Model, ModelBuilder};
use crate::error::SolverError;
use crate::models::{EntityKind, EntityRef, HardConstraint, SolveStatus};
use crate::solver::SolverBackend;

/// Human-reviewable explanation of an infeasible model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Hard groups whose joint enforcement is infeasible.
    pub constraints: Vec<HardConstraint>,
    /// Teachers, rooms, groups, and courses behind those groups.
    pub entities: Vec<EntityRef>,
    /// Sessions touched by those groups.
    pub sessions: Vec<String>,
    /// Feasibility trials spent.
    pub trials: usize,
    /// Whether dropping any single listed group keeps the rest infeasible.
    pub irreducible: bool,
    /// Relaxing every relaxable group did not help.
    pub fixed_rules_conflict: bool,
}

impl ConflictReport {
    /// Whether the report names the given entity.
    pub fn implicates(&self, kind: EntityKind, id: &str) -> bool {
        self.entities.iter().any(|e| e.kind == kind && e.id == id)
    }

    /// Whether the report names a teacher.
    pub fn implicates_teacher(&self, id: &str) -> bool {
        self.implicates(EntityKind::Teacher, id)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fixed_rules_conflict {
            return write!(
                f,
                "infeasible even with every relaxable group lifted: room capacity, \
                 room features, or session counts cannot be met ({} trial(s))",
                self.trials
            );
        }
        writeln!(
            f,
            "infeasible: {} conflicting group(s) after {} trial(s){}",
            self.constraints.len(),
            self.trials,
            if self.irreducible { "" } else { " (not minimal)" }
        )?;
        for c in &self.constraints {
            writeln!(f, "  - {c}")?;
        }
        write!(f, "  sessions: {}", self.sessions.join(", "))
    }
}

/// Result of one feasibility trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trial {
    Feasible,
    Infeasible,
    Unknown,
}

/// Relaxation search.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use u_timetable::catalog::{Catalog, RawCourse, RawRecords, RawRoom, RawTeacher};
/// use u_timetable::cp::ModelBuilder;
/// use u_timetable::diagnostics::Diagnostics;
/// use u_timetable::solver::IlpBackend;
///
/// // Two courses, one teacher, one slot
/// let records = RawRecords::new()
///     .slot("mon-1", 0, 480, 570)
///     .room(RawRoom::new("R1", 30))
///     .room(RawRoom::new("R2", 30))
///     .teacher(RawTeacher::new("T1"))
///     .course(RawCourse::new("A", 1))
///     .course(RawCourse::new("B", 1))
///     .teach("T1", "A")
///     .teach("T1", "B");
/// let model = ModelBuilder::new(Arc::new(Catalog::load(records).unwrap()))
///     .build()
///     .unwrap();
///
/// let backend = IlpBackend::new();
/// let report = Diagnostics::new(&backend).explain(&model).unwrap();
/// assert!(report.implicates_teacher("T1"));
/// ```
pub struct Diagnostics<'a, B: SolverBackend + ?Sized> {
    backend: &'a B,
    max_trials: usize,
    trial_limits: SolveLimits,
}

impl<'a, B: SolverBackend + ?Sized> Diagnostics<'a, B> {
    /// Creates a search with default bounds.
    pub fn new(backend: &'a B) -> Self {
        let defaults = DiagnosticsConfig::default();
        Self {
            backend,
            max_trials: defaults.max_trials,
            trial_limits: SolveLimits::with_time_limit(defaults.trial_time_limit_ms)
                .first_feasible(),
        }
    }

    /// Applies configured bounds.
    pub fn with_config(self, config: &DiagnosticsConfig) -> Self {
        self.with_max_trials(config.max_trials)
            .with_trial_time_limit(config.trial_time_limit_ms)
    }

    /// Sets the trial budget (at least 1).
    pub fn with_max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = max_trials.max(1);
        self
    }

    /// Sets the time limit of each trial.
    pub fn with_trial_time_limit(mut self, time_limit_ms: u64) -> Self {
        self.trial_limits = SolveLimits::with_time_limit(time_limit_ms).first_feasible();
        self
    }

    /// Explains why the model is infeasible.
    ///
    /// # Errors
    /// [`SolverError`] when a trial's engine fails.
    pub fn explain(&self, model: &Model) -> Result<ConflictReport, SolverError> {
        let candidates: Vec<HardConstraint> = model
            .relaxable_groups()
            .into_iter()
            .filter(|g| !model.is_relaxed(g))
            .collect();
        debug!(candidates = candidates.len(), max_trials = self.max_trials, "diagnosing infeasibility");

        let mut trials = 0;
        let all: BTreeSet<HardConstraint> = candidates.iter().cloned().collect();
        let first = if candidates.is_empty() {
            Trial::Infeasible
        } else {
            trials += 1;
            self.trial(model, &all)?
        };
        if first != Trial::Feasible {
            let report = ConflictReport {
                constraints: Vec::new(),
                entities: Vec::new(),
                sessions: Vec::new(),
                trials,
                irreducible: false,
                fixed_rules_conflict: first == Trial::Infeasible,
            };
            info!(trials, fixed_rules = report.fixed_rules_conflict, "conflict outside relaxable groups");
            return Ok(report);
        }

        let mut relaxed = all;
        let mut complete = true;
        for group in &candidates {
            if trials >= self.max_trials {
                complete = false;
                break;
            }
            let mut kept = relaxed.clone();
            kept.remove(group);
            trials += 1;
            match self.trial(model, &kept)? {
                Trial::Feasible => relaxed = kept,
                Trial::Infeasible => {}
                Trial::Unknown => complete = false,
            }
        }

        let constraints: Vec<HardConstraint> = relaxed.into_iter().collect();
        let entities: BTreeSet<EntityRef> = constraints.iter().map(HardConstraint::entity).collect();
        let sessions: BTreeSet<usize> = constraints
            .iter()
            .flat_map(|g| affected_sessions(model, g))
            .collect();
        let catalog = model.catalog();
        let report = ConflictReport {
            constraints,
            entities: entities.into_iter().collect(),
            sessions: sessions
                .into_iter()
                .map(|s| catalog.sessions()[s].id.clone())
                .collect(),
            trials,
            irreducible: complete,
            fixed_rules_conflict: false,
        };
        info!(
            groups = report.constraints.len(),
            sessions = report.sessions.len(),
            trials,
            irreducible = report.irreducible,
            "conflict set found"
        );
        Ok(report)
    }

    /// Builds the model with `relaxed` lifted and checks feasibility.
    fn trial(&self, model: &Model, relaxed: &BTreeSet<HardConstraint>) -> Result<Trial, SolverError> {
        let groups = model.relaxed().iter().chain(relaxed.iter()).cloned();
        let trial_model = match ModelBuilder::new(model.catalog().clone())
            .with_weights(SoftWeights::disabled())
            .relaxing(groups)
            .build()
        {
            Ok(m) => m,
            Err(_) => return Ok(Trial::Infeasible),
        };
        let result = self.backend.solve(&trial_model, &self.trial_limits)?;
        let outcome = match result.status {
            SolveStatus::Optimal | SolveStatus::Feasible => Trial::Feasible,
            SolveStatus::Infeasible => Trial::Infeasible,
            SolveStatus::Timeout if result.has_assignment() => Trial::Feasible,
            SolveStatus::Timeout => Trial::Unknown,
        };
        debug!(relaxed = relaxed.len(), outcome = ?outcome, "trial");
        Ok(outcome)
    }
}

/// Sessions a hard group constrains.
fn affected_sessions(model: &Model, group: &HardConstraint) -> BTreeSet<usize> {
    let catalog = model.catalog();
    let mut sessions = model.sessions_in(group);
    let entity = group.entity();
    let matching = (0..catalog.session_count()).filter(|&s| {
        let course = catalog.course_of(s);
        match entity.kind {
            EntityKind::Teacher => course.teachers.contains(&entity.id),
            EntityKind::Group => course.groups.contains(&entity.id),
            EntityKind::Course => course.id == entity.id,
            EntityKind::Session => catalog.sessions()[s].id == entity.id,
            EntityKind::Room => model
                .choices(s)
                .iter()
                .any(|c| catalog.rooms()[c.room].id == entity.id),
        }
    });
    sessions.extend(matching);
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{load, teacher_clash, three_courses, week};
    use crate::catalog::{RawCourse, RawRoom, RawTeacher};
    use crate::solver::IlpBackend;
    use std::sync::Arc;

    fn model_of(records: crate::catalog::RawRecords) -> Model {
        ModelBuilder::new(Arc::new(load(records))).build().unwrap()
    }

    #[test]
    fn test_teacher_clash_implicates_teacher() {
        let model = model_of(teacher_clash());
        let backend = IlpBackend::new();
        let report = Diagnostics::new(&backend).explain(&model).unwrap();

        assert!(report.implicates_teacher("T1"));
        assert!(report
            .constraints
            .contains(&HardConstraint::TeacherNoOverlap { teacher: "T1".into() }));
        assert_eq!(report.sessions, vec!["A/1".to_string(), "B/1".to_string()]);
        assert_eq!(report.trials, 3);
        assert!(report.irreducible);
        assert!(!report.fixed_rules_conflict);
    }

    #[test]
    fn test_unneeded_groups_are_dropped() {
        // T1 is away on day 0; its two sessions need the only other slot.
        let records = week(2, 1)
            .room(RawRoom::new("R1", 30))
            .room(RawRoom::new("R2", 30))
            .teacher(RawTeacher::new("T1").with_unavailable("d0-p1"))
            .teacher(RawTeacher::new("T2"))
            .course(RawCourse::new("A", 1))
            .course(RawCourse::new("B", 1))
            .course(RawCourse::new("C", 1))
            .teach("T1", "A")
            .teach("T1", "B")
            .teach("T2", "C");
        let model = model_of(records);
        let backend = IlpBackend::new();
        let report = Diagnostics::new(&backend).explain(&model).unwrap();

        // Overlap and room rules are re-imposed first; availability alone remains.
        assert_eq!(
            report.constraints,
            vec![HardConstraint::TeacherAvailability { teacher: "T1".into() }]
        );
        assert_eq!(report.trials, 5);
        assert!(report.irreducible);
        assert!(report.implicates_teacher("T1"));
        assert!(!report.implicates(EntityKind::Room, "R1"));
        assert!(!report.sessions.contains(&"C/1".to_string()));
    }

    #[test]
    fn test_trial_budget() {
        let model = model_of(teacher_clash());
        let backend = IlpBackend::new();
        let report = Diagnostics::new(&backend)
            .with_max_trials(2)
            .explain(&model)
            .unwrap();
        assert_eq!(report.trials, 2);
        assert!(!report.irreducible);
        assert!(report.implicates_teacher("T1"));
    }

    #[test]
    fn test_report_display() {
        let model = model_of(teacher_clash());
        let backend = IlpBackend::new();
        let report = Diagnostics::new(&backend).explain(&model).unwrap();
        let text = report.to_string();
        assert!(text.contains("teacher-no-overlap(T1)"));
        assert!(text.contains("A/1"));
    }

    #[test]
    fn test_report_serializes() {
        let model = model_of(three_courses());
        let report = ConflictReport {
            constraints: vec![HardConstraint::RoomNoOverlap { room: "R1".into() }],
            entities: vec![HardConstraint::RoomNoOverlap { room: "R1".into() }.entity()],
            sessions: vec![model.catalog().sessions()[0].id.clone()],
            trials: 1,
            irreducible: true,
            fixed_rules_conflict: false,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: ConflictReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
