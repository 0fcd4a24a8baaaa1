//! Solution extraction and validation.
//!
//! Turns raw solver values back into a [`Timetable`]:
//!
//! 1. decode one (slot, room) per session from the choice variables;
//! 2. re-check every hard rule against the catalog ([`validate`]);
//! 3. score the soft rules over the final assignment ([`score`]).
//!
//! An assignment that breaks a hard rule is never returned as a timetable,
//! whatever status the solver claimed.

mod score;
pub mod validate;

pub use validate::check_timetable;

use tracing::{error, info};

use crate::cp::Model;
use crate::error::ValidationError;
use crate::models::{SolveStatus, Timetable, TimetableEntry};
use crate::solver::SolveResult;

/// A session placed at catalog indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    pub session: usize,
    pub slot: usize,
    pub room: usize,
}

/// Extracts a validated timetable from a solver result.
///
/// Returns `Ok(None)` when the result carries no assignment (infeasible, or
/// a timeout before any incumbent).
///
/// # Errors
/// [`ValidationError`] when the decoded assignment breaks a hard rule.
pub fn extract(model: &Model, result: &SolveResult) -> Result<Option<Timetable>, ValidationError> {
    let Some(values) = result.values.as_deref() else {
        return Ok(None);
    };
    if result.status == SolveStatus::Infeasible {
        return Ok(None);
    }

    let assignment: Vec<Option<Placement>> = model
        .decode(values)
        .into_iter()
        .enumerate()
        .map(|(session, choice)| {
            choice.map(|c| Placement {
                session,
                slot: c.slot,
                room: c.room,
            })
        })
        .collect();

    let catalog = model.catalog();
    let violations = validate::check(catalog, &assignment, model.relaxed());
    if !violations.is_empty() {
        error!(
            status = ?result.status,
            violations = violations.len(),
            "solver assignment breaks hard constraints"
        );
        return Err(ValidationError { violations });
    }

    let placed: Vec<Placement> = assignment.into_iter().flatten().collect();
    let score = score::score(catalog, model.weights(), &placed);
    let entries = placed
        .iter()
        .map(|p| {
            let session = &catalog.sessions()[p.session];
            TimetableEntry {
                session_id: session.id.clone(),
                course_id: session.course_id.clone(),
                slot_id: catalog.slots()[p.slot].id.clone(),
                room_id: catalog.rooms()[p.room].id.clone(),
            }
        })
        .collect();

    let timetable = Timetable::new(result.status, entries, score);
    info!(
        status = ?timetable.status,
        sessions = timetable.entry_count(),
        score = timetable.score.total,
        best_effort = timetable.best_effort,
        "timetable extracted"
    );
    Ok(Some(timetable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{load, three_courses};
    use crate::cp::ModelBuilder;
    use crate::models::HardConstraint;
    use std::sync::Arc;
    use std::time::Duration;

    fn model() -> Model {
        ModelBuilder::new(Arc::new(load(three_courses())))
            .build()
            .unwrap()
    }

    fn result(status: SolveStatus, values: Option<Vec<f64>>) -> SolveResult {
        SolveResult {
            status,
            values,
            objective: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_extracts_valid_assignment() {
        let m = model();
        // ALG mon R1 (0), BIO tue R2 (1), CHM wed R1 (4)
        let values = m.values_for(&[0, 1, 4]);
        let t = extract(&m, &result(SolveStatus::Optimal, Some(values)))
            .unwrap()
            .unwrap();
        assert_eq!(t.entry_count(), 3);
        assert_eq!(t.entry_for_session("BIO/1").unwrap().room_id, "R2");
        assert_eq!(t.entry_for_session("CHM/1").unwrap().slot_id, "wed-1");
        assert!(!t.best_effort);
    }

    #[test]
    fn test_no_values_no_timetable() {
        let m = model();
        assert!(extract(&m, &result(SolveStatus::Timeout, None)).unwrap().is_none());
        assert!(extract(&m, &result(SolveStatus::Infeasible, None)).unwrap().is_none());
    }

    #[test]
    fn test_timeout_incumbent_is_best_effort() {
        let m = model();
        let values = m.values_for(&[0, 1, 4]);
        let t = extract(&m, &result(SolveStatus::Timeout, Some(values)))
            .unwrap()
            .unwrap();
        assert!(t.best_effort);
        assert_eq!(t.status, SolveStatus::Timeout);
    }

    #[test]
    fn test_invalid_assignment_rejected() {
        let m = model();
        // ALG and CHM both at mon-1 in R1
        let values = m.values_for(&[0, 1, 0]);
        let err = extract(&m, &result(SolveStatus::Optimal, Some(values))).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(
            err.violations[0].constraint,
            HardConstraint::RoomNoOverlap { room: "R1".into() }
        );
    }

    #[test]
    fn test_double_placement_rejected() {
        let m = model();
        let mut values = m.values_for(&[0, 1, 4]);
        values[m.choices(0)[3].var.0] = 1.0;
        let err = extract(&m, &result(SolveStatus::Feasible, Some(values))).unwrap_err();
        assert!(err.violations.iter().any(|v| v.sessions == vec!["ALG/1".to_string()]));
    }
}
