//! Integer linear programming backend.
//!
//! Hands the model to `good_lp` (pure-Rust `microlp` engine) on a worker
//! thread. The engine itself stops at the time budget and reports the best
//! assignment it holds, so every call returns within its budget.
//!
//! # Lifecycle
//! 1. Zero budget: return `Timeout` at once, engine not started.
//! 2. Compute the first-fit incumbent; with `stop_after_first` return it.
//!    An incumbent with objective 0 on a model whose objective cannot go
//!    below 0 is already optimal.
//! 3. Construct: a scoped worker builds the engine problem, seeded with the
//!    incumbent and limited to the remaining budget.
//! 4. Solve: the engine runs until it proves optimality, reaches the
//!    requested gap, or hits the budget.
//! 5. Release: the worker is joined before `solve` returns. Engine state
//!    lives only inside the worker, so nothing outlives the call.

use std::thread;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionStatus, SolverModel, WithInitialSolution, WithMipGap, WithTimeLimit,
};
use tracing::{debug, info, warn};

use super::{first_fit, SolveResult, SolverBackend};
use crate::config::SolveLimits;
use crate::cp::{Model, Sense, VarKind};
use crate::error::SolverError;
use crate::models::SolveStatus;

/// What the engine ended with.
#[derive(Debug)]
enum EngineOutcome {
    /// An assignment, with the status the engine reached.
    Solved(SolveStatus, Vec<f64>),
    Infeasible,
    /// Budget spent before any assignment was found.
    OutOfTime,
}

/// `good_lp` + `microlp` backend.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use u_timetable::catalog::{Catalog, RawCourse, RawRecords, RawRoom, RawTeacher};
/// use u_timetable::config::SolveLimits;
/// use u_timetable::cp::ModelBuilder;
/// use u_timetable::models::SolveStatus;
/// use u_timetable::solver::{IlpBackend, SolverBackend};
///
/// let records = RawRecords::new()
///     .slot("mon-1", 0, 480, 570)
///     .room(RawRoom::new("R1", 30))
///     .teacher(RawTeacher::new("T1"))
///     .course(RawCourse::new("ALG", 1))
///     .teach("T1", "ALG");
/// let model = ModelBuilder::new(Arc::new(Catalog::load(records).unwrap()))
///     .build()
///     .unwrap();
///
/// let result = IlpBackend::new()
///     .solve(&model, &SolveLimits::with_time_limit(10_000))
///     .unwrap();
/// assert_eq!(result.status, SolveStatus::Optimal);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IlpBackend;

impl IlpBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl SolverBackend for IlpBackend {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<SolveResult, SolverError> {
        let started = Instant::now();
        let budget = limits.time_limit();
        if budget.is_zero() {
            warn!("zero time budget, engine not started");
            return Ok(SolveResult::timeout(started.elapsed()));
        }

        let incumbent = first_fit(model).map(|picks| model.values_for(&picks));
        debug!(found = incumbent.is_some(), "first-fit incumbent");
        if let Some(values) = &incumbent {
            let objective = model.objective_value(values);
            if limits.stop_after_first || (objective <= 1e-9 && model.has_zero_floor()) {
                let status = if limits.stop_after_first && objective > 1e-9 {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Optimal
                };
                debug!(?status, objective, "incumbent accepted without the engine");
                return Ok(SolveResult::with_values(
                    status,
                    model,
                    values.clone(),
                    started.elapsed(),
                ));
            }
        } else if limits.stop_after_first {
            debug!("no first-fit incumbent, running the engine");
        }

        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            warn!(budget_ms = limits.time_limit_ms, "time budget spent before the engine started");
            return Ok(timed_out(model, incumbent, started));
        }

        let outcome = thread::scope(|scope| {
            let worker = thread::Builder::new()
                .name("u-timetable-ilp".into())
                .spawn_scoped(scope, || {
                    run_engine(model, incumbent.as_deref(), remaining, limits.optimality_gap)
                })
                .map_err(|e| SolverError::Spawn(e.to_string()))?;
            worker.join().map_err(|_| SolverError::WorkerLost)?
        })?;

        let elapsed = started.elapsed();
        Ok(match outcome {
            EngineOutcome::Solved(SolveStatus::Timeout, values) => {
                warn!(budget_ms = limits.time_limit_ms, "time budget exhausted");
                SolveResult::with_values(SolveStatus::Timeout, model, values, elapsed)
            }
            EngineOutcome::Solved(status, values) => {
                let result = SolveResult::with_values(status, model, values, elapsed);
                info!(
                    ?status,
                    objective = result.objective,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "engine finished"
                );
                result
            }
            EngineOutcome::Infeasible => {
                info!(elapsed_ms = elapsed.as_millis() as u64, "engine proved infeasibility");
                SolveResult::infeasible(elapsed)
            }
            EngineOutcome::OutOfTime => {
                warn!(budget_ms = limits.time_limit_ms, "time budget exhausted");
                timed_out(model, incumbent, started)
            }
        })
    }
}

/// `Timeout` carrying the incumbent, if there is one.
fn timed_out(model: &Model, incumbent: Option<Vec<f64>>, started: Instant) -> SolveResult {
    match incumbent {
        Some(values) => {
            SolveResult::with_values(SolveStatus::Timeout, model, values, started.elapsed())
        }
        None => SolveResult::timeout(started.elapsed()),
    }
}

/// Builds the engine problem from the model and solves it within `budget`.
fn run_engine(
    model: &Model,
    incumbent: Option<&[f64]>,
    budget: Duration,
    gap: Option<f64>,
) -> Result<EngineOutcome, SolverError> {
    let mut vars = ProblemVariables::new();
    let handles: Vec<good_lp::Variable> = model
        .variables()
        .iter()
        .map(|v| match v.kind {
            VarKind::Binary => vars.add(variable().binary()),
            VarKind::NonNegative { upper: Some(upper) } => {
                vars.add(variable().min(0.0).max(upper as f64))
            }
            VarKind::NonNegative { upper: None } => vars.add(variable().min(0.0)),
        })
        .collect();

    let objective: Expression = model
        .objective()
        .iter()
        .map(|t| t.coef as f64 * handles[t.var.0])
        .sum();

    let mut problem = vars
        .minimise(objective)
        .using(microlp)
        .with_time_limit(budget.as_secs_f64());
    if let Some(gap) = gap {
        problem = problem
            .with_mip_gap(gap as f32)
            .map_err(|e| SolverError::Backend(e.to_string()))?;
    }
    if let Some(values) = incumbent {
        problem = problem.with_initial_solution(handles.iter().copied().zip(values.iter().copied()));
    }
    for row in model.constraints() {
        let lhs: Expression = row
            .terms
            .iter()
            .map(|(v, coef)| *coef as f64 * handles[v.0])
            .sum();
        let rhs = row.rhs as f64;
        problem.add_constraint(match row.sense {
            Sense::Le => constraint::leq(lhs, rhs),
            Sense::Ge => constraint::geq(lhs, rhs),
            Sense::Eq => constraint::eq(lhs, rhs),
        });
    }

    match problem.solve() {
        Ok(solution) => {
            let status = match solution.status() {
                SolutionStatus::Optimal => SolveStatus::Optimal,
                SolutionStatus::GapLimit => SolveStatus::Feasible,
                SolutionStatus::TimeLimit => SolveStatus::Timeout,
            };
            let values = handles.iter().map(|v| solution.value(*v)).collect();
            Ok(EngineOutcome::Solved(status, values))
        }
        Err(ResolutionError::Infeasible) => Ok(EngineOutcome::Infeasible),
        // Only raised when the time limit hits before a first solution.
        Err(ResolutionError::Other(_)) => Ok(EngineOutcome::OutOfTime),
        Err(e) => Err(SolverError::Backend(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{load, teacher_clash, three_courses, week};
    use crate::catalog::{RawCourse, RawGroup, RawRoom, RawTeacher};
    use crate::config::SoftWeights;
    use crate::cp::ModelBuilder;
    use std::sync::Arc;

    fn model_of(records: crate::catalog::RawRecords) -> Model {
        ModelBuilder::new(Arc::new(load(records))).build().unwrap()
    }

    #[test]
    fn test_optimal() {
        let model = model_of(three_courses());
        let r = IlpBackend::new()
            .solve(&model, &SolveLimits::with_time_limit(30_000))
            .unwrap();
        assert_eq!(r.status, SolveStatus::Optimal);
        let values = r.values.unwrap();
        assert_eq!(values.len(), model.variables().len());
        assert!(model.decode(&values).iter().all(Option::is_some));
    }

    #[test]
    fn test_infeasible() {
        let model = model_of(teacher_clash());
        let r = IlpBackend::new()
            .solve(&model, &SolveLimits::with_time_limit(30_000))
            .unwrap();
        assert_eq!(r.status, SolveStatus::Infeasible);
        assert!(!r.has_assignment());
    }

    #[test]
    fn test_zero_budget() {
        let model = model_of(three_courses());
        let r = IlpBackend::new()
            .solve(&model, &SolveLimits::with_time_limit(0))
            .unwrap();
        assert_eq!(r.status, SolveStatus::Timeout);
        assert!(r.values.is_none());
    }

    #[test]
    fn test_stop_after_first() {
        // Every slot is period 1, so any placement costs something
        let model = model_of(three_courses());
        let limits = SolveLimits::with_time_limit(30_000).first_feasible();
        let r = IlpBackend::new().solve(&model, &limits).unwrap();
        assert_eq!(r.status, SolveStatus::Feasible);
        assert!(r.objective.unwrap() > 0.0);
    }

    #[test]
    fn test_zero_cost_incumbent_is_optimal() {
        let model = ModelBuilder::new(Arc::new(load(three_courses())))
            .with_weights(SoftWeights::disabled())
            .build()
            .unwrap();
        let r = IlpBackend::new()
            .solve(&model, &SolveLimits::with_time_limit(30_000).first_feasible())
            .unwrap();
        assert_eq!(r.status, SolveStatus::Optimal);
        assert_eq!(r.objective, Some(0.0));
    }

    #[test]
    fn test_budget_bounds_the_call() {
        // Large enough that the engine cannot finish in 200 ms
        let mut records = week(5, 6);
        for i in 0..6 {
            records = records
                .room(RawRoom::new(format!("R{i}"), 40))
                .teacher(RawTeacher::new(format!("T{i}")))
                .group(RawGroup::new(format!("G{i}"), 30));
        }
        for c in 0..24 {
            let id = format!("C{c:02}");
            records = records
                .course(RawCourse::new(id.clone(), 3))
                .teach(format!("T{}", c % 6), id.clone())
                .enroll(format!("G{}", (c / 2) % 6), id);
        }
        let model = model_of(records);
        let r = IlpBackend::new()
            .solve(&model, &SolveLimits::with_time_limit(200))
            .unwrap();
        assert!(r.elapsed < Duration::from_secs(5), "took {:?}", r.elapsed);
        if r.status == SolveStatus::Timeout {
            if let Some(values) = &r.values {
                assert!(model
                    .constraints()
                    .iter()
                    .filter(|c| c.origin.is_hard())
                    .all(|c| c.is_satisfied(values, 1e-6)));
            }
        }
    }
}
