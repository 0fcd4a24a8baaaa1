//! Solver adapters.
//!
//! A [`SolverBackend`] takes a built [`Model`] and a time budget and returns
//! a [`SolveResult`]: a status plus, when one is known, a value for every
//! model variable. Any engine that accepts binary/continuous variables,
//! linear rows, and a linear objective, and can prove infeasibility, can sit
//! behind the trait.
//!
//! # Statuses
//! | Status | Values | Meaning |
//! |--------|--------|---------|
//! | `Optimal` | yes | engine proved optimality |
//! | `Feasible` | yes | valid assignment, optimality not proven |
//! | `Infeasible` | no | engine proved no assignment exists |
//! | `Timeout` | maybe | budget spent; values are the best known incumbent |

mod first_fit;
mod ilp;

pub use first_fit::first_fit;
pub use ilp::IlpBackend;

use std::time::Duration;

use crate::config::SolveLimits;
use crate::cp::Model;
use crate::error::SolverError;
use crate::models::SolveStatus;

/// Raw outcome of one solver call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Outcome classification.
    pub status: SolveStatus,
    /// One value per model variable, when an assignment is known.
    pub values: Option<Vec<f64>>,
    /// Objective value of `values`.
    pub objective: Option<f64>,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl SolveResult {
    /// A result carrying an assignment.
    pub fn with_values(
        status: SolveStatus,
        model: &Model,
        values: Vec<f64>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            objective: Some(model.objective_value(&values)),
            values: Some(values),
            elapsed,
        }
    }

    /// Proven infeasible.
    pub fn infeasible(elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Infeasible,
            values: None,
            objective: None,
            elapsed,
        }
    }

    /// Budget exhausted without any assignment.
    pub fn timeout(elapsed: Duration) -> Self {
        Self {
            status: SolveStatus::Timeout,
            values: None,
            objective: None,
            elapsed,
        }
    }

    /// Whether an assignment is attached.
    pub fn has_assignment(&self) -> bool {
        self.values.is_some()
    }
}

/// An engine able to solve timetabling models.
pub trait SolverBackend: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Solves the model within the limits.
    ///
    /// # Errors
    /// [`SolverError`] when the engine itself fails. Infeasibility and
    /// timeouts are statuses, not errors.
    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<SolveResult, SolverError>;
}

impl<T: SolverBackend + ?Sized> SolverBackend for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<SolveResult, SolverError> {
        (**self).solve(model, limits)
    }
}

impl<T: SolverBackend + ?Sized> SolverBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &Model, limits: &SolveLimits) -> Result<SolveResult, SolverError> {
        (**self).solve(model, limits)
    }
}
