//! End-to-end timetabling.
//!
//! [`Timetabler`] runs the full chain for one problem:
//!
//! ```text
//! DataSource → Catalog → Model → SolverBackend → extract → ResultSink
//!                                      └─ infeasible → Diagnostics → ConflictReport
//! ```
//!
//! Every call builds its own catalog and model, so one `Timetabler` can
//! serve concurrent requests.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::TimetableConfig;
use crate::cp::ModelBuilder;
use crate::diagnostics::{ConflictReport, Diagnostics};
use crate::error::{SolverError, TimetableError};
use crate::extract::extract;
use crate::io::{DataSource, ResultSink};
use crate::models::{SolveStatus, Timetable};
use crate::solver::{IlpBackend, SolverBackend};

/// Process exit codes for a command surface built on the engine.
pub mod exit_codes {
    /// A timetable was produced (optimal, feasible, or best-effort).
    pub const SUCCESS: i32 = 0;
    /// Solver failure, validation failure, or any other internal error.
    pub const INTERNAL: i32 = 1;
    /// Invalid input data or configuration.
    pub const DATA_ERROR: i32 = 2;
    /// A session has no feasible placement.
    pub const MODEL_ERROR: i32 = 3;
    /// Proven infeasible; a conflict report is available.
    pub const INFEASIBLE: i32 = 4;
    /// Budget exhausted without any timetable.
    pub const TIMEOUT: i32 = 5;
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Optimal or feasible timetable.
    Solved(Timetable),
    /// Budget exhausted; the best-effort timetable if one was found.
    TimedOut(Option<Timetable>),
    /// Proven infeasible.
    Infeasible(ConflictReport),
}

impl SolveOutcome {
    /// Timetable produced by the run, if any.
    pub fn timetable(&self) -> Option<&Timetable> {
        match self {
            SolveOutcome::Solved(t) => Some(t),
            SolveOutcome::TimedOut(t) => t.as_ref(),
            SolveOutcome::Infeasible(_) => None,
        }
    }

    /// Solve status of the run.
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Solved(t) => t.status,
            SolveOutcome::TimedOut(_) => SolveStatus::Timeout,
            SolveOutcome::Infeasible(_) => SolveStatus::Infeasible,
        }
    }

    /// Process exit code (see [`exit_codes`]).
    pub fn exit_code(&self) -> i32 {
        match self {
            SolveOutcome::Solved(_) | SolveOutcome::TimedOut(Some(_)) => exit_codes::SUCCESS,
            SolveOutcome::TimedOut(None) => exit_codes::TIMEOUT,
            SolveOutcome::Infeasible(_) => exit_codes::INFEASIBLE,
        }
    }
}

/// Timetabling engine.
///
/// # Example
/// ```
/// use u_timetable::catalog::{RawCourse, RawRecords, RawRoom, RawTeacher};
/// use u_timetable::io::MemorySink;
/// use u_timetable::Timetabler;
///
/// let records = RawRecords::new()
///     .slot("mon-1", 0, 480, 570)
///     .slot("tue-1", 1, 480, 570)
///     .room(RawRoom::new("R1", 30))
///     .teacher(RawTeacher::new("T1"))
///     .course(RawCourse::new("ALG", 2))
///     .teach("T1", "ALG");
///
/// let mut sink = MemorySink::new();
/// let outcome = Timetabler::new().run(&records, &mut sink).unwrap();
/// assert_eq!(outcome.exit_code(), 0);
/// assert_eq!(sink.last().unwrap().entry_count(), 2);
/// ```
pub struct Timetabler<B: SolverBackend = IlpBackend> {
    backend: B,
    config: TimetableConfig,
}

impl Timetabler<IlpBackend> {
    /// Creates an engine on the default ILP backend.
    pub fn new() -> Self {
        Self::with_backend(IlpBackend::new())
    }
}

impl Default for Timetabler<IlpBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SolverBackend> Timetabler<B> {
    /// Creates an engine on the given backend with default configuration.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            config: TimetableConfig::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: TimetableConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &TimetableConfig {
        &self.config
    }

    /// Solves a loaded catalog.
    ///
    /// # Errors
    /// Model, solver, and validation failures.
    pub fn solve_catalog(&self, catalog: Arc<Catalog>) -> Result<SolveOutcome, TimetableError> {
        let model = ModelBuilder::new(catalog)
            .with_weights(self.config.weights.clone())
            .build()?;

        info!(
            backend = self.backend.name(),
            variables = model.variables().len(),
            constraints = model.constraints().len(),
            budget_ms = self.config.limits.time_limit_ms,
            "solving"
        );
        let result = self.backend.solve(&model, &self.config.limits)?;
        info!(
            status = ?result.status,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "solver finished"
        );

        match result.status {
            SolveStatus::Infeasible => {
                let report = Diagnostics::new(&self.backend)
                    .with_config(&self.config.diagnostics)
                    .explain(&model)?;
                Ok(SolveOutcome::Infeasible(report))
            }
            SolveStatus::Timeout => {
                let timetable = extract(&model, &result)?;
                if timetable.is_none() {
                    warn!("time budget exhausted without a timetable");
                }
                Ok(SolveOutcome::TimedOut(timetable))
            }
            SolveStatus::Optimal | SolveStatus::Feasible => match extract(&model, &result)? {
                Some(timetable) => Ok(SolveOutcome::Solved(timetable)),
                None => Err(SolverError::Backend(format!(
                    "{} reported {:?} without an assignment",
                    self.backend.name(),
                    result.status
                ))
                .into()),
            },
        }
    }

    /// Loads records from a source and solves them.
    ///
    /// # Errors
    /// Source and data failures, plus those of [`solve_catalog`](Self::solve_catalog).
    pub fn solve(&self, source: &dyn DataSource) -> Result<SolveOutcome, TimetableError> {
        let records = source.records()?;
        info!(rows = records.row_count(), "records read");
        let catalog = Catalog::load(records)?;
        self.solve_catalog(Arc::new(catalog))
    }

    /// Solves and hands any produced timetable to the sink.
    ///
    /// # Errors
    /// Failures of [`solve`](Self::solve) and of the sink.
    pub fn run(
        &self,
        source: &dyn DataSource,
        sink: &mut dyn ResultSink,
    ) -> Result<SolveOutcome, TimetableError> {
        let outcome = self.solve(source)?;
        if let Some(timetable) = outcome.timetable() {
            sink.accept(timetable)?;
        }
        info!(exit_code = outcome.exit_code(), "run complete");
        Ok(outcome)
    }
}
