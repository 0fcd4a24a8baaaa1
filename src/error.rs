//! Error taxonomy.
//!
//! | Error | Raised by | Meaning |
//! |-------|-----------|---------|
//! | [`DataError`] | catalog load | malformed or inconsistent records |
//! | [`ModelError`] | model build | a session has an empty domain |
//! | [`SolverError`] | solver adapter | the engine failed |
//! | [`ValidationError`] | extraction | an assignment breaks a hard rule |
//! | [`ConfigError`] | configuration | unreadable or invalid config |
//!
//! Infeasibility and timeouts are solve outcomes, not errors. Nothing here is
//! retried inside the crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::HardConstraint;

/// Categories of catalog data issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataIssueKind {
    /// Two records of one kind share an ID.
    DuplicateId,
    /// A record references an ID that does not exist.
    UnknownReference,
    /// A course requires zero or fewer sessions.
    NonPositiveSessionCount,
    /// A slot ends at or before its start.
    InvalidTimeRange,
    /// Two slots of the same day overlap.
    OverlappingSlots,
    /// A course has no teacher.
    MissingTeacher,
    /// A feature tag outside the declared vocabulary.
    UnknownFeature,
}

/// One catalog data issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIssue {
    /// Issue category.
    pub kind: DataIssueKind,
    /// ID of the offending record.
    pub record_id: String,
    /// Human-readable description.
    pub message: String,
}

impl DataIssue {
    pub(crate) fn new(
        kind: DataIssueKind,
        record_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            record_id: record_id.into(),
            message: message.into(),
        }
    }
}

/// Catalog load failed. Lists every issue found, not only the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid timetable data: {} issue(s), first: {}", .issues.len(), first_message(.issues))]
pub struct DataError {
    pub issues: Vec<DataIssue>,
}

fn first_message(issues: &[DataIssue]) -> &str {
    issues.first().map(|i| i.message.as_str()).unwrap_or("none")
}

impl DataError {
    /// Whether any issue has the given kind.
    pub fn has(&self, kind: DataIssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

/// Pruning stage that left a session without candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneStage {
    /// No room provides the required features.
    Features,
    /// No feature-matching room seats the enrolled groups.
    Capacity,
    /// The room whitelist excludes every suitable room.
    AllowedRooms,
    /// Teacher availability and the slot whitelist exclude every slot.
    Slots,
    /// Every suitable room is unavailable in every remaining slot.
    RoomAvailability,
}

/// A session with no feasible (slot, room) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyDomain {
    pub session_id: String,
    pub course_id: String,
    pub stage: PruneStage,
    pub message: String,
}

/// Model construction failed before any solver call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} session(s) have no feasible slot/room: {}", .sessions.len(), list_sessions(.sessions))]
pub struct ModelError {
    pub sessions: Vec<EmptyDomain>,
}

fn list_sessions(sessions: &[EmptyDomain]) -> String {
    sessions
        .iter()
        .map(|s| s.session_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The solving engine failed. No partial timetable is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("solver backend failed: {0}")]
    Backend(String),

    #[error("solver worker terminated without a result")]
    WorkerLost,

    #[error("could not start solver worker: {0}")]
    Spawn(String),
}

/// A hard rule broken by an extracted assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardViolation {
    /// Broken constraint group.
    pub constraint: HardConstraint,
    /// Sessions involved.
    pub sessions: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

/// The extracted assignment breaks hard rules. Signals a solver or model
/// translation defect; never downgraded to a usable timetable.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("extracted assignment violates {} hard constraint(s), first: {}", .violations.len(), first_violation(.violations))]
pub struct ValidationError {
    pub violations: Vec<HardViolation>,
}

fn first_violation(violations: &[HardViolation]) -> &str {
    violations
        .first()
        .map(|v| v.message.as_str())
        .unwrap_or("none")
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Any failure of an end-to-end timetabling run.
#[derive(Debug, Error)]
pub enum TimetableError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data source failed: {0}")]
    Source(String),

    #[error("result sink failed: {0}")]
    Sink(String),
}

impl TimetableError {
    /// Process exit code for a command surface built on this crate.
    ///
    /// See [`crate::timetabler::exit_codes`].
    pub fn exit_code(&self) -> i32 {
        use crate::timetabler::exit_codes;
        match self {
            TimetableError::Data(_) | TimetableError::Source(_) | TimetableError::Config(_) => {
                exit_codes::DATA_ERROR
            }
            TimetableError::Model(_) => exit_codes::MODEL_ERROR,
            TimetableError::Solver(_) | TimetableError::Validation(_) | TimetableError::Sink(_) => {
                exit_codes::INTERNAL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_display() {
        let err = DataError {
            issues: vec![
                DataIssue::new(DataIssueKind::DuplicateId, "R1", "Duplicate room ID: R1"),
                DataIssue::new(DataIssueKind::UnknownReference, "C1", "x"),
            ],
        };
        assert!(err.has(DataIssueKind::DuplicateId));
        assert!(!err.has(DataIssueKind::OverlappingSlots));
        assert_eq!(
            err.to_string(),
            "invalid timetable data: 2 issue(s), first: Duplicate room ID: R1"
        );
    }

    #[test]
    fn test_model_error_lists_sessions() {
        let err = ModelError {
            sessions: vec![EmptyDomain {
                session_id: "LAB/1".into(),
                course_id: "LAB".into(),
                stage: PruneStage::Features,
                message: "no room provides [lab]".into(),
            }],
        };
        assert!(err.to_string().contains("LAB/1"));
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        use crate::timetabler::exit_codes;

        let data: TimetableError = DataError { issues: vec![] }.into();
        let model: TimetableError = ModelError { sessions: vec![] }.into();
        let solver: TimetableError = SolverError::WorkerLost.into();

        assert_eq!(data.exit_code(), exit_codes::DATA_ERROR);
        assert_eq!(model.exit_code(), exit_codes::MODEL_ERROR);
        assert_eq!(solver.exit_code(), exit_codes::INTERNAL);
        assert_ne!(data.exit_code(), model.exit_code());
        assert_ne!(exit_codes::INFEASIBLE, exit_codes::INTERNAL);
    }
}
