//! Timetable (solution) model.
//!
//! A timetable maps every session to one slot and one room. It carries the
//! status of the solve that produced it and the soft-constraint score of the
//! assignment. Timetables are the only artefact that outlives a solve.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SoftConstraint;

/// Outcome classification of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal assignment.
    Optimal,
    /// Valid assignment, optimality not proven.
    Feasible,
    /// Proven that no valid assignment exists.
    Infeasible,
    /// Budget exhausted; feasibility unknown beyond what was found.
    Timeout,
}

impl SolveStatus {
    /// Whether this status carries a usable assignment by definition.
    pub fn is_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// One session placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// Placed session.
    pub session_id: String,
    /// Parent course (denormalized for query convenience).
    pub course_id: String,
    /// Assigned slot.
    pub slot_id: String,
    /// Assigned room.
    pub room_id: String,
}

/// Soft-constraint score of an assignment. Lower is better.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftScore {
    /// Sum of all penalties.
    pub total: i64,
    /// Penalty per soft constraint group (zero entries omitted).
    pub breakdown: BTreeMap<SoftConstraint, i64>,
}

impl SoftScore {
    /// Adds a penalty to a constraint group.
    pub fn add(&mut self, constraint: SoftConstraint, penalty: i64) {
        if penalty == 0 {
            return;
        }
        self.total += penalty;
        *self.breakdown.entry(constraint).or_insert(0) += penalty;
    }

    /// Penalty charged to one group (0 if none).
    pub fn penalty_of(&self, constraint: &SoftConstraint) -> i64 {
        self.breakdown.get(constraint).copied().unwrap_or(0)
    }
}

/// A complete session → (slot, room) assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timetable {
    /// Status of the solve that produced this timetable.
    pub status: SolveStatus,
    /// Placements, sorted by session ID.
    pub entries: Vec<TimetableEntry>,
    /// Soft-constraint score.
    pub score: SoftScore,
    /// Set when the solve stopped on its time budget and this is the best
    /// assignment found so far.
    pub best_effort: bool,
}

impl Timetable {
    /// Creates a timetable; entries are sorted by session ID.
    pub fn new(status: SolveStatus, mut entries: Vec<TimetableEntry>, score: SoftScore) -> Self {
        entries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Self {
            status,
            entries,
            score,
            best_effort: status == SolveStatus::Timeout,
        }
    }

    /// Finds the placement of a session.
    pub fn entry_for_session(&self, session_id: &str) -> Option<&TimetableEntry> {
        self.entries
            .binary_search_by(|e| e.session_id.as_str().cmp(session_id))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Returns all placements of a course.
    pub fn entries_for_course(&self, course_id: &str) -> Vec<&TimetableEntry> {
        self.entries
            .iter()
            .filter(|e| e.course_id == course_id)
            .collect()
    }

    /// Returns all placements in a room.
    pub fn entries_for_room(&self, room_id: &str) -> Vec<&TimetableEntry> {
        self.entries.iter().filter(|e| e.room_id == room_id).collect()
    }

    /// Returns all placements in a slot.
    pub fn entries_for_slot(&self, slot_id: &str) -> Vec<&TimetableEntry> {
        self.entries.iter().filter(|e| e.slot_id == slot_id).collect()
    }

    /// Number of placed sessions.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
