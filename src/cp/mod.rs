//! Constraint model construction.
//!
//! Translates a [`Catalog`](crate::catalog::Catalog) into a 0-1 integer
//! linear program: one binary variable per candidate (session, slot, room)
//! placement, hard rules as linear rows, and soft rules as a weighted
//! objective to minimize. The model is solver-agnostic; a
//! [`SolverBackend`](crate::solver::SolverBackend) hands it to an engine.
//!
//! # Reference
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Wolsey (1998), "Integer Programming"

mod builder;
mod model;

pub use builder::ModelBuilder;
pub use model::{Choice, LinearConstraint, Model, ObjectiveTerm, Sense, VarId, VarKind, Variable};
