//! Course timetabling engine.
//!
//! Places every weekly session of every course into a (time slot, room)
//! pair so that no hard rule is broken, while minimizing a weighted sum of
//! soft penalties. When no placement exists the engine explains why.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `TimeSlot`, `Room`, `Teacher`,
//!   `StudentGroup`, `Course`, `Session`, `Constraint`, `Timetable`
//! - **`catalog`**: Raw records, integrity checks, and the indexed `Catalog`
//! - **`cp`**: Constraint model over binary placement variables
//! - **`solver`**: `SolverBackend` seam and the default ILP backend
//! - **`extract`**: Decoding, hard-rule re-validation, and soft scoring
//! - **`diagnostics`**: Conflict explanation for infeasible models
//! - **`config`**: Solve limits, soft weights, and TOML loading
//! - **`io`**: Data source and result sink interfaces
//! - **`timetabler`**: End-to-end runs and exit codes
//!
//! # Pipeline
//!
//! ```text
//! RawRecords → Catalog::load → ModelBuilder → SolverBackend → extract → Timetable
//!                                                   └─ infeasible → Diagnostics → ConflictReport
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Chinneck (2008), "Feasibility and Infeasibility in Optimization"

pub mod catalog;
pub mod config;
pub mod cp;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod io;
pub mod models;
pub mod solver;
pub mod timetabler;

pub use catalog::{Catalog, RawRecords};
pub use config::TimetableConfig;
pub use diagnostics::ConflictReport;
pub use error::TimetableError;
pub use timetabler::{SolveOutcome, Timetabler};
