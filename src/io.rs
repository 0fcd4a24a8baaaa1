//! Data source and result sink interfaces.
//!
//! The engine reads typed records from a [`DataSource`] and hands finished
//! timetables to a [`ResultSink`]. Storage and rendering live behind these
//! traits; [`RawRecords`] and [`MemorySink`] are the in-memory
//! implementations.

use crate::catalog::RawRecords;
use crate::error::TimetableError;
use crate::models::Timetable;

/// Supplies the records of one timetabling problem.
pub trait DataSource {
    /// Reads all records.
    ///
    /// # Errors
    /// Implementations report read failures as [`TimetableError::Source`].
    fn records(&self) -> Result<RawRecords, TimetableError>;
}

/// Accepts finished timetables.
pub trait ResultSink {
    /// Stores or forwards one timetable.
    ///
    /// # Errors
    /// Implementations report write failures as [`TimetableError::Sink`].
    fn accept(&mut self, timetable: &Timetable) -> Result<(), TimetableError>;
}

impl DataSource for RawRecords {
    fn records(&self) -> Result<RawRecords, TimetableError> {
        Ok(self.clone())
    }
}

impl<F> DataSource for F
where
    F: Fn() -> Result<RawRecords, TimetableError>,
{
    fn records(&self) -> Result<RawRecords, TimetableError> {
        self()
    }
}

/// Collects timetables in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    timetables: Vec<Timetable>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timetables received so far.
    pub fn timetables(&self) -> &[Timetable] {
        &self.timetables
    }

    /// Most recent timetable.
    pub fn last(&self) -> Option<&Timetable> {
        self.timetables.last()
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, timetable: &Timetable) -> Result<(), TimetableError> {
        self.timetables.push(timetable.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SoftScore, SolveStatus};

    #[test]
    fn test_records_are_a_source() {
        let r = RawRecords::new().slot("mon-1", 0, 480, 570);
        assert_eq!(r.records().unwrap(), r);
    }

    #[test]
    fn test_closure_source() {
        let failing = || -> Result<RawRecords, TimetableError> {
            Err(TimetableError::Source("database offline".into()))
        };
        assert!(matches!(failing.records(), Err(TimetableError::Source(_))));
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        assert!(sink.last().is_none());
        let t = Timetable::new(SolveStatus::Optimal, vec![], SoftScore::default());
        sink.accept(&t).unwrap();
        assert_eq!(sink.timetables().len(), 1);
        assert_eq!(sink.last().unwrap().status, SolveStatus::Optimal);
    }
}
