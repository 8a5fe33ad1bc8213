//! In-memory sink that records every write

use crate::output::traits::{OutputResult, RecordSink};
use crate::record::BusinessRecord;
use std::sync::{Arc, Mutex, PoisonError};

/// Keeps a copy of each record list it is given
///
/// Clones share the same history, so a test can hand one clone to the
/// harvester and inspect another afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    writes: Arc<Mutex<Vec<Vec<BusinessRecord>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `write` was called
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Records passed to the most recent write (empty if never written)
    pub fn last_write(&self) -> Vec<BusinessRecord> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_default()
    }

    /// Record counts of every write, in call order
    pub fn write_sizes(&self) -> Vec<usize> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Vec::len)
            .collect()
    }
}

impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write(&mut self, records: &[BusinessRecord]) -> OutputResult<()> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(records.to_vec());
        Ok(())
    }
}
