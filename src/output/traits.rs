//! Output sink trait and error types
//!
//! A sink receives the cumulative record list of a run. It may be called
//! several times (checkpoints) and must leave its destination holding
//! exactly the last list it was given.

use crate::record::BusinessRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for harvested records
pub trait RecordSink: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Replaces the sink's contents with `records`
    fn write(&mut self, records: &[BusinessRecord]) -> OutputResult<()>;
}

/// Fans every write out to several sinks
///
/// A failing sink does not stop the others from being written; the first
/// error is returned after all sinks were tried.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn RecordSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for SinkSet {
    fn name(&self) -> &str {
        "sinks"
    }

    fn write(&mut self, records: &[BusinessRecord]) -> OutputResult<()> {
        let mut first_error = None;

        for sink in &mut self.sinks {
            match sink.write(records) {
                Ok(()) => tracing::debug!("Wrote {} records to {}", records.len(), sink.name()),
                Err(e) => {
                    tracing::error!("Failed to write {} records to {}: {}", records.len(), sink.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
