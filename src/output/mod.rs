//! Output module: sinks for harvested records and run reporting
//!
//! This module handles:
//! - The `RecordSink` trait and fan-out to several sinks
//! - CSV and SQLite sinks, plus an in-memory sink
//! - Run statistics and the printed end-of-run report

mod csv_sink;
mod memory;
mod sqlite_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use memory::MemorySink;
pub use sqlite_sink::SqliteSink;
pub use stats::{print_report, FallbackCounts, HarvestReport};
pub use traits::{OutputError, OutputResult, RecordSink, SinkSet};

use crate::config::OutputConfig;
use std::path::Path;

/// Builds the sinks named in the `[output]` config section
///
/// With no paths configured the set is empty and the run only prints its
/// report.
pub fn sinks_from_config(config: &OutputConfig) -> OutputResult<SinkSet> {
    let mut sinks = SinkSet::new();

    if let Some(csv_path) = &config.csv_path {
        sinks.push(Box::new(CsvSink::new(csv_path)));
    }

    if let Some(database_path) = &config.database_path {
        sinks.push(Box::new(SqliteSink::new(Path::new(database_path))?));
    }

    if sinks.is_empty() {
        tracing::warn!("No output paths configured; records will not be saved");
    }

    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sinks_from_config() {
        let dir = TempDir::new().unwrap();
        let config = OutputConfig {
            csv_path: Some(dir.path().join("b.csv").to_string_lossy().into_owned()),
            database_path: Some(dir.path().join("b.db").to_string_lossy().into_owned()),
        };
        let sinks = sinks_from_config(&config).unwrap();
        assert_eq!(sinks.len(), 2);
    }

    #[test]
    fn test_no_paths_gives_empty_set() {
        let sinks = sinks_from_config(&OutputConfig::default()).unwrap();
        assert!(sinks.is_empty());
    }
}
