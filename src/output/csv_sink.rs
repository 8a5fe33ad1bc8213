//! CSV output sink

use crate::output::traits::{OutputResult, RecordSink};
use crate::record::{BusinessRecord, RECORD_HEADERS};
use std::path::{Path, PathBuf};

/// Writes records to a CSV file, one row per record
///
/// Each write goes to a sibling temporary file that then replaces the
/// target, so a crash mid-write leaves the previous checkpoint intact.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecordSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write(&mut self, records: &[BusinessRecord]) -> OutputResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        let mut writer = csv::Writer::from_path(&temp_path)?;
        writer.write_record(RECORD_HEADERS)?;
        for record in records {
            writer.write_record(record.to_row())?;
        }
        writer.flush()?;
        drop(writer);

        std::fs::rename(&temp_path, &self.path)?;
        tracing::info!("Saved {} businesses to {}", records.len(), self.path.display());
        Ok(())
    }
}
