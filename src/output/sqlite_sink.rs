//! SQLite output sink

use crate::output::traits::{OutputResult, RecordSink};
use crate::record::BusinessRecord;
use rusqlite::{params, Connection};
use std::path::Path;

/// Schema of the records table
pub const BUSINESSES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS businesses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    business_name TEXT NOT NULL,
    category TEXT NOT NULL,
    source_url TEXT NOT NULL,
    website TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL,
    social_links TEXT NOT NULL,
    description TEXT NOT NULL,
    location TEXT NOT NULL,
    harvested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_businesses_category ON businesses(category);
CREATE INDEX IF NOT EXISTS idx_businesses_source ON businesses(source_url);
"#;

/// Writes records into a `businesses` table
///
/// Each write replaces the table contents inside one transaction.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        conn.execute_batch(BUSINESSES_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(BUSINESSES_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of rows currently stored
    pub fn count(&self) -> OutputResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&mut self, records: &[BusinessRecord]) -> OutputResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM businesses", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO businesses (business_name, category, source_url, website, address,
                    phone, email, social_links, description, location, harvested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;

            for record in records {
                let row = record.to_row();
                stmt.execute(params![
                    row[0], row[1], row[2], row[3], row[4], row[5], row[6], row[7], row[8],
                    row[9], row[10]
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, Field};
    use tempfile::TempDir;

    #[test]
    fn test_write_replaces_rows() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        let a = BusinessRecord::new(Some("A"), "https://example.com/a");
        let b = BusinessRecord::new(Some("B"), "https://example.com/b");

        sink.write(&[a.clone()]).unwrap();
        assert_eq!(sink.count().unwrap(), 1);

        sink.write(&[a, b]).unwrap();
        assert_eq!(sink.count().unwrap(), 2);

        sink.write(&[]).unwrap();
        assert_eq!(sink.count().unwrap(), 0);
    }

    #[test]
    fn test_unknown_marker_stored() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        let mut record = BusinessRecord::new(Some("Acme Spa"), "https://example.com/acme");
        record.category = Field::Known(Category::Massage);
        sink.write(&[record]).unwrap();

        let (category, phone): (String, String) = sink
            .conn
            .query_row("SELECT category, phone FROM businesses", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(category, "Massage");
        assert_eq!(phone, "unknown");
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("businesses.db");

        {
            let mut sink = SqliteSink::new(&path).unwrap();
            sink.write(&[BusinessRecord::new(Some("A"), "https://example.com/a")])
                .unwrap();
        }

        let sink = SqliteSink::new(&path).unwrap();
        assert_eq!(sink.count().unwrap(), 1);
    }
}
