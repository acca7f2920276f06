//! Storage module for persisting tabular reports
//!
//! Each report is a standalone SQLite file holding the records of one batch.
//! The output layer writes through it and the `stats` command reads it back.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteReportStore;
pub use traits::{ReportMeta, ReportStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (creating if needed) the report database at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite report file
///
/// # Returns
///
/// * `Ok(SqliteReportStore)` - Successfully opened store
/// * `Err(StorageError)` - Failed to open or initialize the database
pub fn open_report(path: &Path) -> StorageResult<SqliteReportStore> {
    SqliteReportStore::new(path)
}
