//! Storage traits and error types

use crate::model::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt row {position}: {message}")]
    CorruptRow { position: i64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata of a stored report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMeta {
    pub name: String,
    pub written_at: String,
    pub record_count: usize,
}

/// Trait for report storage backends
///
/// A store holds the records of exactly one batch. Writing replaces whatever
/// was stored before.
pub trait ReportStore {
    /// Replaces the stored batch with `records`, keeping their order
    ///
    /// # Arguments
    ///
    /// * `name` - The report name recorded in the metadata
    /// * `records` - The batch, in processing order
    fn replace_records(&mut self, name: &str, records: &[Record]) -> StorageResult<()>;

    /// Loads the stored batch in its original order
    fn load_records(&self) -> StorageResult<Vec<Record>>;

    /// Returns the metadata of the stored batch, if one was written
    fn meta(&self) -> StorageResult<Option<ReportMeta>>;
}
