//! Output writer traits and types
//!
//! The batch crawler hands its surviving records to two collaborators: a
//! media writer, called once per record, and a report writer, called once
//! per batch.

use crate::model::{Record, SaveMode};
use crate::storage::StorageError;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("Failed to serialize output: {0}")]
    Serialization(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// What a media write produced for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSummary {
    /// Directory the record was written to; `None` if the save mode skipped it
    pub directory: Option<PathBuf>,

    /// Number of media files written, excluding `info.json`
    pub files: usize,
}

impl MediaSummary {
    /// A record the save mode does not apply to
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// Writes the media files of a single record
#[async_trait]
pub trait MediaWriter: Send + Sync {
    /// Persists `record` according to `save_mode`
    ///
    /// # Arguments
    ///
    /// * `record` - The fetched record
    /// * `save_mode` - Which media kinds to download
    ///
    /// # Returns
    ///
    /// * `Ok(MediaSummary)` - What was written (possibly nothing)
    /// * `Err(OutputError)` - The directory, metadata or a download failed
    async fn write_media(&self, record: &Record, save_mode: SaveMode) -> OutputResult<MediaSummary>;
}

/// Writes the tabular report of a batch
#[async_trait]
pub trait ReportWriter: Send + Sync {
    /// Persists `records` under `name`, replacing any previous report of that name
    ///
    /// # Returns
    ///
    /// The path of the written report
    async fn write_report(&self, records: &[Record], name: &str) -> OutputResult<PathBuf>;
}
