//! SQLite-based report writer
//!
//! Each report is written to `<report-dir>/<name>.sqlite` through the storage
//! layer. The blocking SQLite work runs on tokio's blocking pool.

use crate::model::Record;
use crate::output::media::sanitize_name;
use crate::output::traits::{OutputError, OutputResult, ReportWriter};
use crate::storage::{open_report, ReportStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Path of the report named `name` under `report_dir`
pub fn report_path(report_dir: &Path, name: &str) -> PathBuf {
    report_dir.join(format!("{}.sqlite", sanitize_name(name)))
}

/// Writes batch reports as SQLite files
#[derive(Debug, Clone)]
pub struct SqliteReportWriter {
    report_dir: PathBuf,
}

impl SqliteReportWriter {
    /// Creates a new report writer
    ///
    /// # Arguments
    ///
    /// * `report_dir` - Directory the report files are written to; created on first write
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }
}

#[async_trait]
impl ReportWriter for SqliteReportWriter {
    async fn write_report(&self, records: &[Record], name: &str) -> OutputResult<PathBuf> {
        tokio::fs::create_dir_all(&self.report_dir).await?;

        let path = report_path(&self.report_dir, name);
        let records = records.to_vec();
        let name = name.to_string();
        let target = path.clone();

        tokio::task::spawn_blocking(move || -> OutputResult<()> {
            let mut store = open_report(&target)?;
            store.replace_records(&name, &records)?;
            Ok(())
        })
        .await
        .map_err(|e| OutputError::Write(format!("report task failed: {}", e)))??;

        tracing::info!("Report written to {}", path.display());
        Ok(path)
    }
}
