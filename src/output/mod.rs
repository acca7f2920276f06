//! Output module for persisting batch results
//!
//! This module handles:
//! - Downloading note media into a per-author directory tree
//! - Writing the tabular report of a batch
//! - Reading reports back for statistics

mod media;
mod sqlite_output;
pub mod stats;
mod traits;

pub use media::{sanitize_name, HttpMediaWriter};
pub use sqlite_output::{report_path, SqliteReportWriter};
pub use stats::{load_statistics, print_statistics, ReportStatistics};
pub use traits::{MediaSummary, MediaWriter, OutputError, OutputResult, ReportWriter};
