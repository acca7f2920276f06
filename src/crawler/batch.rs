//! Batch crawling
//!
//! Turns a list of references into records. References are processed
//! strictly in order and one failure never stops the batch. Persistence runs
//! as a second pass over the surviving records.

use crate::crawler::{FetchError, FetchWorker, ProgressSink};
use crate::model::{Record, SaveMode};
use crate::output::{MediaWriter, ReportWriter};
use crate::reference::NoteRef;
use crate::{HarvesterError, ValidationError};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a batch needs besides the worker
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub references: Vec<NoteRef>,

    /// Maximum number of references processed; `None` or zero is unbounded
    pub cap: Option<usize>,

    pub save_mode: SaveMode,

    /// Report file stem; required when `save_mode` writes a report
    pub report_name: Option<String>,
}

impl BatchPlan {
    /// Checks the preconditions that must hold before anything is fetched
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.save_mode.wants_report() && self.report_name().is_none() {
            return Err(ValidationError::MissingReportName);
        }
        Ok(())
    }

    /// The report name, if it is non-blank
    pub fn report_name(&self) -> Option<&str> {
        self.report_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// The references that will actually be processed
    pub fn selected(&self) -> &[NoteRef] {
        match self.cap {
            Some(cap) if cap > 0 && cap < self.references.len() => &self.references[..cap],
            _ => &self.references,
        }
    }
}

/// A reference that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedReference {
    pub reference: NoteRef,
    pub error: FetchError,
}

/// The result of a batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Successful records in processing order
    pub records: Vec<Record>,

    /// Failed references in processing order
    pub failures: Vec<FailedReference>,

    /// Number of references processed (successes plus failures)
    pub processed: usize,

    /// Where the report was written, if one was
    pub report_path: Option<PathBuf>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Runs batches against the persistence collaborators
#[derive(Clone)]
pub struct BatchCrawler {
    media: Arc<dyn MediaWriter>,
    report: Arc<dyn ReportWriter>,
}

impl BatchCrawler {
    pub fn new(media: Arc<dyn MediaWriter>, report: Arc<dyn ReportWriter>) -> Self {
        Self { media, report }
    }

    /// Runs one batch
    ///
    /// # Flow
    ///
    /// 1. Validate the plan; a missing report name fails before any fetch
    /// 2. Truncate the references to the first `cap` entries
    /// 3. Fetch each reference in order, emitting `[i/total] <title>` or
    ///    `[i/total] download failed: <reason>`
    /// 4. Write media for each record the save mode applies to; failures
    ///    are reported and skipped
    /// 5. Write the report if the save mode calls for it
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOutcome)` - The records, failures and report path
    /// * `Err(HarvesterError)` - The plan is invalid or the report could not be written
    pub async fn run(
        &self,
        worker: &mut FetchWorker,
        plan: BatchPlan,
        sink: &dyn ProgressSink,
    ) -> Result<BatchOutcome, HarvesterError> {
        plan.validate()?;

        let selected = plan.selected();
        let total = selected.len();
        if total < plan.references.len() {
            tracing::info!(
                "Capping batch at {} of {} references",
                total,
                plan.references.len()
            );
        }

        let mut outcome = BatchOutcome::default();
        for (index, reference) in selected.iter().enumerate() {
            let position = index + 1;
            match worker.fetch(reference).await {
                Ok(record) => {
                    tracing::debug!("Fetched {} ({})", reference, record.note_id);
                    sink.emit(format!("[{}/{}] {}", position, total, record.display_title()));
                    outcome.records.push(record);
                }
                Err(error) => {
                    tracing::warn!("Failed to fetch {}: {}", reference, error);
                    sink.emit(format!("[{}/{}] download failed: {}", position, total, error));
                    outcome.failures.push(FailedReference {
                        reference: reference.clone(),
                        error,
                    });
                }
            }
            outcome.processed += 1;
        }

        if plan.save_mode.wants_media() {
            for record in &outcome.records {
                if let Err(e) = self.media.write_media(record, plan.save_mode).await {
                    tracing::warn!("Failed to save media for {}: {}", record.note_id, e);
                    sink.emit(format!(
                        "media save failed for {}: {}",
                        record.display_title(),
                        e
                    ));
                }
            }
        }

        if plan.save_mode.wants_report() {
            if let Some(name) = plan.report_name() {
                let path = self.report.write_report(&outcome.records, name).await?;
                sink.emit(format!("report saved: {}", path.display()));
                outcome.report_path = Some(path);
            }
        }

        Ok(outcome)
    }
}
