//! Single-flight task execution
//!
//! At most one task runs at a time across the whole controller. A task runs
//! on its own tokio task; whatever happens to it (success, error or panic)
//! the controller becomes idle again once it ends.

use crate::crawler::worker::panic_message;
use crate::crawler::{CrawlEngine, ProgressSink};
use crate::model::CrawlRequest;
use crate::ValidationError;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Result of a crawl submission that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    RejectedBusy,
}

/// How a submitted task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// The task returned an error or panicked
    Failed(String),
}

impl TaskOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Clears the busy flag when dropped
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs submitted tasks one at a time
pub struct TaskController {
    busy: Arc<AtomicBool>,
    running: Mutex<Option<JoinHandle<TaskOutcome>>>,
    sink: Arc<dyn ProgressSink>,
}

impl TaskController {
    /// Creates an idle controller reporting to `sink`
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            running: Mutex::new(None),
            sink,
        }
    }

    /// Returns true while a task is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Submits a task
    ///
    /// Returns false, without starting anything, if another task is running.
    /// On acceptance emits `"<name> started"` and, when the task ends,
    /// `"<name> completed"` or `"<name> failed: <reason>"`. The controller is
    /// idle again before the final message is emitted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<F, E>(&self, name: impl Into<String>, work: F) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = name.into();

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Rejected task {}: another task is running", name);
            self.sink
                .emit(format!("{} rejected: another task is running", name));
            return false;
        }

        let guard = BusyGuard(self.busy.clone());
        let sink = self.sink.clone();
        tracing::info!("Task {} started", name);
        sink.emit(format!("{} started", name));

        let handle = tokio::spawn(async move {
            let outcome = match tokio::spawn(work).await {
                Ok(Ok(())) => {
                    tracing::info!("Task {} completed", name);
                    TaskOutcome::Completed
                }
                Ok(Err(e)) => {
                    tracing::warn!("Task {} failed: {}", name, e);
                    TaskOutcome::Failed(e.to_string())
                }
                Err(join_error) => {
                    let reason = if join_error.is_panic() {
                        panic_message(join_error.into_panic())
                    } else {
                        "cancelled".to_string()
                    };
                    tracing::error!("Task {} failed: {}", name, reason);
                    TaskOutcome::Failed(reason)
                }
            };
            let message = match &outcome {
                TaskOutcome::Completed => format!("{} completed", name),
                TaskOutcome::Failed(reason) => format!("{} failed: {}", name, reason),
            };
            drop(guard);
            sink.emit(message);
            outcome
        });

        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        true
    }

    /// Validates a crawl request and submits it
    ///
    /// # Returns
    ///
    /// * `Ok(SubmitOutcome::Accepted)` - The crawl is running
    /// * `Ok(SubmitOutcome::RejectedBusy)` - Another task is running; nothing started
    /// * `Err(ValidationError)` - The request is invalid; nothing started
    pub fn submit_crawl(
        &self,
        engine: Arc<CrawlEngine>,
        request: CrawlRequest,
    ) -> Result<SubmitOutcome, ValidationError> {
        engine.validate(&request)?;

        let name = format!("crawl-{}", request.source.kind());
        let sink = self.sink.clone();
        let accepted = self.submit(name, async move {
            engine.execute(request, sink.as_ref()).await.map(|_| ())
        });

        Ok(if accepted {
            SubmitOutcome::Accepted
        } else {
            SubmitOutcome::RejectedBusy
        })
    }

    /// Waits for the most recently submitted task to finish
    ///
    /// Returns `None` immediately when no task is pending.
    pub async fn wait(&self) -> Option<TaskOutcome> {
        let handle = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;

        Some(match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Task supervisor ended abnormally: {}", e);
                TaskOutcome::Failed(e.to_string())
            }
        })
    }
}
