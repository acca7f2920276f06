//! Single-note fetching
//!
//! A fetch waits on the task's rate limiter, calls the note API and turns the
//! reply into a [`Record`] or a [`FetchError`]. Nothing raised by the API,
//! panics included, escapes as anything other than a `FetchError`.

use crate::api::{NoteApi, RecordNormalizer};
use crate::crawler::RateLimiter;
use crate::model::Record;
use crate::reference::NoteRef;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;

/// Why one reference could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The platform answered but reported a failure
    #[error("{0}")]
    Remote(String),

    /// The platform reported success without any item
    #[error("empty result: invalid access token or restricted note")]
    Empty,

    /// The item could not be normalized
    #[error("malformed item: {0}")]
    Malformed(String),

    /// The API call itself failed or panicked
    #[error("request failed: {0}")]
    Collaborator(String),
}

/// Fetches notes one at a time under a rate limiter
pub struct FetchWorker {
    api: Arc<dyn NoteApi>,
    normalizer: RecordNormalizer,
    limiter: RateLimiter,
}

impl FetchWorker {
    pub fn new(api: Arc<dyn NoteApi>, normalizer: RecordNormalizer, limiter: RateLimiter) -> Self {
        Self {
            api,
            normalizer,
            limiter,
        }
    }

    /// The API this worker fetches from
    pub fn api(&self) -> &Arc<dyn NoteApi> {
        &self.api
    }

    /// Waits on the rate limiter without fetching
    ///
    /// Used before other remote work of the same task (searches, harvests) so
    /// that it counts against the same limits.
    pub async fn pace(&mut self) {
        self.limiter.wait().await;
    }

    /// Fetches and normalizes one note
    ///
    /// # Classification
    ///
    /// | Outcome | Result |
    /// |---------|--------|
    /// | API error or panic | `FetchError::Collaborator` |
    /// | Reply not successful | `FetchError::Remote(message)` |
    /// | Successful reply without items | `FetchError::Empty` |
    /// | First item does not normalize | `FetchError::Malformed` |
    /// | Otherwise | `Ok(Record)` carrying `reference` |
    pub async fn fetch(&mut self, reference: &NoteRef) -> Result<Record, FetchError> {
        self.limiter.wait().await;

        let call = AssertUnwindSafe(self.api.fetch_note(reference)).catch_unwind();
        let reply = match call.await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(FetchError::Collaborator(e.to_string())),
            Err(panic) => return Err(FetchError::Collaborator(panic_message(panic))),
        };

        if !reply.success {
            let message = if reply.message.trim().is_empty() {
                "remote reported failure".to_string()
            } else {
                reply.message
            };
            return Err(FetchError::Remote(message));
        }

        let item = reply.items.first().ok_or(FetchError::Empty)?;

        self.normalizer
            .normalize(item, reference)
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

/// Extracts the message of a caught panic
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
