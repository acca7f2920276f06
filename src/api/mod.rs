//! Remote note API boundary
//!
//! The crawl core only needs two remote operations: fetch one note by
//! reference, and list the results of a search. Both are expressed by the
//! [`NoteApi`] trait so the orchestration can run against in-memory doubles.
//!
//! # Components
//!
//! - `NoteApi`: the collaborator trait
//! - `HttpNoteApi`: reqwest implementation against the web API
//! - `RecordNormalizer`: maps raw feed items into [`crate::model::Record`]

mod http;
mod normalize;

pub use http::{HttpNoteApi, FEED_PATH, SEARCH_PAGE_SIZE, SEARCH_PATH};
pub use normalize::{parse_count, NormalizeError, RecordNormalizer};

use crate::model::SearchParams;
use crate::reference::NoteRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the HTTP collaborator
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode API response: {0}")]
    Decode(String),

    #[error("Invalid API endpoint: {0}")]
    Endpoint(String),

    #[error("Reference has no note id: {0}")]
    MissingNoteId(String),
}

/// A remote reply: the platform's success flag, its message and raw items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiReply {
    pub success: bool,
    pub message: String,
    pub items: Vec<serde_json::Value>,
}

impl ApiReply {
    /// A successful reply carrying `items`
    pub fn ok(items: Vec<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: "success".to_string(),
            items,
        }
    }

    /// A reply the platform flagged as failed
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            items: Vec::new(),
        }
    }
}

/// Remote fetch and search operations
#[async_trait::async_trait]
pub trait NoteApi: Send + Sync {
    /// Fetches the detail of one note
    async fn fetch_note(&self, reference: &NoteRef) -> Result<ApiReply, ApiError>;

    /// Runs a search and returns up to `params.count` raw result items
    async fn search_notes(&self, params: &SearchParams) -> Result<ApiReply, ApiError>;
}
