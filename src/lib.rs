//! Note-Harvester: a rate-limited harvester for social platform notes
//!
//! This crate turns a crawl request (an explicit list of note links, a user's
//! full timeline, or a search query) into a deduplicated, rate-limited stream
//! of fetched note records, then hands the surviving records to the media and
//! report writers.

pub mod api;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod reference;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Note-Harvester operations
#[derive(Debug, Error)]
pub enum HarvesterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Harvest failed: {0}")]
    Harvest(#[from] crawler::HarvestError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Search failed: {message}")]
    Search { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while turning text into a note reference
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to parse reference: {0}")]
    Parse(String),

    #[error("Invalid reference scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in reference")]
    MissingHost,

    #[error("Not a note address: {0}")]
    NotANote(String),
}

/// Request preconditions that are checked before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a report name is required when the save mode writes a report")]
    MissingReportName,

    #[error("distance filter '{distance}' requires a geo coordinate")]
    MissingGeo { distance: String },

    #[error("at least one note reference is required")]
    EmptyReferences,

    #[error("search query cannot be empty")]
    EmptyQuery,

    #[error("user target cannot be empty")]
    EmptyTarget,

    #[error("requested count must be at least 1")]
    InvalidCount,

    #[error("invalid reference '{input}': {reason}")]
    InvalidReference { input: String, reason: String },
}

/// Result type alias for Note-Harvester operations
pub type Result<T> = std::result::Result<T, HarvesterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for reference operations
pub type ReferenceResult<T> = std::result::Result<T, ReferenceError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    BatchCrawler, BatchOutcome, CrawlEngine, FetchError, FetchWorker, HarvestError, LinkHarvester,
    RateLimiter, SubmitOutcome, TaskController, TaskOutcome,
};
pub use model::{CrawlRequest, CrawlSource, Record, SaveMode};
pub use reference::NoteRef;
