//! Browser automation boundary
//!
//! The link harvester drives a [`BrowsingSession`]: a primary page it scrolls
//! and any number of short-lived secondary contexts (tabs) it opens to read
//! back resolved note addresses. Sessions come from a [`SessionFactory`] so
//! tests can substitute scripted fakes for Chrome.
//!
//! # Components
//!
//! - `BrowsingSession` / `SessionFactory`: the collaborator traits
//! - `ChromeSessionFactory`: chromiumoxide-backed implementation
//! - `parser`: anchor extraction from page HTML

mod chrome;
mod parser;

pub use chrome::{ChromeSessionFactory, ChromeSettings};
pub use parser::extract_anchors;

use std::time::Duration;
use thiserror::Error;

/// Errors raised at the browser boundary
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Unknown browsing context {0:?}")]
    UnknownContext(ContextHandle),

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Page script failed: {0}")]
    Script(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Opaque handle to a secondary browsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// One exclusive browser session
///
/// Every call may fail; callers treat failures as harvest or resolution
/// errors rather than letting them escape raw.
#[async_trait::async_trait]
pub trait BrowsingSession: Send {
    /// Loads `url` in the primary context
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Installs the `name=value; ...` cookie string for the current site
    async fn inject_auth(&mut self, cookies: &str) -> Result<(), BrowserError>;

    /// Absolute addresses of the anchors matching `selector` in the primary context
    async fn query_anchors(&mut self, selector: &str) -> Result<Vec<String>, BrowserError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    /// A value that grows as the page loads more content (the document height)
    async fn read_size_signal(&mut self) -> Result<u64, BrowserError>;

    /// Opens `url` in a new secondary context without leaving the primary one
    async fn open_in_background(&mut self, url: &str) -> Result<ContextHandle, BrowserError>;

    /// The address a secondary context ended up on
    async fn read_current_address(&mut self, handle: ContextHandle)
        -> Result<String, BrowserError>;

    async fn close(&mut self, handle: ContextHandle) -> Result<(), BrowserError>;

    /// Tears the session down
    async fn quit(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Opens browsing sessions
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowsingSession>, BrowserError>;
}

/// Opens `url` in a secondary context, waits `settle`, reads the resolved
/// address and closes the context
///
/// The context is closed even when reading the address fails. A failed
/// close is logged and never discards an address that was read.
pub async fn with_secondary_context(
    session: &mut dyn BrowsingSession,
    url: &str,
    settle: Duration,
) -> Result<String, BrowserError> {
    let handle = session.open_in_background(url).await?;

    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    let address = session.read_current_address(handle).await;

    if let Err(close_err) = session.close(handle).await {
        tracing::warn!("Failed to close context {:?}: {}", handle, close_err);
    }
    address
}
