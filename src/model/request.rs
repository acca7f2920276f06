use super::search::SearchParams;
use super::save_mode::SaveMode;
use crate::reference::NoteRef;
use serde::{Deserialize, Serialize};

/// Where the references of a crawl come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrawlSource {
    /// An explicit list of note references
    Urls(Vec<NoteRef>),
    /// Every note linked from a user's profile page
    User {
        /// Profile address
        target: String,
        /// Maximum number of scroll steps; `None` scrolls until the page stops growing
        scroll_limit: Option<u32>,
    },
    /// The results of a keyword search
    Search(SearchParams),
}

impl CrawlSource {
    /// Short label used for task names and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Urls(_) => "notes",
            Self::User { .. } => "user",
            Self::Search(_) => "search",
        }
    }
}

/// A complete crawl request: source, side effects and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub source: CrawlSource,
    pub save_mode: SaveMode,
    /// Report file stem; required when the save mode writes a report,
    /// unless the source can derive one
    pub report_name: Option<String>,
    /// Maximum number of records to fetch; `None` or zero is unbounded
    pub cap: Option<usize>,
}

impl CrawlRequest {
    pub fn new(source: CrawlSource, save_mode: SaveMode) -> Self {
        Self {
            source,
            save_mode,
            report_name: None,
            cap: None,
        }
    }

    pub fn with_report_name(mut self, name: impl Into<String>) -> Self {
        self.report_name = Some(name.into());
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }

    /// The explicit report name, if it is non-blank
    pub fn explicit_report_name(&self) -> Option<&str> {
        self.report_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// The effective cap, with zero meaning unbounded
    pub fn effective_cap(&self) -> Option<usize> {
        self.cap.filter(|cap| *cap > 0)
    }
}
