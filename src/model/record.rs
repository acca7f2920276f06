use crate::reference::NoteRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title shown for notes that have none
pub const UNTITLED: &str = "untitled";

/// Kind of content a note carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A video note (one video plus a cover image)
    Video,
    /// An image album
    Album,
}

impl NoteKind {
    /// Converts the kind to its stored string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Album => "album",
        }
    }

    /// Parses a stored string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "album" => Some(Self::Album),
            _ => None,
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized result of fetching one note
///
/// Built by the fetch worker on success and never mutated after it has been
/// appended to a batch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub note_id: String,
    /// The reference this record was fetched from
    pub note_url: NoteRef,
    pub note_type: NoteKind,
    pub user_id: String,
    pub home_url: String,
    pub nickname: String,
    pub avatar: String,
    pub title: String,
    pub desc: String,
    pub liked_count: u64,
    pub collected_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub video_cover: Option<String>,
    pub video_addr: Option<String>,
    pub image_list: Vec<String>,
    pub tags: Vec<String>,
    /// Publication time, `%Y-%m-%d %H:%M:%S` in UTC
    pub upload_time: Option<String>,
    pub ip_location: String,
    pub fetched_at: DateTime<Utc>,
}

impl Record {
    /// Title used in progress messages and directory names
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            UNTITLED
        } else {
            title
        }
    }

    /// Sum of all interaction counters
    pub fn interactions(&self) -> u64 {
        self.liked_count
            .saturating_add(self.collected_count)
            .saturating_add(self.comment_count)
            .saturating_add(self.share_count)
    }
}
