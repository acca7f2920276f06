//! Note references
//!
//! A [`NoteRef`] is the opaque, fetchable identifier of one note: a canonical
//! note address that may carry a short-lived access token. References compare,
//! hash and sort by their normalized string form.

mod normalize;

pub use normalize::normalize_reference;

use crate::{ReferenceError, ReferenceResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Path marker shared by every note detail address
const NOTE_PATH_MARKER: &str = "/explore/";

/// Query parameter carrying the access token
const TOKEN_PARAM: &str = "xsec_token";

/// A normalized reference to a single note
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteRef(Url);

impl NoteRef {
    /// Parses and normalizes a reference
    pub fn parse(input: &str) -> ReferenceResult<Self> {
        normalize_reference(input).map(Self)
    }

    /// Builds the canonical, token-bearing address of a note
    ///
    /// # Example
    ///
    /// ```
    /// use note_harvester::reference::NoteRef;
    /// use url::Url;
    ///
    /// let web = Url::parse("https://www.example.com").unwrap();
    /// let note = NoteRef::from_parts(&web, "64ab", "tok").unwrap();
    /// assert_eq!(note.as_str(), "https://www.example.com/explore/64ab?xsec_token=tok");
    /// ```
    pub fn from_parts(web_base: &Url, note_id: &str, token: &str) -> ReferenceResult<Self> {
        let note_id = note_id.trim();
        if note_id.is_empty() || note_id.contains('/') {
            return Err(ReferenceError::NotANote(note_id.to_string()));
        }

        let mut url = web_base
            .join(&format!("/explore/{}", note_id))
            .map_err(|e| ReferenceError::Parse(e.to_string()))?;
        if !token.is_empty() {
            url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
        }

        Self::parse(url.as_str())
    }

    /// The normalized address as a string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The normalized address
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// The note id: the path segment following `explore` or `discovery/item`
    pub fn note_id(&self) -> Option<&str> {
        let segments: Vec<&str> = self.0.path_segments()?.collect();
        segments
            .windows(2)
            .find(|pair| pair[0] == "explore" || pair[0] == "item")
            .map(|pair| pair[1])
            .filter(|id| !id.is_empty())
    }

    /// The access token carried in the query, if any
    pub fn xsec_token(&self) -> Option<String> {
        self.0
            .query_pairs()
            .find(|(key, _)| key == TOKEN_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

impl fmt::Display for NoteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteRef {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NoteRef {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NoteRef> for String {
    fn from(value: NoteRef) -> Self {
        value.0.into()
    }
}

/// Returns true if an address points at a note detail page
pub fn is_note_address(address: &str) -> bool {
    address.contains(NOTE_PATH_MARKER)
}

/// Parses a list of references, one per line, skipping blank lines
///
/// The first unparseable line is reported as a validation error.
pub fn parse_reference_list<I, S>(lines: I) -> Result<Vec<NoteRef>, ValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !line.is_empty())
        .map(|line| {
            NoteRef::parse(&line).map_err(|e| ValidationError::InvalidReference {
                input: line.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Derives a report name from a user target: its last path segment without
/// the query string
///
/// # Example
///
/// ```
/// use note_harvester::reference::report_name_from_target;
///
/// let name = report_name_from_target("https://www.example.com/user/profile/5f3a?xsec_source=pc");
/// assert_eq!(name, "5f3a");
/// ```
pub fn report_name_from_target(target: &str) -> String {
    let last = target.trim().rsplit('/').next().unwrap_or_default();
    last.split('?').next().unwrap_or_default().to_string()
}
