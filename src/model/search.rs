//! Search query parameters and filter enums
//!
//! Every filter is a closed set with the numeric code the platform uses and
//! the tag string its search endpoint expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    General,
    Latest,
    MostLiked,
    MostCommented,
    MostCollected,
}

impl SortOrder {
    pub fn code(&self) -> u8 {
        match self {
            Self::General => 0,
            Self::Latest => 1,
            Self::MostLiked => 2,
            Self::MostCommented => 3,
            Self::MostCollected => 4,
        }
    }

    pub fn api_tag(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Latest => "time_descending",
            Self::MostLiked => "popularity_descending",
            Self::MostCommented => "comment_descending",
            Self::MostCollected => "collect_descending",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Latest => "latest",
            Self::MostLiked => "most-liked",
            Self::MostCommented => "most-commented",
            Self::MostCollected => "most-collected",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" | "0" => Ok(Self::General),
            "latest" | "1" => Ok(Self::Latest),
            "most-liked" | "2" => Ok(Self::MostLiked),
            "most-commented" | "3" => Ok(Self::MostCommented),
            "most-collected" | "4" => Ok(Self::MostCollected),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

/// Note type filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteTypeFilter {
    #[default]
    Any,
    Video,
    Normal,
}

impl NoteTypeFilter {
    pub fn code(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Video => 1,
            Self::Normal => 2,
        }
    }

    pub fn api_tag(&self) -> &'static str {
        match self {
            Self::Any => "不限",
            Self::Video => "视频笔记",
            Self::Normal => "普通笔记",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Video => "video",
            Self::Normal => "normal",
        }
    }
}

impl FromStr for NoteTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" | "0" => Ok(Self::Any),
            "video" | "1" => Ok(Self::Video),
            "normal" | "2" => Ok(Self::Normal),
            other => Err(format!("unknown note type '{}'", other)),
        }
    }
}

/// Publication time filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFilter {
    #[default]
    Any,
    Day,
    Week,
    HalfYear,
}

impl TimeFilter {
    pub fn code(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Day => 1,
            Self::Week => 2,
            Self::HalfYear => 3,
        }
    }

    pub fn api_tag(&self) -> &'static str {
        match self {
            Self::Any => "不限",
            Self::Day => "一天内",
            Self::Week => "一周内",
            Self::HalfYear => "半年内",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Day => "day",
            Self::Week => "week",
            Self::HalfYear => "half-year",
        }
    }
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" | "0" => Ok(Self::Any),
            "day" | "1" => Ok(Self::Day),
            "week" | "2" => Ok(Self::Week),
            "half-year" | "3" => Ok(Self::HalfYear),
            other => Err(format!("unknown time filter '{}'", other)),
        }
    }
}

/// Relationship of the searcher to the results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeFilter {
    #[default]
    Any,
    Viewed,
    Unviewed,
    Followed,
}

impl RangeFilter {
    pub fn code(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::Viewed => 1,
            Self::Unviewed => 2,
            Self::Followed => 3,
        }
    }

    pub fn api_tag(&self) -> &'static str {
        match self {
            Self::Any => "不限",
            Self::Viewed => "已看过",
            Self::Unviewed => "未看过",
            Self::Followed => "已关注",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Viewed => "viewed",
            Self::Unviewed => "unviewed",
            Self::Followed => "followed",
        }
    }
}

impl FromStr for RangeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" | "0" => Ok(Self::Any),
            "viewed" | "1" => Ok(Self::Viewed),
            "unviewed" | "2" => Ok(Self::Unviewed),
            "followed" | "3" => Ok(Self::Followed),
            other => Err(format!("unknown range filter '{}'", other)),
        }
    }
}

/// Proximity filter; anything but `Any` needs a geo coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceFilter {
    #[default]
    Any,
    SameCity,
    Nearby,
}

impl DistanceFilter {
    pub fn code(&self) -> u8 {
        match self {
            Self::Any => 0,
            Self::SameCity => 1,
            Self::Nearby => 2,
        }
    }

    pub fn api_tag(&self) -> &'static str {
        match self {
            Self::Any => "不限",
            Self::SameCity => "同城",
            Self::Nearby => "附近",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::SameCity => "same-city",
            Self::Nearby => "nearby",
        }
    }

    /// Returns true if this filter can only be evaluated around a coordinate
    pub fn requires_geo(&self) -> bool {
        !matches!(self, Self::Any)
    }
}

impl FromStr for DistanceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" | "0" => Ok(Self::Any),
            "same-city" | "1" => Ok(Self::SameCity),
            "nearby" | "2" => Ok(Self::Nearby),
            other => Err(format!("unknown distance filter '{}'", other)),
        }
    }
}

impl fmt::Display for DistanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coordinate used by the proximity filters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything the search collaborator needs for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    /// Number of results requested
    pub count: usize,
    pub sort: SortOrder,
    pub note_type: NoteTypeFilter,
    pub time: TimeFilter,
    pub range: RangeFilter,
    pub distance: DistanceFilter,
    pub geo: Option<Geo>,
}

impl SearchParams {
    /// A query with every filter unset
    pub fn new(query: impl Into<String>, count: usize) -> Self {
        Self {
            query: query.into(),
            count,
            sort: SortOrder::default(),
            note_type: NoteTypeFilter::default(),
            time: TimeFilter::default(),
            range: RangeFilter::default(),
            distance: DistanceFilter::default(),
            geo: None,
        }
    }

    /// The count actually requested once a global record cap applies
    pub fn effective_count(&self, cap: Option<usize>) -> usize {
        match cap {
            Some(cap) if cap > 0 => self.count.min(cap),
            _ => self.count,
        }
    }
}
