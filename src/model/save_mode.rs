//! Save-mode: which persistence side effects apply to a batch

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which media files a batch downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSelection {
    /// Images and videos
    Everything,
    /// Only videos (and their covers)
    VideoOnly,
    /// Only images
    ImageOnly,
}

/// Selects the media and report side effects of a batch
///
/// Parsed from `all`, `media`, `media-video`, `media-image` and `excel`
/// (`report` is accepted as an alias of `excel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveMode {
    media: Option<MediaSelection>,
    report: bool,
}

impl SaveMode {
    /// Media and report
    pub const ALL: Self = Self {
        media: Some(MediaSelection::Everything),
        report: true,
    };

    /// All media, no report
    pub const MEDIA: Self = Self {
        media: Some(MediaSelection::Everything),
        report: false,
    };

    /// Videos only, no report
    pub const MEDIA_VIDEO: Self = Self {
        media: Some(MediaSelection::VideoOnly),
        report: false,
    };

    /// Images only, no report
    pub const MEDIA_IMAGE: Self = Self {
        media: Some(MediaSelection::ImageOnly),
        report: false,
    };

    /// Report only
    pub const REPORT: Self = Self {
        media: None,
        report: true,
    };

    /// Returns true if any media is written
    pub fn wants_media(&self) -> bool {
        self.media.is_some()
    }

    /// Returns true if a tabular report is written
    pub fn wants_report(&self) -> bool {
        self.report
    }

    /// Returns true if image files are downloaded
    pub fn wants_images(&self) -> bool {
        matches!(
            self.media,
            Some(MediaSelection::Everything | MediaSelection::ImageOnly)
        )
    }

    /// Returns true if video files are downloaded
    pub fn wants_video(&self) -> bool {
        matches!(
            self.media,
            Some(MediaSelection::Everything | MediaSelection::VideoOnly)
        )
    }

    /// Restricts full media downloads to images
    ///
    /// Modes that already pick only videos, or that write no media, are kept.
    pub fn images_only(self) -> Self {
        match self.media {
            Some(MediaSelection::Everything) => Self {
                media: Some(MediaSelection::ImageOnly),
                report: self.report,
            },
            _ => self,
        }
    }
}

impl Default for SaveMode {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match (self.media, self.report) {
            (Some(MediaSelection::Everything), true) => "all",
            (Some(MediaSelection::ImageOnly), true) => "all-images",
            (Some(MediaSelection::VideoOnly), true) => "all-videos",
            (Some(MediaSelection::Everything), false) => "media",
            (Some(MediaSelection::VideoOnly), false) => "media-video",
            (Some(MediaSelection::ImageOnly), false) => "media-image",
            (None, _) => "excel",
        };
        f.write_str(label)
    }
}

impl FromStr for SaveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::ALL),
            "media" => Ok(Self::MEDIA),
            "media-video" => Ok(Self::MEDIA_VIDEO),
            "media-image" => Ok(Self::MEDIA_IMAGE),
            "excel" | "report" => Ok(Self::REPORT),
            other => Err(format!(
                "unknown save mode '{}' (expected all, media, media-video, media-image or excel)",
                other
            )),
        }
    }
}
