//! Media downloads
//!
//! Layout: `<media-dir>/<nickname>_<user-id>/<title>_<note-id>/` containing
//! `info.json` plus `image_N.jpg` for albums or `cover.jpg` and `video.mp4`
//! for videos.

use crate::config::Config;
use crate::model::{NoteKind, Record, SaveMode, UNTITLED};
use crate::output::traits::{MediaSummary, MediaWriter, OutputError, OutputResult};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest file-name component produced by [`sanitize_name`], in characters
const MAX_NAME_CHARS: usize = 64;

/// Makes `name` safe to use as a single path component
///
/// Path separators, reserved characters and control characters become `_`,
/// surrounding whitespace and dots are trimmed, and the result is truncated.
/// An empty result becomes `untitled`.
///
/// # Example
///
/// ```
/// use note_harvester::output::sanitize_name;
///
/// assert_eq!(sanitize_name("a/b: c?"), "a_b_ c_");
/// assert_eq!(sanitize_name(" .. "), "untitled");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed: String = replaced
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = trimmed.trim_end().to_string();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed
    }
}

/// Downloads media over HTTP into the media directory
#[derive(Debug, Clone)]
pub struct HttpMediaWriter {
    client: Client,
    media_dir: PathBuf,
}

impl HttpMediaWriter {
    pub fn new(client: Client, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            media_dir: media_dir.into(),
        }
    }

    /// Builds a writer with the configured user agent, proxy and timeout
    pub fn from_config(config: &Config) -> OutputResult<Self> {
        let mut builder = Client::builder()
            .user_agent(config.api.user_agent.clone())
            .timeout(Duration::from_secs(config.api.timeout_secs.max(1) * 4))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy) = config.network.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(Proxy::all(proxy.trim())?);
        }

        Ok(Self::new(builder.build()?, &config.output.media_dir))
    }

    /// The directory a record's files go to
    pub fn record_dir(&self, record: &Record) -> PathBuf {
        self.media_dir
            .join(format!(
                "{}_{}",
                sanitize_name(&record.nickname),
                sanitize_name(&record.user_id)
            ))
            .join(format!(
                "{}_{}",
                sanitize_name(record.display_title()),
                sanitize_name(&record.note_id)
            ))
    }

    async fn download(&self, url: &str, path: &Path) -> OutputResult<()> {
        let to_error = |e: reqwest::Error| OutputError::Download {
            url: url.to_string(),
            message: e.to_string(),
        };

        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(to_error)?
            .bytes()
            .await
            .map_err(to_error)?;

        tokio::fs::write(path, &bytes).await?;
        tracing::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

#[async_trait]
impl MediaWriter for HttpMediaWriter {
    async fn write_media(&self, record: &Record, save_mode: SaveMode) -> OutputResult<MediaSummary> {
        let applies = match record.note_type {
            NoteKind::Video => save_mode.wants_video(),
            NoteKind::Album => save_mode.wants_images(),
        };
        if !applies {
            return Ok(MediaSummary::skipped());
        }

        let dir = self.record_dir(record);
        tokio::fs::create_dir_all(&dir).await?;

        let info = serde_json::to_vec_pretty(record)
            .map_err(|e| OutputError::Serialization(e.to_string()))?;
        tokio::fs::write(dir.join("info.json"), info).await?;

        let mut files = 0;
        match record.note_type {
            NoteKind::Album => {
                for (index, url) in record.image_list.iter().enumerate() {
                    self.download(url, &dir.join(format!("image_{}.jpg", index)))
                        .await?;
                    files += 1;
                }
            }
            NoteKind::Video => {
                if let Some(cover) = &record.video_cover {
                    self.download(cover, &dir.join("cover.jpg")).await?;
                    files += 1;
                }
                if let Some(video) = &record.video_addr {
                    self.download(video, &dir.join("video.mp4")).await?;
                    files += 1;
                }
            }
        }

        Ok(MediaSummary {
            directory: Some(dir),
            files,
        })
    }
}
