use crate::model::{NoteKind, Record};
use crate::reference::NoteRef;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Host serving original video streams
const VIDEO_CDN: &str = "https://sns-video-bd.xhscdn.com/";

/// Errors raised when a raw item does not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("item has no note card")]
    MissingCard,

    #[error("item has no note id")]
    MissingId,
}

/// Maps raw feed items into [`Record`]s
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    web_base: Url,
}

impl RecordNormalizer {
    /// Creates a normalizer that builds profile links under `web_base`
    pub fn new(web_base: Url) -> Self {
        Self { web_base }
    }

    /// Normalizes one raw item fetched for `reference`
    ///
    /// The item is expected to look like `{id, note_card: {...}}`. Missing
    /// optional fields fall back to empty strings and zero counts; only a
    /// missing card or an unrecoverable note id is an error.
    pub fn normalize(&self, raw: &Value, reference: &NoteRef) -> Result<Record, NormalizeError> {
        let card = raw
            .get("note_card")
            .filter(|card| card.is_object())
            .ok_or(NormalizeError::MissingCard)?;

        let note_id = str_field(raw, "id")
            .or_else(|| str_field(card, "note_id"))
            .or_else(|| reference.note_id().map(str::to_string))
            .ok_or(NormalizeError::MissingId)?;

        let note_type = match card.get("type").and_then(Value::as_str) {
            Some("video") => NoteKind::Video,
            _ => NoteKind::Album,
        };

        let user = card.get("user").unwrap_or(&Value::Null);
        let user_id = str_field(user, "user_id").unwrap_or_default();
        let home_url = self
            .web_base
            .join(&format!("/user/profile/{}", user_id))
            .map(String::from)
            .unwrap_or_default();

        let interact = card.get("interact_info").unwrap_or(&Value::Null);
        let image_list = image_urls(card);

        let (video_cover, video_addr) = match note_type {
            NoteKind::Video => (image_list.first().cloned(), video_address(card)),
            NoteKind::Album => (None, None),
        };

        let tags = card
            .get("tag_list")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|tag| str_field(tag, "name"))
                    .collect()
            })
            .unwrap_or_default();

        let upload_time = card
            .get("time")
            .and_then(Value::as_i64)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string());

        Ok(Record {
            note_id,
            note_url: reference.clone(),
            note_type,
            user_id,
            home_url,
            nickname: str_field(user, "nickname")
                .or_else(|| str_field(user, "nick_name"))
                .unwrap_or_default(),
            avatar: str_field(user, "avatar").unwrap_or_default(),
            title: str_field(card, "title").unwrap_or_default(),
            desc: str_field(card, "desc").unwrap_or_default(),
            liked_count: parse_count(interact.get("liked_count")),
            collected_count: parse_count(interact.get("collected_count")),
            comment_count: parse_count(interact.get("comment_count")),
            share_count: parse_count(interact.get("share_count")),
            video_cover,
            video_addr,
            image_list,
            tags,
            upload_time,
            ip_location: str_field(card, "ip_location").unwrap_or_default(),
            fetched_at: Utc::now(),
        })
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Picks one address per image: `url_default`, else the last `info_list` entry
fn image_urls(card: &Value) -> Vec<String> {
    let Some(images) = card.get("image_list").and_then(Value::as_array) else {
        return Vec::new();
    };

    images
        .iter()
        .filter_map(|image| {
            str_field(image, "url_default").or_else(|| {
                image
                    .get("info_list")
                    .and_then(Value::as_array)
                    .and_then(|list| list.iter().rev().find_map(|info| str_field(info, "url")))
            })
        })
        .collect()
}

fn video_address(card: &Value) -> Option<String> {
    card.pointer("/video/consumer/origin_video_key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(|key| format!("{}{}", VIDEO_CDN, key))
}

/// Parses an interaction counter
///
/// Accepts plain integers and display strings such as `"1.2万"`, `"3亿"` or
/// `"10+"`. Anything else counts as zero.
///
/// # Examples
///
/// ```
/// use note_harvester::api::parse_count;
/// use serde_json::json;
///
/// assert_eq!(parse_count(Some(&json!("1.2万"))), 12_000);
/// assert_eq!(parse_count(Some(&json!(42))), 42);
/// assert_eq!(parse_count(None), 0);
/// ```
pub fn parse_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_count_text(s),
        _ => 0,
    }
}

fn parse_count_text(text: &str) -> u64 {
    let text = text.trim().trim_end_matches('+').trim();
    let (digits, multiplier) = if let Some(rest) = text.strip_suffix('万') {
        (rest, 10_000.0)
    } else if let Some(rest) = text.strip_suffix('亿') {
        (rest, 100_000_000.0)
    } else {
        (text, 1.0)
    };

    digits
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| (n * multiplier).round() as u64)
        .unwrap_or(0)
}
