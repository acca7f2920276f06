//! HTTP implementation of the note API
//!
//! Requests go to the configured `base-url`, which is expected to be the web
//! API or a gateway in front of it that applies request signing. The cookie
//! string from the config authenticates every call.

use super::{ApiError, ApiReply, NoteApi};
use crate::config::Config;
use crate::model::SearchParams;
use crate::reference::NoteRef;
use chrono::Utc;
use reqwest::{header, Client, Proxy};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Single-note detail endpoint
pub const FEED_PATH: &str = "/api/sns/web/v1/feed";

/// Search endpoint
pub const SEARCH_PATH: &str = "/api/sns/web/v1/search/notes";

/// Results requested per search page
pub const SEARCH_PAGE_SIZE: usize = 20;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeData {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    has_more: bool,
}

/// Note API client over reqwest
#[derive(Debug, Clone)]
pub struct HttpNoteApi {
    client: Client,
    base_url: Url,
    cookies: String,
}

impl HttpNoteApi {
    /// Builds a client from the `[api]`, `[auth]` and `[network]` sections
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpNoteApi)` - Ready to issue requests
    /// * `Err(ApiError)` - The base URL or proxy is unusable, or the client failed to build
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api.base_url)
            .map_err(|e| ApiError::Endpoint(format!("{}: {}", config.api.base_url, e)))?;

        let mut builder = Client::builder()
            .user_agent(config.api.user_agent.clone())
            .timeout(Duration::from_secs(config.api.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = config.network.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(Proxy::all(proxy.trim())?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            cookies: config.auth.cookies.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Endpoint(format!("{}: {}", path, e)))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Envelope, ApiError> {
        let url = self.endpoint(path)?;
        let mut request = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body);
        if !self.cookies.is_empty() {
            request = request.header(header::COOKIE, self.cookies.as_str());
        }

        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        decode_envelope(&text)
    }
}

fn decode_envelope(text: &str) -> Result<Envelope, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Builds the detail request for one note
fn feed_body(note_id: &str, token: &str) -> Value {
    json!({
        "source_note_id": note_id,
        "image_formats": ["jpg", "webp", "avif"],
        "extra": { "need_body_topic": "1" },
        "xsec_source": "pc_search",
        "xsec_token": token,
    })
}

/// Builds one page of a search request
fn search_body(params: &SearchParams, search_id: &str, page: usize) -> Value {
    let mut body = json!({
        "keyword": params.query,
        "page": page,
        "page_size": SEARCH_PAGE_SIZE,
        "search_id": search_id,
        "sort": "general",
        "note_type": params.note_type.code(),
        "ext_flags": [],
        "filters": [
            { "tags": [params.sort.api_tag()], "type": "sort_type" },
            { "tags": [params.note_type.api_tag()], "type": "filter_note_type" },
            { "tags": [params.time.api_tag()], "type": "filter_note_time" },
            { "tags": [params.range.api_tag()], "type": "filter_note_range" },
            { "tags": [params.distance.api_tag()], "type": "filter_pos_distance" },
        ],
        "geo": "",
        "image_formats": ["jpg", "webp", "avif"],
    });

    if let Some(geo) = params.geo {
        body["geo"] = Value::String(
            json!({ "latitude": geo.latitude, "longitude": geo.longitude }).to_string(),
        );
    }

    body
}

#[async_trait::async_trait]
impl NoteApi for HttpNoteApi {
    async fn fetch_note(&self, reference: &NoteRef) -> Result<ApiReply, ApiError> {
        let note_id = reference
            .note_id()
            .ok_or_else(|| ApiError::MissingNoteId(reference.to_string()))?;
        let token = reference.xsec_token().unwrap_or_default();

        tracing::debug!("Fetching note {}", note_id);
        let envelope = self.post(FEED_PATH, &feed_body(note_id, &token)).await?;

        Ok(ApiReply {
            success: envelope.success,
            message: envelope.msg.unwrap_or_default(),
            items: envelope.data.unwrap_or_default().items,
        })
    }

    async fn search_notes(&self, params: &SearchParams) -> Result<ApiReply, ApiError> {
        let search_id = format!("{:x}", Utc::now().timestamp_millis());
        let mut items: Vec<Value> = Vec::new();
        let mut page = 1;

        while items.len() < params.count {
            let envelope = self
                .post(SEARCH_PATH, &search_body(params, &search_id, page))
                .await?;

            if !envelope.success {
                return Ok(ApiReply::failed(envelope.msg.unwrap_or_default()));
            }

            let data = envelope.data.unwrap_or_default();
            let received = data.items.len();
            items.extend(data.items);
            tracing::debug!(
                "Search '{}' page {}: {} items ({} total)",
                params.query,
                page,
                received,
                items.len()
            );

            if !data.has_more || received == 0 {
                break;
            }
            page += 1;
        }

        items.truncate(params.count);
        Ok(ApiReply::ok(items))
    }
}
