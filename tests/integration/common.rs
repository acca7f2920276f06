//! In-memory collaborators shared by the integration tests

use async_trait::async_trait;
use note_harvester::api::{ApiError, ApiReply, NoteApi};
use note_harvester::browser::{BrowserError, BrowsingSession, ContextHandle, SessionFactory};
use note_harvester::crawler::{
    CrawlEngine, CrawlSettings, HarvestSettings, ProgressSink, RateLimitPolicy,
};
use note_harvester::model::{Record, SaveMode, SearchParams};
use note_harvester::output::{MediaSummary, MediaWriter, OutputResult, ReportWriter};
use note_harvester::NoteRef;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const WEB: &str = "https://www.example.com";

pub fn note(id: &str) -> NoteRef {
    NoteRef::parse(&format!("{}/explore/{}?xsec_token=tok-{}", WEB, id, id))
        .expect("valid test reference")
}

/// A raw feed item the normalizer accepts
pub fn feed_item(id: &str) -> Value {
    json!({
        "id": id,
        "note_card": {
            "type": "normal",
            "title": format!("title {}", id),
            "user": { "user_id": "u1", "nickname": "ann" },
            "interact_info": { "liked_count": "12" },
            "image_list": [{ "url_default": format!("https://img.example.com/{}.jpg", id) }],
        }
    })
}

/// Note API double: fetches succeed unless the note id is listed as failing
#[derive(Default)]
pub struct FakeApi {
    pub failing: HashSet<String>,
    pub search_items: Vec<Value>,
    pub search_failure: Option<String>,
    pub fetched: Mutex<Vec<String>>,
    pub search_calls: AtomicUsize,
}

impl FakeApi {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.fetched.lock().unwrap().len() + self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NoteApi for FakeApi {
    async fn fetch_note(&self, reference: &NoteRef) -> Result<ApiReply, ApiError> {
        let id = reference.note_id().unwrap_or_default().to_string();
        self.fetched.lock().unwrap().push(id.clone());

        if self.failing.contains(&id) {
            Ok(ApiReply::failed("note unavailable"))
        } else {
            Ok(ApiReply::ok(vec![feed_item(&id)]))
        }
    }

    async fn search_notes(&self, params: &SearchParams) -> Result<ApiReply, ApiError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.search_failure {
            return Ok(ApiReply::failed(message.clone()));
        }
        Ok(ApiReply::ok(
            self.search_items.iter().take(params.count).cloned().collect(),
        ))
    }
}

/// Media writer double recording which notes it was asked to save
#[derive(Default)]
pub struct MemoryMedia {
    pub saved: Mutex<Vec<(String, SaveMode)>>,
}

#[async_trait]
impl MediaWriter for MemoryMedia {
    async fn write_media(&self, record: &Record, save_mode: SaveMode) -> OutputResult<MediaSummary> {
        self.saved
            .lock()
            .unwrap()
            .push((record.note_id.clone(), save_mode));
        Ok(MediaSummary::skipped())
    }
}

/// Report writer double keeping every written report in memory
#[derive(Default)]
pub struct MemoryReport {
    pub reports: Mutex<Vec<(String, Vec<Record>)>>,
}

impl MemoryReport {
    pub fn only(&self) -> (String, Vec<Record>) {
        let reports = self.reports.lock().unwrap();
        assert_eq!(reports.len(), 1, "expected exactly one report");
        reports[0].clone()
    }
}

#[async_trait]
impl ReportWriter for MemoryReport {
    async fn write_report(&self, records: &[Record], name: &str) -> OutputResult<PathBuf> {
        self.reports
            .lock()
            .unwrap()
            .push((name.to_string(), records.to_vec()));
        Ok(PathBuf::from(format!("{}.sqlite", name)))
    }
}

/// Progress sink collecting every line
#[derive(Default)]
pub struct Lines(Mutex<Vec<String>>);

impl Lines {
    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// The per-reference `[i/total]` lines
    pub fn per_reference(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|line| line.starts_with('['))
            .collect()
    }
}

impl ProgressSink for Lines {
    fn emit(&self, message: String) {
        self.0.lock().unwrap().push(message);
    }
}

/// A profile page that reveals one batch of note anchors per scroll
pub struct TimelinePage {
    batches: Vec<Vec<String>>,
    revealed: usize,
    tabs: HashMap<u64, String>,
    next_tab: u64,
    quits: Arc<AtomicUsize>,
    fail_navigation: bool,
}

#[async_trait]
impl BrowsingSession for TimelinePage {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        if self.fail_navigation {
            return Err(BrowserError::Protocol(format!("cannot load {}", url)));
        }
        Ok(())
    }

    async fn inject_auth(&mut self, _cookies: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn query_anchors(&mut self, _selector: &str) -> Result<Vec<String>, BrowserError> {
        Ok(self.batches[..self.revealed].concat())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.revealed = (self.revealed + 1).min(self.batches.len());
        Ok(())
    }

    async fn read_size_signal(&mut self) -> Result<u64, BrowserError> {
        Ok(self.revealed as u64 * 800)
    }

    async fn open_in_background(&mut self, url: &str) -> Result<ContextHandle, BrowserError> {
        self.next_tab += 1;
        self.tabs.insert(self.next_tab, url.to_string());
        Ok(ContextHandle(self.next_tab))
    }

    async fn read_current_address(&mut self, handle: ContextHandle) -> Result<String, BrowserError> {
        let url = self
            .tabs
            .get(&handle.0)
            .ok_or(BrowserError::UnknownContext(handle))?;
        let id = url.rsplit('/').next().unwrap_or_default();
        Ok(format!("{}?xsec_token=tok-{}", url, id))
    }

    async fn close(&mut self, handle: ContextHandle) -> Result<(), BrowserError> {
        self.tabs.remove(&handle.0);
        Ok(())
    }

    async fn quit(self: Box<Self>) -> Result<(), BrowserError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens [`TimelinePage`] sessions and counts how many were shut down
#[derive(Default)]
pub struct TimelineFactory {
    pub batches: Vec<Vec<String>>,
    pub quits: Arc<AtomicUsize>,
    pub opened: AtomicUsize,
    pub fail_navigation: bool,
}

impl TimelineFactory {
    pub fn new(batches: Vec<Vec<&str>>) -> Self {
        Self {
            batches: batches
                .into_iter()
                .map(|ids| {
                    ids.into_iter()
                        .map(|id| format!("{}/explore/{}", WEB, id))
                        .collect()
                })
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionFactory for TimelineFactory {
    async fn open(&self) -> Result<Box<dyn BrowsingSession>, BrowserError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TimelinePage {
            revealed: self.batches.len().min(1),
            batches: self.batches.clone(),
            tabs: HashMap::new(),
            next_tab: 0,
            quits: self.quits.clone(),
            fail_navigation: self.fail_navigation,
        }))
    }
}

pub fn settings(rate_limit: RateLimitPolicy) -> CrawlSettings {
    CrawlSettings {
        web_base: Url::parse(WEB).unwrap(),
        rate_limit,
        default_cap: None,
        skip_video: true,
        harvest: HarvestSettings {
            anchor_selector: "a[href*='/explore/']".to_string(),
            scroll_pause: Duration::from_millis(5),
            resolve_pause: Duration::ZERO,
            stable_rounds: 2,
            cookies: String::new(),
        },
    }
}

/// Collaborators of one test engine, kept for inspection
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub sessions: Arc<TimelineFactory>,
    pub media: Arc<MemoryMedia>,
    pub report: Arc<MemoryReport>,
    pub engine: Arc<CrawlEngine>,
}

impl Harness {
    pub fn new(api: FakeApi, sessions: TimelineFactory, rate_limit: RateLimitPolicy) -> Self {
        let api = Arc::new(api);
        let sessions = Arc::new(sessions);
        let media = Arc::new(MemoryMedia::default());
        let report = Arc::new(MemoryReport::default());
        let engine = Arc::new(CrawlEngine::new(
            api.clone(),
            sessions.clone(),
            media.clone(),
            report.clone(),
            settings(rate_limit),
        ));
        Self {
            api,
            sessions,
            media,
            report,
            engine,
        }
    }

    pub fn with_api(api: FakeApi) -> Self {
        Self::new(api, TimelineFactory::default(), RateLimitPolicy::DISABLED)
    }
}
