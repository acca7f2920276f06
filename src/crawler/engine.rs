//! Crawl execution
//!
//! [`CrawlEngine`] owns the collaborators and the settings taken from the
//! configuration, and runs one [`CrawlRequest`] from validation to the
//! written report.

use crate::api::{HttpNoteApi, NoteApi, RecordNormalizer};
use crate::browser::{ChromeSessionFactory, ChromeSettings, SessionFactory};
use crate::config::Config;
use crate::crawler::resolver::{resolver_for, ResolveEnv};
use crate::crawler::{
    BatchCrawler, BatchOutcome, FetchWorker, HarvestSettings, LinkHarvester, ProgressSink,
    RateLimitPolicy, RateLimiter,
};
use crate::model::CrawlRequest;
use crate::output::{HttpMediaWriter, MediaWriter, ReportWriter, SqliteReportWriter};
use crate::{ConfigError, HarvesterError, ValidationError};
use std::sync::Arc;
use url::Url;

/// Engine settings derived from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSettings {
    /// Base of canonical note and profile addresses
    pub web_base: Url,

    pub rate_limit: RateLimitPolicy,

    /// Record cap used when a request sets none
    pub default_cap: Option<usize>,

    /// Restrict timeline media downloads to images
    pub skip_video: bool,

    pub harvest: HarvestSettings,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let web_base = Url::parse(config.api.web_url.trim())
            .map_err(|e| ConfigError::InvalidUrl(format!("web-url: {}", e)))?;

        Ok(Self {
            web_base,
            rate_limit: RateLimitPolicy::from_config(&config.rate_limit),
            default_cap: Some(config.crawl.max_notes).filter(|cap| *cap > 0),
            skip_video: config.harvest.skip_video,
            harvest: HarvestSettings::from_config(config),
        })
    }
}

/// Runs crawl requests against a fixed set of collaborators
pub struct CrawlEngine {
    api: Arc<dyn NoteApi>,
    harvester: LinkHarvester,
    batch: BatchCrawler,
    settings: CrawlSettings,
}

impl CrawlEngine {
    pub fn new(
        api: Arc<dyn NoteApi>,
        sessions: Arc<dyn SessionFactory>,
        media: Arc<dyn MediaWriter>,
        report: Arc<dyn ReportWriter>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            api,
            harvester: LinkHarvester::new(sessions, settings.harvest.clone()),
            batch: BatchCrawler::new(media, report),
            settings,
        }
    }

    /// Builds the engine with the HTTP, Chrome and SQLite collaborators
    pub fn from_config(config: &Config) -> Result<Self, HarvesterError> {
        let settings = CrawlSettings::from_config(config)?;
        let api = HttpNoteApi::from_config(config)?;
        let sessions = ChromeSessionFactory::new(ChromeSettings::from_config(config));
        let media = HttpMediaWriter::from_config(config)?;
        let report = SqliteReportWriter::new(&config.output.report_dir);

        Ok(Self::new(
            Arc::new(api),
            Arc::new(sessions),
            Arc::new(media),
            Arc::new(report),
            settings,
        ))
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Checks a request without touching the network
    pub fn validate(&self, request: &CrawlRequest) -> Result<(), ValidationError> {
        resolver_for(&request.source).validate(request)
    }

    /// Runs a request to completion
    ///
    /// # Flow
    ///
    /// 1. Validate the request
    /// 2. Build a fresh rate limiter; every remote call of this run passes
    ///    through it
    /// 3. Resolve the source into a batch plan
    /// 4. Run the batch and emit `"done: S succeeded, F failed"`
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOutcome)` - The batch ran; individual fetches may have failed
    /// * `Err(HarvesterError)` - Validation, resolution or the report write failed
    pub async fn execute(
        &self,
        request: CrawlRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BatchOutcome, HarvesterError> {
        let resolver = resolver_for(&request.source);
        resolver.validate(&request)?;

        let cap = request.effective_cap().or(self.settings.default_cap);
        let mut worker = FetchWorker::new(
            self.api.clone(),
            RecordNormalizer::new(self.settings.web_base.clone()),
            RateLimiter::new(self.settings.rate_limit),
        );

        tracing::info!(
            "Resolving {} source (save mode {}, cap {:?})",
            request.source.kind(),
            request.save_mode,
            cap
        );
        let plan = {
            let mut env = ResolveEnv {
                worker: &mut worker,
                harvester: &self.harvester,
                web_base: &self.settings.web_base,
                skip_video: self.settings.skip_video,
                cap,
                sink,
            };
            resolver.resolve(&request, &mut env).await?
        };

        if plan.references.is_empty() {
            tracing::info!("No notes to fetch");
            sink.emit("no notes found".to_string());
            return Ok(BatchOutcome::default());
        }

        let outcome = self.batch.run(&mut worker, plan, sink).await?;
        tracing::info!(
            "Crawl finished: {} succeeded, {} failed",
            outcome.succeeded(),
            outcome.failed()
        );
        sink.emit(format!(
            "done: {} succeeded, {} failed",
            outcome.succeeded(),
            outcome.failed()
        ));
        Ok(outcome)
    }
}
