//! Crawler module: the crawl orchestration core
//!
//! This module contains:
//! - Rate limiting of remote calls
//! - Single-note fetching with failure classification
//! - Sequential batch crawling and persistence
//! - Timeline harvesting through a browsing session
//! - Source resolution (note lists, user timelines, searches)
//! - Single-flight task execution

mod batch;
mod controller;
mod engine;
mod harvester;
mod progress;
mod rate_limiter;
mod resolver;
mod worker;

pub use batch::{BatchCrawler, BatchOutcome, BatchPlan, FailedReference};
pub use controller::{SubmitOutcome, TaskController, TaskOutcome};
pub use engine::{CrawlEngine, CrawlSettings};
pub use harvester::{HarvestError, HarvestSettings, LinkHarvester};
pub use progress::{ChannelProgressSink, ProgressSink, TracingProgressSink};
pub use rate_limiter::{RateLimitPolicy, RateLimiter};
pub use resolver::{resolver_for, ByUrls, ByUser, BySearch, ResolveEnv, SourceResolver};
pub use worker::{FetchError, FetchWorker};
