//! Crawl sources
//!
//! Each [`CrawlSource`] variant has a resolver that checks the request's
//! preconditions and turns the source into a [`BatchPlan`]. Validation never
//! touches the network; resolution may (timeline harvest, search).

use crate::crawler::{BatchPlan, FetchWorker, LinkHarvester, ProgressSink};
use crate::model::{CrawlRequest, CrawlSource, SaveMode, SearchParams};
use crate::reference::{report_name_from_target, NoteRef};
use crate::{HarvesterError, ValidationError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Model type of search results that are notes
const NOTE_MODEL_TYPE: &str = "note";

/// What a resolver may use while resolving
pub struct ResolveEnv<'a> {
    /// Worker of the current task; its limiter paces resolver calls too
    pub worker: &'a mut FetchWorker,
    pub harvester: &'a LinkHarvester,
    /// Base of canonical note addresses
    pub web_base: &'a Url,
    /// Restrict timeline media downloads to images
    pub skip_video: bool,
    /// Record cap of the task; `None` is unbounded
    pub cap: Option<usize>,
    pub sink: &'a dyn ProgressSink,
}

/// Turns one kind of crawl source into a batch plan
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Checks every precondition that does not need the network
    fn validate(&self, request: &CrawlRequest) -> Result<(), ValidationError>;

    /// Produces the references to fetch and how to persist them
    async fn resolve(
        &self,
        request: &CrawlRequest,
        env: &mut ResolveEnv<'_>,
    ) -> Result<BatchPlan, HarvesterError>;
}

/// Picks the resolver for a source
pub fn resolver_for(source: &CrawlSource) -> Box<dyn SourceResolver> {
    match source {
        CrawlSource::Urls(references) => Box::new(ByUrls {
            references: references.clone(),
        }),
        CrawlSource::User {
            target,
            scroll_limit,
        } => Box::new(ByUser {
            target: target.clone(),
            scroll_limit: *scroll_limit,
        }),
        CrawlSource::Search(params) => Box::new(BySearch {
            params: params.clone(),
        }),
    }
}

/// Checks that a report name exists whenever a report is written
fn require_report_name(save_mode: SaveMode, name: Option<&str>) -> Result<(), ValidationError> {
    if save_mode.wants_report() && name.map_or(true, |n| n.trim().is_empty()) {
        return Err(ValidationError::MissingReportName);
    }
    Ok(())
}

/// Drops repeated references, keeping the first occurrence
fn dedupe(references: impl IntoIterator<Item = NoteRef>) -> Vec<NoteRef> {
    let mut seen = HashSet::new();
    references
        .into_iter()
        .filter(|reference| seen.insert(reference.clone()))
        .collect()
}

/// An explicit list of references, fetched in the given order
#[derive(Debug, Clone)]
pub struct ByUrls {
    pub references: Vec<NoteRef>,
}

#[async_trait]
impl SourceResolver for ByUrls {
    fn validate(&self, request: &CrawlRequest) -> Result<(), ValidationError> {
        if self.references.is_empty() {
            return Err(ValidationError::EmptyReferences);
        }
        require_report_name(request.save_mode, request.explicit_report_name())
    }

    async fn resolve(
        &self,
        request: &CrawlRequest,
        env: &mut ResolveEnv<'_>,
    ) -> Result<BatchPlan, HarvesterError> {
        let references = dedupe(self.references.iter().cloned());
        if references.len() < self.references.len() {
            tracing::debug!(
                "Dropped {} repeated references",
                self.references.len() - references.len()
            );
        }

        Ok(BatchPlan {
            references,
            cap: env.cap,
            save_mode: request.save_mode,
            report_name: request.explicit_report_name().map(str::to_string),
        })
    }
}

/// Every note on a user's timeline
#[derive(Debug, Clone)]
pub struct ByUser {
    pub target: String,
    pub scroll_limit: Option<u32>,
}

impl ByUser {
    fn report_name(&self, request: &CrawlRequest) -> String {
        request
            .explicit_report_name()
            .map(str::to_string)
            .unwrap_or_else(|| report_name_from_target(&self.target))
    }
}

#[async_trait]
impl SourceResolver for ByUser {
    fn validate(&self, request: &CrawlRequest) -> Result<(), ValidationError> {
        if self.target.trim().is_empty() {
            return Err(ValidationError::EmptyTarget);
        }
        require_report_name(request.save_mode, Some(&self.report_name(request)))
    }

    async fn resolve(
        &self,
        request: &CrawlRequest,
        env: &mut ResolveEnv<'_>,
    ) -> Result<BatchPlan, HarvesterError> {
        let save_mode = if env.skip_video {
            request.save_mode.images_only()
        } else {
            request.save_mode
        };

        env.worker.pace().await;
        let references = env
            .harvester
            .harvest(self.target.trim(), self.scroll_limit, env.cap, env.sink)
            .await?;
        env.sink.emit(format!("found {} notes", references.len()));

        Ok(BatchPlan {
            references,
            cap: env.cap,
            save_mode,
            report_name: Some(self.report_name(request)),
        })
    }
}

/// The results of a keyword search
#[derive(Debug, Clone)]
pub struct BySearch {
    pub params: SearchParams,
}

impl BySearch {
    fn report_name(&self, request: &CrawlRequest) -> String {
        request
            .explicit_report_name()
            .unwrap_or_else(|| self.params.query.trim())
            .to_string()
    }

    /// Converts one search item into a reference, if it is a note
    fn item_reference(web_base: &Url, item: &Value) -> Option<NoteRef> {
        if item.get("model_type").and_then(Value::as_str) != Some(NOTE_MODEL_TYPE) {
            return None;
        }
        let id = item.get("id").and_then(Value::as_str)?;
        let token = item
            .get("xsec_token")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match NoteRef::from_parts(web_base, id, token) {
            Ok(reference) => Some(reference),
            Err(e) => {
                tracing::warn!("Skipping search result {}: {}", id, e);
                None
            }
        }
    }
}

#[async_trait]
impl SourceResolver for BySearch {
    fn validate(&self, request: &CrawlRequest) -> Result<(), ValidationError> {
        if self.params.query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if self.params.count == 0 {
            return Err(ValidationError::InvalidCount);
        }
        if self.params.distance.requires_geo() && self.params.geo.is_none() {
            return Err(ValidationError::MissingGeo {
                distance: self.params.distance.to_string(),
            });
        }
        require_report_name(request.save_mode, Some(&self.report_name(request)))
    }

    async fn resolve(
        &self,
        request: &CrawlRequest,
        env: &mut ResolveEnv<'_>,
    ) -> Result<BatchPlan, HarvesterError> {
        let mut params = self.params.clone();
        params.query = params.query.trim().to_string();
        params.count = self.params.effective_count(env.cap);

        env.worker.pace().await;
        let reply = env.worker.api().search_notes(&params).await?;
        if !reply.success {
            return Err(HarvesterError::Search {
                message: reply.message,
            });
        }

        let references = dedupe(
            reply
                .items
                .iter()
                .filter_map(|item| Self::item_reference(env.web_base, item)),
        );
        tracing::info!(
            "Search '{}' returned {} items, {} notes",
            params.query,
            reply.items.len(),
            references.len()
        );
        env.sink.emit(format!("found {} notes", references.len()));

        Ok(BatchPlan {
            references,
            cap: env.cap,
            save_mode: request.save_mode,
            report_name: Some(self.report_name(request)),
        })
    }
}
