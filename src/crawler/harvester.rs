//! Timeline harvesting
//!
//! Discovers every note reachable from an infinitely scrolling page. Visible
//! anchors do not carry the access token a later fetch needs, so each new
//! anchor is opened in a secondary context and its resolved address read
//! back.

use crate::browser::{with_secondary_context, BrowserError, BrowsingSession, SessionFactory};
use crate::config::Config;
use crate::crawler::ProgressSink;
use crate::reference::{is_note_address, NoteRef};
use crate::state::{HarvestPhase, HarvestState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a harvest produced nothing
///
/// A harvest is all-or-nothing: references discovered before the failure
/// are dropped.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("could not open a browsing session: {0}")]
    Session(#[source] BrowserError),

    #[error("could not open {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("browser failed mid-harvest: {0}")]
    Browser(#[source] BrowserError),
}

/// Harvest tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestSettings {
    /// CSS selector matching note anchors
    pub anchor_selector: String,

    /// Pause after each scroll, before probing the size signal
    pub scroll_pause: Duration,

    /// Pause inside a secondary context before reading its address
    pub resolve_pause: Duration,

    /// Consecutive unchanged size observations that end the harvest
    pub stable_rounds: u32,

    /// Cookie string injected after the first navigation; empty skips it
    pub cookies: String,
}

impl HarvestSettings {
    pub fn from_config(config: &Config) -> Self {
        let pause = Duration::from_millis(config.harvest.scroll_pause_ms);
        Self {
            anchor_selector: config.harvest.anchor_selector.clone(),
            scroll_pause: pause,
            resolve_pause: pause,
            stable_rounds: config.harvest.stable_rounds.max(1),
            cookies: config.auth.cookies.clone(),
        }
    }
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Harvests note references from a user timeline
#[derive(Clone)]
pub struct LinkHarvester {
    factory: Arc<dyn SessionFactory>,
    settings: HarvestSettings,
}

impl LinkHarvester {
    pub fn new(factory: Arc<dyn SessionFactory>, settings: HarvestSettings) -> Self {
        Self { factory, settings }
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    /// Harvests all note references reachable from `target`
    ///
    /// # Arguments
    ///
    /// * `target` - The page to scroll
    /// * `scroll_limit` - Maximum scroll iterations; `None` or 0 is unbounded
    /// * `cap` - Stop once this many references are discovered; `None` or 0 is unbounded
    /// * `sink` - Receives one line per scroll iteration
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<NoteRef>)` - Deduplicated references in sorted order
    /// * `Err(HarvestError)` - The session could not be opened or the page failed
    ///
    /// The session is always shut down before returning.
    pub async fn harvest(
        &self,
        target: &str,
        scroll_limit: Option<u32>,
        cap: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<NoteRef>, HarvestError> {
        let mut session = self.factory.open().await.map_err(HarvestError::Session)?;

        let result = self
            .scroll_and_collect(session.as_mut(), target, scroll_limit, cap, sink)
            .await;

        if let Err(e) = session.quit().await {
            tracing::warn!("Failed to shut down browsing session: {}", e);
        }

        Ok(result?.into_sorted())
    }

    async fn scroll_and_collect(
        &self,
        session: &mut dyn BrowsingSession,
        target: &str,
        scroll_limit: Option<u32>,
        cap: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> Result<HarvestState, HarvestError> {
        let navigation_error = |e: BrowserError| HarvestError::Navigation {
            url: target.to_string(),
            message: e.to_string(),
        };

        session.navigate(target).await.map_err(navigation_error)?;
        if !self.settings.cookies.trim().is_empty() {
            session
                .inject_auth(&self.settings.cookies)
                .await
                .map_err(navigation_error)?;
        }

        let mut state = HarvestState::new();
        state.set_baseline(
            session
                .read_size_signal()
                .await
                .map_err(HarvestError::Browser)?,
        );
        let budget = scroll_limit.filter(|limit| *limit > 0);

        while !state.phase().is_stop() {
            tokio::time::sleep(self.settings.scroll_pause).await;

            let anchors = session
                .query_anchors(&self.settings.anchor_selector)
                .await
                .map_err(HarvestError::Browser)?;
            self.resolve_new_anchors(session, &anchors, &mut state, cap)
                .await;

            if state.reached_cap(cap) {
                state.transition(HarvestPhase::Capped);
                break;
            }

            session
                .scroll_to_bottom()
                .await
                .map_err(HarvestError::Browser)?;
            tokio::time::sleep(self.settings.scroll_pause).await;
            let size = session
                .read_size_signal()
                .await
                .map_err(HarvestError::Browser)?;
            let unchanged = state.observe_size(size);
            let iteration = state.complete_iteration();

            tracing::info!(
                "Scroll {}: {} notes found (size {}, unchanged {})",
                iteration,
                state.discovered_count(),
                size,
                unchanged
            );
            sink.emit(format!(
                "scroll {}: {} notes found",
                iteration,
                state.discovered_count()
            ));

            if unchanged >= self.settings.stable_rounds {
                state.transition(HarvestPhase::Stable);
            } else if matches!(budget, Some(limit) if iteration >= limit) {
                state.transition(HarvestPhase::BudgetExhausted);
            }
        }

        tracing::info!(
            "Harvest of {} stopped after {} scrolls ({}), {} notes",
            target,
            state.iterations(),
            state.phase(),
            state.discovered_count()
        );
        state.transition(HarvestPhase::Done);
        Ok(state)
    }

    /// Resolves anchors not seen before into canonical references
    ///
    /// A failed resolution only loses that anchor.
    async fn resolve_new_anchors(
        &self,
        session: &mut dyn BrowsingSession,
        anchors: &[String],
        state: &mut HarvestState,
        cap: Option<usize>,
    ) {
        for anchor in anchors {
            if state.reached_cap(cap) {
                return;
            }
            if !state.mark_anchor(anchor) {
                continue;
            }

            let address =
                match with_secondary_context(session, anchor, self.settings.resolve_pause).await {
                    Ok(address) => address,
                    Err(e) => {
                        tracing::warn!("Failed to resolve {}: {}", anchor, e);
                        continue;
                    }
                };

            if !is_note_address(&address) {
                tracing::debug!("{} resolved to non-note address {}", anchor, address);
                continue;
            }

            match NoteRef::parse(&address) {
                Ok(reference) => {
                    if state.record_discovery(reference) {
                        tracing::debug!("Discovered {}", address);
                    }
                }
                Err(e) => tracing::warn!("Resolved address {} is unusable: {}", address, e),
            }
        }
    }
}
