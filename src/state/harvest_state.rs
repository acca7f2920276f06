use super::HarvestPhase;
use crate::reference::NoteRef;
use std::collections::{BTreeSet, HashSet};

/// Tracks the progress of one harvest call
///
/// Created when a harvest starts and consumed by [`HarvestState::into_sorted`]
/// when it returns. The discovered set only ever grows.
#[derive(Debug, Clone)]
pub struct HarvestState {
    /// Raw anchor addresses already handled, resolved or not
    seen_anchors: HashSet<String>,

    /// Canonical, token-bearing references discovered so far
    discovered: BTreeSet<NoteRef>,

    /// Size signal observed after the previous scroll
    last_size: Option<u64>,

    /// Consecutive scrolls that left the size signal unchanged
    unchanged_rounds: u32,

    /// Completed scroll iterations
    iterations: u32,

    phase: HarvestPhase,
}

impl HarvestState {
    /// Creates a new state in the `Scrolling` phase
    pub fn new() -> Self {
        Self {
            seen_anchors: HashSet::new(),
            discovered: BTreeSet::new(),
            last_size: None,
            unchanged_rounds: 0,
            iterations: 0,
            phase: HarvestPhase::Scrolling,
        }
    }

    /// Records the size signal read before the first scroll
    pub fn set_baseline(&mut self, size: u64) {
        self.last_size = Some(size);
    }

    /// Marks an anchor as handled
    ///
    /// # Returns
    ///
    /// * `true` - If the anchor had not been seen before and must be resolved
    /// * `false` - If it was already handled
    pub fn mark_anchor(&mut self, anchor: &str) -> bool {
        if self.seen_anchors.contains(anchor) {
            return false;
        }
        self.seen_anchors.insert(anchor.to_string());
        true
    }

    /// Adds a resolved reference; returns false if it was already known
    pub fn record_discovery(&mut self, reference: NoteRef) -> bool {
        self.discovered.insert(reference)
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    /// Returns true if a positive cap is set and the discovered count reached it
    pub fn reached_cap(&self, cap: Option<usize>) -> bool {
        matches!(cap, Some(cap) if cap > 0 && self.discovered.len() >= cap)
    }

    /// Records the size signal read after a scroll
    ///
    /// # Returns
    ///
    /// The number of consecutive unchanged observations, zero if the size moved
    pub fn observe_size(&mut self, size: u64) -> u32 {
        if self.last_size == Some(size) {
            self.unchanged_rounds += 1;
        } else {
            self.unchanged_rounds = 0;
        }
        self.last_size = Some(size);
        self.unchanged_rounds
    }

    pub fn unchanged_rounds(&self) -> u32 {
        self.unchanged_rounds
    }

    /// Counts one finished scroll iteration and returns the new total
    pub fn complete_iteration(&mut self) -> u32 {
        self.iterations += 1;
        self.iterations
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn phase(&self) -> HarvestPhase {
        self.phase
    }

    /// Moves to a new phase; a terminal phase never goes back to `Scrolling`
    pub fn transition(&mut self, next: HarvestPhase) {
        if self.phase.is_terminal() && next == HarvestPhase::Scrolling {
            return;
        }
        self.phase = next;
    }

    /// Consumes the state and returns the discovered references in sorted order
    pub fn into_sorted(self) -> Vec<NoteRef> {
        self.discovered.into_iter().collect()
    }
}

impl Default for HarvestState {
    fn default() -> Self {
        Self::new()
    }
}
