//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `HarvestPhase`: where a harvest is in its lifecycle (scrolling, stopped, done)
//! - `HarvestState`: the seen anchors, discovered references and stop-condition counters of one harvest

mod harvest_phase;
mod harvest_state;

// Re-export main types
pub use harvest_phase::HarvestPhase;
pub use harvest_state::HarvestState;
