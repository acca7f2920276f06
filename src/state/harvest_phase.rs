/// Harvest phase definitions for tracking link discovery
///
/// A harvest starts in `Scrolling`, leaves it through one of the stop
/// conditions, and ends in `Done` once the browsing session is released.
use std::fmt;

/// Represents the current phase of a harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarvestPhase {
    // ===== Active States =====
    /// Anchors are being collected and the page is being scrolled
    Scrolling,

    // ===== Stop States =====
    /// The page size stopped changing for the configured number of rounds
    Stable,

    /// The discovered count reached the record cap
    Capped,

    /// The scroll budget was used up
    BudgetExhausted,

    // ===== Final State =====
    /// The session has been released and the result handed back
    Done,
}

impl HarvestPhase {
    /// Returns true if no further iteration will run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scrolling)
    }

    /// Returns true if this phase is one of the stop conditions
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stable | Self::Capped | Self::BudgetExhausted)
    }

    /// Converts the phase to the label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrolling => "scrolling",
            Self::Stable => "content exhausted",
            Self::Capped => "cap reached",
            Self::BudgetExhausted => "budget exhausted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for HarvestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
