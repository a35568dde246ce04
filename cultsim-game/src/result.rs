//! Per-trial outcome records
use serde::{Deserialize, Serialize};

use crate::constants::STABILITY_DISPLAY_PLACES;
use crate::numbers::round_to_places;
use crate::trial::TrialState;

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    /// Every attachment was removed
    Cleared,
    /// Stability dropped below the configured cutoff
    Destabilized,
    /// The day cap was reached first
    DayCap,
}

impl Ending {
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Cleared)
    }
}

impl std::fmt::Display for Ending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ending::Cleared => write!(f, "cleared"),
            Ending::Destabilized => write!(f, "destabilized"),
            Ending::DayCap => write!(f, "day_cap"),
        }
    }
}

/// Immutable summary of one finished trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub success: bool,
    pub ending: Ending,
    pub attachments: u32,
    pub day: u32,
    /// Final stability rounded to five decimal places.
    pub stability: f64,
    pub power: i64,
    pub n_successes: u32,
    pub n_failures: u32,
    pub insured_retries: u32,
    pub willpower_pills_left: u32,
    pub insurance_left: u32,
    /// Narration lines in the order they happened.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl OutcomeRecord {
    #[must_use]
    pub fn from_state(state: TrialState, ending: Ending) -> Self {
        Self {
            success: ending.is_success(),
            ending,
            attachments: state.attachments,
            day: state.day,
            stability: round_to_places(state.stability, STABILITY_DISPLAY_PLACES),
            power: state.power,
            n_successes: state.removal_successes,
            n_failures: state.removal_failures,
            insured_retries: state.insured_retries,
            willpower_pills_left: state.willpower_pills_left,
            insurance_left: state.insurance_left,
            log: state.log,
        }
    }

    /// Drop the narration log, keeping only the numbers.
    #[must_use]
    pub fn without_log(mut self) -> Self {
        self.log = Vec::new();
        self
    }
}
