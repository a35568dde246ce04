//! Centralized balance and tuning constants for the removal simulation.
//!
//! Everything a scenario may want to vary lives on [`crate::SimConfig`];
//! the values here are the structural rules of the model that every
//! configuration shares.

// Stability ------------------------------------------------------------------
pub const STABILITY_CEILING: f64 = 100.0;
pub(crate) const STABILITY_DISPLAY_PLACES: i32 = 5;

// Willpower ------------------------------------------------------------------
pub(crate) const WILLPOWER_DICE_COUNT: u32 = 2;
pub(crate) const WILLPOWER_DICE_SIDES: u32 = 6;

// Removal --------------------------------------------------------------------
/// Flat adjustment applied to a retry roll after insurance absorbed a failure.
pub(crate) const RETRY_ROLL_ADJUSTMENT: i64 = 5;
pub(crate) const PILL_OVERFLOW_PENALTY: i64 = 1;

// Alchemy --------------------------------------------------------------------
pub(crate) const ALCHEMY_MINOR_AFTER: u32 = 3;
pub(crate) const ALCHEMY_MAJOR_AFTER: u32 = 5;
pub(crate) const ALCHEMY_COOLDOWN_SIDES: u32 = 3;
pub(crate) const ALCHEMY_MINOR_COOLDOWN_BONUS: i64 = 1;

// Batch ----------------------------------------------------------------------
pub const DEFAULT_MAX_DAYS: u32 = 200;
pub const DEFAULT_TRIALS: usize = 1_000;

// Reporting ------------------------------------------------------------------
pub(crate) const HISTOGRAM_BAR_WIDTH: usize = 40;
pub(crate) const PERCENT_PLACES: i32 = 2;

// Seeding --------------------------------------------------------------------
pub(crate) const TRIAL_SEED_DOMAIN: &[u8] = b"cultsim-trial";
