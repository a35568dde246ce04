//! Cultsim Simulation Engine
//!
//! Monte Carlo model of a brand-attachment removal regimen: each trial
//! advances day by day through stability upkeep, brand growth, willpower
//! checks and scheduled removal attempts until every attachment is gone,
//! stability collapses, or the day cap is reached. Batches of seeded trials
//! are aggregated into distributions and text histograms.
//!
//! The crate has no I/O; the `cultsim` binary wraps it.

pub mod batch;
pub mod config;
pub mod constants;
pub mod dice;
pub mod numbers;
pub mod report;
pub mod result;
pub mod scenarios;
pub mod seed;
pub mod stats;
pub mod trial;

// Re-export commonly used types
pub use batch::{BatchOptions, run_batch, run_trial};
pub use config::{AlchemyMode, ConfigError, SimConfig, WillpowerPillPolicy, parse_assignment};
pub use dice::{
    DiceRoll, Formula, FormulaKind, FormulaParseError, PercentChance, make_bernoulli,
    make_dice_roll,
};
pub use report::{BatchReport, EndingCounts, ReportSection};
pub use result::{Ending, OutcomeRecord};
pub use scenarios::{Scenario, list_scenarios};
pub use seed::{TrialRng, derive_trial_seed, entropy_seed, trial_rng};
pub use stats::{
    Distribution, HistogramRow, OutcomeField, Summary, build_distribution, percentile,
    render_histogram, summarize,
};
pub use trial::{DayAdjust, EventCounters, NoAdjust, RemovalKind, Trial, TrialState};
