//! Batch driver: many independent trials under one configuration.
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SimConfig};
use crate::constants::DEFAULT_MAX_DAYS;
use crate::result::OutcomeRecord;
use crate::seed::{TrialRng, trial_rng};
use crate::trial::{DayAdjust, Trial};

/// Knobs of a batch run that are not part of the simulated model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub max_days: u32,
    /// Batch seed; trial `i` draws from a stream derived from it.
    pub seed: u64,
    /// Keep each trial's narration in its record.
    pub keep_logs: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_days: DEFAULT_MAX_DAYS,
            seed: 0,
            keep_logs: false,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_max_days(mut self, max_days: u32) -> Self {
        self.max_days = max_days;
        self
    }

    #[must_use]
    pub const fn with_logs(mut self, keep_logs: bool) -> Self {
        self.keep_logs = keep_logs;
        self
    }
}

/// Run `trials` independent trials and return their records in index order.
///
/// The hook runs at the start of every day of every trial. With the
/// `parallel` feature trials run on the rayon pool; results are identical
/// either way because each trial owns a seed-derived stream.
///
/// # Errors
///
/// Returns the configuration's first validation failure before any trial runs.
pub fn run_batch<H>(
    trials: usize,
    config: &SimConfig,
    hook: &H,
    options: BatchOptions,
) -> Result<Vec<OutcomeRecord>, ConfigError>
where
    H: DayAdjust + ?Sized,
{
    config.validate()?;
    log::debug!(
        "running {trials} trials (seed {}, max {} days)",
        options.seed,
        options.max_days
    );

    #[cfg(feature = "parallel")]
    let records = {
        use rayon::prelude::*;
        (0..trials)
            .into_par_iter()
            .map(|index| run_indexed(index, config, hook, options))
            .collect::<Vec<_>>()
    };
    #[cfg(not(feature = "parallel"))]
    let records = (0..trials)
        .map(|index| run_indexed(index, config, hook, options))
        .collect::<Vec<_>>();

    let cleared = records.iter().filter(|record| record.success).count();
    log::debug!("batch finished: {cleared}/{trials} cleared");
    Ok(records)
}

/// Run trial `index` of a batch on its own, reproducing the record the
/// batch would have produced for it.
///
/// # Errors
///
/// Returns the configuration's first validation failure.
pub fn run_trial<H>(
    index: usize,
    config: &SimConfig,
    hook: &H,
    options: BatchOptions,
) -> Result<OutcomeRecord, ConfigError>
where
    H: DayAdjust + ?Sized,
{
    config.validate()?;
    Ok(run_indexed(index, config, hook, options))
}

fn run_indexed<H>(
    index: usize,
    config: &SimConfig,
    hook: &H,
    options: BatchOptions,
) -> OutcomeRecord
where
    H: DayAdjust + ?Sized,
{
    let rng: TrialRng = trial_rng(options.seed, u64::try_from(index).unwrap_or(u64::MAX));
    let record = Trial::from_validated(config.clone(), rng).run(hook, options.max_days);
    if options.keep_logs {
        record
    } else {
        record.without_log()
    }
}
