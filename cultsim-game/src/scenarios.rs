//! Named scenario presets: a one-time config overlay plus a daily hook.
use serde::{Deserialize, Serialize};

use crate::config::{AlchemyMode, SimConfig};
use crate::dice::{Formula, make_bernoulli, make_dice_roll};
use crate::trial::{DayAdjust, TrialState};

const SWITCHED_FLAG: &str = "rp-first-switched";
const NOPILL_START_POWER: i64 = 337;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    PillCooldown4,
    PillCooldown5,
    Cooldown4Day,
    Cooldown4DayBadPill,
    Cooldown6Day,
    NopillRp,
    Nopill,
    RpFirst,
    Odds,
    MinorAlchemy,
    MajorAlchemy,
}

impl Scenario {
    pub const ALL: [Self; 11] = [
        Self::PillCooldown4,
        Self::PillCooldown5,
        Self::Cooldown4Day,
        Self::Cooldown4DayBadPill,
        Self::Cooldown6Day,
        Self::NopillRp,
        Self::Nopill,
        Self::RpFirst,
        Self::Odds,
        Self::MinorAlchemy,
        Self::MajorAlchemy,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PillCooldown4 => "pill-cooldown-4",
            Self::PillCooldown5 => "pill-cooldown-5",
            Self::Cooldown4Day => "cooldown-4day",
            Self::Cooldown4DayBadPill => "cooldown-4day-badpill",
            Self::Cooldown6Day => "cooldown-6day",
            Self::NopillRp => "nopill-rp",
            Self::Nopill => "nopill",
            Self::RpFirst => "rp-first",
            Self::Odds => "odds",
            Self::MinorAlchemy => "minor-alchemy",
            Self::MajorAlchemy => "major-alchemy",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::PillCooldown4 => "Removal pills every 4 days",
            Self::PillCooldown5 => "Removal pills every 5 days",
            Self::Cooldown4Day => "Pills every 4 days, always with a pill",
            Self::Cooldown4DayBadPill => "Pills every 4 days with a 50% overflow chance",
            Self::Cooldown6Day => "Pills every 6 days from 337 power, no overflow",
            Self::NopillRp => "Roleplayed removal every 2 days, no overflow",
            Self::Nopill => "Weaker roleplayed removal every 2 days from 337 power",
            Self::RpFirst => "Roleplay until 8 attachments remain, then bad pills every 4 days",
            Self::Odds => "Pills every 5 days, every 4 once 7 attachments remain",
            Self::MinorAlchemy => "Alchemy with minor damage and 1d3+1 day pill cooldowns",
            Self::MajorAlchemy => "Alchemy with major damage and 1d3 day pill cooldowns",
        }
    }

    #[must_use]
    pub fn find(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(name))
    }

    /// Apply the scenario's one-time changes to a base configuration.
    ///
    /// `cooldown-6day` and `nopill` start the trial at 337 power rather than
    /// holding it there every day, so power drifts from day one and the
    /// first attachment threshold is 340 instead of 360.
    pub fn prepare(self, config: &mut SimConfig) {
        match self {
            Self::Cooldown6Day | Self::Nopill => config.initial_power = NOPILL_START_POWER,
            Self::MinorAlchemy => {
                config.alchemy = AlchemyMode::Minor;
                config.pill_overflow = Formula::Constant(0);
            }
            Self::MajorAlchemy => {
                config.alchemy = AlchemyMode::Major;
                config.pill_overflow = Formula::Constant(0);
            }
            _ => {}
        }
    }

    /// Copy of `base` with [`Scenario::prepare`] applied.
    #[must_use]
    pub fn prepared(self, base: &SimConfig) -> SimConfig {
        let mut config = base.clone();
        self.prepare(&mut config);
        config
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl DayAdjust for Scenario {
    fn adjust(&self, state: &mut TrialState) {
        match self {
            Self::PillCooldown4 => state.config.pill_cooldown = 4,
            Self::PillCooldown5 => state.config.pill_cooldown = 5,
            Self::Cooldown4Day => pills_every_four(state),
            Self::Cooldown4DayBadPill => bad_pills_every_four(state),
            Self::Cooldown6Day => {
                state.config.pill_cooldown = 6;
                state.config.pill_overflow = Formula::Constant(0);
            }
            Self::NopillRp => roleplay_every_two(state),
            Self::Nopill => {
                roleplay_every_two(state);
                state.config.removal_attempt_nopill_rp = make_dice_roll(2, 6, 24);
            }
            Self::RpFirst => {
                if state.day == 1 {
                    roleplay_every_two(state);
                }
                if state.attachments == 8 && !state.has_flag(SWITCHED_FLAG) {
                    bad_pills_every_four(state);
                    state.set_flag(SWITCHED_FLAG);
                    state.narrate("Switching to pills every 4 days");
                }
            }
            Self::Odds => {
                if state.day == 1 {
                    state.config.pill_cooldown = 5;
                    state.config.remove_nopill_rp = false;
                    state.config.pill_overflow = Formula::Constant(0);
                } else if state.attachments == 7 {
                    state.config.pill_cooldown = 4;
                }
            }
            Self::MinorAlchemy | Self::MajorAlchemy => {}
        }
    }
}

fn pills_every_four(state: &mut TrialState) {
    state.config.pill_cooldown = 4;
    state.config.remove_nopill_rp = false;
}

fn bad_pills_every_four(state: &mut TrialState) {
    pills_every_four(state);
    state.config.pill_overflow = make_bernoulli(50.0);
}

fn roleplay_every_two(state: &mut TrialState) {
    state.config.pill_cooldown = 2;
    state.config.remove_nopill_rp = true;
    state.config.pill_overflow = Formula::Constant(0);
}

/// `(name, description)` of every preset, in listing order.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    Scenario::ALL
        .iter()
        .map(|scenario| (scenario.name(), scenario.description()))
        .collect()
}
