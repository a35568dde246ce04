//! Simulation configuration and its validation rules.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::STABILITY_CEILING;
use crate::dice::{Formula, FormulaKind, make_bernoulli, make_dice_roll};

/// When a willpower pill is spent on the willpower check embedded in a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WillpowerPillPolicy {
    /// Spend pills once the remaining attachments no longer outnumber them.
    #[default]
    Last,
    /// Spend pills after any failed willpower roll, or when saving them no longer matters.
    AfterFail,
    /// Spend pills on every removal while they last.
    First,
}

impl WillpowerPillPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::AfterFail => "after_fail",
            Self::First => "first",
        }
    }
}

impl fmt::Display for WillpowerPillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WillpowerPillPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "last" => Ok(Self::Last),
            "after_fail" | "after-fail" => Ok(Self::AfterFail),
            "first" => Ok(Self::First),
            _ => Err(()),
        }
    }
}

/// Incidental stability damage from alchemical pill preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlchemyMode {
    #[default]
    Off,
    /// Minor damage tier only; pill cooldown re-drawn as 1d3+1.
    Minor,
    /// Major tier after prolonged use; pill cooldown re-drawn as 1d3.
    Major,
}

impl AlchemyMode {
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Off)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }
}

impl fmt::Display for AlchemyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    BelowMinimum {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{field} needs a {expected} formula (got {found} `{formula}`)")]
    FormulaKind {
        field: &'static str,
        expected: &'static str,
        found: FormulaKind,
        formula: String,
    },
    #[error("{field} dice need at least one side (got `{formula}`)")]
    ZeroSidedDice {
        field: &'static str,
        formula: String,
    },
    #[error("{field} chance must be between 0 and 100 percent (got {value})")]
    ChanceRange { field: &'static str, value: f64 },
    #[error("{field} must be finite (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} must not exceed {max} (got {value})")]
    AboveCeiling {
        field: &'static str,
        max: f64,
        value: f64,
    },
    #[error("unknown configuration field `{0}`")]
    UnknownField(String),
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidOverride {
        key: String,
        value: String,
        reason: String,
    },
    #[error("override `{0}` is not of the form key=value")]
    MalformedAssignment(String),
    #[error("malformed configuration: {0}")]
    Malformed(String),
}

/// Every tunable of a simulation run. Unknown keys are rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub initial_attachments: u32,
    pub initial_power: i64,
    pub initial_stability: f64,

    pub potion_cooldown: u32,
    pub pill_cooldown: u32,
    pub growth_cooldown: u32,
    pub pill_overflow: Formula,

    pub growth_power: Formula,
    pub success_drain: Formula,
    pub success_stability_damage: Formula,
    pub failure_stability_damage: Formula,

    pub stability_cultivation: Formula,
    pub cultivation_scale: f64,
    pub stability_potion_gain: Formula,
    pub stability_cutoff: f64,

    pub removal_attempt: Formula,
    pub remove_during_withdrawal: bool,
    pub removal_attempt_withdrawal: Formula,
    pub remove_nopill_rp: bool,
    pub removal_attempt_nopill_rp: Formula,

    pub alchemy: AlchemyMode,
    pub alchemy_minor_damage: Formula,
    pub alchemy_major_damage: Formula,

    pub willpower_modifier: i64,
    pub willpower_target: i64,
    pub willpower_fatigue_cap: i64,
    pub willpower_fail_penalty: Formula,
    pub willpower_drift_interval: u32,
    pub removal_fail_penalty: i64,

    pub failure_insurance: u32,
    pub insured_stability_damage: Formula,

    pub willpower_pill_policy: WillpowerPillPolicy,
    pub willpower_pills: u32,
    pub willpower_pill_bonus: i64,

    pub dc_base: i64,
    pub dc_power_offset: i64,
    pub dc_power_step: i64,
    pub attachment_power_step: i64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_attachments: 9,
            initial_power: 342,
            initial_stability: 88.35,

            potion_cooldown: 7,
            pill_cooldown: 3,
            growth_cooldown: 3,
            pill_overflow: make_bernoulli(5.0),

            growth_power: make_dice_roll(1, 6, 0),
            success_drain: make_dice_roll(1, 6, 0),
            success_stability_damage: make_dice_roll(1, 4, 0),
            failure_stability_damage: make_dice_roll(3, 6, 0),

            stability_cultivation: make_dice_roll(2, 6, 26),
            cultivation_scale: 0.01,
            stability_potion_gain: Formula::Constant(3),
            stability_cutoff: 40.0,

            removal_attempt: make_dice_roll(2, 6, 28),
            remove_during_withdrawal: false,
            removal_attempt_withdrawal: make_dice_roll(2, 6, 23),
            remove_nopill_rp: false,
            removal_attempt_nopill_rp: make_dice_roll(2, 6, 29),

            alchemy: AlchemyMode::Off,
            alchemy_minor_damage: make_dice_roll(1, 6, 0),
            alchemy_major_damage: make_dice_roll(2, 6, 0),

            willpower_modifier: 13,
            willpower_target: 16,
            willpower_fatigue_cap: 30,
            willpower_fail_penalty: make_dice_roll(1, 6, 0),
            willpower_drift_interval: 14,
            removal_fail_penalty: 5,

            failure_insurance: 0,
            insured_stability_damage: make_dice_roll(1, 6, 0),

            willpower_pill_policy: WillpowerPillPolicy::Last,
            willpower_pills: 0,
            willpower_pill_bonus: 2,

            dc_base: 25,
            dc_power_offset: 200,
            dc_power_step: 20,
            attachment_power_step: 20,
        }
    }
}

impl SimConfig {
    /// Parse a JSON document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, names an unknown key, or
    /// the resulting configuration fails validation.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Malformed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `key=value` overrides by field name and validate the result.
    ///
    /// Formula fields take dice notation (`2d6+30`, `50%`, `0`), enum fields
    /// their snake_case names, everything else a JSON literal.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownField`] for keys that are not
    /// configuration fields, [`ConfigError::InvalidOverride`] for values that
    /// do not fit the field, or any validation error of the final config.
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut document =
            serde_json::to_value(self).map_err(|err| ConfigError::Malformed(err.to_string()))?;

        for (key, raw) in overrides {
            let key = key.trim();
            let raw = raw.trim();
            let Some(fields) = document.as_object_mut() else {
                return Err(ConfigError::Malformed(String::from("expected an object")));
            };
            let Some(slot) = fields.get_mut(key) else {
                return Err(ConfigError::UnknownField(key.to_string()));
            };
            let invalid = |reason: String| ConfigError::InvalidOverride {
                key: key.to_string(),
                value: raw.to_string(),
                reason,
            };
            *slot = if slot.is_string() {
                Value::String(raw.to_string())
            } else {
                serde_json::from_str(raw).map_err(|err| invalid(err.to_string()))?
            };
            serde_json::from_value::<Self>(document.clone())
                .map_err(|err| invalid(err.to_string()))?;
        }

        let updated: Self = serde_json::from_value(document)
            .map_err(|err| ConfigError::Malformed(err.to_string()))?;
        updated.validate()?;
        Ok(updated)
    }

    /// Check every field for values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("potion_cooldown", self.potion_cooldown),
            ("pill_cooldown", self.pill_cooldown),
            ("growth_cooldown", self.growth_cooldown),
            ("willpower_drift_interval", self.willpower_drift_interval),
        ] {
            require_at_least(field, i64::from(value), 1)?;
        }
        require_at_least("dc_power_step", self.dc_power_step, 1)?;
        require_at_least("attachment_power_step", self.attachment_power_step, 1)?;

        for (field, value) in [
            ("initial_stability", self.initial_stability),
            ("stability_cutoff", self.stability_cutoff),
            ("cultivation_scale", self.cultivation_scale),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
        }
        if self.initial_stability > STABILITY_CEILING {
            return Err(ConfigError::AboveCeiling {
                field: "initial_stability",
                max: STABILITY_CEILING,
                value: self.initial_stability,
            });
        }

        for (field, formula) in self.amount_formulas() {
            validate_amount(field, formula)?;
        }
        validate_chance("pill_overflow", &self.pill_overflow)?;

        // Each failed willpower roll must add fatigue or the check never ends.
        let least_fatigue = match &self.willpower_fail_penalty {
            Formula::Dice(dice) => dice.min(),
            Formula::Constant(value) => *value,
            Formula::Bernoulli(_) => 0,
        };
        require_at_least("willpower_fail_penalty", least_fatigue, 1)?;
        Ok(())
    }

    fn amount_formulas(&self) -> [(&'static str, &Formula); 13] {
        [
            ("growth_power", &self.growth_power),
            ("success_drain", &self.success_drain),
            ("success_stability_damage", &self.success_stability_damage),
            ("failure_stability_damage", &self.failure_stability_damage),
            ("stability_cultivation", &self.stability_cultivation),
            ("stability_potion_gain", &self.stability_potion_gain),
            ("removal_attempt", &self.removal_attempt),
            ("removal_attempt_withdrawal", &self.removal_attempt_withdrawal),
            ("removal_attempt_nopill_rp", &self.removal_attempt_nopill_rp),
            ("alchemy_minor_damage", &self.alchemy_minor_damage),
            ("alchemy_major_damage", &self.alchemy_major_damage),
            ("willpower_fail_penalty", &self.willpower_fail_penalty),
            ("insured_stability_damage", &self.insured_stability_damage),
        ]
    }
}

/// Split a `key=value` assignment as given on the command line.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedAssignment`] when there is no `=` or the key is empty.
pub fn parse_assignment(text: &str) -> Result<(&str, &str), ConfigError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ConfigError::MalformedAssignment(text.to_string())),
    }
}

fn require_at_least(field: &'static str, value: i64, min: i64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::BelowMinimum { field, min, value });
    }
    Ok(())
}

fn validate_amount(field: &'static str, formula: &Formula) -> Result<(), ConfigError> {
    match formula {
        Formula::Dice(dice) if dice.sides == 0 => Err(ConfigError::ZeroSidedDice {
            field,
            formula: formula.to_string(),
        }),
        Formula::Dice(_) | Formula::Constant(_) => Ok(()),
        Formula::Bernoulli(_) => Err(ConfigError::FormulaKind {
            field,
            expected: "dice or constant",
            found: formula.kind(),
            formula: formula.to_string(),
        }),
    }
}

fn validate_chance(field: &'static str, formula: &Formula) -> Result<(), ConfigError> {
    match formula {
        Formula::Bernoulli(chance) => {
            let value = chance.percent;
            if value.is_finite() && (0.0..=100.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::ChanceRange { field, value })
            }
        }
        Formula::Constant(_) => Ok(()),
        Formula::Dice(_) => Err(ConfigError::FormulaKind {
            field,
            expected: "percent chance or constant",
            found: formula.kind(),
            formula: formula.to_string(),
        }),
    }
}
