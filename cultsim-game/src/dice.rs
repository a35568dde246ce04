//! Random variable descriptors used by the simulation configuration.
//!
//! A [`Formula`] is plain data: a dice expression, a percent chance, or a
//! constant. Sampling happens against whatever RNG the caller owns, so the
//! same formula can be reused across any number of draws and trials.
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Sum of `count` uniform dice with `sides` faces, plus a constant bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiceRoll {
    pub count: u32,
    pub sides: u32,
    pub bonus: i64,
}

impl DiceRoll {
    #[must_use]
    pub const fn new(count: u32, sides: u32, bonus: i64) -> Self {
        Self {
            count,
            sides,
            bonus,
        }
    }

    /// Draw `count` dice and add the bonus. Dice with no faces contribute nothing.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> i64 {
        if self.sides == 0 {
            return self.bonus;
        }
        let total: i64 = (0..self.count)
            .map(|_| i64::from(rng.gen_range(1..=self.sides)))
            .sum();
        total + self.bonus
    }

    #[must_use]
    pub const fn min(&self) -> i64 {
        self.count as i64 + self.bonus
    }

    #[must_use]
    pub const fn max(&self) -> i64 {
        self.count as i64 * self.sides as i64 + self.bonus
    }
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "-{}", b.unsigned_abs()),
        }
    }
}

/// True with probability `percent / 100`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentChance {
    pub percent: f64,
}

impl PercentChance {
    #[must_use]
    pub const fn new(percent: f64) -> Self {
        Self { percent }
    }

    pub fn check<R: Rng>(&self, rng: &mut R) -> bool {
        rng.gen_range(0.0..1.0) < self.percent / 100.0
    }
}

/// Discriminant of a [`Formula`], used when validating configuration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    Dice,
    Bernoulli,
    Constant,
}

impl fmt::Display for FormulaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Dice => "dice",
            Self::Bernoulli => "bernoulli",
            Self::Constant => "constant",
        };
        f.write_str(label)
    }
}

/// Distribution descriptor stored on the configuration.
///
/// Serialized using dice notation: `2d6+28`, `5%`, `3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Formula {
    Dice(DiceRoll),
    Bernoulli(PercentChance),
    Constant(i64),
}

impl Formula {
    #[must_use]
    pub const fn kind(&self) -> FormulaKind {
        match self {
            Self::Dice(_) => FormulaKind::Dice,
            Self::Bernoulli(_) => FormulaKind::Bernoulli,
            Self::Constant(_) => FormulaKind::Constant,
        }
    }

    /// Sample an amount. A percent chance yields 1 on success and 0 otherwise.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> i64 {
        match self {
            Self::Dice(dice) => dice.roll(rng),
            Self::Bernoulli(chance) => i64::from(chance.check(rng)),
            Self::Constant(value) => *value,
        }
    }

    /// Sample a yes/no outcome. Amount formulas count as true when positive.
    pub fn check<R: Rng>(&self, rng: &mut R) -> bool {
        match self {
            Self::Dice(dice) => dice.roll(rng) > 0,
            Self::Bernoulli(chance) => chance.check(rng),
            Self::Constant(value) => *value != 0,
        }
    }
}

/// Build a dice formula.
#[must_use]
pub const fn make_dice_roll(count: u32, sides: u32, bonus: i64) -> Formula {
    Formula::Dice(DiceRoll::new(count, sides, bonus))
}

/// Build a percent-chance formula.
#[must_use]
pub const fn make_bernoulli(percent: f64) -> Formula {
    Formula::Bernoulli(PercentChance::new(percent))
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dice(dice) => fmt::Display::fmt(dice, f),
            Self::Bernoulli(chance) => write!(f, "{}%", chance.percent),
            Self::Constant(value) => write!(f, "{value}"),
        }
    }
}

/// Errors raised when dice notation cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormulaParseError {
    #[error("`{0}` is not dice notation (expected e.g. 2d6+28, 5%, or 3)")]
    Unrecognized(String),
    #[error("`{0}` is out of range")]
    OutOfRange(String),
}

fn dice_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+)\s*[dD]\s*(\d+)\s*(?:([+-])\s*(\d+))?$").expect("dice pattern compiles")
    })
}

fn percent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*%$").expect("percent pattern compiles"))
}

fn constant_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[+-]?\d+$").expect("constant pattern compiles"))
}

impl FromStr for Formula {
    type Err = FormulaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let out_of_range = || FormulaParseError::OutOfRange(text.to_string());

        if let Some(caps) = dice_pattern().captures(text) {
            let count: u32 = caps[1].parse().map_err(|_| out_of_range())?;
            let sides: u32 = caps[2].parse().map_err(|_| out_of_range())?;
            let magnitude: i64 = match caps.get(4) {
                Some(m) => m.as_str().parse().map_err(|_| out_of_range())?,
                None => 0,
            };
            let bonus = match caps.get(3).map(|m| m.as_str()) {
                Some("-") => -magnitude,
                _ => magnitude,
            };
            return Ok(make_dice_roll(count, sides, bonus));
        }

        if let Some(caps) = percent_pattern().captures(text) {
            let percent: f64 = caps[1].parse().map_err(|_| out_of_range())?;
            return Ok(make_bernoulli(percent));
        }

        if constant_pattern().is_match(text) {
            let value: i64 = text.parse().map_err(|_| out_of_range())?;
            return Ok(Self::Constant(value));
        }

        Err(FormulaParseError::Unrecognized(text.to_string()))
    }
}

impl TryFrom<String> for Formula {
    type Error = FormulaParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Formula> for String {
    fn from(value: Formula) -> Self {
        value.to_string()
    }
}
