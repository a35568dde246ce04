//! Single-trial state machine: one attachment-removal regimen, day by day.
use rand::Rng;
use smallvec::SmallVec;

use crate::config::{AlchemyMode, ConfigError, SimConfig, WillpowerPillPolicy};
use crate::constants::{
    ALCHEMY_COOLDOWN_SIDES, ALCHEMY_MAJOR_AFTER, ALCHEMY_MINOR_AFTER,
    ALCHEMY_MINOR_COOLDOWN_BONUS, PILL_OVERFLOW_PENALTY, RETRY_ROLL_ADJUSTMENT,
    STABILITY_CEILING, STABILITY_DISPLAY_PLACES, WILLPOWER_DICE_COUNT, WILLPOWER_DICE_SIDES,
};
use crate::dice::{DiceRoll, Formula};
use crate::numbers::{i64_to_f64, round_to_places};
use crate::result::{Ending, OutcomeRecord};
use crate::seed::TrialRng;

/// Per-day adjustment applied to a trial before its events fire.
///
/// Scenarios implement this to rewrite configuration or state on the fly.
/// Closures taking `&mut TrialState` implement it automatically.
pub trait DayAdjust: Sync {
    fn adjust(&self, state: &mut TrialState);
}

impl<F> DayAdjust for F
where
    F: Fn(&mut TrialState) + Sync,
{
    fn adjust(&self, state: &mut TrialState) {
        self(state);
    }
}

/// Hook that leaves every day untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoAdjust;

impl DayAdjust for NoAdjust {
    fn adjust(&self, _state: &mut TrialState) {}
}

/// Which removal roll an attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalKind {
    Standard,
    NoPillRoleplay,
    Withdrawal,
}

impl RemovalKind {
    fn formula(self, config: &SimConfig) -> &Formula {
        match self {
            Self::Standard => &config.removal_attempt,
            Self::NoPillRoleplay => &config.removal_attempt_nopill_rp,
            Self::Withdrawal => &config.removal_attempt_withdrawal,
        }
    }
}

/// Day counters for the periodic events. Each event fires when its counter
/// equals the configured cooldown, then resets to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCounters {
    pub growth: u32,
    pub potion: u32,
    pub removal: u32,
    pub alchemy: u32,
}

impl Default for EventCounters {
    fn default() -> Self {
        Self {
            growth: 1,
            potion: 1,
            removal: 1,
            alchemy: 1,
        }
    }
}

/// Flags scenario hooks keep on a trial between days.
pub type ScriptFlags = SmallVec<[&'static str; 4]>;

/// Mutable state of one trial. Each trial owns its own copy of the
/// configuration, so hooks may rewrite it without touching other trials.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialState {
    pub config: SimConfig,
    pub attachments: u32,
    pub power: i64,
    pub stability: f64,
    pub day: u32,
    pub counters: EventCounters,
    /// Willpower lost to drift so far, subtracted from the configured modifier.
    pub willpower_drift: i64,
    pub next_attachment_threshold: i64,
    /// Set by the first failed willpower roll and never cleared.
    pub will_roll_failed: bool,
    pub willpower_pills_left: u32,
    pub insurance_left: u32,
    pub removal_successes: u32,
    pub removal_failures: u32,
    pub insured_retries: u32,
    pub flags: ScriptFlags,
    pub log: Vec<String>,
}

impl TrialState {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let step = config.attachment_power_step.max(1);
        Self {
            attachments: config.initial_attachments,
            power: config.initial_power,
            stability: config.initial_stability,
            day: 0,
            counters: EventCounters::default(),
            willpower_drift: 0,
            next_attachment_threshold: (config.initial_power.div_euclid(step) + 1) * step,
            will_roll_failed: false,
            willpower_pills_left: config.willpower_pills,
            insurance_left: config.failure_insurance,
            removal_successes: 0,
            removal_failures: 0,
            insured_retries: 0,
            flags: ScriptFlags::new(),
            log: Vec::new(),
            config,
        }
    }

    /// Current removal difficulty class.
    #[must_use]
    pub fn difficulty_class(&self) -> i64 {
        let step = self.config.dc_power_step.max(1);
        self.config.dc_base + (self.power - self.config.dc_power_offset).div_euclid(step)
    }

    /// Willpower modifier in effect: the configured value less the drift.
    #[must_use]
    pub fn willpower_modifier(&self) -> i64 {
        self.config.willpower_modifier - self.willpower_drift
    }

    /// Stability rounded for display.
    #[must_use]
    pub fn stability_view(&self) -> f64 {
        round_to_places(self.stability, STABILITY_DISPLAY_PLACES)
    }

    /// Add stability, saturating at the ceiling.
    pub fn gain_stability(&mut self, amount: f64) {
        self.stability = (self.stability + amount).min(STABILITY_CEILING);
    }

    /// Add brand power; every threshold crossed grows one attachment.
    pub fn gain_power(&mut self, amount: i64) {
        self.power += amount;
        let step = self.config.attachment_power_step.max(1);
        while self.power >= self.next_attachment_threshold {
            self.attachments += 1;
            self.next_attachment_threshold += step;
            self.narrate(format!("New attachment, now {}", self.attachments));
        }
    }

    /// Whether the next removal should spend a willpower pill.
    #[must_use]
    pub fn wants_willpower_pill(&self) -> bool {
        let pills = self.willpower_pills_left;
        let wanted = match self.config.willpower_pill_policy {
            WillpowerPillPolicy::Last => self.attachments <= pills,
            WillpowerPillPolicy::AfterFail => self.will_roll_failed || self.attachments <= pills,
            WillpowerPillPolicy::First => true,
        };
        wanted && pills > 0
    }

    /// Ending the trial has already reached, if any. The day cap is the
    /// caller's concern.
    #[must_use]
    pub fn terminal_status(&self) -> Option<Ending> {
        if self.attachments == 0 {
            Some(Ending::Cleared)
        } else if self.stability < self.config.stability_cutoff {
            Some(Ending::Destabilized)
        } else {
            None
        }
    }

    pub fn set_flag(&mut self, flag: &'static str) {
        if !self.has_flag(flag) {
            self.flags.push(flag);
        }
    }

    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|existing| *existing == flag)
    }

    pub fn narrate(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::trace!("day {}: {line}", self.day);
        self.log.push(line);
    }
}

/// A trial and the random stream it draws from.
#[derive(Debug, Clone)]
pub struct Trial<R = TrialRng> {
    state: TrialState,
    rng: R,
}

impl<R: Rng> Trial<R> {
    /// Start a trial from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration rule the config violates.
    pub fn new(config: SimConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config, rng))
    }

    pub(crate) fn from_validated(config: SimConfig, rng: R) -> Self {
        Self {
            state: TrialState::new(config),
            rng,
        }
    }

    #[must_use]
    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TrialState {
        &mut self.state
    }

    #[must_use]
    pub fn into_state(self) -> TrialState {
        self.state
    }

    /// Advance one day: hook, willpower drift, stability, brand growth,
    /// then the scheduled removal and the optional withdrawal attempt.
    ///
    /// A trial that is already terminal after the hook runs no events.
    pub fn step_day<H: DayAdjust + ?Sized>(&mut self, hook: &H) {
        self.state.day += 1;
        let day = self.state.day;
        self.state.narrate(format!("Day {day}"));
        hook.adjust(&mut self.state);
        if self.state.terminal_status().is_some() {
            return;
        }

        if day % self.state.config.willpower_drift_interval.max(1) == 0 {
            self.state.willpower_drift += 1;
        }
        self.stability_event();
        self.growth_event();
        self.removal_event();
        self.withdrawal_event();
    }

    fn stability_event(&mut self) {
        if self.state.counters.potion == self.state.config.potion_cooldown {
            let gain = self.state.config.stability_potion_gain.roll(&mut self.rng);
            self.state.gain_stability(i64_to_f64(gain));
            self.state.counters.potion = 1;
            let view = self.state.stability_view();
            self.state.narrate(format!("Stability potion +{gain} = {view}"));
        } else {
            self.state.counters.potion += 1;
            let roll = self.state.config.stability_cultivation.roll(&mut self.rng);
            let gain = round_to_places(
                i64_to_f64(roll) * self.state.config.cultivation_scale,
                STABILITY_DISPLAY_PLACES,
            );
            self.state.gain_stability(gain);
            let view = self.state.stability_view();
            self.state.narrate(format!("Stability cultivation +{gain} = {view}"));
        }
    }

    fn growth_event(&mut self) {
        if self.state.counters.growth != self.state.config.growth_cooldown {
            self.state.counters.growth += 1;
            return;
        }
        let growth = self.state.config.growth_power.roll(&mut self.rng);
        self.state.gain_power(growth);
        self.state.counters.growth = 1;
        let power = self.state.power;
        self.state.narrate(format!("Brand grew +{growth}, power {power}"));
        self.willpower_check(true, false);
    }

    fn removal_event(&mut self) {
        if self.state.counters.removal != self.state.config.pill_cooldown {
            self.state.counters.removal += 1;
            return;
        }
        let kind = if self.state.config.remove_nopill_rp {
            self.state.narrate("No-pill roleplay removal attempt");
            RemovalKind::NoPillRoleplay
        } else {
            RemovalKind::Standard
        };
        self.attempt_removal(kind);
        self.state.counters.removal = 1;
        if self.state.config.alchemy.is_active() {
            self.alchemy_event();
        }
    }

    fn alchemy_event(&mut self) {
        let mode = self.state.config.alchemy;
        let uses = self.state.counters.alchemy;
        let damage = if mode == AlchemyMode::Major && uses > ALCHEMY_MAJOR_AFTER {
            Some(("Major", self.state.config.alchemy_major_damage.roll(&mut self.rng)))
        } else if uses > ALCHEMY_MINOR_AFTER {
            Some(("Minor", self.state.config.alchemy_minor_damage.roll(&mut self.rng)))
        } else {
            None
        };
        if let Some((tier, amount)) = damage {
            self.state.stability -= i64_to_f64(amount);
            let view = self.state.stability_view();
            self.state.narrate(format!("{tier} alchemy damage -{amount} = {view}"));
        }
        self.state.counters.alchemy += 1;

        let bonus = if mode == AlchemyMode::Major {
            0
        } else {
            ALCHEMY_MINOR_COOLDOWN_BONUS
        };
        let cooldown = DiceRoll::new(1, ALCHEMY_COOLDOWN_SIDES, bonus).roll(&mut self.rng);
        self.state.config.pill_cooldown = u32::try_from(cooldown).unwrap_or(1).max(1);
        let next = self.state.config.pill_cooldown;
        self.state.narrate(format!("Pill cooldown now {next}"));
    }

    fn withdrawal_event(&mut self) {
        let state = &self.state;
        if state.config.remove_during_withdrawal
            && state.attachments > 0
            && state.counters.removal == state.config.pill_cooldown / 2
        {
            self.state.narrate("Withdrawal removal attempt");
            self.attempt_removal(RemovalKind::Withdrawal);
        }
    }

    /// Roll 2d6 plus the willpower modifier until the target is met or the
    /// accumulated fatigue reaches the cap. Fatigue feeds brand power.
    ///
    /// With `escalate`, each failure lowers the modifier for the next roll
    /// of this check. With `use_pill`, a willpower pill is consumed for a
    /// bonus when one is left. Returns the removal penalty: 0 when the
    /// first roll succeeded, otherwise the configured penalty.
    pub fn willpower_check(&mut self, escalate: bool, use_pill: bool) -> i64 {
        let mut modifier = self.state.willpower_modifier();
        if use_pill && self.state.willpower_pills_left > 0 {
            modifier += self.state.config.willpower_pill_bonus;
            self.state.willpower_pills_left -= 1;
        }
        let target = self.state.config.willpower_target;
        let cap = self.state.config.willpower_fatigue_cap;

        let mut fatigue = 0_i64;
        let mut failures = 0_u32;
        let mut penalty = 0;
        loop {
            let dice = DiceRoll::new(WILLPOWER_DICE_COUNT, WILLPOWER_DICE_SIDES, modifier);
            let roll = dice.roll(&mut self.rng);
            if roll >= target || fatigue >= cap {
                break;
            }
            fatigue += self.state.config.willpower_fail_penalty.roll(&mut self.rng).max(1);
            failures += 1;
            if escalate {
                modifier -= 1;
            }
            penalty = self.state.config.removal_fail_penalty;
            self.state.will_roll_failed = true;
        }

        if fatigue != 0 {
            self.state.gain_power(fatigue);
            let power = self.state.power;
            self.state.narrate(format!(
                "Willpower roll failed {failures}x, power +{fatigue} = {power}"
            ));
        }
        penalty
    }

    /// One removal attempt against the current difficulty class.
    ///
    /// The first roll may suffer pill overflow and pays the willpower
    /// penalty. A failure with insurance left is absorbed at reduced damage
    /// and retried with a flat bonus, skipping overflow and willpower, until
    /// a roll succeeds or insurance runs out.
    pub fn attempt_removal(&mut self, kind: RemovalKind) {
        let mut first_roll = true;
        loop {
            let mut roll = kind.formula(&self.state.config).roll(&mut self.rng);
            if first_roll {
                if self.state.config.pill_overflow.check(&mut self.rng) {
                    roll -= PILL_OVERFLOW_PENALTY;
                    self.state.narrate("Pill overflow, roll -1");
                }
                let use_pill = self.state.wants_willpower_pill();
                if use_pill {
                    let left = self.state.willpower_pills_left - 1;
                    self.state.narrate(format!("Using willpower pill, {left} left"));
                }
                roll -= self.willpower_check(false, use_pill);
            } else {
                roll += RETRY_ROLL_ADJUSTMENT;
            }

            let dc = self.state.difficulty_class();
            if roll >= dc {
                self.removal_success(roll, dc);
                return;
            }
            if self.state.insurance_left > 0 {
                self.state.insurance_left -= 1;
                self.state.insured_retries += 1;
                let damage = self.state.config.insured_stability_damage.roll(&mut self.rng);
                self.state.stability -= i64_to_f64(damage);
                let (left, view) = (self.state.insurance_left, self.state.stability_view());
                self.state.narrate(format!(
                    "Removal failure [{roll} vs DC{dc}] insured ({left} left), stability -{damage} = {view}"
                ));
                first_roll = false;
                continue;
            }
            self.removal_failure(roll, dc);
            return;
        }
    }

    fn removal_success(&mut self, roll: i64, dc: i64) {
        let state = &mut self.state;
        state.attachments = state.attachments.saturating_sub(1);
        let drain = state.config.success_drain.roll(&mut self.rng);
        state.power -= drain;
        let damage = state.config.success_stability_damage.roll(&mut self.rng);
        state.stability -= i64_to_f64(damage);
        state.removal_successes += 1;
        let (attachments, power, view) = (state.attachments, state.power, state.stability_view());
        state.narrate(format!(
            "Removal success [{roll} vs DC{dc}], attachments {attachments}, power -{drain} = {power}, stability -{damage} = {view}"
        ));
    }

    fn removal_failure(&mut self, roll: i64, dc: i64) {
        let state = &mut self.state;
        let damage = state.config.failure_stability_damage.roll(&mut self.rng);
        state.stability -= i64_to_f64(damage);
        state.removal_failures += 1;
        let view = state.stability_view();
        state.narrate(format!(
            "Removal failure [{roll} vs DC{dc}], stability -{damage} = {view}"
        ));
    }

    /// Run days until the trial clears, destabilizes, or hits `max_days`.
    pub fn run<H: DayAdjust + ?Sized>(mut self, hook: &H, max_days: u32) -> OutcomeRecord {
        let mut ending = None;
        for _ in 0..max_days {
            self.step_day(hook);
            ending = self.state.terminal_status();
            if ending.is_some() {
                break;
            }
        }
        let ending = ending
            .or_else(|| self.state.terminal_status())
            .unwrap_or(Ending::DayCap);

        let state = &mut self.state;
        match ending {
            Ending::Cleared => {
                state.narrate("All attachments removed");
                let (view, power) = (state.stability_view(), state.power);
                state.narrate(format!("Final stability {view}, power {power}"));
            }
            Ending::Destabilized => {
                let cutoff = state.config.stability_cutoff;
                state.narrate(format!("Stability fell below {cutoff}"));
                let (attachments, power) = (state.attachments, state.power);
                state.narrate(format!("Attachments left {attachments}, power {power}"));
            }
            Ending::DayCap => {
                state.narrate(format!("Reached the {max_days} day cap"));
            }
        }
        log::debug!(
            "trial ended {ending} on day {} with {} attachments",
            state.day,
            state.attachments
        );
        OutcomeRecord::from_state(self.state, ending)
    }
}
