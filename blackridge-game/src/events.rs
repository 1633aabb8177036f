//! Scheduled and random story events, plus special-action flag hooks.
use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::constants::{CHEN_EXPLAIN_TRUST_GAIN, LOG_EVENTS};
use crate::data::{EventId, SpecialAction};
use crate::state::Ledger;

const EVENT_STREAM_TAG: &[u8] = b"blackridge/daily-events";

/// Chances and triggers for the daily event roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "EventConfig::default_crisis_day")]
    pub crisis_day: u32,
    #[serde(default = "EventConfig::default_suspicion_corruption")]
    pub suspicion_corruption: f64,
    #[serde(default = "EventConfig::default_suspicion_sin")]
    pub suspicion_sin: f64,
    #[serde(default = "EventConfig::default_flu_chance")]
    pub flu_chance: f64,
    #[serde(default = "EventConfig::default_flu_duration")]
    pub flu_duration: u32,
    #[serde(default = "EventConfig::default_crackdown_chance")]
    pub crackdown_chance: f64,
}

impl EventConfig {
    const fn default_crisis_day() -> u32 {
        20
    }

    const fn default_suspicion_corruption() -> f64 {
        40.0
    }

    const fn default_suspicion_sin() -> f64 {
        30.0
    }

    const fn default_flu_chance() -> f64 {
        0.08
    }

    const fn default_flu_duration() -> u32 {
        3
    }

    const fn default_crackdown_chance() -> f64 {
        0.15
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `EventConfigError` when a chance leaves `[0, 1]` or a day count is zero.
    pub fn validate(&self) -> Result<(), EventConfigError> {
        for (field, value) in [
            ("flu_chance", self.flu_chance),
            ("crackdown_chance", self.crackdown_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EventConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        for (field, value) in [
            ("crisis_day", self.crisis_day),
            ("flu_duration", self.flu_duration),
        ] {
            if value == 0 {
                return Err(EventConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value: 0.0,
                });
            }
        }
        Ok(())
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            crisis_day: Self::default_crisis_day(),
            suspicion_corruption: Self::default_suspicion_corruption(),
            suspicion_sin: Self::default_suspicion_sin(),
            flu_chance: Self::default_flu_chance(),
            flu_duration: Self::default_flu_duration(),
            crackdown_chance: Self::default_crackdown_chance(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EventConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Derive an independent stream seed for `domain_tag` from the run seed.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return XxHash64::oneshot(user_seed, domain_tag);
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// RNG for one day's event roll. Same seed and day, same draws.
#[must_use]
pub fn event_rng(run_seed: u64, day: u32) -> ChaCha20Rng {
    let stream = derive_stream_seed(run_seed, EVENT_STREAM_TAG);
    ChaCha20Rng::seed_from_u64(XxHash64::oneshot(stream, &day.to_le_bytes()))
}

fn suspicion_triggered(ledger: &Ledger, cfg: &EventConfig) -> bool {
    !ledger.has_resolved(EventId::ChenYiSuspicion)
        && ledger.flags.chen_yi_relation > 0.0
        && (ledger.stats.corruption >= cfg.suspicion_corruption
            || ledger.stats.sin >= cfg.suspicion_sin)
}

fn crisis_triggered(ledger: &Ledger, cfg: &EventConfig) -> bool {
    ledger.day == cfg.crisis_day
        && !ledger.flags.is_mother_dead
        && !ledger.has_resolved(EventId::MotherCrisis)
}

/// Roll the events for the day the ledger has just entered.
///
/// Flu and crackdown draws happen every day in a fixed order so a replay
/// consumes the same randomness regardless of which event wins the slot.
#[must_use]
pub fn roll_daily_events(ledger: &Ledger, cfg: &EventConfig) -> Ledger {
    let mut next = ledger.clone();
    let mut rng = event_rng(ledger.seed, ledger.day);
    let flu_roll = rng.gen_bool(cfg.flu_chance.clamp(0.0, 1.0));
    let crackdown_roll = rng.gen_bool(cfg.crackdown_chance.clamp(0.0, 1.0));

    let mut triggered = Vec::new();
    if crisis_triggered(ledger, cfg) {
        triggered.push(EventId::MotherCrisis);
    }
    if suspicion_triggered(ledger, cfg) {
        triggered.push(EventId::ChenYiSuspicion);
    }
    if flu_roll && ledger.flags.flu_days == 0 {
        next.flags.flu_days = cfg.flu_duration;
        triggered.push(EventId::FluOutbreak);
    }
    let crackdown_started = crackdown_roll && !ledger.flags.is_crackdown;
    next.flags.is_crackdown = crackdown_roll;
    if crackdown_started {
        triggered.push(EventId::Crackdown);
    }

    if let Some(&first) = triggered.first() {
        log::debug!(
            target: LOG_EVENTS,
            "day {} events {:?}, queued {first}",
            ledger.day,
            triggered
        );
        next.pending_event = Some(first);
    }
    next
}

/// Record an event as resolved and clear it from the queue.
pub fn resolve_event(ledger: &mut Ledger, event: EventId) {
    ledger.resolved_events.insert(event);
    if ledger.pending_event == Some(event) {
        ledger.pending_event = None;
    }
}

/// Set the irreversible mother-dead flag once her health is gone.
pub fn apply_mother_death(ledger: &mut Ledger) {
    if !ledger.flags.is_mother_dead && ledger.stats.mother_health <= 0.0 {
        log::debug!(target: LOG_EVENTS, "mother died on day {}", ledger.day);
        ledger.flags.is_mother_dead = true;
    }
}

/// Apply a choice's narrative hook to the ledger's flags.
pub fn apply_special_action(ledger: &mut Ledger, action: SpecialAction) {
    let flags = &mut ledger.flags;
    match action {
        SpecialAction::ChenExplain => {
            flags.chen_yi_relation += CHEN_EXPLAIN_TRUST_GAIN;
        }
        SpecialAction::ChenBreakup => flags.chen_yi_relation = 0.0,
        SpecialAction::MotherSave => {
            ledger.resolved_events.insert(EventId::MotherCrisis);
        }
        SpecialAction::MotherAbandon => {
            flags.is_mother_dead = true;
            ledger.resolved_events.insert(EventId::MotherCrisis);
        }
        SpecialAction::CheatPackage => flags.has_cheat_package = true,
        SpecialAction::Trapped => ledger.is_trapped = true,
        SpecialAction::Escape => ledger.is_trapped = false,
    }
    log::debug!(target: LOG_EVENTS, "special action {action:?} applied");
}
