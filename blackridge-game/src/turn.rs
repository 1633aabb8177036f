//! Turn advancement: deltas, decay, clock, interest and run termination.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DAILY_INTEREST_RATE, FINAL_DAY, FLU_STAMINA_DRAIN, HISTORY_LIMIT, LOG_TURN,
    MOOD_DECAY_PER_TURN, MOTHER_DECAY_PER_TURN, SATIETY_DECAY_PER_TURN,
};
use crate::data::{Choice, SpecialAction};
use crate::events::apply_special_action;
use crate::numbers::whole_units;
use crate::state::{Area, Ledger};
use crate::stats::{StatDelta, StatKey, Stats, apply_delta};

/// Tunable per-turn rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnConfig {
    #[serde(default = "TurnConfig::default_satiety_decay")]
    pub satiety_decay: f64,
    #[serde(default = "TurnConfig::default_mood_decay")]
    pub mood_decay: f64,
    #[serde(default = "TurnConfig::default_mother_health_decay")]
    pub mother_health_decay: f64,
    #[serde(default = "TurnConfig::default_flu_stamina_drain")]
    pub flu_stamina_drain: f64,
    /// Compounded onto debt once per day-wrap.
    #[serde(default = "TurnConfig::default_daily_interest_rate")]
    pub daily_interest_rate: f64,
    #[serde(default = "TurnConfig::default_final_day")]
    pub final_day: u32,
    #[serde(default = "TurnConfig::default_history_limit")]
    pub history_limit: usize,
}

impl TurnConfig {
    const fn default_satiety_decay() -> f64 {
        SATIETY_DECAY_PER_TURN
    }

    const fn default_mood_decay() -> f64 {
        MOOD_DECAY_PER_TURN
    }

    const fn default_mother_health_decay() -> f64 {
        MOTHER_DECAY_PER_TURN
    }

    const fn default_flu_stamina_drain() -> f64 {
        FLU_STAMINA_DRAIN
    }

    const fn default_daily_interest_rate() -> f64 {
        DAILY_INTEREST_RATE
    }

    const fn default_final_day() -> u32 {
        FINAL_DAY
    }

    const fn default_history_limit() -> usize {
        HISTORY_LIMIT
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `TurnConfigError` when any field violates its bounds.
    pub fn validate(&self) -> Result<(), TurnConfigError> {
        for (field, value) in [
            ("satiety_decay", self.satiety_decay),
            ("mood_decay", self.mood_decay),
            ("mother_health_decay", self.mother_health_decay),
            ("flu_stamina_drain", self.flu_stamina_drain),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(TurnConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if !(0.0..=1.0).contains(&self.daily_interest_rate) {
            return Err(TurnConfigError::RangeViolation {
                field: "daily_interest_rate",
                min: 0.0,
                max: 1.0,
                value: self.daily_interest_rate,
            });
        }
        if self.final_day == 0 {
            return Err(TurnConfigError::MinViolation {
                field: "final_day",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.history_limit == 0 {
            return Err(TurnConfigError::MinViolation {
                field: "history_limit",
                min: 1.0,
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            satiety_decay: Self::default_satiety_decay(),
            mood_decay: Self::default_mood_decay(),
            mother_health_decay: Self::default_mother_health_decay(),
            flu_stamina_drain: Self::default_flu_stamina_drain(),
            daily_interest_rate: Self::default_daily_interest_rate(),
            final_day: Self::default_final_day(),
            history_limit: Self::default_history_limit(),
        }
    }
}

/// Errors raised when turn configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum TurnConfigError {
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

/// Everything one turn needs from the resolved choice.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnInput {
    pub label: String,
    pub deltas: StatDelta,
    pub new_area: Option<Area>,
    pub destination: Option<String>,
    pub special: Option<SpecialAction>,
}

impl From<&Choice> for TurnInput {
    fn from(choice: &Choice) -> Self {
        Self {
            label: choice.text.clone(),
            deltas: choice.deltas.clone(),
            new_area: choice.new_area,
            destination: choice.destination.clone(),
            special: choice.special,
        }
    }
}

/// Result of a single turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The run goes on with this ledger.
    Continued(Ledger),
    /// The run is over; the ledger is final and no longer live.
    Ended(Ledger),
}

impl TurnOutcome {
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        match self {
            Self::Continued(ledger) | Self::Ended(ledger) => ledger,
        }
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        matches!(self, Self::Ended(_))
    }

    #[must_use]
    pub fn into_ledger(self) -> Ledger {
        match self {
            Self::Continued(ledger) | Self::Ended(ledger) => ledger,
        }
    }
}

fn per_turn_decay(ledger: &Ledger, cfg: &TurnConfig) -> StatDelta {
    let mut decay = StatDelta::new()
        .with(StatKey::Satiety, -cfg.satiety_decay)
        .with(StatKey::Mood, -cfg.mood_decay);
    if ledger.flags.flu_days > 0 {
        decay = decay.with(StatKey::Stamina, -cfg.flu_stamina_drain);
    }
    if !ledger.flags.is_mother_dead {
        decay = decay.with(StatKey::MotherHealth, -cfg.mother_health_decay);
    }
    decay
}

/// `debt' = floor(debt * (1 + rate))`, routed through the delta primitive.
fn compound_debt(stats: &Stats, rate: f64) -> Stats {
    let grown = whole_units(stats.debt * (1.0 + rate));
    apply_delta(stats, &StatDelta::new().with(StatKey::Debt, grown - stats.debt))
}

/// Advance the run by exactly one turn.
///
/// Pure over its inputs: no clock, no randomness.
#[must_use]
pub fn advance(ledger: &Ledger, input: &TurnInput, cfg: &TurnConfig) -> TurnOutcome {
    let mut next = ledger.clone();

    next.stats = apply_delta(&next.stats, &input.deltas);
    if let Some(action) = input.special {
        apply_special_action(&mut next, action);
    }

    next.stats = apply_delta(&next.stats, &per_turn_decay(&next, cfg));

    let (time, wrapped) = ledger.time.next();
    next.time = time;
    if wrapped {
        next.day = next.day.saturating_add(1);
        next.stats = compound_debt(&next.stats, cfg.daily_interest_rate);
        next.flags.flu_days = next.flags.flu_days.saturating_sub(1);
        log::debug!(
            target: LOG_TURN,
            "day {} begins, debt compounded to {}",
            next.day,
            next.stats.debt
        );
    }

    if next.day > cfg.final_day {
        next.day = cfg.final_day;
        next.time = ledger.time;
        log::debug!(target: LOG_TURN, "final day exhausted, run ends");
        return TurnOutcome::Ended(next);
    }

    if let Some(area) = input.new_area {
        next.area = area;
        next.location = input
            .destination
            .clone()
            .unwrap_or_else(|| area.arrival_location().to_string());
    } else if let Some(destination) = &input.destination {
        next.location.clone_from(destination);
    }
    next.visited.insert(next.location.clone());

    next.history.push(
        format!("[Day {}] {}", ledger.day, input.label),
        cfg.history_limit,
    );
    TurnOutcome::Continued(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{History, StatusFlags, TimeOfDay};

    fn ledger_with(stats: Stats) -> Ledger {
        Ledger::starting_at(
            7,
            Area::MiningTown,
            "HOME",
            stats,
            StatusFlags::default(),
            History::seeded("start"),
        )
    }

    fn plain(label: &str, deltas: StatDelta) -> TurnInput {
        TurnInput {
            label: label.to_string(),
            deltas,
            ..TurnInput::default()
        }
    }

    #[test]
    fn applies_choice_then_decay() {
        let stats = Stats {
            satiety: 60.0,
            mood: 50.0,
            mother_health: 80.0,
            money: 100.0,
            ..Stats::default()
        };
        let outcome = advance(
            &ledger_with(stats),
            &plain("work", StatDelta::new().with(StatKey::Money, 80.0)),
            &TurnConfig::default(),
        );
        let next = outcome.ledger();
        assert!((next.stats.money - 180.0).abs() < f64::EPSILON);
        assert!((next.stats.satiety - 55.0).abs() < f64::EPSILON);
        assert!((next.stats.mood - 47.0).abs() < f64::EPSILON);
        assert!((next.stats.mother_health - 79.0).abs() < f64::EPSILON);
        assert_eq!(next.time, TimeOfDay::Forenoon);
        assert_eq!(next.history.last(), Some("[Day 1] work"));
    }

    #[test]
    fn mother_health_frozen_once_dead() {
        let mut ledger = ledger_with(Stats {
            mother_health: 40.0,
            ..Stats::default()
        });
        ledger.flags.is_mother_dead = true;
        let next = advance(&ledger, &plain("wait", StatDelta::new()), &TurnConfig::default());
        assert!((next.ledger().stats.mother_health - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interest_only_on_day_wrap() {
        let cfg = TurnConfig::default();
        let mut ledger = ledger_with(Stats {
            debt: 5_000.0,
            ..Stats::default()
        });
        for _ in 0..5 {
            ledger = advance(&ledger, &plain("idle", StatDelta::new()), &cfg).into_ledger();
            assert!((ledger.stats.debt - 5_000.0).abs() < f64::EPSILON);
            assert_eq!(ledger.day, 1);
        }
        ledger = advance(&ledger, &plain("sleep", StatDelta::new()), &cfg).into_ledger();
        assert_eq!(ledger.day, 2);
        assert_eq!(ledger.time, TimeOfDay::Morning);
        assert!((ledger.stats.debt - 5_400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interest_is_floored() {
        let cfg = TurnConfig::default();
        let mut ledger = ledger_with(Stats {
            debt: 1_234.0,
            ..Stats::default()
        });
        ledger.time = TimeOfDay::Midnight;
        let next = advance(&ledger, &plain("sleep", StatDelta::new()), &cfg);
        // 1234 * 1.08 = 1332.72
        assert!((next.ledger().stats.debt - 1_332.0).abs() < f64::EPSILON);
    }

    #[test]
    fn midnight_on_final_day_ends_run() {
        let mut ledger = ledger_with(Stats::default());
        ledger.day = 30;
        ledger.time = TimeOfDay::Midnight;
        let outcome = advance(&ledger, &plain("last", StatDelta::new()), &TurnConfig::default());
        assert!(outcome.is_ended());
        assert_eq!(outcome.ledger().day, 30);
    }

    #[test]
    fn day_29_afternoon_spends_to_zero_without_clamp() {
        let mut ledger = ledger_with(Stats {
            stamina: 70.0,
            mood: 60.0,
            money: 50.0,
            debt: 3_000.0,
            ..Stats::default()
        });
        ledger.day = 29;
        ledger.time = TimeOfDay::Afternoon;
        let outcome = advance(
            &ledger,
            &plain("pay", StatDelta::new().with(StatKey::Money, -50.0)),
            &TurnConfig::default(),
        );
        let next = outcome.ledger();
        assert!(!outcome.is_ended());
        assert!(next.stats.money.abs() < f64::EPSILON);
        assert_eq!(next.time, TimeOfDay::Dusk);
        assert_eq!(next.day, 29);
        assert!((next.stats.debt - 3_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn area_transition_moves_to_arrival_point() {
        let input = TurnInput {
            label: "train".to_string(),
            deltas: StatDelta::new().with(StatKey::Money, -50.0),
            new_area: Some(Area::ProvincialCapital),
            ..TurnInput::default()
        };
        let next = advance(
            &ledger_with(Stats {
                money: 200.0,
                ..Stats::default()
            }),
            &input,
            &TurnConfig::default(),
        )
        .into_ledger();
        assert_eq!(next.area, Area::ProvincialCapital);
        assert_eq!(next.location, "SQUARE");
        assert!(next.visited.contains("SQUARE"));
    }

    #[test]
    fn flu_drains_stamina_and_counts_down_at_wrap() {
        let mut ledger = ledger_with(Stats {
            stamina: 50.0,
            ..Stats::default()
        });
        ledger.flags.flu_days = 2;
        ledger.time = TimeOfDay::Midnight;
        let next = advance(&ledger, &plain("shiver", StatDelta::new()), &TurnConfig::default())
            .into_ledger();
        assert!((next.stats.stamina - 45.0).abs() < f64::EPSILON);
        assert_eq!(next.flags.flu_days, 1);
    }

    #[test]
    fn config_validation_catches_bad_values() {
        let cfg = TurnConfig {
            daily_interest_rate: 1.5,
            ..TurnConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(TurnConfigError::RangeViolation {
                field: "daily_interest_rate",
                ..
            })
        ));
        let cfg = TurnConfig {
            mood_decay: -1.0,
            ..TurnConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(TurnConfig::default().validate().is_ok());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: TurnConfig = serde_json::from_str(r#"{"mood_decay": 10}"#).unwrap();
        assert!((cfg.mood_decay - 10.0).abs() < f64::EPSILON);
        assert!((cfg.daily_interest_rate - 0.08).abs() < f64::EPSILON);
        assert_eq!(cfg.final_day, 30);
    }
}
