//! Character creation and the prologue that opens every run.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ATTRIBUTE_MAX, ATTRIBUTE_MIN, ATTRIBUTE_POINT_BUDGET, ATTRIBUTE_POOL_SCALE, HISTORY_LIMIT,
};
use crate::data::{Baseline, PrologueOption};
use crate::state::{History, Ledger};
use crate::stats::{StatKey, apply_delta};

/// Player-allocated starting attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub intelligence: u8,
    pub appearance: u8,
    pub stamina: u8,
    pub resilience: u8,
    pub savviness: u8,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            intelligence: 4,
            appearance: 4,
            stamina: 4,
            resilience: 4,
            savviness: 4,
        }
    }
}

impl Attributes {
    #[must_use]
    pub const fn entries(&self) -> [(StatKey, u8); 5] {
        [
            (StatKey::Intelligence, self.intelligence),
            (StatKey::Appearance, self.appearance),
            (StatKey::Stamina, self.stamina),
            (StatKey::Resilience, self.resilience),
            (StatKey::Savviness, self.savviness),
        ]
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.entries()
            .iter()
            .map(|(_, points)| u32::from(*points))
            .sum()
    }

    /// Check each attribute against the range and the total against the budget.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self, cfg: &CreationConfig) -> Result<(), CreationError> {
        for (stat, value) in self.entries() {
            if !(cfg.min..=cfg.max).contains(&value) {
                return Err(CreationError::OutOfRange {
                    stat,
                    value,
                    min: cfg.min,
                    max: cfg.max,
                });
            }
        }
        let spent = self.total();
        if spent > u32::from(cfg.point_budget) {
            return Err(CreationError::OverBudget {
                spent,
                budget: cfg.point_budget,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationConfig {
    #[serde(default = "CreationConfig::default_point_budget")]
    pub point_budget: u8,
    #[serde(default = "CreationConfig::default_min")]
    pub min: u8,
    #[serde(default = "CreationConfig::default_max")]
    pub max: u8,
    /// Multiplier turning stamina and resilience points into pools.
    #[serde(default = "CreationConfig::default_pool_scale")]
    pub pool_scale: f64,
}

impl CreationConfig {
    const fn default_point_budget() -> u8 {
        ATTRIBUTE_POINT_BUDGET
    }

    const fn default_min() -> u8 {
        ATTRIBUTE_MIN
    }

    const fn default_max() -> u8 {
        ATTRIBUTE_MAX
    }

    const fn default_pool_scale() -> f64 {
        ATTRIBUTE_POOL_SCALE
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `CreationError::InvalidConfig` when the range is inverted, the
    /// budget cannot cover the minimums, or the pool scale is not positive.
    pub fn validate(&self) -> Result<(), CreationError> {
        if self.min > self.max {
            return Err(CreationError::InvalidConfig("min exceeds max"));
        }
        if u32::from(self.point_budget) < u32::from(self.min) * 5 {
            return Err(CreationError::InvalidConfig(
                "point_budget cannot cover the minimum allocation",
            ));
        }
        if !(self.pool_scale > 0.0 && self.pool_scale.is_finite()) {
            return Err(CreationError::InvalidConfig("pool_scale must be positive"));
        }
        Ok(())
    }
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            point_budget: Self::default_point_budget(),
            min: Self::default_min(),
            max: Self::default_max(),
            pool_scale: Self::default_pool_scale(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CreationError {
    #[error("{stat} must be between {min} and {max} (got {value})")]
    OutOfRange { stat: StatKey, value: u8, min: u8, max: u8 },
    #[error("attributes spend {spent} points but the budget is {budget}")]
    OverBudget { spent: u32, budget: u8 },
    #[error("invalid creation config: {0}")]
    InvalidConfig(&'static str),
}

impl Ledger {
    /// Day-one ledger built from the baseline and the player's attributes.
    ///
    /// # Errors
    ///
    /// Returns `CreationError` when the attributes break the creation rules.
    pub fn new_run(
        baseline: &Baseline,
        attributes: &Attributes,
        cfg: &CreationConfig,
        seed: u64,
    ) -> Result<Self, CreationError> {
        attributes.validate(cfg)?;
        let mut stats = baseline.stats;
        for (stat, points) in attributes.entries() {
            let value = match stat {
                StatKey::Stamina | StatKey::Resilience => f64::from(points) * cfg.pool_scale,
                _ => f64::from(points),
            };
            stats.set(stat, value);
        }
        let history = if baseline.opening.is_empty() {
            History::default()
        } else {
            History::seeded(baseline.opening.clone())
        };
        Ok(Self::starting_at(
            seed,
            baseline.area,
            baseline.location.clone(),
            stats,
            baseline.flags,
            history,
        ))
    }
}

/// Apply the chosen prologue option out of turn.
#[must_use]
pub fn apply_prologue(ledger: &Ledger, option: &PrologueOption) -> Ledger {
    let mut next = ledger.with_stats(apply_delta(&ledger.stats, &option.impact));
    next.history
        .push(format!("[Prologue] {}", option.label), HISTORY_LIMIT);
    next
}
