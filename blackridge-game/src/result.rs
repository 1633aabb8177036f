//! End-of-run result calculation
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::forecast::{Forecast, ScoreTier, forecast};
use crate::numbers::floor_f64_to_i64;
use crate::state::Ledger;

/// Thresholds that decide which ending a final ledger earns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultConfig {
    #[serde(default = "ResultConfig::default_consumed_sin")]
    pub consumed_sin: f64,
    #[serde(default = "ResultConfig::default_consumed_corruption")]
    pub consumed_corruption: f64,
    /// Lowest forecast tier at which a bought exam paper gets noticed.
    #[serde(default = "ResultConfig::default_exposed_tier")]
    pub exposed_tier: ScoreTier,
    #[serde(default = "ResultConfig::default_scholar_tier")]
    pub scholar_tier: ScoreTier,
}

impl ResultConfig {
    const fn default_consumed_sin() -> f64 {
        80.0
    }

    const fn default_consumed_corruption() -> f64 {
        70.0
    }

    const fn default_exposed_tier() -> ScoreTier {
        ScoreTier::Undergraduate
    }

    const fn default_scholar_tier() -> ScoreTier {
        ScoreTier::KeyUniversity
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ResultConfigError` when a threshold is negative.
    pub fn validate(&self) -> Result<(), ResultConfigError> {
        for (field, value) in [
            ("consumed_sin", self.consumed_sin),
            ("consumed_corruption", self.consumed_corruption),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ResultConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self {
            consumed_sin: Self::default_consumed_sin(),
            consumed_corruption: Self::default_consumed_corruption(),
            exposed_tier: Self::default_exposed_tier(),
            scholar_tier: Self::default_scholar_tier(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ResultConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
}

/// Possible run endings, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ending {
    /// Sin and corruption both ran past the point of return.
    Consumed,
    /// Stamina or mood gave out.
    Collapsed,
    /// The bought exam paper was traced back.
    Exposed,
    /// Tested out of Blackridge.
    Scholar,
    /// Enough cash on hand to settle the debt.
    Cleared,
    /// The mother died during the run.
    Orphaned,
    /// The town kept you.
    Swallowed,
}

impl Ending {
    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Consumed => "Consumed",
            Self::Collapsed => "Collapsed",
            Self::Exposed => "Exposed",
            Self::Scholar => "Out of Blackridge",
            Self::Cleared => "Debt Cleared",
            Self::Orphaned => "Alone",
            Self::Swallowed => "Swallowed by the Town",
        }
    }

    #[must_use]
    pub const fn epilogue(self) -> &'static str {
        match self {
            Self::Consumed => {
                "You paid Dao Ge in full, and then you became him. Nobody in Blackridge crosses you now."
            }
            Self::Collapsed => {
                "They found you in the snow outside the mine gate. The debt passed to whoever was left."
            }
            Self::Exposed => {
                "The score was too good. An inspector matched your paper to the leaked set and your name was struck from every list."
            }
            Self::Scholar => {
                "The admission letter arrived in a plain envelope. You left on the first train and did not look back."
            }
            Self::Cleared => {
                "You laid the cash on the table and watched him count it twice. For the first time in months, the phone stayed silent."
            }
            Self::Orphaned => {
                "The hospital bill came with a death certificate stapled to it. You settled neither."
            }
            Self::Swallowed => {
                "The thirty days ran out. The interest did not. Blackridge closed over you like water."
            }
        }
    }
}

impl fmt::Display for Ending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Self::Consumed => "consumed",
            Self::Collapsed => "collapsed",
            Self::Exposed => "exposed",
            Self::Scholar => "scholar",
            Self::Cleared => "cleared",
            Self::Orphaned => "orphaned",
            Self::Swallowed => "swallowed",
        };
        f.write_str(key)
    }
}

/// Summary of a finished run for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub ending: Ending,
    pub headline: String,
    pub epilogue: String,
    pub seed: u64,
    pub day: u32,
    pub forecast: Forecast,
    pub money: i64,
    pub debt: i64,
    pub mother_alive: bool,
}

/// Select the ending by strict priority order.
#[must_use]
pub fn select_ending(ledger: &Ledger, cfg: &ResultConfig) -> Ending {
    let stats = &ledger.stats;
    let outlook = forecast(stats);
    if stats.sin >= cfg.consumed_sin && stats.corruption >= cfg.consumed_corruption {
        return Ending::Consumed;
    }
    if stats.stamina <= 0.0 || stats.mood <= 0.0 {
        return Ending::Collapsed;
    }
    if ledger.flags.has_cheat_package && outlook.tier >= cfg.exposed_tier {
        return Ending::Exposed;
    }
    if outlook.tier >= cfg.scholar_tier {
        return Ending::Scholar;
    }
    if stats.debt <= stats.money {
        return Ending::Cleared;
    }
    if ledger.flags.is_mother_dead {
        return Ending::Orphaned;
    }
    Ending::Swallowed
}

/// Build the result summary for a final ledger.
#[must_use]
pub fn result_summary(ledger: &Ledger, cfg: &ResultConfig) -> ResultSummary {
    let ending = select_ending(ledger, cfg);
    ResultSummary {
        ending,
        headline: ending.headline().to_string(),
        epilogue: ending.epilogue().to_string(),
        seed: ledger.seed,
        day: ledger.day,
        forecast: forecast(&ledger.stats),
        money: floor_f64_to_i64(ledger.stats.money),
        debt: floor_f64_to_i64(ledger.stats.debt),
        mother_alive: !ledger.flags.is_mother_dead,
    }
}
