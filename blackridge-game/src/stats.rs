//! Stat set, partial stat maps and the clamped delta primitive.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::numbers::whole_units;

/// Every numeric stat tracked by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKey {
    Satiety,
    Hygiene,
    Mood,
    Money,
    Debt,
    TotalDebt,
    Academic,
    Corruption,
    Sin,
    Stamina,
    Resilience,
    Savviness,
    Intelligence,
    Appearance,
    MotherHealth,
}

impl StatKey {
    pub const ALL: [Self; 15] = [
        Self::Satiety,
        Self::Hygiene,
        Self::Mood,
        Self::Money,
        Self::Debt,
        Self::TotalDebt,
        Self::Academic,
        Self::Corruption,
        Self::Sin,
        Self::Stamina,
        Self::Resilience,
        Self::Savviness,
        Self::Intelligence,
        Self::Appearance,
        Self::MotherHealth,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Satiety => "satiety",
            Self::Hygiene => "hygiene",
            Self::Mood => "mood",
            Self::Money => "money",
            Self::Debt => "debt",
            Self::TotalDebt => "totalDebt",
            Self::Academic => "academic",
            Self::Corruption => "corruption",
            Self::Sin => "sin",
            Self::Stamina => "stamina",
            Self::Resilience => "resilience",
            Self::Savviness => "savviness",
            Self::Intelligence => "intelligence",
            Self::Appearance => "appearance",
            Self::MotherHealth => "motherHealth",
        }
    }

    /// Currency stats hold whole units only.
    #[must_use]
    pub const fn is_currency(self) -> bool {
        matches!(self, Self::Money | Self::Debt | Self::TotalDebt)
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stat name: {0}")]
pub struct UnknownStat(pub String);

impl FromStr for StatKey {
    type Err = UnknownStat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStat(s.to_string()))
    }
}

/// The full stat set of a run. Every value is non-negative after any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub satiety: f64,
    pub hygiene: f64,
    pub mood: f64,
    pub money: f64,
    pub debt: f64,
    pub total_debt: f64,
    pub academic: f64,
    pub corruption: f64,
    pub sin: f64,
    pub stamina: f64,
    pub resilience: f64,
    pub savviness: f64,
    pub intelligence: f64,
    pub appearance: f64,
    pub mother_health: f64,
}

impl Stats {
    #[must_use]
    pub const fn get(&self, key: StatKey) -> f64 {
        match key {
            StatKey::Satiety => self.satiety,
            StatKey::Hygiene => self.hygiene,
            StatKey::Mood => self.mood,
            StatKey::Money => self.money,
            StatKey::Debt => self.debt,
            StatKey::TotalDebt => self.total_debt,
            StatKey::Academic => self.academic,
            StatKey::Corruption => self.corruption,
            StatKey::Sin => self.sin,
            StatKey::Stamina => self.stamina,
            StatKey::Resilience => self.resilience,
            StatKey::Savviness => self.savviness,
            StatKey::Intelligence => self.intelligence,
            StatKey::Appearance => self.appearance,
            StatKey::MotherHealth => self.mother_health,
        }
    }

    const fn slot_mut(&mut self, key: StatKey) -> &mut f64 {
        match key {
            StatKey::Satiety => &mut self.satiety,
            StatKey::Hygiene => &mut self.hygiene,
            StatKey::Mood => &mut self.mood,
            StatKey::Money => &mut self.money,
            StatKey::Debt => &mut self.debt,
            StatKey::TotalDebt => &mut self.total_debt,
            StatKey::Academic => &mut self.academic,
            StatKey::Corruption => &mut self.corruption,
            StatKey::Sin => &mut self.sin,
            StatKey::Stamina => &mut self.stamina,
            StatKey::Resilience => &mut self.resilience,
            StatKey::Savviness => &mut self.savviness,
            StatKey::Intelligence => &mut self.intelligence,
            StatKey::Appearance => &mut self.appearance,
            StatKey::MotherHealth => &mut self.mother_health,
        }
    }

    /// Overwrite a stat, enforcing the non-negative and whole-currency rules.
    pub(crate) fn set(&mut self, key: StatKey, value: f64) {
        let value = if key.is_currency() {
            whole_units(value)
        } else {
            value
        };
        *self.slot_mut(key) = if value.is_finite() { value.max(0.0) } else { 0.0 };
    }

    /// Convenience wrapper over [`apply_delta`].
    #[must_use]
    pub fn apply(&self, delta: &StatDelta) -> Self {
        apply_delta(self, delta)
    }

    /// True when every value respects the ledger invariants.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        StatKey::ALL.into_iter().all(|key| {
            let value = self.get(key);
            value.is_finite() && value >= 0.0 && (!key.is_currency() || value.fract() == 0.0)
        })
    }
}

/// Apply a partial delta: listed stats become `max(0, stat + delta)`, others are untouched.
#[must_use]
pub fn apply_delta(stats: &Stats, delta: &StatDelta) -> Stats {
    let mut next = *stats;
    for (key, amount) in delta.iter() {
        next.set(key, stats.get(key) + amount);
    }
    next
}

/// Partial map of stat changes. Only listed stats change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatDelta(BTreeMap<StatKey, f64>);

impl StatDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion; repeated keys accumulate.
    #[must_use]
    pub fn with(mut self, key: StatKey, amount: f64) -> Self {
        *self.0.entry(key).or_insert(0.0) += amount;
        self
    }

    #[must_use]
    pub fn get(&self, key: StatKey) -> Option<f64> {
        self.0.get(&key).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKey, f64)> + '_ {
        self.0.iter().map(|(key, amount)| (*key, *amount))
    }

    /// Sum of two deltas, key by key.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        other
            .iter()
            .fold(self.clone(), |acc, (key, amount)| acc.with(key, amount))
    }
}

impl FromIterator<(StatKey, f64)> for StatDelta {
    fn from_iter<I: IntoIterator<Item = (StatKey, f64)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |acc, (key, amount)| acc.with(key, amount))
    }
}

/// Minimum thresholds a choice or transaction demands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Requirements(BTreeMap<StatKey, f64>);

/// One threshold the current stats fail to reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnmetRequirement {
    pub stat: StatKey,
    pub required: f64,
    pub actual: f64,
}

impl Requirements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at_least(mut self, key: StatKey, minimum: f64) -> Self {
        self.0.insert(key, minimum);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKey, f64)> + '_ {
        self.0.iter().map(|(key, minimum)| (*key, *minimum))
    }

    #[must_use]
    pub fn is_met(&self, stats: &Stats) -> bool {
        self.iter().all(|(key, minimum)| stats.get(key) >= minimum)
    }

    #[must_use]
    pub fn unmet(&self, stats: &Stats) -> Vec<UnmetRequirement> {
        self.iter()
            .filter(|(key, minimum)| stats.get(*key) < *minimum)
            .map(|(stat, required)| UnmetRequirement {
                stat,
                required,
                actual: stats.get(stat),
            })
            .collect()
    }
}
