//! Entrance-exam score forecast.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    FORECAST_ACADEMIC_WEIGHT, FORECAST_INTELLIGENCE_WEIGHT, FORECAST_MAX_SCORE,
    FORECAST_SIN_WEIGHT,
};
use crate::numbers::floor_f64_to_i64;
use crate::stats::Stats;

/// Where a predicted score would land, worst first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    #[default]
    Drifter,
    TradeSchool,
    PrivateCollege,
    Undergraduate,
    KeyUniversity,
    Elite,
}

impl ScoreTier {
    /// Lower score bound of each tier, best first.
    const BANDS: [(i64, Self); 5] = [
        (680, Self::Elite),
        (610, Self::KeyUniversity),
        (530, Self::Undergraduate),
        (450, Self::PrivateCollege),
        (380, Self::TradeSchool),
    ];

    #[must_use]
    pub fn for_score(score: i64) -> Self {
        Self::BANDS
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map_or(Self::Drifter, |(_, tier)| *tier)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Elite => "Elite league / targeted civil track",
            Self::KeyUniversity => "Key university",
            Self::Undergraduate => "Provincial undergraduate",
            Self::PrivateCollege => "Private college / vocational",
            Self::TradeSchool => "Trade school / labour market",
            Self::Drifter => "Drifting / dead end",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score and tier pair shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    pub score: i64,
    pub tier: ScoreTier,
}

/// `clamp(floor(academic * 2.8 + intelligence * 14 - sin * 1.5), 0, 750)`.
#[must_use]
pub fn predicted_score(stats: &Stats) -> i64 {
    let raw = stats.academic * FORECAST_ACADEMIC_WEIGHT
        + stats.intelligence * FORECAST_INTELLIGENCE_WEIGHT
        - stats.sin * FORECAST_SIN_WEIGHT;
    floor_f64_to_i64(raw).clamp(0, FORECAST_MAX_SCORE)
}

#[must_use]
pub fn forecast(stats: &Stats) -> Forecast {
    let score = predicted_score(stats);
    Forecast {
        score,
        tier: ScoreTier::for_score(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_follows_weights() {
        let stats = Stats {
            academic: 100.0,
            intelligence: 10.0,
            sin: 20.0,
            ..Stats::default()
        };
        // 280 + 140 - 30
        assert_eq!(predicted_score(&stats), 390);
        assert_eq!(forecast(&stats).tier, ScoreTier::TradeSchool);
    }

    #[test]
    fn score_is_clamped_both_ways() {
        let saint = Stats {
            academic: 500.0,
            intelligence: 10.0,
            ..Stats::default()
        };
        assert_eq!(predicted_score(&saint), 750);
        let sinner = Stats {
            sin: 100.0,
            ..Stats::default()
        };
        assert_eq!(predicted_score(&sinner), 0);
    }

    #[test]
    fn bands_are_inclusive_lower_bounds() {
        assert_eq!(ScoreTier::for_score(680), ScoreTier::Elite);
        assert_eq!(ScoreTier::for_score(679), ScoreTier::KeyUniversity);
        assert_eq!(ScoreTier::for_score(530), ScoreTier::Undergraduate);
        assert_eq!(ScoreTier::for_score(450), ScoreTier::PrivateCollege);
        assert_eq!(ScoreTier::for_score(379), ScoreTier::Drifter);
        assert!(ScoreTier::Elite > ScoreTier::Undergraduate);
    }
}
