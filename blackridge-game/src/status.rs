//! Situational status line derived from the ledger by a fixed priority cascade.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{Area, Ledger, TimeOfDay};

/// Used whenever a narrator produces nothing usable.
pub const FALLBACK_SUMMARY: &str = "You stand at the edge of the ruined town with rust and despair on the wind. \
     The rules here never change: endure, or break.";

const OPENING_DAY: &str = "Thirty days. Thirty thousand. That is the countdown Dao Ge handed you. \
     You stare at your cracked phone and cannot tell which road leads anywhere you survive.";
const CRISIS_DAY: &str = "The hospital's disinfectant seems to drift all the way here. \
     If you cannot raise the surgery money today, you will be the only one left on this map.";
const EVE_DAY: &str = "The last twenty-four hours. Every debt, money or blood, settles tonight. \
     Blackridge is very quiet, like a slope waiting for the avalanche.";

const EXHAUSTED: &str = "Your lungs feel packed with burning cinders and every breath tastes of rust. \
     The map is blurring. If you do not lie down somewhere this may be the last time you read it.";
const BREAKDOWN_PARANOID: &str = "The buildings are breathing. The school windows stare at you like eyes. \
     Dao Ge is laughing right beside your ear though he is nowhere near. Hide, or swallow something.";
const BREAKDOWN_LOST: &str = "Who is talking? Shut up. The words on the map are dancing. \
     You no longer remember where you were going. The mine pit looks so warm from here.";

const FILTHY_DAY: &str = "People cover their noses as you pass. Your sleeves are black with grease \
     and the sour smell of you burns even in the cold. Only the ruins and home will take you like this.";
const FILTHY_NIGHT: &str = "You slink along the walls like a rat. The brighter the neon, the dirtier you feel. \
     The capital's guards would throw you out like this. Maybe the bathhouse can scrub the bad luck off.";

const STARVING: &str = "Your stomach is a pit and the acid is burning. A few coins rattle in your pocket. \
     Bread to stay alive, or the fare to try your luck somewhere else?";
const FREEZING: &str = "The wind climbs through the holes in your shoes and into your bones. \
     No heat packs, no bus fare. In this town poverty kills you before the cold does.";
const DESPERATE: &str = "The phone buzzes again and you do not need to look. Every place on the map \
     is a cash machine or a grave. Anywhere, anything, as long as it pays.";

const EXCESS_CAPITAL: &str = "Blackridge was too small for your appetite. The capital's lights are where you belong. \
     Let the fools still cramming rot in the mud.";
const EXCESS_PREDATOR: &str = "You light a cigarette and the street looks better through the smoke. \
     You have learned the only law here: eat or be eaten. Tonight you go hunting.";
const EXCESS_WARM: &str = "The weight of cash in your hand is a warmth you have never felt. \
     The places on the map that once scared you now only look ridiculous.";

const BURNOUT_SHARP: &str = "The noise around you sits behind a pane of glass. People brawling over a few hundred \
     are pitiful. Just test out of here and it all ends. Right?";
const BURNOUT_DULL: &str = "Everything looks like geometry. Streetlights are conic sections, buildings are solids. \
     Vocabulary rattles in your skull. As long as you are alive you can memorise one more page.";

const MORNING_FLAVOUR: &str = "The sky is not yet light and coal smoke already claws at your throat. \
     Blackridge is waking like a huge grey beast. Where do you look for hope today?";
const DUSK_FLAVOUR: &str = "The setting sun stains the snow red. Another day gone, one step closer to judgement. \
     You stand at the crossroads gripping the little you have left.";
const NIGHT_FLAVOUR: &str = "The streets are empty except for the flicker of the Red Sun dance hall. \
     The wind cuts your face. Going home to sleep is the only free option, if you can sleep at all.";

/// Thresholds for every branch of the status cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "StatusConfig::default_opening_day")]
    pub opening_day: u32,
    /// Only overrides while the mother is alive.
    #[serde(default = "StatusConfig::default_crisis_day")]
    pub crisis_day: u32,
    #[serde(default = "StatusConfig::default_eve_day")]
    pub eve_day: u32,
    #[serde(default = "StatusConfig::default_exhaustion_stamina")]
    pub exhaustion_stamina: f64,
    #[serde(default = "StatusConfig::default_breakdown_mood")]
    pub breakdown_mood: f64,
    #[serde(default = "StatusConfig::default_breakdown_sin")]
    pub breakdown_sin: f64,
    #[serde(default = "StatusConfig::default_squalor_hygiene")]
    pub squalor_hygiene: f64,
    #[serde(default = "StatusConfig::default_destitute_money")]
    pub destitute_money: f64,
    #[serde(default = "StatusConfig::default_starving_satiety")]
    pub starving_satiety: f64,
    #[serde(default = "StatusConfig::default_freezing_stamina")]
    pub freezing_stamina: f64,
    #[serde(default = "StatusConfig::default_excess_sin")]
    pub excess_sin: f64,
    #[serde(default = "StatusConfig::default_excess_money")]
    pub excess_money: f64,
    #[serde(default = "StatusConfig::default_excess_corruption")]
    pub excess_corruption: f64,
    #[serde(default = "StatusConfig::default_burnout_academic")]
    pub burnout_academic: f64,
    #[serde(default = "StatusConfig::default_burnout_mood")]
    pub burnout_mood: f64,
    #[serde(default = "StatusConfig::default_burnout_intelligence")]
    pub burnout_intelligence: f64,
}

impl StatusConfig {
    const fn default_opening_day() -> u32 {
        1
    }

    const fn default_crisis_day() -> u32 {
        20
    }

    const fn default_eve_day() -> u32 {
        29
    }

    const fn default_exhaustion_stamina() -> f64 {
        10.0
    }

    const fn default_breakdown_mood() -> f64 {
        10.0
    }

    const fn default_breakdown_sin() -> f64 {
        30.0
    }

    const fn default_squalor_hygiene() -> f64 {
        20.0
    }

    const fn default_destitute_money() -> f64 {
        50.0
    }

    const fn default_starving_satiety() -> f64 {
        30.0
    }

    const fn default_freezing_stamina() -> f64 {
        40.0
    }

    const fn default_excess_sin() -> f64 {
        60.0
    }

    const fn default_excess_money() -> f64 {
        5_000.0
    }

    const fn default_excess_corruption() -> f64 {
        50.0
    }

    const fn default_burnout_academic() -> f64 {
        80.0
    }

    const fn default_burnout_mood() -> f64 {
        40.0
    }

    const fn default_burnout_intelligence() -> f64 {
        7.0
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `StatusConfigError` when a day is zero or a threshold is negative.
    pub fn validate(&self) -> Result<(), StatusConfigError> {
        for (field, day) in [
            ("opening_day", self.opening_day),
            ("crisis_day", self.crisis_day),
            ("eve_day", self.eve_day),
        ] {
            if day == 0 {
                return Err(StatusConfigError::MinViolation {
                    field,
                    min: 1.0,
                    value: 0.0,
                });
            }
        }
        for (field, value) in [
            ("exhaustion_stamina", self.exhaustion_stamina),
            ("breakdown_mood", self.breakdown_mood),
            ("breakdown_sin", self.breakdown_sin),
            ("squalor_hygiene", self.squalor_hygiene),
            ("destitute_money", self.destitute_money),
            ("starving_satiety", self.starving_satiety),
            ("freezing_stamina", self.freezing_stamina),
            ("excess_sin", self.excess_sin),
            ("excess_money", self.excess_money),
            ("excess_corruption", self.excess_corruption),
            ("burnout_academic", self.burnout_academic),
            ("burnout_mood", self.burnout_mood),
            ("burnout_intelligence", self.burnout_intelligence),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(StatusConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            opening_day: Self::default_opening_day(),
            crisis_day: Self::default_crisis_day(),
            eve_day: Self::default_eve_day(),
            exhaustion_stamina: Self::default_exhaustion_stamina(),
            breakdown_mood: Self::default_breakdown_mood(),
            breakdown_sin: Self::default_breakdown_sin(),
            squalor_hygiene: Self::default_squalor_hygiene(),
            destitute_money: Self::default_destitute_money(),
            starving_satiety: Self::default_starving_satiety(),
            freezing_stamina: Self::default_freezing_stamina(),
            excess_sin: Self::default_excess_sin(),
            excess_money: Self::default_excess_money(),
            excess_corruption: Self::default_excess_corruption(),
            burnout_academic: Self::default_burnout_academic(),
            burnout_mood: Self::default_burnout_mood(),
            burnout_intelligence: Self::default_burnout_intelligence(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StatusConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
}

/// Cascade branch that produced a summary, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusTier {
    DayOverride,
    Crisis,
    Squalor,
    Destitution,
    Excess,
    Burnout,
    Default,
}

fn day_override(ledger: &Ledger, cfg: &StatusConfig) -> Option<&'static str> {
    if ledger.day == cfg.opening_day {
        Some(OPENING_DAY)
    } else if ledger.day == cfg.crisis_day && !ledger.flags.is_mother_dead {
        Some(CRISIS_DAY)
    } else if ledger.day == cfg.eve_day {
        Some(EVE_DAY)
    } else {
        None
    }
}

fn crisis(ledger: &Ledger, cfg: &StatusConfig) -> Option<&'static str> {
    let stats = &ledger.stats;
    if stats.stamina < cfg.exhaustion_stamina {
        return Some(EXHAUSTED);
    }
    if stats.mood < cfg.breakdown_mood {
        return Some(if stats.sin > cfg.breakdown_sin {
            BREAKDOWN_PARANOID
        } else {
            BREAKDOWN_LOST
        });
    }
    None
}

fn squalor(ledger: &Ledger, cfg: &StatusConfig) -> Option<&'static str> {
    (ledger.stats.hygiene < cfg.squalor_hygiene).then(|| {
        if ledger.time.is_daytime() {
            FILTHY_DAY
        } else {
            FILTHY_NIGHT
        }
    })
}

fn destitution(ledger: &Ledger, cfg: &StatusConfig) -> Option<&'static str> {
    let stats = &ledger.stats;
    if stats.money >= cfg.destitute_money || stats.debt <= 0.0 {
        return None;
    }
    Some(if stats.satiety < cfg.starving_satiety {
        STARVING
    } else if stats.stamina < cfg.freezing_stamina {
        FREEZING
    } else {
        DESPERATE
    })
}

fn excess(ledger: &Ledger, cfg: &StatusConfig) -> Option<&'static str> {
    let stats = &ledger.stats;
    if stats.sin <= cfg.excess_sin || stats.money <= cfg.excess_money {
        return None;
    }
    Some(if ledger.area == Area::ProvincialCapital {
        EXCESS_CAPITAL
    } else if stats.corruption > cfg.excess_corruption {
        EXCESS_PREDATOR
    } else {
        EXCESS_WARM
    })
}

fn burnout(ledger: &Ledger, cfg: &StatusConfig) -> Option<&'static str> {
    let stats = &ledger.stats;
    (stats.academic > cfg.burnout_academic && stats.mood < cfg.burnout_mood).then(|| {
        if stats.intelligence > cfg.burnout_intelligence {
            BURNOUT_SHARP
        } else {
            BURNOUT_DULL
        }
    })
}

const fn time_flavour(time: TimeOfDay) -> &'static str {
    match time {
        TimeOfDay::Morning | TimeOfDay::Forenoon => MORNING_FLAVOUR,
        TimeOfDay::Afternoon | TimeOfDay::Dusk => DUSK_FLAVOUR,
        TimeOfDay::Night | TimeOfDay::Midnight => NIGHT_FLAVOUR,
    }
}

type TierCheck = fn(&Ledger, &StatusConfig) -> Option<&'static str>;

const CASCADE: [(StatusTier, TierCheck); 6] = [
    (StatusTier::DayOverride, day_override),
    (StatusTier::Crisis, crisis),
    (StatusTier::Squalor, squalor),
    (StatusTier::Destitution, destitution),
    (StatusTier::Excess, excess),
    (StatusTier::Burnout, burnout),
];

/// Status line for the ledger; the first matching tier wins.
#[must_use]
pub fn summarize(ledger: &Ledger, cfg: &StatusConfig) -> &'static str {
    summarize_with_tier(ledger, cfg).0
}

/// [`summarize`] plus the tier that fired.
#[must_use]
pub fn summarize_with_tier(ledger: &Ledger, cfg: &StatusConfig) -> (&'static str, StatusTier) {
    CASCADE
        .iter()
        .find_map(|(tier, check)| check(ledger, cfg).map(|line| (line, *tier)))
        .unwrap_or((time_flavour(ledger.time), StatusTier::Default))
}
