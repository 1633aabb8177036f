//! Centralized tuning defaults and log keys for Blackridge game logic.
//!
//! Per-component configuration structs take their defaults from here so the
//! balance numbers can be read in one place. Runtime overrides go through the
//! config structs, never through these constants directly.

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TURN: &str = "blackridge::turn";
pub(crate) const LOG_EVENTS: &str = "blackridge::events";
pub(crate) const LOG_PHONE: &str = "blackridge::phone";
pub(crate) const LOG_NARRATOR: &str = "blackridge::narrator";
pub(crate) const LOG_STORAGE: &str = "blackridge::storage";
pub(crate) const LOG_SESSION: &str = "blackridge::session";

// Run shape ----------------------------------------------------------------
pub(crate) const FINAL_DAY: u32 = 30;
pub(crate) const HISTORY_LIMIT: usize = 30;
pub(crate) const SAVE_SLOT_NAME: &str = "blackridge_save";
pub(crate) const SAVE_FORMAT_VERSION: u32 = 1;

// Turn decay ---------------------------------------------------------------
pub(crate) const SATIETY_DECAY_PER_TURN: f64 = 5.0;
pub(crate) const MOOD_DECAY_PER_TURN: f64 = 3.0;
pub(crate) const MOTHER_DECAY_PER_TURN: f64 = 1.0;
pub(crate) const FLU_STAMINA_DRAIN: f64 = 5.0;
pub(crate) const DAILY_INTEREST_RATE: f64 = 0.08;

// Character creation -------------------------------------------------------
pub(crate) const ATTRIBUTE_POINT_BUDGET: u8 = 20;
pub(crate) const ATTRIBUTE_MIN: u8 = 1;
pub(crate) const ATTRIBUTE_MAX: u8 = 10;
pub(crate) const ATTRIBUTE_POOL_SCALE: f64 = 10.0;

// Special-action trust adjustments -----------------------------------------
pub(crate) const CHEN_EXPLAIN_TRUST_GAIN: f64 = 10.0;

// Forecast -----------------------------------------------------------------
pub(crate) const FORECAST_ACADEMIC_WEIGHT: f64 = 2.8;
pub(crate) const FORECAST_INTELLIGENCE_WEIGHT: f64 = 14.0;
pub(crate) const FORECAST_SIN_WEIGHT: f64 = 1.5;
pub(crate) const FORECAST_MAX_SCORE: i64 = 750;
