//! Bundle of every tunable rule set a run consults.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::creation::{CreationConfig, CreationError};
use crate::events::{EventConfig, EventConfigError};
use crate::phone::{PhoneConfig, PhoneConfigError};
use crate::result::{ResultConfig, ResultConfigError};
use crate::status::{StatusConfig, StatusConfigError};
use crate::turn::{TurnConfig, TurnConfigError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub phone: PhoneConfig,
    #[serde(default)]
    pub creation: CreationConfig,
    #[serde(default)]
    pub result: ResultConfig,
}

#[derive(Debug, Error, PartialEq)]
pub enum RulesConfigError {
    #[error("turn rules: {0}")]
    Turn(#[from] TurnConfigError),
    #[error("status rules: {0}")]
    Status(#[from] StatusConfigError),
    #[error("event rules: {0}")]
    Events(#[from] EventConfigError),
    #[error("phone rules: {0}")]
    Phone(#[from] PhoneConfigError),
    #[error("creation rules: {0}")]
    Creation(#[from] CreationError),
    #[error("result rules: {0}")]
    Result(#[from] ResultConfigError),
}

impl RulesConfig {
    /// Parse a rules document; missing sections and fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first section that fails its own validation.
    pub fn validate(&self) -> Result<(), RulesConfigError> {
        self.turn.validate()?;
        self.status.validate()?;
        self.events.validate()?;
        self.phone.validate()?;
        self.creation.validate()?;
        self.result.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let rules =
            RulesConfig::from_json(r#"{ "turn": { "daily_interest_rate": 0.2 }, "events": {} }"#)
                .unwrap();
        assert!((rules.turn.daily_interest_rate - 0.2).abs() < f64::EPSILON);
        assert!((rules.turn.satiety_decay - 5.0).abs() < f64::EPSILON);
        assert_eq!(rules.events, EventConfig::default());
    }

    #[test]
    fn invalid_section_is_named() {
        let rules = RulesConfig {
            events: EventConfig {
                flu_chance: 2.0,
                ..EventConfig::default()
            },
            ..RulesConfig::default()
        };
        assert!(matches!(rules.validate(), Err(RulesConfigError::Events(_))));
    }
}
