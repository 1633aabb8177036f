//! Blackridge Game Engine
//!
//! Platform-agnostic rules for Blackridge, a thirty-day narrative survival sim
//! set in a failing mining town. This crate owns the ledger, the turn clock,
//! daily events, the phone economy, endings and save slots; rendering and
//! narrative generation live with the caller.

pub(crate) mod constants;
pub mod creation;
pub mod data;
pub mod encounters;
pub mod events;
pub mod forecast;
pub mod gate;
pub mod narrator;
pub mod numbers;
pub mod phone;
pub mod result;
pub mod rules;
pub mod session;
pub mod state;
pub mod stats;
pub mod status;
pub mod storage;
pub mod turn;

use anyhow::Context;
use std::sync::Arc;

// Re-export commonly used types
pub use creation::{Attributes, CreationConfig, CreationError, apply_prologue};
pub use data::{
    Baseline, Catalog, Choice, Contact, Encounter, EncounterSlot, EventId, GrayTask, InboxMessage,
    Location, Product, PrologueOption, SpecialAction, Speaker, catalog,
};
pub use encounters::{available_locations, is_location_available, resolve};
pub use events::{EventConfig, apply_mother_death, derive_stream_seed, roll_daily_events};
pub use forecast::{Forecast, ScoreTier, forecast, predicted_score};
pub use gate::{is_available, unmet_requirements};
pub use narrator::{NarrativeSnapshot, Narrator, NarratorError, describe};
#[cfg(feature = "async")]
pub use narrator::{AsyncNarrator, narrate_with_timeout};
pub use phone::{PhoneConfig, Receipt, Transaction, TransactionRejected, apply_transaction};
pub use result::{Ending, ResultConfig, ResultSummary, result_summary};
pub use rules::{RulesConfig, RulesConfigError};
pub use session::{
    ActiveEncounter, ChoiceSelection, EncounterSource, RunPhase, RunSession, SelectionError,
    TurnReport,
};
pub use state::{Area, History, Ledger, StatusFlags, TimeOfDay};
pub use stats::{Requirements, StatDelta, StatKey, Stats, UnmetRequirement};
pub use status::{StatusConfig, StatusTier, summarize};
pub use storage::{
    GameStorage, JsonFileStorage, MemoryStorage, PersistenceError, SaveSlot, load_slot, save_slot,
};
pub use turn::{TurnConfig, TurnInput, TurnOutcome, advance};

/// Config document name the engine asks its loader for.
pub const RULES_CONFIG_NAME: &str = "rules";

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the content catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Loader backed by the bundled catalog; every config takes its defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl DataLoader for StaticLoader {
    type Error = serde_json::Error;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Ok(catalog().clone())
    }

    fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_value(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// Main game engine for managing runs
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn load_content(&self) -> Result<(Arc<Catalog>, RulesConfig), anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let catalog = self
            .data_loader
            .load_catalog()
            .map_err(Into::<anyhow::Error>::into)
            .context("failed to load catalog")?;
        let rules: RulesConfig = self
            .data_loader
            .load_config(RULES_CONFIG_NAME)
            .map_err(Into::<anyhow::Error>::into)
            .with_context(|| format!("failed to load {RULES_CONFIG_NAME} config"))?;
        rules.validate().context("invalid rules")?;
        Ok((Arc::new(catalog), rules))
    }

    /// Start a fresh run.
    ///
    /// # Errors
    ///
    /// Returns an error if content or rules cannot be loaded, the rules are
    /// invalid, or the attributes break the creation rules.
    pub fn new_session(
        &self,
        attributes: &Attributes,
        seed: u64,
    ) -> Result<RunSession, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let (catalog, rules) = self.load_content()?;
        Ok(RunSession::new(catalog, rules, attributes, seed)?)
    }

    /// Save the session's ledger to the engine's storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn save_session(
        &self,
        session: &RunSession,
    ) -> Result<chrono::DateTime<chrono::Utc>, PersistenceError> {
        session.save_game(&self.storage)
    }

    /// Resume the saved run, rehydrated with freshly loaded content.
    ///
    /// # Errors
    ///
    /// Returns an error if content cannot be loaded or the save is unreadable.
    pub fn load_session(&self) -> Result<Option<RunSession>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let (catalog, rules) = self.load_content()?;
        let mut session = RunSession::resume(catalog, rules, Ledger::default());
        match session.load_game(&self.storage) {
            Ok(_) => Ok(Some(session)),
            Err(PersistenceError::NoSave) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
