//! Run session: binds the catalog and rules to one ledger and drives the
//! player action surface through its phases.
//!
//! Every accepted action replaces the ledger wholesale; a rejected one leaves
//! the session exactly as it was.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::constants::{LOG_SESSION, SAVE_SLOT_NAME};
use crate::creation::{Attributes, CreationError, apply_prologue};
use crate::data::{Catalog, Choice, Encounter, EventId, Location, SpecialAction};
use crate::encounters::{available_locations, is_location_available, resolve};
use crate::events::{apply_mother_death, resolve_event, roll_daily_events};
use crate::forecast::{Forecast, forecast};
use crate::gate::{is_available, unmet_requirements};
use crate::narrator::{NarrativeSnapshot, Narrator, describe};
use crate::phone::{Receipt, Transaction, TransactionRejected, apply_transaction};
use crate::result::{ResultSummary, result_summary};
use crate::rules::RulesConfig;
use crate::state::Ledger;
use crate::stats::{StatDelta, UnmetRequirement};
use crate::status::summarize;
use crate::storage::{GameStorage, PersistenceError, SaveSlot, load_slot, save_slot};
use crate::turn::{TurnInput, TurnOutcome, advance};

/// Where the run is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Waiting for a prologue option.
    Prologue,
    /// Choosing a location.
    Explore,
    /// An encounter is open and waiting for a choice.
    Encounter,
    /// A choice is picked and waiting for confirmation.
    Resolving,
    /// The final day is spent; only restart and load remain.
    Ended,
}

/// What put the current encounter on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncounterSource {
    Location(String),
    Event(EventId),
    Faint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEncounter {
    pub source: EncounterSource,
    pub encounter: Encounter,
}

/// Player input for an open encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSelection {
    Index(usize),
    Cancel,
}

impl ChoiceSelection {
    /// Negative raw indices mean cancel.
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        usize::try_from(raw).map_or(Self::Cancel, Self::Index)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectionError {
    #[error("{action} is not allowed during {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: RunPhase,
    },
    #[error("unknown location {0}")]
    UnknownLocation(String),
    #[error("location {0} cannot be reached right now")]
    LocationUnavailable(String),
    #[error("choice {index} is out of range ({len} choices)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("choice {index} is locked")]
    ChoiceLocked {
        index: usize,
        unmet: Vec<UnmetRequirement>,
    },
    #[error("no choice is waiting for confirmation")]
    NothingToConfirm,
    #[error("unknown prologue option {0}")]
    UnknownPrologue(String),
    #[error(transparent)]
    Transaction(#[from] TransactionRejected),
}

/// What a confirmed turn did.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub label: String,
    pub impact: String,
    pub deltas: StatDelta,
    pub new_day: bool,
    pub queued_event: Option<EventId>,
    pub ended: bool,
}

#[derive(Debug, Clone)]
pub struct RunSession {
    catalog: Arc<Catalog>,
    rules: RulesConfig,
    opening: Ledger,
    opening_phase: RunPhase,
    ledger: Ledger,
    phase: RunPhase,
    active: Option<ActiveEncounter>,
    pending: Option<Choice>,
    result: Option<ResultSummary>,
}

impl RunSession {
    /// Start a run from the catalog baseline and the player's attributes.
    ///
    /// # Errors
    ///
    /// Returns `CreationError` when the attributes break the creation rules.
    pub fn new(
        catalog: Arc<Catalog>,
        rules: RulesConfig,
        attributes: &Attributes,
        seed: u64,
    ) -> Result<Self, CreationError> {
        let ledger = Ledger::new_run(&catalog.baseline, attributes, &rules.creation, seed)?;
        let phase = if catalog.prologue.is_empty() {
            RunPhase::Explore
        } else {
            RunPhase::Prologue
        };
        log::debug!(target: LOG_SESSION, "new run with seed {seed:#x}");
        Ok(Self {
            catalog,
            rules,
            opening: ledger.clone(),
            opening_phase: phase,
            ledger,
            phase,
            active: None,
            pending: None,
            result: None,
        })
    }

    /// Continue from an existing ledger, exploring.
    #[must_use]
    pub fn resume(catalog: Arc<Catalog>, rules: RulesConfig, ledger: Ledger) -> Self {
        Self {
            catalog,
            rules,
            opening: ledger.clone(),
            opening_phase: RunPhase::Explore,
            ledger,
            phase: RunPhase::Explore,
            active: None,
            pending: None,
            result: None,
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    #[must_use]
    pub const fn active_encounter(&self) -> Option<&ActiveEncounter> {
        self.active.as_ref()
    }

    #[must_use]
    pub const fn pending_choice(&self) -> Option<&Choice> {
        self.pending.as_ref()
    }

    /// Ending summary once the run has ended.
    #[must_use]
    pub const fn result(&self) -> Option<&ResultSummary> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.phase == RunPhase::Ended
    }

    #[must_use]
    pub fn available_locations(&self) -> Vec<&Location> {
        available_locations(&self.ledger, &self.catalog)
    }

    /// Availability of each choice in the open encounter, in order.
    #[must_use]
    pub fn choice_availability(&self) -> Vec<bool> {
        self.active.as_ref().map_or_else(Vec::new, |active| {
            active
                .encounter
                .choices
                .iter()
                .map(|choice| is_available(choice, &self.ledger.stats))
                .collect()
        })
    }

    fn expect_phase(&self, action: &'static str, phase: RunPhase) -> Result<(), SelectionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SelectionError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    /// Pick one of the catalog's prologue options.
    ///
    /// # Errors
    ///
    /// Rejected outside the prologue or for an unknown option.
    pub fn choose_prologue(&mut self, option_id: &str) -> Result<String, SelectionError> {
        self.expect_phase("choose_prologue", RunPhase::Prologue)?;
        let option = self
            .catalog
            .prologue_option(option_id)
            .ok_or_else(|| SelectionError::UnknownPrologue(option_id.to_string()))?;
        self.ledger = apply_prologue(&self.ledger, option);
        self.phase = RunPhase::Explore;
        Ok(option.outcome.clone())
    }

    fn event_encounter(&self, next: &mut Ledger) -> Option<ActiveEncounter> {
        let event = next.pending_event?;
        if let Some(encounter) = self.catalog.event(event) {
            return Some(ActiveEncounter {
                source: EncounterSource::Event(event),
                encounter: encounter.clone(),
            });
        }
        log::warn!(target: LOG_SESSION, "event {event} has no encounter, dropping it");
        resolve_event(next, event);
        None
    }

    /// Travel to a location and open whatever is waiting there.
    ///
    /// A queued event pre-empts the location's own encounter, and a player
    /// with no stamina left faints instead.
    ///
    /// # Errors
    ///
    /// Rejected outside exploration, or for an unknown or unreachable location.
    pub fn select_location(&mut self, location_id: &str) -> Result<&Encounter, SelectionError> {
        self.expect_phase("select_location", RunPhase::Explore)?;
        let location = self
            .catalog
            .location(location_id)
            .ok_or_else(|| SelectionError::UnknownLocation(location_id.to_string()))?;
        if !is_location_available(location, &self.ledger) {
            return Err(SelectionError::LocationUnavailable(location_id.to_string()));
        }

        let mut next = self.ledger.clone();
        next.location = location.id.clone();
        next.visited.insert(location.id.clone());

        let active = if let Some(event) = self.event_encounter(&mut next) {
            event
        } else if next.stats.stamina <= 0.0 {
            ActiveEncounter {
                source: EncounterSource::Faint,
                encounter: self.catalog.faint_encounter(),
            }
        } else {
            ActiveEncounter {
                source: EncounterSource::Location(location.id.clone()),
                encounter: resolve(&location.id, next.time, &self.catalog),
            }
        };

        self.ledger = next;
        self.phase = RunPhase::Encounter;
        Ok(&self.active.insert(active).encounter)
    }

    /// Pick a choice from the open encounter, or back out of it.
    ///
    /// Returns `None` when the selection cancels (explicit cancel or a
    /// return-marked choice); no turn is spent.
    ///
    /// # Errors
    ///
    /// Rejected outside an encounter, for an out-of-range index, or for a
    /// choice whose requirements are unmet.
    pub fn select_choice(
        &mut self,
        selection: ChoiceSelection,
    ) -> Result<Option<&Choice>, SelectionError> {
        self.expect_phase("select_choice", RunPhase::Encounter)?;
        let Some(active) = self.active.as_ref() else {
            self.phase = RunPhase::Explore;
            return Ok(None);
        };
        let ChoiceSelection::Index(index) = selection else {
            self.leave_encounter();
            return Ok(None);
        };
        let choices = &active.encounter.choices;
        let choice = choices.get(index).ok_or(SelectionError::IndexOutOfRange {
            index,
            len: choices.len(),
        })?;
        if !is_available(choice, &self.ledger.stats) {
            return Err(SelectionError::ChoiceLocked {
                index,
                unmet: unmet_requirements(choice, &self.ledger.stats),
            });
        }
        if choice.is_return {
            self.leave_encounter();
            return Ok(None);
        }
        let picked = choice.clone();
        self.phase = RunPhase::Resolving;
        Ok(Some(&*self.pending.insert(picked)))
    }

    fn leave_encounter(&mut self) {
        self.active = None;
        self.pending = None;
        self.phase = RunPhase::Explore;
    }

    fn turn_input(&self, choice: &Choice) -> TurnInput {
        let mut input = TurnInput::from(choice);
        if input.destination.is_none() {
            input.destination = match choice.special {
                Some(SpecialAction::Trapped) => self
                    .catalog
                    .locations
                    .iter()
                    .find(|loc| loc.is_trap && loc.area == self.ledger.area)
                    .map(|loc| loc.id.clone()),
                Some(SpecialAction::Escape) => {
                    Some(self.ledger.area.arrival_location().to_string())
                }
                _ => None,
            };
        }
        input
    }

    /// Spend a turn on the pending choice.
    ///
    /// # Errors
    ///
    /// Rejected unless a choice is waiting for confirmation.
    pub fn confirm_turn(&mut self) -> Result<TurnReport, SelectionError> {
        self.expect_phase("confirm_turn", RunPhase::Resolving)?;
        let Some(choice) = self.pending.take() else {
            return Err(SelectionError::NothingToConfirm);
        };
        let source = self.active.take().map(|active| active.source);
        let input = self.turn_input(&choice);
        let mut report = TurnReport {
            label: choice.text.clone(),
            impact: choice.impact.clone(),
            deltas: choice.deltas.clone(),
            new_day: false,
            queued_event: None,
            ended: false,
        };

        match advance(&self.ledger, &input, &self.rules.turn) {
            TurnOutcome::Ended(final_ledger) => {
                let summary = result_summary(&final_ledger, &self.rules.result);
                log::debug!(
                    target: LOG_SESSION,
                    "run ended on day {} with ending {}",
                    final_ledger.day,
                    summary.ending
                );
                self.ledger = final_ledger;
                self.result = Some(summary);
                self.phase = RunPhase::Ended;
                report.ended = true;
            }
            TurnOutcome::Continued(mut next) => {
                apply_mother_death(&mut next);
                if let Some(EncounterSource::Event(event)) = source {
                    resolve_event(&mut next, event);
                }
                if next.day != self.ledger.day {
                    report.new_day = true;
                    next = roll_daily_events(&next, &self.rules.events);
                    report.queued_event = next.pending_event;
                }
                self.ledger = next;
                self.phase = RunPhase::Explore;
            }
        }
        Ok(report)
    }

    /// Run a phone transaction out of turn.
    ///
    /// # Errors
    ///
    /// Rejected outside exploration or when the transaction itself is refused.
    pub fn transact(&mut self, transaction: &Transaction) -> Result<Receipt, SelectionError> {
        self.expect_phase("transact", RunPhase::Explore)?;
        let (next, receipt) =
            apply_transaction(&self.ledger, transaction, &self.catalog, &self.rules.phone)?;
        self.ledger = next;
        Ok(receipt)
    }

    /// Write the ledger to the save slot, stamped with the current time. An
    /// ended run is saved as ended and loads back as ended.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Backend` when the write fails.
    pub fn save_game<S: GameStorage>(&self, storage: &S) -> Result<DateTime<Utc>, PersistenceError> {
        let now = Utc::now();
        self.save_game_at(storage, now)?;
        Ok(now)
    }

    /// [`Self::save_game`] with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Backend` when the write fails.
    pub fn save_game_at<S: GameStorage>(
        &self,
        storage: &S,
        at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let slot = SaveSlot::new(self.ledger.clone(), at).with_ended(self.is_ended());
        save_slot(storage, SAVE_SLOT_NAME, &slot)
    }

    /// Replace the ledger with the saved one and return to exploration, or
    /// to the ended state with its result when the save was of a finished run.
    ///
    /// # Errors
    ///
    /// `NoSave` or `Unreadable` leave the session untouched.
    pub fn load_game<S: GameStorage>(&mut self, storage: &S) -> Result<DateTime<Utc>, PersistenceError> {
        let slot = load_slot(storage, SAVE_SLOT_NAME)?;
        self.ledger = slot.ledger;
        self.active = None;
        self.pending = None;
        if slot.ended {
            self.result = Some(result_summary(&self.ledger, &self.rules.result));
            self.phase = RunPhase::Ended;
        } else {
            self.result = None;
            self.phase = RunPhase::Explore;
        }
        log::debug!(target: LOG_SESSION, "loaded save from day {}", self.ledger.day);
        Ok(slot.last_saved)
    }

    /// Throw the run away and start again from the opening ledger.
    pub fn restart(&mut self) {
        self.ledger = self.opening.clone();
        self.active = None;
        self.pending = None;
        self.result = None;
        self.phase = self.opening_phase;
    }

    #[must_use]
    pub fn status_summary(&self) -> &'static str {
        summarize(&self.ledger, &self.rules.status)
    }

    #[must_use]
    pub fn forecast(&self) -> Forecast {
        forecast(&self.ledger.stats)
    }

    /// Narrated line for the map screen; the status summary stands in when
    /// no narrator is attached.
    #[must_use]
    pub fn narrate(&self, narrator: Option<&dyn Narrator>) -> String {
        narrator.map_or_else(
            || self.status_summary().to_string(),
            |narrator| {
                describe(
                    narrator,
                    &NarrativeSnapshot::from_ledger(&self.ledger, &self.catalog),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog;
    use crate::narrator::{FAILURE_FALLBACK, NarratorError};
    use crate::state::{Area, TimeOfDay};
    use crate::storage::MemoryStorage;

    fn session(seed: u64) -> RunSession {
        RunSession::new(
            Arc::new(catalog().clone()),
            RulesConfig::default(),
            &Attributes::default(),
            seed,
        )
        .unwrap()
    }

    fn exploring(seed: u64) -> RunSession {
        let mut run = session(seed);
        run.choose_prologue("A").unwrap();
        run
    }

    fn first_open_choice(run: &RunSession) -> usize {
        run.choice_availability()
            .iter()
            .enumerate()
            .find(|(idx, open)| {
                **open
                    && !run.active_encounter().unwrap().encounter.choices[*idx].is_return
            })
            .map(|(idx, _)| idx)
            .unwrap()
    }

    #[test]
    fn prologue_gates_exploration() {
        let mut run = session(1);
        assert_eq!(run.phase(), RunPhase::Prologue);
        assert!(matches!(
            run.select_location("HOME"),
            Err(SelectionError::WrongPhase { .. })
        ));
        assert!(run.choose_prologue("Z").is_err());
        run.choose_prologue("B").unwrap();
        assert_eq!(run.phase(), RunPhase::Explore);
    }

    #[test]
    fn full_turn_cycle_advances_clock() {
        let mut run = exploring(2);
        let before = run.ledger().clone();
        run.select_location("SCHOOL").unwrap();
        assert_eq!(run.phase(), RunPhase::Encounter);
        let idx = first_open_choice(&run);
        run.select_choice(ChoiceSelection::Index(idx)).unwrap();
        assert_eq!(run.phase(), RunPhase::Resolving);
        let report = run.confirm_turn().unwrap();
        assert!(!report.ended);
        assert_eq!(run.phase(), RunPhase::Explore);
        assert_eq!(run.ledger().time, TimeOfDay::Forenoon);
        assert_eq!(
            run.ledger().history.last().map(str::to_string),
            Some(format!("[Day 1] {}", report.label))
        );
        assert_ne!(run.ledger(), &before);
    }

    #[test]
    fn cancel_spends_no_turn() {
        let mut run = exploring(3);
        run.select_location("HOME").unwrap();
        let time = run.ledger().time;
        assert_eq!(run.select_choice(ChoiceSelection::from_raw(-1)).unwrap(), None);
        assert_eq!(run.phase(), RunPhase::Explore);
        assert_eq!(run.ledger().time, time);
    }

    #[test]
    fn invalid_selections_leave_state_alone() {
        let mut run = exploring(4);
        assert!(matches!(
            run.select_location("NOWHERE"),
            Err(SelectionError::UnknownLocation(_))
        ));
        assert!(matches!(
            run.select_location("SQUARE"),
            Err(SelectionError::LocationUnavailable(_))
        ));
        run.select_location("HOME").unwrap();
        let snapshot = run.ledger().clone();
        assert!(matches!(
            run.select_choice(ChoiceSelection::Index(99)),
            Err(SelectionError::IndexOutOfRange { .. })
        ));
        assert_eq!(run.ledger(), &snapshot);
        assert_eq!(run.phase(), RunPhase::Encounter);
        assert!(matches!(
            run.confirm_turn(),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn exhausted_player_faints() {
        let mut run = exploring(5);
        run.ledger.stats.stamina = 0.0;
        run.select_location("HOME").unwrap();
        assert_eq!(
            run.active_encounter().map(|active| active.source.clone()),
            Some(EncounterSource::Faint)
        );
    }

    #[test]
    fn queued_event_preempts_location() {
        let mut run = exploring(6);
        run.ledger.pending_event = Some(EventId::Crackdown);
        run.select_location("HOME").unwrap();
        assert_eq!(
            run.active_encounter().map(|active| active.source.clone()),
            Some(EncounterSource::Event(EventId::Crackdown))
        );
        run.select_choice(ChoiceSelection::Index(0)).unwrap();
        run.confirm_turn().unwrap();
        assert_eq!(run.ledger().pending_event, None);
        assert!(run.ledger().has_resolved(EventId::Crackdown));
    }

    #[test]
    fn save_load_restores_ledger() {
        let storage = MemoryStorage::default();
        let mut run = exploring(7);
        assert_eq!(run.load_game(&storage), Err(PersistenceError::NoSave));
        run.save_game(&storage).unwrap();
        let saved = run.ledger().clone();

        run.select_location("HOME").unwrap();
        let idx = first_open_choice(&run);
        run.select_choice(ChoiceSelection::Index(idx)).unwrap();
        run.confirm_turn().unwrap();
        assert_ne!(run.ledger(), &saved);

        run.load_game(&storage).unwrap();
        assert_eq!(run.ledger(), &saved);
        assert_eq!(run.phase(), RunPhase::Explore);
    }

    #[test]
    fn ended_run_stays_ended_after_reload() {
        let storage = MemoryStorage::default();
        let mut run = exploring(12);
        run.ledger.day = 30;
        run.ledger.time = TimeOfDay::Midnight;
        run.select_location("HOME").unwrap();
        let idx = first_open_choice(&run);
        run.select_choice(ChoiceSelection::Index(idx)).unwrap();
        assert!(run.confirm_turn().unwrap().ended);
        let ended_ledger = run.ledger().clone();
        let ending = run.result().cloned();

        run.save_game(&storage).unwrap();
        run.restart();
        run.choose_prologue("A").unwrap();
        run.load_game(&storage).unwrap();

        assert!(run.is_ended());
        assert_eq!(run.ledger(), &ended_ledger);
        assert_eq!(run.result().cloned(), ending);
        assert!(matches!(
            run.select_location("HOME"),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn live_save_loads_back_into_exploration() {
        let storage = MemoryStorage::default();
        let mut run = exploring(13);
        run.ledger.day = 30;
        run.ledger.time = TimeOfDay::Midnight;
        run.save_game(&storage).unwrap();
        run.load_game(&storage).unwrap();
        assert_eq!(run.phase(), RunPhase::Explore);
        assert!(run.result().is_none());
    }

    #[test]
    fn transactions_only_while_exploring() {
        let mut run = exploring(8);
        let money = run.ledger().stats.money;
        run.transact(&Transaction::Borrow(1_000)).unwrap();
        assert!((run.ledger().stats.money - money - 1_000.0).abs() < f64::EPSILON);
        run.select_location("HOME").unwrap();
        assert!(matches!(
            run.transact(&Transaction::WatchVideos),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn train_ride_moves_to_capital() {
        let mut run = exploring(9);
        run.ledger.stats.money = 1_000.0;
        run.select_location("STATION").unwrap();
        let idx = run
            .active_encounter()
            .unwrap()
            .encounter
            .choices
            .iter()
            .position(|choice| choice.new_area == Some(Area::ProvincialCapital))
            .unwrap();
        run.select_choice(ChoiceSelection::Index(idx)).unwrap();
        run.confirm_turn().unwrap();
        assert_eq!(run.ledger().area, Area::ProvincialCapital);
        assert_eq!(run.ledger().location, "SQUARE");
    }

    #[test]
    fn restart_returns_to_prologue() {
        let mut run = exploring(10);
        run.transact(&Transaction::WatchVideos).unwrap();
        run.restart();
        assert_eq!(run.phase(), RunPhase::Prologue);
        assert_eq!(run.ledger(), &session(10).ledger);
    }

    #[test]
    fn narrate_falls_back_without_failing() {
        let run = exploring(11);
        assert_eq!(run.narrate(None), run.status_summary());
        let broken = |_: &NarrativeSnapshot| -> Result<String, NarratorError> {
            Err(NarratorError::Timeout)
        };
        assert_eq!(run.narrate(Some(&broken)), FAILURE_FALLBACK);
    }
}
