use anyhow::{Context, Result};
use std::sync::Arc;

use blackridge_game::{
    Attributes, Catalog, ChoiceSelection, Ledger, RulesConfig, RunSession, TurnReport,
};

use crate::logic::policy::{GameplayStrategy, PlayerPolicy};

/// Turns a run is allowed to spend before the harness gives up on it.
pub const DEFAULT_MAX_TURNS: usize = 240;

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub max_turns: usize,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Snapshot of a resolved encounter.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub day: u32,
    pub time: String,
    pub location: String,
    pub encounter_name: String,
    pub choice_index: usize,
    pub choice_label: String,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// Result of one attempted turn.
#[derive(Debug, Clone)]
pub enum TurnStep {
    Played {
        decision: DecisionRecord,
        report: TurnReport,
    },
    /// Every reachable location was tried and none offered a playable choice.
    Stalled,
    Ended,
}

/// Outcome of the optional pre-travel phone transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneUse {
    Skipped,
    Applied,
    Rejected,
}

/// Core deterministic simulation harness used by the tester.
pub struct SimulationSession {
    run: RunSession,
    max_turns: usize,
    turns_played: usize,
}

impl SimulationSession {
    /// Start a run and play the first prologue option.
    ///
    /// # Errors
    ///
    /// Returns an error if the default attributes break the creation rules or
    /// the opening prologue option is refused.
    pub fn new(
        config: SimulationConfig,
        catalog: Arc<Catalog>,
        rules: RulesConfig,
    ) -> Result<Self> {
        let mut run = RunSession::new(catalog, rules, &Attributes::default(), config.seed)?;
        if let Some(option) = run.catalog().prologue.first().map(|option| option.id.clone()) {
            run.choose_prologue(&option)
                .with_context(|| format!("prologue option {option} was refused"))?;
        }
        Ok(Self {
            run,
            max_turns: config.max_turns,
            turns_played: 0,
        })
    }

    /// Wrap an already-started run, e.g. one just loaded from a save.
    #[must_use]
    pub const fn from_run(run: RunSession, max_turns: usize, turns_played: usize) -> Self {
        Self {
            run,
            max_turns,
            turns_played,
        }
    }

    #[must_use]
    pub const fn run(&self) -> &RunSession {
        &self.run
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        self.run.ledger()
    }

    #[must_use]
    pub const fn turns_played(&self) -> usize {
        self.turns_played
    }

    #[must_use]
    pub fn into_run(self) -> RunSession {
        self.run
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.run.is_ended() || self.turns_played >= self.max_turns
    }

    /// Let the policy use the phone once.
    pub fn use_phone(&mut self, policy: &mut dyn PlayerPolicy) -> PhoneUse {
        let Some(transaction) = policy.pick_transaction(self.run.ledger(), self.run.catalog())
        else {
            return PhoneUse::Skipped;
        };
        match self.run.transact(&transaction) {
            Ok(receipt) => {
                log::debug!("{} phone: {}", policy.name(), receipt.summary);
                PhoneUse::Applied
            }
            Err(err) => {
                log::debug!("{} phone rejected: {err}", policy.name());
                PhoneUse::Rejected
            }
        }
    }

    /// Travel and resolve one choice, trying locations in policy order.
    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> TurnStep {
        if self.run.is_ended() {
            return TurnStep::Ended;
        }
        let mut tried: Vec<String> = Vec::new();
        loop {
            let options: Vec<_> = self
                .run
                .available_locations()
                .into_iter()
                .filter(|loc| !tried.contains(&loc.id))
                .cloned()
                .collect();
            let refs: Vec<_> = options.iter().collect();
            let Some(location) = policy.pick_location(self.run.ledger(), &refs) else {
                return TurnStep::Stalled;
            };
            if self.run.select_location(&location).is_err() {
                return TurnStep::Stalled;
            }
            let decision = {
                let Some(active) = self.run.active_encounter() else {
                    return TurnStep::Stalled;
                };
                let open = self.run.choice_availability();
                policy
                    .pick_choice(self.run.ledger(), &active.encounter, &open)
                    .map(|decision| {
                        let label = active
                            .encounter
                            .choices
                            .get(decision.choice_index)
                            .map(|choice| choice.text.clone())
                            .unwrap_or_default();
                        DecisionRecord {
                            day: self.run.ledger().day,
                            time: self.run.ledger().time.as_str().to_string(),
                            location: location.clone(),
                            encounter_name: active.encounter.title.clone(),
                            choice_index: decision.choice_index,
                            choice_label: label,
                            policy_name: policy.name().to_string(),
                            rationale: decision.rationale,
                        }
                    })
            };
            let Some(decision) = decision else {
                let _ = self.run.select_choice(ChoiceSelection::Cancel);
                tried.push(location);
                continue;
            };
            let selected = self
                .run
                .select_choice(ChoiceSelection::Index(decision.choice_index));
            if !matches!(selected, Ok(Some(_))) {
                let _ = self.run.select_choice(ChoiceSelection::Cancel);
                tried.push(location);
                continue;
            }
            return match self.run.confirm_turn() {
                Ok(report) => {
                    self.turns_played += 1;
                    TurnStep::Played { decision, report }
                }
                Err(_) => TurnStep::Stalled,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackridge_game::{RunPhase, catalog};

    fn session(strategy: GameplayStrategy, seed: u64) -> SimulationSession {
        SimulationSession::new(
            SimulationConfig::new(strategy, seed),
            Arc::new(catalog().clone()),
            RulesConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn prologue_is_played_on_start() {
        let sim = session(GameplayStrategy::Scholar, 1);
        assert_eq!(sim.run().phase(), RunPhase::Explore);
        assert!(sim.ledger().last_history().unwrap().starts_with("[Prologue]"));
    }

    #[test]
    fn catalog_without_prologue_starts_exploring() {
        let mut content = catalog().clone();
        content.prologue.clear();
        let sim = SimulationSession::new(
            SimulationConfig::new(GameplayStrategy::Hustler, 4),
            Arc::new(content),
            RulesConfig::default(),
        )
        .unwrap();
        assert_eq!(sim.run().phase(), RunPhase::Explore);
        assert_eq!(sim.turns_played(), 0);
    }

    #[test]
    fn advance_spends_exactly_one_turn() {
        let mut sim = session(GameplayStrategy::Survivor, 2);
        let mut policy = GameplayStrategy::Survivor.create_policy(2);
        let time = sim.ledger().time;
        let step = sim.advance(policy.as_mut());
        assert!(matches!(step, TurnStep::Played { .. }));
        assert_eq!(sim.turns_played(), 1);
        assert_ne!(sim.ledger().time, time);
        assert_eq!(sim.run().phase(), RunPhase::Explore);
    }

    #[test]
    fn turn_cap_finishes_the_session() {
        let mut sim = SimulationSession::new(
            SimulationConfig::new(GameplayStrategy::Random, 3).with_max_turns(2),
            Arc::new(catalog().clone()),
            RulesConfig::default(),
        )
        .unwrap();
        let mut policy = GameplayStrategy::Random.create_policy(3);
        while !sim.is_finished() {
            sim.advance(policy.as_mut());
        }
        assert_eq!(sim.turns_played(), 2);
    }
}
