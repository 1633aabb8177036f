use anyhow::Result;
use std::sync::Arc;

use blackridge_game::{
    Catalog, GameStorage, Ledger, MemoryStorage, PersistenceError, ResultSummary, RulesConfig,
    RunSession, catalog,
};

use crate::logic::policy::GameplayStrategy;
use crate::logic::simulation::{
    DEFAULT_MAX_TURNS, DecisionRecord, PhoneUse, SimulationConfig, SimulationSession, TurnStep,
};

/// Content and rules shared by every simulated run.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub catalog: Arc<Catalog>,
    pub rules: RulesConfig,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        Self {
            catalog: Arc::new(catalog().clone()),
            rules: RulesConfig::default(),
        }
    }
}

/// What to play and what to assert afterwards.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: Option<usize>,
    /// Save after this many turns, then replay the rest from the save.
    pub resume_after: Option<usize>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: None,
            resume_after: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub const fn with_resume_after(mut self, turns: usize) -> Self {
        self.resume_after = Some(turns);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Invariant observations gathered turn by turn.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub max_history_len: usize,
    pub stats_always_well_formed: bool,
    pub days_never_regressed: bool,
    pub phone_applied: usize,
    pub phone_rejected: usize,
    pub events_seen: usize,
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub decisions: Vec<DecisionRecord>,
    pub metrics: RunMetrics,
    pub final_ledger: Ledger,
    pub result: Option<ResultSummary>,
    pub game_ended: bool,
    pub stalled: bool,
    /// Whether the run replayed from its mid-run save matched; `None` when not checked.
    pub resume_matched: Option<bool>,
}

impl SimulationSummary {
    #[must_use]
    pub fn ending_label(&self) -> String {
        self.result
            .as_ref()
            .map_or_else(|| "none".to_string(), |summary| summary.ending.to_string())
    }
}

/// Headless deterministic runner for the core game logic.
#[derive(Clone)]
pub struct GameTester {
    assets: Arc<TesterAssets>,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { assets, verbose }
    }

    #[must_use]
    pub fn try_new(verbose: bool) -> Self {
        Self::new(Arc::new(TesterAssets::load_default()), verbose)
    }

    fn start(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSession> {
        let config = SimulationConfig::new(plan.strategy, seed)
            .with_max_turns(plan.max_turns.unwrap_or(DEFAULT_MAX_TURNS));
        SimulationSession::new(
            config,
            Arc::clone(&self.assets.catalog),
            self.assets.rules.clone(),
        )
    }

    /// Play a plan to completion and collect its summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be created or the mid-run save fails.
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let mut session = self.start(plan, seed)?;
        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = RunMetrics {
            stats_always_well_formed: true,
            days_never_regressed: true,
            ..RunMetrics::default()
        };
        let mut decisions = Vec::new();
        let mut stalled = false;
        let storage = MemoryStorage::default();
        let mut saved_at: Option<usize> = None;

        while !session.is_finished() {
            if plan.resume_after == Some(session.turns_played()) && saved_at.is_none() {
                session.run().save_game(&storage)?;
                saved_at = Some(decisions.len());
            }
            match session.use_phone(policy.as_mut()) {
                PhoneUse::Applied => metrics.phone_applied += 1,
                PhoneUse::Rejected => metrics.phone_rejected += 1,
                PhoneUse::Skipped => {}
            }
            let day_before = session.ledger().day;
            match session.advance(policy.as_mut()) {
                TurnStep::Played { decision, report } => {
                    if self.verbose {
                        log::info!(
                            "day {} {}: {} -> {}",
                            decision.day,
                            decision.time,
                            decision.location,
                            decision.choice_label
                        );
                    }
                    if report.queued_event.is_some() {
                        metrics.events_seen += 1;
                    }
                    decisions.push(decision);
                }
                TurnStep::Stalled => {
                    stalled = true;
                    break;
                }
                TurnStep::Ended => break,
            }
            let ledger = session.ledger();
            metrics.max_history_len = metrics.max_history_len.max(ledger.history.len());
            metrics.stats_always_well_formed &= ledger.stats.is_well_formed();
            metrics.days_never_regressed &= ledger.day >= day_before;
        }

        let resume_matched = match saved_at {
            Some(offset) => Some(self.replay_from_save(
                plan,
                seed,
                &storage,
                &decisions[offset..],
                session.ledger(),
            )?),
            None => None,
        };

        if self.verbose {
            log::info!(
                "seed {seed}: {} decisions, phone {} applied / {} rejected, {} events",
                decisions.len(),
                metrics.phone_applied,
                metrics.phone_rejected,
                metrics.events_seen
            );
        }
        let run = session.into_run();
        Ok(SimulationSummary {
            seed,
            strategy: plan.strategy,
            decisions,
            metrics,
            final_ledger: run.ledger().clone(),
            result: run.result().cloned(),
            game_ended: run.is_ended(),
            stalled,
            resume_matched,
        })
    }

    fn replay_from_save<S: GameStorage>(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        storage: &S,
        expected: &[DecisionRecord],
        expected_final: &Ledger,
    ) -> Result<bool> {
        let mut run = RunSession::resume(
            Arc::clone(&self.assets.catalog),
            self.assets.rules.clone(),
            Ledger::default(),
        );
        match run.load_game(storage) {
            Ok(_) => {}
            Err(PersistenceError::NoSave) => return Ok(false),
            Err(err) => return Err(err.into()),
        }
        let max_turns = plan.max_turns.unwrap_or(DEFAULT_MAX_TURNS);
        let played = plan.resume_after.unwrap_or_default();
        let mut session = SimulationSession::from_run(run, max_turns, played);
        let mut policy = plan.strategy.create_policy(seed);
        let mut replayed = Vec::new();
        while !session.is_finished() {
            session.use_phone(policy.as_mut());
            match session.advance(policy.as_mut()) {
                TurnStep::Played { decision, .. } => replayed.push(decision),
                TurnStep::Stalled | TurnStep::Ended => break,
            }
        }
        Ok(replayed == expected && session.ledger() == expected_final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survivor_plays_to_the_final_day() {
        let tester = GameTester::try_new(false);
        let summary = tester
            .run_plan(&SimulationPlan::new(GameplayStrategy::Survivor), 1337)
            .unwrap();
        assert!(summary.game_ended, "stalled: {}", summary.stalled);
        assert_eq!(summary.final_ledger.day, 30);
        assert!(summary.metrics.stats_always_well_formed);
        assert!(summary.result.is_some());
        assert_eq!(summary.resume_matched, None);
    }

    #[test]
    fn resumed_run_matches_uninterrupted_run() {
        let tester = GameTester::try_new(false);
        let plan = SimulationPlan::new(GameplayStrategy::Random).with_resume_after(25);
        let summary = tester.run_plan(&plan, 99).unwrap();
        assert_eq!(summary.resume_matched, Some(true));
    }

    #[test]
    fn expectations_see_the_summary() {
        let plan = SimulationPlan::new(GameplayStrategy::Scholar)
            .with_max_turns(3)
            .with_expectation(|summary: &SimulationSummary| -> Result<()> {
                anyhow::ensure!(summary.decisions.len() == 3, "expected three decisions");
                Ok(())
            });
        let summary = GameTester::try_new(false).run_plan(&plan, 5).unwrap();
        for expectation in &plan.expectations {
            expectation.evaluate(&summary).unwrap();
        }
    }
}
