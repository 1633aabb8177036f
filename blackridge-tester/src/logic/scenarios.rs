use anyhow::{Result, ensure};

use blackridge_game::TurnConfig;

use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};
use crate::logic::policy::GameplayStrategy;

/// Named simulation plan runnable from the CLI.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            plan,
        }
    }
}

const SCENARIOS: [(&str, &str); 8] = [
    ("smoke", "A dozen Scholar turns keep every stat well formed"),
    ("scholar-run", "Scholar plays a full run to the final day"),
    ("hustler-run", "Hustler plays a full run to the final day"),
    ("survivor-run", "Survivor plays a full run to the final day"),
    ("random-run", "Random plays a full run to the final day"),
    ("history-bound", "History never exceeds its configured limit"),
    ("replay-determinism", "Same seed and policy replay to the same run"),
    ("save-load-resume", "A run resumed from a mid-run save matches the original"),
];

/// Every scenario key with its description.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.to_vec()
}

#[must_use]
pub fn all_scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|(key, _)| (*key).to_string()).collect()
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<TestScenario> {
    let (name, description) = SCENARIOS.iter().find(|(name, _)| *name == key)?;
    let plan = match *name {
        "smoke" => SimulationPlan::new(GameplayStrategy::Scholar)
            .with_max_turns(12)
            .with_expectation(stats_well_formed)
            .with_expectation(never_stalls),
        "scholar-run" => full_run(GameplayStrategy::Scholar),
        "hustler-run" => full_run(GameplayStrategy::Hustler),
        "survivor-run" => full_run(GameplayStrategy::Survivor),
        "random-run" => full_run(GameplayStrategy::Random),
        "history-bound" => {
            SimulationPlan::new(GameplayStrategy::Random).with_expectation(history_bounded)
        }
        "replay-determinism" => {
            SimulationPlan::new(GameplayStrategy::Random).with_expectation(replays_identically)
        }
        "save-load-resume" => SimulationPlan::new(GameplayStrategy::Hustler)
            .with_resume_after(40)
            .with_expectation(resume_matches),
        _ => return None,
    };
    Some(TestScenario::new(*name, *description, plan))
}

fn full_run(strategy: GameplayStrategy) -> SimulationPlan {
    SimulationPlan::new(strategy)
        .with_expectation(never_stalls)
        .with_expectation(ends_on_final_day)
        .with_expectation(stats_well_formed)
}

fn never_stalls(summary: &SimulationSummary) -> Result<()> {
    ensure!(!summary.stalled, "run stalled with no playable choice");
    Ok(())
}

fn stats_well_formed(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.stats_always_well_formed,
        "a stat went negative or currency lost whole units"
    );
    ensure!(summary.metrics.days_never_regressed, "day counter went backwards");
    Ok(())
}

fn ends_on_final_day(summary: &SimulationSummary) -> Result<()> {
    let final_day = TurnConfig::default().final_day;
    ensure!(summary.game_ended, "run did not end");
    ensure!(
        summary.final_ledger.day == final_day,
        "run ended on day {} instead of {final_day}",
        summary.final_ledger.day
    );
    ensure!(summary.result.is_some(), "ended run has no result summary");
    Ok(())
}

fn history_bounded(summary: &SimulationSummary) -> Result<()> {
    let limit = TurnConfig::default().history_limit;
    ensure!(
        summary.metrics.max_history_len <= limit,
        "history grew to {} entries (limit {limit})",
        summary.metrics.max_history_len
    );
    Ok(())
}

fn replays_identically(summary: &SimulationSummary) -> Result<()> {
    let replay = GameTester::try_new(false)
        .run_plan(&SimulationPlan::new(summary.strategy), summary.seed)?;
    ensure!(
        replay.decisions == summary.decisions,
        "replay diverged after {} decisions",
        replay
            .decisions
            .iter()
            .zip(&summary.decisions)
            .take_while(|(a, b)| a == b)
            .count()
    );
    ensure!(
        replay.final_ledger == summary.final_ledger,
        "replay reached a different final ledger"
    );
    Ok(())
}

fn resume_matches(summary: &SimulationSummary) -> Result<()> {
    match summary.resume_matched {
        Some(true) => Ok(()),
        Some(false) => anyhow::bail!("resumed run diverged from the original"),
        None => anyhow::bail!("run ended before the save point"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key).unwrap();
            assert_eq!(scenario.name, key);
            assert!(!scenario.plan.expectations.is_empty());
        }
        assert!(get_scenario("missing").is_none());
    }

    #[test]
    fn smoke_passes_on_default_seed() {
        let scenario = get_scenario("smoke").unwrap();
        let summary = GameTester::try_new(false)
            .run_plan(&scenario.plan, 1337)
            .unwrap();
        for expectation in &scenario.plan.expectations {
            expectation.evaluate(&summary).unwrap();
        }
    }
}
