pub mod game_tester;
pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use game_tester::{GameTester, TesterAssets};
pub use scenarios::{all_scenario_keys, get_scenario, list_scenarios};
pub use seeds::resolve_seed_inputs;
pub use tester::{LogicTester, ScenarioResult};
