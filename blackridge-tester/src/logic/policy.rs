use std::fmt;

use blackridge_game::data::{Catalog, Choice, Encounter, Location};
use blackridge_game::{Ledger, StatDelta, StatKey, Transaction, derive_stream_seed};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(choice_index: usize, rationale: Option<String>) -> Self {
        Self {
            choice_index,
            rationale,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick where to go next from the locations not yet tried this turn.
    fn pick_location(&mut self, ledger: &Ledger, options: &[&Location]) -> Option<String>;

    /// Select a choice for an open encounter; `None` backs out of it.
    ///
    /// `open[i]` tells whether choice `i` passes its gate.
    fn pick_choice(
        &mut self,
        ledger: &Ledger,
        encounter: &Encounter,
        open: &[bool],
    ) -> Option<PolicyDecision>;

    /// Optional phone transaction before the turn's travel.
    fn pick_transaction(&mut self, ledger: &Ledger, catalog: &Catalog) -> Option<Transaction>;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Scholar,
    Hustler,
    Survivor,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [Self::Scholar, Self::Hustler, Self::Survivor, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scholar => "Scholar",
            Self::Hustler => "Hustler",
            Self::Survivor => "Survivor",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Scholar => Box::new(ScholarPolicy),
            Self::Hustler => Box::new(HustlerPolicy),
            Self::Survivor => Box::new(SurvivorPolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct ScholarPolicy;
struct HustlerPolicy;
struct SurvivorPolicy;

/// Stateless between decisions: each draw is seeded from the run seed and the
/// ledger clock, so a resumed run sees the same draws.
struct RandomPolicy {
    seed: u64,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            seed: derive_stream_seed(seed, b"tester-random-policy"),
        }
    }

    fn rng_for(&self, ledger: &Ledger, salt: u64) -> ChaCha20Rng {
        let clock = (u64::from(ledger.day) << 8)
            | u64::try_from(ledger.time.index()).unwrap_or_default();
        let history = u64::try_from(ledger.history.len()).unwrap_or_default();
        ChaCha20Rng::seed_from_u64(self.seed ^ (clock << 16) ^ (history << 4) ^ salt)
    }
}

fn delta_of(delta: &StatDelta, key: StatKey) -> f64 {
    delta.get(key).unwrap_or(0.0)
}

fn playable<'a>(encounter: &'a Encounter, open: &[bool]) -> Vec<(usize, &'a Choice)> {
    encounter
        .choices
        .iter()
        .enumerate()
        .filter(|(idx, choice)| open.get(*idx).copied().unwrap_or(false) && !choice.is_return)
        .collect()
}

/// Highest-scoring playable choice; ties keep authored order.
fn best_by(
    encounter: &Encounter,
    open: &[bool],
    score: impl Fn(&Choice) -> f64,
) -> Option<PolicyDecision> {
    playable(encounter, open)
        .into_iter()
        .map(|(idx, choice)| (idx, score(choice)))
        .fold(None, |best: Option<(usize, f64)>, (idx, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((idx, value)),
        })
        .map(|(idx, value)| PolicyDecision::new(idx, Some(format!("score {value:.1}"))))
}

fn prefer(options: &[&Location], order: &[&str]) -> Option<String> {
    order
        .iter()
        .find_map(|id| options.iter().find(|loc| loc.id == *id))
        .or_else(|| options.first())
        .map(|loc| loc.id.clone())
}

impl PlayerPolicy for ScholarPolicy {
    fn name(&self) -> &'static str {
        "Scholar"
    }

    fn pick_location(&mut self, ledger: &Ledger, options: &[&Location]) -> Option<String> {
        if ledger.stats.satiety < 25.0 || ledger.stats.stamina < 20.0 {
            return prefer(options, &["HOME", "SCHOOL", "SQUARE"]);
        }
        prefer(options, &["SCHOOL", "UNI", "HOME", "STATION"])
    }

    fn pick_choice(
        &mut self,
        _ledger: &Ledger,
        encounter: &Encounter,
        open: &[bool],
    ) -> Option<PolicyDecision> {
        best_by(encounter, open, |choice| {
            delta_of(&choice.deltas, StatKey::Academic) * 2.0
                + delta_of(&choice.deltas, StatKey::Intelligence) * 5.0
                + delta_of(&choice.deltas, StatKey::Satiety) * 0.5
                - delta_of(&choice.deltas, StatKey::Sin)
                - if choice.new_area.is_some() { 50.0 } else { 0.0 }
        })
    }

    fn pick_transaction(&mut self, ledger: &Ledger, catalog: &Catalog) -> Option<Transaction> {
        let booster = catalog.product("p4")?;
        let biscuits = catalog.product("p1")?;
        if ledger.stats.satiety < 30.0 && ledger.stats.money >= f64::from(biscuits.price) {
            return Some(Transaction::Purchase(biscuits.id.clone()));
        }
        (ledger.stats.money >= f64::from(booster.price) * 2.0)
            .then(|| Transaction::Purchase(booster.id.clone()))
    }
}

impl PlayerPolicy for HustlerPolicy {
    fn name(&self) -> &'static str {
        "Hustler"
    }

    fn pick_location(&mut self, _ledger: &Ledger, options: &[&Location]) -> Option<String> {
        prefer(options, &["CLUB", "RUINS", "MARKET", "CYBER", "STATION"])
    }

    fn pick_choice(
        &mut self,
        _ledger: &Ledger,
        encounter: &Encounter,
        open: &[bool],
    ) -> Option<PolicyDecision> {
        best_by(encounter, open, |choice| {
            delta_of(&choice.deltas, StatKey::Money)
                + delta_of(&choice.deltas, StatKey::Corruption) * 5.0
        })
    }

    fn pick_transaction(&mut self, ledger: &Ledger, catalog: &Catalog) -> Option<Transaction> {
        if ledger.flags.is_crackdown || ledger.stats.stamina < 50.0 {
            return None;
        }
        catalog
            .gray_tasks
            .first()
            .map(|task| Transaction::GrayTask(task.id.clone()))
    }
}

impl PlayerPolicy for SurvivorPolicy {
    fn name(&self) -> &'static str {
        "Survivor"
    }

    fn pick_location(&mut self, ledger: &Ledger, options: &[&Location]) -> Option<String> {
        if ledger.stats.hygiene < 30.0 {
            return prefer(options, &["BATH", "HOME"]);
        }
        prefer(options, &["HOME", "STATION", "BATH", "SCHOOL"])
    }

    fn pick_choice(
        &mut self,
        _ledger: &Ledger,
        encounter: &Encounter,
        open: &[bool],
    ) -> Option<PolicyDecision> {
        best_by(encounter, open, |choice| {
            let deltas = &choice.deltas;
            delta_of(deltas, StatKey::Satiety)
                + delta_of(deltas, StatKey::Mood)
                + delta_of(deltas, StatKey::Stamina)
                + delta_of(deltas, StatKey::MotherHealth)
                - delta_of(deltas, StatKey::Sin) * 2.0
                - if choice.new_area.is_some() { 50.0 } else { 0.0 }
        })
    }

    fn pick_transaction(&mut self, ledger: &Ledger, catalog: &Catalog) -> Option<Transaction> {
        if let Some(unread) = catalog
            .messages
            .iter()
            .find(|message| !ledger.read_messages.contains(&message.id))
        {
            return Some(Transaction::ReadMessage(unread.id.clone()));
        }
        (ledger.stats.mood < 20.0 && ledger.stats.stamina > 20.0)
            .then_some(Transaction::WatchVideos)
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_location(&mut self, ledger: &Ledger, options: &[&Location]) -> Option<String> {
        if options.is_empty() {
            return None;
        }
        let salt = u64::try_from(options.len()).unwrap_or_default();
        let idx = self.rng_for(ledger, salt).gen_range(0..options.len());
        Some(options[idx].id.clone())
    }

    fn pick_choice(
        &mut self,
        ledger: &Ledger,
        encounter: &Encounter,
        open: &[bool],
    ) -> Option<PolicyDecision> {
        let candidates = playable(encounter, open);
        if candidates.is_empty() {
            return None;
        }
        let idx = self
            .rng_for(ledger, 0xC0DE)
            .gen_range(0..candidates.len());
        Some(PolicyDecision::new(
            candidates[idx].0,
            Some("random".to_string()),
        ))
    }

    fn pick_transaction(&mut self, ledger: &Ledger, catalog: &Catalog) -> Option<Transaction> {
        let mut rng = self.rng_for(ledger, 0x7E1E);
        if !rng.gen_bool(0.2) {
            return None;
        }
        match rng.gen_range(0..4_u8) {
            0 => catalog
                .products
                .first()
                .map(|item| Transaction::Purchase(item.id.clone())),
            1 => Some(Transaction::WatchVideos),
            2 => Some(Transaction::Livestream),
            _ => catalog
                .contacts
                .get(1)
                .map(|contact| Transaction::Contact(contact.id.clone())),
        }
    }
}
