use blackridge_game::status::summarize_with_tier;
use blackridge_game::{
    Area, Attributes, ChoiceSelection, GameEngine, Ledger, MemoryStorage, RulesConfig, RunPhase,
    RunSession, StatDelta, StatKey, StaticLoader, StatusConfig, StatusTier, Stats, TimeOfDay,
    TurnConfig, TurnInput, TurnOutcome, advance, catalog, resolve,
};
use std::sync::Arc;

fn fresh_session(seed: u64) -> RunSession {
    let mut session = RunSession::new(
        Arc::new(catalog().clone()),
        RulesConfig::default(),
        &Attributes::default(),
        seed,
    )
    .unwrap();
    session.choose_prologue("B").unwrap();
    session
}

/// Spend one turn, rotating through reachable locations by `step`.
///
/// Returns false when no location offered a playable choice.
fn play_turn(session: &mut RunSession, step: usize) -> bool {
    let ids: Vec<String> = session
        .available_locations()
        .iter()
        .map(|loc| loc.id.clone())
        .collect();
    for offset in 0..ids.len() {
        let id = &ids[(step + offset) % ids.len()];
        session.select_location(id).unwrap();
        let encounter = &session.active_encounter().unwrap().encounter;
        let pick = session
            .choice_availability()
            .iter()
            .enumerate()
            .filter(|(idx, open)| **open && !encounter.choices[*idx].is_return)
            .map(|(idx, _)| idx)
            .nth(step % 2)
            .or_else(|| {
                session
                    .choice_availability()
                    .iter()
                    .position(|open| *open)
                    .filter(|idx| !encounter.choices[*idx].is_return)
            });
        match pick {
            Some(idx) => {
                session.select_choice(ChoiceSelection::Index(idx)).unwrap();
                session.confirm_turn().unwrap();
                return true;
            }
            None => {
                session.select_choice(ChoiceSelection::Cancel).unwrap();
            }
        }
    }
    false
}

fn play_until_end(session: &mut RunSession, start_step: usize) -> Vec<Ledger> {
    let mut trail = Vec::new();
    for step in start_step..start_step + 400 {
        if session.is_ended() || !play_turn(session, step) {
            break;
        }
        trail.push(session.ledger().clone());
    }
    trail
}

#[test]
fn afternoon_choice_on_day_twenty_nine_moves_to_dusk() {
    let stats = Stats {
        stamina: 70.0,
        mood: 60.0,
        money: 50.0,
        debt: 3_000.0,
        satiety: 40.0,
        mother_health: 50.0,
        ..Stats::default()
    };
    let ledger = Ledger {
        day: 29,
        time: TimeOfDay::Afternoon,
        ..Ledger::default()
    }
    .with_stats(stats);
    let input = TurnInput {
        label: "Paste up flyers".to_string(),
        deltas: StatDelta::new().with(StatKey::Money, -50.0),
        ..TurnInput::default()
    };
    let TurnOutcome::Continued(next) = advance(&ledger, &input, &TurnConfig::default()) else {
        panic!("day 29 afternoon must not end the run");
    };
    assert_eq!(next.day, 29);
    assert_eq!(next.time, TimeOfDay::Dusk);
    assert!(next.stats.money.abs() < f64::EPSILON);
    assert!((next.stats.debt - 3_000.0).abs() < f64::EPSILON);
    assert_eq!(next.last_history(), Some("[Day 29] Paste up flyers"));
}

#[test]
fn last_slot_of_final_day_ends_the_run() {
    let ledger = Ledger {
        day: 30,
        time: TimeOfDay::Midnight,
        ..Ledger::default()
    };
    let outcome = advance(&ledger, &TurnInput::default(), &TurnConfig::default());
    assert!(outcome.is_ended());
    assert_eq!(outcome.ledger().day, 30);
}

#[test]
fn unknown_location_resolves_to_terminal_encounter() {
    let encounter = resolve("UNKNOWN_LOCATION", TimeOfDay::Morning, catalog());
    assert!(encounter.is_final);
    assert!(encounter.choices.is_empty());
}

#[test]
fn blank_location_ids_still_resolve_with_a_title() {
    for id in ["", " ", "\n"] {
        for time in TimeOfDay::ALL {
            let encounter = resolve(id, time, catalog());
            assert!(!encounter.title.trim().is_empty(), "{id:?} {time}");
            assert!(encounter.is_final);
        }
    }
}

#[test]
fn finished_run_reloads_as_finished() {
    let engine = GameEngine::new(StaticLoader, MemoryStorage::default());
    let mut session = engine.new_session(&Attributes::default(), 0x00C0_FFEE).unwrap();
    session.choose_prologue("B").unwrap();
    play_until_end(&mut session, 0);
    assert!(session.is_ended());
    engine.save_session(&session).unwrap();

    let mut reloaded = engine.load_session().unwrap().expect("save present");
    assert_eq!(reloaded.phase(), RunPhase::Ended);
    assert_eq!(reloaded.ledger(), session.ledger());
    assert_eq!(reloaded.result(), session.result());
    let before = reloaded.ledger().clone();
    assert!(reloaded.select_location("HOME").is_err());
    assert!(!play_turn_allowed(&mut reloaded));
    assert_eq!(reloaded.ledger(), &before);
}

/// Whether the session accepts any location at all.
fn play_turn_allowed(session: &mut RunSession) -> bool {
    let ids: Vec<String> = catalog().locations.iter().map(|loc| loc.id.clone()).collect();
    ids.iter().any(|id| session.select_location(id).is_ok())
}

#[test]
fn full_run_reaches_an_ending_with_bounded_history() {
    let mut session = fresh_session(0x00C0_FFEE);
    let trail = play_until_end(&mut session, 0);

    assert!(session.is_ended(), "run stalled after {} turns", trail.len());
    assert_eq!(session.phase(), RunPhase::Ended);
    let summary = session.result().unwrap();
    assert_eq!(summary.day, 30);
    assert_eq!(summary.seed, 0x00C0_FFEE);

    let limit = TurnConfig::default().history_limit;
    for ledger in &trail {
        assert!(ledger.history.len() <= limit);
        assert!(ledger.stats.is_well_formed(), "{:?}", ledger.stats);
        assert!((1..=30).contains(&ledger.day));
    }
    assert!(
        trail.windows(2).all(|pair| pair[0].day <= pair[1].day),
        "days never go backwards"
    );
}

#[test]
fn same_seed_and_choices_replay_identically() {
    let mut first = fresh_session(42);
    let mut second = fresh_session(42);
    let first_trail = play_until_end(&mut first, 3);
    let second_trail = play_until_end(&mut second, 3);
    assert_eq!(first_trail, second_trail);
    assert_eq!(first.result(), second.result());
}

#[test]
fn save_and_load_mid_run_resumes_identically() {
    let engine = GameEngine::new(StaticLoader, MemoryStorage::default());
    let mut session = engine.new_session(&Attributes::default(), 9_001).unwrap();
    session.choose_prologue("A").unwrap();
    for step in 0..20 {
        assert!(play_turn(&mut session, step));
    }
    engine.save_session(&session).unwrap();
    let continued = play_until_end(&mut session, 20);

    let mut resumed = engine.load_session().unwrap().expect("save present");
    assert_eq!(resumed.phase(), RunPhase::Explore);
    let replayed = play_until_end(&mut resumed, 20);
    assert_eq!(continued, replayed);
}

#[test]
fn day_overrides_outrank_the_crisis_tier() {
    let cfg = StatusConfig::default();
    let exhausted = Ledger::default().with_stats(Stats {
        stamina: 5.0,
        mood: 50.0,
        ..Stats::default()
    });
    assert_eq!(
        summarize_with_tier(&exhausted, &cfg).1,
        StatusTier::DayOverride
    );
    let day_two = Ledger {
        day: 2,
        ..exhausted.clone()
    };
    assert_eq!(summarize_with_tier(&day_two, &cfg).1, StatusTier::Crisis);
}

#[test]
fn train_round_trip_changes_area_and_back() {
    let mut session = fresh_session(5);
    session.select_location("STATION").unwrap();
    session.select_choice(ChoiceSelection::Index(0)).unwrap();
    session.confirm_turn().unwrap();
    assert_eq!(session.ledger().area, Area::ProvincialCapital);
    assert!(
        session
            .available_locations()
            .iter()
            .all(|loc| loc.area == Area::ProvincialCapital && !loc.is_trap)
    );

    session.select_location("SQUARE").unwrap();
    session.select_choice(ChoiceSelection::Index(0)).unwrap();
    session.confirm_turn().unwrap();
    assert_eq!(session.ledger().area, Area::MiningTown);
    assert_eq!(session.ledger().location, "HOME");
}
