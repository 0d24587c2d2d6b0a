//! End-to-end runs: simulate to the end, summarize, credit the profile, and
//! read it back from disk.

use std::fs;
use std::sync::Arc;

use microtd_core::config::SimConfig;
use microtd_core::definitions::EffectKind;
use microtd_core::engine::GameState;
use microtd_core::event::{Event, EventKind};
use microtd_core::registry::GameDefinitions;
use microtd_core::state_machine::RunState;
use microtd_core::summary::RunSummary;
use microtd_core::test_utils::*;
use microtd_profile::file_store::JsonFileProfileStore;
use microtd_profile::run_manager::{RunApplication, RunManager};
use microtd_profile::CorruptionPolicy;
use microtd_progression::{ProgressionEvent, ProgressionSystem};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Three short waves on the line map, two relics, and a gun that one-shots
/// everything.
fn easy_definitions() -> Arc<GameDefinitions> {
    build_definitions(|b| {
        b.register_map(line_map())
            .register_enemy(make_enemy("grunt", 10.0, 1.0, 5))
            .register_tower(make_tower("gun", 50, 3.0, 10.0, 100.0))
            .register_relic(make_relic("sharp", EffectKind::TowerDamageMultiplier, 1.5))
            .register_relic(make_relic("greed", EffectKind::CoinMultiplier, 1.5));
        for i in 0..3 {
            b.register_wave(wave(i, 20, &[("grunt", 0), ("grunt", 20)]));
        }
    })
}

/// Start waves and take the first relic on offer until the run ends, then
/// close it out.
fn play_out(game: &mut GameState, limit: u64) -> RunSummary {
    for _ in 0..limit {
        match game.state() {
            RunState::Building(_) => {
                start_wave(game);
            }
            RunState::RelicChoice(_) => {
                choose_relic(game, 0);
            }
            RunState::GameOver { .. } => break,
            _ => {}
        }
        game.tick();
    }
    game.finish_run().expect("run should have ended")
}

fn victory_run(seed: u64) -> RunSummary {
    let mut game = GameState::new(seed, easy_definitions(), "line", SimConfig::default()).unwrap();
    assert!(place_tower(&mut game, "gun", 1, 0).is_applied());
    play_out(&mut game, 10_000)
}

fn defeat_run(seed: u64) -> (GameState, RunSummary) {
    let mut game = new_canonical_game(seed);
    let summary = play_out(&mut game, 200_000);
    (game, summary)
}

fn file_manager(dir: &TempDir) -> RunManager<JsonFileProfileStore> {
    RunManager::load(
        JsonFileProfileStore::new(dir.path().join("profile.json"), CorruptionPolicy::Throw),
        ProgressionSystem::default(),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Test 1: a defended run on easy content is won and summarized
// ---------------------------------------------------------------------------
#[test]
fn victory_summary() {
    let summary = victory_run(31);
    assert!(summary.did_win);
    assert_eq!(summary.run_seed, 31);
    assert_eq!(summary.waves_cleared, 3);
    assert_eq!(summary.enemies_defeated, 6);
    assert_eq!(summary.relics_collected, 1);
    assert!(summary.total_coins_earned >= 3 * 20);
}

// ---------------------------------------------------------------------------
// Test 2: an undefended canonical run ends in defeat
// ---------------------------------------------------------------------------
#[test]
fn defeat_summary() {
    let (game, summary) = defeat_run(4242);
    assert!(!summary.did_win);
    assert_eq!(summary.enemies_defeated, 0);
    assert!(summary.waves_cleared < 12);
    assert_eq!(game.lives(), 0);
    assert_eq!(game.state(), RunState::PostRunSummary);
    assert_eq!(game.events().count_of(EventKind::GameOver), 1);
    assert_eq!(game.events().count_of(EventKind::RunCompleted), 0);
    assert_eq!(summary.ticks_survived, game.current_tick());
}

// ---------------------------------------------------------------------------
// Test 3: a finished run is only summarized once
// ---------------------------------------------------------------------------
#[test]
fn finish_run_is_one_shot() {
    let (mut game, _) = defeat_run(7);
    assert!(game.finish_run().is_none());
    let events = game.events().len();
    run_ticks(&mut game, 100);
    assert_eq!(game.state(), RunState::PostRunSummary);
    assert_eq!(game.events().len(), events);
}

// ---------------------------------------------------------------------------
// Test 4: the victory is credited, persisted, and read back
// ---------------------------------------------------------------------------
#[test]
fn victory_credited_to_profile() {
    let dir = TempDir::new().unwrap();
    let summary = victory_run(31);
    let manager = file_manager(&dir);
    let expected_xp = manager.system().rules().calculate_xp(&summary);
    assert_eq!(expected_xp, 3 * 20 + 6 * 2 + 10 + 100);

    let outcome = manager.apply_run(&summary).unwrap();
    let events = outcome.events();
    assert_eq!(
        events[0],
        ProgressionEvent::XpGained { amount: expected_xp, new_total: expected_xp }
    );
    assert!(events.contains(&ProgressionEvent::LeveledUp { new_level: 2 }));

    let reloaded = file_manager(&dir);
    let profile = reloaded.profile();
    assert_eq!(profile, manager.profile());
    assert_eq!(profile.xp, expected_xp);
    assert_eq!(profile.level, 2);
    for event in events {
        if let ProgressionEvent::Unlocked { item_id } = event {
            assert!(profile.is_unlocked(item_id), "{item_id}");
        }
    }
    let last = reloaded.last_run().unwrap();
    assert_eq!(last.run_seed, 31);
    assert!(last.did_win);
    assert_eq!(last.waves_cleared, 3);
}

// ---------------------------------------------------------------------------
// Test 5: runs accumulate, and re-applying one changes nothing on disk
// ---------------------------------------------------------------------------
#[test]
fn runs_accumulate_exactly_once() {
    let dir = TempDir::new().unwrap();
    let manager = file_manager(&dir);
    let rules = manager.system().rules().clone();

    let win = victory_run(31);
    let (_, loss) = defeat_run(4242);
    assert!(manager.apply_run(&win).unwrap().is_applied());
    assert!(manager.apply_run(&loss).unwrap().is_applied());

    let total = rules.calculate_xp(&win) + rules.calculate_xp(&loss);
    assert_eq!(manager.profile().xp, total);
    assert_eq!(manager.profile().level, rules.level_for_xp(total));

    let path = dir.path().join("profile.json");
    let bytes = fs::read(&path).unwrap();
    assert_eq!(manager.apply_run(&loss).unwrap(), RunApplication::Duplicate);
    assert_eq!(fs::read(&path).unwrap(), bytes);
    assert_eq!(file_manager(&dir).profile().xp, total);
}

// ---------------------------------------------------------------------------
// Test 6: the same seed and choices give the same summary
// ---------------------------------------------------------------------------
#[test]
fn summaries_are_deterministic() {
    assert_eq!(victory_run(99), victory_run(99));
    assert_eq!(defeat_run(99).1, defeat_run(99).1);
}

// ---------------------------------------------------------------------------
// Test 7: the relic offer the player saw is the one that was granted
// ---------------------------------------------------------------------------
#[test]
fn chosen_relic_was_offered() {
    let mut game = GameState::new(5, easy_definitions(), "line", SimConfig::default()).unwrap();
    place_tower(&mut game, "gun", 1, 0);
    play_out(&mut game, 10_000);

    let offered: Vec<&Vec<String>> = game
        .events()
        .all()
        .iter()
        .filter_map(|e| match e {
            Event::RelicOffered { choices, .. } => Some(choices),
            _ => None,
        })
        .collect();
    let chosen: Vec<&String> = game
        .events()
        .all()
        .iter()
        .filter_map(|e| match e {
            Event::RelicChosen { relic_id, .. } => Some(relic_id),
            _ => None,
        })
        .collect();
    assert_eq!(offered.len(), 1);
    assert_eq!(chosen, vec![&offered[0][0]]);
    assert!(game.relics().owned().contains(chosen[0]));
}
