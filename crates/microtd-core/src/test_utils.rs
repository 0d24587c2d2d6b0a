//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. The
//! `test-utils` feature pulls in `data-loader` so the canonical content is
//! always available here.

use std::sync::Arc;

use crate::command::{Command, CommandOutcome};
use crate::config::SimConfig;
use crate::data_loader::load_canonical_definitions;
use crate::definitions::*;
use crate::engine::GameState;
use crate::fixed::{Fixed64, Ticks};
use crate::registry::{DefinitionsBuilder, GameDefinitions};

// ===========================================================================
// Scalars
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn pos(x: i32, y: i32) -> GridPos {
    GridPos::new(x, y)
}

// ===========================================================================
// Definition constructors
// ===========================================================================

/// A one-life, non-boss enemy.
pub fn make_enemy(id: &str, hp: f64, speed: f64, coin_reward: u32) -> EnemyDef {
    EnemyDef {
        id: id.to_string(),
        name: id.to_string(),
        hp: fixed(hp),
        speed: fixed(speed),
        coin_reward,
        lives_cost: 1,
        is_boss: false,
        description: String::new(),
    }
}

pub fn make_tower(id: &str, cost: u32, range: f64, fire_rate: f64, damage: f64) -> TowerDef {
    TowerDef {
        id: id.to_string(),
        name: id.to_string(),
        cost,
        range: fixed(range),
        fire_rate: fixed(fire_rate),
        damage: fixed(damage),
        description: String::new(),
        upgrade_paths: Vec::new(),
    }
}

/// An 11x3 map whose path runs straight along row 1 from (0,1) to (10,1).
pub fn line_map() -> MapDef {
    MapDef {
        id: "line".to_string(),
        name: "Line".to_string(),
        width: 11,
        height: 3,
        waypoints: vec![
            Waypoint {
                pos: GridPos::new(0, 1),
                path_progress: Fixed64::ZERO,
            },
            Waypoint {
                pos: GridPos::new(10, 1),
                path_progress: Fixed64::ONE,
            },
        ],
        blocked_tiles: Vec::new(),
    }
}

pub fn make_relic(id: &str, kind: EffectKind, value: f64) -> RelicDef {
    RelicDef {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        rarity: Rarity::Common,
        effects: vec![RelicEffect {
            kind,
            value: fixed(value),
        }],
    }
}

pub fn spawn(enemy_type: &str, spawn_tick: Ticks) -> EnemySpawn {
    EnemySpawn {
        enemy_type: enemy_type.to_string(),
        spawn_tick,
    }
}

pub fn wave(index: u32, coin_reward: u32, spawns: &[(&str, Ticks)]) -> WaveDef {
    WaveDef {
        index,
        coin_reward,
        is_boss_wave: false,
        spawns: spawns.iter().map(|&(e, t)| spawn(e, t)).collect(),
    }
}

// ===========================================================================
// Definition bundles
// ===========================================================================

/// Build definitions from a closure. Panics on validation failure.
pub fn build_definitions(f: impl FnOnce(&mut DefinitionsBuilder)) -> Arc<GameDefinitions> {
    let mut builder = DefinitionsBuilder::new();
    f(&mut builder);
    Arc::new(builder.build().expect("test definitions must validate"))
}

/// The shipped content: 5 enemies, 3 towers, 12 waves, the 6x6 "default"
/// map, and 8 relics.
pub fn canonical_definitions() -> Arc<GameDefinitions> {
    Arc::new(load_canonical_definitions().expect("canonical definitions must load"))
}

// ===========================================================================
// Game helpers
// ===========================================================================

pub fn new_canonical_game(seed: u64) -> GameState {
    GameState::new(seed, canonical_definitions(), "default", SimConfig::default())
        .expect("canonical game must construct")
}

pub fn run_ticks(game: &mut GameState, n: u64) {
    for _ in 0..n {
        game.tick();
    }
}

/// Tick until the run state satisfies `done`, up to `limit` ticks. Returns
/// whether it did.
pub fn run_until(game: &mut GameState, limit: u64, done: impl Fn(&GameState) -> bool) -> bool {
    for _ in 0..limit {
        if done(game) {
            return true;
        }
        game.tick();
    }
    done(game)
}

// Command shorthands stamped with the game's current tick.

pub fn start_wave(game: &mut GameState) -> CommandOutcome {
    let tick = game.current_tick();
    game.process_command(Command::StartWave { tick })
}

pub fn place_tower(game: &mut GameState, tower_type: &str, x: i32, y: i32) -> CommandOutcome {
    let tick = game.current_tick();
    game.process_command(Command::PlaceTower {
        tower_type: tower_type.to_string(),
        x,
        y,
        tick,
    })
}

pub fn sell_tower(game: &mut GameState, x: i32, y: i32) -> CommandOutcome {
    let tick = game.current_tick();
    game.process_command(Command::SellTower { x, y, tick })
}

pub fn choose_relic(game: &mut GameState, index: u32) -> CommandOutcome {
    let tick = game.current_tick();
    game.process_command(Command::ChooseRelic { index, tick })
}
