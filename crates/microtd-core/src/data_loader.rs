//! Data-driven definitions loading from JSON.
//!
//! Feature-gated behind `data-loader`. Parses the five content tables
//! (towers, enemies, relics, maps, waves) into a [`DefinitionsBuilder`] and
//! builds the immutable bundle. Floats are converted to [`Fixed64`] here and
//! nowhere else.

use crate::definitions::*;
use crate::fixed::{Fixed64, Ticks};
use crate::registry::{DefinitionsBuilder, GameDefinitions, RegistryError};

/// The content shipped with the crate.
pub const CANONICAL_DEFINITIONS_JSON: &str = include_str!("../data/definitions.json");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("{field} = {value} does not fit the fixed-point range")]
    OutOfRange { field: &'static str, value: f64 },
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level content file.
#[derive(Debug, serde::Deserialize)]
pub struct DefinitionsData {
    #[serde(default)]
    pub towers: Vec<TowerData>,
    #[serde(default)]
    pub enemies: Vec<EnemyData>,
    #[serde(default)]
    pub maps: Vec<MapData>,
    #[serde(default)]
    pub waves: Vec<WaveData>,
    #[serde(default)]
    pub relics: Vec<RelicData>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TowerData {
    pub id: String,
    pub name: String,
    pub cost: u32,
    pub range: f64,
    pub fire_rate: f64,
    pub damage: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub upgrade_paths: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyData {
    pub id: String,
    pub name: String,
    pub hp: f64,
    pub speed: f64,
    pub coin_reward: u32,
    pub lives_cost: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_boss: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointData {
    pub x: i32,
    pub y: i32,
    pub path_progress: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct TileData {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    pub id: String,
    pub name: String,
    pub grid_width: i32,
    pub grid_height: i32,
    pub waypoints: Vec<WaypointData>,
    #[serde(default)]
    pub blocked_tiles: Vec<TileData>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnData {
    pub enemy_type: String, // references enemy by id
    pub spawn_tick: Ticks,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveData {
    pub wave_index: u32,
    pub coin_reward: u32,
    #[serde(default)]
    pub is_boss_wave: bool,
    pub spawns: Vec<SpawnData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct EffectData {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    pub value: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct RelicData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
    pub effects: Vec<EffectData>,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load definitions from a JSON string.
pub fn load_definitions_json(json: &str) -> Result<GameDefinitions, DataLoadError> {
    let data: DefinitionsData = serde_json::from_str(json)?;
    build_definitions(data)
}

/// Load definitions from JSON bytes.
pub fn load_definitions_json_bytes(bytes: &[u8]) -> Result<GameDefinitions, DataLoadError> {
    let data: DefinitionsData = serde_json::from_slice(bytes)?;
    build_definitions(data)
}

/// Load the content shipped with the crate.
pub fn load_canonical_definitions() -> Result<GameDefinitions, DataLoadError> {
    load_definitions_json(CANONICAL_DEFINITIONS_JSON)
}

/// NaN and infinities fail `checked_from_num` along with overflow.
fn fixed(field: &'static str, value: f64) -> Result<Fixed64, DataLoadError> {
    Fixed64::checked_from_num(value).ok_or(DataLoadError::OutOfRange { field, value })
}

fn build_definitions(data: DefinitionsData) -> Result<GameDefinitions, DataLoadError> {
    let mut builder = DefinitionsBuilder::new();

    for t in data.towers {
        builder.register_tower(TowerDef {
            id: t.id,
            name: t.name,
            cost: t.cost,
            range: fixed("tower.range", t.range)?,
            fire_rate: fixed("tower.fireRate", t.fire_rate)?,
            damage: fixed("tower.damage", t.damage)?,
            description: t.description,
            upgrade_paths: t.upgrade_paths,
        });
    }

    for e in data.enemies {
        builder.register_enemy(EnemyDef {
            id: e.id,
            name: e.name,
            hp: fixed("enemy.hp", e.hp)?,
            speed: fixed("enemy.speed", e.speed)?,
            coin_reward: e.coin_reward,
            lives_cost: e.lives_cost,
            is_boss: e.is_boss,
            description: e.description,
        });
    }

    for m in data.maps {
        builder.register_map(MapDef {
            id: m.id,
            name: m.name,
            width: m.grid_width,
            height: m.grid_height,
            waypoints: m
                .waypoints
                .iter()
                .map(|w| {
                    Ok(Waypoint {
                        pos: GridPos::new(w.x, w.y),
                        path_progress: fixed("waypoint.pathProgress", w.path_progress)?,
                    })
                })
                .collect::<Result<_, DataLoadError>>()?,
            blocked_tiles: m
                .blocked_tiles
                .iter()
                .map(|t| GridPos::new(t.x, t.y))
                .collect(),
        });
    }

    for w in data.waves {
        builder.register_wave(WaveDef {
            index: w.wave_index,
            coin_reward: w.coin_reward,
            is_boss_wave: w.is_boss_wave,
            spawns: w
                .spawns
                .into_iter()
                .map(|s| EnemySpawn {
                    enemy_type: s.enemy_type,
                    spawn_tick: s.spawn_tick,
                })
                .collect(),
        });
    }

    for r in data.relics {
        builder.register_relic(RelicDef {
            id: r.id,
            name: r.name,
            description: r.description,
            rarity: r.rarity,
            effects: r
                .effects
                .iter()
                .map(|e| {
                    Ok(RelicEffect {
                        kind: e.kind,
                        value: fixed("effect.value", e.value)?,
                    })
                })
                .collect::<Result<_, DataLoadError>>()?,
        });
    }

    Ok(builder.build()?)
}
