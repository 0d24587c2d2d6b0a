//! Static game-content records: towers, enemies, maps, waves, and relics.
//!
//! These are plain data. They are assembled and validated by
//! [`DefinitionsBuilder`](crate::registry::DefinitionsBuilder) and shared
//! read-only for the lifetime of a run.

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Ticks};

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// An integer tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance between tile centers.
    pub fn distance_squared(self, other: GridPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

// ---------------------------------------------------------------------------
// Towers and enemies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TowerDef {
    pub id: String,
    pub name: String,
    pub cost: u32,
    /// Range in tiles.
    pub range: Fixed64,
    /// Shots per second.
    pub fire_rate: Fixed64,
    pub damage: Fixed64,
    pub description: String,
    /// Reserved for tower upgrades; carried through but unused.
    pub upgrade_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyDef {
    pub id: String,
    pub name: String,
    pub hp: Fixed64,
    /// Path progress per second at full speed.
    pub speed: Fixed64,
    pub coin_reward: u32,
    pub lives_cost: u32,
    pub is_boss: bool,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// A point on the enemy path, tagged with its normalized path progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub pos: GridPos,
    pub path_progress: Fixed64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapDef {
    pub id: String,
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub waypoints: Vec<Waypoint>,
    pub blocked_tiles: Vec<GridPos>,
}

impl MapDef {
    pub fn is_in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Whether the tile is one of the path's waypoint tiles.
    pub fn is_path_tile(&self, pos: GridPos) -> bool {
        self.waypoints.iter().any(|w| w.pos == pos)
    }

    pub fn is_blocked(&self, pos: GridPos) -> bool {
        self.blocked_tiles.contains(&pos)
    }

    /// A tower may stand on an in-bounds tile that is neither path nor blocked.
    pub fn is_valid_placement(&self, pos: GridPos) -> bool {
        self.is_in_bounds(pos) && !self.is_path_tile(pos) && !self.is_blocked(pos)
    }
}

// ---------------------------------------------------------------------------
// Waves
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemySpawn {
    pub enemy_type: String,
    /// Offset from the tick the wave started.
    pub spawn_tick: Ticks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveDef {
    pub index: u32,
    pub coin_reward: u32,
    pub is_boss_wave: bool,
    /// Sorted by (spawn tick, original index) when the definitions are built.
    pub spawns: Vec<EnemySpawn>,
}

// ---------------------------------------------------------------------------
// Relics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// What a relic effect modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectKind {
    TowerDamageMultiplier,
    TowerRangeMultiplier,
    TowerFireRateMultiplier,
    CoinMultiplier,
    EnemySlowOnHit,
    StartingCoins,
}

impl EffectKind {
    /// Multiplicative kinds combine by product, the rest by sum.
    pub fn is_multiplicative(self) -> bool {
        matches!(
            self,
            EffectKind::TowerDamageMultiplier
                | EffectKind::TowerRangeMultiplier
                | EffectKind::TowerFireRateMultiplier
                | EffectKind::CoinMultiplier
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelicEffect {
    pub kind: EffectKind,
    pub value: Fixed64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelicDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub effects: Vec<RelicEffect>,
}
