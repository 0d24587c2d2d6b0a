//! Read-only query API for inspecting run state.
//!
//! Snapshot types are owned copies with no references into the
//! orchestrator's storage, so a renderer can hold one across ticks.

use crate::definitions::GridPos;
use crate::engine::GameState;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{EnemyId, TowerId};
use crate::state_machine::RunState;

// ---------------------------------------------------------------------------
// Enemy view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemyView {
    pub id: EnemyId,
    pub enemy_type: String,
    pub path_progress: Fixed64,
    /// Tile the enemy is drawn on, interpolated from path progress.
    pub pos: GridPos,
    /// Remaining HP as a 0..1 fraction.
    pub hp_fraction: Fixed64,
    pub is_slowed: bool,
    pub is_boss: bool,
}

// ---------------------------------------------------------------------------
// Tower view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TowerView {
    pub id: TowerId,
    pub tower_type: String,
    pub pos: GridPos,
    pub kills: u32,
    pub total_damage: Fixed64,
}

// ---------------------------------------------------------------------------
// Render snapshot
// ---------------------------------------------------------------------------

/// Everything a frame needs beyond the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSnapshot {
    pub tick: Ticks,
    pub coins: u32,
    pub lives: u32,
    pub state: RunState,
    pub enemies: Vec<EnemyView>,
    pub towers: Vec<TowerView>,
}

impl GameState {
    /// Point-in-time view for rendering. Never mutates.
    pub fn snapshot(&self) -> RenderSnapshot {
        let combat = self.combat();
        RenderSnapshot {
            tick: self.current_tick(),
            coins: self.coins(),
            lives: self.lives(),
            state: self.state(),
            enemies: self
                .enemies()
                .iter()
                .map(|e| EnemyView {
                    id: e.id,
                    enemy_type: e.enemy_type.clone(),
                    path_progress: e.path_progress,
                    pos: combat.enemy_position(e.path_progress),
                    hp_fraction: e.hp_fraction(),
                    is_slowed: e.slow.is_some(),
                    is_boss: e.is_boss,
                })
                .collect(),
            towers: self
                .towers()
                .iter()
                .map(|t| TowerView {
                    id: t.id,
                    tower_type: t.tower_type.clone(),
                    pos: t.pos,
                    kills: t.kills,
                    total_damage: t.total_damage,
                })
                .collect(),
        }
    }
}
