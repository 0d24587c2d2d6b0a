//! Wave/spawn scheduling.
//!
//! Spawn matching is by entry index: each entry fires on the single tick
//! where `current_tick - wave_start_tick == spawn_tick`, and is then marked
//! so it can never fire twice.

use std::sync::Arc;

use crate::definitions::WaveDef;
use crate::fixed::Ticks;
use crate::registry::GameDefinitions;

/// One enemy due to spawn this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnInstruction {
    pub enemy_type: String,
    /// Index of the entry within the wave's sorted spawn list.
    pub spawn_index: usize,
}

#[derive(Debug, Clone)]
pub struct WaveScheduler {
    defs: Arc<GameDefinitions>,
    current_wave: Option<usize>,
    wave_start_tick: Ticks,
    spawned: Vec<bool>,
}

impl WaveScheduler {
    pub fn new(defs: Arc<GameDefinitions>) -> Self {
        Self {
            defs,
            current_wave: None,
            wave_start_tick: 0,
            spawned: Vec::new(),
        }
    }

    /// Advance to the next wave, starting it at `current_tick`.
    ///
    /// Returns `None` and leaves the scheduler untouched when no waves remain.
    pub fn start_wave(&mut self, current_tick: Ticks) -> Option<&WaveDef> {
        let next = self.current_wave.map_or(0, |w| w + 1);
        let spawn_count = self.defs.wave(next)?.spawns.len();
        self.current_wave = Some(next);
        self.wave_start_tick = current_tick;
        self.spawned = vec![false; spawn_count];
        self.defs.wave(next)
    }

    /// Spawns due exactly at `current_tick`, in sorted-entry order.
    pub fn check_spawns(&mut self, current_tick: Ticks) -> Vec<SpawnInstruction> {
        let Some(wave) = self.current_wave.and_then(|w| self.defs.wave(w)) else {
            return Vec::new();
        };
        let Some(elapsed) = current_tick.checked_sub(self.wave_start_tick) else {
            return Vec::new();
        };

        let mut due = Vec::new();
        for (i, spawn) in wave.spawns.iter().enumerate() {
            if !self.spawned[i] && spawn.spawn_tick == elapsed {
                self.spawned[i] = true;
                due.push(SpawnInstruction {
                    enemy_type: spawn.enemy_type.clone(),
                    spawn_index: i,
                });
            }
        }
        due
    }

    /// True once every entry of the active wave has spawned, or when no wave
    /// is active.
    pub fn is_wave_spawning_complete(&self) -> bool {
        self.spawned.iter().all(|&s| s)
    }

    /// Whether a wave exists after the active one (or any wave, before the
    /// first starts).
    pub fn has_more_waves(&self) -> bool {
        self.current_wave.map_or(0, |w| w + 1) < self.defs.wave_count()
    }
}
