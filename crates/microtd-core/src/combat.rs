//! Targeting and damage resolution between towers and enemies.
//!
//! A tower targets the in-range enemy furthest along the path. Ties go to
//! the enemy that comes first in the live collection, which is spawn order.
//! Damage lands instantly.

use crate::definitions::{GridPos, MapDef, Waypoint};
use crate::entity::{Enemy, Tower};
use crate::fixed::Fixed64;

/// What one shot did, for event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    pub damage: Fixed64,
    pub remaining_hp: Fixed64,
    /// Magnitude and duration of the slow now on the target, if one was applied.
    pub slow_applied: Option<(Fixed64, u32)>,
    pub killed: bool,
}

#[derive(Debug, Clone)]
pub struct CombatResolver {
    /// Sorted once by path progress.
    waypoints: Vec<Waypoint>,
    slow_duration_ticks: u32,
}

impl CombatResolver {
    pub fn new(map: &MapDef, slow_duration_ticks: u32) -> Self {
        let mut waypoints = map.waypoints.clone();
        waypoints.sort_by_key(|w| w.path_progress);
        Self {
            waypoints,
            slow_duration_ticks,
        }
    }

    /// Tile an enemy occupies at the given path progress.
    pub fn enemy_position(&self, progress: Fixed64) -> GridPos {
        let (Some(first), Some(last)) = (self.waypoints.first(), self.waypoints.last()) else {
            return GridPos::new(0, 0);
        };
        if progress <= first.path_progress {
            return first.pos;
        }
        if progress >= last.path_progress {
            return last.pos;
        }

        for pair in self.waypoints.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if progress >= a.path_progress && progress <= b.path_progress {
                let span = b.path_progress - a.path_progress;
                if span <= Fixed64::ZERO {
                    return b.pos;
                }
                let t = (progress - a.path_progress) / span;
                return GridPos::new(lerp_round(a.pos.x, b.pos.x, t), lerp_round(a.pos.y, b.pos.y, t));
            }
        }
        last.pos
    }

    pub fn is_in_range(&self, tower: &Tower, enemy: &Enemy) -> bool {
        let dist_sq = tower.pos.distance_squared(self.enemy_position(enemy.path_progress));
        let range = tower.effective_range();
        if range < Fixed64::ZERO {
            return false;
        }
        match Fixed64::checked_from_num(dist_sq) {
            Some(d) => d <= range.saturating_mul(range),
            None => false,
        }
    }

    /// Index of the enemy this tower should shoot, if any.
    ///
    /// Only living enemies still on the path are candidates. A later enemy
    /// replaces the current pick only with strictly greater progress.
    pub fn find_target(&self, tower: &Tower, enemies: &[Enemy]) -> Option<usize> {
        let mut best: Option<(usize, Fixed64)> = None;
        for (i, enemy) in enemies.iter().enumerate() {
            if !enemy.is_alive() || enemy.has_reached_end() || !self.is_in_range(tower, enemy) {
                continue;
            }
            match best {
                Some((_, progress)) if enemy.path_progress <= progress => {}
                _ => best = Some((i, enemy.path_progress)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Resolve one shot. The cooldown resets even on a killing blow.
    pub fn attack(&self, tower: &mut Tower, enemy: &mut Enemy) -> AttackOutcome {
        let damage = tower.effective_damage();
        let killed = enemy.take_damage(damage);
        tower.record_damage(damage);
        tower.reset_cooldown();

        let mut slow_applied = None;
        let slow_on_hit = tower.modifiers.slow_on_hit;
        if slow_on_hit > Fixed64::ZERO {
            enemy.apply_slow(slow_on_hit, self.slow_duration_ticks);
            slow_applied = enemy.slow.map(|s| (s.amount, s.remaining_ticks));
        }

        if killed {
            tower.record_kill();
        }

        AttackOutcome {
            damage,
            remaining_hp: enemy.hp.max(Fixed64::ZERO),
            slow_applied,
            killed,
        }
    }
}

fn lerp_round(a: i32, b: i32, t: Fixed64) -> i32 {
    let v = Fixed64::from_num(a) + Fixed64::from_num(b - a) * t;
    v.round().to_num::<i32>()
}
