//! Runtime enemy and tower records.
//!
//! Owned by [`GameState`](crate::engine::GameState) in insertion-ordered
//! vectors and addressed by instance id. Nothing outside the orchestrator
//! mutates them.

use crate::definitions::{EnemyDef, GridPos, TowerDef};
use crate::fixed::Fixed64;
use crate::id::{EnemyId, TowerId};
use crate::sim::TICKS_PER_SECOND;

// ---------------------------------------------------------------------------
// Slow effect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowEffect {
    /// Fraction of speed removed, in `[0, 1]`.
    pub amount: Fixed64,
    pub remaining_ticks: u32,
}

// ---------------------------------------------------------------------------
// Enemy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub enemy_type: String,
    pub hp: Fixed64,
    pub max_hp: Fixed64,
    pub base_speed: Fixed64,
    pub path_progress: Fixed64,
    pub slow: Option<SlowEffect>,
    pub coin_reward: u32,
    pub lives_cost: u32,
    pub is_boss: bool,
}

impl Enemy {
    pub fn spawn(id: EnemyId, def: &EnemyDef) -> Self {
        Self {
            id,
            enemy_type: def.id.clone(),
            hp: def.hp,
            max_hp: def.hp,
            base_speed: def.speed,
            path_progress: Fixed64::ZERO,
            slow: None,
            coin_reward: def.coin_reward,
            lives_cost: def.lives_cost,
            is_boss: def.is_boss,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > Fixed64::ZERO
    }

    pub fn has_reached_end(&self) -> bool {
        self.path_progress >= Fixed64::ONE
    }

    /// Base speed reduced by the active slow, if any.
    pub fn effective_speed(&self) -> Fixed64 {
        match self.slow {
            Some(slow) => self.base_speed * (Fixed64::ONE - slow.amount).max(Fixed64::ZERO),
            None => self.base_speed,
        }
    }

    /// Apply damage. Returns `true` if this hit killed the enemy.
    pub fn take_damage(&mut self, amount: Fixed64) -> bool {
        self.hp -= amount;
        self.hp <= Fixed64::ZERO
    }

    /// Slows never stack: keep the stronger magnitude, always take the
    /// incoming duration.
    pub fn apply_slow(&mut self, amount: Fixed64, duration_ticks: u32) {
        let amount = match self.slow {
            Some(existing) => existing.amount.max(amount),
            None => amount,
        };
        self.slow = Some(SlowEffect {
            amount,
            remaining_ticks: duration_ticks,
        });
    }

    /// Count down the active slow, clearing it when it runs out.
    pub fn tick_slow(&mut self) {
        if let Some(slow) = &mut self.slow {
            slow.remaining_ticks = slow.remaining_ticks.saturating_sub(1);
            if slow.remaining_ticks == 0 {
                self.slow = None;
            }
        }
    }

    /// Advance along the path by one tick at the effective speed.
    pub fn advance(&mut self, tick_fraction: Fixed64) {
        self.path_progress += self.effective_speed() * tick_fraction;
    }

    pub fn hp_fraction(&self) -> Fixed64 {
        if self.max_hp <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        (self.hp / self.max_hp).max(Fixed64::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tower
// ---------------------------------------------------------------------------

/// Relic-derived modifiers snapshotted onto every tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TowerModifiers {
    pub damage_multiplier: Fixed64,
    pub range_multiplier: Fixed64,
    pub fire_rate_multiplier: Fixed64,
    pub slow_on_hit: Fixed64,
}

impl Default for TowerModifiers {
    fn default() -> Self {
        Self {
            damage_multiplier: Fixed64::ONE,
            range_multiplier: Fixed64::ONE,
            fire_rate_multiplier: Fixed64::ONE,
            slow_on_hit: Fixed64::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub id: TowerId,
    pub tower_type: String,
    pub pos: GridPos,
    pub cost: u32,
    pub base_damage: Fixed64,
    pub base_range: Fixed64,
    pub base_fire_rate: Fixed64,
    pub ticks_since_last_fire: u32,
    pub kills: u32,
    pub total_damage: Fixed64,
    pub modifiers: TowerModifiers,
}

impl Tower {
    pub fn place(id: TowerId, def: &TowerDef, pos: GridPos, modifiers: TowerModifiers) -> Self {
        Self {
            id,
            tower_type: def.id.clone(),
            pos,
            cost: def.cost,
            base_damage: def.damage,
            base_range: def.range,
            base_fire_rate: def.fire_rate,
            ticks_since_last_fire: 0,
            kills: 0,
            total_damage: Fixed64::ZERO,
            modifiers,
        }
    }

    pub fn effective_damage(&self) -> Fixed64 {
        self.base_damage.saturating_mul(self.modifiers.damage_multiplier)
    }

    pub fn effective_range(&self) -> Fixed64 {
        self.base_range.saturating_mul(self.modifiers.range_multiplier)
    }

    pub fn effective_fire_rate(&self) -> Fixed64 {
        self.base_fire_rate
            .saturating_mul(self.modifiers.fire_rate_multiplier)
    }

    /// `floor(ticks_per_second / effective_fire_rate)`. A non-positive fire
    /// rate never fires.
    pub fn ticks_per_shot(&self) -> u32 {
        let rate = self.effective_fire_rate();
        if rate <= Fixed64::ZERO {
            return u32::MAX;
        }
        match Fixed64::from_num(TICKS_PER_SECOND).checked_div(rate) {
            Some(ticks) => ticks.floor().to_num::<i64>().clamp(0, u32::MAX as i64) as u32,
            None => u32::MAX,
        }
    }

    pub fn can_fire(&self) -> bool {
        self.ticks_since_last_fire >= self.ticks_per_shot()
    }

    /// Advance the cooldown counter by one tick.
    pub fn tick_cooldown(&mut self) {
        self.ticks_since_last_fire = self.ticks_since_last_fire.saturating_add(1);
    }

    pub fn reset_cooldown(&mut self) {
        self.ticks_since_last_fire = 0;
    }

    pub fn record_damage(&mut self, amount: Fixed64) {
        self.total_damage = self.total_damage.saturating_add(amount);
    }

    pub fn record_kill(&mut self) {
        self.kills += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn runner() -> Enemy {
        Enemy::spawn(EnemyId(1), &make_enemy("runner", 50.0, 2.0, 10))
    }

    // -----------------------------------------------------------------------
    // Slow rule
    // -----------------------------------------------------------------------

    #[test]
    fn weaker_slow_keeps_magnitude_but_refreshes_duration() {
        let mut e = runner();
        e.apply_slow(fixed(0.5), 60);
        for _ in 0..40 {
            e.tick_slow();
        }
        assert_eq!(e.slow.unwrap().remaining_ticks, 20);

        e.apply_slow(fixed(0.2), 30);
        let slow = e.slow.unwrap();
        assert_eq!(slow.amount, fixed(0.5));
        assert_eq!(slow.remaining_ticks, 30);
    }

    #[test]
    fn stronger_slow_overwrites_magnitude_and_duration() {
        let mut e = runner();
        e.apply_slow(fixed(0.2), 60);
        e.apply_slow(fixed(0.6), 15);
        let slow = e.slow.unwrap();
        assert_eq!(slow.amount, fixed(0.6));
        assert_eq!(slow.remaining_ticks, 15);
    }

    #[test]
    fn speed_returns_exactly_to_base_after_expiry() {
        let mut e = runner();
        let base = e.effective_speed();
        e.apply_slow(fixed(0.3), 3);
        assert!(e.effective_speed() < base);
        e.tick_slow();
        e.tick_slow();
        assert!(e.slow.is_some());
        e.tick_slow();
        assert!(e.slow.is_none());
        assert_eq!(e.effective_speed(), base);
    }

    #[test]
    fn half_slow_halves_speed() {
        let mut e = runner();
        e.apply_slow(fixed(0.5), 10);
        assert_eq!(e.effective_speed(), fixed(1.0));
    }

    // -----------------------------------------------------------------------
    // Damage and movement
    // -----------------------------------------------------------------------

    #[test]
    fn take_damage_reports_kill_at_zero() {
        let mut e = runner();
        assert!(!e.take_damage(fixed(49.0)));
        assert!(e.is_alive());
        assert!(e.take_damage(fixed(1.0)));
        assert!(!e.is_alive());
    }

    #[test]
    fn advance_reaches_end() {
        let mut e = Enemy::spawn(EnemyId(1), &make_enemy("fast", 1.0, 120.0, 1));
        e.advance(crate::sim::SimulationClock::tick_fraction());
        assert!(e.has_reached_end());
    }

    #[test]
    fn hp_fraction_clamped() {
        let mut e = runner();
        e.take_damage(fixed(75.0));
        assert_eq!(e.hp_fraction(), Fixed64::ZERO);
    }

    // -----------------------------------------------------------------------
    // Tower cadence
    // -----------------------------------------------------------------------

    #[test]
    fn ticks_per_shot_floors() {
        let def = make_tower("t", 10, 2.0, 1.0, 5.0);
        let mut tower = Tower::place(TowerId(1), &def, pos(1, 1), TowerModifiers::default());
        assert_eq!(tower.ticks_per_shot(), 60);
        tower.modifiers.fire_rate_multiplier = fixed(1.4);
        // 60 / 1.4 = 42.86
        assert_eq!(tower.ticks_per_shot(), 42);
    }

    #[test]
    fn zero_fire_rate_never_fires() {
        let def = make_tower("t", 10, 2.0, 0.0, 5.0);
        let mut tower = Tower::place(TowerId(1), &def, pos(1, 1), TowerModifiers::default());
        for _ in 0..1000 {
            tower.tick_cooldown();
        }
        assert!(!tower.can_fire());
    }

    #[test]
    fn cooldown_cycle() {
        let def = make_tower("t", 10, 2.0, 30.0, 5.0);
        let mut tower = Tower::place(TowerId(1), &def, pos(1, 1), TowerModifiers::default());
        assert_eq!(tower.ticks_per_shot(), 2);
        tower.tick_cooldown();
        assert!(!tower.can_fire());
        tower.tick_cooldown();
        assert!(tower.can_fire());
        tower.reset_cooldown();
        assert!(!tower.can_fire());
    }

    #[test]
    fn modifiers_scale_effective_stats() {
        let def = make_tower("t", 10, 2.0, 1.0, 20.0);
        let modifiers = TowerModifiers {
            damage_multiplier: fixed(1.5),
            range_multiplier: fixed(2.0),
            ..TowerModifiers::default()
        };
        let tower = Tower::place(TowerId(1), &def, pos(1, 1), modifiers);
        assert_eq!(tower.effective_damage(), fixed(30.0));
        assert_eq!(tower.effective_range(), fixed(4.0));
    }
}
