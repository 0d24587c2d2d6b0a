//! Append-only event log: the only channel from simulation to rendering.
//!
//! Every discrete happening in a tick or command appends one [`Event`].
//! Lifecycle events carry instance ids so the renderer can pool nodes;
//! cosmetic events (damage numbers, slows, muzzle flashes) omit them so
//! long regression snapshots don't churn on unrelated id changes.
//!
//! Consumers drain incrementally with [`EventLog::slice`] or an
//! [`EventCursor`]; nothing is ever removed, so no event is dropped or seen
//! twice.

use serde::{Deserialize, Serialize};

use crate::definitions::GridPos;
use crate::economy::CoinReason;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{EnemyId, TowerId};
use crate::sim::StateHash;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LivesReason {
    GameStart,
    EnemyLeaked,
}

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // -- Enemy lifecycle --
    EnemySpawned {
        enemy: EnemyId,
        enemy_type: String,
        path_progress: Fixed64,
        tick: Ticks,
    },
    EnemyDied {
        enemy: EnemyId,
        coin_reward: u32,
        tick: Ticks,
    },
    EnemyLeaked {
        enemy: EnemyId,
        lives_cost: u32,
        tick: Ticks,
    },

    // -- Cosmetic --
    EnemyDamaged {
        damage: Fixed64,
        remaining_hp: Fixed64,
        tick: Ticks,
    },
    EnemySlowed {
        slow_amount: Fixed64,
        duration_ticks: u32,
        tick: Ticks,
    },
    TowerFired {
        damage: Fixed64,
        tick: Ticks,
    },

    // -- Towers --
    TowerPlaced {
        tower: TowerId,
        tower_type: String,
        pos: GridPos,
        tick: Ticks,
    },
    TowerSold {
        tower: TowerId,
        refund: u32,
        tick: Ticks,
    },

    // -- Economy --
    CoinsChanged {
        new_total: u32,
        delta: i64,
        reason: CoinReason,
        tick: Ticks,
    },
    LivesChanged {
        new_total: u32,
        delta: i64,
        reason: LivesReason,
        tick: Ticks,
    },

    // -- Waves --
    WaveStarted {
        wave: u32,
        enemy_count: u32,
        tick: Ticks,
    },
    WaveCompleted {
        wave: u32,
        reward: u32,
        tick: Ticks,
    },

    // -- Relics --
    RelicOffered {
        choices: Vec<String>,
        tick: Ticks,
    },
    RelicChosen {
        relic_id: String,
        tick: Ticks,
    },

    // -- Run end --
    /// Lives ran out.
    GameOver {
        waves_completed: u32,
        tick: Ticks,
    },
    /// The final wave was cleared.
    RunCompleted {
        waves_completed: u32,
        total_coins_earned: u64,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EnemySpawned,
    EnemyDied,
    EnemyLeaked,
    EnemyDamaged,
    EnemySlowed,
    TowerFired,
    TowerPlaced,
    TowerSold,
    CoinsChanged,
    LivesChanged,
    WaveStarted,
    WaveCompleted,
    RelicOffered,
    RelicChosen,
    GameOver,
    RunCompleted,
}

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::EnemySpawned { .. } => EventKind::EnemySpawned,
            Event::EnemyDied { .. } => EventKind::EnemyDied,
            Event::EnemyLeaked { .. } => EventKind::EnemyLeaked,
            Event::EnemyDamaged { .. } => EventKind::EnemyDamaged,
            Event::EnemySlowed { .. } => EventKind::EnemySlowed,
            Event::TowerFired { .. } => EventKind::TowerFired,
            Event::TowerPlaced { .. } => EventKind::TowerPlaced,
            Event::TowerSold { .. } => EventKind::TowerSold,
            Event::CoinsChanged { .. } => EventKind::CoinsChanged,
            Event::LivesChanged { .. } => EventKind::LivesChanged,
            Event::WaveStarted { .. } => EventKind::WaveStarted,
            Event::WaveCompleted { .. } => EventKind::WaveCompleted,
            Event::RelicOffered { .. } => EventKind::RelicOffered,
            Event::RelicChosen { .. } => EventKind::RelicChosen,
            Event::GameOver { .. } => EventKind::GameOver,
            Event::RunCompleted { .. } => EventKind::RunCompleted,
        }
    }

    /// The tick at which the event occurred.
    pub fn tick(&self) -> Ticks {
        match self {
            Event::EnemySpawned { tick, .. }
            | Event::EnemyDied { tick, .. }
            | Event::EnemyLeaked { tick, .. }
            | Event::EnemyDamaged { tick, .. }
            | Event::EnemySlowed { tick, .. }
            | Event::TowerFired { tick, .. }
            | Event::TowerPlaced { tick, .. }
            | Event::TowerSold { tick, .. }
            | Event::CoinsChanged { tick, .. }
            | Event::LivesChanged { tick, .. }
            | Event::WaveStarted { tick, .. }
            | Event::WaveCompleted { tick, .. }
            | Event::RelicOffered { tick, .. }
            | Event::RelicChosen { tick, .. }
            | Event::GameOver { tick, .. }
            | Event::RunCompleted { tick, .. } => *tick,
        }
    }

    /// Feed every field into `hash`, tagged by kind.
    pub fn hash_into(&self, hash: &mut StateHash) {
        hash.write_u32(self.kind() as u32);
        hash.write_u64(self.tick());
        match self {
            Event::EnemySpawned {
                enemy,
                enemy_type,
                path_progress,
                ..
            } => {
                hash.write_u32(enemy.0);
                hash.write_str(enemy_type);
                hash.write_fixed64(*path_progress);
            }
            Event::EnemyDied {
                enemy, coin_reward, ..
            } => {
                hash.write_u32(enemy.0);
                hash.write_u32(*coin_reward);
            }
            Event::EnemyLeaked {
                enemy, lives_cost, ..
            } => {
                hash.write_u32(enemy.0);
                hash.write_u32(*lives_cost);
            }
            Event::EnemyDamaged {
                damage,
                remaining_hp,
                ..
            } => {
                hash.write_fixed64(*damage);
                hash.write_fixed64(*remaining_hp);
            }
            Event::EnemySlowed {
                slow_amount,
                duration_ticks,
                ..
            } => {
                hash.write_fixed64(*slow_amount);
                hash.write_u32(*duration_ticks);
            }
            Event::TowerFired { damage, .. } => hash.write_fixed64(*damage),
            Event::TowerPlaced {
                tower,
                tower_type,
                pos,
                ..
            } => {
                hash.write_u32(tower.0);
                hash.write_str(tower_type);
                hash.write_i32(pos.x);
                hash.write_i32(pos.y);
            }
            Event::TowerSold { tower, refund, .. } => {
                hash.write_u32(tower.0);
                hash.write_u32(*refund);
            }
            Event::CoinsChanged {
                new_total,
                delta,
                reason,
                ..
            } => {
                hash.write_u32(*new_total);
                hash.write_u64(*delta as u64);
                hash.write_u32(*reason as u32);
            }
            Event::LivesChanged {
                new_total,
                delta,
                reason,
                ..
            } => {
                hash.write_u32(*new_total);
                hash.write_u64(*delta as u64);
                hash.write_u32(*reason as u32);
            }
            Event::WaveStarted {
                wave, enemy_count, ..
            } => {
                hash.write_u32(*wave);
                hash.write_u32(*enemy_count);
            }
            Event::WaveCompleted { wave, reward, .. } => {
                hash.write_u32(*wave);
                hash.write_u32(*reward);
            }
            Event::RelicOffered { choices, .. } => {
                hash.write_u64(choices.len() as u64);
                for choice in choices {
                    hash.write_str(choice);
                }
            }
            Event::RelicChosen { relic_id, .. } => hash.write_str(relic_id),
            Event::GameOver {
                waves_completed, ..
            } => hash.write_u32(*waves_completed),
            Event::RunCompleted {
                waves_completed,
                total_coins_earned,
                ..
            } => {
                hash.write_u32(*waves_completed);
                hash.write_u64(*total_coins_earned);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events from index `from` onward. Past the end yields an empty slice.
    pub fn slice(&self, from: usize) -> &[Event] {
        self.events.get(from..).unwrap_or(&[])
    }

    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    /// FNV-1a digest of the whole stream, for replay verification.
    pub fn digest(&self) -> u64 {
        let mut hash = StateHash::new();
        for event in &self.events {
            event.hash_into(&mut hash);
        }
        hash.finish()
    }
}

/// A consumer's read position in an [`EventLog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCursor {
    next: usize,
}

impl EventCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events appended since the previous poll.
    pub fn poll<'a>(&mut self, log: &'a EventLog) -> &'a [Event] {
        let fresh = log.slice(self.next);
        self.next = log.len();
        fresh
    }

    pub fn position(&self) -> usize {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave_started(tick: Ticks) -> Event {
        Event::WaveStarted {
            wave: 0,
            enemy_count: 3,
            tick,
        }
    }

    #[test]
    fn slice_from_index() {
        let mut log = EventLog::new();
        log.emit(wave_started(0));
        log.emit(wave_started(1));
        log.emit(wave_started(2));
        assert_eq!(log.slice(1).len(), 2);
        assert_eq!(log.slice(3).len(), 0);
        assert!(log.slice(10).is_empty());
    }

    #[test]
    fn cursor_delivers_each_event_once() {
        let mut log = EventLog::new();
        let mut cursor = EventCursor::new();
        log.emit(wave_started(0));
        assert_eq!(cursor.poll(&log).len(), 1);
        assert!(cursor.poll(&log).is_empty());
        log.emit(wave_started(1));
        log.emit(wave_started(2));
        let fresh = cursor.poll(&log);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].tick(), 1);
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn count_of_kind() {
        let mut log = EventLog::new();
        log.emit(wave_started(0));
        log.emit(Event::TowerFired {
            damage: Fixed64::ONE,
            tick: 0,
        });
        assert_eq!(log.count_of(EventKind::WaveStarted), 1);
        assert_eq!(log.count_of(EventKind::GameOver), 0);
    }

    #[test]
    fn digest_sensitive_to_payload() {
        let mut a = EventLog::new();
        a.emit(wave_started(5));
        let mut b = EventLog::new();
        b.emit(Event::WaveStarted {
            wave: 0,
            enemy_count: 4,
            tick: 5,
        });
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), a.clone().digest());
    }
}
