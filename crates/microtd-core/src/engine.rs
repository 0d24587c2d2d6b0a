//! The run orchestrator: owns every runtime entity and advances the run one
//! fixed tick at a time.
//!
//! # Architecture
//!
//! `GameState` owns:
//! - A [`SimRng`] seeded once per run (consumed only by relic offers)
//! - A [`SimulationClock`] and a [`RunStateMachine`]
//! - A [`WaveScheduler`], [`CombatResolver`], [`EconomyLedger`] and [`RelicSystem`]
//! - Live enemies and towers in insertion-ordered vectors, plus a
//!   position-to-tower side map
//! - The append-only [`EventLog`] and [`CommandLog`]
//!
//! # Tick pipeline
//!
//! While a wave is running, each `tick()` runs:
//! 1. **Spawn** -- instantiate the scheduler's due enemies
//! 2. **Fire** -- every tower counts down its cooldown and shoots the
//!    furthest-along enemy in range
//! 3. **Move** -- living enemies advance; leaks cost lives and may end the run
//! 4. **Purge** -- dead and leaked enemies leave the live set
//! 5. **Complete** -- an empty, fully-spawned wave pays out and hands off to
//!    building, a relic offer, or victory
//!
//! The clock then steps, so the first processed tick is 0.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::combat::CombatResolver;
use crate::command::{Command, CommandLog, CommandOutcome, IgnoreReason};
use crate::config::{ConfigError, SimConfig};
use crate::definitions::GridPos;
use crate::economy::{CoinReason, EconomyLedger};
use crate::entity::{Enemy, Tower};
use crate::event::{Event, EventLog, LivesReason};
use crate::fixed::{Fixed64, Ticks, scale_floor};
use crate::id::{EnemyId, IdAllocator, TowerId};
use crate::registry::GameDefinitions;
use crate::relic::RelicSystem;
use crate::rng::SimRng;
use crate::sim::{SimulationClock, StateHash};
use crate::state_machine::{RunState, RunStateMachine, TransitionError};
use crate::summary::RunSummary;
use crate::wave::WaveScheduler;

/// Fatal construction failures. A run cannot start without a valid world.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("unknown map: {0}")]
    UnknownMap(String),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameState {
    seed: u64,
    map_id: String,
    config: SimConfig,
    defs: Arc<GameDefinitions>,

    rng: SimRng,
    clock: SimulationClock,
    machine: RunStateMachine,
    scheduler: WaveScheduler,
    combat: CombatResolver,
    economy: EconomyLedger,
    relics: RelicSystem,

    lives: u32,
    enemies: Vec<Enemy>,
    towers: Vec<Tower>,
    tower_grid: BTreeMap<GridPos, TowerId>,
    enemy_ids: IdAllocator,
    tower_ids: IdAllocator,

    /// Offer held fixed for the whole relic-choice visit.
    pending_offer: Option<Vec<String>>,
    waves_cleared: u32,
    enemies_defeated: u32,
    did_win: bool,

    events: EventLog,
    commands: CommandLog,
}

impl GameState {
    /// Start a run on `map_id`. The run begins in `Building(0)` with the
    /// opening coin and lives events logged at tick 0.
    pub fn new(
        seed: u64,
        defs: Arc<GameDefinitions>,
        map_id: &str,
        config: SimConfig,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let map = defs
            .map(map_id)
            .ok_or_else(|| SetupError::UnknownMap(map_id.to_string()))?;
        let combat = CombatResolver::new(map, config.slow_duration_ticks);

        let mut machine = RunStateMachine::new();
        machine.transition(RunState::Building(0))?;

        let mut events = EventLog::new();
        events.emit(Event::CoinsChanged {
            new_total: config.starting_coins,
            delta: config.starting_coins as i64,
            reason: CoinReason::GameStart,
            tick: 0,
        });
        events.emit(Event::LivesChanged {
            new_total: config.starting_lives,
            delta: config.starting_lives as i64,
            reason: LivesReason::GameStart,
            tick: 0,
        });

        tracing::debug!(seed, map_id, "run created");

        Ok(Self {
            seed,
            map_id: map_id.to_string(),
            rng: SimRng::new(seed),
            clock: SimulationClock::new(),
            machine,
            scheduler: WaveScheduler::new(Arc::clone(&defs)),
            combat,
            economy: EconomyLedger::new(config.starting_coins),
            relics: RelicSystem::new(Arc::clone(&defs)),
            lives: config.starting_lives,
            enemies: Vec::new(),
            towers: Vec::new(),
            tower_grid: BTreeMap::new(),
            enemy_ids: IdAllocator::new(),
            tower_ids: IdAllocator::new(),
            pending_offer: None,
            waves_cleared: 0,
            enemies_defeated: 0,
            did_win: false,
            events,
            commands: CommandLog::new(),
            config,
            defs,
        })
    }

    // -----------------------------------------------------------------------
    // Tick pipeline
    // -----------------------------------------------------------------------

    /// Advance the run by exactly one tick.
    pub fn tick(&mut self) {
        let tick = self.clock.current_tick();
        if let RunState::InWave(wave) = self.machine.current() {
            self.phase_spawn(tick);
            self.phase_fire(tick);
            self.phase_move(tick, wave);
            self.enemies.retain(|e| e.is_alive() && !e.has_reached_end());
            self.phase_complete(tick, wave);
        }
        self.clock.step();
    }

    fn phase_spawn(&mut self, tick: Ticks) {
        for instruction in self.scheduler.check_spawns(tick) {
            let Some(def) = self.defs.enemy(&instruction.enemy_type) else {
                continue;
            };
            let id = EnemyId(self.enemy_ids.allocate());
            let enemy = Enemy::spawn(id, def);
            self.events.emit(Event::EnemySpawned {
                enemy: id,
                enemy_type: enemy.enemy_type.clone(),
                path_progress: enemy.path_progress,
                tick,
            });
            self.enemies.push(enemy);
        }
    }

    fn phase_fire(&mut self, tick: Ticks) {
        let coin_multiplier = self.relics.combined().coin_multiplier;
        for tower in &mut self.towers {
            tower.tick_cooldown();
            if !tower.can_fire() {
                continue;
            }
            let Some(target) = self.combat.find_target(tower, &self.enemies) else {
                continue;
            };
            let enemy = &mut self.enemies[target];
            let outcome = self.combat.attack(tower, enemy);

            self.events.emit(Event::TowerFired {
                damage: outcome.damage,
                tick,
            });
            self.events.emit(Event::EnemyDamaged {
                damage: outcome.damage,
                remaining_hp: outcome.remaining_hp,
                tick,
            });
            if let Some((slow_amount, duration_ticks)) = outcome.slow_applied {
                self.events.emit(Event::EnemySlowed {
                    slow_amount,
                    duration_ticks,
                    tick,
                });
            }

            if outcome.killed {
                let reward = scale_floor(enemy.coin_reward, coin_multiplier);
                self.enemies_defeated += 1;
                let balance = self.economy.add_coins(reward, CoinReason::EnemyKill);
                self.events.emit(Event::EnemyDied {
                    enemy: enemy.id,
                    coin_reward: reward,
                    tick,
                });
                self.events.emit(Event::CoinsChanged {
                    new_total: balance,
                    delta: reward as i64,
                    reason: CoinReason::EnemyKill,
                    tick,
                });
            }
        }
    }

    fn phase_move(&mut self, tick: Ticks, wave: u32) {
        let step = SimulationClock::tick_fraction();
        for enemy in &mut self.enemies {
            if !enemy.is_alive() {
                continue;
            }
            enemy.advance(step);
            enemy.tick_slow();
            if !enemy.has_reached_end() {
                continue;
            }

            let cost = enemy.lives_cost;
            self.lives = self.lives.saturating_sub(cost);
            self.events.emit(Event::EnemyLeaked {
                enemy: enemy.id,
                lives_cost: cost,
                tick,
            });
            self.events.emit(Event::LivesChanged {
                new_total: self.lives,
                delta: -(cost as i64),
                reason: LivesReason::EnemyLeaked,
                tick,
            });

            // Later leaks in the same tick still log, but defeat resolves once.
            if self.lives == 0 && !self.machine.current().is_game_over() {
                let defeat = RunState::GameOver {
                    waves_completed: wave,
                    did_win: false,
                };
                if let Err(err) = self.machine.transition(defeat) {
                    tracing::warn!(%err, "defeat transition rejected");
                    continue;
                }
                self.events.emit(Event::GameOver {
                    waves_completed: wave,
                    tick,
                });
            }
        }
    }

    fn phase_complete(&mut self, tick: Ticks, wave: u32) {
        if self.machine.current() != RunState::InWave(wave)
            || !self.scheduler.is_wave_spawning_complete()
            || !self.enemies.is_empty()
        {
            return;
        }

        let base = self.defs.wave(wave as usize).map_or(0, |w| w.coin_reward);
        let reward = scale_floor(base, self.relics.combined().coin_multiplier);
        let balance = self.economy.add_coins(reward, CoinReason::WaveComplete);
        self.waves_cleared = wave + 1;
        self.events.emit(Event::WaveCompleted { wave, reward, tick });
        self.events.emit(Event::CoinsChanged {
            new_total: balance,
            delta: reward as i64,
            reason: CoinReason::WaveComplete,
            tick,
        });

        let next = wave + 1;
        if !self.scheduler.has_more_waves() {
            let victory = RunState::GameOver {
                waves_completed: next,
                did_win: true,
            };
            if self.enter(victory) {
                self.did_win = true;
                self.events.emit(Event::RunCompleted {
                    waves_completed: next,
                    total_coins_earned: self.economy.total_earned(),
                    tick,
                });
            }
            return;
        }

        if self.config.relic_offer_due(wave) {
            let offer = self.relics.generate_choices(
                &mut self.rng,
                self.config.relic_choice_count as usize,
                true,
            );
            if !offer.is_empty() && self.enter(RunState::RelicChoice(next)) {
                self.events.emit(Event::RelicOffered {
                    choices: offer.clone(),
                    tick,
                });
                self.pending_offer = Some(offer);
                return;
            }
        }
        self.enter(RunState::Building(next));
    }

    /// Apply a transition the pipeline has already checked for. A rejection
    /// here means the pipeline and the table disagree.
    fn enter(&mut self, to: RunState) -> bool {
        match self.machine.transition(to) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "run state transition rejected");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Validate and apply a player command, recording it either way.
    ///
    /// A command that does not fit the current state is a no-op.
    pub fn process_command(&mut self, command: Command) -> CommandOutcome {
        let outcome = match &command {
            Command::PlaceTower {
                tower_type, x, y, ..
            } => self.place_tower(tower_type, GridPos::new(*x, *y)),
            Command::SellTower { x, y, .. } => self.sell_tower(GridPos::new(*x, *y)),
            Command::UpgradeTower { .. } => CommandOutcome::Ignored(IgnoreReason::UpgradesUnsupported),
            Command::StartWave { .. } => self.start_wave(),
            Command::ChooseRelic { index, .. } => self.choose_relic(*index as usize),
        };
        if let CommandOutcome::Ignored(reason) = outcome {
            tracing::debug!(?command, ?reason, state = ?self.machine.current(), "command ignored");
        }
        self.commands.push(command);
        outcome
    }

    fn place_tower(&mut self, tower_type: &str, pos: GridPos) -> CommandOutcome {
        if !matches!(self.machine.current(), RunState::Building(_)) {
            return CommandOutcome::Ignored(IgnoreReason::WrongState);
        }
        let defs = Arc::clone(&self.defs);
        let Some(def) = defs.tower(tower_type) else {
            return CommandOutcome::Ignored(IgnoreReason::UnknownTowerType);
        };
        if !defs.map(&self.map_id).is_some_and(|m| m.is_valid_placement(pos)) {
            return CommandOutcome::Ignored(IgnoreReason::InvalidPlacement);
        }
        if self.tower_grid.contains_key(&pos) {
            return CommandOutcome::Ignored(IgnoreReason::TileOccupied);
        }
        if !self.economy.spend_coins(def.cost) {
            return CommandOutcome::Ignored(IgnoreReason::InsufficientCoins);
        }

        let tick = self.clock.current_tick();
        let id = TowerId(self.tower_ids.allocate());
        let tower = Tower::place(id, def, pos, self.relics.combined().tower_modifiers());
        self.towers.push(tower);
        self.tower_grid.insert(pos, id);

        self.events.emit(Event::TowerPlaced {
            tower: id,
            tower_type: def.id.clone(),
            pos,
            tick,
        });
        self.events.emit(Event::CoinsChanged {
            new_total: self.economy.coins(),
            delta: -(def.cost as i64),
            reason: CoinReason::TowerPurchase,
            tick,
        });
        CommandOutcome::Applied
    }

    fn sell_tower(&mut self, pos: GridPos) -> CommandOutcome {
        if !matches!(self.machine.current(), RunState::Building(_)) {
            return CommandOutcome::Ignored(IgnoreReason::WrongState);
        }
        let Some(id) = self.tower_grid.remove(&pos) else {
            return CommandOutcome::Ignored(IgnoreReason::NoTowerAtPosition);
        };
        let Some(index) = self.towers.iter().position(|t| t.id == id) else {
            return CommandOutcome::Ignored(IgnoreReason::NoTowerAtPosition);
        };
        let tower = self.towers.remove(index);

        let tick = self.clock.current_tick();
        let refund = self.config.sell_refund(tower.cost);
        let balance = self.economy.add_coins(refund, CoinReason::TowerSell);
        self.events.emit(Event::TowerSold {
            tower: id,
            refund,
            tick,
        });
        self.events.emit(Event::CoinsChanged {
            new_total: balance,
            delta: refund as i64,
            reason: CoinReason::TowerSell,
            tick,
        });
        CommandOutcome::Applied
    }

    fn start_wave(&mut self) -> CommandOutcome {
        let RunState::Building(wave) = self.machine.current() else {
            return CommandOutcome::Ignored(IgnoreReason::WrongState);
        };
        let tick = self.clock.current_tick();
        let Some(enemy_count) = self.scheduler.start_wave(tick).map(|w| w.spawns.len() as u32) else {
            return CommandOutcome::Ignored(IgnoreReason::NoWavesRemaining);
        };
        if !self.enter(RunState::InWave(wave)) {
            return CommandOutcome::Ignored(IgnoreReason::WrongState);
        }
        self.events.emit(Event::WaveStarted {
            wave,
            enemy_count,
            tick,
        });
        CommandOutcome::Applied
    }

    fn choose_relic(&mut self, index: usize) -> CommandOutcome {
        let RunState::RelicChoice(wave) = self.machine.current() else {
            return CommandOutcome::Ignored(IgnoreReason::WrongState);
        };
        let Some(offer) = self.pending_offer.as_deref() else {
            return CommandOutcome::Ignored(IgnoreReason::InvalidRelicChoice);
        };

        let bonus_before = whole_coins(self.relics.combined().starting_coins);
        let relic_id = match self.relics.choose_relic(offer, index) {
            Ok(id) => id,
            Err(err) => {
                tracing::debug!(%err, "relic choice rejected");
                return CommandOutcome::Ignored(IgnoreReason::InvalidRelicChoice);
            }
        };
        self.pending_offer = None;

        // Placed towers pick up the new combined modifiers immediately.
        let modifiers = self.relics.combined().tower_modifiers();
        for tower in &mut self.towers {
            tower.modifiers = modifiers;
        }

        let tick = self.clock.current_tick();
        self.events.emit(Event::RelicChosen { relic_id, tick });

        // Floor the combined bonus, not each relic, so fractions add up.
        let bonus = whole_coins(self.relics.combined().starting_coins).saturating_sub(bonus_before);
        if bonus > 0 {
            let balance = self.economy.add_coins(bonus, CoinReason::RelicBonus);
            self.events.emit(Event::CoinsChanged {
                new_total: balance,
                delta: bonus as i64,
                reason: CoinReason::RelicBonus,
                tick,
            });
        }

        self.enter(RunState::Building(wave));
        CommandOutcome::Applied
    }

    // -----------------------------------------------------------------------
    // Run end
    // -----------------------------------------------------------------------

    /// Outcome of the run so far. Meaningful once the run has ended.
    pub fn run_summary(&self) -> RunSummary {
        RunSummary {
            run_seed: self.seed,
            did_win: self.did_win,
            waves_cleared: self.waves_cleared,
            enemies_defeated: self.enemies_defeated,
            total_coins_earned: self.economy.total_earned(),
            relics_collected: self.relics.owned().len() as u32,
            ticks_survived: self.clock.current_tick(),
        }
    }

    /// Move `GameOver -> PostRunSummary` and hand back the summary. `None`
    /// while the run is still going.
    pub fn finish_run(&mut self) -> Option<RunSummary> {
        if !self.machine.current().is_game_over() {
            return None;
        }
        if !self.enter(RunState::PostRunSummary) {
            return None;
        }
        Some(self.run_summary())
    }

    // -----------------------------------------------------------------------
    // Query API (read-only)
    // -----------------------------------------------------------------------

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn map_id(&self) -> &str {
        &self.map_id
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn definitions(&self) -> &Arc<GameDefinitions> {
        &self.defs
    }

    pub fn current_tick(&self) -> Ticks {
        self.clock.current_tick()
    }

    pub fn state(&self) -> RunState {
        self.machine.current()
    }

    pub fn coins(&self) -> u32 {
        self.economy.coins()
    }

    pub fn total_coins_earned(&self) -> u64 {
        self.economy.total_earned()
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn command_log(&self) -> &CommandLog {
        &self.commands
    }

    /// Live enemies in spawn order.
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Placed towers in placement order.
    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn tower_at(&self, pos: GridPos) -> Option<&Tower> {
        let id = self.tower_grid.get(&pos)?;
        self.towers.iter().find(|t| t.id == *id)
    }

    pub fn relics(&self) -> &RelicSystem {
        &self.relics
    }

    /// The offer being decided, while in relic choice.
    pub fn pending_offer(&self) -> Option<&[String]> {
        self.pending_offer.as_deref()
    }

    pub fn rng(&self) -> &SimRng {
        &self.rng
    }

    pub(crate) fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    /// Deterministic digest of the mutable run state, for desync checks.
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();

        hasher.write_u64(self.clock.current_tick());
        hasher.write_u32(self.economy.coins());
        hasher.write_u64(self.economy.total_earned());
        hasher.write_u32(self.lives);

        let state = self.machine.current();
        hasher.write_u32(state.tag());
        match state {
            RunState::Building(w) | RunState::InWave(w) | RunState::RelicChoice(w) => hasher.write_u32(w),
            RunState::GameOver {
                waves_completed,
                did_win,
            } => {
                hasher.write_u32(waves_completed);
                hasher.write_bool(did_win);
            }
            RunState::PreRun | RunState::PostRunSummary => {}
        }

        for enemy in &self.enemies {
            hasher.write_u32(enemy.id.0);
            hasher.write_fixed64(enemy.hp);
            hasher.write_fixed64(enemy.path_progress);
            match enemy.slow {
                Some(slow) => {
                    hasher.write_fixed64(slow.amount);
                    hasher.write_u32(slow.remaining_ticks);
                }
                None => hasher.write_u32(u32::MAX),
            }
        }
        for tower in &self.towers {
            hasher.write_u32(tower.id.0);
            hasher.write_i32(tower.pos.x);
            hasher.write_i32(tower.pos.y);
            hasher.write_u32(tower.ticks_since_last_fire);
            hasher.write_u32(tower.kills);
        }
        for relic in self.relics.owned() {
            hasher.write_str(relic);
        }
        for word in self.rng.state() {
            hasher.write_u64(word);
        }
        hasher.write_u32(self.enemy_ids.peek());
        hasher.write_u32(self.tower_ids.peek());

        hasher.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

/// Whole coins in a fixed-point bonus. Negative totals pay nothing.
fn whole_coins(total: Fixed64) -> u32 {
    total.max(Fixed64::ZERO).floor().saturating_to_num::<u32>()
}
