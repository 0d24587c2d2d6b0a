//! MicroTD Core -- the deterministic simulation for a wave-based tower
//! defense run.
//!
//! Given a seed, an immutable definitions bundle, and a stream of player
//! commands, the core produces the same event sequence tick for tick on
//! every machine. All gameplay math is Q32.32 fixed point and the only
//! entropy source is the seeded [`rng::SimRng`].
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::GameState::tick`] during a wave runs:
//!
//! 1. **Spawn** -- enemies due this tick enter at path progress 0.
//! 2. **Fire** -- towers whose cooldown has elapsed shoot the in-range enemy
//!    furthest along the path.
//! 3. **Move** -- enemies advance; those reaching the end cost lives.
//! 4. **Purge** -- dead and leaked enemies are removed.
//! 5. **Complete** -- an empty, fully-spawned wave pays its reward and moves
//!    the run to building, a relic choice, or victory.
//!
//! # Commands and Events
//!
//! ```rust,ignore
//! let mut game = GameState::new(seed, defs, "default", SimConfig::default())?;
//! game.process_command(Command::StartWave { tick: game.current_tick() });
//! game.tick();
//! for event in cursor.poll(game.events()) { /* render */ }
//! ```
//!
//! # Key Types
//!
//! - [`engine::GameState`] -- Run orchestrator.
//! - [`registry::GameDefinitions`] -- Validated, immutable content bundle.
//! - [`state_machine::RunStateMachine`] -- Run lifecycle transition table.
//! - [`event::EventLog`] -- Append-only event stream with incremental draining.
//! - [`command::CommandLog`] -- Append-only command stream for replay.
//! - [`replay::ReplayLog`] -- Seed plus commands, verified by event digest.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod combat;
pub mod command;
pub mod config;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod definitions;
pub mod economy;
pub mod engine;
pub mod entity;
pub mod event;
pub mod fixed;
pub mod id;
pub mod query;
pub mod registry;
pub mod relic;
pub mod replay;
pub mod rng;
pub mod sim;
pub mod state_machine;
pub mod summary;
pub mod wave;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
