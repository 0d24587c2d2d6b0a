//! Replay capture and playback for regression checks and desync hunting.
//!
//! A run is fully described by its seed, map, config, and command log. The
//! replay log stores those plus the tick count and a digest of the event
//! stream, so playback can confirm it reproduced the exact same run.

use std::sync::Arc;

use crate::command::Command;
use crate::config::SimConfig;
use crate::engine::{GameState, SetupError};
use crate::fixed::Ticks;
use crate::registry::GameDefinitions;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("replay encode failed: {0}")]
    Encode(String),
    #[error("replay decode failed: {0}")]
    Decode(String),
    #[error("replay setup failed: {0}")]
    Setup(#[from] SetupError),
}

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReplayLog {
    pub seed: u64,
    pub map_id: String,
    pub config: SimConfig,
    /// Commands in submission order, each stamped with its issue tick.
    pub commands: Vec<Command>,
    pub total_ticks: Ticks,
    pub event_count: u64,
    pub event_digest: u64,
    pub final_state_hash: u64,
}

impl ReplayLog {
    /// Record everything needed to reproduce `game` as it stands now.
    pub fn capture(game: &GameState) -> Self {
        Self {
            seed: game.seed(),
            map_id: game.map_id().to_string(),
            config: game.config().clone(),
            commands: game.command_log().commands().to_vec(),
            total_ticks: game.current_tick(),
            event_count: game.events().len() as u64,
            event_digest: game.events().digest(),
            final_state_hash: game.state_hash(),
        }
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Serialize the replay log to bytes (using bitcode).
    pub fn serialize(&self) -> Result<Vec<u8>, ReplayError> {
        bitcode::serialize(self).map_err(|e| ReplayError::Encode(e.to_string()))
    }

    /// Deserialize a replay log from bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self, ReplayError> {
        bitcode::deserialize(data).map_err(|e| ReplayError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// Recorded versus reproduced fingerprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub expected_digest: u64,
    pub actual_digest: u64,
    pub expected_state_hash: u64,
    pub actual_state_hash: u64,
}

#[derive(Debug)]
pub struct ReplayResult {
    pub commands_executed: usize,
    pub is_verified: bool,
    pub mismatch: Option<ReplayMismatch>,
}

// ---------------------------------------------------------------------------
// Replay execution
// ---------------------------------------------------------------------------

/// Rebuild the run. Each command is applied just before the tick it was
/// stamped with; commands stamped at the final tick are applied after the
/// last tick runs.
pub fn replay(defs: Arc<GameDefinitions>, log: &ReplayLog) -> Result<GameState, ReplayError> {
    let mut game = GameState::new(log.seed, defs, &log.map_id, log.config.clone())?;
    let mut pending = log.commands.iter().peekable();

    for tick in 0..log.total_ticks {
        while let Some(cmd) = pending.next_if(|c| c.tick() <= tick) {
            game.process_command(cmd.clone());
        }
        game.tick();
    }
    for cmd in pending {
        game.process_command(cmd.clone());
    }
    Ok(game)
}

/// Replay a log and compare the event digest and final state hash.
pub fn replay_and_verify(defs: Arc<GameDefinitions>, log: &ReplayLog) -> Result<ReplayResult, ReplayError> {
    let game = replay(defs, log)?;
    let actual_digest = game.events().digest();
    let actual_state_hash = game.state_hash();

    let matches = actual_digest == log.event_digest
        && actual_state_hash == log.final_state_hash
        && game.events().len() as u64 == log.event_count;
    let mismatch = (!matches).then(|| ReplayMismatch {
        expected_digest: log.event_digest,
        actual_digest,
        expected_state_hash: log.final_state_hash,
        actual_state_hash,
    });
    if mismatch.is_some() {
        tracing::warn!(seed = log.seed, "replay diverged from recording");
    }

    Ok(ReplayResult {
        commands_executed: game.command_log().len(),
        is_verified: mismatch.is_none(),
        mismatch,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
