//! Run lifecycle.
//!
//! ```text
//! PreRun -> Building(0) -> InWave(w) -> Building(w+1)
//!                                     -> RelicChoice(w+1) -> Building(w+1)
//!                                     -> GameOver -> PostRunSummary -> PreRun
//! ```
//!
//! Illegal transitions are rejected with [`TransitionError`]; the machine is
//! never coerced into a state the table does not allow.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    PreRun,
    Building(u32),
    InWave(u32),
    RelicChoice(u32),
    GameOver { waves_completed: u32, did_win: bool },
    PostRunSummary,
}

impl RunState {
    /// The wave index carried by the state, if any.
    pub fn wave_index(self) -> Option<u32> {
        match self {
            RunState::Building(w) | RunState::InWave(w) | RunState::RelicChoice(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_game_over(self) -> bool {
        matches!(self, RunState::GameOver { .. })
    }

    /// Stable numeric tag, for hashing.
    pub fn tag(self) -> u32 {
        match self {
            RunState::PreRun => 0,
            RunState::Building(_) => 1,
            RunState::InWave(_) => 2,
            RunState::RelicChoice(_) => 3,
            RunState::GameOver { .. } => 4,
            RunState::PostRunSummary => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal run-state transition from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: RunState,
    pub to: RunState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStateMachine {
    current: RunState,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            current: RunState::PreRun,
        }
    }

    pub fn current(&self) -> RunState {
        self.current
    }

    /// Whether the table allows `from -> to`.
    pub fn can_transition(from: RunState, to: RunState) -> bool {
        use RunState::*;
        match (from, to) {
            (PreRun, Building(0)) => true,
            (Building(w), InWave(v)) => w == v,
            (InWave(w), Building(v)) | (InWave(w), RelicChoice(v)) => v == w + 1,
            (InWave(_), GameOver { .. }) => true,
            (RelicChoice(w), Building(v)) => w == v,
            (GameOver { .. }, PostRunSummary) => true,
            (PostRunSummary, PreRun) => true,
            _ => false,
        }
    }

    pub fn transition(&mut self, to: RunState) -> Result<(), TransitionError> {
        if !Self::can_transition(self.current, to) {
            return Err(TransitionError {
                from: self.current,
                to,
            });
        }
        tracing::debug!(from = ?self.current, to = ?to, "run state transition");
        self.current = to;
        Ok(())
    }
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
