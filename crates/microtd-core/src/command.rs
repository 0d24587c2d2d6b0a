//! Player commands and the append-only command log.
//!
//! Every command carries the tick at which it was issued. The log records
//! commands verbatim, applicable or not, so a seed plus the log is enough to
//! reproduce a run exactly (see [`crate::replay`]).

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    PlaceTower {
        tower_type: String,
        x: i32,
        y: i32,
        tick: Ticks,
    },
    SellTower {
        x: i32,
        y: i32,
        tick: Ticks,
    },
    /// Reserved. Recorded in the log, never applied.
    UpgradeTower {
        x: i32,
        y: i32,
        path: String,
        tick: Ticks,
    },
    StartWave {
        tick: Ticks,
    },
    ChooseRelic {
        index: u32,
        tick: Ticks,
    },
}

impl Command {
    /// The tick the command was issued at.
    pub fn tick(&self) -> Ticks {
        match self {
            Command::PlaceTower { tick, .. }
            | Command::SellTower { tick, .. }
            | Command::UpgradeTower { tick, .. }
            | Command::StartWave { tick }
            | Command::ChooseRelic { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a structurally valid command was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// The run is not in the state the command needs.
    WrongState,
    UnknownTowerType,
    InvalidPlacement,
    TileOccupied,
    InsufficientCoins,
    NoTowerAtPosition,
    NoWavesRemaining,
    InvalidRelicChoice,
    UpgradesUnsupported,
}

/// Result of [`GameState::process_command`](crate::engine::GameState::process_command).
///
/// An ignored command is a normal outcome, not an error: input routinely
/// races ahead of state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

// ---------------------------------------------------------------------------
// CommandLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    commands: Vec<Command>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Recorded commands in submission order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether issue ticks never decrease along the log.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn is_chronological(&self) -> bool {
        self.commands.windows(2).all(|w| w[0].tick() <= w[1].tick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Test 1: log preserves submission order
    // -----------------------------------------------------------------------
    #[test]
    fn log_preserves_order() {
        let mut log = CommandLog::new();
        log.push(Command::StartWave { tick: 0 });
        log.push(Command::SellTower { x: 1, y: 1, tick: 4 });
        log.push(Command::ChooseRelic { index: 2, tick: 9 });

        assert_eq!(log.len(), 3);
        assert!(matches!(log.commands()[0], Command::StartWave { .. }));
        assert!(matches!(log.commands()[1], Command::SellTower { .. }));
        assert!(matches!(log.commands()[2], Command::ChooseRelic { index: 2, .. }));
    }

    // -----------------------------------------------------------------------
    // Test 2: chronology check
    // -----------------------------------------------------------------------
    #[test]
    fn chronology() {
        let mut log = CommandLog::new();
        assert!(log.is_chronological());
        log.push(Command::StartWave { tick: 5 });
        log.push(Command::StartWave { tick: 5 });
        assert!(log.is_chronological());
        log.push(Command::StartWave { tick: 3 });
        assert!(!log.is_chronological());
    }

    // -----------------------------------------------------------------------
    // Test 3: every variant reports its tick
    // -----------------------------------------------------------------------
    #[test]
    fn tick_accessor() {
        let commands = [
            Command::PlaceTower {
                tower_type: "cannon".into(),
                x: 0,
                y: 0,
                tick: 1,
            },
            Command::SellTower { x: 0, y: 0, tick: 2 },
            Command::UpgradeTower {
                x: 0,
                y: 0,
                path: "heavy".into(),
                tick: 3,
            },
            Command::StartWave { tick: 4 },
            Command::ChooseRelic { index: 0, tick: 5 },
        ];
        let ticks: Vec<Ticks> = commands.iter().map(Command::tick).collect();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn outcome_predicate() {
        assert!(CommandOutcome::Applied.is_applied());
        assert!(!CommandOutcome::Ignored(IgnoreReason::WrongState).is_applied());
    }
}
