//! End-of-run outcome, the hand-off from a run to progression.

use serde::{Deserialize, Serialize};

/// Outcome of one run. `run_seed` is the idempotency key when the summary is
/// applied to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_seed: u64,
    pub did_win: bool,
    pub waves_cleared: u32,
    pub enemies_defeated: u32,
    pub total_coins_earned: u64,
    pub relics_collected: u32,
    pub ticks_survived: u64,
}
