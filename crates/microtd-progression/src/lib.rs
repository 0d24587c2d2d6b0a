//! Meta-progression for MicroTD: XP, levels, and unlocks across runs.
//!
//! Provides the rules that turn a finished run into XP, a cumulative level
//! table, and a level-gated unlock schedule.
//!
//! # Overview
//!
//! [`ProgressionRules`] holds the tunables: XP weights, the cumulative
//! threshold table, and the unlock schedule. [`ProgressionSystem`] applies
//! a [`RunSummary`] to a [`ProgressionProfile`] and reports what changed as
//! [`ProgressionEvent`]s. Everything here is pure: no I/O, no RNG, no clock.
//! Persisting the profile is the job of the profile crate.
//!
//! # Levels
//!
//! Levels start at 1. `level_thresholds[n]` is the cumulative XP needed to
//! reach level `n + 1`, so the first entry is always 0. Past the end of the
//! table every further level costs `overflow_step` more XP.

use std::collections::BTreeSet;

use microtd_core::summary::RunSummary;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Per-outcome XP weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpWeights {
    pub per_wave_cleared: u64,
    pub per_enemy_defeated: u64,
    pub per_relic_collected: u64,
    /// Flat bonus for winning the run.
    pub win_bonus: u64,
}

impl Default for XpWeights {
    fn default() -> Self {
        Self {
            per_wave_cleared: 20,
            per_enemy_defeated: 2,
            per_relic_collected: 10,
            win_bonus: 100,
        }
    }
}

/// An item granted once the profile reaches `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockEntry {
    pub level: u32,
    pub item_id: String,
}

impl UnlockEntry {
    pub fn new(level: u32, item_id: impl Into<String>) -> Self {
        Self {
            level,
            item_id: item_id.into(),
        }
    }
}

/// Tunables for XP, levels, and unlocks. Immutable once handed to a
/// [`ProgressionSystem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionRules {
    /// Cumulative XP to reach level `index + 1`.
    pub level_thresholds: Vec<u64>,

    /// XP per level beyond the end of `level_thresholds`.
    pub overflow_step: u64,

    pub xp_weights: XpWeights,

    /// Unlocks in grant order.
    pub unlock_schedule: Vec<UnlockEntry>,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            level_thresholds: vec![0, 100, 250, 500, 800, 1200, 1800, 2500, 3500, 5000],
            overflow_step: 2000,
            xp_weights: XpWeights::default(),
            unlock_schedule: vec![
                UnlockEntry::new(2, "relic_uncommon_pack"),
                UnlockEntry::new(2, "tower_sniper"),
                UnlockEntry::new(3, "relic_rare_pack"),
                UnlockEntry::new(3, "tower_missile"),
                UnlockEntry::new(4, "relic_legendary_pack"),
                UnlockEntry::new(5, "map_fortress"),
            ],
        }
    }
}

impl ProgressionRules {
    /// Check the threshold table is usable: non-empty, starting at 0, and
    /// strictly increasing.
    pub fn validate(&self) -> Result<(), ProgressionError> {
        match self.level_thresholds.first() {
            None => return Err(ProgressionError::EmptyThresholds),
            Some(&first) if first != 0 => return Err(ProgressionError::NonZeroBaseThreshold(first)),
            Some(_) => {}
        }
        if let Some(index) = self
            .level_thresholds
            .windows(2)
            .position(|pair| pair[0] >= pair[1])
        {
            return Err(ProgressionError::NonIncreasingThreshold { index: index + 1 });
        }
        Ok(())
    }

    /// XP earned by a run. Saturates instead of overflowing.
    pub fn calculate_xp(&self, summary: &RunSummary) -> u64 {
        let w = &self.xp_weights;
        let win = if summary.did_win { w.win_bonus } else { 0 };
        (summary.waves_cleared as u64)
            .saturating_mul(w.per_wave_cleared)
            .saturating_add((summary.enemies_defeated as u64).saturating_mul(w.per_enemy_defeated))
            .saturating_add((summary.relics_collected as u64).saturating_mul(w.per_relic_collected))
            .saturating_add(win)
    }

    /// Cumulative XP needed to stand at `level`. Levels at or below 1 need
    /// nothing. Returns `u64::MAX` for levels that can never be reached.
    pub fn xp_required_for_level(&self, level: u32) -> u64 {
        if level <= 1 {
            return 0;
        }
        let index = (level - 1) as usize;
        if let Some(&xp) = self.level_thresholds.get(index) {
            return xp;
        }
        let Some(&last) = self.level_thresholds.last() else {
            return u64::MAX;
        };
        if self.overflow_step == 0 {
            return u64::MAX;
        }
        let extra = (index - (self.level_thresholds.len() - 1)) as u64;
        last.saturating_add(extra.saturating_mul(self.overflow_step))
    }

    /// Highest level whose cumulative requirement `xp` meets.
    pub fn level_for_xp(&self, xp: u64) -> u32 {
        let table_level = self
            .level_thresholds
            .iter()
            .skip(1)
            .take_while(|&&t| xp >= t)
            .count() as u32
            + 1;
        if (table_level as usize) < self.level_thresholds.len() || self.overflow_step == 0 {
            return table_level;
        }
        let last = self.level_thresholds.last().copied().unwrap_or(0);
        let extra = (xp - last) / self.overflow_step;
        table_level.saturating_add(u32::try_from(extra).unwrap_or(u32::MAX))
    }

    /// Every item whose required level is at or below `level`, in schedule
    /// order.
    pub fn unlocks_for_level(&self, level: u32) -> impl Iterator<Item = &str> + '_ {
        self.unlock_schedule
            .iter()
            .filter(move |u| u.level <= level)
            .map(|u| u.item_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Cross-run player progress. `level` always agrees with `xp` under the
/// rules that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionProfile {
    pub xp: u64,
    pub level: u32,
    /// Sorted, so equal profiles serialize identically.
    pub unlocks: BTreeSet<String>,
}

impl Default for ProgressionProfile {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            unlocks: BTreeSet::new(),
        }
    }
}

impl ProgressionProfile {
    pub fn is_unlocked(&self, item_id: &str) -> bool {
        self.unlocks.contains(item_id)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What applying a run changed, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    XpGained { amount: u64, new_total: u64 },
    /// One per level crossed.
    LeveledUp { new_level: u32 },
    Unlocked { item_id: String },
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error("level threshold table is empty")]
    EmptyThresholds,

    #[error("first level threshold must be 0, got {0}")]
    NonZeroBaseThreshold(u64),

    #[error("level threshold at index {index} does not increase")]
    NonIncreasingThreshold { index: usize },
}

// ---------------------------------------------------------------------------
// ProgressionSystem
// ---------------------------------------------------------------------------

/// Applies run outcomes to a profile under a fixed set of rules.
#[derive(Debug, Clone, Default)]
pub struct ProgressionSystem {
    rules: ProgressionRules,
}

impl ProgressionSystem {
    pub fn new(rules: ProgressionRules) -> Result<Self, ProgressionError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    /// Credit `summary` to `profile` in place.
    ///
    /// Each level crossed emits `LeveledUp` followed by the unlocks it
    /// grants. A run worth zero XP changes nothing and emits nothing.
    pub fn apply_run(
        &self,
        summary: &RunSummary,
        profile: &mut ProgressionProfile,
    ) -> Vec<ProgressionEvent> {
        let mut events = Vec::new();
        let amount = self.rules.calculate_xp(summary);
        if amount == 0 {
            return events;
        }

        profile.xp = profile.xp.saturating_add(amount);
        events.push(ProgressionEvent::XpGained {
            amount,
            new_total: profile.xp,
        });

        let target = self.rules.level_for_xp(profile.xp);
        while profile.level < target {
            profile.level += 1;
            events.push(ProgressionEvent::LeveledUp {
                new_level: profile.level,
            });
            self.grant_unlocks(profile, &mut events);
        }
        events
    }

    /// Grant anything the profile's level entitles it to but it does not
    /// hold yet. Returns the items granted. Run on every profile load.
    pub fn reconcile_unlocks(&self, profile: &mut ProgressionProfile) -> Vec<String> {
        let mut events = Vec::new();
        self.grant_unlocks(profile, &mut events);
        events
            .into_iter()
            .filter_map(|e| match e {
                ProgressionEvent::Unlocked { item_id } => Some(item_id),
                _ => None,
            })
            .collect()
    }

    fn grant_unlocks(&self, profile: &mut ProgressionProfile, events: &mut Vec<ProgressionEvent>) {
        for item_id in self.rules.unlocks_for_level(profile.level) {
            if profile.unlocks.insert(item_id.to_string()) {
                events.push(ProgressionEvent::Unlocked {
                    item_id: item_id.to_string(),
                });
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
