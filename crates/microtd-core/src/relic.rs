//! Relic inventory and combined modifiers.
//!
//! Offer generation is the only operation here that draws from the RNG.
//! Applying or choosing a relic touches no RNG state, so a replay that
//! skips or adds a choice still sees the same later offers.

use std::sync::Arc;

use crate::definitions::{EffectKind, RelicDef};
use crate::entity::TowerModifiers;
use crate::fixed::Fixed64;
use crate::registry::GameDefinitions;
use crate::rng::SimRng;

/// Product of all multiplicative effects and sum of all additive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedModifiers {
    pub damage_multiplier: Fixed64,
    pub range_multiplier: Fixed64,
    pub fire_rate_multiplier: Fixed64,
    pub coin_multiplier: Fixed64,
    pub slow_on_hit: Fixed64,
    pub starting_coins: Fixed64,
}

impl Default for CombinedModifiers {
    fn default() -> Self {
        Self {
            damage_multiplier: Fixed64::ONE,
            range_multiplier: Fixed64::ONE,
            fire_rate_multiplier: Fixed64::ONE,
            coin_multiplier: Fixed64::ONE,
            slow_on_hit: Fixed64::ZERO,
            starting_coins: Fixed64::ZERO,
        }
    }
}

impl CombinedModifiers {
    /// Fold a set of relics, in inventory order.
    pub fn from_relics<'a>(relics: impl IntoIterator<Item = &'a RelicDef>) -> Self {
        let mut combined = Self::default();
        for relic in relics {
            for effect in &relic.effects {
                let slot = match effect.kind {
                    EffectKind::TowerDamageMultiplier => &mut combined.damage_multiplier,
                    EffectKind::TowerRangeMultiplier => &mut combined.range_multiplier,
                    EffectKind::TowerFireRateMultiplier => &mut combined.fire_rate_multiplier,
                    EffectKind::CoinMultiplier => &mut combined.coin_multiplier,
                    EffectKind::EnemySlowOnHit => &mut combined.slow_on_hit,
                    EffectKind::StartingCoins => &mut combined.starting_coins,
                };
                if effect.kind.is_multiplicative() {
                    *slot = slot.saturating_mul(effect.value);
                } else {
                    *slot = slot.saturating_add(effect.value);
                }
            }
        }
        combined
    }

    pub fn tower_modifiers(&self) -> TowerModifiers {
        TowerModifiers {
            damage_multiplier: self.damage_multiplier,
            range_multiplier: self.range_multiplier,
            fire_rate_multiplier: self.fire_rate_multiplier,
            slow_on_hit: self.slow_on_hit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelicError {
    #[error("unknown relic: {0}")]
    UnknownRelic(String),
    #[error("relic choice {index} out of range for an offer of {len}")]
    ChoiceOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
pub struct RelicSystem {
    defs: Arc<GameDefinitions>,
    owned: Vec<String>,
    combined: CombinedModifiers,
}

impl RelicSystem {
    pub fn new(defs: Arc<GameDefinitions>) -> Self {
        Self {
            defs,
            owned: Vec::new(),
            combined: CombinedModifiers::default(),
        }
    }

    /// Draw up to `count` relic ids by shuffling the eligible pool.
    ///
    /// The pool is the definitions' relic list in registration order, minus
    /// owned relics when `exclude_owned` is set.
    pub fn generate_choices(&self, rng: &mut SimRng, count: usize, exclude_owned: bool) -> Vec<String> {
        let mut pool: Vec<&str> = self
            .defs
            .relics()
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| !(exclude_owned && self.owns(id)))
            .collect();
        rng.shuffle(&mut pool);
        pool.into_iter().take(count).map(str::to_string).collect()
    }

    /// Add a relic to the inventory and recompute the combined modifiers.
    pub fn apply_relic(&mut self, id: &str) -> Result<(), RelicError> {
        if self.defs.relic(id).is_none() {
            return Err(RelicError::UnknownRelic(id.to_string()));
        }
        self.owned.push(id.to_string());
        self.recompute();
        Ok(())
    }

    /// Apply the relic at `index` of a previously generated offer. Returns
    /// the chosen id.
    pub fn choose_relic(&mut self, offer: &[String], index: usize) -> Result<String, RelicError> {
        let id = offer.get(index).ok_or(RelicError::ChoiceOutOfRange {
            index,
            len: offer.len(),
        })?;
        self.apply_relic(id)?;
        Ok(id.clone())
    }

    fn recompute(&mut self) {
        let defs = &self.defs;
        self.combined = CombinedModifiers::from_relics(self.owned.iter().filter_map(|id| defs.relic(id)));
    }

    pub fn owns(&self, id: &str) -> bool {
        self.owned.iter().any(|o| o == id)
    }

    /// Owned relic ids in acquisition order.
    pub fn owned(&self) -> &[String] {
        &self.owned
    }

    pub fn combined(&self) -> &CombinedModifiers {
        &self.combined
    }
}
