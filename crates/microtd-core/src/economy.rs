//! Coin balance and lifetime earnings.

use serde::{Deserialize, Serialize};

/// Why coins moved. Carried into events; never consulted for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinReason {
    GameStart,
    EnemyKill,
    WaveComplete,
    TowerPurchase,
    TowerSell,
    RelicBonus,
}

impl CoinReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CoinReason::GameStart => "game_start",
            CoinReason::EnemyKill => "enemy_kill",
            CoinReason::WaveComplete => "wave_complete",
            CoinReason::TowerPurchase => "tower_purchase",
            CoinReason::TowerSell => "tower_sell",
            CoinReason::RelicBonus => "relic_bonus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyLedger {
    coins: u32,
    total_earned: u64,
}

impl EconomyLedger {
    /// Opening balance does not count as earned.
    pub fn new(starting_coins: u32) -> Self {
        Self {
            coins: starting_coins,
            total_earned: 0,
        }
    }

    pub fn coins(&self) -> u32 {
        self.coins
    }

    pub fn total_earned(&self) -> u64 {
        self.total_earned
    }

    /// Unconditional credit. Returns the new balance.
    pub fn add_coins(&mut self, amount: u32, reason: CoinReason) -> u32 {
        self.coins = self.coins.saturating_add(amount);
        if amount > 0 {
            self.total_earned += amount as u64;
        }
        tracing::trace!(amount, reason = reason.as_str(), balance = self.coins, "coins added");
        self.coins
    }

    /// Debit if the balance covers it. The balance never goes negative.
    pub fn spend_coins(&mut self, amount: u32) -> bool {
        if !self.can_afford(amount) {
            return false;
        }
        self.coins -= amount;
        true
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.coins >= cost
    }
}
