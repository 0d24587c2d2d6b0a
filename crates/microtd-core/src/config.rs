//! Run tuning constants.
//!
//! Values that earlier builds of the game disagreed on (starting coins, sell
//! refund) live here rather than as literals in the systems that use them.
//! Every field has a default, so a TOML file only needs the overrides.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub starting_coins: u32,
    pub starting_lives: u32,
    /// Percentage of a tower's base cost returned on sale, rounded down.
    pub sell_refund_percent: u32,
    /// A relic offer follows every Nth completed wave.
    pub relic_offer_interval: u32,
    pub relic_choice_count: u32,
    /// Duration applied by every slow-on-hit.
    pub slow_duration_ticks: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_coins: 200,
            starting_lives: 20,
            sell_refund_percent: 50,
            relic_offer_interval: 2,
            relic_choice_count: 3,
            slow_duration_ticks: 60,
        }
    }
}

impl SimConfig {
    /// Parse from TOML and validate.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relic_offer_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "relic_offer_interval",
                reason: "must be at least 1",
            });
        }
        if self.relic_choice_count == 0 {
            return Err(ConfigError::Invalid {
                field: "relic_choice_count",
                reason: "must be at least 1",
            });
        }
        if self.sell_refund_percent > 100 {
            return Err(ConfigError::Invalid {
                field: "sell_refund_percent",
                reason: "must not exceed 100",
            });
        }
        Ok(())
    }

    /// Refund for selling a tower that cost `cost`.
    pub fn sell_refund(&self, cost: u32) -> u32 {
        (cost as u64 * self.sell_refund_percent as u64 / 100) as u32
    }

    /// Whether completing wave `wave_index` (zero-based) earns a relic offer.
    pub fn relic_offer_due(&self, wave_index: u32) -> bool {
        self.relic_offer_interval > 0 && (wave_index + 1) % self.relic_offer_interval == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
