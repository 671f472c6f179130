use crate::Tier;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coin value used for a duplicate whose tier has no entry in the table.
pub const FALLBACK_DUPLICATE_VALUE: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierValue {
    pub tier: Tier,
    pub coins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EconomyRule {
    pub starting_coins: u64,
    pub duplicate_values: Vec<TierValue>,
}

impl EconomyRule {
    pub fn duplicate_value(&self, tier: Tier) -> u64 {
        self.duplicate_values
            .iter()
            .find(|entry| entry.tier == tier)
            .map(|entry| entry.coins)
            .unwrap_or(FALLBACK_DUPLICATE_VALUE)
    }
}

impl Default for EconomyRule {
    fn default() -> Self {
        Self {
            starting_coins: 1000,
            duplicate_values: vec![
                TierValue {
                    tier: Tier::Common,
                    coins: 10,
                },
                TierValue {
                    tier: Tier::Rare,
                    coins: 25,
                },
                TierValue {
                    tier: Tier::Epic,
                    coins: 60,
                },
                TierValue {
                    tier: Tier::Legend,
                    coins: 150,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingRule {
    pub open_animation_ms: u64,
    pub celebration_delay_ms: u64,
    pub celebration_min_tier: Tier,
}

impl TimingRule {
    pub fn open_animation(&self) -> Duration {
        Duration::from_millis(self.open_animation_ms)
    }

    pub fn celebration_delay(&self) -> Duration {
        Duration::from_millis(self.celebration_delay_ms)
    }
}

impl Default for TimingRule {
    fn default() -> Self {
        Self {
            open_animation_ms: 2000,
            celebration_delay_ms: 3000,
            celebration_min_tier: Tier::Epic,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default)]
    pub economy: EconomyRule,
    #[serde(default)]
    pub timing: TimingRule,
}
