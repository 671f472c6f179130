pub use packrip_core::{
    CardDefinition, Catalog, EconomyRule, GameConfig, GuaranteeRule, PackCategory,
    PackDefinition, PlayerStats, Role, Tier, TierOdds, TierValue, TimingRule,
};

pub const PLAYERS_FILE: &str = "players.json";
pub const PACKS_FILE: &str = "packs.json";
pub const CONFIG_FILE: &str = "economy.json";
