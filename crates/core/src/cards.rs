use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rarity tier. Declaration order is the ranking, lowest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Common,
    Rare,
    Epic,
    Legend,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Common, Tier::Rare, Tier::Epic, Tier::Legend];

    pub fn rank(self) -> u8 {
        match self {
            Tier::Common => 1,
            Tier::Rare => 2,
            Tier::Epic => 3,
            Tier::Legend => 4,
        }
    }

    pub fn is_at_least(self, other: Tier) -> bool {
        self.rank() >= other.rank()
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Common => "Common",
            Tier::Rare => "Rare",
            Tier::Epic => "Epic",
            Tier::Legend => "Legend",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown tier '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "BAT")]
    Batter,
    #[serde(rename = "BOWL")]
    Bowler,
    #[serde(rename = "AR")]
    AllRounder,
    #[serde(rename = "WK")]
    WicketKeeper,
}

impl Role {
    pub fn short_name(self) -> &'static str {
        match self {
            Role::Batter => "BAT",
            Role::Bowler => "BOWL",
            Role::AllRounder => "AR",
            Role::WicketKeeper => "WK",
        }
    }
}

/// Career numbers; which fields are present depends on the role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wickets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(
        default,
        rename = "strikeRate",
        alias = "strike_rate",
        skip_serializing_if = "Option::is_none"
    )]
    pub strike_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardDefinition {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub team: String,
    pub rating: u8,
    #[serde(default)]
    pub stats: PlayerStats,
    pub tier: Tier,
}

/// One card produced by a pack opening, before the ledger has classified it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawnCard {
    pub card_id: String,
    pub tier: Tier,
    pub pack_id: String,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CardOutcome {
    New,
    Duplicate { coins: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedCard {
    pub card: DrawnCard,
    pub outcome: CardOutcome,
}

impl ClassifiedCard {
    pub fn is_duplicate(&self) -> bool {
        matches!(self.outcome, CardOutcome::Duplicate { .. })
    }

    pub fn coin_value(&self) -> Option<u64> {
        match self.outcome {
            CardOutcome::Duplicate { coins } => Some(coins),
            CardOutcome::New => None,
        }
    }
}
