use crate::{CardDefinition, Tier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PackCategory {
    Bronze,
    Silver,
    Gold,
}

/// Relative weight of one tier inside a pack's odds table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierOdds {
    pub tier: Tier,
    pub weight: f64,
}

/// If no drawn card reaches `at_least`, the last card is redrawn from `forced`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuaranteeRule {
    pub at_least: Tier,
    pub forced: Tier,
}

impl PackCategory {
    pub fn default_guarantee(self) -> Option<GuaranteeRule> {
        match self {
            PackCategory::Bronze => None,
            PackCategory::Silver => Some(GuaranteeRule {
                at_least: Tier::Rare,
                forced: Tier::Rare,
            }),
            PackCategory::Gold => Some(GuaranteeRule {
                at_least: Tier::Rare,
                forced: Tier::Epic,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackDefinition {
    pub id: String,
    pub name: String,
    pub category: PackCategory,
    pub price: u64,
    #[serde(rename = "cardsCount", alias = "cards_count")]
    pub cards_count: u32,
    pub odds: Vec<TierOdds>,
    #[serde(default)]
    pub guarantee: Option<GuaranteeRule>,
}

impl PackDefinition {
    pub fn guarantee_rule(&self) -> Option<GuaranteeRule> {
        self.guarantee.or_else(|| self.category.default_guarantee())
    }

    pub fn weight_for(&self, tier: Tier) -> f64 {
        self.odds
            .iter()
            .filter(|entry| entry.tier == tier)
            .map(|entry| entry.weight)
            .sum()
    }

    /// Tiers a normal draw from this pack can land on.
    pub fn reachable_tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.odds
            .iter()
            .filter(|entry| entry.weight > 0.0)
            .map(|entry| entry.tier)
    }
}

/// Odds table giving the whole weight to a single tier.
pub fn forced_odds(tier: Tier) -> Vec<TierOdds> {
    Tier::ALL
        .into_iter()
        .map(|candidate| TierOdds {
            tier: candidate,
            weight: if candidate == tier { 100.0 } else { 0.0 },
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub cards: Vec<CardDefinition>,
    pub packs: Vec<PackDefinition>,
}

impl Catalog {
    pub fn new(cards: Vec<CardDefinition>, packs: Vec<PackDefinition>) -> Self {
        Self { cards, packs }
    }

    pub fn card_by_id(&self, id: &str) -> Option<&CardDefinition> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn pack_by_id(&self, id: &str) -> Option<&PackDefinition> {
        self.packs.iter().find(|pack| pack.id == id)
    }

    pub fn pool(&self, tier: Tier) -> Vec<&CardDefinition> {
        self.cards.iter().filter(|card| card.tier == tier).collect()
    }

    pub fn tier_size(&self, tier: Tier) -> usize {
        self.cards.iter().filter(|card| card.tier == tier).count()
    }

    /// Tiers some pack can produce (including forced guarantee draws) that
    /// have no cards behind them.
    pub fn empty_reachable_tiers(&self) -> Vec<(String, Tier)> {
        let mut missing = Vec::new();
        for pack in &self.packs {
            let forced = pack.guarantee_rule().map(|rule| rule.forced);
            for tier in pack.reachable_tiers().chain(forced) {
                if self.tier_size(tier) == 0 && !missing.contains(&(pack.id.clone(), tier)) {
                    missing.push((pack.id.clone(), tier));
                }
            }
        }
        missing
    }
}
