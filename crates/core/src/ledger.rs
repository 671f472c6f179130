use crate::{
    Catalog, CardOutcome, ClassifiedCard, DrawnCard, EconomyRule, PackDefinition, Tier,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("not enough coins: pack costs {price}, balance is {balance}")]
    InsufficientFunds { price: u64, balance: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnedCard {
    pub card_id: String,
    pub tier: Tier,
    #[serde(default)]
    pub pack_id: Option<String>,
    pub acquired_at: DateTime<Utc>,
}

impl From<&DrawnCard> for OwnedCard {
    fn from(card: &DrawnCard) -> Self {
        Self {
            card_id: card.card_id.clone(),
            tier: card.tier,
            pack_id: Some(card.pack_id.clone()),
            acquired_at: card.opened_at,
        }
    }
}

/// Coins plus the owned collection. `unlocked` is a lookup cache over
/// `collection` and is only ever rebuilt or extended alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    coins: u64,
    collection: Vec<OwnedCard>,
    unlocked: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub cards: Vec<ClassifiedCard>,
    pub bonus_coins: u64,
    pub ledger: LedgerState,
}

impl BatchResult {
    pub fn new_count(&self) -> usize {
        self.cards.iter().filter(|card| !card.is_duplicate()).count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.cards.iter().filter(|card| card.is_duplicate()).count()
    }
}

impl LedgerState {
    pub fn new(coins: u64) -> Self {
        Self::from_collection(coins, Vec::new())
    }

    pub fn from_collection(coins: u64, collection: Vec<OwnedCard>) -> Self {
        let unlocked = collection.iter().map(|card| card.card_id.clone()).collect();
        Self {
            coins,
            collection,
            unlocked,
        }
    }

    pub fn coins(&self) -> u64 {
        self.coins
    }

    pub fn collection(&self) -> &[OwnedCard] {
        &self.collection
    }

    pub fn is_unlocked(&self, card_id: &str) -> bool {
        self.unlocked.contains(card_id)
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    /// Distinct unlocked ids in the order they were first acquired.
    pub fn unlocked_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.collection
            .iter()
            .filter(|card| seen.insert(card.card_id.as_str()))
            .map(|card| card.card_id.clone())
            .collect()
    }

    pub fn can_afford(&self, pack: &PackDefinition) -> bool {
        self.coins >= pack.price
    }

    pub fn purchase_pack(&self, pack: &PackDefinition) -> Result<LedgerState, LedgerError> {
        if !self.can_afford(pack) {
            return Err(LedgerError::InsufficientFunds {
                price: pack.price,
                balance: self.coins,
            });
        }
        let mut next = self.clone();
        next.coins -= pack.price;
        Ok(next)
    }

    /// Classifies a drawn batch in order. The unlocked set grows as the batch
    /// is walked, so a repeat inside the same pack counts as a duplicate.
    pub fn process_batch(&self, cards: &[DrawnCard], economy: &EconomyRule) -> BatchResult {
        let mut next = self.clone();
        let mut bonus_coins = 0u64;
        let mut classified = Vec::with_capacity(cards.len());
        for card in cards {
            let outcome = if next.unlocked.contains(&card.card_id) {
                let coins = economy.duplicate_value(card.tier);
                bonus_coins += coins;
                CardOutcome::Duplicate { coins }
            } else {
                next.collection.push(OwnedCard::from(card));
                next.unlocked.insert(card.card_id.clone());
                CardOutcome::New
            };
            classified.push(ClassifiedCard {
                card: card.clone(),
                outcome,
            });
        }
        next.coins += bonus_coins;
        BatchResult {
            cards: classified,
            bonus_coins,
            ledger: next,
        }
    }

    pub fn stats(&self, catalog: &Catalog) -> CollectionStats {
        let by_tier = Tier::ALL
            .into_iter()
            .map(|tier| TierProgress {
                tier,
                owned: catalog
                    .cards
                    .iter()
                    .filter(|card| card.tier == tier && self.is_unlocked(&card.id))
                    .count(),
                total: catalog.tier_size(tier),
            })
            .collect();
        CollectionStats {
            owned: self.unlocked.len(),
            catalog_size: catalog.cards.len(),
            by_tier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProgress {
    pub tier: Tier,
    pub owned: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub owned: usize,
    pub catalog_size: usize,
    pub by_tier: Vec<TierProgress>,
}

impl CollectionStats {
    pub fn completion_percent(&self) -> f64 {
        if self.catalog_size == 0 {
            return 0.0;
        }
        self.owned as f64 * 100.0 / self.catalog_size as f64
    }
}
