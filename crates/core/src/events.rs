use crate::Tier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    PackPurchased {
        pack_id: String,
        price: u64,
        coins: u64,
    },
    PackDrawn {
        pack_id: String,
        cards: usize,
        best_tier: Option<Tier>,
    },
    AnimationFinished,
    CardRevealed {
        index: usize,
        card_id: String,
        tier: Tier,
    },
    AllRevealed { cards: usize },
    PackCompleted {
        new_cards: usize,
        duplicates: usize,
        bonus_coins: u64,
        coins: u64,
    },
    SessionReset { aborted: bool, discarded: usize },
    Celebration { best_tier: Tier },
    PersistFailed { reason: String },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
