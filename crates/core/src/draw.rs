use crate::{forced_odds, Catalog, DrawnCard, PackDefinition, RandomSource, Tier, TierOdds};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("no cards of tier {0} in the catalog")]
    EmptyTierPool(Tier),
}

/// Weighted tier choice. Walks `odds` in declaration order and returns the
/// first tier whose running weight reaches the roll. Zero weights never win.
pub fn pick_tier<R: RandomSource + ?Sized>(odds: &[TierOdds], rng: &mut R) -> Tier {
    let total: f64 = odds.iter().map(|entry| entry.weight.max(0.0)).sum();
    if total <= 0.0 {
        return Tier::Common;
    }
    let roll = rng.next_f64() * total;
    let mut cumulative = 0.0;
    for entry in odds {
        if entry.weight <= 0.0 {
            continue;
        }
        cumulative += entry.weight;
        if cumulative >= roll {
            return entry.tier;
        }
    }
    Tier::Common
}

pub fn draw_card<R: RandomSource + ?Sized>(
    catalog: &Catalog,
    pack: &PackDefinition,
    rng: &mut R,
    opened_at: DateTime<Utc>,
) -> Result<DrawnCard, DrawError> {
    draw_with_odds(catalog, &pack.id, &pack.odds, rng, opened_at)
}

fn draw_with_odds<R: RandomSource + ?Sized>(
    catalog: &Catalog,
    pack_id: &str,
    odds: &[TierOdds],
    rng: &mut R,
    opened_at: DateTime<Utc>,
) -> Result<DrawnCard, DrawError> {
    let tier = pick_tier(odds, rng);
    let pool = catalog.pool(tier);
    if pool.is_empty() {
        error!(pack = pack_id, %tier, "catalog has no cards for reachable tier");
        return Err(DrawError::EmptyTierPool(tier));
    }
    let card = pool[rng.pick_index(pool.len())];
    debug!(pack = pack_id, card = %card.id, %tier, "drew card");
    Ok(DrawnCard {
        card_id: card.id.clone(),
        tier,
        pack_id: pack_id.to_string(),
        opened_at,
    })
}

/// Draws a full pack: `cards_count` independent draws, the pack's guarantee
/// applied to the last card, then a stable sort so rarer cards come last.
pub fn draw_pack<R: RandomSource + ?Sized>(
    catalog: &Catalog,
    pack: &PackDefinition,
    rng: &mut R,
    opened_at: DateTime<Utc>,
) -> Result<Vec<DrawnCard>, DrawError> {
    let mut cards = Vec::with_capacity(pack.cards_count as usize);
    for _ in 0..pack.cards_count {
        cards.push(draw_card(catalog, pack, rng, opened_at)?);
    }

    if let Some(rule) = pack.guarantee_rule() {
        let satisfied = cards.iter().any(|card| card.tier.is_at_least(rule.at_least));
        if !satisfied {
            if let Some(last) = cards.last_mut() {
                debug!(pack = %pack.id, forced = %rule.forced, "guarantee replaces last card");
                *last = draw_with_odds(catalog, &pack.id, &forced_odds(rule.forced), rng, opened_at)?;
            }
        }
    }

    cards.sort_by_key(|card| card.tier.rank());
    Ok(cards)
}
