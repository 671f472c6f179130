use packrip_core::{
    CardOutcome, Catalog, CollectionStats, DrawnCard, Event, KeyValueStore, PackGame,
    SessionPhase,
};

pub fn print_help() {
    println!("commands:");
    println!("  packs                 list packs and prices");
    println!("  open <pack>           buy and open a pack");
    println!("  next | n              reveal the next card");
    println!("  all | a               reveal every remaining card");
    println!("  done | complete       finish the pack and bank duplicates");
    println!("  reset                 abandon the current pack");
    println!("  status | s            coins and session phase");
    println!("  collection | c        owned players");
    println!("  stats                 completion by tier");
    println!("  help | ?              this list");
    println!("  quit | exit");
}

pub fn print_packs<S: KeyValueStore>(game: &PackGame<S>) {
    for pack in &game.catalog().packs {
        let odds = pack
            .odds
            .iter()
            .map(|entry| format!("{} {}", entry.tier, entry.weight))
            .collect::<Vec<_>>()
            .join(" / ");
        let guarantee = pack
            .guarantee_rule()
            .map(|rule| format!(" | {}+ guaranteed", rule.forced))
            .unwrap_or_default();
        let marker = if game.can_afford(&pack.id) { "" } else { " (can't afford)" };
        println!(
            "{:<8} {:<12} {:>4} coins | {} cards | {}{}{}",
            pack.id, pack.name, pack.price, pack.cards_count, odds, guarantee, marker
        );
    }
}

pub fn print_status<S: KeyValueStore>(game: &PackGame<S>) {
    let session = game.session();
    let mut line = format!(
        "coins: {} | owned: {} | phase: {:?}",
        game.ledger().coins(),
        game.ledger().unlocked_count(),
        session.phase()
    );
    if let Some(pack) = session.pack() {
        line.push_str(&format!(
            " | pack: {} ({}/{})",
            pack.id,
            session.cursor(),
            session.batch().len()
        ));
    }
    println!("{line}");
    if let Some(reason) = game.persist_error() {
        println!("warning: progress not saved ({reason})");
    }
}

pub fn print_prompt_hint(phase: SessionPhase) {
    let hint = match phase {
        SessionPhase::Idle => "open <pack> to start",
        SessionPhase::Opening => "opening...",
        SessionPhase::Revealing => "next | all | done",
        SessionPhase::Summarized => "open <pack> or reset",
    };
    println!("({hint})");
}

pub fn print_collection<S: KeyValueStore>(game: &PackGame<S>) {
    let ids = game.ledger().unlocked_ids();
    if ids.is_empty() {
        println!("collection is empty");
        return;
    }
    for id in ids {
        match game.catalog().card_by_id(&id) {
            Some(card) => println!(
                "{:<7} {:<4} {:<20} {:<12} {}",
                card.tier.name(),
                card.role.short_name(),
                card.name,
                card.team,
                card.rating
            ),
            None => println!("{id} (not in catalog)"),
        }
    }
}

pub fn print_stats(stats: &CollectionStats) {
    println!(
        "collection: {}/{} ({:.1}%)",
        stats.owned,
        stats.catalog_size,
        stats.completion_percent()
    );
    for progress in &stats.by_tier {
        println!("  {:<7} {}/{}", progress.tier.name(), progress.owned, progress.total);
    }
}

pub fn print_summary<S: KeyValueStore>(game: &PackGame<S>) {
    let Some(summary) = game.session().summary() else {
        return;
    };
    println!("pack {} summary:", summary.pack_id);
    for classified in &summary.cards {
        let tag = match classified.outcome {
            CardOutcome::New => "NEW".to_string(),
            CardOutcome::Duplicate { coins } => format!("dup +{coins}"),
        };
        println!("  {} [{tag}]", card_line(game.catalog(), &classified.card));
    }
    println!(
        "  {} new | {} duplicates | +{} coins",
        summary.new_count(),
        summary.duplicate_count(),
        summary.bonus_coins
    );
}

pub fn print_events<S: KeyValueStore>(game: &PackGame<S>, events: &[Event]) {
    for event in events {
        match event {
            Event::PackPurchased {
                pack_id,
                price,
                coins,
            } => println!("bought {pack_id} for {price} coins ({coins} left)"),
            Event::PackDrawn { cards, .. } => println!("tearing open {cards} cards..."),
            Event::AnimationFinished => println!("pack is open"),
            Event::CardRevealed { index, card_id, .. } => {
                let line = game
                    .session()
                    .batch()
                    .get(*index)
                    .map(|card| card_line(game.catalog(), card))
                    .unwrap_or_else(|| card_id.clone());
                println!("#{} {line}", index + 1);
            }
            Event::AllRevealed { cards } => println!("all {cards} cards revealed"),
            Event::PackCompleted {
                new_cards,
                duplicates,
                bonus_coins,
                coins,
            } => {
                print_summary(game);
                println!(
                    "pack banked: {new_cards} new, {duplicates} duplicates, +{bonus_coins} coins ({coins} total)"
                );
            }
            Event::SessionReset { aborted, discarded } => {
                if *aborted {
                    println!("pack abandoned ({discarded} cards discarded)");
                } else {
                    println!("ready for the next pack");
                }
            }
            Event::Celebration { best_tier } => println!("*** {best_tier} pull! ***"),
            Event::PersistFailed { reason } => println!("warning: save failed: {reason}"),
        }
    }
}

fn card_line(catalog: &Catalog, card: &DrawnCard) -> String {
    match catalog.card_by_id(&card.card_id) {
        Some(def) => format!(
            "{:<7} {} ({}, {}) {}",
            card.tier.name(),
            def.name,
            def.role.short_name(),
            def.team,
            def.rating
        ),
        None => format!("{:<7} {}", card.tier.name(), card.card_id),
    }
}
