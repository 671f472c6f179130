use crate::{
    reduce, Action, Catalog, Clock, CollectionStats, Event, EventBus, GameConfig, GameState,
    KeyValueStore, LedgerState, LedgerStore, RandomSource, ReduceEnv, SessionError, SessionState,
    SystemClock, TimerRequest, TimerTicket,
};
use tracing::warn;

/// Boundary the display layer talks to. Owns the single ledger, applies
/// reducer transitions, writes the ledger after every change and queues
/// timer requests for the caller to schedule.
pub struct PackGame<S> {
    catalog: Catalog,
    config: GameConfig,
    state: GameState,
    store: LedgerStore<S>,
    rng: Box<dyn RandomSource>,
    clock: Box<dyn Clock>,
    events: EventBus,
    timers: Vec<TimerRequest>,
    persist_error: Option<String>,
}

impl<S: KeyValueStore> PackGame<S> {
    pub fn load(
        catalog: Catalog,
        config: GameConfig,
        store: S,
        rng: impl RandomSource + 'static,
    ) -> Self {
        let store = LedgerStore::new(store);
        let ledger = store.load_or_default(config.economy.starting_coins);
        Self {
            catalog,
            config,
            state: GameState::new(ledger),
            store,
            rng: Box::new(rng),
            clock: Box::new(SystemClock),
            events: EventBus::default(),
            timers: Vec::new(),
            persist_error: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.state.ledger
    }

    pub fn session(&self) -> &SessionState {
        &self.state.session
    }

    pub fn store(&self) -> &LedgerStore<S> {
        &self.store
    }

    pub fn stats(&self) -> CollectionStats {
        self.state.ledger.stats(&self.catalog)
    }

    pub fn can_afford(&self, pack_id: &str) -> bool {
        self.catalog
            .pack_by_id(pack_id)
            .is_some_and(|pack| self.state.ledger.can_afford(pack))
    }

    /// Last write failure, cleared by the next successful write.
    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    pub fn open_pack(&mut self, pack_id: &str) -> Result<(), SessionError> {
        self.dispatch(Action::OpenPack {
            pack_id: pack_id.to_string(),
        })
    }

    pub fn reveal_next(&mut self) -> Result<(), SessionError> {
        self.dispatch(Action::RevealNext)
    }

    pub fn reveal_all(&mut self) -> Result<(), SessionError> {
        self.dispatch(Action::RevealAll)
    }

    pub fn complete_pack(&mut self) -> Result<(), SessionError> {
        self.dispatch(Action::CompletePack)
    }

    pub fn reset_session(&mut self) -> Result<(), SessionError> {
        self.dispatch(Action::Reset)
    }

    pub fn fire_timer(&mut self, ticket: TimerTicket) -> Result<(), SessionError> {
        self.dispatch(Action::TimerElapsed(ticket))
    }

    pub fn take_timers(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.timers)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain().collect()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), SessionError> {
        let mut env = ReduceEnv {
            catalog: &self.catalog,
            config: &self.config,
            rng: &mut *self.rng,
            now: self.clock.now(),
        };
        let transition = reduce(&self.state, action, &mut env, &mut self.events)?;
        self.state = transition.state;
        self.timers.extend(transition.timers);
        if transition.ledger_changed {
            self.persist();
        }
        Ok(())
    }

    fn persist(&mut self) {
        match self.store.save(&self.state.ledger) {
            Ok(()) => self.persist_error = None,
            Err(err) => {
                warn!(error = %err, "ledger write failed; keeping in-memory state");
                let reason = err.to_string();
                self.events.push(Event::PersistFailed {
                    reason: reason.clone(),
                });
                self.persist_error = Some(reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decode_ledger, CardDefinition, FixedClock, MemoryStore, PackCategory, PackDefinition,
        PlayerStats, Role, RngState, SessionPhase, StoreError, Tier, TierOdds,
        TimerKind, LEDGER_KEY,
    };
    use chrono::{DateTime, Utc};
    use std::cell::Cell;
    use std::rc::Rc;

    fn catalog() -> Catalog {
        let cards = [
            ("virat-kohli", Tier::Legend),
            ("ms-dhoni", Tier::Legend),
            ("rohit-sharma", Tier::Epic),
            ("rashid-khan", Tier::Rare),
            ("jos-buttler", Tier::Rare),
            ("alex-hales", Tier::Common),
            ("umran-malik", Tier::Common),
        ]
        .into_iter()
        .map(|(id, tier)| CardDefinition {
            id: id.to_string(),
            name: id.to_string(),
            role: Role::AllRounder,
            team: "XI".to_string(),
            rating: 80,
            stats: PlayerStats::default(),
            tier,
        })
        .collect();
        let silver = PackDefinition {
            id: "silver".to_string(),
            name: "Silver Pack".to_string(),
            category: PackCategory::Silver,
            price: 250,
            cards_count: 5,
            odds: vec![
                TierOdds {
                    tier: Tier::Common,
                    weight: 50.0,
                },
                TierOdds {
                    tier: Tier::Rare,
                    weight: 35.0,
                },
                TierOdds {
                    tier: Tier::Epic,
                    weight: 12.0,
                },
                TierOdds {
                    tier: Tier::Legend,
                    weight: 3.0,
                },
            ],
            guarantee: None,
        };
        Catalog::new(cards, vec![silver])
    }

    fn clock() -> FixedClock {
        FixedClock(DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("timestamp"))
    }

    fn game(store: MemoryStore) -> PackGame<MemoryStore> {
        PackGame::load(catalog(), GameConfig::default(), store, RngState::from_seed(9))
            .with_clock(clock())
    }

    fn finish_animation<S: KeyValueStore>(game: &mut PackGame<S>) {
        let timers = game.take_timers();
        let stop = timers
            .iter()
            .find(|timer| timer.ticket.kind == TimerKind::StopAnimation)
            .expect("animation timer");
        game.fire_timer(stop.ticket).expect("timer");
    }

    fn saved(game: &PackGame<MemoryStore>) -> LedgerState {
        let raw = game.store().inner().raw(LEDGER_KEY).expect("saved record");
        decode_ledger(raw).expect("decode")
    }

    #[derive(Clone)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: Rc<Cell<bool>>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.failing.get() {
                return Err(StoreError::Write {
                    key: key.to_string(),
                    reason: "quota exceeded".to_string(),
                });
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn fresh_game_starts_with_default_ledger() {
        let game = game(MemoryStore::new());
        assert_eq!(game.ledger().coins(), 1000);
        assert!(game.ledger().collection().is_empty());
        assert_eq!(game.session().phase(), SessionPhase::Idle);
        assert!(game.can_afford("silver"));
        assert!(!game.can_afford("diamond"));
    }

    #[test]
    fn purchase_is_written_before_reveal() {
        let mut game = game(MemoryStore::new());
        game.open_pack("silver").expect("open");
        assert_eq!(saved(&game).coins(), 750);
        assert!(saved(&game).collection().is_empty());
    }

    #[test]
    fn full_opening_persists_collection() {
        let mut game = game(MemoryStore::new());
        game.open_pack("silver").expect("open");
        finish_animation(&mut game);
        game.reveal_all().expect("reveal");
        game.complete_pack().expect("complete");

        let summary = game.session().summary().expect("summary").clone();
        assert_eq!(summary.cards.len(), 5);
        assert!(summary.cards.iter().any(|c| c.card.tier >= Tier::Rare));
        assert_eq!(saved(&game), *game.ledger());
        assert_eq!(game.ledger().coins(), 750 + summary.bonus_coins);
        assert_eq!(game.ledger().collection().len(), summary.new_count());

        game.reset_session().expect("reset");
        assert_eq!(game.session().phase(), SessionPhase::Idle);
    }

    #[test]
    fn abort_keeps_debit_and_discards_cards() {
        let mut game = game(MemoryStore::new());
        game.open_pack("silver").expect("open");
        finish_animation(&mut game);
        game.reveal_next().expect("reveal");
        game.reset_session().expect("reset");

        assert_eq!(game.ledger().coins(), 750);
        assert!(game.ledger().collection().is_empty());
        assert_eq!(saved(&game).coins(), 750);
        let events = game.drain_events();
        assert!(events.contains(&Event::SessionReset {
            aborted: true,
            discarded: 5
        }));
    }

    #[test]
    fn insufficient_funds_change_nothing() {
        let ledger = LedgerState::new(100);
        let store = MemoryStore::with_entry(
            LEDGER_KEY,
            &crate::encode_ledger(&ledger).expect("encode"),
        );
        let mut game = game(store);
        assert!(!game.can_afford("silver"));
        let err = game.open_pack("silver").expect_err("poor");
        assert!(matches!(err, SessionError::Ledger(_)));
        assert_eq!(game.ledger().coins(), 100);
        assert_eq!(game.session().phase(), SessionPhase::Idle);
        assert!(game.take_timers().is_empty());
    }

    #[test]
    fn reload_restores_saved_ledger() {
        let mut first = game(MemoryStore::new());
        first.open_pack("silver").expect("open");
        finish_animation(&mut first);
        first.reveal_all().expect("reveal");
        first.complete_pack().expect("complete");
        let store = first.store().inner().clone();
        let expected = first.ledger().clone();

        let second = game(store);
        assert_eq!(*second.ledger(), expected);
    }

    #[test]
    fn write_failure_keeps_memory_and_catches_up() {
        let failing = Rc::new(Cell::new(true));
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failing: failing.clone(),
        };
        let mut game =
            PackGame::load(catalog(), GameConfig::default(), store, RngState::from_seed(4))
                .with_clock(clock());
        game.open_pack("silver").expect("open survives write failure");
        assert_eq!(game.ledger().coins(), 750);
        assert!(game.persist_error().is_some());
        assert!(game
            .drain_events()
            .iter()
            .any(|event| matches!(event, Event::PersistFailed { .. })));

        failing.set(false);
        finish_animation(&mut game);
        game.reveal_all().expect("reveal");
        game.complete_pack().expect("complete");
        assert!(game.persist_error().is_none());
        let raw = game.store().inner().inner.raw(LEDGER_KEY).expect("caught up");
        assert_eq!(decode_ledger(raw).expect("decode"), *game.ledger());
    }
}
