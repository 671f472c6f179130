use crate::{
    draw_pack, Catalog, ClassifiedCard, DrawError, DrawnCard, Event, EventBus, GameConfig,
    LedgerError, LedgerState, PackDefinition, RandomSource, Tier,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Opening,
    Revealing,
    Summarized,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown pack '{0}'")]
    UnknownPack(String),
    #[error("{action} is not valid while {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: SessionPhase,
    },
    #[error("pack is still opening")]
    StillOpening,
    #[error("only {revealed} of {total} cards revealed")]
    PrematureCompletion { revealed: usize, total: usize },
    #[error("draw error: {0}")]
    Draw(#[from] DrawError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    StopAnimation,
    Celebrate,
}

/// Identifies a scheduled callback. Only honoured while the session is still
/// on the generation that requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket {
    pub generation: u64,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub ticket: TimerTicket,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenPack { pack_id: String },
    TimerElapsed(TimerTicket),
    RevealNext,
    RevealAll,
    CompletePack,
    Reset,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::OpenPack { .. } => "open pack",
            Action::TimerElapsed(_) => "timer",
            Action::RevealNext => "reveal next",
            Action::RevealAll => "reveal all",
            Action::CompletePack => "complete pack",
            Action::Reset => "reset",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackSummary {
    pub pack_id: String,
    pub cards: Vec<ClassifiedCard>,
    pub bonus_coins: u64,
}

impl PackSummary {
    pub fn new_count(&self) -> usize {
        self.cards.iter().filter(|card| !card.is_duplicate()).count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.cards.iter().filter(|card| card.is_duplicate()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    phase: SessionPhase,
    generation: u64,
    pack: Option<PackDefinition>,
    batch: Vec<DrawnCard>,
    cursor: usize,
    summary: Option<PackSummary>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::idle(0)
    }
}

impl SessionState {
    fn idle(generation: u64) -> Self {
        Self {
            phase: SessionPhase::Idle,
            generation,
            pack: None,
            batch: Vec::new(),
            cursor: 0,
            summary: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pack(&self) -> Option<&PackDefinition> {
        self.pack.as_ref()
    }

    pub fn batch(&self) -> &[DrawnCard] {
        &self.batch
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn revealed(&self) -> &[DrawnCard] {
        &self.batch[..self.cursor]
    }

    pub fn all_revealed(&self) -> bool {
        self.cursor == self.batch.len()
    }

    pub fn summary(&self) -> Option<&PackSummary> {
        self.summary.as_ref()
    }

    pub fn is_summary_ready(&self) -> bool {
        self.summary.is_some()
    }

    pub fn best_tier(&self) -> Option<Tier> {
        self.batch.iter().map(|card| card.tier).max()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub ledger: LedgerState,
    pub session: SessionState,
}

impl GameState {
    pub fn new(ledger: LedgerState) -> Self {
        Self {
            ledger,
            session: SessionState::default(),
        }
    }
}

/// Inputs a transition may consume besides the state itself.
pub struct ReduceEnv<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a GameConfig,
    pub rng: &'a mut dyn RandomSource,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: GameState,
    /// Set when the ledger moved and must be written out.
    pub ledger_changed: bool,
    pub timers: Vec<TimerRequest>,
}

impl Transition {
    fn unchanged(state: &GameState) -> Self {
        Self::session_only(state.clone())
    }

    fn session_only(state: GameState) -> Self {
        Self {
            state,
            ledger_changed: false,
            timers: Vec::new(),
        }
    }
}

/// Pure state transition. Errors leave the caller's state untouched.
pub fn reduce(
    state: &GameState,
    action: Action,
    env: &mut ReduceEnv<'_>,
    events: &mut EventBus,
) -> Result<Transition, SessionError> {
    let phase = state.session.phase;
    match action {
        Action::OpenPack { pack_id } => {
            if phase != SessionPhase::Idle {
                return Err(SessionError::InvalidPhase {
                    action: "open pack",
                    phase,
                });
            }
            open_pack(state, &pack_id, env, events)
        }
        Action::TimerElapsed(ticket) => Ok(timer_elapsed(state, ticket, events)),
        Action::RevealNext => {
            ensure_revealing(phase, "reveal next")?;
            let session = &state.session;
            if session.all_revealed() {
                return complete_pack(state, env, events);
            }
            let mut next = state.clone();
            let index = next.session.cursor;
            next.session.cursor += 1;
            let card = &next.session.batch[index];
            events.push(Event::CardRevealed {
                index,
                card_id: card.card_id.clone(),
                tier: card.tier,
            });
            if next.session.all_revealed() {
                events.push(Event::AllRevealed {
                    cards: next.session.batch.len(),
                });
            }
            Ok(Transition::session_only(next))
        }
        Action::RevealAll => {
            ensure_revealing(phase, "reveal all")?;
            let mut next = state.clone();
            let total = next.session.batch.len();
            for index in next.session.cursor..total {
                let card = &next.session.batch[index];
                events.push(Event::CardRevealed {
                    index,
                    card_id: card.card_id.clone(),
                    tier: card.tier,
                });
            }
            if !next.session.all_revealed() {
                events.push(Event::AllRevealed { cards: total });
            }
            next.session.cursor = total;
            Ok(Transition::session_only(next))
        }
        Action::CompletePack => {
            ensure_revealing(phase, "complete pack")?;
            let session = &state.session;
            if !session.all_revealed() {
                return Err(SessionError::PrematureCompletion {
                    revealed: session.cursor,
                    total: session.batch.len(),
                });
            }
            complete_pack(state, env, events)
        }
        Action::Reset => Ok(reset(state, events)),
    }
}

fn ensure_revealing(phase: SessionPhase, action: &'static str) -> Result<(), SessionError> {
    match phase {
        SessionPhase::Revealing => Ok(()),
        SessionPhase::Opening => Err(SessionError::StillOpening),
        _ => Err(SessionError::InvalidPhase { action, phase }),
    }
}

fn open_pack(
    state: &GameState,
    pack_id: &str,
    env: &mut ReduceEnv<'_>,
    events: &mut EventBus,
) -> Result<Transition, SessionError> {
    let pack = env
        .catalog
        .pack_by_id(pack_id)
        .ok_or_else(|| SessionError::UnknownPack(pack_id.to_string()))?;
    let ledger = state.ledger.purchase_pack(pack)?;
    let batch = draw_pack(env.catalog, pack, &mut *env.rng, env.now)?;

    let generation = state.session.generation + 1;
    let session = SessionState {
        phase: SessionPhase::Opening,
        generation,
        pack: Some(pack.clone()),
        batch,
        cursor: 0,
        summary: None,
    };
    let best_tier = session.best_tier();
    info!(pack = %pack.id, price = pack.price, coins = ledger.coins(), "pack purchased");
    events.push(Event::PackPurchased {
        pack_id: pack.id.clone(),
        price: pack.price,
        coins: ledger.coins(),
    });
    events.push(Event::PackDrawn {
        pack_id: pack.id.clone(),
        cards: session.batch.len(),
        best_tier,
    });

    let timing = &env.config.timing;
    let mut timers = vec![TimerRequest {
        ticket: TimerTicket {
            generation,
            kind: TimerKind::StopAnimation,
        },
        delay: timing.open_animation(),
    }];
    if best_tier.is_some_and(|tier| tier.is_at_least(timing.celebration_min_tier)) {
        timers.push(TimerRequest {
            ticket: TimerTicket {
                generation,
                kind: TimerKind::Celebrate,
            },
            delay: timing.celebration_delay(),
        });
    }

    Ok(Transition {
        state: GameState { ledger, session },
        ledger_changed: true,
        timers,
    })
}

fn timer_elapsed(state: &GameState, ticket: TimerTicket, events: &mut EventBus) -> Transition {
    let session = &state.session;
    if ticket.generation != session.generation {
        debug!(?ticket, current = session.generation, "stale timer ignored");
        return Transition::unchanged(state);
    }
    match ticket.kind {
        TimerKind::StopAnimation => {
            if session.phase != SessionPhase::Opening {
                debug!(?ticket, phase = ?session.phase, "animation timer after opening ended");
                return Transition::unchanged(state);
            }
            let mut next = state.clone();
            next.session.phase = SessionPhase::Revealing;
            events.push(Event::AnimationFinished);
            Transition::session_only(next)
        }
        TimerKind::Celebrate => {
            if session.phase != SessionPhase::Idle {
                if let Some(best_tier) = session.best_tier() {
                    events.push(Event::Celebration { best_tier });
                }
            }
            Transition::unchanged(state)
        }
    }
}

fn complete_pack(
    state: &GameState,
    env: &mut ReduceEnv<'_>,
    events: &mut EventBus,
) -> Result<Transition, SessionError> {
    let session = &state.session;
    let result = state
        .ledger
        .process_batch(&session.batch, &env.config.economy);
    let pack_id = session
        .pack
        .as_ref()
        .map(|pack| pack.id.clone())
        .unwrap_or_default();
    info!(
        pack = %pack_id,
        new_cards = result.new_count(),
        duplicates = result.duplicate_count(),
        bonus = result.bonus_coins,
        "pack completed"
    );
    events.push(Event::PackCompleted {
        new_cards: result.new_count(),
        duplicates: result.duplicate_count(),
        bonus_coins: result.bonus_coins,
        coins: result.ledger.coins(),
    });

    let mut next_session = session.clone();
    next_session.phase = SessionPhase::Summarized;
    next_session.summary = Some(PackSummary {
        pack_id,
        cards: result.cards,
        bonus_coins: result.bonus_coins,
    });
    Ok(Transition {
        state: GameState {
            ledger: result.ledger,
            session: next_session,
        },
        ledger_changed: true,
        timers: Vec::new(),
    })
}

/// Returns to idle. An unfinished opening is dropped: the purchase stays
/// spent and none of its cards reach the collection.
fn reset(state: &GameState, events: &mut EventBus) -> Transition {
    let session = &state.session;
    if session.phase == SessionPhase::Idle {
        return Transition::unchanged(state);
    }
    let aborted = session.phase != SessionPhase::Summarized;
    let discarded = if aborted { session.batch.len() } else { 0 };
    if aborted {
        info!(discarded, "opening aborted");
    }
    events.push(Event::SessionReset { aborted, discarded });
    Transition::session_only(GameState {
        ledger: state.ledger.clone(),
        session: SessionState::idle(session.generation + 1),
    })
}
