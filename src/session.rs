//! The single source of truth for one game: current position, selection,
//! promotion sub-state, history and bookkeeping for in-flight requests.
//!
//! `GameSession` is only ever changed through [`store::apply`]. Everything in
//! here is synchronous and free of I/O.

mod history;
pub mod store;
mod turn_gate;

pub use history::HistoryLog;
pub use store::{LoadOrigin, SessionEvent, apply};
pub use turn_gate::{TurnGate, turn_side};

use shakmaty::Square;

use crate::position::{Algorithm, Analysis, MovePrefix, Position};

/// Tag attached to a legal-move query. A response is only applied while the
/// session still has the same position generation and the same selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Epoch {
    pub generation: u64,
    pub selection: u64,
}

/// Who is choosing the promotion piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Human,
    Engine,
}

/// A promotion move waiting for its piece designator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPromotion {
    pub prefix: MovePrefix,
    pub actor: Actor,
}

/// A history entry shown read-only next to the live game.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayView {
    pub index: usize,
    pub position: Position,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameSession {
    position: Option<Position>,
    selected: Option<Square>,
    legal_moves: Vec<Square>,
    promotion: Option<PendingPromotion>,
    analysis: Option<Analysis>,
    error: Option<String>,
    busy: bool,
    algorithm: Option<Algorithm>,
    history: HistoryLog,
    replay: Option<ReplayView>,
    // Both counters only ever grow, reset included.
    generation: u64,
    selection: u64,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    pub fn legal_moves(&self) -> &[Square] {
        &self.legal_moves
    }

    pub fn is_legal_destination(&self, square: Square) -> bool {
        self.legal_moves.contains(&square)
    }

    pub fn pending_promotion(&self) -> Option<&PendingPromotion> {
        self.promotion.as_ref()
    }

    pub fn is_awaiting_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn replay(&self) -> Option<&ReplayView> {
        self.replay.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn epoch(&self) -> Epoch {
        Epoch {
            generation: self.generation,
            selection: self.selection,
        }
    }
}
