use shakmaty::Square;

use super::{Actor, Epoch, GameSession, PendingPromotion, ReplayView};
use crate::{
    error::{Result, SessionError},
    position::{Algorithm, Analysis, MovePrefix, Position},
};

/// How a position entered the session outside of normal play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Upload,
    Randomize,
    /// The operator adopted a history entry as the live position.
    Replay,
}

impl LoadOrigin {
    fn starts_new_line(self) -> bool {
        matches!(self, LoadOrigin::Upload | LoadOrigin::Randomize)
    }
}

/// Every state change the session knows about. Requests are resolved before
/// an event is built, so each variant carries final data only.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PositionLoaded {
        position: Position,
        origin: LoadOrigin,
    },
    SquareSelected {
        square: Square,
    },
    SquareDeselected,
    LegalMovesReceived {
        epoch: Epoch,
        squares: Vec<Square>,
    },
    MoveCommitted {
        position: Position,
        analysis: Option<Analysis>,
    },
    PromotionStarted {
        prefix: MovePrefix,
        actor: Actor,
    },
    PromotionCompleted {
        position: Position,
        analysis: Option<Analysis>,
    },
    PromotionCancelled,
    AnalysisReceived {
        analysis: Analysis,
    },
    LoadingToggled(bool),
    FailureSurfaced(String),
    AlgorithmChosen(Algorithm),
    ReplayShown {
        index: usize,
        position: Position,
    },
    ReplayClosed,
    SessionReset,
}

/// Computes the session that follows `state` after `event`.
///
/// On `Err` nothing happened: the caller keeps using `state`.
pub fn apply(state: &GameSession, event: SessionEvent) -> Result<GameSession> {
    let mut next = state.clone();

    match event {
        SessionEvent::PositionLoaded { position, origin } => {
            if next.promotion.is_some() {
                return Err(SessionError::PromotionPending);
            }
            if origin.starts_new_line() {
                next.history.append(position.record().clone());
                next.analysis = None;
            }
            next.replace_position(position);
        }
        SessionEvent::SquareSelected { square } => {
            if next.position.is_none() {
                return Err(SessionError::validation("no position loaded"));
            }
            if next.promotion.is_some() {
                return Err(SessionError::PromotionPending);
            }
            next.clear_selection();
            next.selected = Some(square);
        }
        SessionEvent::SquareDeselected => {
            if next.promotion.is_some() {
                return Err(SessionError::PromotionPending);
            }
            next.clear_selection();
        }
        SessionEvent::LegalMovesReceived { epoch, squares } => {
            if epoch != next.epoch() || next.selected.is_none() {
                return Err(SessionError::StaleResponse);
            }
            next.legal_moves = squares;
        }
        SessionEvent::MoveCommitted { position, analysis } => {
            if next.promotion.is_some() {
                return Err(SessionError::PromotionPending);
            }
            next.commit(position, analysis);
        }
        SessionEvent::PromotionStarted { prefix, actor } => {
            if next.position.is_none() {
                return Err(SessionError::validation("no position loaded"));
            }
            if next.promotion.is_some() {
                return Err(SessionError::PromotionPending);
            }
            next.promotion = Some(PendingPromotion { prefix, actor });
        }
        SessionEvent::PromotionCompleted { position, analysis } => {
            if next.promotion.take().is_none() {
                return Err(SessionError::validation("no promotion pending"));
            }
            next.commit(position, analysis);
        }
        SessionEvent::PromotionCancelled => {
            if next.promotion.take().is_none() {
                return Err(SessionError::validation("no promotion pending"));
            }
        }
        SessionEvent::AnalysisReceived { analysis } => next.analysis = Some(analysis),
        SessionEvent::LoadingToggled(busy) => next.busy = busy,
        SessionEvent::FailureSurfaced(message) => next.error = Some(message),
        SessionEvent::AlgorithmChosen(algorithm) => next.algorithm = Some(algorithm),
        SessionEvent::ReplayShown { index, position } => {
            match next.history.get(index) {
                Some(record) if record == position.record() => {}
                Some(_) => {
                    return Err(SessionError::validation(format!(
                        "history entry {index} does not match the replayed position"
                    )));
                }
                None => {
                    return Err(SessionError::validation(format!(
                        "no history entry {index}"
                    )));
                }
            }
            next.replay = Some(ReplayView { index, position });
        }
        SessionEvent::ReplayClosed => next.replay = None,
        SessionEvent::SessionReset => {
            let mut history = std::mem::take(&mut next.history);
            history.clear();
            next = GameSession {
                algorithm: state.algorithm,
                history,
                generation: state.generation + 1,
                selection: state.selection + 1,
                ..GameSession::default()
            };
        }
    }

    Ok(next)
}

impl GameSession {
    fn clear_selection(&mut self) {
        self.selected = None;
        self.legal_moves.clear();
        self.selection += 1;
    }

    fn replace_position(&mut self, position: Position) {
        self.position = Some(position);
        self.generation += 1;
        self.clear_selection();
        self.replay = None;
        self.error = None;
    }

    fn commit(&mut self, position: Position, analysis: Option<Analysis>) {
        self.history.append(position.record().clone());
        if analysis.is_some() {
            self.analysis = analysis;
        }
        self.replace_position(position);
    }
}
