use std::sync::Arc;

use futures::FutureExt;
use log::debug;
use shakmaty::Square;

use super::{Completion, GameClient, Notice, Pending};
use crate::{
    error::{Result, SessionError},
    session::{Epoch, SessionEvent},
};

impl GameClient {
    /// Routes a board click: a legal destination of the current selection
    /// becomes a move attempt, anything else goes through selection.
    pub fn click(&mut self, square: Square) -> Result<Option<Pending>> {
        if let Some(from) = self.session.selected()
            && from != square
            && self.session.is_legal_destination(square)
        {
            return self.attempt_move(from, square);
        }
        self.select_square(square)
    }

    /// Selects, reselects or deselects `square`. Selecting one of the
    /// operator's own pieces returns the legal-move query for it.
    ///
    /// While a mutating request is in flight the position is about to be
    /// replaced, so a new query is refused with `Busy`. Clearing the
    /// selection stays local and is always allowed.
    pub fn select_square(&mut self, square: Square) -> Result<Option<Pending>> {
        self.gate.ensure_human_turn(&self.session)?;
        if self.session.is_awaiting_promotion() {
            return Err(SessionError::PromotionPending);
        }

        if self.session.selected() == Some(square) {
            self.dispatch(SessionEvent::SquareDeselected)?;
            debug!("deselected {square}");
            return Ok(None);
        }

        let human = self.gate.human();
        let (owns_piece, record) = match self.session.position() {
            Some(position) => (
                position
                    .pieces()
                    .piece_at(square)
                    .is_some_and(|piece| piece.color == human),
                position.record().clone(),
            ),
            None => return Err(SessionError::validation("no position loaded")),
        };

        if !owns_piece {
            if self.session.selected().is_some() {
                self.dispatch(SessionEvent::SquareDeselected)?;
                debug!("cleared selection, {square} holds no {human} piece");
            }
            return Ok(None);
        }

        if self.session.is_busy() {
            return Err(SessionError::Busy);
        }
        self.dispatch(SessionEvent::SquareSelected { square })?;
        let epoch = self.session.epoch();
        debug!("selected {square}, asking for legal moves ({epoch:?})");

        let remote = Arc::clone(&self.remote);
        let request = self.guarded(async move { remote.legal_moves(&record, square).await });
        Ok(Some(
            async move {
                Completion::LegalMoves {
                    epoch,
                    outcome: request.await,
                }
            }
            .boxed(),
        ))
    }

    /// Applies a legal-move answer if it still belongs to the current
    /// position and selection.
    pub fn on_legal_moves_received(
        &mut self,
        epoch: Epoch,
        outcome: Result<Vec<Square>>,
    ) -> Result<Notice> {
        let squares = match outcome {
            Ok(squares) => squares,
            Err(_) if epoch != self.session.epoch() => return Ok(Notice::Stale),
            Err(e) => return Err(self.surface(e)),
        };

        match self.dispatch(SessionEvent::LegalMovesReceived { epoch, squares }) {
            Ok(()) => {
                debug!("{} legal destinations", self.session.legal_moves().len());
                Ok(Notice::Applied)
            }
            Err(SessionError::StaleResponse) => {
                debug!("discarding legal moves for {epoch:?}");
                Ok(Notice::Stale)
            }
            Err(e) => Err(self.surface(e)),
        }
    }
}
