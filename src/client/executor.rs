use std::sync::Arc;

use futures::FutureExt;
use log::info;
use shakmaty::{Role, Square};

use super::{Completion, GameClient, Notice, Pending};
use crate::{
    error::{Result, SessionError},
    position::{Algorithm, Analysis, MovePrefix, PlayerMove, Position},
    remote::SolveReply,
    session::{Actor, SessionEvent},
    util,
};

impl GameClient {
    /// Moves the selected piece to `to`. A pawn reaching its last rank opens
    /// the promotion choice instead of contacting the engine.
    pub fn attempt_move(&mut self, from: Square, to: Square) -> Result<Option<Pending>> {
        self.gate.ensure_human_turn(&self.session)?;
        if self.session.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.session.is_awaiting_promotion() {
            return Err(SessionError::PromotionPending);
        }
        if self.session.selected() != Some(from) {
            return Err(SessionError::validation(format!("{from} is not selected")));
        }
        if !self.session.is_legal_destination(to) {
            return Err(SessionError::validation(format!(
                "{to} is not a legal destination from {from}"
            )));
        }

        if self.is_promotion_candidate(from, to) {
            let prefix = MovePrefix { from, to };
            self.dispatch(SessionEvent::PromotionStarted {
                prefix,
                actor: Actor::Human,
            })?;
            info!("{prefix} promotes, waiting for a piece choice");
            return Ok(None);
        }

        self.send_move(PlayerMove::new(from, to), false).map(Some)
    }

    fn is_promotion_candidate(&self, from: Square, to: Square) -> bool {
        let human = self.gate.human();
        let moves_own_pawn = self
            .session
            .position()
            .and_then(|p| p.pieces().piece_at(from))
            .is_some_and(|piece| piece.role == Role::Pawn && piece.color == human);
        moves_own_pawn && to.rank() == util::promotion_rank(human)
    }

    /// Sends a complete move for the operator's side.
    pub fn submit_move(&mut self, mv: PlayerMove) -> Result<Pending> {
        if self.session.is_awaiting_promotion() {
            return Err(SessionError::PromotionPending);
        }
        self.send_move(mv, false)
    }

    fn send_move(&mut self, mv: PlayerMove, promotion: bool) -> Result<Pending> {
        self.gate.ensure_human_turn(&self.session)?;
        let record = self.current_record()?;
        let ticket = self.begin_mutation()?;
        info!("submitting {mv}");

        let remote = Arc::clone(&self.remote);
        let request = self.guarded(async move { remote.submit_move(&record, mv).await });
        Ok(async move {
            Completion::MoveSubmitted {
                ticket,
                promotion,
                outcome: request.await,
            }
        }
        .boxed())
    }

    /// Finishes the pending promotion with `role` and sends the full move,
    /// to submit-move for the operator or to the solver for the engine.
    pub fn complete_promotion(&mut self, role: Role) -> Result<Pending> {
        let pending = *self
            .session
            .pending_promotion()
            .ok_or_else(|| SessionError::validation("no promotion pending"))?;
        if !util::is_promotion_role(role) {
            return Err(SessionError::validation(format!(
                "cannot promote to {role:?}"
            )));
        }

        let mv = pending.prefix.with_promotion(role);
        match pending.actor {
            Actor::Human => self.send_move(mv, true),
            Actor::Engine => {
                let algorithm = self
                    .session
                    .algorithm()
                    .ok_or_else(|| SessionError::validation("no algorithm chosen"))?;
                self.send_solve(algorithm, Some(mv))
            }
        }
    }

    /// Drops the pending promotion. Position and selection stay as they were.
    pub fn cancel_promotion(&mut self) -> Result<()> {
        if self.session.is_busy() {
            return Err(SessionError::Busy);
        }
        self.dispatch(SessionEvent::PromotionCancelled)?;
        info!("promotion cancelled");
        Ok(())
    }

    /// Lets the engine play its side with `algorithm`.
    pub fn request_engine_move(&mut self, algorithm: Algorithm) -> Result<Pending> {
        if self.session.is_awaiting_promotion() {
            return Err(SessionError::PromotionPending);
        }
        let pending = self.send_solve(algorithm, None)?;
        self.dispatch(SessionEvent::AlgorithmChosen(algorithm))?;
        Ok(pending)
    }

    fn send_solve(&mut self, algorithm: Algorithm, promotion: Option<PlayerMove>) -> Result<Pending> {
        self.gate.ensure_engine_turn(&self.session)?;
        let record = self.current_record()?;
        let ticket = self.begin_mutation()?;
        match promotion {
            Some(mv) => info!("engine promotes with {mv}"),
            None => info!("engine searching with {algorithm}"),
        }

        let remote = Arc::clone(&self.remote);
        let request =
            self.guarded(async move { remote.solve(&record, algorithm, promotion).await });
        Ok(async move {
            Completion::Solved {
                ticket,
                promotion: promotion.is_some(),
                outcome: request.await,
            }
        }
        .boxed())
    }

    fn commit(
        &mut self,
        position: Position,
        promotion: bool,
        analysis: Option<Analysis>,
    ) -> Result<()> {
        let event = if promotion {
            SessionEvent::PromotionCompleted { position, analysis }
        } else {
            SessionEvent::MoveCommitted { position, analysis }
        };
        self.dispatch(event)
    }

    pub(super) fn on_move_submitted(
        &mut self,
        ticket: u64,
        promotion: bool,
        outcome: Result<Position>,
    ) -> Result<Notice> {
        if !self.finish_mutation(ticket) {
            return Ok(Notice::Stale);
        }
        let position = outcome.map_err(|e| self.surface(e))?;
        let record = position.record().clone();
        self.commit(position, promotion, None)
            .map_err(|e| self.surface(e))?;
        info!("move accepted, now {record}");
        Ok(Notice::Applied)
    }

    pub(super) fn on_solved(
        &mut self,
        ticket: u64,
        promotion: bool,
        outcome: Result<SolveReply>,
    ) -> Result<Notice> {
        if !self.finish_mutation(ticket) {
            return Ok(Notice::Stale);
        }

        match outcome.map_err(|e| self.surface(e))? {
            SolveReply::Moved {
                mv,
                position,
                analysis,
            } => {
                self.commit(position, promotion, analysis)
                    .map_err(|e| self.surface(e))?;
                info!("engine played {mv}");
                Ok(Notice::Applied)
            }
            SolveReply::PromotionRequired { prefix, analysis } => {
                if let Some(analysis) = analysis {
                    self.dispatch(SessionEvent::AnalysisReceived { analysis })?;
                }
                self.dispatch(SessionEvent::PromotionStarted {
                    prefix,
                    actor: Actor::Engine,
                })
                .map_err(|e| self.surface(e))?;
                info!("engine wants to promote with {prefix}, choose a piece");
                Ok(Notice::PromotionRequired(prefix))
            }
            SolveReply::Analysed { analysis } => {
                if let Some(mate) = &analysis.mate_info {
                    info!("engine reports: {}", mate.status);
                }
                self.dispatch(SessionEvent::AnalysisReceived { analysis })?;
                Ok(Notice::Analysed)
            }
            SolveReply::GameOver {
                reason,
                winner,
                analysis,
            } => {
                self.dispatch(SessionEvent::AnalysisReceived { analysis })?;
                let outcome = match (&reason, &winner) {
                    (Some(reason), Some(winner)) => format!("{reason}, {winner} wins"),
                    (Some(reason), None) => reason.clone(),
                    (None, Some(winner)) => format!("{winner} wins"),
                    (None, None) => "no moves left".to_string(),
                };
                info!("game over: {outcome}");
                let reset = self.offer_reset(&format!("Game over ({outcome}). Start a new game?"));
                Ok(Notice::GameOver {
                    reason,
                    winner,
                    reset,
                })
            }
        }
    }
}
