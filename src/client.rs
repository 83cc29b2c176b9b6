//! Drives one [`GameSession`] against a remote [`RulesEngine`].
//!
//! Operations check everything they can synchronously and then hand back a
//! [`Pending`] future instead of awaiting the engine themselves. Whoever owns
//! the client awaits it (possibly alongside others) and feeds the resulting
//! [`Completion`] back through [`GameClient::complete`]. This keeps a single
//! writer for the session while several requests may be in flight.

mod executor;
mod selection;

use std::{future::Future, sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use log::{debug, error, info, warn};
use shakmaty::{Color, Square};

use crate::{
    error::{Result, SessionError},
    position::{Algorithm, MovePrefix, Position, PositionRecord},
    remote::{RulesEngine, SolveReply},
    session::{Epoch, GameSession, LoadOrigin, SessionEvent, TurnGate, apply},
};

/// A request that has been issued but not yet applied.
pub type Pending = BoxFuture<'static, Completion>;

/// Asks the operator a yes/no question.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// The resolved result of a [`Pending`] request, tagged so stale results can
/// be told apart from current ones.
#[derive(Debug)]
pub enum Completion {
    LegalMoves {
        epoch: Epoch,
        outcome: Result<Vec<Square>>,
    },
    Loaded {
        ticket: u64,
        origin: LoadOrigin,
        outcome: Result<Position>,
    },
    MoveSubmitted {
        ticket: u64,
        promotion: bool,
        outcome: Result<Position>,
    },
    Solved {
        ticket: u64,
        promotion: bool,
        outcome: Result<SolveReply>,
    },
    Replayed {
        index: usize,
        outcome: Result<Position>,
    },
}

/// What applying a completion did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Applied,
    /// The session moved on while the request was in flight; nothing changed.
    Stale,
    PromotionRequired(MovePrefix),
    Analysed,
    GameOver {
        reason: Option<String>,
        winner: Option<String>,
        reset: bool,
    },
}

pub struct GameClient {
    session: GameSession,
    remote: Arc<dyn RulesEngine>,
    gate: TurnGate,
    timeout: Duration,
    confirm: Box<dyn Confirm>,
}

impl GameClient {
    pub fn new(remote: Arc<dyn RulesEngine>, human: Color, timeout: Duration) -> Self {
        Self {
            session: GameSession::new(),
            remote,
            gate: TurnGate::new(human),
            timeout,
            confirm: Box::new(|_: &str| false),
        }
    }

    pub fn with_confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn gate(&self) -> TurnGate {
        self.gate
    }

    fn dispatch(&mut self, event: SessionEvent) -> Result<()> {
        self.session = apply(&self.session, event)?;
        Ok(())
    }

    /// Records a failure for the operator and hands it back.
    fn surface(&mut self, err: SessionError) -> SessionError {
        if err.is_visible() {
            warn!("{err}");
            if let Ok(next) = apply(&self.session, SessionEvent::FailureSurfaced(err.to_string())) {
                self.session = next;
            }
        }
        err
    }

    fn current_record(&self) -> Result<PositionRecord> {
        self.session
            .position()
            .map(|p| p.record().clone())
            .ok_or_else(|| SessionError::validation("no position loaded"))
    }

    /// Marks the session busy for a mutating request and returns its ticket.
    fn begin_mutation(&mut self) -> Result<u64> {
        if self.session.is_busy() {
            return Err(SessionError::Busy);
        }
        self.dispatch(SessionEvent::LoadingToggled(true))?;
        Ok(self.session.generation())
    }

    /// Clears the busy flag for a finished mutating request. Returns false if
    /// the request belongs to an older generation and must be ignored.
    fn finish_mutation(&mut self, ticket: u64) -> bool {
        if ticket != self.session.generation() {
            debug!(
                "dropping reply for generation {ticket}, session is at {}",
                self.session.generation()
            );
            return false;
        }
        if let Ok(next) = apply(&self.session, SessionEvent::LoadingToggled(false)) {
            self.session = next;
        }
        true
    }

    fn guarded<T, F>(&self, request: F) -> impl Future<Output = Result<T>> + Send + 'static
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let timeout = self.timeout;
        async move {
            match tokio::time::timeout(timeout, request).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SessionError::network(format!(
                    "engine did not answer within {:.1}s",
                    timeout.as_secs_f32()
                ))),
            }
        }
    }

    pub fn choose_algorithm(&mut self, algorithm: Algorithm) {
        if self.dispatch(SessionEvent::AlgorithmChosen(algorithm)).is_ok() {
            info!("engine will search with {algorithm}");
        }
    }

    pub fn upload(&mut self, contents: impl Into<String>) -> Result<Pending> {
        let contents = contents.into();
        if contents.trim().is_empty() {
            return Err(SessionError::validation("position file is empty"));
        }
        self.load(LoadOrigin::Upload, move |remote| async move {
            remote.upload_position(&contents).await
        })
    }

    pub fn randomize(&mut self) -> Result<Pending> {
        self.load(LoadOrigin::Randomize, |remote| async move {
            remote.randomize_position().await
        })
    }

    fn load<F, Fut>(&mut self, origin: LoadOrigin, request: F) -> Result<Pending>
    where
        F: FnOnce(Arc<dyn RulesEngine>) -> Fut,
        Fut: Future<Output = Result<Position>> + Send + 'static,
    {
        if self.session.is_awaiting_promotion() {
            return Err(SessionError::PromotionPending);
        }
        let ticket = self.begin_mutation()?;
        let request = self.guarded(request(Arc::clone(&self.remote)));
        Ok(async move {
            Completion::Loaded {
                ticket,
                origin,
                outcome: request.await,
            }
        }
        .boxed())
    }

    /// Shows history entry `index` without touching the live game. The piece
    /// map is re-derived by the engine.
    pub fn replay(&self, index: usize) -> Result<Pending> {
        let record = self
            .session
            .history()
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::validation(format!("no history entry {index}")))?;
        let remote = Arc::clone(&self.remote);
        let request = self.guarded(async move { remote.parse_position(&record).await });
        Ok(async move {
            Completion::Replayed {
                index,
                outcome: request.await,
            }
        }
        .boxed())
    }

    pub fn close_replay(&mut self) {
        if let Ok(next) = apply(&self.session, SessionEvent::ReplayClosed) {
            self.session = next;
        }
    }

    /// Makes the replayed entry `index` the live position.
    pub fn commit_replay(&mut self, index: usize) -> Result<()> {
        if self.session.is_busy() {
            return Err(SessionError::Busy);
        }
        let position = match self.session.replay() {
            Some(view) if view.index == index => view.position.clone(),
            _ => {
                return Err(SessionError::validation(format!(
                    "history entry {index} is not being viewed"
                )));
            }
        };
        self.dispatch(SessionEvent::PositionLoaded {
            position,
            origin: LoadOrigin::Replay,
        })?;
        info!("continuing from history entry {index}");
        Ok(())
    }

    /// Unconditional recovery: back to an empty session, keeping preferences.
    pub fn reset(&mut self) {
        match apply(&self.session, SessionEvent::SessionReset) {
            Ok(next) => self.session = next,
            Err(e) => error!("reset failed: {e}"),
        }
        info!("session reset");
    }

    /// Asks the operator whether to reset and does so only if they agree.
    pub fn offer_reset(&mut self, prompt: &str) -> bool {
        let accepted = self.confirm.confirm(prompt);
        if accepted {
            self.reset();
        }
        accepted
    }

    /// Applies a resolved request. Stale results come back as
    /// `Ok(Notice::Stale)`; failures are recorded on the session and returned.
    pub fn complete(&mut self, completion: Completion) -> Result<Notice> {
        match completion {
            Completion::LegalMoves { epoch, outcome } => {
                self.on_legal_moves_received(epoch, outcome)
            }
            Completion::Loaded {
                ticket,
                origin,
                outcome,
            } => {
                if !self.finish_mutation(ticket) {
                    return Ok(Notice::Stale);
                }
                let position = outcome.map_err(|e| self.surface(e))?;
                let record = position.record().clone();
                self.dispatch(SessionEvent::PositionLoaded { position, origin })
                    .map_err(|e| self.surface(e))?;
                info!("loaded {record} ({origin:?})");
                Ok(Notice::Applied)
            }
            Completion::MoveSubmitted {
                ticket,
                promotion,
                outcome,
            } => self.on_move_submitted(ticket, promotion, outcome),
            Completion::Solved {
                ticket,
                promotion,
                outcome,
            } => self.on_solved(ticket, promotion, outcome),
            Completion::Replayed { index, outcome } => {
                let position = outcome.map_err(|e| self.surface(e))?;
                match self.dispatch(SessionEvent::ReplayShown { index, position }) {
                    Ok(()) => Ok(Notice::Applied),
                    Err(e) => {
                        debug!("replay of entry {index} no longer applies: {e}");
                        Ok(Notice::Stale)
                    }
                }
            }
        }
    }
}
