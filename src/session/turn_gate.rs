use shakmaty::Color;

use super::GameSession;
use crate::{
    error::{Result, SessionError},
    position::Position,
};

/// The side to move, read from the position record every time.
pub fn turn_side(position: &Position) -> Color {
    position.turn()
}

/// Decides who may act. Checked before any request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnGate {
    human: Color,
}

impl TurnGate {
    pub fn new(human: Color) -> Self {
        Self { human }
    }

    pub fn human(&self) -> Color {
        self.human
    }

    pub fn engine(&self) -> Color {
        !self.human
    }

    pub fn is_human_turn(&self, session: &GameSession) -> bool {
        session
            .position()
            .is_some_and(|p| turn_side(p) == self.human)
    }

    pub fn ensure_human_turn(&self, session: &GameSession) -> Result<()> {
        self.ensure_turn(session, self.human)
    }

    pub fn ensure_engine_turn(&self, session: &GameSession) -> Result<()> {
        self.ensure_turn(session, self.engine())
    }

    fn ensure_turn(&self, session: &GameSession, actor: Color) -> Result<()> {
        let position = session
            .position()
            .ok_or_else(|| SessionError::validation("no position loaded"))?;
        let to_move = turn_side(position);
        if to_move != actor {
            return Err(SessionError::TurnViolation {
                expected: to_move,
                actual: actor,
            });
        }
        Ok(())
    }
}
