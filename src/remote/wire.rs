//! JSON shapes exchanged with the engine's HTTP API and their conversion
//! into domain types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shakmaty::Square;

use super::SolveReply;
use crate::{
    error::{Result, SessionError},
    position::{Algorithm, Analysis, MateInfo, PieceMap, PlayerMove, Position, PositionRecord},
    util,
};

type RawPieceMap = HashMap<String, Option<String>>;

fn succeeded() -> bool {
    true
}

fn rejection(error: Option<String>, fallback: &str) -> SessionError {
    SessionError::rejected(error.unwrap_or_else(|| fallback.to_string()))
}

#[derive(Debug, Serialize)]
pub(super) struct FenRequest<'a> {
    pub fen: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct LegalMovesRequest<'a> {
    pub fen: &'a str,
    pub square: String,
}

#[derive(Debug, Serialize)]
pub(super) struct MoveRequest<'a> {
    pub fen: &'a str,
    #[serde(rename = "move")]
    pub mv: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SolveRequest<'a> {
    pub fen: &'a str,
    pub algorithm: Algorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_move: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// A position whose piece map may still have to be fetched.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct PositionDraft {
    pub record: PositionRecord,
    pub pieces: Option<PieceMap>,
    pub mate: Option<MateInfo>,
}

impl PositionDraft {
    fn from_parts(
        board: Option<String>,
        positions: Option<RawPieceMap>,
        mate: Option<MateInfo>,
    ) -> Result<Self> {
        let board = board.ok_or_else(|| SessionError::validation("engine reply has no position"))?;
        let record = PositionRecord::parse(&board)?;
        let pieces = positions.map(PieceMap::from_labels).transpose()?;
        Ok(Self {
            record,
            pieces,
            mate,
        })
    }

    pub fn into_position(self) -> Option<Position> {
        let pieces = self.pieces?;
        Some(Position::new(self.record, pieces, self.mate))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PositionResponse {
    #[serde(default = "succeeded")]
    success: bool,
    #[serde(default)]
    board: Option<String>,
    #[serde(default)]
    positions: Option<RawPieceMap>,
    #[serde(default)]
    mate_info: Option<MateInfo>,
    #[serde(default)]
    error: Option<String>,
}

impl PositionResponse {
    pub fn into_draft(self) -> Result<PositionDraft> {
        if !self.success {
            return Err(rejection(self.error, "position request failed"));
        }
        PositionDraft::from_parts(self.board, self.positions, self.mate_info)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ParseResponse {
    #[serde(default = "succeeded")]
    success: bool,
    #[serde(default)]
    positions: Option<RawPieceMap>,
    #[serde(default)]
    mate_info: Option<MateInfo>,
    #[serde(default)]
    error: Option<String>,
}

impl ParseResponse {
    pub fn into_position(self, record: &PositionRecord) -> Result<Position> {
        if !self.success {
            return Err(rejection(self.error, "could not parse position"));
        }
        let positions = self
            .positions
            .ok_or_else(|| SessionError::validation("parse reply has no piece map"))?;
        let pieces = PieceMap::from_labels(positions)?;
        Ok(Position::new(record.clone(), pieces, self.mate_info))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LegalMovesResponse {
    #[serde(default = "succeeded")]
    success: bool,
    #[serde(default)]
    legal_moves: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LegalMovesResponse {
    pub fn into_squares(self) -> Result<Vec<Square>> {
        if !self.success {
            return Err(rejection(self.error, "legal move lookup failed"));
        }
        util::parse_squares(&self.legal_moves)
    }
}

/// Solve reply before any missing piece map has been fetched.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum SolveDraft {
    Moved {
        mv: PlayerMove,
        draft: PositionDraft,
        analysis: Option<Analysis>,
    },
    Ready(SolveReply),
}

#[derive(Debug, Deserialize)]
pub(super) struct SolveResponse {
    #[serde(default = "succeeded")]
    success: bool,
    #[serde(default, rename = "move")]
    mv: Option<String>,
    #[serde(default)]
    board: Option<String>,
    #[serde(default)]
    positions: Option<RawPieceMap>,
    #[serde(default)]
    mate_info: Option<MateInfo>,
    #[serde(default)]
    analysis: Option<Analysis>,
    #[serde(default)]
    promotion_required: bool,
    #[serde(default)]
    game_over: bool,
    #[serde(default)]
    game_over_reason: Option<String>,
    #[serde(default)]
    winner: Option<String>,
    #[serde(default)]
    mate: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SolveResponse {
    pub fn into_draft(self) -> Result<SolveDraft> {
        if !self.success {
            return Err(rejection(self.error, "solve failed"));
        }

        if self.game_over {
            let mut analysis = self.analysis.unwrap_or_default();
            analysis.game_over = true;
            let reason = self.game_over_reason.or_else(|| analysis.game_over_reason.clone());
            return Ok(SolveDraft::Ready(SolveReply::GameOver {
                reason,
                winner: self.winner,
                analysis,
            }));
        }

        let mv = self.mv.as_deref().map(str::parse::<PlayerMove>).transpose()?;

        if self.promotion_required {
            let mv = mv.ok_or_else(|| {
                SessionError::validation("promotion requested without a move")
            })?;
            return Ok(SolveDraft::Ready(SolveReply::PromotionRequired {
                prefix: mv.prefix(),
                analysis: self.analysis,
            }));
        }

        match (mv, self.board) {
            (Some(mv), board @ Some(_)) => Ok(SolveDraft::Moved {
                mv,
                draft: PositionDraft::from_parts(board, self.positions, self.mate_info)?,
                analysis: self.analysis,
            }),
            (None, _) if self.mate || self.analysis.is_some() => {
                let mut analysis = self.analysis.unwrap_or_default();
                analysis.mate |= self.mate;
                if analysis.mate_info.is_none() {
                    analysis.mate_info = self.mate_info;
                }
                Ok(SolveDraft::Ready(SolveReply::Analysed { analysis }))
            }
            _ => Err(SessionError::rejected("engine returned no move")),
        }
    }
}
