mod http_engine;
mod wire;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use shakmaty::Square;

pub use http_engine::HttpRulesEngine;

use crate::{
    error::Result,
    position::{Algorithm, Analysis, MovePrefix, PlayerMove, Position, PositionRecord},
};

pub fn init_remote(api_base: &str, timeout: Duration) -> Arc<dyn RulesEngine> {
    Arc::new(HttpRulesEngine::new(api_base, timeout))
}

/// What the engine answered to a solve request.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveReply {
    /// The engine played `mv`, leading to `position`.
    Moved {
        mv: PlayerMove,
        position: Position,
        analysis: Option<Analysis>,
    },
    /// The engine wants to promote and needs a piece designator.
    PromotionRequired {
        prefix: MovePrefix,
        analysis: Option<Analysis>,
    },
    /// No move, only a report (forced mate found without a best move).
    Analysed { analysis: Analysis },
    GameOver {
        reason: Option<String>,
        winner: Option<String>,
        analysis: Analysis,
    },
}

/// The authoritative rules/solving engine. Every legality decision lives
/// behind this trait.
#[async_trait]
pub trait RulesEngine: Send + Sync {
    async fn upload_position(&self, contents: &str) -> Result<Position>;

    async fn randomize_position(&self) -> Result<Position>;

    async fn legal_moves(&self, record: &PositionRecord, square: Square) -> Result<Vec<Square>>;

    async fn submit_move(&self, record: &PositionRecord, mv: PlayerMove) -> Result<Position>;

    async fn solve(
        &self,
        record: &PositionRecord,
        algorithm: Algorithm,
        promotion: Option<PlayerMove>,
    ) -> Result<SolveReply>;

    async fn parse_position(&self, record: &PositionRecord) -> Result<Position>;

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}
