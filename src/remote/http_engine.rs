use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Response, multipart};
use serde::{Serialize, de::DeserializeOwned};
use shakmaty::Square;

use super::{
    RulesEngine, SolveReply,
    wire::{
        ErrorBody, FenRequest, HealthResponse, LegalMovesRequest, LegalMovesResponse,
        MoveRequest, ParseResponse, PositionDraft, PositionResponse, SolveDraft, SolveRequest,
        SolveResponse,
    },
};
use crate::{
    error::{Result, SessionError},
    position::{Algorithm, PlayerMove, Position, PositionRecord},
};

const UPLOAD_PATH: &str = "upload";
const RANDOMIZE_PATH: &str = "randomize";
const LEGAL_MOVES_PATH: &str = "legal-moves";
const MOVE_PATH: &str = "gukesh-move";
const SOLVE_PATH: &str = "solve";
const PARSE_PATH: &str = "parse-fen";
const HEALTH_PATH: &str = "health";

/// Talks to the engine's JSON API over HTTP.
#[derive(Clone)]
pub struct HttpRulesEngine {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl HttpRulesEngine {
    pub fn new(api_base: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SessionError::network(format!("POST {path} failed: {e}")))?;
        decode(path, response).await
    }

    /// Fills in the piece map when the engine left it out of a reply.
    async fn complete(&self, draft: PositionDraft) -> Result<Position> {
        let record = draft.record.clone();
        match draft.into_position() {
            Some(position) => Ok(position),
            None => {
                debug!("reply for {record} had no piece map, asking the parser");
                self.parse_position(&record).await
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SessionError::network(format!("reading {path} reply failed: {e}")))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("HTTP {status}"));
        warn!("{path} answered {status}: {message}");
        return Err(SessionError::rejected(message));
    }

    serde_json::from_str(&body)
        .map_err(|e| SessionError::network(format!("malformed {path} reply: {e}")))
}

#[async_trait]
impl RulesEngine for HttpRulesEngine {
    async fn upload_position(&self, contents: &str) -> Result<Position> {
        let part = multipart::Part::text(contents.to_string()).file_name("board.txt");
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SessionError::network(format!("POST {UPLOAD_PATH} failed: {e}")))?;

        let reply: PositionResponse = decode(UPLOAD_PATH, response).await?;
        self.complete(reply.into_draft()?).await
    }

    async fn randomize_position(&self) -> Result<Position> {
        let reply: PositionResponse = self.post_json(RANDOMIZE_PATH, &serde_json::json!({})).await?;
        self.complete(reply.into_draft()?).await
    }

    async fn legal_moves(&self, record: &PositionRecord, square: Square) -> Result<Vec<Square>> {
        let request = LegalMovesRequest {
            fen: record.as_str(),
            square: square.to_string(),
        };
        let reply: LegalMovesResponse = self.post_json(LEGAL_MOVES_PATH, &request).await?;
        reply.into_squares()
    }

    async fn submit_move(&self, record: &PositionRecord, mv: PlayerMove) -> Result<Position> {
        let request = MoveRequest {
            fen: record.as_str(),
            mv: mv.to_string(),
        };
        let reply: PositionResponse = self.post_json(MOVE_PATH, &request).await?;
        self.complete(reply.into_draft()?).await
    }

    async fn solve(
        &self,
        record: &PositionRecord,
        algorithm: Algorithm,
        promotion: Option<PlayerMove>,
    ) -> Result<SolveReply> {
        let request = SolveRequest {
            fen: record.as_str(),
            algorithm,
            promotion_move: promotion.map(|mv| mv.to_string()),
        };
        let reply: SolveResponse = self.post_json(SOLVE_PATH, &request).await?;

        match reply.into_draft()? {
            SolveDraft::Ready(reply) => Ok(reply),
            SolveDraft::Moved {
                mv,
                draft,
                analysis,
            } => Ok(SolveReply::Moved {
                mv,
                position: self.complete(draft).await?,
                analysis,
            }),
        }
    }

    async fn parse_position(&self, record: &PositionRecord) -> Result<Position> {
        let request = FenRequest {
            fen: record.as_str(),
        };
        let reply: ParseResponse = self.post_json(PARSE_PATH, &request).await?;
        reply.into_position(record)
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url(HEALTH_PATH))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SessionError::network(format!("engine unreachable: {e}")))?;
        let reply: HealthResponse = decode(HEALTH_PATH, response).await?;
        if reply.status != "ok" {
            return Err(SessionError::rejected(format!(
                "engine reports status '{}'",
                reply.status
            )));
        }
        info!(
            "engine reachable at {} ({})",
            self.api_base,
            reply.message.as_deref().unwrap_or("no message")
        );
        Ok(())
    }
}
