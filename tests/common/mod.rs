#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use endgame_client::{
    GameClient, Notice, SessionError,
    error::Result,
    position::{Algorithm, PieceMap, PlayerMove, Position, PositionRecord},
    remote::{RulesEngine, SolveReply},
};
use shakmaty::{Color, Square};

pub fn position(fen: &str, pieces: &[(&str, &str)]) -> Position {
    Position::new(
        PositionRecord::parse(fen).unwrap(),
        PieceMap::from_labels(pieces.iter().map(|(label, sq)| (*label, Some(*sq)))).unwrap(),
        None,
    )
}

/// In-memory engine answering from queues filled by the test.
#[derive(Default)]
pub struct ScriptedEngine {
    loads: Mutex<VecDeque<Result<Position>>>,
    legal: Mutex<HashMap<Square, Vec<Square>>>,
    legal_failures: Mutex<HashMap<Square, SessionError>>,
    moves: Mutex<VecDeque<Result<Position>>>,
    solves: Mutex<VecDeque<Result<SolveReply>>>,
    parsed: Mutex<HashMap<String, Position>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on_load(&self, reply: Result<Position>) {
        if let Ok(position) = &reply {
            self.knows(position.clone());
        }
        self.loads.lock().unwrap().push_back(reply);
    }

    pub fn on_legal_moves(&self, from: Square, to: &[Square]) {
        self.legal.lock().unwrap().insert(from, to.to_vec());
    }

    /// The next legal-move lookup for `from` fails with `err`.
    pub fn on_legal_moves_error(&self, from: Square, err: SessionError) {
        self.legal_failures.lock().unwrap().insert(from, err);
    }

    pub fn on_move(&self, reply: Result<Position>) {
        if let Ok(position) = &reply {
            self.knows(position.clone());
        }
        self.moves.lock().unwrap().push_back(reply);
    }

    pub fn on_solve(&self, reply: Result<SolveReply>) {
        if let Ok(SolveReply::Moved { position, .. }) = &reply {
            self.knows(position.clone());
        }
        self.solves.lock().unwrap().push_back(reply);
    }

    /// Lets parse-position answer for this record.
    pub fn knows(&self, position: Position) {
        self.parsed
            .lock()
            .unwrap()
            .insert(position.record().as_str().to_string(), position);
    }

    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn unscripted(what: &str) -> SessionError {
    SessionError::rejected(format!("no scripted {what} reply"))
}

#[async_trait]
impl RulesEngine for ScriptedEngine {
    async fn upload_position(&self, contents: &str) -> Result<Position> {
        self.record_call(format!("upload {}", contents.trim()));
        self.wait().await;
        let reply = self.loads.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(unscripted("upload")))
    }

    async fn randomize_position(&self) -> Result<Position> {
        self.record_call("randomize".to_string());
        self.wait().await;
        let reply = self.loads.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(unscripted("randomize")))
    }

    async fn legal_moves(&self, _record: &PositionRecord, square: Square) -> Result<Vec<Square>> {
        self.record_call(format!("legal_moves {square}"));
        self.wait().await;
        let failure = self.legal_failures.lock().unwrap().remove(&square);
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self
            .legal
            .lock()
            .unwrap()
            .get(&square)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_move(&self, _record: &PositionRecord, mv: PlayerMove) -> Result<Position> {
        self.record_call(format!("submit_move {mv}"));
        self.wait().await;
        let reply = self.moves.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(unscripted("move")))
    }

    async fn solve(
        &self,
        _record: &PositionRecord,
        algorithm: Algorithm,
        promotion: Option<PlayerMove>,
    ) -> Result<SolveReply> {
        match promotion {
            Some(mv) => self.record_call(format!("solve {algorithm} {mv}")),
            None => self.record_call(format!("solve {algorithm}")),
        }
        self.wait().await;
        let reply = self.solves.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Err(unscripted("solve")))
    }

    async fn parse_position(&self, record: &PositionRecord) -> Result<Position> {
        self.record_call(format!("parse {record}"));
        self.parsed
            .lock()
            .unwrap()
            .get(record.as_str())
            .cloned()
            .ok_or_else(|| unscripted("parse"))
    }
}

pub fn client(engine: &Arc<ScriptedEngine>, human: Color) -> GameClient {
    let remote: Arc<dyn RulesEngine> = engine.clone();
    GameClient::new(remote, human, Duration::from_secs(5))
}

/// A client whose session starts at `start`, loaded through randomize.
pub async fn client_at(engine: &Arc<ScriptedEngine>, human: Color, start: Position) -> GameClient {
    let mut client = client(engine, human);
    engine.on_load(Ok(start));
    let pending = client.randomize().unwrap();
    assert_eq!(client.complete(pending.await), Ok(Notice::Applied));
    client
}
