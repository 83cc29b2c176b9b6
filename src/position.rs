//! Position records and the data the remote engine attaches to them.
//!
//! The position record (FEN text) is opaque to the client except for its
//! side-to-move field. Everything else about the board is learned from the
//! piece map the engine sends along.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Piece, Role, Square, uci::UciMove};

use crate::{
    error::{Result, SessionError},
    util,
};

/// A well-formed position record. Construction validates it, so a value of
/// this type always has a readable side-to-move field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionRecord {
    fen: String,
    turn: Color,
}

impl PositionRecord {
    pub fn parse(fen: &str) -> Result<Self> {
        let fen = fen.trim();
        if fen.is_empty() {
            return Err(SessionError::validation("empty position record"));
        }

        let mut fields = fen.split_whitespace();
        let _board = fields.next();
        let turn = fields
            .next()
            .ok_or_else(|| SessionError::validation(format!("'{fen}' has no side-to-move field")))?;
        let turn = match turn {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(SessionError::validation(format!(
                    "'{other}' is not a side to move"
                )));
            }
        };

        Ok(Self {
            fen: fen.to_string(),
            turn,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> Color {
        self.turn
    }
}

impl fmt::Display for PositionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fen)
    }
}

impl FromStr for PositionRecord {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Where each piece stands, keyed by the engine's identity labels
/// (`white_king`, `black_king`, `white_pawn`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceMap {
    by_square: BTreeMap<Square, (String, Piece)>,
}

impl PieceMap {
    /// Builds the map from `label -> square` pairs. Labels without a square are
    /// pieces that left the board and are skipped.
    pub fn from_labels<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut by_square = BTreeMap::new();
        for (label, square) in entries {
            let Some(square) = square else { continue };
            let label = label.as_ref();
            let piece = piece_from_label(label)?;
            let square = util::parse_square(square.as_ref())?;
            if by_square
                .insert(square, (label.to_string(), piece))
                .is_some()
            {
                return Err(SessionError::validation(format!(
                    "two pieces reported on {square}"
                )));
            }
        }
        Ok(Self { by_square })
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.by_square.get(&square).map(|(_, piece)| *piece)
    }

    pub fn square_of(&self, label: &str) -> Option<Square> {
        self.by_square
            .iter()
            .find(|(_, (l, _))| l == label)
            .map(|(sq, _)| *sq)
    }
}

fn piece_from_label(label: &str) -> Result<Piece> {
    let bad_label = || SessionError::validation(format!("unknown piece '{label}'"));
    let (color, role) = label.split_once('_').ok_or_else(bad_label)?;
    let color = util::parse_color(color).ok_or_else(bad_label)?;
    let role = match role {
        "king" => Role::King,
        "queen" => Role::Queen,
        "rook" => Role::Rook,
        "bishop" => Role::Bishop,
        "knight" => Role::Knight,
        "pawn" => Role::Pawn,
        _ => return Err(bad_label()),
    };
    Ok(Piece { color, role })
}

/// Forced-mate report attached to a position by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MateInfo {
    #[serde(default)]
    pub mate_in: Option<u32>,
    #[serde(default)]
    pub for_side: Option<String>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub status: String,
}

/// One authoritative position as produced by the engine. Replaced wholesale,
/// never edited.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    record: PositionRecord,
    pieces: PieceMap,
    mate: Option<MateInfo>,
}

impl Position {
    pub fn new(record: PositionRecord, pieces: PieceMap, mate: Option<MateInfo>) -> Self {
        Self {
            record,
            pieces,
            mate,
        }
    }

    pub fn record(&self) -> &PositionRecord {
        &self.record
    }

    pub fn pieces(&self) -> &PieceMap {
        &self.pieces
    }

    pub fn mate(&self) -> Option<&MateInfo> {
        self.mate.as_ref()
    }

    pub fn turn(&self) -> Color {
        self.record.side_to_move()
    }
}

/// Search metadata returned with an engine move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub evaluation: Option<f64>,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub nodes_explored: Option<u64>,
    #[serde(default)]
    pub iterations: Option<u64>,
    #[serde(default)]
    pub mate: bool,
    #[serde(default)]
    pub mate_info: Option<MateInfo>,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub game_over_reason: Option<String>,
    #[serde(default)]
    pub promotion: bool,
}

/// Search algorithms the engine offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Mabp,
    IterativeDeepening,
    Pvs,
    Mcts,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Mabp,
        Algorithm::IterativeDeepening,
        Algorithm::Pvs,
        Algorithm::Mcts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Mabp => "mabp",
            Algorithm::IterativeDeepening => "iterative_deepening",
            Algorithm::Pvs => "pvs",
            Algorithm::Mcts => "mcts",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| SessionError::validation(format!("unknown algorithm '{s}'")))
    }
}

/// Source and destination of a move whose promotion piece is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovePrefix {
    pub from: Square,
    pub to: Square,
}

impl MovePrefix {
    pub fn with_promotion(self, role: Role) -> PlayerMove {
        PlayerMove {
            from: self.from,
            to: self.to,
            promotion: Some(role),
        }
    }
}

impl fmt::Display for MovePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// A complete move as sent to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl PlayerMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn prefix(&self) -> MovePrefix {
        MovePrefix {
            from: self.from,
            to: self.to,
        }
    }

    pub fn to_uci(&self) -> UciMove {
        UciMove::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }

    pub fn from_uci(uci: &UciMove) -> Result<Self> {
        match *uci {
            UciMove::Normal {
                from,
                to,
                promotion,
            } => {
                if promotion.is_some_and(|r| !util::is_promotion_role(r)) {
                    return Err(SessionError::validation(format!(
                        "{uci} promotes to an invalid piece"
                    )));
                }
                Ok(Self {
                    from,
                    to,
                    promotion,
                })
            }
            _ => Err(SessionError::validation(format!(
                "{uci} is not a board move"
            ))),
        }
    }
}

impl fmt::Display for PlayerMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl FromStr for PlayerMove {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_uci(&util::parse_uci_move(s)?)
    }
}
