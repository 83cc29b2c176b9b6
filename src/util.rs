use std::str::FromStr;

use shakmaty::{Color, Rank, Role, Square, uci::UciMove};

use crate::error::{Result, SessionError};

pub fn parse_uci_move(move_str: &str) -> Result<UciMove> {
    UciMove::from_str(move_str.trim())
        .map_err(|e| SessionError::validation(format!("bad move '{move_str}': {e}")))
}

pub fn parse_square(square_str: &str) -> Result<Square> {
    Square::from_str(square_str.trim())
        .map_err(|e| SessionError::validation(format!("bad square '{square_str}': {e}")))
}

pub fn parse_squares<S: AsRef<str>>(square_strs: &[S]) -> Result<Vec<Square>> {
    square_strs.iter().map(|s| parse_square(s.as_ref())).collect()
}

/// Accepts `white`/`black` as well as the single letters used in position records.
pub fn parse_color(color_str: &str) -> Option<Color> {
    match color_str.trim().to_ascii_lowercase().as_str() {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}

/// Only queen, rook, bishop and knight are valid promotion designators.
pub fn parse_promotion_role(role_str: &str) -> Result<Role> {
    let role = match role_str.trim().to_ascii_lowercase().as_str() {
        "q" | "queen" => Role::Queen,
        "r" | "rook" => Role::Rook,
        "b" | "bishop" => Role::Bishop,
        "n" | "knight" => Role::Knight,
        other => {
            return Err(SessionError::validation(format!(
                "'{other}' is not a promotion piece"
            )));
        }
    };
    Ok(role)
}

pub fn is_promotion_role(role: Role) -> bool {
    matches!(role, Role::Queen | Role::Rook | Role::Bishop | Role::Knight)
}

/// The rank a pawn of `color` promotes on.
pub fn promotion_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    }
}
