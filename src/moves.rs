use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ChessError;
use crate::square::{PieceKind, Square};

/// A move, meaningful only relative to the board it was generated from.
///
/// Field order doubles as the canonical sort key: from-square, then
/// to-square, then promotion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub is_castle: bool,
    pub is_en_passant: bool,
}

impl Move {
    pub fn quiet(from: Square, to: Square) -> Self {
        Self { from, to, promotion: None, is_castle: false, is_en_passant: false }
    }

    pub fn promote(from: Square, to: Square, kind: PieceKind) -> Self {
        Self { promotion: Some(kind), ..Self::quiet(from, to) }
    }

    pub fn castle(from: Square, to: Square) -> Self {
        Self { is_castle: true, ..Self::quiet(from, to) }
    }

    pub fn en_passant(from: Square, to: Square) -> Self {
        Self { is_en_passant: true, ..Self::quiet(from, to) }
    }

    pub fn matches(&self, from: Square, to: Square, promotion: Option<PieceKind>) -> bool {
        self.from == from && self.to == to && self.promotion == promotion
    }
}

/// Coordinate notation: `e2e4`, `e7e8q`, `e1g1` for castling.
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.to_char())?;
        }
        Ok(())
    }
}

/// Parses coordinate notation into a bare move request. Castling and
/// en-passant flags are left unset; the board fills them in when the
/// request is matched against its legal moves.
impl FromStr for Move {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChessError::InvalidMoveText(s.to_string());
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(invalid());
        }
        let from: Square = s[0..2].parse().map_err(|_| invalid())?;
        let to: Square = s[2..4].parse().map_err(|_| invalid())?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => match PieceKind::from_char(c) {
                Some(kind) if PieceKind::PROMOTIONS.contains(&kind) => Some(kind),
                _ => return Err(invalid()),
            },
        };
        Ok(Move { promotion, ..Move::quiet(from, to) })
    }
}
