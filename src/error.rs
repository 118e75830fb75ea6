use std::fmt;

use thiserror::Error;

use crate::square::{PieceKind, Square};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenField {
    Record,
    Placement,
    SideToMove,
    Castling,
    EnPassant,
    HalfmoveClock,
    FullmoveNumber,
}

impl fmt::Display for FenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FenField::Record => "record",
            FenField::Placement => "piece placement",
            FenField::SideToMove => "side to move",
            FenField::Castling => "castling rights",
            FenField::EnPassant => "en passant target",
            FenField::HalfmoveClock => "halfmove clock",
            FenField::FullmoveNumber => "fullmove number",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("illegal move: {from}{to}{}", promotion_suffix(.promotion))]
    IllegalMove {
        from: Square,
        to: Square,
        promotion: Option<PieceKind>,
    },

    #[error("no legal moves available")]
    NoLegalMoves,

    #[error("the game is already over")]
    GameOver,

    #[error("malformed position ({field}): {message}")]
    MalformedPosition { field: FenField, message: String },

    #[error("invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("invalid move text: {0:?}")]
    InvalidMoveText(String),
}

fn promotion_suffix(promotion: &Option<PieceKind>) -> String {
    promotion
        .map(|kind| kind.to_char().to_string())
        .unwrap_or_default()
}

impl ChessError {
    pub(crate) fn malformed(field: FenField, message: impl Into<String>) -> Self {
        ChessError::MalformedPosition {
            field,
            message: message.into(),
        }
    }
}

impl From<ChessError> for std::io::Error {
    fn from(err: ChessError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    }
}

pub type ChessResult<T> = Result<T, ChessError>;
