use log::debug;
use serde::Serialize;

use crate::board::{Board, CastlingRights};
use crate::movegen;
use crate::square::{Color, Piece, PieceKind, Square};

pub const FIFTY_MOVE_LIMIT: u32 = 100;
pub const REPETITION_LIMIT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "color", rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    /// The colour whose king is attacked.
    Check(Color),
    /// The winning colour.
    Checkmate(Color),
    Stalemate,
    DrawByRepetition,
    DrawByFiftyMoves,
    DrawByInsufficientMaterial,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        !matches!(self, GameStatus::InProgress | GameStatus::Check(_))
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameStatus::Checkmate(winner) => Some(winner),
            _ => None,
        }
    }

    pub fn is_draw(self) -> bool {
        self.is_over() && self.winner().is_none()
    }
}

/// The part of a position that decides whether two positions repeat:
/// placement, side to move, castling rights and en-passant target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub(crate) squares: [Option<Piece>; 64],
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
}

/// Status of `board`, where `history` lists the positions that preceded it
/// in the game, oldest first. The board itself counts as one occurrence.
pub fn status(board: &Board, history: &[PositionKey]) -> GameStatus {
    let mover = board.side_to_move();
    let in_check = board.is_in_check(mover);

    if !movegen::has_legal_move(board) {
        let result = if in_check {
            // the mated side is the one whose attacked king cannot escape
            GameStatus::Checkmate(mover.opposite())
        } else {
            GameStatus::Stalemate
        };
        debug!("game over: {result:?}");
        return result;
    }
    if is_insufficient_material(board) {
        return GameStatus::DrawByInsufficientMaterial;
    }
    if board.halfmove_clock() >= FIFTY_MOVE_LIMIT {
        return GameStatus::DrawByFiftyMoves;
    }
    if repetitions(board, history) >= REPETITION_LIMIT {
        return GameStatus::DrawByRepetition;
    }
    if in_check {
        GameStatus::Check(mover)
    } else {
        GameStatus::InProgress
    }
}

pub fn repetitions(board: &Board, history: &[PositionKey]) -> usize {
    let key = board.position_key();
    // a pawn move or capture resets the clock and makes earlier positions unreachable
    let window = (board.halfmove_clock() as usize).min(history.len());
    1 + history[history.len() - window..]
        .iter()
        .filter(|previous| **previous == key)
        .count()
}

/// King vs king, king and one minor piece vs king, or king and bishop vs
/// king and bishop with both bishops on the same square colour.
pub fn is_insufficient_material(board: &Board) -> bool {
    let others: Vec<(Square, Piece)> = board
        .pieces()
        .filter(|(_, piece)| piece.kind != PieceKind::King)
        .collect();
    match others.as_slice() {
        [] => true,
        [(_, piece)] => piece.kind.is_minor(),
        [(sq_a, a), (sq_b, b)] => {
            a.kind == PieceKind::Bishop
                && b.kind == PieceKind::Bishop
                && a.color != b.color
                && sq_a.is_light() == sq_b.is_light()
        }
        _ => false,
    }
}
