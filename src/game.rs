use log::{debug, info};

use crate::bitboard::SquareSet;
use crate::board::Board;
use crate::engine::{MovePolicy, RandomPolicy};
use crate::error::{ChessError, ChessResult};
use crate::movegen;
use crate::moves::Move;
use crate::square::{Color, PieceKind, Square};
use crate::status::{self, GameStatus, PositionKey};

pub type BoxedPolicy = Box<dyn MovePolicy + Send>;

/// One human against one policy. Owns its board outright; sessions share
/// nothing.
pub struct Game {
    board: Board,
    history: Vec<PositionKey>,
    human: Color,
    policy: BoxedPolicy,
}

impl Game {
    pub fn new(human: Color, policy: BoxedPolicy) -> Self {
        Self::with_board(Board::new(), human, policy)
    }

    /// Starts from an arbitrary position. Earlier history is unknown, so
    /// repetition counting starts here.
    pub fn with_board(board: Board, human: Color, policy: BoxedPolicy) -> Self {
        Self {
            board,
            history: Vec::new(),
            human,
            policy,
        }
    }

    pub fn reset(&mut self) {
        info!("new game, human plays {}", self.human);
        self.board = Board::new();
        self.history.clear();
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn human_color(&self) -> Color {
        self.human
    }

    pub fn history(&self) -> &[PositionKey] {
        &self.history
    }

    pub fn is_human_turn(&self) -> bool {
        self.board.side_to_move() == self.human
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(&self.board)
    }

    pub fn legal_destinations(&self, from: Square) -> SquareSet {
        movegen::legal_destinations(&self.board, from)
    }

    pub fn status(&self) -> GameStatus {
        status::status(&self.board, &self.history)
    }

    pub fn is_over(&self) -> bool {
        self.status().is_over()
    }

    pub fn winner(&self) -> Option<Color> {
        self.status().winner()
    }

    /// Plays a move for whichever side is to move. On error nothing changes.
    pub fn make_move(&mut self, from: Square, to: Square, promotion: Option<PieceKind>) -> ChessResult<Move> {
        if self.is_over() {
            return Err(ChessError::GameOver);
        }
        let mv = self.board.find_move(from, to, promotion)?;
        self.push(mv)?;
        Ok(mv)
    }

    pub fn play_ai_move(&mut self) -> ChessResult<Move> {
        if self.is_over() {
            return Err(ChessError::NoLegalMoves);
        }
        let moves = self.legal_moves();
        let mv = self.policy.select(&self.board, &moves)?;
        self.push(mv)?;
        Ok(mv)
    }

    fn push(&mut self, mv: Move) -> ChessResult<()> {
        let next = self.board.apply(mv)?;
        let previous = std::mem::replace(&mut self.board, next);
        self.history.push(previous.position_key());
        debug!("after {}: {}", mv, self.board);
        Ok(())
    }
}

pub fn new_game() -> Board {
    Board::new()
}

pub fn legal_destinations(board: &Board, from: Square) -> SquareSet {
    movegen::legal_destinations(board, from)
}

/// Returns the board after the move; `board` itself is never modified.
pub fn make_move(board: &Board, from: Square, to: Square, promotion: Option<PieceKind>) -> ChessResult<Board> {
    let mv = board.find_move(from, to, promotion)?;
    board.apply(mv)
}

/// Status without game history, so repetition is never reported.
pub fn status(board: &Board) -> GameStatus {
    status::status(board, &[])
}

pub fn select_ai_move(board: &Board) -> ChessResult<Move> {
    let moves = movegen::legal_moves(board);
    RandomPolicy::new(rand::rng()).select(board, &moves)
}
