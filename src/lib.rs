//! Chess rules and game-state engine: board model, legal move generation,
//! move application with undo, terminal-state detection, and pluggable
//! move selection policies for the computer side.

pub mod bitboard;
pub mod board;
pub mod engine;
pub mod error;
pub mod fen;
pub mod game;
pub mod movegen;
pub mod moves;
pub mod square;
pub mod status;

pub use bitboard::SquareSet;
pub use board::{Board, CastleSide, CastlingRights, Undo};
pub use engine::{Engine, Evaluate, MaterialEvaluator, MovePolicy, RandomPolicy};
pub use error::{ChessError, ChessResult, FenField};
pub use game::{legal_destinations, make_move, new_game, select_ai_move, status, Game};
pub use movegen::{legal_moves, perft};
pub use moves::Move;
pub use square::{Color, Piece, PieceKind, Square};
pub use status::{GameStatus, PositionKey};
