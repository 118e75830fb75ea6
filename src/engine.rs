use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::Board;
use crate::error::{ChessError, ChessResult};
use crate::movegen;
use crate::moves::Move;
use crate::square::{Color, PieceKind};
use crate::status;

/// Chooses a move for the side to move from its legal moves.
pub trait MovePolicy {
    fn select(&mut self, board: &Board, legal_moves: &[Move]) -> ChessResult<Move>;
}

impl<P: MovePolicy + ?Sized> MovePolicy for Box<P> {
    fn select(&mut self, board: &Board, legal_moves: &[Move]) -> ChessResult<Move> {
        (**self).select(board, legal_moves)
    }
}

pub struct RandomPolicy<R = StdRng> {
    rng: R,
}

impl RandomPolicy<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> MovePolicy for RandomPolicy<R> {
    fn select(&mut self, _board: &Board, legal_moves: &[Move]) -> ChessResult<Move> {
        if legal_moves.is_empty() {
            return Err(ChessError::NoLegalMoves);
        }
        // sort first so a given seed picks the same move however the set was built
        let mut candidates = legal_moves.to_vec();
        candidates.sort();
        let selected = candidates[self.rng.random_range(0..candidates.len())];
        debug!("random policy picked {} of {} moves", selected, candidates.len());
        Ok(selected)
    }
}

/// Static evaluation in centipawns from the side to move's point of view.
pub trait Evaluate {
    fn evaluate(&self, board: &Board) -> i32;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialEvaluator;

impl MaterialEvaluator {
    pub fn piece_value(kind: PieceKind) -> i32 {
        match kind {
            PieceKind::Pawn => 100,
            PieceKind::Knight => 320,
            PieceKind::Bishop => 330,
            PieceKind::Rook => 500,
            PieceKind::Queen => 900,
            PieceKind::King => 0,
        }
    }
}

impl Evaluate for MaterialEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        let white: i32 = board.pieces()
            .map(|(_, piece)| match piece.color {
                Color::White => Self::piece_value(piece.kind),
                Color::Black => -Self::piece_value(piece.kind),
            })
            .sum();
        match board.side_to_move() {
            Color::White => white,
            Color::Black => -white,
        }
    }
}

const MATE: i32 = 1_000_000;

/// Evaluation-based policy: fixed-depth negamax over a pluggable static
/// evaluation, deepened one ply at a time until `max_depth`, the
/// deadline, or the cancel flag stops it.
pub struct Engine<E = MaterialEvaluator> {
    evaluator: E,
    max_depth: u32,
    max_time: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Engine<MaterialEvaluator> {
    pub fn new(max_depth: u32) -> Self {
        Self::with_evaluator(MaterialEvaluator, max_depth)
    }
}

impl<E: Evaluate> Engine<E> {
    pub fn with_evaluator(evaluator: E, max_depth: u32) -> Self {
        Self {
            evaluator,
            max_depth: max_depth.max(1),
            max_time: None,
            cancel: None,
        }
    }

    pub fn with_time_limit(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn eval(&self, board: &Board) -> i32 {
        self.evaluator.evaluate(board)
    }

    /// Best move among `legal_moves`, or `None` if none of them is legal on
    /// `board`. Ties go to the first move in canonical order.
    pub fn best_move(&self, board: &Board, legal_moves: &[Move]) -> Option<Move> {
        // only moves generated for this board are safe to make unchecked
        let generated = movegen::legal_moves(board);
        let mut candidates: Vec<Move> = legal_moves
            .iter()
            .copied()
            .filter(|mv| generated.contains(mv))
            .collect();
        candidates.sort();
        let mut best = *candidates.first()?;
        let deadline = self.max_time.map(|limit| Instant::now() + limit);
        let mut scratch = board.clone();

        for depth in 1..=self.max_depth {
            let mut depth_best: Option<(Move, i32)> = None;
            for &mv in &candidates {
                let undo = scratch.make(mv);
                let score = self.negamax(&mut scratch, depth - 1, 1, deadline).map(|s| -s);
                scratch.undo(undo);
                let Some(score) = score else {
                    // out of time: a partial first iteration still beats nothing
                    if depth == 1 {
                        if let Some((mv, _)) = depth_best {
                            best = mv;
                        }
                    }
                    debug!("search stopped during depth {depth}, playing {best}");
                    return Some(best);
                };
                if depth_best.map_or(true, |(_, best_score)| score > best_score) {
                    depth_best = Some((mv, score));
                }
            }
            if let Some((mv, score)) = depth_best {
                trace!("depth {depth}: {mv} scores {score}");
                best = mv;
                if score >= MATE - depth as i32 {
                    break;
                }
            }
        }
        Some(best)
    }

    fn should_stop(&self, deadline: Option<Instant>) -> bool {
        deadline.is_some_and(|d| Instant::now() >= d)
            || self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Score of `board` for its side to move, or `None` when stopped.
    fn negamax(&self, board: &mut Board, depth: u32, ply: u32, deadline: Option<Instant>) -> Option<i32> {
        if self.should_stop(deadline) {
            return None;
        }
        let moves = movegen::legal_moves(board);
        if moves.is_empty() {
            let side = board.side_to_move();
            return Some(if board.is_in_check(side) { -(MATE - ply as i32) } else { 0 });
        }
        if status::is_insufficient_material(board) || board.halfmove_clock() >= status::FIFTY_MOVE_LIMIT {
            return Some(0);
        }
        if depth == 0 {
            return Some(self.eval(board));
        }
        let mut best = i32::MIN;
        for mv in moves {
            let undo = board.make(mv);
            let score = self.negamax(board, depth - 1, ply + 1, deadline);
            board.undo(undo);
            best = best.max(-score?);
        }
        Some(best)
    }
}

impl<E: Evaluate> MovePolicy for Engine<E> {
    fn select(&mut self, board: &Board, legal_moves: &[Move]) -> ChessResult<Move> {
        let selected = self.best_move(board, legal_moves).ok_or(ChessError::NoLegalMoves)?;
        debug!("engine picked {selected}");
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    #[test]
    fn random_policy_fails_without_moves() {
        let mut policy = RandomPolicy::seeded(7);
        assert_eq!(policy.select(&Board::new(), &[]), Err(ChessError::NoLegalMoves));
    }

    #[test]
    fn random_policy_reaches_every_move() {
        // a lone king in the corner has exactly three moves
        let board = board("7k/8/8/8/8/8/8/K7 w - - 0 1");
        let three = movegen::legal_moves(&board);
        assert_eq!(three.len(), 3);

        let mut policy = RandomPolicy::seeded(42);
        let mut counts: HashMap<Move, usize> = HashMap::new();
        for _ in 0..10_000 {
            let mv = policy.select(&board, &three).unwrap();
            *counts.entry(mv).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        for (mv, count) in counts {
            assert!(count > 2_500, "{mv} picked only {count} times");
        }
    }

    #[test]
    fn same_seed_same_choice_regardless_of_order() {
        let board = Board::new();
        let moves = movegen::legal_moves(&board);
        let mut reversed = moves.clone();
        reversed.reverse();
        let a = RandomPolicy::seeded(3).select(&board, &moves).unwrap();
        let b = RandomPolicy::seeded(3).select(&board, &reversed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn material_is_relative_to_the_mover() {
        let up_a_rook = board("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        assert_eq!(MaterialEvaluator.evaluate(&up_a_rook), 500);
        let black_to_move = board("4k3/8/8/8/8/8/8/R3K3 b - - 0 1");
        assert_eq!(MaterialEvaluator.evaluate(&black_to_move), -500);
        assert_eq!(MaterialEvaluator.evaluate(&Board::new()), 0);
    }

    #[test]
    fn engine_takes_a_free_queen() {
        let board = board("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1");
        let moves = movegen::legal_moves(&board);
        let best = Engine::new(1).best_move(&board, &moves).unwrap();
        assert_eq!(best.to_string(), "d2d5");
    }

    #[test]
    fn engine_finds_mate_in_one() {
        let board = board("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        let mut engine = Engine::new(2);
        let moves = movegen::legal_moves(&board);
        assert_eq!(engine.select(&board, &moves).unwrap().to_string(), "a1a8");
    }

    #[test]
    fn engine_avoids_a_defended_pawn_at_depth_two() {
        // Qxd5 wins a pawn but loses the queen to exd5
        let board = board("4k3/8/4p3/3p4/8/8/8/3QK3 w - - 0 1");
        let moves = movegen::legal_moves(&board);
        let best = Engine::new(2).best_move(&board, &moves).unwrap();
        assert_ne!(best.to_string(), "d1d5");
    }

    #[test]
    fn cancelled_engine_still_returns_a_legal_move() {
        let flag = Arc::new(AtomicBool::new(true));
        let board = Board::new();
        let moves = movegen::legal_moves(&board);
        let mut engine = Engine::new(4).with_cancel_flag(flag);
        let mv = engine.select(&board, &moves).unwrap();
        assert!(moves.contains(&mv));
    }

    #[test]
    fn zero_time_budget_still_returns_a_legal_move() {
        let board = Board::new();
        let moves = movegen::legal_moves(&board);
        let mut engine = Engine::new(6).with_time_limit(Duration::ZERO);
        let mv = engine.select(&board, &moves).unwrap();
        assert!(moves.contains(&mv));
    }

    #[test]
    fn engine_ignores_moves_from_another_board() {
        let bare_kings = board("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
        let stale = movegen::legal_moves(&Board::new());
        let mut engine = Engine::new(1);
        assert_eq!(engine.select(&bare_kings, &stale), Err(ChessError::NoLegalMoves));

        // a mixed list keeps only the moves that belong to the board
        let mut mixed = stale.clone();
        let king_step = movegen::legal_moves(&bare_kings)[0];
        mixed.push(king_step);
        assert_eq!(engine.select(&bare_kings, &mixed), Ok(king_step));
    }

    #[test]
    fn engine_fails_without_moves() {
        let mut engine = Engine::new(1);
        assert_eq!(engine.select(&Board::new(), &[]), Err(ChessError::NoLegalMoves));
    }
}
