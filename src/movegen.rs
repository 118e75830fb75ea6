//! Legal move generation.
//!
//! Moves are generated pseudo-legally per piece, then each one is made on a
//! scratch copy of the board and kept only if the mover's king is not
//! attacked afterwards. Castling additionally requires the king to be out
//! of check and not to pass through an attacked square.

use crate::bitboard::{king_attacks, knight_attacks, SquareBits, SquareSet, BISHOP_DIRECTIONS, ROOK_DIRECTIONS};
use crate::board::{Board, CastleSide};
use crate::moves::Move;
use crate::square::{Color, Piece, PieceKind, Square};

pub fn legal_moves(board: &Board) -> Vec<Move> {
    filter_legal(board, pseudo_legal_moves(board))
}

/// Legal moves of the piece on `from`. Empty when the square is empty or
/// holds a piece of the side not to move.
pub fn legal_moves_from(board: &Board, from: Square) -> Vec<Move> {
    let mut moves = Vec::new();
    if let Some(piece) = board.piece_at(from) {
        if piece.color == board.side_to_move() {
            piece_moves(board, from, piece, &mut moves);
        }
    }
    filter_legal(board, moves)
}

pub fn legal_destinations(board: &Board, from: Square) -> SquareSet {
    legal_moves_from(board, from).into_iter().map(|mv| mv.to).collect()
}

/// Cheaper than `!legal_moves(board).is_empty()`: stops at the first hit.
pub fn has_legal_move(board: &Board) -> bool {
    let mut scratch = board.clone();
    let mover = board.side_to_move();
    pseudo_legal_moves(board).into_iter().any(|mv| leaves_king_safe(&mut scratch, mv, mover))
}

pub fn pseudo_legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    let side = board.side_to_move();
    for (from, piece) in board.pieces() {
        if piece.color == side {
            piece_moves(board, from, piece, &mut moves);
        }
    }
    moves
}

/// Number of leaf nodes of the legal move tree at `depth`.
pub fn perft(board: &Board, depth: u32) -> u64 {
    let mut scratch = board.clone();
    perft_inner(&mut scratch, depth)
}

fn perft_inner(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(board);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for mv in moves {
        let undo = board.make(mv);
        nodes += perft_inner(board, depth - 1);
        board.undo(undo);
    }
    nodes
}

fn filter_legal(board: &Board, moves: Vec<Move>) -> Vec<Move> {
    let mut scratch = board.clone();
    let mover = board.side_to_move();
    moves.into_iter().filter(|mv| leaves_king_safe(&mut scratch, *mv, mover)).collect()
}

fn leaves_king_safe(scratch: &mut Board, mv: Move, mover: Color) -> bool {
    let undo = scratch.make(mv);
    let safe = !scratch.is_in_check(mover);
    scratch.undo(undo);
    safe
}

fn piece_moves(board: &Board, from: Square, piece: Piece, moves: &mut Vec<Move>) {
    match piece.kind {
        PieceKind::Pawn => pawn_moves(board, from, piece.color, moves),
        PieceKind::Knight => {
            for to in knight_attacks(from).iter_squares() {
                push_if_not_own(board, from, to, piece.color, moves);
            }
        }
        PieceKind::Bishop => slide(board, from, piece.color, &BISHOP_DIRECTIONS, moves),
        PieceKind::Rook => slide(board, from, piece.color, &ROOK_DIRECTIONS, moves),
        PieceKind::Queen => {
            slide(board, from, piece.color, &ROOK_DIRECTIONS, moves);
            slide(board, from, piece.color, &BISHOP_DIRECTIONS, moves);
        }
        PieceKind::King => {
            for to in king_attacks(from).iter_squares() {
                push_if_not_own(board, from, to, piece.color, moves);
            }
            castling_moves(board, from, piece.color, moves);
        }
    }
}

fn push_if_not_own(board: &Board, from: Square, to: Square, color: Color, moves: &mut Vec<Move>) {
    if board.piece_at(to).map_or(true, |target| target.color != color) {
        moves.push(Move::quiet(from, to));
    }
}

fn slide(board: &Board, from: Square, color: Color, directions: &[(i8, i8)], moves: &mut Vec<Move>) {
    for &(df, dr) in directions {
        let mut cur = from.offset(df, dr);
        while let Some(to) = cur {
            match board.piece_at(to) {
                None => moves.push(Move::quiet(from, to)),
                Some(target) => {
                    if target.color != color {
                        moves.push(Move::quiet(from, to));
                    }
                    break;
                }
            }
            cur = to.offset(df, dr);
        }
    }
}

fn push_pawn_move(from: Square, to: Square, color: Color, moves: &mut Vec<Move>) {
    if to.rank() == color.promotion_rank() {
        for kind in PieceKind::PROMOTIONS {
            moves.push(Move::promote(from, to, kind));
        }
    } else {
        moves.push(Move::quiet(from, to));
    }
}

fn pawn_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let forward = color.forward();

    if let Some(one) = from.offset(0, forward) {
        if board.piece_at(one).is_none() {
            push_pawn_move(from, one, color, moves);
            if from.rank() == color.pawn_rank() {
                if let Some(two) = one.offset(0, forward) {
                    if board.piece_at(two).is_none() {
                        moves.push(Move::quiet(from, two));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = from.offset(df, forward) else { continue };
        match board.piece_at(to) {
            Some(target) if target.color != color => push_pawn_move(from, to, color, moves),
            Some(_) => {}
            None if board.en_passant() == Some(to) => {
                // the passed pawn stands beside us, not on the target square
                let passed = Square::new(to.file(), from.rank());
                let enemy_pawn = Piece::new(PieceKind::Pawn, color.opposite());
                if passed.and_then(|sq| board.piece_at(sq)) == Some(enemy_pawn) {
                    moves.push(Move::en_passant(from, to));
                }
            }
            None => {}
        }
    }
}

fn castling_moves(board: &Board, from: Square, color: Color, moves: &mut Vec<Move>) {
    let rank = color.back_rank();
    if from != home_king_square(color) || board.is_in_check(color) {
        return;
    }
    let enemy = color.opposite();
    let rook = Piece::new(PieceKind::Rook, color);

    for side in CastleSide::BOTH {
        if !board.castling_rights().has(color, side) {
            continue;
        }
        let rook_square = Square::new(side.rook_from_file(), rank);
        if rook_square.and_then(|sq| board.piece_at(sq)) != Some(rook) {
            continue;
        }
        // every square strictly between king and rook must be empty
        let (lo, hi) = if side.rook_from_file() > from.file() {
            (from.file() + 1, side.rook_from_file())
        } else {
            (side.rook_from_file() + 1, from.file())
        };
        let path_clear = (lo..hi)
            .filter_map(|file| Square::new(file, rank))
            .all(|sq| board.piece_at(sq).is_none());
        if !path_clear {
            continue;
        }
        // the king may not cross or land on an attacked square
        let step: i8 = if side == CastleSide::KingSide { 1 } else { -1 };
        let crossing = from.offset(step, 0);
        let landing = Square::new(side.king_to_file(), rank);
        let (Some(crossing), Some(landing)) = (crossing, landing) else { continue };
        if board.is_square_attacked(crossing, enemy) || board.is_square_attacked(landing, enemy) {
            continue;
        }
        moves.push(Move::castle(from, landing));
    }
}

fn home_king_square(color: Color) -> Square {
    match color {
        Color::White => Square::E1,
        Color::Black => Square::E8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    fn names(moves: &[Move]) -> Vec<String> {
        let mut names: Vec<String> = moves.iter().map(|m| m.to_string()).collect();
        names.sort();
        names
    }

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn twenty_moves_from_the_start() {
        assert_eq!(legal_moves(&Board::new()).len(), 20);
    }

    #[test]
    fn all_four_promotions_are_distinct_moves() {
        let board = board("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
        let promotions: Vec<Move> = legal_moves(&board).into_iter().filter(|m| m.from == sq("b7")).collect();
        assert_eq!(names(&promotions), vec!["b7b8b", "b7b8n", "b7b8q", "b7b8r"]);
    }

    #[test]
    fn pinned_piece_cannot_leave_the_line() {
        // the e2 knight is pinned against the king by the e8 rook
        let board = board("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1");
        assert!(legal_moves_from(&board, sq("e2")).is_empty());
    }

    #[test]
    fn check_must_be_answered() {
        let board = board("4k3/8/8/8/8/8/3q4/4K3 w - - 0 1");
        // d1, e2 and f2 are covered by the queen; f1 is not
        assert_eq!(names(&legal_moves(&board)), vec!["e1d2", "e1f1"]);
    }

    #[test]
    fn castling_needs_a_safe_path() {
        let open = board("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let kinds: Vec<String> = names(&legal_moves_from(&open, Square::E1));
        assert!(kinds.contains(&"e1g1".to_string()));
        assert!(kinds.contains(&"e1c1".to_string()));

        // f1 attacked by the bishop on c4: no kingside castling
        let through = board("4k3/8/8/8/2b5/8/8/R3K2R w KQ - 0 1");
        let kinds = names(&legal_moves_from(&through, Square::E1));
        assert!(!kinds.contains(&"e1g1".to_string()));
        assert!(kinds.contains(&"e1c1".to_string()));

        // king in check: neither side
        let checked = board("4k3/8/8/8/8/8/8/R3K1rR w KQ - 0 1");
        let castles: Vec<Move> = legal_moves_from(&checked, Square::E1).into_iter().filter(|m| m.is_castle).collect();
        assert!(castles.is_empty());

        // b1 may be attacked, only the king's path matters
        let b1_attacked = board("1r2k3/8/8/8/8/8/8/R3K3 w Q - 0 1");
        assert!(names(&legal_moves_from(&b1_attacked, Square::E1)).contains(&"e1c1".to_string()));

        // but b1 must still be empty
        let b1_blocked = board("4k3/8/8/8/8/8/8/RN2K3 w Q - 0 1");
        assert!(!names(&legal_moves_from(&b1_blocked, Square::E1)).contains(&"e1c1".to_string()));
    }

    #[test]
    fn castling_requires_the_right() {
        let board = board("4k3/8/8/8/8/8/8/R3K2R w - - 0 1");
        assert!(legal_moves_from(&board, Square::E1).iter().all(|m| !m.is_castle));
    }

    #[test]
    fn en_passant_that_exposes_the_king_is_illegal() {
        // capturing d5 would open the fifth rank to the h5 rook
        let board = board("8/8/8/K2pP2r/8/8/8/4k3 w - d6 0 2");
        assert!(legal_moves_from(&board, sq("e5")).iter().all(|m| !m.is_en_passant));
    }

    #[test]
    fn en_passant_only_right_after_the_double_step() {
        let with = board("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2");
        assert!(legal_moves_from(&with, sq("e5")).iter().any(|m| m.is_en_passant));
        let without = board("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 2");
        assert!(legal_moves_from(&without, sq("e5")).iter().all(|m| !m.is_en_passant));
    }

    #[test]
    fn destinations_of_a_knight() {
        let dests = legal_destinations(&Board::new(), Square::G1);
        let mut names: Vec<String> = dests.iter().map(|s| s.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["f3", "h3"]);
        assert!(legal_destinations(&Board::new(), Square::G8).is_empty());
        assert!(legal_destinations(&Board::new(), sq("e4")).is_empty());
    }

    #[test]
    fn no_legal_move_leaves_own_king_attacked() {
        let positions = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        ];
        for fen in positions {
            let board = board(fen);
            let mover = board.side_to_move();
            for mv in legal_moves(&board) {
                let after = board.apply(mv).unwrap();
                assert!(!after.is_in_check(mover), "{mv} leaves the king attacked in {fen}");
            }
        }
    }

    #[test]
    fn has_legal_move_agrees_with_generation() {
        let mate = board("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1");
        assert!(!has_legal_move(&mate));
        assert!(has_legal_move(&Board::new()));
    }
}
