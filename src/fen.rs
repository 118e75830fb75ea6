use std::fmt;
use std::str::FromStr;

use crate::board::{Board, CastleSide, CastlingRights};
use crate::error::{ChessError, ChessResult, FenField};
use crate::square::{Color, Piece, PieceKind, Square};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Parses a FEN record. The halfmove clock and fullmove number may be
    /// omitted and default to 0 and 1.
    pub fn from_fen(fen: &str) -> ChessResult<Board> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(ChessError::malformed(
                FenField::Record,
                format!("expected 4 to 6 fields, found {}", fields.len()),
            ));
        }

        let mut board = Board::empty();
        parse_placement(&mut board, fields[0])?;
        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(ChessError::malformed(FenField::SideToMove, format!("expected 'w' or 'b', found {other:?}"))),
        };
        board.castling = parse_castling(fields[2])?;
        board.en_passant = match fields[3] {
            "-" => None,
            text => Some(text.parse().map_err(|_| {
                ChessError::malformed(FenField::EnPassant, format!("not a square: {text:?}"))
            })?),
        };
        board.halfmove_clock = match fields.get(4) {
            Some(text) => parse_counter(text, FenField::HalfmoveClock)?,
            None => 0,
        };
        board.fullmove_number = match fields.get(5) {
            Some(text) => match parse_counter(text, FenField::FullmoveNumber)? {
                0 => return Err(ChessError::malformed(FenField::FullmoveNumber, "must be at least 1")),
                n => n,
            },
            None => 1,
        };

        validate(&board)?;
        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match Square::new(file, rank).and_then(|sq| self.piece_at(sq)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.symbol());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        let rights = [
            (self.castling.white_kingside, 'K'),
            (self.castling.white_queenside, 'Q'),
            (self.castling.black_kingside, 'k'),
            (self.castling.black_queenside, 'q'),
        ];
        let start = fen.len();
        for (held, c) in rights {
            if held {
                fen.push(c);
            }
        }
        if fen.len() == start {
            fen.push('-');
        }

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }
}

impl FromStr for Board {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

fn parse_placement(board: &mut Board, text: &str) -> ChessResult<()> {
    let malformed = |message: String| ChessError::malformed(FenField::Placement, message);
    let ranks: Vec<&str> = text.split('/').collect();
    if ranks.len() != 8 {
        return Err(malformed(format!("expected 8 ranks, found {}", ranks.len())));
    }
    // FEN lists rank 8 first
    for (row, rank_text) in ranks.iter().enumerate() {
        let rank = 7 - row as u8;
        let mut file: u8 = 0;
        for c in rank_text.chars() {
            if let Some(skip) = c.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(malformed(format!("bad empty-square count {c:?} on rank {}", rank + 1)));
                }
                file += skip as u8;
            } else {
                let piece = Piece::from_symbol(c)
                    .ok_or_else(|| malformed(format!("unknown piece letter {c:?}")))?;
                let square = Square::new(file, rank)
                    .ok_or_else(|| malformed(format!("rank {} is longer than 8 files", rank + 1)))?;
                board.squares[square.index()] = Some(piece);
                file += 1;
            }
            if file > 8 {
                return Err(malformed(format!("rank {} is longer than 8 files", rank + 1)));
            }
        }
        if file != 8 {
            return Err(malformed(format!("rank {} has {} files", rank + 1, file)));
        }
    }
    Ok(())
}

// plain decimal digits only; `u32::from_str` would also take a leading '+'
fn parse_counter(text: &str, field: FenField) -> ChessResult<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChessError::malformed(field, format!("not a number: {text:?}")));
    }
    text.parse()
        .map_err(|_| ChessError::malformed(field, format!("out of range: {text:?}")))
}

fn parse_castling(text: &str) -> ChessResult<CastlingRights> {
    let mut rights = CastlingRights::NONE;
    if text == "-" {
        return Ok(rights);
    }
    for c in text.chars() {
        let (color, side) = match c {
            'K' => (Color::White, CastleSide::KingSide),
            'Q' => (Color::White, CastleSide::QueenSide),
            'k' => (Color::Black, CastleSide::KingSide),
            'q' => (Color::Black, CastleSide::QueenSide),
            _ => return Err(ChessError::malformed(FenField::Castling, format!("unexpected {c:?} in {text:?}"))),
        };
        if rights.has(color, side) {
            return Err(ChessError::malformed(FenField::Castling, format!("{c:?} repeated in {text:?}")));
        }
        rights.set(color, side, true);
    }
    Ok(rights)
}

/// Rejects records that cannot arise in play.
fn validate(board: &Board) -> ChessResult<()> {
    for color in [Color::White, Color::Black] {
        let kings = board
            .pieces()
            .filter(|(_, piece)| *piece == Piece::new(PieceKind::King, color))
            .count();
        if kings != 1 {
            return Err(ChessError::malformed(FenField::Placement, format!("{color} has {kings} kings")));
        }
    }
    if let Some((square, _)) = board
        .pieces()
        .find(|(sq, piece)| piece.kind == PieceKind::Pawn && (sq.rank() == 0 || sq.rank() == 7))
    {
        return Err(ChessError::malformed(FenField::Placement, format!("pawn on {square}")));
    }

    for color in [Color::White, Color::Black] {
        let rank = color.back_rank();
        for side in CastleSide::BOTH {
            if !board.castling.has(color, side) {
                continue;
            }
            let king_home = Square::new(4, rank).and_then(|sq| board.piece_at(sq)) == Some(Piece::new(PieceKind::King, color));
            let rook_home = Square::new(side.rook_from_file(), rank).and_then(|sq| board.piece_at(sq)) == Some(Piece::new(PieceKind::Rook, color));
            if !king_home || !rook_home {
                return Err(ChessError::malformed(
                    FenField::Castling,
                    format!("{color} cannot castle {side:?}: king or rook has left home"),
                ));
            }
        }
    }

    if let Some(target) = board.en_passant {
        let mover = board.side_to_move;
        // the target is behind a pawn of the side not to move
        let expected_rank = match mover {
            Color::White => 5,
            Color::Black => 2,
        };
        let passed = target.offset(0, -mover.forward());
        let passed_ok = passed.and_then(|sq| board.piece_at(sq)) == Some(Piece::new(PieceKind::Pawn, mover.opposite()));
        if target.rank() != expected_rank || board.piece_at(target).is_some() || !passed_ok {
            return Err(ChessError::malformed(FenField::EnPassant, format!("{target} is not behind a pawn that just advanced two squares")));
        }
    }

    if board.is_in_check(board.side_to_move.opposite()) {
        return Err(ChessError::malformed(FenField::Placement, "the side not to move is in check"));
    }
    Ok(())
}
