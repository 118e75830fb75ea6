use log::debug;

use crate::bitboard::{king_attacks, knight_attacks, SquareBits, BISHOP_DIRECTIONS, ROOK_DIRECTIONS};
use crate::error::{ChessError, ChessResult};
use crate::movegen;
use crate::moves::Move;
use crate::square::{Color, Piece, PieceKind, Square};
use crate::status::PositionKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    pub const BOTH: [CastleSide; 2] = [CastleSide::KingSide, CastleSide::QueenSide];

    pub fn king_to_file(self) -> u8 {
        match self {
            CastleSide::KingSide => 6,
            CastleSide::QueenSide => 2,
        }
    }

    pub fn rook_from_file(self) -> u8 {
        match self {
            CastleSide::KingSide => 7,
            CastleSide::QueenSide => 0,
        }
    }

    pub fn rook_to_file(self) -> u8 {
        match self {
            CastleSide::KingSide => 5,
            CastleSide::QueenSide => 3,
        }
    }
}

/// The four castling flags. A flag only ever goes from true to false
/// during play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights {
        white_kingside: false,
        white_queenside: false,
        black_kingside: false,
        black_queenside: false,
    };
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::KingSide) => self.white_kingside,
            (Color::White, CastleSide::QueenSide) => self.white_queenside,
            (Color::Black, CastleSide::KingSide) => self.black_kingside,
            (Color::Black, CastleSide::QueenSide) => self.black_queenside,
        }
    }

    pub fn set(&mut self, color: Color, side: CastleSide, value: bool) {
        let flag = match (color, side) {
            (Color::White, CastleSide::KingSide) => &mut self.white_kingside,
            (Color::White, CastleSide::QueenSide) => &mut self.white_queenside,
            (Color::Black, CastleSide::KingSide) => &mut self.black_kingside,
            (Color::Black, CastleSide::QueenSide) => &mut self.black_queenside,
        };
        *flag = value;
    }

    pub fn clear_color(&mut self, color: Color) {
        for side in CastleSide::BOTH {
            self.set(color, side, false);
        }
    }

    /// Drops whichever right depends on a piece standing on `square`.
    /// Called for both the origin and destination of every move, which
    /// covers rooks moving away and rooks being captured at home.
    fn touch(&mut self, square: Square) {
        match square {
            Square::A1 => self.white_queenside = false,
            Square::H1 => self.white_kingside = false,
            Square::E1 => self.clear_color(Color::White),
            Square::A8 => self.black_queenside = false,
            Square::H8 => self.black_kingside = false,
            Square::E8 => self.clear_color(Color::Black),
            _ => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Undo {
    mv: Move,
    moved: Piece,
    captured: Option<(Square, Piece)>,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    pub(crate) squares: [Option<Piece>; 64],
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Board {
    pub fn new() -> Self {
        let mut board = Self::empty();
        for color in [Color::White, Color::Black] {
            for (file, kind) in BACK_RANK.iter().enumerate() {
                board.squares[(color.back_rank() * 8) as usize + file] = Some(Piece::new(*kind, color));
                board.squares[(color.pawn_rank() * 8) as usize + file] = Some(Piece::new(PieceKind::Pawn, color));
            }
        }
        board.castling = CastlingRights::ALL;
        board
    }

    pub(crate) fn empty() -> Self {
        Self {
            squares: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|piece| (sq, piece)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, piece)| *piece == Piece::new(PieceKind::King, color))
            .map(|(sq, _)| sq)
    }

    /// True iff any piece of `by` attacks `square`. Pawns attack
    /// diagonally forward only. Own-king safety of the attacker plays no
    /// part, so this is safe to call from check detection.
    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        let is = |sq: Square, kind: PieceKind| self.piece_at(sq) == Some(Piece::new(kind, by));

        // an attacking pawn sits one rank behind the target, from its own point of view
        for df in [-1, 1] {
            if let Some(sq) = square.offset(df, -by.forward()) {
                if is(sq, PieceKind::Pawn) {
                    return true;
                }
            }
        }
        if knight_attacks(square).iter_squares().any(|sq| is(sq, PieceKind::Knight)) {
            return true;
        }
        if king_attacks(square).iter_squares().any(|sq| is(sq, PieceKind::King)) {
            return true;
        }
        let sliders = [
            (ROOK_DIRECTIONS, PieceKind::Rook),
            (BISHOP_DIRECTIONS, PieceKind::Bishop),
        ];
        for (directions, kind) in sliders {
            for (df, dr) in directions {
                if let Some(blocker) = self.first_piece_on_ray(square, df, dr) {
                    if blocker.color == by && (blocker.kind == kind || blocker.kind == PieceKind::Queen) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn first_piece_on_ray(&self, from: Square, df: i8, dr: i8) -> Option<Piece> {
        let mut cur = from.offset(df, dr);
        while let Some(sq) = cur {
            if let Some(piece) = self.piece_at(sq) {
                return Some(piece);
            }
            cur = sq.offset(df, dr);
        }
        None
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .is_some_and(|king| self.is_square_attacked(king, color.opposite()))
    }

    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            squares: self.squares,
            side_to_move: self.side_to_move,
            castling: self.castling,
            en_passant: self.en_passant,
        }
    }

    /// Finds the legal move matching a bare request (e.g. parsed from
    /// coordinate notation or mouse input). Promotions default to a queen.
    pub fn find_move(&self, from: Square, to: Square, promotion: Option<PieceKind>) -> ChessResult<Move> {
        let wanted = match promotion {
            Some(kind) => Some(kind),
            None if self.is_promotion_request(from, to) => Some(PieceKind::Queen),
            None => None,
        };
        movegen::legal_moves_from(self, from)
            .into_iter()
            .find(|mv| mv.matches(from, to, wanted))
            .ok_or(ChessError::IllegalMove { from, to, promotion })
    }

    fn is_promotion_request(&self, from: Square, to: Square) -> bool {
        self.piece_at(from).is_some_and(|piece| {
            piece.kind == PieceKind::Pawn && to.rank() == piece.color.promotion_rank()
        })
    }

    /// Applies a move and returns the resulting board. The move must be
    /// one of `legal_moves(self)`; anything else is rejected and `self`
    /// is left as it was.
    pub fn apply(&self, mv: Move) -> ChessResult<Board> {
        let mut board = self.clone();
        board.apply_in_place(mv)?;
        Ok(board)
    }

    pub fn apply_in_place(&mut self, mv: Move) -> ChessResult<Undo> {
        if !movegen::legal_moves_from(self, mv.from).contains(&mv) {
            return Err(ChessError::IllegalMove { from: mv.from, to: mv.to, promotion: mv.promotion });
        }
        debug!("{} plays {}", self.side_to_move, mv);
        Ok(self.make(mv))
    }

    /// Applies a generated move without re-validating it.
    pub(crate) fn make(&mut self, mv: Move) -> Undo {
        let side = self.side_to_move;
        let captured_square = if mv.is_en_passant {
            Square::new(mv.to.file(), mv.from.rank()).unwrap_or(mv.to)
        } else {
            mv.to
        };
        debug_assert!(self.piece_at(mv.from).is_some(), "{mv} moves from an empty square");
        let moved = self.squares[mv.from.index()]
            .unwrap_or(Piece::new(PieceKind::Pawn, side));
        let undo = Undo {
            mv,
            moved,
            captured: self.piece_at(captured_square).map(|piece| (captured_square, piece)),
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };

        self.squares[mv.from.index()] = None;
        self.squares[captured_square.index()] = None;
        let placed = match mv.promotion {
            Some(kind) => Piece::new(kind, side),
            None => moved,
        };
        self.squares[mv.to.index()] = Some(placed);

        if mv.is_castle {
            let (rook_from, rook_to) = castle_rook_squares(mv);
            let rook = self.squares[rook_from.index()].take();
            self.squares[rook_to.index()] = rook;
        }

        self.castling.touch(mv.from);
        self.castling.touch(mv.to);

        self.en_passant = None;
        if moved.kind == PieceKind::Pawn && mv.from.rank().abs_diff(mv.to.rank()) == 2 {
            self.en_passant = Square::new(mv.from.file(), (mv.from.rank() + mv.to.rank()) / 2);
        }

        if moved.kind == PieceKind::Pawn || undo.captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if side == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = side.opposite();
        undo
    }

    /// Restores the position from before the move recorded in `undo`.
    /// The token must come from the most recent apply on this board.
    pub fn undo(&mut self, undo: Undo) {
        let mv = undo.mv;
        self.squares[mv.to.index()] = None;
        self.squares[mv.from.index()] = Some(undo.moved);
        if let Some((square, piece)) = undo.captured {
            self.squares[square.index()] = Some(piece);
        }
        if mv.is_castle {
            let (rook_from, rook_to) = castle_rook_squares(mv);
            let rook = self.squares[rook_to.index()].take();
            self.squares[rook_from.index()] = rook;
        }
        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;
        self.side_to_move = undo.moved.color;
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn castle_rook_squares(mv: Move) -> (Square, Square) {
    let side = if mv.to.file() > mv.from.file() { CastleSide::KingSide } else { CastleSide::QueenSide };
    let rank = mv.from.rank();
    (
        Square::new(side.rook_from_file(), rank).unwrap_or(mv.to),
        Square::new(side.rook_to_file(), rank).unwrap_or(mv.to),
    )
}
