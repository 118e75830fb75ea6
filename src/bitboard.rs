use std::fmt;

use bitvec::{prelude::*, slice::IterOnes};
use lazy_static::lazy_static;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::square::Square;

const B: usize = 64;
pub type BitBoard = BitArr!(for B, in u64, Lsb0);
// bit index is the square index: a1 = 0, h1 = 7, a8 = 56, h8 = 63

pub trait SquareBits {
    fn empty() -> Self;
    fn set_square(&mut self, square: Square, value: bool);
    fn has_square(&self, square: Square) -> bool;
    type IterSquares<'a>: Iterator<Item=Square> + 'a where Self: 'a;
    fn iter_squares(&'_ self) -> Self::IterSquares<'_>;
}

impl SquareBits for BitBoard {
    fn empty() -> Self {
        bitarr!(u64, Lsb0; 0; B)
    }

    fn set_square(&mut self, square: Square, value: bool) {
        self.set(square.index(), value);
    }

    fn has_square(&self, square: Square) -> bool {
        self.as_bitslice()[square.index()]
    }

    type IterSquares<'a> = std::iter::FilterMap<IterOnes<'a, u64, Lsb0>, fn(usize) -> Option<Square>>;

    fn iter_squares(&'_ self) -> Self::IterSquares<'_> {
        self.iter_ones().filter_map(Square::from_index as fn(usize) -> Option<Square>)
    }
}

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2),
];
pub const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1), (1, 1), (1, 0), (1, -1), (0, -1), (-1, -1), (-1, 0), (-1, 1),
];
pub const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
pub const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

fn offset_table(offsets: &[(i8, i8)]) -> Vec<BitBoard> {
    Square::all().map(|square| {
        let mut mask = BitBoard::empty();
        for &(df, dr) in offsets {
            if let Some(target) = square.offset(df, dr) {
                mask.set_square(target, true);
            }
        }
        mask
    }).collect()
}

lazy_static! {
    static ref KNIGHT_ATTACKS: Vec<BitBoard> = offset_table(&KNIGHT_OFFSETS);
    static ref KING_ATTACKS: Vec<BitBoard> = offset_table(&KING_OFFSETS);
}

pub fn knight_attacks(square: Square) -> BitBoard {
    KNIGHT_ATTACKS[square.index()]
}

pub fn king_attacks(square: Square) -> BitBoard {
    KING_ATTACKS[square.index()]
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SquareSet(BitBoard);

impl SquareSet {
    pub fn new() -> Self {
        Self(BitBoard::empty())
    }

    pub fn insert(&mut self, square: Square) {
        self.0.set_square(square, true);
    }

    pub fn remove(&mut self, square: Square) {
        self.0.set_square(square, false);
    }

    pub fn contains(&self, square: Square) -> bool {
        self.0.has_square(square)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.0.not_any()
    }

    pub fn iter(&self) -> impl Iterator<Item = Square> + '_ {
        self.0.iter_squares()
    }
}

impl Default for SquareSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Square> for SquareSet {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        let mut set = SquareSet::new();
        for square in iter {
            set.insert(square);
        }
        set
    }
}

impl fmt::Debug for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|sq| sq.to_string())).finish()
    }
}

impl Serialize for SquareSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let mut s = serializer.serialize_seq(Some(self.len()))?;
        for square in self.iter() {
            s.serialize_element(&square)?;
        }
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knight_in_corner_has_two_targets() {
        let targets: Vec<String> = knight_attacks(Square::A1).iter_squares().map(|s| s.to_string()).collect();
        assert_eq!(targets, vec!["c2", "b3"]);
    }

    #[test]
    fn central_pieces_have_full_tables() {
        let d4 = Square::new(3, 3).unwrap();
        assert_eq!(knight_attacks(d4).count_ones(), 8);
        assert_eq!(king_attacks(d4).count_ones(), 8);
        assert_eq!(king_attacks(Square::H8).count_ones(), 3);
    }

    #[test]
    fn square_set_basics() {
        let mut set = SquareSet::new();
        assert!(set.is_empty());
        set.insert(Square::E1);
        set.insert(Square::E8);
        set.insert(Square::E1);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Square::E8));
        set.remove(Square::E8);
        assert!(!set.contains(Square::E8));
        assert_eq!(serde_json::to_string(&set).unwrap(), "[\"e1\"]");
    }
}
