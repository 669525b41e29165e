//! 2 マス間の直線・中間マスのテーブル

use std::sync::OnceLock;

use crate::types::{FILE_NB, SQUARE_NB, Square};

use super::Bitboard;
use super::pieces::{bishop_attacks, rook_attacks};

struct LineTables {
    line: Vec<Bitboard>,
    between: Vec<Bitboard>,
}

static LINE_TABLES: OnceLock<LineTables> = OnceLock::new();

fn tables() -> &'static LineTables {
    LINE_TABLES.get_or_init(LineTables::new)
}

impl LineTables {
    fn new() -> Self {
        let mut line = vec![Bitboard::EMPTY; SQUARE_NB * SQUARE_NB];
        let mut between = vec![Bitboard::EMPTY; SQUARE_NB * SQUARE_NB];

        for s1 in Square::iter() {
            for s2 in Square::iter() {
                let i = s1.index() * SQUARE_NB + s2.index();
                between[i] = Bitboard::from_square(s2);
                if s1 == s2 {
                    continue;
                }
                let rook = rook_attacks(s1, Bitboard::EMPTY);
                let bishop = bishop_attacks(s1, Bitboard::EMPTY);
                if rook.contains(s2) {
                    line[i] = (rook & rook_attacks(s2, Bitboard::EMPTY)) | s1 | s2;
                    between[i] |= rook_attacks(s1, Bitboard::from_square(s2))
                        & rook_attacks(s2, Bitboard::from_square(s1));
                } else if bishop.contains(s2) {
                    line[i] = (bishop & bishop_attacks(s2, Bitboard::EMPTY)) | s1 | s2;
                    between[i] |= bishop_attacks(s1, Bitboard::from_square(s2))
                        & bishop_attacks(s2, Bitboard::from_square(s1));
                }
            }
        }

        LineTables { line, between }
    }
}

/// s1 と s2 を通る直線全体（縦横斜めに並ばないなら空）
#[inline]
pub fn line_bb(s1: Square, s2: Square) -> Bitboard {
    tables().line[s1.index() * SQUARE_NB + s2.index()]
}

/// s1 と s2 の間のマスに s2 を加えたもの（直線上にないなら s2 のみ）
#[inline]
pub fn between_bb(s1: Square, s2: Square) -> Bitboard {
    tables().between[s1.index() * SQUARE_NB + s2.index()]
}

/// 3 マスが一直線上にあるか
#[inline]
pub fn aligned(s1: Square, s2: Square, s3: Square) -> bool {
    line_bb(s1, s2).contains(s3)
}

/// 暗マス（a1 と同じ色）
pub const DARK_SQUARES: Bitboard = {
    let mut bits = 0u128;
    let mut i = 0;
    while i < SQUARE_NB {
        if (i / FILE_NB + i % FILE_NB) % 2 == 0 {
            bits |= 1u128 << i;
        }
        i += 1;
    }
    Bitboard::new(bits)
};

pub(crate) fn init_line_tables() {
    let _ = tables();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn test_between_includes_target() {
        let b = between_bb(sq("a1"), sq("a4"));
        assert_eq!(b.count(), 3);
        assert!(b.contains(sq("a2")));
        assert!(b.contains(sq("a4")));
        assert!(!b.contains(sq("a1")));
    }

    #[test]
    fn test_between_not_aligned() {
        assert_eq!(between_bb(sq("a1"), sq("b3")), Bitboard::from_square(sq("b3")));
        assert!(line_bb(sq("a1"), sq("b3")).is_empty());
    }

    #[test]
    fn test_line_and_aligned() {
        assert!(aligned(sq("a1"), sq("c3"), sq("h8")));
        assert!(!aligned(sq("a1"), sq("c3"), sq("h7")));
        assert!(line_bb(sq("e1"), sq("e8")).contains(sq("e10")));
    }

    #[test]
    fn test_dark_squares() {
        assert!(DARK_SQUARES.contains(sq("a1")));
        assert!(!DARK_SQUARES.contains(sq("b1")));
        assert!(DARK_SQUARES.contains(sq("h8")));
    }
}
