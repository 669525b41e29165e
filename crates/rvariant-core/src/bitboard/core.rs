//! Bitboard（128bit盤面表現）

use crate::types::{FILE_NB, File, RANK_NB, Rank, SQUARE_NB, Square};

const ALL_BITS: u128 = (1u128 << SQUARE_NB) - 1;

const fn file_bits(f: usize) -> u128 {
    let mut bits = 0u128;
    let mut r = 0;
    while r < RANK_NB {
        bits |= 1u128 << (r * FILE_NB + f);
        r += 1;
    }
    bits
}

/// Bitboard（128bit、12筋 x 10段の 120 マスを使用）
///
/// bit `rank * FILE_NB + file` がマスに対応する。上位 8 bit は常に 0。
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct Bitboard(u128);

impl Bitboard {
    /// 空のBitboard
    pub const EMPTY: Bitboard = Bitboard(0);

    /// 全マスが立っているBitboard
    pub const ALL: Bitboard = Bitboard(ALL_BITS);

    /// 生の値から生成（盤外ビットは落とす）
    #[inline]
    pub const fn new(bits: u128) -> Bitboard {
        Bitboard(bits & ALL_BITS)
    }

    /// 単一マスのBitboard
    #[inline]
    pub const fn from_square(sq: Square) -> Bitboard {
        Bitboard(1u128 << sq.index())
    }

    /// 筋のBitboard
    #[inline]
    pub const fn file(f: File) -> Bitboard {
        Bitboard(file_bits(f.index()))
    }

    /// 段のBitboard
    #[inline]
    pub const fn rank(r: Rank) -> Bitboard {
        Bitboard(((1u128 << FILE_NB) - 1) << (r.index() * FILE_NB))
    }

    /// a1 から (max_file, max_rank) までの盤面
    pub const fn board(max_file: File, max_rank: Rank) -> Bitboard {
        let mut bits = 0u128;
        let mut r = 0;
        while r <= max_rank.index() {
            bits |= ((1u128 << (max_file.index() + 1)) - 1) << (r * FILE_NB);
            r += 1;
        }
        Bitboard(bits)
    }

    /// 空かどうか
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 空でないかどうか
    #[inline]
    pub const fn is_not_empty(self) -> bool {
        self.0 != 0
    }

    /// ビットが立っている数
    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// 2つ以上のビットが立っているか
    #[inline]
    pub const fn more_than_one(self) -> bool {
        self.0 & self.0.wrapping_sub(1) != 0
    }

    /// 指定マスにビットが立っているか
    #[inline]
    pub const fn contains(self, sq: Square) -> bool {
        (self.0 >> sq.index()) & 1 != 0
    }

    #[inline]
    pub fn set(&mut self, sq: Square) {
        self.0 |= 1u128 << sq.index();
    }

    #[inline]
    pub fn clear(&mut self, sq: Square) {
        self.0 &= !(1u128 << sq.index());
    }

    #[inline]
    pub fn toggle(&mut self, sq: Square) {
        self.0 ^= 1u128 << sq.index();
    }

    /// 最下位ビットのSquare（空ならNone）
    #[inline]
    pub const fn lsb(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Square::from_index(self.0.trailing_zeros() as usize)
        }
    }

    /// 最上位ビットのSquare（空ならNone）
    #[inline]
    pub const fn msb(self) -> Option<Square> {
        if self.0 == 0 {
            None
        } else {
            Square::from_index(127 - self.0.leading_zeros() as usize)
        }
    }

    /// 最下位ビットのSquareを取得して消す
    #[inline]
    pub fn pop(&mut self) -> Option<Square> {
        let sq = self.lsb()?;
        self.0 &= self.0 - 1;
        Some(sq)
    }

    /// 生の値
    #[inline]
    pub const fn bits(self) -> u128 {
        self.0
    }

    /// イテレータを返す
    #[inline]
    pub const fn iter(self) -> BitboardIter {
        BitboardIter { bb: self }
    }

    /// 1段上（白から見て前）にずらす
    #[inline]
    pub const fn shift_north(self) -> Bitboard {
        Bitboard((self.0 << FILE_NB) & ALL_BITS)
    }

    /// 1段下にずらす
    #[inline]
    pub const fn shift_south(self) -> Bitboard {
        Bitboard(self.0 >> FILE_NB)
    }

    /// 1筋右（h 筋側）にずらす
    #[inline]
    pub const fn shift_east(self) -> Bitboard {
        Bitboard((self.0 & !file_bits(FILE_NB - 1)) << 1)
    }

    /// 1筋左（a 筋側）にずらす
    #[inline]
    pub const fn shift_west(self) -> Bitboard {
        Bitboard((self.0 & !file_bits(0)) >> 1)
    }
}

impl std::ops::BitAnd for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitand(self, rhs: Bitboard) -> Bitboard {
        Bitboard(self.0 & rhs.0)
    }
}

impl std::ops::BitAndAssign for Bitboard {
    #[inline]
    fn bitand_assign(&mut self, rhs: Bitboard) {
        self.0 &= rhs.0;
    }
}

impl std::ops::BitOr for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitor(self, rhs: Bitboard) -> Bitboard {
        Bitboard(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Bitboard {
    #[inline]
    fn bitor_assign(&mut self, rhs: Bitboard) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitXor for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitxor(self, rhs: Bitboard) -> Bitboard {
        Bitboard(self.0 ^ rhs.0)
    }
}

impl std::ops::BitXorAssign for Bitboard {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Bitboard) {
        self.0 ^= rhs.0;
    }
}

impl std::ops::Not for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn not(self) -> Bitboard {
        Bitboard(!self.0 & ALL_BITS)
    }
}

// マスとの演算（単一マスのBitboardとして扱う）

impl std::ops::BitAnd<Square> for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitand(self, rhs: Square) -> Bitboard {
        self & Bitboard::from_square(rhs)
    }
}

impl std::ops::BitOr<Square> for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitor(self, rhs: Square) -> Bitboard {
        self | Bitboard::from_square(rhs)
    }
}

impl std::ops::BitXor<Square> for Bitboard {
    type Output = Bitboard;

    #[inline]
    fn bitxor(self, rhs: Square) -> Bitboard {
        self ^ Bitboard::from_square(rhs)
    }
}

impl std::ops::BitOrAssign<Square> for Bitboard {
    #[inline]
    fn bitor_assign(&mut self, rhs: Square) {
        self.set(rhs);
    }
}

impl std::ops::BitXorAssign<Square> for Bitboard {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Square) {
        self.toggle(rhs);
    }
}

impl From<Square> for Bitboard {
    #[inline]
    fn from(sq: Square) -> Bitboard {
        Bitboard::from_square(sq)
    }
}

impl FromIterator<Square> for Bitboard {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        iter.into_iter().fold(Bitboard::EMPTY, |b, s| b | s)
    }
}

impl std::fmt::Debug for Bitboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Bitboard {{")?;
        for r in (0..RANK_NB).rev() {
            write!(f, "  ")?;
            for fl in 0..FILE_NB {
                let set = self.0 >> (r * FILE_NB + fl) & 1 != 0;
                write!(f, "{}", if set { '*' } else { '.' })?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}

/// Bitboardのイテレータ
pub struct BitboardIter {
    bb: Bitboard,
}

impl Iterator for BitboardIter {
    type Item = Square;

    #[inline]
    fn next(&mut self) -> Option<Square> {
        self.bb.pop()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bb.count() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BitboardIter {}

impl IntoIterator for Bitboard {
    type Item = Square;
    type IntoIter = BitboardIter;

    #[inline]
    fn into_iter(self) -> BitboardIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn test_bitboard_empty_all() {
        assert!(Bitboard::EMPTY.is_empty());
        assert_eq!(Bitboard::ALL.count(), SQUARE_NB as u32);
        assert_eq!((!Bitboard::EMPTY), Bitboard::ALL);
    }

    #[test]
    fn test_bitboard_board() {
        let b = Bitboard::board(File::H, Rank::R8);
        assert_eq!(b.count(), 64);
        assert!(b.contains(sq("h8")));
        assert!(!b.contains(sq("i1")));
        assert!(!b.contains(sq("a9")));
    }

    #[test]
    fn test_bitboard_pop_order() {
        let mut b = Bitboard::from_square(sq("c3")) | sq("a1") | sq("l10");
        assert!(b.more_than_one());
        assert_eq!(b.pop(), Some(sq("a1")));
        assert_eq!(b.pop(), Some(sq("c3")));
        assert_eq!(b.msb(), Some(sq("l10")));
        assert_eq!(b.pop(), Some(sq("l10")));
        assert_eq!(b.pop(), None);
    }

    #[test]
    fn test_bitboard_shifts() {
        let b = Bitboard::from_square(sq("a1")) | sq("l1");
        assert_eq!(b.shift_north(), Bitboard::from_square(sq("a2")) | sq("l2"));
        assert_eq!(b.shift_east(), Bitboard::from_square(sq("b1")));
        assert_eq!(b.shift_west(), Bitboard::from_square(sq("k1")));
        assert!(Bitboard::rank(Rank::R10).shift_north().is_empty());
    }

    #[test]
    fn test_bitboard_file_rank() {
        assert_eq!(Bitboard::file(File::E).count(), RANK_NB as u32);
        assert_eq!(Bitboard::rank(Rank::R2).count(), FILE_NB as u32);
        assert!(Bitboard::file(File::E).contains(sq("e7")));
    }
}
