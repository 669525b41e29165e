//! 筋（File）・段（Rank）・マス（Square）
//!
//! 盤面は最大 12 筋 x 10 段で、`index = rank * FILE_NB + file` で通し番号を振る。
//! 実際に使う盤の大きさは `Variant` の `max_file` / `max_rank` で決まる。

use std::fmt;

use super::Color;

/// 筋の最大数
pub const FILE_NB: usize = 12;
/// 段の最大数
pub const RANK_NB: usize = 10;
/// マスの最大数
pub const SQUARE_NB: usize = FILE_NB * RANK_NB;

/// 筋（a 筋 = 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct File(u8);

impl File {
    pub const A: File = File(0);
    pub const B: File = File(1);
    pub const C: File = File(2);
    pub const D: File = File(3);
    pub const E: File = File(4);
    pub const F: File = File(5);
    pub const G: File = File(6);
    pub const H: File = File(7);
    pub const I: File = File(8);
    pub const J: File = File(9);
    pub const K: File = File(10);
    pub const L: File = File(11);

    /// u8から生成（範囲外は None）
    #[inline]
    pub const fn new(n: u8) -> Option<File> {
        if (n as usize) < FILE_NB { Some(File(n)) } else { None }
    }

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 筋文字（'a'〜'l'）
    #[inline]
    pub const fn to_char(self) -> char {
        (b'a' + self.0) as char
    }

    /// 筋文字から変換
    #[inline]
    pub const fn from_char(c: char) -> Option<File> {
        File::new((c as u8).wrapping_sub(b'a'))
    }

    /// 左右反転（`max_file` を軸に）
    #[inline]
    pub const fn flip(self, max_file: File) -> File {
        File(max_file.0 - self.0)
    }
}

/// 段（1 段目 = 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Rank(u8);

impl Rank {
    pub const R1: Rank = Rank(0);
    pub const R2: Rank = Rank(1);
    pub const R3: Rank = Rank(2);
    pub const R4: Rank = Rank(3);
    pub const R5: Rank = Rank(4);
    pub const R6: Rank = Rank(5);
    pub const R7: Rank = Rank(6);
    pub const R8: Rank = Rank(7);
    pub const R9: Rank = Rank(8);
    pub const R10: Rank = Rank(9);

    /// u8から生成（範囲外は None）
    #[inline]
    pub const fn new(n: u8) -> Option<Rank> {
        if (n as usize) < RANK_NB { Some(Rank(n)) } else { None }
    }

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 手番から見た段（黒は `max_rank` を軸に反転）
    #[inline]
    pub const fn relative(self, c: Color, max_rank: Rank) -> Rank {
        match c {
            Color::White => self,
            Color::Black => Rank(max_rank.0 - self.0),
        }
    }
}

/// マス
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Square(u8);

impl Square {
    /// マスの最大数
    pub const NUM: usize = SQUARE_NB;

    /// 筋と段から生成
    #[inline]
    pub const fn new(f: File, r: Rank) -> Square {
        Square(r.0 * FILE_NB as u8 + f.0)
    }

    /// 通し番号から生成（範囲外は None）
    #[inline]
    pub const fn from_index(idx: usize) -> Option<Square> {
        if idx < SQUARE_NB { Some(Square(idx as u8)) } else { None }
    }

    /// 通し番号から生成（範囲チェックは debug のみ）
    #[inline]
    pub(crate) const fn from_index_unchecked(idx: usize) -> Square {
        debug_assert!(idx < SQUARE_NB);
        Square(idx as u8)
    }

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn file(self) -> File {
        File(self.0 % FILE_NB as u8)
    }

    #[inline]
    pub const fn rank(self) -> Rank {
        Rank(self.0 / FILE_NB as u8)
    }

    /// 筋・段方向にずらしたマス（12x10 の格子外は None）
    #[inline]
    pub const fn offset(self, df: i32, dr: i32) -> Option<Square> {
        let f = self.file().0 as i32 + df;
        let r = self.rank().0 as i32 + dr;
        if f < 0 || r < 0 || f >= FILE_NB as i32 || r >= RANK_NB as i32 {
            None
        } else {
            Some(Square((r * FILE_NB as i32 + f) as u8))
        }
    }

    /// 手番から見たマス（黒は段を反転）
    #[inline]
    pub const fn relative(self, c: Color, max_rank: Rank) -> Square {
        Square::new(self.file(), self.rank().relative(c, max_rank))
    }

    /// 手番から見た段
    #[inline]
    pub const fn relative_rank(self, c: Color, max_rank: Rank) -> Rank {
        self.rank().relative(c, max_rank)
    }

    /// チェビシェフ距離
    #[inline]
    pub const fn distance(self, other: Square) -> u32 {
        let df = self.file().0.abs_diff(other.file().0);
        let dr = self.rank().0.abs_diff(other.rank().0);
        if df > dr { df as u32 } else { dr as u32 }
    }

    #[inline]
    pub const fn file_distance(self, other: Square) -> u32 {
        self.file().0.abs_diff(other.file().0) as u32
    }

    #[inline]
    pub const fn rank_distance(self, other: Square) -> u32 {
        self.rank().0.abs_diff(other.rank().0) as u32
    }

    /// 代数表記（"e4", "l10"）から変換
    pub fn parse(s: &str) -> Option<Square> {
        let mut chars = s.chars();
        let f = File::from_char(chars.next()?)?;
        let r: u8 = chars.as_str().parse().ok()?;
        if r == 0 {
            return None;
        }
        Some(Square::new(f, Rank::new(r - 1)?))
    }

    /// 全マスのイテレータ
    pub fn iter() -> impl Iterator<Item = Square> {
        (0..SQUARE_NB as u8).map(Square)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file().to_char(), self.rank().index() + 1)
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_file_rank() {
        let sq = Square::new(File::E, Rank::R4);
        assert_eq!(sq.file(), File::E);
        assert_eq!(sq.rank(), Rank::R4);
        assert_eq!(sq.index(), 3 * FILE_NB + 4);
    }

    #[test]
    fn test_square_parse_display() {
        let sq = Square::parse("e4").unwrap();
        assert_eq!(sq.to_string(), "e4");
        let sq = Square::parse("l10").unwrap();
        assert_eq!(sq.file().index(), 11);
        assert_eq!(sq.rank().index(), 9);
        assert_eq!(Square::parse("a0"), None);
        assert_eq!(Square::parse("m1"), None);
        assert_eq!(Square::parse("a11"), None);
    }

    #[test]
    fn test_square_offset() {
        let a1 = Square::new(File::A, Rank::R1);
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(a1.offset(0, -1), None);
        assert_eq!(a1.offset(1, 2), Some(Square::new(File::B, Rank::R3)));
        let l10 = Square::from_index(SQUARE_NB - 1).unwrap();
        assert_eq!(l10.offset(1, 0), None);
    }

    #[test]
    fn test_square_relative() {
        let e2 = Square::parse("e2").unwrap();
        assert_eq!(e2.relative(Color::White, Rank::R8), e2);
        assert_eq!(e2.relative(Color::Black, Rank::R8), Square::parse("e7").unwrap());
        assert_eq!(e2.relative_rank(Color::Black, Rank::R8), Rank::R7);
    }

    #[test]
    fn test_square_distance() {
        let a1 = Square::parse("a1").unwrap();
        let c2 = Square::parse("c2").unwrap();
        assert_eq!(a1.distance(c2), 2);
        assert_eq!(a1.file_distance(c2), 2);
        assert_eq!(a1.rank_distance(c2), 1);
    }
}
