//! 駒種（PieceType）・駒（Piece）・駒種集合（PieceSet）

use serde::Deserialize;

use super::Color;

/// 駒種
///
/// 0 番は「全駒種」を表す集計用の添字として予約しているため、駒種は 1 から始まる。
/// `King` は常に最後に置く。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PieceType {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    /// 斜め 1 マス（マークルックの Met、象棋の士）
    Fers = 6,
    /// 斜め 2 マス跳び
    Alfil = 7,
    /// 斜め 1 マス + 前 1 マス（マークルックの Khon）
    Silver = 8,
    /// 飛車 + 桂 + 斜め 1 マス
    Aiwok = 9,
    /// 飛車 + 斜め 1 マス
    Bers = 10,
    Archbishop = 11,
    Chancellor = 12,
    Amazon = 13,
    /// 縦横 1 マス
    Wazir = 14,
    /// 王と同じ動きをする非王駒
    Commoner = 15,
    /// 象棋の砲
    Cannon = 16,
    /// 象棋の馬（足を塞がれる桂）
    Horse = 17,
    /// 象棋の相（目を塞がれる斜め 2 マス）
    Elephant = 18,
    /// チャンギの象
    JanggiElephant = 19,
    /// チャンギの包
    JanggiCannon = 20,
    /// 象棋の兵
    Soldier = 21,
    ShogiPawn = 22,
    Lance = 23,
    ShogiKnight = 24,
    Gold = 25,
    /// 竜王
    Dragon = 26,
    /// 竜馬
    DragonHorse = 27,
    /// 取る手しか指せない駒（Clobber）
    Clobber = 28,
    /// Breakthrough の駒
    Breakthrough = 29,
    /// 動かない駒（石）
    Immobile = 30,
    King = 31,
}

/// 駒種配列の大きさ（0 番は全駒種の集計用）
pub const PIECE_TYPE_NB: usize = 32;
/// 駒配列の大きさ
pub const PIECE_NB: usize = 64;

impl PieceType {
    /// 全駒種（添字順）
    pub const ALL: [PieceType; 31] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::Fers,
        PieceType::Alfil,
        PieceType::Silver,
        PieceType::Aiwok,
        PieceType::Bers,
        PieceType::Archbishop,
        PieceType::Chancellor,
        PieceType::Amazon,
        PieceType::Wazir,
        PieceType::Commoner,
        PieceType::Cannon,
        PieceType::Horse,
        PieceType::Elephant,
        PieceType::JanggiElephant,
        PieceType::JanggiCannon,
        PieceType::Soldier,
        PieceType::ShogiPawn,
        PieceType::Lance,
        PieceType::ShogiKnight,
        PieceType::Gold,
        PieceType::Dragon,
        PieceType::DragonHorse,
        PieceType::Clobber,
        PieceType::Breakthrough,
        PieceType::Immobile,
        PieceType::King,
    ];

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 添字から変換（0 と範囲外は None）
    #[inline]
    pub const fn from_index(idx: usize) -> Option<PieceType> {
        if idx >= 1 && idx < PIECE_TYPE_NB {
            Some(PieceType::ALL[idx - 1])
        } else {
            None
        }
    }

    /// 既定の駒文字（小文字）
    pub const fn default_char(self) -> char {
        match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::Fers => 'f',
            PieceType::Alfil => 'y',
            PieceType::Silver => 's',
            PieceType::Aiwok => 'v',
            PieceType::Bers => 'j',
            PieceType::Archbishop => 'a',
            PieceType::Chancellor => 'c',
            PieceType::Amazon => 'z',
            PieceType::Wazir => 'w',
            PieceType::Commoner => 'm',
            PieceType::Cannon => 'u',
            PieceType::Horse => 'h',
            PieceType::Elephant => 'e',
            PieceType::JanggiElephant => 'x',
            PieceType::JanggiCannon => 'i',
            PieceType::Soldier => 'o',
            PieceType::ShogiPawn => 'p',
            PieceType::Lance => 'l',
            PieceType::ShogiKnight => 'n',
            PieceType::Gold => 'g',
            PieceType::Dragon => 'd',
            PieceType::DragonHorse => 't',
            PieceType::Clobber => 'p',
            PieceType::Breakthrough => 'p',
            PieceType::Immobile => 'p',
            PieceType::King => 'k',
        }
    }

    /// 駒の価値（交換値計算用）
    pub const fn value(self) -> i32 {
        match self {
            PieceType::Pawn => 126,
            PieceType::Knight => 781,
            PieceType::Bishop => 825,
            PieceType::Rook => 1276,
            PieceType::Queen => 2538,
            PieceType::Fers => 170,
            PieceType::Alfil => 155,
            PieceType::Silver => 635,
            PieceType::Aiwok => 2300,
            PieceType::Bers => 1800,
            PieceType::Archbishop => 2200,
            PieceType::Chancellor => 2300,
            PieceType::Amazon => 3000,
            PieceType::Wazir => 150,
            PieceType::Commoner => 700,
            PieceType::Cannon => 700,
            PieceType::Horse => 520,
            PieceType::Elephant => 180,
            PieceType::JanggiElephant => 340,
            PieceType::JanggiCannon => 800,
            PieceType::Soldier => 200,
            PieceType::ShogiPawn => 90,
            PieceType::Lance => 350,
            PieceType::ShogiKnight => 350,
            PieceType::Gold => 720,
            PieceType::Dragon => 1400,
            PieceType::DragonHorse => 1200,
            PieceType::Clobber => 300,
            PieceType::Breakthrough => 300,
            PieceType::Immobile => 100,
            PieceType::King => 0,
        }
    }
}

/// 駒（手番 + 駒種）
///
/// `color << 5 | piece_type` で表す。0 は駒なし。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Piece(u8);

impl Piece {
    /// 駒なし
    pub const NONE: Piece = Piece(0);

    #[inline]
    pub const fn new(c: Color, pt: PieceType) -> Piece {
        Piece(((c as u8) << 5) | pt as u8)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 & 31 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }

    /// 手番（駒なしに対しては呼ばない）
    #[inline]
    pub const fn color(self) -> Color {
        debug_assert!(self.is_some());
        if self.0 >> 5 == 0 { Color::White } else { Color::Black }
    }

    /// 駒種（駒なしなら None）
    #[inline]
    pub const fn piece_type(self) -> Option<PieceType> {
        PieceType::from_index((self.0 & 31) as usize)
    }

    /// 駒種の添字（駒なしなら 0）
    #[inline]
    pub const fn type_index(self) -> usize {
        (self.0 & 31) as usize
    }

    /// 手番を反転した駒
    #[inline]
    pub const fn flip(self) -> Piece {
        if self.is_none() { self } else { Piece(self.0 ^ 32) }
    }

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 添字から変換
    #[inline]
    pub const fn from_index(idx: usize) -> Piece {
        Piece((idx & 63) as u8)
    }
}

/// 駒種の集合（ビット集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "Vec<PieceType>")]
#[repr(transparent)]
pub struct PieceSet(u64);

impl PieceSet {
    pub const EMPTY: PieceSet = PieceSet(0);

    #[inline]
    pub const fn single(pt: PieceType) -> PieceSet {
        PieceSet(1 << pt as u64)
    }

    /// 駒種を追加した集合
    #[inline]
    pub const fn with(self, pt: PieceType) -> PieceSet {
        PieceSet(self.0 | (1 << pt as u64))
    }

    /// 駒種を除いた集合
    #[inline]
    pub const fn without(self, pt: PieceType) -> PieceSet {
        PieceSet(self.0 & !(1 << pt as u64))
    }

    #[inline]
    pub const fn contains(self, pt: PieceType) -> bool {
        self.0 & (1 << pt as u64) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// 添字の小さい順に取り出す
    #[inline]
    pub fn pop_lsb(&mut self) -> Option<PieceType> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        PieceType::from_index(idx)
    }

    /// 添字の大きい順に取り出す
    #[inline]
    pub fn pop_msb(&mut self) -> Option<PieceType> {
        if self.0 == 0 {
            return None;
        }
        let idx = 63 - self.0.leading_zeros() as usize;
        self.0 &= !(1 << idx);
        PieceType::from_index(idx)
    }

    /// 昇順のイテレータ
    pub fn iter(self) -> impl Iterator<Item = PieceType> {
        let mut set = self;
        std::iter::from_fn(move || set.pop_lsb())
    }

    /// 降順のイテレータ
    pub fn iter_rev(self) -> impl Iterator<Item = PieceType> {
        let mut set = self;
        std::iter::from_fn(move || set.pop_msb())
    }
}

impl From<Vec<PieceType>> for PieceSet {
    fn from(v: Vec<PieceType>) -> Self {
        v.into_iter().collect()
    }
}

impl FromIterator<PieceType> for PieceSet {
    fn from_iter<I: IntoIterator<Item = PieceType>>(iter: I) -> Self {
        iter.into_iter().fold(PieceSet::EMPTY, PieceSet::with)
    }
}

impl std::ops::BitOr for PieceSet {
    type Output = PieceSet;
    #[inline]
    fn bitor(self, rhs: PieceSet) -> PieceSet {
        PieceSet(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for PieceSet {
    type Output = PieceSet;
    #[inline]
    fn bitand(self, rhs: PieceSet) -> PieceSet {
        PieceSet(self.0 & rhs.0)
    }
}

impl std::ops::Sub for PieceSet {
    type Output = PieceSet;
    #[inline]
    fn sub(self, rhs: PieceSet) -> PieceSet {
        PieceSet(self.0 & !rhs.0)
    }
}

impl std::ops::BitOrAssign for PieceSet {
    #[inline]
    fn bitor_assign(&mut self, rhs: PieceSet) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_type_index_roundtrip() {
        for pt in PieceType::ALL {
            assert_eq!(PieceType::from_index(pt.index()), Some(pt));
        }
        assert_eq!(PieceType::from_index(0), None);
        assert_eq!(PieceType::King.index(), PIECE_TYPE_NB - 1);
    }

    #[test]
    fn test_piece_color_and_type() {
        let pc = Piece::new(Color::Black, PieceType::Rook);
        assert_eq!(pc.color(), Color::Black);
        assert_eq!(pc.piece_type(), Some(PieceType::Rook));
        assert_eq!(pc.flip(), Piece::new(Color::White, PieceType::Rook));
        assert!(Piece::NONE.is_none());
        assert_eq!(Piece::NONE.flip(), Piece::NONE);
    }

    #[test]
    fn test_piece_set_iteration() {
        let set: PieceSet = [PieceType::King, PieceType::Pawn, PieceType::Rook].into_iter().collect();
        assert_eq!(set.len(), 3);
        let asc: Vec<_> = set.iter().collect();
        assert_eq!(asc, vec![PieceType::Pawn, PieceType::Rook, PieceType::King]);
        let desc: Vec<_> = set.iter_rev().collect();
        assert_eq!(desc, vec![PieceType::King, PieceType::Rook, PieceType::Pawn]);
        assert!(!set.without(PieceType::Rook).contains(PieceType::Rook));
    }
}
