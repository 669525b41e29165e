//! 指し手（Move）
//!
//! ビット配置:
//! - bit 0-6: 移動先
//! - bit 7-13: 移動元（駒打ちは移動先と同じ）
//! - bit 14-16: 指し手の種類
//! - bit 17-21: 成り先 / 打つ駒種
//! - bit 22-26: ゲート駒種（駒打ちでは持ち駒側の駒種）
//! - bit 27-33: ゲート / 壁のマス

use super::{PieceType, Square};

/// 指し手の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveType {
    Normal = 0,
    EnPassant = 1,
    /// 王が自分のルークを取る形で表す
    Castling = 2,
    Promotion = 3,
    PiecePromotion = 4,
    PieceDemotion = 5,
    Drop = 6,
    /// パスと特殊な跳び（カンボジアの王・メット）
    Special = 7,
}

impl MoveType {
    const ALL: [MoveType; 8] = [
        MoveType::Normal,
        MoveType::EnPassant,
        MoveType::Castling,
        MoveType::Promotion,
        MoveType::PiecePromotion,
        MoveType::PieceDemotion,
        MoveType::Drop,
        MoveType::Special,
    ];
}

/// 指し手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Move(u64);

const TYPE_SHIFT: u32 = 14;
const PT_SHIFT: u32 = 17;
const GATE_SHIFT: u32 = 22;
const GATE_SQ_SHIFT: u32 = 27;

impl Move {
    /// 無効な指し手
    pub const NONE: Move = Move(0);
    /// null move
    pub const NULL: Move = Move(1 << 63);

    #[inline]
    const fn raw(from: Square, to: Square, mt: MoveType) -> u64 {
        (to.index() as u64) | ((from.index() as u64) << 7) | ((mt as u64) << TYPE_SHIFT)
    }

    /// 通常の指し手
    #[inline]
    pub const fn normal(from: Square, to: Square) -> Move {
        Move(Move::raw(from, to, MoveType::Normal))
    }

    /// 種類付きの指し手（成り・駒成り・駒戻り・e.p.・キャスリング・パス）
    #[inline]
    pub const fn with_type(mt: MoveType, from: Square, to: Square) -> Move {
        Move(Move::raw(from, to, mt))
    }

    /// 成り（成り先の駒種付き）
    #[inline]
    pub const fn promotion(from: Square, to: Square, pt: PieceType) -> Move {
        Move(Move::raw(from, to, MoveType::Promotion) | ((pt as u64) << PT_SHIFT))
    }

    /// 駒打ち
    ///
    /// `in_hand` は持ち駒から減らす駒種、`dropped` は盤上に置く駒種。
    #[inline]
    pub const fn drop(in_hand: PieceType, dropped: PieceType, to: Square) -> Move {
        Move(
            Move::raw(to, to, MoveType::Drop)
                | ((dropped as u64) << PT_SHIFT)
                | ((in_hand as u64) << GATE_SHIFT),
        )
    }

    /// ゲート付きの指し手
    #[inline]
    pub const fn with_gating(self, pt: PieceType, gate: Square) -> Move {
        Move(
            (self.0 & !((31 << GATE_SHIFT) | (127 << GATE_SQ_SHIFT)))
                | ((pt as u64) << GATE_SHIFT)
                | ((gate.index() as u64) << GATE_SQ_SHIFT),
        )
    }

    /// 壁を置く指し手
    #[inline]
    pub const fn with_wall(self, wall: Square) -> Move {
        Move((self.0 & !(127 << GATE_SQ_SHIFT)) | ((wall.index() as u64) << GATE_SQ_SHIFT))
    }

    #[inline]
    pub const fn to(self) -> Square {
        Square::from_index_unchecked((self.0 & 127) as usize)
    }

    #[inline]
    pub const fn from(self) -> Square {
        Square::from_index_unchecked(((self.0 >> 7) & 127) as usize)
    }

    #[inline]
    pub const fn move_type(self) -> MoveType {
        MoveType::ALL[((self.0 >> TYPE_SHIFT) & 7) as usize]
    }

    /// 成り先の駒種（成り以外は None）
    #[inline]
    pub const fn promotion_type(self) -> Option<PieceType> {
        PieceType::from_index(((self.0 >> PT_SHIFT) & 31) as usize)
    }

    /// 打つ駒種（駒打ち以外は None）
    #[inline]
    pub const fn dropped_piece_type(self) -> Option<PieceType> {
        self.promotion_type()
    }

    /// 持ち駒から減らす駒種
    #[inline]
    pub const fn in_hand_piece_type(self) -> Option<PieceType> {
        PieceType::from_index(((self.0 >> GATE_SHIFT) & 31) as usize)
    }

    /// ゲートで置く駒種
    #[inline]
    pub const fn gating_type(self) -> Option<PieceType> {
        if matches!(self.move_type(), MoveType::Drop) {
            None
        } else {
            PieceType::from_index(((self.0 >> GATE_SHIFT) & 31) as usize)
        }
    }

    /// ゲート / 壁のマス
    #[inline]
    pub const fn gating_square(self) -> Square {
        Square::from_index_unchecked(((self.0 >> GATE_SQ_SHIFT) & 127) as usize)
    }

    #[inline]
    pub const fn is_gating(self) -> bool {
        self.gating_type().is_some()
    }

    #[inline]
    pub const fn is_drop(self) -> bool {
        matches!(self.move_type(), MoveType::Drop)
    }

    /// パス（移動元と移動先が同じ特殊手）
    #[inline]
    pub const fn is_pass(self) -> bool {
        matches!(self.move_type(), MoveType::Special) && self.from().index() == self.to().index()
    }

    /// NONE / NULL 以外か
    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 != Move::NONE.0 && self.0 != Move::NULL.0
    }

    #[inline]
    pub const fn raw_value(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn test_move_normal_fields() {
        let m = Move::normal(sq("e2"), sq("e4"));
        assert_eq!(m.from(), sq("e2"));
        assert_eq!(m.to(), sq("e4"));
        assert_eq!(m.move_type(), MoveType::Normal);
        assert_eq!(m.promotion_type(), None);
        assert!(!m.is_gating());
        assert!(m.is_ok());
        assert!(!Move::NONE.is_ok());
        assert!(!Move::NULL.is_ok());
    }

    #[test]
    fn test_move_drop_fields() {
        let m = Move::drop(PieceType::ShogiPawn, PieceType::ShogiPawn, sq("e5"));
        assert!(m.is_drop());
        assert_eq!(m.to(), sq("e5"));
        assert_eq!(m.dropped_piece_type(), Some(PieceType::ShogiPawn));
        assert_eq!(m.in_hand_piece_type(), Some(PieceType::ShogiPawn));
        assert_eq!(m.gating_type(), None);
    }

    #[test]
    fn test_move_gating_and_wall() {
        let m = Move::normal(sq("g1"), sq("f3")).with_gating(PieceType::Archbishop, sq("g1"));
        assert_eq!(m.gating_type(), Some(PieceType::Archbishop));
        assert_eq!(m.gating_square(), sq("g1"));
        let w = Move::normal(sq("e2"), sq("e4")).with_wall(sq("d5"));
        assert_eq!(w.gating_square(), sq("d5"));
        assert_eq!(w.to(), sq("e4"));
    }

    #[test]
    fn test_move_promotion() {
        let m = Move::promotion(sq("a7"), sq("a8"), PieceType::Queen);
        assert_eq!(m.move_type(), MoveType::Promotion);
        assert_eq!(m.promotion_type(), Some(PieceType::Queen));
    }
}
