//! 指し手リスト

use smallvec::SmallVec;

use crate::position::Position;
use crate::types::Move;

use super::generator::{generate_legal, generate_pseudo};

/// 通常の局面で溢れない大きさ（壁を置くルールではヒープに移る）
const INLINE_MOVES: usize = 256;

/// 指し手生成バッファ
#[derive(Clone, Default)]
pub struct MoveList {
    moves: SmallVec<[Move; INLINE_MOVES]>,
}

impl MoveList {
    /// 空のMoveListを作成
    #[inline]
    pub fn new() -> Self {
        Self { moves: SmallVec::new() }
    }

    /// 疑似合法手
    pub fn pseudo(pos: &Position) -> Self {
        let mut list = Self::new();
        generate_pseudo(pos, &mut list);
        list
    }

    /// 合法手（終局していれば空）
    pub fn legal(pos: &Position) -> Self {
        let mut list = Self::new();
        generate_legal(pos, &mut list);
        list
    }

    /// 指し手の数
    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// 空かどうか
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// イテレータを取得
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }

    /// 指定された指し手が含まれているか
    pub fn contains(&self, mv: Move) -> bool {
        self.moves.contains(&mv)
    }

    /// 指し手を追加
    #[inline]
    pub fn push(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    /// 条件を満たす手だけを残す
    pub fn retain(&mut self, mut f: impl FnMut(Move) -> bool) {
        self.moves.retain(|m| f(*m));
    }

    /// スライスとして取得
    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;

    fn index(&self, index: usize) -> &Self::Output {
        &self.moves[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PieceType, Square};

    #[test]
    fn test_movelist_push() {
        let mut list = MoveList::new();
        assert!(list.is_empty());
        let mv = Move::normal(Square::parse("e2").unwrap(), Square::parse("e4").unwrap());
        list.push(mv);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0], mv);
        assert!(list.contains(mv));
    }

    #[test]
    fn test_movelist_spills_past_inline_capacity() {
        let mut list = MoveList::new();
        let to = Square::parse("a1").unwrap();
        for _ in 0..INLINE_MOVES + 10 {
            list.push(Move::drop(PieceType::Pawn, PieceType::Pawn, to));
        }
        assert_eq!(list.len(), INLINE_MOVES + 10);
        list.retain(|_| false);
        assert!(list.is_empty());
    }
}
