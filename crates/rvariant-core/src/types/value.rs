//! 評価値（Value）
//!
//! 終局判定の結果は `Value::MATE` 付近の詰みスコアで返す。
//! 勝ちは `mate_in(ply)`、負けは `mated_in(ply)` で、探索側はそのまま評価値として扱える。

use std::ops::{Add, Neg, Sub};

/// 最大探索深度
pub const MAX_PLY: i32 = 246;

/// 評価値
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Value(i32);

impl Value {
    /// ゼロ
    pub const ZERO: Value = Value(0);
    /// 引き分け
    pub const DRAW: Value = Value(0);
    /// 詰み（勝ち側の最大スコア）
    pub const MATE: Value = Value(32000);
    /// 無限大
    pub const INFINITE: Value = Value(32001);
    /// 無効値
    pub const NONE: Value = Value(32002);

    /// 最大探索深度内での詰みスコア
    pub const MATE_IN_MAX_PLY: Value = Value(Self::MATE.0 - MAX_PLY);
    /// 最大探索深度内での詰まされスコア
    pub const MATED_IN_MAX_PLY: Value = Value(-Self::MATE_IN_MAX_PLY.0);

    /// 値から生成
    #[inline]
    pub const fn new(v: i32) -> Value {
        Value(v)
    }

    /// ply手で詰ますスコア
    #[inline]
    pub const fn mate_in(ply: i32) -> Value {
        Value(Self::MATE.0 - ply)
    }

    /// ply手で詰まされるスコア
    #[inline]
    pub const fn mated_in(ply: i32) -> Value {
        Value(-Self::MATE.0 + ply)
    }

    /// 設定値の `MATE` / `-MATE` を ply 付きの詰みスコアに変換する
    #[inline]
    pub const fn convert_mate_value(self, ply: i32) -> Value {
        if self.0 == Self::MATE.0 {
            Value::mate_in(ply)
        } else if self.0 == -Self::MATE.0 {
            Value::mated_in(ply)
        } else {
            self
        }
    }

    /// 勝ちスコアかどうか
    #[inline]
    pub const fn is_win(self) -> bool {
        self.0 >= Self::MATE_IN_MAX_PLY.0
    }

    /// 負けスコアかどうか
    #[inline]
    pub const fn is_loss(self) -> bool {
        self.0 <= Self::MATED_IN_MAX_PLY.0
    }

    /// 生の値を取得
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl Neg for Value {
    type Output = Value;
    #[inline]
    fn neg(self) -> Value {
        Value(-self.0)
    }
}

impl Add<i32> for Value {
    type Output = Value;
    #[inline]
    fn add(self, rhs: i32) -> Value {
        Value(self.0 + rhs)
    }
}

impl Sub<i32> for Value {
    type Output = Value;
    #[inline]
    fn sub(self, rhs: i32) -> Value {
        Value(self.0 - rhs)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_win() {
            write!(f, "mate {}", (Self::MATE.0 - self.0 + 1) / 2)
        } else if self.is_loss() {
            write!(f, "mate -{}", (Self::MATE.0 + self.0) / 2)
        } else {
            write!(f, "cp {}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_mate() {
        assert_eq!(Value::mate_in(3).raw(), 31997);
        assert_eq!(Value::mated_in(3).raw(), -31997);
        assert!(Value::mate_in(10).is_win());
        assert!(Value::mated_in(10).is_loss());
        assert!(!Value::DRAW.is_win());
    }

    #[test]
    fn test_value_convert_mate_value() {
        assert_eq!(Value::MATE.convert_mate_value(4), Value::mate_in(4));
        assert_eq!((-Value::MATE).convert_mate_value(4), Value::mated_in(4));
        assert_eq!(Value::DRAW.convert_mate_value(4), Value::DRAW);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::mate_in(1).to_string(), "mate 1");
        assert_eq!(Value::new(42).to_string(), "cp 42");
    }
}
