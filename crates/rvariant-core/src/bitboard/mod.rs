//! ビットボードモジュール
//!
//! 12筋 x 10段の盤面を128bitで表現し、駒の利き計算を提供する。
//!
//! - `Bitboard`: 128bit盤面表現
//! - 駒の動きのカタログと利きテーブル
//! - 2 マス間の直線テーブル

mod core;
mod pieces;
mod tables;

pub use self::core::Bitboard;
pub use self::core::BitboardIter;
pub use pieces::*;
pub use tables::{DARK_SQUARES, aligned, between_bb, line_bb};

/// 利きテーブルを構築する
pub fn init() {
    init_piece_tables();
    tables::init_line_tables();
}
