//! チェス系バリアントのルールと局面の中核
//!
//! 盤の大きさ・駒の動き・終局条件を `Variant` で設定し、`Position` がその上で
//! 指し手の生成・適用・取り消しと終局判定を行う。
//!
//! - `types`: 手番・マス・駒・指し手・評価値
//! - `bitboard`: 12筋 x 10段の Bitboard と駒の利き
//! - `variant`: ルール設定と組み込みのプリセット
//! - `position`: 局面と状態スタック
//! - `movegen`: 指し手生成と perft

pub mod bitboard;
pub mod movegen;
pub mod position;
pub mod types;
pub mod variant;

/// 利きテーブルと Zobrist テーブルを構築する
///
/// 初回アクセス時にも構築されるので、呼ばなくても結果は変わらない。
pub fn init() {
    bitboard::init();
    position::init();
}
