//! 局面表現モジュール
//!
//! ルール（`Variant`）に従って局面を表現し、手の実行・巻き戻しと終局判定を行う。
//!
//! - `Position`: 局面本体（盤面配列・Bitboard・持ち駒・牢・ゲート・手番・手数）
//! - `StateInfo`: 局面状態（Zobristハッシュ、王手情報、pin情報、直前の手など）
//! - `Zobrist`: Zobristハッシュ乱数テーブルと千日手検出用の cuckoo テーブル
//! - `do_move` / `undo_move` / `do_null_move`: 手の実行と巻き戻し（`StateInfo` をスタックとして管理）
//! - 合法性・王手判定、SEE、千日手・長捉、終局判定
//! - FEN / SFEN 形式の解析・出力と盤面表示
//!
//! 盤面配列・Bitboard・持ち駒・Zobristキーは `Position` のメソッド
//! （`put_piece` / `remove_piece` / `do_move` 系）を通じて更新されることを前提とし、
//! 常に互いに整合しているように保つ。

mod attacks;
mod debug;
mod do_move;
mod fen;
mod game_end;
mod legality;
mod pos;
mod repetition;
mod see;
mod state;
mod zobrist;

pub use fen::{FenError, FenOptions};
pub use pos::Position;
pub use state::StateInfo;
pub use zobrist::{
    CUCKOO_COUNT, Key, Zobrist, zobrist, zobrist_in_hand, zobrist_material, zobrist_no_pawns, zobrist_psq,
    zobrist_side,
};

/// Zobrist テーブルを構築する
pub fn init() {
    zobrist::init();
}
