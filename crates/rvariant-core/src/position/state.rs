//! 局面状態（StateInfo）
//!
//! 1 手ごとに 1 つ積まれる状態。Position が `Vec<StateInfo>` として所有し、
//! do_move で積んで undo_move で降ろす。

use std::cell::Cell;

use super::zobrist::{Key, zobrist_no_pawns};
use crate::bitboard::Bitboard;
use crate::types::{CastlingRights, Color, Move, PIECE_TYPE_NB, Piece, PieceType, SQUARE_NB, Square};

/// 局面状態
///
/// do_move時に前の状態を保存し、undo_move時に復元するための情報を保持する。
#[derive(Clone, Debug)]
pub struct StateInfo {
    // === do_move時にコピーされる部分 ===
    /// 歩のハッシュ
    pub pawn_key: Key,
    /// 駒割ハッシュ
    pub material_key: Key,
    /// キャスリング権
    pub castling_rights: CastlingRights,
    /// 可逆手の連続手数
    pub rule50: i32,
    /// null moveからの手数
    pub plies_from_null: i32,
    /// 数え手の手数
    pub counting_ply: i32,
    /// 数え手の上限（0 は数えていない）
    pub counting_limit: i32,
    /// 得点 [Color]
    pub points_count: [i32; Color::NUM],
    /// 残り王手回数 [Color]
    pub checks_remaining: [i32; Color::NUM],
    /// e.p. で取れるマス
    pub ep_squares: Bitboard,
    /// キャスリング可能な王のマス [Color]
    pub castling_king_square: [Option<Square>; Color::NUM],
    /// 壁
    pub wall_squares: Bitboard,
    /// ゲートの残っているマス [Color]
    pub gates: [Bitboard; Color::NUM],

    // === 再計算される部分 ===
    /// 局面のハッシュ（手番込み）
    pub key: Key,
    /// 数独ルールの衝突数 [Color]
    pub sudoku_conflicts: [i32; Color::NUM],
    /// 王手している駒
    pub checkers: Bitboard,
    /// 取った駒の成る前の駒
    pub unpromoted_captured_piece: Piece,
    /// 爆発で消えた駒の成る前の駒 [Square]
    pub unpromoted_bycatch: [Piece; SQUARE_NB],
    /// 爆発で消えた成り駒
    pub promoted_bycatch: Bitboard,
    /// 爆発で消えた、成り前の駒を持たない成り駒
    pub demoted_bycatch: Bitboard,
    /// 前の局面のインデックス（状態スタック内）
    pub previous: Option<usize>,
    /// pin駒 [Color]（自玉へのピン）
    pub blockers_for_king: [Bitboard; Color::NUM],
    /// pinしている駒 [Color]
    pub pinners: [Bitboard; Color::NUM],
    /// 王手となる升 [PieceType]
    pub check_squares: [Bitboard; PIECE_TYPE_NB],
    /// 捕獲した駒
    pub captured_piece: Piece,
    /// 捕獲したマス（e.p. では移動先と異なる）
    pub capture_square: Option<Square>,
    /// 成った駒の元の駒
    pub promotion_pawn: Piece,
    /// 走り以外で遠くに利く駒（ホッパー・足を塞がれる跳び）
    pub non_sliding_riders: Bitboard,
    /// 裏返した駒
    pub flipped_pieces: Bitboard,
    /// 疑似王の候補
    pub pseudo_royal_candidates: Bitboard,
    /// 疑似王
    pub pseudo_royals: Bitboard,
    /// 合法な取る手があるか（未計算は None）
    pub legal_capture: Cell<Option<bool>>,
    /// 取った駒が成り駒だったか
    pub captured_promoted: bool,
    /// シャタルの shak（詰みに数える王手）
    pub shak: bool,
    /// 王同士が向かい合っている（チャンギの bikjang）
    pub bikjang: bool,
    /// 追いかけている相手の駒
    pub chased: Bitboard,
    /// パスで作られた局面か
    pub pass: bool,
    /// この局面を作った指し手
    pub mv: Move,
    /// 同一局面までの距離（0 はなし、負は繰り返しの繰り返し）
    pub repetition: i32,
    /// 移動で消えたゲートの駒種
    pub removed_gating_type: Option<PieceType>,
    /// キャスリングのルーク側で消えたゲートの駒種
    pub removed_castling_gating_type: Option<PieceType>,
    /// 取られたゲートの駒種
    pub captured_gating_type: Option<PieceType>,
}

impl StateInfo {
    /// 新しい状態を生成
    pub fn new() -> Self {
        StateInfo {
            pawn_key: zobrist_no_pawns(),
            material_key: 0,
            castling_rights: 0,
            rule50: 0,
            plies_from_null: 0,
            counting_ply: 0,
            counting_limit: 0,
            points_count: [0; Color::NUM],
            checks_remaining: [0; Color::NUM],
            ep_squares: Bitboard::EMPTY,
            castling_king_square: [None; Color::NUM],
            wall_squares: Bitboard::EMPTY,
            gates: [Bitboard::EMPTY; Color::NUM],
            key: 0,
            sudoku_conflicts: [0; Color::NUM],
            checkers: Bitboard::EMPTY,
            unpromoted_captured_piece: Piece::NONE,
            unpromoted_bycatch: [Piece::NONE; SQUARE_NB],
            promoted_bycatch: Bitboard::EMPTY,
            demoted_bycatch: Bitboard::EMPTY,
            previous: None,
            blockers_for_king: [Bitboard::EMPTY; Color::NUM],
            pinners: [Bitboard::EMPTY; Color::NUM],
            check_squares: [Bitboard::EMPTY; PIECE_TYPE_NB],
            captured_piece: Piece::NONE,
            capture_square: None,
            promotion_pawn: Piece::NONE,
            non_sliding_riders: Bitboard::EMPTY,
            flipped_pieces: Bitboard::EMPTY,
            pseudo_royal_candidates: Bitboard::EMPTY,
            pseudo_royals: Bitboard::EMPTY,
            legal_capture: Cell::new(None),
            captured_promoted: false,
            shak: false,
            bikjang: false,
            chased: Bitboard::EMPTY,
            pass: false,
            mv: Move::NONE,
            repetition: 0,
            removed_gating_type: None,
            removed_castling_gating_type: None,
            captured_gating_type: None,
        }
    }

    /// do_move用の部分コピー
    ///
    /// コピー対象のフィールドだけを引き継ぎ、残りは初期値にする。
    /// ハッシュキーは差分更新の起点として引き継ぐ。
    pub fn partial_clone(&self) -> Self {
        StateInfo {
            pawn_key: self.pawn_key,
            material_key: self.material_key,
            castling_rights: self.castling_rights,
            rule50: self.rule50,
            plies_from_null: self.plies_from_null,
            counting_ply: self.counting_ply,
            counting_limit: self.counting_limit,
            points_count: self.points_count,
            checks_remaining: self.checks_remaining,
            ep_squares: self.ep_squares,
            castling_king_square: self.castling_king_square,
            wall_squares: self.wall_squares,
            gates: self.gates,
            // 以下は再計算される
            key: self.key,
            ..StateInfo::new()
        }
    }
}

impl Default for StateInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_info_new() {
        let state = StateInfo::new();
        assert_eq!(state.key, 0);
        assert_eq!(state.material_key, 0);
        assert_eq!(state.pawn_key, zobrist_no_pawns());
        assert!(state.checkers.is_empty());
        assert!(state.previous.is_none());
        assert_eq!(state.legal_capture.get(), None);
    }

    #[test]
    fn test_state_info_partial_clone() {
        let mut state = StateInfo::new();
        state.material_key = 100;
        state.rule50 = 7;
        state.plies_from_null = 5;
        state.checks_remaining = [3, 2];
        state.points_count = [4, 9];
        state.key = 0xABCD;
        state.checkers = Bitboard::from_square(Square::parse("e1").unwrap());
        state.repetition = 4;
        state.previous = Some(3);
        state.legal_capture.set(Some(true));

        let cloned = state.partial_clone();
        assert_eq!(cloned.material_key, 100);
        assert_eq!(cloned.rule50, 7);
        assert_eq!(cloned.plies_from_null, 5);
        assert_eq!(cloned.checks_remaining, [3, 2]);
        assert_eq!(cloned.points_count, [4, 9]);
        assert_eq!(cloned.key, 0xABCD);
        assert!(cloned.checkers.is_empty());
        assert_eq!(cloned.repetition, 0);
        assert!(cloned.previous.is_none());
        assert_eq!(cloned.legal_capture.get(), None);
    }
}
