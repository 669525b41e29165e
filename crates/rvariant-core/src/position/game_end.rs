//! 終局判定
//!
//! - `is_immediate_game_end`: 指し手生成の前に確定する終局（絶滅・旗・連結など）
//! - `is_optional_game_end`: 宣言で成立する引き分けや反則（N 手ルール・千日手・数え手）
//!
//! どちらも値は手番側から見たもの。詰み・ステイルメイトは合法手が無いときに
//! `checkmate_value` / `stalemate_value` で評価する。

use std::collections::VecDeque;

use super::Position;
use crate::bitboard::{Bitboard, line_bb};
use crate::movegen::MoveList;
use crate::types::{
    CastlingRights, Color, KING_SIDE, Move, MoveType, PieceType, QUEEN_SIDE, Value, castling_rights_of,
};
use crate::variant::{ChasingRule, CountingRule, MaterialCounting};

/// 仮想駒で詰ませたときの基準値
const VIRTUAL_MATE: i32 = 3000;

/// 数え手で盤の名誉が使われるときの上限（カンボジアルール）
const BOARD_HONOR_LIMIT: i32 = 126;

/// 駒を 1 方向へ動かしたビットボード
fn shift_by(b: Bitboard, (df, dr): (i32, i32)) -> Bitboard {
    b.iter().filter_map(|s| s.offset(df, dr)).collect()
}

/// 直前の手の移動先にある駒を移動元へ戻したビットボード
fn undo_move_board(b: Bitboard, m: Move) -> Bitboard {
    if m == Move::NULL || m == Move::NONE || !b.contains(m.to()) {
        return b;
    }
    if m.is_drop() { b ^ m.to() } else { (b ^ m.to()) | m.from() }
}

/// 逆向きの手
fn reverse_move(m: Move) -> Move {
    Move::normal(m.to(), m.from())
}

impl Position {
    /// 2 つ前の状態
    fn back2(&self, idx: Option<usize>) -> Option<usize> {
        idx.and_then(|i| self.state_at(i).previous).and_then(|i| self.state_at(i).previous)
    }

    /// 1 つ前の状態
    fn back1(&self, idx: Option<usize>) -> Option<usize> {
        idx.and_then(|i| self.state_at(i).previous)
    }

    fn has_checkers_at(&self, idx: Option<usize>) -> bool {
        idx.is_some_and(|i| self.state_at(i).checkers.is_not_empty())
    }

    /// 合法手が無くても決まる終局
    ///
    /// 合法手生成から呼ばれるので、ここで合法手を生成してはいけない。
    pub fn is_immediate_game_end(&self, ply: i32) -> Option<Value> {
        let var = &*self.var;
        let st = self.state();
        let us = self.side_to_move;
        let them = !us;

        // 絶滅（疑似王は取られないので爆発がなければ対象外）
        if var.extinction_enabled() && (!var.extinction_pseudo_royal || var.blast_on_capture) {
            let value = var.extinction_value.convert_mate_value(ply);
            for c in [them, us] {
                let claim = i32::from(var.extinction_claim && c == us);
                for pt in var.extinction_piece_types.iter() {
                    if self.count_with_hand(c, pt) <= var.extinction_piece_count
                        && self.count_with_hand(!c, pt) >= var.extinction_opponent_piece_count + claim
                    {
                        return Some(if c == us { value } else { -value });
                    }
                }
                if var.extinction_all_pieces
                    && self.count_all(c) + self.count_in_hand_all(c) <= var.extinction_piece_count
                    && self.count_all(!c) + self.count_in_hand_all(!c) >= var.extinction_opponent_piece_count + claim
                {
                    return Some(if c == us { value } else { -value });
                }
            }
        }

        // 旗取り：手番側の勝ちは 1 手の猶予があるルールで前の手番に到達していたときだけ
        if var.flag_move && self.flag_reached(us) {
            return Some(if us == Color::White && self.flag_reached(Color::Black) {
                Value::DRAW
            } else {
                Value::mate_in(ply)
            });
        }
        if (!var.flag_move || var.flag_piece(us) == Some(PieceType::King)) && self.flag_reached(them) {
            if !(var.flag_move && us == Color::Black && self.king_can_reach_flag(us)) {
                return Some(Value::mated_in(ply));
            }
        }

        // キャスリングで勝ち
        if var.castling_wins != 0 {
            if st.plies_from_null > 0 && st.mv.move_type() == MoveType::Castling {
                let side: CastlingRights = if st.mv.from() < st.mv.to() { KING_SIDE } else { QUEEN_SIDE };
                if var.castling_wins & castling_rights_of(them) & side != 0 {
                    return Some(Value::mated_in(ply));
                }
            }
            // ルールで勝ちになる権利を失った側の負け（相手側から見る）
            for c in [them, us] {
                let wins = castling_rights_of(c) & var.castling_wins;
                if wins != 0 && wins & st.castling_rights == 0 {
                    return Some(if c == us { Value::mated_in(ply) } else { Value::mate_in(ply) });
                }
            }
        }

        // N 回王手
        if var.check_counting && self.checks_remaining(them) == 0 {
            return Some(Value::mated_in(ply));
        }

        if var.points_counting {
            let (ours, theirs) = (self.points(us), self.points(them));
            if ours >= var.points_goal && theirs >= var.points_goal {
                if ours == theirs || var.points_goal_simul_value == Value::DRAW {
                    return Some(Value::DRAW);
                }
                let v = if theirs > ours { var.points_goal_simul_value } else { -var.points_goal_simul_value };
                return Some(v.convert_mate_value(ply));
            }
            if theirs >= var.points_goal {
                return Some(var.points_goal_value.convert_mate_value(ply));
            }
            if ours >= var.points_goal {
                return Some((-var.points_goal_value).convert_mate_value(ply));
            }
        }

        if self.connection_made() {
            return Some((-var.connect_value).convert_mate_value(ply));
        }

        // 対面の連続・パスの連続・盤が埋まった
        let double_event = st.plies_from_null > 0
            && self
                .previous_state()
                .is_some_and(|prev| (st.bikjang && prev.bikjang) || (st.pass && prev.pass));
        if double_event || (var.adjudicate_full_board && (self.board_bb() & !self.pieces()).is_empty()) {
            return Some(self.material_adjudication(ply));
        }

        if var.n_move_hard_limit_rule > 0 && self.game_ply >= var.n_move_hard_limit_rule {
            return Some(if var.material_counting != MaterialCounting::None {
                self.material_counting_result().convert_mate_value(ply)
            } else {
                var.n_move_hard_limit_rule_value.convert_mate_value(ply)
            });
        }

        // 仮想駒を使ったのに詰ませられなかった
        if var.two_boards && st.checkers.is_empty() && self.virtual_debt(them).0 > 0 {
            return Some(Value::mate_in(ply));
        }

        None
    }

    /// 手番側が宣言できる終局
    ///
    /// `count_started` は数え手を始めた手数（0 は局面の値、負は数えない）。
    pub fn is_optional_game_end(&self, ply: i32, count_started: i32) -> Option<Value> {
        let var = &*self.var;
        let st = self.state();
        let has_legal = || st.checkers.is_empty() || !MoveList::legal(self).is_empty();

        // N 手ルール
        if var.n_move_rule != 0 && st.rule50 > 2 * var.n_move_rule - 1 && has_legal() {
            let offset = if var.chasing_rule == ChasingRule::Axf && st.plies_from_null >= 20 {
                self.check_streak_offset()
            } else {
                0
            };
            if st.rule50 - offset > 2 * var.n_move_rule - 1 {
                return Some(self.material_adjudication(ply));
            }
        }

        if var.n_fold_rule != 0
            && let Some(v) = self.n_fold_result(ply)
        {
            return Some(v);
        }

        // 数え手
        if var.counting_rule != CountingRule::None
            && st.counting_limit != 0
            && self.counting_ply(count_started) > self.counting_limit_at(count_started)
            && has_legal()
        {
            return Some(Value::DRAW);
        }

        // シットゥインの成りしか指せない局面
        let us = self.side_to_move;
        if var.sittuyin_promotion
            && self.count_all(us) == 2
            && self.count(us, PieceType::Pawn) == 1
            && st.checkers.is_empty()
            && MoveList::legal(self).iter().all(|m| m.move_type() == MoveType::Promotion)
        {
            return Some(Value::DRAW);
        }

        None
    }

    /// 詰まされた側（手番）から見た値
    pub fn checkmate_value(&self, ply: i32) -> Value {
        let var = &*self.var;
        let st = self.state();

        // 打ち歩詰め
        if var.shogi_pawn_drop_mate_illegal
            && (st.checkers & !self.pieces_pt(PieceType::ShogiPawn)).is_empty()
            && st.captured_piece.is_none()
            && st.plies_from_null > 0
            && self.previous_state().is_some_and(|prev| prev.material_key != st.material_key)
        {
            return Value::mate_in(ply);
        }

        if var.shatar_mate_rule {
            // 馬だけの詰みは無効
            if (st.checkers & !self.pieces_pt(PieceType::Knight)).is_empty() {
                return Value::mate_in(ply);
            }
            // 連続王手の中に shak があれば詰み
            let mut idx = Some(self.state_index());
            while let Some(i) = idx {
                let stp = self.state_at(i);
                if stp.checkers.is_empty() {
                    break;
                }
                if stp.shak {
                    return var.checkmate_value.convert_mate_value(ply);
                }
                if stp.plies_from_null < 2 {
                    break;
                }
                idx = self.back2(idx);
            }
            return Value::DRAW;
        }

        if var.two_boards && var.checkmate_value < Value::ZERO {
            let (_, material) = self.virtual_debt(!self.side_to_move);
            if material > 0 {
                return Value::new(-VIRTUAL_MATE + material / 20 + ply);
            }
        }

        var.checkmate_value.convert_mate_value(ply)
    }

    /// 合法手の無い（王手されていない）手番側から見た値
    pub fn stalemate_value(&self, ply: i32) -> Value {
        let var = &*self.var;
        let us = self.side_to_move;
        if var.stalemate_piece_count {
            let diff = self.count_all(us) - self.count_all(!us);
            return match diff.cmp(&0) {
                std::cmp::Ordering::Equal => Value::DRAW,
                std::cmp::Ordering::Less => var.stalemate_value.convert_mate_value(ply),
                std::cmp::Ordering::Greater => (-var.stalemate_value).convert_mate_value(ply),
            };
        }

        if var.extinction_pseudo_royal {
            let st = self.state();
            let theirs = st.pseudo_royals & self.pieces_c(!us);
            // 相手の疑似王と接していれば爆発で取られない
            let exposed = |s| {
                !(var.blast_on_capture && (theirs & self.blast_pattern(s)).is_not_empty())
                    && self.attackers_to(s, !us).is_not_empty()
            };
            if (st.pseudo_royals & self.pieces_c(us)).iter().any(exposed) {
                return var.checkmate_value.convert_mate_value(ply);
            }
            if var.duple_check {
                let candidates = st.pseudo_royal_candidates & self.pieces_c(us);
                if candidates.is_not_empty() && candidates.iter().all(exposed) {
                    return var.checkmate_value.convert_mate_value(ply);
                }
            }
        }

        var.stalemate_value.convert_mate_value(ply)
    }

    /// 数える側 `c` の数え手の上限（全手数、0 は数えない）
    pub fn count_limit(&self, c: Color) -> i32 {
        let them = !c;
        let pawns = self.count_pt(PieceType::Pawn);
        let rooks = self.count(them, PieceType::Rook);
        let khons = self.count(them, PieceType::Silver);
        let knights = self.count(them, PieceType::Knight);

        match self.var.counting_rule {
            CountingRule::Makruk => {
                if pawns > 0 || self.count_all(them) == 1 {
                    0
                } else if self.count_all(c) > 1 {
                    // 盤の名誉
                    64
                } else if rooks > 1 {
                    8
                } else if rooks == 1 {
                    16
                } else if khons > 1 {
                    22
                } else if knights > 1 {
                    32
                } else if khons == 1 {
                    44
                } else {
                    64
                }
            }
            CountingRule::Cambodian => {
                if self.count_all(c) > 3 || self.count_all(them) == 1 {
                    0
                } else if self.count_all(c) > 1 {
                    63
                } else if pawns > 0 {
                    0
                } else if rooks > 1 {
                    7
                } else if rooks == 1 {
                    15
                } else if khons > 1 {
                    21
                } else if knights > 1 {
                    31
                } else if khons == 1 {
                    43
                } else {
                    63
                }
            }
            CountingRule::Asean => {
                if pawns > 0 || self.count_all(c) > 1 {
                    0
                } else if rooks > 0 {
                    16
                } else if khons > 0 {
                    44
                } else if knights > 0 {
                    64
                } else {
                    0
                }
            }
            CountingRule::None => 0,
        }
    }

    /// 盤の名誉による数え手の手数
    fn board_honor_counting_ply(&self, count_started: i32) -> i32 {
        match count_started.cmp(&0) {
            std::cmp::Ordering::Equal => self.state().counting_ply,
            std::cmp::Ordering::Less => 0,
            std::cmp::Ordering::Greater => (1 + self.game_ply - count_started).max(0),
        }
    }

    fn board_honor_counting_shorter(&self, count_started: i32) -> bool {
        let st = self.state();
        self.var.counting_rule == CountingRule::Cambodian
            && BOARD_HONOR_LIMIT - self.board_honor_counting_ply(count_started) < st.counting_limit - st.counting_ply
    }

    /// 数え手の上限（半手単位）
    pub fn counting_limit_at(&self, count_started: i32) -> i32 {
        if self.board_honor_counting_shorter(count_started) {
            BOARD_HONOR_LIMIT
        } else {
            self.state().counting_limit
        }
    }

    /// 数え手の現在の手数（半手単位）
    pub fn counting_ply(&self, count_started: i32) -> i32 {
        let pieces_honor = self.count_pt(PieceType::Pawn) == 0
            && (self.count_all(Color::White) <= 1 || self.count_all(Color::Black) <= 1);
        if pieces_honor && !self.board_honor_counting_shorter(count_started) {
            self.state().counting_ply
        } else {
            self.board_honor_counting_ply(count_started)
        }
    }

    /// 駒数判定がある場合はその結果、なければ引き分け
    fn material_adjudication(&self, ply: i32) -> Value {
        if self.var.material_counting != MaterialCounting::None {
            self.material_counting_result().convert_mate_value(ply)
        } else {
            Value::DRAW
        }
    }

    /// `c` が借りている仮想駒の（枚数, 価値）
    fn virtual_debt(&self, c: Color) -> (i32, i32) {
        self.var.piece_types.iter().fold((0, 0), |(n, v), pt| {
            let debt = (-self.count_in_hand(c, pt)).max(0);
            (n + debt, v + debt * pt.value())
        })
    }

    /// `c` の旗駒が旗の領域に到達しているか
    fn flag_reached(&self, c: Color) -> bool {
        let var = &*self.var;
        let Some(flag_piece) = var.flag_piece(c) else {
            return false;
        };
        let region = var.flag_region(c);
        let in_zone = region & self.pieces_cp(c, flag_piece);
        let reached = in_zone.is_not_empty()
            && (in_zone.count() as i32 >= var.flag_piece_count
                || (var.flag_piece_blocked_win && (region & !self.pieces()).is_empty()));
        if !reached || !var.flag_piece_safe {
            return reached;
        }

        // 取られる駒は数えない。余分が 2 枚以上あれば調べない
        let mut potential = in_zone.count() as i32;
        if potential >= var.flag_piece_count + 1 {
            return true;
        }
        for s in in_zone {
            let capturable = self.attackers_to(s, !c).iter().any(|a| {
                self.side_to_move != !c || self.legal(Move::normal(a, s))
            });
            if capturable {
                potential -= 1;
                break;
            }
        }
        potential >= var.flag_piece_count
    }

    /// レーシングキングで後手の王が旗の段へ合法に進めるか
    fn king_can_reach_flag(&self, us: Color) -> bool {
        let region = self.var.flag_region(us);
        let Some(ksq) = self.king_square(us) else {
            return false;
        };
        if self.state().checkers.is_not_empty() || (region & self.attacks_from(us, PieceType::King, ksq)).is_empty() {
            return false;
        }
        MoveList::pseudo(self).iter().any(|&m| {
            self.moved_piece(m).piece_type() == Some(PieceType::King) && region.contains(m.to()) && self.legal(m)
        })
    }

    /// 直前に指した側が駒を連結させたか
    fn connection_made(&self) -> bool {
        let var = &*self.var;
        let them = !self.side_to_move;
        let connect = self.pieces_set(var.connect_piece_types_trimmed) & self.pieces_c(them);
        let dirs = &var.connect_directions;
        let both_senses = || dirs.iter().flat_map(|&(df, dr)| [(df, dr), (-df, -dr)]);

        // N 目並べ
        if var.connect_n > 0 && connect.count() as i32 >= var.connect_n {
            for &d in dirs {
                let mut b = connect;
                for _ in 1..var.connect_n {
                    if b.is_empty() {
                        break;
                    }
                    b &= shift_by(b, d);
                }
                if b.is_not_empty() {
                    return true;
                }
            }
        }

        // 2 つの領域をつなぐ
        let (region1, region2) = (var.connect_region1(them), var.connect_region2(them));
        if (region1 & connect).is_not_empty() && (region2 & connect).is_not_empty() {
            let mut current = region1 & connect;
            loop {
                if (current & region2).is_not_empty() {
                    return true;
                }
                let grown = both_senses().fold(current, |acc, d| acc | (shift_by(acc, d) & connect));
                if (grown & !current).is_empty() {
                    break;
                }
                current = grown;
            }
        }

        // N x N の正方形
        let n = var.connect_nxn;
        if n > 0 && connect.count() as i32 >= n * n {
            let mut corners = connect;
            for _ in 1..n {
                if corners.is_empty() {
                    break;
                }
                corners &= shift_by(corners, (0, -1)) & shift_by(corners, (1, 0)) & shift_by(corners, (1, -1));
            }
            if corners.is_not_empty() {
                return true;
            }
        }

        // 同一直線上に N 個（連続していなくてよい）
        if var.collinear_n > 0 && connect.count() as i32 >= var.collinear_n {
            for s in connect {
                for &(df, dr) in dirs {
                    let Some(next) = s.offset(df, dr) else { continue };
                    if (line_bb(s, next) & connect).count() as i32 >= var.collinear_n {
                        return true;
                    }
                }
            }
        }

        // N 個以上のつながった群（-1 は全駒）
        if var.connect_group != 0 {
            let own = self.pieces_c(them);
            let target = if var.connect_group == -1 { own.count() as i32 } else { var.connect_group };
            if target > 0 && own.count() as i32 >= target {
                let mut visited = Bitboard::EMPTY;
                while let Some(start) = (own & !visited).lsb() {
                    visited |= start;
                    let mut queue = VecDeque::from([start]);
                    let mut size = 0;
                    while let Some(s) = queue.pop_front() {
                        size += 1;
                        for (df, dr) in both_senses() {
                            if let Some(next) = s.offset(df, dr)
                                && own.contains(next)
                                && !visited.contains(next)
                            {
                                visited |= next;
                                queue.push_back(next);
                            }
                        }
                    }
                    if size >= target {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// シャンチーの N 手ルールで連続王手を差し引く手数
    fn check_streak_offset(&self) -> i32 {
        let st = self.state();
        let end = st.rule50.min(st.plies_from_null);
        let mut idx = Some(self.state_index());
        let mut check_them = i32::from(self.has_checkers_at(idx));
        let mut check_us = i32::from(self.has_checkers_at(self.back1(idx)));
        let mut i = 2;
        while i < end {
            idx = self.back2(idx);
            if idx.is_none() {
                break;
            }
            check_them += i32::from(self.has_checkers_at(idx));
            check_us += i32::from(self.has_checkers_at(self.back1(idx)));
            i += 2;
        }
        2 * (check_them.max(check_us) - 10).max(0)
    }

    /// N 回の同一局面（長王手・長捉・チャンギの往復を含む）
    fn n_fold_result(&self, ply: i32) -> Option<Value> {
        let var = &*self.var;
        let st = self.state();
        let end = if var.captures_to_hand() { st.plies_from_null } else { st.rule50.min(st.plies_from_null) };
        if end < 4 {
            return None;
        }

        let cur = Some(self.state_index());
        let prev_idx = self.back1(cur)?;
        let prev = self.state_at(prev_idx);
        let mut stp_idx = self.back2(cur)?;
        let mut stp = self.state_at(stp_idx);
        let stp_prev = self.back1(Some(stp_idx)).map(|i| self.state_at(i));

        let mut perpetual_them = var.perpetual_check_illegal && st.checkers.is_not_empty() && stp.checkers.is_not_empty();
        let mut perpetual_us = var.perpetual_check_illegal
            && prev.checkers.is_not_empty()
            && stp_prev.is_some_and(|s| s.checkers.is_not_empty());
        let mut chase_them = undo_move_board(st.chased, prev.mv) & stp.chased;
        let mut chase_us = undo_move_board(prev.chased, stp.mv) & stp_prev.map_or(Bitboard::EMPTY, |s| s.chased);

        // チャンギ：同じ駒の往復
        let us = self.side_to_move;
        let mut move_repetition = 0;
        if var.move_repetition_illegal
            && st.mv.move_type() == MoveType::Normal
            && prev.checkers.is_empty()
            && stp_prev.is_some_and(|s| s.checkers.is_empty())
            && let Some(moved) = self.piece_on(st.mv.to()).piece_type()
            && (self.board_bb_for(!us, moved) & self.board_bb_for(us, PieceType::King)).is_not_empty()
        {
            move_repetition = if stp.mv == reverse_move(st.mv) {
                2
            } else if stp.mv.is_pass() {
                1
            } else {
                0
            };
        }

        let mut cnt = 0;
        let mut i = 4;
        while i <= end {
            let stp_back2 = self.back2(Some(stp_idx));
            if move_repetition > 0 {
                let back3 = self.back1(stp_back2);
                if i < end && self.has_checkers_at(back3) {
                    move_repetition = 0;
                } else if let Some(b2) = stp_back2.map(|j| self.state_at(j)) {
                    if move_repetition < 4 {
                        let reference = if move_repetition == 1 { st.mv } else { stp.mv };
                        if b2.mv == reverse_move(reference) {
                            move_repetition += 1;
                        } else {
                            move_repetition = 0;
                        }
                    } else if b2.captured_piece.is_none() && stp.mv.from() == b2.mv.to() {
                        return Some(Value::mate_in(ply));
                    } else {
                        move_repetition = 0;
                    }
                } else {
                    move_repetition = 0;
                }
            }

            // 根の局面には追いかけの情報が無い
            if i != st.plies_from_null
                && let Some(b2) = stp_back2
            {
                let stp_prev_mv = self.back1(Some(stp_idx)).map_or(Move::NONE, |j| self.state_at(j).mv);
                chase_them = undo_move_board(chase_them, stp_prev_mv) & self.state_at(b2).chased;
            }

            let Some(next) = stp_back2 else { break };
            stp_idx = next;
            stp = self.state_at(stp_idx);
            perpetual_them &= stp.checkers.is_not_empty();

            // 根より後で 1 回、根以前なら N-1 回の繰り返しで成立
            if stp.key == st.key {
                cnt += 1;
                let quick = ply > i
                    && move_repetition == 0
                    && chase_us.is_empty()
                    && chase_them.is_empty()
                    && !perpetual_us
                    && !perpetual_them;
                if cnt + 1 >= if quick { 2 } else { var.n_fold_rule } {
                    let raw = if perpetual_them || perpetual_us {
                        decisive(perpetual_them, perpetual_us)
                    } else if chase_them.is_not_empty() || chase_us.is_not_empty() {
                        decisive(chase_them.is_not_empty(), chase_us.is_not_empty())
                    } else if var.n_fold_value_absolute && us == Color::Black {
                        -var.n_fold_value
                    } else {
                        var.n_fold_value
                    };
                    let result = raw.convert_mate_value(ply);
                    if result == Value::DRAW && var.material_counting != MaterialCounting::None {
                        return Some(self.material_counting_result().convert_mate_value(ply));
                    }
                    return Some(result);
                }
            }

            if i < end {
                let sp = self.back1(Some(stp_idx)).map(|j| self.state_at(j));
                perpetual_us &= sp.is_some_and(|s| s.checkers.is_not_empty());
                chase_us = undo_move_board(chase_us, stp.mv) & sp.map_or(Bitboard::EMPTY, |s| s.chased);
            }
            i += 2;
        }
        None
    }
}

/// 片方だけが反則を続けていればその側の負け
fn decisive(them: bool, us: bool) -> Value {
    match (them, us) {
        (true, false) => Value::MATE,
        (false, true) => -Value::MATE,
        _ => Value::DRAW,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::Square;
    use crate::variant::Variant;

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        Position::set(Arc::new(Variant::preset(variant).unwrap()), fen, false).unwrap()
    }

    fn play(p: &mut Position, from: &str, to: &str) {
        let m = Move::normal(Square::parse(from).unwrap(), Square::parse(to).unwrap());
        let gc = p.gives_check(m);
        p.do_move(m, gc);
    }

    #[test]
    fn test_startpos_is_not_over() {
        for name in ["chess", "3check", "kingofthehill", "connect4", "makruk", "xiangqi"] {
            crate::init();
            let p = Position::startpos(Arc::new(Variant::preset(name).unwrap())).unwrap();
            assert_eq!(p.is_immediate_game_end(0), None, "{name}");
            assert_eq!(p.is_optional_game_end(0, 0), None, "{name}");
        }
    }

    #[test]
    fn test_three_check_exhausted() {
        let p = pos("3check", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0+3 0 1");
        assert_eq!(p.is_immediate_game_end(2), Some(Value::mated_in(2)));
    }

    #[test]
    fn test_extinction_of_queen() {
        // 黒の女王が絶滅した
        let p = pos("extinction", "rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert_eq!(p.is_immediate_game_end(0), Some(Value::mate_in(0)));
    }

    #[test]
    fn test_king_of_the_hill() {
        let p = pos("kingofthehill", "4k3/8/8/8/4K3/8/8/8 b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), Some(Value::mated_in(0)));
        let p = pos("kingofthehill", "4k3/8/8/8/8/4K3/8/8 b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), None);
    }

    #[test]
    fn test_racing_kings_black_reply() {
        // 黒がまだ 8 段目に届くなら終わらない
        let p = pos("racingkings", "K7/6k1/8/8/8/8/8/8 b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), None);
        let p = pos("racingkings", "K7/8/8/8/8/8/8/6k1 b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), Some(Value::mated_in(0)));
    }

    #[test]
    fn test_connect_four_in_a_row() {
        let p = pos("connect4", "7/7/7/7/ppp4/PPPP3[PPPPpppp] b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), Some(Value::mated_in(0)));
        let p = pos("connect4", "7/7/7/7/ppp4/PPP1P2[PPPPpppp] b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), None);
    }

    #[test]
    fn test_tictactoe_diagonal() {
        let p = pos("tictactoe", "P1p/1Pp/2P[PPpp] b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), Some(Value::mated_in(0)));
        let p = pos("tictactoe", "P1p/1P1/p2[PPpp] b - - 0 1");
        assert_eq!(p.is_immediate_game_end(0), None);
    }

    #[test]
    fn test_fifty_move_rule() {
        let p = pos("chess", "4k3/8/8/8/8/8/8/R3K3 w - - 100 80");
        assert_eq!(p.is_optional_game_end(0, 0), Some(Value::DRAW));
        let p = pos("chess", "4k3/8/8/8/8/8/8/R3K3 w - - 99 80");
        assert_eq!(p.is_optional_game_end(0, 0), None);
    }

    #[test]
    fn test_threefold_repetition() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("chess").unwrap())).unwrap();
        let dance = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
        for (f, t) in dance {
            play(&mut p, f, t);
        }
        // 根より後の 1 回の繰り返しは探索中なら引き分け
        assert_eq!(p.is_optional_game_end(0, 0), None);
        assert_eq!(p.is_optional_game_end(5, 0), Some(Value::DRAW));
        for (f, t) in dance {
            play(&mut p, f, t);
        }
        assert_eq!(p.is_optional_game_end(0, 0), Some(Value::DRAW));
    }

    #[test]
    fn test_makruk_count_limits() {
        let p = pos("makruk", "8/8/8/3k4/8/8/8/R2K4 w - - 0 1");
        // 黒は王だけ、白は車 1 枚
        assert_eq!(p.count_limit(Color::Black), 16);
        assert_eq!(p.count_limit(Color::White), 0);
        let p = pos("makruk", "8/8/8/3k4/8/8/8/S2KS3 w - - 0 1");
        assert_eq!(p.count_limit(Color::Black), 22);
    }

    #[test]
    fn test_mate_and_stalemate_values() {
        let p = pos("chess", "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(p.checkmate_value(3), Value::mated_in(3));
        assert_eq!(p.stalemate_value(3), Value::DRAW);
    }

    #[test]
    fn test_reversi_full_board_counts_pieces() {
        let fen = "PPPPPPPP/PPPPPPPP/PPPPPPPP/PPPPPPPP/pppppppp/pppppppp/pppppppp/ppppppPP[] b - - 0 1";
        let p = pos("reversi", fen);
        // 白が多いので黒（手番）の負け
        assert_eq!(p.is_immediate_game_end(0), Some(-Value::MATE));
    }
}
