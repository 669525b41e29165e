//! 指し手の合法性
//!
//! - `pseudo_legal`: 置換表などから得た手が生成されうる手かを確かめる
//! - `legal`: 疑似合法手が自玉・疑似王を危険にさらさないか、ルールの制約を満たすかを確かめる
//! - `gives_check`: 疑似合法手が王手になるか

use super::Position;
use crate::bitboard::{
    Bitboard, DARK_SQUARES, attacks_bb, between_bb, cannon_diagonal_attacks, is_asymmetric,
    is_hopper, leaper_attacks, moves_bb, pawn_attacks, pseudo_attacks, pseudo_moves,
};
use crate::movegen::MoveList;
use crate::types::{File, Move, MoveType, PieceType, Rank, Square};
use crate::variant::WallingRule;

impl Position {
    /// 疑似合法手か
    ///
    /// 生成器が作らない手は必ず弾く。珍しい種類の手は生成結果と照合する。
    pub fn pseudo_legal(&self, m: Move) -> bool {
        if !m.is_ok() {
            return false;
        }
        let var = &*self.var;
        let us = self.side_to_move;
        let (from, to) = (m.from(), m.to());
        let pc = self.moved_piece(m);

        // 盤外と壁
        if !self.board_bb().contains(to) {
            return false;
        }

        if m.is_drop() {
            let (Some(hand_pt), Some(pt)) = (m.in_hand_piece_type(), m.dropped_piece_type()) else {
                return false;
            };
            return var.piece_drops
                && (self.can_drop(us, hand_pt) || (var.two_boards && self.allow_virtual_drop(us, pt)))
                && (self.drop_region_for(us, pt) & !self.pieces()).contains(to)
                && (pt == hand_pt || (var.drop_promoted && var.promoted_piece_type(hand_pt) == Some(pt)));
        }

        if m.move_type() != MoveType::Normal || m.is_gating() {
            return MoveList::pseudo(self).contains(m);
        }

        if pc.is_none() || pc.color() != us {
            return false;
        }
        let Some(pt) = pc.piece_type() else { return false };

        if var.walling() && !self.wall_placement_ok(m) {
            return false;
        }

        // 強制の成り・戻りを選ばない手
        if var.mandatory_piece_promotion
            && (if self.is_promoted(from) {
                var.piece_demotion
            } else {
                var.promoted_piece_type(pt).is_some()
            })
            && (self.promotion_zone(us) & (Bitboard::from_square(from) | to)).is_not_empty()
            && (!var.piece_promotion_on_capture || self.capture(m))
        {
            return false;
        }

        if m.promotion_type().is_some() {
            return false;
        }

        if self.pieces_c(us).contains(to) {
            return false;
        }

        if pt == PieceType::Pawn {
            // 成りは処理済みなので、成れる段への手は成らない手
            if var.mandatory_pawn_promotion && self.promotion_zone(us).contains(to) && !var.sittuyin_promotion {
                return false;
            }
            let push = us.sign();
            let empty = |s: Option<Square>| s.is_some_and(|s| !self.pieces().contains(s));
            let capture = (pawn_attacks(us, from) & self.pieces_c(!us)).contains(to);
            let single = from.offset(0, push) == Some(to) && empty(Some(to));
            let double = from.offset(0, 2 * push) == Some(to)
                && var.double_step_region(us).contains(from)
                && empty(Some(to))
                && empty(to.offset(0, -push));
            let triple = from.offset(0, 3 * push) == Some(to)
                && var.triple_step_region(us).contains(from)
                && empty(Some(to))
                && empty(to.offset(0, -push))
                && empty(to.offset(0, -2 * push));
            if !(capture || single || double || triple) {
                return false;
            }
        } else {
            let targets = if self.capture(m) {
                self.attacks_from(us, pt, from)
            } else {
                self.moves_from(us, pt, from)
            };
            if !targets.contains(to) {
                return false;
            }
        }

        if pt == PieceType::JanggiCannon && (self.pieces_pt(PieceType::JanggiCannon) & between_bb(from, to)).is_not_empty() {
            return false;
        }

        // 王手回避の形（生成器と同じ手だけを通す）
        let checkers = self.checkers();
        if checkers.is_not_empty() && (checkers & self.state().non_sliding_riders).is_empty() {
            if pt != PieceType::King {
                if checkers.more_than_one() {
                    return false;
                }
                let (Some(checksq), Some(ksq)) = (checkers.lsb(), self.king_square(us)) else {
                    return true;
                };
                let leaper = self
                    .piece_on(checksq)
                    .piece_type()
                    .map(|cpt| leaper_attacks(!us, self.move_piece_type(cpt), checksq).contains(ksq))
                    .unwrap_or(false);
                if !between_bb(ksq, checksq).contains(to) || (leaper && !checkers.contains(to)) {
                    return false;
                }
            } else if self
                .attackers_to_by(to, self.pieces() ^ from, !us, self.pieces_pt(PieceType::JanggiCannon))
                .is_not_empty()
            {
                return false;
            }
        }
        true
    }

    /// 壁を置くマスが壁のルールに合っているか
    pub(crate) fn wall_placement_ok(&self, m: Move) -> bool {
        let var = &*self.var;
        let us = self.side_to_move;
        let (from, to, w) = (m.from(), m.to(), m.gating_square());
        let vacated = if m.is_drop() { Bitboard::EMPTY } else { Bitboard::from_square(from) };
        let after = (self.pieces() & !vacated) | to;
        if !(self.board_bb() & !after).contains(w)
            || !var.walling_region(us).contains(w)
            || self.wall_squares().contains(w)
        {
            return false;
        }
        match var.walling_rule {
            WallingRule::Arrow => self.moved_piece(m).piece_type().is_some_and(|pt| {
                moves_bb(us, self.move_piece_type(pt), to, self.pieces() & !vacated).contains(w)
            }),
            WallingRule::Past => from == w,
            WallingRule::Edge => {
                let walls = self.wall_squares();
                let edges = Bitboard::file(File::A)
                    | Bitboard::file(var.max_file)
                    | Bitboard::rank(Rank::R1)
                    | Bitboard::rank(var.max_rank);
                let valid = self.board_bb()
                    & (edges | walls.shift_north() | walls.shift_south() | walls.shift_east() | walls.shift_west());
                valid.contains(w)
            }
            WallingRule::Duck | WallingRule::None => true,
        }
    }

    /// 合法な取る手があるか（局面ごとにキャッシュする）
    pub fn has_capture(&self) -> bool {
        if let Some(found) = self.state().legal_capture.get() {
            return found;
        }
        let found = MoveList::pseudo(self).iter().any(|&m| self.capture(m) && self.legal(m));
        self.state().legal_capture.set(Some(found));
        found
    }

    /// 疑似合法手が合法手か
    pub fn legal(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        let var = &*self.var;
        let us = self.side_to_move;
        let them = !us;
        let from = m.from();
        let to = m.to();
        let mt = m.move_type();
        let pc = self.moved_piece(m);
        let Some(moved_pt) = pc.piece_type() else { return false };
        debug_assert_eq!(pc.color(), us);
        debug_assert!(self.board_bb().contains(to) || mt == MoveType::Castling);

        // 王手の禁止
        if (!var.checking
            || (var.sittuyin_promotion && mt == MoveType::Promotion)
            || (!var.drop_checks && mt == MoveType::Drop))
            && self.gives_check(m)
        {
            return false;
        }

        // 取る手の強制
        if var.must_capture && !self.capture(m) && self.has_capture() {
            return false;
        }

        // 数独の衝突を生む取る手
        if self.capture(m)
            && self.captured_piece_of(m).piece_type() != Some(PieceType::King)
            && (self.sudoku_conflicts(us) > 0 || self.move_adds_sudoku_conflicts(m))
        {
            return false;
        }

        // 打てるなら打たなければならない
        if var.must_drop {
            let in_hand = match var.must_drop_type {
                Some(pt) => self.count_in_hand(us, pt),
                None => self.count_in_hand_all(us),
            };
            if in_hand > 0 {
                if m.is_drop() {
                    if let Some(pt) = var.must_drop_type
                        && m.in_hand_piece_type() != Some(pt)
                    {
                        return false;
                    }
                } else if MoveList::pseudo(self).iter().any(|&d| d.is_drop() && self.legal(d)) {
                    return false;
                }
            }
        }

        // ビショップは異なる色のマスに打つ
        if var.drop_opposite_colored_bishop && m.is_drop() {
            let bishops = self.pieces_cp(us, PieceType::Bishop);
            let total = self.count_with_hand(us, PieceType::Bishop);
            if moved_pt != PieceType::Bishop {
                let remaining = self.drop_region_for(us, PieceType::Bishop) & !self.pieces() & !Bitboard::from_square(to);
                let dark = (DARK_SQUARES & (bishops | remaining)).count() as i32;
                let light = (!DARK_SQUARES & (bishops | remaining)).count() as i32;
                if dark < total / 2 || light < total / 2 {
                    return false;
                }
            } else {
                let same = if DARK_SQUARES.contains(to) { DARK_SQUARES } else { !DARK_SQUARES };
                if (same & bishops).count() as i32 + 1 > (total + 1) / 2 {
                    return false;
                }
            }
        }

        // 動けなくなる位置
        if var.immobility_illegal
            && matches!(mt, MoveType::Drop | MoveType::Normal)
            && (pseudo_moves(us, self.move_piece_type(moved_pt), to) & self.board_bb()).is_empty()
        {
            return false;
        }

        // ステイルメイト時だけのパス
        if var.pass_on_stalemate(us)
            && m.is_pass()
            && !self.in_check()
            && MoveList::pseudo(self).iter().any(|&o| !o.is_pass() && self.legal(o))
        {
            return false;
        }

        // 多手番ルール
        if var.multimove_offset != 0 {
            if m.is_pass() != var.multimove_pass_at(self.game_ply) {
                return false;
            }
            if var.multimove_pass_at(self.game_ply + 1)
                && ((!var.multimove_capture && self.capture(m)) || (!var.multimove_check && self.gives_check(m)))
            {
                return false;
            }
        }

        if var.extinction_pseudo_royal && !self.pseudo_royals_safe(m) {
            return false;
        }

        // 同種の駒を取れない駒
        if self.capture(m)
            && var.mutually_immune_types.contains(moved_pt)
            && self.piece_on(to).piece_type() == Some(moved_pt)
        {
            return false;
        }

        let jc = self.pieces_pt(PieceType::JanggiCannon);

        // e.p. は指した後の局面で確かめる
        if mt == MoveType::EnPassant
            && let Some(ksq) = self.king_square(us)
        {
            let capsq = self.capture_square(to);
            let occupied = (self.pieces() ^ from ^ capsq) | to;
            debug_assert!(self.ep_squares().contains(to));
            return (self.attackers_to_by(ksq, occupied, them, jc) & occupied).is_empty();
        }

        // キャスリングの経路の利きは生成時に見ていない
        if mt == MoveType::Castling {
            let king_side = to > from;
            let file = if king_side { var.castling_kingside_file } else { var.castling_queenside_file };
            let kto = Square::new(file, self.castling_rank(us));
            let rto = kto.offset(if king_side { -1 } else { 1 }, 0);

            if m.is_gating() && (m.gating_square() == kto || Some(m.gating_square()) == rto) {
                return false;
            }
            // 王でない駒は経路の利きを問わない
            if moved_pt != PieceType::King {
                return true;
            }
            let step = if kto > from { -1 } else { 1 };
            let mut s = Some(kto);
            while let Some(sq) = s
                && sq != from
            {
                if self.attackers_to(sq, them).is_not_empty()
                    || (var.flying_general
                        && (attacks_bb(them, PieceType::Rook, sq, self.pieces() ^ from) & self.pieces_cp(them, PieceType::King))
                            .is_not_empty())
                {
                    return false;
                }
                s = sq.offset(step, 0);
            }
            // 960 ではルークが利きを遮っていることがある
            return self.attackers_to_by(kto, self.pieces() ^ to, them, jc).is_empty();
        }

        let occupied = if mt != MoveType::Drop { self.pieces() ^ from } else { self.pieces() } | to;

        // 対面（bikjang）のときはパスできる
        if self.state().bikjang && m.is_pass() {
            return true;
        }
        if (var.flying_general && self.count(us, PieceType::King) > 0) || self.state().bikjang {
            let s = if moved_pt == PieceType::King { Some(to) } else { self.king_square(us) };
            if let Some(s) = s
                && (attacks_bb(them, PieceType::Rook, s, occupied)
                    & self.pieces_cp(them, PieceType::King)
                    & !Bitboard::from_square(to))
                .is_not_empty()
            {
                return false;
            }
        }

        // Makpong: 王手された王は王手している駒を取るしかない
        if var.makpong_rule && self.in_check() && moved_pt == PieceType::King && (self.checkers() ^ to).is_not_empty() {
            return false;
        }

        if moved_pt == PieceType::King {
            return self.attackers_to_by(to, occupied, them, jc).is_empty();
        }

        let Some(ksq) = self.king_square(us) else {
            return true;
        };

        let mut cannons = jc;
        if moved_pt == PieceType::JanggiCannon {
            cannons = if mt == MoveType::Drop { cannons } else { cannons ^ from } | to;
        } else if cannons.contains(to) {
            cannons ^= to;
        }
        (self.attackers_to_by(ksq, occupied, them, cannons) & !Bitboard::from_square(to)).is_empty()
    }

    /// 絶滅ルールの疑似王が指した後も取られないか
    fn pseudo_royals_safe(&self, m: Move) -> bool {
        let var = &*self.var;
        let us = self.side_to_move;
        let them = !us;
        let st = self.state();
        let (from, to, mt) = (m.from(), m.to(), m.move_type());
        let mut kto = to;
        let blast_immune = self.blast_immune_bb();

        let mut occupied = if mt != MoveType::Drop { self.pieces() ^ from } else { self.pieces() };
        if var.walling_rule == WallingRule::Duck {
            occupied ^= st.wall_squares;
        }
        if var.walling() || m.is_gating() {
            occupied |= m.gating_square();
        }
        if mt == MoveType::Castling {
            let file = if to > from { var.castling_kingside_file } else { var.castling_queenside_file };
            kto = Square::new(file, self.castling_rank(us));
            let step = if kto > from { 1 } else { -1 };
            let rto = kto.offset(-step, 0).unwrap_or(kto);
            // 疑似王の通り道
            if st.pseudo_royals.contains(from) {
                let mut s = Some(from);
                while let Some(sq) = s
                    && sq != kto
                {
                    let touching = var.blast_on_capture
                        && (self.blast_pattern(sq) & st.pseudo_royals & self.pieces_c(them) & !blast_immune).is_not_empty();
                    if !touching && self.attackers_to_by(sq, occupied, them, self.pieces_pt(PieceType::JanggiCannon)).is_not_empty() {
                        return false;
                    }
                    s = sq.offset(step, 0);
                }
            }
            occupied ^= Bitboard::from_square(to) | rto;
        }
        occupied |= kto;
        if mt == MoveType::EnPassant {
            occupied &= !Bitboard::from_square(self.capture_square(kto));
        }
        if self.capture(m) && var.blast_on_capture {
            occupied &= !self.blast_squares(kto);
        }

        let moved_pt = self.moved_piece(m).piece_type();
        // 疑似王を石にする取り方はできない
        if self.capture(m)
            && moved_pt.is_some_and(|pt| var.petrify_on_capture_types.contains(pt))
            && st.pseudo_royals.contains(from)
        {
            return false;
        }

        let mut ours = st.pseudo_royals & self.pieces_c(us);
        let theirs = st.pseudo_royals & self.pieces_c(them);
        if mt != MoveType::Drop && ours.contains(from) {
            ours ^= Bitboard::from_square(from) | kto;
        }
        let promoted_royal = mt == MoveType::Promotion
            && m.promotion_type().is_some_and(|pt| var.extinction_piece_types.contains(pt));
        if promoted_royal && let Some(pt) = m.promotion_type() {
            if self.count(us, pt) > var.extinction_piece_count {
                // 枚数が増えると疑似王でなくなる
                ours &= !self.pieces_cp(us, pt);
            } else {
                ours |= kto;
            }
        }

        // 自爆
        if (ours & !occupied).is_not_empty() {
            return false;
        }

        let mut attackers_theirs = occupied & !Bitboard::from_square(kto);
        for pt in (var.petrify_on_capture_types & var.extinction_piece_types).iter() {
            attackers_theirs &= !self.pieces_cp(them, pt);
        }
        let jc = self.pieces_pt(PieceType::JanggiCannon);
        let attacked = |sr: Square| {
            let touching =
                var.blast_on_capture && (theirs & self.blast_pattern(sr) & !blast_immune).is_not_empty();
            !touching && (self.attackers_to_by(sr, occupied, them, jc) & attackers_theirs).is_not_empty()
        };

        // 相手の疑似王を取る手は常に指せる
        if (theirs & !occupied).is_empty() && ours.iter().any(attacked) {
            return false;
        }

        if var.duple_check {
            let mut candidates = st.pseudo_royal_candidates & self.pieces_c(us);
            if mt != MoveType::Drop && candidates.contains(from) {
                candidates ^= Bitboard::from_square(from) | kto;
            }
            if promoted_royal {
                candidates |= kto;
            }
            if candidates.is_not_empty() && candidates.iter().all(attacked) {
                return false;
            }
        }
        true
    }

    /// 疑似合法手が王手になるか
    pub fn gives_check(&self, m: Move) -> bool {
        debug_assert!(m.is_ok());
        let var = &*self.var;
        let us = self.side_to_move;
        let them = !us;
        let (from, to, mt) = (m.from(), m.to(), m.move_type());
        let Some(ksq) = self.king_square(them) else {
            return false;
        };
        let Some(moved_pt) = self.moved_piece(m).piece_type() else {
            return false;
        };

        let occupied = if mt != MoveType::Drop { self.pieces() ^ from } else { self.pieces() } | to;
        let mut cannons = self.pieces_pt(PieceType::JanggiCannon);
        if moved_pt == PieceType::JanggiCannon {
            cannons = if mt == MoveType::Drop { cannons } else { cannons ^ from } | to;
        } else if cannons.contains(to) {
            cannons ^= to;
        }
        let petrified = var.petrify_on_capture_types.contains(moved_pt) && self.capture(m);

        // 直接の王手
        if !matches!(
            mt,
            MoveType::Promotion | MoveType::PiecePromotion | MoveType::PieceDemotion | MoveType::Castling
        ) && !petrified
        {
            let move_pt = self.move_piece_type(moved_pt);
            if moved_pt == PieceType::JanggiCannon {
                if (attacks_bb(us, move_pt, to, occupied) & attacks_bb(us, move_pt, to, occupied & !cannons)).contains(ksq) {
                    return true;
                }
            } else if is_hopper(move_pt) || is_asymmetric(move_pt) {
                if attacks_bb(us, move_pt, to, occupied).contains(ksq) {
                    return true;
                }
            } else if self.check_squares(moved_pt).contains(to) {
                return true;
            }
        }

        // 開き王手
        if ((mt != MoveType::Drop && self.blockers_for_king(them).contains(from))
            || (self.state().non_sliding_riders & self.pieces_c(us)).is_not_empty())
            && (self.attackers_to_by(ksq, occupied, us, cannons) & occupied).is_not_empty()
        {
            return true;
        }

        // ゲートで置いた駒の王手
        if let Some(gate_pt) = m.gating_type()
            && attacks_bb(us, self.move_piece_type(gate_pt), m.gating_square(), (self.pieces() ^ from) | to).contains(ksq)
        {
            return true;
        }

        // 石になった駒は王手しない
        if petrified {
            return false;
        }

        // 宮の斜め
        if (var.diagonal_lines & (Bitboard::from_square(to) | ksq)).more_than_one() {
            let move_pt = self.move_piece_type(moved_pt);
            let diag_type = match move_pt {
                PieceType::Wazir => Some(PieceType::Fers),
                PieceType::Soldier => Some(PieceType::Pawn),
                PieceType::Rook => Some(PieceType::Bishop),
                _ => None,
            };
            if let Some(dt) = diag_type {
                if attacks_bb(us, dt, to, occupied).contains(ksq) {
                    return true;
                }
            } else if moved_pt == PieceType::JanggiCannon
                && (cannon_diagonal_attacks(to, occupied) & cannon_diagonal_attacks(to, occupied & !cannons)).contains(ksq)
            {
                return true;
            }
        }

        let attacks_after = |pt: Option<PieceType>| {
            pt.is_some_and(|pt| attacks_bb(us, self.move_piece_type(pt), to, self.pieces() ^ from).contains(ksq))
        };
        match mt {
            MoveType::Normal | MoveType::Drop | MoveType::Special => false,
            MoveType::Promotion => attacks_after(m.promotion_type()),
            MoveType::PiecePromotion => attacks_after(var.promoted_piece_type(moved_pt)),
            MoveType::PieceDemotion => attacks_after(self.unpromoted_piece_on(from).piece_type()),
            MoveType::EnPassant => {
                // 取った歩の後ろからの開き王手だけが残る
                let capsq = self.capture_square(to);
                let b = (self.pieces() ^ from ^ capsq) | to;
                (self.attackers_to_occ(ksq, b) & self.pieces_c(us) & b).is_not_empty()
            }
            MoveType::Castling => {
                let (kfrom, rfrom) = (from, to);
                let file = if rfrom > kfrom { var.castling_kingside_file } else { var.castling_queenside_file };
                let kto = Square::new(file, self.castling_rank(us));
                let Some(rto) = kto.offset(if rfrom > kfrom { -1 } else { 1 }, 0) else {
                    return false;
                };
                let after = (self.pieces() ^ kfrom ^ rfrom) | rto | kto;
                if var.castling_rank > Rank::R1
                    && (self.blockers_for_king(them).contains(rfrom)
                        || (self.state().non_sliding_riders & self.pieces_c(us)).is_not_empty())
                    && self.attackers_to_by(ksq, after, us, cannons).is_not_empty()
                {
                    return true;
                }
                let Some(rook_pt) = self.piece_on(rfrom).piece_type() else {
                    return false;
                };
                let rook_pt = self.move_piece_type(rook_pt);
                pseudo_attacks(us, rook_pt, rto).contains(ksq) && attacks_bb(us, rook_pt, rto, after).contains(ksq)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::Color;
    use crate::variant::Variant;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        Position::set(Arc::new(Variant::preset(variant).unwrap()), fen, false).unwrap()
    }

    #[test]
    fn test_pseudo_legal_rejects_garbage() {
        let p = pos("chess", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(p.pseudo_legal(Move::normal(sq("e2"), sq("e4"))));
        assert!(p.pseudo_legal(Move::normal(sq("g1"), sq("f3"))));
        // 相手の駒・空きマス・味方の駒への移動
        assert!(!p.pseudo_legal(Move::normal(sq("e7"), sq("e5"))));
        assert!(!p.pseudo_legal(Move::normal(sq("e4"), sq("e5"))));
        assert!(!p.pseudo_legal(Move::normal(sq("d1"), sq("d2"))));
        // 盤外
        assert!(!p.pseudo_legal(Move::normal(sq("h2"), sq("i3"))));
        // 塞がれた走り
        assert!(!p.pseudo_legal(Move::normal(sq("f1"), sq("c4"))));
        assert!(!p.pseudo_legal(Move::NONE));
    }

    #[test]
    fn test_pinned_piece_is_not_legal() {
        let p = pos("chess", "4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1");
        let m = Move::normal(sq("e2"), sq("c3"));
        assert!(p.pseudo_legal(m));
        assert!(!p.legal(m));
        assert!(p.legal(Move::normal(sq("e1"), sq("d1"))));
        // ピンの線上なら動ける
        let q = pos("chess", "4k3/4r3/8/8/8/8/4R3/4K3 w - - 0 1");
        assert!(q.legal(Move::normal(sq("e2"), sq("e5"))));
        assert!(!q.legal(Move::normal(sq("e2"), sq("d2"))));
    }

    #[test]
    fn test_king_cannot_step_into_attack() {
        let p = pos("chess", "4k3/8/8/8/8/8/8/r3K3 w - - 0 1");
        assert!(p.in_check());
        assert!(!p.legal(Move::normal(sq("e1"), sq("d1"))));
        assert!(p.legal(Move::normal(sq("e1"), sq("e2"))));
        // 王手を防がない駒の手は形で弾かれる
        let q = pos("chess", "4k3/8/8/8/8/8/7N/r3K3 w - - 0 1");
        assert!(!q.pseudo_legal(Move::normal(sq("h2"), sq("g4"))));
    }

    #[test]
    fn test_en_passant_exposing_king() {
        // e.p. で 5 段目が開いて王が取られる
        let p = pos("chess", "8/8/8/K2pP2r/8/8/8/4k3 w - d6 0 2");
        let m = Move::with_type(MoveType::EnPassant, sq("e5"), sq("d6"));
        assert!(p.pseudo_legal(m));
        assert!(!p.legal(m));
    }

    #[test]
    fn test_castling_through_attack() {
        let p = pos("chess", "4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let oo = Move::with_type(MoveType::Castling, sq("e1"), sq("h1"));
        let ooo = Move::with_type(MoveType::Castling, sq("e1"), sq("a1"));
        assert!(p.pseudo_legal(oo));
        assert!(p.legal(oo));
        assert!(p.legal(ooo));

        let q = pos("chess", "4k3/8/8/8/8/8/5r2/R3K2R w KQ - 0 1");
        assert!(!q.legal(Move::with_type(MoveType::Castling, sq("e1"), sq("h1"))));
    }

    #[test]
    fn test_gives_check() {
        let p = pos("chess", "4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        assert!(p.gives_check(Move::normal(sq("a1"), sq("a8"))));
        assert!(!p.gives_check(Move::normal(sq("a1"), sq("a7"))));
        // 開き王手
        let q = pos("chess", "4k3/8/8/8/8/8/4N3/4R1K1 w - - 0 1");
        assert!(q.gives_check(Move::normal(sq("e2"), sq("c3"))));
        // 成り
        let r = pos("chess", "4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert!(r.gives_check(Move::promotion(sq("a7"), sq("a8"), PieceType::Queen)));
        assert!(!r.gives_check(Move::promotion(sq("a7"), sq("a8"), PieceType::Knight)));
    }

    #[test]
    fn test_castling_gives_check() {
        let p = pos("chess", "5k2/8/8/8/8/8/8/4K2R w K - 0 1");
        assert!(p.gives_check(Move::with_type(MoveType::Castling, sq("e1"), sq("h1"))));
    }

    #[test]
    fn test_drop_legality() {
        let p = pos("crazyhouse", "4k3/8/8/8/8/8/8/4K3[Pn] w - - 0 1");
        assert!(p.pseudo_legal(Move::drop(PieceType::Pawn, PieceType::Pawn, sq("e4"))));
        // 1 段目と 8 段目には歩を打てない
        assert!(!p.pseudo_legal(Move::drop(PieceType::Pawn, PieceType::Pawn, sq("a8"))));
        assert!(!p.pseudo_legal(Move::drop(PieceType::Pawn, PieceType::Pawn, sq("a1"))));
        // 持っていない駒
        assert!(!p.pseudo_legal(Move::drop(PieceType::Knight, PieceType::Knight, sq("e4"))));
        // 埋まったマス
        assert!(!p.pseudo_legal(Move::drop(PieceType::Pawn, PieceType::Pawn, sq("e1"))));
    }

    #[test]
    fn test_xiangqi_flying_general() {
        // 王同士の間の駒は動かせない
        let p = pos("xiangqi", "4k4/9/9/9/9/9/9/9/4R4/4K4 w - - 0 1");
        assert!(!p.legal(Move::normal(sq("e2"), sq("d2"))));
        assert!(p.legal(Move::normal(sq("e2"), sq("e5"))));
        assert!(!p.legal(Move::normal(sq("e2"), sq("a2"))));
    }

    #[test]
    fn test_atomic_kings_touching() {
        // 接している王は取れない、取られない
        let p = pos("atomic", "8/8/8/8/8/3kK3/8/8 w - - 0 1");
        assert!(p.legal(Move::normal(sq("e3"), sq("e4"))));
        let m = Move::normal(sq("e3"), sq("d3"));
        assert!(!p.pseudo_legal(m) || !p.legal(m));
    }

    #[test]
    fn test_has_capture_is_cached() {
        let p = pos("chess", "4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
        assert_eq!(p.state().legal_capture.get(), None);
        assert!(p.has_capture());
        assert_eq!(p.state().legal_capture.get(), Some(true));
        assert_eq!(p.side_to_move(), Color::White);
    }
}
