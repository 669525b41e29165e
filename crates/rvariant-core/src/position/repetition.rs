//! 千日手・長捉の判定

use super::Position;
use super::zobrist::zobrist;
use crate::bitboard::{Bitboard, attacks_bb, between_bb, line_bb, pseudo_attacks};
use crate::types::{Color, Move, PieceType, Square};
use crate::variant::WallingRule;

impl Position {
    /// 最後の不可逆手以降に同一局面が現れたか
    pub fn has_repeated(&self) -> bool {
        let st = self.state();
        let mut end = self.repetition_window(st.rule50, st.plies_from_null);
        let mut idx = Some(self.state_index());
        while end >= 4 {
            let Some(i) = idx else { break };
            let stc = self.state_at(i);
            if stc.repetition != 0 {
                return true;
            }
            idx = stc.previous;
            end -= 1;
        }
        false
    }

    /// 千日手に戻る可逆手があるか、以前の局面から 1 手で現局面に来られるか
    ///
    /// 千日手が引き分けでないルールでは常に false。
    pub fn has_game_cycle(&self, ply: i32) -> bool {
        let var = &*self.var;
        let st = self.state();
        let end = self.repetition_window(st.rule50, st.plies_from_null);

        if end < 3
            || var.n_fold_value != crate::types::Value::DRAW
            || var.perpetual_check_illegal
            || var.material_counting != crate::variant::MaterialCounting::None
            || var.move_repetition_illegal
            || var.walling_rule == WallingRule::Duck
        {
            return false;
        }

        let z = zobrist();
        let original_key = st.key;
        let mut stp = st.previous;
        let mut i = 3;
        while i <= end {
            stp = stp
                .and_then(|j| self.state_at(j).previous)
                .and_then(|j| self.state_at(j).previous);
            let Some(j) = stp else { break };
            let other = self.state_at(j);

            if let Some(m) = z.cuckoo_probe(original_key ^ other.key) {
                let (s1, s2) = (m.from(), m.to());
                if ((between_bb(s1, s2) ^ s2) & self.pieces()).is_empty() {
                    if ply > i {
                        return true;
                    }
                    // 根以前では、現局面に向かう手ではなく戻る手であること
                    let s = if self.is_empty(s1) { s2 } else { s1 };
                    if self.piece_on(s).color() == self.side_to_move && other.repetition != 0 {
                        return true;
                    }
                }
            }
            i += 2;
        }
        false
    }

    fn repetition_window(&self, rule50: i32, plies_from_null: i32) -> i32 {
        if self.var.captures_to_hand() {
            plies_from_null
        } else {
            rule50.min(plies_from_null)
        }
    }

    /// 直前の手で追いかけた相手の駒（アジアルール）
    pub(super) fn chased(&self) -> Bitboard {
        let st = self.state();
        if st.mv == Move::NONE || st.mv == Move::NULL || st.pass {
            return Bitboard::EMPTY;
        }
        let us = self.side_to_move;
        let them = !us;
        let Some(their_king) = self.king_square(them) else {
            return Bitboard::EMPTY;
        };
        let var = &*self.var;
        let mut chased = Bitboard::EMPTY;

        let mut pins = self.blockers_for_king(us);
        if var.flying_general {
            let king_file_pieces = Bitboard::file(their_king.file()) & self.pieces_c(us);
            let others = king_file_pieces & !self.pieces_pt(PieceType::King);
            if (king_file_pieces & self.pieces_cp(us, PieceType::King)).is_not_empty() && !others.more_than_one() {
                pins |= others;
            }
        }

        // 王と川を越えていない兵は追いかけの対象外
        let exempt = (self.pieces_cp(us, PieceType::King) | self.pieces_cp(us, PieceType::Soldier)) ^ self.promoted_soldiers(us);

        let add_chased = |chased: &mut Bitboard, attacker_sq: Square, attacker: PieceType, mut attacks: Bitboard| {
            if (attacks & !*chased).is_empty() {
                return;
            }
            attacks &= !exempt;

            // 格上の駒への利き
            if matches!(attacker, PieceType::Horse | PieceType::Cannon) {
                *chased |= attacks & self.pieces_cp(us, PieceType::Rook);
            }
            if matches!(attacker, PieceType::Elephant | PieceType::Fers) {
                *chased |= attacks
                    & (self.pieces_cp(us, PieceType::Rook)
                        | self.pieces_cp(us, PieceType::Cannon)
                        | self.pieces_cp(us, PieceType::Horse));
            }

            // 同種の駒同士の睨み合いは除く（足を塞がれた馬とピンは例外）
            if attacker == PieceType::Horse
                && (pseudo_attacks(Color::White, PieceType::Fers, attacker_sq) & self.pieces()).is_not_empty()
            {
                for s in attacks & self.pieces_cp(us, PieceType::Horse) {
                    if attacks_bb(us, PieceType::Horse, s, self.pieces()).contains(attacker_sq) {
                        attacks ^= s;
                    }
                }
            } else {
                attacks &= !self.pieces_cp(us, attacker) | pins;
            }

            // 紐のついていない駒
            for s in attacks {
                let occupied = self.pieces() ^ attacker_sq;
                let roots = self.attackers_to_by(s, occupied, us, self.pieces_pt(PieceType::JanggiCannon)) & !pins;
                let king_only_root = var.flying_general
                    && roots == self.pieces_cp(us, PieceType::King)
                    && attacks_bb(us, PieceType::Rook, their_king, occupied).contains(s);
                if roots.is_empty() || king_only_root {
                    *chased |= s;
                }
            }
        };

        let from = st.mv.from();
        let to = st.mv.to();

        // 動いた駒の利き
        if let Some(moved) = self.piece_on(to).piece_type()
            && moved != PieceType::King
            && moved != PieceType::Soldier
        {
            let mut direct = self.attacks_from(them, moved, to) & self.pieces_c(us);
            // 新しい利きだけを見る
            if matches!(moved, PieceType::Rook | PieceType::Cannon) {
                direct &= !line_bb(from, to);
            }
            add_chased(&mut chased, to, moved, direct);
        }

        // 開き利き
        let candidates = (pseudo_attacks(Color::White, PieceType::Wazir, from) & self.pieces_cp(them, PieceType::Horse))
            | (pseudo_attacks(Color::White, PieceType::Fers, from) & self.pieces_cp(them, PieceType::Elephant))
            | (pseudo_attacks(Color::White, PieceType::Rook, from)
                & (self.pieces_cp(them, PieceType::Cannon) | self.pieces_cp(them, PieceType::Rook)))
            | (pseudo_attacks(Color::White, PieceType::Rook, to) & self.pieces_cp(them, PieceType::Cannon));
        let before_move = if self.captured_piece().is_some() { self.pieces() } else { self.pieces() ^ to } ^ from;
        for s in candidates {
            let Some(pt) = self.piece_on(s).piece_type() else { continue };
            let discoveries = self.pieces_c(us)
                & attacks_bb(them, pt, s, self.pieces())
                & !attacks_bb(them, pt, s, before_move);
            add_chased(&mut chased, s, pt, discoveries);
        }

        if st.plies_from_null > 0
            && let Some(prev) = st.previous
        {
            let prev_blockers = self.state_at(prev).blockers_for_king[us.index()];
            let new_blockers = st.blockers_for_king[us.index()] & !prev_blockers;

            // 見かけの紐
            for s in new_blockers & self.pieces_c(us) {
                let Some(pinned) = self.piece_on(s).piece_type() else { continue };
                let fake_rooted = self.pieces_c(us) & !exempt & attacks_bb(us, pinned, s, self.pieces());
                for s2 in fake_rooted {
                    if (self.attackers_to(s2, them) & !self.blockers_for_king(them)).is_not_empty() {
                        chased |= s2;
                    }
                }
            }

            // 開き王手
            if let Some(our_king) = self.king_square(us) {
                let king_reach = self.attacks_from(us, PieceType::King, our_king);
                for s in new_blockers & self.pieces_c(them) {
                    let Some(pt) = self.piece_on(s).piece_type() else { continue };
                    let mut discovery_attacks = self.attacks_from(them, pt, s) & self.pieces_c(us);
                    // 王で取り返せない駒は追いかけられている
                    chased |= discovery_attacks & !king_reach;
                    discovery_attacks &= king_reach;
                    for s2 in discovery_attacks {
                        let occupied = self.pieces() ^ s ^ our_king;
                        let defenders = self.attackers_to_by(s2, occupied, them, self.pieces_pt(PieceType::JanggiCannon));
                        if (defenders & !Bitboard::from_square(s)).is_not_empty() {
                            chased |= s2;
                        }
                    }
                }
            }
        }

        chased
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::variant::Variant;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    fn play(p: &mut Position, from: &str, to: &str) {
        let m = Move::normal(sq(from), sq(to));
        let gc = p.gives_check(m);
        p.do_move(m, gc);
    }

    fn startpos(name: &str) -> Position {
        crate::init();
        Position::startpos(Arc::new(Variant::preset(name).unwrap())).unwrap()
    }

    #[test]
    fn test_has_repeated_after_knight_dance() {
        let mut p = startpos("chess");
        assert!(!p.has_repeated());
        for (f, t) in [("g1", "f3"), ("g8", "f6"), ("f3", "g1")] {
            play(&mut p, f, t);
        }
        assert!(!p.has_repeated());
        play(&mut p, "f6", "g8");
        assert!(p.has_repeated());
    }

    #[test]
    fn test_game_cycle_detects_upcoming_repetition() {
        let mut p = startpos("chess");
        for (f, t) in [("g1", "f3"), ("g8", "f6"), ("f3", "g1")] {
            play(&mut p, f, t);
        }
        // 黒が f6g8 と戻れば開始局面
        assert!(p.has_game_cycle(5));
        assert!(!p.has_game_cycle(0));
    }

    #[test]
    fn test_game_cycle_blocked_by_pawn_move() {
        let mut p = startpos("chess");
        for (f, t) in [("g1", "f3"), ("e7", "e5"), ("f3", "g1")] {
            play(&mut p, f, t);
        }
        assert!(!p.has_game_cycle(5));
    }

    #[test]
    fn test_game_cycle_disabled_when_repetition_is_decisive() {
        let mut p = startpos("xiangqi");
        for (f, t) in [("b1", "c3"), ("b10", "c8"), ("c3", "b1")] {
            play(&mut p, f, t);
        }
        assert!(!p.has_game_cycle(5));
    }

    #[test]
    fn test_chased_rook_by_horse() {
        crate::init();
        let var = Arc::new(Variant::preset("xiangqi").unwrap());
        let mut p = Position::set(var, "3k5/9/9/9/3r5/9/9/2N6/9/4K4 w - - 0 1", false).unwrap();
        play(&mut p, "c3", "e4");
        // 馬が紐のない車を狙う
        assert!(p.state().chased.contains(sq("d6")));
        assert!(p.state().chased.count() == 1);
    }
}
