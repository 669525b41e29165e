//! 静的交換評価（SEE）

use super::Position;
use crate::bitboard::{Bitboard, attacks_bb, bishop_attacks, rook_attacks};
use crate::types::{Color, Move, MoveType, PieceType, Value};
use crate::variant::WallingRule;

/// 安い順に調べる駒種（これ以外の駒は価値を見ずに選ぶ）
const SWAP_ORDER: [PieceType; 5] =
    [PieceType::Pawn, PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen];

impl Position {
    /// 駒交換の結果が threshold 以上か
    pub fn see_ge(&self, m: Move, threshold: Value) -> bool {
        debug_assert!(m.is_ok());
        let var = &*self.var;

        if !matches!(m.move_type(), MoveType::Normal | MoveType::Drop | MoveType::PiecePromotion) {
            return Value::ZERO >= threshold;
        }

        let from = m.from();
        let to = m.to();
        let moved = self.moved_piece(m);

        if var.check_counting && moved.color() == self.side_to_move && self.gives_check(m) {
            return true;
        }

        if var.blast_on_capture {
            return self.blast_see(m) >= threshold;
        }

        // 取ると絶滅する駒
        let victim = self.piece_on(to);
        if var.extinction_enabled()
            && let Some(vpt) = victim.piece_type()
            && ((var.extinction_piece_types.contains(vpt) && self.count(victim.color(), vpt) == var.extinction_piece_count + 1)
                || (var.extinction_all_pieces && self.count_all(!self.side_to_move) == var.extinction_piece_count + 1))
        {
            return var.extinction_value < Value::ZERO;
        }

        // 駒の価値があてにならないルール
        if var.must_capture
            || !var.checking
            || m.is_gating()
            || self.count_pt(PieceType::Clobber) == self.count_all(Color::White) + self.count_all(Color::Black)
        {
            return Value::ZERO >= threshold;
        }

        let value_on = |s| self.piece_on(s).piece_type().map_or(0, PieceType::value);
        let Some(moved_pt) = moved.piece_type() else {
            return Value::ZERO >= threshold;
        };

        let mut swap = value_on(to) - threshold.raw();
        if swap < 0 {
            return false;
        }
        swap = moved_pt.value() - swap;
        if swap <= 0 {
            return true;
        }

        // 取った駒が石になる
        if var.petrify_on_capture_types.contains(moved_pt) && self.capture(m) {
            return false;
        }

        let mut occupied = if m.is_drop() { self.pieces() } else { self.pieces() ^ from } ^ to;
        let mut stm = moved.color();
        let mut attackers = self.attackers_to_occ(to, occupied);
        let mut res = 1;

        if var.flying_general {
            let no_rooks = occupied & !self.pieces_pt(PieceType::Rook);
            if (attackers & self.pieces_cp(stm, PieceType::King)).is_not_empty() {
                attackers |= attacks_bb(stm, PieceType::Rook, to, no_rooks) & self.pieces_cp(!stm, PieceType::King);
            }
            if (attackers & self.pieces_cp(!stm, PieceType::King)).is_not_empty() {
                attackers |= attacks_bb(!stm, PieceType::Rook, to, no_rooks) & self.pieces_cp(stm, PieceType::King);
            }
        }

        // 包同士は取り合えない
        let janggi_cannons = self.pieces_pt(PieceType::JanggiCannon);
        if moved_pt == PieceType::JanggiCannon && (attackers & self.pieces_c(!stm) & !janggi_cannons).is_empty() {
            attackers &= !self.pieces_cp(!stm, PieceType::JanggiCannon);
        }

        let diagonal_sliders = self.pieces_pt(PieceType::Bishop) | self.pieces_pt(PieceType::Queen);
        let straight_sliders = self.pieces_pt(PieceType::Rook) | self.pieces_pt(PieceType::Queen);

        loop {
            stm = !stm;
            attackers &= occupied;

            let mut stm_attackers = attackers & self.pieces_c(stm);
            if stm_attackers.is_empty() {
                break;
            }

            // ピンしている駒が残っている間はピンされた駒で取れない
            if (self.pinners(!stm) & occupied).is_not_empty() {
                stm_attackers &= !self.blockers_for_king(stm);
            }

            // アヒルがいると遠くの走り駒はあてにならない
            if var.walling_rule == WallingRule::Duck {
                stm_attackers &= crate::bitboard::king_attacks(to) | !(diagonal_sliders | straight_sliders);
            }

            if stm_attackers.is_empty() {
                break;
            }

            res ^= 1;

            let cheapest = SWAP_ORDER
                .iter()
                .find_map(|&pt| (stm_attackers & self.pieces_pt(pt)).lsb().map(|s| (pt, s)));

            if let Some((pt, s)) = cheapest {
                swap = pt.value() - swap;
                if swap < res {
                    break;
                }
                occupied ^= s;
                // 後ろに隠れていた走り駒
                if matches!(pt, PieceType::Pawn | PieceType::Bishop | PieceType::Queen) {
                    attackers |= bishop_attacks(to, occupied) & diagonal_sliders;
                }
                if matches!(pt, PieceType::Rook | PieceType::Queen) {
                    attackers |= rook_attacks(to, occupied) & straight_sliders;
                }
            } else if let Some(s) = (stm_attackers & !self.pieces_pt(PieceType::King)).lsb() {
                // 妖精駒は価値順を見ない
                swap = value_on(s) - swap;
                if swap < res {
                    break;
                }
                occupied ^= s;
            } else {
                // 王で取っても相手の利きが残っていれば取れない
                return if (attackers & !self.pieces_c(stm)).is_not_empty() { res ^ 1 != 0 } else { res != 0 };
            }
        }

        res != 0
    }

    /// 爆発を伴う取りの交換値
    pub fn blast_see(&self, m: Move) -> Value {
        debug_assert!(m.is_ok());
        let var = &*self.var;
        let to = m.to();
        let us = self.moved_piece(m).color();
        let fromto = if m.is_drop() { Bitboard::from_square(to) } else { Bitboard::from_square(m.from()) | to };
        let mut blast = self.blast_squares(to);

        // 相手の王を巻き込めば詰みと同じ
        let enemy_royal = (self.state().pseudo_royals & self.pieces_c(!us)) | self.pieces_cp(!us, var.king_type);
        if (blast & enemy_royal).is_not_empty() {
            return -self.checkmate_value(0);
        }

        let capture = self.capture(m);
        let value_of = |s| self.piece_on(s).piece_type().map_or(0, PieceType::value);
        let mut result = 0;

        // 取らない手は相手が一番安い駒で取り返す
        if !capture {
            let attackers = self.attackers_to_by(to, self.pieces() ^ fromto, !us, self.pieces_pt(PieceType::JanggiCannon));
            let min_attacker = attackers
                .iter()
                .filter(|&s| {
                    self.piece_on(s)
                        .piece_type()
                        .is_some_and(|pt| !var.extinction_piece_types.contains(pt))
                })
                .map(|s| if blast.contains(s) { 0 } else { value_of(s) })
                .min();
            let Some(min_attacker) = min_attacker else {
                return Value::ZERO;
            };
            result += min_attacker;
            if let Some(dropped) = m.dropped_piece_type().filter(|_| m.is_drop()) {
                result -= dropped.value();
            }
        }

        while let Some(bsq) = blast.pop() {
            let bpc = self.piece_on(bsq);
            let Some(bpt) = bpc.piece_type() else { continue };
            if var.extinction_piece_types.contains(bpt) {
                return if bpc.color() == us {
                    var.extinction_value
                } else if capture {
                    -var.extinction_value
                } else {
                    Value::ZERO
                };
            }
            result += if bpc.color() == us { -bpt.value() } else { bpt.value() };
        }

        if capture || var.must_capture {
            Value::new(result - 1)
        } else {
            Value::new(result.min(0))
        }
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

    fn mv(from: &str, to: &str) -> Move {
        Move::normal(Square::parse(from).unwrap(), Square::parse(to).unwrap())
    }

    #[test]
    fn test_see_free_capture() {
        let p = pos("chess", "4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1");
        let m = mv("d1", "d5");
        assert!(p.see_ge(m, Value::ZERO));
        assert!(p.see_ge(m, Value::new(PieceType::Queen.value())));
        assert!(!p.see_ge(m, Value::new(PieceType::Queen.value() + 1)));
    }

    #[test]
    fn test_see_defended_pawn() {
        // 歩を取ると取り返されて損
        let p = pos("chess", "4k3/8/2p5/3p4/8/8/8/3QK3 w - - 0 1");
        let m = mv("d1", "d5");
        assert!(!p.see_ge(m, Value::ZERO));
        assert!(p.see_ge(m, Value::new(PieceType::Pawn.value() - PieceType::Queen.value())));
    }

    #[test]
    fn test_see_xray_recapture() {
        // 重ねた飛車で取り返しに勝つ
        let p = pos("chess", "3rk3/8/8/3p4/8/8/3R4/3RK3 w - - 0 1");
        let m = mv("d2", "d5");
        assert!(p.see_ge(m, Value::ZERO));
        assert!(!p.see_ge(m, Value::new(PieceType::Pawn.value() + 1)));
    }

    #[test]
    fn test_see_monotonic_in_threshold() {
        let p = pos("chess", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        for &m in crate::movegen::MoveList::legal(&p).iter() {
            let mut seen_false = false;
            for t in (-3000..=3000).step_by(250) {
                let ge = p.see_ge(m, Value::new(t));
                if seen_false {
                    assert!(!ge, "non-monotonic SEE for {m:?} at {t}");
                }
                seen_false |= !ge;
            }
        }
    }

    #[test]
    fn test_see_non_normal_moves() {
        let p = pos("chess", "4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let m = Move::promotion(Square::parse("a7").unwrap(), Square::parse("a8").unwrap(), PieceType::Queen);
        assert!(p.see_ge(m, Value::ZERO));
        assert!(!p.see_ge(m, Value::new(1)));
    }

    #[test]
    fn test_blast_see_takes_king() {
        // 王の隣で爆発させれば勝ち
        let p = pos("atomic", "8/4k3/3n4/8/8/8/8/3RK3 w - - 0 1");
        let m = mv("d1", "d6");
        assert!(p.blast_see(m).is_win());
        assert!(p.see_ge(m, Value::new(PieceType::Queen.value())));
    }

    #[test]
    fn test_blast_see_loses_own_material() {
        // 自分の女王を巻き込む取り
        let p = pos("atomic", "4k3/8/8/8/8/2n5/2Q5/2R1K3 w - - 0 1");
        let m = mv("c1", "c3");
        assert!(p.blast_see(m) < Value::ZERO);
        assert!(!p.see_ge(m, Value::ZERO));
    }

    #[test]
    fn test_blast_see_hits_variant_king_type() {
        // 王駒がコモナーのルール
        crate::init();
        let mut v = Variant::preset("extinction").unwrap();
        v.blast_on_capture = true;
        v.king_type = PieceType::Commoner;
        v.extinction_piece_types = crate::types::PieceSet::single(PieceType::Pawn);
        let p = Position::set(Arc::new(v.conclude().unwrap()), "8/4k3/3n4/8/8/8/8/3RK3 w - - 0 1", false).unwrap();
        assert_eq!(p.blast_see(mv("d1", "d6")), -p.checkmate_value(0));
        assert!(p.blast_see(mv("d1", "d6")).is_win());
    }
}
