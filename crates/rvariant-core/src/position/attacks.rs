//! 利きとピンの計算
//!
//! `attackers_to_by` は標準駒だけのルールでは 2 種類の高速経路を使い、
//! それ以外は駒種集合を走査する一般経路を使う。両者の結果は一致しなければならない。

use super::Position;
use crate::bitboard::{
    Bitboard, attacks_bb, between_bb, bishop_attacks, cannon_diagonal_attacks, fers_attacks,
    is_asymmetric, is_hopper, is_non_sliding_rider, king_attacks, knight_attacks, lame_eyes,
    leaper_attacks, moves_bb, pseudo_attacks, rook_attacks, wazir_attacks,
};
use crate::types::{Color, PIECE_TYPE_NB, PieceType, Square};

impl Position {
    /// 王の駒種を実際の動きの駒種に読み替える
    #[inline]
    pub(super) fn move_piece_type(&self, pt: PieceType) -> PieceType {
        if pt == PieceType::King { self.var.king_type } else { pt }
    }

    /// 手番 c の pt が s から取れるマス（盤内に限る）
    pub fn attacks_from(&self, c: Color, pt: PieceType, s: Square) -> Bitboard {
        if self.var.fast_attacks || self.var.fast_attacks2 {
            return attacks_bb(c, pt, s, self.pieces()) & self.board_bb();
        }
        let move_pt = self.move_piece_type(pt);
        let b = attacks_bb(c, move_pt, s, self.pieces());
        self.restrict_destinations(c, pt, move_pt, s, b)
    }

    /// 手番 c の pt が s から取らずに動けるマス（盤内に限る）
    pub fn moves_from(&self, c: Color, pt: PieceType, s: Square) -> Bitboard {
        let extra = self.multi_step_destinations(c, pt, s);
        if self.var.fast_attacks || self.var.fast_attacks2 {
            return (moves_bb(c, pt, s, self.pieces()) | extra) & self.board_bb();
        }
        let move_pt = self.move_piece_type(pt);
        let b = moves_bb(c, move_pt, s, self.pieces()) | extra;
        self.restrict_destinations(c, pt, move_pt, s, b)
    }

    /// 歩の 2 歩・3 歩進み
    fn multi_step_destinations(&self, c: Color, pt: PieceType, s: Square) -> Bitboard {
        if pt != PieceType::Pawn {
            return Bitboard::EMPTY;
        }
        let steps = if self.var.triple_step_region(c).contains(s) {
            3
        } else if self.var.double_step_region(c).contains(s) {
            2
        } else {
            return Bitboard::EMPTY;
        };
        let mut b = Bitboard::EMPTY;
        let mut cur = s;
        for n in 1..=steps {
            let Some(next) = cur.offset(0, c.sign()) else { break };
            if self.pieces().contains(next) || !self.board_bb().contains(next) {
                break;
            }
            if n > 1 {
                b |= next;
            }
            cur = next;
        }
        b
    }

    /// 兵・包・宮の斜めの補正と移動可能領域の制限
    fn restrict_destinations(
        &self,
        c: Color,
        pt: PieceType,
        move_pt: PieceType,
        s: Square,
        mut b: Bitboard,
    ) -> Bitboard {
        // 川を越えていない兵は前にしか進めない
        if pt == PieceType::Soldier && !self.promoted_soldiers(c).contains(s) {
            b &= Bitboard::file(s.file());
        }
        // 包は包を越えられず、包を取れない
        if pt == PieceType::JanggiCannon {
            let cannons = self.pieces_pt(pt);
            b &= !cannons;
            b &= attacks_bb(c, pt, s, self.pieces() ^ cannons);
        }
        // 宮の斜め
        let diag = self.var.diagonal_lines;
        if diag.contains(s) {
            let diag_type = match move_pt {
                PieceType::Wazir => Some(PieceType::Fers),
                PieceType::Soldier => Some(PieceType::Pawn),
                PieceType::Rook => Some(PieceType::Bishop),
                _ => None,
            };
            if let Some(dt) = diag_type {
                b |= attacks_bb(c, dt, s, self.pieces()) & diag;
            } else if move_pt == PieceType::JanggiCannon {
                let cannons = self.pieces_pt(pt);
                b |= cannon_diagonal_attacks(s, self.pieces())
                    & cannon_diagonal_attacks(s, self.pieces() ^ cannons)
                    & !cannons
                    & diag;
            }
        }
        b & self.board_bb_for(c, pt)
    }

    // ========== 利き ==========

    /// 占有 occupied のもとで s に利いている手番 c の駒
    pub fn attackers_to_by(
        &self,
        s: Square,
        occupied: Bitboard,
        c: Color,
        janggi_cannons: Bitboard,
    ) -> Bitboard {
        let var = &*self.var;
        if var.fast_attacks {
            return self.attackers_to_fast(s, occupied, c);
        }
        if var.fast_attacks2 {
            return self.attackers_to_fast2(s, occupied, c);
        }
        self.attackers_to_general(s, occupied, c, janggi_cannons)
    }

    /// 標準駒（騎士・ビショップ・ルーク系と王）だけの高速経路
    fn attackers_to_fast(&self, s: Square, occupied: Bitboard, c: Color) -> Bitboard {
        use PieceType::*;
        let p = |pt: PieceType| self.pieces_pt(pt);
        ((crate::bitboard::pawn_attacks(!c, s) & p(Pawn))
            | (knight_attacks(s) & (p(Knight) | p(Archbishop) | p(Chancellor)))
            | (rook_attacks(s, occupied) & (p(Rook) | p(Queen) | p(Chancellor)))
            | (bishop_attacks(s, occupied) & (p(Bishop) | p(Queen) | p(Archbishop)))
            | (king_attacks(s) & (p(King) | p(Commoner))))
            & self.pieces_c(c)
    }

    /// 将棋系の駒を含む高速経路
    fn attackers_to_fast2(&self, s: Square, occupied: Bitboard, c: Color) -> Bitboard {
        use PieceType::*;
        let p = |pt: PieceType| self.pieces_pt(pt);
        ((crate::bitboard::pawn_attacks(!c, s) & (p(Pawn) | p(Breakthrough) | p(Gold)))
            | (knight_attacks(s) & p(Knight))
            | (rook_attacks(s, occupied)
                & (p(Rook) | p(Queen) | p(Dragon) | (p(Lance) & pseudo_attacks(!c, Lance, s))))
            | (bishop_attacks(s, occupied) & (p(Bishop) | p(Queen) | p(DragonHorse)))
            | (king_attacks(s) & (p(King) | p(Commoner)))
            | (fers_attacks(s) & (p(Fers) | p(Dragon) | p(Silver)))
            | (wazir_attacks(s) & (p(Wazir) | p(DragonHorse) | p(Gold)))
            | (leaper_attacks(!c, ShogiKnight, s) & p(ShogiKnight))
            | (leaper_attacks(!c, ShogiPawn, s) & (p(ShogiPawn) | p(Silver))))
            & self.pieces_c(c)
    }

    /// 駒種集合を走査する一般経路
    pub fn attackers_to_general(
        &self,
        s: Square,
        occupied: Bitboard,
        c: Color,
        janggi_cannons: Bitboard,
    ) -> Bitboard {
        let var = &*self.var;
        let mut b = Bitboard::EMPTY;
        for pt in var.piece_types.iter() {
            if !self.board_bb_for(c, pt).contains(s) {
                continue;
            }
            let move_pt = self.move_piece_type(pt);
            if is_asymmetric(move_pt) {
                // 逆向きの利きが使えないので 1 枚ずつ確かめる
                for s2 in pseudo_attacks(!c, move_pt, s) & self.pieces_cp(c, pt) {
                    if attacks_bb(c, move_pt, s2, occupied).contains(s) {
                        b |= s2;
                    }
                }
            } else if pt == PieceType::JanggiCannon {
                b |= attacks_bb(!c, move_pt, s, occupied)
                    & attacks_bb(!c, move_pt, s, occupied & !janggi_cannons)
                    & self.pieces_cp(c, pt);
            } else {
                b |= attacks_bb(!c, move_pt, s, occupied) & self.pieces_cp(c, pt);
            }
        }

        // 宮の斜め
        let diag = var.diagonal_lines;
        if diag.contains(s) {
            let mut diag_attackers = Bitboard::EMPTY;
            if var.king_type == PieceType::Wazir {
                diag_attackers |= fers_attacks(s) & self.pieces_cp(c, PieceType::King);
            }
            diag_attackers |= fers_attacks(s) & self.pieces_cp(c, PieceType::Wazir);
            diag_attackers |= attacks_bb(!c, PieceType::Pawn, s, occupied) & self.pieces_cp(c, PieceType::Soldier);
            diag_attackers |= bishop_attacks(s, occupied) & self.pieces_cp(c, PieceType::Rook);
            diag_attackers |= cannon_diagonal_attacks(s, occupied)
                & cannon_diagonal_attacks(s, occupied & !janggi_cannons)
                & self.pieces_cp(c, PieceType::JanggiCannon);
            b |= diag_attackers & diag;
        }

        // 川を越えていない兵は前にしか利かない
        let soldiers = self.pieces_cp(c, PieceType::Soldier);
        if (b & soldiers).is_not_empty()
            && s.relative_rank(c, var.max_rank) < var.soldier_promotion_rank
        {
            b &= !soldiers | leaper_attacks(!c, PieceType::ShogiPawn, s);
        }

        b & self.pieces_c(c)
    }

    /// s に利いている手番 c の駒
    #[inline]
    pub fn attackers_to(&self, s: Square, c: Color) -> Bitboard {
        self.attackers_to_by(s, self.pieces(), c, self.pieces_pt(PieceType::JanggiCannon))
    }

    /// 占有 occupied のもとで s に利いている両手番の駒
    #[inline]
    pub fn attackers_to_occ(&self, s: Square, occupied: Bitboard) -> Bitboard {
        let jc = self.pieces_pt(PieceType::JanggiCannon);
        self.attackers_to_by(s, occupied, Color::White, jc) | self.attackers_to_by(s, occupied, Color::Black, jc)
    }

    /// s に利いている両手番の駒
    #[inline]
    pub fn attackers_to_all(&self, s: Square) -> Bitboard {
        self.attackers_to_occ(s, self.pieces())
    }

    /// 足を塞がれる跳びや走りで、王 s と sniper の間のマス
    fn sniper_path(&self, s: Square, sniper: Square, pt: PieceType) -> Bitboard {
        let pc = self.piece_on(sniper);
        if pc.is_some() && is_non_sliding_rider(pt) && !is_hopper(pt) {
            lame_eyes(pc.color(), pt, sniper, s)
        } else {
            between_bb(s, sniper)
        }
    }

    /// s への利きを遮っている駒とピンしている駒
    ///
    /// sliders は手番 c の駒に限る。戻り値は (遮っている駒, ピンしている駒)。
    /// ピンしている駒は、遮っている駒が s の駒と同じ手番のときだけ数える。
    pub fn slider_blockers(&self, sliders: Bitboard, s: Option<Square>, c: Color) -> (Bitboard, Bitboard) {
        let mut blockers = Bitboard::EMPTY;
        let mut pinners = Bitboard::EMPTY;
        let Some(s) = s else {
            return (blockers, pinners);
        };
        let var = &*self.var;

        let mut snipers = Bitboard::EMPTY;
        let mut sliding_snipers = Bitboard::EMPTY;

        if var.fast_attacks || var.fast_attacks2 {
            use PieceType::*;
            let p = |pt: PieceType| self.pieces_cp(c, pt);
            snipers = ((rook_attacks(s, Bitboard::EMPTY) & (p(Queen) | p(Rook) | p(Chancellor) | p(Dragon)))
                | (bishop_attacks(s, Bitboard::EMPTY) & (p(Queen) | p(Bishop) | p(Archbishop) | p(DragonHorse)))
                | (pseudo_attacks(!c, Lance, s) & p(Lance)))
                & sliders;
            sliding_snipers = snipers;
        } else {
            for pt in var.piece_types.iter() {
                let move_pt = self.move_piece_type(pt);
                let b = sliders
                    & (pseudo_attacks(!c, move_pt, s) ^ leaper_attacks(!c, move_pt, s))
                    & self.pieces_cp(c, pt);
                if b.is_empty() {
                    continue;
                }
                let found = if is_asymmetric(move_pt) {
                    let mut found = Bitboard::EMPTY;
                    for s2 in pseudo_attacks(!c, move_pt, s) & self.pieces_cp(c, pt) & sliders {
                        if !self.attacks_from(c, pt, s2).contains(s) {
                            found |= s2;
                        }
                    }
                    found
                } else {
                    b & !attacks_bb(!c, move_pt, s, self.pieces())
                };
                snipers |= found;
                if !is_hopper(move_pt) {
                    sliding_snipers |= found;
                }
            }
            // 宮の斜めのルーク
            if var.diagonal_lines.contains(s) {
                let candidates = var.diagonal_lines
                    & pseudo_attacks(!c, PieceType::Bishop, s)
                    & sliders
                    & self.pieces_cp(c, PieceType::Rook);
                for s2 in candidates {
                    if !self.attacks_from(c, PieceType::Rook, s2).contains(s) {
                        snipers |= s2;
                        sliding_snipers |= s2;
                    }
                }
            }
        }

        let occupancy = self.pieces() ^ sliding_snipers;
        let target_color = self.piece_on(s);
        let jc = self.pieces_pt(PieceType::JanggiCannon);
        for sniper in snipers {
            let Some(pt) = self.piece_on(sniper).piece_type() else { continue };
            let move_pt = self.move_piece_type(pt);
            let hopper = is_hopper(move_pt);
            let mut b = self.sniper_path(s, sniper, move_pt)
                & if hopper { self.pieces() ^ sniper } else { occupancy };

            if b.is_not_empty() && (!b.more_than_one() || (hopper && b.count() == 2)) {
                // 包は包を飛び越えられない
                if pt == PieceType::JanggiCannon && (b & jc).is_not_empty() {
                    b &= jc;
                }
                blockers |= b;
                if target_color.is_some() && (b & self.pieces_c(target_color.color())).is_not_empty() {
                    pinners |= sniper;
                }
            }
        }
        (blockers, pinners)
    }

    /// 手番 c の疑似王のうち王手されているもの
    ///
    /// 重複王手のルールでは、候補がすべて王手されているときに候補全体を返す。
    pub fn checked_pseudo_royals(&self, c: Color) -> Bitboard {
        let var = &*self.var;
        let st = self.state();
        let theirs = st.pseudo_royals & self.pieces_c(!c);
        // 相手の疑似王に接していれば取られない
        let in_check = |sr: Square| {
            !(var.blast_on_capture && (theirs & self.blast_pattern(sr)).is_not_empty())
                && self.attackers_to(sr, !c).is_not_empty()
        };

        let mut checked = Bitboard::EMPTY;
        for sr in st.pseudo_royals & self.pieces_c(c) {
            if in_check(sr) {
                checked |= sr;
            }
        }
        if var.duple_check {
            let candidates = st.pseudo_royal_candidates & self.pieces_c(c);
            if candidates.is_not_empty() && candidates.iter().all(in_check) {
                checked |= candidates;
            }
        }
        checked
    }

    // ========== 王手情報 ==========

    /// ピン・王手マス・疑似王などの王手情報を現局面の状態に設定する
    pub(super) fn set_check_info(&mut self) {
        let var = std::sync::Arc::clone(&self.var);
        let us = self.side_to_move;

        let mut blockers = [Bitboard::EMPTY; Color::NUM];
        let mut pinners = [Bitboard::EMPTY; Color::NUM];
        for c in Color::ALL {
            let (b, p) = self.slider_blockers(self.pieces_c(!c), self.king_square(c), !c);
            blockers[c.index()] = b;
            pinners[(!c).index()] = p;
        }

        let ksq = self.king_square(!us);
        let mut check_squares = [Bitboard::EMPTY; PIECE_TYPE_NB];
        let mut non_sliding_riders = Bitboard::EMPTY;
        for pt in var.piece_types.iter() {
            let move_pt = self.move_piece_type(pt);
            if let Some(ksq) = ksq {
                check_squares[pt.index()] = attacks_bb(!us, move_pt, ksq, self.pieces());
            }
            if is_non_sliding_rider(move_pt) {
                non_sliding_riders |= self.pieces_pt(pt);
            }
        }

        let checkers = self.checkers();
        let shak = (checkers
            & (self.pieces_pt(PieceType::Knight) | self.pieces_pt(PieceType::Rook) | self.pieces_pt(PieceType::Bers)))
            .is_not_empty();
        let bikjang = var.bikjang_rule
            && ksq.is_some_and(|k| (rook_attacks(k, self.pieces()) & self.pieces_cp(us, PieceType::King)).is_not_empty());

        let mut candidates = Bitboard::EMPTY;
        let mut royals = Bitboard::EMPTY;
        if var.extinction_pseudo_royal {
            for pt in var.extinction_piece_types.iter() {
                candidates |= self.pieces_pt(pt);
                for c in Color::ALL {
                    if self.count(c, pt) <= var.extinction_piece_count + 1 {
                        royals |= self.pieces_cp(c, pt);
                    }
                }
            }
        }

        {
            let st = self.state_mut();
            st.blockers_for_king = blockers;
            st.pinners = pinners;
            st.check_squares = check_squares;
            st.non_sliding_riders = non_sliding_riders;
            st.shak = shak;
            st.bikjang = bikjang;
            st.legal_capture.set(None);
            st.pseudo_royal_candidates = candidates;
            st.pseudo_royals = royals;
        }

        let chased = if var.chasing_rule != crate::variant::ChasingRule::None {
            self.chased()
        } else {
            Bitboard::EMPTY
        };
        self.state_mut().chased = chased;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;
    use crate::variant::Variant;
    use std::sync::Arc;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        let v = Arc::new(Variant::preset(variant).unwrap());
        Position::set(v, fen, false).unwrap()
    }

    #[test]
    fn test_attackers_to_start_position() {
        let p = pos("chess", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        // f3 には g1 の騎士と e2, g2 の歩が利く
        let a = p.attackers_to(sq("f3"), Color::White);
        assert_eq!(a.count(), 3);
        assert!(a.contains(sq("g1")));
        assert!(a.contains(sq("e2")));
        assert!(a.contains(sq("g2")));
        assert!(p.attackers_to(sq("f3"), Color::Black).is_empty());
    }

    #[test]
    fn test_fast_path_matches_general() {
        let p = pos("chess", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        let jc = p.pieces_pt(PieceType::JanggiCannon);
        for s in Square::iter().filter(|s| p.board_bb().contains(*s)) {
            for c in Color::ALL {
                assert_eq!(
                    p.attackers_to(s, c),
                    p.attackers_to_general(s, p.pieces(), c, jc),
                    "square {s}"
                );
            }
        }
    }

    #[test]
    fn test_pinned_piece() {
        let p = pos("chess", "4k3/4r3/8/8/8/8/4N3/4K3 w - - 0 1");
        assert_eq!(p.blockers_for_king(Color::White), Bitboard::from_square(sq("e2")));
        assert_eq!(p.pinners(Color::Black), Bitboard::from_square(sq("e7")));
        // 白の騎士は黒王を遮っていない
        assert!(p.blockers_for_king(Color::Black).is_empty());
    }

    #[test]
    fn test_xiangqi_cannon_screen() {
        // 砲は 1 枚越しに王手する
        let p = pos("xiangqi", "4k4/9/9/9/4p4/9/9/4C4/9/3K5 b - - 0 1");
        assert!(p.attackers_to(sq("e10"), Color::White).contains(sq("e3")));
        assert!(p.in_check());
    }

    #[test]
    fn test_xiangqi_cannon_two_screens_pin() {
        // 間の 2 枚はどちらも遮っている駒になる
        let p = pos("xiangqi", "4k4/9/9/4p4/4p4/9/9/4C4/9/3K5 b - - 0 1");
        assert!(!p.in_check());
        let expected = Bitboard::from_square(sq("e6")) | sq("e7");
        assert_eq!(p.blockers_for_king(Color::Black), expected);
        assert!(p.pinners(Color::White).contains(sq("e3")));
    }

    #[test]
    fn test_horse_leg_blocks_attack() {
        let p = pos("xiangqi", "4k4/9/9/9/9/9/9/9/3pN4/3K5 w - - 0 1");
        // d2 に足があるので e2 の馬は c3 / c1 に跳べない
        let b = p.attacks_from(Color::White, PieceType::Horse, sq("e2"));
        assert!(!b.contains(sq("c3")));
        assert!(!b.contains(sq("c1")));
        assert!(b.contains(sq("g3")));
    }
}
