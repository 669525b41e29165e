//! 指し手の適用と取り消し
//!
//! `do_move` は状態を 1 つ積んでハッシュを差分更新し、`undo_move` は
//! 積んだ状態に残した情報から盤面を元に戻す。差分更新したキーは常に
//! `compute_keys` で一から計算したものと一致する。

use std::sync::Arc;

use super::Position;
use super::state::StateInfo;
use super::zobrist::{
    Key, zobrist, zobrist_checks, zobrist_in_hand, zobrist_in_prison, zobrist_material, zobrist_points,
    zobrist_psq,
};
use crate::bitboard::{Bitboard, attacks_bb, between_bb, pawn_attacks, pseudo_attacks, pseudo_moves, rook_attacks};
use crate::types::{
    Color, File, KING_SIDE, Move, MoveType, Piece, PieceSet, PieceType, QUEEN_SIDE, Rank, SQUARE_NB, Square,
    castling_rights_of,
};
use crate::variant::{CapturingRule, CountingRule, EnclosingRule, PointsRule, Variant, WallingRule};

impl Position {
    /// 指し手を適用する
    ///
    /// `gives_check` は `gives_check(m)` の結果を渡す。
    pub fn do_move(&mut self, m: Move, gives_check: bool) {
        debug_assert!(m.is_ok());
        let var = Arc::clone(&self.var);
        let z = zobrist();
        let us = self.side_to_move;
        let them = !us;
        let mt = m.move_type();
        let from = m.from();
        let mut to = m.to();
        let pc = self.moved_piece(m);
        let Some(pt) = pc.piece_type() else {
            debug_assert!(false, "no piece to move");
            return;
        };

        let prev_idx = self.state_index();
        let mut st = self.state().partial_clone();
        st.previous = Some(prev_idx);
        st.mv = m;
        let mut k = st.key ^ z.side;

        self.game_ply += 1;
        if !(var.multimove_pass_at(self.game_ply) && m.is_pass()) {
            st.rule50 += 1;
        }
        st.plies_from_null += 1;
        if st.counting_limit != 0 {
            st.counting_ply += 1;
        }

        let mut captured = if mt == MoveType::EnPassant {
            self.piece_on(self.capture_square(to))
        } else {
            self.piece_on(to)
        };
        if from == to && !m.is_drop() {
            // パスとその場での成り
            captured = Piece::NONE;
        }
        st.pass = m.is_pass();
        debug_assert!(captured.is_none() || captured.color() == if mt == MoveType::Castling { us } else { them });

        if var.check_counting && gives_check {
            let remaining = st.checks_remaining[us.index()];
            k ^= zobrist_checks(us, remaining) ^ zobrist_checks(us, remaining - 1);
            st.checks_remaining[us.index()] = remaining - 1;
        }

        if mt == MoveType::Castling {
            let (kto, rto) = self.do_castling(us, from, to, &mut st, &mut k);
            k ^= zobrist_psq(captured, to) ^ zobrist_psq(captured, rto);
            to = kto;
            captured = Piece::NONE;
        }

        if captured.is_some() {
            let capsq = if mt == MoveType::EnPassant { self.capture_square(to) } else { to };
            st.capture_square = Some(capsq);
            let cpt = captured.piece_type().unwrap_or(PieceType::Pawn);
            if cpt == PieceType::Pawn {
                st.pawn_key ^= zobrist_psq(captured, capsq);
            }

            let captured_promoted = self.is_promoted(capsq);
            let unpromoted = self.unpromoted_piece_on(capsq);
            st.captured_promoted = captured_promoted;
            st.unpromoted_captured_piece = unpromoted;
            self.remove_piece(capsq);
            let owned = self.demoted_capture(captured, captured_promoted, unpromoted);
            k ^= self.collect_captured(owned);

            if var.points_counting {
                award_points(&var, &mut st, us, captured);
            }

            k ^= zobrist_psq(captured, capsq);
            st.material_key ^= zobrist_material(captured, self.count(them, cpt));
            st.rule50 = 0;
        }

        if m.is_drop() {
            let hand_pt = m.in_hand_piece_type().unwrap_or(pt);
            let pc_hand = Piece::new(us, hand_pt);
            let n = self.count_in_hand(us, hand_pt);
            k ^= zobrist_psq(pc, to) ^ zobrist_in_hand(pc_hand, n) ^ zobrist_in_hand(pc_hand, n - 1);
            st.rule50 = 0;
        } else {
            k ^= zobrist_psq(pc, from) ^ zobrist_psq(pc, to);
            if mt == MoveType::Promotion
                || (mt == MoveType::PiecePromotion && !var.piece_demotion)
                || (var.n_move_rule_types.contains(pt) && !pseudo_moves(us, pt, to).contains(from))
            {
                st.rule50 = 0;
            }
        }

        for s in st.ep_squares {
            k ^= z.enpassant[s.file().index()];
        }
        st.ep_squares = Bitboard::EMPTY;

        if !m.is_drop() && !m.is_pass() && st.castling_rights != 0 {
            let mask = self.castling_rights_mask[from.index()] | self.castling_rights_mask[to.index()];
            if mask != 0 {
                k ^= z.castling[st.castling_rights as usize];
                st.castling_rights &= !mask;
                if var.opposite_castling && mt == MoveType::Castling {
                    let side = if to > from { KING_SIDE } else { QUEEN_SIDE };
                    st.castling_rights &= !(castling_rights_of(them) & side);
                }
                k ^= z.castling[st.castling_rights as usize];
            }
        }

        // 挟んだ駒を裏返す
        st.flipped_pieces = Bitboard::EMPTY;
        if var.flip_enclosed_pieces != EnclosingRule::None && !m.is_pass() {
            st.flipped_pieces = self.enclosed_pieces(us, to, mt);
            for s in st.flipped_pieces {
                let flipped = self.piece_on(s);
                let resulting = flipped.flip();
                let fpt = flipped.piece_type().unwrap_or(PieceType::Pawn);
                self.remove_piece(s);
                k ^= zobrist_psq(flipped, s);
                st.material_key ^= zobrist_material(flipped, self.count(them, fpt));
                self.put_piece(resulting, s, false, Piece::NONE);
                k ^= zobrist_psq(resulting, s);
                st.material_key ^= zobrist_material(resulting, self.count(us, fpt) - 1);
                if fpt == PieceType::Pawn {
                    st.pawn_key ^= zobrist_psq(flipped, s) ^ zobrist_psq(resulting, s);
                }
            }
        }

        if m.is_drop() {
            let pc_hand = Piece::new(us, m.in_hand_piece_type().unwrap_or(pt));
            self.drop_piece(pc_hand, pc, to);
            st.material_key ^= zobrist_material(pc, self.count(us, pt) - 1);
            if var.castling_dropped_piece && to.rank() == self.castling_rank(us) {
                self.castle_dropped_piece(&mut st, &mut k, us, pt, to);
            }
        } else if mt != MoveType::Castling && from != to {
            self.move_piece(from, to);
        }

        match mt {
            MoveType::Promotion | MoveType::PiecePromotion => {
                let promo_pt = if mt == MoveType::Promotion {
                    m.promotion_type()
                } else {
                    var.promoted_piece_type(pt)
                };
                if let Some(promo_pt) = promo_pt {
                    let promotion = Piece::new(us, promo_pt);
                    st.promotion_pawn = self.piece_on(to);
                    self.remove_piece(to);
                    let unpromoted = if mt == MoveType::PiecePromotion { pc } else { Piece::NONE };
                    self.put_piece(promotion, to, true, unpromoted);
                    k ^= zobrist_psq(pc, to) ^ zobrist_psq(promotion, to);
                    if pt == PieceType::Pawn {
                        st.pawn_key ^= zobrist_psq(pc, to);
                    }
                    st.material_key ^= zobrist_material(promotion, self.count(us, promo_pt) - 1)
                        ^ zobrist_material(pc, self.count(us, pt));
                }
            }
            MoveType::PieceDemotion => {
                let demotion = self.unpromoted_piece_on(to);
                if let Some(dpt) = demotion.piece_type() {
                    self.remove_piece(to);
                    self.put_piece(demotion, to, false, Piece::NONE);
                    k ^= zobrist_psq(pc, to) ^ zobrist_psq(demotion, to);
                    if dpt == PieceType::Pawn {
                        st.pawn_key ^= zobrist_psq(demotion, to);
                    }
                    st.material_key ^= zobrist_material(demotion, self.count(us, dpt) - 1)
                        ^ zobrist_material(pc, self.count(us, pt));
                }
            }
            _ if pt == PieceType::Pawn && !m.is_drop() => {
                k ^= self.set_ep_squares(&var, &mut st, m, us, from, to);
            }
            _ => {}
        }
        if pt == PieceType::Pawn {
            let from_key = if m.is_drop() { 0 } else { zobrist_psq(pc, from) };
            st.pawn_key ^= from_key ^ zobrist_psq(pc, to);
        }

        st.captured_piece = captured;

        // ゲートから持ち駒を置く
        if let Some(gpt) = m.gating_type() {
            let gate = m.gating_square();
            let gating_piece = Piece::new(us, gpt);
            let n = self.count_in_hand(us, gpt);
            self.put_piece(gating_piece, gate, false, Piece::NONE);
            self.remove_from_hand(gating_piece);
            st.gates[us.index()] ^= gate;
            k ^= zobrist_psq(gating_piece, gate) ^ zobrist_in_hand(gating_piece, n) ^ zobrist_in_hand(gating_piece, n - 1);
            st.material_key ^= zobrist_material(gating_piece, self.count(us, gpt) - 1);
        }

        // 予約したゲートの駒（マスケティア）
        if var.commit_gates {
            if !m.is_drop() {
                for c in Color::ALL {
                    let home = if c == Color::White { Rank::R1 } else { var.max_rank };
                    if from.rank() == home && self.has_committed_piece(c, from.file()) {
                        st.removed_gating_type = self.drop_committed_piece(c, from.file());
                        self.key_committed_drop(&mut st, &mut k, c, from);
                        break;
                    }
                }
            }
            if captured.is_some() {
                let c = captured.color();
                let home = if c == Color::White { Rank::R1 } else { var.max_rank };
                if to.rank() == home {
                    st.captured_gating_type = self.uncommit_piece(c, to.file());
                }
            }
        }

        // ゲートの消滅
        if var.gating || var.cambodian_moves {
            let gates = &mut st.gates;
            if !m.is_drop() && gates[us.index()].contains(from) {
                gates[us.index()] ^= from;
            }
            if mt == MoveType::Castling && gates[us.index()].contains(m.to()) {
                gates[us.index()] ^= m.to();
            }
            if gates[them.index()].contains(to) {
                gates[them.index()] ^= to;
            }
            if var.seirawan_gating && self.count_in_hand_all(us) == 0 && !var.captures_to_hand() {
                gates[us.index()] = Bitboard::EMPTY;
            }
        }
        // ルークに狙われた王は跳べなくなる
        if var.cambodian_moves
            && pt == PieceType::Rook
            && let Some(ksq) = self.king_square(them)
            && st.gates[them.index()].contains(ksq)
            && rook_attacks(to, Bitboard::EMPTY).contains(ksq)
        {
            st.gates[them.index()] ^= ksq;
        }

        // 爆発・挟み取り・石化
        let surround = var.surround_capture_opposite || var.surround_capture_edge;
        let petrify = !var.petrify_on_capture_types.is_empty();
        let blasting = (captured.is_some() && (var.blast_on_capture || petrify)) || (var.blast_on_move && captured.is_none());
        if (surround || blasting) && !m.is_pass() {
            st.unpromoted_bycatch = [Piece::NONE; SQUARE_NB];
            st.promoted_bycatch = Bitboard::EMPTY;
            st.demoted_bycatch = Bitboard::EMPTY;
            let mut removal = Bitboard::EMPTY;
            if blasting {
                removal = if var.blast_on_capture || var.blast_on_move {
                    self.blast_squares(to)
                } else if var.petrify_on_capture_types.contains(pt) {
                    Bitboard::from_square(to)
                } else {
                    Bitboard::EMPTY
                };
            }
            if surround {
                removal |= self.surrounded_pieces(us, to);
            }
            for bsq in removal {
                k ^= self.remove_bycatch(&var, &mut st, us, to, bsq);
            }
        }

        // 壁を置く
        if var.walling() && !m.is_pass() {
            if var.walling_rule == WallingRule::Duck {
                let old = self.state().wall_squares;
                self.by_type[0] ^= old;
                for s in old {
                    k ^= z.wall[s.index()];
                }
                st.wall_squares = Bitboard::EMPTY;
            }
            let w = m.gating_square();
            st.wall_squares |= w;
            self.by_type[0] |= w;
            k ^= z.wall[w.index()];
        }

        if var.points_counting {
            let prev = self.state().points_count;
            for c in Color::ALL {
                let (old, new) = (prev[c.index()], st.points_count[c.index()]);
                if old != new {
                    k ^= zobrist_points(c, old) ^ zobrist_points(c, new);
                }
            }
        }

        st.key = k;
        self.side_to_move = them;
        self.states.push(st);

        let checkers = match self.king_square(them) {
            Some(ksq) if gives_check => self.attackers_to(ksq, us) & self.pieces_c(us),
            _ => Bitboard::EMPTY,
        };
        self.state_mut().checkers = checkers;

        if var.counting_rule != CountingRule::None {
            self.start_counting(&var, us, captured, mt);
        }

        self.set_check_info();
        let sudoku = self.compute_sudoku_conflicts();
        self.state_mut().sudoku_conflicts = sudoku;
        let repetition = self.repetition_distance();
        self.state_mut().repetition = repetition;

        #[cfg(feature = "debug")]
        assert!(self.pos_is_ok());
    }

    /// 指し手を取り消す
    pub fn undo_move(&mut self, m: Move) {
        debug_assert!(m.is_ok());
        debug_assert!(self.states.len() > 1);
        let var = Arc::clone(&self.var);
        let Some(st) = self.states.pop() else { return };
        self.side_to_move = !self.side_to_move;
        let us = self.side_to_move;
        let mt = m.move_type();
        let from = m.from();
        let to = m.to();

        // 壁を戻す
        self.by_type[0] ^= st.wall_squares ^ self.state().wall_squares;

        // 爆発などで消えた駒を戻す
        let surround = var.surround_capture_opposite || var.surround_capture_edge;
        let blasted = (st.captured_piece.is_some() && (var.blast_on_capture || !var.petrify_on_capture_types.is_empty()))
            || (var.blast_on_move && st.captured_piece.is_none());
        if (surround || blasted) && !m.is_pass() {
            for bsq in Square::iter() {
                let unpromoted = st.unpromoted_bycatch[bsq.index()];
                let Some(upt) = unpromoted.piece_type() else { continue };
                let demoted = st.demoted_bycatch.contains(bsq);
                let bpc = if demoted {
                    var.promoted_piece_type(upt)
                        .map(|ppt| Piece::new(unpromoted.color(), ppt))
                        .unwrap_or(unpromoted)
                } else {
                    unpromoted
                };
                let promoted = (st.promoted_bycatch | st.demoted_bycatch).contains(bsq);
                let original = if demoted { unpromoted } else { Piece::NONE };
                self.put_piece(bpc, bsq, promoted, original);
                let owned = self.demoted_capture(bpc, promoted, original);
                self.release_captured(owned);
            }
        }

        if let Some(gpt) = m.gating_type() {
            self.remove_piece(m.gating_square());
            self.add_to_hand(Piece::new(us, gpt));
        }

        if var.commit_gates && st.removed_gating_type.is_some() {
            let p = self.piece_on(from);
            self.commit_piece(p, from.file());
            self.remove_piece(from);
        }
        if var.commit_gates
            && st.captured_piece.is_some()
            && let Some(gpt) = st.captured_gating_type
        {
            self.commit_piece(Piece::new(st.captured_piece.color(), gpt), to.file());
        }

        match mt {
            MoveType::Promotion => {
                self.remove_piece(to);
                self.put_piece(st.promotion_pawn, to, false, Piece::NONE);
            }
            MoveType::PiecePromotion => {
                let unpromoted = self.unpromoted_piece_on(to);
                self.remove_piece(to);
                self.put_piece(unpromoted, to, false, Piece::NONE);
            }
            MoveType::PieceDemotion => {
                let demoted = self.piece_on(to);
                if let Some(ppt) = demoted.piece_type().and_then(|dpt| var.promoted_piece_type(dpt)) {
                    self.remove_piece(to);
                    self.put_piece(Piece::new(us, ppt), to, true, demoted);
                }
            }
            _ => {}
        }

        if mt == MoveType::Castling {
            self.undo_castling(us, from, to, &st);
        } else {
            if m.is_drop() {
                let hand_pt = m.in_hand_piece_type().or(m.dropped_piece_type()).unwrap_or(PieceType::Pawn);
                self.undrop_piece(Piece::new(us, hand_pt), to);
            } else if from != to {
                self.move_piece(to, from);
            }
            if st.captured_piece.is_some() {
                let capsq = st.capture_square.unwrap_or(to);
                self.put_piece(st.captured_piece, capsq, st.captured_promoted, st.unpromoted_captured_piece);
                let owned = self.demoted_capture(st.captured_piece, st.captured_promoted, st.unpromoted_captured_piece);
                self.release_captured(owned);
            }
        }

        if var.flip_enclosed_pieces != EnclosingRule::None {
            for s in st.flipped_pieces {
                let resulting = self.piece_on(s).flip();
                self.remove_piece(s);
                self.put_piece(resulting, s, false, Piece::NONE);
            }
        }

        self.game_ply -= 1;

        #[cfg(feature = "debug")]
        assert!(self.pos_is_ok());
    }

    /// 手番だけを渡す（王手されていないこと）
    pub fn do_null_move(&mut self) {
        debug_assert!(!self.in_check());
        let z = zobrist();
        let prev_idx = self.state_index();
        let mut st = self.state().clone();
        st.previous = Some(prev_idx);
        st.mv = Move::NULL;
        for s in st.ep_squares {
            st.key ^= z.enpassant[s.file().index()];
        }
        st.ep_squares = Bitboard::EMPTY;
        st.key ^= z.side;
        st.rule50 += 1;
        st.plies_from_null = 0;
        st.repetition = 0;
        st.captured_piece = Piece::NONE;
        st.pass = false;

        self.states.push(st);
        self.side_to_move = !self.side_to_move;
        self.set_check_info();
    }

    pub fn undo_null_move(&mut self) {
        debug_assert!(!self.in_check());
        debug_assert!(self.states.len() > 1);
        self.states.pop();
        self.side_to_move = !self.side_to_move;
    }

    // ========== 補助 ==========

    /// キャスリングで王とルークを動かす（960 ではマスが重なることがある）
    ///
    /// 王とルークの行き先を返す。
    fn do_castling(
        &mut self,
        us: Color,
        kfrom: Square,
        rfrom: Square,
        st: &mut StateInfo,
        k: &mut Key,
    ) -> (Square, Square) {
        let (kto, rto) = self.castling_destinations(us, kfrom, rfrom);
        let king = self.piece_on(kfrom);
        let rook = self.piece_on(rfrom);
        self.remove_piece(kfrom);
        self.remove_piece(rfrom);
        self.put_piece(king, kto, false, Piece::NONE);
        self.put_piece(rook, rto, false, Piece::NONE);

        if self.var.commit_gates && self.has_committed_piece(us, rfrom.file()) {
            st.removed_castling_gating_type = self.drop_committed_piece(us, rfrom.file());
            self.key_committed_drop(st, k, us, rfrom);
        }
        (kto, rto)
    }

    fn undo_castling(&mut self, us: Color, kfrom: Square, rfrom: Square, popped: &StateInfo) {
        let (kto, rto) = self.castling_destinations(us, kfrom, rfrom);
        if self.var.commit_gates && popped.removed_castling_gating_type.is_some() {
            let p = self.piece_on(rfrom);
            self.commit_piece(p, rfrom.file());
            self.remove_piece(rfrom);
        }
        let king = self.piece_on(kto);
        let rook = self.piece_on(rto);
        self.remove_piece(kto);
        self.remove_piece(rto);
        self.put_piece(king, kfrom, false, Piece::NONE);
        self.put_piece(rook, rfrom, false, Piece::NONE);
    }

    /// キャスリング後の王とルークのマス
    fn castling_destinations(&self, us: Color, kfrom: Square, rfrom: Square) -> (Square, Square) {
        let king_side = rfrom > kfrom;
        let file = if king_side { self.var.castling_kingside_file } else { self.var.castling_queenside_file };
        let kto = Square::new(file, self.castling_rank(us));
        let rto = kto.offset(if king_side { -1 } else { 1 }, 0).unwrap_or(kto);
        (kto, rto)
    }

    /// 予約ゲートの駒を置いたときのキー
    fn key_committed_drop(&self, st: &mut StateInfo, k: &mut Key, c: Color, s: Square) {
        let placed = self.piece_on(s);
        if let Some(ppt) = placed.piece_type() {
            *k ^= zobrist_psq(placed, s);
            st.material_key ^= zobrist_material(placed, self.count(c, ppt) - 1);
        }
    }

    /// 取った駒が持ち駒・牢に入るときの駒（取られた側の色）
    fn demoted_capture(&self, captured: Piece, promoted: bool, unpromoted: Piece) -> Piece {
        if !promoted || self.var.drop_loop {
            captured
        } else if unpromoted.is_some() {
            unpromoted
        } else {
            let pawn = self.var.promotion_pawn_type.unwrap_or(PieceType::Pawn);
            Piece::new(captured.color(), pawn)
        }
    }

    /// 取った駒を持ち駒か牢に入れ、変化したキーを返す
    fn collect_captured(&mut self, owned: Piece) -> Key {
        match self.var.capture_type {
            CapturingRule::Hand => {
                let to_hand = owned.flip();
                self.add_to_hand(to_hand);
                let n = self.count_in_hand(to_hand.color(), to_hand.piece_type().unwrap_or(PieceType::Pawn));
                zobrist_in_hand(to_hand, n - 1) ^ zobrist_in_hand(to_hand, n)
            }
            CapturingRule::Prison => {
                let n = self.add_to_prison(owned);
                zobrist_in_prison(owned, n - 1) ^ zobrist_in_prison(owned, n)
            }
            CapturingRule::MoveOut => 0,
        }
    }

    /// `collect_captured` の取り消し
    fn release_captured(&mut self, owned: Piece) {
        match self.var.capture_type {
            CapturingRule::Hand => self.remove_from_hand(owned.flip()),
            CapturingRule::Prison => {
                self.remove_from_prison(owned);
            }
            CapturingRule::MoveOut => {}
        }
    }

    /// 爆発などで駒を 1 つ取り除き、変化したキーを返す
    fn remove_bycatch(&mut self, var: &Variant, st: &mut StateInfo, us: Color, to: Square, bsq: Square) -> Key {
        let bpc = self.piece_on(bsq);
        let Some(bpt) = bpc.piece_type() else { return 0 };
        let bc = bpc.color();
        let mut k = 0;

        let promoted = self.is_promoted(bsq);
        let unpromoted = self.unpromoted_piece_on(bsq);
        st.unpromoted_bycatch[bsq.index()] = if unpromoted.is_some() { unpromoted } else { bpc };
        if unpromoted.is_some() {
            st.demoted_bycatch |= bsq;
        } else if promoted {
            st.promoted_bycatch |= bsq;
        }
        self.remove_piece(bsq);

        if var.points_counting {
            award_points(var, st, us, bpc);
        }
        if var.captures_to_hand() {
            let original = if unpromoted.is_some() { unpromoted } else { Piece::NONE };
            let owned = self.demoted_capture(bpc, promoted, original);
            k ^= self.collect_captured(owned);
        }

        k ^= zobrist_psq(bpc, bsq);
        st.material_key ^= zobrist_material(bpc, self.count(bc, bpt));
        if bpt == PieceType::Pawn {
            st.pawn_key ^= zobrist_psq(bpc, bsq);
        }

        let z = zobrist();
        let mask = self.castling_rights_mask[bsq.index()];
        if st.castling_rights != 0 && mask != 0 {
            k ^= z.castling[st.castling_rights as usize];
            st.castling_rights &= !mask;
            k ^= z.castling[st.castling_rights as usize];
        }

        // 石になった駒は壁になる
        let petrified = if bsq == to { var.petrify_on_capture_types.contains(bpt) } else { var.petrify_blast_pieces };
        if petrified {
            st.wall_squares |= bsq;
            self.by_type[0] |= bsq;
            k ^= z.wall[bsq.index()];
        }
        k
    }

    /// 挟み取りで取られる駒
    fn surrounded_pieces(&self, us: Color, to: Square) -> Bitboard {
        let var = &*self.var;
        let them = !us;
        let board = var.board_bb();
        let hostile = var.surround_capture_hostile_region;
        let mut removal = Bitboard::EMPTY;
        for sign in [-1, 1] {
            for &(df, dr) in &var.connect_directions {
                let (df, dr) = (df * sign, dr * sign);
                let Some(s) = to.offset(df, dr) else { continue };
                if !self.pieces_c(them).contains(s) {
                    continue;
                }
                if var.surround_capture_max_region.contains(s) {
                    let surrounded = attacks_bb(us, PieceType::Wazir, s, self.pieces_c(them))
                        .iter()
                        .all(|s2| hostile.contains(s2) || self.pieces_c(us).contains(s2));
                    if !surrounded {
                        continue;
                    }
                    removal |= s;
                }
                match s.offset(df, dr).filter(|o| board.contains(*o)) {
                    None => {
                        if var.surround_capture_edge {
                            removal |= s;
                        }
                    }
                    Some(o) => {
                        if var.surround_capture_opposite && (self.pieces_c(us).contains(o) || hostile.contains(o)) {
                            removal |= s;
                        }
                    }
                }
            }
        }
        removal
    }

    /// 置いた石に挟まれて裏返る相手の駒
    fn enclosed_pieces(&self, us: Color, to: Square, mt: MoveType) -> Bitboard {
        let them = !us;
        match self.var.flip_enclosed_pieces {
            EnclosingRule::Reversi => {
                let ends = attacks_bb(us, PieceType::Queen, to, !self.pieces_c(them))
                    & !pseudo_attacks(us, PieceType::King, to)
                    & self.pieces_c(us);
                let mut flipped = Bitboard::EMPTY;
                for s in ends {
                    flipped |= between_bb(s, to) ^ to;
                }
                flipped
            }
            EnclosingRule::Ataxx => pseudo_attacks(us, PieceType::King, to) & self.pieces_c(them),
            EnclosingRule::Quadwrangle => {
                let around = pseudo_attacks(us, PieceType::King, to);
                if (around & self.pieces_c(us)).is_not_empty() || mt == MoveType::Normal {
                    around & self.pieces_c(them)
                } else {
                    Bitboard::EMPTY
                }
            }
            _ => Bitboard::EMPTY,
        }
    }

    /// 歩の 2 歩・3 歩進みで e.p. のマスを設定し、変化したキーを返す
    fn set_ep_squares(&self, var: &Variant, st: &mut StateInfo, m: Move, us: Color, from: Square, to: Square) -> Key {
        let them = !us;
        let distance = to.rank_distance(from);
        if from.file() != to.file() || !(distance == 2 || distance == 3) {
            return 0;
        }
        let z = zobrist();
        let other_types = !(var.en_passant_types - PieceSet::single(PieceType::Pawn)).is_empty();
        let mut k = 0;
        for back in 1..distance as i32 {
            let Some(sq) = to.offset(0, -back * us.sign()) else { continue };
            if var.en_passant_region.contains(sq)
                && ((pawn_attacks(us, sq) & self.pieces_cp(them, PieceType::Pawn)).is_not_empty() || other_types)
                && !(var.walling() && m.gating_square() == sq)
            {
                st.ep_squares |= sq;
                k ^= z.enpassant[sq.file().index()];
            }
        }
        k
    }

    /// 打った王・ルークにキャスリング権を与える
    fn castle_dropped_piece(&mut self, st: &mut StateInfo, k: &mut Key, us: Color, pt: PieceType, to: Square) {
        let var = Arc::clone(&self.var);
        let z = zobrist();
        let rank = self.castling_rank(us);
        let king_home = Square::new(var.castling_king_file, rank);
        let before = st.castling_rights;
        if pt == var.castling_king_piece && to.file() == var.castling_king_file {
            st.castling_king_square[us.index()] = Some(to);
            let corners = self.pieces_c(us) & Bitboard::rank(rank) & (Bitboard::file(File::A) | Bitboard::file(var.max_file));
            for s in corners {
                if self.piece_on(s).piece_type().is_some_and(|rpt| var.castling_rook_pieces.contains(rpt)) {
                    self.set_castling_right(st, us, s);
                }
            }
        } else if var.castling_rook_pieces.contains(pt)
            && (to.file() == File::A || to.file() == var.max_file)
            && self.piece_on(king_home) == Piece::new(us, var.castling_king_piece)
        {
            st.castling_king_square[us.index()] = Some(king_home);
            self.set_castling_right(st, us, to);
        }
        if st.castling_rights != before {
            *k ^= z.castling[before as usize] ^ z.castling[st.castling_rights as usize];
        }
    }

    /// 数え手の開始（指した後の局面で呼ぶ）
    fn start_counting(&mut self, var: &Variant, mover: Color, captured: Piece, mt: MoveType) {
        let stm = self.side_to_move;
        let total = self.count_all(Color::White) + self.count_all(Color::Black);
        let mover_limit = self.count_limit(mover);
        let stm_limit = self.count_limit(stm);
        let captured_pawn = captured.piece_type() == Some(PieceType::Pawn);
        let no_pawns = self.count_pt(PieceType::Pawn) == 0;
        let mover_count = self.count_all(mover);
        let stm_count = self.count_all(stm);

        let st = self.state_mut();
        if var.counting_rule != CountingRule::Asean && captured_pawn && mover_count == 1 && no_pawns && mover_limit != 0 {
            st.counting_limit = 2 * mover_limit;
            st.counting_ply = 2 * total - 1;
        }
        if (st.counting_limit == 0 || ((captured.is_some() || mt == MoveType::Promotion) && stm_count == 1)) && stm_limit != 0 {
            st.counting_limit = 2 * stm_limit;
            st.counting_ply = if var.counting_rule == CountingRule::Asean || stm_count > 1 { 0 } else { 2 * total };
        }
    }

    /// 同一局面までの手数（繰り返しの繰り返しは負）
    fn repetition_distance(&self) -> i32 {
        let st = self.state();
        let end = if self.var.captures_to_hand() {
            st.plies_from_null
        } else {
            st.rule50.min(st.plies_from_null)
        };
        if end < 4 {
            return 0;
        }
        let back2 = |idx: Option<usize>| {
            idx.and_then(|i| self.state_at(i).previous).and_then(|i| self.state_at(i).previous)
        };
        let mut stp = back2(Some(self.state_index()));
        let mut i = 4;
        while i <= end {
            stp = back2(stp);
            let Some(idx) = stp else { break };
            let other = self.state_at(idx);
            if other.key == st.key {
                return if other.repetition != 0 { -i } else { i };
            }
            i += 2;
        }
        0
    }
}

/// 取った駒の得点を加える
fn award_points(var: &Variant, st: &mut StateInfo, us: Color, victim: Piece) {
    let Some(vpt) = victim.piece_type() else { return };
    let points = var.piece_points(vpt);
    let owner = match var.points_rule_captures {
        PointsRule::Us => us,
        PointsRule::Them => !us,
        PointsRule::Owner => victim.color(),
        PointsRule::NonOwner => !victim.color(),
    };
    st.points_count[owner.index()] += points;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::MoveList;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        Position::set(Arc::new(Variant::preset(variant).unwrap()), fen, false).unwrap()
    }

    fn play(p: &mut Position, m: Move) {
        let gc = p.gives_check(m);
        p.do_move(m, gc);
    }

    fn assert_keys_match(p: &Position) {
        let (key, pawn_key, material_key) = p.compute_keys();
        assert_eq!(p.key(), key, "key mismatch at {}", p.fen());
        assert_eq!(p.pawn_key(), pawn_key, "pawn key mismatch at {}", p.fen());
        assert_eq!(p.material_key(), material_key, "material key mismatch at {}", p.fen());
    }

    /// 全合法手を do/undo して局面とキーが戻ることを確かめる
    fn check_all_moves(p: &mut Position) {
        let fen = p.fen();
        let key = p.key();
        for &m in MoveList::legal(p).iter() {
            play(p, m);
            assert_keys_match(p);
            p.undo_move(m);
            assert_eq!(p.fen(), fen, "after undo of {m:?}");
            assert_eq!(p.key(), key);
        }
    }

    #[test]
    fn test_do_undo_simple() {
        let mut p = pos("chess", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let m = Move::normal(sq("e2"), sq("e4"));
        play(&mut p, m);
        assert_eq!(p.fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
        assert_eq!(p.rule50_count(), 0);
        assert_eq!(p.game_ply(), 1);
        assert_keys_match(&p);
        p.undo_move(m);
        assert_eq!(p.fen(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    }

    #[test]
    fn test_ep_square_only_when_capturable() {
        let mut p = pos("chess", "4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1");
        play(&mut p, Move::normal(sq("e2"), sq("e4")));
        assert_eq!(p.ep_squares(), Bitboard::from_square(sq("e3")));
        let mut q = pos("chess", "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        play(&mut q, Move::normal(sq("e2"), sq("e4")));
        assert!(q.ep_squares().is_empty());
    }

    #[test]
    fn test_special_moves_round_trip() {
        // キャスリング・e.p.・成り
        let mut p = pos("chess", "r3k2r/1P6/8/3pP3/8/8/8/R3K2R w KQkq d6 0 2");
        check_all_moves(&mut p);
        let oo = Move::with_type(MoveType::Castling, sq("e1"), sq("h1"));
        play(&mut p, oo);
        assert_eq!(p.piece_on(sq("g1")).piece_type(), Some(PieceType::King));
        assert_eq!(p.piece_on(sq("f1")).piece_type(), Some(PieceType::Rook));
        assert_eq!(p.castling_rights() & castling_rights_of(Color::White), 0);
        assert_keys_match(&p);
    }

    #[test]
    fn test_crazyhouse_capture_to_hand() {
        let mut p = pos("crazyhouse", "4k3/8/5p2/8/4N3/8/8/4K3[] w - - 0 1");
        play(&mut p, Move::normal(sq("e4"), sq("f6")));
        assert_eq!(p.count_in_hand(Color::White, PieceType::Pawn), 1);
        assert_keys_match(&p);
        check_all_moves(&mut p);
    }

    #[test]
    fn test_promoted_capture_returns_pawn_to_hand() {
        let mut p = pos("crazyhouse", "4k3/8/8/2Q~5/4n3/8/8/4K3[] b - - 0 1");
        play(&mut p, Move::normal(sq("e4"), sq("c5"))); // 成った女王を取ると歩が手に入る
        assert_eq!(p.count_in_hand(Color::Black, PieceType::Pawn), 1);
        assert_eq!(p.count_in_hand(Color::Black, PieceType::Queen), 0);
        assert_keys_match(&p);
    }

    #[test]
    fn test_atomic_blast_round_trip() {
        let mut p = pos("atomic", "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let fen = p.fen();
        let m = Move::normal(sq("e4"), sq("d5"));
        play(&mut p, m);
        // 取った駒も取られた駒も消える
        assert!(p.piece_on(sq("d5")).is_none());
        assert!(p.piece_on(sq("e4")).is_none());
        assert_keys_match(&p);
        p.undo_move(m);
        assert_eq!(p.fen(), fen);
        check_all_moves(&mut p);
    }

    #[test]
    fn test_three_check_counter() {
        let mut p = pos("3check", "4k3/8/8/8/8/8/8/R3K3 w - - 3+3 0 1");
        let m = Move::normal(sq("a1"), sq("a8"));
        assert!(p.gives_check(m));
        play(&mut p, m);
        assert_eq!(p.checks_remaining(Color::White), 2);
        assert!(p.in_check());
        assert_keys_match(&p);
    }

    #[test]
    fn test_duck_wall_moves() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("duck").unwrap())).unwrap();
        let m = Move::normal(sq("e2"), sq("e4")).with_wall(sq("e5"));
        assert!(p.legal(m));
        play(&mut p, m);
        assert_eq!(p.wall_squares(), Bitboard::from_square(sq("e5")));
        assert_keys_match(&p);
        let reply = Move::normal(sq("d7"), sq("d5")).with_wall(sq("d4"));
        play(&mut p, reply);
        // 前の壁は消える
        assert_eq!(p.wall_squares(), Bitboard::from_square(sq("d4")));
        assert_keys_match(&p);
        p.undo_move(reply);
        assert_eq!(p.wall_squares(), Bitboard::from_square(sq("e5")));
        assert!(p.pieces().contains(sq("e5")));
    }

    #[test]
    fn test_reversi_flips() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("reversi").unwrap())).unwrap();
        let fen = p.fen();
        let m = MoveList::legal(&p)[0];
        play(&mut p, m);
        assert_eq!(p.state().flipped_pieces.count(), 1);
        assert_eq!(p.count_all(!p.side_to_move()), 4);
        assert_eq!(p.count_all(p.side_to_move()), 1);
        assert_keys_match(&p);
        p.undo_move(m);
        assert_eq!(p.fen(), fen);
    }

    #[test]
    fn test_minishogi_promotion_round_trip() {
        let mut p = pos("minishogi", "rbsgk/4p/5/P4/KGSBR[] w - - 0 1");
        check_all_moves(&mut p);
        let mut q = pos("minishogi", "4k/5/5/1R3/K4[] w - - 0 1");
        let m = Move::with_type(MoveType::PiecePromotion, sq("b2"), sq("b5"));
        play(&mut q, m);
        assert_eq!(q.piece_on(sq("b5")).piece_type(), Some(PieceType::Dragon));
        assert!(q.is_promoted(sq("b5")));
        assert_keys_match(&q);
        q.undo_move(m);
        assert_eq!(q.piece_on(sq("b2")).piece_type(), Some(PieceType::Rook));
        assert!(!q.is_promoted(sq("b2")));
    }

    #[test]
    fn test_seirawan_gating_round_trip() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("seirawan").unwrap())).unwrap();
        let m = Move::normal(sq("g1"), sq("f3")).with_gating(PieceType::Archbishop, sq("g1"));
        assert!(p.pseudo_legal(m) && p.legal(m));
        let fen = p.fen();
        play(&mut p, m);
        assert_eq!(p.piece_on(sq("g1")).piece_type(), Some(PieceType::Archbishop));
        assert_eq!(p.count_in_hand(Color::White, PieceType::Archbishop), 0);
        assert!(!p.gates(Color::White).contains(sq("g1")));
        assert_keys_match(&p);
        p.undo_move(m);
        assert_eq!(p.fen(), fen);
    }

    #[test]
    fn test_null_move() {
        let mut p = pos("chess", "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1");
        let key = p.key();
        p.do_null_move();
        assert_eq!(p.side_to_move(), Color::White);
        assert!(p.ep_squares().is_empty());
        assert_keys_match(&p);
        p.undo_null_move();
        assert_eq!(p.key(), key);
        assert_eq!(p.side_to_move(), Color::Black);
    }

    #[test]
    fn test_repetition_distance() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("chess").unwrap())).unwrap();
        let cycle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
        for (f, t) in cycle {
            play(&mut p, Move::normal(sq(f), sq(t)));
        }
        assert_eq!(p.state().repetition, 4);
        for (f, t) in cycle {
            play(&mut p, Move::normal(sq(f), sq(t)));
        }
        assert_eq!(p.state().repetition, -4);
    }

    #[test]
    fn test_makruk_counting_starts() {
        // 黒の最後の駒を取ると、王だけになった黒が数え始める
        let mut p = pos("makruk", "4k3/8/8/8/8/8/r7/KR6 w - - 0 1");
        let before = p.counting_limit();
        let m = Move::normal(sq("a1"), sq("a2"));
        play(&mut p, m);
        assert_eq!(p.counting_limit(), 32);
        assert_eq!(p.counting_ply_raw(), 6);
        p.undo_move(m);
        assert_eq!(p.counting_limit(), before);
    }

    #[test]
    fn test_startpos_round_trip_across_variants() {
        crate::init();
        for name in ["xiangqi", "janggi", "makruk", "crazyhouse", "atomic", "extinction"] {
            let mut p = Position::startpos(Arc::new(Variant::preset(name).unwrap())).unwrap();
            check_all_moves(&mut p);
        }
    }

    #[test]
    fn test_castling_destinations() {
        let p = pos("chess", "4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let (kto, rto) = p.castling_destinations(Color::White, sq("e1"), sq("h1"));
        assert_eq!((kto, rto), (sq("g1"), sq("f1")));
        let (kto, rto) = p.castling_destinations(Color::White, sq("e1"), sq("a1"));
        assert_eq!((kto, rto), (sq("c1"), sq("d1")));
    }
}
