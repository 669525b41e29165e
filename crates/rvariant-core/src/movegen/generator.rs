//! 指し手生成器
//!
//! 盤上の駒の手・打つ手・キャスリング・e.p.・特殊な手をすべて疑似合法手として生成し、
//! 合法手は `Position::legal` で絞り込む。ゲートと壁は生成した手に付け加える。

use crate::bitboard::{Bitboard, fers_attacks, knight_attacks};
use crate::position::Position;
use crate::types::{Color, KING_SIDE, Move, MoveType, PieceType, QUEEN_SIDE, Square};

use super::movelist::MoveList;

/// 疑似合法手を生成
pub fn generate_pseudo(pos: &Position, list: &mut MoveList) {
    let us = pos.side_to_move();
    generate_drops(pos, us, list);
    generate_piece_moves(pos, us, list);
    generate_en_passant(pos, us, list);
    generate_sittuyin_promotions(pos, us, list);
    generate_castling(pos, us, list);
    generate_cambodian_moves(pos, us, list);
    generate_pass(pos, us, list);
}

/// 合法手を生成
pub fn generate_legal(pos: &Position, list: &mut MoveList) {
    if pos.is_immediate_game_end(0).is_some() {
        return;
    }
    generate_pseudo(pos, list);
    list.retain(|m| pos.legal(m));
}

/// ゲートと壁を付け加えて追加
fn push_move(pos: &Position, us: Color, list: &mut MoveList, m: Move) {
    let var = pos.variant();
    if var.walling() {
        push_walls(pos, us, list, m);
    } else {
        list.push(m);
    }
    if !var.gating || m.is_drop() {
        return;
    }
    let gates = pos.gates(us);
    let mut gate_squares = Bitboard::EMPTY;
    if gates.contains(m.from()) {
        gate_squares |= m.from();
    }
    if m.move_type() == MoveType::Castling && gates.contains(m.to()) {
        gate_squares |= m.to();
    }
    for gate in gate_squares {
        for pt in var.piece_types.iter().filter(|&pt| pos.count_in_hand(us, pt) > 0) {
            let gated = m.with_gating(pt, gate);
            if var.walling() {
                push_walls(pos, us, list, gated);
            } else {
                list.push(gated);
            }
        }
    }
}

/// 壁を置ける全てのマスに展開
fn push_walls(pos: &Position, us: Color, list: &mut MoveList, m: Move) {
    let var = pos.variant();
    let (from, to) = (m.from(), m.to());
    let after = if m.is_drop() { pos.pieces() } else { pos.pieces() ^ from } | to;
    let targets = pos.board_bb() & !after & var.walling_region(us) & !pos.wall_squares();
    for w in targets {
        let walled = m.with_wall(w);
        if pos.wall_placement_ok(walled) {
            list.push(walled);
        }
    }
}

fn generate_drops(pos: &Position, us: Color, list: &mut MoveList) {
    let var = pos.variant();
    if !var.piece_drops {
        return;
    }
    for pt in var.piece_types.iter() {
        if !pos.can_drop(us, pt) && !(var.two_boards && pos.allow_virtual_drop(us, pt)) {
            continue;
        }
        for to in pos.drop_region_for(us, pt) & !pos.pieces() {
            push_move(pos, us, list, Move::drop(pt, pt, to));
        }
        if var.drop_promoted
            && let Some(ppt) = var.promoted_piece_type(pt)
        {
            for to in pos.drop_region_for(us, ppt) & !pos.pieces() {
                push_move(pos, us, list, Move::drop(pt, ppt, to));
            }
        }
    }
}

fn generate_piece_moves(pos: &Position, us: Color, list: &mut MoveList) {
    let them = !us;
    for from in pos.pieces_c(us) {
        let Some(pt) = pos.piece_on(from).piece_type() else { continue };
        let quiets = pos.moves_from(us, pt, from) & !pos.pieces();
        let captures = pos.attacks_from(us, pt, from) & pos.pieces_c(them);
        for to in quiets | captures {
            push_piece_move(pos, us, list, pt, from, to);
        }
    }
}

/// 成り・成り駒の戻りの選択肢を付けて追加
fn push_piece_move(pos: &Position, us: Color, list: &mut MoveList, pt: PieceType, from: Square, to: Square) {
    let var = pos.variant();
    let zone = pos.promotion_zone(us);
    let capture = pos.pieces_c(!us).contains(to);
    let on_capture_ok = !var.piece_promotion_on_capture || capture;

    if var.promotion_pawn_type == Some(pt) && zone.contains(to) && !var.sittuyin_promotion {
        for promo in var.promotion_piece_types.iter() {
            let limit = var.promotion_limit(promo);
            if limit == 0 || pos.count(us, promo) < limit {
                push_move(pos, us, list, Move::promotion(from, to, promo));
            }
        }
        if !var.mandatory_pawn_promotion {
            push_move(pos, us, list, Move::normal(from, to));
        }
        return;
    }

    let in_zone = zone.contains(from) || zone.contains(to);
    if in_zone && on_capture_ok {
        let promoted = pos.is_promoted(from);
        if !promoted && var.promoted_piece_type(pt).is_some() {
            push_move(pos, us, list, Move::with_type(MoveType::PiecePromotion, from, to));
            if !var.mandatory_piece_promotion {
                push_move(pos, us, list, Move::normal(from, to));
            }
            return;
        }
        if promoted && var.piece_demotion {
            push_move(pos, us, list, Move::with_type(MoveType::PieceDemotion, from, to));
            if !var.mandatory_piece_promotion {
                push_move(pos, us, list, Move::normal(from, to));
            }
            return;
        }
    }
    push_move(pos, us, list, Move::normal(from, to));
}

fn generate_en_passant(pos: &Position, us: Color, list: &mut MoveList) {
    let var = pos.variant();
    let targets = pos.ep_squares() & !pos.pieces();
    if targets.is_empty() {
        return;
    }
    for pt in var.en_passant_types.iter() {
        for from in pos.pieces_cp(us, pt) {
            for to in pos.attacks_from(us, pt, from) & targets {
                push_move(pos, us, list, Move::with_type(MoveType::EnPassant, from, to));
            }
        }
    }
}

/// その場か斜め前後への成り（シットゥイン）
fn generate_sittuyin_promotions(pos: &Position, us: Color, list: &mut MoveList) {
    let var = pos.variant();
    let Some(pawn) = var.promotion_pawn_type else { return };
    if !var.sittuyin_promotion {
        return;
    }
    let pawns = pos.pieces_cp(us, pawn);
    let zone = pos.promotion_zone(us);
    for from in pawns {
        if !zone.contains(from) && pawns.more_than_one() {
            continue;
        }
        let targets = Bitboard::from_square(from) | (fers_attacks(from) & pos.board_bb() & !pos.pieces());
        for promo in var.promotion_piece_types.iter() {
            let limit = var.promotion_limit(promo);
            if limit != 0 && pos.count(us, promo) >= limit {
                continue;
            }
            for to in targets {
                push_move(pos, us, list, Move::promotion(from, to, promo));
            }
        }
    }
}

fn generate_castling(pos: &Position, us: Color, list: &mut MoveList) {
    let var = pos.variant();
    if !var.castling || pos.in_check() {
        return;
    }
    let Some(kfrom) = pos.castling_king_square(us) else { return };
    for side in [KING_SIDE, QUEEN_SIDE] {
        let cr = pos.castling_rights_of(us) & side;
        if !pos.can_castle(cr) || pos.castling_impeded(cr) {
            continue;
        }
        if let Some(rfrom) = pos.castling_rook_square(cr) {
            push_move(pos, us, list, Move::with_type(MoveType::Castling, kfrom, rfrom));
        }
    }
}

/// 初手の王の跳びと Met の 2 マス進み（カンボジアの将棋）
fn generate_cambodian_moves(pos: &Position, us: Color, list: &mut MoveList) {
    let var = pos.variant();
    if !var.cambodian_moves || pos.in_check() {
        return;
    }
    let gates = pos.gates(us);
    let empty = pos.board_bb() & !pos.pieces();
    for from in gates & pos.pieces_c(us) {
        let targets = match pos.piece_on(from).piece_type() {
            Some(PieceType::King) => {
                let Some(next) = from.offset(0, us.sign()) else { continue };
                knight_attacks(from) & Bitboard::rank(next.rank())
            }
            Some(PieceType::Fers) => from.offset(0, 2 * us.sign()).map(Bitboard::from_square).unwrap_or_default(),
            _ => continue,
        };
        for to in targets & empty {
            push_move(pos, us, list, Move::with_type(MoveType::Special, from, to));
        }
    }
}

fn generate_pass(pos: &Position, us: Color, list: &mut MoveList) {
    if !pos.variant().pass(us) {
        return;
    }
    if let Some(s) = pos.king_square(us).or_else(|| pos.pieces_c(us).lsb()) {
        list.push(Move::with_type(MoveType::Special, s, s));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::variant::Variant;

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        Position::set(Arc::new(Variant::preset(variant).unwrap()), fen, false).unwrap()
    }

    fn startpos(variant: &str) -> Position {
        crate::init();
        Position::startpos(Arc::new(Variant::preset(variant).unwrap())).unwrap()
    }

    #[test]
    fn test_generate_startpos() {
        let p = startpos("chess");
        let pseudo = MoveList::pseudo(&p);
        assert_eq!(pseudo.len(), 20);
        let set: HashSet<_> = pseudo.iter().copied().collect();
        assert_eq!(set.len(), pseudo.len(), "no duplicates");
        for &m in pseudo.iter() {
            assert!(p.pseudo_legal(m), "{m:?} should be pseudo-legal");
        }
        assert_eq!(MoveList::legal(&p).len(), 20);
    }

    #[test]
    fn test_generate_promotions() {
        let p = pos("chess", "4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let a7 = Square::parse("a7").unwrap();
        let promotions = MoveList::pseudo(&p)
            .iter()
            .filter(|m| m.from() == a7)
            .count();
        // N, B, R, Q
        assert_eq!(promotions, 4);
    }

    #[test]
    fn test_generate_castling_and_ep() {
        let p = pos("chess", "r3k2r/8/8/3pP3/8/8/8/R3K2R w KQkq d6 0 2");
        let list = MoveList::legal(&p);
        let castles = list.iter().filter(|m| m.move_type() == MoveType::Castling).count();
        let ep = list.iter().filter(|m| m.move_type() == MoveType::EnPassant).count();
        assert_eq!(castles, 2);
        assert_eq!(ep, 1);
    }

    #[test]
    fn test_generate_drops() {
        let p = pos("crazyhouse", "4k3/8/8/8/8/8/8/4K3[N] w - - 0 1");
        let drops = MoveList::pseudo(&p).iter().filter(|m| m.is_drop()).count();
        assert_eq!(drops, 62);
    }

    #[test]
    fn test_generate_duck_walls() {
        let p = startpos("duck");
        let list = MoveList::legal(&p);
        // 20 手 x 残り 32 マス（動いた駒の元のマスは空き、行き先は埋まる）
        assert_eq!(list.len(), 20 * 32);
        assert!(list.iter().all(|m| p.board_bb().contains(m.gating_square())));
    }

    #[test]
    fn test_generate_seirawan_gating() {
        let p = startpos("seirawan");
        let list = MoveList::legal(&p);
        let knight_moves = list
            .iter()
            .filter(|m| m.from() == Square::parse("g1").unwrap())
            .count();
        // 2 手 x (ゲートなし + H + E)
        assert_eq!(knight_moves, 6);
    }

    #[test]
    fn test_generate_piece_promotion() {
        let p = pos("minishogi", "4k/5/5/1R3/K4[] w - - 0 1");
        let b2 = Square::parse("b2").unwrap();
        let b5 = Square::parse("b5").unwrap();
        let list = MoveList::pseudo(&p);
        assert!(list.contains(Move::with_type(MoveType::PiecePromotion, b2, b5)));
        assert!(list.contains(Move::normal(b2, b5)));
    }

    #[test]
    fn test_generate_pass_on_stalemate_only() {
        let p = startpos("reversi");
        let list = MoveList::legal(&p);
        assert_eq!(list.len(), 4);
        assert!(list.iter().all(|m| m.is_drop()));
    }
}
