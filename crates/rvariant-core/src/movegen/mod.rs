//! 指し手生成
//!
//! - `MoveList`: 指し手生成バッファ
//! - `generate_pseudo` / `generate_legal`: 疑似合法手・合法手
//! - `perft` / `divide`: 生成と do/undo の検証用
//! - `move_to_uci` / `parse_move`: 指し手の文字列表現

mod generator;
mod movelist;
mod parse;

pub use generator::{generate_legal, generate_pseudo};
pub use movelist::MoveList;
pub use parse::{MoveParseError, move_to_uci, parse_move};

use crate::position::Position;
use crate::types::Move;

/// 合法手の木の葉の数
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = MoveList::legal(pos);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for &m in moves.iter() {
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        nodes += perft(pos, depth - 1);
        pos.undo_move(m);
    }
    nodes
}

/// 初手ごとの perft
pub fn divide(pos: &mut Position, depth: u32) -> Vec<(Move, u64)> {
    let moves = MoveList::legal(pos);
    let mut result = Vec::with_capacity(moves.len());
    for &m in moves.iter() {
        let gives_check = pos.gives_check(m);
        pos.do_move(m, gives_check);
        let nodes = if depth > 1 { perft(pos, depth - 1) } else { 1 };
        pos.undo_move(m);
        result.push((m, nodes));
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::variant::Variant;

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        Position::set(Arc::new(Variant::preset(variant).unwrap()), fen, false).unwrap()
    }

    #[test]
    fn test_perft_startpos_shallow() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("chess").unwrap())).unwrap();
        assert_eq!(perft(&mut p, 1), 20);
        assert_eq!(perft(&mut p, 2), 400);
    }

    #[test]
    fn test_perft_kiwipete() {
        let mut p = pos("chess", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
        assert_eq!(perft(&mut p, 1), 48);
        assert_eq!(perft(&mut p, 2), 2039);
    }

    #[test]
    fn test_perft_position3() {
        // e.p. とピン
        let mut p = pos("chess", "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
        assert_eq!(perft(&mut p, 1), 14);
        assert_eq!(perft(&mut p, 2), 191);
        assert_eq!(perft(&mut p, 3), 2812);
    }

    #[test]
    fn test_perft_position4_promotions() {
        let mut p = pos("chess", "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1");
        assert_eq!(perft(&mut p, 1), 6);
        assert_eq!(perft(&mut p, 2), 264);
    }

    #[test]
    fn test_divide_sums_to_perft() {
        crate::init();
        let mut p = Position::startpos(Arc::new(Variant::preset("chess").unwrap())).unwrap();
        let parts = divide(&mut p, 2);
        assert_eq!(parts.len(), 20);
        assert_eq!(parts.iter().map(|(_, n)| n).sum::<u64>(), 400);
    }
}
