//! 統合テストの共通ヘルパー

#![allow(dead_code)]

use std::sync::Arc;

use rvariant_core::movegen::MoveList;
use rvariant_core::position::Position;
use rvariant_core::types::Move;
use rvariant_core::variant::Variant;

/// プリセットの開始局面
pub fn startpos(variant: &str) -> Position {
    rvariant_core::init();
    let var = Arc::new(Variant::preset(variant).expect("preset"));
    Position::startpos(var).expect("start fen")
}

/// プリセットと FEN から局面を作る
pub fn position(variant: &str, fen: &str) -> Position {
    rvariant_core::init();
    let var = Arc::new(Variant::preset(variant).expect("preset"));
    Position::set(var, fen, false).expect("fen")
}

/// 王手判定を済ませて指す
pub fn play(pos: &mut Position, m: Move) {
    let gives_check = pos.gives_check(m);
    pos.do_move(m, gives_check);
}

/// UCI 形式の手を順に指す
pub fn play_uci(pos: &mut Position, moves: &[&str]) {
    for text in moves {
        let m = rvariant_core::movegen::parse_move(pos, text).unwrap_or_else(|e| panic!("{text}: {e}"));
        play(pos, m);
    }
}

/// choices の値で合法手を選びながら進める。指した手を返す
pub fn random_walk(pos: &mut Position, choices: &[usize]) -> Vec<Move> {
    let mut played = Vec::new();
    for &choice in choices {
        let moves = MoveList::legal(pos);
        if moves.is_empty() {
            break;
        }
        let m = moves.as_slice()[choice % moves.len()];
        play(pos, m);
        played.push(m);
    }
    played
}
