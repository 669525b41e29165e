//! 代表的な局面の流れ

mod common;

use rvariant_core::movegen::{MoveList, parse_move, perft};
use rvariant_core::position::Position;
use rvariant_core::types::{BLACK_OO, BLACK_OOO, Color, PieceType, Value, WHITE_OO, WHITE_OOO};
use rvariant_core::variant::{PRESET_NAMES, Variant};

#[test]
fn test_open_game() {
    let mut pos = common::startpos("chess");
    let start_key = pos.key();
    let e4 = parse_move(&pos, "e2e4").expect("e2e4");
    common::play(&mut pos, e4);
    let e5 = parse_move(&pos, "e7e5").expect("e7e5");
    common::play(&mut pos, e5);
    // e.p. は取れないので書かない
    assert_eq!(pos.fen(), "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
    assert_eq!(pos.game_ply(), 2);
    assert_eq!(MoveList::legal(&pos).len(), 29);

    pos.undo_move(e5);
    pos.undo_move(e4);
    assert_eq!(pos.key(), start_key);
    assert_eq!(pos.game_ply(), 0);
}

#[test]
fn test_castling_updates_rights() {
    // f 筋を閉じておく
    let mut pos = common::position("chess", "r3k2r/5p2/8/8/8/8/5P2/R3K2R w KQkq - 0 1");
    common::play_uci(&mut pos, &["e1g1"]);
    assert_eq!(pos.fen(), "r3k2r/5p2/8/8/8/8/5P2/R4RK1 b kq - 1 1");
    assert!(!pos.can_castle(WHITE_OO) && !pos.can_castle(WHITE_OOO));
    assert!(pos.can_castle(BLACK_OO) && pos.can_castle(BLACK_OOO));
    assert!(parse_move(&pos, "e8g8").is_ok());
    assert!(parse_move(&pos, "e8c8").is_ok());
}

#[test]
fn test_castling_through_attacked_square() {
    let mut pos = common::position("chess", "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    common::play_uci(&mut pos, &["e1g1"]);
    // f1 のルークが f8 に利いている
    assert!(pos.can_castle(BLACK_OO));
    assert!(parse_move(&pos, "e8g8").is_err());
    assert!(parse_move(&pos, "e8c8").is_ok());
}

#[test]
fn test_opposite_castling() {
    rvariant_core::init();
    let mut var = Variant::preset("chess").expect("preset");
    var.opposite_castling = true;
    let var = std::sync::Arc::new(var.conclude().expect("conclude"));
    let mut pos = Position::set(var, "r3k2r/5p2/8/8/8/8/5P2/R3K2R w KQkq - 0 1", false).expect("fen");

    common::play_uci(&mut pos, &["e1g1"]);
    // 白が短いキャスリングをしたので黒は長い方だけ
    assert_eq!(pos.fen(), "r3k2r/5p2/8/8/8/8/5P2/R4RK1 b q - 1 1");
    assert!(!pos.can_castle(BLACK_OO));
    assert!(parse_move(&pos, "e8g8").is_err());
    assert!(parse_move(&pos, "e8c8").is_ok());
}

#[test]
fn test_extinction_ends_game() {
    let mut pos = common::position("extinction", "rnb1kbnr/pppppppp/8/8/8/3q4/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    assert_eq!(pos.is_immediate_game_end(0), None);
    common::play_uci(&mut pos, &["c2d3"]);

    assert_eq!(pos.count(Color::Black, PieceType::Queen), 0);
    assert_eq!(pos.is_immediate_game_end(0), Some(Value::mated_in(0)));
    assert!(MoveList::legal(&pos).is_empty());
}

#[test]
fn test_last_king_captured() {
    // 黒のキングが e4 に出てきている
    let mut pos = common::position("extinction", "rnbq1bnr/pppppppp/8/8/4k3/3P4/PPP1PPPP/RNBQKBNR w - - 0 1");
    assert_eq!(pos.is_immediate_game_end(0), None);
    common::play_uci(&mut pos, &["d3e4"]);

    assert_eq!(pos.count(Color::Black, PieceType::Commoner), 0);
    assert_eq!(pos.is_immediate_game_end(0), Some(Value::mated_in(0)));
}

#[test]
fn test_perft_startpos_depth_three() {
    let mut pos = common::startpos("chess");
    assert_eq!(perft(&mut pos, 1), 20);
    assert_eq!(perft(&mut pos, 2), 400);
    assert_eq!(perft(&mut pos, 3), 8902);
}

#[test]
fn test_perft_other_presets() {
    for (variant, expected) in [
        ("crazyhouse", [20, 400]),
        ("atomic", [20, 400]),
        ("xiangqi", [44, 1920]),
        ("makruk", [23, 529]),
    ] {
        let mut pos = common::startpos(variant);
        assert_eq!(perft(&mut pos, 1), expected[0], "{variant}");
        assert_eq!(perft(&mut pos, 2), expected[1], "{variant}");
    }
}

#[test]
fn test_every_preset_round_trips_its_start_fen() {
    for name in PRESET_NAMES {
        let pos = common::startpos(name);
        let again = Position::set(pos.variant_arc(), &pos.fen(), pos.is_chess960()).expect(name);
        assert_eq!(again.key(), pos.key(), "{name}");
        assert_eq!(again.fen(), pos.fen(), "{name}");
        assert!(pos.pos_is_ok(), "{name}");
    }
}
