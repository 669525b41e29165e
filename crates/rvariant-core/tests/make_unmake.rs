//! do_move / undo_move の逆操作と差分ハッシュの検証

mod common;

use proptest::prelude::*;
use rvariant_core::movegen::MoveList;
use rvariant_core::position::Position;

fn arb_variant() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["chess", "crazyhouse", "atomic", "3check", "makruk", "xiangqi", "minishogi"])
}

/// FEN から作り直した局面のキー
fn key_from_scratch(pos: &Position) -> u64 {
    Position::set(pos.variant_arc(), &pos.fen(), pos.is_chess960())
        .expect("own fen")
        .key()
}

/// 比較に使う局面の要約
fn snapshot(pos: &Position) -> (String, u64, u64, u64) {
    (pos.fen(), pos.key(), pos.material_key(), pos.pawn_key())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    #[test]
    fn prop_undo_restores_position(
        variant in arb_variant(),
        choices in prop::collection::vec(any::<usize>(), 1..40),
    ) {
        let mut pos = common::startpos(variant);
        let mut history = Vec::new();
        let mut played = Vec::new();
        for &choice in &choices {
            let moves = MoveList::legal(&pos);
            if moves.is_empty() {
                break;
            }
            let m = moves.as_slice()[choice % moves.len()];
            history.push(snapshot(&pos));
            common::play(&mut pos, m);
            played.push(m);
        }

        while let Some(m) = played.pop() {
            pos.undo_move(m);
            let expected = history.pop().expect("snapshot");
            prop_assert_eq!(snapshot(&pos), expected, "undo of {:?}", m);
        }
        prop_assert_eq!(pos.game_ply(), 0);
    }

    #[test]
    fn prop_incremental_key_matches_scratch(
        variant in arb_variant(),
        choices in prop::collection::vec(any::<usize>(), 1..30),
    ) {
        let mut pos = common::startpos(variant);
        for &choice in &choices {
            let moves = MoveList::legal(&pos);
            if moves.is_empty() {
                break;
            }
            let m = moves.as_slice()[choice % moves.len()];
            common::play(&mut pos, m);
            prop_assert_eq!(pos.key(), key_from_scratch(&pos), "after {:?} in {}", m, pos.fen());
        }
    }

    #[test]
    fn prop_null_move_round_trip(
        choices in prop::collection::vec(any::<usize>(), 1..20),
    ) {
        let mut pos = common::startpos("chess");
        common::random_walk(&mut pos, &choices);
        if !pos.in_check() {
            let before = snapshot(&pos);
            let stm = pos.side_to_move();
            pos.do_null_move();
            prop_assert_ne!(pos.key(), before.1);
            prop_assert_eq!(pos.side_to_move(), !stm);
            pos.undo_null_move();
            prop_assert_eq!(snapshot(&pos), before);
        }
    }
}

#[test]
fn test_gating_walls_and_flips_undo() {
    for variant in ["seirawan", "duck", "reversi", "connect4"] {
        let mut pos = common::startpos(variant);
        let start = snapshot(&pos);
        let played = common::random_walk(&mut pos, &[3, 17, 5, 11, 2, 23, 7, 13]);
        assert!(!played.is_empty(), "{variant}");
        for &m in played.iter().rev() {
            pos.undo_move(m);
        }
        assert_eq!(snapshot(&pos), start, "{variant}");
    }
}
