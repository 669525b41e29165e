//! 千日手検出：cuckoo テーブルと局面の履歴をたどる方法の比較

mod common;

use proptest::prelude::*;
use rvariant_core::movegen::MoveList;
use rvariant_core::position::Position;
use rvariant_core::types::Value;

/// 1 手で以前の局面（cuckoo の探索範囲内）に戻れるかを総当たりで調べる
fn returns_to_history(pos: &mut Position, keys: &[u64]) -> bool {
    let n = keys.len() - 1;
    let end = (pos.rule50_count() as usize).min(n);
    let moves = MoveList::legal(pos);
    for &m in moves.iter() {
        common::play(pos, m);
        let after = pos.key();
        pos.undo_move(m);
        let hit = (3..=end).step_by(2).any(|i| keys[n - i] == after);
        if hit {
            return true;
        }
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    #[test]
    fn prop_cuckoo_finds_every_return_move(
        choices in prop::collection::vec(any::<usize>(), 1..40),
    ) {
        // 馬と王だけなので可逆手ばかり
        let mut pos = common::position("chess", "n3k2n/8/8/8/8/8/8/N3K2N w - - 0 1");
        let mut keys = vec![pos.key()];
        for &choice in &choices {
            let moves = MoveList::legal(&pos);
            if moves.is_empty() {
                break;
            }
            let m = moves.as_slice()[choice % moves.len()];
            common::play(&mut pos, m);
            keys.push(pos.key());

            if returns_to_history(&mut pos, &keys) {
                prop_assert!(pos.has_game_cycle(1000), "missed cycle at {}", pos.fen());
            }
        }
    }
}

#[test]
fn test_threefold_after_third_occurrence() {
    let mut pos = common::startpos("chess");
    let dance = ["g1f3", "g8f6", "f3g1", "f6g8"];
    common::play_uci(&mut pos, &dance);
    assert!(pos.has_repeated());
    // 2 回目は根以前の局面としては成立しない
    assert_eq!(pos.is_optional_game_end(0, 0), None);

    common::play_uci(&mut pos, &dance);
    assert_eq!(pos.is_optional_game_end(0, 0), Some(Value::DRAW));
}

#[test]
fn test_minishogi_needs_fourfold() {
    let mut pos = common::startpos("minishogi");
    let dance = ["e1e2", "a5a4", "e2e1", "a4a5"];
    for _ in 0..2 {
        common::play_uci(&mut pos, &dance);
    }
    assert_eq!(pos.is_optional_game_end(0, 0), None);
    common::play_uci(&mut pos, &dance);
    assert_eq!(pos.is_optional_game_end(0, 0), Some(Value::DRAW));
}
