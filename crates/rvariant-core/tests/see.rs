//! SEE の閾値に対する単調性

mod common;

use proptest::prelude::*;
use rvariant_core::movegen::MoveList;
use rvariant_core::types::Value;

fn arb_variant() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["chess", "crazyhouse", "makruk", "xiangqi"])
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]

    #[test]
    fn prop_see_ge_is_monotonic(
        variant in arb_variant(),
        choices in prop::collection::vec(any::<usize>(), 0..30),
        low in -2500i32..2500,
        delta in 0i32..2500,
    ) {
        let mut pos = common::startpos(variant);
        common::random_walk(&mut pos, &choices);
        for &m in MoveList::legal(&pos).iter() {
            // 高い閾値を満たすなら低い閾値も満たす
            if pos.see_ge(m, Value::new(low + delta)) {
                prop_assert!(pos.see_ge(m, Value::new(low)), "{:?} in {}", m, pos.fen());
            }
        }
    }
}

#[test]
fn test_see_zero_for_quiet_safe_moves() {
    let pos = common::startpos("chess");
    for &m in MoveList::legal(&pos).iter() {
        assert!(pos.see_ge(m, Value::ZERO), "{m:?}");
    }
}
