//! 高速経路の利き計算が一般経路と一致するか

mod common;

use proptest::prelude::*;
use rvariant_core::bitboard::Bitboard;
use rvariant_core::types::{Color, PieceType, Square};

fn arb_fast_variant() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["chess", "crazyhouse", "atomic", "minishogi"])
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn prop_fast_attackers_match_general(
        variant in arb_fast_variant(),
        choices in prop::collection::vec(any::<usize>(), 0..24),
        mask in any::<u128>(),
    ) {
        let mut pos = common::startpos(variant);
        common::random_walk(&mut pos, &choices);
        let var = pos.variant();
        prop_assert!(var.fast_attacks || var.fast_attacks2);

        // 駒の一部を取り除いた占有で比べる
        let occupied = pos.pieces() & Bitboard::new(mask);
        let cannons = pos.pieces_pt(PieceType::JanggiCannon);
        for s in var.board_bb() {
            for c in Color::ALL {
                let fast = pos.attackers_to_by(s, occupied, c, cannons);
                let general = pos.attackers_to_general(s, occupied, c, cannons);
                prop_assert_eq!(fast, general, "{:?} attackers of {} in {}", c, s, pos.fen());
            }
        }
    }
}

#[test]
fn test_attackers_agree_with_move_generation() {
    // 取る手の移動元は取られる駒への利きに含まれる
    let pos = common::position("chess", "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
    for &m in rvariant_core::movegen::MoveList::legal(&pos).iter() {
        if pos.capture(m) && !m.is_drop() && pos.capture_square(m.to()) == m.to() {
            assert!(pos.attackers_to(m.to(), Color::White).contains(m.from()), "{m:?}");
        }
    }
    let e5 = Square::parse("e5").expect("square");
    assert_eq!(pos.attackers_to(e5, Color::Black).count(), 0);
}
