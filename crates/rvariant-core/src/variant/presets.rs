//! 組み込みのルール設定

use crate::bitboard::Bitboard;
use crate::types::{File, PieceSet, PieceType, Rank, Square, Value};

use super::{
    CapturingRule, ChasingRule, CountingRule, EnclosingRule, MaterialCounting, Variant,
    VariantError, WallingRule,
};

/// 組み込みの設定名
pub const PRESET_NAMES: [&str; 17] = [
    "chess",
    "fischerandom",
    "crazyhouse",
    "atomic",
    "3check",
    "kingofthehill",
    "racingkings",
    "extinction",
    "makruk",
    "xiangqi",
    "janggi",
    "minishogi",
    "seirawan",
    "duck",
    "connect4",
    "tictactoe",
    "reversi",
];

/// 長方形の領域（両端を含む）
fn rect(f1: File, f2: File, r1: Rank, r2: Rank) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for s in Square::iter() {
        if (f1..=f2).contains(&s.file()) && (r1..=r2).contains(&s.rank()) {
            bb.set(s);
        }
    }
    bb
}

fn ranks(r1: Rank, r2: Rank) -> Bitboard {
    rect(File::A, File::L, r1, r2)
}

fn squares(list: &[(File, Rank)]) -> Bitboard {
    list.iter().map(|&(f, r)| Square::new(f, r)).collect()
}

fn set(types: &[PieceType]) -> PieceSet {
    types.iter().copied().collect()
}

/// 王を Commoner（王の動きをする非王駒）に置き換えた設定
fn without_royal_king(v: Variant) -> Variant {
    let mut piece_chars = v.piece_chars.clone();
    piece_chars.insert(PieceType::Commoner, 'k');
    Variant {
        piece_types: v.piece_types.without(PieceType::King).with(PieceType::Commoner),
        piece_chars,
        castling_king_piece: PieceType::Commoner,
        extinction_value: -Value::MATE,
        extinction_piece_types: PieceSet::single(PieceType::Commoner),
        ..v
    }
}

fn chess() -> Variant {
    Variant::default()
}

fn fischerandom() -> Variant {
    Variant {
        name: "fischerandom".to_string(),
        chess960: true,
        ..chess()
    }
}

fn crazyhouse() -> Variant {
    Variant {
        name: "crazyhouse".to_string(),
        start_fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[] w KQkq - 0 1".to_string(),
        piece_drops: true,
        capture_type: CapturingRule::Hand,
        ..chess()
    }
}

fn atomic() -> Variant {
    let v = without_royal_king(chess());
    Variant {
        name: "atomic".to_string(),
        extinction_pseudo_royal: true,
        blast_on_capture: true,
        ..v
    }
}

fn three_check() -> Variant {
    Variant {
        name: "3check".to_string(),
        start_fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 3+3 0 1".to_string(),
        check_counting: true,
        ..chess()
    }
}

fn king_of_the_hill() -> Variant {
    let center = squares(&[(File::D, Rank::R4), (File::E, Rank::R4), (File::D, Rank::R5), (File::E, Rank::R5)]);
    Variant {
        name: "kingofthehill".to_string(),
        flag_piece_white: Some(PieceType::King),
        flag_piece_black: Some(PieceType::King),
        flag_region_white: center,
        flag_region_black: center,
        ..chess()
    }
}

fn racing_kings() -> Variant {
    Variant {
        name: "racingkings".to_string(),
        start_fen: "8/8/8/8/8/8/krbnNBRK/qrbnNBRQ w - - 0 1".to_string(),
        piece_types: set(&[PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen, PieceType::King]),
        flag_piece_white: Some(PieceType::King),
        flag_piece_black: Some(PieceType::King),
        flag_region_white: Bitboard::rank(Rank::R8),
        flag_region_black: Bitboard::rank(Rank::R8),
        flag_move: true,
        castling: false,
        checking: false,
        ..chess()
    }
}

fn extinction() -> Variant {
    let v = without_royal_king(chess());
    Variant {
        name: "extinction".to_string(),
        extinction_piece_types: set(&[
            PieceType::Commoner,
            PieceType::Queen,
            PieceType::Rook,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Pawn,
        ]),
        promotion_piece_types: v.promotion_piece_types.with(PieceType::Commoner),
        ..v
    }
}

fn makruk() -> Variant {
    let mut piece_chars = std::collections::BTreeMap::new();
    piece_chars.insert(PieceType::Fers, 'm');
    Variant {
        name: "makruk".to_string(),
        start_fen: "rnsmksnr/8/pppppppp/8/8/PPPPPPPP/8/RNSKMSNR w - - 0 1".to_string(),
        piece_types: set(&[
            PieceType::Pawn,
            PieceType::Knight,
            PieceType::Silver,
            PieceType::Fers,
            PieceType::Rook,
            PieceType::King,
        ]),
        piece_chars,
        promotion_region_white: Bitboard::rank(Rank::R6),
        promotion_region_black: Bitboard::rank(Rank::R3),
        promotion_piece_types: PieceSet::single(PieceType::Fers),
        double_step_region_white: Bitboard::EMPTY,
        double_step_region_black: Bitboard::EMPTY,
        en_passant_region: Bitboard::EMPTY,
        castling: false,
        n_move_rule: 0,
        counting_rule: CountingRule::Makruk,
        ..chess()
    }
}

/// 象棋・チャンギ共通の駒文字
fn xiangqi_chars(advisor: PieceType, elephant: PieceType, cannon: PieceType) -> std::collections::BTreeMap<PieceType, char> {
    [
        (PieceType::Horse, 'n'),
        (elephant, 'b'),
        (advisor, 'a'),
        (cannon, 'c'),
        (PieceType::Soldier, 'p'),
    ]
    .into_iter()
    .collect()
}

fn palace_white() -> Bitboard {
    rect(File::D, File::F, Rank::R1, Rank::R3)
}

fn palace_black() -> Bitboard {
    rect(File::D, File::F, Rank::R8, Rank::R10)
}

fn xiangqi() -> Variant {
    let mobility_white = [
        (PieceType::King, palace_white()),
        (PieceType::Fers, palace_white()),
        (PieceType::Elephant, ranks(Rank::R1, Rank::R5)),
    ]
    .into_iter()
    .collect();
    let mobility_black = [
        (PieceType::King, palace_black()),
        (PieceType::Fers, palace_black()),
        (PieceType::Elephant, ranks(Rank::R6, Rank::R10)),
    ]
    .into_iter()
    .collect();
    Variant {
        name: "xiangqi".to_string(),
        start_fen: "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1".to_string(),
        max_file: File::I,
        max_rank: Rank::R10,
        piece_types: set(&[
            PieceType::Rook,
            PieceType::Horse,
            PieceType::Elephant,
            PieceType::Fers,
            PieceType::Cannon,
            PieceType::Soldier,
            PieceType::King,
        ]),
        piece_chars: xiangqi_chars(PieceType::Fers, PieceType::Elephant, PieceType::Cannon),
        king_type: PieceType::Wazir,
        mobility_region_white: mobility_white,
        mobility_region_black: mobility_black,
        promotion_pawn_type: None,
        promotion_piece_types: PieceSet::EMPTY,
        soldier_promotion_rank: Rank::R6,
        double_step_region_white: Bitboard::EMPTY,
        double_step_region_black: Bitboard::EMPTY,
        en_passant_region: Bitboard::EMPTY,
        castling: false,
        flying_general: true,
        stalemate_value: -Value::MATE,
        n_move_rule: 0,
        n_fold_value: Value::DRAW,
        perpetual_check_illegal: true,
        chasing_rule: ChasingRule::Axf,
        ..chess()
    }
}

fn janggi() -> Variant {
    let mobility_white = [(PieceType::King, palace_white()), (PieceType::Wazir, palace_white())]
        .into_iter()
        .collect();
    let mobility_black = [(PieceType::King, palace_black()), (PieceType::Wazir, palace_black())]
        .into_iter()
        .collect();
    let diagonal_lines = squares(&[
        (File::D, Rank::R1),
        (File::F, Rank::R1),
        (File::E, Rank::R2),
        (File::D, Rank::R3),
        (File::F, Rank::R3),
        (File::D, Rank::R8),
        (File::F, Rank::R8),
        (File::E, Rank::R9),
        (File::D, Rank::R10),
        (File::F, Rank::R10),
    ]);
    Variant {
        name: "janggi".to_string(),
        start_fen: "rnba1abnr/4k4/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/4K4/RNBA1ABNR w - - 0 1".to_string(),
        max_file: File::I,
        max_rank: Rank::R10,
        piece_types: set(&[
            PieceType::Rook,
            PieceType::Horse,
            PieceType::JanggiElephant,
            PieceType::Wazir,
            PieceType::JanggiCannon,
            PieceType::Soldier,
            PieceType::King,
        ]),
        piece_chars: xiangqi_chars(PieceType::Wazir, PieceType::JanggiElephant, PieceType::JanggiCannon),
        king_type: PieceType::Wazir,
        mobility_region_white: mobility_white,
        mobility_region_black: mobility_black,
        diagonal_lines,
        promotion_pawn_type: None,
        promotion_piece_types: PieceSet::EMPTY,
        double_step_region_white: Bitboard::EMPTY,
        double_step_region_black: Bitboard::EMPTY,
        en_passant_region: Bitboard::EMPTY,
        castling: false,
        pass_white: true,
        pass_black: true,
        bikjang_rule: true,
        material_counting: MaterialCounting::Janggi,
        n_move_rule: 0,
        perpetual_check_illegal: true,
        ..chess()
    }
}

fn minishogi() -> Variant {
    let piece_chars = [
        (PieceType::ShogiPawn, 'p'),
        (PieceType::DragonHorse, 'h'),
        (PieceType::Dragon, 'd'),
    ]
    .into_iter()
    .collect();
    let promoted = [
        (PieceType::ShogiPawn, PieceType::Gold),
        (PieceType::Silver, PieceType::Gold),
        (PieceType::Bishop, PieceType::DragonHorse),
        (PieceType::Rook, PieceType::Dragon),
    ]
    .into_iter()
    .collect();
    Variant {
        name: "minishogi".to_string(),
        start_fen: "rbsgk/4p/5/P4/KGSBR[] w - - 0 1".to_string(),
        max_file: File::E,
        max_rank: Rank::R5,
        piece_types: set(&[
            PieceType::ShogiPawn,
            PieceType::Silver,
            PieceType::Gold,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::DragonHorse,
            PieceType::Dragon,
            PieceType::King,
        ]),
        piece_chars,
        promotion_region_white: Bitboard::rank(Rank::R5),
        promotion_region_black: Bitboard::rank(Rank::R1),
        promotion_pawn_type: None,
        promotion_piece_types: PieceSet::EMPTY,
        promoted_piece_type: promoted,
        mandatory_pawn_promotion: false,
        double_step_region_white: Bitboard::EMPTY,
        double_step_region_black: Bitboard::EMPTY,
        en_passant_region: Bitboard::EMPTY,
        castling: false,
        piece_drops: true,
        capture_type: CapturingRule::Hand,
        drop_no_doubled: Some(PieceType::ShogiPawn),
        promotion_zone_pawn_drops: true,
        immobility_illegal: true,
        shogi_pawn_drop_mate_illegal: true,
        stalemate_value: -Value::MATE,
        n_move_rule: 0,
        n_fold_rule: 4,
        perpetual_check_illegal: true,
        ..chess()
    }
}

fn seirawan() -> Variant {
    let piece_chars = [(PieceType::Archbishop, 'h'), (PieceType::Chancellor, 'e')]
        .into_iter()
        .collect();
    let v = chess();
    Variant {
        name: "seirawan".to_string(),
        start_fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[HEhe] w KQBCDFGkqbcdfg - 0 1".to_string(),
        piece_types: v.piece_types.with(PieceType::Archbishop).with(PieceType::Chancellor),
        piece_chars,
        promotion_piece_types: v
            .promotion_piece_types
            .with(PieceType::Archbishop)
            .with(PieceType::Chancellor),
        gating: true,
        seirawan_gating: true,
        ..v
    }
}

fn duck() -> Variant {
    let v = without_royal_king(chess());
    Variant {
        name: "duck".to_string(),
        walling_rule: WallingRule::Duck,
        checking: false,
        stalemate_value: Value::MATE,
        ..v
    }
}

/// 盤上に置いた石が動かないゲームの共通設定
fn placement_game(name: &str, fen: &str, max_file: File, max_rank: Rank) -> Variant {
    Variant {
        name: name.to_string(),
        start_fen: fen.to_string(),
        max_file,
        max_rank,
        piece_types: PieceSet::single(PieceType::Immobile),
        promotion_pawn_type: None,
        promotion_piece_types: PieceSet::EMPTY,
        double_step_region_white: Bitboard::EMPTY,
        double_step_region_black: Bitboard::EMPTY,
        en_passant_region: Bitboard::EMPTY,
        castling: false,
        piece_drops: true,
        must_drop: true,
        n_move_rule: 0,
        n_fold_rule: 0,
        ..chess()
    }
}

fn connect4() -> Variant {
    Variant {
        enclosing_drop: EnclosingRule::Top,
        connect_n: 4,
        ..placement_game(
            "connect4",
            "7/7/7/7/7/7[PPPPPPPPPPPPPPPPPPPPPppppppppppppppppppppp] w - - 0 1",
            File::G,
            Rank::R6,
        )
    }
}

fn tictactoe() -> Variant {
    Variant {
        connect_n: 3,
        ..placement_game("tictactoe", "3/3/3[PPPPPpppp] w - - 0 1", File::C, Rank::R3)
    }
}

fn reversi() -> Variant {
    Variant {
        enclosing_drop: EnclosingRule::Reversi,
        flip_enclosed_pieces: EnclosingRule::Reversi,
        pass_on_stalemate_white: true,
        pass_on_stalemate_black: true,
        stalemate_piece_count: true,
        material_counting: MaterialCounting::Unweighted,
        adjudicate_full_board: true,
        ..placement_game(
            "reversi",
            "8/8/8/3pP3/3Pp3/8/8/8[PPPPPPPPPPPPPPPPPPPPPPPPPPPPPPpppppppppppppppppppppppppppppp] w - - 0 1",
            File::H,
            Rank::R8,
        )
    }
}

impl Variant {
    /// 組み込みの設定を取得する（`conclude()` 済み）
    pub fn preset(name: &str) -> Result<Variant, VariantError> {
        let v = match name {
            "chess" => chess(),
            "fischerandom" => fischerandom(),
            "crazyhouse" => crazyhouse(),
            "atomic" => atomic(),
            "3check" => three_check(),
            "kingofthehill" => king_of_the_hill(),
            "racingkings" => racing_kings(),
            "extinction" => extinction(),
            "makruk" => makruk(),
            "xiangqi" => xiangqi(),
            "janggi" => janggi(),
            "minishogi" => minishogi(),
            "seirawan" => seirawan(),
            "duck" => duck(),
            "connect4" => connect4(),
            "tictactoe" => tictactoe(),
            "reversi" => reversi(),
            _ => return Err(VariantError::UnknownPreset(name.to_string())),
        };
        v.conclude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_conclude() {
        for name in PRESET_NAMES {
            let v = Variant::preset(name).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(v.is_concluded());
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(
            Variant::preset("chess2").unwrap_err(),
            VariantError::UnknownPreset("chess2".to_string())
        );
    }

    #[test]
    fn test_fast_attack_selection() {
        assert!(Variant::preset("crazyhouse").unwrap().fast_attacks);
        assert!(Variant::preset("minishogi").unwrap().fast_attacks2);
        let x = Variant::preset("xiangqi").unwrap();
        assert!(!x.fast_attacks && !x.fast_attacks2);
        // Commoner は fast_attacks の対象なので atomic も高速経路を使える
        assert!(Variant::preset("atomic").unwrap().fast_attacks);
    }

    #[test]
    fn test_palace_regions() {
        let j = Variant::preset("janggi").unwrap();
        assert_eq!(j.diagonal_lines.count(), 10);
        let palace = j.mobility_region(crate::types::Color::Black, PieceType::King).unwrap();
        assert_eq!(palace.count(), 9);
        assert!(palace.contains(Square::parse("e9").unwrap()));
    }
}
