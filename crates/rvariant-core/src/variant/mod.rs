//! ルール設定（Variant）
//!
//! 1 つのゲームのルールを表す読み取り専用のレコード。
//! serde で TOML などから読み込むか、`Variant::preset` で組み込みの設定を得る。
//! 読み込んだ後は `conclude()` で派生フィールドを計算してから使う。

mod presets;
mod serde_impls;

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::bitboard::Bitboard;
use crate::types::{
    CastlingRights, Color, File, PIECE_NB, PIECE_TYPE_NB, Piece, PieceSet, PieceType, Rank, Value,
};

/// ルール設定のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariantError {
    #[error("unknown variant preset: {0}")]
    UnknownPreset(String),
    #[error("piece letter '{0}' is used by more than one piece type")]
    DuplicatePieceChar(char),
    #[error("board size {files}x{ranks} exceeds 12x10")]
    BoardTooLarge { files: usize, ranks: usize },
    #[error("piece type list is empty")]
    NoPieceTypes,
}

/// 取った駒の行き先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturingRule {
    /// 盤上から取り除く
    #[default]
    MoveOut,
    /// 取った側の持ち駒になる
    Hand,
    /// 取った側の牢に入る
    Prison,
}

/// 壁を置くルール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallingRule {
    #[default]
    None,
    /// 移動先から放てる位置に壁を置く（Amazons）
    Arrow,
    /// 壁（アヒル）を毎手動かす
    Duck,
    /// 盤端か既存の壁に隣接するマスに置く
    Edge,
    /// 移動元に壁を置く
    Past,
}

/// 挟んだ駒を裏返す / 打つ場所を制限するルール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnclosingRule {
    #[default]
    None,
    Reversi,
    Ataxx,
    Quadwrangle,
    Snort,
    Anyside,
    Top,
}

/// 手詰まり時などの駒数判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCounting {
    #[default]
    None,
    Janggi,
    Unweighted,
    WhiteDrawOdds,
    BlackDrawOdds,
}

/// 数え手ルール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingRule {
    #[default]
    None,
    Makruk,
    Cambodian,
    Asean,
}

/// 追いかけ（長捉）の判定ルール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChasingRule {
    #[default]
    None,
    /// アジアルール（AXF）
    Axf,
}

/// 駒を取ったときに点数を得る側
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsRule {
    /// 取った側
    #[default]
    Us,
    /// 取られた側
    Them,
    /// 取られた駒の持ち主
    Owner,
    /// 取られた駒の持ち主でない側
    NonOwner,
}

/// ルール設定
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Variant {
    pub name: String,
    pub start_fen: String,

    // ========== 盤と駒 ==========
    pub max_rank: Rank,
    pub max_file: File,
    pub piece_types: PieceSet,
    /// 既定の駒文字の上書き
    #[serde(deserialize_with = "serde_impls::piece_type_map")]
    pub piece_chars: BTreeMap<PieceType, char>,
    /// 王駒の動き
    pub king_type: PieceType,
    #[serde(deserialize_with = "serde_impls::piece_type_map")]
    pub mobility_region_white: BTreeMap<PieceType, Bitboard>,
    #[serde(deserialize_with = "serde_impls::piece_type_map")]
    pub mobility_region_black: BTreeMap<PieceType, Bitboard>,
    /// 盤上の特殊斜線（チャンギの宮）
    pub diagonal_lines: Bitboard,

    // ========== 成り ==========
    pub promotion_region_white: Bitboard,
    pub promotion_region_black: Bitboard,
    pub promotion_pawn_type: Option<PieceType>,
    pub promotion_piece_types: PieceSet,
    #[serde(deserialize_with = "serde_impls::piece_type_map")]
    pub promotion_limit: BTreeMap<PieceType, i32>,
    pub sittuyin_promotion: bool,
    #[serde(deserialize_with = "serde_impls::piece_type_map")]
    pub promoted_piece_type: BTreeMap<PieceType, PieceType>,
    pub piece_promotion_on_capture: bool,
    pub mandatory_pawn_promotion: bool,
    pub mandatory_piece_promotion: bool,
    pub piece_demotion: bool,
    pub soldier_promotion_rank: Rank,

    // ========== 歩の多段移動と e.p. ==========
    pub double_step_region_white: Bitboard,
    pub double_step_region_black: Bitboard,
    pub triple_step_region_white: Bitboard,
    pub triple_step_region_black: Bitboard,
    pub en_passant_region: Bitboard,
    pub en_passant_types: PieceSet,

    // ========== キャスリング ==========
    pub castling: bool,
    pub castling_dropped_piece: bool,
    pub castling_kingside_file: File,
    pub castling_queenside_file: File,
    pub castling_rank: Rank,
    pub castling_king_file: File,
    pub castling_king_piece: PieceType,
    pub castling_rook_pieces: PieceSet,
    pub opposite_castling: bool,
    /// 初期配置がシャッフルされる（Shredder 形式のキャスリング表記を使う）
    pub chess960: bool,
    /// この権利でキャスリングすると勝ち、失うと負け
    pub castling_wins: CastlingRights,

    // ========== 駒打ち ==========
    pub piece_drops: bool,
    pub drop_loop: bool,
    pub capture_type: CapturingRule,
    pub must_drop: bool,
    /// 打たなければならない駒種（None は全駒種）
    pub must_drop_type: Option<PieceType>,
    pub drop_checks: bool,
    pub drop_region_white: Bitboard,
    pub drop_region_black: Bitboard,
    pub first_rank_pawn_drops: bool,
    pub promotion_zone_pawn_drops: bool,
    pub drop_no_doubled: Option<PieceType>,
    pub drop_no_doubled_count: i32,
    pub drop_opposite_colored_bishop: bool,
    pub drop_promoted: bool,
    pub sittuyin_rook_drop: bool,
    pub enclosing_drop: EnclosingRule,
    pub enclosing_drop_start: Bitboard,
    pub two_boards: bool,

    // ========== ゲートと壁 ==========
    pub gating: bool,
    pub seirawan_gating: bool,
    pub commit_gates: bool,
    pub cambodian_moves: bool,
    pub walling_rule: WallingRule,
    pub walling_region_white: Bitboard,
    pub walling_region_black: Bitboard,

    // ========== 取りの特殊効果 ==========
    pub blast_on_capture: bool,
    pub blast_on_move: bool,
    pub blast_diagonals: bool,
    pub blast_center: bool,
    pub blast_immune_types: PieceSet,
    pub mutually_immune_types: PieceSet,
    pub petrify_on_capture_types: PieceSet,
    pub petrify_blast_pieces: bool,
    pub surround_capture_opposite: bool,
    pub surround_capture_edge: bool,
    pub surround_capture_max_region: Bitboard,
    pub surround_capture_hostile_region: Bitboard,
    pub flip_enclosed_pieces: EnclosingRule,

    // ========== 指し手の制約 ==========
    pub checking: bool,
    pub must_capture: bool,
    pub immobility_illegal: bool,
    pub pass_white: bool,
    pub pass_black: bool,
    pub pass_on_stalemate_white: bool,
    pub pass_on_stalemate_black: bool,
    pub multimove_offset: i32,
    pub multimove_cycle: i32,
    pub multimove_cycle_shift: i32,
    pub multimove_pass: Vec<bool>,
    pub multimove_capture: bool,
    pub multimove_check: bool,
    pub flying_general: bool,
    pub bikjang_rule: bool,
    pub makpong_rule: bool,
    pub duple_check: bool,

    // ========== 終局条件 ==========
    pub stalemate_value: Value,
    pub stalemate_piece_count: bool,
    pub checkmate_value: Value,
    pub shogi_pawn_drop_mate_illegal: bool,
    pub shatar_mate_rule: bool,
    pub extinction_value: Value,
    pub extinction_claim: bool,
    pub extinction_piece_types: PieceSet,
    /// 全駒数を絶滅判定の対象に含める
    pub extinction_all_pieces: bool,
    pub extinction_piece_count: i32,
    pub extinction_opponent_piece_count: i32,
    pub extinction_pseudo_royal: bool,
    pub flag_piece_white: Option<PieceType>,
    pub flag_piece_black: Option<PieceType>,
    pub flag_region_white: Bitboard,
    pub flag_region_black: Bitboard,
    pub flag_piece_count: i32,
    pub flag_piece_blocked_win: bool,
    pub flag_move: bool,
    pub flag_piece_safe: bool,
    pub check_counting: bool,
    pub connect_n: i32,
    pub connect_piece_types: PieceSet,
    pub connect_horizontal: bool,
    pub connect_vertical: bool,
    pub connect_diagonal: bool,
    pub connect_region1_white: Bitboard,
    pub connect_region1_black: Bitboard,
    pub connect_region2_white: Bitboard,
    pub connect_region2_black: Bitboard,
    pub connect_nxn: i32,
    pub collinear_n: i32,
    pub connect_group: i32,
    pub connect_value: Value,
    pub material_counting: MaterialCounting,
    pub counting_rule: CountingRule,
    pub adjudicate_full_board: bool,
    pub points_counting: bool,
    #[serde(deserialize_with = "serde_impls::piece_type_map")]
    pub piece_points: BTreeMap<PieceType, i32>,
    pub points_goal: i32,
    pub points_goal_value: Value,
    pub points_goal_simul_value: Value,
    pub points_rule_captures: PointsRule,
    pub sudoku: bool,
    pub sudoku_box_width: i32,
    pub sudoku_box_height: i32,
    pub sudoku_allowed_pawns: i32,
    pub sudoku_royal_conflict: bool,

    // ========== 手数・反復 ==========
    pub n_move_rule: i32,
    pub n_move_rule_types: PieceSet,
    pub n_move_hard_limit_rule: i32,
    pub n_move_hard_limit_rule_value: Value,
    pub n_fold_rule: i32,
    pub n_fold_value: Value,
    pub n_fold_value_absolute: bool,
    pub perpetual_check_illegal: bool,
    pub move_repetition_illegal: bool,
    pub chasing_rule: ChasingRule,

    // ========== conclude() で計算する派生フィールド ==========
    #[serde(skip)]
    pub fast_attacks: bool,
    #[serde(skip)]
    pub fast_attacks2: bool,
    #[serde(skip)]
    pub connect_directions: Vec<(i32, i32)>,
    #[serde(skip)]
    pub connect_piece_types_trimmed: PieceSet,
    #[serde(skip)]
    piece_to_char: Vec<char>,
    #[serde(skip)]
    mobility: Vec<Option<Bitboard>>,
    #[serde(skip)]
    concluded: bool,
}

impl Default for Variant {
    fn default() -> Self {
        let all = Bitboard::ALL;
        Variant {
            name: "chess".to_string(),
            start_fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".to_string(),
            max_rank: Rank::R8,
            max_file: File::H,
            piece_types: [
                PieceType::Pawn,
                PieceType::Knight,
                PieceType::Bishop,
                PieceType::Rook,
                PieceType::Queen,
                PieceType::King,
            ]
            .into_iter()
            .collect(),
            piece_chars: BTreeMap::new(),
            king_type: PieceType::King,
            mobility_region_white: BTreeMap::new(),
            mobility_region_black: BTreeMap::new(),
            diagonal_lines: Bitboard::EMPTY,
            promotion_region_white: Bitboard::rank(Rank::R8),
            promotion_region_black: Bitboard::rank(Rank::R1),
            promotion_pawn_type: Some(PieceType::Pawn),
            promotion_piece_types: [PieceType::Queen, PieceType::Rook, PieceType::Bishop, PieceType::Knight]
                .into_iter()
                .collect(),
            promotion_limit: BTreeMap::new(),
            sittuyin_promotion: false,
            promoted_piece_type: BTreeMap::new(),
            piece_promotion_on_capture: false,
            mandatory_pawn_promotion: true,
            mandatory_piece_promotion: false,
            piece_demotion: false,
            soldier_promotion_rank: Rank::R1,
            double_step_region_white: Bitboard::rank(Rank::R2),
            double_step_region_black: Bitboard::rank(Rank::R7),
            triple_step_region_white: Bitboard::EMPTY,
            triple_step_region_black: Bitboard::EMPTY,
            en_passant_region: all,
            en_passant_types: PieceSet::single(PieceType::Pawn),
            castling: true,
            castling_dropped_piece: false,
            castling_kingside_file: File::G,
            castling_queenside_file: File::C,
            castling_rank: Rank::R1,
            castling_king_file: File::E,
            castling_king_piece: PieceType::King,
            castling_rook_pieces: PieceSet::single(PieceType::Rook),
            opposite_castling: false,
            chess960: false,
            castling_wins: 0,
            piece_drops: false,
            drop_loop: false,
            capture_type: CapturingRule::MoveOut,
            must_drop: false,
            must_drop_type: None,
            drop_checks: true,
            drop_region_white: all,
            drop_region_black: all,
            first_rank_pawn_drops: false,
            promotion_zone_pawn_drops: false,
            drop_no_doubled: None,
            drop_no_doubled_count: 1,
            drop_opposite_colored_bishop: false,
            drop_promoted: false,
            sittuyin_rook_drop: false,
            enclosing_drop: EnclosingRule::None,
            enclosing_drop_start: Bitboard::EMPTY,
            two_boards: false,
            gating: false,
            seirawan_gating: false,
            commit_gates: false,
            cambodian_moves: false,
            walling_rule: WallingRule::None,
            walling_region_white: all,
            walling_region_black: all,
            blast_on_capture: false,
            blast_on_move: false,
            blast_diagonals: true,
            blast_center: true,
            blast_immune_types: PieceSet::EMPTY,
            mutually_immune_types: PieceSet::EMPTY,
            petrify_on_capture_types: PieceSet::EMPTY,
            petrify_blast_pieces: false,
            surround_capture_opposite: false,
            surround_capture_edge: false,
            surround_capture_max_region: Bitboard::EMPTY,
            surround_capture_hostile_region: Bitboard::EMPTY,
            flip_enclosed_pieces: EnclosingRule::None,
            checking: true,
            must_capture: false,
            immobility_illegal: false,
            pass_white: false,
            pass_black: false,
            pass_on_stalemate_white: false,
            pass_on_stalemate_black: false,
            multimove_offset: 0,
            multimove_cycle: 2,
            multimove_cycle_shift: 0,
            multimove_pass: Vec::new(),
            multimove_capture: true,
            multimove_check: true,
            flying_general: false,
            bikjang_rule: false,
            makpong_rule: false,
            duple_check: false,
            stalemate_value: Value::DRAW,
            stalemate_piece_count: false,
            checkmate_value: -Value::MATE,
            shogi_pawn_drop_mate_illegal: false,
            shatar_mate_rule: false,
            extinction_value: Value::NONE,
            extinction_claim: false,
            extinction_piece_types: PieceSet::EMPTY,
            extinction_all_pieces: false,
            extinction_piece_count: 0,
            extinction_opponent_piece_count: 0,
            extinction_pseudo_royal: false,
            flag_piece_white: None,
            flag_piece_black: None,
            flag_region_white: Bitboard::EMPTY,
            flag_region_black: Bitboard::EMPTY,
            flag_piece_count: 1,
            flag_piece_blocked_win: false,
            flag_move: false,
            flag_piece_safe: false,
            check_counting: false,
            connect_n: 0,
            connect_piece_types: PieceSet::EMPTY,
            connect_horizontal: true,
            connect_vertical: true,
            connect_diagonal: true,
            connect_region1_white: Bitboard::EMPTY,
            connect_region1_black: Bitboard::EMPTY,
            connect_region2_white: Bitboard::EMPTY,
            connect_region2_black: Bitboard::EMPTY,
            connect_nxn: 0,
            collinear_n: 0,
            connect_group: 0,
            connect_value: Value::MATE,
            material_counting: MaterialCounting::None,
            counting_rule: CountingRule::None,
            adjudicate_full_board: false,
            points_counting: false,
            piece_points: BTreeMap::new(),
            points_goal: 0,
            points_goal_value: Value::MATE,
            points_goal_simul_value: Value::DRAW,
            points_rule_captures: PointsRule::Us,
            sudoku: false,
            sudoku_box_width: 0,
            sudoku_box_height: 0,
            sudoku_allowed_pawns: 1,
            sudoku_royal_conflict: false,
            n_move_rule: 50,
            n_move_rule_types: PieceSet::single(PieceType::Pawn),
            n_move_hard_limit_rule: 0,
            n_move_hard_limit_rule_value: Value::DRAW,
            n_fold_rule: 3,
            n_fold_value: Value::DRAW,
            n_fold_value_absolute: false,
            perpetual_check_illegal: false,
            move_repetition_illegal: false,
            chasing_rule: ChasingRule::None,
            fast_attacks: false,
            fast_attacks2: false,
            connect_directions: Vec::new(),
            connect_piece_types_trimmed: PieceSet::EMPTY,
            piece_to_char: Vec::new(),
            mobility: Vec::new(),
            concluded: false,
        }
    }
}

/// 標準駒だけで構成されるときに使える高速な利き計算の対象
const FAST_ATTACK_TYPES: [PieceType; 9] = [
    PieceType::Pawn,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
    PieceType::Archbishop,
    PieceType::Chancellor,
    PieceType::Commoner,
    PieceType::King,
];

/// 将棋系の駒を含む高速な利き計算の対象
const FAST_ATTACK2_TYPES: [PieceType; 17] = [
    PieceType::Pawn,
    PieceType::Breakthrough,
    PieceType::Gold,
    PieceType::Knight,
    PieceType::Rook,
    PieceType::Queen,
    PieceType::Dragon,
    PieceType::Lance,
    PieceType::Bishop,
    PieceType::DragonHorse,
    PieceType::King,
    PieceType::Commoner,
    PieceType::Fers,
    PieceType::Silver,
    PieceType::Wazir,
    PieceType::ShogiKnight,
    PieceType::ShogiPawn,
];

impl Variant {
    /// 派生フィールドを計算し、設定の整合性を確認する
    pub fn conclude(mut self) -> Result<Variant, VariantError> {
        if self.piece_types.is_empty() {
            return Err(VariantError::NoPieceTypes);
        }
        let files = self.max_file.index() + 1;
        let ranks = self.max_rank.index() + 1;
        if files > crate::types::FILE_NB || ranks > crate::types::RANK_NB {
            return Err(VariantError::BoardTooLarge { files, ranks });
        }

        // 駒文字
        let mut chars = vec![' '; PIECE_NB];
        let mut seen: BTreeMap<char, PieceType> = BTreeMap::new();
        for pt in self.piece_types.iter() {
            let ch = self.piece_chars.get(&pt).copied().unwrap_or(pt.default_char()).to_ascii_lowercase();
            if let Some(&other) = seen.get(&ch)
                && other != pt
            {
                return Err(VariantError::DuplicatePieceChar(ch));
            }
            seen.insert(ch, pt);
            chars[Piece::new(Color::White, pt).index()] = ch.to_ascii_uppercase();
            chars[Piece::new(Color::Black, pt).index()] = ch;
        }
        self.piece_to_char = chars;

        // 駒種ごとの移動可能領域
        let board = Bitboard::board(self.max_file, self.max_rank);
        let mut mobility = vec![None; 2 * PIECE_TYPE_NB];
        for (c, regions) in [
            (Color::White, &self.mobility_region_white),
            (Color::Black, &self.mobility_region_black),
        ] {
            for (&pt, &region) in regions {
                mobility[c.index() * PIECE_TYPE_NB + pt.index()] = Some(region & board);
            }
        }
        self.mobility = mobility;

        let simple_rules = self.king_type == PieceType::King
            && self.mobility_region_white.is_empty()
            && self.mobility_region_black.is_empty()
            && self.diagonal_lines.is_empty();
        self.fast_attacks = simple_rules && self.piece_types.iter().all(|pt| FAST_ATTACK_TYPES.contains(&pt));
        self.fast_attacks2 = simple_rules
            && !self.fast_attacks
            && self.piece_types.iter().all(|pt| FAST_ATTACK2_TYPES.contains(&pt));

        // 連結判定の方向（逆向きは数えない）
        let mut dirs = Vec::new();
        if self.connect_horizontal {
            dirs.push((1, 0));
        }
        if self.connect_vertical {
            dirs.push((0, 1));
        }
        if self.connect_diagonal {
            dirs.push((1, 1));
            dirs.push((1, -1));
        }
        self.connect_directions = dirs;
        self.connect_piece_types_trimmed = if self.connect_piece_types.is_empty() {
            self.piece_types
        } else {
            self.connect_piece_types & self.piece_types
        };

        self.concluded = true;
        log::debug!(
            "variant '{}' concluded: fast_attacks={} fast_attacks2={}",
            self.name,
            self.fast_attacks,
            self.fast_attacks2
        );
        Ok(self)
    }

    /// `conclude()` 済みか
    #[inline]
    pub fn is_concluded(&self) -> bool {
        self.concluded
    }

    /// 盤面全体（壁は含む）
    #[inline]
    pub fn board_bb(&self) -> Bitboard {
        Bitboard::board(self.max_file, self.max_rank)
    }

    /// 駒の文字（白は大文字）
    #[inline]
    pub fn piece_to_char(&self, pc: Piece) -> char {
        self.piece_to_char.get(pc.index()).copied().unwrap_or(' ')
    }

    /// 文字から駒
    pub fn char_to_piece(&self, ch: char) -> Option<Piece> {
        if ch == ' ' {
            return None;
        }
        self.piece_to_char
            .iter()
            .position(|&c| c == ch)
            .map(Piece::from_index)
            .filter(|pc| pc.is_some())
    }

    /// 駒種の移動可能領域（制限なしは None）
    #[inline]
    pub fn mobility_region(&self, c: Color, pt: PieceType) -> Option<Bitboard> {
        self.mobility.get(c.index() * PIECE_TYPE_NB + pt.index()).copied().flatten()
    }

    #[inline]
    pub fn promotion_region(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.promotion_region_white,
            Color::Black => self.promotion_region_black,
        }
    }

    #[inline]
    pub fn double_step_region(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.double_step_region_white,
            Color::Black => self.double_step_region_black,
        }
    }

    #[inline]
    pub fn triple_step_region(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.triple_step_region_white,
            Color::Black => self.triple_step_region_black,
        }
    }

    #[inline]
    pub fn drop_region(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.drop_region_white,
            Color::Black => self.drop_region_black,
        }
    }

    #[inline]
    pub fn walling_region(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.walling_region_white,
            Color::Black => self.walling_region_black,
        }
    }

    #[inline]
    pub fn flag_piece(&self, c: Color) -> Option<PieceType> {
        match c {
            Color::White => self.flag_piece_white,
            Color::Black => self.flag_piece_black,
        }
    }

    #[inline]
    pub fn flag_region(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.flag_region_white,
            Color::Black => self.flag_region_black,
        }
    }

    #[inline]
    pub fn connect_region1(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.connect_region1_white,
            Color::Black => self.connect_region1_black,
        }
    }

    #[inline]
    pub fn connect_region2(&self, c: Color) -> Bitboard {
        match c {
            Color::White => self.connect_region2_white,
            Color::Black => self.connect_region2_black,
        }
    }

    #[inline]
    pub fn pass(&self, c: Color) -> bool {
        let own = match c {
            Color::White => self.pass_white,
            Color::Black => self.pass_black,
        };
        own || self.pass_on_stalemate(c) || self.multimove_offset != 0
    }

    #[inline]
    pub fn pass_on_stalemate(&self, c: Color) -> bool {
        match c {
            Color::White => self.pass_on_stalemate_white,
            Color::Black => self.pass_on_stalemate_black,
        }
    }

    /// 成り先の駒種
    #[inline]
    pub fn promoted_piece_type(&self, pt: PieceType) -> Option<PieceType> {
        self.promoted_piece_type.get(&pt).copied()
    }

    /// 成り駒の元の駒種
    pub fn unpromoted_piece_type(&self, pt: PieceType) -> Option<PieceType> {
        self.promoted_piece_type
            .iter()
            .find(|&(_, &to)| to == pt)
            .map(|(&from, _)| from)
    }

    /// 成りの枚数制限（0 は無制限）
    #[inline]
    pub fn promotion_limit(&self, pt: PieceType) -> i32 {
        self.promotion_limit.get(&pt).copied().unwrap_or(0)
    }

    #[inline]
    pub fn piece_points(&self, pt: PieceType) -> i32 {
        self.piece_points.get(&pt).copied().unwrap_or(0)
    }

    /// 取った駒を持ち駒・牢に移すか
    #[inline]
    pub fn captures_to_hand(&self) -> bool {
        self.capture_type != CapturingRule::MoveOut
    }

    #[inline]
    pub fn walling(&self) -> bool {
        self.walling_rule != WallingRule::None
    }

    /// 絶滅判定が有効か
    #[inline]
    pub fn extinction_enabled(&self) -> bool {
        self.extinction_value != Value::NONE
    }

    /// 多手番ルールで ply 手目が強制パスか
    pub fn multimove_pass_at(&self, ply: i32) -> bool {
        if self.multimove_offset == 0 {
            return false;
        }
        if ply < self.multimove_offset {
            return self.multimove_pass.get(ply.max(0) as usize).copied().unwrap_or(false);
        }
        let cycle = self.multimove_cycle.max(1);
        let phase = (ply - self.multimove_offset) % cycle;
        (phase + i32::from(phase >= self.multimove_cycle_shift)) % 2 != 0
    }
}

pub use presets::PRESET_NAMES;
pub use serde_impls::{parse_region, piece_type_from_name};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_chess() {
        let v = Variant::default().conclude().unwrap();
        assert!(v.fast_attacks);
        assert!(!v.fast_attacks2);
        assert_eq!(v.piece_to_char(Piece::new(Color::White, PieceType::Knight)), 'N');
        assert_eq!(v.char_to_piece('q'), Some(Piece::new(Color::Black, PieceType::Queen)));
        assert_eq!(v.char_to_piece('x'), None);
    }

    #[test]
    fn test_duplicate_piece_char_is_rejected() {
        let v = Variant {
            piece_types: [PieceType::Pawn, PieceType::ShogiPawn, PieceType::King].into_iter().collect(),
            ..Variant::default()
        };
        assert_eq!(v.conclude().unwrap_err(), VariantError::DuplicatePieceChar('p'));
    }

    #[test]
    fn test_connect_directions() {
        let v = Variant {
            connect_diagonal: false,
            ..Variant::default()
        }
        .conclude()
        .unwrap();
        assert_eq!(v.connect_directions, vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn test_multimove_pass_cycle() {
        let v = Variant {
            multimove_offset: 1,
            multimove_pass: vec![false],
            multimove_cycle: 4,
            multimove_cycle_shift: 2,
            ..Variant::default()
        };
        // 1 手目以降は 2 手指し（指す・パス・パス・指す のように交互）
        let pattern: Vec<bool> = (0..6).map(|p| v.multimove_pass_at(p)).collect();
        assert_eq!(pattern, vec![false, false, true, true, false, false]);
    }
}
