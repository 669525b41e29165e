//! 局面（Position）
//!
//! 盤面・持ち駒・牢・ゲートと状態スタックを保持する。
//! 指し手の適用は `do_move.rs`、合法性は `legality.rs` を参照。

use std::sync::Arc;

use super::state::StateInfo;
use super::zobrist::{
    Key, zobrist, zobrist_checks, zobrist_in_hand, zobrist_in_prison, zobrist_material,
    zobrist_points, zobrist_psq,
};
use crate::bitboard::{Bitboard, attacks_bb, between_bb, king_attacks, wazir_attacks};
use crate::types::{
    CASTLING_RIGHT_NB, CastlingRights, Color, FILE_NB, File, KING_SIDE, Move, MoveType, PIECE_NB,
    PIECE_TYPE_NB, Piece, PieceSet, PieceType, QUEEN_SIDE, RANK_NB, Rank, SQUARE_NB, Square, Value,
    castling_rights_of,
};
use crate::variant::{CapturingRule, EnclosingRule, MaterialCounting, Variant};

/// 数独の区画の種類
const SUDOKU_FILE: usize = 0;
const SUDOKU_RANK: usize = 1;
const SUDOKU_BOX: usize = 2;

/// 局面
#[derive(Clone, Debug)]
pub struct Position {
    // === 盤面 ===
    /// 各マスの駒
    pub(super) board: [Piece; SQUARE_NB],
    /// 成り駒の成る前の駒（成り駒でなければ NONE）
    pub(super) unpromoted_board: [Piece; SQUARE_NB],
    /// 駒種別のBitboard（0 番は壁を含む全占有）
    pub(super) by_type: [Bitboard; PIECE_TYPE_NB],
    /// 手番別のBitboard
    pub(super) by_color: [Bitboard; Color::NUM],
    /// 駒の枚数（`color << 5` の添字は手番の合計）
    pub(super) piece_count: [i32; PIECE_NB],
    /// 成り駒
    pub(super) promoted_pieces: Bitboard,

    // === 持ち駒・牢・ゲート ===
    /// 持ち駒 [Color][PieceType]（0 番は合計）
    pub(super) in_hand: [[i32; PIECE_TYPE_NB]; Color::NUM],
    /// 牢の駒 [捕獲した側][PieceType]
    pub(super) in_prison: [[i32; PIECE_TYPE_NB]; Color::NUM],
    /// 借りている仮想の持ち駒の数
    pub(super) virtual_pieces: i32,
    /// 筋ごとに予約したゲートの駒 [Color][File]
    pub(super) committed_gates: [[Option<PieceType>; FILE_NB]; Color::NUM],

    // === キャスリング ===
    pub(super) castling_rights_mask: [CastlingRights; SQUARE_NB],
    pub(super) castling_rook_square: [Option<Square>; CASTLING_RIGHT_NB],
    pub(super) castling_path: [Bitboard; CASTLING_RIGHT_NB],

    // === 手番・手数 ===
    pub(super) side_to_move: Color,
    /// 初期局面からの手数（0 始まり）
    pub(super) game_ply: i32,
    pub(super) chess960: bool,

    // === ルール・状態 ===
    pub(super) var: Arc<Variant>,
    /// 状態スタック（最後の要素が現局面）
    pub(super) states: Vec<StateInfo>,
}

impl Position {
    /// 空の局面を生成
    pub(super) fn empty(var: Arc<Variant>) -> Self {
        Position {
            board: [Piece::NONE; SQUARE_NB],
            unpromoted_board: [Piece::NONE; SQUARE_NB],
            by_type: [Bitboard::EMPTY; PIECE_TYPE_NB],
            by_color: [Bitboard::EMPTY; Color::NUM],
            piece_count: [0; PIECE_NB],
            promoted_pieces: Bitboard::EMPTY,
            in_hand: [[0; PIECE_TYPE_NB]; Color::NUM],
            in_prison: [[0; PIECE_TYPE_NB]; Color::NUM],
            virtual_pieces: 0,
            committed_gates: [[None; FILE_NB]; Color::NUM],
            castling_rights_mask: [0; SQUARE_NB],
            castling_rook_square: [None; CASTLING_RIGHT_NB],
            castling_path: [Bitboard::EMPTY; CASTLING_RIGHT_NB],
            side_to_move: Color::White,
            game_ply: 0,
            chess960: false,
            var,
            states: vec![StateInfo::new()],
        }
    }

    // ========== 状態アクセス ==========

    /// 現局面の状態
    #[inline]
    pub fn state(&self) -> &StateInfo {
        &self.states[self.states.len() - 1]
    }

    #[inline]
    pub(super) fn state_mut(&mut self) -> &mut StateInfo {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// 1 つ前の局面の状態
    #[inline]
    pub(super) fn previous_state(&self) -> Option<&StateInfo> {
        self.state().previous.map(|i| &self.states[i])
    }

    /// 状態スタック上の idx 番目の状態
    #[inline]
    pub(super) fn state_at(&self, idx: usize) -> &StateInfo {
        &self.states[idx]
    }

    /// 現局面の状態の添字
    #[inline]
    pub(super) fn state_index(&self) -> usize {
        self.states.len() - 1
    }

    // ========== 盤面アクセス ==========

    #[inline]
    pub fn variant(&self) -> &Variant {
        &self.var
    }

    /// ルール設定の共有ハンドル
    #[inline]
    pub fn variant_arc(&self) -> Arc<Variant> {
        Arc::clone(&self.var)
    }

    #[inline]
    pub fn piece_on(&self, s: Square) -> Piece {
        self.board[s.index()]
    }

    #[inline]
    pub fn is_empty(&self, s: Square) -> bool {
        self.piece_on(s).is_none()
    }

    /// 全占有（壁を含む）
    #[inline]
    pub fn pieces(&self) -> Bitboard {
        self.by_type[0]
    }

    #[inline]
    pub fn pieces_c(&self, c: Color) -> Bitboard {
        self.by_color[c.index()]
    }

    #[inline]
    pub fn pieces_pt(&self, pt: PieceType) -> Bitboard {
        self.by_type[pt.index()]
    }

    #[inline]
    pub fn pieces_cp(&self, c: Color, pt: PieceType) -> Bitboard {
        self.by_type[pt.index()] & self.by_color[c.index()]
    }

    /// 駒種集合に含まれる駒
    pub fn pieces_set(&self, set: PieceSet) -> Bitboard {
        set.iter().fold(Bitboard::EMPTY, |b, pt| b | self.by_type[pt.index()])
    }

    #[inline]
    pub fn count(&self, c: Color, pt: PieceType) -> i32 {
        self.piece_count[Piece::new(c, pt).index()]
    }

    /// 手番 c の盤上の駒の総数
    #[inline]
    pub fn count_all(&self, c: Color) -> i32 {
        self.piece_count[c.index() << 5]
    }

    /// 両手番の pt の枚数
    #[inline]
    pub fn count_pt(&self, pt: PieceType) -> i32 {
        self.count(Color::White, pt) + self.count(Color::Black, pt)
    }

    #[inline]
    pub fn count_in_hand(&self, c: Color, pt: PieceType) -> i32 {
        self.in_hand[c.index()][pt.index()]
    }

    /// 持ち駒の合計
    #[inline]
    pub fn count_in_hand_all(&self, c: Color) -> i32 {
        self.in_hand[c.index()][0]
    }

    /// 盤上と持ち駒の合計
    #[inline]
    pub fn count_with_hand(&self, c: Color, pt: PieceType) -> i32 {
        self.count(c, pt) + self.count_in_hand(c, pt)
    }

    /// 手番 c が捕らえて牢に入れている pt の数
    #[inline]
    pub fn count_in_prison(&self, c: Color, pt: PieceType) -> i32 {
        self.in_prison[c.index()][pt.index()]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    #[inline]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    #[inline]
    pub fn rule50_count(&self) -> i32 {
        self.state().rule50
    }

    #[inline]
    pub fn key(&self) -> Key {
        self.state().key
    }

    #[inline]
    pub fn material_key(&self) -> Key {
        self.state().material_key
    }

    #[inline]
    pub fn pawn_key(&self) -> Key {
        self.state().pawn_key
    }

    #[inline]
    pub fn checkers(&self) -> Bitboard {
        self.state().checkers
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.state().checkers.is_not_empty()
    }

    /// 手番 c の王へのピン駒（両手番の駒を含む）
    #[inline]
    pub fn blockers_for_king(&self, c: Color) -> Bitboard {
        self.state().blockers_for_king[c.index()]
    }

    /// 手番 c の駒で相手の王をピンしている駒
    #[inline]
    pub fn pinners(&self, c: Color) -> Bitboard {
        self.state().pinners[c.index()]
    }

    /// 相手の王に王手となる、駒種 pt の移動先
    #[inline]
    pub fn check_squares(&self, pt: PieceType) -> Bitboard {
        self.state().check_squares[pt.index()]
    }

    #[inline]
    pub fn ep_squares(&self) -> Bitboard {
        self.state().ep_squares
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.state().castling_rights
    }

    /// 手番 c のキャスリング権
    #[inline]
    pub fn castling_rights_of(&self, c: Color) -> CastlingRights {
        self.state().castling_rights & castling_rights_of(c)
    }

    #[inline]
    pub fn can_castle(&self, cr: CastlingRights) -> bool {
        self.state().castling_rights & cr != 0
    }

    /// キャスリングの経路に駒があるか
    #[inline]
    pub fn castling_impeded(&self, cr: CastlingRights) -> bool {
        (self.pieces() & self.castling_path[cr as usize]).is_not_empty()
    }

    #[inline]
    pub fn castling_rook_square(&self, cr: CastlingRights) -> Option<Square> {
        self.castling_rook_square[cr as usize]
    }

    /// キャスリングする王のマス
    #[inline]
    pub fn castling_king_square(&self, c: Color) -> Option<Square> {
        self.state().castling_king_square[c.index()]
    }

    /// キャスリングする段（手番から見た段を盤上の段に直したもの）
    #[inline]
    pub fn castling_rank(&self, c: Color) -> Rank {
        self.var.castling_rank.relative(c, self.var.max_rank)
    }

    #[inline]
    pub fn gates(&self, c: Color) -> Bitboard {
        self.state().gates[c.index()]
    }

    #[inline]
    pub fn wall_squares(&self) -> Bitboard {
        self.state().wall_squares
    }

    /// 直前の手で取られた駒
    #[inline]
    pub fn captured_piece(&self) -> Piece {
        self.state().captured_piece
    }

    #[inline]
    pub fn is_promoted(&self, s: Square) -> bool {
        self.promoted_pieces.contains(s)
    }

    /// 成り駒の成る前の駒
    #[inline]
    pub fn unpromoted_piece_on(&self, s: Square) -> Piece {
        self.unpromoted_board[s.index()]
    }

    /// 手番 c の pt の最初の 1 枚
    #[inline]
    pub fn square_of(&self, c: Color, pt: PieceType) -> Option<Square> {
        self.pieces_cp(c, pt).lsb()
    }

    #[inline]
    pub fn king_square(&self, c: Color) -> Option<Square> {
        self.square_of(c, PieceType::King)
    }

    #[inline]
    pub fn counting_limit(&self) -> i32 {
        self.state().counting_limit
    }

    #[inline]
    pub fn counting_ply_raw(&self) -> i32 {
        self.state().counting_ply
    }

    #[inline]
    pub fn points(&self, c: Color) -> i32 {
        self.state().points_count[c.index()]
    }

    #[inline]
    pub fn checks_remaining(&self, c: Color) -> i32 {
        self.state().checks_remaining[c.index()]
    }

    #[inline]
    pub fn virtual_pieces(&self) -> i32 {
        self.virtual_pieces
    }

    // ========== 指し手の補助 ==========

    /// 指し手で動く駒
    #[inline]
    pub fn moved_piece(&self, m: Move) -> Piece {
        match (m.is_drop(), m.dropped_piece_type()) {
            (true, Some(pt)) => Piece::new(self.side_to_move, pt),
            _ => self.piece_on(m.from()),
        }
    }

    /// 駒を取る手か（キャスリングは除く）
    #[inline]
    pub fn capture(&self, m: Move) -> bool {
        let mt = m.move_type();
        (!self.is_empty(m.to()) && mt != MoveType::Castling && m.from() != m.to())
            || mt == MoveType::EnPassant
    }

    /// e.p. で取られる駒のマス
    pub fn capture_square(&self, to: Square) -> Square {
        let custom = self.ep_squares() & self.pieces();
        let found = if custom.is_not_empty() {
            match self.side_to_move {
                Color::White => custom.lsb(),
                Color::Black => custom.msb(),
            }
        } else {
            let them = !self.side_to_move;
            let candidates = self.pieces_c(them) & forward_file_bb(them, to);
            match self.side_to_move {
                Color::White => candidates.msb(),
                Color::Black => candidates.lsb(),
            }
        };
        found.unwrap_or(to)
    }

    /// 指し手で取られる駒
    #[inline]
    pub fn captured_piece_of(&self, m: Move) -> Piece {
        let to = m.to();
        if m.move_type() == MoveType::EnPassant {
            self.piece_on(self.capture_square(to))
        } else {
            self.piece_on(to)
        }
    }

    // ========== ルールの補助 ==========

    /// 盤面全体（壁のマスを除く）
    #[inline]
    pub fn board_bb(&self) -> Bitboard {
        self.var.board_bb() & !self.state().wall_squares
    }

    /// 駒種 pt が居られる領域
    #[inline]
    pub fn board_bb_for(&self, c: Color, pt: PieceType) -> Bitboard {
        match self.var.mobility_region(c, pt) {
            Some(region) => region & self.board_bb(),
            None => self.board_bb(),
        }
    }

    /// 成れる領域
    #[inline]
    pub fn promotion_zone(&self, c: Color) -> Bitboard {
        self.var.promotion_region(c) & self.board_bb()
    }

    /// 成った兵（川を越えた兵）
    #[inline]
    pub fn promoted_soldiers(&self, c: Color) -> Bitboard {
        self.pieces_cp(c, PieceType::Soldier)
            & zone_bb(c, self.var.soldier_promotion_rank, self.var.max_rank)
    }

    /// 爆発の範囲の形
    #[inline]
    pub fn blast_pattern(&self, to: Square) -> Bitboard {
        if self.var.blast_diagonals {
            king_attacks(to)
        } else {
            wazir_attacks(to)
        }
    }

    /// to での爆発で消える駒（歩と爆発に強い駒は巻き込まれない）
    pub fn blast_squares(&self, to: Square) -> Bitboard {
        let pawns = self.pieces_pt(PieceType::Pawn);
        let mut b = self.blast_pattern(to) & ((self.pieces_c(Color::White) | self.pieces_c(Color::Black)) ^ pawns);
        if self.var.blast_center {
            b |= to;
        }
        b & (self.pieces() ^ self.blast_immune_bb())
    }

    /// 爆発に巻き込まれない駒
    #[inline]
    pub fn blast_immune_bb(&self) -> Bitboard {
        self.pieces_set(self.var.blast_immune_types)
    }

    /// 打てるマス（持ち駒の有無は見ない）
    pub fn drop_region_for(&self, c: Color, pt: PieceType) -> Bitboard {
        let var = &*self.var;
        let mut b = var.drop_region(c) & self.board_bb_for(c, pt);
        let first_rank = Bitboard::rank(Rank::R1.relative(c, var.max_rank));

        if pt == PieceType::Pawn {
            if !var.promotion_zone_pawn_drops {
                b &= !self.promotion_zone(c);
            }
            if !var.first_rank_pawn_drops {
                b &= !first_rank;
            }
        }
        // 二歩
        if var.drop_no_doubled == Some(pt) {
            for f in 0..=var.max_file.index() {
                let file = Bitboard::file(File::new(f as u8).unwrap_or(File::A));
                if (file & self.pieces_cp(c, pt)).count() as i32 >= var.drop_no_doubled_count {
                    b &= !file;
                }
            }
        }
        if pt == PieceType::Rook && var.sittuyin_rook_drop {
            b &= first_rank;
        }

        if var.enclosing_drop != EnclosingRule::None {
            let start = var.enclosing_drop_start;
            if (start & !self.pieces()).is_not_empty() {
                b &= start;
            } else {
                b = self.enclosing_drop_filter(c, b);
            }
        }
        b
    }

    fn enclosing_drop_filter(&self, c: Color, mut b: Bitboard) -> Bitboard {
        let var = &*self.var;
        let board = self.board_bb();
        match var.enclosing_drop {
            EnclosingRule::Reversi => {
                let theirs = self.pieces_c(!c);
                b &= adjacent_squares(theirs);
                for s in b {
                    // 相手の駒を挟んで自分の駒に届く直線があるか
                    let rays = attacks_bb(c, PieceType::Queen, s, board & !theirs);
                    if (rays & !king_attacks(s) & self.pieces_c(c)).is_empty() {
                        b ^= s;
                    }
                }
                b
            }
            EnclosingRule::Snort => {
                let theirs = self.pieces_c(!c);
                b & !(theirs.shift_north() | theirs.shift_south() | theirs.shift_east() | theirs.shift_west())
            }
            EnclosingRule::Anyside => {
                let occupied = self.pieces();
                let empty = board & !occupied;
                let mut reach = Bitboard::EMPTY;
                let max_file = var.max_file;
                let max_rank = var.max_rank;
                // 各辺から滑り込ませたときに止まるマス
                let from_west = (occupied.shift_west() | Bitboard::file(max_file)) & empty;
                let from_east = (occupied.shift_east() | Bitboard::file(File::A)) & empty;
                for r in 0..=max_rank.index() {
                    let rank = Bitboard::rank(Rank::new(r as u8).unwrap_or(Rank::R1));
                    if let Some(s) = (from_west & rank).lsb() {
                        reach |= s;
                    }
                    if let Some(s) = (from_east & rank).msb() {
                        reach |= s;
                    }
                }
                let from_south = (occupied.shift_south() | Bitboard::rank(max_rank)) & empty;
                let from_north = (occupied.shift_north() | Bitboard::rank(Rank::R1)) & empty;
                for f in 0..=max_file.index() {
                    let file = Bitboard::file(File::new(f as u8).unwrap_or(File::A));
                    if let Some(s) = (from_south & file).lsb() {
                        reach |= s;
                    }
                    if let Some(s) = (from_north & file).msb() {
                        reach |= s;
                    }
                }
                b & reach
            }
            EnclosingRule::Top => b & (self.pieces().shift_north() | Bitboard::rank(Rank::R1)),
            EnclosingRule::Ataxx | EnclosingRule::Quadwrangle => b & adjacent_squares(self.pieces_c(c)),
            EnclosingRule::None => b,
        }
    }

    /// 仮想の持ち駒（借り）で打てるか
    pub fn allow_virtual_drop(&self, c: Color, pt: PieceType) -> bool {
        if !self.var.two_boards || pt == PieceType::King {
            return false;
        }
        let pawn_floor = -i32::from(pt == PieceType::Pawn);
        self.count_in_hand(c, PieceType::Pawn) >= pawn_floor
            && self.count_in_hand(c, PieceType::Knight) >= pawn_floor.min(0)
            && self.count_in_hand(c, PieceType::Bishop) >= pawn_floor.min(0)
            && self.count_in_hand(c, PieceType::Rook) >= 0
            && self.count_in_hand(c, PieceType::Queen) >= 0
    }

    #[inline]
    pub fn can_drop(&self, c: Color, pt: PieceType) -> bool {
        self.count_in_hand(c, pt) > 0
    }

    /// 駒数判定の結果（白から見た値を手番側に直したもの）
    pub fn material_counting_result(&self) -> Value {
        let weight = |c: Color| -> i32 {
            use PieceType::*;
            13 * self.count(c, Rook)
                + 7 * self.count(c, JanggiCannon)
                + 5 * self.count(c, Horse)
                + 3 * self.count(c, JanggiElephant)
                + 3 * self.count(c, Wazir)
                + 2 * self.count(c, Soldier)
                - 1
        };
        let white = match self.var.material_counting {
            MaterialCounting::Janggi => {
                if weight(Color::White) > weight(Color::Black) { Value::MATE } else { -Value::MATE }
            }
            MaterialCounting::Unweighted => {
                let diff = self.count_all(Color::White) - self.count_all(Color::Black);
                match diff.cmp(&0) {
                    std::cmp::Ordering::Greater => Value::MATE,
                    std::cmp::Ordering::Less => -Value::MATE,
                    std::cmp::Ordering::Equal => Value::DRAW,
                }
            }
            MaterialCounting::WhiteDrawOdds => Value::MATE,
            MaterialCounting::BlackDrawOdds => -Value::MATE,
            MaterialCounting::None => Value::ZERO,
        };
        if self.side_to_move == Color::White { white } else { -white }
    }

    // ========== 駒の配置 ==========

    /// 駒を置く
    pub(super) fn put_piece(&mut self, pc: Piece, s: Square, promoted: bool, unpromoted: Piece) {
        debug_assert!(pc.is_some());
        let c = pc.color();
        self.board[s.index()] = pc;
        self.by_type[0] |= s;
        self.by_type[pc.type_index()] |= s;
        self.by_color[c.index()] |= s;
        self.piece_count[pc.index()] += 1;
        self.piece_count[c.index() << 5] += 1;
        if promoted {
            self.promoted_pieces |= s;
        }
        self.unpromoted_board[s.index()] = unpromoted;
    }

    /// 駒を取り除く（盤の配列も空にする）
    pub(super) fn remove_piece(&mut self, s: Square) {
        let pc = self.board[s.index()];
        debug_assert!(pc.is_some());
        let c = pc.color();
        let bb = Bitboard::from_square(s);
        self.by_type[0] &= !bb;
        self.by_type[pc.type_index()] &= !bb;
        self.by_color[c.index()] &= !bb;
        self.board[s.index()] = Piece::NONE;
        self.piece_count[pc.index()] -= 1;
        self.piece_count[c.index() << 5] -= 1;
        self.promoted_pieces &= !bb;
        self.unpromoted_board[s.index()] = Piece::NONE;
    }

    /// 駒を動かす（成り駒の情報も移す）
    pub(super) fn move_piece(&mut self, from: Square, to: Square) {
        let pc = self.board[from.index()];
        debug_assert!(pc.is_some());
        let from_to = Bitboard::from_square(from) | to;
        self.by_type[0] ^= from_to;
        self.by_type[pc.type_index()] ^= from_to;
        self.by_color[pc.color().index()] ^= from_to;
        self.board[from.index()] = Piece::NONE;
        self.board[to.index()] = pc;
        if self.promoted_pieces.contains(from) {
            self.promoted_pieces ^= from_to;
        }
        self.unpromoted_board[to.index()] = self.unpromoted_board[from.index()];
        self.unpromoted_board[from.index()] = Piece::NONE;
    }

    pub(super) fn add_to_hand(&mut self, pc: Piece) {
        let c = pc.color().index();
        self.in_hand[c][pc.type_index()] += 1;
        self.in_hand[c][0] += 1;
    }

    pub(super) fn remove_from_hand(&mut self, pc: Piece) {
        let c = pc.color().index();
        self.in_hand[c][pc.type_index()] -= 1;
        self.in_hand[c][0] -= 1;
    }

    /// 牢に入れる（捕獲した側の牢。新しい枚数を返す）
    pub(super) fn add_to_prison(&mut self, pc: Piece) -> i32 {
        if self.var.capture_type != CapturingRule::Prison {
            return 0;
        }
        let captor = (!pc.color()).index();
        self.in_prison[captor][pc.type_index()] += 1;
        self.in_prison[captor][0] += 1;
        self.in_prison[captor][pc.type_index()]
    }

    pub(super) fn remove_from_prison(&mut self, pc: Piece) -> i32 {
        if self.var.capture_type != CapturingRule::Prison {
            return 0;
        }
        let captor = (!pc.color()).index();
        self.in_prison[captor][pc.type_index()] -= 1;
        self.in_prison[captor][0] -= 1;
        self.in_prison[captor][pc.type_index()]
    }

    /// 持ち駒から打つ（成り駒として打つ場合は pc_drop と pc_hand が異なる）
    pub(super) fn drop_piece(&mut self, pc_hand: Piece, pc_drop: Piece, s: Square) {
        let promoted = pc_drop != pc_hand;
        self.put_piece(pc_drop, s, promoted, if promoted { pc_hand } else { Piece::NONE });
        self.remove_from_hand(pc_hand);
        if self.in_hand[pc_hand.color().index()][pc_hand.type_index()] < 0 {
            self.virtual_pieces += 1;
        }
    }

    pub(super) fn undrop_piece(&mut self, pc_hand: Piece, s: Square) {
        if self.in_hand[pc_hand.color().index()][pc_hand.type_index()] < 0 {
            self.virtual_pieces -= 1;
        }
        self.remove_piece(s);
        self.add_to_hand(pc_hand);
    }

    // ========== ゲートの予約（Musketeer） ==========

    pub(super) fn commit_piece(&mut self, pc: Piece, f: File) {
        self.committed_gates[pc.color().index()][f.index()] = pc.piece_type();
    }

    /// 予約を取り消して駒種を返す
    pub(super) fn uncommit_piece(&mut self, c: Color, f: File) -> Option<PieceType> {
        self.committed_gates[c.index()][f.index()].take()
    }

    #[inline]
    pub fn committed_piece_type(&self, c: Color, f: File) -> Option<PieceType> {
        self.committed_gates[c.index()][f.index()]
    }

    #[inline]
    pub fn has_committed_piece(&self, c: Color, f: File) -> bool {
        self.committed_piece_type(c, f).is_some()
    }

    /// 予約した駒を初期段に置く
    pub(super) fn drop_committed_piece(&mut self, c: Color, f: File) -> Option<PieceType> {
        let pt = self.uncommit_piece(c, f)?;
        let r = if c == Color::White { Rank::R1 } else { self.var.max_rank };
        self.put_piece(Piece::new(c, pt), Square::new(f, r), false, Piece::NONE);
        Some(pt)
    }

    // ========== 数独ルール ==========

    fn sudoku_boxes(&self) -> bool {
        self.var.sudoku && self.var.sudoku_box_width > 0 && self.var.sudoku_box_height > 0
    }

    fn sudoku_box_of(&self, s: Square) -> usize {
        let w = self.var.sudoku_box_width as usize;
        let h = self.var.sudoku_box_height as usize;
        let files = self.var.max_file.index() + 1;
        s.rank().index() / h * (files / w) + s.file().index() / w
    }

    fn piece_type_for_sudoku(&self, pt: PieceType) -> PieceType {
        if self.var.sudoku_royal_conflict && matches!(pt, PieceType::King | PieceType::Commoner) {
            PieceType::Queen
        } else {
            pt
        }
    }

    fn allowed_sudoku_conflicts(&self, pt: PieceType) -> i32 {
        if pt == PieceType::Pawn { self.var.sudoku_allowed_pawns } else { 1 }
    }

    fn is_initial_pawn(&self, pc: Piece, s: Square) -> bool {
        pc.piece_type() == Some(PieceType::Pawn)
            && s.rank() == Rank::R2.relative(pc.color(), self.var.max_rank)
    }

    /// 手番 c の数独ルールの衝突数
    #[inline]
    pub fn sudoku_conflicts(&self, c: Color) -> i32 {
        if self.var.sudoku { self.state().sudoku_conflicts[c.index()] } else { 0 }
    }

    /// 区画ごとの枚数 [筋 / 段 / 箱][番号]
    fn sudoku_house_counts(&self, c: Color, pt: PieceType) -> [[i32; FILE_NB]; 3] {
        let mut count = [[0; FILE_NB]; 3];
        for s in self.pieces_c(c) {
            let pc = self.piece_on(s);
            let Some(spt) = pc.piece_type() else { continue };
            if self.piece_type_for_sudoku(spt) != pt || self.is_initial_pawn(pc, s) {
                continue;
            }
            count[SUDOKU_FILE][s.file().index()] += 1;
            count[SUDOKU_RANK][s.rank().index()] += 1;
            if self.sudoku_boxes() {
                count[SUDOKU_BOX][self.sudoku_box_of(s).min(FILE_NB - 1)] += 1;
            }
        }
        count
    }

    /// 数独ルールの衝突数を数え直す
    pub(super) fn compute_sudoku_conflicts(&self) -> [i32; Color::NUM] {
        let mut conflicts = [0; Color::NUM];
        if !self.var.sudoku {
            return conflicts;
        }
        let mut count = vec![[[0i32; FILE_NB]; 3]; Color::NUM * PIECE_TYPE_NB];
        for s in self.pieces_c(Color::White) | self.pieces_c(Color::Black) {
            let pc = self.piece_on(s);
            let Some(pt) = pc.piece_type() else { continue };
            if self.is_initial_pawn(pc, s) {
                continue;
            }
            let c = pc.color();
            let pt = self.piece_type_for_sudoku(pt);
            let allowed = self.allowed_sudoku_conflicts(pt);
            let houses = &mut count[c.index() * PIECE_TYPE_NB + pt.index()];
            houses[SUDOKU_FILE][s.file().index()] += 1;
            houses[SUDOKU_RANK][s.rank().index()] += 1;
            let box_count = if self.sudoku_boxes() {
                let b = self.sudoku_box_of(s).min(FILE_NB - 1);
                houses[SUDOKU_BOX][b] += 1;
                houses[SUDOKU_BOX][b]
            } else {
                0
            };
            if houses[SUDOKU_FILE][s.file().index()] > allowed
                || houses[SUDOKU_RANK][s.rank().index()] > allowed
                || box_count > allowed
            {
                conflicts[c.index()] += 1;
            }
        }
        conflicts
    }

    /// 取る手で新しい衝突が生まれるか
    pub fn move_adds_sudoku_conflicts(&self, m: Move) -> bool {
        if !self.var.sudoku {
            return false;
        }
        let (from, to) = (m.from(), m.to());
        let pc = self.moved_piece(m);
        let Some(pt) = pc.piece_type() else { return false };
        let pt = self.piece_type_for_sudoku(pt);
        let allowed = self.allowed_sudoku_conflicts(pt);
        let count = self.sudoku_house_counts(pc.color(), pt);

        if from.file() != to.file() && count[SUDOKU_FILE][to.file().index()] >= allowed {
            return true;
        }
        if from.rank() != to.rank() && count[SUDOKU_RANK][to.rank().index()] >= allowed {
            return true;
        }
        if self.sudoku_boxes() {
            let (fb, tb) = (self.sudoku_box_of(from), self.sudoku_box_of(to));
            if fb != tb && count[SUDOKU_BOX][tb.min(FILE_NB - 1)] >= allowed {
                return true;
            }
        }
        false
    }

    // ========== 状態の再計算 ==========

    /// 盤面からハッシュキーを計算する（key, pawn_key, material_key）
    pub(super) fn compute_keys(&self) -> (Key, Key, Key) {
        let z = zobrist();
        let st = self.state();
        let mut key = 0;
        let mut pawn_key = z.no_pawns;
        let mut material_key = 0;

        for s in self.pieces() {
            let pc = self.piece_on(s);
            if pc.is_none() {
                // 壁
                key ^= z.wall[s.index()];
                continue;
            }
            key ^= zobrist_psq(pc, s);
            if pc.piece_type() == Some(PieceType::Pawn) {
                pawn_key ^= zobrist_psq(pc, s);
            }
        }

        for s in st.ep_squares {
            key ^= z.enpassant[s.file().index()];
        }
        if self.side_to_move == Color::Black {
            key ^= z.side;
        }
        key ^= z.castling[st.castling_rights as usize];

        for c in Color::ALL {
            for pt in PieceType::ALL {
                let pc = Piece::new(c, pt);
                for cnt in 0..self.count(c, pt).max(0) {
                    material_key ^= zobrist_material(pc, cnt);
                }
                if self.hand_keyed() {
                    key ^= zobrist_in_hand(pc, self.count_in_hand(c, pt));
                }
                if self.var.capture_type == CapturingRule::Prison {
                    key ^= zobrist_in_prison(pc, self.in_prison[(!c).index()][pt.index()]);
                }
            }
        }

        if self.var.check_counting {
            for c in Color::ALL {
                key ^= zobrist_checks(c, st.checks_remaining[c.index()]);
            }
        }
        if self.var.points_counting {
            for c in Color::ALL {
                key ^= zobrist_points(c, st.points_count[c.index()]);
            }
        }
        (key, pawn_key, material_key)
    }

    /// 持ち駒をハッシュに含めるルールか
    #[inline]
    pub(super) fn hand_keyed(&self) -> bool {
        self.var.piece_drops || self.var.gating || self.var.capture_type == CapturingRule::Hand
    }

    /// 現局面の状態を盤面から計算し直す
    pub(super) fn set_state(&mut self) {
        let (key, pawn_key, material_key) = self.compute_keys();
        let checkers = match self.king_square(self.side_to_move) {
            Some(ksq) => self.attackers_to(ksq, !self.side_to_move),
            None => Bitboard::EMPTY,
        };
        let sudoku = self.compute_sudoku_conflicts();
        {
            let st = self.state_mut();
            st.key = key;
            st.pawn_key = pawn_key;
            st.material_key = material_key;
            st.checkers = checkers;
            st.mv = Move::NONE;
            st.removed_gating_type = None;
            st.removed_castling_gating_type = None;
            st.captured_gating_type = None;
            st.sudoku_conflicts = sudoku;
        }
        self.set_check_info();
    }

    /// キャスリング権を設定する
    pub(super) fn set_castling_right(&mut self, st: &mut StateInfo, c: Color, rfrom: Square) {
        let Some(kfrom) = st.castling_king_square[c.index()] else {
            debug_assert!(false, "castling king square is not set");
            return;
        };
        let king_side = kfrom < rfrom;
        let cr = castling_rights_of(c) & if king_side { KING_SIDE } else { QUEEN_SIDE };

        st.castling_rights |= cr;
        self.castling_rights_mask[kfrom.index()] |= cr;
        self.castling_rights_mask[rfrom.index()] |= cr;
        self.castling_rook_square[cr as usize] = Some(rfrom);

        let file = if king_side { self.var.castling_kingside_file } else { self.var.castling_queenside_file };
        let kto = Square::new(file, self.castling_rank(c));
        let rto = if king_side { kto.offset(-1, 0) } else { kto.offset(1, 0) }.unwrap_or(kto);

        self.castling_path[cr as usize] =
            (between_bb(rfrom, rto) | between_bb(kfrom, kto)) & !(Bitboard::from_square(kfrom) | rfrom);
    }
}

/// c から見て s より前にある同じ筋のマス
pub(super) fn forward_file_bb(c: Color, s: Square) -> Bitboard {
    let file = Bitboard::file(s.file());
    let r = s.rank().index();
    let mut ahead = Bitboard::EMPTY;
    for rr in 0..RANK_NB {
        let in_front = match c {
            Color::White => rr > r,
            Color::Black => rr < r,
        };
        if in_front {
            ahead |= Bitboard::rank(Rank::new(rr as u8).unwrap_or(Rank::R1));
        }
    }
    file & ahead
}

/// c から見て r 段目以降の領域
pub(super) fn zone_bb(c: Color, r: Rank, max_rank: Rank) -> Bitboard {
    let mut b = Bitboard::EMPTY;
    for rr in 0..=max_rank.index() {
        let rank = Rank::new(rr as u8).unwrap_or(Rank::R1);
        if rank.relative(c, max_rank) >= r {
            b |= Bitboard::rank(rank);
        }
    }
    b
}

/// 8 近傍のマス
pub(super) fn adjacent_squares(b: Bitboard) -> Bitboard {
    let vertical = b.shift_north() | b.shift_south();
    let column = b | vertical;
    vertical | column.shift_east() | column.shift_west()
}
