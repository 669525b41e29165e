//! FEN / SFEN の解析と出力
//!
//! 盤面の後ろに `[持ち駒#牢]` を付け、手番・キャスリング・e.p.（または数え手の上限）・
//! 王手回数・50 手ルール・手数・得点を続ける形式を扱う。
//! 盤面の矛盾はエラーにするが、それ以外は寛容に読む（不正な e.p. やキャスリングは無視する）。

use std::sync::Arc;

use thiserror::Error;

use super::Position;
use super::state::StateInfo;
use crate::bitboard::{Bitboard, pawn_attacks};
use crate::types::{
    BLACK_CASTLING, BLACK_OO, BLACK_OOO, Color, File, Piece, PieceType, Rank, SQUARE_NB, Square,
    WHITE_CASTLING, WHITE_OO, WHITE_OOO,
};
use crate::variant::{CapturingRule, Variant};

/// FEN の解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    /// 盤面の形式が不正
    #[error("invalid piece placement: {0}")]
    Placement(String),
    /// 手番の形式が不正
    #[error("invalid side to move: {0}")]
    SideToMove(String),
    /// 数値の形式が不正
    #[error("invalid number field: {0}")]
    Number(String),
    /// ルールにない駒文字
    #[error("unknown piece letter '{0}'")]
    PieceLetter(char),
}

/// FEN 出力の設定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FenOptions {
    /// SFEN 形式で出力する
    pub sfen: bool,
    /// 成り駒に `~` を付ける
    pub show_promoted: bool,
    /// 盤の数え（Cambodian）を始めた手数（0 は局面の値を使う、負は未開始）
    pub count_started: i32,
}

/// 盤面の解析中の位置
struct Cursor {
    file: i32,
    rank: i32,
}

impl Position {
    /// FEN から局面を生成する
    pub fn set(var: Arc<Variant>, fen: &str, chess960: bool) -> Result<Position, FenError> {
        Self::parse(var, fen, chess960, false)
    }

    /// SFEN から局面を生成する
    pub fn set_sfen(var: Arc<Variant>, sfen: &str) -> Result<Position, FenError> {
        Self::parse(var, sfen, false, true)
    }

    /// ルールの初期局面
    pub fn startpos(var: Arc<Variant>) -> Result<Position, FenError> {
        let fen = var.start_fen.clone();
        Self::set(var, &fen, false)
    }

    fn parse(var: Arc<Variant>, fen: &str, chess960: bool, sfen: bool) -> Result<Position, FenError> {
        let mut pos = Position::empty(var);
        let mut st = StateInfo::new();
        let mut tokens = fen.split_whitespace().peekable();

        // 1. 盤面と持ち駒
        let placement = tokens
            .next()
            .ok_or_else(|| FenError::Placement("empty FEN".to_string()))?;
        pos.parse_placement(placement, &mut st)?;

        // 2. 手番（SFEN は逆）
        let side = tokens.next().unwrap_or("w");
        let (white, black) = if sfen { ("b", "w") } else { ("w", "b") };
        pos.side_to_move = match side {
            s if s == white => Color::White,
            s if s == black => Color::Black,
            s => return Err(FenError::SideToMove(s.to_string())),
        };

        // 3-4. キャスリングと e.p.（数え手の上限）
        if !sfen
            && let Some(tok) = tokens.next_if(|t| !t.starts_with(|c: char| c.is_ascii_digit()))
        {
            pos.parse_castling(tok, chess960, &mut st);
            if let Some(tok) = tokens.next_if(|t| !t.contains('+')) {
                if pos.var.counting_rule != crate::variant::CountingRule::None
                    && tok.starts_with(|c: char| c.is_ascii_digit())
                {
                    st.counting_limit = parse_number(tok)?;
                } else if tok.starts_with(|c: char| c.is_ascii_digit()) {
                    // 数え手のないルールでの数字は手数の欄
                    return pos.finish_numbers(st, Some(tok), tokens, chess960, sfen);
                } else {
                    pos.parse_ep_squares(tok, &mut st);
                }
            }
        }
        pos.finish_numbers(st, None, tokens, chess960, sfen)
    }

    /// 王手回数以降の欄を読み、状態を計算する
    fn finish_numbers<'a>(
        mut self,
        mut st: StateInfo,
        pending: Option<&'a str>,
        rest: impl Iterator<Item = &'a str>,
        chess960: bool,
        sfen: bool,
    ) -> Result<Position, FenError> {
        let mut tokens = pending.into_iter().chain(rest).peekable();
        let var = Arc::clone(&self.var);

        // 王手回数
        if var.check_counting {
            match tokens.next_if(|t| t.contains('+') && !t.starts_with('+')) {
                Some(tok) => {
                    let (w, b) = tok.split_once('+').unwrap_or((tok, "0"));
                    st.checks_remaining = [parse_number(w)?.max(0), parse_number(b)?.max(0)];
                }
                // 省略時は次の王手で勝ち
                None => st.checks_remaining = [1, 1],
            }
        }

        // 5-6. 50 手ルールと手数
        if sfen {
            if let Some(hand) = tokens.next() {
                self.parse_sfen_hand(hand)?;
            }
            let ply = match tokens.next() {
                Some(tok) => parse_number(tok)?,
                None => 1,
            };
            self.game_ply = (ply - 1).max(0);
        } else {
            st.rule50 = match tokens.next_if(|t| !t.starts_with('+') && !t.starts_with('{')) {
                Some(tok) => parse_number(tok)?,
                None => 0,
            };
            let fullmove = match tokens.next_if(|t| !t.starts_with('+') && !t.starts_with('{')) {
                Some(tok) => parse_number(tok)?,
                None => 1,
            };
            self.game_ply = (2 * (fullmove - 1)).max(0) + i32::from(self.side_to_move == Color::Black);
        }

        if st.counting_limit != 0 && st.rule50 != 0 {
            st.counting_ply = st.rule50;
            st.rule50 = 0;
        }

        // Lichess 形式の王手回数（与えた回数）
        if var.check_counting
            && let Some(tok) = tokens.next_if(|t| t.starts_with('+'))
        {
            let mut given = tok.split('+').filter(|s| !s.is_empty());
            let w = given.next().map(parse_number).transpose()?.unwrap_or(0);
            let b = given.next().map(parse_number).transpose()?.unwrap_or(0);
            st.checks_remaining = [(3 - w).max(0), (3 - b).max(0)];
        }

        // 得点
        if var.points_counting {
            let w = tokens.next().map(|t| t.trim_start_matches('{'));
            let b = tokens.next().map(|t| t.trim_end_matches('}'));
            if let (Some(w), Some(b)) = (w, b) {
                st.points_count = [parse_number(w)?, parse_number(b)?];
            }
        }

        self.chess960 = chess960 || var.chess960;
        self.states = vec![st];
        self.set_state();
        debug_assert!(self.pos_is_ok());
        Ok(self)
    }

    /// 盤面・予約ゲート・持ち駒・牢を読む
    fn parse_placement(&mut self, text: &str, st: &mut StateInfo) -> Result<(), FenError> {
        let var = Arc::clone(&self.var);
        let max_file = var.max_file.index() as i32;
        let max_rank = var.max_rank.index() as i32;
        let (board, hand) = match text.split_once('[') {
            Some((b, h)) => (b, Some(h)),
            None => (text, None),
        };

        // 予約ゲートのあるルールでは最初と最後の行がゲート
        let rows: Vec<&str> = board.split('/').collect();
        let (gate_rows, board_rows) = if var.commit_gates && rows.len() >= 2 {
            (vec![(Color::Black, rows[0]), (Color::White, rows[rows.len() - 1])], &rows[1..rows.len() - 1])
        } else {
            (Vec::new(), &rows[..])
        };
        if board_rows.len() as i32 > max_rank + 1 {
            return Err(FenError::Placement(format!(
                "{} ranks for a board with {}",
                board_rows.len(),
                max_rank + 1
            )));
        }

        for (c, row) in gate_rows {
            let mut file = 0;
            let mut chars = row.chars().peekable();
            while let Some(ch) = chars.next() {
                let pc = match ch {
                    '*' => None,
                    '+' => {
                        let base = chars.next().ok_or(FenError::PieceLetter('+'))?;
                        Some(var.char_to_piece(base).ok_or(FenError::PieceLetter(base))?)
                    }
                    ch if ch.is_ascii_digit() => continue,
                    ch => Some(var.char_to_piece(ch).ok_or(FenError::PieceLetter(ch))?),
                };
                if let Some(pc) = pc
                    && let Some(f) = File::new(file)
                {
                    if pc.color() != c {
                        return Err(FenError::Placement(format!("gate row of {c:?} holds '{ch}'")));
                    }
                    self.commit_piece(pc, f);
                }
                file += 1;
            }
        }

        for (i, row) in board_rows.iter().enumerate() {
            let mut cur = Cursor { file: 0, rank: max_rank - i as i32 };
            let mut chars = row.chars().peekable();
            while let Some(ch) = chars.next() {
                if ch.is_ascii_digit() {
                    let mut n = ch.to_digit(10).unwrap_or(0) as i32;
                    // 大きい盤の 2 桁
                    if let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
                        n = 10 * n + d.to_digit(10).unwrap_or(0) as i32;
                    }
                    cur.file += n;
                    continue;
                }
                if cur.file > max_file {
                    // 盤外の駒は読み飛ばす
                    continue;
                }
                let s = Square::new(
                    File::new(cur.file as u8).unwrap_or(File::A),
                    Rank::new(cur.rank as u8).unwrap_or(Rank::R1),
                );
                match ch {
                    '*' => {
                        st.wall_squares |= s;
                        self.by_type[0] |= s;
                    }
                    '+' => {
                        let base_ch = chars.next().ok_or(FenError::PieceLetter('+'))?;
                        let base = var.char_to_piece(base_ch).ok_or(FenError::PieceLetter(base_ch))?;
                        let promoted = base
                            .piece_type()
                            .and_then(|pt| var.promoted_piece_type(pt))
                            .ok_or(FenError::PieceLetter(base_ch))?;
                        self.put_piece(Piece::new(base.color(), promoted), s, true, base);
                    }
                    ch => {
                        let pc = var.char_to_piece(ch).ok_or(FenError::PieceLetter(ch))?;
                        let promoted = chars.next_if_eq(&'~').is_some();
                        self.put_piece(pc, s, promoted, Piece::NONE);
                    }
                }
                cur.file += 1;
            }
        }

        if let Some(hand) = hand {
            let mut prison = false;
            for ch in hand.chars() {
                match ch {
                    ']' => {}
                    '#' => prison = true,
                    ch => {
                        let pc = var.char_to_piece(ch).ok_or(FenError::PieceLetter(ch))?;
                        if prison && var.capture_type == CapturingRule::Prison {
                            self.add_to_prison(pc);
                        } else if !prison {
                            self.add_to_hand(pc);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// SFEN の持ち駒（枚数 + 駒文字）
    fn parse_sfen_hand(&mut self, text: &str) -> Result<(), FenError> {
        let var = Arc::clone(&self.var);
        let mut count: u32 = 0;
        for ch in text.chars() {
            match ch {
                '-' => {}
                ch if ch.is_ascii_digit() => {
                    count = count
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(ch.to_digit(10).unwrap_or(0)))
                        .filter(|&n| n < SQUARE_NB as u32)
                        .ok_or_else(|| FenError::Number(format!("hand count in '{text}'")))?;
                }
                ch => {
                    let pc = var.char_to_piece(ch).ok_or(FenError::PieceLetter(ch))?;
                    for _ in 0..count.max(1) {
                        self.add_to_hand(pc);
                    }
                    count = 0;
                }
            }
        }
        Ok(())
    }

    /// キャスリングの欄（KQkq、筋文字、ゲート）
    fn parse_castling(&mut self, text: &str, chess960: bool, st: &mut StateInfo) {
        let var = Arc::clone(&self.var);
        for token in text.chars() {
            if token == '-' {
                continue;
            }
            let c = if token.is_ascii_lowercase() { Color::Black } else { Color::White };
            let upper = token.to_ascii_uppercase();
            let rank = self.castling_rank(c);
            let is_rook = |pos: &Position, s: Square| {
                let pc = pos.piece_on(s);
                pc.is_some()
                    && pc.color() == c
                    && pc.piece_type().is_some_and(|pt| var.castling_rook_pieces.contains(pt))
            };

            let rsq = if var.castling && upper == 'K' {
                // 右端から内側へ
                let mut f = var.max_file.index();
                let mut s = Square::new(var.max_file, rank);
                while !is_rook(self, s) && f > 0 {
                    f -= 1;
                    s = Square::new(File::new(f as u8).unwrap_or(File::A), rank);
                }
                s
            } else if var.castling && upper == 'Q' {
                let mut f = 0;
                let mut s = Square::new(File::A, rank);
                while !is_rook(self, s) && f < var.max_file.index() {
                    f += 1;
                    s = Square::new(File::new(f as u8).unwrap_or(File::A), rank);
                }
                s
            } else if let Some(f) = File::from_char(upper.to_ascii_lowercase())
                && f <= var.max_file
            {
                Square::new(f, rank)
            } else {
                log::warn!("ignoring castling token '{token}'");
                continue;
            };

            // キャスリングする王の位置
            if var.castling && st.castling_king_square[c.index()].is_none() {
                let kings = self.pieces_cp(c, var.castling_king_piece) & Bitboard::rank(rank);
                let ksq = if chess960 && self.piece_on(rsq) == Piece::new(c, var.castling_king_piece) {
                    Some(rsq)
                } else if kings.is_not_empty() && (!kings.more_than_one() || chess960) {
                    kings.lsb()
                } else {
                    Some(Square::new(var.castling_king_file, rank))
                };
                st.castling_king_square[c.index()] = ksq.filter(|&k| kings.contains(k));
            }

            // ゲート（持ち駒があるときはキャスリング権にしない）
            if var.gating && !var.commit_gates {
                if self.pieces_c(c).contains(rsq) {
                    st.gates[c.index()] |= rsq;
                }
                if (upper == 'K' || upper == 'Q')
                    && let Some(ksq) = st.castling_king_square[c.index()]
                {
                    st.gates[c.index()] |= ksq;
                } else if !var.seirawan_gating || self.count_in_hand_all(c) > 0 || var.captures_to_hand() {
                    continue;
                }
            }

            if var.castling && st.castling_king_square[c.index()].is_some() && is_rook(self, rsq) {
                self.set_castling_right(st, c, rsq);
            }
        }

        // ゲートのある 960 系ルールのキャスリング権
        if var.gating && var.castling {
            for c in Color::ALL {
                let rights = if c == Color::White { WHITE_CASTLING } else { BLACK_CASTLING };
                if (st.gates[c.index()] & self.pieces_pt(var.castling_king_piece)).is_not_empty()
                    && st.castling_rights & rights == 0
                    && (!var.seirawan_gating || self.count_in_hand_all(c) > 0 || var.captures_to_hand())
                {
                    for s in st.gates[c.index()] & self.pieces_c(c) {
                        if self
                            .piece_on(s)
                            .piece_type()
                            .is_some_and(|pt| var.castling_rook_pieces.contains(pt))
                        {
                            self.set_castling_right(st, c, s);
                        }
                    }
                }
            }
        }
    }

    /// e.p. の欄（複数のマスを続けて書ける）
    fn parse_ep_squares(&self, text: &str, st: &mut StateInfo) {
        if text == "-" {
            return;
        }
        let var = &*self.var;
        let us = self.side_to_move;
        let them = !us;
        let mut rest = text;
        while let Some(f) = rest.chars().next().and_then(File::from_char) {
            let digits = rest[1..].chars().take_while(|c| c.is_ascii_digit()).count();
            let Some(s) = Square::parse(&rest[..1 + digits]) else { break };
            rest = &rest[1 + digits..];
            if f > var.max_file || s.rank() > var.max_rank {
                break;
            }

            // 標準のルールでは、取れる歩と進んできた歩がある場合だけ認める
            let behind = s.offset(0, them.sign());
            let behind2 = s.offset(0, 2 * them.sign());
            let ahead = s.offset(0, us.sign());
            let their_pawns = self.pieces_cp(them, PieceType::Pawn);
            let plausible = (pawn_attacks(them, s) & self.pieces_cp(us, PieceType::Pawn)).is_not_empty()
                && (behind.is_some_and(|b| their_pawns.contains(b)) || behind2.is_some_and(|b| their_pawns.contains(b)))
                && ((self.pieces_c(Color::White) | self.pieces_c(Color::Black))
                    & (Bitboard::from_square(s) | ahead.map_or(Bitboard::EMPTY, Bitboard::from_square)))
                    .is_empty();
            if var.en_passant_region.contains(s)
                && (!var.fast_attacks || !(var.en_passant_types - crate::types::PieceSet::single(PieceType::Pawn)).is_empty() || plausible)
            {
                st.ep_squares |= s;
            } else {
                log::warn!("ignoring en passant square {s}");
            }
        }
    }

    // ========== 出力 ==========

    /// FEN を出力する
    pub fn fen(&self) -> String {
        self.fen_with(FenOptions::default())
    }

    /// SFEN を出力する
    pub fn sfen(&self) -> String {
        self.fen_with(FenOptions {
            sfen: true,
            ..FenOptions::default()
        })
    }

    /// 設定を指定して FEN を出力する
    pub fn fen_with(&self, opts: FenOptions) -> String {
        let var = &*self.var;
        let mut out = String::new();

        if var.commit_gates {
            self.write_gate_row(&mut out, Color::Black);
            out.push('/');
        }

        for r in (0..=var.max_rank.index()).rev() {
            let rank = Rank::new(r as u8).unwrap_or(Rank::R1);
            let mut empty = 0;
            for f in 0..=var.max_file.index() {
                let s = Square::new(File::new(f as u8).unwrap_or(File::A), rank);
                if !self.pieces().contains(s) {
                    empty += 1;
                    continue;
                }
                if empty > 0 {
                    out.push_str(&empty.to_string());
                    empty = 0;
                }
                let pc = self.piece_on(s);
                let unpromoted = self.unpromoted_piece_on(s);
                if pc.is_none() {
                    out.push('*');
                } else if unpromoted.is_some() {
                    out.push('+');
                    out.push(var.piece_to_char(unpromoted));
                } else {
                    out.push(var.piece_to_char(pc));
                    if ((var.captures_to_hand() && !var.drop_loop) || var.two_boards || opts.show_promoted)
                        && self.is_promoted(s)
                    {
                        out.push('~');
                    }
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if r > 0 {
                out.push('/');
            }
        }

        if var.commit_gates {
            out.push('/');
            self.write_gate_row(&mut out, Color::White);
        }

        if opts.sfen {
            out.push_str(if self.side_to_move == Color::White { " b " } else { " w " });
            let mut any = false;
            for c in Color::ALL {
                for pt in PieceType::ALL.iter().rev() {
                    let n = self.count_in_hand(c, *pt);
                    if n > 0 {
                        if n > 1 {
                            out.push_str(&n.to_string());
                        }
                        out.push(var.piece_to_char(Piece::new(c, *pt)));
                        any = true;
                    }
                }
            }
            if !any {
                out.push('-');
            }
            out.push_str(&format!(" {}", self.game_ply + 1));
            return out;
        }

        if (var.piece_drops || var.seirawan_gating) && !var.commit_gates {
            out.push('[');
            for c in Color::ALL {
                for pt in PieceType::ALL.iter().rev() {
                    for _ in 0..self.count_in_hand(c, *pt).max(0) {
                        out.push(var.piece_to_char(Piece::new(c, *pt)));
                    }
                }
            }
            if var.capture_type == CapturingRule::Prison
                && (self.in_prison[0][0] > 0 || self.in_prison[1][0] > 0)
            {
                out.push('#');
                for c in [Color::Black, Color::White] {
                    for pt in PieceType::ALL.iter().rev() {
                        for _ in 0..self.count_in_prison(c, *pt).max(0) {
                            out.push(var.piece_to_char(Piece::new(!c, *pt)));
                        }
                    }
                }
            }
            out.push(']');
        }

        out.push_str(if self.side_to_move == Color::White { " w " } else { " b " });

        let before = out.len();
        self.write_castling(&mut out, Color::White);
        self.write_castling(&mut out, Color::Black);
        if out.len() == before {
            out.push('-');
        }

        if self.state().counting_limit != 0 {
            out.push_str(&format!(" {} ", self.counting_limit_at(opts.count_started)));
        } else if self.ep_squares().is_empty() {
            out.push_str(" - ");
        } else {
            out.push(' ');
            for s in self.ep_squares() {
                out.push_str(&s.to_string());
            }
            out.push(' ');
        }

        if var.check_counting {
            let st = self.state();
            out.push_str(&format!("{}+{} ", st.checks_remaining[0], st.checks_remaining[1]));
        }

        if self.state().counting_limit != 0 {
            out.push_str(&self.counting_ply(opts.count_started).to_string());
        } else {
            out.push_str(&self.state().rule50.to_string());
        }
        out.push_str(&format!(
            " {}",
            1 + (self.game_ply - i32::from(self.side_to_move == Color::Black)) / 2
        ));

        if var.points_counting {
            let st = self.state();
            out.push_str(&format!(" {{{} {}}}", st.points_count[0], st.points_count[1]));
        }
        out
    }

    fn write_gate_row(&self, out: &mut String, c: Color) {
        for f in 0..=self.var.max_file.index() {
            let file = File::new(f as u8).unwrap_or(File::A);
            match self.committed_piece_type(c, file) {
                Some(pt) => out.push(self.var.piece_to_char(Piece::new(c, pt))),
                None => out.push('*'),
            }
        }
    }

    /// 手番 c のキャスリング権とゲート
    fn write_castling(&self, out: &mut String, c: Color) {
        let var = &*self.var;
        let (oo, ooo, all) = match c {
            Color::White => (WHITE_OO, WHITE_OOO, WHITE_CASTLING),
            Color::Black => (BLACK_OO, BLACK_OOO, BLACK_CASTLING),
        };
        let letter = |f: File| {
            let ch = f.to_char();
            if c == Color::White { ch.to_ascii_uppercase() } else { ch }
        };
        let rank_bb = Bitboard::rank(self.castling_rank(c));

        if self.chess960
            && self.can_castle(all)
            && (self.pieces_cp(c, var.castling_king_piece) & rank_bb).more_than_one()
            && let Some(ksq) = self.castling_king_square(c)
        {
            out.push(letter(ksq.file()));
        }
        for (cr, standard) in [(oo, 'K'), (ooo, 'Q')] {
            if !self.can_castle(cr) {
                continue;
            }
            match (self.chess960, self.castling_rook_square(cr)) {
                (true, Some(rsq)) => out.push(letter(rsq.file())),
                _ => out.push(if c == Color::White { standard } else { standard.to_ascii_lowercase() }),
            }
        }

        let gates = self.gates(c);
        if var.gating
            && !var.commit_gates
            && gates.is_not_empty()
            && (!var.seirawan_gating || self.count_in_hand_all(c) > 0 || var.captures_to_hand())
        {
            for f in 0..=var.max_file.index() {
                let file = File::new(f as u8).unwrap_or(File::A);
                if (gates & Bitboard::file(file)).is_empty() {
                    continue;
                }
                // キャスリングの欄と重なるものは書かない
                let king_file = !self.chess960
                    && self.can_castle(all)
                    && self.castling_king_square(c).is_some_and(|k| k.file() == file);
                let rook_file = [oo, ooo].into_iter().any(|cr| {
                    self.can_castle(cr) && self.castling_rook_square(cr).is_some_and(|r| r.file() == file)
                });
                if !king_file && !rook_file {
                    out.push(letter(file));
                }
            }
        }
    }
}

fn parse_number(tok: &str) -> Result<i32, FenError> {
    tok.parse().map_err(|_| FenError::Number(tok.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn variant(name: &str) -> Arc<Variant> {
        crate::init();
        Arc::new(Variant::preset(name).unwrap())
    }

    fn round_trip(name: &str, fen: &str) {
        let p = Position::set(variant(name), fen, false).unwrap();
        assert_eq!(p.fen(), fen, "variant {name}");
    }

    #[test]
    fn test_start_position_round_trip() {
        round_trip("chess", START);
        let p = Position::startpos(variant("chess")).unwrap();
        assert_eq!(p.count_all(Color::White), 16);
        assert_eq!(p.castling_rights(), WHITE_CASTLING | BLACK_CASTLING);
        assert_eq!(p.side_to_move(), Color::White);
        assert_eq!(p.game_ply(), 0);
    }

    #[test]
    fn test_preset_start_positions_round_trip() {
        for name in ["crazyhouse", "xiangqi", "janggi", "minishogi", "makruk", "connect4", "reversi", "3check"] {
            let v = variant(name);
            let fen = v.start_fen.clone();
            round_trip(name, &fen);
        }
    }

    #[test]
    fn test_en_passant_square_kept_only_when_capturable() {
        let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        let p = Position::set(variant("chess"), fen, false).unwrap();
        assert_eq!(p.ep_squares(), Bitboard::from_square(Square::parse("f6").unwrap()));
        assert_eq!(p.fen(), fen);

        // 取れる歩がない e.p. は捨てる
        let fen = "rnbqkbnr/ppppp1pp/8/5p2/8/8/PPPPPPPP/RNBQKBNR w KQkq f6 0 2";
        let p = Position::set(variant("chess"), fen, false).unwrap();
        assert!(p.ep_squares().is_empty());
    }

    #[test]
    fn test_game_ply_from_fullmove() {
        let p = Position::set(variant("chess"), "4k3/8/8/8/8/8/8/4K3 b - - 12 30", false).unwrap();
        assert_eq!(p.game_ply(), 59);
        assert_eq!(p.rule50_count(), 12);
        assert_eq!(p.fen(), "4k3/8/8/8/8/8/8/4K3 b - - 12 30");
    }

    #[test]
    fn test_hand_and_promoted_pieces() {
        let fen = "r1b1k2r/ppp2ppp/2n5/3Q~4/8/8/PPP2PPP/R1B1K2R[NPqp] b KQkq - 0 9";
        let p = Position::set(variant("crazyhouse"), fen, false).unwrap();
        assert!(p.is_promoted(Square::parse("d5").unwrap()));
        assert_eq!(p.count_in_hand(Color::White, PieceType::Knight), 1);
        assert_eq!(p.count_in_hand(Color::Black, PieceType::Queen), 1);
        assert_eq!(p.fen(), fen);
    }

    #[test]
    fn test_shogi_promoted_piece_and_sfen() {
        let v = variant("minishogi");
        let fen = "rbsgk/4+p/5/P4/KGSBR[] w - - 0 1";
        let p = Position::set(Arc::clone(&v), fen, false).unwrap();
        let e4 = Square::parse("e4").unwrap();
        assert_eq!(p.piece_on(e4), Piece::new(Color::Black, PieceType::Gold));
        assert_eq!(p.unpromoted_piece_on(e4), Piece::new(Color::Black, PieceType::ShogiPawn));
        assert_eq!(p.fen(), fen);

        let sfen = p.sfen();
        assert_eq!(sfen, "rbsgk/4+p/5/P4/KGSBR b - 1");
        let q = Position::set_sfen(v, &sfen).unwrap();
        assert_eq!(q.key(), p.key());
    }

    #[test]
    fn test_check_counts() {
        let p = Position::set(variant("3check"), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 2+3 0 1", false)
            .unwrap();
        assert_eq!(p.checks_remaining(Color::White), 2);
        assert_eq!(p.checks_remaining(Color::Black), 3);

        // Lichess 形式は与えた回数
        let p = Position::set(variant("3check"), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 +1+0", false)
            .unwrap();
        assert_eq!(p.checks_remaining(Color::White), 2);
        assert_eq!(p.checks_remaining(Color::Black), 3);
    }

    #[test]
    fn test_walls_round_trip() {
        round_trip("duck", "rnbqkbnr/pppppppp/8/8/4*3/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let p = Position::set(variant("duck"), "rnbqkbnr/pppppppp/8/8/4*3/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", false)
            .unwrap();
        assert_eq!(p.wall_squares(), Bitboard::from_square(Square::parse("e4").unwrap()));
        assert!(p.pieces().contains(Square::parse("e4").unwrap()));
    }

    #[test]
    fn test_seirawan_gates() {
        let v = variant("seirawan");
        let fen = v.start_fen.clone();
        let p = Position::set(v, &fen, false).unwrap();
        assert_eq!(p.gates(Color::White).count(), 8);
        assert_eq!(p.castling_rights(), WHITE_CASTLING | BLACK_CASTLING);
        // 持ち駒は駒種の降順で出力する
        assert_eq!(p.fen(), fen.replace("[HEhe]", "[EHeh]"));
    }

    #[test]
    fn test_errors() {
        let v = variant("chess");
        assert_eq!(
            Position::set(Arc::clone(&v), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1", false).unwrap_err(),
            FenError::SideToMove("x".to_string())
        );
        assert_eq!(
            Position::set(Arc::clone(&v), "rnbqkbnr/ppppzppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", false).unwrap_err(),
            FenError::PieceLetter('z')
        );
        assert!(matches!(
            Position::set(Arc::clone(&v), "8/8/8/8/8/8/8/8/8 w - - 0 1", false),
            Err(FenError::Placement(_))
        ));
        assert_eq!(
            Position::set(v, "4k3/8/8/8/8/8/8/4K3 w - - x 1", false).unwrap_err(),
            FenError::Number("x".to_string())
        );
    }

    #[test]
    fn test_sfen_hand_count_out_of_range() {
        let v = variant("minishogi");
        let p = Position::set_sfen(Arc::clone(&v), "rbsgk/4p/5/P4/KGSBR b 2P 1").unwrap();
        assert_eq!(p.count_in_hand(Color::White, PieceType::ShogiPawn), 2);
        assert!(matches!(
            Position::set_sfen(Arc::clone(&v), "rbsgk/4p/5/P4/KGSBR b 99999999999P 1"),
            Err(FenError::Number(_))
        ));
        assert!(matches!(
            Position::set_sfen(v, &format!("rbsgk/4p/5/P4/KGSBR b {SQUARE_NB}P 1")),
            Err(FenError::Number(_))
        ));
    }

    #[test]
    fn test_gate_row_of_wrong_color() {
        crate::init();
        let mut v = Variant::preset("seirawan").unwrap();
        v.commit_gates = true;
        let v = Arc::new(v.conclude().unwrap());
        let p = Position::set(Arc::clone(&v), "********/4k3/8/8/8/8/8/8/4K3/****E*** w - - 0 1", false).unwrap();
        assert!(p.has_committed_piece(Color::White, File::E));
        assert!(matches!(
            Position::set(v, "********/4k3/8/8/8/8/8/8/4K3/****e*** w - - 0 1", false),
            Err(FenError::Placement(_))
        ));
    }
}
