//! 局面の表示と整合性チェック

use std::fmt;

use super::Position;
use crate::bitboard::Bitboard;
use crate::types::{Color, File, KING_SIDE, PieceType, QUEEN_SIDE, Rank, Square, castling_rights_of};

impl Position {
    /// 局面の内部状態が互いに整合しているか
    ///
    /// 盤面配列・Bitboard・駒数・ハッシュキー・キャスリング情報を突き合わせる。
    pub fn pos_is_ok(&self) -> bool {
        let var = &*self.var;
        let st = self.state();

        for c in Color::ALL {
            if let Some(ksq) = self.king_square(c)
                && self.piece_on(ksq).piece_type() != Some(PieceType::King)
            {
                log::error!("pos_is_ok: king square of {c:?} is stale");
                return false;
            }
        }
        if (st.ep_squares & !var.en_passant_region).is_not_empty() {
            log::error!("pos_is_ok: e.p. square outside its region");
            return false;
        }

        let white = self.pieces_c(Color::White);
        let black = self.pieces_c(Color::Black);
        if (white & black).is_not_empty() || (white | black | st.wall_squares) != self.pieces() {
            log::error!("pos_is_ok: color bitboards disagree with occupancy");
            return false;
        }

        for s in Square::iter() {
            let pc = self.piece_on(s);
            let on_bb = match pc.piece_type() {
                Some(pt) => self.pieces_cp(pc.color(), pt).contains(s),
                None => !(white | black).contains(s),
            };
            if !on_bb {
                log::error!("pos_is_ok: board and bitboards disagree on {s}");
                return false;
            }
        }

        for c in Color::ALL {
            for pt in PieceType::ALL {
                if self.count(c, pt) != self.pieces_cp(c, pt).count() as i32 {
                    log::error!("pos_is_ok: piece count of {c:?} {pt:?}");
                    return false;
                }
            }
        }

        let (key, pawn_key, material_key) = self.compute_keys();
        if key != st.key || pawn_key != st.pawn_key || material_key != st.material_key {
            log::error!("pos_is_ok: incremental keys differ from recomputed ones");
            return false;
        }

        for c in Color::ALL {
            for side in [KING_SIDE, QUEEN_SIDE] {
                let cr = castling_rights_of(c) & side;
                if !self.can_castle(cr) {
                    continue;
                }
                let Some(rsq) = self.castling_rook_square(cr) else {
                    log::error!("pos_is_ok: castling right without rook square");
                    return false;
                };
                let rook_ok = self
                    .piece_on(rsq)
                    .piece_type()
                    .is_some_and(|pt| var.castling_rook_pieces.contains(pt));
                if !rook_ok || self.castling_rights_mask[rsq.index()] != cr {
                    log::error!("pos_is_ok: castling rook on {rsq} is inconsistent");
                    return false;
                }
            }
        }

        true
    }

    /// 持ち駒を文字列にする（強い駒から）
    fn hand_text(&self, c: Color) -> String {
        PieceType::ALL
            .iter()
            .rev()
            .flat_map(|&pt| {
                let ch = self.var.piece_to_char(crate::types::Piece::new(c, pt));
                std::iter::repeat_n(ch, self.count_in_hand(c, pt).max(0) as usize)
            })
            .collect()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let var = &*self.var;
        let files = var.max_file.index() + 1;
        let separator = format!(" {}+", "+---".repeat(files));
        let st = self.state();

        writeln!(f)?;
        writeln!(f, "{separator}")?;
        for r in (0..=var.max_rank.index()).rev() {
            let rank = Rank::new(r as u8).ok_or(fmt::Error)?;
            for fi in 0..files {
                let s = Square::new(File::new(fi as u8).ok_or(fmt::Error)?, rank);
                let unpromoted = self.unpromoted_piece_on(s);
                if st.wall_squares.contains(s) {
                    write!(f, " | *")?;
                } else if unpromoted.is_some() {
                    write!(f, " |+{}", var.piece_to_char(unpromoted))?;
                } else if self.piece_on(s).is_some() {
                    write!(f, " | {}", var.piece_to_char(self.piece_on(s)))?;
                } else {
                    write!(f, " |  ")?;
                }
            }
            write!(f, " |{}", r + 1)?;
            if r == var.max_rank.index() || r == 0 {
                let c = if r == 0 { Color::White } else { Color::Black };
                write!(f, "{}", if c == self.side_to_move { " *" } else { "  " })?;
                if var.piece_drops || var.seirawan_gating {
                    write!(f, " [{}]", self.hand_text(c))?;
                }
            }
            writeln!(f)?;
            writeln!(f, "{separator}")?;
        }
        for fi in 0..files {
            write!(f, "   {}", File::new(fi as u8).map_or('?', File::to_char))?;
        }
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "Fen: {}", self.fen())?;
        writeln!(f, "Sfen: {}", self.sfen())?;
        writeln!(f, "Key: {:016X}", st.key)?;

        let squares = |b: Bitboard| b.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ");
        write!(f, "Checkers: {}", squares(st.checkers))?;
        if st.chased.is_not_empty() {
            write!(f, "\nChased: {}", squares(st.chased))?;
        }
        Ok(())
    }
}
