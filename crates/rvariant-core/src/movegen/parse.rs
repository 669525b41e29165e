//! 指し手の文字列表現（UCI 形式の拡張）
//!
//! - 通常: `e2e4`、成り `e7e8q`、成り駒の成り・戻り `+` / `-`
//! - 打つ手: `N@e4`（成り駒として打つときは `+P@e4`）
//! - ゲート: 末尾に駒文字、ゲートが移動元でなければマスも続ける（`e1h1eh1`）
//! - 壁: `,<移動先><壁>`（`e2e4,e4d5`）
//! - キャスリング: 通常は王の移動先、960 では王がルークを取る形
//! - パス: 移動元と移動先が同じ、null move は `0000`

use thiserror::Error;

use crate::position::Position;
use crate::types::{Color, Move, MoveType, Piece, Square};

use super::movelist::MoveList;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("empty move text")]
    Empty,
    #[error("no legal move matches `{0}`")]
    NoMatch(String),
}

/// 指し手を文字列にする
pub fn move_to_uci(pos: &Position, m: Move) -> String {
    if m == Move::NONE {
        return "(none)".to_string();
    }
    if m == Move::NULL {
        return "0000".to_string();
    }
    let var = pos.variant();
    let upper = |pt| var.piece_to_char(Piece::new(Color::White, pt));
    let lower = |pt| var.piece_to_char(Piece::new(Color::Black, pt));
    let (from, to) = (m.from(), m.to());
    let mut s = String::new();

    if m.is_drop() {
        match (m.in_hand_piece_type(), m.dropped_piece_type()) {
            (Some(hand), Some(dropped)) if hand != dropped => {
                s.push('+');
                s.push(upper(hand));
            }
            (_, Some(dropped)) => s.push(upper(dropped)),
            _ => {}
        }
        s.push('@');
        s.push_str(&to.to_string());
    } else {
        s.push_str(&from.to_string());
        let dest = if m.move_type() == MoveType::Castling && !pos.is_chess960() {
            castling_king_destination(pos, from, to)
        } else {
            to
        };
        s.push_str(&dest.to_string());
        match m.move_type() {
            MoveType::Promotion => {
                if let Some(pt) = m.promotion_type() {
                    s.push(lower(pt));
                }
            }
            MoveType::PiecePromotion => s.push('+'),
            MoveType::PieceDemotion => s.push('-'),
            _ => {}
        }
        if let Some(pt) = m.gating_type() {
            s.push(lower(pt));
            if m.gating_square() != from {
                s.push_str(&m.gating_square().to_string());
            }
        }
    }

    if var.walling() && m.gating_type().is_none() {
        s.push(',');
        s.push_str(&to.to_string());
        s.push_str(&m.gating_square().to_string());
    }
    s
}

/// 王がルークを取る形のキャスリングから王の移動先を求める
fn castling_king_destination(pos: &Position, kfrom: Square, rfrom: Square) -> Square {
    let var = pos.variant();
    let file = if rfrom > kfrom { var.castling_kingside_file } else { var.castling_queenside_file };
    Square::new(file, pos.castling_rank(pos.side_to_move()))
}

/// 文字列を現局面の合法手として解釈する
pub fn parse_move(pos: &Position, text: &str) -> Result<Move, MoveParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MoveParseError::Empty);
    }
    if text == "0000" {
        return Ok(Move::NULL);
    }
    let legal = MoveList::legal(pos);
    legal
        .iter()
        .copied()
        .find(|&m| {
            move_to_uci(pos, m) == text
                // 960 形式のキャスリングも受け付ける
                || (m.move_type() == MoveType::Castling
                    && !m.is_gating()
                    && format!("{}{}", m.from(), m.to()) == text)
        })
        .ok_or_else(|| MoveParseError::NoMatch(text.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::PieceType;
    use crate::variant::Variant;

    fn pos(variant: &str, fen: &str) -> Position {
        crate::init();
        Position::set(Arc::new(Variant::preset(variant).unwrap()), fen, false).unwrap()
    }

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn test_normal_and_promotion_text() {
        let p = pos("chess", "4k3/P7/8/8/8/8/4P3/4K3 w - - 0 1");
        assert_eq!(move_to_uci(&p, Move::normal(sq("e2"), sq("e4"))), "e2e4");
        assert_eq!(move_to_uci(&p, Move::promotion(sq("a7"), sq("a8"), PieceType::Queen)), "a7a8q");
        assert_eq!(parse_move(&p, "a7a8n"), Ok(Move::promotion(sq("a7"), sq("a8"), PieceType::Knight)));
        assert_eq!(move_to_uci(&p, Move::NULL), "0000");
    }

    #[test]
    fn test_castling_text() {
        let p = pos("chess", "4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        let oo = Move::with_type(MoveType::Castling, sq("e1"), sq("h1"));
        assert_eq!(move_to_uci(&p, oo), "e1g1");
        assert_eq!(parse_move(&p, "e1g1"), Ok(oo));
        assert_eq!(parse_move(&p, "e1h1"), Ok(oo));
    }

    #[test]
    fn test_drop_text() {
        let p = pos("crazyhouse", "4k3/8/8/8/8/8/8/4K3[N] w - - 0 1");
        let m = Move::drop(PieceType::Knight, PieceType::Knight, sq("d4"));
        assert_eq!(move_to_uci(&p, m), "N@d4");
        assert_eq!(parse_move(&p, "N@d4"), Ok(m));
    }

    #[test]
    fn test_ten_rank_text() {
        let p = pos("xiangqi", "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w - - 0 1");
        let m = parse_move(&p, "h3h10").unwrap();
        assert_eq!(m.from(), sq("h3"));
        assert_eq!(m.to(), sq("h10"));
    }

    #[test]
    fn test_parse_errors() {
        let p = pos("chess", "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        assert_eq!(parse_move(&p, "  "), Err(MoveParseError::Empty));
        assert_eq!(parse_move(&p, "e2e5"), Err(MoveParseError::NoMatch("e2e5".to_string())));
    }
}
