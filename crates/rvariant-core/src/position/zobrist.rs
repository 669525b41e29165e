//! Zobristハッシュと cuckoo テーブル
//!
//! 乱数は固定シードの Xoshiro256++ から生成するので、実行ごとに同じキーになる。
//! テーブルは初回アクセス時に一度だけ構築し、以後は読み取り専用。

use std::sync::OnceLock;

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::bitboard::{Bitboard, attacks_bb};
use crate::types::{
    CASTLING_RIGHT_NB, Color, FILE_NB, Move, PIECE_NB, Piece, PieceType, SQUARE_NB, Square,
};

/// ハッシュキー
pub type Key = u64;

/// 王手回数のキーの数
pub const CHECKS_NB: usize = 11;
/// 得点のキーの数（これ以上は最後のキーを使う）
pub const MAX_ZOBRIST_POINTS: usize = 512;

const CUCKOO_SIZE: usize = 0x8000;
const ZOBRIST_SEED: u64 = 1_070_372;

/// cuckoo テーブルに入る手の数（12x10 の格子で N, B, R, Q, K の両色）
pub const CUCKOO_COUNT: usize = 9344;

/// Zobristハッシュ用乱数テーブル
pub struct Zobrist {
    /// 駒×升 [Piece.index()][Square.index()]
    pub psq: Vec<[Key; SQUARE_NB]>,
    /// e.p. の筋
    pub enpassant: [Key; FILE_NB],
    /// キャスリング権
    pub castling: [Key; CASTLING_RIGHT_NB],
    /// 手番用（黒番で XOR する）
    pub side: Key,
    /// 盤上に歩が一枚もない時のキー
    pub no_pawns: Key,
    /// 持ち駒 [Piece.index()][枚数]
    pub in_hand: Vec<[Key; SQUARE_NB]>,
    /// 牢の駒 [Piece.index()][枚数]
    pub in_prison: Vec<[Key; SQUARE_NB]>,
    /// 残り王手回数 [Color][回数]
    pub checks: [[Key; CHECKS_NB]; Color::NUM],
    /// 壁
    pub wall: [Key; SQUARE_NB],
    /// 得点 [Color][点数]
    pub points: Vec<[Key; MAX_ZOBRIST_POINTS]>,
    cuckoo: Vec<Key>,
    cuckoo_move: Vec<Move>,
}

static ZOBRIST: OnceLock<Zobrist> = OnceLock::new();

/// グローバルZobristテーブル
#[inline]
pub fn zobrist() -> &'static Zobrist {
    ZOBRIST.get_or_init(Zobrist::new)
}

#[inline]
fn h1(h: Key) -> usize {
    (h & 0x7fff) as usize
}

#[inline]
fn h2(h: Key) -> usize {
    ((h >> 16) & 0x7fff) as usize
}

impl Zobrist {
    fn new() -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(ZOBRIST_SEED);
        let mut table = || {
            let mut t = [0; SQUARE_NB];
            for k in t.iter_mut() {
                *k = rng.next_u64();
            }
            t
        };

        // Piece::NONE と全駒種の添字は 0 のまま
        let mut psq = vec![[0; SQUARE_NB]; PIECE_NB];
        for c in Color::ALL {
            for pt in PieceType::ALL {
                psq[Piece::new(c, pt).index()] = table();
            }
        }

        let mut zobrist = Zobrist {
            psq,
            enpassant: [0; FILE_NB],
            castling: [0; CASTLING_RIGHT_NB],
            side: 0,
            no_pawns: 0,
            in_hand: vec![[0; SQUARE_NB]; PIECE_NB],
            in_prison: vec![[0; SQUARE_NB]; PIECE_NB],
            checks: [[0; CHECKS_NB]; Color::NUM],
            wall: [0; SQUARE_NB],
            points: vec![[0; MAX_ZOBRIST_POINTS]; Color::NUM],
            cuckoo: vec![0; CUCKOO_SIZE],
            cuckoo_move: vec![Move::NONE; CUCKOO_SIZE],
        };

        for k in zobrist.enpassant.iter_mut() {
            *k = rng.next_u64();
        }
        for k in zobrist.castling.iter_mut() {
            *k = rng.next_u64();
        }
        zobrist.side = rng.next_u64();
        zobrist.no_pawns = rng.next_u64();
        for c in Color::ALL {
            for k in zobrist.checks[c.index()].iter_mut() {
                *k = rng.next_u64();
            }
        }
        for c in Color::ALL {
            for pt in PieceType::ALL {
                let i = Piece::new(c, pt).index();
                for k in zobrist.in_hand[i].iter_mut() {
                    *k = rng.next_u64();
                }
                for k in zobrist.in_prison[i].iter_mut() {
                    *k = rng.next_u64();
                }
            }
        }
        for k in zobrist.wall.iter_mut() {
            *k = rng.next_u64();
        }
        for c in Color::ALL {
            for k in zobrist.points[c.index()].iter_mut() {
                *k = rng.next_u64();
            }
        }

        let count = zobrist.fill_cuckoo();
        debug_assert_eq!(count, CUCKOO_COUNT);
        log::debug!("zobrist tables initialized: cuckoo entries={count}");
        zobrist
    }

    /// 可逆な手（歩以外の跳び・走り）を cuckoo テーブルに登録する
    fn fill_cuckoo(&mut self) -> usize {
        let mut count = 0;
        let types = [
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ];
        for c in Color::ALL {
            for pt in types {
                let pc = Piece::new(c, pt);
                for s1 in Square::iter() {
                    let attacks = attacks_bb(c, pt, s1, Bitboard::EMPTY);
                    for s2 in Square::iter().filter(|&s2| s2 > s1) {
                        if !attacks.contains(s2) {
                            continue;
                        }
                        let mut mv = Move::normal(s1, s2);
                        let mut key = self.psq[pc.index()][s1.index()]
                            ^ self.psq[pc.index()][s2.index()]
                            ^ self.side;
                        let mut i = h1(key);
                        loop {
                            std::mem::swap(&mut self.cuckoo[i], &mut key);
                            std::mem::swap(&mut self.cuckoo_move[i], &mut mv);
                            // 空きに着いたら終わり
                            if mv == Move::NONE {
                                break;
                            }
                            // 追い出した手をもう一方の候補へ
                            i = if i == h1(key) { h2(key) } else { h1(key) };
                        }
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// キーの差分に一致する可逆手を引く
    pub fn cuckoo_probe(&self, move_key: Key) -> Option<Move> {
        [h1(move_key), h2(move_key)]
            .into_iter()
            .find(|&j| self.cuckoo[j] == move_key)
            .map(|j| self.cuckoo_move[j])
    }
}

/// テーブルを構築する（初回アクセス時にも自動で構築される）
pub fn init() {
    let _ = zobrist();
}

/// 駒と升のハッシュを取得
#[inline]
pub fn zobrist_psq(pc: Piece, sq: Square) -> Key {
    zobrist().psq[pc.index()][sq.index()]
}

/// 駒割ハッシュの成分（cnt 枚目の駒）
#[inline]
pub fn zobrist_material(pc: Piece, cnt: i32) -> Key {
    zobrist().psq[pc.index()][cnt.clamp(0, SQUARE_NB as i32 - 1) as usize]
}

/// 手番のハッシュを取得
#[inline]
pub fn zobrist_side() -> Key {
    zobrist().side
}

/// 無歩時のハッシュを取得
#[inline]
pub fn zobrist_no_pawns() -> Key {
    zobrist().no_pawns
}

/// 持ち駒のハッシュを取得（枚数は範囲内に丸める）
#[inline]
pub fn zobrist_in_hand(pc: Piece, count: i32) -> Key {
    zobrist().in_hand[pc.index()][count.clamp(0, SQUARE_NB as i32 - 1) as usize]
}

/// 牢の駒のハッシュを取得（枚数は範囲内に丸める）
#[inline]
pub fn zobrist_in_prison(pc: Piece, count: i32) -> Key {
    zobrist().in_prison[pc.index()][count.clamp(0, SQUARE_NB as i32 - 1) as usize]
}

/// 得点のハッシュを取得（負の得点は 0、上限以上は最後のキー）
#[inline]
pub fn zobrist_points(c: Color, points: i32) -> Key {
    if points < 0 {
        return 0;
    }
    zobrist().points[c.index()][(points as usize).min(MAX_ZOBRIST_POINTS - 1)]
}

/// 残り王手回数のハッシュを取得
#[inline]
pub fn zobrist_checks(c: Color, remaining: i32) -> Key {
    zobrist().checks[c.index()][remaining.clamp(0, CHECKS_NB as i32 - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zobrist_init() {
        let z = zobrist();
        assert_ne!(z.side, 0);
        assert_ne!(z.no_pawns, 0);
        assert_eq!(z.psq[Piece::NONE.index()], [0; SQUARE_NB]);
        let wk = Piece::new(Color::White, PieceType::King);
        let bk = Piece::new(Color::Black, PieceType::King);
        let e1 = Square::parse("e1").unwrap();
        assert_ne!(zobrist_psq(wk, e1), 0);
        assert_ne!(zobrist_psq(wk, e1), zobrist_psq(bk, e1));
    }

    #[test]
    fn test_zobrist_xor_property() {
        let pc = Piece::new(Color::White, PieceType::Knight);
        let g1 = Square::parse("g1").unwrap();
        let f3 = Square::parse("f3").unwrap();
        let mut key = 0;
        key ^= zobrist_psq(pc, g1);
        key ^= zobrist_psq(pc, f3);
        key ^= zobrist_psq(pc, g1);
        assert_eq!(key, zobrist_psq(pc, f3));
    }

    #[test]
    fn test_zobrist_clamped_counts() {
        let pc = Piece::new(Color::Black, PieceType::Pawn);
        assert_eq!(zobrist_in_hand(pc, -3), zobrist_in_hand(pc, 0));
        assert_eq!(zobrist_in_hand(pc, 500), zobrist_in_hand(pc, SQUARE_NB as i32 - 1));
        assert_eq!(zobrist_points(Color::White, 4000), zobrist_points(Color::White, 511));
        assert_eq!(zobrist_points(Color::White, -1), 0);
    }

    #[test]
    fn test_cuckoo_contains_reversible_moves() {
        let z = zobrist();
        let pc = Piece::new(Color::White, PieceType::Knight);
        let g1 = Square::parse("g1").unwrap();
        let f3 = Square::parse("f3").unwrap();
        let move_key = zobrist_psq(pc, g1) ^ zobrist_psq(pc, f3) ^ z.side;
        assert_eq!(z.cuckoo_probe(move_key), Some(Move::normal(g1, f3)));
        // 歩の手は登録されない
        let p = Piece::new(Color::White, PieceType::Pawn);
        let e2 = Square::parse("e2").unwrap();
        let e3 = Square::parse("e3").unwrap();
        assert_eq!(z.cuckoo_probe(zobrist_psq(p, e2) ^ zobrist_psq(p, e3) ^ z.side), None);
    }

    #[test]
    fn test_cuckoo_count() {
        let filled = zobrist().cuckoo_move.iter().filter(|m| **m != Move::NONE).count();
        assert_eq!(filled, CUCKOO_COUNT);
    }
}
