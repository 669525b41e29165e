//! 駒の動きのカタログと利きテーブル
//!
//! 各駒種の動きを「跳び」「走り」「ホッパー（砲）」「足を塞がれる跳び」の
//! 組み合わせで白視点に定義し、黒は段方向を反転して使う。
//! 取る動き（capture）と取らない動き（quiet）は別々に持つ。
//!
//! テーブルは初回アクセス時に一度だけ構築する。

use std::sync::OnceLock;

use crate::types::{Color, PIECE_TYPE_NB, PieceSet, PieceType, SQUARE_NB, Square};

use super::Bitboard;

/// 1 方向の動き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// 1 回だけ跳ぶ
    Leap,
    /// 駒に当たるまで走る（0 は無制限）
    Ride(u8),
    /// 1 枚だけ駒を飛び越えて走る
    Hop,
    /// 途中のマス（目）が空いているときだけ跳べる
    Lame([(i8, i8); 2], u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Atom {
    df: i8,
    dr: i8,
    step: Step,
}

const ORTH: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAG: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
const KNIGHT: [(i8, i8); 8] = [
    (1, 2),
    (-1, 2),
    (1, -2),
    (-1, -2),
    (2, 1),
    (-2, 1),
    (2, -1),
    (-2, -1),
];

fn leaps(dirs: &[(i8, i8)]) -> impl Iterator<Item = Atom> + '_ {
    dirs.iter().map(|&(df, dr)| Atom { df, dr, step: Step::Leap })
}

fn rides(dirs: &[(i8, i8)], limit: u8) -> impl Iterator<Item = Atom> + '_ {
    dirs.iter().map(move |&(df, dr)| Atom { df, dr, step: Step::Ride(limit) })
}

fn hops(dirs: &[(i8, i8)]) -> impl Iterator<Item = Atom> + '_ {
    dirs.iter().map(|&(df, dr)| Atom { df, dr, step: Step::Hop })
}

/// 象棋の馬（桂跳び、縦横に隣接する足で塞がれる）
fn horse() -> Vec<Atom> {
    KNIGHT
        .iter()
        .map(|&(df, dr)| {
            let eye = if df.abs() == 2 { (df / 2, 0) } else { (0, dr / 2) };
            Atom { df, dr, step: Step::Lame([eye, (0, 0)], 1) }
        })
        .collect()
}

/// 象棋の相（斜め 2 マス、中間の目で塞がれる）
fn elephant() -> Vec<Atom> {
    DIAG.iter()
        .map(|&(df, dr)| Atom {
            df: df * 2,
            dr: dr * 2,
            step: Step::Lame([(df, dr), (0, 0)], 1),
        })
        .collect()
}

/// チャンギの象（縦横 1 マス + 斜め 2 マス、途中 2 マスで塞がれる）
fn janggi_elephant() -> Vec<Atom> {
    let mut v = Vec::new();
    for &(df, dr) in &DIAG {
        // 縦に長い跳び
        v.push(Atom {
            df: df * 2,
            dr: dr * 3,
            step: Step::Lame([(0, dr), (df, dr * 2)], 2),
        });
        // 横に長い跳び
        v.push(Atom {
            df: df * 3,
            dr: dr * 2,
            step: Step::Lame([(df, 0), (df * 2, dr)], 2),
        });
    }
    v
}

/// 駒種ごとの (quiet, capture) の動き
fn movement(pt: PieceType) -> (Vec<Atom>, Vec<Atom>) {
    use PieceType::*;
    let same = |v: Vec<Atom>| (v.clone(), v);
    match pt {
        Pawn => (leaps(&[(0, 1)]).collect(), leaps(&[(1, 1), (-1, 1)]).collect()),
        Knight => same(leaps(&KNIGHT).collect()),
        Bishop => same(rides(&DIAG, 0).collect()),
        Rook => same(rides(&ORTH, 0).collect()),
        Queen => same(rides(&ORTH, 0).chain(rides(&DIAG, 0)).collect()),
        Fers => same(leaps(&DIAG).collect()),
        Alfil => same(leaps(&[(2, 2), (-2, 2), (2, -2), (-2, -2)]).collect()),
        Silver => same(leaps(&DIAG).chain(leaps(&[(0, 1)])).collect()),
        Aiwok => same(rides(&ORTH, 0).chain(leaps(&KNIGHT)).chain(leaps(&DIAG)).collect()),
        Bers | Dragon => same(rides(&ORTH, 0).chain(leaps(&DIAG)).collect()),
        Archbishop => same(rides(&DIAG, 0).chain(leaps(&KNIGHT)).collect()),
        Chancellor => same(rides(&ORTH, 0).chain(leaps(&KNIGHT)).collect()),
        Amazon => same(
            rides(&ORTH, 0)
                .chain(rides(&DIAG, 0))
                .chain(leaps(&KNIGHT))
                .collect(),
        ),
        Wazir => same(leaps(&ORTH).collect()),
        Commoner | King => same(leaps(&ORTH).chain(leaps(&DIAG)).collect()),
        Cannon => (rides(&ORTH, 0).collect(), hops(&ORTH).collect()),
        JanggiCannon => same(hops(&ORTH).collect()),
        Horse => same(horse()),
        Elephant => same(elephant()),
        JanggiElephant => same(janggi_elephant()),
        Soldier => same(leaps(&[(0, 1), (1, 0), (-1, 0)]).collect()),
        ShogiPawn => same(leaps(&[(0, 1)]).collect()),
        Lance => same(rides(&[(0, 1)], 0).collect()),
        ShogiKnight => same(leaps(&[(1, 2), (-1, 2)]).collect()),
        Gold => same(leaps(&ORTH).chain(leaps(&[(1, 1), (-1, 1)])).collect()),
        DragonHorse => same(rides(&DIAG, 0).chain(leaps(&ORTH)).collect()),
        Clobber => (Vec::new(), leaps(&ORTH).collect()),
        Breakthrough => (
            leaps(&[(0, 1), (1, 1), (-1, 1)]).collect(),
            leaps(&[(1, 1), (-1, 1)]).collect(),
        ),
        Immobile => (Vec::new(), Vec::new()),
    }
}

/// 1 つの動きで到達できるマス
fn atom_targets(a: &Atom, c: Color, s: Square, occupied: Bitboard) -> Bitboard {
    let dr = a.dr as i32 * c.sign();
    let df = a.df as i32;
    let mut b = Bitboard::EMPTY;
    match a.step {
        Step::Leap => {
            if let Some(t) = s.offset(df, dr) {
                b |= t;
            }
        }
        Step::Ride(limit) => {
            let mut cur = s;
            let mut n = 0;
            while let Some(t) = cur.offset(df, dr) {
                b |= t;
                n += 1;
                if occupied.contains(t) || (limit != 0 && n >= limit) {
                    break;
                }
                cur = t;
            }
        }
        Step::Hop => {
            let mut cur = s;
            let mut screened = false;
            while let Some(t) = cur.offset(df, dr) {
                if screened {
                    b |= t;
                    if occupied.contains(t) {
                        break;
                    }
                } else if occupied.contains(t) {
                    screened = true;
                }
                cur = t;
            }
        }
        Step::Lame(eyes, n) => {
            let blocked = eyes[..n as usize].iter().any(|&(ef, er)| {
                s.offset(ef as i32, er as i32 * c.sign())
                    .is_some_and(|e| occupied.contains(e))
            });
            if !blocked && let Some(t) = s.offset(df, dr) {
                b |= t;
            }
        }
    }
    b
}

/// 空の盤面上での到達マス（ホッパーは走りとして扱う）
fn pseudo_targets(a: &Atom, c: Color, s: Square) -> Bitboard {
    match a.step {
        Step::Hop => atom_targets(
            &Atom {
                step: Step::Ride(0),
                ..*a
            },
            c,
            s,
            Bitboard::EMPTY,
        ),
        _ => atom_targets(a, c, s, Bitboard::EMPTY),
    }
}

const TABLE_LEN: usize = 2 * PIECE_TYPE_NB * SQUARE_NB;

#[inline]
const fn table_index(c: Color, pt: PieceType, s: Square) -> usize {
    (c.index() * PIECE_TYPE_NB + pt.index()) * SQUARE_NB + s.index()
}

struct PieceTables {
    quiet: Vec<Vec<Atom>>,
    capture: Vec<Vec<Atom>>,
    pseudo_attacks: Vec<Bitboard>,
    pseudo_moves: Vec<Bitboard>,
    leaper_attacks: Vec<Bitboard>,
    leaper_moves: Vec<Bitboard>,
    hoppers: PieceSet,
    lame: PieceSet,
    asymmetric: PieceSet,
    sliders: PieceSet,
}

static PIECE_TABLES: OnceLock<PieceTables> = OnceLock::new();

fn tables() -> &'static PieceTables {
    PIECE_TABLES.get_or_init(PieceTables::new)
}

impl PieceTables {
    fn new() -> Self {
        let mut quiet = vec![Vec::new(); PIECE_TYPE_NB];
        let mut capture = vec![Vec::new(); PIECE_TYPE_NB];
        let mut hoppers = PieceSet::EMPTY;
        let mut lame = PieceSet::EMPTY;
        let mut sliders = PieceSet::EMPTY;

        for pt in PieceType::ALL {
            let (q, cap) = movement(pt);
            for a in q.iter().chain(cap.iter()) {
                match a.step {
                    Step::Hop => hoppers = hoppers.with(pt),
                    Step::Lame(..) => lame = lame.with(pt),
                    Step::Ride(_) => sliders = sliders.with(pt),
                    Step::Leap => {}
                }
            }
            quiet[pt.index()] = q;
            capture[pt.index()] = cap;
        }

        let mut pseudo_attacks = vec![Bitboard::EMPTY; TABLE_LEN];
        let mut pseudo_moves = vec![Bitboard::EMPTY; TABLE_LEN];
        let mut leaper_attacks = vec![Bitboard::EMPTY; TABLE_LEN];
        let mut leaper_moves = vec![Bitboard::EMPTY; TABLE_LEN];

        for c in Color::ALL {
            for pt in PieceType::ALL {
                for s in Square::iter() {
                    let i = table_index(c, pt, s);
                    for a in &capture[pt.index()] {
                        pseudo_attacks[i] |= pseudo_targets(a, c, s);
                        if a.step == Step::Leap {
                            leaper_attacks[i] |= pseudo_targets(a, c, s);
                        }
                    }
                    for a in &quiet[pt.index()] {
                        pseudo_moves[i] |= pseudo_targets(a, c, s);
                        if a.step == Step::Leap {
                            leaper_moves[i] |= pseudo_targets(a, c, s);
                        }
                    }
                }
            }
        }

        // 足の位置が非対称な跳び駒は、逆方向の利きが一致しない
        let asymmetric = PieceSet::EMPTY
            .with(PieceType::Horse)
            .with(PieceType::JanggiElephant);

        log::debug!(
            "piece tables initialized: hoppers={:?} lame={:?}",
            hoppers.iter().collect::<Vec<_>>(),
            lame.iter().collect::<Vec<_>>()
        );

        PieceTables {
            quiet,
            capture,
            pseudo_attacks,
            pseudo_moves,
            leaper_attacks,
            leaper_moves,
            hoppers,
            lame,
            asymmetric,
            sliders,
        }
    }
}

/// テーブルを構築する（初回アクセス時にも自動で構築される）
pub fn init_piece_tables() {
    let _ = tables();
}

/// 取る利き
#[inline]
pub fn attacks_bb(c: Color, pt: PieceType, s: Square, occupied: Bitboard) -> Bitboard {
    let t = tables();
    let i = table_index(c, pt, s);
    if t.hoppers.contains(pt) || t.lame.contains(pt) || t.sliders.contains(pt) {
        t.capture[pt.index()]
            .iter()
            .fold(Bitboard::EMPTY, |b, a| b | atom_targets(a, c, s, occupied))
    } else {
        t.leaper_attacks[i]
    }
}

/// 取らない動き
#[inline]
pub fn moves_bb(c: Color, pt: PieceType, s: Square, occupied: Bitboard) -> Bitboard {
    let t = tables();
    let i = table_index(c, pt, s);
    if t.hoppers.contains(pt) || t.lame.contains(pt) || t.sliders.contains(pt) {
        t.quiet[pt.index()]
            .iter()
            .fold(Bitboard::EMPTY, |b, a| b | atom_targets(a, c, s, occupied))
    } else {
        t.leaper_moves[i]
    }
}

/// 空の盤面での取る利き（ホッパーは走りとして扱う）
#[inline]
pub fn pseudo_attacks(c: Color, pt: PieceType, s: Square) -> Bitboard {
    tables().pseudo_attacks[table_index(c, pt, s)]
}

/// 空の盤面での取らない動き
#[inline]
pub fn pseudo_moves(c: Color, pt: PieceType, s: Square) -> Bitboard {
    tables().pseudo_moves[table_index(c, pt, s)]
}

/// 跳びだけによる取る利き
#[inline]
pub fn leaper_attacks(c: Color, pt: PieceType, s: Square) -> Bitboard {
    tables().leaper_attacks[table_index(c, pt, s)]
}

/// 跳びだけによる取らない動き
#[inline]
pub fn leaper_moves(c: Color, pt: PieceType, s: Square) -> Bitboard {
    tables().leaper_moves[table_index(c, pt, s)]
}

/// 砲のように駒を飛び越えて動く駒か
#[inline]
pub fn is_hopper(pt: PieceType) -> bool {
    tables().hoppers.contains(pt)
}

/// 利きの向きが非対称な駒か（逆向きの利きで攻撃駒を求められない）
#[inline]
pub fn is_asymmetric(pt: PieceType) -> bool {
    tables().asymmetric.contains(pt)
}

/// 直線の走り以外の方法で遠くに利く駒か（ホッパー・足を塞がれる跳び）
#[inline]
pub fn is_non_sliding_rider(pt: PieceType) -> bool {
    let t = tables();
    t.hoppers.contains(pt) || t.lame.contains(pt)
}

/// 走り・ホッパー・足を塞がれる跳びのいずれかを持つ駒か
#[inline]
pub fn is_rider(pt: PieceType) -> bool {
    let t = tables();
    t.hoppers.contains(pt) || t.lame.contains(pt) || t.sliders.contains(pt)
}

/// 足を塞がれる跳びで from から to に跳ぶときの目のマス
pub fn lame_eyes(c: Color, pt: PieceType, from: Square, to: Square) -> Bitboard {
    let t = tables();
    let df = to.file().index() as i32 - from.file().index() as i32;
    let dr = (to.rank().index() as i32 - from.rank().index() as i32) * c.sign();
    let mut b = Bitboard::EMPTY;
    for a in t.capture[pt.index()].iter().chain(t.quiet[pt.index()].iter()) {
        if let Step::Lame(eyes, n) = a.step
            && a.df as i32 == df
            && a.dr as i32 == dr
        {
            for &(ef, er) in &eyes[..n as usize] {
                if let Some(e) = from.offset(ef as i32, er as i32 * c.sign()) {
                    b |= e;
                }
            }
        }
    }
    b
}

// 標準駒の利き（色に依存しないもの）

#[inline]
pub fn rook_attacks(s: Square, occupied: Bitboard) -> Bitboard {
    attacks_bb(Color::White, PieceType::Rook, s, occupied)
}

#[inline]
pub fn bishop_attacks(s: Square, occupied: Bitboard) -> Bitboard {
    attacks_bb(Color::White, PieceType::Bishop, s, occupied)
}

#[inline]
pub fn knight_attacks(s: Square) -> Bitboard {
    leaper_attacks(Color::White, PieceType::Knight, s)
}

#[inline]
pub fn king_attacks(s: Square) -> Bitboard {
    leaper_attacks(Color::White, PieceType::Commoner, s)
}

#[inline]
pub fn fers_attacks(s: Square) -> Bitboard {
    leaper_attacks(Color::White, PieceType::Fers, s)
}

#[inline]
pub fn wazir_attacks(s: Square) -> Bitboard {
    leaper_attacks(Color::White, PieceType::Wazir, s)
}

#[inline]
pub fn pawn_attacks(c: Color, s: Square) -> Bitboard {
    leaper_attacks(c, PieceType::Pawn, s)
}

/// 斜め方向のホッパー（チャンギの包の宮中斜め移動）
pub fn cannon_diagonal_attacks(s: Square, occupied: Bitboard) -> Bitboard {
    hops(&DIAG).fold(Bitboard::EMPTY, |b, a| b | atom_targets(&a, Color::White, s, occupied))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn test_knight_attacks_corner() {
        let b = knight_attacks(sq("a1"));
        assert_eq!(b.count(), 2);
        assert!(b.contains(sq("b3")));
        assert!(b.contains(sq("c2")));
    }

    #[test]
    fn test_rook_attacks_blocked() {
        let occ = Bitboard::from_square(sq("a4"));
        let b = rook_attacks(sq("a1"), occ);
        assert!(b.contains(sq("a4")));
        assert!(!b.contains(sq("a5")));
        assert!(b.contains(sq("l1")));
    }

    #[test]
    fn test_pawn_direction_by_color() {
        assert!(pawn_attacks(Color::White, sq("e4")).contains(sq("d5")));
        assert!(pawn_attacks(Color::Black, sq("e4")).contains(sq("d3")));
        assert!(moves_bb(Color::Black, PieceType::Pawn, sq("e7"), Bitboard::EMPTY).contains(sq("e6")));
    }

    #[test]
    fn test_cannon_hops_one_screen() {
        let occ = Bitboard::from_square(sq("a3")) | sq("a6");
        let cap = attacks_bb(Color::White, PieceType::Cannon, sq("a1"), occ);
        assert!(!cap.contains(sq("a3")));
        assert!(cap.contains(sq("a4")));
        assert!(cap.contains(sq("a6")));
        assert!(!cap.contains(sq("a7")));
        let quiet = moves_bb(Color::White, PieceType::Cannon, sq("a1"), occ);
        assert!(quiet.contains(sq("a2")));
        assert!(!quiet.contains(sq("a4")));
    }

    #[test]
    fn test_horse_is_lame() {
        let free = attacks_bb(Color::White, PieceType::Horse, sq("b1"), Bitboard::EMPTY);
        assert!(free.contains(sq("c3")));
        let blocked = attacks_bb(Color::White, PieceType::Horse, sq("b1"), Bitboard::from_square(sq("b2")));
        assert!(!blocked.contains(sq("c3")));
        assert!(!blocked.contains(sq("a3")));
        assert!(blocked.contains(sq("d2")));
        assert_eq!(lame_eyes(Color::White, PieceType::Horse, sq("b1"), sq("c3")), Bitboard::from_square(sq("b2")));
    }

    #[test]
    fn test_piece_flags() {
        assert!(is_hopper(PieceType::Cannon));
        assert!(is_non_sliding_rider(PieceType::Horse));
        assert!(!is_non_sliding_rider(PieceType::Rook));
        assert!(is_asymmetric(PieceType::Horse));
        assert!(!is_asymmetric(PieceType::Elephant));
        assert!(is_rider(PieceType::Lance));
        assert!(!is_rider(PieceType::Knight));
    }

    #[test]
    fn test_pseudo_minus_leaper_is_slider_reach() {
        let s = sq("d4");
        let slider_part = pseudo_attacks(Color::White, PieceType::Dragon, s)
            ^ leaper_attacks(Color::White, PieceType::Dragon, s);
        assert_eq!(slider_part, rook_attacks(s, Bitboard::EMPTY));
    }
}
