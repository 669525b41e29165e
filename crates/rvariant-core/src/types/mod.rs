//! 基本型定義

mod color;
mod moves;
mod piece;
mod square;
mod value;

pub use color::Color;
pub use moves::{Move, MoveType};
pub use piece::{PIECE_NB, PIECE_TYPE_NB, Piece, PieceSet, PieceType};
pub use square::{FILE_NB, File, RANK_NB, Rank, SQUARE_NB, Square};
pub use value::{MAX_PLY, Value};

/// キャスリング権（ビット集合）
pub type CastlingRights = u8;

pub const WHITE_OO: CastlingRights = 1;
pub const WHITE_OOO: CastlingRights = 2;
pub const BLACK_OO: CastlingRights = 4;
pub const BLACK_OOO: CastlingRights = 8;
pub const KING_SIDE: CastlingRights = WHITE_OO | BLACK_OO;
pub const QUEEN_SIDE: CastlingRights = WHITE_OOO | BLACK_OOO;
pub const WHITE_CASTLING: CastlingRights = WHITE_OO | WHITE_OOO;
pub const BLACK_CASTLING: CastlingRights = BLACK_OO | BLACK_OOO;
pub const ANY_CASTLING: CastlingRights = WHITE_CASTLING | BLACK_CASTLING;
pub const CASTLING_RIGHT_NB: usize = 16;

/// 手番のキャスリング権
#[inline]
pub const fn castling_rights_of(c: Color) -> CastlingRights {
    match c {
        Color::White => WHITE_CASTLING,
        Color::Black => BLACK_CASTLING,
    }
}
