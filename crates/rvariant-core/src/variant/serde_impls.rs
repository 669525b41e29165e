//! 設定ファイル用の Deserialize 実装
//!
//! - 領域: `"*1 *2"`（段全体）、`"a*"`（筋全体）、`"e4 d5"`（マス）を空白区切りで並べる
//! - 評価値: `"win"` / `"loss"` / `"draw"` / `"none"` または整数
//! - 段: 1 始まりの整数、筋: `"a"` などの文字

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, IntoDeserializer, Visitor};
use serde::Deserialize;

use crate::bitboard::Bitboard;
use crate::types::{File, PieceType, Rank, Square, Value};

/// 領域文字列を Bitboard に変換する
pub fn parse_region(s: &str) -> Result<Bitboard, String> {
    let mut bb = Bitboard::EMPTY;
    for token in s.split_whitespace() {
        let mut chars = token.chars();
        let file_part = chars.next().ok_or_else(|| format!("empty region token in '{s}'"))?;
        let rank_part = chars.as_str();
        let ranks = if rank_part == "*" {
            None
        } else {
            let n: u8 = rank_part.parse().map_err(|_| format!("invalid rank in region token '{token}'"))?;
            let r = n
                .checked_sub(1)
                .and_then(Rank::new)
                .ok_or_else(|| format!("rank out of range in region token '{token}'"))?;
            Some(r)
        };
        let file = if file_part == '*' {
            None
        } else {
            Some(File::from_char(file_part).ok_or_else(|| format!("invalid file in region token '{token}'"))?)
        };
        bb |= match (file, ranks) {
            (None, None) => Bitboard::ALL,
            (None, Some(r)) => Bitboard::rank(r),
            (Some(f), None) => Bitboard::file(f),
            (Some(f), Some(r)) => Bitboard::from_square(Square::new(f, r)),
        };
    }
    Ok(bb)
}

impl<'de> Deserialize<'de> for Bitboard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_region(&s).map_err(de::Error::custom)
    }
}

struct ValueVisitor;

impl Visitor<'_> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or one of win/loss/draw/none")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        i32::try_from(v).map(Value::new).map_err(|_| E::custom(format!("value {v} out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i32::try_from(v).map(Value::new).map_err(|_| E::custom(format!("value {v} out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        match v {
            "win" => Ok(Value::MATE),
            "loss" => Ok(-Value::MATE),
            "draw" => Ok(Value::DRAW),
            "none" => Ok(Value::NONE),
            _ => Err(E::custom(format!("unknown value '{v}'"))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        n.checked_sub(1)
            .and_then(Rank::new)
            .ok_or_else(|| de::Error::custom(format!("rank {n} out of range")))
    }
}

impl<'de> Deserialize<'de> for File {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut chars = s.chars();
        match (chars.next().and_then(File::from_char), chars.next()) {
            (Some(f), None) => Ok(f),
            _ => Err(de::Error::custom(format!("invalid file '{s}'"))),
        }
    }
}

/// 駒種名から駒種
pub fn piece_type_from_name(name: &str) -> Option<PieceType> {
    let de: de::value::StrDeserializer<'_, de::value::Error> = name.into_deserializer();
    PieceType::deserialize(de).ok()
}

/// 駒種をキーとする表（TOML のキーは文字列になる）
pub fn piece_type_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<PieceType, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw = BTreeMap::<String, V>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(k, v)| {
            piece_type_from_name(&k)
                .map(|pt| (pt, v))
                .ok_or_else(|| de::Error::custom(format!("unknown piece type '{k}'")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("*1").unwrap(), Bitboard::rank(Rank::R1));
        assert_eq!(parse_region("a*").unwrap(), Bitboard::file(File::A));
        let bb = parse_region("e4 d5").unwrap();
        assert_eq!(bb.count(), 2);
        assert!(bb.contains(Square::parse("e4").unwrap()));
        assert!(parse_region("*0").is_err());
        assert!(parse_region("q1").is_err());
        assert_eq!(parse_region("").unwrap(), Bitboard::EMPTY);
    }

    #[test]
    fn test_piece_type_from_name() {
        assert_eq!(piece_type_from_name("janggi_cannon"), Some(PieceType::JanggiCannon));
        assert_eq!(piece_type_from_name("dragon_horse"), Some(PieceType::DragonHorse));
        assert_eq!(piece_type_from_name("unicorn"), None);
    }
}
