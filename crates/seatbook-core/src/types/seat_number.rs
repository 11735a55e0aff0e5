//! Validated seat label such as `12C`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Highest column letter a seat label may carry.
pub const MAX_COLUMNS: u8 = 26;

/// A seat label: a 1-based row number followed by a single column letter
/// `A`-`Z`. Leading zeros and lowercase letters are rejected so every seat
/// has exactly one spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatNumber {
    label: String,
    row: u16,
    column: u8,
}

impl SeatNumber {
    /// Build a label from a 1-based row and a 0-based column index.
    pub fn from_parts(row: u16, column_index: u8) -> Result<Self, AppError> {
        if row == 0 {
            return Err(AppError::validation("seat row must be at least 1"));
        }
        if column_index >= MAX_COLUMNS {
            return Err(AppError::validation(format!(
                "seat column index {column_index} is out of range"
            )));
        }
        let letter = char::from(b'A' + column_index);
        Ok(Self {
            label: format!("{row}{letter}"),
            row,
            column: column_index,
        })
    }

    /// The label as stored in the database.
    pub fn as_str(&self) -> &str {
        &self.label
    }

    /// 1-based row number.
    pub fn row(&self) -> u16 {
        self.row
    }

    /// 0-based column index (`A` = 0).
    pub fn column_index(&self) -> u8 {
        self.column
    }

    /// Column letter.
    pub fn column_letter(&self) -> char {
        char::from(b'A' + self.column)
    }
}

impl FromStr for SeatNumber {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("invalid seat number '{s}'"));

        let letter = s.chars().last().ok_or_else(invalid)?;
        if !letter.is_ascii_uppercase() {
            return Err(invalid());
        }
        let digits = &s[..s.len() - 1];
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let row: u16 = digits.parse().map_err(|_| invalid())?;
        Self::from_parts(row, letter as u8 - b'A')
    }
}

impl TryFrom<String> for SeatNumber {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatNumber> for String {
    fn from(seat: SeatNumber) -> String {
        seat.label
    }
}

impl Ord for SeatNumber {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.row, self.column).cmp(&(other.row, other.column))
    }
}

impl PartialOrd for SeatNumber {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for SeatNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for SeatNumber {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.label, buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SeatNumber {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(raw.parse::<SeatNumber>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_labels() {
        let seat: SeatNumber = "12C".parse().expect("valid");
        assert_eq!(seat.row(), 12);
        assert_eq!(seat.column_index(), 2);
        assert_eq!(seat.column_letter(), 'C');
        assert_eq!(seat.as_str(), "12C");
    }

    #[test]
    fn test_reject_malformed_labels() {
        for raw in ["", "A", "12", "0A", "012A", "1a", "1AA", "-1A", "1 A", "70000A"] {
            assert!(raw.parse::<SeatNumber>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_from_parts_matches_parse() {
        let built = SeatNumber::from_parts(20, 5).expect("valid");
        assert_eq!(built, "20F".parse().expect("valid"));
        assert!(SeatNumber::from_parts(0, 0).is_err());
        assert!(SeatNumber::from_parts(1, 26).is_err());
    }

    #[test]
    fn test_ordering_is_row_then_column() {
        let mut seats: Vec<SeatNumber> = ["10A", "2B", "2A", "1F"]
            .iter()
            .map(|s| s.parse().expect("valid"))
            .collect();
        seats.sort();
        let labels: Vec<&str> = seats.iter().map(SeatNumber::as_str).collect();
        assert_eq!(labels, vec!["1F", "2A", "2B", "10A"]);
    }

    #[test]
    fn test_serde_uses_label() {
        let seat: SeatNumber = "3D".parse().expect("valid");
        let json = serde_json::to_string(&seat).expect("serialize");
        assert_eq!(json, "\"3D\"");
        assert!(serde_json::from_str::<SeatNumber>("\"3d\"").is_err());
    }
}
