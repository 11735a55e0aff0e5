//! Newtype wrappers around the integer surrogate keys of the booking schema.
//!
//! Using distinct types prevents accidentally passing a `RequesterId` where
//! a `BookingId` is expected. When the `sqlx` feature is enabled, each ID
//! type also implements `sqlx::Type`, `sqlx::Encode`, and `sqlx::Decode`
//! for PostgreSQL `INTEGER` columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `i32`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Return the inner integer value.
            pub fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> i32 {
                id.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <i32 as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <i32 as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a user competing for a seat.
    RequesterId
);

define_id!(
    /// Identifier of a bookable seat row.
    BookingId
);

define_id!(
    /// Identifier of a trip.
    TripId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = RequesterId(42);
        assert_eq!(id.to_string(), "42");
        let parsed: RequesterId = " 42 ".parse().expect("should parse");
        assert_eq!(parsed, id);
        assert!("abc".parse::<BookingId>().is_err());
    }

    #[test]
    fn test_ordering_follows_inner_value() {
        let mut ids = vec![BookingId(3), BookingId(1), BookingId(2)];
        ids.sort();
        assert_eq!(ids, vec![BookingId(1), BookingId(2), BookingId(3)]);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&RequesterId(7)).expect("serialize");
        assert_eq!(json, "7");
        let parsed: RequesterId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, RequesterId(7));
    }
}
