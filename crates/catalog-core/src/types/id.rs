//! Newtype wrappers around `i64` for catalog identifiers.
//!
//! Using distinct types prevents accidentally passing a `PrincipalId` where
//! an `EntityId` is expected. When the `sqlx` feature is enabled, each ID
//! type also implements `sqlx::Type`, `sqlx::Encode`, and `sqlx::Decode`
//! for PostgreSQL `BIGINT` columns.
//!
//! Identifiers are ordered numerically; the concurrency controller relies on
//! that order to acquire row locks deterministically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix used when rendering entity identifiers for humans (`syn123`).
pub const ENTITY_ID_PREFIX: &str = "syn";

/// Macro to define a newtype ID wrapper around `i64`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Create an identifier from a raw value.
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Return the raw value.
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }

        #[cfg(feature = "sqlx")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <i64 as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }

        #[cfg(feature = "sqlx")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                <i64 as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Unique, system-generated identifier of a catalog entity.
    EntityId
);

define_id!(
    /// Identifier of a user or group principal named in an ACL.
    PrincipalId
);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ENTITY_ID_PREFIX}{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::num::ParseIntError;

    /// Accepts both the bare number and the `syn`-prefixed form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix(ENTITY_ID_PREFIX)
            .or_else(|| trimmed.strip_prefix("SYN"))
            .unwrap_or(trimmed);
        digits.parse::<i64>().map(Self)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display_is_prefixed() {
        assert_eq!(EntityId::new(123).to_string(), "syn123");
    }

    #[test]
    fn test_entity_id_parses_both_forms() {
        assert_eq!("syn42".parse::<EntityId>().expect("prefixed"), EntityId(42));
        assert_eq!("42".parse::<EntityId>().expect("bare"), EntityId(42));
        assert!("synabc".parse::<EntityId>().is_err());
    }

    #[test]
    fn test_ids_order_numerically() {
        let mut ids = vec![EntityId(8), EntityId(2), EntityId(5)];
        ids.sort();
        assert_eq!(ids, vec![EntityId(2), EntityId(5), EntityId(8)]);
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&PrincipalId(9)).expect("serialize");
        assert_eq!(json, "9");
        let parsed: PrincipalId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, PrincipalId(9));
    }
}
