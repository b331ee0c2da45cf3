//! Strongly-typed identifiers used across the domain.
//!
//! Rows are keyed by positive integers assigned by the persistence layer, so
//! every identifier is an `i64` newtype. Parsing and deserializing both reject
//! zero and negative values.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct OrderId(i64);

/// Identifier of a prosthetics lab.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct LabId(i64);

/// Identifier of the dentist who placed an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DentistId(i64);

/// Identifier of a subcontract history record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct HistoryId(i64);

macro_rules! impl_numeric_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl TryFrom<i64> for $t {
            type Error = DomainError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                if value <= 0 {
                    return Err(DomainError::invalid_argument(format!(
                        "{}: must be positive",
                        $name
                    )));
                }
                Ok(Self(value))
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_argument(format!("{}: {}", $name, e)))?;
                Self::try_from(value)
            }
        }
    };
}

impl_numeric_newtype!(OrderId, "OrderId");
impl_numeric_newtype!(LabId, "LabId");
impl_numeric_newtype!(DentistId, "DentistId");
impl_numeric_newtype!(HistoryId, "HistoryId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        assert_eq!("42".parse::<OrderId>().unwrap(), OrderId::new(42));
        assert_eq!(" 7 ".parse::<LabId>().unwrap().value(), 7);
    }

    #[test]
    fn rejects_garbage_and_non_positive_ids() {
        assert!(matches!(
            "abc".parse::<OrderId>(),
            Err(DomainError::InvalidArgument(_))
        ));
        assert!(matches!(
            "0".parse::<LabId>(),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&LabId::new(3)).unwrap();
        assert_eq!(json, "3");
        assert_eq!(serde_json::from_str::<LabId>("3").unwrap(), LabId::new(3));
    }

    #[test]
    fn deserializing_rejects_non_positive_ids() {
        for raw in ["0", "-4"] {
            let err = serde_json::from_str::<DentistId>(raw).unwrap_err();
            assert!(err.to_string().contains("must be positive"), "{raw}: {err}");
        }
        assert!(serde_json::from_str::<OrderId>("0").is_err());
    }
}
