//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are plain integers handed out by the persistence collaborator
//! (or by the in-session catalog, seeded from it). Zero means "not saved yet".

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of an animal.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(i64);

/// Identifier of a persisted enclosure row.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnclosureId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Placeholder carried before the first save.
            pub const UNSAVED: Self = Self(0);

            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            /// Whether the identifier was assigned by a store or catalog.
            pub const fn is_saved(self) -> bool {
                self.0 > 0
            }

            /// The identifier that follows this one.
            pub const fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
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
                let value = i64::from_str(s.trim())
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))?;
                if value < 0 {
                    return Err(DomainError::validation(format!("{}: must not be negative", $name)));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_int_newtype!(AnimalId, "AnimalId");
impl_int_newtype!(EnclosureId, "EnclosureId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsaved_is_zero_and_not_saved() {
        assert_eq!(AnimalId::UNSAVED.get(), 0);
        assert!(!AnimalId::UNSAVED.is_saved());
        assert!(AnimalId::new(1).is_saved());
        assert_eq!(AnimalId::default(), AnimalId::UNSAVED);
    }

    #[test]
    fn parses_and_rejects_negative() {
        assert_eq!(" 42".parse::<EnclosureId>().unwrap(), EnclosureId::new(42));
        assert!(matches!(
            "-3".parse::<EnclosureId>(),
            Err(DomainError::Validation(_))
        ));
        assert!("abc".parse::<AnimalId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&AnimalId::new(7)).unwrap();
        assert_eq!(json, "7");
        assert_eq!(AnimalId::new(7).next(), AnimalId::new(8));
    }
}
