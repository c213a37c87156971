//! Strongly-typed ID wrappers for all entity types
//!
//! Using newtype wrappers prevents accidentally mixing up IDs from different
//! entity types at compile time. IDs are storage-local: backups strip them
//! and restore assigns fresh ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Prefix used in the short display form
            pub const fn prefix() -> &'static str {
                $display_prefix
            }

            /// Check whether `s` is the full or short form of this ID
            pub fn matches(&self, s: &str) -> bool {
                let s = s.trim();
                if let Ok(uuid) = Uuid::parse_str(s) {
                    return uuid == self.0;
                }
                let short = s.strip_prefix($display_prefix).unwrap_or(s);
                short.len() >= 8 && self.0.simple().to_string().starts_with(short)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.simple().to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(TransactionId, "txn-");
define_id!(CategoryId, "cat-");
define_id!(SubscriptionId, "sub-");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        let id = TransactionId::new();
        let display = id.to_string();
        assert!(display.starts_with("txn-"));
        assert_eq!(display.len(), 12);
    }

    #[test]
    fn test_short_form_matches() {
        let id = SubscriptionId::new();
        assert!(id.matches(&id.to_string()));
        assert!(id.matches(&id.as_uuid().to_string()));
        assert!(!id.matches("sub-123"));
        assert!(!SubscriptionId::new().matches(&id.to_string()));
    }

    #[test]
    fn test_parse_full_uuid() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id: CategoryId = uuid_str.parse().unwrap();
        assert_eq!(id.as_uuid().to_string(), uuid_str);
        let prefixed: CategoryId = format!("cat-{}", uuid_str).parse().unwrap();
        assert_eq!(id, prefixed);
    }

    #[test]
    fn test_id_serialization() {
        let id = TransactionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
