//! Type-safe identifier wrappers.
//!
//! Records that callers name themselves (incidents, entities) use string
//! keys. Records the engine mints itself (annotations, snapshots) use UUID v7
//! so they sort by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

/// Generates a newtype wrapper around a caller-supplied [`String`] key.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a key.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the key is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }

        impl core::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key! {
    /// Unique identifier of an incident, chosen by whoever records it.
    IncidentId
}

define_key! {
    /// Identifier of an entity that participates in incidents.
    EntityId
}

define_id! {
    /// Unique identifier for an annotation link in the meaning overlay.
    AnnotationId
}

define_id! {
    /// Unique identifier for a generated snapshot.
    SnapshotId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_serializes_as_plain_string() {
        let id = IncidentId::new("incident_001");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"incident_001\""));
    }

    #[test]
    fn blank_keys_are_detected() {
        assert!(EntityId::new("  ").is_blank());
        assert!(!EntityId::new("a").is_blank());
    }

    #[test]
    fn minted_ids_are_unique() {
        assert_ne!(SnapshotId::new(), SnapshotId::new());
        assert_ne!(AnnotationId::new().into_inner(), Uuid::nil());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = SnapshotId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
