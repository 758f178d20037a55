//! Type-safe identifier wrappers for Changes API resources.
//!
//! Every resource the API serves has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. Builds, jobs, test
//! groups, and log sources are identified by UUIDs minted server-side;
//! commits are identified by their revision SHA and projects by a
//! human-readable slug.
//!
//! Synchronization equality is strict typed equality on these wrappers.
//! Any string/number coercion the wire format needs happens once, in
//! serde deserialization, never at comparison time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v4 (random).
            ///
            /// Real IDs are minted by the API server; this constructor
            /// exists for tests and fixtures.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
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

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Return the wrapped string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_id! {
    /// Unique identifier for a build.
    BuildId
}

define_id! {
    /// Unique identifier for a job within a build.
    JobId
}

define_id! {
    /// Unique identifier for a test group within a job.
    TestGroupId
}

define_id! {
    /// Unique identifier for a log source (one log artifact of a job).
    LogSourceId
}

define_string_id! {
    /// A commit identified by its full revision SHA.
    RevisionSha
}

define_string_id! {
    /// A project identified by its URL slug (e.g. `server-tools`).
    ProjectSlug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let build = BuildId::new();
        let job = JobId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(build.into_inner(), Uuid::nil());
        assert_ne!(job.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = BuildId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<BuildId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let slug = ProjectSlug::from("server-tools");
        let json = serde_json::to_string(&slug).unwrap_or_default();
        assert_eq!(json, "\"server-tools\"");
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = BuildId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
