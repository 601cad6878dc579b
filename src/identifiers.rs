// Copyright 2025 Cowboy AI, LLC.

//! Identifier types for instructors, students, vehicles and documents
//!
//! Identifiers are issued by the surrounding application (auth provider, document
//! store) and arrive as opaque strings. The newtypes keep them from being mixed up.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Instructor ID - the owning entity of every cached aggregate
    InstructorId
);

string_id!(
    /// Student (client) ID
    StudentId
);

string_id!(
    /// Vehicle ID
    VehicleId
);

string_id!(
    /// Document ID within a collection
    DocumentId
);

impl DocumentId {
    /// Allocate a fresh random document ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Derive a stable document ID from a collection path and an owner key
    pub fn derived(collection: &str, owner: &str) -> Self {
        let name = format!("{collection}/{owner}");
        Self(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, name.as_bytes()).to_string())
    }
}
