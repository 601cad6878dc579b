// Copyright 2025 Cowboy AI, LLC.

//! Error types for cached read-model projections

use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::infrastructure::DocumentStore)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("Document not found: {collection}/{id}")]
    NotFound {
        /// Collection path
        collection: String,
        /// Document ID
        id: String,
    },

    /// A document with the same ID already exists
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists {
        /// Collection path
        collection: String,
        /// Document ID
        id: String,
    },

    /// Optimistic concurrency check failed
    #[error("Version conflict: expected version {expected}, but found {actual}")]
    VersionConflict {
        /// Version the writer read
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Write was refused (permissions, invalid path, type mismatch)
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// Backend could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if this is an optimistic concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while projecting a source event into a cached aggregate
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// No cached aggregate exists for the owning entity
    #[error("No cached aggregate in {collection} for owner {owner_id}")]
    MissingAggregate {
        /// Collection that was queried
        collection: String,
        /// Owning entity ID
        owner_id: String,
    },

    /// More than one cached aggregate exists for the owning entity
    #[error("{count} cached aggregates in {collection} for owner {owner_id}, expected exactly one")]
    DuplicateAggregate {
        /// Collection that was queried
        collection: String,
        /// Owning entity ID
        owner_id: String,
        /// Number of matching documents
        count: usize,
    },

    /// The underlying store rejected the write
    #[error("Write to {collection}/{document_id} failed: {source}")]
    WriteFailure {
        /// Collection path
        collection: String,
        /// Target document
        document_id: String,
        /// Store error
        #[source]
        source: StoreError,
    },

    /// The underlying store could not be read
    #[error("Read from {collection} failed: {source}")]
    ReadFailure {
        /// Collection path
        collection: String,
        /// Store error
        #[source]
        source: StoreError,
    },

    /// Optimistic read-modify-write kept losing to concurrent writers
    #[error("Gave up on {document_id} after {attempts} conflicting attempts")]
    ConflictRetriesExhausted {
        /// Target document
        document_id: String,
        /// Attempts made
        attempts: u32,
    },

    /// A stored document does not match the expected schema
    #[error("Invalid document {document_id}: {reason}")]
    InvalidDocument {
        /// Offending document
        document_id: String,
        /// What was wrong with it
        reason: String,
    },

    /// The source event cannot be projected
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;

impl From<serde_json::Error> for ProjectionError {
    fn from(err: serde_json::Error) -> Self {
        ProjectionError::Serialization(err.to_string())
    }
}

impl ProjectionError {
    /// Wrap a store error raised while writing a document
    pub fn write_failure(
        collection: impl Into<String>,
        document_id: impl Into<String>,
        source: StoreError,
    ) -> Self {
        ProjectionError::WriteFailure {
            collection: collection.into(),
            document_id: document_id.into(),
            source,
        }
    }

    /// Errors the projector boundary logs and converts into a `false` result.
    ///
    /// Anything else is unexpected and propagates to the event-delivery substrate.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            ProjectionError::MissingAggregate { .. }
                | ProjectionError::DuplicateAggregate { .. }
                | ProjectionError::WriteFailure { .. }
                | ProjectionError::ConflictRetriesExhausted { .. }
        )
    }

    /// Check if this is a consistency-guard failure
    pub fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            ProjectionError::MissingAggregate { .. } | ProjectionError::DuplicateAggregate { .. }
        )
    }

    /// Short stable label used in logs and stats
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::MissingAggregate { .. } => "missing_aggregate",
            ProjectionError::DuplicateAggregate { .. } => "duplicate_aggregate",
            ProjectionError::WriteFailure { .. } => "write_failure",
            ProjectionError::ReadFailure { .. } => "read_failure",
            ProjectionError::ConflictRetriesExhausted { .. } => "conflict_retries_exhausted",
            ProjectionError::InvalidDocument { .. } => "invalid_document",
            ProjectionError::InvalidEvent(_) => "invalid_event",
            ProjectionError::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_errors() {
        let missing = ProjectionError::MissingAggregate {
            collection: "profiles".into(),
            owner_id: "i-1".into(),
        };
        assert!(missing.is_reported());
        assert!(missing.is_consistency_error());

        let write = ProjectionError::write_failure(
            "profiles",
            "doc-1",
            StoreError::Unavailable("network down".into()),
        );
        assert!(write.is_reported());
        assert!(!write.is_consistency_error());

        let invalid = ProjectionError::InvalidDocument {
            document_id: "doc-1".into(),
            reason: "students is a string".into(),
        };
        assert!(!invalid.is_reported());
        assert_eq!(invalid.kind(), "invalid_document");
    }

    #[test]
    fn test_error_display() {
        let err = ProjectionError::DuplicateAggregate {
            collection: "students".into(),
            owner_id: "i-7".into(),
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 cached aggregates"));
        assert!(msg.contains("i-7"));

        let conflict = StoreError::VersionConflict {
            expected: 3,
            actual: 4,
        };
        assert!(conflict.is_conflict());
        assert!(conflict.to_string().contains("expected version 3"));
    }

    #[test]
    fn test_from_serde_error() {
        let err: ProjectionError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ProjectionError::Serialization(_)));
        assert!(!err.is_reported());
    }
}
