// Copyright 2025 Cowboy AI, LLC.

//! Exactly-one lookup of a cached aggregate

use crate::errors::{ProjectionError, ProjectionResult};
use crate::identifiers::InstructorId;
use crate::infrastructure::{DocumentFilter, DocumentStore, Precondition, StoredDocument};
use crate::markers::{DocType, DocVersion, DOC_TYPE, DOC_VERSION, INSTRUCTOR_ID};
use crate::update::DocumentUpdate;
use serde_json::Value;
use tracing::debug;

/// Filter selecting the `v1` cached aggregates of an instructor
pub fn cached_filter(owner: &InstructorId) -> DocumentFilter {
    DocumentFilter::new()
        .eq(INSTRUCTOR_ID, owner.as_str())
        .eq(DOC_VERSION, DocVersion::V1.as_str())
        .is_in(DOC_TYPE, vec![Value::from(DocType::Cached.as_str())])
}

/// Find the single cached aggregate of `owner` in `collection`.
///
/// Runs a fresh query on every call. Zero matches is `MissingAggregate`, more than one
/// is `DuplicateAggregate`; neither writes anything.
pub async fn locate_cached(
    store: &dyn DocumentStore,
    collection: &str,
    owner: &InstructorId,
) -> ProjectionResult<StoredDocument> {
    debug!(collection, instructor_id = %owner, "Looking up cached document");
    let mut matches = store
        .query(collection, &cached_filter(owner))
        .await
        .map_err(|source| ProjectionError::ReadFailure {
            collection: collection.to_string(),
            source,
        })?;

    match matches.len() {
        0 => Err(ProjectionError::MissingAggregate {
            collection: collection.to_string(),
            owner_id: owner.to_string(),
        }),
        1 => {
            let found = matches.remove(0);
            debug!(collection, document_id = %found.id, version = found.version, "Found cached document");
            Ok(found)
        }
        count => Err(ProjectionError::DuplicateAggregate {
            collection: collection.to_string(),
            owner_id: owner.to_string(),
            count,
        }),
    }
}

/// Guard, then apply a commutative update to the cached aggregate
pub async fn update_cached(
    store: &dyn DocumentStore,
    collection: &str,
    owner: &InstructorId,
    update: &DocumentUpdate,
) -> ProjectionResult<u64> {
    let target = locate_cached(store, collection, owner).await?;
    store
        .update(collection, &target.id, update, Precondition::Exists)
        .await
        .map_err(|e| ProjectionError::write_failure(collection, target.id.as_str(), e))
}
