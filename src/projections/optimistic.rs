// Copyright 2025 Cowboy AI, LLC.

//! Version-checked read-modify-write of a cached aggregate
//!
//! Array fields cannot be updated with a commutative primitive. The updater reads the
//! aggregate together with its version, computes the replacement, and writes with a
//! [`Precondition::Version`]. When another writer got there first the whole cycle
//! (guard, read, compute) runs again.

use super::guard::locate_cached;
use super::ProjectionContext;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::identifiers::InstructorId;
use crate::infrastructure::Precondition;
use crate::read_models::CachedAggregate;
use crate::update::DocumentUpdate;
use tracing::debug;

/// Apply `compute` to the current aggregate until the write lands.
///
/// `compute` returns `None` (or an empty update) when nothing needs writing. After
/// `max_conflict_retries` lost races the update fails with `ConflictRetriesExhausted`.
pub async fn read_modify_write<T, F>(
    ctx: &ProjectionContext,
    owner: &InstructorId,
    mut compute: F,
) -> ProjectionResult<()>
where
    T: CachedAggregate,
    F: FnMut(&T) -> ProjectionResult<Option<DocumentUpdate>> + Send,
{
    let collection = T::collection(&ctx.config);
    let max_attempts = ctx.config.max_conflict_retries.saturating_add(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let stored = locate_cached(ctx.store.as_ref(), &collection, owner).await?;
        let current = T::from_document(&stored)?;
        let Some(update) = compute(&current)?.filter(|update| !update.is_empty()) else {
            debug!(document_id = %stored.id, "Nothing to write");
            return Ok(());
        };

        match ctx
            .store
            .update(
                &collection,
                &stored.id,
                &update,
                Precondition::Version(stored.version),
            )
            .await
        {
            Ok(version) => {
                debug!(document_id = %stored.id, version, attempts, "Wrote cached document");
                return Ok(());
            }
            Err(e) if e.is_conflict() && attempts < max_attempts => {
                debug!(document_id = %stored.id, attempts, "Version conflict, retrying");
            }
            Err(e) if e.is_conflict() => {
                return Err(ProjectionError::ConflictRetriesExhausted {
                    document_id: stored.id.to_string(),
                    attempts,
                });
            }
            Err(e) => {
                return Err(ProjectionError::write_failure(
                    &collection,
                    stored.id.as_str(),
                    e,
                ))
            }
        }
    }
}
