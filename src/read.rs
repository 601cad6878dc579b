// Copyright 2025 Cowboy AI, LLC.

//! Read side of the cached instructor details
//!
//! Consumers see a missing aggregate as "no data yet". Duplicates and store failures
//! are still errors.

use crate::config::ProjectionConfig;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::identifiers::{InstructorId, StudentId};
use crate::infrastructure::DocumentStore;
use crate::projections::locate_cached;
use crate::read_models::{CachedAggregate, InstructorProfileDoc, InstructorStudentsDoc, UsageEntry};
use std::sync::Arc;
use tracing::debug;

/// Typed access to the cached instructor aggregates
#[derive(Clone)]
pub struct CachedDetailsReader {
    store: Arc<dyn DocumentStore>,
    config: Arc<ProjectionConfig>,
}

impl CachedDetailsReader {
    /// Create a reader over `store`
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<ProjectionConfig>) -> Self {
        Self { store, config }
    }

    /// Student details of an instructor, `None` if not initialized
    pub async fn students_details(
        &self,
        instructor: &InstructorId,
    ) -> ProjectionResult<Option<InstructorStudentsDoc>> {
        self.load(instructor).await
    }

    /// Profile of an instructor, `None` if not initialized
    pub async fn profile_details(
        &self,
        instructor: &InstructorId,
    ) -> ProjectionResult<Option<InstructorProfileDoc>> {
        self.load(instructor).await
    }

    /// Usage buckets of one student within the rolling window, oldest month first
    pub async fn usage_for(
        &self,
        instructor: &InstructorId,
        student: &StudentId,
    ) -> ProjectionResult<Vec<UsageEntry>> {
        let Some(doc) = self.students_details(instructor).await? else {
            return Ok(Vec::new());
        };
        let mut usage: Vec<UsageEntry> = doc
            .usage()
            .iter()
            .filter(|entry| &entry.student_id == student)
            .cloned()
            .collect();
        usage.sort_by_key(|entry| entry.month);
        Ok(usage)
    }

    /// One line per history entry, in insertion order
    ///
    /// Lines read `2025-03-10 s-1 (v-1): lesson 3, grade 4`.
    pub async fn history_lines(&self, instructor: &InstructorId) -> ProjectionResult<Vec<String>> {
        let Some(doc) = self.students_details(instructor).await? else {
            return Ok(Vec::new());
        };
        Ok(doc
            .history()
            .iter()
            .map(|entry| {
                format!(
                    "{} {} ({}): {}",
                    entry.timestamp.format("%Y-%m-%d"),
                    entry.student_id,
                    entry.vehicle_id,
                    entry.brief_summary.describe()
                )
            })
            .collect())
    }

    async fn load<T: CachedAggregate>(&self, instructor: &InstructorId) -> ProjectionResult<Option<T>> {
        let collection = T::collection(&self.config);
        match locate_cached(self.store.as_ref(), &collection, instructor).await {
            Ok(stored) => T::from_document(&stored).map(Some),
            Err(ProjectionError::MissingAggregate { .. }) => {
                debug!(instructor_id = %instructor, model = T::model_type(), "No cached document yet");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
