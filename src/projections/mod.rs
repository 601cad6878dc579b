// Copyright 2025 Cowboy AI, LLC.

//! Projectors for the cached instructor read models
//!
//! Each projector applies the effect of one source event to one cached aggregate.
//! Projectors for the same event run independently and may race on the same
//! document: counters and history use commutative store operations, the array
//! rewrites go through [`optimistic::read_modify_write`].
//!
//! Every projector is run through [`project_and_report`], which turns the expected
//! failure modes into a logged `false` and lets anything else propagate.

mod guard;
mod history;
mod initializer;
mod lesson_counter;
pub mod optimistic;
mod pass_counter;
mod student_summary;
mod usage_window;

pub use guard::{cached_filter, locate_cached, update_cached};
pub use history::HistoryAppender;
pub use initializer::CacheInitializer;
pub use lesson_counter::LessonCounter;
pub use pass_counter::PassCounter;
pub use student_summary::StudentSummaryUpdater;
pub use usage_window::UsageWindowUpdater;

use crate::clock::{Clock, SystemClock};
use crate::config::ProjectionConfig;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{DomainEvent, SourceEvent};
use crate::infrastructure::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Trait for all projectors
#[async_trait]
pub trait Projector: Send + Sync {
    /// Stable name used in logs and stats
    fn name(&self) -> &'static str;

    /// Whether this projector reacts to the event
    fn handles(&self, event: &SourceEvent) -> bool;

    /// Apply the event to the cached aggregate
    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()>;
}

/// Dependencies shared by all projectors
#[derive(Clone)]
pub struct ProjectionContext {
    /// Cached aggregate storage
    pub store: Arc<dyn DocumentStore>,
    /// Engine configuration
    pub config: Arc<ProjectionConfig>,
    /// Processing-time source
    pub clock: Arc<dyn Clock>,
}

impl ProjectionContext {
    /// Context using the system clock
    pub fn new(store: Arc<dyn DocumentStore>, config: ProjectionConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Run a projector and convert its outcome into a success flag.
///
/// * `Ok(true)` - the projection was applied
/// * `Ok(false)` - a reported failure (missing or duplicate aggregate, write failure,
///   exhausted conflict retries) was logged and the event dropped for this projector
/// * `Err(_)` - unexpected failure for the delivery substrate to retry
pub async fn project_and_report(
    projector: &dyn Projector,
    event: &SourceEvent,
) -> ProjectionResult<bool> {
    let span = info_span!(
        "projector",
        projector = projector.name(),
        event_id = %event.event_id()
    );

    async {
        info!(
            instructor_id = %event.owner_id(),
            event_type = event.event_type(),
            "Projection started"
        );
        match projector.project(event).await {
            Ok(()) => {
                info!(instructor_id = %event.owner_id(), "Projection completed");
                Ok(true)
            }
            Err(err) if err.is_reported() => {
                warn!(kind = err.kind(), "ERROR: {err}");
                if let Some(hint) = hint(&err) {
                    warn!("HINT: {hint}");
                }
                Ok(false)
            }
            Err(err) => {
                error!(kind = err.kind(), error = %err, "Projection failed unexpectedly");
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

fn hint(err: &ProjectionError) -> Option<String> {
    match err {
        ProjectionError::MissingAggregate { owner_id, .. } => Some(format!(
            "The cached document should have been created when instructor {owner_id} was registered"
        )),
        ProjectionError::DuplicateAggregate { owner_id, .. } => Some(format!(
            "Data inconsistency - only one cached document with instructorId={owner_id} should exist"
        )),
        ProjectionError::ConflictRetriesExhausted { .. } => Some(
            "Raise max_conflict_retries or reduce concurrent writers to this aggregate".to_string(),
        ),
        _ => None,
    }
}
