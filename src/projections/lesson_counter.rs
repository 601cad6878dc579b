// Copyright 2025 Cowboy AI, LLC.

use super::{update_cached, ProjectionContext, Projector};
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::SourceEvent;
use crate::read_models::TOTAL_LESSONS_PATH;
use crate::update::DocumentUpdate;
use async_trait::async_trait;
use tracing::debug;

/// Counts every driving session in `profile.allTimeStats.totalLessons`
///
/// Uses the store's atomic increment, so concurrent sessions never lose a count.
pub struct LessonCounter {
    ctx: ProjectionContext,
}

impl LessonCounter {
    /// Create the counter
    pub fn new(ctx: ProjectionContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Projector for LessonCounter {
    fn name(&self) -> &'static str {
        "lesson-counter"
    }

    fn handles(&self, event: &SourceEvent) -> bool {
        event.as_session().is_some()
    }

    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()> {
        let session = event
            .as_session()
            .ok_or_else(|| ProjectionError::InvalidEvent("lesson counter needs a session".into()))?;

        let collection = self.ctx.config.profile_collection();
        let update = DocumentUpdate::new().increment(TOTAL_LESSONS_PATH, 1);
        let version =
            update_cached(self.ctx.store.as_ref(), &collection, &session.instructor_id, &update)
                .await?;

        debug!(instructor_id = %session.instructor_id, version, "Incremented totalLessons");
        Ok(())
    }
}
