// Copyright 2025 Cowboy AI, LLC.

use super::{update_cached, ProjectionContext, Projector};
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{SessionKind, SourceEvent};
use crate::read_models::TOTAL_PASSES_PATH;
use crate::update::DocumentUpdate;
use async_trait::async_trait;
use tracing::debug;

/// Counts passed exams in `profile.allTimeStats.totalPasses`
pub struct PassCounter {
    ctx: ProjectionContext,
}

impl PassCounter {
    /// Create the counter
    pub fn new(ctx: ProjectionContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Projector for PassCounter {
    fn name(&self) -> &'static str {
        "pass-counter"
    }

    fn handles(&self, event: &SourceEvent) -> bool {
        matches!(
            event.as_session().map(|s| s.kind()),
            Some(Ok(SessionKind::Exam { passed: true }))
        )
    }

    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()> {
        let session = event
            .as_session()
            .ok_or_else(|| ProjectionError::InvalidEvent("pass counter needs a session".into()))?;
        if session.kind()? != (SessionKind::Exam { passed: true }) {
            return Err(ProjectionError::InvalidEvent(format!(
                "session {} is not a passed exam",
                session.id
            )));
        }

        let collection = self.ctx.config.profile_collection();
        let update = DocumentUpdate::new().increment(TOTAL_PASSES_PATH, 1);
        update_cached(self.ctx.store.as_ref(), &collection, &session.instructor_id, &update).await?;

        debug!(instructor_id = %session.instructor_id, "Incremented totalPasses");
        Ok(())
    }
}
