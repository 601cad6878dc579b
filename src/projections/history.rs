// Copyright 2025 Cowboy AI, LLC.

use super::{update_cached, ProjectionContext, Projector};
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::SourceEvent;
use crate::read_models::{StudentHistoryEntry, STUDENT_HISTORY_PATH};
use crate::update::DocumentUpdate;
use async_trait::async_trait;
use tracing::debug;

/// Appends a brief summary of every session to `studentHistorySummary`
///
/// The append is an array union: redelivering the same session adds nothing,
/// and entries are never rewritten.
pub struct HistoryAppender {
    ctx: ProjectionContext,
}

impl HistoryAppender {
    /// Create the appender
    pub fn new(ctx: ProjectionContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Projector for HistoryAppender {
    fn name(&self) -> &'static str {
        "history-append"
    }

    fn handles(&self, event: &SourceEvent) -> bool {
        event.as_session().is_some()
    }

    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()> {
        let session = event
            .as_session()
            .ok_or_else(|| ProjectionError::InvalidEvent("history needs a session".into()))?;

        let entry = StudentHistoryEntry::from_session(session)?;
        debug!(
            student_id = %entry.student_id,
            summary = %entry.brief_summary.describe(),
            "Appending history entry"
        );

        let collection = self.ctx.config.students_collection();
        let update = DocumentUpdate::new()
            .array_union(STUDENT_HISTORY_PATH, vec![serde_json::to_value(&entry)?]);
        update_cached(self.ctx.store.as_ref(), &collection, &session.instructor_id, &update).await?;
        Ok(())
    }
}
