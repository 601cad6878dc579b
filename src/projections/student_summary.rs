// Copyright 2025 Cowboy AI, LLC.

use super::optimistic::read_modify_write;
use super::{ProjectionContext, Projector};
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{DrivingSession, SourceEvent};
use crate::read_models::{
    InstructorStudentsDoc, StudentStatus, StudentSummaryEntry, STUDENT_SUMMARY_PATH,
};
use crate::update::DocumentUpdate;
use async_trait::async_trait;
use tracing::debug;

/// Keeps one `studentSummary` entry per student with a running lesson count
pub struct StudentSummaryUpdater {
    ctx: ProjectionContext,
}

impl StudentSummaryUpdater {
    /// Create the updater
    pub fn new(ctx: ProjectionContext) -> Self {
        Self { ctx }
    }
}

/// Find-or-append the session's student and bump its count
pub(crate) fn summarize(
    current: &[StudentSummaryEntry],
    session: &DrivingSession,
) -> Vec<StudentSummaryEntry> {
    let mut summary = current.to_vec();
    match summary
        .iter_mut()
        .find(|entry| entry.student_id == session.client_id)
    {
        Some(entry) => {
            entry.current_lessons_count += 1;
            debug!(
                student_id = %session.client_id,
                count = entry.current_lessons_count,
                "Incremented student lesson count"
            );
        }
        None => {
            summary.push(StudentSummaryEntry {
                student_id: session.client_id.clone(),
                student_status: StudentStatus::Assigned,
                current_lessons_count: 1,
            });
            debug!(student_id = %session.client_id, "Added student to summary");
        }
    }
    summary
}

#[async_trait]
impl Projector for StudentSummaryUpdater {
    fn name(&self) -> &'static str {
        "student-summary"
    }

    fn handles(&self, event: &SourceEvent) -> bool {
        event.as_session().is_some()
    }

    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()> {
        let session = event.as_session().ok_or_else(|| {
            ProjectionError::InvalidEvent("student summary needs a session".into())
        })?;

        read_modify_write::<InstructorStudentsDoc, _>(&self.ctx, &session.instructor_id, |doc| {
            let summary = summarize(doc.student_summary(), session);
            Ok(Some(
                DocumentUpdate::new().set_serialized(STUDENT_SUMMARY_PATH, &summary)?,
            ))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LessonGrade;
    use chrono::Utc;

    #[test]
    fn test_find_or_append() {
        let now = Utc::now();
        let first = DrivingSession::lesson("i-1", "s-1", "v-1", 1, LessonGrade::Three, now);
        let other = DrivingSession::lesson("i-1", "s-2", "v-1", 1, LessonGrade::Three, now);

        let summary = summarize(&[], &first);
        let summary = summarize(&summary, &first);
        let summary = summarize(&summary, &other);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].student_id.as_str(), "s-1");
        assert_eq!(summary[0].current_lessons_count, 2);
        assert_eq!(summary[0].student_status, StudentStatus::Assigned);
        assert_eq!(summary[1].current_lessons_count, 1);
    }
}
