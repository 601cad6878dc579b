// Copyright 2025 Cowboy AI, LLC.

//! Rolling per-student monthly usage
//!
//! Sessions are bucketed by the UTC month of their start. The window is anchored at
//! processing time: after every write, entries older than
//! `now - usage_window_months` are gone.

use super::optimistic::read_modify_write;
use super::{ProjectionContext, Projector};
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{DrivingSession, SourceEvent};
use crate::month::DocMonth;
use crate::read_models::{InstructorStudentsDoc, UsageEntry, USAGE_PATH};
use crate::update::DocumentUpdate;
use async_trait::async_trait;
use tracing::debug;

/// Maintains `students.last6MonthsStats.usage`
pub struct UsageWindowUpdater {
    ctx: ProjectionContext,
}

impl UsageWindowUpdater {
    /// Create the updater
    pub fn new(ctx: ProjectionContext) -> Self {
        Self { ctx }
    }
}

/// Count the session in its `(student, month)` bucket, then drop buckets before `cutoff`
pub(crate) fn roll_usage(
    current: &[UsageEntry],
    session: &DrivingSession,
    cutoff: DocMonth,
) -> ProjectionResult<Vec<UsageEntry>> {
    let month = DocMonth::of(session.lesson_timestamp_start).map_err(|e| {
        ProjectionError::InvalidEvent(format!("session {} has no usage month: {e}", session.id))
    })?;
    let mut usage = current.to_vec();

    match usage
        .iter_mut()
        .find(|entry| entry.student_id == session.client_id && entry.month == month)
    {
        Some(entry) => entry.total_lessons += 1,
        None => usage.push(UsageEntry {
            student_id: session.client_id.clone(),
            month,
            total_lessons: 1,
        }),
    }

    let before = usage.len();
    usage.retain(|entry| entry.month >= cutoff);
    debug!(
        %month,
        %cutoff,
        kept = usage.len(),
        pruned = before - usage.len(),
        "Rolled usage window"
    );
    Ok(usage)
}

#[async_trait]
impl Projector for UsageWindowUpdater {
    fn name(&self) -> &'static str {
        "usage-window"
    }

    fn handles(&self, event: &SourceEvent) -> bool {
        event.as_session().is_some()
    }

    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()> {
        let session = event
            .as_session()
            .ok_or_else(|| ProjectionError::InvalidEvent("usage window needs a session".into()))?;

        read_modify_write::<InstructorStudentsDoc, _>(&self.ctx, &session.instructor_id, |doc| {
            let now = self.ctx.clock.now();
            let cutoff = DocMonth::of(now)
                .map_err(|e| ProjectionError::InvalidEvent(format!("clock at {now}: {e}")))?
                .months_back(self.ctx.config.usage_window_months);
            let usage = roll_usage(doc.usage(), session, cutoff)?;
            Ok(Some(DocumentUpdate::new().set_serialized(USAGE_PATH, &usage)?))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LessonGrade;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    fn session_in(student: &str, year: i32, month: u32) -> DrivingSession {
        let start = Utc.with_ymd_and_hms(year, month, 10, 9, 0, 0).unwrap();
        DrivingSession::lesson("i-1", student, "v-1", 1, LessonGrade::Four, start)
    }

    fn month(year: i32, month: u32) -> DocMonth {
        DocMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_find_or_create_bucket() {
        let cutoff = month(2024, 1);
        let usage = roll_usage(&[], &session_in("s-1", 2024, 5), cutoff).unwrap();
        let usage = roll_usage(&usage, &session_in("s-1", 2024, 5), cutoff).unwrap();
        let usage = roll_usage(&usage, &session_in("s-1", 2024, 6), cutoff).unwrap();
        let usage = roll_usage(&usage, &session_in("s-2", 2024, 6), cutoff).unwrap();

        assert_eq!(usage.len(), 3);
        assert_eq!(usage[0].total_lessons, 2);
        assert_eq!(usage[0].month, month(2024, 5));
    }

    #[test_case(2025, 1, 2024, 7, true ; "cutoff across year boundary is kept")]
    #[test_case(2025, 1, 2024, 6, false ; "one month before cutoff is pruned")]
    #[test_case(2025, 3, 2024, 12, true ; "december kept in march window")]
    #[test_case(2024, 6, 2023, 12, true ; "exact cutoff month is kept")]
    #[test_case(2024, 6, 2023, 11, false ; "older than window is pruned")]
    fn test_window_year_rollover(now_y: i32, now_m: u32, old_y: i32, old_m: u32, kept: bool) {
        let cutoff = month(now_y, now_m).months_back(6);
        let existing = vec![UsageEntry {
            student_id: "s-9".into(),
            month: month(old_y, old_m),
            total_lessons: 4,
        }];

        let usage = roll_usage(&existing, &session_in("s-1", now_y, now_m), cutoff).unwrap();

        let still_there = usage.iter().any(|entry| entry.student_id.as_str() == "s-9");
        assert_eq!(still_there, kept);
        assert!(usage.iter().all(|entry| entry.month >= cutoff));
    }

    #[test]
    fn test_session_beyond_four_digit_years_is_invalid() {
        let start = Utc.with_ymd_and_hms(10000, 1, 3, 9, 0, 0).unwrap();
        let session = DrivingSession::lesson("i-1", "s-1", "v-1", 1, LessonGrade::Four, start);

        let err = roll_usage(&[], &session, month(2025, 1)).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidEvent(_)));
    }
}
