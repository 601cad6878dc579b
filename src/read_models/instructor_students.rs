// Copyright 2025 Cowboy AI, LLC.

//! Cached per-instructor student details: summaries, lesson history and usage window

use super::{CachedAggregate, FieldState};
use crate::config::ProjectionConfig;
use crate::errors::ProjectionResult;
use crate::events::{DrivingSession, LessonGrade, SessionKind};
use crate::identifiers::{DocumentId, InstructorId, StudentId, VehicleId};
use crate::markers::{DocType, DocVersion};
use crate::month::DocMonth;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Dot path of the rolling usage array
pub const USAGE_PATH: &str = "students.last6MonthsStats.usage";
/// Dot path of the per-student summary array
pub const STUDENT_SUMMARY_PATH: &str = "students.studentSummary";
/// Dot path of the append-only history array
pub const STUDENT_HISTORY_PATH: &str = "students.studentHistorySummary";

/// Cached aggregate `instructor-details-students`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorStudentsDoc {
    /// Document ID, when the writer recorded it
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Always [`DocType::Cached`]
    #[serde(rename = "_docType")]
    pub doc_type: DocType,
    /// Schema version
    #[serde(rename = "_docVersion")]
    pub doc_version: DocVersion,
    /// Owning instructor
    pub instructor_id: InstructorId,
    /// Student field groups
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub students: FieldState<StudentsGroup>,
}

/// The `students` field group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentsGroup {
    /// Rolling usage window
    #[serde(
        rename = "last6MonthsStats",
        default,
        skip_serializing_if = "FieldState::is_absent"
    )]
    pub last_6_months_stats: FieldState<Last6MonthsStats>,
    /// One entry per student
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub student_summary: FieldState<Vec<StudentSummaryEntry>>,
    /// Append-only lesson and exam history
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub student_history_summary: FieldState<Vec<StudentHistoryEntry>>,
}

/// The `last6MonthsStats` field group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Last6MonthsStats {
    /// Lessons per `(student, month)`
    #[serde(default)]
    pub usage: Vec<UsageEntry>,
}

/// Lessons a student took in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    /// Student
    pub student_id: StudentId,
    /// Calendar month
    pub month: DocMonth,
    /// Lessons in that month
    pub total_lessons: u64,
}

/// Assignment status of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    /// Student currently trains with this instructor
    Assigned,
    /// Student was moved away
    Revoked,
}

/// Running lesson count of one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummaryEntry {
    /// Student
    pub student_id: StudentId,
    /// Assignment status
    pub student_status: StudentStatus,
    /// Lessons taken with this instructor
    pub current_lessons_count: u64,
}

/// Discriminator of a brief summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    /// Regular lesson
    Lesson,
    /// Driving exam
    Exam,
}

/// Lesson details kept in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonBrief {
    /// Instructor's grade
    pub grade: LessonGrade,
    /// Ordinal of the lesson
    pub lesson_number: u32,
}

/// Exam details kept in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamBrief {
    /// Outcome
    pub passed: bool,
    /// Attempt number
    pub try_number: u32,
}

/// Enough data to render a one-line description of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BriefSummary {
    /// Which of `lesson` / `exam` is set
    pub summary_type: SummaryType,
    /// Lesson details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<LessonBrief>,
    /// Exam details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam: Option<ExamBrief>,
}

impl BriefSummary {
    /// Summary of a lesson
    pub fn lesson(grade: LessonGrade, lesson_number: u32) -> Self {
        Self {
            summary_type: SummaryType::Lesson,
            lesson: Some(LessonBrief {
                grade,
                lesson_number,
            }),
            exam: None,
        }
    }

    /// Summary of an exam attempt
    pub fn exam(passed: bool, try_number: u32) -> Self {
        Self {
            summary_type: SummaryType::Exam,
            lesson: None,
            exam: Some(ExamBrief { passed, try_number }),
        }
    }

    /// Summary of a driving session, discriminated on its document type
    pub fn for_session(session: &DrivingSession) -> ProjectionResult<Self> {
        Ok(match session.kind()? {
            SessionKind::Lesson => Self::lesson(session.lesson_grade, session.lesson_number),
            SessionKind::Exam { passed } => Self::exam(passed, session.lesson_number),
        })
    }

    /// One-line description, e.g. `lesson 3, grade 4` or `exam try 2, passed`
    pub fn describe(&self) -> String {
        match (self.summary_type, &self.lesson, &self.exam) {
            (SummaryType::Lesson, Some(lesson), _) => {
                format!("lesson {}, grade {}", lesson.lesson_number, lesson.grade)
            }
            (SummaryType::Exam, _, Some(exam)) => format!(
                "exam try {}, {}",
                exam.try_number,
                if exam.passed { "passed" } else { "failed" }
            ),
            (SummaryType::Lesson, None, _) => "lesson".to_string(),
            (SummaryType::Exam, _, None) => "exam".to_string(),
        }
    }
}

/// One history line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistoryEntry {
    /// Student
    pub student_id: StudentId,
    /// Vehicle used
    pub vehicle_id: VehicleId,
    /// Session start
    pub timestamp: DateTime<Utc>,
    /// Source driving session
    pub source_document_id: DocumentId,
    /// What happened
    pub brief_summary: BriefSummary,
}

impl StudentHistoryEntry {
    /// History line for a driving session
    pub fn from_session(session: &DrivingSession) -> ProjectionResult<Self> {
        Ok(Self {
            student_id: session.client_id.clone(),
            vehicle_id: session.vehicle_id.clone(),
            timestamp: session.lesson_timestamp_start,
            source_document_id: session.id.clone(),
            brief_summary: BriefSummary::for_session(session)?,
        })
    }
}

impl InstructorStudentsDoc {
    /// Usage entries, empty when the group is not populated
    pub fn usage(&self) -> &[UsageEntry] {
        self.students
            .as_ref()
            .and_then(|s| s.last_6_months_stats.as_ref())
            .map(|stats| stats.usage.as_slice())
            .unwrap_or_default()
    }

    /// Student summaries, empty when the group is not populated
    pub fn student_summary(&self) -> &[StudentSummaryEntry] {
        self.students
            .as_ref()
            .and_then(|s| s.student_summary.as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// History lines in insertion order, empty when the group is not populated
    pub fn history(&self) -> &[StudentHistoryEntry] {
        self.students
            .as_ref()
            .and_then(|s| s.student_history_summary.as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Summary entry of one student
    pub fn summary_for(&self, student_id: &StudentId) -> Option<&StudentSummaryEntry> {
        self.student_summary()
            .iter()
            .find(|entry| &entry.student_id == student_id)
    }
}

impl CachedAggregate for InstructorStudentsDoc {
    const INITIALIZER: &'static str = "instructor-students-initializer";

    fn model_type() -> &'static str {
        "InstructorStudents"
    }

    fn collection(config: &ProjectionConfig) -> String {
        config.students_collection()
    }

    fn empty(instructor_id: InstructorId) -> Self {
        Self {
            id: None,
            doc_type: DocType::Cached,
            doc_version: DocVersion::V1,
            instructor_id,
            students: FieldState::Populated(StudentsGroup {
                last_6_months_stats: FieldState::Populated(Last6MonthsStats::default()),
                student_summary: FieldState::Populated(Vec::new()),
                student_history_summary: FieldState::Populated(Vec::new()),
            }),
        }
    }

    fn instructor_id(&self) -> &InstructorId {
        &self.instructor_id
    }
}
