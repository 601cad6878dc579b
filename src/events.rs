// Copyright (c) 2025 - Cowboy AI, LLC.

//! Source events for the cached read models
//!
//! Events are facts recorded by the write side: an instructor was created, a driving
//! session was logged. They are immutable and arrive through the event log, where the
//! projectors pick them up.

use crate::errors::{ProjectionError, ProjectionResult};
use crate::identifiers::{DocumentId, InstructorId, StudentId, VehicleId};
use crate::markers::{ActorRole, DocType, DocVersion, DOC_TYPE, DOC_VERSION};
use crate::month::DocMonth;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Base trait for all source events
pub trait DomainEvent: Send + Sync + fmt::Debug {
    /// ID of the source document that recorded the event
    fn event_id(&self) -> &DocumentId;

    /// Instructor whose cached aggregates the event affects
    fn owner_id(&self) -> &InstructorId;

    /// Get the event type name
    fn event_type(&self) -> &'static str;

    /// Get the schema version
    fn version(&self) -> DocVersion {
        DocVersion::V1
    }
}

/// A new instructor was registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorCreated {
    /// Event document ID
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Always [`DocType::Creation`]
    #[serde(rename = "_docType")]
    pub doc_type: DocType,
    /// Schema version
    #[serde(rename = "_docVersion")]
    pub doc_version: DocVersion,
    /// Subject that wrote the event
    #[serde(rename = "_actorId")]
    pub actor_id: String,
    /// Role of that subject
    #[serde(rename = "_actorRole")]
    pub actor_role: ActorRole,
    /// When the event was recorded
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
    /// The new instructor
    pub instructor_id: InstructorId,
}

impl InstructorCreated {
    /// Record a new instructor creation
    pub fn new(
        instructor_id: impl Into<InstructorId>,
        actor_id: impl Into<String>,
        actor_role: ActorRole,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            doc_type: DocType::Creation,
            doc_version: DocVersion::V1,
            actor_id: actor_id.into(),
            actor_role,
            created_at,
            instructor_id: instructor_id.into(),
        }
    }
}

impl DomainEvent for InstructorCreated {
    fn event_id(&self) -> &DocumentId {
        &self.id
    }

    fn owner_id(&self) -> &InstructorId {
        &self.instructor_id
    }

    fn event_type(&self) -> &'static str {
        "InstructorCreated"
    }

    fn version(&self) -> DocVersion {
        self.doc_version
    }
}

/// Geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GeoPoint {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
}

/// One sample of the recorded route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GpsPoint {
    /// Position
    pub point: GeoPoint,
    /// When the position was recorded
    pub timestamp: DateTime<Utc>,
}

/// Severity of a logged driving mistake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor mistake
    Warning,
    /// Serious mistake
    Error,
}

/// Mistake annotated during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonErrorLog {
    /// When it happened
    pub timestamp: DateTime<Utc>,
    /// How serious it was
    pub severity: Severity,
    /// What happened
    pub description: String,
    /// Where it happened
    pub geo_point: GeoPoint,
}

/// Free-text note taken during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LessonNote {
    /// When the note was taken
    pub timestamp: DateTime<Utc>,
    /// Note text
    pub note: String,
}

/// Lesson grade, `"1"` (worst) to `"5"` (best) on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum LessonGrade {
    /// Grade 1
    #[serde(rename = "1")]
    One,
    /// Grade 2
    #[serde(rename = "2")]
    Two,
    /// Grade 3
    #[serde(rename = "3")]
    Three,
    /// Grade 4
    #[serde(rename = "4")]
    Four,
    /// Grade 5
    #[serde(rename = "5")]
    Five,
}

impl LessonGrade {
    /// Numeric value of the grade
    pub fn value(&self) -> u8 {
        match self {
            LessonGrade::One => 1,
            LessonGrade::Two => 2,
            LessonGrade::Three => 3,
            LessonGrade::Four => 4,
            LessonGrade::Five => 5,
        }
    }
}

impl TryFrom<u8> for LessonGrade {
    type Error = ProjectionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(LessonGrade::One),
            2 => Ok(LessonGrade::Two),
            3 => Ok(LessonGrade::Three),
            4 => Ok(LessonGrade::Four),
            5 => Ok(LessonGrade::Five),
            other => Err(ProjectionError::InvalidEvent(format!(
                "lesson grade must be 1..=5, got {other}"
            ))),
        }
    }
}

impl fmt::Display for LessonGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// What kind of session a source document records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Regular lesson
    Lesson,
    /// Driving exam with its outcome
    Exam {
        /// Whether the student passed
        passed: bool,
    },
}

/// A completed driving session, the source of truth for every lesson projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrivingSession {
    /// Source document ID
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Schema version
    #[serde(rename = "_docVersion")]
    pub doc_version: DocVersion,
    /// Lesson or exam marker
    #[serde(rename = "_docType")]
    pub doc_type: DocType,
    /// Student
    pub client_id: StudentId,
    /// Instructor, owner of the cached aggregates
    pub instructor_id: InstructorId,
    /// Vehicle used
    pub vehicle_id: VehicleId,
    /// Ordinal of the lesson, or the exam attempt for exam sessions
    pub lesson_number: u32,
    /// Instructor's grade
    pub lesson_grade: LessonGrade,
    /// Session start
    pub lesson_timestamp_start: DateTime<Utc>,
    /// Session end
    pub lesson_timestamp_end: DateTime<Utc>,
    /// Start location
    pub geo_point_start: GeoPoint,
    /// End location
    pub geo_point_end: GeoPoint,
    /// Recorded route
    #[serde(default)]
    pub gps_points: Vec<GpsPoint>,
    /// Recording of the session
    #[serde(default)]
    pub lesson_video_url: String,
    /// Mistakes
    #[serde(default)]
    pub lesson_error_logs: Vec<LessonErrorLog>,
    /// Notes
    #[serde(default)]
    pub lesson_notes: Vec<LessonNote>,
}

impl DrivingSession {
    /// A lesson session with one hour duration and no annotations
    pub fn lesson(
        instructor_id: impl Into<InstructorId>,
        client_id: impl Into<StudentId>,
        vehicle_id: impl Into<VehicleId>,
        lesson_number: u32,
        lesson_grade: LessonGrade,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            doc_version: DocVersion::V1,
            doc_type: DocType::TrainingCreation,
            client_id: client_id.into(),
            instructor_id: instructor_id.into(),
            vehicle_id: vehicle_id.into(),
            lesson_number,
            lesson_grade,
            lesson_timestamp_start: start,
            lesson_timestamp_end: start + chrono::Duration::hours(1),
            geo_point_start: GeoPoint::default(),
            geo_point_end: GeoPoint::default(),
            gps_points: Vec::new(),
            lesson_video_url: String::new(),
            lesson_error_logs: Vec::new(),
            lesson_notes: Vec::new(),
        }
    }

    /// An exam session; `try_number` is stored as the lesson number
    pub fn exam(
        instructor_id: impl Into<InstructorId>,
        client_id: impl Into<StudentId>,
        vehicle_id: impl Into<VehicleId>,
        try_number: u32,
        passed: bool,
        start: DateTime<Utc>,
    ) -> Self {
        let grade = if passed {
            LessonGrade::Five
        } else {
            LessonGrade::One
        };
        let mut session = Self::lesson(instructor_id, client_id, vehicle_id, try_number, grade, start);
        session.doc_type = if passed {
            DocType::ExamPassedCreation
        } else {
            DocType::ExamFailedCreation
        };
        session
    }

    /// Lesson or exam, derived from the document type
    pub fn kind(&self) -> ProjectionResult<SessionKind> {
        match self.doc_type {
            DocType::TrainingCreation => Ok(SessionKind::Lesson),
            DocType::ExamPassedCreation => Ok(SessionKind::Exam { passed: true }),
            DocType::ExamFailedCreation => Ok(SessionKind::Exam { passed: false }),
            other => Err(ProjectionError::InvalidEvent(format!(
                "session {} has non-session document type {other}",
                self.id
            ))),
        }
    }
}

impl DrivingSession {
    /// Check that every projection can derive its fields from the session.
    ///
    /// The start must fall into a month with a `YYYY-MM` form, otherwise the usage
    /// bucket could not be read back.
    pub fn validate(&self) -> ProjectionResult<()> {
        self.kind()?;
        DocMonth::of(self.lesson_timestamp_start).map_err(|e| {
            ProjectionError::InvalidEvent(format!(
                "session {} starts at {}: {e}",
                self.id, self.lesson_timestamp_start
            ))
        })?;
        Ok(())
    }
}

impl DomainEvent for DrivingSession {
    fn event_id(&self) -> &DocumentId {
        &self.id
    }

    fn owner_id(&self) -> &InstructorId {
        &self.instructor_id
    }

    fn event_type(&self) -> &'static str {
        "SessionCreated"
    }

    fn version(&self) -> DocVersion {
        self.doc_version
    }
}

/// Every event the projection engine reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// Instructor registered
    InstructorCreated(InstructorCreated),
    /// Driving session logged
    SessionCreated(DrivingSession),
}

impl SourceEvent {
    /// Decode a raw ingress document.
    ///
    /// Documents with an unknown `_docVersion` or an unrelated `_docType` yield `None`
    /// so newer writers can coexist with this consumer.
    pub fn decode(document: Value) -> ProjectionResult<Option<Self>> {
        let version = document.get(DOC_VERSION).cloned();
        let Some(Ok(DocVersion::V1)) = version.map(serde_json::from_value::<DocVersion>) else {
            return Ok(None);
        };

        let doc_type = match document.get(DOC_TYPE).cloned().map(serde_json::from_value::<DocType>) {
            Some(Ok(doc_type)) => doc_type,
            _ => return Ok(None),
        };

        match doc_type {
            DocType::Creation => Ok(Some(SourceEvent::InstructorCreated(
                serde_json::from_value(document)?,
            ))),
            ty if ty.is_session() => Ok(Some(SourceEvent::SessionCreated(
                serde_json::from_value(document)?,
            ))),
            _ => Ok(None),
        }
    }

    /// Reject events the projectors cannot apply consistently
    pub fn validate(&self) -> ProjectionResult<()> {
        match self {
            SourceEvent::InstructorCreated(_) => Ok(()),
            SourceEvent::SessionCreated(session) => session.validate(),
        }
    }

    /// The driving session, if this is a session event
    pub fn as_session(&self) -> Option<&DrivingSession> {
        match self {
            SourceEvent::SessionCreated(session) => Some(session),
            SourceEvent::InstructorCreated(_) => None,
        }
    }

    /// The creation event, if this is one
    pub fn as_instructor_created(&self) -> Option<&InstructorCreated> {
        match self {
            SourceEvent::InstructorCreated(created) => Some(created),
            SourceEvent::SessionCreated(_) => None,
        }
    }

    fn inner(&self) -> &dyn DomainEvent {
        match self {
            SourceEvent::InstructorCreated(created) => created,
            SourceEvent::SessionCreated(session) => session,
        }
    }
}

impl DomainEvent for SourceEvent {
    fn event_id(&self) -> &DocumentId {
        self.inner().event_id()
    }

    fn owner_id(&self) -> &InstructorId {
        self.inner().owner_id()
    }

    fn event_type(&self) -> &'static str {
        self.inner().event_type()
    }

    fn version(&self) -> DocVersion {
        self.inner().version()
    }
}

impl From<InstructorCreated> for SourceEvent {
    fn from(event: InstructorCreated) -> Self {
        SourceEvent::InstructorCreated(event)
    }
}

impl From<DrivingSession> for SourceEvent {
    fn from(session: DrivingSession) -> Self {
        SourceEvent::SessionCreated(session)
    }
}
