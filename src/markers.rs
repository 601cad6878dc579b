// Copyright 2025 Cowboy AI, LLC.

//! Document markers shared by the write side and the cached read side
//!
//! Every stored document carries `_docType` and `_docVersion`. Consumers filter on both,
//! so a new schema version can be introduced next to the old one.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field holding the document ID
pub const DOC_ID: &str = "_id";
/// Field holding the document type marker
pub const DOC_TYPE: &str = "_docType";
/// Field holding the schema version marker
pub const DOC_VERSION: &str = "_docVersion";
/// Field holding the actor that wrote an event
pub const DOC_ACTOR_ID: &str = "_actorId";
/// Field holding the role of that actor
pub const DOC_ACTOR_ROLE: &str = "_actorRole";
/// Field holding the event creation time
pub const DOC_CREATED_AT: &str = "_createdAt";
/// Owning-entity field on every instructor aggregate
pub const INSTRUCTOR_ID: &str = "instructorId";

/// Document type marker (`_docType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum DocType {
    /// Cached read-model aggregate. The wire spelling predates this crate.
    #[serde(rename = "cashed")]
    Cached,
    /// Entity creation event
    #[serde(rename = "creation")]
    Creation,
    /// Entity edit event
    #[serde(rename = "edit")]
    Edit,
    /// Completed driving lesson
    #[serde(rename = "training-creation")]
    TrainingCreation,
    /// Completed driving exam, passed
    #[serde(rename = "exam-completed-passed-creation")]
    ExamPassedCreation,
    /// Completed driving exam, failed
    #[serde(rename = "exam-completed-failed-creation")]
    ExamFailedCreation,
}

impl DocType {
    /// Wire spelling of this marker
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Cached => "cashed",
            DocType::Creation => "creation",
            DocType::Edit => "edit",
            DocType::TrainingCreation => "training-creation",
            DocType::ExamPassedCreation => "exam-completed-passed-creation",
            DocType::ExamFailedCreation => "exam-completed-failed-creation",
        }
    }

    /// Whether this marker identifies a driving session source document
    pub fn is_session(&self) -> bool {
        matches!(
            self,
            DocType::TrainingCreation | DocType::ExamPassedCreation | DocType::ExamFailedCreation
        )
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema version marker (`_docVersion`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum DocVersion {
    /// First schema generation
    #[default]
    #[serde(rename = "v1")]
    V1,
}

impl DocVersion {
    /// Wire spelling of this marker
    pub fn as_str(&self) -> &'static str {
        match self {
            DocVersion::V1 => "v1",
        }
    }
}

impl fmt::Display for DocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the subject that wrote an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    /// School administrator
    Admin,
    /// Driving instructor
    Instructor,
    /// Student
    Client,
    /// Developer tooling
    Developer,
    /// Automated script (seeding, migrations)
    Script,
}
