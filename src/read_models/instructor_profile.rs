// Copyright 2025 Cowboy AI, LLC.

//! Cached instructor profile: all-time counters, trends and contact card

use super::{CachedAggregate, FieldState};
use crate::config::ProjectionConfig;
use crate::identifiers::{DocumentId, InstructorId};
use crate::markers::{DocType, DocVersion};
use crate::month::DocMonth;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Dot path of the all-time lesson counter
pub const TOTAL_LESSONS_PATH: &str = "profile.allTimeStats.totalLessons";
/// Dot path of the all-time passed-exam counter
pub const TOTAL_PASSES_PATH: &str = "profile.allTimeStats.totalPasses";

/// Cached aggregate `instructor-details-profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructorProfileDoc {
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
    /// Profile field groups
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub profile: FieldState<ProfileGroup>,
}

/// The `profile` field group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileGroup {
    /// Counters since the instructor joined
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub all_time_stats: FieldState<AllTimeStats>,
    /// Monthly trend lines
    #[serde(
        rename = "last6MonthsTrends",
        default,
        skip_serializing_if = "FieldState::is_absent"
    )]
    pub last_6_months_trends: FieldState<Last6MonthsTrends>,
    /// Contact card, absent until the instructor fills it in
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub contact: FieldState<Contact>,
    /// Source documents that edited the profile
    #[serde(default, skip_serializing_if = "FieldState::is_absent")]
    pub update_history: FieldState<Vec<UpdateHistoryEntry>>,
}

/// Count of lessons per grade, keyed `"1"` to `"5"` on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SatisfactionCounts {
    /// Grade 1
    #[serde(rename = "1", default)]
    pub one: u64,
    /// Grade 2
    #[serde(rename = "2", default)]
    pub two: u64,
    /// Grade 3
    #[serde(rename = "3", default)]
    pub three: u64,
    /// Grade 4
    #[serde(rename = "4", default)]
    pub four: u64,
    /// Grade 5
    #[serde(rename = "5", default)]
    pub five: u64,
}

/// Monotonic all-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AllTimeStats {
    /// Lessons per grade
    pub total_satisfaction: SatisfactionCounts,
    /// Passed exams
    pub total_passes: u64,
    /// Students taught
    pub total_students: u64,
    /// Sessions held
    pub total_lessons: u64,
}

/// Pass rate of one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassRatePoint {
    /// Calendar month
    pub month: DocMonth,
    /// Fraction of passed exams, `0.0..=1.0`
    pub pass_rate: f64,
}

/// Grade distribution of one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SatisfactionPoint {
    /// Calendar month
    pub month: DocMonth,
    /// Lessons per grade
    pub satisfaction: SatisfactionCounts,
}

/// The `last6MonthsTrends` field group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Last6MonthsTrends {
    /// Pass rate per month
    pub pass_rate_trend: Vec<PassRatePoint>,
    /// Grades per month
    pub satisfaction_trend: Vec<SatisfactionPoint>,
}

/// Instructor contact card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Profile picture
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Given name
    pub name: String,
    /// Family name
    pub surname: String,
    /// Birth date
    pub date_of_birth: DateTime<Utc>,
    /// E-mail address
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Hire date
    pub join_date: DateTime<Utc>,
    /// City or area
    pub location: String,
}

/// One profile edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistoryEntry {
    /// Document that triggered the edit
    pub doc_id: DocumentId,
    /// When the edit was applied
    pub at: DateTime<Utc>,
}

impl InstructorProfileDoc {
    /// All-time counters, zeroed when the group is not populated
    pub fn all_time_stats(&self) -> AllTimeStats {
        self.profile
            .as_ref()
            .and_then(|p| p.all_time_stats.as_ref())
            .copied()
            .unwrap_or_default()
    }
}

impl CachedAggregate for InstructorProfileDoc {
    const INITIALIZER: &'static str = "instructor-profile-initializer";

    fn model_type() -> &'static str {
        "InstructorProfile"
    }

    fn collection(config: &ProjectionConfig) -> String {
        config.profile_collection()
    }

    fn empty(instructor_id: InstructorId) -> Self {
        Self {
            id: None,
            doc_type: DocType::Cached,
            doc_version: DocVersion::V1,
            instructor_id,
            profile: FieldState::Populated(ProfileGroup {
                all_time_stats: FieldState::Populated(AllTimeStats::default()),
                last_6_months_trends: FieldState::Populated(Last6MonthsTrends::default()),
                contact: FieldState::Absent,
                update_history: FieldState::Populated(Vec::new()),
            }),
        }
    }

    fn instructor_id(&self) -> &InstructorId {
        &self.instructor_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_profile_wire_format() {
        let doc = InstructorProfileDoc::empty(InstructorId::new("i-1"));
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(
            value["profile"]["allTimeStats"],
            json!({
                "totalSatisfaction": { "1": 0, "2": 0, "3": 0, "4": 0, "5": 0 },
                "totalPasses": 0,
                "totalStudents": 0,
                "totalLessons": 0
            })
        );
        assert_eq!(
            value["profile"]["last6MonthsTrends"],
            json!({ "passRateTrend": [], "satisfactionTrend": [] })
        );
        assert!(value["profile"].get("contact").is_none());
        assert_eq!(value["profile"]["updateHistory"], json!([]));
    }

    #[test]
    fn test_counters_only_document() {
        // Counters written by increments onto a bare creation document
        let doc: InstructorProfileDoc = serde_json::from_value(json!({
            "_docType": "cashed",
            "_docVersion": "v1",
            "instructorId": "i-1",
            "profile": { "allTimeStats": { "totalLessons": 7 } }
        }))
        .unwrap();

        let stats = doc.all_time_stats();
        assert_eq!(stats.total_lessons, 7);
        assert_eq!(stats.total_passes, 0);
        assert!(doc.profile.as_ref().unwrap().contact.is_absent());
    }

    #[test]
    fn test_bare_document_has_zero_stats() {
        let doc: InstructorProfileDoc = serde_json::from_value(json!({
            "_docType": "cashed",
            "_docVersion": "v1",
            "instructorId": "i-1"
        }))
        .unwrap();
        assert!(doc.profile.is_absent());
        assert_eq!(doc.all_time_stats(), AllTimeStats::default());
    }
}
