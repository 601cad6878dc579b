// Copyright 2025 Cowboy AI, LLC.

//! Cached read models
//!
//! Read models are denormalized documents keyed by instructor. They are written only by
//! projectors and read by the application's detail views. Documents written by older
//! code may be missing whole field groups, so every group is a [`FieldState`].

mod instructor_profile;
mod instructor_students;

pub use instructor_profile::{
    AllTimeStats, Contact, InstructorProfileDoc, Last6MonthsTrends, PassRatePoint, ProfileGroup,
    SatisfactionCounts, SatisfactionPoint, UpdateHistoryEntry, TOTAL_LESSONS_PATH,
    TOTAL_PASSES_PATH,
};
pub use instructor_students::{
    BriefSummary, ExamBrief, InstructorStudentsDoc, LessonBrief, Last6MonthsStats,
    StudentHistoryEntry, StudentStatus, StudentSummaryEntry, StudentsGroup, SummaryType,
    UsageEntry, STUDENT_HISTORY_PATH, STUDENT_SUMMARY_PATH, USAGE_PATH,
};

use crate::config::ProjectionConfig;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::identifiers::InstructorId;
use crate::infrastructure::StoredDocument;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Population state of an optional field group
///
/// * `Absent` - the field is not in the document at all
/// * `Null` - the field is present and explicitly `null`
/// * `Populated` - the field holds a value
///
/// Use with `#[serde(default, skip_serializing_if = "FieldState::is_absent")]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldState<T> {
    /// Not present in the document
    #[default]
    Absent,
    /// Present as `null`
    Null,
    /// Present with a value
    Populated(T),
}

impl<T> FieldState<T> {
    /// Whether the field is missing from the document
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldState::Absent)
    }

    /// Whether the field is explicitly null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldState::Null)
    }

    /// Whether the field holds a value
    pub fn is_populated(&self) -> bool {
        matches!(self, FieldState::Populated(_))
    }

    /// Borrow the value, if populated
    pub fn as_ref(&self) -> Option<&T> {
        match self {
            FieldState::Populated(value) => Some(value),
            FieldState::Absent | FieldState::Null => None,
        }
    }

    /// Take the value, if populated
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldState::Populated(value) => Some(value),
            FieldState::Absent | FieldState::Null => None,
        }
    }
}

impl<T: Default> FieldState<T> {
    /// Clone of the value, or the default when not populated
    pub fn get_or_default(&self) -> T
    where
        T: Clone,
    {
        self.as_ref().cloned().unwrap_or_default()
    }
}

impl<T> From<T> for FieldState<T> {
    fn from(value: T) -> Self {
        FieldState::Populated(value)
    }
}

impl<T: Serialize> Serialize for FieldState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldState::Populated(value) => serializer.serialize_some(value),
            FieldState::Absent | FieldState::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldState<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldState::Populated(value),
            None => FieldState::Null,
        })
    }
}

impl<T: JsonSchema> JsonSchema for FieldState<T> {
    fn schema_name() -> String {
        format!("Nullable_{}", T::schema_name())
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        Option::<T>::json_schema(gen)
    }

    fn is_referenceable() -> bool {
        false
    }
}

/// A cached aggregate document owned by one instructor
pub trait CachedAggregate: Serialize + DeserializeOwned + Send + Sync {
    /// Name of the projector that creates the aggregate
    const INITIALIZER: &'static str;

    /// Name used in logs
    fn model_type() -> &'static str;

    /// Collection holding the aggregates
    fn collection(config: &ProjectionConfig) -> String;

    /// Freshly initialized aggregate: counters at zero, collections empty
    fn empty(instructor_id: InstructorId) -> Self;

    /// Owning instructor
    fn instructor_id(&self) -> &InstructorId;

    /// Decode a stored document into the typed aggregate
    fn from_document(document: &StoredDocument) -> ProjectionResult<Self> {
        serde_json::from_value(document.data.clone()).map_err(|e| ProjectionError::InvalidDocument {
            document_id: document.id.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(default, skip_serializing_if = "FieldState::is_absent")]
        group: FieldState<Vec<u32>>,
    }

    #[test]
    fn test_field_state_tri_state() {
        let absent: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(absent.group.is_absent());

        let null: Holder = serde_json::from_value(json!({ "group": null })).unwrap();
        assert!(null.group.is_null());

        let populated: Holder = serde_json::from_value(json!({ "group": [1, 2] })).unwrap();
        assert_eq!(populated.group.as_ref(), Some(&vec![1, 2]));
    }

    #[test]
    fn test_field_state_serialization() {
        let absent = Holder {
            group: FieldState::Absent,
        };
        assert_eq!(serde_json::to_value(&absent).unwrap(), json!({}));

        let null = Holder {
            group: FieldState::Null,
        };
        assert_eq!(serde_json::to_value(&null).unwrap(), json!({ "group": null }));

        let populated = Holder {
            group: vec![3].into(),
        };
        assert_eq!(serde_json::to_value(&populated).unwrap(), json!({ "group": [3] }));
    }

    #[test]
    fn test_get_or_default() {
        let absent: FieldState<Vec<u32>> = FieldState::Absent;
        assert!(absent.get_or_default().is_empty());
        let populated: FieldState<Vec<u32>> = vec![1].into();
        assert_eq!(populated.get_or_default(), vec![1]);
    }
}
