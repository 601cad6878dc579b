// Copyright 2025 Cowboy AI, LLC.

//! Partial document updates in dot-path form
//!
//! Projectors never send whole documents. They send a flat map from dotted field
//! paths to an operation:
//!
//! ```text
//! {
//!   "profile.allTimeStats.totalLessons": increment(1),
//!   "students.studentSummary":           set([...]),     // arrays replaced wholesale
//!   "students.studentHistorySummary":    array_union([{...}]),
//! }
//! ```
//!
//! The store applies all operations of one update atomically against one document.
//! `Increment` and `ArrayUnion` are commutative, so concurrent writers using only those
//! never lose each other's changes.

use crate::errors::{StoreError, StoreResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Operation applied to a single field path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    /// Replace the field (arrays and objects included)
    Set(Value),
    /// Add to a numeric field; a missing or null field counts as zero
    Increment(i64),
    /// Append each element not already present; a missing field counts as empty
    ArrayUnion(Vec<Value>),
}

/// Flat, ordered set of field operations for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUpdate {
    fields: IndexMap<String, FieldUpdate>,
}

impl DocumentUpdate {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value at `path`
    pub fn set(mut self, path: impl Into<String>, value: Value) -> Self {
        self.fields.insert(path.into(), FieldUpdate::Set(value));
        self
    }

    /// Serialize `value` and replace the field at `path` with it
    pub fn set_serialized<T: Serialize>(
        self,
        path: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(self.set(path, serde_json::to_value(value)?))
    }

    /// Atomically add `by` to the number at `path`
    pub fn increment(mut self, path: impl Into<String>, by: i64) -> Self {
        self.fields.insert(path.into(), FieldUpdate::Increment(by));
        self
    }

    /// Atomically append `items` to the array at `path`, skipping exact duplicates
    pub fn array_union(mut self, path: impl Into<String>, items: Vec<Value>) -> Self {
        self.fields.insert(path.into(), FieldUpdate::ArrayUnion(items));
        self
    }

    /// Number of field operations
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the update touches no field
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(path, operation)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldUpdate)> {
        self.fields.iter().map(|(path, op)| (path.as_str(), op))
    }

    /// Apply every operation to `document` in order.
    ///
    /// Stops at the first failing operation. Stores apply updates to a scratch copy,
    /// so a failure leaves the stored document untouched.
    pub fn apply(&self, document: &mut Value) -> StoreResult<()> {
        for (path, op) in &self.fields {
            let slot = resolve_slot(document, path)?;
            apply_op(slot, path, op)?;
        }
        Ok(())
    }
}

/// Walk `path`, creating intermediate objects, and return the target slot
fn resolve_slot<'a>(document: &'a mut Value, path: &str) -> StoreResult<&'a mut Value> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StoreError::Rejected(format!("invalid field path '{path}'")));
    }

    let mut current = document;
    for segment in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return Err(StoreError::Rejected(format!(
                "cannot descend into non-object at '{segment}' of '{path}'"
            )));
        };
        current = map.entry(segment.to_string()).or_insert(Value::Null);
    }
    Ok(current)
}

fn apply_op(slot: &mut Value, path: &str, op: &FieldUpdate) -> StoreResult<()> {
    match op {
        FieldUpdate::Set(value) => {
            *slot = value.clone();
        }
        FieldUpdate::Increment(by) => {
            let next = match &*slot {
                Value::Null => Value::from(*by),
                Value::Number(n) if n.is_i64() || n.is_u64() => {
                    let current = n.as_i64().ok_or_else(|| {
                        StoreError::Rejected(format!("counter at '{path}' overflows i64"))
                    })?;
                    let sum = current.checked_add(*by).ok_or_else(|| {
                        StoreError::Rejected(format!("counter at '{path}' overflows i64"))
                    })?;
                    Value::from(sum)
                }
                Value::Number(n) => Value::from(n.as_f64().unwrap_or_default() + *by as f64),
                _ => {
                    return Err(StoreError::Rejected(format!(
                        "cannot increment non-numeric field '{path}'"
                    )))
                }
            };
            *slot = next;
        }
        FieldUpdate::ArrayUnion(items) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            let Value::Array(array) = slot else {
                return Err(StoreError::Rejected(format!(
                    "cannot array-union into non-array field '{path}'"
                )));
            };
            for item in items {
                if !array.contains(item) {
                    array.push(item.clone());
                }
            }
        }
    }
    Ok(())
}
