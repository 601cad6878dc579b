// Copyright 2025 Cowboy AI, LLC.

//! Document store abstraction for cached read models
//!
//! The store is a collection-oriented document database with equality/membership
//! queries, create-if-absent, and atomic partial updates guarded by an optional
//! version precondition.

use crate::errors::{StoreError, StoreResult};
use crate::identifiers::DocumentId;
use crate::update::DocumentUpdate;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// A document as read from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Document ID within its collection
    pub id: DocumentId,
    /// Incremented on every successful write, starting at 1
    pub version: u64,
    /// Document body
    pub data: Value,
}

/// Comparison applied to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Field equals the value
    Eq(Value),
    /// Field equals one of the values
    In(Vec<Value>),
}

/// Single field clause of a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Top-level field name
    pub field: String,
    /// Comparison
    pub op: FilterOp,
}

/// Conjunction of field clauses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFilter {
    clauses: Vec<FieldFilter>,
}

impl DocumentFilter {
    /// Filter matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(FieldFilter {
            field: field.into(),
            op: FilterOp::Eq(value.into()),
        });
        self
    }

    /// Require `field` to be one of `values`
    pub fn is_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.clauses.push(FieldFilter {
            field: field.into(),
            op: FilterOp::In(values),
        });
        self
    }

    /// Clauses in the order they were added
    pub fn clauses(&self) -> &[FieldFilter] {
        &self.clauses
    }

    /// Check a document body against every clause
    pub fn matches(&self, document: &Value) -> bool {
        self.clauses.iter().all(|clause| {
            let Some(actual) = document.get(&clause.field) else {
                return false;
            };
            match &clause.op {
                FilterOp::Eq(expected) => actual == expected,
                FilterOp::In(candidates) => candidates.contains(actual),
            }
        })
    }
}

/// Guard evaluated atomically with an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The document only has to exist
    Exists,
    /// The document must still be at this version
    Version(u64),
}

/// Result of a create-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The document was written
    Created,
    /// A document with that ID was already there; nothing was written
    AlreadyExists,
}

/// Storage backend for cached aggregates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of `collection` matching `filter`, in creation order
    async fn query(&self, collection: &str, filter: &DocumentFilter)
        -> StoreResult<Vec<StoredDocument>>;

    /// Read one document
    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<StoredDocument>>;

    /// Write `data` under `id` unless a document with that ID exists
    async fn create(&self, collection: &str, id: &DocumentId, data: Value)
        -> StoreResult<CreateOutcome>;

    /// Apply `update` atomically, returning the new version
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        update: &DocumentUpdate,
        precondition: Precondition,
    ) -> StoreResult<u64>;
}

type Collections = HashMap<String, IndexMap<DocumentId, StoredDocument>>;

/// In-memory document store for tests and single-process deployments
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    write_failure: Arc<RwLock<Option<StoreError>>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `failure`, or clear it with `None`
    pub async fn set_write_failure(&self, failure: Option<StoreError>) {
        *self.write_failure.write().await = failure;
    }

    /// All documents of a collection, in creation order
    pub async fn documents(&self, collection: &str) -> Vec<StoredDocument> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(IndexMap::len)
            .unwrap_or(0)
    }

    async fn check_writable(&self) -> StoreResult<()> {
        match self.write_failure.read().await.as_ref() {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        let matches: Vec<StoredDocument> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(&doc.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        trace!(collection, matches = matches.len(), "Queried documents");
        Ok(matches)
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<StoredDocument>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn create(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Value,
    ) -> StoreResult<CreateOutcome> {
        self.check_writable().await?;
        if !data.is_object() {
            return Err(StoreError::Rejected(format!(
                "document {collection}/{id} must be an object"
            )));
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            debug!(collection, document_id = %id, "Document already exists, create skipped");
            return Ok(CreateOutcome::AlreadyExists);
        }
        docs.insert(
            id.clone(),
            StoredDocument {
                id: id.clone(),
                version: 1,
                data,
            },
        );
        debug!(collection, document_id = %id, "Created document");
        Ok(CreateOutcome::Created)
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        update: &DocumentUpdate,
        precondition: Precondition,
    ) -> StoreResult<u64> {
        self.check_writable().await?;

        let mut collections = self.collections.write().await;
        let Some(stored) = collections.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        if let Precondition::Version(expected) = precondition {
            if stored.version != expected {
                return Err(StoreError::VersionConflict {
                    expected,
                    actual: stored.version,
                });
            }
        }

        let mut scratch = stored.data.clone();
        update.apply(&mut scratch)?;
        stored.data = scratch;
        stored.version += 1;

        debug!(
            collection,
            document_id = %id,
            version = stored.version,
            fields = update.len(),
            paths = ?update.iter().map(|(path, _)| path).collect::<Vec<_>>(),
            "Updated document"
        );
        Ok(stored.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COLL: &str = "cached";

    #[tokio::test]
    async fn test_create_if_absent() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("doc-1");

        let first = store.create(COLL, &id, json!({ "n": 1 })).await.unwrap();
        let second = store.create(COLL, &id, json!({ "n": 2 })).await.unwrap();

        assert_eq!(first, CreateOutcome::Created);
        assert_eq!(second, CreateOutcome::AlreadyExists);
        let doc = store.get(COLL, &id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({ "n": 1 }));
        assert_eq!(doc.version, 1);
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = InMemoryDocumentStore::new();
        store
            .create(COLL, &DocumentId::new("a"), json!({ "owner": "i-1", "kind": "cashed" }))
            .await
            .unwrap();
        store
            .create(COLL, &DocumentId::new("b"), json!({ "owner": "i-2", "kind": "cashed" }))
            .await
            .unwrap();
        store
            .create(COLL, &DocumentId::new("c"), json!({ "owner": "i-1", "kind": "edit" }))
            .await
            .unwrap();

        let filter = DocumentFilter::new()
            .eq("owner", "i-1")
            .is_in("kind", vec![json!("cashed")]);
        let found = store.query(COLL, &filter).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, DocumentId::new("a"));
        assert!(store.query("other", &filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("doc-1");
        store.create(COLL, &id, json!({ "count": 0 })).await.unwrap();

        let update = DocumentUpdate::new().increment("count", 1);
        let v2 = store
            .update(COLL, &id, &update, Precondition::Version(1))
            .await
            .unwrap();
        assert_eq!(v2, 2);

        let stale = store
            .update(COLL, &id, &update, Precondition::Version(1))
            .await
            .unwrap_err();
        assert_eq!(
            stale,
            StoreError::VersionConflict {
                expected: 1,
                actual: 2
            }
        );

        let doc = store.get(COLL, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["count"], json!(1));
    }

    #[tokio::test]
    async fn test_failed_update_leaves_document_untouched() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("doc-1");
        store
            .create(COLL, &id, json!({ "count": 0, "label": "x" }))
            .await
            .unwrap();

        let update = DocumentUpdate::new()
            .increment("count", 1)
            .increment("label", 1);
        let err = store
            .update(COLL, &id, &update, Precondition::Exists)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        let doc = store.get(COLL, &id).await.unwrap().unwrap();
        assert_eq!(doc.data["count"], json!(0));
        assert_eq!(doc.version, 1);
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .update(
                COLL,
                &DocumentId::new("nope"),
                &DocumentUpdate::new().increment("count", 1),
                Precondition::Exists,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let store = InMemoryDocumentStore::new();
        store
            .set_write_failure(Some(StoreError::Unavailable("offline".into())))
            .await;

        let err = store
            .create(COLL, &DocumentId::new("a"), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Unavailable("offline".into()));

        store.set_write_failure(None).await;
        assert!(store.create(COLL, &DocumentId::new("a"), json!({})).await.is_ok());
    }
}
