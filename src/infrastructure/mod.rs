// Copyright 2025 Cowboy AI, LLC.

//! Infrastructure layer: document storage and the source event log

pub mod document_store;
pub mod event_log;

pub use document_store::{
    CreateOutcome, DocumentFilter, DocumentStore, FieldFilter, FilterOp, InMemoryDocumentStore,
    Precondition, StoredDocument,
};
pub use event_log::{ChangeNotification, InMemoryEventLog, DEFAULT_FEED_CAPACITY};

#[cfg(test)]
pub use document_store::MockDocumentStore;
