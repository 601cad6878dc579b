// Copyright 2025 Cowboy AI, LLC.

//! Immutable log of source documents with a change feed
//!
//! Source documents are written once. Every append is announced on a broadcast
//! channel, which is how projectors learn about new events. Delivery is at least
//! once: [`InMemoryEventLog::redeliver`] announces a stored event again.

use crate::errors::{ProjectionError, ProjectionResult, StoreError, StoreResult};
use crate::events::{DomainEvent, SourceEvent};
use crate::identifiers::DocumentId;
use futures::Stream;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Default buffered notifications per subscriber
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// A source document was created (or delivered again)
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    /// Collection the document lives in
    pub collection: String,
    /// The decoded event
    pub event: SourceEvent,
    /// 1 for the first delivery, incremented on every redelivery
    pub delivery: u32,
}

#[derive(Debug, Clone)]
struct LogEntry {
    collection: String,
    event: SourceEvent,
    deliveries: u32,
}

/// In-memory, append-only event log
#[derive(Clone)]
pub struct InMemoryEventLog {
    entries: Arc<RwLock<IndexMap<DocumentId, LogEntry>>>,
    sender: broadcast::Sender<ChangeNotification>,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl InMemoryEventLog {
    /// Create a log whose subscribers buffer up to `feed_capacity` notifications
    pub fn new(feed_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            entries: Arc::new(RwLock::new(IndexMap::new())),
            sender,
        }
    }

    /// Record an event and announce it. Events are immutable: an ID can be appended once.
    pub async fn append(&self, collection: &str, event: SourceEvent) -> StoreResult<()> {
        let id = event.event_id().clone();
        {
            let mut entries = self.entries.write().await;
            if entries.contains_key(&id) {
                return Err(StoreError::AlreadyExists {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
            entries.insert(
                id.clone(),
                LogEntry {
                    collection: collection.to_string(),
                    event: event.clone(),
                    deliveries: 1,
                },
            );
        }

        debug!(collection, event_id = %id, event_type = event.event_type(), "Appended source event");
        self.publish(ChangeNotification {
            collection: collection.to_string(),
            event,
            delivery: 1,
        });
        Ok(())
    }

    /// Decode a raw source document and append it.
    ///
    /// Returns `None` for documents that are not a known `v1` source type.
    pub async fn ingest(&self, collection: &str, raw: Value) -> ProjectionResult<Option<DocumentId>> {
        let Some(event) = SourceEvent::decode(raw)? else {
            debug!(collection, "Ignored document with unknown type or version");
            return Ok(None);
        };
        let id = event.event_id().clone();
        self.append(collection, event)
            .await
            .map_err(|e| ProjectionError::write_failure(collection, id.as_str(), e))?;
        Ok(Some(id))
    }

    /// Announce a stored event again
    pub async fn redeliver(&self, id: &DocumentId) -> StoreResult<()> {
        let notification = {
            let mut entries = self.entries.write().await;
            let Some(entry) = entries.get_mut(id) else {
                return Err(StoreError::NotFound {
                    collection: "event-log".to_string(),
                    id: id.to_string(),
                });
            };
            entry.deliveries += 1;
            ChangeNotification {
                collection: entry.collection.clone(),
                event: entry.event.clone(),
                delivery: entry.deliveries,
            }
        };

        debug!(event_id = %id, delivery = notification.delivery, "Redelivering source event");
        self.publish(notification);
        Ok(())
    }

    /// Look up an event
    pub async fn get(&self, id: &DocumentId) -> Option<SourceEvent> {
        self.entries.read().await.get(id).map(|entry| entry.event.clone())
    }

    /// Every event in append order
    pub async fn events(&self) -> Vec<SourceEvent> {
        self.entries
            .read()
            .await
            .values()
            .map(|entry| entry.event.clone())
            .collect()
    }

    /// Number of stored events
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Change feed of notifications published after this call.
    ///
    /// A subscriber that falls behind by more than the feed capacity skips the
    /// missed notifications with a warning.
    pub fn subscribe(&self) -> impl Stream<Item = ChangeNotification> + Send + Unpin + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|item| match item {
            Ok(notification) => Some(notification),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Change feed subscriber lagged, notifications dropped");
                None
            }
        })
    }

    fn publish(&self, notification: ChangeNotification) {
        if self.sender.send(notification).is_err() {
            debug!("No change feed subscribers");
        }
    }
}
