// Copyright 2025 Cowboy AI, LLC.

//! Projection engine: fans source events out to the registered projectors
//!
//! Projectors matching an event run concurrently and independently. The engine
//! keeps per-projector progress counters and remembers which projectors already
//! applied each source document, so a redelivery only re-runs the ones that failed.

use crate::errors::ProjectionResult;
use crate::events::{DomainEvent, SourceEvent};
use crate::identifiers::DocumentId;
use crate::infrastructure::ChangeNotification;
use crate::projections::{
    project_and_report, CacheInitializer, HistoryAppender, LessonCounter, PassCounter,
    ProjectionContext, Projector, StudentSummaryUpdater, UsageWindowUpdater,
};
use crate::read_models::{InstructorProfileDoc, InstructorStudentsDoc};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::{pin_mut, Stream, StreamExt};
use indexmap::IndexMap;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Progress of one projector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorStats {
    /// Projector name
    pub name: String,
    /// Events the projector was run for
    pub events_processed: u64,
    /// Runs that reported failure or failed unexpectedly
    pub failures: u64,
    /// Description of the last failure
    pub last_error: Option<String>,
    /// When the projector last ran
    pub last_processed_at: Option<DateTime<Utc>>,
}

impl ProjectorStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events_processed: 0,
            failures: 0,
            last_error: None,
            last_processed_at: None,
        }
    }
}

/// Outcome of one projector for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectorOutcome {
    /// Projector name
    pub projector: &'static str,
    /// Whether the projection was applied
    pub applied: bool,
}

/// Result of dispatching one source event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Source document
    pub event_id: DocumentId,
    /// The event was already fully projected and was skipped
    pub skipped_redelivery: bool,
    /// One entry per projector that ran for the event, in registration order
    pub outcomes: Vec<ProjectorOutcome>,
    /// Projectors not run again because an earlier delivery applied the event
    pub already_applied: Vec<&'static str>,
}

impl DispatchReport {
    /// Whether every projector that ran applied the event
    pub fn all_applied(&self) -> bool {
        self.outcomes.iter().all(|o| o.applied)
    }

    /// Names of projectors that reported failure
    pub fn failed(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| !o.applied)
            .map(|o| o.projector)
            .collect()
    }

    /// Outcome of a named projector
    pub fn outcome(&self, projector: &str) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|o| o.projector == projector)
            .map(|o| o.applied)
    }
}

/// Runs projectors for source events
pub struct ProjectionEngine {
    ctx: ProjectionContext,
    projectors: Vec<Arc<dyn Projector>>,
    stats: RwLock<IndexMap<&'static str, ProjectorStats>>,
    applied: Mutex<LruCache<DocumentId, HashSet<&'static str>>>,
    skipped_redeliveries: AtomicU64,
}

impl ProjectionEngine {
    /// Engine without projectors
    pub fn new(ctx: ProjectionContext) -> Self {
        let capacity = NonZeroUsize::new(ctx.config.dedup_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ctx,
            projectors: Vec::new(),
            stats: RwLock::new(IndexMap::new()),
            applied: Mutex::new(LruCache::new(capacity)),
            skipped_redeliveries: AtomicU64::new(0),
        }
    }

    /// Engine with the full instructor projector set
    pub fn with_default_projectors(ctx: ProjectionContext) -> Self {
        let mut engine = Self::new(ctx.clone());
        engine.register(Arc::new(CacheInitializer::<InstructorProfileDoc>::new(ctx.clone())));
        engine.register(Arc::new(CacheInitializer::<InstructorStudentsDoc>::new(ctx.clone())));
        engine.register(Arc::new(LessonCounter::new(ctx.clone())));
        engine.register(Arc::new(PassCounter::new(ctx.clone())));
        engine.register(Arc::new(StudentSummaryUpdater::new(ctx.clone())));
        engine.register(Arc::new(HistoryAppender::new(ctx.clone())));
        engine.register(Arc::new(UsageWindowUpdater::new(ctx)));
        engine
    }

    /// Add a projector
    pub fn register(&mut self, projector: Arc<dyn Projector>) {
        debug!(projector = projector.name(), "Registered projector");
        self.projectors.push(projector);
    }

    /// Shared projector dependencies
    pub fn context(&self) -> &ProjectionContext {
        &self.ctx
    }

    /// Names of the registered projectors, in registration order
    pub fn projector_names(&self) -> Vec<&'static str> {
        self.projectors.iter().map(|p| p.name()).collect()
    }

    /// Run every projector that handles `event` and has not applied it yet.
    ///
    /// Reported failures show up as `applied: false` in the report. The first
    /// unexpected error is returned after all projectors have finished. Sessions that
    /// fail validation are rejected before any projector runs.
    pub async fn dispatch(&self, event: &SourceEvent) -> ProjectionResult<DispatchReport> {
        let event_id = event.event_id().clone();
        if let Err(err) = event.validate() {
            warn!(event_id = %event_id, error = %err, "Rejected source event");
            return Err(err);
        }

        let already: HashSet<&'static str> = self
            .applied
            .lock()
            .await
            .get(&event_id)
            .cloned()
            .unwrap_or_default();

        let matching: Vec<&dyn Projector> = self
            .projectors
            .iter()
            .map(|p| &**p)
            .filter(|p| p.handles(event))
            .collect();
        let pending: Vec<&dyn Projector> = matching
            .iter()
            .copied()
            .filter(|p| !already.contains(p.name()))
            .collect();
        let already_applied: Vec<&'static str> = matching
            .iter()
            .map(|p| p.name())
            .filter(|name| already.contains(name))
            .collect();

        if !matching.is_empty() && pending.is_empty() {
            self.skipped_redeliveries.fetch_add(1, Ordering::Relaxed);
            info!(event_id = %event_id, "Source event already projected, skipping redelivery");
            return Ok(DispatchReport {
                event_id,
                skipped_redelivery: true,
                outcomes: Vec::new(),
                already_applied,
            });
        }
        debug!(
            event_id = %event_id,
            event_type = event.event_type(),
            projectors = pending.len(),
            already_applied = ?already_applied,
            "Dispatching source event"
        );

        let results = join_all(pending.iter().map(|&projector| async move {
            (projector.name(), project_and_report(projector, event).await)
        }))
        .await;

        let now = self.ctx.clock.now();
        let mut outcomes = Vec::with_capacity(results.len());
        let mut unexpected = None;
        {
            let mut stats = self.stats.write().await;
            for (name, result) in results {
                let entry = stats
                    .entry(name)
                    .or_insert_with(|| ProjectorStats::new(name));
                entry.events_processed += 1;
                entry.last_processed_at = Some(now);

                let applied = match result {
                    Ok(true) => true,
                    Ok(false) => {
                        entry.failures += 1;
                        entry.last_error = Some(format!("event {event_id} reported failure"));
                        false
                    }
                    Err(err) => {
                        entry.failures += 1;
                        entry.last_error = Some(err.to_string());
                        if unexpected.is_none() {
                            unexpected = Some(err);
                        }
                        false
                    }
                };
                outcomes.push(ProjectorOutcome {
                    projector: name,
                    applied,
                });
            }
        }

        let newly_applied: Vec<&'static str> = outcomes
            .iter()
            .filter(|o| o.applied)
            .map(|o| o.projector)
            .collect();
        if !newly_applied.is_empty() {
            let mut applied = self.applied.lock().await;
            match applied.get_mut(&event_id) {
                Some(names) => names.extend(newly_applied),
                None => {
                    applied.put(event_id.clone(), newly_applied.into_iter().collect());
                }
            }
        }

        if let Some(err) = unexpected {
            return Err(err);
        }

        Ok(DispatchReport {
            event_id,
            skipped_redelivery: false,
            outcomes,
            already_applied,
        })
    }

    /// Dispatch notifications from a change feed until it ends.
    ///
    /// Unexpected errors are logged and the loop moves on to the next notification.
    /// Returns the number of notifications dispatched.
    pub async fn run<S>(&self, feed: S) -> u64
    where
        S: Stream<Item = ChangeNotification>,
    {
        pin_mut!(feed);
        let mut dispatched = 0;
        info!(projectors = self.projectors.len(), "Projection engine started");

        while let Some(notification) = feed.next().await {
            dispatched += 1;
            match self.dispatch(&notification.event).await {
                Ok(report) if !report.all_applied() => {
                    debug!(
                        event_id = %report.event_id,
                        failed = ?report.failed(),
                        delivery = notification.delivery,
                        "Source event partially projected"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    error!(
                        collection = %notification.collection,
                        event_id = %notification.event.event_id(),
                        error = %err,
                        "Dispatch failed"
                    );
                }
            }
        }

        info!(dispatched, "Change feed ended, projection engine stopped");
        dispatched
    }

    /// Per-projector progress, in first-run order
    pub async fn stats(&self) -> Vec<ProjectorStats> {
        self.stats.read().await.values().cloned().collect()
    }

    /// Progress of one projector
    pub async fn stats_for(&self, projector: &str) -> Option<ProjectorStats> {
        self.stats.read().await.get(projector).cloned()
    }

    /// Redeliveries suppressed so far
    pub fn skipped_redeliveries(&self) -> u64 {
        self.skipped_redeliveries.load(Ordering::Relaxed)
    }
}
