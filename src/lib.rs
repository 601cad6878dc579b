// Copyright 2025 Cowboy AI, LLC.

//! # CIM Domain Driving
//!
//! Cached read models for a driving school, kept in sync with the write side by
//! event-driven projections.
//!
//! The write side records immutable source documents: an instructor was registered,
//! a driving session (lesson or exam) was logged. Projectors turn those events into
//! denormalized per-instructor documents:
//!
//! - **Instructor profile**: all-time lesson and pass counters
//! - **Instructor students**: one summary per student, an append-only lesson history,
//!   and a rolling window of monthly usage
//!
//! ## Guarantees
//!
//! 1. **Exactly one aggregate**: every update locates the single cached document of
//!    its instructor first; zero or several is a reported consistency error
//! 2. **No lost counts**: counters use atomic increments, history uses array union
//! 3. **No lost array updates**: summary and usage rewrites are version-checked and
//!    retried on conflict
//! 4. **Idempotent initialization**: cached document IDs are derived from the
//!    instructor, so redelivered creation events are no-ops
//!
//! ## Example
//!
//! ```no_run
//! use cim_domain_driving::{
//!     InMemoryDocumentStore, InMemoryEventLog, ProjectionConfig, ProjectionContext,
//!     ProjectionEngine,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ProjectionConfig::from_env()?;
//! let store = Arc::new(InMemoryDocumentStore::new());
//! let log = InMemoryEventLog::default();
//!
//! let engine = ProjectionEngine::with_default_projectors(ProjectionContext::new(store, config));
//! engine.run(log.subscribe()).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod infrastructure;
pub mod markers;
pub mod month;
pub mod projections;
pub mod read;
pub mod read_models;
pub mod update;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AggregateIdStrategy, ProjectionConfig};
pub use engine::{DispatchReport, ProjectionEngine, ProjectorOutcome, ProjectorStats};
pub use errors::{ProjectionError, ProjectionResult, StoreError, StoreResult};
pub use events::{
    DomainEvent, DrivingSession, InstructorCreated, LessonGrade, SessionKind, SourceEvent,
};
pub use identifiers::{DocumentId, InstructorId, StudentId, VehicleId};
pub use infrastructure::{
    ChangeNotification, CreateOutcome, DocumentFilter, DocumentStore, InMemoryDocumentStore,
    InMemoryEventLog, Precondition, StoredDocument,
};
pub use markers::{ActorRole, DocType, DocVersion};
pub use month::DocMonth;
pub use projections::{project_and_report, ProjectionContext, Projector};
pub use read::CachedDetailsReader;
pub use read_models::{CachedAggregate, FieldState, InstructorProfileDoc, InstructorStudentsDoc};
pub use update::{DocumentUpdate, FieldUpdate};
