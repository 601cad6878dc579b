// Copyright 2025 Cowboy AI, LLC.

//! Shared fixtures for the projection integration tests
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cim_domain_driving::{
    ActorRole, CachedDetailsReader, DispatchReport, DrivingSession, FixedClock,
    InMemoryDocumentStore, InstructorCreated, InstructorId, InstructorProfileDoc,
    InstructorStudentsDoc, LessonGrade, ProjectionConfig, ProjectionContext, ProjectionEngine,
    SourceEvent,
};
use std::sync::Arc;

/// Engine wired to an in-memory store and a fixed clock
pub struct Harness {
    pub store: Arc<InMemoryDocumentStore>,
    pub clock: FixedClock,
    pub engine: Arc<ProjectionEngine>,
    pub reader: CachedDetailsReader,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_config(ProjectionConfig::default(), now)
    }

    pub fn with_config(config: ProjectionConfig, now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        let clock = FixedClock::new(now);
        let ctx = ProjectionContext::new(store.clone(), config).with_clock(Arc::new(clock.clone()));
        let reader = CachedDetailsReader::new(store.clone(), ctx.config.clone());
        let engine = Arc::new(ProjectionEngine::with_default_projectors(ctx));
        Self {
            store,
            clock,
            engine,
            reader,
        }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.engine.context().config
    }

    pub async fn register(&self, instructor: &str) -> DispatchReport {
        let event = InstructorCreated::new(instructor, "admin-1", ActorRole::Admin, self.clock_now());
        self.engine.dispatch(&event.into()).await.unwrap()
    }

    pub async fn dispatch(&self, session: DrivingSession) -> DispatchReport {
        self.engine.dispatch(&SourceEvent::from(session)).await.unwrap()
    }

    pub async fn students(&self, instructor: &str) -> InstructorStudentsDoc {
        self.reader
            .students_details(&InstructorId::new(instructor))
            .await
            .unwrap()
            .expect("students aggregate exists")
    }

    pub async fn profile(&self, instructor: &str) -> InstructorProfileDoc {
        self.reader
            .profile_details(&InstructorId::new(instructor))
            .await
            .unwrap()
            .expect("profile aggregate exists")
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use cim_domain_driving::Clock;
        self.clock.now()
    }
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 30, 0).unwrap()
}

pub fn lesson(instructor: &str, student: &str, number: u32, start: DateTime<Utc>) -> DrivingSession {
    DrivingSession::lesson(instructor, student, "v-1", number, LessonGrade::Three, start)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
