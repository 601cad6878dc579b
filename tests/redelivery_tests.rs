// Copyright 2025 Cowboy AI, LLC.

//! At-least-once delivery: redelivered source events must not double count

mod common;

use common::{at, lesson, Harness};
use cim_domain_driving::{
    ActorRole, AggregateIdStrategy, CachedAggregate, DocumentId, DocumentStore,
    InMemoryEventLog, InstructorCreated, InstructorStudentsDoc, ProjectionConfig, SourceEvent,
    StudentId,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn redelivered_creation_keeps_a_single_aggregate() {
    let h = Harness::new(at(2025, 2, 1));
    let created: SourceEvent =
        InstructorCreated::new("i-1", "admin-1", ActorRole::Admin, at(2025, 2, 1)).into();

    h.engine.dispatch(&created).await.unwrap();
    let again = h.engine.dispatch(&created).await.unwrap();

    assert!(again.skipped_redelivery);
    assert_eq!(h.store.count(&h.config().profile_collection()).await, 1);
    assert_eq!(h.store.count(&h.config().students_collection()).await, 1);
}

#[tokio::test]
async fn creation_redelivered_to_a_fresh_engine_is_a_no_op() {
    let h = Harness::new(at(2025, 2, 1));
    let created: SourceEvent =
        InstructorCreated::new("i-1", "admin-1", ActorRole::Admin, at(2025, 2, 1)).into();
    h.engine.dispatch(&created).await.unwrap();
    h.dispatch(lesson("i-1", "s-1", 1, at(2025, 2, 1))).await;

    // Same store, empty dedup cache: only the derived document ID protects the aggregate
    let restarted = cim_domain_driving::ProjectionEngine::with_default_projectors(
        h.engine.context().clone(),
    );
    let report = restarted.dispatch(&created).await.unwrap();

    assert!(!report.skipped_redelivery);
    assert!(report.all_applied());
    assert_eq!(h.store.count(&h.config().students_collection()).await, 1);
    assert_eq!(h.profile("i-1").await.all_time_stats().total_lessons, 1);
    assert_eq!(h.students("i-1").await.history().len(), 1);
}

#[tokio::test]
async fn random_ids_turn_redelivery_into_duplicates() {
    let config = ProjectionConfig {
        aggregate_id_strategy: AggregateIdStrategy::Random,
        ..ProjectionConfig::default()
    };
    let h = common::Harness::with_config(config.clone(), at(2025, 2, 1));
    let created: SourceEvent =
        InstructorCreated::new("i-1", "admin-1", ActorRole::Admin, at(2025, 2, 1)).into();
    h.engine.dispatch(&created).await.unwrap();

    let restarted = cim_domain_driving::ProjectionEngine::with_default_projectors(
        h.engine.context().clone(),
    );
    restarted.dispatch(&created).await.unwrap();
    assert_eq!(h.store.count(&config.profile_collection()).await, 2);

    let report = h.dispatch(lesson("i-1", "s-1", 1, at(2025, 2, 1))).await;
    assert_eq!(report.outcome("lesson-counter"), Some(false));
    assert_eq!(report.outcome("history-append"), Some(false));
}

#[tokio::test]
async fn redelivered_session_through_the_feed_is_counted_once() {
    let h = Harness::new(at(2025, 2, 28));
    let log = InMemoryEventLog::default();
    let feed = log.subscribe();
    let engine = h.engine.clone();
    let worker = tokio::spawn(async move { engine.run(feed).await });

    let created = InstructorCreated::new("i-1", "admin-1", ActorRole::Admin, at(2025, 2, 1));
    let created_id = created.id.clone();
    let session = lesson("i-1", "s-1", 1, at(2025, 2, 3));
    let session_id = session.id.clone();

    let events = h.config().new_instructor_events_collection();
    let sessions = h.config().driving_sessions_collection();
    log.append(&events, created.into()).await.unwrap();
    log.redeliver(&created_id).await.unwrap();
    log.append(&sessions, session.into()).await.unwrap();
    log.redeliver(&session_id).await.unwrap();
    log.redeliver(&session_id).await.unwrap();
    assert!(log.redeliver(&DocumentId::new("never-stored")).await.is_err());
    drop(log);

    assert_eq!(worker.await.unwrap(), 5);
    assert_eq!(h.engine.skipped_redeliveries(), 3);

    let students = h.students("i-1").await;
    assert_eq!(students.student_summary()[0].current_lessons_count, 1);
    assert_eq!(students.usage()[0].total_lessons, 1);
    assert_eq!(students.history().len(), 1);
    assert_eq!(h.profile("i-1").await.all_time_stats().total_lessons, 1);
}

#[tokio::test]
async fn partially_failed_session_is_not_marked_complete() {
    let h = Harness::new(at(2025, 2, 28));
    let session: SourceEvent = lesson("i-1", "s-1", 1, at(2025, 2, 3)).into();

    let first = h.engine.dispatch(&session).await.unwrap();
    assert!(!first.all_applied());

    h.register("i-1").await;
    let second = h.engine.dispatch(&session).await.unwrap();

    assert!(!second.skipped_redelivery);
    assert!(second.all_applied());
    assert_eq!(h.students("i-1").await.history().len(), 1);
}

#[tokio::test]
async fn redelivery_after_partial_failure_skips_applied_projectors() {
    let h = Harness::new(at(2025, 2, 28));
    let collection = h.config().students_collection();
    let students = serde_json::to_value(InstructorStudentsDoc::empty("i-1".into())).unwrap();
    h.store
        .create(&collection, &DocumentId::derived(&collection, "i-1"), students)
        .await
        .unwrap();

    let session: SourceEvent = lesson("i-1", "s-1", 1, at(2025, 2, 3)).into();
    let first = h.engine.dispatch(&session).await.unwrap();
    assert_eq!(first.failed(), vec!["lesson-counter"]);

    // The profile shows up later; the students aggregate is left as it was
    h.register("i-1").await;
    let second = h.engine.dispatch(&session).await.unwrap();
    assert!(second.all_applied());
    assert_eq!(second.outcomes.len(), 1);

    let students = h.students("i-1").await;
    assert_eq!(
        students.summary_for(&StudentId::new("s-1")).unwrap().current_lessons_count,
        1
    );
    assert_eq!(students.usage().len(), 1);
    assert_eq!(students.usage()[0].total_lessons, 1);
    assert_eq!(students.history().len(), 1);
    assert_eq!(h.profile("i-1").await.all_time_stats().total_lessons, 1);

    assert!(h.engine.dispatch(&session).await.unwrap().skipped_redelivery);
}
