// Copyright 2025 Cowboy AI, LLC.

//! Concurrent sessions for one instructor must not lose updates

mod common;

use common::{at, lesson, Harness};
use cim_domain_driving::{ProjectionConfig, StudentId};
use pretty_assertions::assert_eq;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_simultaneous_sessions_are_both_counted() {
    let h = Harness::new(at(2025, 3, 31));
    h.register("i-1").await;

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for (student, day) in [("s-1", 3), ("s-2", 4)] {
        let engine = h.engine.clone();
        let barrier = barrier.clone();
        let session = lesson("i-1", student, 1, at(2025, 3, day));
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.dispatch(&session.into()).await
        }));
    }
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report.all_applied(), "failed: {:?}", report.failed());
    }

    let students = h.students("i-1").await;
    assert_eq!(students.student_summary().len(), 2);
    assert_eq!(students.usage().len(), 2);
    assert_eq!(students.history().len(), 2);
    assert_eq!(h.profile("i-1").await.all_time_stats().total_lessons, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_concurrent_sessions_for_one_student_keep_exact_counts() {
    const SESSIONS: u32 = 24;
    let config = ProjectionConfig {
        max_conflict_retries: 256,
        ..ProjectionConfig::default()
    };
    let h = Harness::with_config(config, at(2025, 3, 31));
    h.register("i-1").await;

    let mut sessions: Vec<_> = (0..SESSIONS)
        .map(|n| {
            let day = 1 + n % 28;
            let month = if n % 2 == 0 { 2 } else { 3 };
            lesson("i-1", "s-1", n + 1, at(2025, month, day))
        })
        .collect();
    sessions.shuffle(&mut rand::thread_rng());

    let barrier = Arc::new(Barrier::new(SESSIONS as usize));
    let handles: Vec<_> = sessions
        .into_iter()
        .map(|session| {
            let engine = h.engine.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                engine.dispatch(&session.into()).await
            })
        })
        .collect();

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(report.all_applied(), "failed: {:?}", report.failed());
    }

    let students = h.students("i-1").await;
    let summary = students.summary_for(&StudentId::new("s-1")).unwrap();
    assert_eq!(summary.current_lessons_count, u64::from(SESSIONS));
    assert_eq!(students.student_summary().len(), 1);

    let per_month: Vec<(String, u64)> = h
        .reader
        .usage_for(&"i-1".into(), &StudentId::new("s-1"))
        .await
        .unwrap()
        .iter()
        .map(|u| (u.month.to_string(), u.total_lessons))
        .collect();
    assert_eq!(
        per_month,
        vec![
            ("2025-02".to_string(), u64::from(SESSIONS / 2)),
            ("2025-03".to_string(), u64::from(SESSIONS / 2)),
        ]
    );

    assert_eq!(students.history().len(), SESSIONS as usize);
    assert_eq!(
        h.profile("i-1").await.all_time_stats().total_lessons,
        u64::from(SESSIONS)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creation_deliveries_create_one_aggregate() {
    let h = Harness::new(at(2025, 3, 1));
    let created = cim_domain_driving::InstructorCreated::new(
        "i-1",
        "admin-1",
        cim_domain_driving::ActorRole::Admin,
        at(2025, 3, 1),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = h.engine.context().clone();
            let event = created.clone();
            tokio::spawn(async move {
                let engine = cim_domain_driving::ProjectionEngine::with_default_projectors(ctx);
                engine.dispatch(&event.into()).await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().all_applied());
    }

    assert_eq!(h.store.count(&h.config().profile_collection()).await, 1);
    assert_eq!(h.store.count(&h.config().students_collection()).await, 1);
}
