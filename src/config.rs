// Copyright 2025 Cowboy AI, LLC.

//! Projection engine configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const ADMIN_APP_COLL: &str = "admin-app-collection";
const ADMIN_READONLY_COLL: &str = "readonly-coll";
const ADMIN_READONLY_DETAILS_DOC: &str = "details-collections";
const ADMIN_WRITEONLY_COLL: &str = "writeonly-coll";
const ADMIN_WRITEONLY_SYSTEM_DOC: &str = "system-collections";

const INSTRUCTOR_DETAILS_PROFILE: &str = "instructor-details-profile";
const INSTRUCTOR_DETAILS_STUDENTS: &str = "instructor-details-students";
const EVENT_NEW_INSTRUCTOR: &str = "event-new-instructor";
const DRIVING_TRAINING_SESSION: &str = "driving-training-session";

/// How the cache initializer picks the ID of a new cached aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateIdStrategy {
    /// ID derived from `(collection, instructorId)`; redelivered creation events are no-ops
    #[default]
    Deterministic,
    /// Fresh random ID per invocation; redelivery creates duplicate aggregates
    Random,
}

impl FromStr for AggregateIdStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deterministic" => Ok(AggregateIdStrategy::Deterministic),
            "random" => Ok(AggregateIdStrategy::Random),
            other => bail!("unknown aggregate id strategy '{other}'"),
        }
    }
}

/// Configuration for the projection engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Tenant root of every collection path
    pub driving_school_id: String,

    /// Length of the rolling usage window in calendar months
    pub usage_window_months: u32,

    /// Retries for optimistic read-modify-write before giving up
    pub max_conflict_retries: u32,

    /// ID allocation for cached aggregates
    pub aggregate_id_strategy: AggregateIdStrategy,

    /// Source documents remembered for redelivery suppression
    pub dedup_capacity: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            driving_school_id: "default-school".to_string(),
            usage_window_months: 6,
            max_conflict_retries: 5,
            aggregate_id_strategy: AggregateIdStrategy::Deterministic,
            dedup_capacity: 1024,
        }
    }
}

impl ProjectionConfig {
    /// Load configuration from environment variables, defaulting anything unset
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(school) = std::env::var("DRIVING_SCHOOL_ID") {
            config.driving_school_id = school;
        }
        if let Ok(raw) = std::env::var("CACHE_USAGE_WINDOW_MONTHS") {
            config.usage_window_months = raw
                .parse()
                .with_context(|| format!("CACHE_USAGE_WINDOW_MONTHS is not a number: {raw}"))?;
        }
        if let Ok(raw) = std::env::var("CACHE_MAX_CONFLICT_RETRIES") {
            config.max_conflict_retries = raw
                .parse()
                .with_context(|| format!("CACHE_MAX_CONFLICT_RETRIES is not a number: {raw}"))?;
        }
        if let Ok(raw) = std::env::var("CACHE_AGGREGATE_ID_STRATEGY") {
            config.aggregate_id_strategy = raw
                .parse()
                .context("CACHE_AGGREGATE_ID_STRATEGY must be 'deterministic' or 'random'")?;
        }
        if let Ok(raw) = std::env::var("CACHE_DEDUP_CAPACITY") {
            config.dedup_capacity = raw
                .parse()
                .with_context(|| format!("CACHE_DEDUP_CAPACITY is not a number: {raw}"))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.driving_school_id.is_empty() {
            bail!("driving_school_id must not be empty");
        }
        if self.usage_window_months == 0 {
            bail!("usage_window_months must be at least 1");
        }
        if self.dedup_capacity == 0 {
            bail!("dedup_capacity must be at least 1");
        }
        Ok(())
    }

    fn path(&self, parts: &[&str]) -> String {
        let mut segments = vec![ADMIN_APP_COLL, self.driving_school_id.as_str()];
        segments.extend_from_slice(parts);
        segments.join("/")
    }

    /// Cached instructor profile aggregates
    pub fn profile_collection(&self) -> String {
        self.path(&[
            ADMIN_READONLY_COLL,
            ADMIN_READONLY_DETAILS_DOC,
            INSTRUCTOR_DETAILS_PROFILE,
        ])
    }

    /// Cached instructor students aggregates
    pub fn students_collection(&self) -> String {
        self.path(&[
            ADMIN_READONLY_COLL,
            ADMIN_READONLY_DETAILS_DOC,
            INSTRUCTOR_DETAILS_STUDENTS,
        ])
    }

    /// Instructor creation events
    pub fn new_instructor_events_collection(&self) -> String {
        self.path(&[
            ADMIN_WRITEONLY_COLL,
            ADMIN_WRITEONLY_SYSTEM_DOC,
            EVENT_NEW_INSTRUCTOR,
        ])
    }

    /// Driving session source documents
    pub fn driving_sessions_collection(&self) -> String {
        self.path(&[
            ADMIN_WRITEONLY_COLL,
            ADMIN_WRITEONLY_SYSTEM_DOC,
            DRIVING_TRAINING_SESSION,
        ])
    }
}
