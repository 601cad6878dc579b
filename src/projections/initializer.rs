// Copyright 2025 Cowboy AI, LLC.

//! Creates the empty cached aggregate of a newly registered instructor

use super::{ProjectionContext, Projector};
use crate::config::AggregateIdStrategy;
use crate::errors::{ProjectionError, ProjectionResult};
use crate::events::{DomainEvent, SourceEvent};
use crate::identifiers::DocumentId;
use crate::infrastructure::CreateOutcome;
use crate::markers::DOC_ID;
use crate::read_models::CachedAggregate;
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, info};

/// Initializer for one cached aggregate type
///
/// With [`AggregateIdStrategy::Deterministic`] the document ID is derived from the
/// collection and the instructor, so a redelivered creation event finds the existing
/// document and succeeds without writing.
pub struct CacheInitializer<T> {
    ctx: ProjectionContext,
    _aggregate: PhantomData<fn() -> T>,
}

impl<T: CachedAggregate> CacheInitializer<T> {
    /// Create an initializer writing through `ctx`
    pub fn new(ctx: ProjectionContext) -> Self {
        Self {
            ctx,
            _aggregate: PhantomData,
        }
    }

    fn document_id(&self, collection: &str, owner: &str) -> DocumentId {
        match self.ctx.config.aggregate_id_strategy {
            AggregateIdStrategy::Deterministic => DocumentId::derived(collection, owner),
            AggregateIdStrategy::Random => DocumentId::generate(),
        }
    }
}

#[async_trait]
impl<T: CachedAggregate + 'static> Projector for CacheInitializer<T> {
    fn name(&self) -> &'static str {
        T::INITIALIZER
    }

    fn handles(&self, event: &SourceEvent) -> bool {
        event.as_instructor_created().is_some()
    }

    async fn project(&self, event: &SourceEvent) -> ProjectionResult<()> {
        let created = event.as_instructor_created().ok_or_else(|| {
            ProjectionError::InvalidEvent(format!(
                "{} cannot initialize from {}",
                self.name(),
                event.event_type()
            ))
        })?;

        let collection = T::collection(&self.ctx.config);
        let id = self.document_id(&collection, created.instructor_id.as_str());

        let mut body = serde_json::to_value(T::empty(created.instructor_id.clone()))?;
        if let Value::Object(fields) = &mut body {
            fields.insert(DOC_ID.to_string(), Value::from(id.as_str()));
        }

        info!(
            instructor_id = %created.instructor_id,
            model = T::model_type(),
            "Creating cached document"
        );
        let outcome = self
            .ctx
            .store
            .create(&collection, &id, body)
            .await
            .map_err(|e| ProjectionError::write_failure(&collection, id.as_str(), e))?;

        match outcome {
            CreateOutcome::Created => {
                debug!(document_id = %id, "Created cached document");
            }
            CreateOutcome::AlreadyExists => {
                info!(document_id = %id, "Cached document already exists, nothing to do");
            }
        }
        Ok(())
    }
}
