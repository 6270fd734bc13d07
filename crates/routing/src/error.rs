//! Domain error types.

use common::AggregateId;
use route_store::StoreError;
use thiserror::Error;

use crate::route::RouteError;
use crate::template::TemplateError;

/// Errors that can occur during routing operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the route store.
    #[error("Route store error: {0}")]
    Store(#[from] StoreError),

    /// The route rejected the transition.
    #[error("Route error: {0}")]
    Route(#[from] RouteError),

    /// Template registration or selection failed.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Route not found.
    #[error("Route not found: {0}")]
    RouteNotFound(AggregateId),

    /// An event could not be turned into an outbox message.
    #[error("Incomplete outbox message for event {event_type}")]
    IncompleteOutboxMessage { event_type: &'static str },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the store rejected a save because the route changed
    /// after it was loaded.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, DomainError::Store(StoreError::ConcurrencyConflict { .. }))
    }

    /// Returns true if the route does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::RouteNotFound(_) | DomainError::Store(StoreError::RouteNotFound(_))
        )
    }
}
