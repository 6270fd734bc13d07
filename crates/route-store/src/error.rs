use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when interacting with the route store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored route moved on since the caller loaded it.
    #[error(
        "Concurrency conflict for route {route_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        route_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The route was not found in the store.
    #[error("Route not found: {0}")]
    RouteNotFound(AggregateId),

    /// A route with this ID has already been inserted.
    #[error("Route already exists: {0}")]
    DuplicateRoute(AggregateId),

    /// The outbox batch does not belong to the record being written.
    #[error("Invalid outbox batch: {0}")]
    InvalidOutbox(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for route store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
