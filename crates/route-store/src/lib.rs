//! Persistence boundary for task routes.
//!
//! A route is stored as a versioned JSON record keyed by route ID. Every write
//! carries the domain events produced by the mutation and stores them in an
//! outbox within the same transaction, so state and events are never observed
//! apart. Writes are guarded by optimistic version checks.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::AggregateId;
pub use error::{Result, StoreError};
pub use memory::InMemoryRouteStore;
pub use postgres::PostgresRouteStore;
pub use record::{MessageId, OutboxMessage, OutboxMessageBuilder, RouteRecord, Version};
pub use store::{RouteStore, RouteStoreExt};
