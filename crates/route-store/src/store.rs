use async_trait::async_trait;

use crate::{AggregateId, MessageId, OutboxMessage, Result, RouteRecord, StoreError, Version};

/// Core trait for task route persistence.
///
/// Implementations must serialize writers per route: every update names the
/// version it was derived from and is rejected if the stored version has
/// moved on. The record and its outbox batch are written atomically.
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Inserts a new route together with its outbox batch.
    ///
    /// Fails with `DuplicateRoute` if the route ID is already stored.
    /// Returns the stored version, which is always `Version::first()`.
    async fn insert(&self, record: RouteRecord, outbox: Vec<OutboxMessage>) -> Result<Version>;

    /// Replaces a stored route and appends its outbox batch.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version is not
    /// `expected_version`. Returns the new version.
    async fn update(
        &self,
        record: RouteRecord,
        expected_version: Version,
        outbox: Vec<OutboxMessage>,
    ) -> Result<Version>;

    /// Retrieves a route by ID.
    async fn get(&self, route_id: AggregateId) -> Result<Option<RouteRecord>>;

    /// Retrieves every route created for an order, newest first.
    async fn find_by_order(&self, order_id: &str) -> Result<Vec<RouteRecord>>;

    /// Retrieves undelivered outbox messages in the order they were written.
    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>>;

    /// Marks outbox messages as delivered. Unknown IDs are ignored.
    async fn mark_published(&self, message_ids: &[MessageId]) -> Result<()>;

    /// Checks that the backing storage can serve requests.
    async fn ping(&self) -> Result<()>;
}

/// Extension trait providing convenience methods for route stores.
#[async_trait]
pub trait RouteStoreExt: RouteStore {
    /// Retrieves a route, failing with `RouteNotFound` if it doesn't exist.
    async fn get_existing(&self, route_id: AggregateId) -> Result<RouteRecord> {
        self.get(route_id)
            .await?
            .ok_or(StoreError::RouteNotFound(route_id))
    }

    /// Retrieves the most recent route created for an order.
    async fn latest_for_order(&self, order_id: &str) -> Result<Option<RouteRecord>> {
        Ok(self.find_by_order(order_id).await?.into_iter().next())
    }
}

// Blanket implementation for all RouteStore implementations
impl<T: RouteStore + ?Sized> RouteStoreExt for T {}

/// Stamps an outbox batch with the route version it was written with.
pub(crate) fn stamp_outbox(outbox: &mut [OutboxMessage], version: Version) {
    for message in outbox {
        message.route_version = version;
    }
}
