use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    AggregateId, MessageId, OutboxMessage, Result, RouteRecord, StoreError, Version,
    record::validate_outbox,
    store::{RouteStore, stamp_outbox},
};

#[derive(Default)]
struct Inner {
    routes: HashMap<AggregateId, RouteRecord>,
    outbox: Vec<OutboxMessage>,
}

/// In-memory route store implementation.
///
/// Routes and the outbox share a single lock, which gives the same
/// all-or-nothing write semantics as the PostgreSQL transaction.
#[derive(Clone, Default)]
pub struct InMemoryRouteStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRouteStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored routes.
    pub async fn route_count(&self) -> usize {
        self.inner.read().await.routes.len()
    }

    /// Returns every outbox message ever written, delivered or not.
    pub async fn outbox(&self) -> Vec<OutboxMessage> {
        self.inner.read().await.outbox.clone()
    }

    /// Clears all routes and outbox messages.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.routes.clear();
        inner.outbox.clear();
    }
}

#[async_trait]
impl RouteStore for InMemoryRouteStore {
    async fn insert(
        &self,
        mut record: RouteRecord,
        mut outbox: Vec<OutboxMessage>,
    ) -> Result<Version> {
        validate_outbox(record.route_id, &outbox).map_err(StoreError::InvalidOutbox)?;

        let mut inner = self.inner.write().await;
        if inner.routes.contains_key(&record.route_id) {
            return Err(StoreError::DuplicateRoute(record.route_id));
        }

        let version = Version::first();
        record.version = version;
        record.updated_at = Utc::now();
        stamp_outbox(&mut outbox, version);

        inner.routes.insert(record.route_id, record);
        inner.outbox.extend(outbox);

        Ok(version)
    }

    async fn update(
        &self,
        mut record: RouteRecord,
        expected_version: Version,
        mut outbox: Vec<OutboxMessage>,
    ) -> Result<Version> {
        validate_outbox(record.route_id, &outbox).map_err(StoreError::InvalidOutbox)?;

        let route_id = record.route_id;
        let mut inner = self.inner.write().await;

        let current = inner
            .routes
            .get(&route_id)
            .map(|r| r.version)
            .ok_or(StoreError::RouteNotFound(route_id))?;

        if current != expected_version {
            tracing::debug!(
                %route_id,
                expected = %expected_version,
                actual = %current,
                "Rejected stale route update"
            );
            return Err(StoreError::ConcurrencyConflict {
                route_id,
                expected: expected_version,
                actual: current,
            });
        }

        let version = current.next();
        record.version = version;
        record.updated_at = Utc::now();
        stamp_outbox(&mut outbox, version);

        inner.routes.insert(route_id, record);
        inner.outbox.extend(outbox);

        Ok(version)
    }

    async fn get(&self, route_id: AggregateId) -> Result<Option<RouteRecord>> {
        Ok(self.inner.read().await.routes.get(&route_id).cloned())
    }

    async fn find_by_order(&self, order_id: &str) -> Result<Vec<RouteRecord>> {
        let inner = self.inner.read().await;
        let mut routes: Vec<_> = inner
            .routes
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(routes)
    }

    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let inner = self.inner.read().await;
        Ok(inner
            .outbox
            .iter()
            .filter(|m| m.is_pending())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_published(&self, message_ids: &[MessageId]) -> Result<()> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        for message in inner
            .outbox
            .iter_mut()
            .filter(|m| m.is_pending() && message_ids.contains(&m.message_id))
        {
            message.published_at = Some(now);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let _inner = self.inner.read().await;
        Ok(())
    }
}
