use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Unique identifier for an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a message ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version of a stored route, used for optimistic concurrency control.
///
/// A route that has never been saved is at version 0. The first insert
/// stores version 1 and every successful update increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version of a route that has not been persisted yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version stored by the first insert.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// The persisted form of a task route.
///
/// The store only understands the columns it indexes on; the full aggregate
/// lives in `state` as JSON and is owned by the routing crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    /// The route this record belongs to.
    pub route_id: AggregateId,

    /// Order the route fulfils. Secondary lookup key.
    pub order_id: String,

    /// Overall route status, denormalized for querying.
    pub status: String,

    /// Version of the record. Assigned by the store on write.
    pub version: Version,

    /// When the route was created.
    pub created_at: DateTime<Utc>,

    /// When the route was last written.
    pub updated_at: DateTime<Utc>,

    /// The serialized aggregate.
    pub state: serde_json::Value,
}

impl RouteRecord {
    /// Creates a record from a serializable aggregate.
    pub fn from_state<T: Serialize>(
        route_id: AggregateId,
        order_id: impl Into<String>,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
        state: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self {
            route_id,
            order_id: order_id.into(),
            status: status.into(),
            version: Version::initial(),
            created_at,
            updated_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }
}

/// A domain event waiting in the outbox for delivery to the message bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Unique identifier, used by consumers to drop duplicate deliveries.
    pub message_id: MessageId,

    /// The durable event type string (e.g. "wms.wes.stage-started").
    pub event_type: String,

    /// The route that produced the event.
    pub route_id: AggregateId,

    /// Version of the route record written together with this message.
    pub route_version: Version,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// When the relay confirmed delivery. None while pending.
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Creates a new outbox message builder.
    pub fn builder() -> OutboxMessageBuilder {
        OutboxMessageBuilder::default()
    }

    /// Returns true if the message still awaits delivery.
    pub fn is_pending(&self) -> bool {
        self.published_at.is_none()
    }
}

/// Builder for constructing outbox messages.
#[derive(Debug, Default)]
pub struct OutboxMessageBuilder {
    message_id: Option<MessageId>,
    event_type: Option<String>,
    route_id: Option<AggregateId>,
    occurred_at: Option<DateTime<Utc>>,
    payload: Option<serde_json::Value>,
}

impl OutboxMessageBuilder {
    /// Sets the message ID. If not set, a new ID will be generated.
    pub fn message_id(mut self, id: MessageId) -> Self {
        self.message_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the route ID.
    pub fn route_id(mut self, id: AggregateId) -> Self {
        self.route_id = Some(id);
        self
    }

    /// Sets when the event occurred. If not set, the current time will be used.
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builds the message, returning None if a required field is missing.
    ///
    /// The route version is stamped by the store when the batch is written.
    pub fn try_build(self) -> Option<OutboxMessage> {
        Some(OutboxMessage {
            message_id: self.message_id.unwrap_or_default(),
            event_type: self.event_type?,
            route_id: self.route_id?,
            route_version: Version::initial(),
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            payload: self.payload?,
            published_at: None,
        })
    }
}

/// Checks that every message in an outbox batch belongs to the given route.
pub(crate) fn validate_outbox(
    route_id: AggregateId,
    outbox: &[OutboxMessage],
) -> std::result::Result<(), String> {
    if let Some(stray) = outbox.iter().find(|m| m.route_id != route_id) {
        return Err(format!(
            "message {} belongs to route {}, not {}",
            stray.message_id, stray.route_id, route_id
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        assert!(Version::new(1) < Version::new(2));
        assert_eq!(Version::initial().next(), Version::first());
    }

    #[test]
    fn builder_requires_event_type_route_and_payload() {
        assert!(OutboxMessage::builder().try_build().is_none());

        let missing_payload = OutboxMessage::builder()
            .event_type("wms.wes.route-created")
            .route_id(AggregateId::new())
            .try_build();
        assert!(missing_payload.is_none());
    }

    #[test]
    fn builder_fills_defaults() {
        let route_id = AggregateId::new();
        let message = OutboxMessage::builder()
            .event_type("wms.wes.route-created")
            .route_id(route_id)
            .payload_raw(serde_json::json!({"orderId": "ORD-1"}))
            .try_build()
            .unwrap();

        assert_eq!(message.route_id, route_id);
        assert_eq!(message.route_version, Version::initial());
        assert!(message.is_pending());
    }

    #[test]
    fn validate_outbox_rejects_foreign_messages() {
        let route_id = AggregateId::new();
        let foreign = OutboxMessage::builder()
            .event_type("wms.wes.stage-started")
            .route_id(AggregateId::new())
            .payload_raw(serde_json::json!({}))
            .try_build()
            .unwrap();

        assert!(validate_outbox(route_id, &[]).is_ok());
        assert!(validate_outbox(route_id, &[foreign]).is_err());
    }

    #[test]
    fn record_from_state_starts_unversioned() {
        let record = RouteRecord::from_state(
            AggregateId::new(),
            "ORD-1",
            "pending",
            Utc::now(),
            &serde_json::json!({"stages": []}),
        )
        .unwrap();

        assert_eq!(record.version, Version::initial());
        assert_eq!(record.order_id, "ORD-1");
    }
}
