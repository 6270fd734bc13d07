//! Core aggregate and domain event traits.

use chrono::{DateTime, Utc};
use common::AggregateId;
use route_store::{RouteRecord, Version};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense. The event type string is a
/// durable contract with downstream consumers and must never change.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name used on the message bus.
    fn event_type(&self) -> &'static str;

    /// Returns when the event happened.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Trait for aggregates persisted as versioned records.
///
/// An aggregate mutates itself through its own operations and buffers the
/// events those operations produce. Whoever saves the aggregate drains the
/// buffer and writes it to the outbox in the same transaction as the state.
pub trait Aggregate: Serialize + DeserializeOwned + Send + Sync + Sized {
    /// The type of events this aggregate produces.
    type Event: DomainEvent;

    /// The type of errors this aggregate's operations can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's unique identifier.
    fn id(&self) -> AggregateId;

    /// Returns the version the aggregate was loaded at.
    ///
    /// `Version::initial()` for an aggregate that was never saved.
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    ///
    /// Called by the command handler after loading or saving.
    fn set_version(&mut self, version: Version);

    /// Builds the persisted record for the current state.
    fn to_record(&self) -> Result<RouteRecord, serde_json::Error>;

    /// Returns the events produced since the buffer was last drained.
    fn pending_events(&self) -> &[Self::Event];

    /// Drains the event buffer.
    fn take_pending_events(&mut self) -> Vec<Self::Event>;

    /// Discards buffered events without returning them.
    fn clear_pending_events(&mut self) {
        self.take_pending_events();
    }
}
