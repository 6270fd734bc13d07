//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use route_store::{OutboxMessage, RouteRecord, RouteStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after the command was applied and saved.
    pub aggregate: A,

    /// The events that were written to the outbox.
    pub events: Vec<A::Event>,

    /// The stored version after the command.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;

    /// Applies the command to the aggregate.
    ///
    /// On error the aggregate must be left unchanged.
    fn apply(
        self,
        aggregate: &mut Self::Aggregate,
    ) -> Result<(), <Self::Aggregate as Aggregate>::Error>;
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate record and its version from the store
/// 2. Applying the command, which buffers events on the aggregate
/// 3. Saving the new state and the drained events in one write, guarded by
///    the loaded version
pub struct CommandHandler<S, A>
where
    S: RouteStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: RouteStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        self.store
            .get(aggregate_id)
            .await?
            .map(Self::hydrate)
            .transpose()
    }

    /// Loads every aggregate stored for an order, newest first.
    pub async fn load_for_order(&self, order_id: &str) -> Result<Vec<A>, DomainError> {
        self.store
            .find_by_order(order_id)
            .await?
            .into_iter()
            .map(Self::hydrate)
            .collect()
    }

    /// Rebuilds an aggregate from its stored record.
    fn hydrate(record: RouteRecord) -> Result<A, DomainError> {
        let mut aggregate: A = serde_json::from_value(record.state)?;
        aggregate.set_version(record.version);
        Ok(aggregate)
    }

    /// Loads an aggregate, failing with `RouteNotFound` if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        self.load(aggregate_id)
            .await?
            .ok_or(DomainError::RouteNotFound(aggregate_id))
    }

    /// Persists a newly constructed aggregate together with its buffered events.
    pub async fn create(&self, mut aggregate: A) -> Result<CommandResult<A>, DomainError> {
        let events = aggregate.take_pending_events();
        let record = aggregate.to_record()?;
        let outbox = Self::build_outbox(aggregate.id(), &events)?;

        let new_version = self.store.insert(record, outbox).await?;
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Executes a command and persists the resulting state and events.
    ///
    /// Fails with a store concurrency conflict if the aggregate was saved by
    /// someone else after it was loaded here. Nothing is retried.
    pub async fn execute<C>(&self, command: C) -> Result<CommandResult<A>, DomainError>
    where
        C: Command<Aggregate = A>,
        DomainError: From<A::Error>,
    {
        let aggregate_id = command.aggregate_id();
        let mut aggregate = self.load_existing(aggregate_id).await?;
        let current_version = aggregate.version();

        command.apply(&mut aggregate)?;

        let events = aggregate.take_pending_events();
        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let record = aggregate.to_record()?;
        let outbox = Self::build_outbox(aggregate_id, &events)?;

        let new_version = self.store.update(record, current_version, outbox).await?;
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Builds outbox messages from domain events.
    fn build_outbox(
        aggregate_id: AggregateId,
        events: &[A::Event],
    ) -> Result<Vec<OutboxMessage>, DomainError> {
        let mut outbox = Vec::with_capacity(events.len());

        for event in events {
            let message = OutboxMessage::builder()
                .event_type(event.event_type())
                .route_id(aggregate_id)
                .occurred_at(event.occurred_at())
                .payload(event)?
                .try_build()
                .ok_or(DomainError::IncompleteOutboxMessage {
                    event_type: event.event_type(),
                })?;
            outbox.push(message);
        }

        Ok(outbox)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::route::{RouteError, StageState, StartStage, TaskRoute};
    use crate::template::default_templates;
    use chrono::{DateTime, Utc};
    use common::{OrderId, WaveId};
    use route_store::{InMemoryRouteStore, StoreError};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Created { at: DateTime<Utc> },
        Incremented { by: i32, at: DateTime<Utc> },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Created { .. } => "test.created",
                CounterEvent::Incremented { .. } => "test.incremented",
            }
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            match self {
                CounterEvent::Created { at } | CounterEvent::Incremented { at, .. } => *at,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        id: AggregateId,
        value: i32,
        #[serde(skip)]
        version: Version,
        #[serde(skip)]
        pending: Vec<CounterEvent>,
    }

    impl Counter {
        fn create() -> Self {
            Self {
                id: AggregateId::new(),
                value: 0,
                version: Version::initial(),
                pending: vec![CounterEvent::Created { at: Utc::now() }],
            }
        }
    }

    // Counters accept every increment
    impl From<Infallible> for DomainError {
        fn from(never: Infallible) -> Self {
            match never {}
        }
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Error = Infallible;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> AggregateId {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn to_record(&self) -> Result<RouteRecord, serde_json::Error> {
            RouteRecord::from_state(self.id, "ORD-1", "open", Utc::now(), self)
        }

        fn pending_events(&self) -> &[CounterEvent] {
            &self.pending
        }

        fn take_pending_events(&mut self) -> Vec<CounterEvent> {
            std::mem::take(&mut self.pending)
        }
    }

    struct Increment {
        id: AggregateId,
        by: i32,
    }

    impl Command for Increment {
        type Aggregate = Counter;

        fn aggregate_id(&self) -> AggregateId {
            self.id
        }

        fn apply(self, counter: &mut Counter) -> Result<(), Infallible> {
            if self.by != 0 {
                counter.value += self.by;
                counter.pending.push(CounterEvent::Incremented {
                    by: self.by,
                    at: Utc::now(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_inserts_state_and_outbox() {
        let store = InMemoryRouteStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        let result = handler.create(Counter::create()).await.unwrap();

        assert_eq!(result.new_version, Version::first());
        assert_eq!(result.aggregate.version(), Version::first());
        assert_eq!(result.events.len(), 1);
        assert!(result.aggregate.pending_events().is_empty());

        let outbox = store.outbox().await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].event_type, "test.created");
        assert_eq!(outbox[0].route_id, result.aggregate.id());
    }

    #[tokio::test]
    async fn test_execute_updates_aggregate() {
        let store = InMemoryRouteStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let id = handler.create(Counter::create()).await.unwrap().aggregate.id();

        let result = handler.execute(Increment { id, by: 5 }).await.unwrap();

        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.aggregate.value, 5);

        let loaded = handler.load_existing(id).await.unwrap();
        assert_eq!(loaded.value, 5);
        assert_eq!(loaded.version(), Version::new(2));
        assert_eq!(store.outbox().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_command_writes_nothing() {
        let store = InMemoryRouteStore::new();
        let handler: CommandHandler<_, TaskRoute> = CommandHandler::new(store.clone());
        let template = &default_templates()[0];
        let route = TaskRoute::new(
            OrderId::new("ORD-1"),
            WaveId::new("WAVE-1"),
            template,
            vec![],
            None,
        )
        .unwrap();
        let id = handler.create(route).await.unwrap().aggregate.id();

        // A stage cannot start before a worker is assigned
        let result = handler.execute(StartStage::new(id)).await;

        assert!(matches!(
            result,
            Err(DomainError::Route(RouteError::StageNotAssigned {
                state: StageState::Pending
            }))
        ));
        assert_eq!(
            handler.load_existing(id).await.unwrap().version(),
            Version::first()
        );
        assert_eq!(store.outbox().await.len(), 1);
    }

    #[tokio::test]
    async fn test_command_without_events_skips_write() {
        let store = InMemoryRouteStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let id = handler.create(Counter::create()).await.unwrap().aggregate.id();

        let result = handler.execute(Increment { id, by: 0 }).await.unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::first());
        assert_eq!(store.outbox().await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let handler: CommandHandler<_, Counter> = CommandHandler::new(InMemoryRouteStore::new());
        let id = AggregateId::new();

        assert!(handler.load(id).await.unwrap().is_none());
        assert!(matches!(
            handler.load_existing(id).await,
            Err(DomainError::RouteNotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn test_stale_save_is_a_conflict() {
        let store = InMemoryRouteStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let id = handler.create(Counter::create()).await.unwrap().aggregate.id();

        // Another writer loads, then this handler saves first
        let mut stale = handler.load_existing(id).await.unwrap();
        handler.execute(Increment { id, by: 1 }).await.unwrap();

        Increment { id, by: 2 }.apply(&mut stale).unwrap();
        let events = stale.take_pending_events();
        let outbox = CommandHandler::<InMemoryRouteStore, Counter>::build_outbox(id, &events)
            .unwrap();
        let result = store
            .update(stale.to_record().unwrap(), stale.version(), outbox)
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(handler.load_existing(id).await.unwrap().value, 1);
    }
}
