use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, MessageId, OutboxMessage, Result, RouteRecord, StoreError, Version,
    record::validate_outbox,
    store::{RouteStore, stamp_outbox},
};

/// PostgreSQL-backed route store implementation.
#[derive(Clone)]
pub struct PostgresRouteStore {
    pool: PgPool,
}

impl PostgresRouteStore {
    /// Creates a new PostgreSQL route store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_record(row: PgRow) -> Result<RouteRecord> {
        Ok(RouteRecord {
            route_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("route_id")?),
            order_id: row.try_get("order_id")?,
            status: row.try_get("status")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            state: row.try_get("state")?,
        })
    }

    fn row_to_message(row: PgRow) -> Result<OutboxMessage> {
        Ok(OutboxMessage {
            message_id: MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            route_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("route_id")?),
            route_version: Version::new(row.try_get("route_version")?),
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
            published_at: row.try_get("published_at")?,
        })
    }

    async fn insert_outbox(
        tx: &mut Transaction<'_, Postgres>,
        outbox: &[OutboxMessage],
    ) -> Result<()> {
        for message in outbox {
            sqlx::query(
                r#"
                INSERT INTO route_outbox (id, event_type, route_id, route_version, occurred_at, payload)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(message.message_id.as_uuid())
            .bind(&message.event_type)
            .bind(message.route_id.as_uuid())
            .bind(message.route_version.as_i64())
            .bind(message.occurred_at)
            .bind(&message.payload)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RouteStore for PostgresRouteStore {
    async fn insert(
        &self,
        record: RouteRecord,
        mut outbox: Vec<OutboxMessage>,
    ) -> Result<Version> {
        validate_outbox(record.route_id, &outbox).map_err(StoreError::InvalidOutbox)?;

        let version = Version::first();
        stamp_outbox(&mut outbox, version);

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO task_routes (route_id, order_id, status, version, created_at, updated_at, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (route_id) DO NOTHING
            "#,
        )
        .bind(record.route_id.as_uuid())
        .bind(&record.order_id)
        .bind(&record.status)
        .bind(version.as_i64())
        .bind(record.created_at)
        .bind(Utc::now())
        .bind(&record.state)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::DuplicateRoute(record.route_id));
        }

        Self::insert_outbox(&mut tx, &outbox).await?;

        tx.commit().await?;
        Ok(version)
    }

    async fn update(
        &self,
        record: RouteRecord,
        expected_version: Version,
        mut outbox: Vec<OutboxMessage>,
    ) -> Result<Version> {
        validate_outbox(record.route_id, &outbox).map_err(StoreError::InvalidOutbox)?;

        let route_id = record.route_id;
        let version = expected_version.next();
        stamp_outbox(&mut outbox, version);

        let mut tx = self.pool.begin().await?;

        // The version predicate makes the check-and-set a single statement
        let updated = sqlx::query(
            r#"
            UPDATE task_routes
            SET status = $2, version = $3, updated_at = $4, state = $5
            WHERE route_id = $1 AND version = $6
            "#,
        )
        .bind(route_id.as_uuid())
        .bind(&record.status)
        .bind(version.as_i64())
        .bind(Utc::now())
        .bind(&record.state)
        .bind(expected_version.as_i64())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM task_routes WHERE route_id = $1")
                    .bind(route_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;

            tracing::debug!(
                %route_id,
                expected = %expected_version,
                actual = ?actual,
                "Rejected stale route update"
            );

            return Err(match actual {
                Some(actual) => StoreError::ConcurrencyConflict {
                    route_id,
                    expected: expected_version,
                    actual: Version::new(actual),
                },
                None => StoreError::RouteNotFound(route_id),
            });
        }

        Self::insert_outbox(&mut tx, &outbox).await?;

        tx.commit().await?;
        Ok(version)
    }

    async fn get(&self, route_id: AggregateId) -> Result<Option<RouteRecord>> {
        let row = sqlx::query(
            r#"
            SELECT route_id, order_id, status, version, created_at, updated_at, state
            FROM task_routes
            WHERE route_id = $1
            "#,
        )
        .bind(route_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn find_by_order(&self, order_id: &str) -> Result<Vec<RouteRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT route_id, order_id, status, version, created_at, updated_at, state
            FROM task_routes
            WHERE order_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, route_id, route_version, occurred_at, payload, published_at
            FROM route_outbox
            WHERE published_at IS NULL
            ORDER BY position ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn mark_published(&self, message_ids: &[MessageId]) -> Result<()> {
        let ids: Vec<Uuid> = message_ids.iter().map(MessageId::as_uuid).collect();

        sqlx::query(
            r#"
            UPDATE route_outbox
            SET published_at = $2
            WHERE id = ANY($1) AND published_at IS NULL
            "#,
        )
        .bind(ids)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
