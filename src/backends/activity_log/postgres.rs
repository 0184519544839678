//! PostgreSQL activity log store on a `sqlx` pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::{ActivityLog, ActivityLogStore, DatabaseError, EndpointCount, EndpointLatency, NewActivityLog};
use crate::config::DatabaseConfig;
use crate::observability::metrics::record_backend_failure;
use crate::resilience::timeouts::with_deadline;

pub struct PgActivityLogStore {
    pool: PgPool,
    deadline: Duration,
}

impl PgActivityLogStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    /// Open a pool and optionally apply the embedded migrations.
    pub async fn connect(config: &DatabaseConfig, deadline: Duration) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(deadline)
            .connect(&config.url)
            .await?;

        if config.run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");
        }

        Ok(Self::new(pool, deadline))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, DatabaseError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let result = with_deadline(self.deadline, async { fut.await.map_err(DatabaseError::from) }).await;
        if result.is_err() {
            record_backend_failure("postgres");
        }
        result
    }
}

#[async_trait]
impl ActivityLogStore for PgActivityLogStore {
    async fn insert(&self, entry: NewActivityLog) -> Result<ActivityLog, DatabaseError> {
        let row = self
            .bounded(
                sqlx::query_as::<_, ActivityLog>(
                    "INSERT INTO activity_logs \
                     (endpoint, method, user_agent, remote_ip, response_status, \
                      execution_time_ms, request_body, response_body) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                     RETURNING *",
                )
                .bind(&entry.endpoint)
                .bind(&entry.method)
                .bind(&entry.user_agent)
                .bind(&entry.remote_ip)
                .bind(entry.response_status)
                .bind(entry.execution_time_ms)
                .bind(&entry.request_body)
                .bind(&entry.response_body)
                .fetch_one(&self.pool),
            )
            .await?;

        tracing::debug!(id = row.id, endpoint = %row.endpoint, "Activity log stored");
        Ok(row)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ActivityLog>, DatabaseError> {
        self.bounded(
            sqlx::query_as::<_, ActivityLog>(
                "SELECT * FROM activity_logs ORDER BY created_at DESC, id DESC LIMIT $1",
            )
            .bind(limit as i64)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn requests_per_endpoint_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<EndpointCount>, DatabaseError> {
        self.bounded(
            sqlx::query_as::<_, EndpointCount>(
                "SELECT endpoint, COUNT(*) AS requests FROM activity_logs \
                 WHERE created_at >= $1 \
                 GROUP BY endpoint ORDER BY requests DESC, endpoint",
            )
            .bind(since)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn average_execution_time(&self) -> Result<Vec<EndpointLatency>, DatabaseError> {
        self.bounded(
            sqlx::query_as::<_, EndpointLatency>(
                "SELECT endpoint, AVG(execution_time_ms)::DOUBLE PRECISION AS average_ms \
                 FROM activity_logs WHERE execution_time_ms IS NOT NULL \
                 GROUP BY endpoint ORDER BY endpoint",
            )
            .fetch_all(&self.pool),
        )
        .await
    }
}
