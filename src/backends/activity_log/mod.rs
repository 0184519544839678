//! Relational audit trail of API activity.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::timeouts::DeadlineExceeded;

pub use memory::MemoryActivityLogStore;
pub use postgres::PgActivityLogStore;

/// Errors from the relational store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error("{0}")]
    Backend(String),
}

/// A persisted `activity_logs` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: i64,
    pub endpoint: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub remote_ip: Option<String>,
    pub response_status: i32,
    pub execution_time_ms: Option<i64>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields of a new row. Id and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewActivityLog {
    pub endpoint: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub remote_ip: Option<String>,
    pub response_status: i32,
    pub execution_time_ms: Option<i64>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
}

impl NewActivityLog {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>, response_status: i32) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            response_status,
            ..Self::default()
        }
    }

    pub fn user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn remote_ip(mut self, remote_ip: impl Into<String>) -> Self {
        self.remote_ip = Some(remote_ip.into());
        self
    }

    pub fn execution_time_ms(mut self, ms: i64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct EndpointCount {
    pub endpoint: String,
    pub requests: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct EndpointLatency {
    pub endpoint: String,
    pub average_ms: f64,
}

#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn insert(&self, entry: NewActivityLog) -> Result<ActivityLog, DatabaseError>;

    /// Newest rows first (`created_at` desc, then `id` desc).
    async fn recent(&self, limit: usize) -> Result<Vec<ActivityLog>, DatabaseError>;

    /// Row count per endpoint created at or after `since`, busiest first.
    async fn requests_per_endpoint_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<EndpointCount>, DatabaseError>;

    /// Mean `execution_time_ms` per endpoint, ignoring rows without one.
    async fn average_execution_time(&self) -> Result<Vec<EndpointLatency>, DatabaseError>;
}
