//! In-process activity log store for local runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::{ActivityLog, ActivityLogStore, DatabaseError, EndpointCount, EndpointLatency, NewActivityLog};

#[derive(Debug, Default)]
pub struct MemoryActivityLogStore {
    rows: RwLock<Vec<ActivityLog>>,
}

impl MemoryActivityLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ActivityLogStore for MemoryActivityLogStore {
    async fn insert(&self, entry: NewActivityLog) -> Result<ActivityLog, DatabaseError> {
        let mut rows = self.rows.write().await;

        // Keep creation times strictly increasing at database precision.
        let now = Utc::now();
        let created_at = match rows.last() {
            Some(last) if last.created_at >= now => last.created_at + Duration::microseconds(1),
            _ => now,
        };

        let row = ActivityLog {
            id: rows.len() as i64 + 1,
            endpoint: entry.endpoint,
            method: entry.method,
            user_agent: entry.user_agent,
            remote_ip: entry.remote_ip,
            response_status: entry.response_status,
            execution_time_ms: entry.execution_time_ms,
            request_body: entry.request_body,
            response_body: entry.response_body,
            created_at,
            updated_at: Some(created_at),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ActivityLog>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut recent: Vec<ActivityLog> = rows.iter().cloned().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn requests_per_endpoint_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<EndpointCount>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for row in rows.iter().filter(|row| row.created_at >= since) {
            *counts.entry(row.endpoint.as_str()).or_default() += 1;
        }

        let mut counts: Vec<EndpointCount> = counts
            .into_iter()
            .map(|(endpoint, requests)| EndpointCount {
                endpoint: endpoint.to_string(),
                requests,
            })
            .collect();
        // stable sort keeps endpoint order among ties
        counts.sort_by(|a, b| b.requests.cmp(&a.requests));
        Ok(counts)
    }

    async fn average_execution_time(&self) -> Result<Vec<EndpointLatency>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut totals: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
        for row in rows.iter() {
            if let Some(ms) = row.execution_time_ms {
                let entry = totals.entry(row.endpoint.as_str()).or_default();
                entry.0 += ms;
                entry.1 += 1;
            }
        }

        Ok(totals
            .into_iter()
            .map(|(endpoint, (sum, n))| EndpointLatency {
                endpoint: endpoint.to_string(),
                average_ms: sum as f64 / n as f64,
            })
            .collect())
    }
}
