//! Metrics, sessions and events in the document store.
//!
//! Timestamps are stored as RFC 3339 UTC strings with millisecond precision
//! so that lexical order matches chronological order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::backends::{Direction, Document, DocumentError, DocumentStore, Filter, Query};
use crate::observability::metrics::record_backend_failure;
use crate::resilience::timeouts::with_deadline;

pub const METRICS_COLLECTION: &str = "application_metrics";
pub const SESSIONS_COLLECTION: &str = "user_sessions";
pub const EVENTS_COLLECTION: &str = "application_events";

const METRICS_PAGE: usize = 100;

/// Counters shown by the stats endpoint. A counter that could not be
/// computed is omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_sessions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_events: Option<u64>,
}

pub struct FirestoreService {
    store: Arc<dyn DocumentStore>,
    environment: String,
    deadline: Duration,
}

impl FirestoreService {
    pub fn new(store: Arc<dyn DocumentStore>, environment: impl Into<String>, deadline: Duration) -> Self {
        Self {
            store,
            environment: environment.into(),
            deadline,
        }
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, DocumentError>
    where
        F: Future<Output = Result<T, DocumentError>>,
    {
        let result = with_deadline(self.deadline, fut).await;
        if result.is_err() {
            record_backend_failure("firestore");
        }
        result
    }

    /// Store one metric sample. Returns the document id.
    pub async fn save_metric(
        &self,
        metric_name: &str,
        value: Value,
        tags: Map<String, Value>,
    ) -> Result<String, DocumentError> {
        let mut doc = Document::new();
        doc.insert("metric_name".into(), json!(metric_name));
        doc.insert("value".into(), value);
        doc.insert("tags".into(), Value::Object(tags));
        doc.insert("timestamp".into(), json!(now()));
        doc.insert("environment".into(), json!(self.environment));

        let id = document_id(metric_name);
        self.call(self.store.upsert(METRICS_COLLECTION, &id, doc)).await?;
        tracing::info!(metric = metric_name, id = %id, "Metric saved");
        Ok(id)
    }

    /// Newest samples of `metric_name`, at most 100.
    pub async fn metrics_by_name(&self, metric_name: &str) -> Result<Vec<Document>, DocumentError> {
        let query = Query::new()
            .filter(Filter::eq("metric_name", metric_name))
            .order_by("timestamp", Direction::Descending)
            .limit(METRICS_PAGE);
        self.call(self.store.query(METRICS_COLLECTION, &query)).await
    }

    /// Record a new active session keyed by `session_id`.
    pub async fn save_session(
        &self,
        session_id: &str,
        user_agent: Option<&str>,
        remote_ip: &str,
    ) -> Result<(), DocumentError> {
        let started = now();
        let mut doc = Document::new();
        doc.insert("session_id".into(), json!(session_id));
        doc.insert("user_agent".into(), json!(user_agent));
        doc.insert("remote_ip".into(), json!(remote_ip));
        doc.insert("start_time".into(), json!(started));
        doc.insert("last_activity".into(), json!(started));
        doc.insert("active".into(), json!(true));

        self.call(self.store.upsert(SESSIONS_COLLECTION, session_id, doc)).await?;
        tracing::info!(session_id, "Session saved");
        Ok(())
    }

    /// Mark a session inactive. Fails with `NotFound` for unknown ids.
    pub async fn close_session(&self, session_id: &str) -> Result<(), DocumentError> {
        let mut updates = Document::new();
        updates.insert("end_time".into(), json!(now()));
        updates.insert("active".into(), json!(false));

        self.call(self.store.update(SESSIONS_COLLECTION, session_id, updates)).await?;
        tracing::info!(session_id, "Session closed");
        Ok(())
    }

    /// Store an application event. Returns the document id.
    pub async fn save_event(
        &self,
        event_type: &str,
        description: &str,
        metadata: Map<String, Value>,
    ) -> Result<String, DocumentError> {
        let mut doc = Document::new();
        doc.insert("event_type".into(), json!(event_type));
        doc.insert("description".into(), json!(description));
        doc.insert("metadata".into(), Value::Object(metadata));
        doc.insert("timestamp".into(), json!(now()));
        doc.insert("environment".into(), json!(self.environment));

        let id = document_id(event_type);
        self.call(self.store.upsert(EVENTS_COLLECTION, &id, doc)).await?;
        tracing::info!(event_type, id = %id, "Event saved");
        Ok(id)
    }

    pub async fn recent_events(&self, limit: usize) -> Result<Vec<Document>, DocumentError> {
        let query = Query::new()
            .order_by("timestamp", Direction::Descending)
            .limit(limit);
        self.call(self.store.query(EVENTS_COLLECTION, &query)).await
    }

    /// Active session count and number of events since midnight UTC.
    ///
    /// Never fails: if either count errors, the stats come back empty and
    /// the failure is logged.
    pub async fn application_stats(&self) -> ApplicationStats {
        let counts = async {
            let active = Filter::eq("active", true);
            let active_sessions = self
                .call(self.store.count(SESSIONS_COLLECTION, Some(&active)))
                .await?;

            let today = Filter::gte("timestamp", Utc::now().date_naive().to_string());
            let today_events = self
                .call(self.store.count(EVENTS_COLLECTION, Some(&today)))
                .await?;

            Ok::<_, DocumentError>((active_sessions, today_events))
        };

        match counts.await {
            Ok((active_sessions, today_events)) => ApplicationStats {
                active_sessions: Some(active_sessions),
                today_events: Some(today_events),
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to compute Firestore stats");
                ApplicationStats::default()
            }
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `<prefix>_<unix millis>_<8 hex chars>`. The random suffix keeps ids
/// unique within the same millisecond.
fn document_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        prefix.replace('/', "_"),
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}
