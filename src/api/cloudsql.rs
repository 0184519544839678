//! Relational store endpoints.

use axum::extract::State;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

use super::error::ApiError;
use crate::backends::ActivityLog;
use crate::http::{ApiResponse, AppState};

const RECENT_LOGS: usize = 10;

pub async fn logs(State(state): State<AppState>) -> Result<ApiResponse<Vec<ActivityLog>>, ApiError> {
    const CONTEXT: &str = "Failed to get activity logs";

    let logs = state
        .activity_logs
        .recent(RECENT_LOGS)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;

    let mut metadata = Map::new();
    metadata.insert("logs_count".into(), json!(logs.len()));
    state
        .firestore
        .save_event("cloudsql_query", "Activity log query", metadata)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;

    Ok(ApiResponse::success(logs, "Activity logs retrieved successfully"))
}

pub async fn stats(State(state): State<AppState>) -> Result<ApiResponse<Value>, ApiError> {
    const CONTEXT: &str = "Failed to get activity stats";

    let since = Utc::now() - Duration::hours(24);
    let requests = state
        .activity_logs
        .requests_per_endpoint_since(since)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;
    let latency = state
        .activity_logs
        .average_execution_time()
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;

    Ok(ApiResponse::success(
        json!({
            "requests_last_24h": requests,
            "average_execution_ms": latency,
            "timestamp": Utc::now(),
        }),
        "Activity stats retrieved successfully",
    ))
}
