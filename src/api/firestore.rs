//! Document store endpoints.

use std::collections::BTreeMap;

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::error::ApiError;
use crate::backends::Document;
use crate::http::{ApiResponse, AppState, Params};

const METRIC_NAME: &str = "metricName";
const METRIC_VALUE: &str = "value";
const RECENT_EVENTS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub metric_name: String,
}

/// `metricName` and `value` are required; every other parameter is stored as
/// a tag.
pub async fn save_metric(
    State(state): State<AppState>,
    Params(mut params): Params<BTreeMap<String, String>>,
) -> Result<ApiResponse<Value>, ApiError> {
    let metric_name = params
        .remove(METRIC_NAME)
        .ok_or_else(|| missing(METRIC_NAME))?;
    let value = params
        .remove(METRIC_VALUE)
        .ok_or_else(|| missing(METRIC_VALUE))?;
    let tags: Map<String, Value> = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    tracing::info!(metric = %metric_name, value = %value, "Saving metric");
    state
        .firestore
        .save_metric(&metric_name, json!(value), tags.clone())
        .await
        .map_err(|e| ApiError::upstream("Failed to save metric", e))?;

    Ok(ApiResponse::success(
        json!({
            "metric_name": metric_name,
            "value": value,
            "tags": tags,
            "timestamp": Utc::now(),
        }),
        "Metric saved successfully",
    ))
}

pub async fn metrics_by_name(
    State(state): State<AppState>,
    Params(query): Params<MetricQuery>,
) -> Result<ApiResponse<Vec<Document>>, ApiError> {
    let metrics = state
        .firestore
        .metrics_by_name(&query.metric_name)
        .await
        .map_err(|e| ApiError::upstream("Failed to get metrics", e))?;

    Ok(ApiResponse::success(metrics, "Metrics retrieved successfully"))
}

pub async fn stats(State(state): State<AppState>) -> Result<ApiResponse<Value>, ApiError> {
    let stats = state.firestore.application_stats().await;
    let recent_events = state
        .firestore
        .recent_events(RECENT_EVENTS)
        .await
        .map_err(|e| ApiError::upstream("Failed to get stats", e))?;

    Ok(ApiResponse::success(
        json!({
            "stats": stats,
            "recent_events": recent_events,
            "timestamp": Utc::now(),
        }),
        "Stats retrieved successfully",
    ))
}

fn missing(name: &str) -> ApiError {
    ApiError::BadRequest(format!("Missing required parameter '{name}'"))
}
