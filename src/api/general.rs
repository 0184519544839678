//! Welcome, info, echo and the forced error endpoint.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::ApiError;
use crate::http::{ApiResponse, AppState, Params};
use crate::observability::ApplicationInfo;

/// Body of `POST /api/echo`, reflected back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub message: Option<String>,
    pub data: Option<Map<String, Value>>,
}

pub async fn home(State(state): State<AppState>) -> ApiResponse<Value> {
    tracing::info!("Welcome endpoint called");
    let info = &state.info;

    ApiResponse::success(
        json!({
            "message": format!("Welcome to {}", info.name()),
            "application": info.name(),
            "version": info.version(),
            "environment": info.environment(),
            "hostname": info.hostname(),
            "timestamp": Utc::now(),
        }),
        "Welcome",
    )
}

pub async fn info(State(state): State<AppState>) -> ApiResponse<ApplicationInfo> {
    ApiResponse::success(
        state.info.application_info().await,
        "Application info retrieved",
    )
}

pub async fn echo_post(
    payload: Result<Json<EchoRequest>, JsonRejection>,
) -> Result<ApiResponse<EchoRequest>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    tracing::info!(message = ?request.message, "Echo POST");
    Ok(ApiResponse::success(request, "Echo POST successful"))
}

pub async fn echo_get(Params(params): Params<BTreeMap<String, String>>) -> ApiResponse<Value> {
    tracing::info!(?params, "Echo GET");
    ApiResponse::success(
        json!({
            "method": "GET",
            "params": params,
            "timestamp": Utc::now(),
        }),
        "Echo GET successful",
    )
}

pub async fn trigger_error() -> ApiResponse<()> {
    tracing::error!("Error endpoint called, returning a simulated 500");
    ApiResponse::error(
        "This is a test error",
        StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
    )
}
