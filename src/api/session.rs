//! Session endpoints.
//!
//! Creating a session writes the relational audit row first and the session
//! document second. There is no cross-store transaction: if the document
//! write fails, the audit row stays.

use axum::{
    extract::{Path, State},
    http::{Extensions, HeaderMap},
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ApiError;
use crate::backends::{DocumentError, NewActivityLog};
use crate::http::request::{client_address, user_agent};
use crate::http::{ApiResponse, AppState};

const CREATE_ENDPOINT: &str = "/api/session/create";

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<ApiResponse<Value>, ApiError> {
    const CONTEXT: &str = "Failed to create session";

    let session_id = Uuid::new_v4().to_string();
    let user_agent = user_agent(&headers);
    let remote_ip = client_address(&extensions);

    let entry = NewActivityLog::new(CREATE_ENDPOINT, "POST", 200)
        .user_agent(user_agent.clone())
        .remote_ip(remote_ip.clone())
        .execution_time_ms(0);
    state
        .activity_logs
        .insert(entry)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;

    state
        .firestore
        .save_session(&session_id, user_agent.as_deref(), &remote_ip)
        .await
        .map_err(|e| ApiError::upstream(CONTEXT, e))?;

    Ok(ApiResponse::success(
        json!({
            "session_id": session_id,
            "user_agent": user_agent,
            "remote_ip": remote_ip,
            "timestamp": Utc::now(),
        }),
        "Session created successfully",
    ))
}

pub async fn close(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    match state.firestore.close_session(&session_id).await {
        Ok(()) => {}
        Err(DocumentError::NotFound { .. }) => {
            return Err(ApiError::NotFound(format!("Session not found: {session_id}")));
        }
        Err(e) => return Err(ApiError::upstream("Failed to close session", e)),
    }

    Ok(ApiResponse::success(
        json!({
            "session_id": session_id,
            "active": false,
            "timestamp": Utc::now(),
        }),
        "Session closed successfully",
    ))
}
