//! REST endpoints.
//!
//! Each handler makes at most one call per collaborator and answers with an
//! [`ApiResponse`] envelope. Collaborator failures become 500 envelopes via
//! [`ApiError`].

pub mod cloudsql;
pub mod error;
pub mod firestore;
pub mod general;
pub mod session;
pub mod storage;

use axum::{
    http::{StatusCode, Uri},
    routing::{delete, get, post},
    Router,
};

use crate::http::{ApiResponse, AppState};

pub use error::ApiError;
pub use general::EchoRequest;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(general::home))
        .route("/api/info", get(general::info))
        .route("/api/echo", get(general::echo_get).post(general::echo_post))
        .route("/api/error", get(general::trigger_error))
        .route("/api/cloudsql/logs", get(cloudsql::logs))
        .route("/api/cloudsql/stats", get(cloudsql::stats))
        .route("/api/storage/upload", post(storage::upload))
        .route("/api/storage/list", get(storage::list))
        .route("/api/storage/download", get(storage::download))
        .route("/api/storage/delete", delete(storage::delete))
        .route(
            "/api/firestore/metrics",
            get(firestore::metrics_by_name).post(firestore::save_metric),
        )
        .route("/api/firestore/stats", get(firestore::stats))
        .route("/api/session/create", post(session::create))
        .route("/api/session/{session_id}/close", post(session::close))
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> ApiResponse<()> {
    ApiResponse::error(
        format!("No route for {}", uri.path()),
        StatusCode::NOT_FOUND.as_u16(),
    )
}
