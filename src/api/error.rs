//! Handler-level error type rendered as an error envelope.

use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::http::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A cloud collaborator failed. The message embeds the upstream text.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    /// Log a collaborator failure and wrap it as `"<context>: <error>"`.
    pub fn upstream(context: &str, error: impl Display) -> Self {
        tracing::error!(error = %error, "{context}");
        Self::Upstream(format!("{context}: {error}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        ApiResponse::<()>::error(self.to_string(), status.as_u16()).into_response()
    }
}
