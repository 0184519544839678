//! Per-request logging and counting.
//!
//! A [`RequestRecord`] is created when the request enters and finishes when
//! it is dropped, so the counter moves exactly once per request whether the
//! handler returns, panics (turned into a 500 further in), or the client
//! goes away and the future is cancelled.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::request::client_address;
use crate::observability::metrics::record_request;
use crate::observability::InfoAggregator;

/// Status logged when the request future is dropped before responding.
const CLIENT_CLOSED: u16 = 499;

struct RequestRecord {
    info: Arc<InfoAggregator>,
    method: String,
    path: String,
    route: String,
    client: String,
    started: Instant,
    status: Option<u16>,
}

impl RequestRecord {
    fn start(info: Arc<InfoAggregator>, request: &Request) -> Self {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| "unmatched".to_string());

        Self {
            info,
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            route,
            client: client_address(request.extensions()),
            started: Instant::now(),
            status: None,
        }
    }
}

impl Drop for RequestRecord {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let status = self.status.unwrap_or(CLIENT_CLOSED);
        let total = self.info.increment_request_count();

        tracing::info!(
            method = %self.method,
            path = %self.path,
            status,
            duration_ms = elapsed.as_millis() as u64,
            client = %self.client,
            total_requests = total,
            "request completed"
        );
        record_request(&self.method, &self.route, status, elapsed);
    }
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn request_logging(
    State(info): State<Arc<InfoAggregator>>,
    request: Request,
    next: Next,
) -> Response {
    let mut record = RequestRecord::start(info, &request);
    let response = next.run(request).await;
    record.status = Some(response.status().as_u16());
    response
}
