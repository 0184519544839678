//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all API routes
//! - Wire up middleware (tracing, request ID, logging, timeout, panics)
//! - Bind server to listener and serve until shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → request_logging
//!     → timeout_envelope → Timeout → CatchPanic → handler
//! ```

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::backends::ActivityLogStore;
use crate::config::TimeoutConfig;
use crate::http::middleware::request_logging;
use crate::http::response::ApiResponse;
use crate::observability::InfoAggregator;
use crate::services::{CloudStorageService, FirestoreService};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub info: Arc<InfoAggregator>,
    pub storage: Arc<CloudStorageService>,
    pub firestore: Arc<FirestoreService>,
    pub activity_logs: Arc<dyn ActivityLogStore>,
}

/// HTTP server for the demo API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(timeouts: &TimeoutConfig, state: AppState) -> Self {
        Self {
            router: build_router(timeouts, state),
        }
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
    let info = state.info.clone();

    api::routes()
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
        .layer(middleware::map_response(timeout_envelope))
        .layer(middleware::from_fn_with_state(info, request_logging))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// `TimeoutLayer` answers with a bare 408; give it the usual envelope.
async fn timeout_envelope(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    tracing::warn!("Request exceeded the request timeout");
    ApiResponse::<()>::error("Request timed out", StatusCode::REQUEST_TIMEOUT.as_u16())
        .into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "Handler panicked");

    ApiResponse::<()>::error("Internal server error", 500).into_response()
}
