//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → middleware/request_logging.rs (timer, counter, access log)
//!     → params.rs (query/form parameters)
//!     → api handlers
//!     → response.rs (uniform JSON envelope)
//!     → Send to client
//! ```

pub mod middleware;
pub mod params;
pub mod request;
pub mod response;
pub mod server;

pub use params::Params;
pub use response::ApiResponse;
pub use server::{build_router, AppState, HttpServer};
