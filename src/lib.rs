//! Cloud demo API library.

pub mod api;
pub mod backends;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod services;

pub use config::ServiceConfig;
pub use http::{build_router, AppState, HttpServer};
pub use lifecycle::Shutdown;
