//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request logging middleware produces:
//!     → app_info.rs (request counter)
//!     → logging.rs (one structured event per request)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → /api/info and / (app_info snapshot)
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod app_info;
pub mod logging;
pub mod metrics;

pub use app_info::{ApplicationInfo, InfoAggregator};
