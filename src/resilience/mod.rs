//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a cloud backend:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On expiry: surfaced as the backend's own error type
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - No retries: failures surface immediately to the caller

pub mod timeouts;
