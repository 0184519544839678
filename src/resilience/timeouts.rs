//! Deadline enforcement for backend calls.
//!
//! # Responsibilities
//! - Wrap backend futures with a timeout
//! - Turn expiry into the caller's error type
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - The inner future is dropped (cancelled) on expiry

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A backend call did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {}ms", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` with a deadline, mapping expiry into `E`.
pub async fn with_deadline<F, T, E>(limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeadlineExceeded(limit).into()),
    }
}
