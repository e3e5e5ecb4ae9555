//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound cache operations and startup connection attempts
//! - Report which operation exceeded its deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timeout errors are distinct from other errors
//! - Dependency calls get their deadline from the breaker
//!   (`CircuitBreaker::execute_with_timeout`) so a timeout is counted as a failure

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} timed out after {timeout:?}")]
pub struct Elapsed {
    pub operation: &'static str,
    pub timeout: Duration,
}

/// Run `fut`, giving up after `timeout`.
pub async fn with_timeout<F, T>(operation: &'static str, timeout: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Elapsed { operation, timeout })
}
