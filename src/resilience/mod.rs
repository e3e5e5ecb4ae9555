//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency:
//!     → dependency_client.rs (HTTP + envelope decoding)
//!     → circuit_breaker.rs (fail fast when open, count outcomes)
//!     → timeouts.rs (deadline; expiry is a breaker failure)
//!     → On unavailability: caller's Degradation policy
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Circuit breaker prevents cascading failures
//! - No automatic retries; callers own retry policy

pub mod circuit_breaker;
pub mod dependency_client;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, BreakerRegistry, CircuitBreaker, CircuitState};
pub use dependency_client::{degrade, Degradation, DependencyClient};
