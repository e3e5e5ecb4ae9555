//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gatekeeper, breakers, cache, HTTP layers
//!     → logging.rs (tracing events; request spans carry x-request-id)
//!     → metrics.rs (admission, breaker gauge, cache outcomes, latency)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape on observability.metrics_address
//! ```

pub mod logging;
pub mod metrics;
