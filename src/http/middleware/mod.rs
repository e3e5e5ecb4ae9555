//! HTTP middleware.

pub mod gatekeeper;

pub use gatekeeper::{client_key, rate_limit_middleware, track_metrics, Gatekeeper};
