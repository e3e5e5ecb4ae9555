//! Admission control.
//!
//! # Design Decisions
//! - One token bucket per client key, created lazily on first request
//! - Idle, full buckets are evicted by a background sweep

pub mod rate_limit;

pub use rate_limit::{spawn_cleanup, TokenBucketLimiter};
