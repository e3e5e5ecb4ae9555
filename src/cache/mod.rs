//! Cache subsystem.
//!
//! # Data Flow
//! ```text
//! service orchestration
//!     → keys.rs (EntityKey / ListFingerprint)
//!     → aside.rs (serialize, bound with timeout, absorb failures)
//!     → backend.rs (Redis or in-memory bytes store)
//! ```

pub mod aside;
pub mod backend;
pub mod keys;

pub use aside::CacheAside;
pub use backend::{CacheBackend, CacheError, MemoryCache, RedisCache};
pub use keys::{EntityKey, ListFingerprint};
