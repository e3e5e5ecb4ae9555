//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Limiter → Breakers → Cache → Dependency clients → Services
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → server drains, cleanup task exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: invalid configuration is fatal
//! - An unreachable cache is not fatal; the service runs uncached
//! - Listeners start last (traffic only when ready)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_components, Components, StartupError};
