//! HTTP surface shared by services.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, cross-cutting layers)
//!     → middleware/gatekeeper.rs (per-client admission)
//!     → service handlers
//!     → response.rs (envelope, error → status mapping)
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use response::{Envelope, ErrorInfo, Meta};
pub use server::HttpServer;
