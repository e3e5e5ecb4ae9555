//! Service core: resilience and read-consistency building blocks for CRUD
//! services.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ gatekeeper (token bucket per client)
//!                                          │
//!                                          ▼
//!                                   service handlers
//!                                          │
//!                    ┌─────────────────────┼──────────────────────┐
//!                    ▼                     ▼                      ▼
//!              cache::aside         repository (truth)    dependency_client
//!              (entity + list)                            └─▶ circuit_breaker
//!                                                              └─▶ dependency
//!
//!     Cross-cutting: config, observability, lifecycle, admin
//! ```

// Primitives
pub mod clock;
pub mod error;

// Core subsystems
pub mod cache;
pub mod config;
pub mod http;
pub mod resilience;
pub mod security;

// Composition
pub mod services;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use error::ServiceError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
