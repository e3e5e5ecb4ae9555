//! Order service built on the core.
//!
//! # Data Flow
//! ```text
//! handlers.rs → service.rs
//!     → CacheAside (order:{id}, orders:list:...)
//!     → repository.rs (source of truth)
//!     → user_client.rs → DependencyClient → CircuitBreaker → user service
//! ```

pub mod handlers;
pub mod model;
pub mod repository;
pub mod service;
pub mod user_client;

pub use handlers::routes;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use service::OrderService;
pub use user_client::{UserClient, UserDirectory, USER_SERVICE};
