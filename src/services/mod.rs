//! Services composed from the resilience and caching core.

pub mod orders;
