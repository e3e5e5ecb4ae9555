//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration (fatal on any error)
//! - Build the limiter, breaker registry, cache and dependency clients
//! - Wire them into the order service
//!
//! # Design Decisions
//! - Subsystems initialize in order, not concurrently
//! - The clock and cache can be injected so tests control time and storage

use std::sync::Arc;

use thiserror::Error;

use crate::cache::CacheAside;
use crate::clock::{self, Clock};
use crate::config::{validate_config, ConfigError, ServiceConfig};
use crate::error::ServiceError;
use crate::resilience::{BreakerRegistry, DependencyClient};
use crate::security::TokenBucketLimiter;
use crate::services::orders::{InMemoryOrderRepository, OrderService, UserClient, USER_SERVICE};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dependency '{0}' is not configured")]
    MissingDependency(&'static str),

    #[error("failed to build client for '{name}': {source}")]
    Client {
        name: String,
        #[source]
        source: ServiceError,
    },
}

/// Everything a running service holds for its lifetime.
pub struct Components {
    pub config: ServiceConfig,
    pub clock: Arc<dyn Clock>,
    pub limiter: Arc<TokenBucketLimiter>,
    pub breakers: Arc<BreakerRegistry>,
    pub cache: CacheAside,
    pub users: Arc<UserClient>,
    pub orders: Arc<OrderService>,
}

/// Build every subsystem from `config` using the system clock and the
/// configured cache backend.
pub async fn build_components(config: ServiceConfig) -> Result<Components, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    let cache = CacheAside::connect(&config.cache).await;
    assemble(config, clock::system(), cache)
}

/// Build every subsystem around an injected clock and cache.
pub fn assemble(config: ServiceConfig, clock: Arc<dyn Clock>, cache: CacheAside) -> Result<Components, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let limiter = Arc::new(TokenBucketLimiter::from_config(&config.rate_limit, clock.clone()));
    let breakers = Arc::new(BreakerRegistry::new(config.circuit_breaker.clone(), clock.clone()));

    let user_config = config
        .dependency(USER_SERVICE)
        .ok_or(StartupError::MissingDependency(USER_SERVICE))?;
    let client = DependencyClient::new(user_config, breakers.get(USER_SERVICE)).map_err(|source| {
        StartupError::Client {
            name: user_config.name.clone(),
            source,
        }
    })?;
    let users = Arc::new(UserClient::new(client));

    let orders = Arc::new(OrderService::new(
        Arc::new(InMemoryOrderRepository::new()),
        users.clone(),
        cache.clone(),
    ));

    tracing::info!(
        service = %config.service_name,
        cache_enabled = cache.is_enabled(),
        rate_limit_enabled = config.rate_limit.enabled,
        dependencies = config.dependencies.len(),
        "Components initialized"
    );

    Ok(Components {
        config,
        clock,
        limiter,
        breakers,
        cache,
        users,
        orders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_cache() -> CacheAside {
        CacheAside::disabled(&Default::default())
    }

    #[test]
    fn invalid_config_is_fatal() {
        let mut config = ServiceConfig::default();
        config.rate_limit.requests_per_second = 0.0;

        let err = assemble(config, clock::system(), memory_cache()).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn oversized_breaker_window_is_a_config_error() {
        let mut config = ServiceConfig::default();
        config.circuit_breaker.rolling_interval_secs = u64::MAX;

        let err = assemble(config, clock::system(), memory_cache()).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn user_service_must_be_configured() {
        let mut config = ServiceConfig::default();
        config.dependencies[0].name = "billing-service".into();

        let err = assemble(config, clock::system(), memory_cache()).err().unwrap();
        assert!(matches!(err, StartupError::MissingDependency(USER_SERVICE)));
    }

    #[test]
    fn defaults_assemble() {
        let components = assemble(ServiceConfig::default(), clock::system(), memory_cache()).unwrap();
        assert!(components.limiter.is_empty());
        assert_eq!(components.breakers.snapshots().len(), 1);
        assert!(!components.cache.is_enabled());
    }

    #[tokio::test]
    async fn build_components_without_cache() {
        let mut config = ServiceConfig::default();
        config.cache.enabled = false;
        let components = build_components(config).await.unwrap();
        assert!(!components.cache.is_enabled());
    }
}
