//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for a service built on the core.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name used in logs and metric labels.
    pub service_name: String,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Inbound admission control.
    pub rate_limit: RateLimitConfig,

    /// Breaker settings shared by every outbound dependency.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Cache-aside backend.
    pub cache: CacheConfig,

    /// Services this one calls.
    pub dependencies: Vec<DependencyConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "order-service".to_string(),
            listener: ListenerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            dependencies: vec![DependencyConfig::default()],
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Look up a dependency by name.
    pub fn dependency(&self, name: &str) -> Option<&DependencyConfig> {
        self.dependencies.iter().find(|d| d.name == name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Token refill rate per client, in tokens per second.
    pub requests_per_second: f64,

    /// Bucket capacity (maximum burst).
    pub burst_capacity: u32,

    /// How often idle buckets are reclaimed, in seconds.
    pub cleanup_interval_secs: u64,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer
    /// address. Only enable behind a trusted proxy.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 100.0,
            burst_capacity: 200,
            cleanup_interval_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Minimum calls in the current window before the ratio is evaluated.
    pub min_requests: u32,

    /// Failure ratio at or above which the breaker opens.
    pub failure_ratio_threshold: f64,

    /// Length of the Closed-state counting window, in seconds (0 = never reset).
    pub rolling_interval_secs: u64,

    /// Time spent Open before a trial call is allowed, in seconds.
    pub open_timeout_secs: u64,

    /// Trial calls allowed while HalfOpen.
    pub max_half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            min_requests: 3,
            failure_ratio_threshold: 0.5,
            rolling_interval_secs: 60,
            open_timeout_secs: 30,
            max_half_open_requests: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn rolling_interval(&self) -> Option<Duration> {
        (self.rolling_interval_secs > 0).then(|| Duration::from_secs(self.rolling_interval_secs))
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the cache. When false every lookup is a miss.
    pub enabled: bool,

    /// Redis URL (e.g., "redis://127.0.0.1:6379/0"), or "memory://" for an in-process store.
    pub backend_address: String,

    /// TTL applied to list entries, in seconds.
    pub default_list_ttl_secs: u64,

    /// Upper bound on any single cache operation, in milliseconds.
    pub operation_timeout_ms: u64,

    /// Upper bound on the startup connection attempt, in milliseconds.
    pub connect_timeout_ms: u64,

    /// Prefix prepended to every key.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend_address: "redis://127.0.0.1:6379/0".to_string(),
            default_list_ttl_secs: 60,
            operation_timeout_ms: 250,
            connect_timeout_ms: 2000,
            key_prefix: String::new(),
        }
    }
}

impl CacheConfig {
    pub fn default_list_ttl(&self) -> Duration {
        Duration::from_secs(self.default_list_ttl_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Outbound dependency definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Unique dependency name; also the breaker name.
    pub name: String,

    /// Base URL (e.g., "http://user-service:8081").
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_dependency_timeout")]
    pub request_timeout_secs: u64,
}

fn default_dependency_timeout() -> u64 {
    10
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            name: "user-service".to_string(),
            base_url: "http://localhost:8081".to_string(),
            request_timeout_secs: default_dependency_timeout(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}
