//! Cache-aside wrapper used by service orchestration.
//!
//! # Responsibilities
//! - Entity reads and writes on `"{type}:{id}"` keys, stored without expiry
//! - List reads and writes on fingerprint keys, always stored with a TTL
//! - JSON (de)serialization of cached payloads
//!
//! # Data Flow
//! ```text
//! handler → get_entity(key)
//!     hit  → return cached value
//!     miss → load from source of truth → set_entity(key, value) → return
//!
//! update → write source of truth → set_entity(key, new value)
//! delete → delete from source of truth → delete_entity(key)
//! list   → get_list(fp) or load → set_list(fp, page, ttl); never invalidated on writes
//! ```
//!
//! # Design Decisions
//! - A disabled, slow or failing backend degrades to pass-through: reads miss,
//!   writes are skipped, nothing is propagated to the caller
//! - Every backend call is bounded by `operation_timeout_ms`
//! - No single-flight: concurrent misses may both load and both write (last write wins)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::backend::{CacheBackend, CacheError, MemoryCache, RedisCache};
use crate::cache::keys::{EntityKey, ListFingerprint};
use crate::clock;
use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;

/// `backend_address` scheme selecting [`MemoryCache`] for local runs.
pub const MEMORY_SCHEME: &str = "memory://";

/// Cache-aside handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CacheAside {
    backend: Option<Arc<dyn CacheBackend>>,
    key_prefix: String,
    operation_timeout: Duration,
    default_list_ttl: Duration,
}

impl CacheAside {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend: Some(backend),
            key_prefix: config.key_prefix.clone(),
            operation_timeout: config.operation_timeout(),
            default_list_ttl: config.default_list_ttl(),
        }
    }

    /// Pass-through cache: every read misses, every write is a no-op.
    pub fn disabled(config: &CacheConfig) -> Self {
        Self {
            backend: None,
            key_prefix: config.key_prefix.clone(),
            operation_timeout: config.operation_timeout(),
            default_list_ttl: config.default_list_ttl(),
        }
    }

    /// Build from configuration, connecting to Redis when enabled
    /// (`memory://` selects an in-process store instead).
    ///
    /// An unreachable backend is logged and yields a disabled cache; the
    /// service keeps running against its source of truth.
    pub async fn connect(config: &CacheConfig) -> Self {
        if !config.enabled {
            tracing::info!("Cache disabled by configuration");
            return Self::disabled(config);
        }

        if config.backend_address.starts_with(MEMORY_SCHEME) {
            tracing::info!("Using in-process memory cache");
            return Self::new(Arc::new(MemoryCache::new(clock::system())), config);
        }

        let attempt = with_timeout(
            "cache connect",
            config.connect_timeout(),
            RedisCache::connect(&config.backend_address),
        )
        .await;

        match attempt {
            Ok(Ok(redis)) => {
                tracing::info!(address = %config.backend_address, "Cache backend connected");
                Self::new(Arc::new(redis), config)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Cache backend unreachable, running without cache");
                Self::disabled(config)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cache backend unreachable, running without cache");
                Self::disabled(config)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn default_list_ttl(&self) -> Duration {
        self.default_list_ttl
    }

    pub async fn get_entity<T: DeserializeOwned>(&self, key: &EntityKey) -> Option<T> {
        self.read("get_entity", key.as_str()).await
    }

    /// Store an entity with no expiry, replacing any previous value.
    pub async fn set_entity<T: Serialize>(&self, key: &EntityKey, value: &T) {
        self.write("set_entity", key.as_str(), value, None).await
    }

    pub async fn delete_entity(&self, key: &EntityKey) {
        let Some(backend) = &self.backend else {
            metrics::record_cache("delete_entity", "skipped");
            return;
        };
        let full_key = self.full_key(key.as_str());
        if let Err(e) = self.bounded("delete_entity", backend.delete(&full_key)).await {
            metrics::record_cache("delete_entity", "error");
            tracing::warn!(key = %full_key, error = %e, "Cache delete failed");
        }
    }

    pub async fn get_list<T: DeserializeOwned>(&self, fingerprint: &ListFingerprint) -> Option<T> {
        self.read("get_list", &fingerprint.key()).await
    }

    /// Store a list page. `ttl = None` uses the configured default; a list
    /// entry always expires.
    pub async fn set_list<T: Serialize>(&self, fingerprint: &ListFingerprint, value: &T, ttl: Option<Duration>) {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_list_ttl);
        self.write("set_list", &fingerprint.key(), value, Some(ttl)).await
    }

    /// Read `key`, or load it with `load` and populate the cache.
    pub async fn get_or_load_entity<T, E, F, Fut>(&self, key: &EntityKey, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get_entity(key).await {
            return Ok(cached);
        }
        let value = load().await?;
        self.set_entity(key, &value).await;
        Ok(value)
    }

    async fn read<T: DeserializeOwned>(&self, operation: &'static str, key: &str) -> Option<T> {
        let Some(backend) = &self.backend else {
            metrics::record_cache(operation, "skipped");
            return None;
        };
        let full_key = self.full_key(key);

        let bytes = match self.bounded(operation, backend.get(&full_key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                metrics::record_cache(operation, "miss");
                return None;
            }
            Err(e) => {
                metrics::record_cache(operation, "error");
                tracing::warn!(key = %full_key, error = %e, "Cache read failed, falling back to source");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                metrics::record_cache(operation, "hit");
                Some(value)
            }
            Err(e) => {
                metrics::record_cache(operation, "error");
                tracing::warn!(key = %full_key, error = %e, "Discarding undecodable cache entry");
                let _ = self.bounded(operation, backend.delete(&full_key)).await;
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, operation: &'static str, key: &str, value: &T, ttl: Option<Duration>) {
        let Some(backend) = &self.backend else {
            metrics::record_cache(operation, "skipped");
            return;
        };
        let full_key = self.full_key(key);

        let result = match serde_json::to_vec(value) {
            Ok(bytes) => self.bounded(operation, backend.set(&full_key, bytes, ttl)).await,
            Err(e) => Err(CacheError::from(e)),
        };

        match result {
            Ok(()) => metrics::record_cache(operation, "stored"),
            Err(e) => {
                metrics::record_cache(operation, "error");
                tracing::warn!(key = %full_key, error = %e, "Cache write failed");
            }
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        with_timeout(operation, self.operation_timeout, fut).await?
    }

    fn full_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}", self.key_prefix, key)
        }
    }
}
