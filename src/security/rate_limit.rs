//! Per-key token-bucket admission control.
//!
//! Each key (normally a client IP) owns a bucket holding up to `capacity`
//! tokens, refilled continuously at `refill_rate` tokens per second. A
//! request takes one token or is rejected on the spot; nothing ever waits.
//!
//! The key→bucket table is sharded (`DashMap`), so lookup-or-create and the
//! token update for one key happen under that key's shard lock while other
//! keys proceed in parallel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::clock::Clock;
use crate::config::RateLimitConfig;

/// Token state for one key.
#[derive(Debug, Clone, Copy)]
pub struct RateBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl RateBucket {
    fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    fn is_full(&self) -> bool {
        self.tokens >= self.capacity
    }
}

/// Admin view of the limiter.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterSnapshot {
    pub tracked_keys: usize,
    pub capacity: u32,
    pub refill_rate: f64,
}

/// Token-bucket limiter keyed by an arbitrary string.
#[derive(Debug)]
pub struct TokenBucketLimiter {
    capacity: u32,
    refill_rate: f64,
    clock: Arc<dyn Clock>,
    buckets: DashMap<String, RateBucket>,
}

impl TokenBucketLimiter {
    pub fn new(capacity: u32, refill_rate: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity,
            refill_rate,
            clock,
            buckets: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.burst_capacity, config.requests_per_second, clock)
    }

    /// Take one token for `key`. Never blocks.
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();

        if let Some(mut bucket) = self.buckets.get_mut(key) {
            return bucket.try_acquire(now);
        }

        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| RateBucket::new(self.capacity as f64, self.refill_rate, now));
        bucket.try_acquire(now)
    }

    /// Drop every bucket that has refilled to capacity. Returns how many
    /// were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            bucket.refill(now);
            !bucket.is_full()
        });
        before.saturating_sub(self.buckets.len())
    }

    /// Current tokens for `key`, if it is tracked.
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|b| b.tokens())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            tracked_keys: self.buckets.len(),
            capacity: self.capacity,
            refill_rate: self.refill_rate,
        }
    }
}

/// Run [`TokenBucketLimiter::cleanup`] every `interval` until shutdown.
pub fn spawn_cleanup(
    limiter: Arc<TokenBucketLimiter>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.cleanup();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = limiter.len(), "Reclaimed idle rate limit buckets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit cleanup received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}
