//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through and are counted
//! - Open: dependency assumed down, calls fail fast without being invoked
//! - Half-Open: a bounded number of trial calls probe for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open:      requests >= min_requests && failures/requests >= ratio (current window)
//! Closed → Closed:    rolling interval elapsed, counters reset
//! Open → Half-Open:   open_timeout elapsed, checked on the next call or state read
//! Half-Open → Closed: max_half_open_requests consecutive trial successes
//! Half-Open → Open:   any trial failure (timeout restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, owned by a [`BreakerRegistry`]
//! - Every error from the wrapped call is a failure; the breaker never retries
//! - Each window or transition starts a new generation; results from calls
//!   admitted in an older generation are discarded
//! - A call that times out, is cancelled, or whose future is dropped is a failure

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use crate::clock::Clock;
use crate::config::CircuitBreakerConfig;
use crate::error::ServiceError;
use crate::observability::metrics;

/// Breaker state. The discriminant is the published gauge value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    HalfOpen = 1,
    Open = 2,
}

impl CircuitState {
    pub fn as_gauge(self) -> f64 {
        self as u8 as f64
    }
}

impl From<u8> for CircuitState {
    fn from(val: u8) -> Self {
        match val {
            1 => CircuitState::HalfOpen,
            2 => CircuitState::Open,
            _ => CircuitState::Closed,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CircuitState::Closed => "closed",
            CircuitState::HalfOpen => "half-open",
            CircuitState::Open => "open",
        })
    }
}

/// Counts for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BreakerCounters {
    pub requests: u32,
    pub successes: u32,
    pub failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl BreakerCounters {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.successes = self.successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

/// Errors returned by [`CircuitBreaker::execute`] and friends.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the operation was not invoked.
    #[error("circuit breaker for {dependency} is open")]
    Open { dependency: String },

    /// The breaker is probing recovery and every trial slot is taken.
    #[error("circuit breaker for {dependency} is half-open with no trial slots left")]
    HalfOpenSaturated { dependency: String },

    #[error("call to {dependency} timed out after {timeout:?}")]
    Timeout { dependency: String, timeout: Duration },

    #[error("call to {dependency} was cancelled")]
    Cancelled { dependency: String },

    /// The operation ran and failed.
    #[error(transparent)]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// True when the breaker refused the call without invoking it.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Open { .. } | Self::HalfOpenSaturated { .. })
    }
}

impl From<BreakerError<ServiceError>> for ServiceError {
    fn from(err: BreakerError<ServiceError>) -> Self {
        match err {
            BreakerError::Open { dependency } | BreakerError::HalfOpenSaturated { dependency } => {
                ServiceError::CircuitOpen { dependency }
            }
            BreakerError::Timeout { dependency, timeout } => {
                ServiceError::unavailable(format!("{} did not respond within {:?}", dependency, timeout))
            }
            BreakerError::Cancelled { dependency } => {
                ServiceError::unavailable(format!("call to {} was cancelled", dependency))
            }
            BreakerError::Operation(e) => e,
        }
    }
}

/// Point-in-time view for admin output.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub counters: BreakerCounters,
}

enum Rejection {
    Open,
    Saturated,
}

struct Inner {
    state: CircuitState,
    generation: u64,
    counters: BreakerCounters,
    /// End of the current Closed window or Open timeout.
    expiry: Option<Instant>,
}

/// Call guard for a single dependency.
pub struct CircuitBreaker {
    name: String,
    settings: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.lock().state)
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let name = name.into();
        let expiry = settings.rolling_interval().and_then(|i| clock.now().checked_add(i));
        metrics::set_breaker_state(&name, CircuitState::Closed.as_gauge());
        Self {
            name,
            settings,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                counters: BreakerCounters::default(),
                expiry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, after applying any elapsed timeout or window.
    pub fn state(&self) -> CircuitState {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        inner.state
    }

    /// Counters for the current generation.
    pub fn counters(&self) -> BreakerCounters {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        inner.counters
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            counters: inner.counters,
        }
    }

    /// Run `op` under the breaker.
    ///
    /// Returns [`BreakerError::Open`] without calling `op` while the breaker
    /// is open. If the returned future is dropped before `op` completes, the
    /// call is recorded as a failure.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = self.admit()?;
        let outcome = op().await;
        guard.settle(outcome.is_ok());
        outcome.map_err(BreakerError::Operation)
    }

    /// Like [`execute`](Self::execute), aborting `op` after `timeout`.
    pub async fn execute_with_timeout<F, Fut, T, E>(
        &self,
        timeout: Duration,
        op: F,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = self.admit()?;
        match tokio::time::timeout(timeout, op()).await {
            Ok(outcome) => {
                guard.settle(outcome.is_ok());
                outcome.map_err(BreakerError::Operation)
            }
            Err(_) => {
                guard.settle(false);
                tracing::warn!(dependency = %self.name, timeout = ?timeout, "Dependency call timed out");
                Err(BreakerError::Timeout {
                    dependency: self.name.clone(),
                    timeout,
                })
            }
        }
    }

    /// Like [`execute`](Self::execute), aborting `op` when `cancel` resolves.
    pub async fn execute_until<C, F, Fut, T, E>(&self, cancel: C, op: F) -> Result<T, BreakerError<E>>
    where
        C: Future<Output = ()>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = self.admit()?;
        tokio::select! {
            outcome = op() => {
                guard.settle(outcome.is_ok());
                outcome.map_err(BreakerError::Operation)
            }
            _ = cancel => {
                guard.settle(false);
                tracing::debug!(dependency = %self.name, "Dependency call cancelled");
                Err(BreakerError::Cancelled { dependency: self.name.clone() })
            }
        }
    }

    fn admit<E>(&self) -> Result<CallGuard<'_>, BreakerError<E>> {
        match self.before_call() {
            Ok(generation) => Ok(CallGuard {
                breaker: self,
                generation,
                settled: false,
            }),
            Err(rejection) => {
                metrics::record_breaker_rejection(&self.name);
                tracing::debug!(dependency = %self.name, "Circuit breaker rejected call");
                let dependency = self.name.clone();
                Err(match rejection {
                    Rejection::Open => BreakerError::Open { dependency },
                    Rejection::Saturated => BreakerError::HalfOpenSaturated { dependency },
                })
            }
        }
    }

    fn before_call(&self) -> Result<u64, Rejection> {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);

        match inner.state {
            CircuitState::Open => Err(Rejection::Open),
            CircuitState::HalfOpen if inner.counters.requests >= self.settings.max_half_open_requests => {
                Err(Rejection::Saturated)
            }
            _ => {
                inner.counters.on_request();
                Ok(inner.generation)
            }
        }
    }

    fn after_call(&self, generation: u64, success: bool) {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);

        if inner.generation != generation {
            return;
        }

        if success {
            inner.counters.on_success();
            if inner.state == CircuitState::HalfOpen
                && inner.counters.consecutive_successes >= self.settings.max_half_open_requests
            {
                self.transition(&mut inner, CircuitState::Closed, now);
            }
        } else {
            inner.counters.on_failure();
            match inner.state {
                CircuitState::Closed if self.should_trip(&inner.counters) => {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
                CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open, now),
                _ => {}
            }
        }
    }

    fn should_trip(&self, counters: &BreakerCounters) -> bool {
        counters.requests >= self.settings.min_requests
            && counters.failure_ratio() >= self.settings.failure_ratio_threshold
    }

    /// Apply time-driven transitions.
    fn refresh(&self, inner: &mut Inner, now: Instant) {
        let expired = inner.expiry.is_some_and(|expiry| now >= expiry);
        match inner.state {
            CircuitState::Closed if expired => self.new_generation(inner, now),
            CircuitState::Open if expired => self.transition(inner, CircuitState::HalfOpen, now),
            _ => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState, now: Instant) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        self.new_generation(inner, now);
        metrics::set_breaker_state(&self.name, to.as_gauge());

        if to == CircuitState::Open {
            tracing::warn!(dependency = %self.name, from = %from, to = %to, "Circuit breaker opened");
        } else {
            tracing::info!(dependency = %self.name, from = %from, to = %to, "Circuit breaker state changed");
        }
    }

    fn new_generation(&self, inner: &mut Inner, now: Instant) {
        inner.generation = inner.generation.wrapping_add(1);
        inner.counters = BreakerCounters::default();
        inner.expiry = match inner.state {
            // An unrepresentable deadline never expires.
            CircuitState::Closed => self.settings.rolling_interval().and_then(|i| now.checked_add(i)),
            CircuitState::Open => now.checked_add(self.settings.open_timeout()),
            CircuitState::HalfOpen => None,
        };
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles an admitted call exactly once; an unsettled drop is a failure.
struct CallGuard<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl CallGuard<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.after_call(self.generation, success);
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(dependency = %self.breaker.name, "In-flight call dropped, recording failure");
            self.breaker.after_call(self.generation, false);
        }
    }
}

/// One breaker per dependency, created on first use with shared settings.
#[derive(Debug)]
pub struct BreakerRegistry {
    settings: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(settings: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            breakers: DashMap::new(),
        }
    }

    /// Breaker for `dependency`, creating it if needed.
    pub fn get(&self, dependency: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(dependency) {
            return existing.clone();
        }
        self.breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(dependency, self.settings.clone(), self.clock.clone()))
            })
            .clone()
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}
