//! Gatekeeper middleware: per-client admission and request metrics.
//!
//! # Data Flow
//! ```text
//! request → client_key (peer IP, or first X-Forwarded-For hop when trusted)
//!     → TokenBucketLimiter::allow
//!         false → 429 RATE_LIMIT_EXCEEDED envelope
//!         true  → next layer
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ServiceError;
use crate::observability::metrics;
use crate::security::rate_limit::TokenBucketLimiter;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared state for the gatekeeper layers.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    limiter: Arc<TokenBucketLimiter>,
    service: Arc<str>,
    trust_forwarded_for: bool,
}

impl Gatekeeper {
    pub fn new(limiter: Arc<TokenBucketLimiter>, service: &str, trust_forwarded_for: bool) -> Self {
        Self {
            limiter,
            service: Arc::from(service),
            trust_forwarded_for,
        }
    }

    pub fn limiter(&self) -> &Arc<TokenBucketLimiter> {
        &self.limiter
    }
}

/// Admission key for a request.
pub fn client_key(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(gate): State<Gatekeeper>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request, gate.trust_forwarded_for);

    if gate.limiter.allow(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited(&gate.service);
        ServiceError::RateLimited.into_response()
    }
}

/// Middleware recording request count and latency.
pub async fn track_metrics(State(service): State<Arc<str>>, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&service, &method, response.status().as_u16(), start);
    response
}
