//! Operator endpoints.
//!
//! Read-only views of breaker and limiter state, guarded by a bearer key.
//! Mounted outside the gatekeeper so operators are never rate limited.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::resilience::BreakerRegistry;
use crate::security::rate_limit::TokenBucketLimiter;

use self::auth::admin_auth_middleware;
use self::handlers::{get_breakers, get_limiter, get_status};

/// State shared by the admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub service_name: Arc<str>,
    pub api_key: Arc<str>,
    pub breakers: Arc<BreakerRegistry>,
    pub limiter: Arc<TokenBucketLimiter>,
    pub cache_enabled: bool,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/limiter", get(get_limiter))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
