//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the Axum router from the service routes, `/health` and admin
//! - Put the gatekeeper in front of every route
//! - Wire the cross-cutting layers (request id, tracing, timeout, body limit)
//! - Serve with connect info and drain on the shutdown broadcast
//!
//! # Data Flow
//! ```text
//! request → CatchPanic → SetRequestId → Trace → PropagateRequestId
//!     → RequestBodyLimit → Timeout → track_metrics → gatekeeper
//!     → /health | /admin/* | /api/v1/orders
//! ```

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::error::ServiceError;
use crate::http::middleware::gatekeeper::{rate_limit_middleware, track_metrics, Gatekeeper};
use crate::http::response;
use crate::lifecycle::startup::Components;
use crate::services::orders;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    service: String,
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    ServiceError::Internal {
        message: "handler panicked".into(),
        source: None,
    }
    .into_response()
}

/// HTTP server for a service built on the core.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(components: &Components) -> Self {
        Self {
            router: Self::build_router(components),
        }
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(components: &Components) -> Router {
        let config = &components.config;
        let service: Arc<str> = Arc::from(config.service_name.as_str());

        let health_service = config.service_name.clone();
        let mut router = Router::new()
            .route(
                "/health",
                get(move || {
                    let service = health_service.clone();
                    async move { response::ok(Health { status: "healthy", service }) }
                }),
            )
            .merge(orders::routes(components.orders.clone()));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(AdminState {
                service_name: service.clone(),
                api_key: Arc::from(config.admin.api_key.as_str()),
                breakers: components.breakers.clone(),
                limiter: components.limiter.clone(),
                cache_enabled: components.cache.is_enabled(),
            }));
        }

        if config.rate_limit.enabled {
            let gate = Gatekeeper::new(
                components.limiter.clone(),
                &config.service_name,
                config.rate_limit.trust_forwarded_for,
            );
            router = router.layer(middleware::from_fn_with_state(gate, rate_limit_middleware));
        } else {
            tracing::warn!("Rate limiting disabled by configuration");
        }

        router
            .layer(middleware::from_fn_with_state(service, track_metrics))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CatchPanicLayer::custom(panic_response))
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
