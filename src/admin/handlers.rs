use axum::{extract::State, Json};
use serde::Serialize;

use super::AdminState;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitState};
use crate::security::rate_limit::LimiterSnapshot;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub service: String,
    pub version: &'static str,
    pub status: &'static str,
    pub cache_enabled: bool,
    pub open_breakers: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let open_breakers = state
        .breakers
        .snapshots()
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .count();

    Json(SystemStatus {
        service: state.service_name.to_string(),
        version: env!("CARGO_PKG_VERSION"),
        status: if open_breakers == 0 { "operational" } else { "degraded" },
        cache_enabled: state.cache_enabled,
        open_breakers,
    })
}

pub async fn get_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.breakers.snapshots())
}

pub async fn get_limiter(State(state): State<AdminState>) -> Json<LimiterSnapshot> {
    Json(state.limiter.snapshot())
}
