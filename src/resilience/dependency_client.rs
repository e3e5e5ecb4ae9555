//! Breaker-protected HTTP client for service-to-service calls.
//!
//! # Responsibilities
//! - Issue JSON GET requests against a dependency's base URL
//! - Decode the shared response envelope
//! - Report every failure to the dependency's circuit breaker
//! - Apply a caller-chosen degradation policy when the dependency is unavailable
//!
//! # Data Flow
//! ```text
//! service → get_json(resource, path)
//!     → CircuitBreaker::execute_with_timeout
//!         open / saturated → CIRCUIT_OPEN (no network call)
//!         → reqwest GET {base_url}{path}
//!             transport error → SERVICE_UNAVAILABLE
//!             404             → NOT_FOUND
//!             other non-2xx   → SERVICE_UNAVAILABLE
//!             success=false   → envelope {code, message}
//!             success=true    → data
//! ```
//!
//! # Design Decisions
//! - Every error counts against the breaker, NOT_FOUND included
//! - No retries here; retry policy belongs to the caller

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::config::DependencyConfig;
use crate::error::{codes, ServiceError};
use crate::http::response::Envelope;
use crate::resilience::circuit_breaker::CircuitBreaker;

/// What a caller does when a dependency is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// Surface the error; the whole request fails.
    FailRequest,
    /// Continue without the dependency's data.
    ProceedWithout,
}

/// Apply `policy` to a dependency result.
///
/// `ProceedWithout` turns CIRCUIT_OPEN and SERVICE_UNAVAILABLE into
/// `Ok(None)`. Every other error passes through.
pub fn degrade<T>(
    result: Result<T, ServiceError>,
    policy: Degradation,
    dependency: &str,
) -> Result<Option<T>, ServiceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if policy == Degradation::ProceedWithout && e.is_dependency_unavailable() => {
            tracing::warn!(dependency, error = %e, "Dependency unavailable, continuing without it");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// HTTP client bound to one dependency and its breaker.
#[derive(Debug, Clone)]
pub struct DependencyClient {
    name: String,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
}

impl DependencyClient {
    pub fn new(config: &DependencyConfig, breaker: Arc<CircuitBreaker>) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ServiceError::internal("failed to build HTTP client", e))?;
        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            http,
            breaker,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// GET `{base_url}{path}` and return the envelope's data.
    ///
    /// `resource` names the entity in NOT_FOUND messages ("user not found").
    pub async fn get_json<T: DeserializeOwned>(&self, resource: &str, path: &str) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        self.breaker
            .execute_with_timeout(self.timeout, || self.fetch(resource, &url))
            .await
            .map_err(ServiceError::from)
    }

    async fn fetch<T: DeserializeOwned>(&self, resource: &str, url: &str) -> Result<T, ServiceError> {
        tracing::debug!(dependency = %self.name, url, "Calling dependency");

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ServiceError::unavailable(format!("failed to call {}: {}", self.name, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::not_found(resource));
        }
        if !status.is_success() {
            return Err(ServiceError::unavailable(format!(
                "{} returned status {}",
                self.name,
                status.as_u16()
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::internal("failed to decode dependency response", e))?;

        if !envelope.success {
            return Err(match envelope.error {
                Some(info) => ServiceError::from_remote(&info.code, info.message),
                None => ServiceError::from_remote(codes::INTERNAL, format!("{} reported failure", self.name)),
            });
        }

        envelope.data.ok_or_else(|| ServiceError::Internal {
            message: format!("{} response carried no data", self.name),
            source: None,
        })
    }
}
