//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates > 0, ratios within (0, 1], durations within
//!   (0, MAX_DURATION_SECS])
//! - Check addresses and dependency URLs parse
//! - Detect duplicate dependency names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// Upper bound for any duration setting given in seconds (one year).
///
/// Durations are added to monotonic instants, which overflow well before
/// `u64::MAX` seconds.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Reject zero and anything above [`MAX_DURATION_SECS`].
fn check_seconds(errors: &mut Vec<ValidationError>, field: impl Into<String>, secs: u64) {
    if secs == 0 {
        errors.push(ValidationError::new(field, "must be greater than 0"));
    } else if secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            field,
            format!("must be at most {} seconds", MAX_DURATION_SECS),
        ));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::new("service_name", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    check_seconds(&mut errors, "listener.request_timeout_secs", config.listener.request_timeout_secs);

    let rate = &config.rate_limit;
    if !(rate.requests_per_second.is_finite() && rate.requests_per_second > 0.0) {
        errors.push(ValidationError::new(
            "rate_limit.requests_per_second",
            "refill rate must be a positive number",
        ));
    }
    if rate.burst_capacity == 0 {
        errors.push(ValidationError::new("rate_limit.burst_capacity", "must be at least 1"));
    }
    check_seconds(&mut errors, "rate_limit.cleanup_interval_secs", rate.cleanup_interval_secs);

    let breaker = &config.circuit_breaker;
    if breaker.min_requests == 0 {
        errors.push(ValidationError::new("circuit_breaker.min_requests", "must be at least 1"));
    }
    if !(breaker.failure_ratio_threshold > 0.0 && breaker.failure_ratio_threshold <= 1.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_ratio_threshold",
            "must be within (0, 1]",
        ));
    }
    // Zero disables the rolling window.
    if breaker.rolling_interval_secs > MAX_DURATION_SECS {
        errors.push(ValidationError::new(
            "circuit_breaker.rolling_interval_secs",
            format!("must be at most {} seconds", MAX_DURATION_SECS),
        ));
    }
    check_seconds(&mut errors, "circuit_breaker.open_timeout_secs", breaker.open_timeout_secs);
    if breaker.max_half_open_requests == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.max_half_open_requests",
            "must be at least 1",
        ));
    }

    let cache = &config.cache;
    check_seconds(&mut errors, "cache.default_list_ttl_secs", cache.default_list_ttl_secs);
    if cache.operation_timeout_ms == 0 {
        errors.push(ValidationError::new("cache.operation_timeout_ms", "must be greater than 0"));
    }
    if cache.enabled {
        if cache.backend_address.trim().is_empty() {
            errors.push(ValidationError::new(
                "cache.backend_address",
                "required when the cache is enabled",
            ));
        } else if Url::parse(&cache.backend_address).is_err() {
            errors.push(ValidationError::new(
                "cache.backend_address",
                format!("'{}' is not a valid URL", cache.backend_address),
            ));
        }
    }

    let mut names = HashSet::new();
    for (i, dep) in config.dependencies.iter().enumerate() {
        let field = format!("dependencies[{}]", i);
        if dep.name.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !names.insert(dep.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate dependency '{}'", dep.name),
            ));
        }
        match Url::parse(&dep.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                format!("{}.base_url", field),
                format!("'{}' is not an http(s) URL", dep.base_url),
            )),
        }
        check_seconds(&mut errors, format!("{}.request_timeout_secs", field), dep.request_timeout_secs);
    }

    let obs = &config.observability;
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}', expected 'pretty' or 'json'", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DependencyConfig;

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn zero_refill_rate_is_rejected() {
        let mut config = ServiceConfig::default();
        config.rate_limit.requests_per_second = 0.0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["rate_limit.requests_per_second"]);
    }

    #[test]
    fn reports_every_error() {
        let mut config = ServiceConfig::default();
        config.rate_limit.burst_capacity = 0;
        config.circuit_breaker.failure_ratio_threshold = 1.5;
        config.cache.default_list_ttl_secs = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"rate_limit.burst_capacity"));
        assert!(fields.contains(&"circuit_breaker.failure_ratio_threshold"));
        assert!(fields.contains(&"cache.default_list_ttl_secs"));
        assert!(fields.contains(&"listener.bind_address"));
    }

    #[test]
    fn disabled_cache_skips_address_check() {
        let mut config = ServiceConfig::default();
        config.cache.enabled = false;
        config.cache.backend_address = String::new();
        assert!(validate_config(&config).is_ok());

        config.cache.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["cache.backend_address"]);
    }

    #[test]
    fn dependency_problems() {
        let mut config = ServiceConfig::default();
        config.dependencies.push(DependencyConfig::default());
        config.dependencies.push(DependencyConfig {
            name: "billing".into(),
            base_url: "ftp://billing".into(),
            request_timeout_secs: 0,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "dependencies[1].name",
                "dependencies[2].base_url",
                "dependencies[2].request_timeout_secs",
            ]
        );
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let mut config = ServiceConfig::default();
        config.circuit_breaker.open_timeout_secs = u64::MAX;
        config.circuit_breaker.rolling_interval_secs = u64::MAX;
        config.cache.default_list_ttl_secs = MAX_DURATION_SECS + 1;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "circuit_breaker.rolling_interval_secs",
                "circuit_breaker.open_timeout_secs",
                "cache.default_list_ttl_secs",
            ]
        );
    }

    #[test]
    fn duration_bounds_are_inclusive() {
        let mut config = ServiceConfig::default();
        config.circuit_breaker.open_timeout_secs = MAX_DURATION_SECS;
        config.circuit_breaker.rolling_interval_secs = 0;
        config.cache.default_list_ttl_secs = MAX_DURATION_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn admin_requires_key() {
        let mut config = ServiceConfig::default();
        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["admin.api_key"]);
    }
}
