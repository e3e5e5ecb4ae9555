//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config = parse_config("service_name = \"audit-log-service\"\n").unwrap();
        assert_eq!(config.service_name, "audit-log-service");
        assert_eq!(config.circuit_breaker.min_requests, 3);
        assert_eq!(config.cache.default_list_ttl_secs, 60);
        assert_eq!(config.dependencies.len(), 1);
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [rate_limit]
            requests_per_second = 2.0
            burst_capacity = 2

            [circuit_breaker]
            open_timeout_secs = 5

            [[dependencies]]
            name = "user-service"
            base_url = "http://users:8081"
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.burst_capacity, 2);
        assert_eq!(config.circuit_breaker.open_timeout_secs, 5);
        assert_eq!(config.circuit_breaker.max_half_open_requests, 3);
        let users = config.dependency("user-service").unwrap();
        assert_eq!(users.base_url, "http://users:8081");
        assert_eq!(users.request_timeout_secs, 10);
    }

    #[test]
    fn invalid_values_are_fatal() {
        let err = parse_config("[rate_limit]\nrequests_per_second = 0.0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors[0].field, "rate_limit.requests_per_second")
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = parse_config("[rate_limit\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
