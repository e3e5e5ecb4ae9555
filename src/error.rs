//! Service error taxonomy.
//!
//! Every user-facing failure carries a stable string code. The HTTP layer
//! maps codes to status codes (see [`crate::http::response`]); dependency
//! clients reuse the same codes when they decode a remote error envelope.

use std::error::Error as StdError;

use thiserror::Error;

/// Stable error codes shared by every service.
pub mod codes {
    pub const INTERNAL: &str = "INTERNAL_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const CONFLICT: &str = "CONFLICT";
    pub const VALIDATION: &str = "VALIDATION_ERROR";
    pub const DATABASE: &str = "DATABASE_ERROR";
    pub const CIRCUIT_OPEN: &str = "CIRCUIT_OPEN";
    pub const RATE_LIMIT: &str = "RATE_LIMIT_EXCEEDED";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
}

type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors surfaced by services built on this crate.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Admission rejected by the gatekeeper.
    #[error("rate limit exceeded, please try again later")]
    RateLimited,

    /// The breaker guarding `dependency` refused the call.
    #[error("{dependency} is temporarily unavailable")]
    CircuitOpen { dependency: String },

    /// The dependency answered, but not usefully (transport error, 5xx).
    #[error("{message}")]
    ServiceUnavailable { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Error relayed verbatim from a dependency's envelope.
    #[error("{code}: {message}")]
    Remote { code: String, message: String },

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ServiceError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build an error from a remote `{code, message}` pair, folding known
    /// codes back into their typed variants.
    pub fn from_remote(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            codes::SERVICE_UNAVAILABLE => Self::ServiceUnavailable { message },
            codes::BAD_REQUEST => Self::BadRequest(message),
            codes::VALIDATION => Self::Validation(message),
            codes::CONFLICT => Self::Conflict(message),
            _ => Self::Remote {
                code: code.to_string(),
                message,
            },
        }
    }

    /// The stable code reported to clients.
    pub fn code(&self) -> &str {
        match self {
            Self::RateLimited => codes::RATE_LIMIT,
            Self::CircuitOpen { .. } => codes::CIRCUIT_OPEN,
            Self::ServiceUnavailable { .. } => codes::SERVICE_UNAVAILABLE,
            Self::NotFound { .. } => codes::NOT_FOUND,
            Self::BadRequest(_) => codes::BAD_REQUEST,
            Self::Validation(_) => codes::VALIDATION,
            Self::Conflict(_) => codes::CONFLICT,
            Self::Remote { code, .. } => code,
            Self::Internal { .. } => codes::INTERNAL,
        }
    }

    /// True for the conditions a graceful-degradation policy may absorb.
    pub fn is_dependency_unavailable(&self) -> bool {
        matches!(self.code(), codes::CIRCUIT_OPEN | codes::SERVICE_UNAVAILABLE)
    }
}
