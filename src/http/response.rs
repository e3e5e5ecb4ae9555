//! Response envelope and error mapping.
//!
//! # Responsibilities
//! - Shared `{success, data, error, meta}` envelope, produced by handlers and
//!   decoded by dependency clients
//! - Map error codes to HTTP status codes
//!
//! # Design Decisions
//! - Status is derived from the error code, so codes relayed from a
//!   dependency map the same way as local ones
//! - Internal error details are logged, never echoed to clients

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{codes, ServiceError};

/// Error part of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

/// Pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_count: i64,
}

impl Meta {
    pub fn new(page: i64, page_size: i64, total_count: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total_count + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            page,
            page_size,
            total_pages,
            total_count,
        }
    }
}

/// Standard API envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
        }
    }

    pub fn with_meta(data: T, meta: Meta) -> Self {
        Self {
            meta: Some(meta),
            ..Self::ok(data)
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorInfo {
                code: code.into(),
                message: message.into(),
            }),
            meta: None,
        }
    }
}

/// HTTP status for an error code.
pub fn status_for_code(code: &str) -> StatusCode {
    match code {
        codes::NOT_FOUND => StatusCode::NOT_FOUND,
        codes::BAD_REQUEST | codes::VALIDATION => StatusCode::BAD_REQUEST,
        codes::UNAUTHORIZED => StatusCode::UNAUTHORIZED,
        codes::FORBIDDEN => StatusCode::FORBIDDEN,
        codes::CONFLICT => StatusCode::CONFLICT,
        codes::RATE_LIMIT => StatusCode::TOO_MANY_REQUESTS,
        codes::CIRCUIT_OPEN | codes::SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 200 with data.
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(Envelope::ok(data))).into_response()
}

/// 201 with data.
pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(Envelope::ok(data))).into_response()
}

/// 200 with data and pagination.
pub fn paginated<T: Serialize>(data: T, meta: Meta) -> Response {
    (StatusCode::OK, Json(Envelope::with_meta(data, meta))).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let code = self.code().to_string();
        let status = status_for_code(&code);
        let message = match &self {
            ServiceError::Internal { .. } => {
                tracing::error!(error = %self, source = ?std::error::Error::source(&self), "Internal error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(Envelope::<()>::error(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(status_for_code(codes::RATE_LIMIT), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for_code(codes::CIRCUIT_OPEN), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for_code(codes::SERVICE_UNAVAILABLE), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for_code(codes::NOT_FOUND), StatusCode::NOT_FOUND);
        assert_eq!(status_for_code(codes::VALIDATION), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_code(codes::CONFLICT), StatusCode::CONFLICT);
        assert_eq!(status_for_code(codes::DATABASE), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for_code("SOMETHING_ELSE"), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_envelope_shape() {
        let body = serde_json::to_value(Envelope::<()>::error(codes::RATE_LIMIT, "slow down")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": { "code": "RATE_LIMIT_EXCEEDED", "message": "slow down" }
            })
        );
    }

    #[test]
    fn decodes_remote_envelopes() {
        let ok: Envelope<u32> = serde_json::from_str(r#"{"success":true,"data":5}"#).unwrap();
        assert_eq!(ok.data, Some(5));

        let failed: Envelope<u32> =
            serde_json::from_str(r#"{"success":false,"error":{"code":"NOT_FOUND","message":"user not found"}}"#)
                .unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.unwrap().code, "NOT_FOUND");
    }

    #[test]
    fn meta_rounds_pages_up() {
        assert_eq!(Meta::new(1, 10, 21).total_pages, 3);
        assert_eq!(Meta::new(1, 10, 0).total_pages, 0);
    }

    #[test]
    fn service_errors_map_to_status() {
        let response = ServiceError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = ServiceError::CircuitOpen {
            dependency: "user-service".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = ServiceError::from_remote(codes::NOT_FOUND, "user not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
