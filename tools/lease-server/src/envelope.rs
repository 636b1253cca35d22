//! Response envelope and error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use lease_core::{ErrorKind, LeaseError};
use serde::{Deserialize, Serialize};

/// Message returned when a page has no live lease.
pub const NOT_FOUND_MESSAGE: &str = "Lease not found.";

/// Envelope wrapped around every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub response_time: String,
    pub result: serde_json::Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(result: T) -> Self {
        Self::new(true, serde_json::to_value(result).unwrap_or_default())
    }

    pub fn failure(result: serde_json::Value) -> Self {
        Self::new(false, result)
    }

    fn new(success: bool, result: serde_json::Value) -> Self {
        Self {
            success,
            response_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            result,
        }
    }
}

/// Errors returned from handlers.
#[derive(Debug)]
pub enum ApiError {
    /// A lease protocol failure.
    Lease(LeaseError),
    /// Malformed request.
    BadRequest(String),
    /// No live lease for the page.
    NotFound,
}

impl From<LeaseError> for ApiError {
    fn from(err: LeaseError) -> Self {
        ApiError::Lease(err)
    }
}

/// HTTP status for each lease error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut kind = None;
        let (status, result) = match self {
            ApiError::Lease(err) => {
                kind = Some(err.kind());
                (
                    status_for(err.kind()),
                    serde_json::json!({ "error": err.to_string(), "kind": err.kind() }),
                )
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message, "kind": "bad_request" }),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                serde_json::Value::from(NOT_FOUND_MESSAGE),
            ),
        };

        let mut response = (status, Json(ApiResponse::failure(result))).into_response();
        // Read back by the access log.
        if let Some(kind) = kind {
            response.extensions_mut().insert(kind);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok("OK")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["result"], "OK");

        let time = json["responseTime"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
        assert!(time.ends_with('Z'));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::StoreUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_lease_error_response() {
        let response = ApiError::from(LeaseError::not_found("p")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.extensions().get::<ErrorKind>(),
            Some(&ErrorKind::NotFound)
        );

        let response = ApiError::BadRequest("pageName is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
