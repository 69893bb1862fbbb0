//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::{ComponentHealthReport, HealthStatus};
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub backend: String,
    pub components: Vec<ComponentHealthReport>,
}

/// Body returned by the delete endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse<T> {
    pub ok: bool,
    pub deleted_id: T,
}

impl DeletedResponse<Uuid> {
    pub fn event(id: Uuid) -> Self {
        Self { ok: true, deleted_id: id }
    }
}

impl DeletedResponse<String> {
    pub fn session(id: impl Into<String>) -> Self {
        Self {
            ok: true,
            deleted_id: id.into(),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with wire error codes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.response = self.response.with_details(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<watch_core::Error> for ApiError {
    fn from(err: watch_core::Error) -> Self {
        use watch_core::Error;

        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code();

        match &err {
            Error::Auth { message, .. } => ApiError::with_code(status, code, message),
            Error::Validation { field, message, .. } => {
                ApiError::with_code(status, code, "Validation failed")
                    .with_details(vec![format!("{}: {}", field, message)])
            }
            Error::NotFound(_) => ApiError::with_code(status, code, err.to_string()),
            Error::Query(detail) => {
                ApiError::with_code(status, code, "Invalid query").with_details(vec![detail.clone()])
            }
            Error::Conflict(detail) => ApiError::with_code(status, code, detail),
            Error::Serialization(e) => ApiError::with_code(status, code, "Validation failed")
                .with_details(vec![format!("body: {}", e)]),
            // Detail is logged by the service layer, never returned
            Error::Database(_) => ApiError::with_code(status, code, "Database error"),
            Error::Internal(_) => ApiError::with_code(status, code, "Internal error"),
        }
    }
}
