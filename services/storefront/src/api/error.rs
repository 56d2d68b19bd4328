//! API error types and helpers.
//!
//! # Purpose
//! Centralizes HTTP error construction so every endpoint returns the same
//! `{ code, message, request_id }` shape, and maps the domain lifecycle
//! error taxonomy onto status codes in exactly one place.
//!
//! # Security considerations
//! Internal errors are logged server-side with detail and returned to the
//! client as a generic message. Not-found responses are tenant-scoped
//! upstream, so they cannot confirm the existence of another tenant's
//! bindings.
use crate::api::types::ErrorResponse;
use crate::domains::DomainError;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Structured API error: an HTTP status coupled with a JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn build(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// 404 with a stable `not_found` code.
pub fn api_not_found(message: &str) -> ApiError {
    build(StatusCode::NOT_FOUND, "not_found", message)
}

/// 409 with a caller-provided conflict code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    build(StatusCode::CONFLICT, code, message)
}

/// 400 for malformed or rejected input.
pub fn api_validation_error(message: &str) -> ApiError {
    build(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// 500 from a store error. Logs detail server-side, returns a generic body.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "storefront storage error");
    build(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Translate a lifecycle error into the API taxonomy.
pub fn api_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation(message) => api_validation_error(&message),
        DomainError::Conflict(message) => api_conflict("domain_conflict", &message),
        DomainError::NotFound(what) => api_not_found(&format!("{what} not found")),
        DomainError::Store(err) => api_internal("storage failure", &err),
    }
}
