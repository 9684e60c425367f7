//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint and the
//! access middleware return the same `{code, message, request_id}` shape.
//!
//! # Key invariants and assumptions
//! - [`GatewayError`] is classified structurally; status codes come from the
//!   variant, never from message text.
//! - Rate-limited responses carry a `Retry-After` header.
//!
//! # Security considerations
//! - Internal and storage errors log details server-side but return generic
//!   messages.
//! - Forbidden responses name the resource/action pair only, never the
//!   conditions that were evaluated.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use thiserror::Error;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use trellis_api::api::error::api_not_found;
///
/// let err = api_not_found("missing");
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// assert_eq!(err.body.code, "not_found");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                request_id: None,
            },
            retry_after_secs: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, code, message)
}

/// Build a 500 Internal Server Error from a store error.
///
/// # What it does
/// Logs the store error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "trellis storage error");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 500 Internal Server Error without a store error.
pub fn api_internal_message(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 401 Unauthorized error.
pub fn api_unauthorized(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Build a 403 Forbidden error.
pub fn api_forbidden(message: &str) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 429 Too Many Requests error with a retry hint.
pub fn api_rate_limited(retry_after_secs: u64) -> ApiError {
    let mut err = ApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "too many requests",
    );
    err.retry_after_secs = Some(retry_after_secs);
    err
}

/// Failures raised by the access pipeline and record handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication required: {0}")]
    Unauthenticated(String),
    #[error("{action} on {resource} is not permitted")]
    Forbidden { resource: String, action: String },
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthenticated(message) => api_unauthorized(&message),
            GatewayError::Forbidden { resource, action } => {
                api_forbidden(&format!("{action} on {resource} is not permitted"))
            }
            GatewayError::RateLimited { retry_after_secs } => api_rate_limited(retry_after_secs),
            GatewayError::Validation(message) => api_validation_error(&message),
            GatewayError::NotFound(what) => api_not_found(&format!("{what} not found")),
            GatewayError::Store(StoreError::NotFound(what)) => {
                api_not_found(&format!("{what} not found"))
            }
            GatewayError::Store(StoreError::Conflict(what)) => {
                api_conflict("already_exists", &format!("{what} already exists"))
            }
            GatewayError::Store(StoreError::Invalid(message)) => api_validation_error(&message),
            GatewayError::Store(err) => api_internal("storage failure", &err),
            GatewayError::Internal(message) => {
                tracing::error!(%message, "trellis internal error");
                api_internal_message("internal error")
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        ApiError::from(self).into_response()
    }
}
