//! Caller authentication.
//!
//! # Purpose
//! Bearer extraction and HS256 session token verification. Authorization
//! (roles, conditions) happens later in the access middleware.
pub mod session;

pub use session::{SessionClaims, SessionError, SessionVerifier};

use axum::http::HeaderMap;

/// Bearer token from the `Authorization` header, if present and non-empty.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
