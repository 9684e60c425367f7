//! Request pipeline shared by every API entry point.
//!
//! # Purpose
//! Rate limiting runs first, then the access pipeline authenticates the
//! caller, resolves their role context, checks the route's permission, and
//! hands the handler an [`access::AccessScope`] that narrows its queries.
pub mod access;
pub mod rate_limit;

pub use access::{AccessCacheKey, AccessScope, Caller, ResolvedAccess, RouteAccess, authorize};
pub use rate_limit::{ClientKey, RateLimiter, client_key};
