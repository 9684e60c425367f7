//! Route access pipeline.
//!
//! # Purpose
//! Every handler calls [`authorize`] with the access its route declares and
//! receives an [`AccessScope`] to narrow its queries with.
//!
//! # Pipeline
//! 1. Rate limit per client key.
//! 2. Public routes stop here.
//! 3. Bearer token extraction and session verification. Every request pays
//!    for the signature check; nothing is served to an unverified token.
//! 4. Memo lookup. A hit skips user, role, and subordinate resolution.
//! 5. Action check for `(resource, action)`; refusal is a 403.
//! 6. Row filter construction, memoized with the context.
//!
//! # Key invariants
//! - A memo entry is never served past its TTL or past its token's `exp`.
//! - A memo entry is only served to a token whose verified subject is the
//!   entry's caller.
//! - Refusals are not memoized.
//! - Role changes take effect once the memo TTL elapses or the cache is cleared.
use crate::api::error::GatewayError;
use crate::app::AppState;
use crate::auth::{SessionClaims, extract_bearer};
use crate::middleware::ClientKey;
use axum::http::HeaderMap;
use std::sync::Arc;
use trellis_access::{AccessFilter, Action, Document, FilterContext, Permission, Role};

const TOKEN_SUFFIX_LEN: usize = 32;

/// Access a route requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// No authentication; only rate limiting applies.
    Public,
    /// Any verified caller.
    Authenticated,
    /// A verified caller holding `action` on `resource`.
    Resource { resource: String, action: Action },
}

impl RouteAccess {
    pub fn resource(resource: impl Into<String>, action: Action) -> Self {
        RouteAccess::Resource {
            resource: resource.into(),
            action,
        }
    }

    fn cache_parts(&self) -> (&str, &str) {
        match self {
            RouteAccess::Public | RouteAccess::Authenticated => ("", ""),
            RouteAccess::Resource { resource, action } => (resource.as_str(), action.as_str()),
        }
    }
}

/// Resolved caller identity and role.
#[derive(Debug, Clone)]
pub struct Caller {
    pub context: FilterContext,
    pub role: Role,
}

impl Caller {
    pub fn permissions(&self) -> &[Permission] {
        &self.role.permissions
    }
}

/// Memoized outcome of a successful authorization.
#[derive(Debug, Clone)]
pub struct ResolvedAccess {
    pub caller: Arc<Caller>,
    pub filter: AccessFilter,
    /// Token expiry (seconds since epoch); the entry dies with the token.
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessCacheKey {
    resource: String,
    action: String,
    token_suffix: String,
}

impl AccessCacheKey {
    pub fn new(resource: &str, action: &str, token: &str) -> Self {
        let start = token.len().saturating_sub(TOKEN_SUFFIX_LEN);
        let token_suffix = token.get(start..).unwrap_or(token).to_string();
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            token_suffix,
        }
    }
}

/// What a handler may see.
#[derive(Debug, Clone)]
pub struct AccessScope {
    caller: Option<Arc<Caller>>,
    filter: AccessFilter,
}

impl AccessScope {
    pub fn public() -> Self {
        Self {
            caller: None,
            filter: AccessFilter::Unrestricted,
        }
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_deref()
    }

    /// The resolved caller; only public routes produce a scope without one,
    /// so a handler asking for it on such a route is a wiring bug.
    pub fn require_caller(&self) -> Result<&Caller, GatewayError> {
        self.caller()
            .ok_or_else(|| GatewayError::Internal("route scope has no caller".to_string()))
    }

    pub fn filter(&self) -> &AccessFilter {
        &self.filter
    }

    /// Narrow `base` to the rows this caller may touch on the route's resource.
    pub fn apply_filters(&self, base: Document) -> Document {
        self.filter.apply(base)
    }
}

impl From<ResolvedAccess> for AccessScope {
    fn from(resolved: ResolvedAccess) -> Self {
        Self {
            caller: Some(resolved.caller),
            filter: resolved.filter,
        }
    }
}

/// Run the access pipeline for one request.
///
/// # Errors
/// - `RateLimited` when the client key is over its window.
/// - `Unauthenticated` for missing, invalid, or expired tokens and unknown or
///   inactive users.
/// - `Forbidden` when the role does not grant the route's action.
/// - `Store` when directory lookups fail.
pub async fn authorize(
    state: &AppState,
    client: &ClientKey,
    headers: &HeaderMap,
    route: RouteAccess,
) -> Result<AccessScope, GatewayError> {
    if let Err(retry_after_secs) = state.rate_limiter.check(client.as_str()) {
        metrics::counter!("trellis_rate_limited_total").increment(1);
        tracing::debug!(%client, retry_after_secs, "rate limit exceeded");
        return Err(GatewayError::RateLimited { retry_after_secs });
    }

    if route == RouteAccess::Public {
        return Ok(AccessScope::public());
    }

    let token = extract_bearer(headers)
        .ok_or_else(|| GatewayError::Unauthenticated("missing bearer token".to_string()))?;
    let claims = state.sessions.verify(token).map_err(|err| {
        tracing::debug!(error = %err, "session verification failed");
        GatewayError::Unauthenticated("invalid session token".to_string())
    })?;

    let (resource, action) = route.cache_parts();
    let key = AccessCacheKey::new(resource, action, token);
    let now = chrono::Utc::now().timestamp();
    if let Some(hit) = state.access_cache.get(&key) {
        if hit.expires_at > now && hit.caller.context.user_id.as_str() == claims.sub {
            metrics::counter!("trellis_context_cache_total", "outcome" => "hit").increment(1);
            return Ok(hit.into());
        }
        state.access_cache.remove(&key);
    }
    metrics::counter!("trellis_context_cache_total", "outcome" => "miss").increment(1);

    let caller = Arc::new(resolve_caller(state, &claims).await?);

    let filter = match &route {
        RouteAccess::Resource { resource, action } => {
            let evaluator = state.filters.evaluator();
            if !evaluator.allows(resource, action.as_str(), caller.permissions(), &caller.context) {
                metrics::counter!(
                    "trellis_access_denied_total",
                    "resource" => resource.clone(),
                    "action" => action.as_str()
                )
                .increment(1);
                tracing::info!(
                    user = %caller.context.user_id,
                    role = %caller.context.user_role,
                    resource = %resource,
                    action = %action,
                    "access denied"
                );
                return Err(GatewayError::Forbidden {
                    resource: resource.clone(),
                    action: action.as_str().to_string(),
                });
            }
            state
                .filters
                .build(resource, caller.permissions(), &caller.context)
                .await
        }
        RouteAccess::Authenticated | RouteAccess::Public => AccessFilter::Unrestricted,
    };

    let resolved = ResolvedAccess {
        caller,
        filter,
        expires_at: claims.exp,
    };
    state.access_cache.insert(key, resolved.clone());
    Ok(resolved.into())
}

/// Build the caller context from verified claims and the directory.
pub async fn resolve_caller(
    state: &AppState,
    claims: &SessionClaims,
) -> Result<Caller, GatewayError> {
    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| GatewayError::Unauthenticated("unknown user".to_string()))?;
    if !user.active {
        return Err(GatewayError::Unauthenticated("account disabled".to_string()));
    }

    let role = match state.store.get_role(&user.role).await? {
        Some(role) => role,
        None => {
            tracing::warn!(user = %user.id, role = %user.role, "role not found; granting nothing");
            Role::new(user.role.clone(), Vec::new())
        }
    };

    let mut context = FilterContext::new(&user.id, &user.email, &role.name);
    if let Some(department) = &user.department {
        context = context.with_department(department);
    }
    if role.is_super_admin() {
        context = context.super_admin();
    } else {
        context = context.with_subordinates(state.store.subordinate_ids(&user.id).await?);
    }
    Ok(Caller { context, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_access::Predicate;

    #[test]
    fn cache_key_keeps_token_suffix() {
        let key = AccessCacheKey::new("tasks", "read", &"x".repeat(40));
        assert_eq!(key.token_suffix.len(), TOKEN_SUFFIX_LEN);
        let short = AccessCacheKey::new("tasks", "read", "abc");
        assert_eq!(short.token_suffix, "abc");
        assert_ne!(
            AccessCacheKey::new("tasks", "read", "abc"),
            AccessCacheKey::new("tasks", "update", "abc")
        );
    }

    #[test]
    fn scope_applies_its_filter() {
        let scope = AccessScope {
            caller: None,
            filter: AccessFilter::AnyOf(vec![Predicate::eq("assignedTo", "u1")]),
        };
        let base = json!({"isDeleted": false}).as_object().cloned().expect("object");
        assert_eq!(
            serde_json::Value::Object(scope.apply_filters(base)),
            json!({"isDeleted": false, "$and": [{"isDeleted": false}, {"$or": [{"assignedTo": "u1"}]}]})
        );
        assert!(matches!(
            scope.require_caller(),
            Err(GatewayError::Internal(_))
        ));
    }

    #[test]
    fn public_scope_is_unrestricted() {
        let scope = AccessScope::public();
        let base = json!({"isDeleted": false}).as_object().cloned().expect("object");
        assert_eq!(scope.apply_filters(base.clone()), base);
        assert!(scope.caller().is_none());
    }
}
