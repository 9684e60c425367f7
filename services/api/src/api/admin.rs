//! Operator endpoints.
//!
//! # Security considerations
//! Only superadmin callers may reach these handlers; everyone else gets 403.
use crate::api::error::{ApiError, GatewayError};
use crate::api::types::CacheClearResponse;
use crate::app::AppState;
use crate::middleware::{ClientKey, RouteAccess, authorize};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    post,
    path = "/api/v1/admin/caches/clear",
    tag = "admin",
    responses(
        (status = 200, description = "Caches cleared", body = CacheClearResponse),
        (status = 403, description = "Caller is not a superadmin", body = crate::api::types::ErrorResponse)
    )
)]
/// Drop every memoized access decision and department resolution.
///
/// # What it does
/// Forces the next request of every caller to re-read roles, departments,
/// and reports, so role edits apply immediately instead of after the memo
/// TTL.
pub(crate) async fn clear_caches(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
) -> Result<Json<CacheClearResponse>, ApiError> {
    let scope = authorize(&state, &client, &headers, RouteAccess::Authenticated).await?;
    let caller = scope.require_caller()?;
    if !caller.context.is_super_admin {
        return Err(GatewayError::Forbidden {
            resource: "caches".to_string(),
            action: "clear".to_string(),
        }
        .into());
    }

    let access_entries_cleared = state.access_cache.len();
    let department_entries_cleared = state.filters.departments().cache().len();
    state.access_cache.clear();
    state.filters.departments().clear_cache();
    tracing::info!(
        user = %caller.context.user_id,
        access_entries_cleared,
        department_entries_cleared,
        "access caches cleared"
    );
    Ok(Json(CacheClearResponse {
        access_entries_cleared,
        department_entries_cleared,
    }))
}
