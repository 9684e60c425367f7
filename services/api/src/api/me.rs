//! Caller introspection endpoints.
//!
//! # Purpose
//! Let clients render only what the caller may do: `/me` echoes the resolved
//! context, `/me/permissions` lists permitted actions per resource.
use crate::api::error::ApiError;
use crate::api::types::{MeResponse, PermissionSummary};
use crate::app::AppState;
use crate::middleware::{ClientKey, RouteAccess, authorize};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use std::collections::BTreeMap;

#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "me",
    responses(
        (status = 200, description = "Resolved caller context", body = MeResponse),
        (status = 401, description = "Missing or invalid session", body = crate::api::types::ErrorResponse)
    )
)]
/// Return the caller's resolved identity, department, and reports.
pub(crate) async fn me(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let scope = authorize(&state, &client, &headers, RouteAccess::Authenticated).await?;
    let caller = scope.require_caller()?;
    let ctx = &caller.context;
    Ok(Json(MeResponse {
        user_id: ctx.user_id.to_string(),
        email: ctx.user_email.clone(),
        role: ctx.user_role.clone(),
        department: ctx.user_department.clone(),
        subordinate_ids: ctx.subordinate_ids.iter().map(ToString::to_string).collect(),
        is_super_admin: ctx.is_super_admin,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/permissions",
    tag = "me",
    responses(
        (status = 200, description = "Permitted actions per resource", body = PermissionSummary),
        (status = 401, description = "Missing or invalid session", body = crate::api::types::ErrorResponse)
    )
)]
/// List permitted actions for every resource the role or field map names.
///
/// # What it does
/// Superadmins get every action on every known resource. Other callers get
/// the actions their role grants; resources with none are omitted.
pub(crate) async fn my_permissions(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
) -> Result<Json<PermissionSummary>, ApiError> {
    let scope = authorize(&state, &client, &headers, RouteAccess::Authenticated).await?;
    let caller = scope.require_caller()?;
    let evaluator = state.filters.evaluator();

    let mut names: Vec<&str> = state.filters.fields().resources();
    names.extend(
        caller
            .permissions()
            .iter()
            .map(|permission| permission.resource.as_str()),
    );

    let mut resources = BTreeMap::new();
    for name in names {
        if resources.contains_key(name) {
            continue;
        }
        let actions = evaluator.permitted_actions(name, caller.permissions(), &caller.context);
        if !actions.is_empty() {
            resources.insert(name.to_string(), actions);
        }
    }

    Ok(Json(PermissionSummary {
        role: caller.role.name.clone(),
        is_super_admin: caller.context.is_super_admin,
        resources,
    }))
}
