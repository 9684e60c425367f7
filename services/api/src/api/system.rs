//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Lightweight public endpoints for probes and service discovery. They are
//! rate limited but never authenticated.
use crate::api::error::{ApiError, api_internal};
use crate::api::types::{HealthStatus, SystemInfo};
use crate::app::AppState;
use crate::middleware::{ClientKey, RouteAccess, authorize};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

#[utoipa::path(
    get,
    path = "/api/v1/system/info",
    tag = "system",
    responses(
        (status = 200, description = "Service identity", body = SystemInfo)
    )
)]
/// Return service identity and the resources with a condition field map.
pub(crate) async fn system_info(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
) -> Result<Json<SystemInfo>, ApiError> {
    authorize(&state, &client, &headers, RouteAccess::Public).await?;
    Ok(Json(SystemInfo {
        service: state.service_name.clone(),
        api_version: state.api_version.clone(),
        storage_backend: state.store.backend_name().to_string(),
        resources: state
            .filters
            .fields()
            .resources()
            .into_iter()
            .map(str::to_string)
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/system/health",
    tag = "system",
    responses(
        (status = 200, description = "Service health", body = HealthStatus),
        (status = 500, description = "Storage unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store and return `ok` if healthy.
///
/// # Errors
/// - Returns 500 if the storage health check fails.
pub(crate) async fn system_health(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
) -> Result<Json<HealthStatus>, ApiError> {
    authorize(&state, &client, &headers, RouteAccess::Public).await?;
    if let Err(err) = state.store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
