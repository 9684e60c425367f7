//! Generic record endpoints for every CRM collection.
//!
//! # Purpose
//! One set of handlers serves `projects`, `tasks`, `clients`, and the other
//! collections. Each handler declares the action it needs, runs the access
//! pipeline, and narrows its store query with the returned scope.
//!
//! # Key invariants
//! - Every base query carries `isDeleted: false`.
//! - Rows outside the caller's filter are reported as 404, the same as rows
//!   that do not exist.
//! - Bookkeeping fields (`_id`, `createdBy`, `createdAt`, `isDeleted`) are set
//!   by the server and cannot be patched.
use crate::api::error::{ApiError, GatewayError};
use crate::api::types::{RecordDocument, RecordListResponse};
use crate::app::AppState;
use crate::middleware::{ClientKey, RouteAccess, authorize};
use crate::model::{DELETED_FIELD, ID_FIELD};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use trellis_access::{Action, Document};

const MAX_RESOURCE_LEN: usize = 64;
const PROTECTED_FIELDS: [&str; 4] = [ID_FIELD, "createdBy", "createdAt", DELETED_FIELD];

fn validate_resource(resource: &str) -> Result<(), GatewayError> {
    let valid = !resource.is_empty()
        && resource.len() <= MAX_RESOURCE_LEN
        && resource
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-');
    if valid {
        Ok(())
    } else {
        Err(GatewayError::Validation(format!(
            "invalid resource name: {resource}"
        )))
    }
}

fn live_base() -> Document {
    let mut base = Document::new();
    base.insert(DELETED_FIELD.to_string(), Value::Bool(false));
    base
}

/// Equality terms from the query string; `true`/`false` become booleans.
fn base_query(params: BTreeMap<String, String>) -> Result<Document, GatewayError> {
    let mut base = live_base();
    for (key, value) in params {
        if key.is_empty() || key.starts_with('$') {
            return Err(GatewayError::Validation(format!(
                "unsupported query field: {key}"
            )));
        }
        if key == DELETED_FIELD {
            continue;
        }
        let value = match value.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(value),
        };
        base.insert(key, value);
    }
    Ok(base)
}

fn new_record_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(24);
    id
}

#[utoipa::path(
    get,
    path = "/api/v1/data/{resource}",
    tag = "records",
    params(("resource" = String, Path, description = "Collection name")),
    responses(
        (status = 200, description = "Records visible to the caller", body = RecordListResponse),
        (status = 401, description = "Missing or invalid session", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Read not granted", body = crate::api::types::ErrorResponse),
        (status = 429, description = "Rate limited", body = crate::api::types::ErrorResponse)
    )
)]
/// List the caller's visible records in a collection.
///
/// # What it does
/// Builds a base query from the query string, narrows it with the caller's
/// row filter, and returns every match.
///
/// # Errors
/// - 400 for invalid resource names or operator keys in the query string.
/// - 401/403/429 from the access pipeline.
pub(crate) async fn list_records(
    State(state): State<AppState>,
    client: ClientKey,
    Path(resource): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<RecordListResponse>, ApiError> {
    validate_resource(&resource)?;
    let scope = authorize(
        &state,
        &client,
        &headers,
        RouteAccess::resource(&resource, Action::Read),
    )
    .await?;
    let filter = scope.apply_filters(base_query(params)?);
    let items = state
        .store
        .find(&resource, &filter)
        .await
        .map_err(GatewayError::from)?;
    let items: Vec<RecordDocument> = items.into_iter().map(RecordDocument::from).collect();
    Ok(Json(RecordListResponse {
        count: items.len(),
        items,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/data/{resource}",
    tag = "records",
    params(("resource" = String, Path, description = "Collection name")),
    request_body = RecordDocument,
    responses(
        (status = 201, description = "Record created", body = RecordDocument),
        (status = 400, description = "Invalid body", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Create not granted", body = crate::api::types::ErrorResponse)
    )
)]
/// Create a record owned by the caller.
///
/// # What it does
/// Assigns `_id`, `createdBy`, `createdAt`, and `isDeleted: false`. When the
/// collection has a department field and the body omits it, the caller's
/// resolved department id is stored.
pub(crate) async fn create_record(
    State(state): State<AppState>,
    client: ClientKey,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RecordDocument>,
) -> Result<(StatusCode, Json<RecordDocument>), ApiError> {
    validate_resource(&resource)?;
    let scope = authorize(
        &state,
        &client,
        &headers,
        RouteAccess::resource(&resource, Action::Create),
    )
    .await?;
    let caller = scope.require_caller()?;
    let mut doc = body.0;
    for field in PROTECTED_FIELDS {
        doc.remove(field);
    }

    let fields = state.filters.fields().get(&resource);
    if let Some(department_field) = &fields.department
        && department_field != ID_FIELD
        && !doc.contains_key(department_field)
        && let Some(department) = caller.context.department()
    {
        let resolved = state.filters.departments().resolve(department).await;
        doc.insert(department_field.clone(), json!(resolved.id().as_str()));
    }

    let user_id = caller.context.user_id.as_str();
    doc.insert(ID_FIELD.to_string(), json!(new_record_id()));
    doc.insert("createdBy".to_string(), json!(user_id));
    doc.insert("createdAt".to_string(), json!(chrono::Utc::now().to_rfc3339()));
    doc.insert(DELETED_FIELD.to_string(), Value::Bool(false));

    let created = state
        .store
        .insert(&resource, doc)
        .await
        .map_err(GatewayError::from)?;
    tracing::info!(resource = %resource, user = %user_id, "record created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/data/{resource}/{id}",
    tag = "records",
    params(
        ("resource" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record", body = RecordDocument),
        (status = 404, description = "Record not found or not visible", body = crate::api::types::ErrorResponse)
    )
)]
/// Fetch one record if the caller may read it.
pub(crate) async fn get_record(
    State(state): State<AppState>,
    client: ClientKey,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<RecordDocument>, ApiError> {
    validate_resource(&resource)?;
    let scope = authorize(
        &state,
        &client,
        &headers,
        RouteAccess::resource(&resource, Action::Read),
    )
    .await?;
    let mut base = live_base();
    base.insert(ID_FIELD.to_string(), json!(id));
    let found = state
        .store
        .find_one(&resource, &scope.apply_filters(base))
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::NotFound(format!("{resource}/{id}")))?;
    Ok(Json(found.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/data/{resource}/{id}",
    tag = "records",
    params(
        ("resource" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Record id")
    ),
    request_body = RecordDocument,
    responses(
        (status = 200, description = "Updated record", body = RecordDocument),
        (status = 404, description = "Record not found or not visible", body = crate::api::types::ErrorResponse)
    )
)]
/// Merge the body into a record the caller may update.
///
/// # Errors
/// - 400 when the body only touches protected fields.
/// - 404 when the row is missing or outside the caller's filter.
pub(crate) async fn patch_record(
    State(state): State<AppState>,
    client: ClientKey,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<RecordDocument>,
) -> Result<Json<RecordDocument>, ApiError> {
    validate_resource(&resource)?;
    let scope = authorize(
        &state,
        &client,
        &headers,
        RouteAccess::resource(&resource, Action::Update),
    )
    .await?;
    let caller = scope.require_caller()?;
    let mut changes = body.0;
    for field in PROTECTED_FIELDS {
        changes.remove(field);
    }
    if changes.is_empty() {
        return Err(GatewayError::Validation("no updatable fields".to_string()).into());
    }
    changes.insert("updatedBy".to_string(), json!(caller.context.user_id.as_str()));
    changes.insert("updatedAt".to_string(), json!(chrono::Utc::now().to_rfc3339()));

    let mut base = live_base();
    base.insert(ID_FIELD.to_string(), json!(id));
    let updated = state
        .store
        .update_one(&resource, &scope.apply_filters(base), &changes)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::NotFound(format!("{resource}/{id}")))?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/data/{resource}/{id}",
    tag = "records",
    params(
        ("resource" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 204, description = "Record soft-deleted"),
        (status = 404, description = "Record not found or not visible", body = crate::api::types::ErrorResponse)
    )
)]
/// Soft-delete a record the caller may delete.
pub(crate) async fn delete_record(
    State(state): State<AppState>,
    client: ClientKey,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    validate_resource(&resource)?;
    let scope = authorize(
        &state,
        &client,
        &headers,
        RouteAccess::resource(&resource, Action::Delete),
    )
    .await?;
    let caller = scope.require_caller()?;
    let mut changes = Document::new();
    changes.insert(DELETED_FIELD.to_string(), Value::Bool(true));
    changes.insert("deletedBy".to_string(), json!(caller.context.user_id.as_str()));
    changes.insert("deletedAt".to_string(), json!(chrono::Utc::now().to_rfc3339()));

    let mut base = live_base();
    base.insert(ID_FIELD.to_string(), json!(id));
    state
        .store
        .update_one(&resource, &scope.apply_filters(base), &changes)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| GatewayError::NotFound(format!("{resource}/{id}")))?;
    tracing::info!(resource = %resource, id = %id, "record soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}
