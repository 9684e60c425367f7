//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the Trellis REST API and OpenAPI schema
//! generation. Record bodies are free-form JSON objects.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    /// Resources with a registered condition field map.
    pub resources: Vec<String>,
}

/// Free-form record body; field names are collection-specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct RecordDocument(pub Map<String, Value>);

impl From<Map<String, Value>> for RecordDocument {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordListResponse {
    pub items: Vec<RecordDocument>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub department: Option<String>,
    pub subordinate_ids: Vec<String>,
    pub is_super_admin: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionSummary {
    pub role: String,
    pub is_super_admin: bool,
    /// Permitted actions keyed by resource; resources without access are omitted.
    pub resources: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CacheClearResponse {
    pub access_entries_cleared: usize,
    pub department_entries_cleared: usize,
}
