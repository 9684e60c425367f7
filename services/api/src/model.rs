//! Directory records read by the access pipeline.
//!
//! # Purpose
//! Typed views over the `users` and `departments` collections. Every other
//! collection stays an untyped [`Document`] because access filtering only
//! needs field names, not schemas.
use serde::{Deserialize, Serialize};
use trellis_access::Document;

pub const USERS: &str = "users";
pub const ROLES: &str = "roles";
pub const DEPARTMENTS: &str = "departments";

/// Soft-delete flag every API base query carries.
pub const DELETED_FIELD: &str = "isDeleted";
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Name of the role document granting this user's permissions.
    pub role: String,
    /// Department id, matching the department field of every other
    /// collection. Records that hold a department name are resolved through
    /// the department directory at filter time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn from_document(doc: &Document) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::Value::Object(doc.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}
