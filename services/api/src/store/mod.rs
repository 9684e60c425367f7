//! Document storage traits used by the API and the access pipeline.
//!
//! # Purpose
//! [`RecordStore`] is the collection-level document interface the record
//! handlers use. [`DirectoryStore`] layers the user, role, and department
//! lookups the middleware needs on top of it.
//!
//! # Key invariants
//! - Filters passed to `find`/`find_one`/`update_one` are already narrowed by
//!   the access layer; stores never apply permissions themselves.
//! - Returned documents are copies; mutating them has no effect on storage.
use crate::model::{DEPARTMENTS, DELETED_FIELD, Department, ROLES, USERS, User};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use trellis_access::{AccessError, AccessResult, DepartmentDirectory, Document, Role};

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid document: {0}")]
    Invalid(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(&self, collection: &str, filter: &Document) -> StoreResult<Vec<Document>>;
    async fn find_one(&self, collection: &str, filter: &Document)
    -> StoreResult<Option<Document>>;
    /// Insert a document carrying an `_id`; duplicate ids are a conflict.
    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<Document>;
    /// Merge `changes` into the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        changes: &Document,
    ) -> StoreResult<Option<Document>>;
    async fn health_check(&self) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait DirectoryStore: RecordStore {
    async fn get_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let Some(doc) = self.find_one(USERS, &live(json!({"_id": user_id}))).await? else {
            return Ok(None);
        };
        User::from_document(&doc)
            .map(Some)
            .map_err(|err| StoreError::Invalid(format!("user {user_id}: {err}")))
    }

    async fn get_role(&self, name: &str) -> StoreResult<Option<Role>> {
        let Some(doc) = self.find_one(ROLES, &live(json!({"name": name}))).await? else {
            return Ok(None);
        };
        let role: Role = serde_json::from_value(Value::Object(doc))
            .map_err(|err| StoreError::Invalid(format!("role {name}: {err}")))?;
        role.validate()
            .map_err(|err| StoreError::Invalid(format!("role {name}: {err}")))?;
        Ok(Some(role))
    }

    async fn find_department_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        let Some(doc) = self
            .find_one(DEPARTMENTS, &live(json!({"name": name})))
            .await?
        else {
            return Ok(None);
        };
        serde_json::from_value(Value::Object(doc))
            .map(Some)
            .map_err(|err| StoreError::Invalid(format!("department {name}: {err}")))
    }

    /// Every user reporting to `manager_id`, directly or transitively.
    ///
    /// Walks the `managerId` graph breadth first; cycles terminate because a
    /// user is visited at most once and the manager is never its own report.
    async fn subordinate_ids(&self, manager_id: &str) -> StoreResult<Vec<String>> {
        let mut seen = HashSet::from([manager_id.to_string()]);
        let mut ordered = Vec::new();
        let mut frontier = vec![manager_id.to_string()];
        while !frontier.is_empty() {
            let filter = live(json!({"managerId": {"$in": frontier}}));
            let reports = self.find(USERS, &filter).await?;
            frontier = reports
                .iter()
                .filter_map(|doc| doc.get("_id").and_then(Value::as_str))
                .filter(|id| seen.insert(id.to_string()))
                .map(str::to_string)
                .collect();
            ordered.extend(frontier.iter().cloned());
        }
        Ok(ordered)
    }
}

impl<T> DirectoryStore for T where T: RecordStore {}

/// Filter on `base` that also excludes soft-deleted documents.
fn live(base: Value) -> Document {
    let mut filter = match base {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    filter.insert(DELETED_FIELD.to_string(), json!({"$ne": true}));
    filter
}

/// Adapts a [`DirectoryStore`] to the department lookup used by filters.
#[derive(Clone)]
pub struct StoreDepartmentDirectory {
    store: Arc<dyn DirectoryStore>,
}

impl StoreDepartmentDirectory {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DepartmentDirectory for StoreDepartmentDirectory {
    async fn department_id_by_name(&self, name: &str) -> AccessResult<Option<String>> {
        self.store
            .find_department_by_name(name)
            .await
            .map(|department| department.map(|department| department.id))
            .map_err(|err| AccessError::DepartmentLookup(err.to_string()))
    }
}
