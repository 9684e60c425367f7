//! In-memory implementation of the record store.
//!
//! # Purpose
//! Holds every collection as an insertion-ordered `Vec` of documents guarded
//! by a `tokio::sync::RwLock`. It backs local development, integration tests,
//! and demo deployments seeded from a YAML fixture.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: reads take the read lock, mutations the
//!   write lock, so every operation observes a consistent snapshot.
//!
//! # Query semantics
//! Filters are evaluated with [`trellis_access::matches`], the same matcher
//! the access tests use, so a filter that denies in the library denies here.
//!
//! # Metrics
//! `trellis_documents_total{collection}` tracks collection sizes.
use super::{RecordStore, StoreError, StoreResult};
use crate::model::DELETED_FIELD;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use trellis_access::{Document, matches};

/// Seed fixture: collection name to documents.
pub type SeedData = BTreeMap<String, Vec<Document>>;

#[derive(Default, Clone)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `seed`.
    ///
    /// Seeded documents without an `isDeleted` flag are stored as live.
    ///
    /// # Errors
    /// Fails when a seeded document has no string `_id` or repeats one.
    pub fn with_seed(seed: SeedData) -> StoreResult<Self> {
        let mut collections: HashMap<String, Vec<Document>> = HashMap::new();
        for (collection, docs) in seed {
            let rows = collections.entry(collection.clone()).or_default();
            for mut doc in docs {
                doc.entry(DELETED_FIELD.to_string())
                    .or_insert(Value::Bool(false));
                let id = document_id(&doc)?;
                if rows.iter().any(|row| document_id(row).ok() == Some(id)) {
                    return Err(StoreError::Conflict(format!("{collection}/{id}")));
                }
                rows.push(doc);
            }
            record_size(&collection, rows.len());
        }
        Ok(Self {
            collections: Arc::new(RwLock::new(collections)),
        })
    }

    /// Load a YAML (or JSON) seed fixture from disk.
    pub fn from_seed_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read seed file {}", path.display()))?;
        let seed: SeedData = serde_yaml::from_str(&contents)
            .with_context(|| format!("parse seed file {}", path.display()))?;
        let store = Self::with_seed(seed)?;
        Ok(store)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

fn document_id(doc: &Document) -> StoreResult<&str> {
    doc.get("_id")
        .and_then(|value| value.as_str())
        .ok_or_else(|| StoreError::Invalid("document requires a string _id".to_string()))
}

fn record_size(collection: &str, len: usize) {
    metrics::gauge!("trellis_documents_total", "collection" => collection.to_string())
        .set(len as f64);
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn find(&self, collection: &str, filter: &Document) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(filter, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|row| matches(filter, row)))
            .cloned())
    }

    async fn insert(&self, collection: &str, doc: Document) -> StoreResult<Document> {
        let id = document_id(&doc)?.to_string();
        let mut collections = self.collections.write().await;
        let rows = collections.entry(collection.to_string()).or_default();
        if rows
            .iter()
            .any(|row| document_id(row).ok() == Some(id.as_str()))
        {
            return Err(StoreError::Conflict(format!("{collection}/{id}")));
        }
        rows.push(doc.clone());
        record_size(collection, rows.len());
        Ok(doc)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        changes: &Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(row) = collections
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|row| matches(filter, row)))
        else {
            return Ok(None);
        };
        for (key, value) in changes {
            if key == "_id" {
                continue;
            }
            row.insert(key.clone(), value.clone());
        }
        Ok(Some(row.clone()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        let _guard = self.collections.read().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
