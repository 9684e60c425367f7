//! Department identifier resolution for `department` conditions.
//!
//! # Purpose
//! Callers may carry either an opaque department id or a department name.
//! Names are looked up through a [`DepartmentDirectory`] and memoized in an
//! injected [`TtlCache`].
//!
//! # Key invariants
//! - A 24-character hex value is treated as an id and never looked up.
//! - Only successful lookups are cached.
//! - Lookup errors and unknown names degrade to the raw value instead of
//!   failing the request.
use crate::{AccessResult, DepartmentId, TtlCache};
use async_trait::async_trait;
use std::sync::Arc;

/// Name-to-id lookup backed by the department collection.
#[async_trait]
pub trait DepartmentDirectory: Send + Sync {
    async fn department_id_by_name(&self, name: &str) -> AccessResult<Option<String>>;
}

/// How a department value became the id used in a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepartmentResolution {
    /// The value already was an opaque id.
    Passthrough(DepartmentId),
    /// Served from the cache.
    Cached(DepartmentId),
    /// Resolved through the directory and stored in the cache.
    LookedUp(DepartmentId),
    /// Lookup failed or found nothing; the raw value is used.
    Fallback(DepartmentId),
}

impl DepartmentResolution {
    pub fn id(&self) -> &DepartmentId {
        match self {
            DepartmentResolution::Passthrough(id)
            | DepartmentResolution::Cached(id)
            | DepartmentResolution::LookedUp(id)
            | DepartmentResolution::Fallback(id) => id,
        }
    }

    pub fn into_id(self) -> DepartmentId {
        match self {
            DepartmentResolution::Passthrough(id)
            | DepartmentResolution::Cached(id)
            | DepartmentResolution::LookedUp(id)
            | DepartmentResolution::Fallback(id) => id,
        }
    }
}

/// Whether `value` has the shape of a 12-byte hex object id.
pub fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.bytes().all(|byte| byte.is_ascii_hexdigit())
}

#[derive(Clone)]
pub struct DepartmentResolver {
    directory: Arc<dyn DepartmentDirectory>,
    cache: Arc<TtlCache<String, DepartmentId>>,
}

impl DepartmentResolver {
    pub fn new(
        directory: Arc<dyn DepartmentDirectory>,
        cache: Arc<TtlCache<String, DepartmentId>>,
    ) -> Self {
        Self { directory, cache }
    }

    pub fn cache(&self) -> &Arc<TtlCache<String, DepartmentId>> {
        &self.cache
    }

    /// Drop every cached name resolution.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn resolve(&self, department: &str) -> DepartmentResolution {
        let department = department.trim();
        if is_object_id(department) {
            return DepartmentResolution::Passthrough(DepartmentId::new(department));
        }
        let key = department.to_string();
        if let Some(id) = self.cache.get(&key) {
            return DepartmentResolution::Cached(id);
        }
        match self.directory.department_id_by_name(department).await {
            Ok(Some(id)) => {
                let id = DepartmentId::new(id);
                self.cache.insert(key, id.clone());
                DepartmentResolution::LookedUp(id)
            }
            Ok(None) => {
                tracing::debug!(department, "department name not found; using raw value");
                DepartmentResolution::Fallback(DepartmentId::new(department))
            }
            Err(err) => {
                tracing::warn!(department, error = %err, "department lookup failed; using raw value");
                DepartmentResolution::Fallback(DepartmentId::new(department))
            }
        }
    }
}

impl std::fmt::Debug for DepartmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepartmentResolver")
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AccessError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDirectory {
        names: HashMap<String, String>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DepartmentDirectory for CountingDirectory {
        async fn department_id_by_name(&self, name: &str) -> AccessResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AccessError::DepartmentLookup("directory offline".to_string()));
            }
            Ok(self.names.get(name).cloned())
        }
    }

    fn resolver(fail: bool) -> (DepartmentResolver, Arc<CountingDirectory>) {
        let directory = Arc::new(CountingDirectory {
            names: HashMap::from([(
                "Engineering".to_string(),
                "64f000000000000000000aab".to_string(),
            )]),
            calls: AtomicUsize::new(0),
            fail,
        });
        let cache = Arc::new(TtlCache::new(None, 16));
        (DepartmentResolver::new(directory.clone(), cache), directory)
    }

    #[test]
    fn object_id_shape() {
        assert!(is_object_id("64f000000000000000000aab"));
        assert!(is_object_id("64F000000000000000000AAB"));
        assert!(!is_object_id("Engineering"));
        assert!(!is_object_id("64f000000000000000000aa"));
        assert!(!is_object_id("64f000000000000000000aag"));
    }

    #[tokio::test]
    async fn ids_pass_through_without_lookup() {
        let (resolver, directory) = resolver(false);
        let resolved = resolver.resolve("64f000000000000000000aab").await;
        assert!(matches!(resolved, DepartmentResolution::Passthrough(_)));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn names_are_looked_up_once_then_cached() {
        let (resolver, directory) = resolver(false);
        let first = resolver.resolve("Engineering").await;
        assert_eq!(
            first,
            DepartmentResolution::LookedUp(DepartmentId::new("64f000000000000000000aab"))
        );
        let second = resolver.resolve("Engineering").await;
        assert_eq!(
            second,
            DepartmentResolution::Cached(DepartmentId::new("64f000000000000000000aab"))
        );
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

        resolver.clear_cache();
        let third = resolver.resolve("Engineering").await;
        assert!(matches!(third, DepartmentResolution::LookedUp(_)));
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_names_fall_back_and_are_not_cached() {
        let (resolver, directory) = resolver(false);
        let resolved = resolver.resolve("Marketing").await;
        assert_eq!(
            resolved,
            DepartmentResolution::Fallback(DepartmentId::new("Marketing"))
        );
        let _ = resolver.resolve("Marketing").await;
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn lookup_errors_fall_back_to_raw_value() {
        let (resolver, _) = resolver(true);
        let resolved = resolver.resolve(" Engineering ").await;
        assert_eq!(resolved.into_id(), DepartmentId::new("Engineering"));
    }
}
