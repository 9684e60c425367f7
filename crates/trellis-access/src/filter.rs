//! Query filter construction from evaluated permissions.
//!
//! # Purpose
//! Combines the [`PermissionEvaluator`] decision, the per-resource field map,
//! and department resolution into an [`AccessFilter`], and renders it against
//! a caller-supplied base query.
//!
//! # Key invariants
//! - Never fails: denial is expressed as a never-matching filter.
//! - A required department the caller does not have denies the whole filter.
//! - Conditions that have no field on the resource are skipped; if nothing is
//!   left, the filter denies.
//!
//! # Security considerations
//! - Denied queries yield empty results, which callers cannot tell apart from
//!   "no data". Log decisions at `debug` when diagnosing access reports.
use crate::{
    AccessDecision, AccessFilter, AssigneeField, Condition, DepartmentResolver, Document,
    FilterContext, Permission, PermissionEvaluator, Predicate, ResourceFieldRegistry,
};

#[derive(Debug, Clone)]
pub struct QueryFilterBuilder {
    evaluator: PermissionEvaluator,
    fields: ResourceFieldRegistry,
    departments: DepartmentResolver,
}

impl QueryFilterBuilder {
    pub fn new(
        evaluator: PermissionEvaluator,
        fields: ResourceFieldRegistry,
        departments: DepartmentResolver,
    ) -> Self {
        Self {
            evaluator,
            fields,
            departments,
        }
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    pub fn fields(&self) -> &ResourceFieldRegistry {
        &self.fields
    }

    pub fn departments(&self) -> &DepartmentResolver {
        &self.departments
    }

    /// Build the row-level filter for `resource`.
    pub async fn build(
        &self,
        resource: &str,
        permissions: &[Permission],
        ctx: &FilterContext,
    ) -> AccessFilter {
        match self.evaluator.evaluate(resource, permissions, ctx) {
            AccessDecision::Unrestricted => AccessFilter::Unrestricted,
            AccessDecision::Denied => {
                tracing::debug!(resource, user = %ctx.user_id, "no permission entry; denying");
                AccessFilter::Deny
            }
            AccessDecision::Scoped(conditions) => self.scoped(resource, &conditions, ctx).await,
        }
    }

    /// Narrow `base` to the rows the caller may access.
    ///
    /// # Example
    /// ```rust
    /// # use std::sync::Arc;
    /// # use async_trait::async_trait;
    /// # use serde_json::json;
    /// # use trellis_access::*;
    /// # struct NoDepartments;
    /// # #[async_trait]
    /// # impl DepartmentDirectory for NoDepartments {
    /// #     async fn department_id_by_name(&self, _: &str) -> AccessResult<Option<String>> { Ok(None) }
    /// # }
    /// # async fn demo() {
    /// let builder = QueryFilterBuilder::new(
    ///     PermissionEvaluator::default(),
    ///     ResourceFieldRegistry::default(),
    ///     DepartmentResolver::new(Arc::new(NoDepartments), Arc::new(TtlCache::new(None, 16))),
    /// );
    /// let perms = vec![
    ///     Permission::new("tasks", [Action::Read]).with_conditions(Conditions::only(Condition::Assigned)),
    /// ];
    /// let ctx = FilterContext::new("u1", "u1@example.com", "agent");
    /// let base = json!({"isDeleted": false}).as_object().cloned().unwrap_or_default();
    /// let scoped = builder.apply_permission_filters(base, "tasks", &perms, &ctx).await;
    /// assert_eq!(
    ///     serde_json::Value::Object(scoped),
    ///     json!({"isDeleted": false, "$and": [{"isDeleted": false}, {"$or": [{"assignedTo": "u1"}]}]})
    /// );
    /// # }
    /// ```
    pub async fn apply_permission_filters(
        &self,
        base: Document,
        resource: &str,
        permissions: &[Permission],
        ctx: &FilterContext,
    ) -> Document {
        self.build(resource, permissions, ctx).await.apply(base)
    }

    async fn scoped(
        &self,
        resource: &str,
        conditions: &[Condition],
        ctx: &FilterContext,
    ) -> AccessFilter {
        let fields = self.fields.get(resource);
        let user_id = ctx.user_id.as_str();
        let mut predicates = Vec::with_capacity(conditions.len());

        for condition in conditions {
            match condition {
                Condition::Own => predicates.push(Predicate::eq(&fields.own, user_id)),
                Condition::Department => {
                    let Some(field) = &fields.department else {
                        tracing::debug!(resource, "department condition has no field; skipped");
                        continue;
                    };
                    let Some(department) = ctx.department() else {
                        tracing::warn!(
                            resource,
                            user = %ctx.user_id,
                            "department condition without caller department; denying"
                        );
                        return AccessFilter::Deny;
                    };
                    let id = self.departments.resolve(department).await.into_id();
                    predicates.push(Predicate::eq(field, id.as_str()));
                }
                Condition::Assigned => match &fields.assigned {
                    Some(AssigneeField::Single(field)) => {
                        predicates.push(Predicate::eq(field, user_id));
                    }
                    Some(AssigneeField::Many(field)) => {
                        predicates.push(Predicate::is_in(field, [user_id]));
                    }
                    None => {
                        tracing::debug!(resource, "assigned condition has no field; skipped");
                    }
                },
                Condition::Subordinates => predicates.push(Predicate::is_in(
                    &fields.own,
                    ctx.subordinate_ids.iter().map(|id| id.as_str()),
                )),
            }
        }

        if predicates.is_empty() {
            tracing::debug!(resource, user = %ctx.user_id, "no applicable predicates; denying");
            return AccessFilter::Deny;
        }
        AccessFilter::AnyOf(predicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AccessError, AccessResult, Action, Conditions, DepartmentDirectory, TtlCache, matches,
    };
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ENGINEERING_ID: &str = "64f0000000000000000000ab";

    struct FakeDirectory {
        names: HashMap<String, String>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DepartmentDirectory for FakeDirectory {
        async fn department_id_by_name(&self, name: &str) -> AccessResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AccessError::DepartmentLookup("unavailable".to_string()));
            }
            Ok(self.names.get(name).cloned())
        }
    }

    fn builder_with(fail: bool) -> (QueryFilterBuilder, Arc<FakeDirectory>) {
        let directory = Arc::new(FakeDirectory {
            names: HashMap::from([("Engineering".to_string(), ENGINEERING_ID.to_string())]),
            calls: AtomicUsize::new(0),
            fail,
        });
        let resolver = DepartmentResolver::new(directory.clone(), Arc::new(TtlCache::new(None, 8)));
        (
            QueryFilterBuilder::new(
                PermissionEvaluator::default(),
                ResourceFieldRegistry::default(),
                resolver,
            ),
            directory,
        )
    }

    fn builder() -> QueryFilterBuilder {
        builder_with(false).0
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("object")
    }

    fn perm(resource: &str, conditions: Value) -> Permission {
        Permission::new(resource, [Action::Read])
            .with_conditions(serde_json::from_value::<Conditions>(conditions).expect("conditions"))
    }

    fn agent() -> FilterContext {
        FilterContext::new("u1", "u1@example.com", "agent").with_department("Engineering")
    }

    #[tokio::test]
    async fn super_admin_gets_base_query_for_every_combination() {
        let builder = builder();
        let ctx = FilterContext::new("root", "root@example.com", "superadmin").super_admin();
        let base = doc(json!({"isDeleted": false}));
        let combos = [
            json!({}),
            json!({"own": true}),
            json!({"department": true, "assigned": true}),
            json!({"subordinates": true, "unrestricted": false}),
        ];
        for resource in ["users", "projects", "tasks", "invoices"] {
            for conditions in &combos {
                let perms = vec![perm(resource, conditions.clone())];
                let scoped = builder
                    .apply_permission_filters(base.clone(), resource, &perms, &ctx)
                    .await;
                assert_eq!(scoped, base);
            }
            let scoped = builder
                .apply_permission_filters(base.clone(), resource, &[], &ctx)
                .await;
            assert_eq!(scoped, base);
        }
    }

    #[tokio::test]
    async fn missing_permission_matches_nothing() {
        let builder = builder();
        let scoped = builder
            .apply_permission_filters(doc(json!({})), "projects", &[], &agent())
            .await;
        let rows = [
            json!({"_id": "p1", "ownerId": "u1"}),
            json!({"_id": "p2", "department": ENGINEERING_ID}),
        ];
        for row in rows {
            assert!(!matches(&scoped, &doc(row)));
        }
    }

    #[tokio::test]
    async fn unrestricted_returns_base_unchanged() {
        let builder = builder();
        let base = doc(json!({"status": "active"}));
        let perms = vec![perm("clients", json!({"unrestricted": true, "own": true}))];
        let scoped = builder
            .apply_permission_filters(base.clone(), "clients", &perms, &agent())
            .await;
        assert_eq!(scoped, base);
    }

    #[tokio::test]
    async fn users_default_to_own_id() {
        let builder = builder();
        let perms = vec![Permission::new("users", [Action::Read])];
        let filter = builder.build("users", &perms, &agent()).await;
        assert_eq!(filter, AccessFilter::AnyOf(vec![Predicate::eq("_id", "u1")]));
    }

    #[tokio::test]
    async fn assigned_tasks_scenario() {
        let builder = builder();
        let perms = vec![perm("tasks", json!({"assigned": true}))];
        let scoped = builder
            .apply_permission_filters(doc(json!({"isDeleted": false})), "tasks", &perms, &agent())
            .await;
        assert_eq!(
            Value::Object(scoped),
            json!({
                "isDeleted": false,
                "$and": [{"isDeleted": false}, {"$or": [{"assignedTo": "u1"}]}]
            })
        );
    }

    #[tokio::test]
    async fn own_and_department_combine_with_or() {
        let builder = builder();
        let perms = vec![perm("projects", json!({"own": true, "department": true}))];
        let scoped = builder
            .apply_permission_filters(doc(json!({"isDeleted": false})), "projects", &perms, &agent())
            .await;
        assert_eq!(
            Value::Object(scoped),
            json!({
                "isDeleted": false,
                "$and": [
                    {"isDeleted": false},
                    {"$or": [{"ownerId": "u1"}, {"department": ENGINEERING_ID}]}
                ]
            })
        );
    }

    #[tokio::test]
    async fn department_name_resolution_is_cached() {
        let (builder, directory) = builder_with(false);
        let perms = vec![perm("projects", json!({"department": true}))];
        let first = builder.build("projects", &perms, &agent()).await;
        assert_eq!(
            first,
            AccessFilter::AnyOf(vec![Predicate::eq("department", ENGINEERING_ID)])
        );
        let second = builder.build("projects", &perms, &agent()).await;
        assert_eq!(first, second);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_department_lookup_falls_back_to_raw_value() {
        let (builder, _) = builder_with(true);
        let perms = vec![perm("projects", json!({"department": true}))];
        let filter = builder.build("projects", &perms, &agent()).await;
        assert_eq!(
            filter,
            AccessFilter::AnyOf(vec![Predicate::eq("department", "Engineering")])
        );
    }

    #[tokio::test]
    async fn missing_department_denies_entirely() {
        let builder = builder();
        let ctx = FilterContext::new("u1", "u1@example.com", "agent");
        let perms = vec![perm("projects", json!({"own": true, "department": true}))];
        assert_eq!(
            builder.build("projects", &perms, &ctx).await,
            AccessFilter::Deny
        );
    }

    #[tokio::test]
    async fn subordinates_use_owner_field_membership() {
        let builder = builder();
        let ctx = agent().with_subordinates(["u2", "u3"]);
        let perms = vec![perm("tasks", json!({"subordinates": true}))];
        let filter = builder.build("tasks", &perms, &ctx).await;
        assert_eq!(
            filter,
            AccessFilter::AnyOf(vec![Predicate::is_in("createdBy", ["u2", "u3"])])
        );
    }

    #[tokio::test]
    async fn array_assignees_use_membership() {
        let builder = builder();
        let perms = vec![perm("projects", json!({"assigned": true}))];
        let filter = builder.build("projects", &perms, &agent()).await;
        assert_eq!(
            filter,
            AccessFilter::AnyOf(vec![Predicate::is_in("teamMembers", ["u1"])])
        );
    }

    #[tokio::test]
    async fn department_scoped_users_match_rows_holding_the_id() {
        let builder = builder();
        let perms = vec![perm("users", json!({"department": true}))];
        let scoped = builder
            .apply_permission_filters(doc(json!({"isDeleted": false})), "users", &perms, &agent())
            .await;
        let colleague = doc(json!({"_id": "u7", "department": ENGINEERING_ID, "isDeleted": false}));
        let outsider = doc(json!({"_id": "u8", "department": "64f0000000000000000000cd", "isDeleted": false}));
        assert!(matches(&scoped, &colleague));
        assert!(!matches(&scoped, &outsider));
    }

    #[tokio::test]
    async fn unmapped_conditions_deny_when_nothing_remains() {
        let builder = builder();
        let perms = vec![perm("users", json!({"assigned": true}))];
        assert_eq!(builder.build("users", &perms, &agent()).await, AccessFilter::Deny);
    }
}
