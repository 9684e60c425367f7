//! Permission evaluation: which rows of a resource may the caller see.
//!
//! # Purpose
//! Turns a caller's role permissions into an [`AccessDecision`] for one
//! resource, and answers action checks for the route middleware.
//!
//! # Key invariants
//! - Superadmins are unrestricted for every resource and action.
//! - A resource without a permission entry is denied.
//! - `unrestricted: true`, or no restrictive condition set, is unrestricted,
//!   except for resources named by [`SelfScopedResources`], which fall back to
//!   `own`.
//!
//! # Security considerations
//! - The self-scoped fallback exists so a bare `users` grant never exposes the
//!   whole user directory. Removing `users` from the policy widens access.
use crate::permission::find_permission;
use crate::{Action, Condition, FilterContext, Permission, WILDCARD_ACTION};

/// Outcome of evaluating a resource for a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Base query passes through unchanged.
    Unrestricted,
    /// No row may be returned.
    Denied,
    /// Rows matching any of the listed conditions may be returned.
    Scoped(Vec<Condition>),
}

/// Resources that default to `own` when a permission declares no restrictive
/// condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfScopedResources {
    resources: Vec<String>,
}

impl SelfScopedResources {
    pub fn new<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn none() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.resources.iter().any(|candidate| candidate == resource)
    }
}

impl Default for SelfScopedResources {
    fn default() -> Self {
        Self::new(["users"])
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionEvaluator {
    self_scoped: SelfScopedResources,
}

impl PermissionEvaluator {
    pub fn new(self_scoped: SelfScopedResources) -> Self {
        Self { self_scoped }
    }

    /// Decide the access level for `resource`.
    ///
    /// # Example
    /// ```rust
    /// use trellis_access::{
    ///     AccessDecision, Action, Condition, Conditions, FilterContext, Permission,
    ///     PermissionEvaluator,
    /// };
    ///
    /// let evaluator = PermissionEvaluator::default();
    /// let ctx = FilterContext::new("u1", "u1@example.com", "agent");
    /// let perms = vec![
    ///     Permission::new("tasks", [Action::Read]).with_conditions(Conditions::only(Condition::Assigned)),
    /// ];
    /// assert_eq!(
    ///     evaluator.evaluate("tasks", &perms, &ctx),
    ///     AccessDecision::Scoped(vec![Condition::Assigned])
    /// );
    /// assert_eq!(evaluator.evaluate("clients", &perms, &ctx), AccessDecision::Denied);
    /// ```
    pub fn evaluate(
        &self,
        resource: &str,
        permissions: &[Permission],
        ctx: &FilterContext,
    ) -> AccessDecision {
        if ctx.is_super_admin {
            return AccessDecision::Unrestricted;
        }
        let Some(permission) = find_permission(permissions, resource) else {
            return AccessDecision::Denied;
        };
        let conditions = permission.conditions();
        if conditions.is_unrestricted() {
            return AccessDecision::Unrestricted;
        }
        let active = conditions.active();
        if active.is_empty() {
            if self.self_scoped.contains(resource) {
                return AccessDecision::Scoped(vec![Condition::Own]);
            }
            return AccessDecision::Unrestricted;
        }
        AccessDecision::Scoped(active)
    }

    /// Whether the caller may perform `action` on `resource` at all.
    pub fn allows(
        &self,
        resource: &str,
        action: &str,
        permissions: &[Permission],
        ctx: &FilterContext,
    ) -> bool {
        if ctx.is_super_admin {
            return true;
        }
        find_permission(permissions, resource)
            .map(|permission| permission.allows(action))
            .unwrap_or(false)
    }

    /// Actions the caller may perform on `resource`, in the order granted.
    pub fn permitted_actions(
        &self,
        resource: &str,
        permissions: &[Permission],
        ctx: &FilterContext,
    ) -> Vec<String> {
        if ctx.is_super_admin {
            return Action::ALL
                .iter()
                .map(|action| action.as_str().to_string())
                .collect();
        }
        let Some(permission) = find_permission(permissions, resource) else {
            return Vec::new();
        };
        if permission.actions.iter().any(|action| action == WILDCARD_ACTION) {
            return Action::ALL
                .iter()
                .map(|action| action.as_str().to_string())
                .collect();
        }
        permission.actions.clone()
    }
}
