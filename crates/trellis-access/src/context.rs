//! Per-request caller context used to evaluate conditions.
use crate::UserId;
use serde::{Deserialize, Serialize};

/// Caller identity bundle derived from the session and role lookup.
///
/// # Invariants
/// - Built once per request (or served from the middleware memo cache) and
///   never mutated afterwards.
/// - `user_department` holds either an opaque department id or a department
///   name; resolution happens in [`crate::DepartmentResolver`].
///
/// # Example
/// ```rust
/// use trellis_access::FilterContext;
///
/// let ctx = FilterContext::new("u1", "u1@example.com", "agent")
///     .with_department("Engineering")
///     .with_subordinates(["u2", "u3"]);
/// assert_eq!(ctx.subordinate_ids.len(), 2);
/// assert!(!ctx.is_super_admin);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterContext {
    pub user_id: UserId,
    pub user_email: String,
    pub user_department: Option<String>,
    pub user_role: String,
    pub subordinate_ids: Vec<UserId>,
    pub is_super_admin: bool,
}

impl FilterContext {
    pub fn new(
        user_id: impl Into<String>,
        user_email: impl Into<String>,
        user_role: impl Into<String>,
    ) -> Self {
        Self {
            user_id: UserId::new(user_id),
            user_email: user_email.into(),
            user_department: None,
            user_role: user_role.into(),
            subordinate_ids: Vec::new(),
            is_super_admin: false,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.user_department = Some(department.into());
        self
    }

    pub fn with_subordinates<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subordinate_ids = ids.into_iter().map(UserId::new).collect();
        self
    }

    pub fn super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }

    /// Department value with surrounding whitespace removed, if non-empty.
    pub fn department(&self) -> Option<&str> {
        self.user_department
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
