//! Role and permission documents.
//!
//! # Purpose
//! Defines the role document shape loaded from the `roles` collection and the
//! per-resource permission entries it carries.
//!
//! # Key invariants
//! - At most one entry per resource is expected; lookups return the first.
//! - Actions are stored as strings; [`Role::validate`] accepts only
//!   [`crate::Action`] names and [`WILDCARD_ACTION`].
//! - [`WILDCARD_ACTION`] grants every action on the resource.
//!
//! # Examples
//! ```rust
//! use trellis_access::{Action, Permission};
//!
//! let permission = Permission::new("tasks", [Action::Read, Action::Update]);
//! assert!(permission.allows(Action::Read.as_str()));
//! assert!(!permission.allows(Action::Delete.as_str()));
//! ```
use crate::{AccessResult, Action, Conditions};
use serde::{Deserialize, Serialize};

pub const WILDCARD_ACTION: &str = "*";
pub const SUPER_ADMIN_ROLE: &str = "superadmin";

/// A permission entry granting actions on one resource under conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub resource: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl Permission {
    pub fn new(resource: impl Into<String>, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            resource: resource.into(),
            actions: actions
                .into_iter()
                .map(|action| action.as_str().to_string())
                .collect(),
            conditions: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn allows(&self, action: &str) -> bool {
        self.actions
            .iter()
            .any(|granted| granted == action || granted == WILDCARD_ACTION)
    }

    /// Conditions of this entry, treating a missing object as empty.
    pub fn conditions(&self) -> Conditions {
        self.conditions.clone().unwrap_or_default()
    }
}

/// Role document owning a list of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub super_admin: bool,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            name: name.into(),
            permissions,
            super_admin: false,
        }
    }

    /// Whether this role bypasses every condition check.
    ///
    /// Either the explicit flag or the reserved role name qualifies.
    pub fn is_super_admin(&self) -> bool {
        if self.super_admin {
            return true;
        }
        let normalized = self.name.trim().to_ascii_lowercase().replace('_', "");
        normalized == SUPER_ADMIN_ROLE
    }

    pub fn permission_for(&self, resource: &str) -> Option<&Permission> {
        find_permission(&self.permissions, resource)
    }

    /// Reject permission entries granting actions that no route checks.
    pub fn validate(&self) -> AccessResult<()> {
        for permission in &self.permissions {
            for action in &permission.actions {
                if action != WILDCARD_ACTION {
                    action.parse::<Action>()?;
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn find_permission<'a>(
    permissions: &'a [Permission],
    resource: &str,
) -> Option<&'a Permission> {
    permissions
        .iter()
        .find(|permission| permission.resource == resource)
}
