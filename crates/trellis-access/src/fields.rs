//! Per-resource field mapping for condition predicates.
//!
//! # Purpose
//! Tells the filter builder which document field holds the owner, the
//! department, and the assignee(s) of each resource.
//!
//! # Key invariants
//! - Every resource has an owner field; unknown resources use the fallback
//!   (`createdBy` / `department` / `assignedTo`).
//! - A `None` department or assignee field means the condition cannot narrow
//!   that resource and contributes no predicate.
use std::collections::HashMap;

/// Where a resource stores its assignee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeField {
    /// A single user id, matched by equality.
    Single(String),
    /// An array of user ids, matched by membership.
    Many(String),
}

impl AssigneeField {
    pub fn field(&self) -> &str {
        match self {
            AssigneeField::Single(field) | AssigneeField::Many(field) => field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFields {
    pub own: String,
    pub department: Option<String>,
    pub assigned: Option<AssigneeField>,
}

impl ResourceFields {
    pub fn new(own: impl Into<String>) -> Self {
        Self {
            own: own.into(),
            department: None,
            assigned: None,
        }
    }

    pub fn department(mut self, field: impl Into<String>) -> Self {
        self.department = Some(field.into());
        self
    }

    pub fn assigned(mut self, field: AssigneeField) -> Self {
        self.assigned = Some(field);
        self
    }
}

impl Default for ResourceFields {
    fn default() -> Self {
        ResourceFields::new("createdBy")
            .department("department")
            .assigned(AssigneeField::Single("assignedTo".to_string()))
    }
}

/// Lookup table from resource name to its [`ResourceFields`].
///
/// # Example
/// ```rust
/// use trellis_access::{AssigneeField, ResourceFieldRegistry};
///
/// let registry = ResourceFieldRegistry::default();
/// assert_eq!(registry.get("users").own, "_id");
/// assert_eq!(registry.get("projects").own, "ownerId");
/// assert_eq!(
///     registry.get("tasks").assigned,
///     Some(AssigneeField::Single("assignedTo".to_string()))
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ResourceFieldRegistry {
    entries: HashMap<String, ResourceFields>,
    fallback: ResourceFields,
}

impl ResourceFieldRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            fallback: ResourceFields::default(),
        }
    }

    pub fn with(mut self, resource: impl Into<String>, fields: ResourceFields) -> Self {
        self.entries.insert(resource.into(), fields);
        self
    }

    pub fn get(&self, resource: &str) -> &ResourceFields {
        self.entries.get(resource).unwrap_or(&self.fallback)
    }

    /// Registered resource names in sorted order.
    pub fn resources(&self) -> Vec<&str> {
        let mut names = self.entries.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

impl Default for ResourceFieldRegistry {
    fn default() -> Self {
        let single = |field: &str| AssigneeField::Single(field.to_string());
        let many = |field: &str| AssigneeField::Many(field.to_string());
        Self::empty()
            .with("users", ResourceFields::new("_id").department("department"))
            .with(
                "projects",
                ResourceFields::new("ownerId")
                    .department("department")
                    .assigned(many("teamMembers")),
            )
            .with(
                "tasks",
                ResourceFields::new("createdBy")
                    .department("department")
                    .assigned(single("assignedTo")),
            )
            .with(
                "clients",
                ResourceFields::new("createdBy")
                    .department("department")
                    .assigned(single("accountManager")),
            )
            .with(
                "phases",
                ResourceFields::new("createdBy")
                    .department("department")
                    .assigned(single("assignedTo")),
            )
            .with(
                "milestones",
                ResourceFields::new("createdBy")
                    .department("department")
                    .assigned(single("assignedTo")),
            )
            .with(
                "messages",
                ResourceFields::new("senderId")
                    .department("department")
                    .assigned(many("recipients")),
            )
            .with(
                "emails",
                ResourceFields::new("createdBy")
                    .department("department")
                    .assigned(single("assignedTo")),
            )
            .with("roles", ResourceFields::new("createdBy"))
            .with("departments", ResourceFields::new("createdBy").department("_id"))
    }
}
