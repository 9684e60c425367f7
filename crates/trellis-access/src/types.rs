//! Strongly typed identifiers used by filter evaluation.
//!
//! # Purpose
//! Wraps string identifiers so caller ids and department ids are not mixed up
//! while building predicates.
//!
//! # Key invariants
//! - Each wrapper preserves the inner string exactly.
//! - `Display` and `as_str` return the original value.
//!
//! # Examples
//! ```rust
//! use trellis_access::{DepartmentId, UserId};
//!
//! let user = UserId::new("u1");
//! let dept = DepartmentId::new("64f0c0ffee0000000000abcd");
//! assert_eq!(format!("{user}@{dept}"), "u1@64f0c0ffee0000000000abcd");
//! ```
use serde::{Deserialize, Serialize};

/// Caller identifier wrapper.
///
/// # Example
/// ```rust
/// use trellis_access::UserId;
///
/// let user = UserId::new("u1");
/// assert_eq!(user.as_str(), "u1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Resolved department identifier wrapper.
///
/// Holds the opaque id a department name resolved to, or the raw value used
/// as a fallback when resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(String);

impl DepartmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
