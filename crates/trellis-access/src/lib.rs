//! Trellis row-level access primitives shared by the API service and tests.
//!
//! # Purpose
//! Centralizes the role permission model, condition evaluation, and the
//! translation of allowed conditions into document-store query filters.
//!
//! # How it fits
//! The API service resolves a [`FilterContext`] per request, asks the
//! [`PermissionEvaluator`] whether the resource/action pair is allowed, and
//! narrows every query through [`QueryFilterBuilder`]. The in-memory store
//! evaluates the resulting filters with [`matches`].
//!
//! # Key invariants
//! - Superadmins always receive the base query unchanged.
//! - Denial never errors; it is encoded as a filter that cannot match.
//! - Multiple conditions combine with OR, the result is ANDed with the base query.
//!
//! # Important configuration
//! - [`SelfScopedResources`] names resources that default to `own` when a
//!   permission declares no restrictive condition (`users` by default).
//! - Department name resolution is cached in an injected [`TtlCache`].
//!
//! # Examples
//! ```rust
//! use serde_json::json;
//! use trellis_access::{AccessFilter, Predicate};
//!
//! let filter = AccessFilter::AnyOf(vec![Predicate::eq("assignedTo", "u1")]);
//! let base = json!({"isDeleted": false}).as_object().cloned().unwrap_or_default();
//! let scoped = filter.apply(base);
//! assert!(scoped.contains_key("$and"));
//! ```
//!
//! # Common pitfalls
//! - Building a `FilterContext` without subordinate ids makes `subordinates`
//!   conditions match nothing.
//! - Sharing one department cache across tenants leaks name resolutions; build
//!   one cache per tenant-scoped resolver.

mod action;
mod cache;
mod condition;
mod context;
mod department;
mod errors;
mod evaluator;
mod fields;
mod filter;
mod matcher;
mod permission;
mod predicate;
mod types;

pub use action::Action;
pub use cache::TtlCache;
pub use condition::{Condition, Conditions};
pub use context::FilterContext;
pub use department::{DepartmentDirectory, DepartmentResolution, DepartmentResolver, is_object_id};
pub use errors::{AccessError, AccessResult};
pub use evaluator::{AccessDecision, PermissionEvaluator, SelfScopedResources};
pub use fields::{AssigneeField, ResourceFields, ResourceFieldRegistry};
pub use filter::QueryFilterBuilder;
pub use matcher::{lookup_path, matches};
pub use permission::{Permission, Role, SUPER_ADMIN_ROLE, WILDCARD_ACTION};
pub use predicate::{AccessFilter, Document, Predicate, never_match};
pub use types::{DepartmentId, UserId};
