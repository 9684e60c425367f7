//! Permission conditions that narrow the rows a role may access.
//!
//! # Purpose
//! Models the boolean flags attached to a permission entry and exposes the
//! restrictive subset that must be turned into predicates.
//!
//! # Key invariants
//! - Absent flags behave exactly like `false`.
//! - `unrestricted` is not a [`Condition`]; it short-circuits evaluation.
//! - Unknown condition keys are rejected when a role document is parsed.
//! - [`Conditions::active`] returns conditions in declaration order
//!   (`own`, `department`, `assigned`, `subordinates`), which fixes the order
//!   of the generated `$or` branches.
use serde::{Deserialize, Serialize};

/// A restrictive condition that becomes one predicate of an access filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Own,
    Department,
    Assigned,
    Subordinates,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Own => "own",
            Condition::Department => "department",
            Condition::Assigned => "assigned",
            Condition::Subordinates => "subordinates",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition flags as stored on a role permission entry.
///
/// # Example
/// ```rust
/// use trellis_access::{Condition, Conditions};
///
/// let conditions = Conditions { own: Some(true), department: Some(true), ..Default::default() };
/// assert_eq!(conditions.active(), vec![Condition::Own, Condition::Department]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subordinates: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrestricted: Option<bool>,
}

impl Conditions {
    pub fn only(condition: Condition) -> Self {
        let mut conditions = Self::default();
        conditions.set(condition, true);
        conditions
    }

    pub fn unrestricted() -> Self {
        Self {
            unrestricted: Some(true),
            ..Self::default()
        }
    }

    pub fn set(&mut self, condition: Condition, value: bool) {
        let slot = match condition {
            Condition::Own => &mut self.own,
            Condition::Department => &mut self.department,
            Condition::Assigned => &mut self.assigned,
            Condition::Subordinates => &mut self.subordinates,
        };
        *slot = Some(value);
    }

    pub fn is_set(&self, condition: Condition) -> bool {
        let slot = match condition {
            Condition::Own => self.own,
            Condition::Department => self.department,
            Condition::Assigned => self.assigned,
            Condition::Subordinates => self.subordinates,
        };
        slot.unwrap_or(false)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted.unwrap_or(false)
    }

    /// Restrictive conditions that are explicitly true.
    pub fn active(&self) -> Vec<Condition> {
        [
            Condition::Own,
            Condition::Department,
            Condition::Assigned,
            Condition::Subordinates,
        ]
        .into_iter()
        .filter(|condition| self.is_set(*condition))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_flags_are_false() {
        let conditions = Conditions::default();
        assert!(conditions.active().is_empty());
        assert!(!conditions.is_unrestricted());
    }

    #[test]
    fn explicit_false_is_not_active() {
        let conditions: Conditions =
            serde_json::from_str(r#"{"own": false, "assigned": true}"#).expect("parse");
        assert_eq!(conditions.active(), vec![Condition::Assigned]);
    }

    #[test]
    fn active_keeps_declaration_order() {
        let mut conditions = Conditions::only(Condition::Subordinates);
        conditions.set(Condition::Own, true);
        assert_eq!(
            conditions.active(),
            vec![Condition::Own, Condition::Subordinates]
        );
    }

    #[test]
    fn unknown_condition_keys_are_rejected() {
        let err = serde_json::from_str::<Conditions>(r#"{"own": true, "team": true}"#)
            .expect_err("unknown key");
        assert!(err.to_string().contains("team"));
    }

    #[test]
    fn serialization_skips_unset_flags() {
        let rendered = serde_json::to_value(Conditions::only(Condition::Own)).expect("serialize");
        assert_eq!(rendered, serde_json::json!({"own": true}));
    }
}
