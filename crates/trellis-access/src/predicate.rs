//! Sum-of-predicates access filters and their query-document rendering.
//!
//! # Purpose
//! Represents the combination rule explicitly: an access filter is either
//! unrestricted, a denial, or a list of predicates combined with OR. Rendering
//! conjoins the result with the caller's base query.
//!
//! # Key invariants
//! - `Unrestricted` returns the base query untouched.
//! - `Deny` and an empty `AnyOf` both conjoin the never-matching predicate.
//! - A scoped query keeps every base key at the top level and adds
//!   `$and: [base, restriction]`, so the base constraints apply even when a
//!   consumer only reads top-level keys.
//!
//! # Examples
//! ```rust
//! use serde_json::json;
//! use trellis_access::{AccessFilter, Predicate};
//!
//! let filter = AccessFilter::AnyOf(vec![Predicate::eq("assignedTo", "u1")]);
//! let base = json!({"isDeleted": false}).as_object().cloned().unwrap_or_default();
//! assert_eq!(
//!     serde_json::Value::Object(filter.apply(base)),
//!     json!({
//!         "isDeleted": false,
//!         "$and": [{"isDeleted": false}, {"$or": [{"assignedTo": "u1"}]}]
//!     })
//! );
//! ```
use serde_json::{Map, Value, json};

/// A query document in the MongoDB filter dialect.
pub type Document = Map<String, Value>;

/// Field-level predicate produced from one condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `{field: value}`; also matches array fields containing `value`.
    Eq { field: String, value: Value },
    /// `{field: {$in: values}}`.
    In { field: String, values: Vec<Value> },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Eq { field, .. } | Predicate::In { field, .. } => field,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        match self {
            Predicate::Eq { field, value } => {
                doc.insert(field.clone(), value.clone());
            }
            Predicate::In { field, values } => {
                doc.insert(field.clone(), json!({ "$in": values }));
            }
        }
        doc
    }
}

/// Predicate that no stored document satisfies (every document has `_id`).
pub fn never_match() -> Document {
    let mut doc = Document::new();
    doc.insert("_id".to_string(), json!({ "$exists": false }));
    doc
}

/// Row-level restriction for one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessFilter {
    Unrestricted,
    Deny,
    AnyOf(Vec<Predicate>),
}

impl AccessFilter {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AccessFilter::Unrestricted)
    }

    pub fn is_denied(&self) -> bool {
        match self {
            AccessFilter::Deny => true,
            AccessFilter::AnyOf(predicates) => predicates.is_empty(),
            AccessFilter::Unrestricted => false,
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        match self {
            AccessFilter::AnyOf(predicates) => predicates,
            _ => &[],
        }
    }

    /// Restriction document without the base query, if any.
    pub fn restriction(&self) -> Option<Document> {
        match self {
            AccessFilter::Unrestricted => None,
            AccessFilter::Deny => Some(never_match()),
            AccessFilter::AnyOf(predicates) if predicates.is_empty() => Some(never_match()),
            AccessFilter::AnyOf(predicates) => {
                let branches = predicates
                    .iter()
                    .map(|predicate| Value::Object(predicate.to_document()))
                    .collect::<Vec<_>>();
                let mut doc = Document::new();
                doc.insert("$or".to_string(), Value::Array(branches));
                Some(doc)
            }
        }
    }

    pub fn apply(&self, base: Document) -> Document {
        match self.restriction() {
            None => base,
            Some(restriction) => conjoin(base, restriction),
        }
    }
}

fn conjoin(base: Document, restriction: Document) -> Document {
    let mut scoped = base.clone();
    scoped.insert(
        "$and".to_string(),
        Value::Array(vec![Value::Object(base), Value::Object(restriction)]),
    );
    scoped
}
