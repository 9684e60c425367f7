use crate::Document;
use serde_json::Value;

/// Evaluate a query document against a stored document.
///
/// Supports the subset of the MongoDB dialect that access filters and API
/// base queries produce: field equality (with array membership), dotted
/// paths, `$and`, `$or`, `$nor`, `$eq`, `$ne`, `$in`, `$nin` and `$exists`.
/// Unknown operators never match.
pub fn matches(filter: &Document, doc: &Document) -> bool {
    filter.iter().all(|(key, expected)| match key.as_str() {
        "$and" => clauses(expected).is_some_and(|mut items| items.all(|f| matches(f, doc))),
        "$or" => clauses(expected).is_some_and(|mut items| items.any(|f| matches(f, doc))),
        "$nor" => clauses(expected).is_some_and(|mut items| !items.any(|f| matches(f, doc))),
        _ => field_matches(lookup_path(doc, key), expected),
    })
}

/// Resolve a dotted path (`owner.id`) inside a document.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn clauses(value: &Value) -> Option<impl Iterator<Item = &Document>> {
    let items = value.as_array()?;
    if items.iter().any(|item| !item.is_object()) {
        return None;
    }
    Some(items.iter().filter_map(Value::as_object))
}

fn field_matches(actual: Option<&Value>, expected: &Value) -> bool {
    if let Value::Object(ops) = expected
        && is_operator_doc(ops)
    {
        return ops
            .iter()
            .all(|(op, arg)| operator_matches(actual, op, arg));
    }
    value_equals(actual, expected)
}

fn is_operator_doc(ops: &Document) -> bool {
    !ops.is_empty() && ops.keys().all(|key| key.starts_with('$'))
}

fn value_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| item == expected)
        }
        Some(value) => value == expected,
    }
}

fn operator_matches(actual: Option<&Value>, op: &str, arg: &Value) -> bool {
    match op {
        "$eq" => value_equals(actual, arg),
        "$ne" => !value_equals(actual, arg),
        "$in" => in_list(actual, arg),
        "$nin" => arg.is_array() && !in_list(actual, arg),
        "$exists" => actual.is_some() == truthy(arg),
        _ => {
            tracing::debug!(op, "unsupported query operator; treating as no match");
            false
        }
    }
}

fn in_list(actual: Option<&Value>, arg: &Value) -> bool {
    arg.as_array()
        .is_some_and(|candidates| candidates.iter().any(|c| value_equals(actual, c)))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Null => false,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    }
}
