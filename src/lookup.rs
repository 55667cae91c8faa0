//! Tolerant field lookup over loosely-shaped JSON
//!
//! Platform responses name the same field differently depending on which
//! backend served them. Callers describe each field as an ordered list of
//! dotted key-paths and take the first one that resolves to a non-null value.

use serde_json::Value;

/// Follow a dotted key-path (`"note.xsec_token"`) through nested objects.
///
/// Numeric segments index into arrays (`"image_list.0.url"`). Returns `None`
/// when any segment is missing.
pub fn deep_get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// First non-null value among `paths`, tried in order.
pub fn pick<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| deep_get(value, path))
        .find(|v| !v.is_null())
}

/// The [`pick`] match rendered as a non-empty string.
///
/// The first present, non-null path decides: an empty string or a container
/// there yields `None` without consulting later paths.
pub fn pick_string(value: &Value, paths: &[&str]) -> Option<String> {
    pick(value, paths).and_then(value_as_string)
}

/// First path holding non-empty text, skipping empty and non-scalar values
pub fn first_text(value: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| deep_get(value, path))
        .find_map(value_as_string)
}

/// The payload of a platform response: its `data` member when that is an
/// object, otherwise the response itself.
pub fn response_body(response: &Value) -> &Value {
    match response.get("data") {
        Some(data @ Value::Object(_)) => data,
        _ => response,
    }
}

/// Render a scalar as a non-empty string
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Loose truthiness for continuation flags (`true`, `1`, `"true"`).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false" && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}
