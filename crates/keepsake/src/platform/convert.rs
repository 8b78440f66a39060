//! Lenient JSON field extraction shared by the platform normalizers.
//!
//! Platforms disagree on whether numbers are sent as JSON numbers or strings
//! (and sometimes send both for the same field depending on the endpoint), so
//! every numeric accessor here accepts either form and yields `None` rather
//! than an error for anything else.

use serde_json::Value;

/// Recursively remove null values from JSON objects before storing raw payloads.
pub fn strip_null_values(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_null_values(v)))
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(strip_null_values).collect()),
        other => other,
    }
}

/// Follow a path of object keys.
pub fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |v, k| v.get(*k))
}

/// A non-empty string field.
pub fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Integer from a JSON number or a numeric string.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn i64_at(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(as_i64)
}

pub fn i32_at(value: &Value, key: &str) -> Option<i32> {
    i64_at(value, key).and_then(|n| i32::try_from(n).ok())
}

/// Float from a JSON number or a numeric string.
pub fn f64_at(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean from `true`/`false`, `0`/`1` or their string forms.
pub fn bool_at(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// External identifier as a string, accepting numeric or string ids.
pub fn id_at(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
