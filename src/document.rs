//! Document value model.
//!
//! Records flow through the pipeline as loosely-typed JSON objects. Two
//! conventions layer structure on top of plain JSON:
//!
//! - **Instants** are objects of the form `{"$date": "<RFC 3339 UTC>"}`.
//!   A bare string is never treated as an instant, so range filters and
//!   sorts over timestamps only see values that went through an explicit
//!   coercion stage.
//! - **Paths** are dot-separated (`"period.start"`, `"temperature.low"`)
//!   and address nested objects.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A single record: a JSON object with string keys.
pub type Document = Map<String, Value>;

/// Key of the instant wrapper object.
pub const DATE_KEY: &str = "$date";

/// Wraps an instant in its wire form: `{"$date": "2025-01-26T06:00:00.000Z"}`.
///
/// The payload is RFC 3339 in UTC with millisecond precision, which keeps
/// lexicographic and chronological order in agreement for the wrapped string.
pub fn wire_instant(at: DateTime<Utc>) -> Value {
    let mut obj = Map::with_capacity(1);
    obj.insert(
        DATE_KEY.to_string(),
        Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    Value::Object(obj)
}

/// Parses an RFC 3339 timestamp, normalizing any offset to UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Unwraps an instant if `value` carries the wire form, `None` otherwise.
///
/// Strings are deliberately not accepted here; uncoerced timestamps must
/// stay invisible to date comparisons.
pub fn as_instant(value: &Value) -> Option<DateTime<Utc>> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    parse_instant(obj.get(DATE_KEY)?.as_str()?)
}

/// Resolves a dot-separated path against a document.
///
/// Returns `None` when any segment is missing or a non-object is traversed.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Sets a dot-separated path, creating intermediate objects as needed.
///
/// An intermediate segment that already holds a non-object value is
/// overwritten with a fresh object, mirroring how `$set` behaves on
/// scalar intermediates.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = match segments.pop() {
        Some(last) => last,
        None => return,
    };
    let mut current = doc;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot.as_object_mut() {
            Some(next) => current = next,
            None => return,
        }
    }
    current.insert(last.to_string(), value);
}

/// Removes a dot-separated path. Missing segments are a no-op.
pub fn remove_path(doc: &mut Document, path: &str) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = match segments.pop() {
        Some(last) => last,
        None => return,
    };
    let mut current = doc;
    for segment in segments {
        match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return,
        }
    }
    current.remove(last);
}
