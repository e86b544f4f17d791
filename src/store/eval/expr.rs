//! Expression and filter evaluation against a single document.
//!
//! Evaluation distinguishes *missing* (`None`) from an explicit JSON null;
//! set stages skip missing results, which is what lets an unmatched join
//! leave no trace on the document instead of planting nulls.

use std::cmp::Ordering;

use chrono::format::{Item, StrftimeItems};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use crate::document::{as_instant, get_path, parse_instant, wire_instant, Document};
use crate::stage::{CmpOp, Filter, ValueExpr};
use crate::store::error::{StoreError, StoreResult};

/// Evaluates an expression. `Ok(None)` means the value is missing, which
/// callers treat differently from `Ok(Some(Value::Null))`.
pub(crate) fn eval_value(expr: &ValueExpr, doc: &Document) -> StoreResult<Option<Value>> {
    match expr {
        ValueExpr::Field(path) => Ok(get_path(doc, path).cloned()),
        ValueExpr::Root => Ok(Some(Value::Object(doc.clone()))),
        ValueExpr::Literal(value) => Ok(Some(value.clone())),
        ValueExpr::DateFromString { source } => eval_date_from_string(source, doc),
        ValueExpr::DateToString { format, source } => eval_date_to_string(format, source, doc),
        ValueExpr::Substr { source, start, len } => eval_substr(source, *start, *len, doc),
        ValueExpr::ArrayElemAt { array, index } => eval_elem_at(array, *index, doc),
        ValueExpr::MergeObjects(parts) => eval_merge_objects(parts, doc),
        ValueExpr::Template(entries) => {
            let mut obj = Map::with_capacity(entries.len());
            for (name, entry) in entries {
                if let Some(value) = eval_value(entry, doc)? {
                    obj.insert(name.clone(), value);
                }
            }
            Ok(Some(Value::Object(obj)))
        }
    }
}

fn eval_date_from_string(source: &ValueExpr, doc: &Document) -> StoreResult<Option<Value>> {
    let raw = match eval_value(source, doc)? {
        None | Some(Value::Null) => return Ok(Some(Value::Null)),
        Some(value) => value,
    };
    let text = match raw.as_str() {
        Some(text) => text.to_string(),
        None => {
            return Err(StoreError::MalformedDate {
                field: describe(source),
                value: raw.to_string(),
            })
        }
    };
    match parse_instant(&text) {
        Some(at) => Ok(Some(wire_instant(at))),
        None => Err(StoreError::MalformedDate {
            field: describe(source),
            value: text,
        }),
    }
}

fn eval_date_to_string(
    format: &str,
    source: &ValueExpr,
    doc: &Document,
) -> StoreResult<Option<Value>> {
    // Reject bad strftime patterns up front; chrono only surfaces them when
    // the formatted value is displayed.
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(StoreError::InvalidPipeline(format!(
            "$dateToString format {format:?} is not a valid strftime pattern"
        )));
    }
    let value = match eval_value(source, doc)? {
        None | Some(Value::Null) => return Ok(Some(Value::Null)),
        Some(value) => value,
    };
    match as_instant(&value) {
        Some(at) => Ok(Some(Value::String(at.format(format).to_string()))),
        None => Err(StoreError::InvalidPipeline(format!(
            "$dateToString expects an instant, got {value}"
        ))),
    }
}

fn eval_substr(
    source: &ValueExpr,
    start: u32,
    len: u32,
    doc: &Document,
) -> StoreResult<Option<Value>> {
    let value = match eval_value(source, doc)? {
        None | Some(Value::Null) => return Ok(Some(Value::Null)),
        Some(value) => value,
    };
    match value.as_str() {
        Some(text) => {
            let taken: String = text
                .chars()
                .skip(start as usize)
                .take(len as usize)
                .collect();
            Ok(Some(Value::String(taken)))
        }
        None => Err(StoreError::InvalidPipeline(format!(
            "$substr expects a string, got {value}"
        ))),
    }
}

fn eval_elem_at(array: &ValueExpr, index: i64, doc: &Document) -> StoreResult<Option<Value>> {
    let value = match eval_value(array, doc)? {
        None | Some(Value::Null) => return Ok(Some(Value::Null)),
        Some(value) => value,
    };
    let items = match value.as_array() {
        Some(items) => items,
        None => {
            return Err(StoreError::InvalidPipeline(format!(
                "$arrayElemAt expects an array, got {value}"
            )))
        }
    };
    let position = if index < 0 {
        // Negative indexes count back from the end.
        let back = index.unsigned_abs() as usize;
        match items.len().checked_sub(back) {
            Some(position) => position,
            None => return Ok(None),
        }
    } else {
        index as usize
    };
    // Out of bounds yields a missing value, not null. An unmatched lookup
    // produces an empty array, and its first element must stay missing so
    // the later set stage adds nothing.
    Ok(items.get(position).cloned())
}

fn eval_merge_objects(parts: &[ValueExpr], doc: &Document) -> StoreResult<Option<Value>> {
    let mut merged = Map::new();
    for part in parts {
        match eval_value(part, doc)? {
            None | Some(Value::Null) => continue,
            Some(Value::Object(obj)) => merged.extend(obj),
            Some(other) => {
                return Err(StoreError::InvalidPipeline(format!(
                    "$mergeObjects expects objects, got {other}"
                )))
            }
        }
    }
    Ok(Some(Value::Object(merged)))
}

/// Human-readable name of an expression for error messages.
fn describe(expr: &ValueExpr) -> String {
    match expr {
        ValueExpr::Field(path) => path.clone(),
        _ => "<computed>".to_string(),
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Total order used by sort stages and min/max accumulators.
///
/// Values order by type bracket first, then within the bracket:
/// missing and null, numbers, strings, plain objects, arrays, booleans,
/// instants. This mirrors the store's canonical comparison order; in
/// particular an uncoerced timestamp string never interleaves with
/// instants.
pub(crate) fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ordering::Equal,
    };
    match rank(Some(a)) {
        1 => {
            let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        2 => a.as_str().unwrap_or("").cmp(b.as_str().unwrap_or("")),
        3 => {
            // Plain objects never sort in practice; serialized comparison
            // keeps the order total and deterministic.
            a.to_string().cmp(&b.to_string())
        }
        4 => compare_arrays(a, b),
        5 => a.as_bool().cmp(&b.as_bool()),
        6 => match (as_instant(a), as_instant(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}

fn compare_arrays(a: &Value, b: &Value) -> Ordering {
    let empty = Vec::new();
    let xs = a.as_array().unwrap_or(&empty);
    let ys = b.as_array().unwrap_or(&empty);
    for (x, y) in xs.iter().zip(ys.iter()) {
        let ord = compare(Some(x), Some(y));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    xs.len().cmp(&ys.len())
}

fn rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(v @ Value::Object(_)) => {
            if as_instant(v).is_some() {
                6
            } else {
                3
            }
        }
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

// ============================================================================
// Filters
// ============================================================================

/// A filter with its regexes compiled, ready to test documents.
#[derive(Debug)]
pub(crate) enum PreparedFilter {
    And(Vec<PreparedFilter>),
    Cmp {
        field: String,
        op: CmpOp,
        value: Value,
    },
    ExprCmp {
        op: CmpOp,
        lhs: ValueExpr,
        rhs: Value,
    },
    Regex {
        field: String,
        regex: Regex,
    },
}

impl PreparedFilter {
    pub(crate) fn prepare(filter: &Filter) -> StoreResult<Self> {
        match filter {
            Filter::And(filters) => Ok(PreparedFilter::And(
                filters
                    .iter()
                    .map(PreparedFilter::prepare)
                    .collect::<StoreResult<_>>()?,
            )),
            Filter::Cmp { field, op, value } => Ok(PreparedFilter::Cmp {
                field: field.clone(),
                op: *op,
                value: value.clone(),
            }),
            Filter::ExprCmp { op, lhs, rhs } => Ok(PreparedFilter::ExprCmp {
                op: *op,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            }),
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .map_err(|source| StoreError::BadKeywordPattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                Ok(PreparedFilter::Regex {
                    field: field.clone(),
                    regex,
                })
            }
        }
    }

    pub(crate) fn matches(&self, doc: &Document) -> StoreResult<bool> {
        match self {
            PreparedFilter::And(filters) => {
                for filter in filters {
                    if !filter.matches(doc)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            PreparedFilter::Cmp { field, op, value } => {
                Ok(cmp_same_bracket(get_path(doc, field), *op, value))
            }
            PreparedFilter::ExprCmp { op, lhs, rhs } => {
                let lhs = eval_value(lhs, doc)?;
                Ok(cmp_same_bracket(lhs.as_ref(), *op, rhs))
            }
            PreparedFilter::Regex { field, regex } => {
                let text = get_path(doc, field).and_then(Value::as_str);
                Ok(text.is_some_and(|text| regex.is_match(text)))
            }
        }
    }
}

/// Range comparison, strict about type brackets: instants compare with
/// instants, numbers with numbers, strings with strings, anything else
/// fails the filter. A missing or null left-hand side never matches, so
/// records whose timestamp did not coerce fall out of windowed queries.
fn cmp_same_bracket(lhs: Option<&Value>, op: CmpOp, bound: &Value) -> bool {
    let lhs = match lhs {
        Some(Value::Null) | None => return false,
        Some(value) => value,
    };
    let ord = match (as_instant(lhs), as_instant(bound)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => match (lhs, bound) {
            (Value::Number(_), Value::Number(_)) => {
                let (x, y) = (lhs.as_f64().unwrap_or(0.0), bound.as_f64().unwrap_or(0.0));
                match x.partial_cmp(&y) {
                    Some(ord) => ord,
                    None => return false,
                }
            }
            (Value::String(x), Value::String(y)) => x.as_str().cmp(y.as_str()),
            _ => return false,
        },
    };
    match op {
        CmpOp::Gte => ord != Ordering::Less,
        CmpOp::Lte => ord != Ordering::Greater,
    }
}
