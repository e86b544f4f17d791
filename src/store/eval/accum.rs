//! Group, bucket, and accumulator evaluation.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::document::Document;
use crate::stage::{Accumulator, BucketSpec, GroupSpec, ValueExpr};
use crate::store::error::{StoreError, StoreResult};

use super::expr::{compare, eval_value};

/// Applies one accumulator over the members of a group.
pub(crate) fn accumulate(acc: &Accumulator, docs: &[Document]) -> StoreResult<Value> {
    match acc {
        Accumulator::Avg(expr) => {
            let mut sum = 0.0;
            let mut seen = 0usize;
            for doc in docs {
                // Only numeric values count; strings and nulls neither
                // contribute nor divide.
                if let Some(x) = eval_value(expr, doc)?.as_ref().and_then(Value::as_f64) {
                    sum += x;
                    seen += 1;
                }
            }
            if seen == 0 {
                return Ok(Value::Null);
            }
            Ok(Number::from_f64(sum / seen as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        Accumulator::Min(expr) => extreme(expr, docs, Ordering::Less),
        Accumulator::Max(expr) => extreme(expr, docs, Ordering::Greater),
        Accumulator::Count => Ok(Value::from(docs.len() as u64)),
        Accumulator::Push(expr) => {
            let mut items = Vec::with_capacity(docs.len());
            for doc in docs {
                if let Some(value) = eval_value(expr, doc)? {
                    items.push(value);
                }
            }
            Ok(Value::Array(items))
        }
    }
}

/// Smallest or largest non-null value, by the canonical comparison order.
/// Null when every member evaluates to null or missing.
fn extreme(expr: &ValueExpr, docs: &[Document], keep_when: Ordering) -> StoreResult<Value> {
    let mut best: Option<Value> = None;
    for doc in docs {
        let value = match eval_value(expr, doc)? {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        best = match best {
            None => Some(value),
            Some(current) => {
                if compare(Some(&value), Some(&current)) == keep_when {
                    Some(value)
                } else {
                    Some(current)
                }
            }
        };
    }
    Ok(best.unwrap_or(Value::Null))
}

/// Folds documents into one output document per distinct key.
///
/// Groups are keyed on the serialized key value inside a `BTreeMap`, so
/// output order is deterministic regardless of input order; month keys like
/// `"2025-01"` come out chronologically as a side effect.
pub(crate) fn group(spec: &GroupSpec, docs: Vec<Document>) -> StoreResult<Vec<Document>> {
    let mut groups: BTreeMap<String, (Value, Vec<Document>)> = BTreeMap::new();
    for doc in docs {
        let key = eval_value(&spec.key, &doc)?.unwrap_or(Value::Null);
        groups
            .entry(key.to_string())
            .or_insert_with(|| (key, Vec::new()))
            .1
            .push(doc);
    }
    let mut out = Vec::with_capacity(groups.len());
    for (_, (key, members)) in groups {
        let mut result = Document::new();
        result.insert("_id".to_string(), key);
        for (name, acc) in &spec.fields {
            result.insert(name.clone(), accumulate(acc, &members)?);
        }
        out.push(result);
    }
    Ok(out)
}

/// Partitions documents into `[lower, upper)` ranges plus a default bucket.
///
/// Output order is boundary order with the default bucket last, and only
/// populated buckets are emitted.
pub(crate) fn bucket(spec: &BucketSpec, docs: Vec<Document>) -> StoreResult<Vec<Document>> {
    if spec.boundaries.len() < 2 {
        return Err(StoreError::InvalidPipeline(
            "$bucket needs at least two boundaries".to_string(),
        ));
    }
    for pair in spec.boundaries.windows(2) {
        if compare(Some(&pair[0]), Some(&pair[1])) != Ordering::Less {
            return Err(StoreError::InvalidPipeline(
                "$bucket boundaries must be strictly ascending".to_string(),
            ));
        }
    }

    let mut members: Vec<Vec<Document>> = vec![Vec::new(); spec.boundaries.len() - 1];
    let mut overflow: Vec<Document> = Vec::new();
    for doc in docs {
        let value = eval_value(&spec.group_by, &doc)?.unwrap_or(Value::Null);
        match bucket_index(&spec.boundaries, &value) {
            Some(i) => members[i].push(doc),
            None => overflow.push(doc),
        }
    }

    let mut out = Vec::new();
    for (i, bucket_docs) in members.iter().enumerate() {
        if bucket_docs.is_empty() {
            continue;
        }
        out.push(bucket_doc(spec, spec.boundaries[i].clone(), bucket_docs)?);
    }
    if !overflow.is_empty() {
        out.push(bucket_doc(
            spec,
            Value::String(spec.default_label.clone()),
            &overflow,
        )?);
    }
    Ok(out)
}

fn bucket_index(boundaries: &[Value], value: &Value) -> Option<usize> {
    for i in 0..boundaries.len() - 1 {
        let at_or_past_lower = compare(Some(value), Some(&boundaries[i])) != Ordering::Less;
        let before_upper = compare(Some(value), Some(&boundaries[i + 1])) == Ordering::Less;
        if at_or_past_lower && before_upper {
            return Some(i);
        }
    }
    None
}

fn bucket_doc(spec: &BucketSpec, id: Value, docs: &[Document]) -> StoreResult<Document> {
    let mut out = Document::new();
    out.insert("_id".to_string(), id);
    for (name, acc) in &spec.output {
        out.insert(name.clone(), accumulate(acc, docs)?);
    }
    Ok(out)
}
