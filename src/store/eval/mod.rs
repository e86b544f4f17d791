//! Pipeline interpretation over in-memory collections.
//!
//! The engine materializes every stage: documents go in as a `Vec`, come
//! out as a `Vec`, and each stage sees the full output of the previous one.
//! That is exactly the contract the composed pipelines assume, and it keeps
//! stage semantics independently testable.

mod accum;
mod expr;
mod series;

use std::cmp::Ordering;

use serde_json::Value;
use tracing::debug;

use crate::document::{get_path, remove_path, set_path, Document};
use crate::stage::{LookupSpec, ProjectField, SortDir, SortKey, Stage, ValueExpr};
use crate::store::error::{StoreError, StoreResult};
use crate::store::memory::MemoryStore;

use expr::{compare, eval_value, PreparedFilter};

/// Runs a full pipeline against one collection of `store`.
pub(crate) fn run(
    store: &MemoryStore,
    collection: &str,
    stages: &[Stage],
) -> StoreResult<Vec<Document>> {
    let mut docs = store.collection_docs(collection).to_vec();
    for stage in stages {
        let before = docs.len();
        docs = apply(store, docs, stage)?;
        debug!(
            stage = stage.wire_name(),
            before,
            after = docs.len(),
            "stage applied"
        );
    }
    Ok(docs)
}

fn apply(store: &MemoryStore, docs: Vec<Document>, stage: &Stage) -> StoreResult<Vec<Document>> {
    match stage {
        Stage::Match(filter) => {
            let prepared = PreparedFilter::prepare(filter)?;
            let mut kept = Vec::with_capacity(docs.len());
            for doc in docs {
                if prepared.matches(&doc)? {
                    kept.push(doc);
                }
            }
            Ok(kept)
        }
        Stage::Set(assignments) => {
            let mut out = Vec::with_capacity(docs.len());
            for mut doc in docs {
                for (name, assigned) in assignments {
                    // Later assignments in the same stage see earlier ones.
                    if let Some(value) = eval_value(assigned, &doc)? {
                        set_path(&mut doc, name, value);
                    }
                }
                out.push(doc);
            }
            Ok(out)
        }
        Stage::Project(fields) => docs
            .iter()
            .map(|doc| project_doc(fields, doc))
            .collect::<StoreResult<Vec<_>>>(),
        Stage::Unset(fields) => {
            let mut out = docs;
            for doc in out.iter_mut() {
                for field in fields {
                    remove_path(doc, field);
                }
            }
            Ok(out)
        }
        Stage::Sort(keys) => Ok(sort_docs(keys, docs)),
        Stage::Limit(n) => {
            let mut out = docs;
            out.truncate(*n as usize);
            Ok(out)
        }
        Stage::Group(spec) => accum::group(spec, docs),
        Stage::Facet(arms) => facet(store, docs, arms),
        Stage::Bucket(spec) => accum::bucket(spec, docs),
        Stage::Densify(spec) => series::densify(spec, docs),
        Stage::Fill(fills) => {
            let mut out = docs;
            series::fill(fills, &mut out);
            Ok(out)
        }
        Stage::Lookup(spec) => lookup(store, docs, spec),
        Stage::ReplaceRoot(expr) => replace_root(expr, docs),
    }
}

/// Builds the projected document. Fields are explicit: `_id` receives no
/// special casing, and entries whose source is missing are simply absent
/// from the output.
fn project_doc(fields: &[ProjectField], doc: &Document) -> StoreResult<Document> {
    let mut out = Document::new();
    for projected in fields {
        match projected {
            ProjectField::Include(name) => {
                if let Some(value) = get_path(doc, name) {
                    set_path(&mut out, name, value.clone());
                }
            }
            ProjectField::Computed { target, source } => {
                if let Some(value) = eval_value(source, doc)? {
                    set_path(&mut out, target, value);
                }
            }
        }
    }
    Ok(out)
}

/// Stable multi-key sort; ties on every key keep their input order.
fn sort_docs(keys: &[SortKey], mut docs: Vec<Document>) -> Vec<Document> {
    docs.sort_by(|a, b| {
        for key in keys {
            let ord = compare(get_path(a, &key.field), get_path(b, &key.field));
            let ord = match key.dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    docs
}

/// Runs every arm over its own copy of the input and emits exactly one
/// document holding the arm results as arrays, even when the input is empty.
fn facet(
    store: &MemoryStore,
    docs: Vec<Document>,
    arms: &[(String, Vec<Stage>)],
) -> StoreResult<Vec<Document>> {
    let mut out = Document::new();
    for (name, stages) in arms {
        let mut subset = docs.clone();
        for stage in stages {
            subset = apply(store, subset, stage)?;
        }
        out.insert(
            name.clone(),
            Value::Array(subset.into_iter().map(Value::Object).collect()),
        );
    }
    Ok(vec![out])
}

/// Left outer join: every input document survives, with its matches (possibly
/// none) collected into `as_field`. Keys compare structurally; a missing
/// local key matches a missing or null foreign key.
fn lookup(
    store: &MemoryStore,
    docs: Vec<Document>,
    spec: &LookupSpec,
) -> StoreResult<Vec<Document>> {
    let foreign = store.collection_docs(&spec.from);
    let mut out = Vec::with_capacity(docs.len());
    for mut doc in docs {
        let local = get_path(&doc, &spec.local_field);
        let matches: Vec<Value> = foreign
            .iter()
            .filter(|candidate| keys_match(local, get_path(candidate, &spec.foreign_field)))
            .map(|candidate| Value::Object(candidate.clone()))
            .collect();
        set_path(&mut doc, &spec.as_field, Value::Array(matches));
        out.push(doc);
    }
    Ok(out)
}

fn keys_match(local: Option<&Value>, foreign: Option<&Value>) -> bool {
    match (local, foreign) {
        (Some(a), Some(b)) => a == b,
        (None, other) | (other, None) => matches!(other, None | Some(Value::Null)),
    }
}

fn replace_root(expr: &ValueExpr, docs: Vec<Document>) -> StoreResult<Vec<Document>> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match eval_value(expr, &doc)? {
            Some(Value::Object(next)) => out.push(next),
            Some(other) => {
                return Err(StoreError::InvalidPipeline(format!(
                    "$replaceRoot needs an object, got {other}"
                )))
            }
            None => {
                return Err(StoreError::InvalidPipeline(
                    "$replaceRoot needs an object, got nothing".to_string(),
                ))
            }
        }
    }
    Ok(out)
}
