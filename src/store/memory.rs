//! In-memory store backed by JSON files on disk.
//!
//! A data directory maps one file to one collection, named after the file
//! stem. Two layouts are read:
//!
//! - `<name>.json` - a JSON array of objects (or a single object)
//! - `<name>.ndjson` - one JSON object per line, blank lines ignored
//!
//! Everything is held in memory; the engine in [`super::eval`] runs
//! pipelines directly over the loaded vectors.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::document::Document;
use crate::stage::Stage;

use super::error::{StoreError, StoreResult};
use super::{eval, DocumentStore};

/// Collections held in memory, queryable through [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    /// An empty store with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every collection file under `dir`.
    ///
    /// Files are read in path order so repeated opens of the same directory
    /// build identical stores. Files with other extensions are skipped.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| StoreError::OpenFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::OpenFailed {
                path: dir.to_path_buf(),
                source,
            })?;
            paths.push(entry.path());
        }
        paths.sort();

        let mut store = MemoryStore::new();
        for path in paths {
            let name = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let docs = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => parse_array_file(&path, &name)?,
                Some("ndjson") => parse_ndjson_file(&path, &name)?,
                _ => {
                    debug!(path = %path.display(), "skipping non-collection file");
                    continue;
                }
            };
            debug!(collection = %name, records = docs.len(), "loaded collection");
            store.insert_collection(name, docs);
        }
        info!(
            path = %dir.display(),
            collections = store.collections.len(),
            records = store.record_count(),
            "store opened"
        );
        Ok(store)
    }

    /// Adds or replaces a collection.
    pub fn insert_collection(&mut self, name: impl Into<String>, docs: Vec<Document>) {
        self.collections.insert(name.into(), docs);
    }

    /// Builder form of [`MemoryStore::insert_collection`].
    pub fn with_collection(mut self, name: impl Into<String>, docs: Vec<Document>) -> Self {
        self.insert_collection(name, docs);
        self
    }

    /// Collection names in sorted order.
    pub fn collection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Records of one collection; an unknown name reads as empty.
    pub(crate) fn collection_docs(&self, name: &str) -> &[Document] {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn aggregate(&self, collection: &str, stages: &[Stage]) -> StoreResult<Vec<Document>> {
        eval::run(self, collection, stages)
    }
}

fn parse_array_file(path: &Path, collection: &str) -> StoreResult<Vec<Document>> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value =
        serde_json::from_str(&raw).map_err(|source| StoreError::MalformedRecord {
            collection: collection.to_string(),
            line: source.line(),
            source,
        })?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(single) => return Ok(vec![single]),
        _ => {
            return Err(StoreError::NotAnObject {
                collection: collection.to_string(),
                line: 1,
            })
        }
    };
    let mut docs = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(doc) => docs.push(doc),
            _ => {
                return Err(StoreError::NotAnObject {
                    collection: collection.to_string(),
                    line: index + 1,
                })
            }
        }
    }
    Ok(docs)
}

fn parse_ndjson_file(path: &Path, collection: &str) -> StoreResult<Vec<Document>> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut docs = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(line).map_err(|source| StoreError::MalformedRecord {
                collection: collection.to_string(),
                line: index + 1,
                source,
            })?;
        match value {
            Value::Object(doc) => docs.push(doc),
            _ => {
                return Err(StoreError::NotAnObject {
                    collection: collection.to_string(),
                    line: index + 1,
                })
            }
        }
    }
    Ok(docs)
}
