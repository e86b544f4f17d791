//! Store-specific error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading collections or running a pipeline.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read the data directory or one of its files.
    #[error("failed to read {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A collection file held a line that is not valid JSON.
    #[error("collection {collection}, record {line}: {source}")]
    MalformedRecord {
        collection: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A collection file held a JSON value that is not an object.
    #[error("collection {collection}, record {line}: expected a JSON object")]
    NotAnObject { collection: String, line: usize },

    /// A coercion stage met a value it cannot parse as an instant.
    ///
    /// Coercion failures abort the run rather than silently dropping the
    /// record; a record with an unreadable timestamp would otherwise vanish
    /// from every windowed query without a trace.
    #[error("cannot parse {value:?} from {field:?} as an RFC 3339 instant")]
    MalformedDate { field: String, value: String },

    /// A keyword filter compiled into an invalid regular expression.
    #[error("invalid keyword pattern {pattern:?}: {source}")]
    BadKeywordPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The pipeline asked for something the engine cannot run.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),
}

impl StoreError {
    /// True when the error points at the stored data rather than the query.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::NotAnObject { .. } | Self::MalformedDate { .. }
        )
    }
}
