//! Document store seam and the embedded engine.
//!
//! [`DocumentStore`] is the narrow interface the executor talks to: hand it
//! a collection name and a stage list, get materialized documents back.
//! [`MemoryStore`] is the built-in implementation, loading collections from
//! JSON files and interpreting pipelines in process. A remote store would
//! implement the same trait and the rest of the crate would not notice.

pub mod error;
mod eval;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::document::Document;
use crate::stage::Stage;

/// Source of documents that can run an aggregation pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Runs `stages` over `collection` and returns the materialized output.
    ///
    /// An unknown collection behaves as an empty one; only malformed data or
    /// an unrunnable pipeline is an error.
    async fn aggregate(&self, collection: &str, stages: &[Stage]) -> StoreResult<Vec<Document>>;
}
