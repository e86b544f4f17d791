//! # Squall
//!
//! A typed aggregation-pipeline layer for weather forecast collections.
//!
//! ## Architecture
//!
//! Queries move through four layers, each oblivious to the ones above it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Intent (What to ask)                     │
//! │   (time window, area keyword, bucket boundaries)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [pipeline::compose]
//! ┌─────────────────────────────────────────────────────────┐
//! │            Pipeline (Ordered, typed stages)              │
//! │   narrow → coerce → shape → window → summarize →         │
//! │   order → cap → enrich                                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [exec::Executor]
//! ┌─────────────────────────────────────────────────────────┐
//! │        DocumentStore (seam) / MemoryStore (engine)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [view]
//! ┌─────────────────────────────────────────────────────────┐
//! │          Typed result views (rows, buckets, stats)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Timestamps are stored as RFC 3339 strings and only become comparable
//! instants through an explicit coercion stage; raw strings never match a
//! time window.

pub mod config;
pub mod document;
pub mod exec;
pub mod pipeline;
pub mod stage;
pub mod store;
pub mod view;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::exec::{ExecError, Executor, QueryOutput};
    pub use crate::pipeline::{compose, collections, Intent, Pipeline, TimeWindow};
    pub use crate::stage::{
        // Constructors
        area_keyword,
        asc,
        coerce_timestamp,
        desc,
        field,
        instant_range,
        limit,
        set,
        sort_by,
        // Types
        Metric,
        Stage,
    };
    pub use crate::store::{DocumentStore, MemoryStore, StoreError, StoreResult};
    pub use crate::view::{
        AreaBucket, EnrichedRow, ForecastRow, MonthlyMetric, MonthlyTemperatureStats,
    };
}

// Also export at crate root for convenience
pub use document::Document;
pub use exec::{ExecError, Executor, QueryOutput};
pub use pipeline::{compose, Intent, Pipeline, TimeWindow};
pub use store::{DocumentStore, MemoryStore, StoreError};
