//! Query execution.
//!
//! [`Executor`] ties the layers together: compose the intent into a
//! pipeline, hand the stages to the store, decode the documents into the
//! intent's view type. It owns no query logic of its own; running the same
//! intent twice against an unchanged store yields identical output.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::Document;
use crate::pipeline::{compose, Intent, Pipeline, TimeWindow};
use crate::store::{DocumentStore, StoreError};
use crate::view::{AreaBucket, EnrichedRow, ForecastRow, MonthlyTemperatureStats};

/// Errors surfaced by query execution.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The store failed to load data or run the pipeline.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// The pipeline output did not match the intent's promised shape.
    #[error("result decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result of one run: the composed pipeline and the raw documents.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub pipeline: Pipeline,
    pub documents: Vec<Document>,
}

/// Runs intents against a document store.
pub struct Executor<S> {
    store: S,
}

impl<S: DocumentStore> Executor<S> {
    pub fn new(store: S) -> Self {
        Executor { store }
    }

    /// Composes and runs an intent, returning the raw documents along with
    /// the pipeline that produced them.
    pub async fn run(&self, intent: &Intent) -> Result<QueryOutput, ExecError> {
        let pipeline = compose(intent);
        debug!(
            intent = intent.name(),
            collection = %pipeline.collection,
            pipeline = %pipeline,
            "running pipeline"
        );
        let documents = self
            .store
            .aggregate(&pipeline.collection, &pipeline.stages)
            .await?;
        info!(
            intent = intent.name(),
            results = documents.len(),
            "pipeline finished"
        );
        Ok(QueryOutput {
            pipeline,
            documents,
        })
    }

    /// Monthly temperature statistics over outlooks updated inside `window`.
    pub async fn facet_stats(
        &self,
        window: TimeWindow,
    ) -> Result<MonthlyTemperatureStats, ExecError> {
        let output = self.run(&Intent::FacetStats { window }).await?;
        // The facet stage emits exactly one document even over no input;
        // an absent document can only mean an empty stand-in store.
        match output.documents.into_iter().next() {
            Some(doc) => Ok(serde_json::from_value(Value::Object(doc))?),
            None => Ok(MonthlyTemperatureStats::default()),
        }
    }

    /// Nowcast buckets by area initial, with the stock boundaries.
    pub async fn bucket_by_area(&self) -> Result<Vec<AreaBucket>, ExecError> {
        let output = self.run(&Intent::bucket_by_area()).await?;
        decode_rows(output.documents)
    }

    /// Keyword-filtered nowcast rows, newest first.
    pub async fn listing(
        &self,
        window: TimeWindow,
        keyword: impl Into<String>,
    ) -> Result<Vec<ForecastRow>, ExecError> {
        let output = self
            .run(&Intent::Listing {
                window,
                keyword: keyword.into(),
            })
            .await?;
        decode_rows(output.documents)
    }

    /// Listing with synthetic gap rows at the stock six-hour step.
    pub async fn densified_listing(
        &self,
        window: TimeWindow,
        keyword: impl Into<String>,
    ) -> Result<Vec<ForecastRow>, ExecError> {
        let output = self
            .run(&Intent::densified_listing(window, keyword))
            .await?;
        decode_rows(output.documents)
    }

    /// Listing joined with area coordinates.
    pub async fn enriched_listing(
        &self,
        window: TimeWindow,
        keyword: impl Into<String>,
    ) -> Result<Vec<EnrichedRow>, ExecError> {
        let output = self
            .run(&Intent::EnrichedListing {
                window,
                keyword: keyword.into(),
            })
            .await?;
        decode_rows(output.documents)
    }
}

fn decode_rows<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, ExecError> {
    documents
        .into_iter()
        .map(|doc| serde_json::from_value(Value::Object(doc)).map_err(ExecError::from))
        .collect()
}
