//! Pipeline composition.
//!
//! A [`Pipeline`] pairs a collection name with an ordered list of stages.
//! Callers never assemble stages by hand; they state a query [`Intent`] and
//! [`compose`] lays the stages out in the documented order.

pub mod compose;
pub mod intent;

pub use compose::compose;
pub use intent::{
    collections, Intent, TimeWindow, WindowError, BUCKET_RESULT_CAP, DEFAULT_BUCKET_BOUNDARIES,
    DEFAULT_BUCKET_LABEL, DEFAULT_DENSIFY_STEP_HOURS, DENSIFIED_RESULT_CAP, LISTING_RESULT_CAP,
};

use std::fmt;

use serde_json::Value;

use crate::stage::Stage;

/// An executable aggregation pipeline bound to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub collection: String,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Renders the stage list in wire form: a JSON array of stage objects.
    pub fn to_wire(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_wire).collect())
    }

    /// Wire names of the stages in order, e.g. `["$match", "$set", ...]`.
    ///
    /// Handy for asserting on pipeline shape without matching full wire JSON.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::wire_name).collect()
    }
}

impl fmt::Display for Pipeline {
    /// Compact single-line JSON of the wire form, as it would be logged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.to_wire()).map_err(|_| fmt::Error)?;
        write!(f, "{rendered}")
    }
}
