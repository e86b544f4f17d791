//! Query intents and their parameters.
//!
//! An [`Intent`] names one of the five supported queries together with the
//! parameters a caller may vary. Everything else about a query, including
//! the stage order, collection, and result caps, is fixed by
//! [`compose`](super::compose::compose).

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Collection names the pipelines read from.
pub mod collections {
    /// Two-hourly nowcasts, one record per area and window.
    pub const TWO_HR_FORECAST: &str = "two_hr_forecast_by_area";
    /// Island-wide 24-hour outlooks with temperature ranges.
    pub const TWENTY_FOUR_HR_FORECAST: &str = "twenty_hr_forecast_general";
    /// Area reference data: name plus centroid coordinates.
    pub const AREA_REFERENCE: &str = "area";
}

/// Most rows a listing query returns.
pub const LISTING_RESULT_CAP: u64 = 10;
/// Most buckets a bucket query returns.
pub const BUCKET_RESULT_CAP: u64 = 10;
/// Most rows a densified listing returns; sized for multi-day windows.
pub const DENSIFIED_RESULT_CAP: u64 = 1000;
/// Gap step used when a densified listing does not override it.
pub const DEFAULT_DENSIFY_STEP_HOURS: i64 = 6;
/// Bucket boundaries over area initials; `[A, B) [B, C) [C, D)`.
pub const DEFAULT_BUCKET_BOUNDARIES: [&str; 4] = ["A", "B", "C", "D"];
/// Label of the bucket that collects initials outside the boundaries.
pub const DEFAULT_BUCKET_LABEL: &str = "Others";

/// Inclusive time window; both ends participate in `>=`/`<=` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {from} is after its end {to}")]
    StartAfterEnd {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl TimeWindow {
    /// Builds a window, rejecting `from > to`. `from == to` is a valid
    /// single-instant window.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, WindowError> {
        if from > to {
            return Err(WindowError::StartAfterEnd { from, to });
        }
        Ok(TimeWindow { from, to })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }
}

/// One of the five supported queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Monthly average, minimum, and maximum of the overnight low across
    /// 24-hour outlooks updated inside the window.
    FacetStats { window: TimeWindow },
    /// Nowcasts partitioned by the first letter of their area name.
    BucketByArea {
        boundaries: Vec<String>,
        default_label: String,
    },
    /// Nowcasts for areas matching a keyword, newest first.
    Listing { window: TimeWindow, keyword: String },
    /// Like [`Intent::Listing`], with synthetic placeholder rows inserted
    /// wherever the window has no record at the step grid.
    DensifiedListing {
        window: TimeWindow,
        keyword: String,
        step_hours: i64,
    },
    /// Like [`Intent::Listing`], enriched with area coordinates joined from
    /// the reference collection.
    EnrichedListing { window: TimeWindow, keyword: String },
}

impl Intent {
    /// Bucket intent with the stock boundaries and default label.
    pub fn bucket_by_area() -> Self {
        Intent::BucketByArea {
            boundaries: DEFAULT_BUCKET_BOUNDARIES
                .iter()
                .map(|b| b.to_string())
                .collect(),
            default_label: DEFAULT_BUCKET_LABEL.to_string(),
        }
    }

    /// Densified listing at the stock six-hour step.
    pub fn densified_listing(window: TimeWindow, keyword: impl Into<String>) -> Self {
        Intent::DensifiedListing {
            window,
            keyword: keyword.into(),
            step_hours: DEFAULT_DENSIFY_STEP_HOURS,
        }
    }

    /// Collection the composed pipeline reads from.
    pub fn collection(&self) -> &'static str {
        match self {
            Intent::FacetStats { .. } => collections::TWENTY_FOUR_HR_FORECAST,
            Intent::BucketByArea { .. }
            | Intent::Listing { .. }
            | Intent::DensifiedListing { .. }
            | Intent::EnrichedListing { .. } => collections::TWO_HR_FORECAST,
        }
    }

    /// Stable name used in logs and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::FacetStats { .. } => "facet-stats",
            Intent::BucketByArea { .. } => "bucket-areas",
            Intent::Listing { .. } => "list",
            Intent::DensifiedListing { .. } => "list-densified",
            Intent::EnrichedListing { .. } => "list-enriched",
        }
    }
}
