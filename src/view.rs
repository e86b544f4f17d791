//! Typed result views.
//!
//! Each intent promises an output shape; the types here give those promises
//! compile-time names. Decoding is plain serde over the engine's JSON
//! output, with instants unwrapped from their `{"$date": ...}` wire form.
//! Fields the pipelines leave out on purpose (coordinates on an unmatched
//! join, period bounds on synthetic gap rows) decode as `None` rather than
//! failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct WireStamp {
    #[serde(rename = "$date")]
    raw: String,
}

/// Serde adapter for a required instant in wire form.
pub mod instant_wire {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::WireStamp;

    pub fn serialize<S: Serializer>(
        at: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        WireStamp {
            raw: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let wire = WireStamp::deserialize(deserializer)?;
        crate::document::parse_instant(&wire.raw)
            .ok_or_else(|| D::Error::custom(format!("not an RFC 3339 instant: {}", wire.raw)))
    }
}

/// Serde adapter for an optional instant; pair with `#[serde(default)]` so
/// an absent field reads as `None`.
pub mod instant_wire_opt {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::WireStamp;

    pub fn serialize<S: Serializer>(
        at: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => WireStamp {
                raw: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }
            .serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let wire = Option::<WireStamp>::deserialize(deserializer)?;
        wire.map(|wire| {
            crate::document::parse_instant(&wire.raw)
                .ok_or_else(|| D::Error::custom(format!("not an RFC 3339 instant: {}", wire.raw)))
        })
        .transpose()
    }
}

/// One row of a plain or densified listing.
///
/// Synthetic gap rows carry the fill placeholders in `area` and `forecast`
/// and no period bounds at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub area: String,
    pub forecast: String,
    #[serde(default, with = "instant_wire_opt", skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, with = "instant_wire_opt", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(with = "instant_wire")]
    pub ts: DateTime<Utc>,
}

/// One row of an enriched listing.
///
/// `lat`/`lng` are absent when the area has no entry in the reference
/// collection; the join is outer and never drops rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    pub forecast: String,
    #[serde(default, with = "instant_wire_opt", skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, with = "instant_wire_opt", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(with = "instant_wire")]
    pub ts: DateTime<Utc>,
}

/// Monthly temperature statistics from the facet query. All three arms see
/// the same filtered records, so for any shared month `min <= avg <= max`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonthlyTemperatureStats {
    pub avg: Vec<MonthlyMetric>,
    pub min: Vec<MonthlyMetric>,
    pub max: Vec<MonthlyMetric>,
}

/// One month's reduced value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMetric {
    /// `"%Y-%m"` month key; `None` groups records whose update time was null.
    #[serde(rename = "_id")]
    pub month: Option<String>,
    /// The arm's statistic; null when no member had a numeric value.
    #[serde(alias = "avg", alias = "min", alias = "max")]
    pub value: Option<f64>,
}

/// One bucket of nowcasts sharing an area initial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaBucket {
    /// Boundary label, or the default label for out-of-range initials.
    pub initial: String,
    pub count: u64,
    pub areas: Vec<BucketAreaEntry>,
    pub periods: Vec<BucketPeriodEntry>,
}

/// Forecast summary inside a bucket. `timestamp` stays the raw string; the
/// bucket pipeline never coerces the copies it pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAreaEntry {
    pub area: String,
    pub forecast: String,
    pub timestamp: String,
}

/// Validity window inside a bucket, with raw string bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketPeriodEntry {
    pub area: String,
    pub period: ForecastPeriod,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub start: String,
    pub end: String,
}
