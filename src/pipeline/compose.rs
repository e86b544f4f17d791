//! Intent-to-pipeline composition.
//!
//! One function per intent, each laying out stages in a fixed order:
//!
//! 1. narrow (keyword match)
//! 2. coerce (string timestamps to instants)
//! 3. shape (project)
//! 4. window (instant-range match)
//! 5. summarize or densify
//! 6. order
//! 7. cap
//! 8. enrich (join after the cap so it touches at most cap-many rows)
//!
//! Intents skip steps they do not need but never reorder them. Range
//! filtering always happens after coercion, so it compares instants and can
//! never accidentally match raw strings.

use serde_json::json;

use crate::stage::{
    area_keyword, asc, bucket_by, coerce_timestamp, count, densify_instants, desc, facet, field,
    fill_constants, first_letter, include, instant_range, instant_range_expr_lower, limit,
    lookup_one_and_merge, monthly_facet_group, project, push, rename, set, sort_by, template,
    unset, Metric, Stage,
};

use super::intent::{
    collections, Intent, TimeWindow, BUCKET_RESULT_CAP, DENSIFIED_RESULT_CAP, LISTING_RESULT_CAP,
};
use super::Pipeline;

/// Composes the pipeline for an intent.
pub fn compose(intent: &Intent) -> Pipeline {
    match intent {
        Intent::FacetStats { window } => facet_stats(window),
        Intent::BucketByArea {
            boundaries,
            default_label,
        } => bucket_by_area(boundaries, default_label),
        Intent::Listing { window, keyword } => listing(window, keyword),
        Intent::DensifiedListing {
            window,
            keyword,
            step_hours,
        } => densified_listing(window, keyword, *step_hours),
        Intent::EnrichedListing { window, keyword } => enriched_listing(window, keyword),
    }
}

/// Monthly avg/min/max of the overnight low, over outlooks updated within
/// the window.
///
/// The `ts` set stage exists solely for the range match; each facet arm
/// re-coerces `updatedTimestamp` inside its own group key.
fn facet_stats(window: &TimeWindow) -> Pipeline {
    Pipeline {
        collection: collections::TWENTY_FOUR_HR_FORECAST.to_string(),
        stages: vec![
            set(vec![coerce_timestamp("updatedTimestamp", "ts")]),
            instant_range_expr_lower("ts", window.from(), window.to()),
            facet(vec![
                monthly_facet_group(Metric::Avg, "temperature.low", "updatedTimestamp"),
                monthly_facet_group(Metric::Min, "temperature.low", "updatedTimestamp"),
                monthly_facet_group(Metric::Max, "temperature.low", "updatedTimestamp"),
            ]),
        ],
    }
}

/// Nowcasts partitioned by area initial. No time window: the bucket spans
/// whatever the collection holds.
fn bucket_by_area(boundaries: &[String], default_label: &str) -> Pipeline {
    let area_entry = template(vec![
        ("area", field("area")),
        ("forecast", field("forecast")),
        ("timestamp", field("timestamp")),
    ]);
    let period_entry = template(vec![
        ("area", field("area")),
        ("period", field("period")),
        ("timestamp", field("timestamp")),
    ]);
    Pipeline {
        collection: collections::TWO_HR_FORECAST.to_string(),
        stages: vec![
            set(vec![
                coerce_timestamp("timestamp", "ts"),
                first_letter("area", "initial"),
            ]),
            bucket_by(
                field("initial"),
                boundaries.iter().map(String::as_str).collect(),
                default_label,
                vec![
                    ("count", count()),
                    ("areas", push(area_entry)),
                    ("periods", push(period_entry)),
                ],
            ),
            // The bucket key lands in _id; re-expose it under its own name
            // before dropping _id.
            set(vec![("initial", field("_id"))]),
            sort_by(vec![asc("initial")]),
            unset(vec!["_id"]),
            limit(BUCKET_RESULT_CAP),
        ],
    }
}

fn listing_prefix(window: &TimeWindow, keyword: &str) -> Vec<Stage> {
    vec![
        area_keyword(keyword),
        set(vec![
            coerce_timestamp("period.start", "start"),
            coerce_timestamp("period.end", "end"),
            coerce_timestamp("timestamp", "ts"),
        ]),
        project(vec![
            include("_id"),
            include("area"),
            include("start"),
            include("end"),
            include("ts"),
            include("forecast"),
        ]),
        instant_range("ts", window.from(), window.to()),
    ]
}

/// Keyword-filtered nowcast rows, newest first.
fn listing(window: &TimeWindow, keyword: &str) -> Pipeline {
    let mut stages = listing_prefix(window, keyword);
    stages.push(sort_by(vec![desc("ts"), asc("area")]));
    stages.push(limit(LISTING_RESULT_CAP));
    Pipeline {
        collection: collections::TWO_HR_FORECAST.to_string(),
        stages,
    }
}

/// Listing with placeholder rows on a fixed step grid wherever the window
/// has a gap. Placeholders carry only `ts` until the fill stage names them.
fn densified_listing(window: &TimeWindow, keyword: &str, step_hours: i64) -> Pipeline {
    let mut stages = listing_prefix(window, keyword);
    stages.push(densify_instants(
        "ts",
        step_hours,
        window.from(),
        window.to(),
    ));
    stages.push(fill_constants(vec![
        ("area", json!("NA")),
        ("forecast", json!("NA")),
    ]));
    stages.push(sort_by(vec![desc("ts"), asc("area")]));
    stages.push(limit(DENSIFIED_RESULT_CAP));
    Pipeline {
        collection: collections::TWO_HR_FORECAST.to_string(),
        stages,
    }
}

/// Listing joined with area coordinates. The join runs after the cap, so it
/// touches at most [`LISTING_RESULT_CAP`] rows; rows keep their own fields on
/// any name collision with the joined sub-object, and rows for areas missing
/// from the reference collection simply carry no `lat`/`lng`.
fn enriched_listing(window: &TimeWindow, keyword: &str) -> Pipeline {
    let mut stages = vec![
        area_keyword(keyword),
        set(vec![
            coerce_timestamp("period.start", "start"),
            coerce_timestamp("period.end", "end"),
            coerce_timestamp("timestamp", "ts"),
        ]),
        instant_range("ts", window.from(), window.to()),
        sort_by(vec![desc("ts"), asc("area")]),
        limit(LISTING_RESULT_CAP),
    ];
    stages.extend(lookup_one_and_merge(
        collections::AREA_REFERENCE,
        "area",
        "name",
        "location",
    ));
    stages.push(unset(vec![
        "_id",
        "period",
        "area_info",
        "area_obj",
        "timestamp",
    ]));
    stages.push(project(vec![
        include("area"),
        rename("lat", "latitude"),
        rename("lng", "longitude"),
        include("forecast"),
        include("start"),
        include("end"),
        include("ts"),
    ]));
    Pipeline {
        collection: collections::TWO_HR_FORECAST.to_string(),
        stages,
    }
}
