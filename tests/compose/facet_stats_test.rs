use chrono::{TimeZone, Utc};
use serde_json::json;

use squall::pipeline::{compose, Intent, TimeWindow};

fn january() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_facet_stats_full_wire_form() {
    let pipeline = compose(&Intent::FacetStats { window: january() });
    assert_eq!(pipeline.collection, "twenty_hr_forecast_general");
    assert_eq!(
        pipeline.to_wire(),
        json!([
            {"$set": {"ts": {"$dateFromString": {"dateString": "$updatedTimestamp"}}}},
            {"$match": {"$and": [
                {"$expr": {"$gte": ["$ts", {"$date": "2025-01-01T00:00:00.000Z"}]}},
                {"ts": {"$lte": {"$date": "2025-02-01T00:00:00.000Z"}}},
            ]}},
            {"$facet": {
                "avg": [{"$group": {
                    "_id": {"$dateToString": {
                        "format": "%Y-%m",
                        "date": {"$dateFromString": {"dateString": "$updatedTimestamp"}},
                    }},
                    "avg": {"$avg": "$temperature.low"},
                }}],
                "min": [{"$group": {
                    "_id": {"$dateToString": {
                        "format": "%Y-%m",
                        "date": {"$dateFromString": {"dateString": "$updatedTimestamp"}},
                    }},
                    "min": {"$min": "$temperature.low"},
                }}],
                "max": [{"$group": {
                    "_id": {"$dateToString": {
                        "format": "%Y-%m",
                        "date": {"$dateFromString": {"dateString": "$updatedTimestamp"}},
                    }},
                    "max": {"$max": "$temperature.low"},
                }}],
            }},
        ])
    );
}

#[test]
fn test_single_instant_window_renders_both_bounds() {
    let at = Utc.with_ymd_and_hms(2025, 1, 26, 6, 0, 0).unwrap();
    let window = TimeWindow::new(at, at).unwrap();
    let pipeline = compose(&Intent::FacetStats { window });
    assert_eq!(
        pipeline.to_wire()[1],
        json!({"$match": {"$and": [
            {"$expr": {"$gte": ["$ts", {"$date": "2025-01-26T06:00:00.000Z"}]}},
            {"ts": {"$lte": {"$date": "2025-01-26T06:00:00.000Z"}}},
        ]}})
    );
}

#[test]
fn test_window_bound_renders_with_millis_utc() {
    // Offsets normalize to UTC at the wire boundary.
    let from = Utc.with_ymd_and_hms(2025, 1, 25, 22, 0, 0).unwrap();
    let pipeline = compose(&Intent::FacetStats {
        window: TimeWindow::new(from, from).unwrap(),
    });
    let wire = pipeline.to_wire();
    assert_eq!(
        wire[1]["$match"]["$and"][0]["$expr"]["$gte"][1],
        json!({"$date": "2025-01-25T22:00:00.000Z"})
    );
}
