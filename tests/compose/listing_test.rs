use chrono::{TimeZone, Utc};
use serde_json::json;

use squall::pipeline::{compose, Intent, TimeWindow};

fn window() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 1, 21, 6, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 27, 6, 0, 0).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_listing_full_wire_form() {
    let pipeline = compose(&Intent::Listing {
        window: window(),
        keyword: "west".to_string(),
    });
    assert_eq!(pipeline.collection, "two_hr_forecast_by_area");
    assert_eq!(
        pipeline.to_wire(),
        json!([
            {"$match": {"area": {"$regex": ".*west.*", "$options": "i"}}},
            {"$set": {
                "start": {"$dateFromString": {"dateString": "$period.start"}},
                "end": {"$dateFromString": {"dateString": "$period.end"}},
                "ts": {"$dateFromString": {"dateString": "$timestamp"}},
            }},
            {"$project": {"_id": 1, "area": 1, "start": 1, "end": 1, "ts": 1, "forecast": 1}},
            {"$match": {"$and": [
                {"ts": {"$gte": {"$date": "2025-01-21T06:00:00.000Z"}}},
                {"ts": {"$lte": {"$date": "2025-01-27T06:00:00.000Z"}}},
            ]}},
            {"$sort": {"ts": -1, "area": 1}},
            {"$limit": 10},
        ])
    );
}

#[test]
fn test_empty_keyword_still_emits_keyword_stage() {
    let pipeline = compose(&Intent::Listing {
        window: window(),
        keyword: String::new(),
    });
    assert_eq!(
        pipeline.to_wire()[0],
        json!({"$match": {"area": {"$regex": ".*.*", "$options": "i"}}})
    );
}

#[test]
fn test_densified_listing_inserts_densify_and_fill_before_sort() {
    let pipeline = compose(&Intent::densified_listing(window(), ""));
    let wire = pipeline.to_wire();
    assert_eq!(
        wire[4],
        json!({"$densify": {
            "field": "ts",
            "range": {
                "step": 6,
                "unit": "hour",
                "bounds": [
                    {"$date": "2025-01-21T06:00:00.000Z"},
                    {"$date": "2025-01-27T06:00:00.000Z"},
                ],
            },
        }})
    );
    assert_eq!(
        wire[5],
        json!({"$fill": {"output": {
            "area": {"value": "NA"},
            "forecast": {"value": "NA"},
        }}})
    );
    assert_eq!(wire[7], json!({"$limit": 1000}));
}

#[test]
fn test_densified_listing_honours_step_override() {
    let pipeline = compose(&Intent::DensifiedListing {
        window: window(),
        keyword: String::new(),
        step_hours: 12,
    });
    assert_eq!(pipeline.to_wire()[4]["$densify"]["range"]["step"], json!(12));
}

#[test]
fn test_enriched_listing_join_and_final_shape() {
    let pipeline = compose(&Intent::EnrichedListing {
        window: window(),
        keyword: "bish".to_string(),
    });
    let wire = pipeline.to_wire();
    assert_eq!(
        wire[5],
        json!({"$lookup": {
            "from": "area",
            "localField": "area",
            "foreignField": "name",
            "as": "area_info",
        }})
    );
    assert_eq!(
        wire[6],
        json!({"$set": {"area_obj": {"$arrayElemAt": ["$area_info", 0]}}})
    );
    assert_eq!(
        wire[7],
        json!({"$replaceRoot": {"newRoot": {
            "$mergeObjects": ["$area_obj.location", "$$ROOT"],
        }}})
    );
    assert_eq!(
        wire[8],
        json!({"$unset": ["_id", "period", "area_info", "area_obj", "timestamp"]})
    );
    assert_eq!(
        wire[9],
        json!({"$project": {
            "area": 1,
            "lat": "$latitude",
            "lng": "$longitude",
            "forecast": 1,
            "start": 1,
            "end": 1,
            "ts": 1,
        }})
    );
}

#[test]
fn test_enriched_listing_caps_before_joining() {
    let pipeline = compose(&Intent::EnrichedListing {
        window: window(),
        keyword: String::new(),
    });
    let names = pipeline.stage_names();
    let cap = names.iter().position(|n| *n == "$limit").unwrap();
    let join = names.iter().position(|n| *n == "$lookup").unwrap();
    assert!(cap < join, "join must only ever see capped rows");
}
