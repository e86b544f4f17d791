use serde_json::{json, Value};

use squall::document::Document;
use squall::stage::{coerce_timestamp, first_letter, include, project, set, Stage};
use squall::store::{DocumentStore, MemoryStore, StoreError, StoreResult};

fn docs(values: Value) -> Vec<Document> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

async fn run(records: Value, stages: Vec<Stage>) -> StoreResult<Vec<Document>> {
    let store = MemoryStore::new().with_collection("two_hr_forecast_by_area", docs(records));
    store.aggregate("two_hr_forecast_by_area", &stages).await
}

#[tokio::test]
async fn test_set_coerces_offset_timestamps_to_utc_instants() {
    let out = run(
        json!([{"area": "Bishan", "timestamp": "2025-01-26T14:00:00+08:00"}]),
        vec![set(vec![coerce_timestamp("timestamp", "ts")])],
    )
    .await
    .unwrap();
    assert_eq!(out[0]["ts"], json!({"$date": "2025-01-26T06:00:00.000Z"}));
    // The source field keeps its raw string form.
    assert_eq!(out[0]["timestamp"], json!("2025-01-26T14:00:00+08:00"));
}

#[tokio::test]
async fn test_nested_path_sources_coerce_to_top_level_fields() {
    let out = run(
        json!([{"period": {
            "start": "2025-01-26T14:00:00+08:00",
            "end": "2025-01-26T16:00:00+08:00",
        }}]),
        vec![set(vec![
            coerce_timestamp("period.start", "start"),
            coerce_timestamp("period.end", "end"),
        ])],
    )
    .await
    .unwrap();
    assert_eq!(out[0]["start"], json!({"$date": "2025-01-26T06:00:00.000Z"}));
    assert_eq!(out[0]["end"], json!({"$date": "2025-01-26T08:00:00.000Z"}));
}

#[tokio::test]
async fn test_malformed_timestamp_aborts_the_run() {
    let err = run(
        json!([
            {"area": "Bishan", "timestamp": "2025-01-26T14:00:00+08:00"},
            {"area": "Bedok", "timestamp": "not-a-date"},
        ]),
        vec![set(vec![coerce_timestamp("timestamp", "ts")])],
    )
    .await
    .unwrap_err();
    match err {
        StoreError::MalformedDate { ref field, ref value } => {
            assert_eq!(field, "timestamp");
            assert_eq!(value, "not-a-date");
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_data_error());
}

#[tokio::test]
async fn test_null_and_missing_timestamps_coerce_to_null() {
    let out = run(
        json!([
            {"area": "Bishan", "timestamp": null},
            {"area": "Bedok"},
        ]),
        vec![set(vec![coerce_timestamp("timestamp", "ts")])],
    )
    .await
    .unwrap();
    assert_eq!(out[0]["ts"], Value::Null);
    assert_eq!(out[1]["ts"], Value::Null);
}

#[tokio::test]
async fn test_first_letter_takes_the_initial() {
    let out = run(
        json!([{"area": "Ang Mo Kio"}]),
        vec![set(vec![first_letter("area", "initial")])],
    )
    .await
    .unwrap();
    assert_eq!(out[0]["initial"], json!("A"));
}

#[tokio::test]
async fn test_project_keeps_only_listed_fields() {
    let out = run(
        json!([{
            "area": "Bishan",
            "forecast": "Cloudy",
            "timestamp": "2025-01-26T14:00:00+08:00",
            "period": {"start": "x", "end": "y"},
        }]),
        vec![
            set(vec![coerce_timestamp("timestamp", "ts")]),
            project(vec![include("area"), include("ts")]),
        ],
    )
    .await
    .unwrap();
    let keys: Vec<&String> = out[0].keys().collect();
    assert_eq!(keys, ["area", "ts"]);
}

#[tokio::test]
async fn test_project_of_missing_field_leaves_it_absent() {
    let out = run(
        json!([{"area": "Bishan"}]),
        vec![project(vec![include("area"), include("forecast")])],
    )
    .await
    .unwrap();
    assert!(out[0].contains_key("area"));
    assert!(!out[0].contains_key("forecast"));
}
