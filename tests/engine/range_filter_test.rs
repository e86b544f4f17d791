use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use squall::document::Document;
use squall::stage::{coerce_timestamp, instant_range, instant_range_expr_lower, set, Stage};
use squall::store::{DocumentStore, MemoryStore, StoreResult};

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

// Records at the window edges, inside, and one step outside each edge.
// All timestamps are +08:00 local, window bounds are UTC.
fn edge_records() -> Value {
    json!([
        {"area": "Before", "timestamp": "2025-01-26T13:59:59+08:00"},
        {"area": "AtStart", "timestamp": "2025-01-26T14:00:00+08:00"},
        {"area": "Inside", "timestamp": "2025-01-26T20:00:00+08:00"},
        {"area": "AtEnd", "timestamp": "2025-01-27T14:00:00+08:00"},
        {"area": "After", "timestamp": "2025-01-27T14:00:01+08:00"},
    ])
}

fn window_bounds() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2025, 1, 26, 6, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 27, 6, 0, 0).unwrap(),
    )
}

fn areas(out: &[Document]) -> Vec<&str> {
    out.iter().map(|d| d["area"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_window_includes_both_edges() {
    let (from, to) = window_bounds();
    let out = run(
        edge_records(),
        vec![
            set(vec![coerce_timestamp("timestamp", "ts")]),
            instant_range("ts", from, to),
        ],
    )
    .await
    .unwrap();
    assert_eq!(areas(&out), ["AtStart", "Inside", "AtEnd"]);
}

#[tokio::test]
async fn test_expr_lower_spelling_selects_the_same_records() {
    let (from, to) = window_bounds();
    let coerce = set(vec![coerce_timestamp("timestamp", "ts")]);
    let plain = run(
        edge_records(),
        vec![coerce.clone(), instant_range("ts", from, to)],
    )
    .await
    .unwrap();
    let spelled = run(
        edge_records(),
        vec![coerce, instant_range_expr_lower("ts", from, to)],
    )
    .await
    .unwrap();
    assert_eq!(plain, spelled);
}

#[tokio::test]
async fn test_uncoerced_strings_never_match_an_instant_window() {
    let (from, to) = window_bounds();
    // No coercion stage: ts stays a raw string even though it reads like a
    // timestamp, so the instant bounds cannot admit it.
    let out = run(
        json!([{"area": "Inside", "ts": "2025-01-26T20:00:00Z"}]),
        vec![instant_range("ts", from, to)],
    )
    .await
    .unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_null_or_missing_ts_falls_out_of_the_window() {
    let (from, to) = window_bounds();
    let out = run(
        json!([
            {"area": "NullTs", "ts": null},
            {"area": "NoTs"},
        ]),
        vec![instant_range("ts", from, to)],
    )
    .await
    .unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_range_over_unknown_collection_is_empty_not_an_error() {
    let (from, to) = window_bounds();
    let store = MemoryStore::new();
    let out = store
        .aggregate("two_hr_forecast_by_area", &[instant_range("ts", from, to)])
        .await
        .unwrap();
    assert!(out.is_empty());
}
