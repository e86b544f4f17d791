use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use squall::document::Document;
use squall::pipeline::{compose, Intent, TimeWindow};
use squall::store::{DocumentStore, MemoryStore};
use squall::view::MonthlyTemperatureStats;

fn docs(values: Value) -> Vec<Document> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

// 24-hour outlooks over two months, plus one record before the window.
// The 2025-02-01T01:00+08:00 record is still January in UTC.
fn outlooks() -> Value {
    json!([
        {
            "updatedTimestamp": "2025-01-26T09:00:00+08:00",
            "temperature": {"low": 23, "high": 32},
            "relativeHumidity": {"low": 55, "high": 95},
            "general": "Thundery Showers",
        },
        {
            "updatedTimestamp": "2025-01-27T09:00:00+08:00",
            "temperature": {"low": 25, "high": 33},
            "relativeHumidity": {"low": 60, "high": 90},
            "general": "Partly Cloudy",
        },
        {
            "updatedTimestamp": "2025-02-01T01:00:00+08:00",
            "temperature": {"low": 24, "high": 31},
            "relativeHumidity": {"low": 65, "high": 90},
            "general": "Cloudy",
        },
        {
            "updatedTimestamp": "2025-02-03T09:00:00+08:00",
            "temperature": {"low": 27, "high": 34},
            "relativeHumidity": {"low": 50, "high": 85},
            "general": "Fair",
        },
        {
            "updatedTimestamp": "2024-12-30T09:00:00+08:00",
            "temperature": {"low": 20, "high": 30},
            "relativeHumidity": {"low": 70, "high": 95},
            "general": "Rain",
        },
    ])
}

async fn run_stats() -> MonthlyTemperatureStats {
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();
    let pipeline = compose(&Intent::FacetStats { window });
    let store = MemoryStore::new().with_collection("twenty_hr_forecast_general", docs(outlooks()));
    let out = store
        .aggregate(&pipeline.collection, &pipeline.stages)
        .await
        .unwrap();
    assert_eq!(out.len(), 1, "facet always emits exactly one document");
    serde_json::from_value(Value::Object(out[0].clone())).unwrap()
}

#[tokio::test]
async fn test_monthly_reduction_across_two_months() {
    let stats = run_stats().await;

    let months: Vec<&str> = stats.avg.iter().filter_map(|m| m.month.as_deref()).collect();
    assert_eq!(months, ["2025-01", "2025-02"]);

    // January: lows 23, 25, 24. February: low 27.
    assert_eq!(stats.avg[0].value, Some(24.0));
    assert_eq!(stats.min[0].value, Some(23.0));
    assert_eq!(stats.max[0].value, Some(25.0));
    assert_eq!(stats.avg[1].value, Some(27.0));
}

#[tokio::test]
async fn test_month_keys_follow_utc_not_the_record_offset() {
    let stats = run_stats().await;
    // The early-February local record lands in January once normalized to
    // UTC, so February's minimum stays at 27.
    assert_eq!(stats.min[1].month.as_deref(), Some("2025-02"));
    assert_eq!(stats.min[1].value, Some(27.0));
}

#[tokio::test]
async fn test_records_before_the_window_are_excluded() {
    let stats = run_stats().await;
    assert!(stats
        .avg
        .iter()
        .all(|m| m.month.as_deref() != Some("2024-12")));
}

#[tokio::test]
async fn test_min_avg_max_bracket_every_month() {
    let stats = run_stats().await;
    assert_eq!(stats.avg.len(), stats.min.len());
    assert_eq!(stats.avg.len(), stats.max.len());
    for ((avg, min), max) in stats.avg.iter().zip(&stats.min).zip(&stats.max) {
        assert_eq!(avg.month, min.month);
        assert_eq!(avg.month, max.month);
        let (avg, min, max) = (avg.value.unwrap(), min.value.unwrap(), max.value.unwrap());
        assert!(min <= avg && avg <= max, "{min} <= {avg} <= {max} violated");
    }
}

#[tokio::test]
async fn test_single_utc_record_lands_in_its_month() {
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 1, 26, 6, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
    )
    .unwrap();
    let pipeline = compose(&Intent::FacetStats { window });
    let records = json!([
        {
            "updatedTimestamp": "2025-01-27T10:00:00Z",
            "area": "Bishan",
            "temperature": {"low": 24},
        },
    ]);
    let store = MemoryStore::new().with_collection("twenty_hr_forecast_general", docs(records));
    let out = store
        .aggregate(&pipeline.collection, &pipeline.stages)
        .await
        .unwrap();
    let stats: MonthlyTemperatureStats =
        serde_json::from_value(Value::Object(out[0].clone())).unwrap();
    assert_eq!(stats.avg[0].month.as_deref(), Some("2025-01"));
    assert_eq!(stats.avg[0].value, Some(24.0));
    assert_eq!(stats.min[0].value, Some(24.0));
    assert_eq!(stats.max[0].value, Some(24.0));
}

#[tokio::test]
async fn test_empty_collection_yields_one_document_with_empty_arms() {
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
    )
    .unwrap();
    let pipeline = compose(&Intent::FacetStats { window });
    let store = MemoryStore::new();
    let out = store
        .aggregate(&pipeline.collection, &pipeline.stages)
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    let stats: MonthlyTemperatureStats =
        serde_json::from_value(Value::Object(out[0].clone())).unwrap();
    assert!(stats.avg.is_empty());
    assert!(stats.min.is_empty());
    assert!(stats.max.is_empty());
}
