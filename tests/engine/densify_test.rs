use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use squall::document::Document;
use squall::pipeline::{compose, Intent, TimeWindow};
use squall::store::{DocumentStore, MemoryStore};
use squall::view::ForecastRow;

fn docs(values: Value) -> Vec<Document> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

// Six days at a six-hour step: 25 grid instants, both edges included.
fn six_day_window() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 1, 21, 6, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 27, 6, 0, 0).unwrap(),
    )
    .unwrap()
}

// One record exactly on the grid, one between grid instants.
fn sparse_records() -> Value {
    json!([
        {
            "area": "Bishan",
            "forecast": "Cloudy",
            "timestamp": "2025-01-26T14:00:00+08:00",
            "period": {
                "start": "2025-01-26T14:00:00+08:00",
                "end": "2025-01-26T16:00:00+08:00",
            },
        },
        {
            "area": "Bedok",
            "forecast": "Showers",
            "timestamp": "2025-01-26T15:30:00+08:00",
            "period": {
                "start": "2025-01-26T15:30:00+08:00",
                "end": "2025-01-26T17:30:00+08:00",
            },
        },
    ])
}

async fn run_rows(intent: &Intent, records: Value) -> Vec<ForecastRow> {
    let pipeline = compose(intent);
    let store = MemoryStore::new().with_collection("two_hr_forecast_by_area", docs(records));
    let out = store
        .aggregate(&pipeline.collection, &pipeline.stages)
        .await
        .unwrap();
    out.into_iter()
        .map(|doc| serde_json::from_value(Value::Object(doc)).unwrap())
        .collect()
}

#[tokio::test]
async fn test_grid_rows_plus_off_grid_record() {
    let rows = run_rows(
        &Intent::densified_listing(six_day_window(), ""),
        sparse_records(),
    )
    .await;

    // 25 grid instants, one occupied by the on-grid record, and the
    // off-grid record rides along.
    assert_eq!(rows.len(), 26);
    let gaps = rows.iter().filter(|r| r.area == "NA").count();
    assert_eq!(gaps, 24);
}

#[tokio::test]
async fn test_gap_rows_carry_placeholders_and_no_period() {
    let rows = run_rows(
        &Intent::densified_listing(six_day_window(), ""),
        sparse_records(),
    )
    .await;
    for row in rows.iter().filter(|r| r.area == "NA") {
        assert_eq!(row.forecast, "NA");
        assert_eq!(row.start, None);
        assert_eq!(row.end, None);
    }
}

#[tokio::test]
async fn test_real_rows_keep_their_fields() {
    let rows = run_rows(
        &Intent::densified_listing(six_day_window(), ""),
        sparse_records(),
    )
    .await;
    let bishan = rows.iter().find(|r| r.area == "Bishan").unwrap();
    assert_eq!(bishan.forecast, "Cloudy");
    assert_eq!(
        bishan.ts,
        Utc.with_ymd_and_hms(2025, 1, 26, 6, 0, 0).unwrap()
    );
    assert!(bishan.start.is_some());
    assert!(bishan.end.is_some());

    let bedok = rows.iter().find(|r| r.area == "Bedok").unwrap();
    assert_eq!(
        bedok.ts,
        Utc.with_ymd_and_hms(2025, 1, 26, 7, 30, 0).unwrap()
    );
}

#[tokio::test]
async fn test_rows_come_out_newest_first() {
    let rows = run_rows(
        &Intent::densified_listing(six_day_window(), ""),
        sparse_records(),
    )
    .await;
    assert_eq!(rows[0].ts, six_day_window().to());
    for pair in rows.windows(2) {
        assert!(pair[0].ts >= pair[1].ts);
    }
}

#[tokio::test]
async fn test_empty_input_yields_one_row_per_grid_instant() {
    let rows = run_rows(&Intent::densified_listing(six_day_window(), ""), json!([])).await;

    assert_eq!(rows.len(), 25);
    assert!(rows.iter().all(|r| r.area == "NA" && r.forecast == "NA"));
    let mut instants: Vec<_> = rows.iter().map(|r| r.ts).collect();
    instants.dedup();
    assert_eq!(instants.len(), 25);
}

#[tokio::test]
async fn test_step_override_changes_grid_density() {
    let rows = run_rows(
        &Intent::DensifiedListing {
            window: six_day_window(),
            keyword: String::new(),
            step_hours: 12,
        },
        json!([]),
    )
    .await;
    // 144 hours at a 12-hour step, inclusive.
    assert_eq!(rows.len(), 13);
    assert!(rows.iter().all(|r| r.area == "NA"));
}

#[tokio::test]
async fn test_cap_keeps_the_newest_thousand_rows() {
    // A year-long window generates far more grid instants than the cap.
    let window = TimeWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
    )
    .unwrap();
    let rows = run_rows(&Intent::densified_listing(window, ""), json!([])).await;
    assert_eq!(rows.len(), 1000);
    assert_eq!(rows[0].ts, window.to());
}
