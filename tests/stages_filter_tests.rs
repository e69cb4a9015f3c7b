use arrow::array::{ArrayRef, Int32Array, Int64Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;
use tripdash::ViewFilter;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Builds a prepared-table slice from (pickup epoch seconds, pickup hour,
/// payment type) rows; only the columns the interactive filter reads.
async fn create_view_df(rows: &[(i64, i32, i64)]) -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "tpep_pickup_datetime",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        ),
        Field::new("pickup_hour", DataType::Int32, false),
        Field::new("payment_type", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampNanosecondArray::from(
                rows.iter().map(|r| r.0 * 1_000_000_000).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Int32Array::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())) as ArrayRef,
            Arc::new(Int64Array::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())) as ArrayRef,
        ],
    )
    .unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("trips", Arc::new(mem_table)).unwrap();
    ctx.table("trips").await.unwrap()
}

// Pickups used across the tests:
// 2023-03-01T08:00:00Z, 2023-03-02T12:00:00Z, 2023-03-03T22:00:00Z.
const MAR_1_08H: i64 = 1677657600;
const MAR_2_12H: i64 = 1677758400;
const MAR_3_22H: i64 = 1677880800;

fn sample_rows() -> Vec<(i64, i32, i64)> {
    vec![
        (MAR_1_08H, 8, 1),
        (MAR_2_12H, 12, 1),
        (MAR_2_12H, 12, 2),
        (MAR_3_22H, 22, 3),
    ]
}

#[tokio::test]
async fn test_empty_payment_set_selects_nothing() {
    let df = create_view_df(&sample_rows()).await;
    let filter = ViewFilter::new((date(2023, 3, 1), date(2023, 3, 31)), (0, 23), vec![]);

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_full_ranges_and_all_codes_select_everything() {
    let rows = sample_rows();
    let df = create_view_df(&rows).await;
    let filter = ViewFilter::new(
        (date(2023, 3, 1), date(2023, 3, 3)),
        (0, 23),
        vec![1, 2, 3],
    );

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, rows.len());
}

#[tokio::test]
async fn test_date_range_is_inclusive() {
    let df = create_view_df(&sample_rows()).await;
    // Only March 2: both bounds equal, and the bound day itself must match.
    let filter = ViewFilter::new(
        (date(2023, 3, 2), date(2023, 3, 2)),
        (0, 23),
        vec![1, 2, 3],
    );

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_hour_range_is_inclusive() {
    let df = create_view_df(&sample_rows()).await;
    let filter = ViewFilter::new(
        (date(2023, 3, 1), date(2023, 3, 3)),
        (8, 12),
        vec![1, 2, 3],
    );

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_payment_set_filters_codes() {
    let df = create_view_df(&sample_rows()).await;
    let filter = ViewFilter::new((date(2023, 3, 1), date(2023, 3, 3)), (0, 23), vec![1]);

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_predicates_are_conjunctive() {
    let df = create_view_df(&sample_rows()).await;
    // Date range matches March 2-3, hour range matches 12 only, payment set
    // matches codes 2 and 3: only the (Mar 2, 12h, code 2) row passes all three.
    let filter = ViewFilter::new(
        (date(2023, 3, 2), date(2023, 3, 3)),
        (12, 12),
        vec![2, 3],
    );

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_disjoint_date_range_yields_empty_view() {
    let df = create_view_df(&sample_rows()).await;
    let filter = ViewFilter::new(
        (date(2024, 1, 1), date(2024, 12, 31)),
        (0, 23),
        vec![1, 2, 3],
    );

    let count = filter.apply(df).unwrap().count().await.unwrap();
    assert_eq!(count, 0);
}
