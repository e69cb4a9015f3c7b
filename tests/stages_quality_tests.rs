use arrow::array::{ArrayRef, Float64Array, Int64Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;
use tripdash::make_pipeline;
use tripdash::stages::derive::TripFeatures;
use tripdash::stages::quality::PlausibilityFilter;

/// Builds a raw trip DataFrame from (fare, distance, duration minutes) triples,
/// all picked up at 2023-03-01T12:00:00Z.
async fn create_trips_df(rows: &[(f64, f64, i64)]) -> DataFrame {
    const PICKUP: i64 = 1677672000;
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "tpep_pickup_datetime",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        ),
        Field::new(
            "tpep_dropoff_datetime",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        ),
        Field::new("PULocationID", DataType::Int64, false),
        Field::new("fare_amount", DataType::Float64, false),
        Field::new("tip_amount", DataType::Float64, false),
        Field::new("total_amount", DataType::Float64, false),
        Field::new("trip_distance", DataType::Float64, false),
        Field::new("payment_type", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampNanosecondArray::from(vec![
                PICKUP * 1_000_000_000;
                rows.len()
            ])) as ArrayRef,
            Arc::new(TimestampNanosecondArray::from(
                rows.iter()
                    .map(|r| (PICKUP + r.2 * 60) * 1_000_000_000)
                    .collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Int64Array::from(vec![1_i64; rows.len()])) as ArrayRef,
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Float64Array::from(vec![0.0; rows.len()])) as ArrayRef,
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Int64Array::from(vec![1_i64; rows.len()])) as ArrayRef,
        ],
    )
    .unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("raw_trips", Arc::new(mem_table)).unwrap();
    ctx.table("raw_trips").await.unwrap()
}

async fn derive_and_filter(df: &DataFrame) -> DataFrame {
    let mut pipeline = make_pipeline!(
        ("derive_features", TripFeatures::new()),
        ("plausibility_bounds", PlausibilityFilter::new()),
    );
    pipeline.fit_transform(df).await.unwrap()
}

fn fares(batches: &[RecordBatch]) -> Vec<f64> {
    let mut out = Vec::new();
    for batch in batches {
        let idx = batch.schema().index_of("fare_amount").unwrap();
        let arr = batch
            .column(idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        out.extend((0..arr.len()).map(|i| arr.value(i)));
    }
    out
}

#[tokio::test]
async fn test_only_plausible_row_survives() {
    // Fares [10, 0, 250], distances [2, 1, 60], durations [15, 5, 200]: only the
    // first row is inside all three bounds.
    let df = create_trips_df(&[(10.0, 2.0, 15), (0.0, 1.0, 5), (250.0, 60.0, 200)]).await;
    let filtered = derive_and_filter(&df).await;
    let batches = filtered.collect().await.unwrap();

    assert_eq!(fares(&batches), vec![10.0]);
}

#[tokio::test]
async fn test_bounds_are_exclusive() {
    let df = create_trips_df(&[
        (200.0, 2.0, 15), // fare == upper bound
        (10.0, 50.0, 15), // distance == upper bound
        (10.0, 2.0, 1),   // duration == lower bound
        (199.0, 49.0, 179),
    ])
    .await;
    let filtered = derive_and_filter(&df).await;
    let batches = filtered.collect().await.unwrap();

    assert_eq!(fares(&batches), vec![199.0]);
}

#[tokio::test]
async fn test_all_rows_dropped_yields_empty_table_not_error() {
    let df = create_trips_df(&[(0.0, 2.0, 15), (300.0, 2.0, 15)]).await;
    let filtered = derive_and_filter(&df).await;
    let count = filtered.count().await.unwrap();

    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_surviving_rows_satisfy_all_bounds() {
    let df = create_trips_df(&[
        (10.0, 2.0, 15),
        (55.5, 12.0, 45),
        (0.5, 0.1, 2),
        (-3.0, 2.0, 15),
        (10.0, -1.0, 15),
        (10.0, 2.0, 400),
    ])
    .await;
    let filtered = derive_and_filter(&df).await;
    let batches = filtered.collect().await.unwrap();

    for batch in &batches {
        let fare_idx = batch.schema().index_of("fare_amount").unwrap();
        let dist_idx = batch.schema().index_of("trip_distance").unwrap();
        let dur_idx = batch.schema().index_of("trip_duration_minutes").unwrap();
        let fare = batch
            .column(fare_idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        let dist = batch
            .column(dist_idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        let dur = batch
            .column(dur_idx)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        for i in 0..batch.num_rows() {
            assert!(fare.value(i) > 0.0 && fare.value(i) < 200.0);
            assert!(dist.value(i) > 0.0 && dist.value(i) < 50.0);
            assert!(dur.value(i) > 1.0 && dur.value(i) < 180.0);
        }
    }
    assert_eq!(fares(&batches).len(), 3);
}

#[tokio::test]
async fn test_fit_rejects_unordered_bounds() {
    let df = create_trips_df(&[(10.0, 2.0, 15)]).await;
    let derived = {
        let mut transformer = TripFeatures::new();
        transformer.fit(&df).await.unwrap();
        transformer.transform(df).unwrap()
    };

    let mut filter = PlausibilityFilter::new();
    filter.fare_bounds = (200.0, 0.0);
    assert!(filter.fit(&derived).await.is_err());
}
