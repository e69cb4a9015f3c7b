//! ## Aggregate Views
//!
//! This module computes the aggregate tables a dashboard renders from the
//! prepared trip table, plus the scalar metrics computed over the current
//! filtered view:
//!
//! - **Top pickup zones:** trips per pickup location, top 10 by count, with zone
//!   names attached from the lookup.
//! - **Average fare by hour:** mean fare per pickup hour, ascending by hour.
//! - **Trip-distance distribution:** 40 equal-width bins over the observed range.
//! - **Payment-type breakdown:** trips per payment code, ascending by code.
//! - **Demand matrix:** trips per (weekday, hour) cell, dense 7x24 with zero fill.
//!
//! Each computation is a pure function of its input DataFrame: no shared state,
//! safe to run independently, in any order, or concurrently. Empty inputs
//! degrade to empty tables and zero metrics rather than errors.

use crate::columns;
use crate::exceptions::{TripDashError, TripDashResult};
use crate::loader::{int_values, ZoneLookup};
use arrow::array::{Array, Float64Array};
use arrow::record_batch::RecordBatch;
use datafusion::functions_aggregate::expr_fn::{avg, count, max, min, sum};
use datafusion::logical_expr::{col, lit};
use datafusion::prelude::*;

/// How many pickup zones the top-zones view keeps.
pub const TOP_ZONE_COUNT: usize = 10;
/// Bin count of the trip-distance histogram.
pub const DISTANCE_BINS: usize = 40;
/// Row labels of the demand matrix, in row order.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Trips counted for one pickup zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCount {
    pub location_id: i64,
    pub zone: String,
    pub trips: i64,
}

/// Mean fare for one pickup hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyFare {
    pub hour: i32,
    pub avg_fare: f64,
}

/// Equal-width histogram of trip distances over the observed [min, max] range.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHistogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl DistanceHistogram {
    /// Width of one bin; 0 for a degenerate range.
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    fn empty(bins: usize) -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            counts: vec![0; bins],
        }
    }
}

/// Trips counted for one payment-type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentShare {
    pub payment_type: i64,
    pub trips: i64,
}

/// Dense trips-per-(weekday, hour) matrix; rows Mon..Sun, columns hour 0..23,
/// cells with no trips hold 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandMatrix {
    pub counts: [[u64; 24]; 7],
}

impl DemandMatrix {
    pub fn new() -> Self {
        Self {
            counts: [[0; 24]; 7],
        }
    }

    /// Sum of all cells, i.e. the row count of the input table.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Scalar metrics over the current filtered view. Means are 0 when the view is
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewMetrics {
    pub total_trips: i64,
    pub avg_fare: f64,
    pub total_revenue: f64,
    pub avg_distance: f64,
    pub avg_duration_min: f64,
}

/// All five aggregate views, bundled for one dashboard render.
#[derive(Debug, Clone)]
pub struct DashboardAggregates {
    pub top_zones: Vec<ZoneCount>,
    pub fare_by_hour: Vec<HourlyFare>,
    pub distance_histogram: DistanceHistogram,
    pub payment_breakdown: Vec<PaymentShare>,
    pub demand: DemandMatrix,
}

/// Counts trips per pickup location and returns the `limit` busiest zones,
/// sorted by count descending with ties broken by location id ascending.
/// Location ids absent from the lookup are omitted.
pub async fn top_pickup_zones(
    trips: DataFrame,
    zones: &ZoneLookup,
    limit: usize,
) -> TripDashResult<Vec<ZoneCount>> {
    let counts = trips
        .aggregate(
            vec![col(columns::PICKUP_LOCATION)],
            vec![count(lit(1)).alias("trip_count")],
        )?
        .sort(vec![
            col("trip_count").sort(false, false),
            col(columns::PICKUP_LOCATION).sort(true, false),
        ])?
        .limit(0, Some(limit))?;

    let mut out = Vec::new();
    for batch in &counts.collect().await? {
        let ids = column_as_i64(batch, columns::PICKUP_LOCATION)?;
        let trip_counts = column_as_i64(batch, "trip_count")?;
        for row in 0..batch.num_rows() {
            if let Some(zone) = zones.zone_name(ids[row]) {
                out.push(ZoneCount {
                    location_id: ids[row],
                    zone: zone.to_string(),
                    trips: trip_counts[row],
                });
            }
        }
    }
    Ok(out)
}

/// Mean fare per pickup hour, sorted ascending by hour. Hours with no trips are
/// absent from the result.
pub async fn avg_fare_by_hour(trips: DataFrame) -> TripDashResult<Vec<HourlyFare>> {
    let fares = trips
        .aggregate(
            vec![col(columns::PICKUP_HOUR)],
            vec![avg(col(columns::FARE)).alias("avg_fare")],
        )?
        .sort(vec![col(columns::PICKUP_HOUR).sort(true, false)])?;

    let mut out = Vec::new();
    for batch in &fares.collect().await? {
        let hours = column_as_i64(batch, columns::PICKUP_HOUR)?;
        let avgs = column_as_f64(batch, "avg_fare")?;
        for row in 0..batch.num_rows() {
            out.push(HourlyFare {
                hour: hours[row] as i32,
                avg_fare: avgs[row],
            });
        }
    }
    Ok(out)
}

/// Histogram of trip distances: `bins` equal-width bins covering the observed
/// [min, max], the last bin inclusive of the maximum. An empty table yields
/// all-zero bins over a degenerate [0, 0] range.
pub async fn distance_histogram(
    trips: DataFrame,
    bins: usize,
) -> TripDashResult<DistanceHistogram> {
    if bins == 0 {
        return Err(TripDashError::InvalidParameter(
            "Histogram must have at least 1 bin".to_string(),
        ));
    }

    let bounds = trips
        .clone()
        .aggregate(
            vec![],
            vec![
                min(col(columns::DISTANCE)).alias("min_distance"),
                max(col(columns::DISTANCE)).alias("max_distance"),
            ],
        )?
        .collect()
        .await?;
    let (min_val, max_val) = match bounds.first() {
        Some(batch) if batch.num_rows() > 0 => {
            let mins = batch.column(batch.schema().index_of("min_distance")?).clone();
            let maxs = batch.column(batch.schema().index_of("max_distance")?).clone();
            match (scalar_f64(&mins), scalar_f64(&maxs)) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => return Ok(DistanceHistogram::empty(bins)),
            }
        }
        _ => return Ok(DistanceHistogram::empty(bins)),
    };

    let width = (max_val - min_val) / bins as f64;
    let mut counts = vec![0u64; bins];
    let values = trips.select(vec![col(columns::DISTANCE)])?.collect().await?;
    for batch in &values {
        for v in column_as_f64(batch, columns::DISTANCE)? {
            let bin = if width > 0.0 {
                (((v - min_val) / width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[bin] += 1;
        }
    }

    Ok(DistanceHistogram {
        min: min_val,
        max: max_val,
        counts,
    })
}

/// Trips per payment-type code, sorted ascending by code.
pub async fn payment_breakdown(trips: DataFrame) -> TripDashResult<Vec<PaymentShare>> {
    let shares = trips
        .aggregate(
            vec![col(columns::PAYMENT_TYPE)],
            vec![count(lit(1)).alias("trip_count")],
        )?
        .sort(vec![col(columns::PAYMENT_TYPE).sort(true, false)])?;

    let mut out = Vec::new();
    for batch in &shares.collect().await? {
        let codes = column_as_i64(batch, columns::PAYMENT_TYPE)?;
        let trip_counts = column_as_i64(batch, "trip_count")?;
        for row in 0..batch.num_rows() {
            out.push(PaymentShare {
                payment_type: codes[row],
                trips: trip_counts[row],
            });
        }
    }
    Ok(out)
}

/// Trips per (weekday, hour) cell, pivoted into a dense 7x24 matrix with
/// missing cells filled with 0.
pub async fn demand_matrix(trips: DataFrame) -> TripDashResult<DemandMatrix> {
    let cells = trips.aggregate(
        vec![col(columns::PICKUP_WEEKDAY), col(columns::PICKUP_HOUR)],
        vec![count(lit(1)).alias("trip_count")],
    )?;

    let mut matrix = DemandMatrix::new();
    for batch in &cells.collect().await? {
        let weekdays = column_as_i64(batch, columns::PICKUP_WEEKDAY)?;
        let hours = column_as_i64(batch, columns::PICKUP_HOUR)?;
        let trip_counts = column_as_i64(batch, "trip_count")?;
        for row in 0..batch.num_rows() {
            let (weekday, hour) = (weekdays[row], hours[row]);
            if (1..=7).contains(&weekday) && (0..24).contains(&hour) {
                matrix.counts[(weekday - 1) as usize][hour as usize] += trip_counts[row] as u64;
            }
        }
    }
    Ok(matrix)
}

/// Scalar metrics over a (possibly empty) filtered view.
pub async fn view_metrics(view: DataFrame) -> TripDashResult<ViewMetrics> {
    let agg = view
        .aggregate(
            vec![],
            vec![
                count(lit(1)).alias("trips"),
                avg(col(columns::FARE)).alias("avg_fare"),
                sum(col(columns::TOTAL)).alias("revenue"),
                avg(col(columns::DISTANCE)).alias("avg_distance"),
                avg(col(columns::DURATION_MIN)).alias("avg_duration"),
            ],
        )?
        .collect()
        .await?;

    let batch = match agg.first() {
        Some(batch) if batch.num_rows() > 0 => batch,
        _ => {
            return Ok(ViewMetrics {
                total_trips: 0,
                avg_fare: 0.0,
                total_revenue: 0.0,
                avg_distance: 0.0,
                avg_duration_min: 0.0,
            })
        }
    };
    let trips = column_as_i64(batch, "trips")?[0];
    Ok(ViewMetrics {
        total_trips: trips,
        avg_fare: scalar_f64(batch.column(batch.schema().index_of("avg_fare")?)).unwrap_or(0.0),
        total_revenue: scalar_f64(batch.column(batch.schema().index_of("revenue")?))
            .unwrap_or(0.0),
        avg_distance: scalar_f64(batch.column(batch.schema().index_of("avg_distance")?))
            .unwrap_or(0.0),
        avg_duration_min: scalar_f64(batch.column(batch.schema().index_of("avg_duration")?))
            .unwrap_or(0.0),
    })
}

/// Extracts a named integer column as i64 values.
fn column_as_i64(batch: &RecordBatch, name: &str) -> TripDashResult<Vec<i64>> {
    let idx = batch.schema().index_of(name)?;
    int_values(batch.column(idx).as_ref(), name)
}

/// Extracts a named Float64 column, skipping nothing; NULLs read as 0.
fn column_as_f64(batch: &RecordBatch, name: &str) -> TripDashResult<Vec<f64>> {
    let idx = batch.schema().index_of(name)?;
    let array = batch
        .column(idx)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| {
            TripDashError::InvalidParameter(format!(
                "Column '{}' must be Float64, but found {:?}",
                name,
                batch.column(idx).data_type()
            ))
        })?;
    Ok((0..array.len())
        .map(|i| if array.is_null(i) { 0.0 } else { array.value(i) })
        .collect())
}

/// First value of a Float64 array, None when the array is empty or NULL there.
fn scalar_f64(array: &arrow::array::ArrayRef) -> Option<f64> {
    let array = array.as_any().downcast_ref::<Float64Array>()?;
    if array.is_empty() || array.is_null(0) {
        None
    } else {
        Some(array.value(0))
    }
}
