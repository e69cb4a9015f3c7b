//! ## Trip Session
//!
//! This module runs the ingest pipeline (load, derive, quality-filter, sample)
//! once and wraps the result in an explicit session-scoped handle,
//! [`TripSession`]. The handle owns the prepared trip table (registered as an
//! in-memory table in its own `SessionContext`) and the zone lookup for the
//! lifetime of one dashboard session; the table is immutable once produced.
//!
//! Interactive filtering and every aggregate view are methods on the handle, so
//! consumers never reach for process-wide cached state. All aggregate views read
//! the full sampled table; only the scalar metrics read the filtered view.

use crate::aggregates::{
    self, DashboardAggregates, DistanceHistogram, HourlyFare, PaymentShare, ViewMetrics,
    ZoneCount, DISTANCE_BINS, TOP_ZONE_COUNT,
};
use crate::columns;
use crate::exceptions::TripDashResult;
use crate::loader::{self, int_values, LoadOptions, ZoneLookup};
use crate::make_pipeline;
use crate::stages::derive::TripFeatures;
use crate::stages::filter::ViewFilter;
use crate::stages::quality::PlausibilityFilter;
use crate::stages::sample::sample_batches;

use arrow::array::Date32Array;
use arrow::datatypes::SchemaRef;
use chrono::NaiveDate;
use datafusion::arrow::datatypes::DataType;
use datafusion::datasource::MemTable;
use datafusion::functions_aggregate::expr_fn::{max, min};
use datafusion::logical_expr::{cast, col};
use datafusion::prelude::*;
use std::sync::Arc;

/// Name the prepared trip table is registered under in the session context.
const TRIP_TABLE: &str = "trips";

/// A loaded, derived, filtered, and sampled trip dataset, ready for interactive
/// filtering and aggregation.
pub struct TripSession {
    ctx: SessionContext,
    trips: DataFrame,
    zones: ZoneLookup,
    rows: usize,
}

impl TripSession {
    /// Runs the full ingest pipeline once and returns the session handle.
    ///
    /// Loading errors are terminal: if no trip or zone source resolves, or a
    /// remote fetch fails, nothing is computed over partial data.
    pub async fn load(opts: &LoadOptions) -> TripDashResult<Self> {
        let ctx = SessionContext::new();

        let raw = loader::load_trips(&ctx, opts).await?;
        let mut pipeline = make_pipeline!(
            ("derive_features", TripFeatures::new()),
            ("plausibility_bounds", PlausibilityFilter::new()),
        );
        let prepared = pipeline.fit_transform(&raw).await?;

        let schema: SchemaRef = Arc::new(prepared.schema().as_arrow().clone());
        let batches = prepared.collect().await?;
        let sampled = sample_batches(&schema, batches, opts.sample_cap, opts.sample_seed)?;
        let rows = sampled.num_rows();

        let table = MemTable::try_new(schema, vec![vec![sampled]])?;
        ctx.register_table(TRIP_TABLE, Arc::new(table))?;
        let trips = ctx.table(TRIP_TABLE).await?;

        let zones = ZoneLookup::from_dataframe(loader::load_zones(&ctx, opts).await?).await?;

        tracing::debug!(rows, zones = zones.len(), "trip session ready");
        Ok(Self {
            ctx,
            trips,
            zones,
            rows,
        })
    }

    /// The full sampled trip table.
    pub fn trips(&self) -> DataFrame {
        self.trips.clone()
    }

    /// The zone lookup.
    pub fn zones(&self) -> &ZoneLookup {
        &self.zones
    }

    /// Rows in the sampled trip table.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// The session's DataFusion context, for ad-hoc queries against the
    /// registered `trips` table.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// The current view: the sampled table with the user's filter applied.
    pub fn filtered(&self, filter: &ViewFilter) -> TripDashResult<DataFrame> {
        filter.apply(self.trips())
    }

    /// Scalar metrics over the current view.
    pub async fn metrics(&self, filter: &ViewFilter) -> TripDashResult<ViewMetrics> {
        aggregates::view_metrics(self.filtered(filter)?).await
    }

    /// The ten busiest pickup zones.
    pub async fn top_zones(&self) -> TripDashResult<Vec<ZoneCount>> {
        aggregates::top_pickup_zones(self.trips(), &self.zones, TOP_ZONE_COUNT).await
    }

    /// Mean fare per pickup hour.
    pub async fn fare_by_hour(&self) -> TripDashResult<Vec<HourlyFare>> {
        aggregates::avg_fare_by_hour(self.trips()).await
    }

    /// Trip-distance histogram.
    pub async fn distance_histogram(&self) -> TripDashResult<DistanceHistogram> {
        aggregates::distance_histogram(self.trips(), DISTANCE_BINS).await
    }

    /// Trips per payment-type code.
    pub async fn payment_breakdown(&self) -> TripDashResult<Vec<PaymentShare>> {
        aggregates::payment_breakdown(self.trips()).await
    }

    /// Trips per (weekday, hour) cell.
    pub async fn demand_matrix(&self) -> TripDashResult<aggregates::DemandMatrix> {
        aggregates::demand_matrix(self.trips()).await
    }

    /// All five aggregate views, computed concurrently. Safe because each view
    /// is a pure function of the immutable trip table.
    pub async fn dashboard(&self) -> TripDashResult<DashboardAggregates> {
        let (top_zones, fare_by_hour, distance_histogram, payment_breakdown, demand) =
            futures::try_join!(
                aggregates::top_pickup_zones(self.trips(), &self.zones, TOP_ZONE_COUNT),
                aggregates::avg_fare_by_hour(self.trips()),
                aggregates::distance_histogram(self.trips(), DISTANCE_BINS),
                aggregates::payment_breakdown(self.trips()),
                aggregates::demand_matrix(self.trips()),
            )?;
        Ok(DashboardAggregates {
            top_zones,
            fare_by_hour,
            distance_histogram,
            payment_breakdown,
            demand,
        })
    }

    /// Observed pickup-date range of the sampled table, for seeding the
    /// date-range widget. None when the table is empty.
    pub async fn pickup_date_range(&self) -> TripDashResult<Option<(NaiveDate, NaiveDate)>> {
        let bounds = self
            .trips()
            .aggregate(
                vec![],
                vec![
                    min(cast(col(columns::PICKUP_TS), DataType::Date32)).alias("min_date"),
                    max(cast(col(columns::PICKUP_TS), DataType::Date32)).alias("max_date"),
                ],
            )?
            .collect()
            .await?;

        let batch = match bounds.first() {
            Some(batch) if batch.num_rows() > 0 => batch,
            _ => return Ok(None),
        };
        let lo = date32_value(batch, "min_date")?;
        let hi = date32_value(batch, "max_date")?;
        Ok(lo.zip(hi))
    }

    /// Sorted distinct payment-type codes observed in the sampled table, for
    /// seeding the payment-type widget.
    pub async fn payment_codes(&self) -> TripDashResult<Vec<i64>> {
        let codes_df = self
            .trips()
            .aggregate(vec![col(columns::PAYMENT_TYPE)], vec![])?
            .sort(vec![col(columns::PAYMENT_TYPE).sort(true, false)])?;

        let mut codes = Vec::new();
        for batch in &codes_df.collect().await? {
            let idx = batch.schema().index_of(columns::PAYMENT_TYPE)?;
            codes.extend(int_values(batch.column(idx).as_ref(), columns::PAYMENT_TYPE)?);
        }
        Ok(codes)
    }
}

/// Reads a Date32 scalar out of a one-row aggregate batch.
fn date32_value(
    batch: &arrow::record_batch::RecordBatch,
    name: &str,
) -> TripDashResult<Option<NaiveDate>> {
    use arrow::array::Array;
    let idx = batch.schema().index_of(name)?;
    let array = batch
        .column(idx)
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| {
            crate::exceptions::TripDashError::InvalidParameter(format!(
                "Column '{}' must be Date32, but found {:?}",
                name,
                batch.column(idx).data_type()
            ))
        })?;
    if array.is_empty() || array.is_null(0) {
        return Ok(None);
    }
    Ok(Some(
        NaiveDate::default() + chrono::Duration::days(array.value(0) as i64),
    ))
}
