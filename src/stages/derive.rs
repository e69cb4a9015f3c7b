//! ## Feature Deriver
//!
//! This module implements the stage that extends raw trip records with the
//! derived columns the rest of the pipeline works on:
//!
//! - `pickup_hour`: hour of day of the pickup timestamp (0-23);
//! - `pickup_day_of_week`: ISO weekday of the pickup timestamp (Mon=1 .. Sun=7);
//! - `trip_duration_minutes`: dropoff minus pickup, in minutes;
//! - `tip_pct`: tip as a percentage of the fare, defined as 0 whenever the fare
//!   is not positive so no infinities propagate into aggregates.
//!
//! All four columns are appended in a single column-wise `select` over the
//! logical plan; nothing is computed row by row.
//! Errors are returned as `TripDashError` and results are wrapped in `TripDashResult`.

use crate::columns;
use crate::exceptions::{TripDashError, TripDashResult};
use datafusion::arrow::datatypes::DataType;
use datafusion::logical_expr::{cast, col, lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion_functions::datetime::{date_part, to_unixtime};

/// Validates that a column exists and is of a datetime type (Timestamp, Date32, or Date64).
fn validate_datetime_column(df: &DataFrame, col_name: &str) -> TripDashResult<()> {
    let field = df.schema().field_with_name(None, col_name).map_err(|_| {
        TripDashError::MissingColumn(format!("Column '{}' not found", col_name))
    })?;
    match field.data_type() {
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => Ok(()),
        dt => Err(TripDashError::InvalidParameter(format!(
            "Column '{}' must be a datetime type (Timestamp, Date32, or Date64), but found {:?}",
            col_name, dt
        ))),
    }
}

/// Validates that a column exists and is numeric.
fn validate_numeric_column(df: &DataFrame, col_name: &str) -> TripDashResult<()> {
    let field = df.schema().field_with_name(None, col_name).map_err(|_| {
        TripDashError::MissingColumn(format!("Column '{}' not found", col_name))
    })?;
    if field.data_type().is_numeric() {
        Ok(())
    } else {
        Err(TripDashError::InvalidParameter(format!(
            "Column '{}' must be numeric, but found {:?}",
            col_name,
            field.data_type()
        )))
    }
}

/// Appends the derived trip columns to the raw trip table.
pub struct TripFeatures;

impl TripFeatures {
    pub fn new() -> Self {
        Self
    }

    /// Validates that the timestamp and amount columns exist with usable types.
    pub async fn fit(&mut self, df: &DataFrame) -> TripDashResult<()> {
        validate_datetime_column(df, columns::PICKUP_TS)?;
        validate_datetime_column(df, columns::DROPOFF_TS)?;
        for col_name in [columns::FARE, columns::TIP, columns::DISTANCE] {
            validate_numeric_column(df, col_name)?;
        }
        Ok(())
    }

    /// Returns a new DataFrame with the original columns plus `pickup_hour`,
    /// `pickup_day_of_week`, `trip_duration_minutes`, and `tip_pct`.
    pub fn transform(&self, df: DataFrame) -> TripDashResult<DataFrame> {
        // Retain all original columns.
        let mut exprs: Vec<Expr> = df.schema().fields().iter().map(|f| col(f.name())).collect();

        let pickup = col(columns::PICKUP_TS);

        let hour_expr = cast(
            date_part().call(vec![lit("hour"), pickup.clone()]),
            DataType::Int32,
        )
        .alias(columns::PICKUP_HOUR);

        // date_part('dow') counts Sun=0 .. Sat=6; shift to Mon=1 .. Sun=7.
        let dow = cast(
            date_part().call(vec![lit("dow"), pickup.clone()]),
            DataType::Int32,
        );
        let weekday_expr = (((dow + lit(6)) % lit(7)) + lit(1)).alias(columns::PICKUP_WEEKDAY);

        let duration_expr = ((to_unixtime().call(vec![col(columns::DROPOFF_TS)])
            - to_unixtime().call(vec![col(columns::PICKUP_TS)]))
            / lit(60.0))
        .alias(columns::DURATION_MIN);

        let tip_pct_expr = Expr::Case(DFCase {
            expr: None,
            when_then_expr: vec![(
                Box::new(col(columns::FARE).gt(lit(0.0))),
                Box::new(col(columns::TIP) / col(columns::FARE) * lit(100.0)),
            )],
            else_expr: Some(Box::new(lit(0.0))),
        })
        .alias(columns::TIP_PCT);

        exprs.push(hour_expr);
        exprs.push(weekday_expr);
        exprs.push(duration_expr);
        exprs.push(tip_pct_expr);

        df.select(exprs).map_err(TripDashError::DataFusionError)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        false
    }
}

crate::impl_transformer!(TripFeatures);
