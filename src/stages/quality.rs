//! ## Quality Filter
//!
//! This module implements the stage that drops trip records outside plausible
//! physical and economic bounds. The bounds are exclusive on both ends:
//!
//! - `0 < fare_amount < 200`
//! - `0 < trip_distance < 50`
//! - `1 < trip_duration_minutes < 180`
//!
//! The three bound predicates are combined into a single conjunctive filter, so a
//! row either satisfies all of them or is dropped; a NULL in any bounded column
//! fails the predicate and drops the row. The stage runs after derivation (it
//! filters on the derived duration) and before sampling, so the sampler only ever
//! sees plausible rows.
//! Errors are returned as `TripDashError` and results are wrapped in `TripDashResult`.

use crate::columns;
use crate::exceptions::{TripDashError, TripDashResult};
use datafusion::logical_expr::{col, lit, Expr};
use datafusion::prelude::*;

/// Builds the exclusive-bounds predicate `lower < col < upper`.
fn within(col_name: &str, (lower, upper): (f64, f64)) -> Expr {
    col(col_name)
        .gt(lit(lower))
        .and(col(col_name).lt(lit(upper)))
}

/// Drops rows that fall outside the plausible trip bounds.
pub struct PlausibilityFilter {
    pub fare_bounds: (f64, f64),
    pub distance_bounds: (f64, f64),
    pub duration_bounds: (f64, f64),
}

impl PlausibilityFilter {
    /// Creates the filter with the standard bounds.
    pub fn new() -> Self {
        Self {
            fare_bounds: (0.0, 200.0),
            distance_bounds: (0.0, 50.0),
            duration_bounds: (1.0, 180.0),
        }
    }

    /// Validates that the bounded columns exist and that each bound pair is ordered.
    pub async fn fit(&mut self, df: &DataFrame) -> TripDashResult<()> {
        for (col_name, (lower, upper)) in [
            (columns::FARE, self.fare_bounds),
            (columns::DISTANCE, self.distance_bounds),
            (columns::DURATION_MIN, self.duration_bounds),
        ] {
            df.schema().field_with_name(None, col_name).map_err(|_| {
                TripDashError::MissingColumn(format!("Column '{}' not found", col_name))
            })?;
            if lower >= upper {
                return Err(TripDashError::InvalidParameter(format!(
                    "For column '{}', lower bound {} is not less than upper bound {}",
                    col_name, lower, upper
                )));
            }
        }
        Ok(())
    }

    /// Returns a new DataFrame with rows outside any bound dropped.
    pub fn transform(&self, df: DataFrame) -> TripDashResult<DataFrame> {
        let predicate = within(columns::FARE, self.fare_bounds)
            .and(within(columns::DISTANCE, self.distance_bounds))
            .and(within(columns::DURATION_MIN, self.duration_bounds));
        df.filter(predicate).map_err(TripDashError::DataFusionError)
    }

    pub fn inherent_is_stateful(&self) -> bool {
        false
    }
}

crate::impl_transformer!(PlausibilityFilter);
