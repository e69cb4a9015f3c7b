//! ## Interactive Filter
//!
//! This module implements the user-facing filter over the prepared trip table:
//! an inclusive pickup-date range, an inclusive pickup-hour range, and a set of
//! payment-type codes. The three predicates are conjunctive. An empty
//! payment-type set selects nothing at all (constant-false filter), not
//! everything.
//!
//! The filter compiles to a single DataFusion predicate and is re-applied lazily
//! to the whole table on every change; no incremental maintenance is kept.

use crate::columns;
use crate::exceptions::{TripDashError, TripDashResult};
use chrono::NaiveDate;
use datafusion::arrow::datatypes::DataType;
use datafusion::logical_expr::{cast, col, lit, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;

/// The user-selected view predicate: pickup-date range, pickup-hour range, and
/// payment-type set, all inclusive and conjunctive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFilter {
    pub date_range: (NaiveDate, NaiveDate),
    pub hour_range: (u8, u8),
    pub payment_types: Vec<i64>,
}

impl ViewFilter {
    pub fn new(
        date_range: (NaiveDate, NaiveDate),
        hour_range: (u8, u8),
        payment_types: Vec<i64>,
    ) -> Self {
        Self {
            date_range,
            hour_range,
            payment_types,
        }
    }

    /// Applies the filter to the trip table, returning the current view.
    pub fn apply(&self, df: DataFrame) -> TripDashResult<DataFrame> {
        // Nothing selected means no rows, regardless of the other predicates.
        if self.payment_types.is_empty() {
            return df.filter(lit(false)).map_err(TripDashError::DataFusionError);
        }

        let (date_lo, date_hi) = self.date_range;
        let date_pred = cast(col(columns::PICKUP_TS), DataType::Date32)
            .between(date_literal(date_lo), date_literal(date_hi));

        let (hour_lo, hour_hi) = self.hour_range;
        let hour_pred =
            col(columns::PICKUP_HOUR).between(lit(hour_lo as i32), lit(hour_hi as i32));

        let payment_pred = col(columns::PAYMENT_TYPE).in_list(
            self.payment_types.iter().map(|code| lit(*code)).collect(),
            false,
        );

        df.filter(date_pred.and(hour_pred).and(payment_pred))
            .map_err(TripDashError::DataFusionError)
    }
}

/// A calendar date as a Date32 literal.
fn date_literal(date: NaiveDate) -> Expr {
    let days = date
        .signed_duration_since(NaiveDate::default())
        .num_days() as i32;
    lit(ScalarValue::Date32(Some(days)))
}
