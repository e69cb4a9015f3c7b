//! ## TripDash
//!
//! TripDash is the data preparation and aggregation core of a taxi trip-record
//! dashboard, built on Apache DataFusion. It loads a columnar trip file and a
//! zone lookup, derives time- and cost-based features in one vectorized pass,
//! drops implausible rows, deterministically samples the result to a bounded
//! working set, and serves interactive filtered views and aggregate tables to a
//! presentation layer.
//!
//! ### Overview
//!
//! The pipeline runs once per session, leaf to root:
//!
//! 1. [`loader`] reads the trip table and zone lookup from an ordered list of
//!    candidate sources (local paths, then an optional remote fetch).
//! 2. [`stages::derive`] appends `pickup_hour`, `pickup_day_of_week`,
//!    `trip_duration_minutes`, and `tip_pct`.
//! 3. [`stages::quality`] drops rows outside plausible fare/distance/duration
//!    bounds.
//! 4. [`stages::sample`] reduces the table to at most the configured cap with a
//!    seeded, reproducible selection.
//!
//! The result is owned by a [`session::TripSession`], whose methods apply the
//! user's [`stages::filter::ViewFilter`] and compute the [`aggregates`] views.
//!
//! ### Example
//!
//! ```rust,no_run
//! use tripdash::{LoadOptions, TripSession, ViewFilter};
//!
//! # async fn run() -> tripdash::TripDashResult<()> {
//! let session = TripSession::load(&LoadOptions::default()).await?;
//! let views = session.dashboard().await?;
//! let filter = ViewFilter::new(
//!     session.pickup_date_range().await?.expect("empty dataset"),
//!     (0, 23),
//!     session.payment_codes().await?,
//! );
//! let metrics = session.metrics(&filter).await?;
//! println!("{} trips, {:.2} average fare", metrics.total_trips, metrics.avg_fare);
//! # Ok(())
//! # }
//! ```

pub mod aggregates;
pub mod columns;
pub mod exceptions;
pub mod loader;
mod logging;
pub mod pipeline;
pub mod session;
pub mod stages;

pub use exceptions::{TripDashError, TripDashResult};
pub use loader::{LoadOptions, Source, ZoneLookup};
pub use session::TripSession;
pub use stages::filter::ViewFilter;
