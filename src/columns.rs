//! ## Column Names
//!
//! Names of the raw trip-record columns and of the columns derived from them.
//! The loader, the pipeline stages, and the aggregates all refer to the trip
//! table through these constants.

/// Pickup timestamp of the trip.
pub const PICKUP_TS: &str = "tpep_pickup_datetime";
/// Dropoff timestamp of the trip.
pub const DROPOFF_TS: &str = "tpep_dropoff_datetime";
/// Pickup location id, joined against the zone lookup.
pub const PICKUP_LOCATION: &str = "PULocationID";
/// Metered fare in dollars.
pub const FARE: &str = "fare_amount";
/// Tip in dollars.
pub const TIP: &str = "tip_amount";
/// Total charged amount in dollars.
pub const TOTAL: &str = "total_amount";
/// Trip distance in miles.
pub const DISTANCE: &str = "trip_distance";
/// Payment type code (integer).
pub const PAYMENT_TYPE: &str = "payment_type";

/// Derived: pickup hour of day, 0-23.
pub const PICKUP_HOUR: &str = "pickup_hour";
/// Derived: pickup day of week, Mon=1 .. Sun=7.
pub const PICKUP_WEEKDAY: &str = "pickup_day_of_week";
/// Derived: trip duration in minutes.
pub const DURATION_MIN: &str = "trip_duration_minutes";
/// Derived: tip as a percentage of the fare, 0 when the fare is not positive.
pub const TIP_PCT: &str = "tip_pct";

/// Columns the trip source file must provide. Validated by the loader before
/// any derivation runs.
pub const REQUIRED_TRIP_COLUMNS: [&str; 8] = [
    PICKUP_TS,
    DROPOFF_TS,
    PICKUP_LOCATION,
    FARE,
    TIP,
    TOTAL,
    DISTANCE,
    PAYMENT_TYPE,
];

/// Zone lookup: location id column.
pub const ZONE_LOCATION_ID: &str = "LocationID";
/// Zone lookup: zone name column.
pub const ZONE_NAME: &str = "Zone";
/// Zone lookup: borough column.
pub const ZONE_BOROUGH: &str = "Borough";
