//! ## Custom Errors for TripDash
//!
//! This module defines custom error types for the TripDash library.
//! It uses the `thiserror` crate to derive the `Error` trait for custom error types.
//! The `TripDashError` enum includes variants representing different error scenarios
//! encountered throughout the library, making error handling straightforward and clear.
//!
//! Loading errors (`DataNotFound`, `RemoteFetch`) are terminal: nothing downstream is
//! computed over partial data. Empty filter or aggregate results are not errors; they
//! surface as empty tables so a consumer can render a "no data" state.
//!
//! The `TripDashResult` type alias simplifies error handling by providing a convenient
//! alias for results returned by the library.

use thiserror::Error;

/// Errors specific to the TripDash library.
#[derive(Debug, Error)]
pub enum TripDashError {
    /// Wraps underlying I/O errors.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Wraps errors from Parquet.
    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    /// Wraps transport-level errors from the HTTP client.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Indicates that no candidate source for a table resolved. The message lists
    /// every candidate that was tried.
    #[error("no source found for {what} (tried: {tried})")]
    DataNotFound { what: String, tried: String },

    /// Indicates that fetching a remote source failed (bad status, timeout).
    #[error("remote fetch failed: {0}")]
    RemoteFetch(String),

    /// Indicates that the provided data format is unsupported (e.g., unknown file extension).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Indicates that an invalid parameter was provided (e.g., unsupported value or incorrect data type).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),
}

/// A convenient result type for TripDash operations.
pub type TripDashResult<T> = std::result::Result<T, TripDashError>;
