//! ## Schema Loader
//!
//! This module loads the raw trip table and the zone lookup into DataFusion.
//!
//! Each table is described by an ordered list of candidate [`Source`]s which are
//! tried in sequence: local files first, then (optionally) a remote URL that is
//! fetched to a local cache file. The first candidate that resolves wins. Only
//! after every candidate has been exhausted does loading fail, with a single
//! terminal [`TripDashError::DataNotFound`] listing everything that was tried.
//! A failed remote fetch is fatal on its own ([`TripDashError::RemoteFetch`]):
//! a network error must fail the whole load rather than degrade into an empty
//! dataset.
//!
//! File format is dispatched on extension (`.parquet` or `.csv`). After reading
//! the trip table, the loader validates that every required column is present.

use crate::columns;
use crate::exceptions::{TripDashError, TripDashResult};
use datafusion::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Int32Array, Int64Array, StringArray};

/// One candidate location for a table.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// A remote file, downloaded once to `cache_as` and read from there.
    Remote { url: String, cache_as: PathBuf },
}

/// Configuration for one dashboard session: where to look for the input tables
/// and how to bound the working set.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Candidate sources for the trip table, tried in order.
    pub trip_sources: Vec<Source>,
    /// Candidate sources for the zone lookup, tried in order.
    pub zone_sources: Vec<Source>,
    /// Maximum number of rows kept after quality filtering.
    pub sample_cap: usize,
    /// Seed for the deterministic sampler.
    pub sample_seed: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            trip_sources: vec![
                Source::Local("data/cleaned_trips.parquet".into()),
                Source::Local("dashboard/cleaned_trips.parquet".into()),
            ],
            zone_sources: vec![
                Source::Local("data/taxi_zone_lookup.csv".into()),
                Source::Local("dashboard/taxi_zone_lookup.csv".into()),
            ],
            sample_cap: 100_000,
            sample_seed: 42,
        }
    }
}

/// Loads the raw trip table and validates its schema.
pub async fn load_trips(ctx: &SessionContext, opts: &LoadOptions) -> TripDashResult<DataFrame> {
    let df = load_table(ctx, "trip data", &opts.trip_sources).await?;
    ensure_columns(&df, &columns::REQUIRED_TRIP_COLUMNS)?;
    Ok(df)
}

/// Loads the zone lookup table.
pub async fn load_zones(ctx: &SessionContext, opts: &LoadOptions) -> TripDashResult<DataFrame> {
    let df = load_table(ctx, "zone lookup", &opts.zone_sources).await?;
    ensure_columns(&df, &[columns::ZONE_LOCATION_ID, columns::ZONE_NAME])?;
    Ok(df)
}

/// Tries each source in order and reads the first one that resolves.
async fn load_table(
    ctx: &SessionContext,
    what: &str,
    sources: &[Source],
) -> TripDashResult<DataFrame> {
    let mut tried = Vec::new();
    for source in sources {
        match source {
            Source::Local(path) => {
                if !path.exists() {
                    tried.push(format!("{}: not found", path.display()));
                    continue;
                }
                tracing::debug!(path = %path.display(), what, "reading local source");
                return read_file(ctx, path).await;
            }
            Source::Remote { url, cache_as } => {
                fetch_remote(url, cache_as).await?;
                return read_file(ctx, cache_as).await;
            }
        }
    }
    Err(TripDashError::DataNotFound {
        what: what.to_string(),
        tried: tried.join(", "),
    })
}

/// Reads a file into a DataFrame, dispatching on its extension.
async fn read_file(ctx: &SessionContext, path: &Path) -> TripDashResult<DataFrame> {
    let path_str = path.to_str().ok_or_else(|| {
        TripDashError::InvalidParameter(format!("non-UTF-8 path: {}", path.display()))
    })?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" => Ok(ctx
            .read_parquet(path_str, ParquetReadOptions::default())
            .await?),
        "csv" => Ok(ctx.read_csv(path_str, CsvReadOptions::new()).await?),
        other => Err(TripDashError::UnsupportedFormat(format!(
            "'.{}' ({}); expected .parquet or .csv",
            other,
            path.display()
        ))),
    }
}

/// Downloads a remote source to its cache file. One-shot: any transport error or
/// non-success status aborts the load.
async fn fetch_remote(url: &str, cache_as: &Path) -> TripDashResult<()> {
    tracing::debug!(url, cache = %cache_as.display(), "fetching remote source");
    let response = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| TripDashError::RemoteFetch(format!("GET {}: {}", url, e)))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| TripDashError::RemoteFetch(format!("GET {}: {}", url, e)))?;
    if let Some(parent) = cache_as.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(cache_as, &bytes)?;
    Ok(())
}

/// Validates that every named column exists in the DataFrame.
fn ensure_columns(df: &DataFrame, required: &[&str]) -> TripDashResult<()> {
    for name in required {
        df.schema().field_with_name(None, name).map_err(|_| {
            TripDashError::MissingColumn(format!("Column '{}' not found", name))
        })?;
    }
    Ok(())
}

/// One zone from the lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: String,
    pub borough: String,
}

/// Read-only mapping from pickup location id to zone, loaded once per session
/// and never filtered.
#[derive(Debug, Clone, Default)]
pub struct ZoneLookup {
    zones: HashMap<i64, Zone>,
}

impl ZoneLookup {
    /// Materializes the lookup from the loaded zone DataFrame.
    pub async fn from_dataframe(df: DataFrame) -> TripDashResult<Self> {
        let batches = df.collect().await?;
        let mut zones = HashMap::new();
        for batch in &batches {
            let id_idx = batch.schema().index_of(columns::ZONE_LOCATION_ID)?;
            let name_idx = batch.schema().index_of(columns::ZONE_NAME)?;
            let borough_idx = batch.schema().index_of(columns::ZONE_BOROUGH).ok();
            let ids = int_values(batch.column(id_idx), columns::ZONE_LOCATION_ID)?;
            let names = batch
                .column(name_idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    TripDashError::InvalidParameter(format!(
                        "Column '{}' must be a string column",
                        columns::ZONE_NAME
                    ))
                })?;
            let boroughs = borough_idx.and_then(|i| {
                batch.column(i).as_any().downcast_ref::<StringArray>().cloned()
            });
            for row in 0..batch.num_rows() {
                if names.is_null(row) {
                    continue;
                }
                let borough = boroughs
                    .as_ref()
                    .filter(|b| !b.is_null(row))
                    .map(|b| b.value(row).to_string())
                    .unwrap_or_default();
                zones.insert(
                    ids[row],
                    Zone {
                        name: names.value(row).to_string(),
                        borough,
                    },
                );
            }
        }
        Ok(Self { zones })
    }

    /// Zone name for a location id, if the lookup knows it.
    pub fn zone_name(&self, location_id: i64) -> Option<&str> {
        self.zones.get(&location_id).map(|z| z.name.as_str())
    }

    /// Full zone record for a location id.
    pub fn zone(&self, location_id: i64) -> Option<&Zone> {
        self.zones.get(&location_id)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Extracts an integer column as i64 values, accepting Int64 or Int32 storage.
pub(crate) fn int_values(
    array: &dyn arrow::array::Array,
    name: &str,
) -> TripDashResult<Vec<i64>> {
    if let Some(arr) = array.as_any().downcast_ref::<Int64Array>() {
        Ok((0..arr.len()).map(|i| arr.value(i)).collect())
    } else if let Some(arr) = array.as_any().downcast_ref::<Int32Array>() {
        Ok((0..arr.len()).map(|i| arr.value(i) as i64).collect())
    } else {
        Err(TripDashError::InvalidParameter(format!(
            "Column '{}' must be an integer column, but found {:?}",
            name,
            array.data_type()
        )))
    }
}
