//! ## Deterministic Sampler
//!
//! This module reduces the materialized, quality-filtered trip table to a bounded
//! working set. The selection is a seeded partial Fisher-Yates shuffle over the
//! row-index vector, so repeated runs over the same input produce byte-identical
//! samples:
//!
//! 1. concatenate the record batches into one batch of `n` rows;
//! 2. if `n <= cap`, return the batch unchanged (same rows, same order);
//! 3. otherwise draw `swap(i, gen_range(i..n))` for `i in 0..cap` from
//!    `StdRng::seed_from_u64(seed)`, keep the first `cap` indices, sort them
//!    ascending, and `take` those rows.
//!
//! The ascending reorder keeps the sample in the input's relative row order.
//! Sampling semantics are fixed-count, not fixed-probability: the output always
//! has exactly `min(cap, n)` rows.

use crate::exceptions::TripDashResult;
use arrow::array::UInt64Array;
use arrow::compute;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reduces `batches` to at most `cap` rows using a seeded deterministic selection.
pub fn sample_batches(
    schema: &SchemaRef,
    batches: Vec<RecordBatch>,
    cap: usize,
    seed: u64,
) -> TripDashResult<RecordBatch> {
    let batch = compute::concat_batches(schema, batches.iter())?;
    let n = batch.num_rows();
    if n <= cap {
        return Ok(batch);
    }

    let selected = select_indices(n, cap, seed);
    tracing::debug!(rows = n, cap, seed, "sampling trip table");

    let indices = UInt64Array::from(selected);
    let columns = batch
        .columns()
        .iter()
        .map(|c| compute::take(c.as_ref(), &indices, None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

/// Picks `cap` distinct row indices out of `0..n`, sorted ascending.
fn select_indices(n: usize, cap: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<u64> = (0..n as u64).collect();
    for i in 0..cap {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    let mut selected = indices[..cap].to_vec();
    selected.sort_unstable();
    selected
}

#[cfg(test)]
mod tests {
    use super::select_indices;

    #[test]
    fn test_select_indices_is_deterministic() {
        let a = select_indices(1000, 100, 42);
        let b = select_indices(1000, 100, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_select_indices_are_distinct_and_sorted() {
        let selected = select_indices(500, 250, 7);
        assert_eq!(selected.len(), 250);
        assert!(selected.windows(2).all(|w| w[0] < w[1]));
        assert!(selected.iter().all(|&i| i < 500));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = select_indices(1000, 100, 1);
        let b = select_indices(1000, 100, 2);
        assert_ne!(a, b);
    }
}
