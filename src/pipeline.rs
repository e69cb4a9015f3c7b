//! ## TripDash Pipeline
//!
//! This module provides the core abstractions for chaining the data preparation
//! stages that turn a raw trip table into the prepared one.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait defines a common interface for implementing data
//!   preparation steps, supporting both stateful (requiring fitting) and stateless
//!   transformations.
//! - The [`Pipeline`] struct chains multiple transformers into a cohesive data
//!   preparation pipeline, supporting both fitting and transforming operations.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] simplify the
//!   implementation of transformers and the creation of pipelines.
//!
//! Step timing and progress are reported through `tracing` at debug level.

use crate::exceptions::{TripDashError, TripDashResult};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::Instant;

/// Trait for components used in the data preparation pipeline.
///
/// Every transformer must provide a `fit` method (which may collect data to compute
/// parameters) and a `transform` method (which updates the DataFrame's logical plan
/// without triggering execution).
#[async_trait]
pub trait Transformer {
    /// Fit the transformer given a DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> TripDashResult<()>;

    /// Transform the input DataFrame, returning a new DataFrame with the
    /// transformation applied.
    fn transform(&self, df: DataFrame) -> TripDashResult<DataFrame>;

    /// Returns true if the transformer is stateful (i.e. requires a call to fit
    /// before transform can be called).
    fn is_stateful(&self) -> bool;
}

/// Macro to implement the [`Transformer`] trait for TripDash pipeline stages.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> TripDashResult<()>`
/// - `fn transform(&self, DataFrame) -> TripDashResult<DataFrame>`
/// - **`fn inherent_is_stateful(&self) -> bool`**
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TripDashResult<()> {
                <$ty>::fit(self, df).await
            }
            fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TripDashResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df)
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output (a new logical plan) is passed as input to the next
/// transformer. This design allows lazy chaining of transformations until a terminal
/// action (like `collect`) is called.
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>,
}

impl Pipeline {
    /// Creates a new pipeline from a vector of (name, transformer) pairs.
    pub fn new(steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>) -> Self {
        Self { steps }
    }

    /// Fits each transformer (sequentially) and updates the logical plan.
    pub async fn fit(&mut self, df: &DataFrame) -> TripDashResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TripDashError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let start = Instant::now();
            step.fit(&current_df).await.map_err(|e| {
                TripDashError::InvalidParameter(format!(
                    "Error fitting transformer '{}': {:?}",
                    name, e
                ))
            })?;
            current_df = step.transform(current_df).map_err(|e| {
                TripDashError::InvalidParameter(format!(
                    "Error transforming in '{}': {:?}",
                    name, e
                ))
            })?;
            tracing::debug!(step = %name, elapsed = ?start.elapsed(), "pipeline step fitted");
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer (without fitting).
    pub fn transform(&self, df: DataFrame) -> TripDashResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TripDashError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            current_df = step.transform(current_df).map_err(|e| {
                TripDashError::InvalidParameter(format!(
                    "Error in transformer '{}': {:?}",
                    name, e
                ))
            })?;
        }
        Ok(current_df)
    }

    /// Convenience method to call `fit` and then return the final transformed DataFrame.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> TripDashResult<DataFrame> {
        self.fit(df).await
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use tripdash::make_pipeline;
/// use tripdash::stages::derive::TripFeatures;
///
/// let pipeline = make_pipeline!(
///     ("derive_features", TripFeatures::new()),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, Box<dyn $crate::pipeline::Transformer + Send + Sync>)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps)
        }
    };
}
