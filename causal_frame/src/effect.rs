//! Marginal effect curves.
//!
//! For a candidate treatment value `xi`, the treatment column of a copy of the
//! data is set to `xi` on every row, every row is scored by the fitted model,
//! and the scores are averaged. The confounders keep their observed values, so
//! the average integrates them out over their empirical distribution.

use crate::frame::{observed_values, with_treatment};
use crate::selector::FittedModel;
use crate::{CausalError, Result};
use getset::CopyGetters;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Number of grid points in a continuous sweep.
pub const CONTINUOUS_STEPS: usize = 100;

/// Default percentile bounds of the continuous sweep.
const DEFAULT_RANGE: (f64, f64) = (0.01, 0.99);

/// One point of an effect curve.
#[derive(Debug, Clone, PartialEq, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct EffectPoint {
    /// The treatment value every row was set to.
    treatment: f64,
    /// Average prediction with the treatment clamped.
    expected: f64,
    /// Distance from `expected` down to the lower bound, if bootstrapped.
    lower_delta: Option<f64>,
    /// Distance from `expected` up to the upper bound, if bootstrapped.
    upper_delta: Option<f64>,
}

impl EffectPoint {
    pub fn new(treatment: f64, expected: f64) -> Self {
        Self {
            treatment,
            expected,
            lower_delta: None,
            upper_delta: None,
        }
    }

    pub fn with_interval(treatment: f64, expected: f64, lower_delta: f64, upper_delta: f64) -> Self {
        Self {
            treatment,
            expected,
            lower_delta: Some(lower_delta),
            upper_delta: Some(upper_delta),
        }
    }

    /// `(expected - lower_delta, expected + upper_delta)` when bootstrapped.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.lower_delta, self.upper_delta) {
            (Some(lo), Some(hi)) => Some((self.expected - lo, self.expected + hi)),
            _ => None,
        }
    }
}

/// How treatment values are swept.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Sweep {
    /// Evenly spaced grid over `xlim`, or over the 1st to 99th percentile
    /// of the treatment when `xlim` is `None`.
    Continuous { xlim: Option<(f64, f64)> },
    /// Distinct observed treatment values in order of first occurrence.
    #[default]
    Discrete,
}

/// `steps` evenly spaced values starting at `min`, stopping short of `max`.
fn continuous_grid(min: f64, max: f64, steps: usize) -> Result<Vec<f64>> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(CausalError::InvalidParameter(format!(
            "Treatment range must satisfy min < max, got ({}, {})",
            min, max
        )));
    }
    let step = (max - min) / steps as f64;
    let grid: Vec<f64> = (0..steps).map(|i| min + i as f64 * step).collect();
    // Ranges too narrow for their magnitude round to repeated points.
    if grid.windows(2).any(|w| w[0] >= w[1]) || grid.last().is_some_and(|v| *v >= max) {
        return Err(CausalError::InvalidParameter(format!(
            "Treatment range ({}, {}) is too narrow for {} distinct steps",
            min, max, steps
        )));
    }
    Ok(grid)
}

fn percentile(values: &Float64Chunked, q: f64) -> Result<f64> {
    Ok(values
        .quantile(q, QuantileMethod::Linear)?
        .unwrap_or(f64::NAN))
}

/// The treatment values visited by `sweep`, in sweep order.
pub fn sweep_values(df: &DataFrame, treatment: &str, sweep: Sweep) -> Result<Vec<f64>> {
    let observed = observed_values(df, treatment)?;
    if observed.is_empty() {
        return Err(CausalError::InvalidParameter(format!(
            "Treatment column '{}' has no values to sweep",
            treatment
        )));
    }

    match sweep {
        Sweep::Discrete => {
            let distinct = observed.into_series().unique_stable()?;
            Ok(distinct.f64()?.into_no_null_iter().collect())
        }
        Sweep::Continuous { xlim } => {
            let (min, max) = match xlim {
                Some(range) => range,
                None => (
                    percentile(&observed, DEFAULT_RANGE.0)?,
                    percentile(&observed, DEFAULT_RANGE.1)?,
                ),
            };
            continuous_grid(min, max, CONTINUOUS_STEPS)
        }
    }
}

/// Average prediction over all rows of `df` with the treatment set to `value`.
pub fn marginal_mean(df: &DataFrame, model: &FittedModel, treatment: &str, value: f64) -> Result<f64> {
    let clamped = with_treatment(df, treatment, value)?;
    model.mean_prediction(&clamped)
}

/// Marginal effect curve over `sweep`. Points have no interval.
pub fn estimate_curve(
    df: &DataFrame,
    model: &FittedModel,
    treatment: &str,
    sweep: Sweep,
) -> Result<Vec<EffectPoint>> {
    sweep_values(df, treatment, sweep)?
        .into_iter()
        .map(|xi| {
            let expected = marginal_mean(df, model, treatment, xi)?;
            debug!(treatment = xi, expected, "Marginal effect point");
            Ok(EffectPoint::new(xi, expected))
        })
        .collect()
}
