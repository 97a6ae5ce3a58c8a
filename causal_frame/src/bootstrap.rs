//! Bootstrap intervals for marginal means.
//!
//! The model is fitted once on the working data. Each draw resamples the rows
//! with replacement, clamps the treatment and averages the predictions of that
//! same model, so the interval reflects the sampling variability of the
//! confounder distribution.

use crate::effect::{marginal_mean, sweep_values, EffectPoint, Sweep};
use crate::inference::bootstrap_interval;
use crate::selector::FittedModel;
use crate::{CausalError, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Produces same-size copies of a dataset for one bootstrap draw.
pub trait Resampler {
    fn resample(&mut self, df: &DataFrame) -> Result<DataFrame>;
}

/// Rows drawn uniformly with replacement.
///
/// With a seed, the sequence of resamples is reproducible: every draw gets
/// its own seed from a `StdRng` seeded once.
#[derive(Debug)]
pub struct SampleWithReplacement {
    rng: Option<StdRng>,
}

impl SampleWithReplacement {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map(StdRng::seed_from_u64),
        }
    }
}

impl Resampler for SampleWithReplacement {
    fn resample(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let seed = self.rng.as_mut().map(|rng| rng.gen::<u64>());
        Ok(df.sample_n_literal(df.height(), true, false, seed)?)
    }
}

/// Returns the dataset unchanged. Every draw then equals the plain marginal mean.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResampler;

impl Resampler for IdentityResampler {
    fn resample(&mut self, df: &DataFrame) -> Result<DataFrame> {
        Ok(df.clone())
    }
}

/// Bootstrapped marginal means over the distinct treatment values of `df`.
///
/// For each value, `samples` resamples are averaged under the clamped
/// treatment. The point estimate is the mean of those draws; the deltas reach
/// the 2.5th and 97.5th percentiles.
pub fn bootstrap_curve(
    df: &DataFrame,
    model: &FittedModel,
    treatment: &str,
    samples: usize,
    resampler: &mut dyn Resampler,
) -> Result<Vec<EffectPoint>> {
    if samples == 0 {
        return Err(CausalError::InvalidParameter(
            "bootstrap_samples must be positive".to_string(),
        ));
    }

    let mut points = Vec::new();
    for xi in sweep_values(df, treatment, Sweep::Discrete)? {
        let draws = (0..samples)
            .map(|_| {
                let sample = resampler.resample(df)?;
                marginal_mean(&sample, model, treatment, xi)
            })
            .collect::<Result<Vec<f64>>>()?;

        let (expected, (lower_delta, upper_delta)) = bootstrap_interval(&draws);
        debug!(
            treatment = xi,
            expected,
            lower_delta,
            upper_delta,
            draws = samples,
            "Bootstrapped marginal mean"
        );
        points.push(EffectPoint::with_interval(xi, expected, lower_delta, upper_delta));
    }
    Ok(points)
}
