//! Marginal causal effect curves for observational tabular data.
//!
//! Given a treatment column, an outcome column and a set of confounders, this
//! library fits a model of `E[Y | X, Z]` and then sweeps the treatment over a
//! grid of candidate values. For every candidate the treatment column of a copy
//! of the data is overwritten, every row is scored, and the scores are averaged,
//! which integrates the confounders out over their empirical distribution.
//! Bootstrap resampling optionally attaches asymmetric 95% intervals to each
//! averaged prediction.
//!
//! # Example
//!
//! ```ignore
//! use polars::prelude::*;
//! use causal_frame::{PlotKind, VariableKind, ZPlotBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let df = df!(
//!         "dose" => &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0],
//!         "recovery" => &[1.0, 2.1, 2.9, 1.4, 2.6, 3.5, 0.8, 1.7, 2.8],
//!         "age" => &[30.0, 45.0, 50.0, 38.0, 61.0, 44.0, 25.0, 33.0, 58.0]
//!     )?;
//!
//!     let mut builder = ZPlotBuilder::new(df, "dose", "recovery");
//!     builder
//!         .confounders(&[("age", VariableKind::Continuous)])
//!         .kind(PlotKind::Mean)
//!         .bootstrap_samples(200);
//!     let chart = builder.run()?;
//!
//!     chart.summary();
//!     chart.render("recovery.png")?;
//!     Ok(())
//! }
//! ```
//!
//! ### Formula interface
//!
//! ```ignore
//! let builder = ZPlotBuilder::from_formula(df, "recovery ~ dose | age + C(ward)")?;
//! ```

use polars::prelude::*;
use std::sync::Arc;
use thiserror::Error;

pub mod bootstrap;
pub mod effect;
pub mod formula;
pub mod frame;
mod inference;
mod math;
pub mod model;
pub mod options;
pub mod plot;
pub mod selector;

pub use crate::bootstrap::{bootstrap_curve, IdentityResampler, Resampler, SampleWithReplacement};
pub use crate::effect::{
    estimate_curve, marginal_mean, sweep_values, EffectPoint, Sweep, CONTINUOUS_STEPS,
};
pub use crate::formula::Formula;
pub use crate::model::{ForestRegressor, KernelRegression, OlsRegressor, RegressionModel};
pub use crate::options::{
    ModelType, PlotKind, RenderOptions, VariableKind, VariableSpec, ZPlotOptions,
};
pub use crate::plot::{dispatch, Chart, RenderKind, Route};
pub use crate::selector::{select_and_fit, FittedModel, ModelChoice, ModelFactory, ModelSpec};

/// Error type for the `causal_frame` library.
#[derive(Error, Debug)]
pub enum CausalError {
    /// Wraps a `PolarsError`.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    /// A treatment, outcome or confounder column does not exist in the DataFrame.
    #[error("Column not found: {0}")]
    MissingColumn(String),
    /// A shape-locked model was asked to score a matrix of a different shape.
    #[error("Expected shape {expected:?}, received {received:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        received: (usize, usize),
    },
    /// A regression backend failed while fitting or predicting.
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
    /// `predict` was called before `fit`.
    #[error("Model is not fitted yet")]
    ModelNotFitted,
    /// An invalid parameter or parameter combination.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A linear algebra failure, such as a singular normal matrix.
    #[error("Linear algebra error: {0}")]
    Linalg(String),
    /// The chart could not be drawn.
    #[error("Plotting error: {0}")]
    Plotting(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for `causal_frame` operations.
pub type Result<T> = std::result::Result<T, CausalError>;

/// The main entry point for configuring and running a marginal-effect plot.
///
/// The builder owns a handle to the caller's DataFrame; every estimation step
/// works on clones of it, so the caller's data is never modified.
#[derive(Debug, Clone)]
pub struct ZPlotBuilder {
    dataframe: DataFrame,
    options: ZPlotOptions,
}

impl ZPlotBuilder {
    /// Creates a new `ZPlotBuilder`.
    ///
    /// # Arguments
    ///
    /// * `dataframe` - A `polars::DataFrame` containing the observational data.
    /// * `treatment` - The column whose effect is estimated (the `x` axis).
    /// * `outcome` - The column holding the outcome (the `y` axis).
    pub fn new(dataframe: DataFrame, treatment: &str, outcome: &str) -> Self {
        Self {
            dataframe,
            options: ZPlotOptions::new(treatment, outcome),
        }
    }

    /// Creates a new `ZPlotBuilder` from a formula such as
    /// `"recovery ~ dose | age + C(ward)"`.
    ///
    /// Terms after `|` are confounders; `C(..)` marks an unordered categorical
    /// confounder and `O(..)` an ordered one.
    pub fn from_formula(dataframe: DataFrame, formula: &str) -> Result<Self> {
        let parsed = Formula::parse(formula)?;
        let mut options = ZPlotOptions::new(&parsed.treatment, &parsed.outcome);
        options.z = parsed.confounders;
        Ok(Self { dataframe, options })
    }

    /// Creates a new `ZPlotBuilder` from a loose `key -> value` parameter map.
    ///
    /// See [`ZPlotOptions::from_params`] for the recognised keys.
    pub fn from_params(
        dataframe: DataFrame,
        params: &std::collections::BTreeMap<String, String>,
    ) -> Result<Self> {
        Ok(Self {
            dataframe,
            options: ZPlotOptions::from_params(params)?,
        })
    }

    /// Sets the confounders to control for, in column order.
    ///
    /// An empty list disables all causal logic and produces a plain plot.
    pub fn confounders(&mut self, confounders: &[(&str, VariableKind)]) -> &mut Self {
        self.options.z = confounders
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect();
        self
    }

    /// Sets the kind of chart to produce. Defaults to `PlotKind::Line`.
    pub fn kind(&mut self, kind: PlotKind) -> &mut Self {
        self.options.kind = kind;
        self
    }

    /// Sets a model class: a constructor fitted fresh on the data.
    pub fn model_class<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn RegressionModel> + 'static,
    {
        self.options.model.class = Some(Arc::new(factory));
        self
    }

    /// Sets an already-fitted model, used as-is.
    pub fn fit_model(&mut self, model: Arc<dyn RegressionModel>) -> &mut Self {
        self.options.model.fitted = Some(model);
        self
    }

    /// Selects one of the built-in backends.
    pub fn model_type(&mut self, model_type: ModelType) -> &mut Self {
        self.options.model.model_type = Some(model_type);
        self
    }

    /// Sets the number of bootstrap draws per treatment value.
    ///
    /// Only used by `PlotKind::Mean`; zero (the default) disables intervals.
    pub fn bootstrap_samples(&mut self, samples: usize) -> &mut Self {
        self.options.bootstrap_samples = samples;
        self
    }

    /// Overrides the treatment range of the continuous sweep.
    pub fn xlim(&mut self, min: f64, max: f64) -> &mut Self {
        self.options.xlim = Some((min, max));
        self
    }

    /// Seeds the bootstrap resampler.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.options.seed = Some(seed);
        self
    }

    /// Sets the chart title.
    pub fn title(&mut self, title: &str) -> &mut Self {
        self.options.render.title = Some(title.to_string());
        self
    }

    /// Replaces the options forwarded to the renderer.
    pub fn render_options(&mut self, render: RenderOptions) -> &mut Self {
        self.options.render = render;
        self
    }

    /// Applies a loose `key -> value` map on top of the current options.
    ///
    /// See [`ZPlotOptions::from_params`] for the recognised keys.
    pub fn params(&mut self, params: &std::collections::BTreeMap<String, String>) -> Result<&mut Self> {
        self.options.apply_params(params)?;
        Ok(self)
    }

    pub fn options(&self) -> &ZPlotOptions {
        &self.options
    }

    /// Estimates the chart described by this builder.
    pub fn run(&self) -> Result<Chart> {
        dispatch(&self.dataframe, self.options.clone())
    }
}
