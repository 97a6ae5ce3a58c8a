//! Regression backends behind a uniform fit / predict contract.

use crate::Result;
use nalgebra::{DMatrix, DVector};

mod forest;
mod kernel;
mod ols;

pub use forest::ForestRegressor;
pub use kernel::KernelRegression;
pub use ols::OlsRegressor;

/// A regression model of the outcome on a numeric feature matrix.
///
/// Rows of the feature matrix are observations; columns follow the order
/// `[treatment] + confounders`.
pub trait RegressionModel {
    /// Short backend name used in logs and reports.
    fn name(&self) -> &str;

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()>;

    /// One prediction per row of `x`.
    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>>;
}
