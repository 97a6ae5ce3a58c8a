use super::RegressionModel;
use crate::math::local_linear::LocalLinear;
use crate::options::VariableKind;
use crate::{CausalError, Result};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Adapter for the local-linear kernel estimator.
///
/// The estimator has no separate parameter-fitting step: every prediction
/// re-estimates locally around each requested point using the training data.
/// The adapter records the training shape and only scores matrices of exactly
/// that shape, rows included. That makes the backend usable only on
/// resamples or clamped copies of the training data, which is surprising but
/// kept as the contract.
#[derive(Debug, Clone, Default)]
pub struct KernelRegression {
    fit_shape: Option<(usize, usize)>,
    type_string: String,
    estimator: Option<LocalLinear>,
}

impl KernelRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fits with per-column variable kinds, in column order. Without kinds
    /// every column is continuous.
    pub fn fit_with_kinds(
        &mut self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        kinds: Option<&[VariableKind]>,
    ) -> Result<&mut Self> {
        let kinds = match kinds {
            Some(kinds) => kinds.to_vec(),
            None => vec![VariableKind::Continuous; x.ncols()],
        };
        let estimator = LocalLinear::new(x, y, &kinds)?;
        debug!(bandwidths = ?estimator.bandwidths(), "Selected kernel bandwidths");

        self.fit_shape = Some(x.shape());
        self.type_string = kinds.iter().map(|k| k.type_char()).collect();
        self.estimator = Some(estimator);
        Ok(self)
    }

    /// Per-column kernel codes (`c`, `u`, `o`) used at fit time.
    pub fn type_string(&self) -> &str {
        &self.type_string
    }

    pub fn fit_shape(&self) -> Option<(usize, usize)> {
        self.fit_shape
    }
}

impl RegressionModel for KernelRegression {
    fn name(&self) -> &str {
        "kernel"
    }

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
        self.fit_with_kinds(x, y, None)?;
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>> {
        let (estimator, expected) = match (&self.estimator, self.fit_shape) {
            (Some(estimator), Some(shape)) => (estimator, shape),
            _ => return Err(CausalError::ModelNotFitted),
        };
        if x.shape() != expected {
            return Err(CausalError::ShapeMismatch {
                expected,
                received: x.shape(),
            });
        }
        estimator.evaluate(x)
    }
}
