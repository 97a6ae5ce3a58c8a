use super::RegressionModel;
use crate::math::ols::ols;
use crate::{CausalError, Result};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Linear regression with an intercept, fitted by OLS.
///
/// Handy as a model class: `builder.model_class(|| Box::new(OlsRegressor::new()))`.
#[derive(Debug, Clone, Default)]
pub struct OlsRegressor {
    coefficients: Option<DVector<f64>>,
}

impl OlsRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intercept followed by one slope per feature column.
    pub fn coefficients(&self) -> Option<&DVector<f64>> {
        self.coefficients.as_ref()
    }
}

fn with_intercept(x: &DMatrix<f64>) -> DMatrix<f64> {
    x.clone().insert_column(0, 1.0)
}

impl RegressionModel for OlsRegressor {
    fn name(&self) -> &str {
        "ols"
    }

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
        let result = ols(y, &with_intercept(x))?;
        let rmse = (result.residuals.norm_squared() / y.len() as f64).sqrt();
        debug!(rmse, "Fitted OLS regressor");
        self.coefficients = Some(result.coefficients);
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>> {
        let beta = self.coefficients.as_ref().ok_or(CausalError::ModelNotFitted)?;
        if x.ncols() + 1 != beta.len() {
            return Err(CausalError::InvalidParameter(format!(
                "OLS model was fit on {} feature columns, received {}",
                beta.len() - 1,
                x.ncols()
            )));
        }
        Ok(with_intercept(x) * beta)
    }
}
