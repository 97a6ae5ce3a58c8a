use crate::CausalError;
use nalgebra::{DMatrix, DVector};

/// Coefficients and in-sample residuals of a least squares fit.
#[derive(Debug, Clone)]
pub struct OlsResult {
    pub coefficients: DVector<f64>,
    pub residuals: DVector<f64>,
}

/// Builds the (weighted) normal equations `X'WX` and `X'Wy`.
///
/// Rows are scaled by `sqrt(w)` so the diagonal weight matrix is never
/// materialised. Without weights this is plain `X'X` and `X'y`.
pub fn normal_equations(
    y: &DVector<f64>,
    x: &DMatrix<f64>,
    weights: Option<&DVector<f64>>,
) -> (DMatrix<f64>, DVector<f64>) {
    if let Some(w) = weights {
        let w_sqrt = w.map(|v| v.sqrt());

        let mut x_w = x.clone();
        for j in 0..x.ncols() {
            let mut col = x_w.column_mut(j);
            col.component_mul_assign(&w_sqrt);
        }
        let y_w = y.component_mul(&w_sqrt);

        (x_w.transpose() * &x_w, x_w.transpose() * &y_w)
    } else {
        (x.transpose() * x, x.transpose() * y)
    }
}

/// Least squares fit of `y` on the columns of `x`, solving `X'X b = X'y`
/// through a Cholesky factorisation.
///
/// `x` must carry its own column of ones when an intercept is wanted. Fails
/// with `CausalError::Linalg` when `X'X` is not positive definite.
pub fn ols(y: &DVector<f64>, x: &DMatrix<f64>) -> Result<OlsResult, CausalError> {
    let (xtx, xty) = normal_equations(y, x, None);

    // X'X is positive definite unless there is perfect multicollinearity.
    let cholesky = xtx.cholesky().ok_or_else(|| {
        CausalError::Linalg(
            "Failed to perform Cholesky decomposition. Matrix may be singular or not positive definite due to multicollinearity.".to_string(),
        )
    })?;

    let coefficients = cholesky.solve(&xty);
    let residuals = y - x * &coefficients;

    Ok(OlsResult {
        coefficients,
        residuals,
    })
}
