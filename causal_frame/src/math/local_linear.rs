//! Local-linear kernel regression with product kernels over mixed
//! continuous, unordered and ordered regressors.
//!
//! At every evaluation point `x0` the estimator solves a weighted least
//! squares problem of `y` on `[1, X - x0]`, weighting each training row by the
//! product of per-column kernels. The fitted intercept is the estimate of
//! `E[y | x0]`.

use crate::math::kernels::{aitchison_aitken, gaussian, normal_reference_bandwidth, wang_ryzin};
use crate::math::ols::normal_equations;
use crate::options::VariableKind;
use crate::CausalError;
use nalgebra::{DMatrix, DVector, RowDVector};
use polars::prelude::*;

/// Singular values below this are treated as zero by the pseudo-inverse.
const PINV_EPS: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct LocalLinear {
    x: DMatrix<f64>,
    y: DVector<f64>,
    kinds: Vec<VariableKind>,
    bandwidths: Vec<f64>,
    levels: Vec<usize>,
}

impl LocalLinear {
    /// Stores the training data and picks normal-reference bandwidths.
    ///
    /// Continuous columns without spread get a unit bandwidth. Unordered
    /// bandwidths are capped at `(c - 1) / c`, ordered ones at `1`.
    pub fn new(
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        kinds: &[VariableKind],
    ) -> Result<Self, CausalError> {
        if kinds.len() != x.ncols() {
            return Err(CausalError::InvalidParameter(format!(
                "Expected {} variable kinds, got {}",
                x.ncols(),
                kinds.len()
            )));
        }
        if x.nrows() != y.len() || x.nrows() == 0 {
            return Err(CausalError::InvalidParameter(format!(
                "Cannot fit {} feature rows against {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let k = x.ncols();
        let mut bandwidths = Vec::with_capacity(k);
        let mut levels = Vec::with_capacity(k);
        for (j, kind) in kinds.iter().enumerate() {
            let column: Vec<f64> = x.column(j).iter().copied().collect();
            let c = Series::new("level".into(), column.as_slice()).n_unique()?;
            let h = normal_reference_bandwidth(&column, k);
            let h = match kind {
                VariableKind::Continuous if h > 0.0 && h.is_finite() => h,
                VariableKind::Continuous => 1.0,
                VariableKind::Unordered => h.clamp(0.0, (c.max(1) - 1) as f64 / c.max(1) as f64),
                VariableKind::Ordered => h.clamp(0.0, 1.0),
            };
            bandwidths.push(h);
            levels.push(c);
        }

        Ok(Self {
            x: x.clone(),
            y: y.clone(),
            kinds: kinds.to_vec(),
            bandwidths,
            levels,
        })
    }

    pub fn bandwidths(&self) -> &[f64] {
        &self.bandwidths
    }

    /// Product-kernel weight of every training row relative to `x0`.
    fn weights(&self, x0: &RowDVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.x.nrows(), |i, _| {
            (0..self.x.ncols())
                .map(|j| {
                    let (xi, h) = (self.x[(i, j)], self.bandwidths[j]);
                    match self.kinds[j] {
                        VariableKind::Continuous => gaussian((xi - x0[j]) / h) / h,
                        VariableKind::Unordered => aitchison_aitken(h, xi, x0[j], self.levels[j]),
                        VariableKind::Ordered => wang_ryzin(h, xi, x0[j]),
                    }
                })
                .product()
        })
    }

    /// Conditional mean at a single point.
    fn estimate_at(&self, x0: &RowDVector<f64>) -> Result<f64, CausalError> {
        let w = self.weights(x0);
        if w.sum() <= 0.0 || !w.sum().is_finite() {
            return Ok(self.y.mean());
        }

        let n = self.x.nrows();
        let k = self.x.ncols();
        let design = DMatrix::from_fn(n, k + 1, |i, j| {
            if j == 0 {
                1.0
            } else {
                self.x[(i, j - 1)] - x0[j - 1]
            }
        });

        let (xtwx, xtwy) = normal_equations(&self.y, &design, Some(&w));
        let pinv = xtwx
            .pseudo_inverse(PINV_EPS)
            .map_err(|e| CausalError::Linalg(e.to_string()))?;
        let beta = pinv * xtwy;
        Ok(beta[0])
    }

    /// Conditional means at every row of `points`.
    pub fn evaluate(&self, points: &DMatrix<f64>) -> Result<DVector<f64>, CausalError> {
        if points.ncols() != self.x.ncols() {
            return Err(CausalError::ShapeMismatch {
                expected: self.x.shape(),
                received: points.shape(),
            });
        }
        let fitted = points
            .row_iter()
            .map(|row| self.estimate_at(&row.into_owned()))
            .collect::<Result<Vec<f64>, CausalError>>()?;
        Ok(DVector::from_vec(fitted))
    }
}
