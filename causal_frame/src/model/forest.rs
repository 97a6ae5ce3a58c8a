use super::RegressionModel;
use crate::{CausalError, Result};
use nalgebra::{DMatrix, DVector};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest regressor, the default backend.
pub struct ForestRegressor {
    parameters: RandomForestRegressorParameters,
    forest: Option<Forest>,
    n_features: usize,
}

impl Default for ForestRegressor {
    fn default() -> Self {
        Self::with_parameters(RandomForestRegressorParameters::default())
    }
}

impl ForestRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(parameters: RandomForestRegressorParameters) -> Self {
        Self {
            parameters,
            forest: None,
            n_features: 0,
        }
    }
}

fn to_dense(x: &DMatrix<f64>) -> DenseMatrix<f64> {
    let rows: Vec<Vec<f64>> = x
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    DenseMatrix::from_2d_vec(&rows)
}

impl RegressionModel for ForestRegressor {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<()> {
        let targets: Vec<f64> = y.iter().copied().collect();
        let forest = RandomForestRegressor::fit(&to_dense(x), &targets, self.parameters.clone())
            .map_err(|e| CausalError::Backend(Box::new(e)))?;
        self.forest = Some(forest);
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>> {
        let forest = self.forest.as_ref().ok_or(CausalError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(CausalError::InvalidParameter(format!(
                "Forest was fit on {} feature columns, received {}",
                self.n_features,
                x.ncols()
            )));
        }
        let predictions = forest
            .predict(&to_dense(x))
            .map_err(|e| CausalError::Backend(Box::new(e)))?;
        Ok(DVector::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_data() -> (DMatrix<f64>, DVector<f64>) {
        let n = 40;
        let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { (i % 8) as f64 } else { (i % 5) as f64 });
        let y = DVector::from_fn(n, |i, _| 2.0 * (i % 8) as f64 + (i % 5) as f64);
        (x, y)
    }

    #[test]
    fn test_predictions_stay_within_target_range() {
        let (x, y) = training_data();
        let mut forest = ForestRegressor::new();
        forest.fit(&x, &y).unwrap();

        let predictions = forest.predict(&x).unwrap();
        assert_eq!(predictions.len(), x.nrows());
        let (lo, hi) = (y.min(), y.max());
        assert!(predictions.iter().all(|p| *p >= lo - 1e-9 && *p <= hi + 1e-9));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let (x, _) = training_data();
        let forest = ForestRegressor::new();
        assert!(matches!(forest.predict(&x), Err(CausalError::ModelNotFitted)));
    }

    #[test]
    fn test_predict_rejects_other_feature_count() {
        let (x, y) = training_data();
        let mut forest = ForestRegressor::new();
        forest.fit(&x, &y).unwrap();
        let narrow = x.columns(0, 1).into_owned();
        assert!(forest.predict(&narrow).is_err());
    }
}
