//! Chooses and fits the regression backend for one call.

use crate::frame::{clean_dataframe, design_matrix, target_vector};
use crate::model::{ForestRegressor, KernelRegression, RegressionModel};
use crate::options::{ModelType, VariableSpec};
use crate::Result;
use nalgebra::DVector;
use polars::prelude::*;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Zero-argument constructor of a fresh, unfitted model.
pub type ModelFactory = Arc<dyn Fn() -> Box<dyn RegressionModel>>;

/// The model-related options of a call. At most one source wins, see
/// [`ModelChoice::resolve`].
#[derive(Clone, Default)]
pub struct ModelSpec {
    pub class: Option<ModelFactory>,
    pub fitted: Option<Arc<dyn RegressionModel>>,
    pub model_type: Option<ModelType>,
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("class", &self.class.as_ref().map(|_| "<factory>"))
            .field("fitted", &self.fitted.as_ref().map(|m| m.name().to_string()))
            .field("model_type", &self.model_type)
            .finish()
    }
}

impl ModelSpec {
    pub fn class<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn RegressionModel> + 'static,
    {
        Self {
            class: Some(Arc::new(factory)),
            ..Self::default()
        }
    }

    pub fn fitted(model: Arc<dyn RegressionModel>) -> Self {
        Self {
            fitted: Some(model),
            ..Self::default()
        }
    }

    pub fn of_type(model_type: ModelType) -> Self {
        Self {
            model_type: Some(model_type),
            ..Self::default()
        }
    }
}

/// The resolved model source.
#[derive(Clone)]
pub enum ModelChoice {
    /// Instantiate and fit a caller-supplied model class.
    Class(ModelFactory),
    /// Use a caller-supplied fitted model as-is.
    Fitted(Arc<dyn RegressionModel>),
    /// Local-linear kernel regression with variable-kind annotations.
    Kernel,
    /// Random forest, the default.
    Forest,
}

impl ModelChoice {
    /// Resolves a spec with precedence class, fitted, kernel, forest.
    pub fn resolve(spec: ModelSpec) -> Self {
        if let Some(factory) = spec.class {
            ModelChoice::Class(factory)
        } else if let Some(model) = spec.fitted {
            ModelChoice::Fitted(model)
        } else if spec.model_type == Some(ModelType::Kernel) {
            ModelChoice::Kernel
        } else {
            ModelChoice::Forest
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelChoice::Class(_) => "class",
            ModelChoice::Fitted(_) => "fitted",
            ModelChoice::Kernel => "kernel",
            ModelChoice::Forest => "forest",
        }
    }
}

impl fmt::Debug for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelChoice::{}", self.label())
    }
}

/// A fitted model together with the column order it was fitted on.
#[derive(Clone)]
pub struct FittedModel {
    model: Arc<dyn RegressionModel>,
    features: Vec<String>,
    source: &'static str,
}

impl fmt::Debug for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FittedModel")
            .field("backend", &self.model.name())
            .field("features", &self.features)
            .field("source", &self.source)
            .finish()
    }
}

impl FittedModel {
    pub fn new(model: Arc<dyn RegressionModel>, features: Vec<String>, source: &'static str) -> Self {
        Self {
            model,
            features,
            source,
        }
    }

    pub fn model(&self) -> &Arc<dyn RegressionModel> {
        &self.model
    }

    /// Feature columns in model order: the treatment, then the confounders.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Which [`ModelChoice`] produced this model.
    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn backend(&self) -> &str {
        self.model.name()
    }

    /// Scores every row of `df` over the feature columns.
    pub fn score(&self, df: &DataFrame) -> Result<DVector<f64>> {
        let x = design_matrix(df, &self.features)?;
        self.model.predict(&x)
    }

    /// Average prediction over every row of `df`.
    pub fn mean_prediction(&self, df: &DataFrame) -> Result<f64> {
        let scores = self.score(df)?;
        Ok(scores.mean())
    }
}

/// Resolves the model source in `spec` and fits it on
/// `[treatment] + confounders -> outcome` over the complete rows of `df`.
pub fn select_and_fit(df: &DataFrame, vars: &VariableSpec, spec: ModelSpec) -> Result<FittedModel> {
    let df = clean_dataframe(df, vars)?;
    let features = vars.feature_names();
    let choice = ModelChoice::resolve(spec);
    info!(source = choice.label(), features = ?features, "Selected regression model");

    let source = choice.label();
    let model: Arc<dyn RegressionModel> = match choice {
        ModelChoice::Fitted(model) => model,
        ModelChoice::Class(factory) => {
            let x = design_matrix(&df, &features)?;
            let y = target_vector(&df, &vars.outcome)?;
            let mut model = factory();
            model.fit(&x, &y)?;
            Arc::from(model)
        }
        ModelChoice::Kernel => {
            let x = design_matrix(&df, &features)?;
            let y = target_vector(&df, &vars.outcome)?;
            let mut model = KernelRegression::new();
            model.fit_with_kinds(&x, &y, Some(&vars.feature_kinds()))?;
            Arc::new(model)
        }
        ModelChoice::Forest => {
            let x = design_matrix(&df, &features)?;
            let y = target_vector(&df, &vars.outcome)?;
            let mut model = ForestRegressor::new();
            model.fit(&x, &y)?;
            Arc::new(model)
        }
    };
    debug!(backend = model.name(), rows = df.height(), "Model ready");

    Ok(FittedModel::new(model, features, source))
}
