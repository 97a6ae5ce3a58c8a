//! Per-call configuration: variable roles, chart kind, model selection, and
//! the options forwarded to the renderer.

use crate::selector::ModelSpec;
use crate::{CausalError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How a variable is treated by the kernel backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    /// Continuous variable, Gaussian kernel (`c`).
    Continuous,
    /// Unordered categorical variable, Aitchison-Aitken kernel (`u`).
    Unordered,
    /// Ordered discrete variable, Wang-van Ryzin kernel (`o`).
    Ordered,
}

impl VariableKind {
    /// The single-character code used in kernel type strings.
    pub fn type_char(self) -> char {
        match self {
            VariableKind::Continuous => 'c',
            VariableKind::Unordered => 'u',
            VariableKind::Ordered => 'o',
        }
    }
}

impl FromStr for VariableKind {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "continuous" => Ok(VariableKind::Continuous),
            "u" | "unordered" | "categorical" => Ok(VariableKind::Unordered),
            "o" | "ordered" | "discrete" => Ok(VariableKind::Ordered),
            other => Err(CausalError::InvalidParameter(format!(
                "Unknown variable kind '{}'. Expected continuous, categorical or ordered",
                other
            ))),
        }
    }
}

/// The chart requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlotKind {
    #[default]
    Line,
    Bar,
    /// Bar chart of marginal means, optionally with bootstrap error bars.
    Mean,
    Scatter,
}

impl FromStr for PlotKind {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(PlotKind::Line),
            "bar" => Ok(PlotKind::Bar),
            "mean" => Ok(PlotKind::Mean),
            "scatter" => Ok(PlotKind::Scatter),
            other => Err(CausalError::InvalidParameter(format!(
                "Unknown plot kind '{}'. Expected line, bar, mean or scatter",
                other
            ))),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PlotKind::Line => "line",
            PlotKind::Bar => "bar",
            PlotKind::Mean => "mean",
            PlotKind::Scatter => "scatter",
        };
        write!(f, "{}", name)
    }
}

/// Built-in regression backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    /// Random forest regressor, the default.
    Forest,
    /// Local-linear kernel regression.
    Kernel,
}

impl FromStr for ModelType {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forest" | "random_forest" | "default" => Ok(ModelType::Forest),
            "kernel" => Ok(ModelType::Kernel),
            other => Err(CausalError::InvalidParameter(format!(
                "Unknown model type '{}'. Expected forest or kernel",
                other
            ))),
        }
    }
}

/// Roles of the columns taking part in the estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    pub treatment: String,
    pub outcome: String,
    /// Confounders in column order, with their kind.
    pub confounders: Vec<(String, VariableKind)>,
}

impl VariableSpec {
    pub fn new(treatment: &str, outcome: &str, confounders: &[(&str, VariableKind)]) -> Self {
        Self {
            treatment: treatment.to_string(),
            outcome: outcome.to_string(),
            confounders: confounders
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        }
    }

    /// Model features: the treatment followed by the confounders.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![self.treatment.clone()];
        names.extend(self.confounders.iter().map(|(name, _)| name.clone()));
        names
    }

    /// Kinds aligned with [`feature_names`](Self::feature_names). The
    /// treatment is always continuous.
    pub fn feature_kinds(&self) -> Vec<VariableKind> {
        let mut kinds = vec![VariableKind::Continuous];
        kinds.extend(self.confounders.iter().map(|(_, kind)| *kind));
        kinds
    }

    /// Every column the estimation reads.
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols = self.feature_names();
        cols.push(self.outcome.clone());
        cols
    }
}

/// Options handed to the renderer. Control parameters never end up here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub title: Option<String>,
    /// Width of the chart in pixels.
    pub width: u32,
    /// Height of the chart in pixels.
    pub height: u32,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// Unrecognised parameters, passed through unchanged.
    pub extra: BTreeMap<String, String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: None,
            width: 800,
            height: 600,
            x_label: None,
            y_label: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Keys consumed by the estimation pipeline.
pub const CONTROL_KEYS: [&str; 6] = ["z", "bootstrap_samples", "model", "fit_model", "model_type", "xi"];

/// Full configuration of one plotting call.
#[derive(Debug, Clone)]
pub struct ZPlotOptions {
    /// Treatment column.
    pub x: String,
    /// Outcome column.
    pub y: String,
    /// Confounders; empty disables all causal logic.
    pub z: Vec<(String, VariableKind)>,
    pub kind: PlotKind,
    pub model: ModelSpec,
    /// Bootstrap draws per treatment value for `PlotKind::Mean`; zero disables.
    pub bootstrap_samples: usize,
    /// Explicit `(min, max)` for the continuous sweep; defaults to the 1st and
    /// 99th percentiles of the treatment.
    pub xlim: Option<(f64, f64)>,
    /// Seed for the bootstrap resampler. Unseeded when `None`.
    pub seed: Option<u64>,
    pub render: RenderOptions,
}

impl ZPlotOptions {
    pub fn new(x: &str, y: &str) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            z: Vec::new(),
            kind: PlotKind::default(),
            model: ModelSpec::default(),
            bootstrap_samples: 0,
            xlim: None,
            seed: None,
            render: RenderOptions::default(),
        }
    }

    /// Builds options from a loose `key -> value` map.
    ///
    /// Recognised keys: `x`, `y` (both required), `z`
    /// (`"c1:continuous,c2:categorical"`), `kind`, `model_type`,
    /// `bootstrap_samples`, `xlim` (`"min,max"`), `seed`, `title`, `width`,
    /// `height`, `x_label`, `y_label`. `model` and `fit_model` cannot be given
    /// as strings. Anything else is passed through to the renderer.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self> {
        let x = params
            .get("x")
            .ok_or_else(|| CausalError::InvalidParameter("Missing required parameter 'x'".to_string()))?;
        let y = params
            .get("y")
            .ok_or_else(|| CausalError::InvalidParameter("Missing required parameter 'y'".to_string()))?;
        let mut options = Self::new(x, y);
        options.apply_params(params)?;
        Ok(options)
    }

    /// Applies a loose parameter map on top of the current options.
    pub fn apply_params(&mut self, params: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in params {
            match key.as_str() {
                "x" => self.x = value.clone(),
                "y" => self.y = value.clone(),
                "z" => self.z = parse_confounders(value)?,
                "kind" => self.kind = value.parse()?,
                "model_type" => self.model.model_type = Some(value.parse()?),
                "bootstrap_samples" => self.bootstrap_samples = parse_number(key, value)?,
                "xlim" => self.xlim = Some(parse_range(value)?),
                "seed" => self.seed = Some(parse_number(key, value)?),
                "title" => self.render.title = Some(value.clone()),
                "width" => self.render.width = parse_number(key, value)?,
                "height" => self.render.height = parse_number(key, value)?,
                "x_label" => self.render.x_label = Some(value.clone()),
                "y_label" => self.render.y_label = Some(value.clone()),
                "model" | "fit_model" => {
                    return Err(CausalError::InvalidParameter(format!(
                        "'{}' must be supplied as a model object, not a string",
                        key
                    )))
                }
                // Per-point scratch value of the bootstrap loop.
                "xi" => {}
                _ => {
                    self.render.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    pub fn variables(&self) -> VariableSpec {
        VariableSpec {
            treatment: self.x.clone(),
            outcome: self.y.clone(),
            confounders: self.z.clone(),
        }
    }
}

/// Parses `"c1:continuous,c2:categorical"`. A name without a kind is continuous.
pub fn parse_confounders(value: &str) -> Result<Vec<(String, VariableKind)>> {
    let mut confounders = Vec::new();
    for term in value.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        let (name, kind) = match term.split_once(':') {
            Some((name, kind)) => (name.trim(), kind.parse()?),
            None => (term, VariableKind::Continuous),
        };
        if name.is_empty() {
            return Err(CausalError::InvalidParameter(format!(
                "Confounder name is missing in '{}'",
                term
            )));
        }
        confounders.push((name.to_string(), kind));
    }
    Ok(confounders)
}

/// Parses `"min,max"`.
pub fn parse_range(value: &str) -> Result<(f64, f64)> {
    let (min, max) = value.split_once(',').ok_or_else(|| {
        CausalError::InvalidParameter(format!("Expected 'min,max' for xlim, got '{}'", value))
    })?;
    Ok((parse_number("xlim", min)?, parse_number("xlim", max)?))
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CausalError::InvalidParameter(format!("Could not parse '{}' for parameter '{}'", value, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_variable_kind_aliases() {
        assert_eq!("c".parse::<VariableKind>().unwrap(), VariableKind::Continuous);
        assert_eq!("categorical".parse::<VariableKind>().unwrap(), VariableKind::Unordered);
        assert_eq!("Discrete".parse::<VariableKind>().unwrap(), VariableKind::Ordered);
        assert!("nominalish".parse::<VariableKind>().is_err());
    }

    #[test]
    fn test_feature_order_puts_treatment_first() {
        let vars = VariableSpec::new(
            "dose",
            "recovery",
            &[("age", VariableKind::Continuous), ("ward", VariableKind::Unordered)],
        );
        assert_eq!(vars.feature_names(), vec!["dose", "age", "ward"]);
        let codes: String = vars.feature_kinds().iter().map(|k| k.type_char()).collect();
        assert_eq!(codes, "ccu");
        assert_eq!(vars.required_columns(), vec!["dose", "age", "ward", "recovery"]);
    }

    #[test]
    fn test_from_params_strips_control_keys() {
        let options = ZPlotOptions::from_params(&params(&[
            ("x", "dose"),
            ("y", "recovery"),
            ("z", "age:continuous, ward:categorical"),
            ("kind", "mean"),
            ("bootstrap_samples", "50"),
            ("model_type", "kernel"),
            ("xi", "3"),
            ("xlim", "0, 10"),
            ("color", "red"),
        ]))
        .unwrap();

        assert_eq!(options.kind, PlotKind::Mean);
        assert_eq!(options.bootstrap_samples, 50);
        assert_eq!(options.model.model_type, Some(ModelType::Kernel));
        assert_eq!(options.xlim, Some((0.0, 10.0)));
        assert_eq!(
            options.z,
            vec![
                ("age".to_string(), VariableKind::Continuous),
                ("ward".to_string(), VariableKind::Unordered)
            ]
        );
        assert_eq!(options.render.extra.len(), 1);
        assert_eq!(options.render.extra.get("color").map(String::as_str), Some("red"));
        for key in CONTROL_KEYS {
            assert!(!options.render.extra.contains_key(key));
        }
    }

    #[test]
    fn test_from_params_requires_x_and_y() {
        let err = ZPlotOptions::from_params(&params(&[("x", "dose")])).unwrap_err();
        assert!(matches!(err, CausalError::InvalidParameter(msg) if msg.contains("'y'")));
    }

    #[test]
    fn test_from_params_rejects_model_strings() {
        let result = ZPlotOptions::from_params(&params(&[
            ("x", "dose"),
            ("y", "recovery"),
            ("fit_model", "something"),
        ]));
        assert!(matches!(result, Err(CausalError::InvalidParameter(_))));
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert!(parse_range("10").is_err());
        assert!(parse_range("a,b").is_err());
        assert_eq!(parse_range("-1.5,2").unwrap(), (-1.5, 2.0));
    }
}
