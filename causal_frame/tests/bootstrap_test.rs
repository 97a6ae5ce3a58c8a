use causal_frame::{
    bootstrap_curve, estimate_curve, select_and_fit, CausalError, IdentityResampler, ModelSpec,
    OlsRegressor, PlotKind, Resampler, Route, SampleWithReplacement, Sweep, VariableKind,
    VariableSpec, ZPlotBuilder,
};
use polars::prelude::*;

fn confounded() -> DataFrame {
    let n = 33;
    let x: Vec<f64> = (0..n).map(|i| (i % 11) as f64).collect();
    let c1: Vec<f64> = (0..n)
        .map(|i| ((i * 7) % 5) as f64 * 0.5 + 0.1 * (i % 3) as f64)
        .collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 2.0 + 1.5 * x[i] + 3.0 * c1[i] + ((i * 13) % 7) as f64 * 0.05 - 0.15)
        .collect();
    df!("x" => x, "c1" => c1, "y" => y).unwrap()
}

fn vars() -> VariableSpec {
    VariableSpec::new("x", "y", &[("c1", VariableKind::Continuous)])
}

fn ols() -> ModelSpec {
    ModelSpec::class(|| Box::new(OlsRegressor::new()))
}

#[test]
fn test_scenario_bootstrapped_mean() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = ZPlotBuilder::new(confounded(), "x", "y");
    builder
        .confounders(&[("c1", VariableKind::Continuous)])
        .kind(PlotKind::Mean)
        .bootstrap_samples(500)
        .seed(42);
    let chart = builder.run()?;

    assert_eq!(*chart.route(), Route::BootstrappedMean);
    assert!(chart.has_error_bars());
    assert_eq!(chart.points().len(), 11);
    for point in chart.points() {
        let lower = point.lower_delta().ok_or("missing lower delta")?;
        let upper = point.upper_delta().ok_or("missing upper delta")?;
        assert!(lower >= 0.0);
        assert!(upper >= 0.0);
    }
    Ok(())
}

#[test]
fn test_identity_resampler_reproduces_marginal_mean() -> Result<(), Box<dyn std::error::Error>> {
    let df = confounded();
    let fitted = select_and_fit(&df, &vars(), ols())?;
    let plain = estimate_curve(&df, &fitted, "x", Sweep::Discrete)?;
    let boot = bootstrap_curve(&df, &fitted, "x", 20, &mut IdentityResampler)?;

    assert_eq!(plain.len(), boot.len());
    for (p, b) in plain.iter().zip(boot.iter()) {
        assert_eq!(p.treatment(), b.treatment());
        assert!((p.expected() - b.expected()).abs() < 1e-9);
        assert!(b.lower_delta().unwrap() < 1e-9);
        assert!(b.upper_delta().unwrap() < 1e-9);
    }
    Ok(())
}

#[test]
fn test_seeded_bootstrap_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
    let df = confounded();
    let fitted = select_and_fit(&df, &vars(), ols())?;
    let first = bootstrap_curve(&df, &fitted, "x", 50, &mut SampleWithReplacement::new(Some(7)))?;
    let second = bootstrap_curve(&df, &fitted, "x", 50, &mut SampleWithReplacement::new(Some(7)))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_resampling_widens_the_interval() -> Result<(), Box<dyn std::error::Error>> {
    let df = confounded();
    let fitted = select_and_fit(&df, &vars(), ols())?;
    let boot = bootstrap_curve(&df, &fitted, "x", 200, &mut SampleWithReplacement::new(Some(3)))?;
    // c1 varies across rows, so resampled averages vary too.
    assert!(boot
        .iter()
        .all(|p| p.lower_delta().unwrap() + p.upper_delta().unwrap() > 0.0));
    Ok(())
}

#[test]
fn test_zero_samples_is_rejected() {
    let df = confounded();
    let fitted = select_and_fit(&df, &vars(), ols()).unwrap();
    let result = bootstrap_curve(&df, &fitted, "x", 0, &mut IdentityResampler);
    assert!(matches!(result, Err(CausalError::InvalidParameter(_))));
}

struct CountingResampler {
    calls: usize,
}

impl Resampler for CountingResampler {
    fn resample(&mut self, df: &DataFrame) -> causal_frame::Result<DataFrame> {
        self.calls += 1;
        Ok(df.clone())
    }
}

#[test]
fn test_one_resample_per_draw_and_value() -> Result<(), Box<dyn std::error::Error>> {
    let df = confounded();
    let fitted = select_and_fit(&df, &vars(), ols())?;
    let mut resampler = CountingResampler { calls: 0 };
    bootstrap_curve(&df, &fitted, "x", 15, &mut resampler)?;
    assert_eq!(resampler.calls, 15 * 11);
    Ok(())
}
