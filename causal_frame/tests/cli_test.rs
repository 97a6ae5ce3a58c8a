use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_mean_effects_with_ols() {
    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--x")
        .arg("x")
        .arg("--y")
        .arg("y")
        .arg("--z")
        .arg("c1:continuous")
        .arg("--kind")
        .arg("mean")
        .arg("--model-type")
        .arg("ols");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Marginal Effect Estimates"))
        .stdout(predicate::str::contains("EffectMean"))
        .stdout(predicate::str::contains("Model:     ols"));
}

#[test]
fn test_formula_with_kernel_backend() {
    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--formula")
        .arg("y ~ x | c1 + C(c2)")
        .arg("--kind")
        .arg("bar")
        .arg("--model-type")
        .arg("kernel");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("EffectBar"))
        .stdout(predicate::str::contains("Model:     kernel"));
}

#[test]
fn test_bootstrap_exports() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("effects.json");
    let md = dir.path().join("effects.md");

    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.env("ZPLOT_SEED", "42")
        .arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--x")
        .arg("x")
        .arg("--y")
        .arg("y")
        .arg("--z")
        .arg("c1")
        .arg("--kind")
        .arg("mean")
        .arg("--bootstrap-samples")
        .arg("50")
        .arg("--output-json")
        .arg(&json)
        .arg("--output-markdown")
        .arg(&md)
        .arg("--param")
        .arg("color=red");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("95% CI"));

    let exported = std::fs::read_to_string(&json).unwrap();
    assert!(exported.contains("\"BootstrappedMean\""));
    assert!(exported.contains("\"lower_delta\""));
    assert!(exported.contains("\"color\": \"red\""));
    assert!(std::fs::read_to_string(&md).unwrap().contains("95% CI"));
}

#[test]
fn test_line_sweep_with_xlim() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("line.json");

    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--formula")
        .arg("y ~ x | c1")
        .arg("--model-type")
        .arg("ols")
        .arg("--xlim")
        .arg("-1,4")
        .arg("--output-json")
        .arg(&json);

    cmd.assert().success();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["points"].as_array().map(Vec::len), Some(100));
    assert_eq!(value["points"][0]["treatment"], -1.0);
}

#[test]
fn test_missing_column_fails() {
    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--x")
        .arg("x")
        .arg("--y")
        .arg("y")
        .arg("--z")
        .arg("age:continuous");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Column not found: age"));
}

#[test]
fn test_mean_without_confounders_fails() {
    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--x")
        .arg("x")
        .arg("--y")
        .arg("y")
        .arg("--kind")
        .arg("mean");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("requires at least one confounder"));
}

#[test]
fn test_unknown_kind_fails() {
    let mut cmd = Command::cargo_bin("zplot").unwrap();
    cmd.arg("--data")
        .arg("tests/data/confounded.csv")
        .arg("--x")
        .arg("x")
        .arg("--y")
        .arg("y")
        .arg("--kind")
        .arg("pie");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unknown plot kind 'pie'"));
}
