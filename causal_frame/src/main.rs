use causal_frame::options::{parse_confounders, parse_range};
use causal_frame::{ModelType, OlsRegressor, PlotKind, ZPlotBuilder};
use clap::{CommandFactory, Parser};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;

/// Estimate and plot the marginal effect of a treatment column on an outcome,
/// controlling for confounders.
#[derive(Parser, Debug)]
#[command(name = "zplot", author, version, about, long_about = None)]
struct Cli {
    /// Path to the input CSV data file
    #[arg(short, long)]
    data: PathBuf,

    /// The treatment column (x axis)
    #[arg(short, long)]
    x: Option<String>,

    /// The outcome column (y axis)
    #[arg(short, long)]
    y: Option<String>,

    /// Confounders as a comma-separated list of name:kind pairs, e.g. "age:continuous,ward:categorical"
    #[arg(short, long)]
    z: Option<String>,

    /// R-style formula, e.g. "recovery ~ dose | age + C(ward)". Replaces --x, --y and --z
    #[arg(long)]
    formula: Option<String>,

    /// The kind of chart [choices: line, bar, mean, scatter]
    #[arg(long, default_value = "line")]
    kind: String,

    /// The regression backend [choices: forest, kernel, ols]
    #[arg(long)]
    model_type: Option<String>,

    /// The number of bootstrap draws per treatment value (mean charts only)
    #[arg(long, default_value_t = 0)]
    bootstrap_samples: usize,

    /// Treatment range of the line sweep as "min,max"
    #[arg(long, allow_hyphen_values = true)]
    xlim: Option<String>,

    /// Seed for bootstrap resampling
    #[arg(long, env = "ZPLOT_SEED")]
    seed: Option<u64>,

    /// Path to save the chart (.png or .svg)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to export the effect estimates as JSON
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// Path to export the effect estimates as Markdown
    #[arg(long)]
    output_markdown: Option<PathBuf>,

    /// Chart title
    #[arg(long)]
    title: Option<String>,

    /// Extra key=value options, e.g. --param width=1024 --param color=red
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
}

fn parse_params(raw: &[String]) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
    let mut params = BTreeMap::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected key=value, got '{}'", pair))?;
        params.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(params)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let df = LazyCsvReader::new(&cli.data)
        .with_has_header(true)
        .finish()?
        .collect()?;

    let mut builder = if let Some(formula) = &cli.formula {
        ZPlotBuilder::from_formula(df, formula)?
    } else {
        let x = cli.x.as_deref().ok_or("--x is required without --formula")?;
        let y = cli.y.as_deref().ok_or("--y is required without --formula")?;
        ZPlotBuilder::new(df, x, y)
    };

    if let Some(z) = &cli.z {
        let confounders = parse_confounders(z)?;
        let refs: Vec<_> = confounders.iter().map(|(n, k)| (n.as_str(), *k)).collect();
        builder.confounders(&refs);
    }

    builder
        .kind(cli.kind.parse::<PlotKind>()?)
        .bootstrap_samples(cli.bootstrap_samples);

    match cli.model_type.as_deref() {
        Some("ols") => {
            builder.model_class(|| Box::new(OlsRegressor::new()));
        }
        Some(other) => {
            builder.model_type(other.parse::<ModelType>()?);
        }
        None => {}
    }
    if let Some(xlim) = &cli.xlim {
        let (min, max) = parse_range(xlim)?;
        builder.xlim(min, max);
    }
    if let Some(seed) = cli.seed {
        builder.seed(seed);
    }
    if let Some(title) = &cli.title {
        builder.title(title);
    }
    builder.params(&parse_params(&cli.params)?)?;

    let chart = builder.run()?;
    chart.summary();

    if let Some(path) = cli.output {
        chart.render(&path)?;
        println!("Chart written to {}", path.display());
    }
    if let Some(path) = cli.output_json {
        let json = chart
            .to_json()
            .map_err(|e| format!("Failed to serialize to JSON: {}", e))?;
        std::fs::write(path, json)?;
    }
    if let Some(path) = cli.output_markdown {
        std::fs::write(path, chart.to_markdown())?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        std::process::exit(1);
    }
}
