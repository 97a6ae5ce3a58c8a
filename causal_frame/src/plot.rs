//! Routing of a plot request and rendering of the resulting chart.

use crate::bootstrap::{bootstrap_curve, SampleWithReplacement};
use crate::effect::{estimate_curve, EffectPoint, Sweep};
use crate::frame::{clean_dataframe, numeric_values};
use crate::options::{PlotKind, RenderOptions, ZPlotOptions, CONTROL_KEYS};
use crate::selector::select_and_fit;
use crate::{CausalError, Result};
use comfy_table::{Cell, Table};
use getset::Getters;
use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Geometry used to draw the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderKind {
    Line,
    Bar,
    Scatter,
}

/// Which path through the dispatcher produced a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    /// No confounders: the raw treatment and outcome columns.
    Plain,
    /// Continuous sweep drawn as a line.
    EffectLine,
    /// Discrete sweep drawn as bars.
    EffectBar,
    /// Discrete sweep of marginal means, no intervals.
    EffectMean,
    /// Bootstrapped marginal means with asymmetric error bars.
    BootstrappedMean,
}

/// A render-ready chart.
#[derive(Debug, Clone, Getters, Serialize)]
#[getset(get = "pub")]
pub struct Chart {
    route: Route,
    kind: RenderKind,
    x_label: String,
    y_label: String,
    /// Points in sweep order, or in row order for plain charts.
    points: Vec<EffectPoint>,
    /// Options forwarded to the renderer.
    options: RenderOptions,
    /// Backend that produced the estimates. `None` for plain charts.
    model: Option<String>,
}

/// Routes a plot request.
///
/// Without confounders the raw columns are plotted as requested and `Mean`
/// is rejected. With confounders a model is fitted and the treatment swept:
/// `Line` uses the continuous grid, `Bar` and `Mean` the distinct observed
/// values, and `Mean` with a positive `bootstrap_samples` adds intervals.
/// `Scatter` with confounders is rejected.
pub fn dispatch(df: &DataFrame, options: ZPlotOptions) -> Result<Chart> {
    let vars = options.variables();
    let ZPlotOptions {
        x,
        y,
        z,
        kind,
        model,
        bootstrap_samples,
        xlim,
        seed,
        mut render,
    } = options;

    // Control keys never reach the renderer.
    for key in CONTROL_KEYS {
        render.extra.remove(key);
    }
    let x_label = render.x_label.clone().unwrap_or_else(|| x.clone());
    let y_label = render.y_label.clone().unwrap_or_else(|| y.clone());

    if z.is_empty() {
        let render_kind = match kind {
            PlotKind::Line => RenderKind::Line,
            PlotKind::Bar => RenderKind::Bar,
            PlotKind::Scatter => RenderKind::Scatter,
            PlotKind::Mean => {
                return Err(CausalError::InvalidParameter(
                    "kind 'mean' requires at least one confounder in z".to_string(),
                ))
            }
        };
        info!(route = ?Route::Plain, kind = %kind, "Plotting raw columns");

        let clean = clean_dataframe(df, &vars)?;
        let points = numeric_values(&clean, &x)?
            .into_iter()
            .zip(numeric_values(&clean, &y)?)
            .map(|(xv, yv)| EffectPoint::new(xv, yv))
            .collect();
        return Ok(Chart {
            route: Route::Plain,
            kind: render_kind,
            x_label,
            y_label,
            points,
            options: render,
            model: None,
        });
    }

    let route = match kind {
        PlotKind::Line => Route::EffectLine,
        PlotKind::Bar => Route::EffectBar,
        PlotKind::Mean if bootstrap_samples > 0 => Route::BootstrappedMean,
        PlotKind::Mean => Route::EffectMean,
        PlotKind::Scatter => {
            return Err(CausalError::InvalidParameter(
                "kind 'scatter' cannot be combined with confounders".to_string(),
            ))
        }
    };

    let clean = clean_dataframe(df, &vars)?;
    let fitted = select_and_fit(&clean, &vars, model)?;

    let points = match route {
        Route::EffectLine => estimate_curve(&clean, &fitted, &x, Sweep::Continuous { xlim })?,
        Route::BootstrappedMean => {
            let mut resampler = SampleWithReplacement::new(seed);
            bootstrap_curve(&clean, &fitted, &x, bootstrap_samples, &mut resampler)?
        }
        _ => estimate_curve(&clean, &fitted, &x, Sweep::Discrete)?,
    };
    let render_kind = if route == Route::EffectLine {
        RenderKind::Line
    } else {
        RenderKind::Bar
    };
    info!(route = ?route, points = points.len(), backend = fitted.backend(), "Estimated marginal effects");

    Ok(Chart {
        route,
        kind: render_kind,
        x_label,
        y_label,
        points,
        options: render,
        model: Some(fitted.backend().to_string()),
    })
}

const SERIES_COLOR: RGBColor = RGBColor(31, 119, 180);
const TITLE_FONT_SIZE: u32 = 24;

fn plot_err<E: std::fmt::Display>(e: E) -> CausalError {
    CausalError::Plotting(e.to_string())
}

impl Chart {
    /// True when any point carries a bootstrap interval.
    pub fn has_error_bars(&self) -> bool {
        self.points.iter().any(|p| p.bounds().is_some())
    }

    /// Writes the chart to `path`: SVG for a `.svg` extension, PNG otherwise.
    pub fn render<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let size = (self.options.width, self.options.height);
        let is_svg = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("svg"))
            .unwrap_or(false);
        if is_svg {
            self.draw(SVGBackend::new(path, size).into_drawing_area())
        } else {
            self.draw(BitMapBackend::new(path, size).into_drawing_area())
        }
    }

    fn bar_width(&self) -> f64 {
        let mut xs: Vec<f64> = self.points.iter().map(|p| p.treatment()).collect();
        xs.sort_by(|a, b| a.total_cmp(b));
        let gap = xs
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| *d > 0.0)
            .fold(f64::INFINITY, f64::min);
        if gap.is_finite() {
            gap * 0.8
        } else {
            0.8
        }
    }

    fn draw<DB: DrawingBackend>(&self, root: DrawingArea<DB, Shift>) -> Result<()> {
        root.fill(&WHITE).map_err(plot_err)?;

        let half_bar = if self.kind == RenderKind::Bar {
            self.bar_width() / 2.0
        } else {
            0.0
        };
        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            let (lo, hi) = p.bounds().unwrap_or((p.expected(), p.expected()));
            x_min = x_min.min(p.treatment() - half_bar);
            x_max = x_max.max(p.treatment() + half_bar);
            y_min = y_min.min(lo);
            y_max = y_max.max(hi);
        }
        if self.points.is_empty() {
            (x_min, x_max, y_min, y_max) = (0.0, 1.0, 0.0, 1.0);
        }
        if self.kind == RenderKind::Bar {
            y_min = y_min.min(0.0);
            y_max = y_max.max(0.0);
        }
        if x_max <= x_min {
            x_min -= 0.5;
            x_max += 0.5;
        }
        let y_margin = if y_max > y_min { (y_max - y_min) * 0.1 } else { 1.0 };

        let mut builder = ChartBuilder::on(&root);
        builder.margin(10).x_label_area_size(40).y_label_area_size(60);
        if let Some(title) = &self.options.title {
            builder.caption(title, ("sans-serif", TITLE_FONT_SIZE).into_font());
        }
        let mut chart = builder
            .build_cartesian_2d(x_min..x_max, (y_min - y_margin)..(y_max + y_margin))
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()
            .map_err(plot_err)?;

        let xy = self.points.iter().map(|p| (p.treatment(), p.expected()));
        match self.kind {
            RenderKind::Line => {
                chart
                    .draw_series(LineSeries::new(xy, SERIES_COLOR.stroke_width(2)))
                    .map_err(plot_err)?;
            }
            RenderKind::Scatter => {
                chart
                    .draw_series(xy.map(|(px, py)| Circle::new((px, py), 3, SERIES_COLOR.filled())))
                    .map_err(plot_err)?;
            }
            RenderKind::Bar => {
                chart
                    .draw_series(xy.map(|(px, py)| {
                        Rectangle::new(
                            [(px - half_bar, 0.0), (px + half_bar, py)],
                            SERIES_COLOR.mix(0.8).filled(),
                        )
                    }))
                    .map_err(plot_err)?;
                if self.has_error_bars() {
                    chart
                        .draw_series(self.points.iter().filter_map(|p| {
                            p.bounds().map(|(lo, hi)| {
                                ErrorBar::new_vertical(
                                    p.treatment(),
                                    lo,
                                    p.expected(),
                                    hi,
                                    BLACK.filled(),
                                    10,
                                )
                            })
                        }))
                        .map_err(plot_err)?;
                }
            }
        }

        root.present().map_err(plot_err)?;
        Ok(())
    }

    /// Prints the effect estimates to the console.
    pub fn summary(&self) {
        println!("Marginal Effect Estimates");
        println!("========================================");
        println!("Treatment: {}", self.x_label);
        println!("Outcome:   {}", self.y_label);
        println!("Route:     {:?}", self.route);
        if let Some(model) = &self.model {
            println!("Model:     {}", model);
        }
        println!();

        let mut table = Table::new();
        if self.has_error_bars() {
            table.set_header(vec!["Treatment", "Expected", "Lower Δ", "Upper Δ", "95% CI"]);
        } else {
            table.set_header(vec!["Treatment", "Expected"]);
        }
        for p in &self.points {
            let mut row = vec![
                Cell::new(format!("{:.4}", p.treatment())),
                Cell::new(format!("{:.4}", p.expected())),
            ];
            if let (Some(lo), Some(hi), Some((low, high))) = (p.lower_delta(), p.upper_delta(), p.bounds()) {
                row.push(Cell::new(format!("{:.4}", lo)));
                row.push(Cell::new(format!("{:.4}", hi)));
                row.push(Cell::new(format!("[{:.3}, {:.3}]", low, high)));
            }
            table.add_row(row);
        }
        println!("{}", table);
    }

    /// Exports the effect estimates to a Markdown table.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("### Marginal Effect Estimates\n\n");
        if self.has_error_bars() {
            md.push_str(&format!("| {} | {} | 95% CI |\n", self.x_label, self.y_label));
            md.push_str("|---|---|---|\n");
        } else {
            md.push_str(&format!("| {} | {} |\n", self.x_label, self.y_label));
            md.push_str("|---|---|\n");
        }
        for p in &self.points {
            match p.bounds() {
                Some((low, high)) => md.push_str(&format!(
                    "| {:.4} | {:.4} | [{:.3}, {:.3}] |\n",
                    p.treatment(),
                    p.expected(),
                    low,
                    high
                )),
                None => md.push_str(&format!("| {:.4} | {:.4} |\n", p.treatment(), p.expected())),
            }
        }
        md
    }

    /// Exports the chart to a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
