//! Comparison plots.
//!
//! Site results are first flattened into [`SiteSeries`] (data points plus a
//! sampled best-fit curve), which both back-ends draw:
//!
//! - SVG figure via Plotters (`chart`)
//! - fixed-size terminal preview (`ascii`)

pub mod ascii;
pub mod chart;

pub use ascii::*;
pub use chart::*;

use crate::domain::{BinningConfig, ExponentialRun, PowerLawRun, SiteResult};
use crate::math::linspace;
use crate::models::{exponential_cfa, power_law_cfa};

/// Rock abundances drawn as reference curves on the exponential plot.
pub const REFERENCE_ABUNDANCES: [f64; 6] = [0.03, 0.05, 0.07, 0.10, 0.20, 1.0];

/// Samples per best-fit or reference curve.
const CURVE_SAMPLES: usize = 50;

/// One site, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSeries {
    pub label: String,
    /// Legend entry for the fitted curve.
    pub legend: String,
    pub points: Vec<(f64, f64)>,
    pub fit: Vec<(f64, f64)>,
}

pub fn exponential_series(
    sites: &[SiteResult<ExponentialRun>],
    binning: &BinningConfig,
) -> Vec<SiteSeries> {
    sites
        .iter()
        .map(|site| {
            let Ok(run) = &site.outcome else {
                return dead_series(&site.label);
            };
            let points = run.bins.iter().map(|b| (b.diameter, b.value)).collect();
            let (legend, fit) = match &run.fit {
                Ok(f) => (
                    format!("{} Best Fit RA: {:.2}%", site.label, f.k * 100.0),
                    linspace(binning.fit_min, binning.fit_max, CURVE_SAMPLES)
                        .into_iter()
                        .map(|d| (d, exponential_cfa(d, f.k)))
                        .collect(),
                ),
                Err(e) => (format!("{} (fit failed: {e})", site.label), Vec::new()),
            };
            SiteSeries {
                label: site.label.clone(),
                legend,
                points,
                fit,
            }
        })
        .collect()
}

pub fn power_law_series(sites: &[SiteResult<PowerLawRun>]) -> Vec<SiteSeries> {
    sites
        .iter()
        .map(|site| {
            let Ok(run) = &site.outcome else {
                return dead_series(&site.label);
            };
            let points: Vec<(f64, f64)> = run.curve.iter().map(|b| (b.diameter, b.value)).collect();
            let (legend, fit) = match &run.fit {
                Ok(f) => (
                    format!("{} (b = {:.2}, R² = {:.3})", site.label, f.b, f.r2),
                    points
                        .iter()
                        .map(|&(d, _)| (d, power_law_cfa(d, f.c, f.b)))
                        .collect(),
                ),
                Err(e) => (format!("{} (fit failed: {e})", site.label), Vec::new()),
            };
            SiteSeries {
                label: site.label.clone(),
                legend,
                points,
                fit,
            }
        })
        .collect()
}

/// Exponential model at each [`REFERENCE_ABUNDANCES`] value over the binning range.
pub fn reference_curves(binning: &BinningConfig) -> Vec<(f64, Vec<(f64, f64)>)> {
    let ds = linspace(binning.min_size, binning.max_size, CURVE_SAMPLES);
    REFERENCE_ABUNDANCES
        .iter()
        .map(|&k| (k, ds.iter().map(|&d| (d, exponential_cfa(d, k))).collect()))
        .collect()
}

fn dead_series(label: &str) -> SiteSeries {
    SiteSeries {
        label: label.to_string(),
        legend: format!("{label} (no data)"),
        points: Vec::new(),
        fit: Vec::new(),
    }
}

/// Points that can sit on log-log axes.
fn log_safe(points: &[(f64, f64)]) -> impl Iterator<Item = (f64, f64)> + '_ {
    points
        .iter()
        .copied()
        .filter(|&(x, y)| x > 0.0 && y > 0.0 && x.is_finite() && y.is_finite())
}
