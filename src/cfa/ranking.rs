//! Power-law path: rank-ordered cumulative counts.
//!
//! The curve is fitted twice. The area-normalised fit gives the reported
//! `C`, `b` and R²; the raw-count fit only contributes its `C`, which turns
//! the power law back into boulder counts and covered area.

use std::path::Path;

use tracing::info;

use crate::domain::{CfaBin, Dataset, LoadOptions, PowerLawConfig, PowerLawRun};
use crate::error::DatasetError;
use crate::fit::fit_power_law;
use crate::io::load_dataset;
use crate::models::{disc_area, integrate_power_law, predict_cumulative_count};

/// Load one site and run the power-law path on it.
pub fn run_power_law(
    path: &Path,
    load: &LoadOptions,
    cfg: &PowerLawConfig,
) -> Result<PowerLawRun, DatasetError> {
    let dataset = load_dataset(path, load)?;
    power_law_from_dataset(&dataset, cfg)
}

/// Same as [`run_power_law`] for an already loaded dataset.
///
/// Fails with `Empty` when no diameter reaches `cfg.min_size`.
pub fn power_law_from_dataset(
    dataset: &Dataset,
    cfg: &PowerLawConfig,
) -> Result<PowerLawRun, DatasetError> {
    if !(dataset.area.is_finite() && dataset.area > 0.0) {
        return Err(DatasetError::InvalidArea {
            path: dataset.source.clone(),
            area: dataset.area,
        });
    }

    let mut kept: Vec<f64> = dataset
        .diameters
        .iter()
        .copied()
        .filter(|&d| d >= cfg.min_size)
        .collect();
    if kept.is_empty() {
        return Err(DatasetError::Empty {
            path: dataset.source.clone(),
        });
    }
    kept.sort_by(|a, b| b.total_cmp(a));
    let max_size = kept[0];

    let counts = cumulative_counts(&kept);
    let area = dataset.area;
    let curve: Vec<CfaBin> = counts
        .iter()
        .map(|&(d, n)| CfaBin {
            diameter: d,
            value: n / area,
        })
        .collect();

    let ds: Vec<f64> = counts.iter().map(|&(d, _)| d).collect();
    let raw: Vec<f64> = counts.iter().map(|&(_, n)| n).collect();
    let normalized: Vec<f64> = curve.iter().map(|b| b.value).collect();

    let fit = fit_power_law(&ds, &normalized);
    let unnormalized_c = fit_power_law(&ds, &raw).ok().map(|f| f.c);

    let (predicted_count, predicted_area_pct) = match (&fit, unnormalized_c) {
        (Ok(f), Some(c)) => (
            Some(predict_cumulative_count(c, f.b, cfg.predict_min, max_size)),
            Some(integrate_power_law(c, f.b, cfg.predict_min, max_size, area)),
        ),
        _ => (None, None),
    };

    let measured_area_pct = 100.0 * kept.iter().map(|&d| disc_area(d)).sum::<f64>() / area;

    info!(
        source = %dataset.source.display(),
        boulders = kept.len(),
        max_size,
        ok = fit.is_ok(),
        measured_area_pct,
        "power-law fit"
    );

    Ok(PowerLawRun {
        area,
        max_size,
        curve,
        fit,
        unnormalized_c,
        predicted_count,
        predicted_area_pct,
        measured_area_pct,
    })
}

/// `(D, N(>=D))` for each distinct diameter of a descending slice.
pub fn cumulative_counts(descending: &[f64]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    for (rank, &d) in descending.iter().enumerate() {
        let n = (rank + 1) as f64;
        match out.last_mut() {
            Some(last) if last.0 == d => last.1 = n,
            _ => out.push((d, n)),
        }
    }
    out
}
