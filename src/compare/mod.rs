//! Site comparison.
//!
//! Runs one CFA path per configured site (in parallel), then writes the
//! statistics CSV and the comparison figure side by side. A site whose data
//! cannot be loaded yields a dead row; only an unusable reference area stops
//! the comparison.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::cfa::{run_exponential, run_power_law};
use crate::domain::{
    BinningConfig, ExponentialRun, LoadOptions, ModelKind, PowerLawConfig, PowerLawRun, SiteResult,
    SiteSpec,
};
use crate::error::{AppError, DatasetError};
use crate::io::{
    stats_file_name, write_exponential_stats, write_power_law_stats, ExponentialStatsRow,
    PowerLawStatsRow,
};
use crate::plot::{
    draw_exponential_comparison, draw_power_law_comparison, exponential_series, power_law_series,
    SiteSeries,
};

/// Everything a comparison produced.
#[derive(Debug, Clone)]
pub struct Comparison<R> {
    pub sites: Vec<SiteResult<R>>,
    pub series: Vec<SiteSeries>,
    pub stats_path: PathBuf,
    pub plot_path: PathBuf,
}

impl<R> Comparison<R> {
    pub fn live_sites(&self) -> usize {
        self.sites.iter().filter(|s| !s.is_dead()).count()
    }
}

/// Run the exponential path for every site, in site order.
pub fn evaluate_exponential(
    sites: &[SiteSpec],
    load: &LoadOptions,
    binning: &BinningConfig,
) -> Result<Vec<SiteResult<ExponentialRun>>, AppError> {
    load.validate()?;
    binning.validate()?;
    evaluate(sites, |path| run_exponential(path, load, binning))
}

/// Run the power-law path for every site, in site order.
pub fn evaluate_power_law(
    sites: &[SiteSpec],
    load: &LoadOptions,
    cfg: &PowerLawConfig,
) -> Result<Vec<SiteResult<PowerLawRun>>, AppError> {
    load.validate()?;
    cfg.validate()?;
    evaluate(sites, |path| run_power_law(path, load, cfg))
}

pub fn compare_exponential(
    sites: &[SiteSpec],
    load: &LoadOptions,
    binning: &BinningConfig,
    plot_path: &Path,
) -> Result<Comparison<ExponentialRun>, AppError> {
    let results = evaluate_exponential(sites, load, binning)?;
    let stats_path = stats_path_for(plot_path, sites, ModelKind::Exponential);

    let rows: Vec<ExponentialStatsRow> = results.iter().map(ExponentialStatsRow::from_site).collect();
    write_exponential_stats(&stats_path, &rows)?;

    let series = exponential_series(&results, binning);
    draw_exponential_comparison(plot_path, &series, binning)?;

    info!(stats = %stats_path.display(), "wrote rock abundance statistics");
    Ok(Comparison {
        sites: results,
        series,
        stats_path,
        plot_path: plot_path.to_path_buf(),
    })
}

pub fn compare_power_law(
    sites: &[SiteSpec],
    load: &LoadOptions,
    cfg: &PowerLawConfig,
    plot_path: &Path,
) -> Result<Comparison<PowerLawRun>, AppError> {
    let results = evaluate_power_law(sites, load, cfg)?;
    let stats_path = stats_path_for(plot_path, sites, ModelKind::PowerLaw);

    let rows: Vec<PowerLawStatsRow> = results.iter().map(PowerLawStatsRow::from_site).collect();
    write_power_law_stats(&stats_path, &rows)?;

    let series = power_law_series(&results);
    draw_power_law_comparison(plot_path, &series)?;

    info!(stats = %stats_path.display(), "wrote power-law statistics");
    Ok(Comparison {
        sites: results,
        series,
        stats_path,
        plot_path: plot_path.to_path_buf(),
    })
}

/// Statistics file next to the plot, named after the site labels.
pub fn stats_path_for(plot_path: &Path, sites: &[SiteSpec], kind: ModelKind) -> PathBuf {
    let labels: Vec<&str> = sites.iter().map(|s| s.label.as_str()).collect();
    let dir = plot_path.parent().unwrap_or_else(|| Path::new(""));
    dir.join(stats_file_name(&labels, kind))
}

fn evaluate<R, F>(sites: &[SiteSpec], run: F) -> Result<Vec<SiteResult<R>>, AppError>
where
    R: Send,
    F: Fn(&Path) -> Result<R, DatasetError> + Sync,
{
    if sites.is_empty() {
        return Err(AppError::new(2, "No sites to compare."));
    }

    // par_iter().map().collect() keeps the input order.
    let results: Vec<SiteResult<R>> = sites
        .par_iter()
        .map(|site| SiteResult {
            label: site.label.clone(),
            source: site.path.clone(),
            outcome: run(&site.path),
        })
        .collect();

    for site in &results {
        if let Err(e) = &site.outcome {
            if !e.is_recoverable() {
                return Err(AppError::from(e.clone()));
            }
            warn!(site = %site.label, error = %e, "site has no usable data");
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_file_sits_next_to_the_plot() {
        let sites: Vec<SiteSpec> = ["Site_A=a.csv", "Site_B=b.csv"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let p = stats_path_for(Path::new("out/figs/cmp.svg"), &sites, ModelKind::Exponential);
        assert_eq!(p, PathBuf::from("out/figs/Site_A_vs_Site_B_RA_Statistics.csv"));
        let p = stats_path_for(Path::new("cmp.svg"), &sites, ModelKind::PowerLaw);
        assert_eq!(p, PathBuf::from("Site_A_vs_Site_B_Power_Law_Statistics.csv"));
    }

    #[test]
    fn no_sites_is_a_config_error() {
        let err = evaluate_exponential(&[], &LoadOptions::default(), &BinningConfig::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
