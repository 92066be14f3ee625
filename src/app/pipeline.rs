//! Shared "partition run" logic behind `rocks run`.
//!
//! One scheduler run per boundary fraction:
//! params -> record store `frac_<n>/` -> scheduler -> run info -> optional GIS export
//!
//! The CLI layer only prints what comes back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::domain::SchedulerConfig;
use crate::error::AppError;
use crate::io::export::{write_gis_dataset, write_run_info};
use crate::io::{DirectoryStore, MeasurementStore};
use crate::scheduler::{PartitionDetector, PartitionScheduler, RunParams, RunParamsSource, RunReport};

/// Inputs of a multi-fraction partition run.
#[derive(Debug, Clone)]
pub struct PartitionRunConfig {
    pub name: String,
    /// Parent of the per-fraction record stores.
    pub store_root: PathBuf,
    /// `boundary_fraction` is replaced by each entry of `fracs`.
    pub scheduler: SchedulerConfig,
    pub fracs: Vec<f64>,
    pub export_gis: Option<PathBuf>,
}

/// Outputs of one boundary-fraction run.
#[derive(Debug, Clone)]
pub struct FracRun {
    pub config: SchedulerConfig,
    pub params: RunParams,
    pub report: RunReport,
    pub store_dir: PathBuf,
    pub run_info: PathBuf,
    /// GIS export path and row count.
    pub gis: Option<(PathBuf, usize)>,
}

/// Run the scheduler once per boundary fraction, in the order given.
pub fn run_partitions<D, S>(
    cfg: &PartitionRunConfig,
    source: &S,
    detector: Arc<D>,
) -> Result<Vec<FracRun>, AppError>
where
    D: PartitionDetector,
    S: RunParamsSource + ?Sized,
{
    if cfg.fracs.is_empty() {
        return Err(AppError::new(2, "At least one boundary fraction is required."));
    }
    let params = source.run_params(&cfg.name)?;

    let mut runs = Vec::with_capacity(cfg.fracs.len());
    for &frac in &cfg.fracs {
        let config = SchedulerConfig {
            boundary_fraction: frac,
            ..cfg.scheduler
        };
        let store_dir = cfg.store_root.join(format!("frac_{frac}"));
        let store = Arc::new(DirectoryStore::create(&store_dir)?);

        let scheduler = PartitionScheduler::new(
            config,
            Arc::clone(&detector),
            Arc::clone(&store) as Arc<dyn MeasurementStore>,
        )?;
        let report = scheduler.run(&params)?;

        let run_info = store_dir.join(format!("{}_runinfo.txt", params.file_name));
        write_run_info(&run_info, &params, &config, &report)?;

        let gis = match &cfg.export_gis {
            Some(path) => {
                let path = gis_path_for(path, frac, cfg.fracs.len());
                let rows = export_gis(store.as_ref(), &params, &path)?;
                Some((path, rows))
            }
            None => None,
        };

        runs.push(FracRun {
            config,
            params: params.clone(),
            report,
            store_dir,
            run_info,
            gis,
        });
    }
    Ok(runs)
}

/// Flatten a store into a loadable dataset CSV.
pub fn export_gis(
    store: &dyn MeasurementStore,
    params: &RunParams,
    path: &Path,
) -> Result<usize, AppError> {
    let area = params.total_area().ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "GIS export needs a partition area; add it to '{}_params.json'.",
                params.file_name
            ),
        )
    })?;
    let records = store.read_all()?;
    let rows = write_gis_dataset(path, &records, area)?;
    info!(path = %path.display(), rows, area, "wrote GIS export");
    Ok(rows)
}

/// With several fractions the export path gets a `_frac<n>` suffix.
fn gis_path_for(path: &Path, frac: f64, runs: usize) -> PathBuf {
    if runs <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_frac{frac}.{}", ext.to_string_lossy()),
        None => format!("{stem}_frac{frac}"),
    };
    path.with_file_name(name)
}
