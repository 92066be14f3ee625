//! Result exports.
//!
//! - per-site statistics CSVs (one row per site, readable back)
//! - partition records flattened into a dataset CSV for GIS tools and the loader
//! - the plain-text run info written after a scheduler run

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{
    BoulderMeasurement, Dataset, ExponentialRun, ModelKind, PowerLawRun, SchedulerConfig, SiteResult,
};
use crate::error::AppError;
use crate::scheduler::{RunParams, RunReport};

/// One row of `<sites>_RA_Statistics.csv`.
///
/// `rock_abundance` is empty for dead sites and failed fits; `r2` is 0 for a
/// failed fit and empty for a dead site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExponentialStatsRow {
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Best Fit RA")]
    pub rock_abundance: Option<f64>,
    #[serde(rename = "R^2 Value")]
    pub r2: Option<f64>,
}

impl ExponentialStatsRow {
    pub fn from_site(site: &SiteResult<ExponentialRun>) -> Self {
        let (rock_abundance, r2) = match &site.outcome {
            Ok(run) => match &run.fit {
                Ok(fit) => (Some(fit.k), Some(fit.r2)),
                Err(_) => (None, Some(0.0)),
            },
            Err(_) => (None, None),
        };
        Self {
            site: site.label.clone(),
            rock_abundance,
            r2,
        }
    }
}

/// One row of `<sites>_Power_Law_Statistics.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerLawStatsRow {
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "C (normalized)")]
    pub c: Option<f64>,
    #[serde(rename = "b (slope)")]
    pub b: Option<f64>,
    #[serde(rename = "R^2 Value")]
    pub r2: Option<f64>,
    #[serde(rename = "C (unnormalized)")]
    pub unnormalized_c: Option<f64>,
    #[serde(rename = "Predicted CNB [0.05 m, Dmax]")]
    pub predicted_count: Option<f64>,
    #[serde(rename = "Cumulative Fractional Area (%)")]
    pub predicted_area_pct: Option<f64>,
    #[serde(rename = "Measured Fractional Area (%)")]
    pub measured_area_pct: Option<f64>,
}

impl PowerLawStatsRow {
    pub fn from_site(site: &SiteResult<PowerLawRun>) -> Self {
        let mut row = Self {
            site: site.label.clone(),
            c: None,
            b: None,
            r2: None,
            unnormalized_c: None,
            predicted_count: None,
            predicted_area_pct: None,
            measured_area_pct: None,
        };
        if let Ok(run) = &site.outcome {
            match &run.fit {
                Ok(fit) => {
                    row.c = Some(fit.c);
                    row.b = Some(fit.b);
                    row.r2 = Some(fit.r2);
                }
                Err(_) => row.r2 = Some(0.0),
            }
            row.unnormalized_c = run.unnormalized_c;
            row.predicted_count = run.predicted_count;
            row.predicted_area_pct = run.predicted_area_pct;
            row.measured_area_pct = Some(run.measured_area_pct);
        }
        row
    }
}

/// `Site_A_vs_Site_B_RA_Statistics.csv` and friends.
pub fn stats_file_name(labels: &[&str], kind: ModelKind) -> String {
    let stem = labels.join("_vs_");
    match kind {
        ModelKind::Exponential => format!("{stem}_RA_Statistics.csv"),
        ModelKind::PowerLaw => format!("{stem}_Power_Law_Statistics.csv"),
    }
}

pub fn write_exponential_stats(path: &Path, rows: &[ExponentialStatsRow]) -> Result<(), AppError> {
    write_rows(path, rows)
}

pub fn read_exponential_stats(path: &Path) -> Result<Vec<ExponentialStatsRow>, AppError> {
    read_rows(path)
}

pub fn write_power_law_stats(path: &Path, rows: &[PowerLawStatsRow]) -> Result<(), AppError> {
    write_rows(path, rows)
}

pub fn read_power_law_stats(path: &Path) -> Result<Vec<PowerLawStatsRow>, AppError> {
    read_rows(path)
}

fn write_rows<R: Serialize>(path: &Path, rows: &[R]) -> Result<(), AppError> {
    let mut w = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create statistics CSV '{}': {e}", path.display())))?;
    for row in rows {
        w.serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write statistics CSV row: {e}")))?;
    }
    w.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush statistics CSV: {e}")))?;
    Ok(())
}

fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>, AppError> {
    let mut r = csv::Reader::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open statistics CSV '{}': {e}", path.display())))?;
    r.deserialize()
        .collect::<Result<Vec<R>, _>>()
        .map_err(|e| AppError::new(2, format!("Invalid statistics CSV '{}': {e}", path.display())))
}

/// Flatten partition records into a `diameter,flag,area` dataset CSV.
///
/// `area` is the total reference area of the run and is repeated on every
/// row, matching what the dataset loader expects. Returns the row count.
pub fn write_gis_dataset(
    path: &Path,
    records: &[BoulderMeasurement],
    area: f64,
) -> Result<usize, AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create GIS export '{}': {e}", path.display())))?;

    writeln!(file, "diameter,flag,area")
        .map_err(|e| AppError::new(2, format!("Failed to write GIS export header: {e}")))?;
    for r in records {
        writeln!(file, "{},{},{}", r.diameter, r.flag, area)
            .map_err(|e| AppError::new(2, format!("Failed to write GIS export row: {e}")))?;
    }
    Ok(records.len())
}

/// Write a dataset in the same `diameter,flag,area` layout.
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<usize, AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create dataset CSV '{}': {e}", path.display())))?;

    writeln!(file, "diameter,flag,area")
        .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV header: {e}")))?;
    for (d, flag) in dataset.diameters.iter().zip(&dataset.flags) {
        writeln!(file, "{d},{flag},{}", dataset.area)
            .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV row: {e}")))?;
    }
    Ok(dataset.len())
}

/// Write `<name>_runinfo.txt` describing one scheduler run.
pub fn write_run_info(
    path: &Path,
    params: &RunParams,
    config: &SchedulerConfig,
    report: &RunReport,
) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create run info '{}': {e}", path.display())))?;

    let body = format!(
        "Run info for {name}\n\
         Image ID: {image_id}\n\
         Started: {started}\n\
         Finished: {finished}\n\
         Total time (hours): {hours:.4}\n\
         Boundary fraction: {frac}\n\
         Thread limit: {threads}\n\
         Start at: {start}\n\
         Partitions: {partitions}\n\
         Partition area: {area}\n\
         Completed: {completed}\n\
         Blank: {blank}\n\
         Failed: {failed}\n\
         Measurements: {measurements}\n\
         Overlap duplicates dropped: {duplicates}\n",
        name = params.file_name,
        image_id = params.image_id,
        started = report.started.to_rfc3339(),
        finished = report.finished.to_rfc3339(),
        hours = report.elapsed_hours(),
        frac = config.boundary_fraction,
        threads = config.thread_limit,
        start = config.start_at,
        partitions = params.partitions,
        area = params
            .partition_area
            .map_or_else(|| "unknown".to_string(), |a| a.to_string()),
        completed = report.completed,
        blank = report.blank,
        failed = report.failed,
        measurements = report.measurements,
        duplicates = report.duplicates,
    );
    file.write_all(body.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write run info: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExponentialFit, PowerLawFit};
    use crate::error::{DatasetError, FitFailure};
    use std::path::PathBuf;

    fn exp_site(label: &str, fit: Result<ExponentialFit, FitFailure>) -> SiteResult<ExponentialRun> {
        SiteResult {
            label: label.to_string(),
            source: PathBuf::from(format!("{label}.csv")),
            outcome: Ok(ExponentialRun {
                area: 10.0,
                bins: Vec::new(),
                area_sigmas: Vec::new(),
                fit,
            }),
        }
    }

    #[test]
    fn file_names_join_labels() {
        assert_eq!(
            stats_file_name(&["Site_A", "Site_B"], ModelKind::Exponential),
            "Site_A_vs_Site_B_RA_Statistics.csv"
        );
        assert_eq!(
            stats_file_name(&["X"], ModelKind::PowerLaw),
            "X_Power_Law_Statistics.csv"
        );
    }

    #[test]
    fn exponential_rows_mark_failures() {
        let ok = ExponentialStatsRow::from_site(&exp_site("a", Ok(ExponentialFit { k: 0.07, r2: 0.98 })));
        assert_eq!(ok.rock_abundance, Some(0.07));

        let failed = ExponentialStatsRow::from_site(&exp_site("b", Err(FitFailure::EmptyRange)));
        assert_eq!((failed.rock_abundance, failed.r2), (None, Some(0.0)));

        let dead = ExponentialStatsRow::from_site(&SiteResult::<ExponentialRun> {
            label: "c".into(),
            source: PathBuf::from("c.csv"),
            outcome: Err(DatasetError::NotFound {
                path: PathBuf::from("c.csv"),
            }),
        });
        assert_eq!((dead.rock_abundance, dead.r2), (None, None));
    }

    #[test]
    fn power_law_stats_round_trip_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        let site = SiteResult {
            label: "Site_A".to_string(),
            source: PathBuf::from("a.csv"),
            outcome: Ok(PowerLawRun {
                area: 100.0,
                max_size: 3.1,
                curve: Vec::new(),
                fit: Ok(PowerLawFit {
                    c: 0.0123456789,
                    b: 2.7182818,
                    r2: 0.991,
                }),
                unnormalized_c: Some(1.23456789),
                predicted_count: Some(4321.5),
                predicted_area_pct: Some(-3.5),
                measured_area_pct: 11.25,
            }),
        };
        let rows = vec![PowerLawStatsRow::from_site(&site)];
        write_power_law_stats(&path, &rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "Site,C (normalized),b (slope),R^2 Value,C (unnormalized),\
             \"Predicted CNB [0.05 m, Dmax]\",Cumulative Fractional Area (%),\
             Measured Fractional Area (%)\n"
        ));
        assert_eq!(read_power_law_stats(&path).unwrap(), rows);
    }

    #[test]
    fn gis_export_is_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gis.csv");
        let records = vec![
            BoulderMeasurement {
                id: 0,
                partition: 0,
                x: 1.0,
                y: 2.0,
                diameter: 1.5,
                flag: 1.0,
            },
            BoulderMeasurement {
                id: 1,
                partition: 3,
                x: 9.0,
                y: 2.0,
                diameter: 0.75,
                flag: 1.0,
            },
        ];
        assert_eq!(write_gis_dataset(&path, &records, 640.0).unwrap(), 2);

        let ds = crate::io::load_dataset(&path, &crate::domain::LoadOptions::default()).unwrap();
        assert_eq!(ds.diameters, vec![1.5, 0.75]);
        assert_eq!(ds.area, 640.0);
    }
}
