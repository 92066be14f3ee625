//! Site dataset CSV ingest.
//!
//! Turns a boulder list CSV (header row, then numeric columns at caller-chosen
//! positions for diameter, flag and area) into a validated [`Dataset`].
//!
//! Design goals:
//! - **Positional schema**: callers disagree on column layout, so positions
//!   come from [`ColumnLayout`] rather than header names
//! - **Row-level validation**: bad rows are skipped and reported, not fatal
//! - **Typed failures**: a missing or empty file is a [`DatasetError`] the
//!   comparator can degrade on

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{ColumnLayout, Dataset, LoadOptions};
use crate::error::DatasetError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the dataset plus what was skipped on the way.
#[derive(Debug, Clone)]
pub struct IngestedDataset {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a dataset, logging skipped rows.
pub fn load_dataset(path: &Path, opts: &LoadOptions) -> Result<Dataset, DatasetError> {
    let ingested = read_dataset(path, opts)?;
    for err in &ingested.row_errors {
        warn!(path = %path.display(), line = err.line, "{}", err.message);
    }
    Ok(ingested.dataset)
}

/// Load a dataset and return the row-level diagnostics alongside it.
pub fn read_dataset(path: &Path, opts: &LoadOptions) -> Result<IngestedDataset, DatasetError> {
    info!(path = %path.display(), "reading dataset");
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DatasetError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DatasetError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut diameters = Vec::new();
    let mut flags = Vec::new();
    let mut first_area: Option<f64> = None;
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header; CSV lines are 1-based.
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows_read += 1;

        match parse_row(&record, &opts.columns) {
            Ok(row) => {
                if first_area.is_none() {
                    first_area = Some(row.area);
                }
                diameters.push(row.diameter);
                flags.push(row.flag);
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    debug!(rows = rows_read, used = diameters.len(), skipped = row_errors.len(), "dataset shape");

    if diameters.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }

    // The reference area is carried on every row; the first one is used.
    let area = opts.area_override.or(first_area).unwrap_or(f64::NAN);
    if !(area.is_finite() && area > 0.0) {
        return Err(DatasetError::InvalidArea {
            path: path.to_path_buf(),
            area,
        });
    }

    Ok(IngestedDataset {
        dataset: Dataset {
            source: path.to_path_buf(),
            diameters,
            flags,
            area,
            resolution: opts.resolution,
        },
        row_errors,
        rows_read,
    })
}

struct DatasetRow {
    diameter: f64,
    flag: f64,
    area: f64,
}

fn parse_row(record: &StringRecord, columns: &ColumnLayout) -> Result<DatasetRow, String> {
    let diameter = get_f64(record, columns.diameter, "diameter")?;
    if diameter < 0.0 {
        return Err(format!("Negative diameter {diameter}."));
    }
    let flag = get_f64(record, columns.flag, "flag")?;
    let area = get_f64(record, columns.area, "area")?;
    Ok(DatasetRow {
        diameter,
        flag,
        area,
    })
}

fn get_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{name}` value (column {idx})."))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_diameters_and_first_row_area() {
        let file = write_csv("diameter,flag,area\n0.5,1,100\n1.5,1,100\n2.0,0,100\n");
        let ds = load_dataset(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.diameters, vec![0.5, 1.5, 2.0]);
        assert_eq!(ds.flags, vec![1.0, 1.0, 0.0]);
        assert_eq!(ds.area, 100.0);
    }

    #[test]
    fn honours_column_positions_and_area_override() {
        let file = write_csv("area,junk,diameter,flag\n50,x,1.2,1\n50,y,0.8,1\n");
        let opts = LoadOptions {
            columns: ColumnLayout {
                diameter: 2,
                flag: 3,
                area: 0,
            },
            area_override: Some(400.0),
            ..Default::default()
        };
        let ds = load_dataset(file.path(), &opts).unwrap();
        assert_eq!(ds.diameters, vec![1.2, 0.8]);
        assert_eq!(ds.area, 400.0);
    }

    #[test]
    fn skips_bad_rows_and_reports_them() {
        let file = write_csv("d,f,a\n1.0,1,10\nabc,1,10\n-2.0,1,10\n3.0,1\n");
        let ingested = read_dataset(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ingested.dataset.diameters, vec![1.0]);
        assert_eq!(ingested.row_errors.len(), 3);
        assert_eq!(ingested.row_errors[0].line, 3);
        assert_eq!(ingested.rows_read, 4);
    }

    #[test]
    fn missing_and_empty_files_are_typed() {
        let missing = Path::new("/definitely/not/here.csv");
        assert!(matches!(
            load_dataset(missing, &LoadOptions::default()),
            Err(DatasetError::NotFound { .. })
        ));

        let file = write_csv("diameter,flag,area\n");
        assert!(matches!(
            load_dataset(file.path(), &LoadOptions::default()),
            Err(DatasetError::Empty { .. })
        ));
    }

    #[test]
    fn non_positive_area_is_rejected() {
        let file = write_csv("diameter,flag,area\n1.0,1,0\n");
        let err = load_dataset(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidArea { .. }));
        assert!(!err.is_recoverable());
    }
}
