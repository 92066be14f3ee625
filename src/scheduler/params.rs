//! Run parameters: what to schedule for a dataset root name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::ImagePartition;
use crate::error::AppError;

/// File-naming metadata and partition count for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub file_name: String,
    pub image_id: String,
    /// Directory holding the partition inputs and run outputs.
    pub root: PathBuf,
    pub partitions: usize,
    /// Reference area of one partition (m²), when known.
    pub partition_area: Option<f64>,
}

impl RunParams {
    /// The partition at `index`; its source is the stem `<root>/<name><index>`.
    pub fn partition(&self, index: usize) -> ImagePartition {
        ImagePartition {
            index,
            source: self.root.join(format!("{}{index}", self.file_name)),
            area: self.partition_area.unwrap_or(f64::NAN),
        }
    }

    /// Total reference area across all partitions.
    pub fn total_area(&self) -> Option<f64> {
        self.partition_area.map(|a| a * self.partitions as f64)
    }

    pub fn run_info_path(&self) -> PathBuf {
        self.root.join(format!("{}_runinfo.txt", self.file_name))
    }
}

/// Resolves a dataset root name into [`RunParams`].
pub trait RunParamsSource {
    fn run_params(&self, name: &str) -> Result<RunParams, AppError>;
}

/// Looks under `<images>/<name>/` for consecutive partition inputs
/// `<name>0_shadows.csv`, `<name>1_shadows.csv`, ... and an optional
/// `<name>_params.json` with `image_id` and `partition_area`.
#[derive(Debug, Clone)]
pub struct DirectoryRunParams {
    images: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct ParamsFile {
    image_id: Option<String>,
    partition_area: Option<f64>,
}

impl DirectoryRunParams {
    pub fn new(images: impl Into<PathBuf>) -> Self {
        Self {
            images: images.into(),
        }
    }

    fn read_params_file(path: &Path) -> Result<ParamsFile, AppError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no params file");
                return Ok(ParamsFile::default());
            }
            Err(e) => {
                return Err(AppError::new(
                    2,
                    format!("Failed to read params '{}': {e}", path.display()),
                ));
            }
        };
        serde_json::from_str(&text)
            .map_err(|e| AppError::new(2, format!("Invalid params '{}': {e}", path.display())))
    }
}

impl RunParamsSource for DirectoryRunParams {
    fn run_params(&self, name: &str) -> Result<RunParams, AppError> {
        let root = self.images.join(name);
        if !root.is_dir() {
            return Err(AppError::new(
                2,
                format!("Image directory '{}' not found.", root.display()),
            ));
        }

        let partitions = (0..)
            .take_while(|i| root.join(format!("{name}{i}_shadows.csv")).exists())
            .count();
        if partitions == 0 {
            return Err(AppError::new(
                3,
                format!("No partitions named '{name}<N>_shadows.csv' in '{}'.", root.display()),
            ));
        }

        let params = Self::read_params_file(&root.join(format!("{name}_params.json")))?;
        if let Some(area) = params.partition_area {
            if !(area.is_finite() && area > 0.0) {
                return Err(AppError::new(
                    2,
                    format!("Partition area {area} must be finite and > 0."),
                ));
            }
        }

        let run = RunParams {
            file_name: name.to_string(),
            image_id: params.image_id.unwrap_or_else(|| name.to_string()),
            root,
            partitions,
            partition_area: params.partition_area,
        };
        info!(
            name = %run.file_name,
            image_id = %run.image_id,
            partitions = run.partitions,
            "run parameters"
        );
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_consecutive_partitions_and_reads_area() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ESP_X");
        fs::create_dir(&root).unwrap();
        for i in [0, 1, 2, 4] {
            fs::write(root.join(format!("ESP_X{i}_shadows.csv")), "x,y,diameter\n").unwrap();
        }
        fs::write(
            root.join("ESP_X_params.json"),
            r#"{"image_id": "ESP_036925_1985", "partition_area": 250.0}"#,
        )
        .unwrap();

        let params = DirectoryRunParams::new(dir.path()).run_params("ESP_X").unwrap();
        assert_eq!(params.partitions, 3);
        assert_eq!(params.image_id, "ESP_036925_1985");
        assert_eq!(params.total_area(), Some(750.0));
        assert_eq!(params.partition(2).source, root.join("ESP_X2"));
    }

    #[test]
    fn missing_directory_or_partitions_fail() {
        let dir = tempfile::tempdir().unwrap();
        let src = DirectoryRunParams::new(dir.path());
        assert_eq!(src.run_params("nope").unwrap_err().exit_code(), 2);

        fs::create_dir(dir.path().join("EMPTY")).unwrap();
        assert_eq!(src.run_params("EMPTY").unwrap_err().exit_code(), 3);
    }
}
