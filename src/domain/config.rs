//! Run configuration.
//!
//! Every tunable lives in one of these immutable values and is threaded
//! through the calls that need it. Each type validates itself; a malformed
//! value is a fatal configuration error (exit code 2).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// HiRISE resolution used for the Sisilla Mensa survey (m/pixel).
pub const DEFAULT_RESOLUTION: f64 = 0.2867573175;

/// Binning and fit range for the exponential-model path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinningConfig {
    pub min_size: f64,
    pub max_size: f64,
    pub num_bins: usize,
    /// Inclusive diameter range used for the fit, independent of binning.
    pub fit_min: f64,
    pub fit_max: f64,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            min_size: 0.45,
            max_size: 5.45,
            num_bins: 100,
            fit_min: 0.4,
            fit_max: 4.5,
        }
    }
}

impl BinningConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        check_size_range("binning", self.min_size, self.max_size)?;
        if self.num_bins == 0 {
            return Err(AppError::new(2, "Bin count must be > 0."));
        }
        if !(self.fit_min.is_finite() && self.fit_max.is_finite() && self.fit_min <= self.fit_max) {
            return Err(AppError::new(
                2,
                format!(
                    "Invalid fit range [{}, {}] (must be finite with min <= max).",
                    self.fit_min, self.fit_max
                ),
            ));
        }
        Ok(())
    }
}

/// Settings for the power-law path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawConfig {
    /// Diameters below this are discarded before ranking (m).
    pub min_size: f64,
    /// Lower bound of the prediction/integration range (m).
    pub predict_min: f64,
}

impl Default for PowerLawConfig {
    fn default() -> Self {
        // 5 cm: the practical lower limit for shadow-derived measurements.
        Self {
            min_size: 0.05,
            predict_min: 0.05,
        }
    }
}

impl PowerLawConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.min_size.is_finite() && self.min_size > 0.0) {
            return Err(AppError::new(2, "Power-law minimum size must be finite and > 0."));
        }
        if !(self.predict_min.is_finite() && self.predict_min > 0.0) {
            return Err(AppError::new(2, "Prediction minimum diameter must be finite and > 0."));
        }
        Ok(())
    }
}

/// Zero-based CSV column positions; callers disagree on layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub diameter: usize,
    pub flag: usize,
    pub area: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            diameter: 0,
            flag: 1,
            area: 2,
        }
    }
}

/// How a site dataset is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub columns: ColumnLayout,
    pub resolution: f64,
    /// Replaces the area read from the data when set.
    pub area_override: Option<f64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnLayout::default(),
            resolution: DEFAULT_RESOLUTION,
            area_override: None,
        }
    }
}

impl LoadOptions {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.resolution.is_finite() && self.resolution >= 0.0) {
            return Err(AppError::new(2, "Resolution must be finite and >= 0."));
        }
        if let Some(area) = self.area_override {
            if !(area.is_finite() && area > 0.0) {
                return Err(AppError::new(
                    2,
                    format!("Area override {area} must be finite and > 0."),
                ));
            }
        }
        Ok(())
    }
}

/// A site to compare: label plus dataset path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub label: String,
    pub path: PathBuf,
}

impl std::str::FromStr for SiteSpec {
    type Err = String;

    /// Parse `LABEL=PATH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected LABEL=PATH, got '{s}'"))?;
        let label = label.trim();
        let path = path.trim();
        if label.is_empty() || path.is_empty() {
            return Err(format!("expected LABEL=PATH, got '{s}'"));
        }
        Ok(Self {
            label: label.to_string(),
            path: PathBuf::from(path),
        })
    }
}

/// Partition scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Ceiling on concurrently active workers, and the join-lag window.
    pub thread_limit: usize,
    /// First partition index to dispatch (for resuming broken runs).
    pub start_at: usize,
    /// Boundary fraction handed to the segmentation step.
    pub boundary_fraction: f64,
    /// Centre distance (m) under which detections from different partitions
    /// are the same boulder.
    pub overlap_tolerance: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_limit: 16,
            start_at: 0,
            boundary_fraction: 15.0,
            overlap_tolerance: 0.5,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.thread_limit == 0 {
            return Err(AppError::new(2, "Worker ceiling (thread limit) must be > 0."));
        }
        if !self.boundary_fraction.is_finite() || self.boundary_fraction < 0.0 {
            return Err(AppError::new(2, "Boundary fraction must be finite and >= 0."));
        }
        if !self.overlap_tolerance.is_finite() || self.overlap_tolerance < 0.0 {
            return Err(AppError::new(2, "Overlap tolerance must be finite and >= 0."));
        }
        Ok(())
    }
}

fn check_size_range(what: &str, min: f64, max: f64) -> Result<(), AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid {what} size range: min={min}, max={max} (must be finite, >0, and max>min)."),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BinningConfig::default().validate().unwrap();
        PowerLawConfig::default().validate().unwrap();
        LoadOptions::default().validate().unwrap();
        SchedulerConfig::default().validate().unwrap();
    }

    #[test]
    fn malformed_values_are_fatal() {
        let bad = SchedulerConfig {
            thread_limit: 0,
            ..Default::default()
        };
        assert_eq!(bad.validate().unwrap_err().exit_code(), 2);

        let bad = LoadOptions {
            area_override: Some(-1.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let bad = BinningConfig {
            min_size: 2.0,
            max_size: 1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn site_spec_parses_label_and_path() {
        let s: SiteSpec = "Site_A_Composite=data/Site A.csv".parse().unwrap();
        assert_eq!(s.label, "Site_A_Composite");
        assert_eq!(s.path, PathBuf::from("data/Site A.csv"));
        assert!("no-separator".parse::<SiteSpec>().is_err());
    }
}
