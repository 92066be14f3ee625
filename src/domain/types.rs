//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the scheduler, the record store and the aggregators
//! - exported to CSV/JSON
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, FitFailure};

/// One rectangular sub-region of a source image, processed independently.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePartition {
    pub index: usize,
    /// Path stem of the partition's source data (detector-specific suffixes
    /// are appended by the detector).
    pub source: PathBuf,
    /// Reference area covered by the partition (m²).
    pub area: f64,
}

/// A boulder detected from its shadow, after overlap resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoulderMeasurement {
    /// Globally unique within one scheduler run.
    pub id: u64,
    pub partition: usize,
    /// Centre in scene coordinates (m).
    pub x: f64,
    pub y: f64,
    /// Diameter (m).
    pub diameter: f64,
    pub flag: f64,
}

/// Per-site input to the CFA aggregator.
///
/// Invariants (enforced by the loader): `area > 0`, every diameter `>= 0`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub diameters: Vec<f64>,
    pub flags: Vec<f64>,
    /// Total reference area (m²), from the data or an override.
    pub area: f64,
    /// Image resolution (m/pixel), for measurement uncertainty.
    pub resolution: f64,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.diameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diameters.is_empty()
    }
}

/// One point of a cumulative curve: threshold diameter and cumulative value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CfaBin {
    pub diameter: f64,
    pub value: f64,
}

/// Model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Exponential,
    PowerLaw,
}

/// Fitted exponential model: rock abundance `k` and its R².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialFit {
    pub k: f64,
    pub r2: f64,
}

/// Fitted power law `N = C·D^(-b)` and its R² in log-log space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawFit {
    pub c: f64,
    pub b: f64,
    pub r2: f64,
}

/// Output of the exponential-model path for one dataset.
#[derive(Debug, Clone)]
pub struct ExponentialRun {
    pub area: f64,
    /// Evenly spaced thresholds with the CFA above each.
    pub bins: Vec<CfaBin>,
    /// Per-boulder area uncertainty, same order as the dataset.
    pub area_sigmas: Vec<f64>,
    pub fit: Result<ExponentialFit, FitFailure>,
}

/// Output of the power-law path for one dataset.
#[derive(Debug, Clone)]
pub struct PowerLawRun {
    pub area: f64,
    /// Largest diameter at or above the minimum size.
    pub max_size: f64,
    /// Distinct diameters (descending) with the area-normalised cumulative count.
    pub curve: Vec<CfaBin>,
    /// Fit against the normalised curve (reported and plotted).
    pub fit: Result<PowerLawFit, FitFailure>,
    /// `C` from the fit against raw cumulative counts.
    pub unnormalized_c: Option<f64>,
    /// Predicted boulder count over `[predict_min, max_size]`.
    pub predicted_count: Option<f64>,
    /// Integrated power-law fractional area (%). Unvalidated.
    pub predicted_area_pct: Option<f64>,
    /// Fractional area (%) actually covered by the measured boulders.
    pub measured_area_pct: f64,
}

/// Result for one site of a comparison.
///
/// A site whose dataset could not be loaded keeps its error so the row can be
/// reported as dead while the other sites carry on.
#[derive(Debug, Clone)]
pub struct SiteResult<R> {
    pub label: String,
    pub source: PathBuf,
    pub outcome: Result<R, DatasetError>,
}

impl<R> SiteResult<R> {
    pub fn is_dead(&self) -> bool {
        self.outcome.is_err()
    }
}
