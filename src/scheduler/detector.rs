//! Detection collaborator seam.
//!
//! Shadow segmentation and boulder-shape detection live behind
//! [`PartitionDetector`]. The scheduler only relies on the contract:
//! segmentation either succeeds (possibly with nothing in it) or fails, and
//! detection turns a successful segmentation into candidate boulders.

use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::domain::ImagePartition;
use crate::io::RowError;

/// A boulder as reported by detection, before overlap resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCandidate {
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
    pub flag: f64,
}

/// Result of the segmentation step for one partition.
#[derive(Debug)]
pub enum SegmentOutcome<S> {
    /// Shadows found; detection should run on them.
    Ready(S),
    /// Segmentation worked but the partition has no shadows.
    Blank,
    /// Segmentation failed; the partition is skipped.
    Failed(String),
}

/// Per-partition detection, called concurrently from worker threads.
pub trait PartitionDetector: Send + Sync + 'static {
    type Segment: Send;

    fn segment(
        &self,
        partition: &ImagePartition,
        boundary_fraction: f64,
    ) -> SegmentOutcome<Self::Segment>;

    fn detect(
        &self,
        partition: &ImagePartition,
        segment: Self::Segment,
    ) -> Result<Vec<ShadowCandidate>, String>;
}

/// Replays shadow measurements precomputed by an external segmentation run.
///
/// For partition stem `<dir>/<name><i>` it reads
/// `<dir>/<name><i>_frac<f>_shadows.csv` if present, else
/// `<dir>/<name><i>_shadows.csv`, with columns `x,y,diameter` in metres.
/// A missing file is a segmentation failure; a file without rows is blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDetector;

/// One row of a precomputed shadow file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ShadowRow {
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
}

impl FileDetector {
    fn shadow_paths(partition: &ImagePartition, boundary_fraction: f64) -> [PathBuf; 2] {
        let stem = partition.source.to_string_lossy();
        [
            PathBuf::from(format!("{stem}_frac{boundary_fraction}_shadows.csv")),
            PathBuf::from(format!("{stem}_shadows.csv")),
        ]
    }
}

impl PartitionDetector for FileDetector {
    type Segment = Vec<ShadowRow>;

    fn segment(
        &self,
        partition: &ImagePartition,
        boundary_fraction: f64,
    ) -> SegmentOutcome<Self::Segment> {
        let mut last_err = String::from("no shadow file");
        for path in Self::shadow_paths(partition, boundary_fraction) {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    last_err = format!("missing '{}'", path.display());
                    continue;
                }
                Err(e) => return SegmentOutcome::Failed(format!("'{}': {e}", path.display())),
            };

            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(file);
            let (rows, row_errors) = match read_shadow_rows(&mut reader) {
                Ok(parsed) => parsed,
                Err(e) => return SegmentOutcome::Failed(format!("'{}': {e}", path.display())),
            };
            for err in &row_errors {
                warn!(path = %path.display(), line = err.line, "{}", err.message);
            }

            return match (rows.is_empty(), row_errors.is_empty()) {
                (false, _) => SegmentOutcome::Ready(rows),
                (true, true) => SegmentOutcome::Blank,
                (true, false) => SegmentOutcome::Failed(format!(
                    "'{}': all {} rows invalid",
                    path.display(),
                    row_errors.len()
                )),
            };
        }
        SegmentOutcome::Failed(last_err)
    }

    fn detect(
        &self,
        _partition: &ImagePartition,
        segment: Self::Segment,
    ) -> Result<Vec<ShadowCandidate>, String> {
        Ok(segment
            .into_iter()
            .map(|r| ShadowCandidate {
                x: r.x,
                y: r.y,
                diameter: r.diameter,
                flag: 1.0,
            })
            .collect())
    }
}

/// Valid rows plus the ones skipped. Centres must be finite and diameters
/// finite and non-negative; a row that does not parse at all is skipped too.
fn read_shadow_rows<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
) -> Result<(Vec<ShadowRow>, Vec<RowError>), csv::Error> {
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = idx + 2;
        let record = record?;
        let row: ShadowRow = match record.deserialize(Some(&headers)) {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("unreadable shadow row: {e}"),
                });
                continue;
            }
        };
        if !(row.x.is_finite() && row.y.is_finite()) {
            row_errors.push(RowError {
                line,
                message: format!("non-finite centre ({}, {})", row.x, row.y),
            });
        } else if !(row.diameter.is_finite() && row.diameter >= 0.0) {
            row_errors.push(RowError {
                line,
                message: format!("invalid diameter {}", row.diameter),
            });
        } else {
            rows.push(row);
        }
    }
    Ok((rows, row_errors))
}
