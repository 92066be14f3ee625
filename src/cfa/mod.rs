//! CFA aggregation.
//!
//! Turns per-boulder diameters into the curves the fitter consumes:
//!
//! - evenly spaced thresholds with cumulative fractional area (`binning`)
//! - distinct diameters with cumulative counts (`ranking`)

pub mod binning;
pub mod ranking;

pub use binning::*;
pub use ranking::*;
