//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - partitions and boulder measurements (`ImagePartition`, `BoulderMeasurement`)
//! - per-site datasets and curves (`Dataset`, `CfaBin`)
//! - fit outputs and per-site results (`ExponentialFit`, `ExponentialRun`, `SiteResult`, ...)
//! - run configuration (`BinningConfig`, `SchedulerConfig`, ...)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
