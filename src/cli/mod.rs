//! Command-line parsing for the `rocks` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! aggregation/fitting code. Every option can also come from a `ROCKS_*`
//! environment variable (or a `.env` file).

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{
    BinningConfig, ColumnLayout, LoadOptions, PowerLawConfig, SchedulerConfig, SiteSpec,
    DEFAULT_RESOLUTION,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rocks", version, about = "Rock abundance and boulder size-frequency analysis")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "ROCKS_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the exponential rock-abundance model to each site and compare.
    Exp(ExpArgs),
    /// Fit a power law to each site's cumulative boulder counts and compare.
    Power(PowerArgs),
    /// Run boulder detection over every partition of an image.
    Run(RunArgs),
    /// Write a synthetic site drawn from the exponential model.
    Simulate(SimulateArgs),
}

/// Site selection, loading and output options shared by `exp` and `power`.
#[derive(Debug, Args, Clone)]
pub struct SiteArgs {
    /// Site to compare, as LABEL=PATH. Repeat for each site.
    #[arg(long = "site", value_name = "LABEL=PATH", required = true)]
    pub sites: Vec<SiteSpec>,

    /// Comparison plot (SVG). Statistics CSV is written next to it.
    #[arg(long, value_name = "SVG", env = "ROCKS_OUT")]
    pub out: PathBuf,

    /// Zero-based column of the boulder diameter.
    #[arg(long, default_value_t = 0, env = "ROCKS_DIAMETER_COL")]
    pub diameter_col: usize,

    /// Zero-based column of the flag.
    #[arg(long, default_value_t = 1, env = "ROCKS_FLAG_COL")]
    pub flag_col: usize,

    /// Zero-based column of the reference area.
    #[arg(long, default_value_t = 2, env = "ROCKS_AREA_COL")]
    pub area_col: usize,

    /// Image resolution (m/pixel).
    #[arg(long, default_value_t = DEFAULT_RESOLUTION, env = "ROCKS_RESOLUTION")]
    pub resolution: f64,

    /// Reference area (m²) replacing the one in the data.
    #[arg(long, value_name = "M2", env = "ROCKS_AREA")]
    pub area: Option<f64>,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

impl SiteArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            columns: ColumnLayout {
                diameter: self.diameter_col,
                flag: self.flag_col,
                area: self.area_col,
            },
            resolution: self.resolution,
            area_override: self.area,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ExpArgs {
    #[command(flatten)]
    pub common: SiteArgs,

    /// Smallest binning threshold (m).
    #[arg(long, default_value_t = 0.45, env = "ROCKS_MIN_SIZE")]
    pub min_size: f64,

    /// Largest binning threshold (m).
    #[arg(long, default_value_t = 5.45, env = "ROCKS_MAX_SIZE")]
    pub max_size: f64,

    /// Number of evenly spaced thresholds.
    #[arg(long, default_value_t = 100, env = "ROCKS_BINS")]
    pub bins: usize,

    /// Lower end of the fit range (m).
    #[arg(long, default_value_t = 0.4, env = "ROCKS_FIT_MIN")]
    pub fit_min: f64,

    /// Upper end of the fit range (m).
    #[arg(long, default_value_t = 4.5, env = "ROCKS_FIT_MAX")]
    pub fit_max: f64,
}

impl ExpArgs {
    pub fn binning(&self) -> BinningConfig {
        BinningConfig {
            min_size: self.min_size,
            max_size: self.max_size,
            num_bins: self.bins,
            fit_min: self.fit_min,
            fit_max: self.fit_max,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct PowerArgs {
    #[command(flatten)]
    pub common: SiteArgs,

    /// Diameters below this are discarded (m).
    #[arg(long, default_value_t = 0.05, env = "ROCKS_POWER_MIN_SIZE")]
    pub min_size: f64,

    /// Lower end of the count/area prediction range (m).
    #[arg(long, default_value_t = 0.05, env = "ROCKS_PREDICT_MIN")]
    pub predict_min: f64,
}

impl PowerArgs {
    pub fn power_law(&self) -> PowerLawConfig {
        PowerLawConfig {
            min_size: self.min_size,
            predict_min: self.predict_min,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Directory holding one sub-directory per image root name.
    #[arg(long, value_name = "DIR", env = "ROCKS_IMAGES")]
    pub images: PathBuf,

    /// Image root name; partitions are `<name>0`, `<name>1`, ...
    #[arg(long, env = "ROCKS_NAME")]
    pub name: String,

    /// Record store directory; each boundary fraction gets `frac_<n>/`.
    #[arg(long, value_name = "DIR", env = "ROCKS_STORE")]
    pub store: PathBuf,

    /// Ceiling on concurrently active partition workers.
    #[arg(long, default_value_t = 16, env = "ROCKS_THREAD_LIMIT")]
    pub thread_limit: usize,

    /// First partition to process (resuming a broken run).
    #[arg(long, default_value_t = 0, env = "ROCKS_START_AT")]
    pub start_at: usize,

    /// Boundary fraction; repeat to run once per value.
    #[arg(long = "frac", default_values_t = [15.0])]
    pub fracs: Vec<f64>,

    /// Centre distance (m) under which detections from neighbouring
    /// partitions are merged.
    #[arg(long, default_value_t = 0.5, env = "ROCKS_OVERLAP_TOLERANCE")]
    pub overlap_tolerance: f64,

    /// Export all records to a `diameter,flag,area` CSV after each run.
    #[arg(long, value_name = "CSV")]
    pub export_gis: Option<PathBuf>,
}

impl RunArgs {
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            thread_limit: self.thread_limit,
            start_at: self.start_at,
            boundary_fraction: self.fracs.first().copied().unwrap_or(15.0),
            overlap_tolerance: self.overlap_tolerance,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output dataset CSV.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Rock abundance `k` (fraction, e.g. 0.07).
    #[arg(long, short = 'k')]
    pub rock_abundance: f64,

    /// Reference area (m²).
    #[arg(long, default_value_t = 10_000.0)]
    pub area: f64,

    /// Smallest generated diameter (m).
    #[arg(long, default_value_t = 0.3)]
    pub min_diameter: f64,

    /// Largest generated diameter (m).
    #[arg(long, default_value_t = 6.0)]
    pub max_diameter: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
