//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - dispatches to the comparison, scheduler or simulation paths
//! - prints reports/plots

use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};

use crate::cli::{Cli, Command, ExpArgs, PowerArgs, RunArgs, SiteArgs, SimulateArgs};
use crate::compare::{compare_exponential, compare_power_law, Comparison};
use crate::data::{synthetic_site, SyntheticSpec};
use crate::error::AppError;
use crate::io::export::write_dataset_csv;
use crate::plot::render_ascii_comparison;
use crate::report::{format_exponential_summary, format_power_law_summary, format_run_report};
use crate::scheduler::{DirectoryRunParams, FileDetector};

pub mod pipeline;

/// Entry point for the `rocks` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::telemetry::init_tracing(cli.log_json, log_level(cli.verbose));

    match cli.command {
        Command::Exp(args) => handle_exp(args),
        Command::Power(args) => handle_power(args),
        Command::Run(args) => handle_run(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn handle_exp(args: ExpArgs) -> Result<(), AppError> {
    let binning = args.binning();
    let cmp = compare_exponential(
        &args.common.sites,
        &args.common.load_options(),
        &binning,
        &args.common.out,
    )?;

    println!("{}", format_exponential_summary(&cmp.sites, &binning));
    finish_comparison(&cmp, &args.common)
}

fn handle_power(args: PowerArgs) -> Result<(), AppError> {
    let cfg = args.power_law();
    let cmp = compare_power_law(
        &args.common.sites,
        &args.common.load_options(),
        &cfg,
        &args.common.out,
    )?;

    println!("{}", format_power_law_summary(&cmp.sites, &cfg));
    finish_comparison(&cmp, &args.common)
}

/// Terminal plot and output paths, then the exit status for dead comparisons.
fn finish_comparison<R>(cmp: &Comparison<R>, common: &SiteArgs) -> Result<(), AppError> {
    if !common.no_plot {
        println!(
            "{}",
            render_ascii_comparison(&cmp.series, common.width, common.height)
        );
    }
    println!("Plot: {}", cmp.plot_path.display());
    println!("Statistics: {}", cmp.stats_path.display());

    if cmp.live_sites() == 0 {
        return Err(AppError::new(3, "No site produced any data."));
    }
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let cfg = pipeline::PartitionRunConfig {
        name: args.name.clone(),
        store_root: args.store.clone(),
        scheduler: args.scheduler(),
        fracs: args.fracs.clone(),
        export_gis: args.export_gis.clone(),
    };
    let source = DirectoryRunParams::new(&args.images);
    let runs = pipeline::run_partitions(&cfg, &source, Arc::new(FileDetector))?;

    for run in &runs {
        println!("{}", format_run_report(&run.params, &run.config, &run.report));
        println!("Records: {}", run.store_dir.display());
        println!("Run info: {}", run.run_info.display());
        if let Some((path, rows)) = &run.gis {
            println!("GIS export: {} ({rows} rows)", path.display());
        }
        println!();
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = SyntheticSpec {
        rock_abundance: args.rock_abundance,
        area: args.area,
        min_diameter: args.min_diameter,
        max_diameter: args.max_diameter,
        seed: args.seed,
        ..Default::default()
    };
    let dataset = synthetic_site(&spec)?;
    let rows = write_dataset_csv(&args.out, &dataset)?;
    info!(path = %args.out.display(), rows, "wrote synthetic site");
    println!(
        "Wrote {rows} boulders (k={}, area={} m², seed={}) to {}",
        spec.rock_abundance,
        spec.area,
        spec.seed,
        args.out.display()
    );
    Ok(())
}
