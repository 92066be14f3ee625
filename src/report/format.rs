//! Terminal summaries for comparisons and scheduler runs.
//!
//! We keep formatting code in one place so:
//! - the aggregation/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{BinningConfig, ExponentialRun, PowerLawConfig, PowerLawRun, SchedulerConfig, SiteResult};
use crate::scheduler::{RunParams, RunReport};

/// Per-site rock abundance table.
pub fn format_exponential_summary(sites: &[SiteResult<ExponentialRun>], binning: &BinningConfig) -> String {
    let mut out = String::new();

    out.push_str("=== rocks - Rock Abundance (exponential model) ===\n");
    out.push_str(&format!(
        "Bins: n={} | D=[{:.2}, {:.2}] m | fit range=[{:.2}, {:.2}] m\n\n",
        binning.num_bins, binning.min_size, binning.max_size, binning.fit_min, binning.fit_max
    ));

    push_row(
        &mut out,
        &format!(
            "{:<24} {:>8} {:>12} {:>10} {:>10} {:>14}",
            "site", "rocks", "area_m2", "RA_%", "R2", "sum_sigma_m4"
        ),
    );
    push_rule(&mut out, &[24, 8, 12, 10, 10, 14]);

    for site in sites {
        let line = match &site.outcome {
            Ok(run) => {
                let (ra, r2) = match &run.fit {
                    Ok(f) => (format!("{:.3}", f.k * 100.0), format!("{:.4}", f.r2)),
                    Err(_) => ("-".to_string(), format!("{:.4}", 0.0)),
                };
                format!(
                    "{:<24} {:>8} {:>12.2} {:>10} {:>10} {:>14.4e}",
                    truncate(&site.label, 24),
                    run.area_sigmas.len(),
                    run.area,
                    ra,
                    r2,
                    run.area_sigmas.iter().sum::<f64>(),
                )
            }
            Err(e) => format!("{:<24} {e}", truncate(&site.label, 24)),
        };
        push_row(&mut out, &line);
        if let Ok(ExponentialRun { fit: Err(e), .. }) = &site.outcome {
            push_row(&mut out, &format!("  (fit failed) {e}"));
        }
    }

    out
}

/// Per-site power-law table.
pub fn format_power_law_summary(sites: &[SiteResult<PowerLawRun>], cfg: &PowerLawConfig) -> String {
    let mut out = String::new();

    out.push_str("=== rocks - Cumulative Number of Boulders (power law) ===\n");
    out.push_str(&format!(
        "Min size: {:.2} m | prediction range starts at {:.2} m\n\n",
        cfg.min_size, cfg.predict_min
    ));

    push_row(
        &mut out,
        &format!(
            "{:<24} {:>8} {:>12} {:>8} {:>8} {:>12} {:>12} {:>10} {:>10}",
            "site", "Dmax_m", "C", "b", "R2", "C_unnorm", "pred_count", "pred_%", "meas_%"
        ),
    );
    push_rule(&mut out, &[24, 8, 12, 8, 8, 12, 12, 10, 10]);

    for site in sites {
        let line = match &site.outcome {
            Ok(run) => {
                let (c, b, r2) = match &run.fit {
                    Ok(f) => (format!("{:.4e}", f.c), format!("{:.3}", f.b), format!("{:.4}", f.r2)),
                    Err(_) => ("-".to_string(), "-".to_string(), format!("{:.4}", 0.0)),
                };
                format!(
                    "{:<24} {:>8.3} {:>12} {:>8} {:>8} {:>12} {:>12} {:>10} {:>10.3}",
                    truncate(&site.label, 24),
                    run.max_size,
                    c,
                    b,
                    r2,
                    fmt_opt(run.unnormalized_c, |v| format!("{v:.4e}")),
                    fmt_opt(run.predicted_count, |v| format!("{v:.1}")),
                    fmt_opt(run.predicted_area_pct, |v| format!("{v:.3}")),
                    run.measured_area_pct,
                )
            }
            Err(e) => format!("{:<24} {e}", truncate(&site.label, 24)),
        };
        push_row(&mut out, &line);
    }

    out.push_str("\nNote: pred_% integrates the fitted power law and is not validated.\n");
    out
}

/// Scheduler run summary.
pub fn format_run_report(params: &RunParams, config: &SchedulerConfig, report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== rocks - Partition Run: {} ===\n", params.file_name));
    out.push_str(&format!("Image ID: {}\n", params.image_id));
    out.push_str(&format!(
        "Boundary fraction: {} | thread limit: {} | start at: {}\n",
        config.boundary_fraction, config.thread_limit, config.start_at
    ));
    out.push_str(&format!(
        "Partitions: dispatched={} completed={} blank={} failed={}\n",
        report.dispatched, report.completed, report.blank, report.failed
    ));
    out.push_str(&format!(
        "Measurements: {} (overlap duplicates dropped: {})\n",
        report.measurements, report.duplicates
    ));
    out.push_str(&format!("Total time: {:.4} hours\n", report.elapsed_hours()));
    out
}

fn push_row(out: &mut String, row: &str) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn push_rule(out: &mut String, widths: &[usize]) {
    let cells: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(out, &cells.join(" "));
}

fn fmt_opt(v: Option<f64>, f: impl Fn(f64) -> String) -> String {
    v.map(f).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
