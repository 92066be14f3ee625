//! SVG comparison figures.
//!
//! Log-log axes with one colour per site: hollow circles for the data, a line
//! for the best fit. The exponential figure also carries the gray reference
//! family so site curves can be read off against known rock abundances.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::domain::BinningConfig;
use crate::error::AppError;
use crate::plot::{log_safe, reference_curves, SiteSeries};

const SIZE: (u32, u32) = (900, 900);

/// First three match the usual Site A/B/C colouring.
const PALETTE: [RGBColor; 6] = [
    RGBColor(0, 128, 0),
    RGBColor(0, 0, 255),
    RGBColor(255, 0, 0),
    RGBColor(255, 140, 0),
    RGBColor(128, 0, 128),
    RGBColor(0, 139, 139),
];

pub fn site_color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// Axis ranges and labels for one figure.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl ChartSpec {
    pub fn exponential() -> Self {
        Self {
            title: "Inter-Site Comparison of Rock Abundance".to_string(),
            x_desc: "Boulder Diameter (m)".to_string(),
            y_desc: "Cumulative Fractional Area".to_string(),
            x_range: (0.4, 5.0),
            y_range: (1e-5, 1.0),
        }
    }

    /// Y range follows the data: one decade of headroom either side.
    pub fn power_law(series: &[SiteSeries]) -> Self {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for s in series {
            for (_, y) in log_safe(&s.points).chain(log_safe(&s.fit)) {
                lo = lo.min(y);
                hi = hi.max(y);
            }
        }
        let y_range = if lo.is_finite() && hi.is_finite() {
            (lo / 10.0, hi * 10.0)
        } else {
            (1e-5, 1.0)
        };
        Self {
            title: "Inter-Site Comparison of Power-Law Fits".to_string(),
            x_desc: "Boulder Diameter (m)".to_string(),
            y_desc: "Cumulative Number of Boulders (per m²)".to_string(),
            x_range: (0.3, 5.0),
            y_range,
        }
    }
}

pub fn draw_exponential_comparison(
    path: &Path,
    series: &[SiteSeries],
    binning: &BinningConfig,
) -> Result<(), AppError> {
    let refs = reference_curves(binning);
    draw_comparison(path, &ChartSpec::exponential(), series, &refs)
}

pub fn draw_power_law_comparison(path: &Path, series: &[SiteSeries]) -> Result<(), AppError> {
    draw_comparison(path, &ChartSpec::power_law(series), series, &[])
}

/// Draw and save one figure.
pub fn draw_comparison(
    path: &Path,
    spec: &ChartSpec,
    series: &[SiteSeries],
    references: &[(f64, Vec<(f64, f64)>)],
) -> Result<(), AppError> {
    render(path, spec, series, references)
        .map_err(|e| AppError::new(2, format!("Failed to draw plot '{}': {e}", path.display())))?;
    info!(path = %path.display(), sites = series.len(), "wrote comparison plot");
    Ok(())
}

fn render(
    path: &Path,
    spec: &ChartSpec,
    series: &[SiteSeries],
    references: &[(f64, Vec<(f64, f64)>)],
) -> Result<(), Box<dyn Error>> {
    let (x0, x1) = spec.x_range;
    let (y0, y1) = spec.y_range;
    if !(x0 > 0.0 && x1 > x0 && y0 > 0.0 && y1 > y0) {
        return Err(format!("invalid log-log ranges x=[{x0}, {x1}] y=[{y0}, {y1}]").into());
    }

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((x0..x1).log_scale(), (y0..y1).log_scale())?;

    chart
        .configure_mesh()
        .x_desc(spec.x_desc.as_str())
        .y_desc(spec.y_desc.as_str())
        .x_label_formatter(&|v| format!("{v}"))
        .y_label_formatter(&|v| format!("{v:.0e}"))
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    let gray = RGBColor(128, 128, 128).mix(0.6);
    for (i, (_, curve)) in references.iter().enumerate() {
        let drawn = chart.draw_series(LineSeries::new(log_safe(curve), gray))?;
        if i == 0 {
            let pct: Vec<String> = references
                .iter()
                .map(|(k, _)| format!("{:.0}%", k * 100.0))
                .collect();
            drawn
                .label(format!("Theoretical curves for {} RA", pct.join(", ")))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], gray));
        }
    }

    for (i, s) in series.iter().enumerate() {
        let color = site_color(i);
        chart
            .draw_series(
                log_safe(&s.points).map(|p| Circle::new(p, 3, color.stroke_width(1))),
            )?
            .label(format!("{} Data", s.label))
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.stroke_width(1)));
        chart
            .draw_series(LineSeries::new(log_safe(&s.fit), color))?
            .label(s.legend.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<SiteSeries> {
        vec![SiteSeries {
            label: "Site_A".into(),
            legend: "Site_A Best Fit RA: 5.00%".into(),
            points: vec![(0.5, 0.02), (1.0, 0.01), (4.0, 0.0)],
            fit: vec![(0.5, 0.021), (1.0, 0.009)],
        }]
    }

    #[test]
    fn writes_an_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmp.svg");
        draw_exponential_comparison(&path, &series(), &BinningConfig::default()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Site_A"));
    }

    #[test]
    fn power_law_range_follows_data() {
        let spec = ChartSpec::power_law(&series());
        assert!((spec.y_range.0 - 0.0009).abs() < 1e-12);
        assert!((spec.y_range.1 - 0.21).abs() < 1e-12);
    }
}
