//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid, log-log axes), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - data points: `a`, `b`, `c`, ... (one letter per site, in site order)
//! - fitted curves: `-` line

use crate::plot::{log_safe, SiteSeries};

/// Render all site series on shared log-log axes.
///
/// Ranges are taken from the drawable (positive) data and fit values.
pub fn render_ascii_comparison(series: &[SiteSeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max, y_min, y_max)) = log_ranges(series) else {
        return "Plot: no positive values to draw\n".to_string();
    };

    let mut grid = vec![vec![' '; width]; height];

    // Draw curves first (so points can overlay).
    for s in series {
        let curve: Vec<(f64, f64)> = log_safe(&s.fit).collect();
        draw_curve(&mut grid, &curve, (x_min, x_max), (y_min, y_max));
    }

    for (i, s) in series.iter().enumerate() {
        let marker = site_marker(i);
        for (x, y) in log_safe(&s.points) {
            let col = map_x(x.log10(), x_min, x_max, width);
            let row = map_y(y.log10(), y_min, y_max, height);
            grid[row][col] = marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: D=[{:.3}, {:.3}] m | y=[{:.2e}, {:.2e}] (log-log)\n",
        10f64.powf(x_min),
        10f64.powf(x_max),
        10f64.powf(y_min),
        10f64.powf(y_max),
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    for (i, s) in series.iter().enumerate() {
        out.push_str(&format!("  {} = {}\n", site_marker(i), s.legend));
    }
    out
}

fn site_marker(i: usize) -> char {
    (b'a' + (i % 26) as u8) as char
}

/// (log10 x_min, log10 x_max, log10 y_min, log10 y_max) over everything drawable.
fn log_ranges(series: &[SiteSeries]) -> Option<(f64, f64, f64, f64)> {
    let mut x_lo = f64::INFINITY;
    let mut x_hi = f64::NEG_INFINITY;
    let mut y_lo = f64::INFINITY;
    let mut y_hi = f64::NEG_INFINITY;
    for s in series {
        for (x, y) in log_safe(&s.points).chain(log_safe(&s.fit)) {
            x_lo = x_lo.min(x.log10());
            x_hi = x_hi.max(x.log10());
            y_lo = y_lo.min(y.log10());
            y_hi = y_hi.max(y.log10());
        }
    }
    if !(x_lo.is_finite() && y_lo.is_finite()) {
        return None;
    }
    let (x_lo, x_hi) = widen(x_lo, x_hi);
    let (y_lo, y_hi) = widen(y_lo, y_hi);
    Some((x_lo, x_hi, y_lo, y_hi))
}

fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) }
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x: (f64, f64), y: (f64, f64)) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(d, v) in curve {
        let col = map_x(d.log10(), x.0, x.1, width);
        let row = map_y(v.log10(), y.0, y.1, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
