//! Rock size-frequency models.
//!
//! - exponential CFA model (Golombek & Rapp): `F(D) = k·exp(-q·D)`,
//!   `q = 1.79 + 0.152/k`, where `k` is the rock abundance
//! - power law on cumulative counts: `N(D) = C·D^(-b)`
//!
//! plus closed-form integrals of the power law. Both integrals have an exact
//! logarithmic branch at the exponent where the general formula divides by
//! zero; the branch is selected by exact comparison, never by tolerance.

use std::f64::consts::PI;

/// Exponential-model `q` coefficient for rock abundance `k`.
///
/// Not defined at `k = 0`; the division yields an infinity which propagates.
pub fn exponential_q(k: f64) -> f64 {
    1.79 + 0.152 / k
}

/// Cumulative fractional area covered by rocks larger than `d`.
pub fn exponential_cfa(d: f64, k: f64) -> f64 {
    k * (-exponential_q(k) * d).exp()
}

/// Cumulative count (or count density) of rocks at least `d` across.
pub fn power_law_cfa(d: f64, c: f64, b: f64) -> f64 {
    c * d.powf(-b)
}

/// Fractional area (in percent of `area`) covered by rocks in `[d_min, d_max]`
/// under the power law.
///
/// Integrates `(π/4)·D²` against the count density implied by `C·D^(-b)`:
/// `(π·C/(4·(3−b)))·(D_max^(3−b) − D_min^(3−b))`, or `(π·C/4)·ln(D_max/D_min)`
/// at `b = 3`. Known to give unreliable figures on real data; reported for
/// completeness only.
pub fn integrate_power_law(c: f64, b: f64, d_min: f64, d_max: f64, area: f64) -> f64 {
    let covered = if b != 3.0 {
        (PI * c / (4.0 * (3.0 - b))) * (d_max.powf(3.0 - b) - d_min.powf(3.0 - b))
    } else {
        (PI * c / 4.0) * (d_max / d_min).ln()
    };
    covered / area * 100.0
}

/// Predicted number of rocks with diameter in `[d_min, d_max]`.
///
/// `C·(D_min^(1−b) − D_max^(1−b))/(b−1)`, or `C·ln(D_max/D_min)` at `b = 1`.
pub fn predict_cumulative_count(c: f64, b: f64, d_min: f64, d_max: f64) -> f64 {
    if b != 1.0 {
        c * (d_min.powf(1.0 - b) - d_max.powf(1.0 - b)) / (b - 1.0)
    } else {
        c * (d_max / d_min).ln()
    }
}

/// Area of a circular rock of diameter `d`.
pub fn disc_area(d: f64) -> f64 {
    PI * (d / 2.0).powi(2)
}

/// Variance-style area uncertainty for a rock of diameter `d` measured at
/// `resolution` length units per pixel: `(π·resolution·d/2)²`.
pub fn disc_area_sigma(d: f64, resolution: f64) -> f64 {
    (PI * resolution * 0.5 * d).powi(2)
}
