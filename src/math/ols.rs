//! Linear least squares.
//!
//! Two consumers share the solver below:
//! - the power-law fit, an ordinary straight-line regression in log-log space
//! - every damped step of the Levenberg-Marquardt solver (`math::lm`), which
//!   solves a tall augmented system `[J; sqrt(λ)·I] δ = [-r; 0]`
//!
//! SVD is used because both systems are tall (more rows than columns).
//! Nalgebra's `QR::solve` is intended for square systems and will panic for
//! non-square matrices.

use nalgebra::{DMatrix, DVector};

use crate::math::stats::{mean, r_squared};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Straight-line fit `y = intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination (the squared Pearson correlation for a
    /// line with intercept).
    pub r2: f64,
}

/// Ordinary least squares line through `(x, y)`.
///
/// Returns `None` for fewer than two points, mismatched lengths, or an `x`
/// with zero variance (the slope is undefined).
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }

    let x_bar = mean(x)?;
    if x.iter().all(|&v| (v - x_bar).abs() <= f64::EPSILON * x_bar.abs().max(1.0)) {
        return None;
    }

    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi;
    }
    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs)?;

    let intercept = beta[0];
    let slope = beta[1];
    let predicted: Vec<f64> = x.iter().map(|&xi| intercept + slope * xi).collect();
    // A flat `y` is fitted exactly by a flat line.
    let r2 = r_squared(y, &predicted).unwrap_or(1.0);

    Some(LineFit {
        slope,
        intercept,
        r2,
    })
}
