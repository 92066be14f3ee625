//! Exponential (rock abundance) fit.
//!
//! Given a binned CFA curve we:
//! - keep the points whose diameter lies inside the fit range (inclusive)
//! - estimate `k` by non-linear least squares from the fixed start `k₀ = 0.02`
//! - score the fit with `R² = 1 − SSres/SStot` on the kept points
//!
//! A failed fit is a value (`FitFailure`), never a panic, so one bad site
//! cannot take down a comparison.

use nalgebra::DVector;
use tracing::debug;

use crate::domain::ExponentialFit;
use crate::error::FitFailure;
use crate::math::{levenberg_marquardt, r_squared, LmOptions};
use crate::models::exponential_cfa;

/// Initial rock-abundance guess.
pub const INITIAL_K: f64 = 0.02;

/// Fit `F(D) = k·exp(−q(k)·D)` to `(diameters, cfa)` within `fit_range`.
///
/// R² is not clamped and may be negative. A fit range whose CFA values are
/// all equal has no defined R² and is reported as `ZeroVariance`.
pub fn fit_exponential(
    diameters: &[f64],
    cfa: &[f64],
    fit_range: (f64, f64),
) -> Result<ExponentialFit, FitFailure> {
    let (lo, hi) = fit_range;
    let (xs, ys): (Vec<f64>, Vec<f64>) = diameters
        .iter()
        .zip(cfa)
        .filter(|(d, _)| lo <= **d && **d <= hi)
        .map(|(&d, &f)| (d, f))
        .unzip();

    if xs.is_empty() {
        return Err(FitFailure::EmptyRange);
    }

    let solution = levenberg_marquardt(
        |p| {
            let k = p[0];
            Some(DVector::from_iterator(
                xs.len(),
                xs.iter().zip(&ys).map(|(&d, &f)| f - exponential_cfa(d, k)),
            ))
        },
        &[INITIAL_K],
        &LmOptions::default(),
    )
    .map_err(|e| {
        debug!(error = %e, points = xs.len(), "exponential fit failed");
        FitFailure::NoConvergence
    })?;

    let k = solution.params[0];
    if !k.is_finite() {
        return Err(FitFailure::NoConvergence);
    }

    let predicted: Vec<f64> = xs.iter().map(|&d| exponential_cfa(d, k)).collect();
    let r2 = r_squared(&ys, &predicted).ok_or(FitFailure::ZeroVariance)?;

    debug!(k, r2, iterations = solution.iterations, "exponential fit");
    Ok(ExponentialFit { k, r2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;

    #[test]
    fn recovers_known_rock_abundance() {
        for &k_true in &[0.03, 0.05, 0.10, 0.20] {
            let d = linspace(0.45, 5.45, 100);
            let f: Vec<f64> = d.iter().map(|&x| exponential_cfa(x, k_true)).collect();

            let fit = fit_exponential(&d, &f, (0.4, 4.5)).unwrap();
            assert!((fit.k - k_true).abs() < 1e-6, "k={} expected {k_true}", fit.k);
            assert!((fit.r2 - 1.0).abs() < 1e-9, "r2={}", fit.r2);
        }
    }

    #[test]
    fn fit_range_is_inclusive_and_filters() {
        let d = [0.4, 1.0, 4.5, 6.0];
        let f: Vec<f64> = d.iter().map(|&x| exponential_cfa(x, 0.07)).collect();
        // Corrupt the point outside the range; it must be ignored.
        let mut f = f;
        f[3] = 1.0;
        let fit = fit_exponential(&d, &f, (0.4, 4.5)).unwrap();
        assert!((fit.k - 0.07).abs() < 1e-6);
    }

    #[test]
    fn empty_fit_range_is_a_failure() {
        let d = [5.0, 6.0];
        let f = [0.01, 0.005];
        assert_eq!(fit_exponential(&d, &f, (0.4, 4.5)), Err(FitFailure::EmptyRange));
        assert_eq!(fit_exponential(&[], &[], (0.4, 4.5)), Err(FitFailure::EmptyRange));
    }

    #[test]
    fn r_squared_is_not_clamped() {
        // Data rising with diameter: the best decaying curve is worse than the mean.
        let d = linspace(0.5, 4.0, 20);
        let f: Vec<f64> = d.iter().map(|&x| 0.001 * x * x).collect();
        let fit = fit_exponential(&d, &f, (0.4, 4.5)).unwrap();
        assert!(fit.k > 0.0, "k={}", fit.k);
        assert!(fit.r2 < 0.0, "r2={}", fit.r2);
    }
}
