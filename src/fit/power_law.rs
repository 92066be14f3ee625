//! Power-law fit by straight-line regression in log10-log10 space.
//!
//! `log10 N = log10 C − b·log10 D`, so `C = 10^intercept`, `b = −slope` and
//! the reported R² is the squared correlation of the log-log points.

use crate::domain::PowerLawFit;
use crate::error::FitFailure;
use crate::math::linear_regression;

/// Fit `N = C·D^(−b)` to `(diameters, cumulative)`.
///
/// Both inputs must be strictly positive; callers filter to the valid range
/// first. At least two points with distinct diameters are required.
pub fn fit_power_law(diameters: &[f64], cumulative: &[f64]) -> Result<PowerLawFit, FitFailure> {
    let n = diameters.len().min(cumulative.len());
    if n < 2 || diameters.len() != cumulative.len() {
        return Err(FitFailure::TooFewPoints(n));
    }
    if diameters
        .iter()
        .chain(cumulative)
        .any(|v| !(v.is_finite() && *v > 0.0))
    {
        return Err(FitFailure::NonPositive);
    }

    let log_d: Vec<f64> = diameters.iter().map(|d| d.log10()).collect();
    let log_n: Vec<f64> = cumulative.iter().map(|c| c.log10()).collect();

    let line = linear_regression(&log_d, &log_n).ok_or(FitFailure::ZeroVariance)?;
    Ok(PowerLawFit {
        c: 10f64.powf(line.intercept),
        b: -line.slope,
        r2: line.r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::power_law_cfa;

    #[test]
    fn recovers_exact_power_law() {
        let d = [0.1, 0.2, 0.5, 1.0, 2.0, 4.0];
        let n: Vec<f64> = d.iter().map(|&x| power_law_cfa(x, 3.5, 2.2)).collect();
        let fit = fit_power_law(&d, &n).unwrap();
        assert!((fit.c - 3.5).abs() < 1e-9);
        assert!((fit.b - 2.2).abs() < 1e-9);
        assert!((fit.r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn needs_two_points() {
        assert_eq!(fit_power_law(&[], &[]), Err(FitFailure::TooFewPoints(0)));
        assert_eq!(fit_power_law(&[1.0], &[1.0]), Err(FitFailure::TooFewPoints(1)));
    }

    #[test]
    fn rejects_non_positive_values() {
        assert_eq!(
            fit_power_law(&[1.0, 2.0], &[3.0, 0.0]),
            Err(FitFailure::NonPositive)
        );
        assert_eq!(
            fit_power_law(&[-1.0, 2.0], &[3.0, 1.0]),
            Err(FitFailure::NonPositive)
        );
    }

    #[test]
    fn identical_diameters_have_no_slope() {
        assert_eq!(
            fit_power_law(&[1.5, 1.5, 1.5], &[1.0, 2.0, 3.0]),
            Err(FitFailure::ZeroVariance)
        );
    }

    #[test]
    fn scaling_counts_only_changes_c() {
        let d = [0.3, 0.6, 0.9, 1.7, 2.4];
        let raw = [40.0, 22.0, 9.0, 4.0, 1.0];
        let area = 250.0;
        let scaled: Vec<f64> = raw.iter().map(|v| v / area).collect();

        let a = fit_power_law(&d, &raw).unwrap();
        let b = fit_power_law(&d, &scaled).unwrap();
        assert!((a.b - b.b).abs() < 1e-9);
        assert!((a.c / b.c - area).abs() < 1e-6 * area);
        assert!((a.r2 - b.r2).abs() < 1e-12);
    }
}
