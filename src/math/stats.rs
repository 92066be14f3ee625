//! Small descriptive-statistics helpers.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `1 - SSres/SStot`, with `SStot` taken about the mean of `observed`.
///
/// The result is not clamped: a model worse than the mean gives a negative
/// value. Returns `None` when the lengths differ, the input is empty, or
/// `SStot` is zero (the ratio is undefined).
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> Option<f64> {
    if observed.len() != predicted.len() {
        return None;
    }
    let y_bar = mean(observed)?;
    let ss_tot: f64 = observed.iter().map(|y| (y - y_bar).powi(2)).sum();
    if ss_tot <= 0.0 {
        return None;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, f)| (y - f).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// `n` evenly spaced values over `[start, stop]`, both ends included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_ends() {
        let v = linspace(0.45, 5.45, 11);
        assert_eq!(v.len(), 11);
        assert_eq!(v[0], 0.45);
        assert_eq!(v[10], 5.45);
        assert!((v[1] - 0.95).abs() < 1e-12);
    }

    #[test]
    fn r_squared_can_be_negative() {
        let observed = [1.0, 2.0, 3.0];
        let predicted = [3.0, 2.0, 1.0];
        // SSres = 8, SStot = 2
        assert_eq!(r_squared(&observed, &predicted), Some(-3.0));
    }

    #[test]
    fn r_squared_undefined_for_flat_observations() {
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), None);
        assert_eq!(r_squared(&[], &[]), None);
    }
}
