//! Levenberg-Marquardt non-linear least squares.
//!
//! Minimises `Σ r_i(p)²` for a residual function `r(p)`. Each iteration:
//! - builds a forward-difference Jacobian `J` at the current parameters
//! - solves the damped system `[J; sqrt(λ)·I] δ = [-r; 0]` with the shared SVD
//!   solver (`math::ols`)
//! - accepts the step and relaxes `λ` when the cost drops, otherwise stiffens
//!   `λ` and retries from the same point
//!
//! Termination follows the MINPACK conventions: relative cost reduction below
//! `ftol`, or a step small relative to the parameters (`xtol`).

use nalgebra::{DMatrix, DVector};

use crate::math::ols::solve_least_squares;

/// Upper bound on the damping factor before a step is declared impossible.
const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    /// Initial damping, relative to the largest diagonal entry of `JᵀJ`.
    pub initial_damping: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        // Same tolerances as MINPACK's `lmdif` defaults.
        Self {
            max_iterations: 200,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            initial_damping: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Vec<f64>,
    /// Final sum of squared residuals.
    pub cost: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LmError {
    #[error("residuals are not finite at the initial guess")]
    NonFiniteStart,
    #[error("jacobian is not finite")]
    NonFiniteJacobian,
    #[error("no descent direction found")]
    Stalled,
    #[error("iteration limit reached")]
    IterationLimit,
}

/// Run Levenberg-Marquardt from `initial`.
///
/// `residuals` returns `None` when the model cannot be evaluated at the given
/// parameters; such trial points are rejected like a cost increase.
pub fn levenberg_marquardt<F>(
    residuals: F,
    initial: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, LmError>
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let m = initial.len();
    let mut params = DVector::from_column_slice(initial);
    let mut r = eval(&residuals, &params).ok_or(LmError::NonFiniteStart)?;
    let mut cost = r.norm_squared();
    let mut lambda: Option<f64> = None;

    for iteration in 1..=opts.max_iterations {
        if cost == 0.0 {
            return Ok(solution(params, cost, iteration - 1));
        }

        let jac = jacobian(&residuals, &params, &r).ok_or(LmError::NonFiniteJacobian)?;
        let n = jac.nrows();
        let mut damping = match lambda {
            Some(l) => l,
            None => {
                let max_diag = (0..m)
                    .map(|j| jac.column(j).norm_squared())
                    .fold(0.0_f64, f64::max);
                if max_diag <= 0.0 {
                    return Err(LmError::Stalled);
                }
                opts.initial_damping * max_diag
            }
        };

        loop {
            let mut a = DMatrix::<f64>::zeros(n + m, m);
            a.view_mut((0, 0), (n, m)).copy_from(&jac);
            let sqrt_l = damping.sqrt();
            for j in 0..m {
                a[(n + j, j)] = sqrt_l;
            }
            let mut b = DVector::<f64>::zeros(n + m);
            b.rows_mut(0, n).copy_from(&(-&r));

            let trial = solve_least_squares(&a, &b).and_then(|delta| {
                let candidate = &params + &delta;
                eval(&residuals, &candidate).map(|r_new| (delta, candidate, r_new))
            });

            match trial {
                Some((delta, candidate, r_new)) if r_new.norm_squared() < cost => {
                    let new_cost = r_new.norm_squared();
                    let reduction = (cost - new_cost) / cost;
                    let small_step = delta.norm() <= opts.xtol * (params.norm() + opts.xtol);

                    params = candidate;
                    r = r_new;
                    cost = new_cost;
                    lambda = Some((damping / 10.0).max(f64::MIN_POSITIVE));

                    if reduction <= opts.ftol || small_step || cost == 0.0 {
                        return Ok(solution(params, cost, iteration));
                    }
                    break;
                }
                Some((delta, _, _)) if delta.norm() <= opts.xtol * (params.norm() + opts.xtol) => {
                    // No improvement possible at machine precision: already at the minimum.
                    return Ok(solution(params, cost, iteration));
                }
                _ => {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        return Err(LmError::Stalled);
                    }
                }
            }
        }
    }

    Err(LmError::IterationLimit)
}

fn solution(params: DVector<f64>, cost: f64, iterations: usize) -> LmSolution {
    LmSolution {
        params: params.iter().copied().collect(),
        cost,
        iterations,
    }
}

fn eval<F>(residuals: &F, params: &DVector<f64>) -> Option<DVector<f64>>
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let r = residuals(params.as_slice())?;
    if r.iter().all(|v| v.is_finite()) {
        Some(r)
    } else {
        None
    }
}

/// Forward-difference Jacobian, step `sqrt(ε)·|p_j|` as in MINPACK.
fn jacobian<F>(residuals: &F, params: &DVector<f64>, r0: &DVector<f64>) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Option<DVector<f64>>,
{
    let eps = f64::EPSILON.sqrt();
    let mut jac = DMatrix::<f64>::zeros(r0.len(), params.len());
    for j in 0..params.len() {
        let mut h = eps * params[j].abs();
        if h == 0.0 {
            h = eps;
        }
        let mut shifted = params.clone();
        shifted[j] += h;
        let r1 = eval(residuals, &shifted)?;
        jac.set_column(j, &((r1 - r0) / h));
    }
    Some(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exponential_decay_rate() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * (-0.7 * x).exp()).collect();

        let sol = levenberg_marquardt(
            |p| {
                Some(DVector::from_iterator(
                    xs.len(),
                    xs.iter().zip(&ys).map(|(x, y)| y - p[0] * (-p[1] * x).exp()),
                ))
            },
            &[1.0, 0.1],
            &LmOptions::default(),
        )
        .unwrap();

        assert!((sol.params[0] - 3.0).abs() < 1e-6, "amplitude {}", sol.params[0]);
        assert!((sol.params[1] - 0.7).abs() < 1e-6, "rate {}", sol.params[1]);
        assert!(sol.cost < 1e-12);
    }

    #[test]
    fn rejects_non_finite_start() {
        let err = levenberg_marquardt(
            |p| Some(DVector::from_element(3, 1.0 / p[0])),
            &[0.0],
            &LmOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, LmError::NonFiniteStart);
    }

    #[test]
    fn flat_residuals_stall() {
        let err = levenberg_marquardt(
            |_| Some(DVector::from_element(4, 2.0)),
            &[1.0],
            &LmOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, LmError::Stalled);
    }
}
