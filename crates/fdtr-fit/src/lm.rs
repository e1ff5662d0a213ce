//! Levenberg–Marquardt least squares.
//!
//! Fast local refinement from a good starting point. The Jacobian is
//! built by forward finite differences of the residual vector; the damped
//! normal equations are solved with `nalgebra`. Bounds, when present, are
//! enforced by projecting each accepted step back into the box.

use nalgebra::{DMatrix, DVector};

use crate::engine::FitError;
use crate::nelder::SolverOutcome;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
const FTOL: f64 = 1e-12;
const XTOL: f64 = 1e-12;
const GTOL: f64 = 1e-12;

fn project(x: &mut [f64], bounds: &[(Option<f64>, Option<f64>)]) {
    for (v, (lo, hi)) in x.iter_mut().zip(bounds) {
        if let Some(lo) = lo {
            *v = v.max(*lo);
        }
        if let Some(hi) = hi {
            *v = v.min(*hi);
        }
    }
}

/// Forward-difference Jacobian of the residual vector, `n` extra calls.
pub(crate) fn jacobian<F>(
    f: &mut F,
    x: &[f64],
    r0: &DVector<f64>,
    n_eval: &mut usize,
) -> Result<DMatrix<f64>, FitError>
where
    F: FnMut(&[f64]) -> Result<DVector<f64>, FitError>,
{
    let n = x.len();
    let m = r0.len();
    let mut j = DMatrix::<f64>::zeros(m, n);
    let mut probe = x.to_vec();
    for col in 0..n {
        // Relative step large enough to clear the quadrature noise floor
        // of the residual evaluations.
        let step = if x[col] != 0.0 {
            x[col].abs() * 1e-6
        } else {
            1e-6
        };
        probe[col] = x[col] + step;
        *n_eval += 1;
        let r = f(&probe)?;
        probe[col] = x[col];
        for row in 0..m {
            j[(row, col)] = (r[row] - r0[row]) / step;
        }
    }
    Ok(j)
}

pub(crate) fn levenberg_marquardt<F>(
    mut f: F,
    x0: &[f64],
    bounds: &[(Option<f64>, Option<f64>)],
    max_eval: usize,
) -> Result<SolverOutcome, FitError>
where
    F: FnMut(&[f64]) -> Result<DVector<f64>, FitError>,
{
    let n = x0.len();
    let mut x = x0.to_vec();
    project(&mut x, bounds);

    let mut n_eval = 1usize;
    let mut residuals = f(&x)?;
    let mut cost = residuals.norm_squared();
    let mut lambda = LAMBDA_INIT;
    let mut n_iter = 0usize;
    let mut converged = false;

    while n_eval < max_eval {
        n_iter += 1;

        let j = jacobian(&mut f, &x, &residuals, &mut n_eval)?;
        let jtj = j.transpose() * &j;
        let gradient = j.transpose() * &residuals;

        if gradient.amax() < GTOL {
            converged = true;
            break;
        }

        // Damped step; raise λ until the step reduces the cost.
        let mut stepped = false;
        while n_eval < max_eval {
            let mut damped = jtj.clone();
            for i in 0..n {
                // Marquardt scaling: damp along the curvature diagonal.
                let d = jtj[(i, i)].max(f64::MIN_POSITIVE);
                damped[(i, i)] += lambda * d;
            }

            let delta = match damped.lu().solve(&(-&gradient)) {
                Some(delta) => delta,
                None => {
                    lambda = (lambda * 10.0).min(LAMBDA_MAX);
                    if lambda >= LAMBDA_MAX {
                        break;
                    }
                    continue;
                }
            };

            let mut candidate = x.clone();
            for i in 0..n {
                candidate[i] += delta[i];
            }
            project(&mut candidate, bounds);

            n_eval += 1;
            let r_new = f(&candidate)?;
            let cost_new = r_new.norm_squared();

            if cost_new < cost {
                let step_norm: f64 = candidate
                    .iter()
                    .zip(&x)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                let x_norm: f64 =
                    x.iter().map(|v| v * v).sum::<f64>().sqrt().max(1.0);
                let improved = cost - cost_new;

                x = candidate;
                residuals = r_new;
                cost = cost_new;
                lambda = (lambda * 0.1).max(LAMBDA_MIN);
                stepped = true;

                if improved <= FTOL * cost.max(1e-300) || step_norm <= XTOL * x_norm {
                    converged = true;
                }
                break;
            }
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
        }

        if converged || !stepped {
            // !stepped: no damping level yields descent, i.e. numerically
            // stationary (possibly pinned against a bound).
            converged = true;
            break;
        }
    }

    Ok(SolverOutcome {
        x,
        cost,
        n_eval,
        n_iter,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_bounds(n: usize) -> Vec<(Option<f64>, Option<f64>)> {
        vec![(None, None); n]
    }

    #[test]
    fn test_linear_model_is_solved_exactly() {
        // y = 2x − 1 sampled without noise.
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x - 1.0).collect();
        let f = |p: &[f64]| {
            Ok(DVector::from_iterator(
                xs.len(),
                xs.iter().zip(&ys).map(|(x, y)| p[0] * x + p[1] - y),
            ))
        };
        let out = levenberg_marquardt(f, &[0.5, 0.5], &no_bounds(2), 200).unwrap();
        assert!(out.converged);
        assert!((out.x[0] - 2.0).abs() < 1e-6, "x = {:?}", out.x);
        assert!((out.x[1] + 1.0).abs() < 1e-6, "x = {:?}", out.x);
    }

    #[test]
    fn test_exponential_decay_fit() {
        let xs: Vec<f64> = (0..20).map(|i| 0.25 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * (-0.7 * x).exp()).collect();
        let f = |p: &[f64]| {
            Ok(DVector::from_iterator(
                xs.len(),
                xs.iter()
                    .zip(&ys)
                    .map(|(x, y)| p[0] * (-p[1] * x).exp() - y),
            ))
        };
        let out = levenberg_marquardt(f, &[1.0, 0.2], &no_bounds(2), 500).unwrap();
        assert!((out.x[0] - 3.0).abs() < 1e-4, "x = {:?}", out.x);
        assert!((out.x[1] - 0.7).abs() < 1e-4, "x = {:?}", out.x);
    }

    #[test]
    fn test_bound_pins_solution() {
        // Unconstrained optimum at p = 5, box capped at 2.
        let f = |p: &[f64]| Ok(DVector::from_vec(vec![p[0] - 5.0]));
        let out =
            levenberg_marquardt(f, &[0.0], &[(Some(0.0), Some(2.0))], 200).unwrap();
        assert!((out.x[0] - 2.0).abs() < 1e-9, "x = {:?}", out.x);
    }
}
