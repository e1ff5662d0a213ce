//! Nelder–Mead downhill simplex.
//!
//! Derivative-free and tolerant of noisy residuals; the usual first choice
//! when the starting point is decent but gradients are unreliable. Bounds,
//! when present, are enforced by clamping trial vertices.

use crate::engine::FitError;

pub(crate) struct SolverOutcome {
    pub x: Vec<f64>,
    pub cost: f64,
    pub n_eval: usize,
    pub n_iter: usize,
    pub converged: bool,
}

const ALPHA: f64 = 1.0; // reflection
const GAMMA: f64 = 2.0; // expansion
const RHO: f64 = 0.5; // contraction
const SIGMA: f64 = 0.5; // shrink
const FTOL: f64 = 1e-10;
const XTOL: f64 = 1e-10;

fn clamp(x: &mut [f64], bounds: &[(Option<f64>, Option<f64>)]) {
    for (v, (lo, hi)) in x.iter_mut().zip(bounds) {
        if let Some(lo) = lo {
            *v = v.max(*lo);
        }
        if let Some(hi) = hi {
            *v = v.min(*hi);
        }
    }
}

pub(crate) fn nelder_mead<F>(
    mut f: F,
    x0: &[f64],
    bounds: &[(Option<f64>, Option<f64>)],
    max_eval: usize,
) -> Result<SolverOutcome, FitError>
where
    F: FnMut(&[f64]) -> Result<f64, FitError>,
{
    let n = x0.len();
    let mut n_eval = 0usize;
    let mut eval = |x: &[f64], n_eval: &mut usize| -> Result<f64, FitError> {
        *n_eval += 1;
        f(x)
    };

    // Initial simplex: x0 plus one perturbed vertex per dimension.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] = if v[i] != 0.0 { v[i] * 1.05 } else { 2.5e-4 };
        clamp(&mut v, bounds);
        simplex.push(v);
    }
    let mut costs: Vec<f64> = Vec::with_capacity(n + 1);
    for v in &simplex {
        costs.push(eval(v, &mut n_eval)?);
    }

    let mut n_iter = 0usize;
    let mut converged = false;

    while n_eval < max_eval {
        n_iter += 1;

        // Order vertices by cost.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        // Convergence: cost spread and simplex extent both small.
        let f_spread = (costs[worst] - costs[best]).abs();
        let f_scale = costs[best].abs().max(costs[worst].abs()).max(1e-30);
        let x_spread = (0..n)
            .map(|i| (simplex[worst][i] - simplex[best][i]).abs())
            .fold(0.0_f64, f64::max);
        let x_scale = simplex[best]
            .iter()
            .map(|v| v.abs())
            .fold(0.0_f64, f64::max)
            .max(1.0);
        if f_spread <= FTOL * f_scale && x_spread <= XTOL * x_scale {
            converged = true;
            break;
        }

        // Centroid of all but the worst vertex.
        let mut centroid = vec![0.0; n];
        for &index in &order[..n] {
            for (c, v) in centroid.iter_mut().zip(&simplex[index]) {
                *c += v / n as f64;
            }
        }

        let blend = |t: f64| -> Vec<f64> {
            let mut v: Vec<f64> = centroid
                .iter()
                .zip(&simplex[worst])
                .map(|(c, w)| c + t * (c - w))
                .collect();
            clamp(&mut v, bounds);
            v
        };

        // Reflection.
        let reflected = blend(ALPHA);
        let f_reflected = eval(&reflected, &mut n_eval)?;

        if f_reflected < costs[best] {
            // Expansion.
            let expanded = blend(GAMMA);
            let f_expanded = eval(&expanded, &mut n_eval)?;
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                costs[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                costs[worst] = f_reflected;
            }
        } else if f_reflected < costs[second_worst] {
            simplex[worst] = reflected;
            costs[worst] = f_reflected;
        } else {
            // Contraction (outside if the reflection helped at all).
            let contracted = if f_reflected < costs[worst] {
                blend(ALPHA * RHO)
            } else {
                blend(-RHO)
            };
            let f_contracted = eval(&contracted, &mut n_eval)?;
            if f_contracted < costs[worst].min(f_reflected) {
                simplex[worst] = contracted;
                costs[worst] = f_contracted;
            } else {
                // Shrink towards the best vertex.
                let best_vertex = simplex[best].clone();
                for index in order[1..].iter().copied() {
                    for (v, b) in simplex[index].iter_mut().zip(&best_vertex) {
                        *v = b + SIGMA * (*v - b);
                    }
                    costs[index] = eval(&simplex[index], &mut n_eval)?;
                    if n_eval >= max_eval {
                        break;
                    }
                }
            }
        }
    }

    let best = costs
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .expect("simplex is non-empty");
    Ok(SolverOutcome {
        x: simplex[best].clone(),
        cost: costs[best],
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
    fn test_quadratic_bowl() {
        let f = |x: &[f64]| Ok((x[0] - 3.0).powi(2) + (x[1] + 1.5).powi(2));
        let out = nelder_mead(f, &[0.0, 0.0], &no_bounds(2), 500).unwrap();
        assert!(out.converged);
        assert!((out.x[0] - 3.0).abs() < 1e-4, "x = {:?}", out.x);
        assert!((out.x[1] + 1.5).abs() < 1e-4, "x = {:?}", out.x);
    }

    #[test]
    fn test_rosenbrock() {
        let f = |x: &[f64]| {
            Ok(100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2))
        };
        let out = nelder_mead(f, &[-1.2, 1.0], &no_bounds(2), 2000).unwrap();
        assert!(out.cost < 1e-8, "cost = {}", out.cost);
        assert!((out.x[0] - 1.0).abs() < 1e-3);
        assert!((out.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_bounds_are_respected() {
        let f = |x: &[f64]| Ok((x[0] - 3.0).powi(2));
        let bounds = vec![(Some(0.0), Some(2.0))];
        let out = nelder_mead(f, &[1.0], &bounds, 500).unwrap();
        assert!(out.x[0] <= 2.0 + 1e-12);
        assert!((out.x[0] - 2.0).abs() < 1e-3, "optimum pinned at bound");
    }

    #[test]
    fn test_budget_exhaustion_flags_non_convergence() {
        let f = |x: &[f64]| {
            Ok(100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2))
        };
        let out = nelder_mead(f, &[-1.2, 1.0], &no_bounds(2), 15).unwrap();
        assert!(!out.converged);
        // The iteration in flight when the budget trips may add a few
        // evaluations past the cap.
        assert!(out.n_eval <= 20);
    }
}
