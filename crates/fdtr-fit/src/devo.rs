//! Differential evolution (rand/1/bin).
//!
//! Global search for rugged or multi-modal error surfaces where a local
//! method stalls in the wrong basin. Every parameter must carry finite
//! bounds: the initial population samples the bounded box uniformly. The
//! generator is seeded deterministically so a fit is reproducible run to
//! run.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::FitError;
use crate::nelder::SolverOutcome;

const WEIGHT: f64 = 0.8; // differential weight F
const CROSSOVER: f64 = 0.9; // crossover probability CR
const SEED: u64 = 0x6664_7472; // stable across runs
const SPREAD_TOL: f64 = 1e-12;

pub(crate) fn differential_evolution<F>(
    mut f: F,
    bounds: &[(f64, f64)],
    max_eval: usize,
) -> Result<SolverOutcome, FitError>
where
    F: FnMut(&[f64]) -> Result<f64, FitError>,
{
    let dim = bounds.len();
    let population_size = (10 * dim).max(15);
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut n_eval = 0usize;

    // Population stored row-per-member.
    let mut population = Array2::<f64>::zeros((population_size, dim));
    for mut row in population.rows_mut() {
        for (v, &(lo, hi)) in row.iter_mut().zip(bounds) {
            *v = rng.gen_range(lo..=hi);
        }
    }

    let mut costs = Vec::with_capacity(population_size);
    for row in population.rows() {
        n_eval += 1;
        costs.push(f(row.as_slice().expect("row is contiguous"))?);
        if n_eval >= max_eval {
            break;
        }
    }
    // Budget too small to even evaluate the initial population.
    while costs.len() < population_size {
        costs.push(f64::INFINITY);
    }

    let mut n_iter = 0usize;
    let mut converged = false;
    let mut trial = vec![0.0; dim];

    'generations: while n_eval < max_eval {
        n_iter += 1;
        for i in 0..population_size {
            // Three distinct donors, none equal to the target.
            let mut donors = [0usize; 3];
            let mut picked = 0;
            while picked < 3 {
                let candidate = rng.gen_range(0..population_size);
                if candidate != i && !donors[..picked].contains(&candidate) {
                    donors[picked] = candidate;
                    picked += 1;
                }
            }
            let [r1, r2, r3] = donors;

            let forced = rng.gen_range(0..dim);
            for j in 0..dim {
                trial[j] = if j == forced || rng.gen::<f64>() < CROSSOVER {
                    let v = population[[r1, j]]
                        + WEIGHT * (population[[r2, j]] - population[[r3, j]]);
                    v.clamp(bounds[j].0, bounds[j].1)
                } else {
                    population[[i, j]]
                };
            }

            n_eval += 1;
            let cost = f(&trial)?;
            if cost < costs[i] {
                for j in 0..dim {
                    population[[i, j]] = trial[j];
                }
                costs[i] = cost;
            }
            if n_eval >= max_eval {
                break 'generations;
            }
        }

        let best = costs.iter().cloned().fold(f64::INFINITY, f64::min);
        let worst = costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if worst.is_finite() && (worst - best).abs() <= SPREAD_TOL * best.abs().max(1e-30) {
            converged = true;
            break;
        }
    }

    let best = costs
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .expect("population is non-empty");
    Ok(SolverOutcome {
        x: population.row(best).to_vec(),
        cost: costs[best],
        n_eval,
        n_iter,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_function() {
        let f = |x: &[f64]| Ok(x.iter().map(|v| v * v).sum());
        let out =
            differential_evolution(f, &[(-5.0, 5.0), (-5.0, 5.0)], 3000).unwrap();
        assert!(out.cost < 1e-4, "cost = {}", out.cost);
        assert!(out.x.iter().all(|v| v.abs() < 0.05), "x = {:?}", out.x);
    }

    #[test]
    fn test_shifted_multimodal() {
        // Two basins; the global minimum sits at x = 2.
        let f = |x: &[f64]| {
            let a = (x[0] - 2.0).powi(2);
            let b = (x[0] + 2.0).powi(2) + 0.5;
            Ok(a.min(b))
        };
        let out = differential_evolution(f, &[(-5.0, 5.0)], 2000).unwrap();
        assert!((out.x[0] - 2.0).abs() < 0.05, "x = {:?}", out.x);
    }

    #[test]
    fn test_budget_is_respected() {
        let f = |x: &[f64]| Ok(x[0] * x[0]);
        let out = differential_evolution(f, &[(-1.0, 1.0)], 40).unwrap();
        assert!(out.n_eval <= 40);
        assert!(!out.converged);
    }
}
