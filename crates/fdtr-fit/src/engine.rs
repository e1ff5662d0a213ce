//! The fit engine: method selection, optimization, and report assembly.

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fdtr_core::params::ParameterError;
use fdtr_core::NumericError;

use crate::devo::differential_evolution;
use crate::lm::{jacobian, levenberg_marquardt};
use crate::nelder::nelder_mead;
use crate::problem::FitProblem;
use crate::report::{FitReport, FittedParam};

/// Optimization algorithm. Always caller-selected; the engine never
/// switches methods on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Downhill simplex: robust, derivative-free, bounds optional.
    #[serde(alias = "nelder")]
    NelderMead,
    /// Global stochastic search: bounds mandatory.
    #[serde(alias = "de")]
    DifferentialEvolution,
    /// Levenberg–Marquardt: fast local refinement from a good start.
    #[serde(alias = "leastsq")]
    LeastSquares,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::NelderMead => write!(f, "nelder"),
            Method::DifferentialEvolution => write!(f, "differential_evolution"),
            Method::LeastSquares => write!(f, "leastsq"),
        }
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nelder" | "nelder_mead" => Ok(Method::NelderMead),
            "differential_evolution" | "de" => Ok(Method::DifferentialEvolution),
            "leastsq" | "least_squares" => Ok(Method::LeastSquares),
            other => Err(format!(
                "unknown method '{other}' \
                 (expected 'nelder', 'differential_evolution' or 'leastsq')"
            )),
        }
    }
}

/// Errors aborting a fit. Optimizer non-convergence is NOT among them: it
/// is reported through [`FitReport::converged`] with the best-found
/// parameters retained.
#[derive(Debug, Error)]
pub enum FitError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Numeric(#[from] NumericError),

    #[error("Differential evolution requires finite bounds; parameter '{0}' has none")]
    MissingBounds(String),

    #[error("No free parameters to fit")]
    NoFreeParameters,

    #[error("A dataset in the problem is empty")]
    EmptyData,
}

/// Run the selected optimizer over the problem, then write the best-found
/// vector back into every participating model and assemble the report.
///
/// `max_evaluations` caps residual-function calls; exhausting it yields a
/// `converged: false` report, not an error.
pub fn minimize(
    problem: &mut FitProblem<'_>,
    method: Method,
    max_evaluations: usize,
) -> Result<FitReport, FitError> {
    let initial = problem.params().clone();
    let x0 = initial.values();
    let bounds: Vec<(Option<f64>, Option<f64>)> =
        initial.iter().map(|p| (p.min, p.max)).collect();

    log::info!(
        "fitting {} parameter(s) over {} pair(s), {} residuals, method {}",
        x0.len(),
        problem.n_pairs(),
        problem.n_residuals(),
        method
    );

    let outcome = match method {
        Method::NelderMead => {
            nelder_mead(|x| soft_cost(problem, x), &x0, &bounds, max_evaluations)?
        }
        Method::DifferentialEvolution => {
            let mut hard = Vec::with_capacity(bounds.len());
            for (param, (min, max)) in initial.iter().zip(&bounds) {
                match (min, max) {
                    (Some(lo), Some(hi)) => hard.push((*lo, *hi)),
                    _ => return Err(FitError::MissingBounds(param.name.clone())),
                }
            }
            differential_evolution(|x| soft_cost(problem, x), &hard, max_evaluations)?
        }
        Method::LeastSquares => levenberg_marquardt(
            |x| problem.residuals(x).map(to_dvector),
            &x0,
            &bounds,
            max_evaluations,
        )?,
    };

    problem.apply(&outcome.x)?;

    // Statistics at the optimum.
    let residuals = to_dvector(problem.residuals(&outcome.x)?);
    let n_data = residuals.len();
    let n_varys = outcome.x.len();
    let chisqr = residuals.norm_squared();
    let redchi = if n_data > n_varys {
        chisqr / (n_data - n_varys) as f64
    } else {
        chisqr
    };

    let stderr = standard_errors(problem, &outcome.x, &residuals, redchi);
    // The Jacobian probes wrote perturbed vectors into the models;
    // restore the optimum.
    problem.apply(&outcome.x)?;

    let params = initial
        .iter()
        .enumerate()
        .map(|(i, p)| FittedParam {
            name: p.name.clone(),
            value: outcome.x[i],
            stderr: stderr.as_ref().map(|s| s[i]).filter(|s| s.is_finite()),
            init: p.value,
            min: p.min,
            max: p.max,
        })
        .collect();

    let message = if outcome.converged {
        "converged".to_string()
    } else {
        format!("did not converge within {max_evaluations} evaluations")
    };
    if !outcome.converged {
        log::warn!("{message}; best-found parameters retained");
    }

    Ok(FitReport {
        method,
        converged: outcome.converged,
        message,
        n_eval: outcome.n_eval,
        n_iter: outcome.n_iter,
        n_data,
        n_varys,
        chisqr,
        redchi,
        params,
    })
}

/// Cost wrapper for the derivative-free methods: a trial vector that
/// fails numerically (overflow, degenerate stack) is an infinitely bad
/// trial, not a fatal fit error — the search simply moves away from it.
fn soft_cost(problem: &mut FitProblem<'_>, x: &[f64]) -> Result<f64, FitError> {
    match problem.cost(x) {
        Ok(cost) => Ok(cost),
        Err(FitError::Numeric(e)) => {
            log::debug!("trial vector rejected: {e}");
            Ok(f64::INFINITY)
        }
        Err(e) => Err(e),
    }
}

fn to_dvector(a: ndarray::Array1<f64>) -> DVector<f64> {
    DVector::from_vec(a.to_vec())
}

/// 1-σ standard errors from the Jacobian at the optimum:
/// `sqrt(diag((JᵀJ)⁻¹ · redchi))`. `None` when the problem carries no
/// degrees of freedom or the curvature is singular.
fn standard_errors(
    problem: &mut FitProblem<'_>,
    x: &[f64],
    residuals: &DVector<f64>,
    redchi: f64,
) -> Option<Vec<f64>> {
    if residuals.len() <= x.len() {
        return None;
    }
    let mut n_eval = 0usize;
    let mut f = |trial: &[f64]| problem.residuals(trial).map(to_dvector);
    let j = jacobian(&mut f, x, residuals, &mut n_eval).ok()?;
    let jtj = j.transpose() * &j;
    let covariance = jtj.try_inverse()? * redchi;
    Some(
        (0..x.len())
            .map(|i| covariance[(i, i)].max(0.0).sqrt())
            .collect(),
    )
}
