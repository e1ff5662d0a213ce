//! Fit result reporting.

use std::fmt;

use serde::Serialize;

use crate::engine::Method;

/// One fitted parameter with its uncertainty estimate.
#[derive(Debug, Clone, Serialize)]
pub struct FittedParam {
    pub name: String,
    pub value: f64,
    /// 1-σ standard error from the covariance at the optimum, when
    /// estimable.
    pub stderr: Option<f64>,
    pub init: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Outcome of a [`minimize`](crate::engine::minimize) run.
///
/// A non-converged fit still carries the best-found parameters: partial
/// results have diagnostic value.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub method: Method,
    pub converged: bool,
    pub message: String,
    /// Residual-function evaluations performed by the optimizer.
    pub n_eval: usize,
    /// Optimizer iterations (generations for differential evolution).
    pub n_iter: usize,
    pub n_data: usize,
    pub n_varys: usize,
    pub chisqr: f64,
    pub redchi: f64,
    pub params: Vec<FittedParam>,
}

impl FitReport {
    /// Fitted value of a parameter by name.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value)
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[[Fit Statistics]]")?;
        writeln!(f, "    # fitting method   = {}", self.method)?;
        writeln!(f, "    # function evals   = {}", self.n_eval)?;
        writeln!(f, "    # iterations       = {}", self.n_iter)?;
        writeln!(f, "    # data points      = {}", self.n_data)?;
        writeln!(f, "    # variables        = {}", self.n_varys)?;
        writeln!(f, "    chi-square         = {:.6e}", self.chisqr)?;
        writeln!(f, "    reduced chi-square = {:.6e}", self.redchi)?;
        writeln!(f, "    status             = {}", self.message)?;
        writeln!(f, "[[Variables]]")?;
        for p in &self.params {
            write!(f, "    {}: {:.6e}", p.name, p.value)?;
            if let Some(stderr) = p.stderr {
                let percent = if p.value != 0.0 {
                    100.0 * stderr / p.value.abs()
                } else {
                    f64::NAN
                };
                write!(f, " +/- {stderr:.3e} ({percent:.2}%)")?;
            }
            writeln!(f, " (init = {:.6e})", p.init)?;
        }
        Ok(())
    }
}
