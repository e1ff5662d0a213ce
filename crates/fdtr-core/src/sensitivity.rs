//! Phase sensitivity to a fit parameter across a frequency sweep.
//!
//! Diagnostic only: the result says which frequency decades carry
//! information about a parameter, guiding which datasets are worth
//! fitting. Nothing here mutates the model's stored parameter values.

use rayon::prelude::*;
use thiserror::Error;

use crate::model::FdtrModel;
use crate::params::ParameterError;
use crate::quadrature::NumericError;

/// Sweep defaults matching the instrument's usable band.
pub const DEFAULT_FREQ_RANGE: (f64, f64) = (1e3, 40e6);
pub const DEFAULT_STEPS: usize = 200;

/// Relative finite-difference step on the parameter value.
const RELATIVE_STEP: f64 = 1e-3;

#[derive(Debug, Error)]
pub enum SensitivityError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Numeric(#[from] NumericError),
}

/// Logarithmically spaced grid over `[start, stop]`, inclusive.
pub fn log_spaced(start: f64, stop: f64, steps: usize) -> Vec<f64> {
    assert!(start > 0.0 && stop > start, "need 0 < start < stop");
    assert!(steps >= 2, "need at least two sweep points");
    let log_start = start.log10();
    let log_step = (stop.log10() - log_start) / (steps - 1) as f64;
    (0..steps)
        .map(|i| 10f64.powf(log_start + log_step * i as f64))
        .collect()
}

/// Central-difference derivative of phase with respect to a named free
/// parameter, over a log-spaced frequency sweep.
///
/// Returns `(frequencies_hz, d_phase_deg / d_parameter)`. The parameter's
/// stored value is read but never written; trial values go through
/// [`FdtrModel::get_phase_with`].
pub fn sensitivity(
    model: &FdtrModel,
    name: &str,
    freq_range: (f64, f64),
    steps: usize,
) -> Result<(Vec<f64>, Vec<f64>), SensitivityError> {
    let index = model
        .params()
        .index_of(name)
        .ok_or_else(|| ParameterError::UnknownParameter(name.to_string()))?;

    let centre = model.params().values();
    let step = (centre[index].abs() * RELATIVE_STEP).max(1e-12);

    let mut plus = centre.clone();
    plus[index] += step;
    let mut minus = centre;
    minus[index] -= step;

    let frequencies = log_spaced(freq_range.0, freq_range.1, steps);
    let derivatives = frequencies
        .par_iter()
        .map(|&f| {
            let hi = model.get_phase_with(&plus, f)?;
            let lo = model.get_phase_with(&minus, f)?;
            Ok((hi - lo) / (2.0 * step))
        })
        .collect::<Result<Vec<f64>, NumericError>>()?;

    Ok((frequencies, derivatives))
}
