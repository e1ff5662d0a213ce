//! The compiled FDTR forward model.
//!
//! [`FdtrModel`] ties a [`Domain`] to the beam geometry and evaluates the
//! observable phase lag at a modulation frequency. Construction compiles
//! the heat path (and the transparent top path, if present) into
//! transfer-matrix stacks; the compiled form is reused across an entire
//! frequency or optimizer sweep and rebuilt only by the structural
//! mutators, which call [`FdtrModel::rebuild`] before returning.
//!
//! Free parameters flow through the compiled stacks as indices into the
//! model's fit-parameter vector, so an optimizer can update values without
//! triggering any recompilation.

use std::cell::Cell;

use num_complex::Complex64;

use crate::backend::Backend;
use crate::domain::{Domain, LayerOverrides, Param, StructuralError};
use crate::params::{FitParams, ParameterError};
use crate::quadrature::{integrate_complex, integrate_complex_2d, NumericError};
use crate::stack::CompiledStack;

/// Default relative tolerance of the radial (beam-centred) integral.
pub const RADIAL_RTOL: f64 = 1e-10;

/// Default relative tolerance of the 2-D beam-offset integral.
pub const OFFSET_RTOL: f64 = 1e-6;

/// Guard against a physically degenerate stack (`|M[1,0]| ≈ 0`).
const DEGENERATE_NORM: f64 = 1e-280;

/// A compiled FDTR forward model.
pub struct FdtrModel {
    domain: Domain,
    pump_radius: f64,
    probe_radius: f64,
    beam_offset: f64,
    backend: Backend,
    radial_rtol: f64,
    offset_rtol: f64,
    params: FitParams,
    stack: CompiledStack,
    top_stack: Option<CompiledStack>,
}

impl FdtrModel {
    /// Compile a model from a domain and beam geometry (cm).
    ///
    /// `params` registers every free parameter the domain's layers and
    /// interfaces reference; unresolved names fail compilation.
    pub fn new(
        domain: Domain,
        pump_radius: f64,
        probe_radius: f64,
        beam_offset: f64,
        params: FitParams,
    ) -> Result<Self, StructuralError> {
        if pump_radius <= 0.0 {
            return Err(StructuralError::NonPositiveBeamRadius(pump_radius));
        }
        if probe_radius <= 0.0 {
            return Err(StructuralError::NonPositiveBeamRadius(probe_radius));
        }
        if domain.heat_path().is_empty() {
            return Err(StructuralError::MissingSubstrate);
        }
        let mut model = Self {
            domain,
            pump_radius,
            probe_radius,
            beam_offset,
            backend: Backend::default(),
            radial_rtol: RADIAL_RTOL,
            offset_rtol: OFFSET_RTOL,
            params,
            stack: CompiledStack::compile(&[], &FitParams::new())?,
            top_stack: None,
        };
        model.rebuild()?;
        Ok(model)
    }

    /// Select the matrix-evaluation backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Override the integration tolerances.
    pub fn with_tolerances(mut self, radial_rtol: f64, offset_rtol: f64) -> Self {
        self.radial_rtol = radial_rtol;
        self.offset_rtol = offset_rtol;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn pump_radius(&self) -> f64 {
        self.pump_radius
    }

    pub fn probe_radius(&self) -> f64 {
        self.probe_radius
    }

    pub fn beam_offset(&self) -> f64 {
        self.beam_offset
    }

    pub fn params(&self) -> &FitParams {
        &self.params
    }

    /// Update one free parameter's value. No rebuild needed: compiled
    /// stacks read values through the parameter vector.
    pub fn set_param_value(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        self.params.set_value(name, value)
    }

    /// Overwrite all free-parameter values in compiled order.
    pub fn set_param_values(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        self.params.set_values(values)
    }

    /// Recompile both stacks from the domain. Called by every structural
    /// mutator; also available for callers that mutated the domain before
    /// handing it over.
    pub fn rebuild(&mut self) -> Result<(), StructuralError> {
        self.stack = CompiledStack::compile(self.domain.heat_path(), &self.params)?;
        self.top_stack = if self.domain.top_heat_path().is_empty() {
            None
        } else {
            Some(CompiledStack::compile(
                self.domain.top_heat_path(),
                &self.params,
            )?)
        };
        log::debug!(
            "compiled stack: {} layers, top path: {}",
            self.domain.layer_count(),
            self.domain.top_layer_count(),
        );
        Ok(())
    }

    /// Change the sample temperature and rebuild.
    pub fn set_temperature(&mut self, temperature_k: f64) -> Result<(), StructuralError> {
        self.domain.set_temperature(temperature_k);
        self.rebuild()
    }

    /// Override main-path layer properties and rebuild.
    pub fn set_layer_param(
        &mut self,
        slot: usize,
        overrides: LayerOverrides,
    ) -> Result<(), StructuralError> {
        self.domain.set_layer_param(slot, overrides)?;
        self.rebuild()
    }

    /// Override top-path layer properties and rebuild.
    pub fn set_top_layer_param(
        &mut self,
        slot: usize,
        overrides: LayerOverrides,
    ) -> Result<(), StructuralError> {
        self.domain.set_top_layer_param(slot, overrides)?;
        self.rebuild()
    }

    /// Set a main-path interface conductance and rebuild.
    pub fn set_interface_conductance(
        &mut self,
        slot: usize,
        conductance: impl Into<Param>,
    ) -> Result<(), StructuralError> {
        self.domain.set_interface_conductance(slot, conductance)?;
        self.rebuild()
    }

    /// Set a top-path interface conductance and rebuild.
    pub fn set_top_interface_conductance(
        &mut self,
        slot: usize,
        conductance: impl Into<Param>,
    ) -> Result<(), StructuralError> {
        self.domain
            .set_top_interface_conductance(slot, conductance)?;
        self.rebuild()
    }

    /// Upper integration bound: the Gaussian beam-overlap factor is
    /// negligible beyond `20 / sqrt(r_pump² + r_probe²)`.
    fn upper_bound(&self) -> f64 {
        20.0 / (self.pump_radius * self.pump_radius + self.probe_radius * self.probe_radius).sqrt()
    }

    /// Surface temperature response `−M₁₁/M₁₀` (top-combined when a
    /// transparent path exists) at one spatial-frequency point.
    fn response(
        &self,
        eps: f64,
        eta: f64,
        omega: f64,
        values: &[f64],
        frequency_hz: f64,
        failure: &Cell<Option<NumericError>>,
    ) -> Complex64 {
        let m = self.stack.composite(eps, eta, omega, values, self.backend);
        let m10 = m.0[1][0];
        let m11 = m.0[1][1];

        if !m10.is_finite() || !m11.is_finite() {
            if failure.get().is_none() {
                failure.set(Some(NumericError::HyperbolicOverflow { frequency_hz }));
            }
            return Complex64::from(0.0);
        }
        if m10.norm_sqr() < DEGENERATE_NORM {
            if failure.get().is_none() {
                failure.set(Some(NumericError::DegenerateStack { frequency_hz }));
            }
            return Complex64::from(0.0);
        }

        let ratio = m11 / m10;
        let z = match &self.top_stack {
            None => -ratio,
            Some(top) => {
                // Parallel combination with the transparent top path.
                let t = top.composite(eps, eta, omega, values, self.backend);
                let t00 = t.0[0][0];
                let t10 = t.0[1][0];
                -(ratio / (Complex64::from(1.0) + (m11 * t10) / (m10 * t00)))
            }
        };

        if !z.is_finite() {
            if failure.get().is_none() {
                failure.set(Some(NumericError::HyperbolicOverflow { frequency_hz }));
            }
            return Complex64::from(0.0);
        }
        z
    }

    /// Predicted phase lag in degrees at a modulation frequency, using
    /// the model's stored parameter values.
    pub fn get_phase(&self, frequency_hz: f64) -> Result<f64, NumericError> {
        self.get_phase_with(&self.params.values(), frequency_hz)
    }

    /// Phase sensitivity sweep; see [`crate::sensitivity::sensitivity`].
    pub fn sensitivity(
        &self,
        name: &str,
        freq_range: (f64, f64),
        steps: usize,
    ) -> Result<(Vec<f64>, Vec<f64>), crate::sensitivity::SensitivityError> {
        crate::sensitivity::sensitivity(self, name, freq_range, steps)
    }

    /// Predicted phase lag against an explicit trial parameter vector in
    /// the compiled ordering. Pure: does not touch stored values.
    ///
    /// # Panics
    /// Panics if the vector length diverges from the compiled ordering;
    /// callers guard the pairing once per fit, not per evaluation.
    pub fn get_phase_with(&self, values: &[f64], frequency_hz: f64) -> Result<f64, NumericError> {
        assert_eq!(
            values.len(),
            self.params.len(),
            "parameter vector does not match compiled ordering"
        );

        let omega = 2.0 * std::f64::consts::PI * frequency_hz;
        let upper = self.upper_bound();
        let r_sq = self.pump_radius * self.pump_radius + self.probe_radius * self.probe_radius;
        let failure = Cell::new(None);

        let result = if self.beam_offset == 0.0 {
            // Radially symmetric case: 1-D Hankel-type integral.
            integrate_complex(
                |eps| {
                    let gaussian = (-(r_sq * eps * eps) / 8.0).exp();
                    eps / (2.0 * std::f64::consts::PI)
                        * gaussian
                        * self.response(eps, 0.0, omega, values, frequency_hz, &failure)
                },
                0.0,
                upper,
                self.radial_rtol,
            )
        } else {
            // Offset pump and probe: full 2-D Fourier inversion.
            let norm = 1.0 / (4.0 * std::f64::consts::PI * std::f64::consts::PI);
            integrate_complex_2d(
                |eps, eta| {
                    let gaussian = (-(r_sq * (eps * eps + eta * eta)) / 8.0).exp();
                    let shift = Complex64::new(0.0, eps * self.beam_offset).exp();
                    norm * gaussian
                        * shift
                        * self.response(eps, eta, omega, values, frequency_hz, &failure)
                },
                (-upper, upper),
                (-upper, upper),
                self.offset_rtol,
            )
        };

        // A detected overflow or degeneracy is more specific than the
        // quadrature error it caused.
        if let Some(e) = failure.get() {
            return Err(e);
        }
        let r = result?;

        let phase = (r.im / r.re).atan().to_degrees();
        // Third/fourth-quadrant convention used throughout the FDTR
        // literature; experimental fits depend on it.
        if phase < 0.0 {
            Ok(phase)
        } else {
            Ok(phase - 180.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdtr_materials::catalog;
    use std::sync::Arc;

    fn gold_on_sapphire() -> Domain {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(Arc::new(catalog::sapphire())).unwrap();
        domain.add_layer(60e-7, Arc::new(catalog::gold())).unwrap();
        domain.set_interface_conductance(1, 5e3).unwrap();
        domain
    }

    #[test]
    fn test_model_rejects_bad_geometry() {
        let err = FdtrModel::new(gold_on_sapphire(), 0.0, 4.05e-4, 0.0, FitParams::new());
        assert!(matches!(
            err,
            Err(StructuralError::NonPositiveBeamRadius(_))
        ));

        let empty = Domain::new(300.0);
        assert!(matches!(
            FdtrModel::new(empty, 4.05e-4, 4.05e-4, 0.0, FitParams::new()),
            Err(StructuralError::MissingSubstrate)
        ));
    }

    #[test]
    fn test_missing_conductance_fails_at_construction() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(Arc::new(catalog::sapphire())).unwrap();
        domain.add_layer(60e-7, Arc::new(catalog::gold())).unwrap();
        assert!(matches!(
            FdtrModel::new(domain, 4.05e-4, 4.05e-4, 0.0, FitParams::new()),
            Err(StructuralError::MissingConductance { .. })
        ));
    }

    #[test]
    fn test_free_parameter_updates_need_no_rebuild() {
        let mut domain = gold_on_sapphire();
        domain
            .set_interface_conductance(1, Param::Free("g".into()))
            .unwrap();
        let mut params = FitParams::new();
        params.add("g", 5e3, None, None).unwrap();
        let mut model = FdtrModel::new(domain, 4.05e-4, 4.05e-4, 0.0, params).unwrap();

        let before = model.get_phase(1e6).unwrap();
        model.set_param_value("g", 1e3).unwrap();
        let after = model.get_phase(1e6).unwrap();
        assert!(
            (before - after).abs() > 0.1,
            "conductance change must reach the integrand: {before} vs {after}"
        );
    }

    #[test]
    fn test_get_phase_with_is_pure() {
        let mut domain = gold_on_sapphire();
        domain
            .set_interface_conductance(1, Param::Free("g".into()))
            .unwrap();
        let mut params = FitParams::new();
        params.add("g", 5e3, None, None).unwrap();
        let model = FdtrModel::new(domain, 4.05e-4, 4.05e-4, 0.0, params).unwrap();

        let stored = model.get_phase(1e6).unwrap();
        let _ = model.get_phase_with(&[1e2], 1e6).unwrap();
        // Stored value untouched by the trial evaluation.
        assert_eq!(model.params().value("g").unwrap(), 5e3);
        assert_eq!(model.get_phase(1e6).unwrap(), stored);
    }
}
