//! Compiled transfer-matrix stacks.
//!
//! Each layer of a heat path contributes a 2×2 matrix relating the
//! (temperature, heat-flux) amplitudes at its two faces in the
//! (spatial-frequency, angular-frequency) domain:
//!
//! ```text
//! μ = sqrt((kxx ε² + kyy η² + 2 kxy ε η + i ω cp) / kzz)
//! L = [[ cosh(μd), −sinh(μd)/(kzz μ) ],
//!      [ −kzz μ sinh(μd), cosh(μd)  ]]
//! ```
//!
//! and each interface of conductance `g` contributes
//! `[[1, −1/g], [0, 1]]`. The composite matrix is the ordered product,
//! substrate first; the product is non-commutative and must follow
//! heat-path order exactly.
//!
//! Compilation lowers a [`PathElement`](crate::domain::PathElement)
//! sequence into coefficients that are either literal constants or indices
//! into the fit-parameter vector ([`Coeff`]). The compiled stack is
//! rebuilt on structural change and reused across an entire
//! frequency/optimizer sweep; free-parameter value changes need no
//! rebuild.

use num_complex::Complex64;

use crate::backend::Backend;
use crate::domain::{Param, PathElement, StructuralError};
use crate::params::{FitParams, ParameterError};

/// Stack-allocated 2×2 complex matrix (zero heap allocation in the
/// integrand's inner loop).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix2c(pub [[Complex64; 2]; 2]);

impl Matrix2c {
    pub fn identity() -> Self {
        let one = Complex64::from(1.0);
        let zero = Complex64::from(0.0);
        Self([[one, zero], [zero, one]])
    }

    /// Matrix product `self · rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [[Complex64::from(0.0); 2]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = a[i][0] * b[0][j] + a[i][1] * b[1][j];
            }
        }
        Self(out)
    }

    pub fn determinant(&self) -> Complex64 {
        self.0[0][0] * self.0[1][1] - self.0[0][1] * self.0[1][0]
    }
}

/// A compiled coefficient: a literal, or an index into the fit-parameter
/// vector.
#[derive(Debug, Clone, Copy)]
pub enum Coeff {
    Const(f64),
    Var(usize),
}

impl Coeff {
    fn resolve(param: &Param, params: &FitParams) -> Result<Self, ParameterError> {
        match param {
            Param::Fixed(v) => Ok(Coeff::Const(*v)),
            Param::Free(name) => params
                .index_of(name)
                .map(Coeff::Var)
                .ok_or_else(|| ParameterError::UnknownParameter(name.clone())),
        }
    }

    /// Resolve against the current parameter vector. The vector length is
    /// guarded upstream; an out-of-range index is a programming error.
    #[inline]
    pub fn get(&self, values: &[f64]) -> f64 {
        match self {
            Coeff::Const(v) => *v,
            Coeff::Var(i) => values[*i],
        }
    }
}

/// A layer lowered to evaluation coefficients.
#[derive(Debug, Clone)]
pub struct CompiledLayer {
    pub thickness: Coeff,
    pub cp: Coeff,
    pub kxx: Coeff,
    pub kyy: Coeff,
    pub kzz: Coeff,
    pub kxy: Coeff,
}

impl CompiledLayer {
    /// Layer matrix at in-plane spatial frequencies (ε, η) and angular
    /// frequency ω. The radial (beam-centred) case sets η = 0.
    pub fn matrix(
        &self,
        eps: f64,
        eta: f64,
        omega: f64,
        values: &[f64],
        backend: Backend,
    ) -> Matrix2c {
        let d = self.thickness.get(values);
        let cp = self.cp.get(values);
        let kxx = self.kxx.get(values);
        let kyy = self.kyy.get(values);
        let kzz = self.kzz.get(values);
        let kxy = self.kxy.get(values);

        let mu = Complex64::new(
            (kxx * eps * eps + kyy * eta * eta + 2.0 * kxy * eps * eta) / kzz,
            omega * cp / kzz,
        )
        .sqrt();
        let (ch, sh) = backend.hyperbolic_pair(mu * d);
        let kmu = kzz * mu;

        Matrix2c([[ch, -sh / kmu], [-kmu * sh, ch]])
    }
}

/// An interface lowered to its conductance coefficient.
#[derive(Debug, Clone)]
pub struct CompiledInterface {
    pub conductance: Coeff,
}

impl CompiledInterface {
    pub fn matrix(&self, values: &[f64]) -> Matrix2c {
        let g = self.conductance.get(values);
        let one = Complex64::from(1.0);
        let zero = Complex64::from(0.0);
        Matrix2c([[one, Complex64::from(-1.0 / g)], [zero, one]])
    }
}

#[derive(Debug, Clone)]
pub enum CompiledElement {
    Layer(CompiledLayer),
    Interface(CompiledInterface),
}

/// A heat path lowered to an evaluable transfer-matrix sequence.
#[derive(Debug, Clone)]
pub struct CompiledStack {
    elements: Vec<CompiledElement>,
}

impl CompiledStack {
    /// Lower a heat path against a parameter set.
    ///
    /// Fails if any interface is missing its conductance or any free
    /// parameter name is not registered in `params`.
    pub fn compile(path: &[PathElement], params: &FitParams) -> Result<Self, StructuralError> {
        let mut elements = Vec::with_capacity(path.len());
        let mut interface_slot = 0usize;
        for element in path {
            match element {
                PathElement::Layer(layer) => {
                    elements.push(CompiledElement::Layer(CompiledLayer {
                        thickness: Coeff::resolve(&layer.thickness(), params)?,
                        cp: Coeff::resolve(&layer.cp(), params)?,
                        kxx: Coeff::resolve(&layer.kxx(), params)?,
                        kyy: Coeff::resolve(&layer.kyy(), params)?,
                        kzz: Coeff::resolve(&layer.kzz(), params)?,
                        kxy: Coeff::resolve(&layer.kxy(), params)?,
                    }));
                }
                PathElement::Interface(interface) => {
                    interface_slot += 1;
                    let (below, above) = interface.between();
                    let conductance = interface.conductance().ok_or_else(|| {
                        StructuralError::MissingConductance {
                            slot: interface_slot,
                            below: below.to_string(),
                            above: above.to_string(),
                        }
                    })?;
                    elements.push(CompiledElement::Interface(CompiledInterface {
                        conductance: Coeff::resolve(conductance, params)?,
                    }));
                }
            }
        }
        Ok(Self { elements })
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Composite matrix: the ordered product of all element matrices,
    /// substrate first.
    pub fn composite(
        &self,
        eps: f64,
        eta: f64,
        omega: f64,
        values: &[f64],
        backend: Backend,
    ) -> Matrix2c {
        let mut m = Matrix2c::identity();
        for element in &self.elements {
            let next = match element {
                CompiledElement::Layer(layer) => layer.matrix(eps, eta, omega, values, backend),
                CompiledElement::Interface(interface) => interface.matrix(values),
            };
            m = m.mul(&next);
        }
        m
    }
}
