//! # FDTR Core
//!
//! The numerical backbone of the FDTR framework. This crate models a
//! frequency-domain thermoreflectance experiment: a layered sample is
//! heated by a modulated pump beam, and the phase lag of the surface
//! temperature oscillation, averaged over a probe beam, is predicted as a
//! function of modulation frequency.
//!
//! ## Architecture
//!
//! - [`domain`] — Layer stacks and interfaces forming a heat path.
//! - [`params`] — Named free parameters resolved at evaluation time.
//! - [`stack`] — Compiled transfer-matrix stacks (the frequency-domain
//!   heat-diffusion transfer function of the layered sample).
//! - [`backend`] — Selectable matrix-evaluation backends (standard f64
//!   and an overflow-robust scaled variant).
//! - [`quadrature`] — Adaptive Gauss–Kronrod integration of the
//!   spatial-frequency integrals.
//! - [`model`] — [`model::FdtrModel`], the compiled forward model with
//!   [`model::FdtrModel::get_phase`].
//! - [`sensitivity`] — Finite-difference phase sensitivity sweeps.
//!
//! All lengths are in cm, conductivities in W/(cm·K), heat capacities in
//! J/(cm³·K), conductances in W/(cm²·K) (see `fdtr-materials`).

pub mod backend;
pub mod domain;
pub mod model;
pub mod params;
pub mod quadrature;
pub mod sensitivity;
pub mod stack;

pub use backend::Backend;
pub use domain::{Domain, Param, StructuralError};
pub use model::FdtrModel;
pub use params::{FitParam, FitParams, ParameterError};
pub use quadrature::NumericError;
