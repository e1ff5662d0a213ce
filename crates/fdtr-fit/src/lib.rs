//! # FDTR Fit
//!
//! Parameter fitting for FDTR models. A [`problem::FitProblem`] joins one
//! or more (model, dataset) pairs sharing named free parameters into a
//! single residual function; [`engine::minimize`] drives one of three
//! caller-selected optimizers over it:
//!
//! | Method | Character | Bounds |
//! |--------|-----------|--------|
//! | [`engine::Method::NelderMead`] | robust simplex, noise-tolerant | optional |
//! | [`engine::Method::DifferentialEvolution`] | global, for rugged surfaces | mandatory |
//! | [`engine::Method::LeastSquares`] | Levenberg–Marquardt, fast local | optional |
//!
//! Residuals from multiple pairs are stacked, never averaged: a pair with
//! more points carries proportionally more weight. Parameter ordering is
//! fixed once when the problem is built and guarded thereafter; an
//! ordering mismatch aborts the fit.

pub mod dataset;
pub mod engine;
pub mod problem;
pub mod report;

mod devo;
mod lm;
mod nelder;

pub use dataset::{DataError, Dataset};
pub use engine::{minimize, FitError, Method};
pub use problem::FitProblem;
pub use report::{FitReport, FittedParam};
