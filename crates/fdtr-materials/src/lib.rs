//! # FDTR Materials
//!
//! Thermal material properties for the FDTR framework. All materials
//! implement the [`provider::ThermalMaterial`] trait, which evaluates
//! temperature-dependent thermal properties into an immutable
//! [`provider::MaterialProperties`] snapshot.
//!
//! ## Units
//!
//! The whole workspace uses centimetre-based units, which keep the
//! hyperbolic arguments in the transfer matrices well-scaled:
//!
//! | Quantity | Unit |
//! |----------|------|
//! | Length / thickness | cm |
//! | Thermal conductivity | W/(cm·K) |
//! | Volumetric heat capacity | J/(cm³·K) |
//! | Interface conductance | W/(cm²·K) |
//! | Density | g/cm³ |
//!
//! ## Catalog
//!
//! A fixed set of named materials is provided in [`catalog`], each a pure
//! function of temperature. Temperature-dependent entries (Sapphire, Gold)
//! use polynomial or power-law fits from [`fits`]; the rest carry
//! constant room-temperature values.

pub mod catalog;
pub mod fits;
pub mod provider;

pub use catalog::by_name;
pub use provider::{MaterialError, MaterialProperties, ThermalMaterial};
