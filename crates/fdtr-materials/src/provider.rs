//! Thermal material provider trait.
//!
//! All catalog entries implement [`ThermalMaterial`], which evaluates the
//! material at an exact temperature and returns an immutable property
//! snapshot. A temperature change produces a new snapshot; snapshots are
//! never edited in place, so downstream consumers (compiled transfer-matrix
//! stacks) can cache freely and rebuild only on explicit request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the material catalog.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),
}

/// Immutable thermal properties of a material evaluated at one temperature.
///
/// Conductivities are the components of the in-plane/cross-plane tensor:
/// `kxx`/`kyy` in-plane, `kzz` cross-plane (normal to the layer surface),
/// `kxy` the in-plane shear component (zero for all catalog materials).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Material name as listed in the catalog.
    pub name: String,
    /// Volumetric heat capacity, J/(cm³·K).
    pub cp: f64,
    /// In-plane thermal conductivity along x, W/(cm·K).
    pub kxx: f64,
    /// In-plane thermal conductivity along y, W/(cm·K).
    pub kyy: f64,
    /// Cross-plane thermal conductivity, W/(cm·K).
    pub kzz: f64,
    /// In-plane shear conductivity component, W/(cm·K).
    pub kxy: f64,
    /// Density, g/cm³.
    pub density: f64,
}

/// Evaluates temperature-dependent thermal properties.
///
/// Implementations are pure: calling [`ThermalMaterial::properties`] twice
/// at the same temperature returns identical snapshots.
pub trait ThermalMaterial: Send + Sync {
    /// Catalog name of this material.
    fn name(&self) -> &str;

    /// Evaluate the property snapshot at the given temperature (K).
    fn properties(&self, temperature_k: f64) -> MaterialProperties;
}
