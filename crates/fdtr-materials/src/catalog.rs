//! The material catalog: a fixed set of named thermal materials.
//!
//! Two kinds of entries exist. [`FittedMaterial`] evaluates polynomial or
//! power-law fits to handbook data and is genuinely temperature-dependent
//! (Sapphire, Gold). [`ConstantMaterial`] carries room-temperature values
//! for materials where no fit is available; it ignores the requested
//! temperature but still returns a fresh snapshot per call.

use crate::fits::{polynomial, power_law};
use crate::provider::{MaterialError, MaterialProperties, ThermalMaterial};

/// A material whose cp and conductivity follow fitted curves in T.
///
/// `cp` coefficients are a polynomial in J/(m³·K), converted to J/(cm³·K)
/// on evaluation; the conductivity power law is in W/(m·K), converted to
/// W/(cm·K). The cross-plane conductivity may use its own fit.
pub struct FittedMaterial {
    name: &'static str,
    density: f64,
    cp_poly: &'static [f64],
    k_inplane: KFit,
    k_crossplane: KFit,
}

/// Conductivity fit: either a power law `a + b·T^c` or a polynomial.
enum KFit {
    PowerLaw { a: f64, b: f64, c: f64 },
    Polynomial(&'static [f64]),
}

impl KFit {
    fn eval_w_per_cm_k(&self, t: f64) -> f64 {
        let w_per_m_k = match self {
            KFit::PowerLaw { a, b, c } => power_law(t, *a, *b, *c),
            KFit::Polynomial(coeffs) => polynomial(t, coeffs),
        };
        1.0e-2 * w_per_m_k
    }
}

impl ThermalMaterial for FittedMaterial {
    fn name(&self) -> &str {
        self.name
    }

    fn properties(&self, temperature_k: f64) -> MaterialProperties {
        let cp = 1.0e-6 * polynomial(temperature_k, self.cp_poly);
        let k_in = self.k_inplane.eval_w_per_cm_k(temperature_k);
        let k_cross = self.k_crossplane.eval_w_per_cm_k(temperature_k);
        MaterialProperties {
            name: self.name.to_string(),
            cp,
            kxx: k_in,
            kyy: k_in,
            kzz: k_cross,
            kxy: 0.0,
            density: self.density,
        }
    }
}

/// A material with fixed room-temperature properties.
pub struct ConstantMaterial {
    name: &'static str,
    cp: f64,
    k_inplane: f64,
    k_crossplane: f64,
    density: f64,
}

impl ThermalMaterial for ConstantMaterial {
    fn name(&self) -> &str {
        self.name
    }

    fn properties(&self, _temperature_k: f64) -> MaterialProperties {
        MaterialProperties {
            name: self.name.to_string(),
            cp: self.cp,
            kxx: self.k_inplane,
            kyy: self.k_inplane,
            kzz: self.k_crossplane,
            kxy: 0.0,
            density: self.density,
        }
    }
}

/// Single-crystal sapphire (Al₂O₃).
pub fn sapphire() -> FittedMaterial {
    FittedMaterial {
        name: "Sapphire",
        density: 3.97,
        cp_poly: &[-1.6373e6, 24234.3, -33.2459, 0.016_045_7],
        k_inplane: KFit::PowerLaw {
            a: 10.8225,
            b: 4.940_27e7,
            c: -2.561_39,
        },
        k_crossplane: KFit::PowerLaw {
            a: 10.8225,
            b: 4.940_27e7,
            c: -2.561_39,
        },
    }
}

/// Evaporated gold film.
pub fn gold() -> FittedMaterial {
    FittedMaterial {
        name: "Gold",
        density: 19.3,
        cp_poly: &[
            1.212_01e6,
            13615.4,
            -60.5398,
            0.136_611,
            -1.466_41e-4,
            5.991_02e-8,
        ],
        k_inplane: KFit::Polynomial(&[69.1593, -0.009_147, -4.375_55e-6]),
        k_crossplane: KFit::Polynomial(&[69.1593, -0.009_147, -4.375_55e-6]),
    }
}

/// Amorphous alumina (ALD Al₂O₃).
pub fn alumina() -> ConstantMaterial {
    ConstantMaterial {
        name: "Alumina",
        cp: 2.15,
        k_inplane: 1.0e-2,
        k_crossplane: 1.0e-2,
        density: 3.15,
    }
}

/// Strontium titanate.
pub fn sto() -> ConstantMaterial {
    ConstantMaterial {
        name: "STO",
        cp: 2.72,
        k_inplane: 9.8e-2,
        k_crossplane: 9.8e-2,
        density: 5.11,
    }
}

/// Layered In₂Se₃; strongly anisotropic (in-plane ≫ cross-plane).
pub fn in2se3() -> ConstantMaterial {
    ConstantMaterial {
        name: "In2Se3",
        cp: 2.55,
        k_inplane: 0.10,
        k_crossplane: 2.0e-3,
        density: 5.67,
    }
}

/// Still air.
pub fn air() -> ConstantMaterial {
    ConstantMaterial {
        name: "Air",
        cp: 1.2e-3,
        k_inplane: 2.6e-4,
        k_crossplane: 2.6e-4,
        density: 1.2e-3,
    }
}

/// Liquid water.
pub fn water() -> ConstantMaterial {
    ConstantMaterial {
        name: "Water",
        cp: 4.18,
        k_inplane: 6.0e-3,
        k_crossplane: 6.0e-3,
        density: 1.0,
    }
}

/// Isopropyl alcohol.
pub fn ipa() -> ConstantMaterial {
    ConstantMaterial {
        name: "IPA",
        cp: 2.04,
        k_inplane: 1.35e-3,
        k_crossplane: 1.35e-3,
        density: 0.786,
    }
}

/// Fused-silica glass.
pub fn glass() -> ConstantMaterial {
    ConstantMaterial {
        name: "Glass",
        cp: 1.63,
        k_inplane: 1.38e-2,
        k_crossplane: 1.38e-2,
        density: 2.20,
    }
}

/// Generic placeholder material.
pub fn default_material() -> ConstantMaterial {
    ConstantMaterial {
        name: "Default",
        cp: 1.0,
        k_inplane: 0.5,
        k_crossplane: 0.5,
        density: 1.0,
    }
}

/// All catalog names, in display order.
pub const CATALOG_NAMES: [&str; 10] = [
    "Sapphire", "Alumina", "Gold", "STO", "Air", "Water", "IPA", "Glass", "In2Se3", "Default",
];

/// Look up a catalog material by name (case-insensitive).
pub fn by_name(name: &str) -> Result<Box<dyn ThermalMaterial>, MaterialError> {
    match name.to_ascii_lowercase().as_str() {
        "sapphire" => Ok(Box::new(sapphire())),
        "alumina" => Ok(Box::new(alumina())),
        "gold" | "au" => Ok(Box::new(gold())),
        "sto" => Ok(Box::new(sto())),
        "air" => Ok(Box::new(air())),
        "water" => Ok(Box::new(water())),
        "ipa" => Ok(Box::new(ipa())),
        "glass" => Ok(Box::new(glass())),
        "in2se3" => Ok(Box::new(in2se3())),
        "default" => Ok(Box::new(default_material())),
        _ => Err(MaterialError::UnknownMaterial(name.to_string())),
    }
}
