//! Layered sample domains.
//!
//! A [`Domain`] holds the heat path of an FDTR sample: an ordered,
//! alternating sequence of layers and interfaces, substrate first. An
//! optional second path ([`Domain::top_heat_path`]) carries optically
//! transparent layers sitting above the opaque stack; it is combined with
//! the main path by a parallel-impedance formula at evaluation time.
//!
//! Layer slots are 1-based externally (slot 0 is the substrate); the
//! interface before layer slot `i` shares its number. Internally both
//! paths are flat alternating vectors.

use std::sync::Arc;

use fdtr_materials::{MaterialProperties, ThermalMaterial};
use thiserror::Error;

use crate::params::ParameterError;

/// Pseudo-thickness assigned to the semi-infinite substrate (10 µm).
pub const SUBSTRATE_THICKNESS_CM: f64 = 1.0e-3;

/// Errors raised while building or compiling a heat path. Fatal to the
/// current build step; the caller must fix the structure and retry.
#[derive(Debug, Error)]
pub enum StructuralError {
    #[error("Substrate already defined")]
    SubstrateAlreadyDefined,

    #[error("No substrate defined; add a substrate before adding layers")]
    MissingSubstrate,

    #[error("Layer thickness must be positive, got {0}")]
    NonPositiveThickness(f64),

    #[error("Beam radius must be positive, got {0}")]
    NonPositiveBeamRadius(f64),

    #[error("Layer slot {slot} out of range (path has {layers} layers)")]
    LayerSlotOutOfRange { slot: usize, layers: usize },

    #[error("Interface slot {slot} out of range (path has {interfaces} interfaces)")]
    InterfaceSlotOutOfRange { slot: usize, interfaces: usize },

    #[error("Interface {slot} between {below} and {above} has no conductance set")]
    MissingConductance {
        slot: usize,
        below: String,
        above: String,
    },

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// A layer or interface property: a literal value, or a reference to a
/// named free parameter resolved at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Fixed(f64),
    Free(String),
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Fixed(v)
    }
}

/// Per-field overrides for [`Domain::set_layer_param`]. Fields left `None`
/// keep their prior value.
#[derive(Debug, Clone, Default)]
pub struct LayerOverrides {
    pub thickness: Option<Param>,
    pub cp: Option<Param>,
    pub kxx: Option<Param>,
    pub kyy: Option<Param>,
    pub kzz: Option<Param>,
    pub kxy: Option<Param>,
}

/// One material layer in a heat path.
///
/// The material snapshot supplies default properties; each property can be
/// individually overridden by a literal or a free parameter. Overrides
/// survive temperature changes, snapshot-derived values do not.
pub struct Layer {
    material: Arc<dyn ThermalMaterial>,
    snapshot: MaterialProperties,
    thickness: Param,
    overrides: LayerOverrides,
}

impl Layer {
    fn new(thickness: Param, material: Arc<dyn ThermalMaterial>, temperature_k: f64) -> Self {
        let snapshot = material.properties(temperature_k);
        Self {
            material,
            snapshot,
            thickness,
            overrides: LayerOverrides::default(),
        }
    }

    pub fn material_name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn snapshot(&self) -> &MaterialProperties {
        &self.snapshot
    }

    pub fn thickness(&self) -> Param {
        self.overrides
            .thickness
            .clone()
            .unwrap_or_else(|| self.thickness.clone())
    }

    pub fn cp(&self) -> Param {
        self.overrides
            .cp
            .clone()
            .unwrap_or(Param::Fixed(self.snapshot.cp))
    }

    pub fn kxx(&self) -> Param {
        self.overrides
            .kxx
            .clone()
            .unwrap_or(Param::Fixed(self.snapshot.kxx))
    }

    pub fn kyy(&self) -> Param {
        self.overrides
            .kyy
            .clone()
            .unwrap_or(Param::Fixed(self.snapshot.kyy))
    }

    pub fn kzz(&self) -> Param {
        self.overrides
            .kzz
            .clone()
            .unwrap_or(Param::Fixed(self.snapshot.kzz))
    }

    pub fn kxy(&self) -> Param {
        self.overrides
            .kxy
            .clone()
            .unwrap_or(Param::Fixed(self.snapshot.kxy))
    }

    fn apply_overrides(&mut self, overrides: LayerOverrides) -> Result<(), StructuralError> {
        if let Some(Param::Fixed(d)) = &overrides.thickness {
            if *d <= 0.0 {
                return Err(StructuralError::NonPositiveThickness(*d));
            }
        }
        let LayerOverrides {
            thickness,
            cp,
            kxx,
            kyy,
            kzz,
            kxy,
        } = overrides;
        if thickness.is_some() {
            self.overrides.thickness = thickness;
        }
        if cp.is_some() {
            self.overrides.cp = cp;
        }
        if kxx.is_some() {
            self.overrides.kxx = kxx;
        }
        if kyy.is_some() {
            self.overrides.kyy = kyy;
        }
        if kzz.is_some() {
            self.overrides.kzz = kzz;
        }
        if kxy.is_some() {
            self.overrides.kxy = kxy;
        }
        Ok(())
    }

    fn refresh_snapshot(&mut self, temperature_k: f64) {
        self.snapshot = self.material.properties(temperature_k);
    }
}

/// A thermal boundary between two adjacent layers.
///
/// The conductance starts unset and must be assigned before the path can
/// be compiled into a transfer-matrix stack.
pub struct Interface {
    conductance: Option<Param>,
    between: (String, String),
}

impl Interface {
    pub fn conductance(&self) -> Option<&Param> {
        self.conductance.as_ref()
    }

    /// Material names on either side of this boundary.
    pub fn between(&self) -> (&str, &str) {
        (&self.between.0, &self.between.1)
    }
}

/// One element of a flat heat path.
pub enum PathElement {
    Layer(Layer),
    Interface(Interface),
}

/// A layered FDTR sample at a fixed temperature.
pub struct Domain {
    temperature_k: f64,
    heat_path: Vec<PathElement>,
    top_heat_path: Vec<PathElement>,
}

impl Domain {
    pub fn new(temperature_k: f64) -> Self {
        Self {
            temperature_k,
            heat_path: Vec::new(),
            top_heat_path: Vec::new(),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature_k
    }

    pub fn heat_path(&self) -> &[PathElement] {
        &self.heat_path
    }

    pub fn top_heat_path(&self) -> &[PathElement] {
        &self.top_heat_path
    }

    /// Number of layers in the main path, substrate included.
    pub fn layer_count(&self) -> usize {
        self.heat_path.len() / 2 + usize::from(!self.heat_path.is_empty())
    }

    pub fn top_layer_count(&self) -> usize {
        self.top_heat_path.len() / 2
    }

    /// Define the substrate. Must be called exactly once, before any layer.
    ///
    /// The substrate is modelled as a [`SUBSTRATE_THICKNESS_CM`]-thick
    /// pseudo-layer carrying the material's properties.
    pub fn add_substrate(
        &mut self,
        material: Arc<dyn ThermalMaterial>,
    ) -> Result<(), StructuralError> {
        if !self.heat_path.is_empty() {
            return Err(StructuralError::SubstrateAlreadyDefined);
        }
        self.heat_path.push(PathElement::Layer(Layer::new(
            Param::Fixed(SUBSTRATE_THICKNESS_CM),
            material,
            self.temperature_k,
        )));
        Ok(())
    }

    /// Append a layer on top of the current stack, preceded by an
    /// interface whose conductance must be set before evaluation.
    pub fn add_layer(
        &mut self,
        thickness_cm: f64,
        material: Arc<dyn ThermalMaterial>,
    ) -> Result<(), StructuralError> {
        if thickness_cm <= 0.0 {
            return Err(StructuralError::NonPositiveThickness(thickness_cm));
        }
        let below = self
            .last_layer_name(&self.heat_path)
            .ok_or(StructuralError::MissingSubstrate)?
            .to_string();
        let layer = Layer::new(Param::Fixed(thickness_cm), material, self.temperature_k);
        let above = layer.material_name().to_string();
        self.heat_path.push(PathElement::Interface(Interface {
            conductance: None,
            between: (below, above),
        }));
        self.heat_path.push(PathElement::Layer(layer));
        Ok(())
    }

    /// Append an optically transparent layer into the top path.
    ///
    /// The first top layer's interface adjoins the main stack's surface
    /// layer; later ones adjoin the previous top layer.
    pub fn add_top_layer(
        &mut self,
        thickness_cm: f64,
        material: Arc<dyn ThermalMaterial>,
    ) -> Result<(), StructuralError> {
        if thickness_cm <= 0.0 {
            return Err(StructuralError::NonPositiveThickness(thickness_cm));
        }
        let below = self
            .last_layer_name(&self.top_heat_path)
            .or_else(|| self.last_layer_name(&self.heat_path))
            .ok_or(StructuralError::MissingSubstrate)?
            .to_string();
        let layer = Layer::new(Param::Fixed(thickness_cm), material, self.temperature_k);
        let above = layer.material_name().to_string();
        self.top_heat_path.push(PathElement::Interface(Interface {
            conductance: None,
            between: (below, above),
        }));
        self.top_heat_path.push(PathElement::Layer(layer));
        Ok(())
    }

    fn last_layer_name<'a>(&self, path: &'a [PathElement]) -> Option<&'a str> {
        path.iter().rev().find_map(|e| match e {
            PathElement::Layer(l) => Some(l.material_name()),
            PathElement::Interface(_) => None,
        })
    }

    /// Override properties of a main-path layer. Slot 0 is the substrate.
    pub fn set_layer_param(
        &mut self,
        slot: usize,
        overrides: LayerOverrides,
    ) -> Result<(), StructuralError> {
        let layers = self.layer_count();
        match self.heat_path.get_mut(slot * 2) {
            Some(PathElement::Layer(layer)) => layer.apply_overrides(overrides),
            _ => Err(StructuralError::LayerSlotOutOfRange { slot, layers }),
        }
    }

    /// Override properties of a top-path layer. Slots are 1-based.
    pub fn set_top_layer_param(
        &mut self,
        slot: usize,
        overrides: LayerOverrides,
    ) -> Result<(), StructuralError> {
        let layers = self.top_layer_count();
        let flat = slot
            .checked_mul(2)
            .and_then(|i| i.checked_sub(1))
            .unwrap_or(usize::MAX);
        match self.top_heat_path.get_mut(flat) {
            Some(PathElement::Layer(layer)) => layer.apply_overrides(overrides),
            _ => Err(StructuralError::LayerSlotOutOfRange { slot, layers }),
        }
    }

    /// Set the conductance of the interface below main-path layer `slot`
    /// (1-based).
    pub fn set_interface_conductance(
        &mut self,
        slot: usize,
        conductance: impl Into<Param>,
    ) -> Result<(), StructuralError> {
        let interfaces = self.layer_count().saturating_sub(1);
        let flat = slot
            .checked_mul(2)
            .and_then(|i| i.checked_sub(1))
            .unwrap_or(usize::MAX);
        match self.heat_path.get_mut(flat) {
            Some(PathElement::Interface(interface)) => {
                interface.conductance = Some(conductance.into());
                Ok(())
            }
            _ => Err(StructuralError::InterfaceSlotOutOfRange { slot, interfaces }),
        }
    }

    /// Set the conductance of the interface below top-path layer `slot`
    /// (1-based).
    pub fn set_top_interface_conductance(
        &mut self,
        slot: usize,
        conductance: impl Into<Param>,
    ) -> Result<(), StructuralError> {
        let interfaces = self.top_layer_count();
        let flat = match slot {
            0 => usize::MAX,
            s => (s - 1) * 2,
        };
        match self.top_heat_path.get_mut(flat) {
            Some(PathElement::Interface(interface)) => {
                interface.conductance = Some(conductance.into());
                Ok(())
            }
            _ => Err(StructuralError::InterfaceSlotOutOfRange { slot, interfaces }),
        }
    }

    /// Change the domain temperature. Every layer's material snapshot is
    /// re-evaluated; explicit overrides survive. Models compiled from this
    /// domain must rebuild afterwards.
    pub fn set_temperature(&mut self, temperature_k: f64) {
        self.temperature_k = temperature_k;
        for element in self
            .heat_path
            .iter_mut()
            .chain(self.top_heat_path.iter_mut())
        {
            if let PathElement::Layer(layer) = element {
                layer.refresh_snapshot(temperature_k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdtr_materials::catalog;

    fn gold() -> Arc<dyn ThermalMaterial> {
        Arc::new(catalog::gold())
    }

    fn sapphire() -> Arc<dyn ThermalMaterial> {
        Arc::new(catalog::sapphire())
    }

    #[test]
    fn test_duplicate_substrate_rejected() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(sapphire()).unwrap();
        assert!(matches!(
            domain.add_substrate(sapphire()),
            Err(StructuralError::SubstrateAlreadyDefined)
        ));
    }

    #[test]
    fn test_layer_requires_substrate() {
        let mut domain = Domain::new(300.0);
        assert!(matches!(
            domain.add_layer(60e-7, gold()),
            Err(StructuralError::MissingSubstrate)
        ));
    }

    #[test]
    fn test_path_alternates_and_slots_map() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(sapphire()).unwrap();
        domain.add_layer(60e-7, gold()).unwrap();
        assert_eq!(domain.heat_path().len(), 3);
        assert_eq!(domain.layer_count(), 2);
        assert!(matches!(domain.heat_path()[1], PathElement::Interface(_)));

        domain.set_interface_conductance(1, 5e3).unwrap();
        match &domain.heat_path()[1] {
            PathElement::Interface(i) => {
                assert_eq!(i.conductance(), Some(&Param::Fixed(5e3)));
                assert_eq!(i.between(), ("Sapphire", "Gold"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_invalid_slots_rejected() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(sapphire()).unwrap();
        domain.add_layer(60e-7, gold()).unwrap();
        assert!(domain.set_interface_conductance(0, 1e3).is_err());
        assert!(domain.set_interface_conductance(2, 1e3).is_err());
        assert!(domain
            .set_layer_param(5, LayerOverrides::default())
            .is_err());
    }

    #[test]
    fn test_overrides_survive_temperature_change() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(sapphire()).unwrap();
        domain.add_layer(60e-7, gold()).unwrap();
        domain
            .set_layer_param(
                1,
                LayerOverrides {
                    kzz: Some(Param::Free("kz".into())),
                    ..Default::default()
                },
            )
            .unwrap();

        domain.set_temperature(80.0);

        let layer = match &domain.heat_path()[2] {
            PathElement::Layer(l) => l,
            _ => unreachable!(),
        };
        // The kzz override is still the free parameter...
        assert_eq!(layer.kzz(), Param::Free("kz".into()));
        // ...while the snapshot-derived cp tracked the new temperature.
        let cold_cp = catalog::gold().properties(80.0).cp;
        assert_eq!(layer.cp(), Param::Fixed(cold_cp));
    }

    #[test]
    fn test_top_path_adjoins_main_stack() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(sapphire()).unwrap();
        domain.add_layer(60e-7, gold()).unwrap();
        domain
            .add_top_layer(100e-7, Arc::new(catalog::glass()))
            .unwrap();
        domain.set_top_interface_conductance(1, 1e3).unwrap();

        assert_eq!(domain.top_layer_count(), 1);
        match &domain.top_heat_path()[0] {
            PathElement::Interface(i) => assert_eq!(i.between(), ("Gold", "Glass")),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_nonpositive_thickness_rejected() {
        let mut domain = Domain::new(300.0);
        domain.add_substrate(sapphire()).unwrap();
        assert!(matches!(
            domain.add_layer(0.0, gold()),
            Err(StructuralError::NonPositiveThickness(_))
        ));
    }
}
