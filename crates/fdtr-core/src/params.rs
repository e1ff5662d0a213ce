//! Named fitting parameters.
//!
//! A [`FitParams`] set is an ordered, name-unique collection of free
//! parameters. The insertion order defines the optimizer's vector order
//! for every model compiled against the set; any layer or interface field
//! referring to a parameter by name is lowered to an index into that
//! vector at compile time, so an optimizer updating the vector is observed
//! by every consumer without propagation code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors concerning fitting-parameter bookkeeping. These signal internal
/// invariant violations (a fit must abort rather than proceed with
/// misaligned data).
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("Unknown fitting parameter: {0}")]
    UnknownParameter(String),

    #[error("Fitting parameter already defined: {0}")]
    DuplicateParameter(String),

    #[error("Parameter vector length {got} does not match the compiled ordering (expected {expected})")]
    OrderMismatch { expected: usize, got: usize },
}

/// One named free parameter: current value and optional bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitParam {
    pub name: String,
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Ordered, name-unique set of free parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitParams {
    entries: Vec<FitParam>,
}

impl FitParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter. Names must be unique within the set.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), ParameterError> {
        let name = name.into();
        if self.index_of(&name).is_some() {
            return Err(ParameterError::DuplicateParameter(name));
        }
        self.entries.push(FitParam {
            name,
            value,
            min,
            max,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FitParam> {
        self.entries.iter()
    }

    /// Position of a parameter in the vector ordering.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&FitParam, ParameterError> {
        self.entries
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ParameterError::UnknownParameter(name.to_string()))
    }

    pub fn value(&self, name: &str) -> Result<f64, ParameterError> {
        self.get(name).map(|p| p.value)
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), ParameterError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ParameterError::UnknownParameter(name.to_string()))?;
        entry.value = value;
        Ok(())
    }

    /// Current values in vector order.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|p| p.value).collect()
    }

    /// Overwrite all values from a vector in the compiled ordering.
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), ParameterError> {
        if values.len() != self.entries.len() {
            return Err(ParameterError::OrderMismatch {
                expected: self.entries.len(),
                got: values.len(),
            });
        }
        for (entry, &v) in self.entries.iter_mut().zip(values) {
            entry.value = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_vector_order() {
        let mut params = FitParams::new();
        params.add("kz", 0.4, Some(0.1), Some(0.7)).unwrap();
        params.add("thick", 60e-7, None, None).unwrap();
        assert_eq!(params.index_of("kz"), Some(0));
        assert_eq!(params.index_of("thick"), Some(1));
        assert_eq!(params.values(), vec![0.4, 60e-7]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut params = FitParams::new();
        params.add("g", 5e3, None, None).unwrap();
        assert!(matches!(
            params.add("g", 1e3, None, None),
            Err(ParameterError::DuplicateParameter(_))
        ));
    }

    #[test]
    fn test_set_values_length_guard() {
        let mut params = FitParams::new();
        params.add("a", 1.0, None, None).unwrap();
        params.add("b", 2.0, None, None).unwrap();
        assert!(matches!(
            params.set_values(&[1.0]),
            Err(ParameterError::OrderMismatch {
                expected: 2,
                got: 1
            })
        ));
        params.set_values(&[3.0, 4.0]).unwrap();
        assert_eq!(params.value("b").unwrap(), 4.0);
    }
}
