//! Joint fitting problems over (model, dataset) pairs.
//!
//! The problem owns a global parameter vector: the first-seen-order union
//! of the pairs' named parameters. A name appearing in several models is
//! one shared optimizer variable; per-pair index maps translate the global
//! vector into each model's compiled ordering, fixed at construction and
//! guarded on every residual call.
//!
//! Residuals from all pairs are stacked into one vector, never averaged:
//! a dataset with more points pulls the shared parameters proportionally
//! harder. That weighting is deliberate.

use ndarray::Array1;
use rayon::prelude::*;

use fdtr_core::model::FdtrModel;
use fdtr_core::params::FitParams;
use fdtr_core::NumericError;

use crate::dataset::Dataset;
use crate::engine::FitError;

struct Pair<'a> {
    model: &'a mut FdtrModel,
    dataset: &'a Dataset,
    /// `model parameter i` reads `global[index_map[i]]`.
    index_map: Vec<usize>,
}

/// One or more (model, dataset) pairs fitted against a shared parameter
/// vector.
pub struct FitProblem<'a> {
    pairs: Vec<Pair<'a>>,
    global: FitParams,
    n_residuals: usize,
}

impl<'a> FitProblem<'a> {
    /// Build a joint problem. Bounds and initial values of a shared name
    /// follow its first appearance; later conflicting definitions are
    /// logged and ignored.
    pub fn new(pairs: Vec<(&'a mut FdtrModel, &'a Dataset)>) -> Result<Self, FitError> {
        let mut global = FitParams::new();
        let mut built = Vec::with_capacity(pairs.len());
        let mut n_residuals = 0usize;

        for (model, dataset) in pairs {
            if dataset.is_empty() {
                return Err(FitError::EmptyData);
            }
            let mut index_map = Vec::with_capacity(model.params().len());
            for param in model.params().iter() {
                match global.index_of(&param.name) {
                    Some(index) => {
                        let first = global.get(&param.name).expect("index_of hit");
                        if first.value != param.value
                            || first.min != param.min
                            || first.max != param.max
                        {
                            log::warn!(
                                "parameter '{}' redefined by a later pair; \
                                 keeping the first definition",
                                param.name
                            );
                        }
                        index_map.push(index);
                    }
                    None => {
                        let index = global.len();
                        global
                            .add(param.name.clone(), param.value, param.min, param.max)
                            .expect("name is new");
                        index_map.push(index);
                    }
                }
            }
            n_residuals += dataset.len();
            built.push(Pair {
                model,
                dataset,
                index_map,
            });
        }

        if global.is_empty() {
            return Err(FitError::NoFreeParameters);
        }
        Ok(Self {
            pairs: built,
            global,
            n_residuals,
        })
    }

    /// Convenience constructor for the single-pair case.
    pub fn single(model: &'a mut FdtrModel, dataset: &'a Dataset) -> Result<Self, FitError> {
        Self::new(vec![(model, dataset)])
    }

    /// The shared parameter set, in optimizer vector order.
    pub fn params(&self) -> &FitParams {
        &self.global
    }

    pub fn n_residuals(&self) -> usize {
        self.n_residuals
    }

    pub fn n_pairs(&self) -> usize {
        self.pairs.len()
    }

    /// Stacked residuals `predicted − measured` for a trial vector.
    ///
    /// The trial values are written into each model's parameter set
    /// strictly before that model's batch of phase evaluations; the
    /// evaluations within a batch run in parallel, each being pure given
    /// the written values.
    pub fn residuals(&mut self, trial: &[f64]) -> Result<Array1<f64>, FitError> {
        if trial.len() != self.global.len() {
            return Err(fdtr_core::ParameterError::OrderMismatch {
                expected: self.global.len(),
                got: trial.len(),
            }
            .into());
        }

        let mut out = Vec::with_capacity(self.n_residuals);
        for pair in &mut self.pairs {
            let local: Vec<f64> = pair.index_map.iter().map(|&i| trial[i]).collect();
            pair.model.set_param_values(&local)?;

            let model = &*pair.model;
            let batch: Result<Vec<f64>, NumericError> = pair
                .dataset
                .points()
                .par_iter()
                .map(|&(frequency, measured)| Ok(model.get_phase(frequency)? - measured))
                .collect();
            out.extend(batch?);
        }
        Ok(Array1::from(out))
    }

    /// Sum-of-squares cost for a trial vector.
    pub fn cost(&mut self, trial: &[f64]) -> Result<f64, FitError> {
        let r = self.residuals(trial)?;
        Ok(r.iter().map(|v| v * v).sum())
    }

    /// Persist a final vector into the shared set and every model.
    pub fn apply(&mut self, values: &[f64]) -> Result<(), FitError> {
        self.global.set_values(values)?;
        for pair in &mut self.pairs {
            let local: Vec<f64> = pair.index_map.iter().map(|&i| values[i]).collect();
            pair.model.set_param_values(&local)?;
        }
        Ok(())
    }
}
