//! Job execution: build the model from configuration, run sweeps,
//! sensitivity analyses, and fits, and write outputs.

use std::path::Path;

use anyhow::{bail, Context, Result};

use fdtr_core::domain::{Domain, LayerOverrides, Param};
use fdtr_core::model::FdtrModel;
use fdtr_core::params::FitParams;
use fdtr_core::sensitivity::{self, log_spaced};
use fdtr_fit::{minimize, Dataset, FitProblem, FitReport};

use crate::config::{JobConfig, OverridesConfig, ValueOrParam};

fn to_param(value: &ValueOrParam) -> Param {
    match value {
        ValueOrParam::Value(v) => Param::Fixed(*v),
        ValueOrParam::Param(name) => Param::Free(name.clone()),
    }
}

fn to_overrides(config: &OverridesConfig, thickness: Option<&ValueOrParam>) -> LayerOverrides {
    LayerOverrides {
        thickness: thickness.map(to_param),
        cp: config.cp.as_ref().map(to_param),
        kxx: config.kxx.as_ref().map(to_param),
        kyy: config.kyy.as_ref().map(to_param),
        kzz: config.kzz.as_ref().map(to_param),
        kxy: config.kxy.as_ref().map(to_param),
    }
}

/// Build the compiled model described by a job configuration.
pub fn build_model(job: &JobConfig) -> Result<FdtrModel> {
    let mut domain = Domain::new(job.domain.temperature);

    let substrate = fdtr_materials::by_name(&job.domain.substrate)
        .with_context(|| format!("substrate '{}'", job.domain.substrate))?;
    domain.add_substrate(substrate.into())?;
    domain.set_layer_param(0, to_overrides(&job.domain.substrate_params, None))?;

    let mut main_slot = 0usize;
    let mut top_slot = 0usize;
    for layer in &job.domain.layers {
        let material = fdtr_materials::by_name(&layer.material)
            .with_context(|| format!("layer material '{}'", layer.material))?;
        // Structural thickness must be a literal to create the layer; a
        // free thickness is applied as an override afterwards.
        let nominal = match &layer.thickness {
            ValueOrParam::Value(v) => *v,
            ValueOrParam::Param(_) => 1e-7,
        };
        let free_thickness = match &layer.thickness {
            ValueOrParam::Param(_) => Some(&layer.thickness),
            ValueOrParam::Value(_) => None,
        };

        if layer.top {
            top_slot += 1;
            domain.add_top_layer(nominal, material.into())?;
            domain.set_top_layer_param(top_slot, to_overrides(&layer.overrides, free_thickness))?;
            if let Some(conductance) = &layer.conductance {
                domain.set_top_interface_conductance(top_slot, to_param(conductance))?;
            }
        } else {
            main_slot += 1;
            domain.add_layer(nominal, material.into())?;
            domain.set_layer_param(main_slot, to_overrides(&layer.overrides, free_thickness))?;
            if let Some(conductance) = &layer.conductance {
                domain.set_interface_conductance(main_slot, to_param(conductance))?;
            }
        }
    }

    let mut params = FitParams::new();
    if let Some(fit) = &job.fit {
        for p in &fit.params {
            params.add(p.name.clone(), p.value, p.min, p.max)?;
        }
    }

    let model = FdtrModel::new(
        domain,
        job.model.pump_radius,
        job.model.probe_radius,
        job.model.beam_offset,
        params,
    )?
    .with_backend(job.model.backend);
    Ok(model)
}

/// Evaluate the phase sweep defined by the job's `[sweep]` section.
pub fn run_sweep(model: &FdtrModel, job: &JobConfig) -> Result<Vec<(f64, f64)>> {
    let frequencies = log_spaced(job.sweep.range[0], job.sweep.range[1], job.sweep.points);
    let mut points = Vec::with_capacity(frequencies.len());
    for frequency in frequencies {
        let phase = model
            .get_phase(frequency)
            .with_context(|| format!("phase evaluation at {frequency:.3e} Hz"))?;
        points.push((frequency, phase));
    }
    Ok(points)
}

/// Write a sweep as a tab-delimited `[frequency, phase]` table.
pub fn write_sweep(points: Vec<(f64, f64)>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Dataset::from_points(points)
        .write_file(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Write an arbitrary two-column table with the given header line.
pub fn write_table(points: &[(f64, f64)], header: &str, path: &Path) -> Result<()> {
    use std::io::Write;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writeln!(file, "# {header}")?;
    for (x, y) in points {
        writeln!(file, "{x:e}\t{y}")?;
    }
    println!("Wrote {}", path.display());
    Ok(())
}

/// Fit the model against the dataset named in the job's `[fit]` section.
pub fn run_fit(model: &mut FdtrModel, job: &JobConfig, config_dir: &Path) -> Result<FitReport> {
    let Some(fit) = &job.fit else {
        bail!("no [fit] section in the job configuration");
    };
    let Some(data_path) = &fit.data else {
        bail!("no dataset in the [fit] section (set fit.data)");
    };
    if fit.params.is_empty() {
        bail!("no [[fit.param]] entries to fit");
    }

    let path = config_dir.join(data_path);
    let dataset =
        Dataset::from_file(&path).with_context(|| format!("loading {}", path.display()))?;
    println!("Loaded {} data points from {}", dataset.len(), path.display());

    let mut problem = FitProblem::single(model, &dataset)?;
    let report = minimize(&mut problem, fit.method, fit.max_evaluations)?;
    Ok(report)
}

/// Sensitivity curves for the named parameters over the sweep range.
pub fn run_sensitivity(
    model: &FdtrModel,
    job: &JobConfig,
    names: &[String],
) -> Result<Vec<(String, Vec<f64>, Vec<f64>)>> {
    let range = (job.sweep.range[0], job.sweep.range[1]);
    let mut curves = Vec::with_capacity(names.len());
    for name in names {
        let (frequencies, derivative) =
            sensitivity::sensitivity(model, name, range, job.sweep.points)
                .with_context(|| format!("sensitivity to '{name}'"))?;
        curves.push((name.clone(), frequencies, derivative));
    }
    Ok(curves)
}
