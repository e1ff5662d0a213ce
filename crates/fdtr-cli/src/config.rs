//! TOML configuration deserialisation for FDTR jobs.

use serde::Deserialize;

use fdtr_core::Backend;
use fdtr_fit::Method;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub domain: DomainConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    pub fit: Option<FitConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Sample description: substrate plus layers, bottom to top.
#[derive(Debug, Deserialize)]
pub struct DomainConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Substrate material name from the catalog.
    pub substrate: String,
    /// Optional property overrides for the substrate pseudo-layer.
    #[serde(default)]
    pub substrate_params: OverridesConfig,
    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerConfig>,
}

fn default_temperature() -> f64 {
    300.0
}

/// One layer: material, thickness, and the conductance of the interface
/// below it. Any numeric field may instead name a free parameter.
#[derive(Debug, Deserialize)]
pub struct LayerConfig {
    pub material: String,
    pub thickness: ValueOrParam,
    pub conductance: Option<ValueOrParam>,
    /// Route into the transparent top path instead of the main stack.
    #[serde(default)]
    pub top: bool,
    #[serde(flatten)]
    pub overrides: OverridesConfig,
}

/// Per-property overrides; absent fields keep catalog values.
#[derive(Debug, Default, Deserialize)]
pub struct OverridesConfig {
    pub cp: Option<ValueOrParam>,
    pub kxx: Option<ValueOrParam>,
    pub kyy: Option<ValueOrParam>,
    pub kzz: Option<ValueOrParam>,
    pub kxy: Option<ValueOrParam>,
}

/// A literal value, or the name of a free parameter declared under
/// `[[fit.param]]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueOrParam {
    Value(f64),
    Param(String),
}

/// Beam geometry and numeric backend.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Pump 1/e² radius (cm).
    pub pump_radius: f64,
    /// Probe 1/e² radius (cm).
    pub probe_radius: f64,
    /// Pump–probe centre offset (cm); 0 selects the radial model.
    #[serde(default)]
    pub beam_offset: f64,
    #[serde(default)]
    pub backend: Backend,
}

/// Frequency sweep: log-spaced grid.
#[derive(Debug, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_range")]
    pub range: [f64; 2],
    #[serde(default = "default_points")]
    pub points: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            range: default_range(),
            points: default_points(),
        }
    }
}

fn default_range() -> [f64; 2] {
    [1e3, 40e6]
}
fn default_points() -> usize {
    50
}

/// Free parameters and, optionally, a dataset to fit them against.
#[derive(Debug, Deserialize)]
pub struct FitConfig {
    /// Measurement file (2 header lines, freq/amplitude/phase columns).
    pub data: Option<String>,
    #[serde(default = "default_method")]
    pub method: Method,
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,
    #[serde(default, rename = "param")]
    pub params: Vec<ParamConfig>,
}

fn default_method() -> Method {
    Method::LeastSquares
}
fn default_max_evaluations() -> usize {
    1000
}

/// One free parameter declaration.
#[derive(Debug, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Also write the fit report as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_job() {
        let toml = r#"
            [domain]
            temperature = 300.0
            substrate = "Sapphire"

            [[domain.layer]]
            material = "Gold"
            thickness = 60e-7
            conductance = "g"
            kzz = "kz"

            [model]
            pump_radius = 4.05e-4
            probe_radius = 4.05e-4
            backend = "scaled"

            [sweep]
            range = [1e4, 2e7]
            points = 25

            [fit]
            data = "sample.txt"
            method = "nelder"
            max_evaluations = 500

            [[fit.param]]
            name = "g"
            value = 5e3
            min = 1e3
            max = 1e4

            [[fit.param]]
            name = "kz"
            value = 0.66
        "#;
        let job: JobConfig = toml::from_str(toml).unwrap();
        assert_eq!(job.domain.substrate, "Sapphire");
        assert_eq!(job.domain.layers.len(), 1);
        assert!(matches!(
            job.domain.layers[0].conductance,
            Some(ValueOrParam::Param(ref name)) if name == "g"
        ));
        assert_eq!(job.model.backend, Backend::Scaled);
        assert_eq!(job.sweep.points, 25);
        let fit = job.fit.unwrap();
        assert_eq!(fit.method, Method::NelderMead);
        assert_eq!(fit.params.len(), 2);
        assert_eq!(fit.params[1].min, None);
    }

    #[test]
    fn test_defaults() {
        let toml = r#"
            [domain]
            substrate = "Sapphire"

            [model]
            pump_radius = 4.05e-4
            probe_radius = 4.05e-4
        "#;
        let job: JobConfig = toml::from_str(toml).unwrap();
        assert_eq!(job.domain.temperature, 300.0);
        assert_eq!(job.model.beam_offset, 0.0);
        assert_eq!(job.model.backend, Backend::Standard);
        assert_eq!(job.sweep.range, [1e3, 40e6]);
        assert!(job.fit.is_none());
        assert_eq!(job.output.directory, "./output");
    }
}
