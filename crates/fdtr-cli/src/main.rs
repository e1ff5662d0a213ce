//! FDTR command-line interface.
//!
//! Run jobs from TOML configuration files:
//! ```sh
//! fdtr run job.toml
//! fdtr fit job.toml
//! fdtr sensitivity job.toml --param kz --param g
//! fdtr validate job.toml
//! fdtr materials
//! ```

mod config;
mod runner;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fdtr")]
#[command(about = "FDTR: frequency-domain thermoreflectance modelling and fitting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the phase sweep defined by a job file and export it.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides the config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fit the job's free parameters against its dataset.
    Fit {
        config: PathBuf,
    },
    /// Finite-difference phase sensitivity for selected parameters.
    Sensitivity {
        config: PathBuf,
        /// Parameter name; repeat for several curves.
        #[arg(short, long = "param", required = true)]
        params: Vec<String>,
    },
    /// Validate a configuration file without evaluating anything.
    Validate {
        config: PathBuf,
    },
    /// Display the material catalog at room temperature.
    Materials,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            let job = config::load_config(&config)?;
            let model = runner::build_model(&job)?;
            println!(
                "Sweeping {} points over [{:.3e}, {:.3e}] Hz ({} backend)",
                job.sweep.points,
                job.sweep.range[0],
                job.sweep.range[1],
                model.backend()
            );
            let points = runner::run_sweep(&model, &job)?;
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_sweep(points, &out_dir.join("phase_sweep.txt"))?;
            Ok(())
        }
        Commands::Fit { config } => {
            let job = config::load_config(&config)?;
            let mut model = runner::build_model(&job)?;
            let config_dir = config.parent().unwrap_or_else(|| std::path::Path::new("."));
            let report = runner::run_fit(&mut model, &job, config_dir)?;
            print!("{report}");

            let out_dir = PathBuf::from(&job.output.directory);
            if job.output.save_json {
                std::fs::create_dir_all(&out_dir)?;
                let json_path = out_dir.join("fit_report.json");
                std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)?;
                println!("Wrote {}", json_path.display());
            }
            // Export the fitted curve over the sweep grid.
            let points = runner::run_sweep(&model, &job)?;
            runner::write_sweep(points, &out_dir.join("fitted_sweep.txt"))?;
            Ok(())
        }
        Commands::Sensitivity { config, params } => {
            let job = config::load_config(&config)?;
            let model = runner::build_model(&job)?;
            let curves = runner::run_sensitivity(&model, &job, &params)?;
            let out_dir = PathBuf::from(&job.output.directory);
            std::fs::create_dir_all(&out_dir)?;
            for (name, frequencies, derivative) in curves {
                let path = out_dir.join(format!("sensitivity_{name}.txt"));
                let points: Vec<(f64, f64)> =
                    frequencies.into_iter().zip(derivative).collect();
                runner::write_table(&points, &format!("Frequency(Hz)\tdPhase/d({name})"), &path)?;
            }
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            // Building the model catches structural problems (missing
            // conductance, unknown materials or parameters) up front.
            runner::build_model(&job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Materials => {
            println!("Material catalog at 300 K (cm-based units):");
            println!();
            println!(
                "  {:<10} {:>12} {:>12} {:>12} {:>10}",
                "name", "cp J/cm³K", "kxx W/cmK", "kzz W/cmK", "ρ g/cm³"
            );
            for name in fdtr_materials::catalog::CATALOG_NAMES {
                let material = fdtr_materials::by_name(name).expect("catalog name");
                let p = material.properties(300.0);
                println!(
                    "  {:<10} {:>12.4e} {:>12.4e} {:>12.4e} {:>10.3}",
                    p.name, p.cp, p.kxx, p.kzz, p.density
                );
            }
            Ok(())
        }
    }
}
