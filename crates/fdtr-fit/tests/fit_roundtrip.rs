//! Synthetic-data round trips through the fit engine.
//!
//! Data is generated from a model with known parameter values plus small
//! deterministic noise; the fit starts from perturbed guesses and must
//! recover the truth within the noise-plus-tolerance band.

use std::sync::Arc;

use fdtr_core::domain::{Domain, LayerOverrides, Param};
use fdtr_core::model::FdtrModel;
use fdtr_core::params::FitParams;
use fdtr_core::sensitivity::log_spaced;
use fdtr_fit::{minimize, Dataset, FitError, FitProblem, Method};

const BEAM_RADIUS: f64 = 4.05e-4;
const TRUE_G: f64 = 5e3;
const TRUE_KSUB: f64 = 0.3315;

/// Au(60 nm)/sapphire with free interface conductance and substrate
/// cross-plane conductivity — the canonical two-parameter FDTR fit.
fn build_model(g_init: f64, ksub_init: f64, bounded: bool) -> FdtrModel {
    let mut domain = Domain::new(300.0);
    domain
        .add_substrate(Arc::new(fdtr_materials::catalog::sapphire()))
        .unwrap();
    domain
        .add_layer(60e-7, Arc::new(fdtr_materials::catalog::gold()))
        .unwrap();
    domain
        .set_interface_conductance(1, Param::Free("g".into()))
        .unwrap();
    domain
        .set_layer_param(
            0,
            LayerOverrides {
                kzz: Some(Param::Free("ksub".into())),
                ..Default::default()
            },
        )
        .unwrap();

    let mut params = FitParams::new();
    if bounded {
        params.add("g", g_init, Some(2e3), Some(1e4)).unwrap();
        params.add("ksub", ksub_init, Some(0.2), Some(0.5)).unwrap();
    } else {
        params.add("g", g_init, None, None).unwrap();
        params.add("ksub", ksub_init, None, None).unwrap();
    }

    FdtrModel::new(domain, BEAM_RADIUS, BEAM_RADIUS, 0.0, params)
        .unwrap()
        .with_tolerances(1e-8, 1e-6)
}

/// Phases from the true parameter values plus a fixed noise pattern.
fn synthesize(n_points: usize, noise_deg: f64) -> Dataset {
    let truth = build_model(TRUE_G, TRUE_KSUB, false);
    let offsets = [0.6, -1.0, 0.3, 0.9, -0.4, -0.8, 1.0, -0.2];
    let points = log_spaced(1e4, 2e7, n_points)
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            let phase = truth.get_phase(f).unwrap() + noise_deg * offsets[i % offsets.len()];
            (f, phase)
        })
        .collect();
    Dataset::from_points(points)
}

#[test]
fn test_least_squares_round_trip() {
    let data = synthesize(10, 0.02);
    let mut model = build_model(3.5e3, 0.45, false);
    let mut problem = FitProblem::single(&mut model, &data).unwrap();

    let report = minimize(&mut problem, Method::LeastSquares, 300).unwrap();

    assert!(report.converged, "{}", report.message);
    let g = report.value("g").unwrap();
    let ksub = report.value("ksub").unwrap();
    assert!(
        (g - TRUE_G).abs() / TRUE_G < 0.05,
        "g = {g}, expected ≈ {TRUE_G}"
    );
    assert!(
        (ksub - TRUE_KSUB).abs() / TRUE_KSUB < 0.05,
        "ksub = {ksub}, expected ≈ {TRUE_KSUB}"
    );
    // Fitted values are written back into the model.
    assert_eq!(model.params().value("g").unwrap(), g);
    // With 10 points and 2 variables the covariance is estimable.
    assert!(report.params.iter().all(|p| p.stderr.is_some()));
}

#[test]
fn test_nelder_mead_round_trip() {
    let data = synthesize(8, 0.02);
    let mut model = build_model(3.5e3, 0.42, false);
    let mut problem = FitProblem::single(&mut model, &data).unwrap();

    let report = minimize(&mut problem, Method::NelderMead, 500).unwrap();

    let g = report.value("g").unwrap();
    let ksub = report.value("ksub").unwrap();
    assert!((g - TRUE_G).abs() / TRUE_G < 0.05, "g = {g}");
    assert!((ksub - TRUE_KSUB).abs() / TRUE_KSUB < 0.05, "ksub = {ksub}");
}

#[test]
fn test_differential_evolution_finds_the_basin() {
    let data = synthesize(6, 0.02);
    let mut model = build_model(9e3, 0.21, true);
    let mut problem = FitProblem::single(&mut model, &data).unwrap();

    let report = minimize(&mut problem, Method::DifferentialEvolution, 800).unwrap();

    let g = report.value("g").unwrap();
    let ksub = report.value("ksub").unwrap();
    assert!((g - TRUE_G).abs() / TRUE_G < 0.10, "g = {g}");
    assert!((ksub - TRUE_KSUB).abs() / TRUE_KSUB < 0.10, "ksub = {ksub}");
}

#[test]
fn test_differential_evolution_requires_bounds() {
    let data = synthesize(6, 0.0);
    let mut model = build_model(4e3, 0.4, false);
    let mut problem = FitProblem::single(&mut model, &data).unwrap();
    assert!(matches!(
        minimize(&mut problem, Method::DifferentialEvolution, 100),
        Err(FitError::MissingBounds(_))
    ));
}

/// Two identical pairs fit jointly must land on the same optimum as the
/// single fit: residuals are doubled, never reweighted.
#[test]
fn test_joint_fit_matches_single_fit() {
    let data = synthesize(8, 0.0);

    let mut single_model = build_model(4e3, 0.40, false);
    let mut single_problem = FitProblem::single(&mut single_model, &data).unwrap();
    let single = minimize(&mut single_problem, Method::LeastSquares, 300).unwrap();

    let mut model_a = build_model(4e3, 0.40, false);
    let mut model_b = build_model(4e3, 0.40, false);
    let mut joint_problem =
        FitProblem::new(vec![(&mut model_a, &data), (&mut model_b, &data)]).unwrap();
    let joint = minimize(&mut joint_problem, Method::LeastSquares, 300).unwrap();

    assert_eq!(joint.n_data, 2 * single.n_data);
    // Shared names collapse to one optimizer variable.
    assert_eq!(joint.n_varys, single.n_varys);

    for name in ["g", "ksub"] {
        let s = single.value(name).unwrap();
        let j = joint.value(name).unwrap();
        assert!(
            (s - j).abs() / s.abs() < 1e-3,
            "{name}: single {s} vs joint {j}"
        );
    }
    // Both models observed the shared update.
    assert_eq!(
        model_a.params().value("g").unwrap(),
        model_b.params().value("g").unwrap()
    );
}

#[test]
fn test_trial_vector_length_is_guarded() {
    let data = synthesize(6, 0.0);
    let mut model = build_model(4e3, 0.4, false);
    let mut problem = FitProblem::single(&mut model, &data).unwrap();
    assert!(matches!(
        problem.residuals(&[1.0]),
        Err(FitError::Parameter(
            fdtr_core::ParameterError::OrderMismatch { expected: 2, got: 1 }
        ))
    ));
}

/// A tiny budget must yield a flagged, non-fatal report.
#[test]
fn test_budget_exhaustion_is_reported_not_raised() {
    let data = synthesize(6, 0.02);
    let mut model = build_model(3e3, 0.45, false);
    let mut problem = FitProblem::single(&mut model, &data).unwrap();

    let report = minimize(&mut problem, Method::NelderMead, 8).unwrap();
    assert!(!report.converged);
    assert!(report.message.contains("did not converge"));
    // Best-found values are still written back.
    assert_eq!(
        model.params().value("g").unwrap(),
        report.value("g").unwrap()
    );
}
