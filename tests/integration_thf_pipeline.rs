//! Integration tests for temporal-hierarchy reconciliation.
//!
//! Purpose
//! -------
//! - Validate the end-to-end reconciliation pipeline: from base forecasts
//!   and residuals, through covariance estimation and the closed-form or QP
//!   solve, to the composed outcome.
//! - Exercise realistic monthly and quarterly hierarchies rather than
//!   single-level toy cases only.
//!
//! Coverage
//! --------
//! - `reconciliation::core::structure`: divisor sets, `R` and `Zt`.
//! - `reconciliation::thf::reconcile_temporal`:
//!   - idempotence on coherent input for every covariance method,
//!   - projection vs structural equivalence,
//!   - coherence of reconciled output,
//!   - bottom-up aggregation and the OLS closed form,
//!   - non-negativity (two-stage and direct QP),
//!   - per-horizon QP failure isolation and best-effort QP statuses
//!     (iteration cap, time limit),
//!   - the correlation-shrink switch and custom order sets,
//!   - short-history warnings with a rank-deficient Ω in both forms,
//!   - fatal error paths.
//!
//! Exclusions
//! ----------
//! - Fine-grained checks of estimators, ADMM internals and layout helpers;
//!   these are covered by unit tests.
//! - Python bindings; those are tested against the built extension.
use std::{cell::Cell, time::Duration};

use approx::assert_relative_eq;
use ndarray::{Array1, Array2};
use rust_temporal_hierarchy::{
    linalg::bridge::{from_dmatrix, to_dmatrix},
    qp::{AdmmQpSolver, QpError, QpOutcome, QpProblem, QpResult, QpSettings, QpSolver, QpStatus},
    reconciliation::{
        CombMethod, CorrelationShrink, CovMethod, DiagonalTargetShrink, MeanCorrection,
        NnStrategy, RecoError, RecoWarning, Shrinker, SolveMode, SolverForm, TemporalStructure,
        ThfOptions, from_horizon_matrix, reconcile_temporal, reconcile_temporal_with,
        solver::coherence_error,
    },
};

/// Deterministic, serially mixed residuals: `periods × kt` values in
/// roughly `[-1.5, 1.5]` with level-dependent scale.
fn residuals(structure: &TemporalStructure, periods: usize) -> Array2<f64> {
    let kt = structure.kt();
    let scale = structure.row_sums();
    Array2::from_shape_fn((periods, kt), |(t, j)| {
        let (tf, jf) = (t as f64, j as f64);
        let noise =
            (1.7 * tf + 0.9 * jf + 0.37 * tf * jf).sin() + 0.5 * (0.61 * tf * tf + jf).cos();
        noise * scale[j].sqrt()
    })
}

/// Coherent level-major forecasts over `h` cycles from positive base values.
fn coherent_forecasts(structure: &TemporalStructure, h: usize) -> Vec<f64> {
    let m = structure.m();
    let bottom = Array2::from_shape_fn((h, m), |(t, j)| 10.0 + (t * m + j) as f64 * 0.5);
    let rows = bottom.dot(&structure.r_matrix().t());
    from_horizon_matrix(structure, rows.view()).to_vec()
}

/// Incoherent forecasts: coherent ones with a level-dependent perturbation.
fn incoherent_forecasts(structure: &TemporalStructure, h: usize) -> Vec<f64> {
    coherent_forecasts(structure, h)
        .iter()
        .enumerate()
        .map(|(i, v)| v + (0.8 * i as f64).sin() * 2.0)
        .collect()
}

fn options_for(method: CovMethod, structure: &TemporalStructure) -> ThfOptions {
    let kt = structure.kt();
    ThfOptions::new(CombMethod::Covariance(method))
        .with_residual_matrix(residuals(structure, 24))
        .with_omega(Array2::from_diag(&Array1::linspace(1.0, 2.0, kt)))
}

const ALL_METHODS: [CovMethod; 11] = [
    CovMethod::Identity,
    CovMethod::StructuralScaling,
    CovMethod::LevelVariance,
    CovMethod::NodeVariance,
    CovMethod::BlockAutocovariance,
    CovMethod::StructuralAr1,
    CovMethod::LevelAr1,
    CovMethod::NodeAr1,
    CovMethod::Shrink,
    CovMethod::Sample,
    CovMethod::User,
];

struct FailOnCall {
    fail_at: usize,
    calls: Cell<usize>,
}

impl QpSolver for FailOnCall {
    fn solve(&self, problem: &QpProblem, settings: &QpSettings) -> QpResult<QpOutcome> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_at {
            return Err(QpError::NonConvexObjective);
        }
        AdmmQpSolver.solve(problem, settings)
    }
}

#[test]
// Purpose
// -------
// Structure invariants hold for common frequencies.
//
// Given
// -----
// - m ∈ {1, 2, 3, 4, 6, 7, 12, 24}.
//
// Expect
// ------
// - kset starts at m, ends at 1, every order divides m; R ends in I_m;
//   `Zt·R = 0`.
fn structure_invariants_hold() {
    for m in [1usize, 2, 3, 4, 6, 7, 12, 24] {
        let st = TemporalStructure::new(m).unwrap();
        assert_eq!(st.kset().first(), Some(&m));
        assert_eq!(st.kset().last(), Some(&1));
        assert!(st.kset().iter().all(|k| m % k == 0));

        let r = st.r_matrix();
        let bottom = r.slice(ndarray::s![st.k_star().., ..]);
        assert_eq!(bottom, Array2::<f64>::eye(m));
        assert!(st.zt_matrix().dot(r).iter().all(|v| *v == 0.0));
    }
}

#[test]
// Purpose
// -------
// Coherent forecasts are returned unchanged for every covariance method.
//
// Given
// -----
// - m = 4, h = 3, coherent forecasts, 24 residual periods, user Ω for `omega`.
//
// Expect
// ------
// - Every reconciled value within 1e-8 (relative) of its input.
fn reconciliation_is_idempotent_for_every_method() {
    let st = TemporalStructure::new(4).unwrap();
    let base = coherent_forecasts(&st, 3);
    for method in ALL_METHODS {
        let out = reconcile_temporal(&base, 4, &options_for(method, &st)).unwrap();
        for (a, b) in out.reconciled.iter().zip(base.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8, max_relative = 1e-8);
        }
    }
}

#[test]
// Purpose
// -------
// Projection and structural forms agree and both produce coherent output.
//
// Given
// -----
// - m = 12, h = 2, incoherent forecasts, 36 residual periods.
//
// Expect
// ------
// - Same reconciled vector within 1e-8 relative; `rec_check` holds and
//   `|Zt·x| ≤ 1e-6`.
fn projection_and_structural_forms_agree() {
    let st = TemporalStructure::new(12).unwrap();
    let base = incoherent_forecasts(&st, 2);
    for method in [CovMethod::StructuralScaling, CovMethod::LevelVariance, CovMethod::Shrink] {
        let opts = ThfOptions::new(CombMethod::Covariance(method))
            .with_residual_matrix(residuals(&st, 36));
        let proj =
            reconcile_temporal(&base, 12, &opts.clone().with_form(SolverForm::Projection)).unwrap();
        let struc =
            reconcile_temporal(&base, 12, &opts.with_form(SolverForm::Structural)).unwrap();

        for (a, b) in proj.reconciled.iter().zip(struc.reconciled.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8, max_relative = 1e-8);
        }
        assert!(proj.rec_check && struc.rec_check);
        assert!(coherence_error(&st, proj.horizon_matrix().view()) <= 1e-6);
    }
}

#[test]
// Purpose
// -------
// Bottom-up reproduces the annual total exactly.
//
// Given
// -----
// - m = 12, monthly forecasts 1..=12.
//
// Expect
// ------
// - kset {12, 6, 4, 3, 2, 1}; annual value exactly 78; no Ω.
fn bottom_up_reproduces_annual_total() {
    let monthly: Vec<f64> = (1..=12).map(|v| v as f64).collect();
    let out = reconcile_temporal(&monthly, 12, &ThfOptions::from_code("bu").unwrap()).unwrap();

    assert_eq!(out.kset(), &[12, 6, 4, 3, 2, 1]);
    assert_eq!(out.level(12).unwrap().to_vec(), vec![78.0]);
    assert_eq!(out.level(1).unwrap().to_vec(), monthly);
    assert!(out.omega.is_none());
    assert!(out.rec_check);
}

#[test]
// Purpose
// -------
// `ols` equals the ordinary least squares projection.
//
// Given
// -----
// - m = 4 (kt = 7), one cycle of incoherent forecasts, 20 × 7 residuals.
//
// Expect
// ------
// - Reconciled = R (RᵀR)⁻¹ Rᵀ ŷ within 1e-10.
fn identity_matches_ols_formula() {
    // Arrange
    let st = TemporalStructure::new(4).unwrap();
    let base = vec![41.0, 19.5, 22.0, 9.0, 11.0, 10.5, 12.5];
    let opts = ThfOptions::from_code("ols").unwrap().with_residual_matrix(residuals(&st, 20));

    // Act
    let out = reconcile_temporal(&base, 4, &opts).unwrap();

    // Assert
    let r = st.r_matrix();
    let rtr_inv = to_dmatrix(r.t().dot(r).view()).try_inverse().unwrap();
    let m_ols = r.dot(&from_dmatrix(&rtr_inv)).dot(&r.t());
    let expected = m_ols.dot(&Array1::from(base));
    for (a, b) in out.reconciled.iter().zip(expected.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-10);
    }
}

#[test]
// Purpose
// -------
// Non-negativity holds for both QP strategies and the heuristic.
//
// Given
// -----
// - m = 4, h = 2, forecasts with several negative quarterly values.
//
// Expect
// ------
// - Two-stage runs report `negative_count > 0`; every reconciled value
//   ≥ −1e-8; coherent output.
fn nonnegativity_is_enforced() {
    let st = TemporalStructure::new(4).unwrap();
    let base = vec![
        2.0, 3.0, // annual
        3.0, -1.0, 1.0, 2.0, // semi-annual
        2.0, 2.0, -3.0, 0.5, 1.5, -2.0, 0.2, 0.3, // quarterly
    ];
    // Direct QP counts negatives on the bounded solver output, so none are expected.
    let variants = [
        (ThfOptions::from_code("struc").unwrap().with_nonnegative(NnStrategy::Qp), true),
        (
            ThfOptions::from_code("struc").unwrap().with_nonnegative(NnStrategy::SetNegativeToZero),
            true,
        ),
        (
            ThfOptions::from_code("ols")
                .unwrap()
                .with_solve_mode(SolveMode::Qp)
                .with_nonnegative(NnStrategy::Qp),
            false,
        ),
    ];
    for (opts, two_stage) in variants {
        let out = reconcile_temporal(&base, 4, &opts).unwrap();
        if two_stage {
            assert!(out.negative_count > 0);
        }
        assert!(out.reconciled.iter().all(|&v| v >= -1e-8));
        assert!(out.rec_check);
        assert!(!out.has_qp_failures());
        assert!(coherence_error(&st, out.horizon_matrix().view()) <= 1e-6);
    }
}

#[test]
// Purpose
// -------
// With no binding bound, the QP reproduces the closed form.
//
// Given
// -----
// - m = 4, h = 2, positive incoherent forecasts, `wlsv` weights.
//
// Expect
// ------
// - QP result within 1e-5 of the closed form; every horizon `Solved`.
fn qp_matches_closed_form_when_bounds_are_inactive() {
    let st = TemporalStructure::new(4).unwrap();
    let base = incoherent_forecasts(&st, 2);
    let opts = ThfOptions::from_code("wlsv").unwrap().with_residual_matrix(residuals(&st, 20));

    let closed = reconcile_temporal(&base, 4, &opts).unwrap();
    let qp = reconcile_temporal(
        &base,
        4,
        &opts.with_solve_mode(SolveMode::Qp).with_nonnegative(NnStrategy::Qp),
    )
    .unwrap();

    for (a, b) in qp.reconciled.iter().zip(closed.reconciled.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-5, max_relative = 1e-5);
    }
    assert_eq!(qp.qp_diagnostics.len(), 2);
    assert!(qp.qp_diagnostics.iter().all(|d| d.status.is_solved()));
}

#[test]
// Purpose
// -------
// A failing QP horizon does not abort the others.
//
// Given
// -----
// - m = 4, h = 3, direct QP with a solver that errors on its second call.
//
// Expect
// ------
// - Horizon 2 is `Failed` with one warning; horizons 1 and 3 are `Solved`;
//   the output stays coherent.
fn failed_horizon_does_not_abort_others() {
    // Arrange
    let st = TemporalStructure::new(4).unwrap();
    let base = incoherent_forecasts(&st, 3);
    let opts = ThfOptions::from_code("struc").unwrap().with_solve_mode(SolveMode::Qp);
    let solver = FailOnCall { fail_at: 2, calls: Cell::new(0) };

    // Act
    let out = reconcile_temporal_with(&base, 4, &opts, &DiagonalTargetShrink, &solver).unwrap();

    // Assert
    assert_eq!(out.qp_diagnostics.len(), 3);
    assert!(matches!(out.qp_diagnostics[1].status, QpStatus::Failed(_)));
    assert!(out.qp_diagnostics[0].status.is_solved());
    assert!(out.qp_diagnostics[2].status.is_solved());
    assert_eq!(out.warnings.len(), 1);
    assert!(out.rec_check);
}

#[test]
// Purpose
// -------
// Fatal errors abort the call.
//
// Given
// -----
// - m = 0; `sam` without residuals; `omega` without a matrix.
//
// Expect
// ------
// - `InvalidFrequency`, `MissingResiduals`, `MissingOmega`.
fn error_paths_are_reported() {
    let err = reconcile_temporal(&[1.0], 0, &ThfOptions::from_code("ols").unwrap()).unwrap_err();
    assert!(matches!(err, RecoError::InvalidFrequency { .. }));

    let base = [5.0, 2.0, 2.0];
    let err = reconcile_temporal(&base, 2, &ThfOptions::from_code("sam").unwrap()).unwrap_err();
    assert!(matches!(err, RecoError::MissingResiduals { .. }));

    let err = reconcile_temporal(&base, 2, &ThfOptions::from_code("omega").unwrap()).unwrap_err();
    assert_eq!(err, RecoError::MissingOmega);
}

#[test]
// Purpose
// -------
// `use_shrink_library` switches `shr` to the correlation-shrink estimator.
//
// Given
// -----
// - m = 4, h = 2, 16 residual cycles, `shr` with and without the switch.
//
// Expect
// ------
// - The reported intensity equals the one of the selected estimator on the
//   same residuals; both outputs are coherent.
fn shrink_library_switch_selects_correlation_shrink() {
    // Arrange
    let st = TemporalStructure::new(4).unwrap();
    let base = incoherent_forecasts(&st, 2);
    let e = residuals(&st, 16);
    let opts = ThfOptions::from_code("shr").unwrap().with_residual_matrix(e.clone());
    let expected_default = DiagonalTargetShrink.shrink(e.view(), MeanCorrection::Uncentered).unwrap();
    let expected_library = CorrelationShrink.shrink(e.view(), MeanCorrection::Uncentered).unwrap();

    // Act
    let default = reconcile_temporal(&base, 4, &opts).unwrap();
    let library = reconcile_temporal(&base, 4, &opts.with_shrink_library(true)).unwrap();

    // Assert
    assert_eq!(default.shrinkage, Some(expected_default.lambda));
    assert_eq!(library.shrinkage, Some(expected_library.lambda));
    assert_eq!(library.omega.as_ref(), Some(&expected_library.covariance));
    assert!(default.rec_check && library.rec_check);
}

#[test]
// Purpose
// -------
// A custom order set is used end to end.
//
// Given
// -----
// - m = 12 with orders {12, 4, 1} (kt = 16), h = 2, `wlsv` residuals on
//   the reduced hierarchy.
//
// Expect
// ------
// - kset [12, 4, 1], 32 reconciled values, coherent output; coherent input
//   is returned unchanged.
fn custom_orders_run_end_to_end() {
    // Arrange
    let st = TemporalStructure::with_orders(12, &[12, 4, 1]).unwrap();
    let opts = ThfOptions::from_code("wlsv")
        .unwrap()
        .with_orders(vec![1, 4, 12])
        .with_residual_matrix(residuals(&st, 12));
    let base = incoherent_forecasts(&st, 2);
    let coherent = coherent_forecasts(&st, 2);

    // Act
    let out = reconcile_temporal(&base, 12, &opts).unwrap();
    let fixed = reconcile_temporal(&coherent, 12, &opts).unwrap();

    // Assert
    assert_eq!(out.kset(), &[12, 4, 1]);
    assert_eq!(out.reconciled.len(), 2 * st.kt());
    assert!(out.rec_check);
    assert_eq!(out.level(4).map(|v| v.len()), Some(6));
    assert!(out.level(6).is_none());
    for (a, b) in fixed.reconciled.iter().zip(coherent.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-8, max_relative = 1e-10);
    }
}

#[test]
// Purpose
// -------
// Hitting the iteration cap keeps the best-effort iterate and warns.
//
// Given
// -----
// - m = 4, h = 2, direct QP with `max_iter = 2` and no polishing.
//
// Expect
// ------
// - Every horizon `MaxIterations` with one `QpNonConvergence` each; the
//   output is finite and coherent.
fn iteration_cap_keeps_best_effort_values() {
    // Arrange
    let st = TemporalStructure::new(4).unwrap();
    let base = incoherent_forecasts(&st, 2);
    let settings = QpSettings::new(1e-8, 1e-8, false, 0, 2).unwrap();
    let opts = ThfOptions::from_code("struc")
        .unwrap()
        .with_solve_mode(SolveMode::Qp)
        .with_qp_settings(settings);

    // Act
    let out = reconcile_temporal(&base, 4, &opts).unwrap();

    // Assert
    assert_eq!(out.qp_diagnostics.len(), 2);
    assert!(out.qp_diagnostics.iter().all(|d| d.status == QpStatus::MaxIterations));
    assert!(out.qp_diagnostics.iter().all(|d| d.iterations <= 2));
    let non_converged = out
        .warnings
        .iter()
        .filter(|w| matches!(w, RecoWarning::QpNonConvergence { .. }))
        .count();
    assert_eq!(non_converged, 2);
    assert!(out.reconciled.iter().all(|v| v.is_finite()));
    assert!(out.rec_check);
}

#[test]
// Purpose
// -------
// An exhausted time budget ends each solve with `TimeLimit`.
//
// Given
// -----
// - m = 12, h = 2, direct QP with a 1 ns budget and tight tolerances.
//
// Expect
// ------
// - Every horizon `TimeLimit` and warned about; the output stays coherent.
fn time_limit_is_reported_per_horizon() {
    // Arrange
    let st = TemporalStructure::new(12).unwrap();
    let base = incoherent_forecasts(&st, 2);
    let settings = QpSettings::new(1e-12, 1e-12, false, 0, 100_000)
        .unwrap()
        .with_time_limit(Duration::from_nanos(1));
    let opts = ThfOptions::from_code("struc")
        .unwrap()
        .with_solve_mode(SolveMode::Qp)
        .with_qp_settings(settings);

    // Act
    let out = reconcile_temporal(&base, 12, &opts).unwrap();

    // Assert
    assert_eq!(out.qp_diagnostics.len(), 2);
    assert!(out.qp_diagnostics.iter().all(|d| d.status == QpStatus::TimeLimit));
    assert_eq!(
        out.warnings.iter().filter(|w| matches!(w, RecoWarning::QpNonConvergence { .. })).count(),
        2
    );
    assert!(out.rec_check);
}

#[test]
// Purpose
// -------
// A short history warns and both forms stay coherent on the singular Ω.
//
// Given
// -----
// - m = 12 (kt = 28), `sam` with 10 residual cycles, unbiased correction.
//
// Expect
// ------
// - `SingularityRisk { periods: 10, required: 28 }` in both outcomes.
// - `rec_check` holds for projection and structural forms, and they agree.
fn short_history_warns_and_stays_coherent() {
    // Arrange
    let st = TemporalStructure::new(12).unwrap();
    let base = incoherent_forecasts(&st, 2);
    let opts = ThfOptions::from_code("sam")
        .unwrap()
        .with_residual_matrix(residuals(&st, 10))
        .with_mean_correction(MeanCorrection::Unbiased);
    let risk = RecoWarning::SingularityRisk { method: "sam", periods: 10, required: 28 };

    // Act
    let projection = reconcile_temporal(&base, 12, &opts).unwrap();
    let structural =
        reconcile_temporal(&base, 12, &opts.with_form(SolverForm::Structural)).unwrap();

    // Assert
    assert!(projection.warnings.contains(&risk));
    assert!(structural.warnings.contains(&risk));
    assert!(projection.rec_check, "error = {}", projection.max_coherence_error);
    assert!(structural.rec_check, "error = {}", structural.max_coherence_error);
    for (a, b) in projection.reconciled.iter().zip(structural.reconciled.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6, max_relative = 1e-8);
    }
}
