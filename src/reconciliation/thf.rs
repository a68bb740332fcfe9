//! reconciliation::thf — temporal-hierarchy reconciliation entry points.
//!
//! Purpose
//! -------
//! Run one complete reconciliation: build the temporal structure, estimate
//! Ω, solve in closed form or by QP, apply the non-negativity layer and
//! compose the [`ThfOutcome`].
//!
//! Key behaviors
//! -------------
//! - Every shape and value check runs before any numerical work; such errors
//!   abort the call with no partial result.
//! - `bu` bypasses Ω entirely: base-level forecasts are aggregated through
//!   `R` (with negative base values set to zero when non-negativity is
//!   enforced).
//! - In QP mode the closed form is still computed; it backs horizons whose
//!   solve errors, but its matrices are not reported.
//! - Residuals are only read (and validated) by methods that need them.
//!
//! Conventions
//! -----------
//! - [`reconcile_temporal`] uses the built-in capabilities:
//!   [`DiagonalTargetShrink`] (or [`CorrelationShrink`] when
//!   `use_shrink_library` is set) and [`AdmmQpSolver`].
//!   [`reconcile_temporal_with`] takes both from the caller.
use ndarray::{Array2, ArrayView2};

use crate::{
    linalg::robust_inverse,
    qp::{AdmmQpSolver, QpSolver},
    reconciliation::{
        core::{
            layout::{from_horizon_matrix, labels, to_horizon_matrix},
            options::{CombMethod, OutputDetail, SolveMode, ThfOptions},
            structure::TemporalStructure,
            validation::validate_finite,
        },
        covariance::{
            CorrelationShrink, CovInputs, CovMethod, DiagonalTargetShrink, Shrinker,
            estimate_omega, residual_matrix,
        },
        errors::{RecoError, RecoResult, RecoWarning},
        nonneg::{
            NnOutcome, QpContext, count_negatives, enforce_nonnegative, set_negative_to_zero,
            solve_all,
        },
        outcome::{SolverMatrices, ThfOutcome},
        solver::{bottom_up, closed_form, coherence_error, REC_CHECK_TOL},
    },
};

/// Reconcile `base_forecasts` over the temporal hierarchy of frequency `m`.
///
/// `base_forecasts` is level-major (`k = m` first, `k = 1` last), each level
/// in time order, over `h` complete top cycles. For `bu` the base level
/// alone (`h·m` values) is accepted too.
///
/// # Errors
/// - `InvalidFrequency` / `InvalidAggregationOrder` for a bad structure.
/// - `EmptyForecasts`, `NonFiniteInput`, `ShapeMismatch` for bad forecasts.
/// - Residual and Ω errors from the covariance estimator.
/// - `Qp` for QP data errors (solver failures are per-horizon warnings).
pub fn reconcile_temporal(
    base_forecasts: &[f64], m: usize, options: &ThfOptions,
) -> RecoResult<ThfOutcome> {
    let solver = AdmmQpSolver;
    if options.use_shrink_library {
        reconcile_temporal_with(base_forecasts, m, options, &CorrelationShrink, &solver)
    } else {
        reconcile_temporal_with(base_forecasts, m, options, &DiagonalTargetShrink, &solver)
    }
}

/// [`reconcile_temporal`] with caller-supplied shrinkage and QP capabilities.
///
/// # Errors
/// - Same as [`reconcile_temporal`].
pub fn reconcile_temporal_with(
    base_forecasts: &[f64], m: usize, options: &ThfOptions, shrinker: &dyn Shrinker,
    qp_solver: &dyn QpSolver,
) -> RecoResult<ThfOutcome> {
    let structure = match &options.orders {
        Some(orders) => TemporalStructure::with_orders(m, orders)?,
        None => TemporalStructure::new(m)?,
    };
    if base_forecasts.is_empty() {
        return Err(RecoError::EmptyForecasts);
    }
    validate_finite("base_forecasts", base_forecasts)?;
    options.qp_settings.validate()?;

    match options.comb {
        CombMethod::BottomUp => reconcile_bottom_up(structure, base_forecasts, options),
        CombMethod::Covariance(method) => {
            reconcile_covariance(structure, base_forecasts, method, options, shrinker, qp_solver)
        }
    }
}

fn reconcile_bottom_up(
    structure: TemporalStructure, base_forecasts: &[f64], options: &ThfOptions,
) -> RecoResult<ThfOutcome> {
    let mut rows = bottom_up(&structure, base_forecasts)?;
    let negative_count = count_negatives(rows.view());
    if options.enforce_nonnegative {
        for t in 0..rows.nrows() {
            let corrected = set_negative_to_zero(&structure, rows.row(t));
            rows.row_mut(t).assign(&corrected);
        }
    }
    Ok(compose(structure, rows, options, None, None, NnOutcome::empty(negative_count), Vec::new()))
}

fn reconcile_covariance(
    structure: TemporalStructure, base_forecasts: &[f64], method: CovMethod,
    options: &ThfOptions, shrinker: &dyn Shrinker, qp_solver: &dyn QpSolver,
) -> RecoResult<ThfOutcome> {
    let base = to_horizon_matrix(&structure, base_forecasts, "base_forecasts")?;
    let residuals = match (&options.residuals, method.needs_residuals()) {
        (Some(input), true) => Some(residual_matrix(&structure, input)?),
        _ => None,
    };

    let cov = estimate_omega(
        &structure,
        method,
        CovInputs {
            residuals: residuals.as_ref().map(|e| e.view()),
            user_omega: options.omega.as_ref().map(|o| o.view()),
            mean_correction: options.mean_correction,
            shrinker,
        },
    )?;
    let mut warnings = cov.warnings;
    let closed = closed_form(&structure, cov.omega.view(), options.form);
    warnings.extend(closed.warnings.iter().cloned());
    let closed_rows = closed.apply(base.view());

    let needs_qp = options.solve_mode == SolveMode::Qp || options.enforce_nonnegative;
    let (rows, nn, matrices) = if needs_qp {
        let precision = precision_matrix(cov.omega.view(), &mut warnings);
        let ctx = QpContext {
            structure: &structure,
            precision: &precision,
            solver: qp_solver,
            settings: &options.qp_settings,
        };
        if options.solve_mode == SolveMode::Qp {
            let nn =
                solve_all(&ctx, base.view(), closed_rows.view(), options.enforce_nonnegative)?;
            (nn.reconciled.clone(), nn, None)
        } else {
            let nn = enforce_nonnegative(&ctx, base.view(), closed_rows, options.nn_strategy)?;
            (nn.reconciled.clone(), nn, Some(closed.matrices))
        }
    } else {
        let negative_count = count_negatives(closed_rows.view());
        (closed_rows, NnOutcome::empty(negative_count), Some(closed.matrices))
    };
    warnings.extend(nn.warnings.iter().cloned());

    let mut outcome =
        compose(structure, rows, options, Some(cov.omega), matrices, nn, warnings);
    outcome.shrinkage = cov.shrinkage;
    Ok(outcome)
}

/// `Ω⁻¹` for the QP objective; reports a pseudo-inverse once.
fn precision_matrix(omega: ArrayView2<'_, f64>, warnings: &mut Vec<RecoWarning>) -> Array2<f64> {
    let inverse = robust_inverse(omega);
    let warning = RecoWarning::PseudoInverse { stage: "Omega" };
    if inverse.pseudo && !warnings.contains(&warning) {
        warnings.push(warning);
    }
    inverse.matrix
}

fn compose(
    structure: TemporalStructure, rows: Array2<f64>, options: &ThfOptions,
    omega: Option<Array2<f64>>, matrices: Option<SolverMatrices>, nn: NnOutcome,
    warnings: Vec<RecoWarning>,
) -> ThfOutcome {
    let horizons = rows.nrows();
    let max_coherence_error = coherence_error(&structure, rows.view());
    let (omega, matrices) = match options.output_detail {
        OutputDetail::Full => (omega, matrices),
        OutputDetail::Summary => (None, None),
    };
    ThfOutcome {
        reconciled: from_horizon_matrix(&structure, rows.view()),
        labels: labels(&structure, horizons),
        horizons,
        comb: options.comb,
        omega,
        negative_count: nn.negative_count,
        rec_check: max_coherence_error < REC_CHECK_TOL,
        max_coherence_error,
        matrices,
        qp_diagnostics: nn.diagnostics,
        warnings,
        shrinkage: None,
        structure,
    }
}

impl NnOutcome {
    fn empty(negative_count: usize) -> Self {
        NnOutcome {
            reconciled: Array2::zeros((0, 0)),
            diagnostics: Vec::new(),
            warnings: Vec::new(),
            negative_count,
        }
    }
}
