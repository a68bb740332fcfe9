//! reconciliation::nonneg — QP solves and non-negativity corrections.
//!
//! Purpose
//! -------
//! Handle every horizon that is not (only) solved in closed form:
//!
//! - two-stage correction of closed-form results that contain negative
//!   values, either by a bounded QP re-solve of the whole horizon or by the
//!   set-negative-to-zero heuristic;
//! - direct QP reconciliation of every horizon.
//!
//! Key behaviors
//! -------------
//! - Each horizon QP is `min ½xᵀΩ⁻¹x − (Ω⁻¹ŷ)ᵀx` s.t. `Zt·x = 0` and, when
//!   non-negativity is enforced, `x_bottom ≥ 0`. The objective is normalized
//!   by the largest diagonal entry of Ω⁻¹ before solving; reported
//!   objectives are in the original scale.
//! - QP output is made exactly coherent by re-aggregating its base level
//!   (`x = R·b`); with the bound active, base values are first clamped at 0.
//! - A horizon whose solve errors keeps the closed-form row (clamped and
//!   re-aggregated when non-negativity is enforced). Non-`Solved` or failed
//!   horizons add a [`RecoWarning::QpNonConvergence`]; other horizons are
//!   unaffected.
//!
//! Invariants & assumptions
//! ------------------------
//! - Values in `[−NN_TOL, 0)` are treated as round-off: they are clamped
//!   without a QP and are not counted as negatives.
//! - Horizons are independent; each QP call builds its own workspace.
use std::time::Duration;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

use crate::{
    qp::{PolishStatus, QpProblem, QpSettings, QpSolver, QpStatus},
    reconciliation::{
        core::{options::NnStrategy, structure::TemporalStructure},
        errors::{RecoResult, RecoWarning},
        outcome::HorizonDiagnostics,
    },
};

/// Round-off tolerance for negative values (≈ `sqrt(f64::EPSILON)`).
pub const NN_TOL: f64 = 1.490_116_119_384_765_6e-8;

/// Result of the QP / non-negativity layer over all horizons.
#[derive(Debug, Clone, PartialEq)]
pub struct NnOutcome {
    pub reconciled: Array2<f64>,
    pub diagnostics: Vec<HorizonDiagnostics>,
    pub warnings: Vec<RecoWarning>,
    /// Negatives (below `−NN_TOL`) in the first-stage solution.
    pub negative_count: usize,
}

/// Shared inputs for the per-horizon QP solves.
pub struct QpContext<'a> {
    pub structure: &'a TemporalStructure,
    /// `Ω⁻¹` (pseudo-inverse if Ω is singular).
    pub precision: &'a Array2<f64>,
    pub solver: &'a dyn QpSolver,
    pub settings: &'a QpSettings,
}

/// Count entries below `−NN_TOL`.
pub fn count_negatives(x: ArrayView2<'_, f64>) -> usize {
    x.iter().filter(|&&v| v < -NN_TOL).count()
}

/// Zero negative base-level values of one horizon and re-aggregate.
pub fn set_negative_to_zero(structure: &TemporalStructure, row: ArrayView1<'_, f64>) -> Array1<f64> {
    let bottom = row.slice(s![structure.k_star()..]).mapv(|v| v.max(0.0));
    structure.r_matrix().dot(&bottom)
}

/// Build the QP of one horizon.
///
/// # Errors
/// - [`QpError`](crate::qp::QpError) variants for inconsistent data.
pub fn horizon_problem(
    structure: &TemporalStructure, precision: &Array2<f64>, base_row: ArrayView1<'_, f64>,
    nonnegative: bool,
) -> RecoResult<(QpProblem, f64)> {
    let kt = structure.kt();
    let (k_star, m) = (structure.k_star(), structure.m());
    let sym = (precision + &precision.t()) * 0.5;
    let scale = sym.diag().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let scale = if scale > 0.0 && scale.is_finite() { scale } else { 1.0 };
    let p = sym / scale;
    let q = -p.dot(&base_row);

    let rows = if nonnegative { k_star + m } else { k_star };
    let mut a = Array2::<f64>::zeros((rows, kt));
    a.slice_mut(s![..k_star, ..]).assign(structure.zt_matrix());
    let l = Array1::<f64>::zeros(rows);
    let mut u = Array1::<f64>::zeros(rows);
    if nonnegative {
        a.slice_mut(s![k_star.., k_star..]).assign(&Array2::<f64>::eye(m));
        u.slice_mut(s![k_star..]).fill(f64::INFINITY);
    }
    Ok((QpProblem::new(p, q, a, l, u)?, scale))
}

/// Solve one horizon by QP, falling back to `fallback` when the solver errors.
///
/// Returns the coherent solution, the raw solver iterate (before clamping)
/// and the diagnostics entry; pushes a warning into `warnings` when the
/// horizon did not reach `Solved`.
pub fn solve_horizon(
    ctx: &QpContext<'_>, horizon: usize, base_row: ArrayView1<'_, f64>,
    fallback: ArrayView1<'_, f64>, nonnegative: bool, warnings: &mut Vec<RecoWarning>,
) -> RecoResult<(Array1<f64>, Array1<f64>, HorizonDiagnostics)> {
    let structure = ctx.structure;
    let (problem, scale) = horizon_problem(structure, ctx.precision, base_row, nonnegative)?;
    let (raw, diagnostics) = match ctx.solver.solve(&problem, ctx.settings) {
        Ok(out) => {
            let diagnostics = HorizonDiagnostics {
                horizon,
                status: out.status.clone(),
                polish: out.polish,
                iterations: out.iterations,
                primal_residual: out.primal_residual,
                dual_residual: out.dual_residual,
                objective: out.objective * scale,
                run_time: out.run_time,
            };
            (out.x, diagnostics)
        }
        Err(err) => {
            let diagnostics = HorizonDiagnostics {
                horizon,
                status: QpStatus::Failed(err.to_string()),
                polish: PolishStatus::NotRun,
                iterations: 0,
                primal_residual: f64::NAN,
                dual_residual: f64::NAN,
                objective: f64::NAN,
                run_time: Duration::ZERO,
            };
            (fallback.to_owned(), diagnostics)
        }
    };
    if !diagnostics.status.is_solved() {
        warnings.push(RecoWarning::QpNonConvergence {
            horizon,
            status: diagnostics.status.to_string(),
        });
    }
    let coherent = if nonnegative {
        set_negative_to_zero(structure, raw.view())
    } else {
        structure.r_matrix().dot(&raw.slice(s![structure.k_star()..]))
    };
    Ok((coherent, raw, diagnostics))
}

/// Two-stage non-negativity: correct every closed-form horizon that has a
/// value below zero.
///
/// - Values in `[−NN_TOL, 0)` only: clamp and re-aggregate.
/// - Otherwise: QP re-solve of the whole horizon (`NnStrategy::Qp`), or the
///   set-negative-to-zero heuristic (`NnStrategy::SetNegativeToZero`).
///
/// # Errors
/// - QP data errors; solver failures are recorded per horizon instead.
pub fn enforce_nonnegative(
    ctx: &QpContext<'_>, base: ArrayView2<'_, f64>, closed: Array2<f64>, strategy: NnStrategy,
) -> RecoResult<NnOutcome> {
    let negative_count = count_negatives(closed.view());
    let mut reconciled = closed;
    let mut diagnostics = Vec::new();
    let mut warnings = Vec::new();

    for t in 0..reconciled.nrows() {
        let row = reconciled.row(t).to_owned();
        let min = row.iter().fold(f64::INFINITY, |acc, &v| acc.min(v));
        if min >= 0.0 {
            continue;
        }
        let corrected = if min >= -NN_TOL || strategy == NnStrategy::SetNegativeToZero {
            set_negative_to_zero(ctx.structure, row.view())
        } else {
            let (coherent, _, diag) =
                solve_horizon(ctx, t + 1, base.row(t), row.view(), true, &mut warnings)?;
            diagnostics.push(diag);
            coherent
        };
        reconciled.row_mut(t).assign(&corrected);
    }

    Ok(NnOutcome { reconciled, diagnostics, warnings, negative_count })
}

/// Direct QP reconciliation of every horizon.
///
/// `fallback` holds the closed-form rows used for horizons whose solve
/// errors. `negative_count` is taken on the raw QP iterates.
///
/// # Errors
/// - QP data errors; solver failures are recorded per horizon instead.
pub fn solve_all(
    ctx: &QpContext<'_>, base: ArrayView2<'_, f64>, fallback: ArrayView2<'_, f64>,
    nonnegative: bool,
) -> RecoResult<NnOutcome> {
    let (h, kt) = base.dim();
    let mut reconciled = Array2::<f64>::zeros((h, kt));
    let mut raw_all = Array2::<f64>::zeros((h, kt));
    let mut diagnostics = Vec::with_capacity(h);
    let mut warnings = Vec::new();

    for t in 0..h {
        let (coherent, raw, diag) =
            solve_horizon(ctx, t + 1, base.row(t), fallback.row(t), nonnegative, &mut warnings)?;
        reconciled.row_mut(t).assign(&coherent);
        raw_all.row_mut(t).assign(&raw);
        diagnostics.push(diag);
    }

    Ok(NnOutcome {
        negative_count: count_negatives(raw_all.view()),
        reconciled,
        diagnostics,
        warnings,
    })
}
