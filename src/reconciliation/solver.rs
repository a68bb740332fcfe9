//! reconciliation::solver — closed-form temporal reconciliation.
//!
//! Purpose
//! -------
//! Compute the GLS reconciliation operator for a given Ω in either of its
//! two equivalent forms and apply it to every top cycle, plus the
//! bottom-up special case and the coherence check.
//!
//! Key behaviors
//! -------------
//! - Projection form: `M = R (RᵀΩ⁻¹R)⁻¹ RᵀΩ⁻¹`.
//! - Structural form: `G = I − ΩZtᵀ(ZtΩZtᵀ)⁻¹Zt`.
//! - Every inverse goes through [`robust_inverse`]; a numerically singular
//!   matrix is pseudo-inverted and reported as [`RecoWarning::PseudoInverse`].
//! - A singular `ZtΩZtᵀ` makes `G` incoherent, so the structural form then
//!   carries the projection operator `M` as its `G`.
//! - Bottom-up: `x = R·b` from base-level forecasts, no Ω and no solve.
//!
//! Invariants & assumptions
//! ------------------------
//! - Both forms coincide for positive definite Ω and map coherent inputs to
//!   themselves.
//! - When `k* = 0` (`m = 1`) both operators reduce to the identity.
//!
//! Conventions
//! -----------
//! - Horizon matrices are `h × kt`; operators act on rows, so the reconciled
//!   matrix is `Ŷ · Opᵀ`.
use ndarray::{Array2, ArrayView2, s};

use crate::{
    linalg::robust_inverse,
    reconciliation::{
        core::{
            layout::{bottom_to_matrix, to_horizon_matrix},
            options::SolverForm,
            structure::TemporalStructure,
        },
        errors::{RecoResult, RecoWarning},
        outcome::SolverMatrices,
    },
};

/// Largest admissible `|Zt·x|` entry for a result to count as coherent.
pub const REC_CHECK_TOL: f64 = 1e-6;

/// Closed-form operator with the warnings raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedForm {
    pub matrices: SolverMatrices,
    pub warnings: Vec<RecoWarning>,
}

impl ClosedForm {
    /// Reconcile every row of an `h × kt` base matrix.
    pub fn apply(&self, base: ArrayView2<'_, f64>) -> Array2<f64> {
        base.dot(&self.matrices.operator().t())
    }
}

/// Build the closed-form operator for `omega` in the requested form.
pub fn closed_form(
    structure: &TemporalStructure, omega: ArrayView2<'_, f64>, form: SolverForm,
) -> ClosedForm {
    match form {
        SolverForm::Projection => projection_form(structure, omega),
        SolverForm::Structural => structural_form(structure, omega),
    }
}

/// `M = R (RᵀΩ⁻¹R)⁻¹ RᵀΩ⁻¹`.
pub fn projection_form(structure: &TemporalStructure, omega: ArrayView2<'_, f64>) -> ClosedForm {
    let mut warnings = Vec::new();
    let r = structure.r_matrix();
    let omega_inv = robust_inverse(omega);
    if omega_inv.pseudo {
        warnings.push(RecoWarning::PseudoInverse { stage: "Omega" });
    }
    let rt_oinv = r.t().dot(&omega_inv.matrix);
    let bracket = robust_inverse(rt_oinv.dot(r).view());
    if bracket.pseudo {
        warnings.push(RecoWarning::PseudoInverse { stage: "R'Omega^-1 R" });
    }
    let m = r.dot(&bracket.matrix).dot(&rt_oinv);
    ClosedForm { matrices: SolverMatrices::Projection { m, r: r.clone() }, warnings }
}

/// `G = I − ΩZtᵀ(ZtΩZtᵀ)⁻¹Zt`.
///
/// When `ZtΩZtᵀ` is singular, `Zt·G ≠ 0` in general; `G` is then replaced by
/// the projection operator `M`, whose range is always `range(R)`.
pub fn structural_form(structure: &TemporalStructure, omega: ArrayView2<'_, f64>) -> ClosedForm {
    let mut warnings = Vec::new();
    let zt = structure.zt_matrix();
    let kt = structure.kt();
    let omega_zt = omega.dot(&zt.t());
    let bracket = robust_inverse(zt.dot(&omega_zt).view());
    let g = if bracket.pseudo {
        warnings.push(RecoWarning::PseudoInverse { stage: "Zt Omega Zt'" });
        let projection = projection_form(structure, omega);
        warnings.extend(projection.warnings);
        match projection.matrices {
            SolverMatrices::Projection { m, .. } => m,
            SolverMatrices::Structural { g, .. } => g,
        }
    } else {
        Array2::<f64>::eye(kt) - omega_zt.dot(&bracket.matrix).dot(zt)
    };
    ClosedForm { matrices: SolverMatrices::Structural { g, zt: zt.clone() }, warnings }
}

/// Bottom-up reconciliation: aggregate base-level forecasts through `R`.
///
/// `base` may be the full stacked vector (length a multiple of `kt`; only
/// the `k = 1` block is read) or the base level alone (length a multiple of
/// `m`). When both readings are possible the stacked one wins.
///
/// # Errors
/// - `ShapeMismatch` when the length fits neither layout.
pub fn bottom_up(structure: &TemporalStructure, base: &[f64]) -> RecoResult<Array2<f64>> {
    let kt = structure.kt();
    let bottom = if !base.is_empty() && base.len() % kt == 0 {
        to_horizon_matrix(structure, base, "base_forecasts")?
            .slice(s![.., structure.k_star()..])
            .to_owned()
    } else {
        bottom_to_matrix(structure, base, "base_forecasts")?
    };
    Ok(aggregate(structure, bottom.view()))
}

/// `x = R·b` for every row of an `h × m` bottom matrix.
pub fn aggregate(structure: &TemporalStructure, bottom: ArrayView2<'_, f64>) -> Array2<f64> {
    bottom.dot(&structure.r_matrix().t())
}

/// Largest `|Zt·x|` over all rows of an `h × kt` matrix.
pub fn coherence_error(structure: &TemporalStructure, x: ArrayView2<'_, f64>) -> f64 {
    if structure.k_star() == 0 {
        return 0.0;
    }
    let residual = x.dot(&structure.zt_matrix().t());
    residual.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

/// Whether every row satisfies `|Zt·x| < REC_CHECK_TOL`.
pub fn rec_check(structure: &TemporalStructure, x: ArrayView2<'_, f64>) -> bool {
    coherence_error(structure, x) < REC_CHECK_TOL
}

/// Base-level block of an `h × kt` matrix.
pub fn bottom_block(structure: &TemporalStructure, x: ArrayView2<'_, f64>) -> Array2<f64> {
    x.slice(s![.., structure.k_star()..]).to_owned()
}
