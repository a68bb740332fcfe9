//! reconciliation::outcome — result types returned by temporal reconciliation.
//!
//! Purpose
//! -------
//! Bundle the reconciled forecasts with everything a caller needs to audit
//! them: the Ω actually used, the solver matrices, coherence and
//! non-negativity checks, per-horizon QP diagnostics and advisory warnings.
//!
//! Conventions
//! -----------
//! - `reconciled` follows the input convention: level-major from `k = m`
//!   down to `k = 1`, each level in time order.
//! - Horizons in [`HorizonDiagnostics`] are 1-based top cycles.
//! - `OutputDetail::Summary` leaves `omega` and `matrices` empty; checks,
//!   warnings and diagnostics are always filled.
use std::time::Duration;

use ndarray::{Array1, Array2, ArrayView1};

use crate::{
    qp::{PolishStatus, QpStatus},
    reconciliation::{
        core::{layout::to_horizon_matrix, options::CombMethod, structure::TemporalStructure},
        errors::RecoWarning,
    },
};

/// Closed-form operators used for the solve.
///
/// - `Projection { m, r }`: `M = R (RᵀΩ⁻¹R)⁻¹ RᵀΩ⁻¹` and the summing matrix.
/// - `Structural { g, zt }`: `G = I − ΩZtᵀ(ZtΩZtᵀ)⁻¹Zt` and the constraint matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverMatrices {
    Projection { m: Array2<f64>, r: Array2<f64> },
    Structural { g: Array2<f64>, zt: Array2<f64> },
}

impl SolverMatrices {
    /// The `kt × kt` reconciliation operator (`M` or `G`).
    pub fn operator(&self) -> &Array2<f64> {
        match self {
            SolverMatrices::Projection { m, .. } => m,
            SolverMatrices::Structural { g, .. } => g,
        }
    }
}

/// Diagnostics of one horizon's QP solve.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonDiagnostics {
    pub horizon: usize,
    pub status: QpStatus,
    pub polish: PolishStatus,
    pub iterations: u64,
    pub primal_residual: f64,
    pub dual_residual: f64,
    pub objective: f64,
    pub run_time: Duration,
}

/// ThfOutcome — reconciled forecasts and audit information.
///
/// Fields
/// ------
/// - `reconciled`: level-major reconciled forecasts (`h·kt` values).
/// - `labels`: `"k{k} h{j}"` label of every entry of `reconciled`.
/// - `horizons`: number of top cycles `h`.
/// - `comb`: combination method used.
/// - `omega`: Ω used (`None` for bottom-up or summary detail).
/// - `negative_count`: entries below zero before any non-negativity
///   correction.
/// - `rec_check`: every `|Zt·x|` is within `REC_CHECK_TOL`.
/// - `max_coherence_error`: largest `|Zt·x|` over all horizons.
/// - `matrices`: closed-form operators (full detail only).
/// - `qp_diagnostics`: one entry per QP solve, empty when no QP ran.
/// - `warnings`: advisory conditions met during the call.
/// - `shrinkage`: shrinkage intensity for `shr`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThfOutcome {
    pub reconciled: Array1<f64>,
    pub labels: Vec<String>,
    pub horizons: usize,
    pub comb: CombMethod,
    pub omega: Option<Array2<f64>>,
    pub negative_count: usize,
    pub rec_check: bool,
    pub max_coherence_error: f64,
    pub matrices: Option<SolverMatrices>,
    pub qp_diagnostics: Vec<HorizonDiagnostics>,
    pub warnings: Vec<RecoWarning>,
    pub shrinkage: Option<f64>,
    pub(crate) structure: TemporalStructure,
}

impl ThfOutcome {
    /// Temporal structure the forecasts were reconciled over.
    pub fn structure(&self) -> &TemporalStructure {
        &self.structure
    }

    /// Aggregation orders, descending from `m` to `1`.
    pub fn kset(&self) -> &[usize] {
        self.structure.kset()
    }

    /// Reconciled series of aggregation order `k` (`h·m/k` values in time
    /// order), or `None` if `k` is not part of the hierarchy.
    pub fn level(&self, k: usize) -> Option<ArrayView1<'_, f64>> {
        let idx = self.structure.kset().iter().position(|&o| o == k)?;
        let start = self.horizons * self.structure.level_offsets()[idx];
        let len = self.horizons * self.structure.block_size(k);
        Some(self.reconciled.slice(ndarray::s![start..start + len]))
    }

    /// Reconciled forecasts as an `h × kt` matrix (one row per top cycle).
    pub fn horizon_matrix(&self) -> Array2<f64> {
        let flat = self.reconciled.to_vec();
        to_horizon_matrix(&self.structure, &flat, "reconciled")
            .unwrap_or_else(|_| Array2::zeros((0, self.structure.kt())))
    }

    /// Whether any QP horizon ended without a `Solved` status.
    pub fn has_qp_failures(&self) -> bool {
        self.qp_diagnostics.iter().any(|d| !d.status.is_solved())
    }
}
