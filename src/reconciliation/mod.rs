//! reconciliation — temporal-hierarchy forecast reconciliation.
//!
//! Purpose
//! -------
//! Make forecasts produced independently at every temporal aggregation level
//! of one series (e.g. monthly, quarterly, annual) coherent with the
//! aggregation constraints. This is the main entry point of the crate and
//! the surface the Python bindings depend on.
//!
//! Key behaviors
//! -------------
//! - [`core`] builds the [`TemporalStructure`] (orders, `R`, `Zt`), the
//!   flat ↔ horizon-matrix layout, input guards and the [`ThfOptions`]
//!   configuration.
//! - [`covariance`] estimates Ω for every [`CovMethod`], with pluggable
//!   shrinkage through [`Shrinker`].
//! - [`solver`] applies the projection or structural closed form, or the
//!   bottom-up aggregation.
//! - [`nonneg`] runs per-horizon QP solves (two-stage correction or direct
//!   QP) through any [`QpSolver`](crate::qp::QpSolver).
//! - [`thf`] wires the steps together in [`reconcile_temporal`] and
//!   composes the [`ThfOutcome`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Every call is stateless: the structure, Ω and all operators are derived
//!   from the arguments and dropped with the outcome.
//! - Reconciled output satisfies `|Zt·x| < 1e-6` per horizon unless a QP
//!   horizon failed, which is visible in `qp_diagnostics` and `warnings`.
//!
//! Conventions
//! -----------
//! - Flat vectors are level-major: order `m` first and order `1` last, each
//!   level in time order over `h` top cycles. Internally, the `h × kt`
//!   horizon matrix holds one top cycle per row.
//! - No I/O and no logging; advisory conditions are [`RecoWarning`] values.
//!
//! Downstream usage
//! ----------------
//! - Typical flow:
//!   1. Build options: `ThfOptions::from_code("wlsv")?.with_stacked_residuals(res)`.
//!   2. Call `reconcile_temporal(&base, 12, &options)?`.
//!   3. Read `outcome.reconciled`, `outcome.level(k)` or
//!      `outcome.horizon_matrix()`, and check `rec_check` / `warnings`.
//!
//! Testing notes
//! -------------
//! - Unit tests sit next to each submodule; `tests/integration_thf_pipeline.rs`
//!   checks the end-to-end properties (idempotence, form equivalence,
//!   coherence, non-negativity, error paths).
pub mod core;
pub mod covariance;
pub mod errors;
pub mod nonneg;
pub mod outcome;
pub mod solver;
pub mod thf;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    layout::{from_horizon_matrix, labels, to_horizon_matrix},
    options::{
        CombMethod, MeanCorrection, NnStrategy, OutputDetail, ResidualInput, SolveMode,
        SolverForm, ThfOptions,
    },
    structure::TemporalStructure,
};
pub use self::covariance::{
    CorrelationShrink, CovMethod, DiagonalTargetShrink, ShrinkOutcome, Shrinker,
};
pub use self::errors::{RecoError, RecoResult, RecoWarning};
pub use self::outcome::{HorizonDiagnostics, SolverMatrices, ThfOutcome};
pub use self::thf::{reconcile_temporal, reconcile_temporal_with};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_temporal_hierarchy::reconciliation::prelude::*;
//
// to import the main reconciliation surface in a single line.

pub mod prelude {
    pub use super::{
        CombMethod, CovMethod, NnStrategy, RecoError, RecoResult, RecoWarning, SolveMode,
        SolverForm, TemporalStructure, ThfOptions, ThfOutcome, reconcile_temporal,
    };
    pub use crate::qp::QpSettings;
}
