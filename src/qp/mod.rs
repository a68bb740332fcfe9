//! qp — quadratic-program capability used by the non-negativity layer.
//!
//! Purpose
//! -------
//! Provide the `solve_qp(problem, settings) -> (x, diagnostics)` capability
//! behind the [`QpSolver`] trait, together with the default operator-splitting
//! implementation [`AdmmQpSolver`].
//!
//! Key behaviors
//! -------------
//! - [`QpProblem`] holds validated data for `min ½xᵀPx + qᵀx  s.t.  l ≤ Ax ≤ u`.
//! - [`AdmmSolver`] is an `argmin` solver; [`run_admm`] drives it through the
//!   `Executor` and converts the final state into a [`QpOutcome`].
//! - [`QpSettings`] is passed explicitly to every solve.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every solve builds its own workspace (KKT factorization, iterates); the
//!   solver types hold no state across calls.
//! - Non-convergence is not an error: the outcome carries the best-effort
//!   iterate and a non-`Solved` [`QpStatus`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; reconciliation-level QP
//!   behavior is covered by the non-negativity tests and the integration
//!   suite.
pub mod admm;
pub mod errors;
pub mod polish;
pub mod problem;
pub mod run;
pub mod settings;

pub use self::admm::{AdmmSolver, PolishStatus};
pub use self::errors::{QpError, QpResult};
pub use self::problem::QpProblem;
pub use self::run::{AdmmQpSolver, QpOutcome, QpSolver, QpStatus, run_admm};
pub use self::settings::QpSettings;
