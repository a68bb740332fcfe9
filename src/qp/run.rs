//! Execution helper that runs the ADMM solver through `argmin` and returns a
//! crate-friendly [`QpOutcome`], plus the [`QpSolver`] capability trait.
use std::time::{Duration, Instant};

use argmin::core::{Executor, State, TerminationReason, TerminationStatus};
use ndarray::Array1;

use crate::qp::{
    admm::{AdmmSolver, PolishStatus, QpParam},
    errors::{QpError, QpResult},
    problem::QpProblem,
    settings::QpSettings,
};

/// Final solver status of one QP run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QpStatus {
    Solved,
    MaxIterations,
    TimeLimit,
    /// Any other backend termination, with its description.
    Stopped(String),
    /// The solve returned an error; set by callers that keep going.
    Failed(String),
}

impl QpStatus {
    pub fn is_solved(&self) -> bool {
        matches!(self, QpStatus::Solved)
    }

    fn from_termination(status: &TerminationStatus) -> Self {
        match status {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => QpStatus::Solved,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                QpStatus::MaxIterations
            }
            TerminationStatus::Terminated(TerminationReason::SolverExit(_)) => QpStatus::TimeLimit,
            TerminationStatus::Terminated(other) => QpStatus::Stopped(format!("{other:?}")),
            TerminationStatus::NotTerminated => QpStatus::Stopped("not terminated".to_string()),
        }
    }
}

impl std::fmt::Display for QpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QpStatus::Solved => write!(f, "solved"),
            QpStatus::MaxIterations => write!(f, "maximum iterations reached"),
            QpStatus::TimeLimit => write!(f, "run time limit reached"),
            QpStatus::Stopped(reason) => write!(f, "stopped: {reason}"),
            QpStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of one QP solve.
///
/// - `x`: final primal iterate (best effort when `status` is not `Solved`).
/// - `y`: dual variables of the constraint rows.
/// - `primal_residual`, `dual_residual`: ∞-norm residuals at `x`.
/// - `objective`: `½xᵀPx + qᵀx` at `x`.
/// - `run_time`: wall time of the solve, setup included.
#[derive(Debug, Clone, PartialEq)]
pub struct QpOutcome {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub status: QpStatus,
    pub polish: PolishStatus,
    pub iterations: u64,
    pub primal_residual: f64,
    pub dual_residual: f64,
    pub objective: f64,
    pub run_time: Duration,
}

/// QP solver capability.
///
/// Implementations must be pure functions of `(problem, settings)`: no
/// state may leak between calls.
pub trait QpSolver {
    fn solve(&self, problem: &QpProblem, settings: &QpSettings) -> QpResult<QpOutcome>;
}

/// Default [`QpSolver`]: ADMM with optional polishing, run by `argmin`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmmQpSolver;

impl QpSolver for AdmmQpSolver {
    fn solve(&self, problem: &QpProblem, settings: &QpSettings) -> QpResult<QpOutcome> {
        run_admm(problem, settings, None)
    }
}

/// Run the ADMM solver on `problem`.
///
/// Wires up the solver, the optional warm start `x0`, `max_iter` and,
/// behind the `obs_slog` feature with `settings.verbose`, a terminal slog
/// observer reporting every iteration's residuals.
///
/// # Errors
/// - Setting and factorization errors from [`AdmmSolver::new`].
/// - Any `argmin` runtime error, normalized via `From<argmin::core::Error>`.
/// - [`QpError::MissingSolution`] if the run produced no iterate.
pub fn run_admm(
    problem: &QpProblem, settings: &QpSettings, x0: Option<QpParam>,
) -> QpResult<QpOutcome> {
    let started = Instant::now();
    let solver = AdmmSolver::new(problem, settings)?;
    let x0 = x0.unwrap_or_else(|| vec![0.0; problem.n()]);

    let mut executor = Executor::new(problem.clone(), solver);
    executor = executor.configure(|state| state.param(x0).max_iters(settings.max_iter as u64));
    #[cfg(feature = "obs_slog")]
    if settings.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        executor = executor.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }

    let result = executor.run()?;
    let state = result.state();
    let solver = result.solver();
    let x = state.get_param().map(|p| Array1::from(p.clone())).ok_or(QpError::MissingSolution)?;
    let status = QpStatus::from_termination(state.get_termination_status());
    let objective = problem.objective(&x);

    Ok(QpOutcome {
        y: solver.duals().clone(),
        status,
        polish: solver.polish_status(),
        iterations: state.get_iter(),
        primal_residual: solver.primal_residual(),
        dual_residual: solver.dual_residual(),
        objective,
        run_time: started.elapsed(),
        x,
    })
}
