//! qp::admm — operator-splitting QP solver as an `argmin` [`Solver`].
//!
//! Purpose
//! -------
//! Solve `min ½xᵀPx + qᵀx  s.t.  l ≤ Ax ≤ u` with the ADMM iteration used by
//! OSQP-style solvers, driven by `argmin`'s [`Executor`](argmin::core::Executor)
//! so iteration caps, observers and termination bookkeeping come from the
//! same backend as the rest of the crate's optimizers.
//!
//! Key behaviors
//! -------------
//! - The reduced KKT matrix `P + σI + Aᵀ diag(ρ) A` is factorized once by
//!   Cholesky at construction; every iteration is two triangular solves.
//! - Equality rows use `ρ·1e3`, free rows `RHO_MIN`, all other rows `ρ`.
//! - Each iteration applies over-relaxation `α`, projects onto `[l, u]`
//!   and updates the scaled duals.
//! - Convergence uses ∞-norm primal/dual residuals against
//!   `eps_abs + eps_rel · scale`. On convergence the solution is optionally
//!   polished (see [`polish`](crate::qp::polish)); the polished point is kept
//!   only if its residuals are no worse.
//! - An optional wall-clock limit terminates with `SolverExit`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `P` is symmetric positive semidefinite; a failed Cholesky factorization
//!   is reported as [`QpError::NonConvexObjective`].
//! - The parameter type is `Vec<f64>`; the state carries the current primal
//!   iterate, never a "best cost" point, since infeasible iterates may have
//!   lower objective values.
use std::time::{Duration, Instant};

use argmin::{
    core::{Error, IterState, KV, Problem, Solver, State, TerminationReason, TerminationStatus},
    kv,
};
use nalgebra::{Cholesky, DVector, Dyn};
use ndarray::Array1;

use crate::{
    linalg::to_dmatrix,
    qp::{
        errors::{QpError, QpResult},
        polish::polish,
        problem::QpProblem,
        settings::QpSettings,
    },
};

/// Primal iterate as carried by the `argmin` state.
pub type QpParam = Vec<f64>;

/// `argmin` state for the ADMM solver: parameter only, scalar objective.
pub type QpState = IterState<QpParam, (), (), (), (), f64>;

/// ρ used for rows with both bounds infinite.
pub const RHO_MIN: f64 = 1e-6;
/// ρ multiplier for equality rows.
pub const RHO_EQ_SCALE: f64 = 1e3;

/// Outcome of the optional polish step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolishStatus {
    NotRun,
    Succeeded,
    Failed,
}

impl std::fmt::Display for PolishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolishStatus::NotRun => write!(f, "not run"),
            PolishStatus::Succeeded => write!(f, "succeeded"),
            PolishStatus::Failed => write!(f, "failed"),
        }
    }
}

/// ADMM solver state beyond the primal iterate held by `IterState`.
pub struct AdmmSolver {
    problem: QpProblem,
    settings: QpSettings,
    rho: Array1<f64>,
    kkt: Cholesky<f64, Dyn>,
    x: Array1<f64>,
    z: Array1<f64>,
    y: Array1<f64>,
    primal_residual: f64,
    dual_residual: f64,
    converged: bool,
    polish_status: PolishStatus,
    started: Option<Instant>,
}

impl AdmmSolver {
    /// Build the solver and factorize its KKT matrix.
    ///
    /// # Errors
    /// - [`QpError::InvalidSetting`] for invalid settings.
    /// - [`QpError::NonConvexObjective`] if the KKT matrix is not positive
    ///   definite.
    pub fn new(problem: &QpProblem, settings: &QpSettings) -> QpResult<Self> {
        settings.validate()?;
        let (n, m) = (problem.n(), problem.m());
        let rho = Array1::from_iter(problem.l().iter().zip(problem.u().iter()).map(|(&lo, &hi)| {
            if lo == hi {
                settings.rho * RHO_EQ_SCALE
            } else if lo.is_infinite() && hi.is_infinite() {
                RHO_MIN
            } else {
                settings.rho
            }
        }));

        let a = problem.a();
        let mut weighted_a = a.clone();
        for (mut row, &r) in weighted_a.rows_mut().into_iter().zip(rho.iter()) {
            row.mapv_inplace(|v| v * r);
        }
        let mut kkt = problem.p() + &a.t().dot(&weighted_a);
        for i in 0..n {
            kkt[[i, i]] += settings.sigma;
        }
        let kkt = to_dmatrix(kkt.view()).cholesky().ok_or(QpError::NonConvexObjective)?;

        Ok(Self {
            problem: problem.clone(),
            settings: settings.clone(),
            rho,
            kkt,
            x: Array1::zeros(n),
            z: Array1::zeros(m),
            y: Array1::zeros(m),
            primal_residual: f64::INFINITY,
            dual_residual: f64::INFINITY,
            converged: false,
            polish_status: PolishStatus::NotRun,
            started: None,
        })
    }

    pub fn duals(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn primal_residual(&self) -> f64 {
        self.primal_residual
    }

    pub fn dual_residual(&self) -> f64 {
        self.dual_residual
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn polish_status(&self) -> PolishStatus {
        self.polish_status
    }

    fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// One ADMM sweep; updates `x`, `z`, `y`.
    fn admm_step(&mut self) {
        let (a, q, l, u) = (self.problem.a(), self.problem.q(), self.problem.l(), self.problem.u());
        let alpha = self.settings.alpha;
        let sigma = self.settings.sigma;

        let scaled = &self.rho * &self.z - &self.y;
        let rhs = &self.x * sigma - q + a.t().dot(&scaled);
        let rhs = DVector::from_iterator(rhs.len(), rhs.iter().copied());
        let x_tilde = self.kkt.solve(&rhs);
        let x_tilde = Array1::from_iter(x_tilde.iter().copied());
        let z_tilde = a.dot(&x_tilde);

        let x_next = &x_tilde * alpha + &self.x * (1.0 - alpha);
        let z_relaxed = &z_tilde * alpha + &self.z * (1.0 - alpha);
        let mut z_next = &z_relaxed + &(&self.y / &self.rho);
        for i in 0..z_next.len() {
            z_next[i] = z_next[i].max(l[i]).min(u[i]);
        }
        let y_next = &self.y + &(&self.rho * &(&z_relaxed - &z_next));

        self.x = x_next;
        self.z = z_next;
        self.y = y_next;
    }

    /// ∞-norm residuals and their tolerances for `(x, z, y)`.
    fn residuals(&self, x: &Array1<f64>, z: &Array1<f64>, y: &Array1<f64>) -> (f64, f64, f64, f64) {
        let (p, q, a) = (self.problem.p(), self.problem.q(), self.problem.a());
        let ax = a.dot(x);
        let px = p.dot(x);
        let aty = a.t().dot(y);
        let r_prim = inf_norm(&(&ax - z));
        let r_dual = inf_norm(&(&px + q + &aty));
        let eps_prim =
            self.settings.eps_abs + self.settings.eps_rel * inf_norm(&ax).max(inf_norm(z));
        let eps_dual = self.settings.eps_abs
            + self.settings.eps_rel * inf_norm(&px).max(inf_norm(&aty)).max(inf_norm(q));
        (r_prim, r_dual, eps_prim, eps_dual)
    }

    fn try_polish(&mut self, eps_prim: f64, eps_dual: f64) {
        let Some(polished) =
            polish(&self.problem, &self.z, &self.y, self.settings.polish_refine_iter)
        else {
            self.polish_status = PolishStatus::Failed;
            return;
        };
        let violation = self.problem.constraint_violation(&polished.x);
        let (_, r_dual, _, _) = self.residuals(&polished.x, &polished.z, &polished.y);
        if violation <= self.primal_residual.max(eps_prim)
            && r_dual <= self.dual_residual.max(eps_dual)
        {
            self.x = polished.x;
            self.z = polished.z.iter().zip(self.problem.l().iter().zip(self.problem.u().iter()))
                .map(|(&v, (&lo, &hi))| v.max(lo).min(hi))
                .collect();
            self.y = polished.y;
            self.primal_residual = violation;
            self.dual_residual = r_dual;
            self.polish_status = PolishStatus::Succeeded;
        } else {
            self.polish_status = PolishStatus::Failed;
        }
    }
}

impl Solver<QpProblem, QpState> for AdmmSolver {
    const NAME: &'static str = "ADMM-QP";

    fn init(
        &mut self, _problem: &mut Problem<QpProblem>, state: QpState,
    ) -> Result<(QpState, Option<KV>), Error> {
        self.started = Some(Instant::now());
        if let Some(x0) = state.get_param() {
            if x0.len() != self.problem.n() {
                return Err(QpError::DimensionMismatch {
                    name: "x0",
                    expected: self.problem.n(),
                    found: x0.len(),
                }
                .into());
            }
            self.x = Array1::from(x0.clone());
            self.z = self.problem.a().dot(&self.x);
        }
        Ok((state.param(self.x.to_vec()), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<QpProblem>, state: QpState,
    ) -> Result<(QpState, Option<KV>), Error> {
        self.admm_step();
        let (r_prim, r_dual, eps_prim, eps_dual) = self.residuals(&self.x, &self.z, &self.y);
        self.primal_residual = r_prim;
        self.dual_residual = r_dual;
        self.converged = r_prim <= eps_prim && r_dual <= eps_dual;
        if self.converged && self.settings.polish {
            self.try_polish(eps_prim, eps_dual);
        }

        let param = self.x.to_vec();
        let cost = problem.cost(&param)?;
        Ok((
            state.param(param).cost(cost),
            Some(kv!(
                "r_prim" => self.primal_residual;
                "r_dual" => self.dual_residual;
            )),
        ))
    }

    fn terminate(&mut self, _state: &QpState) -> TerminationStatus {
        if self.converged {
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }
        if let Some(limit) = self.settings.time_limit {
            if self.elapsed() >= limit {
                return TerminationStatus::Terminated(TerminationReason::SolverExit(
                    "run time limit reached".to_string(),
                ));
            }
        }
        TerminationStatus::NotTerminated
    }
}

fn inf_norm(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
