//! Solution polishing for the ADMM QP solver.
//!
//! After ADMM converges, the constraints whose dual variable pushes against
//! a bound are treated as active equalities and the reduced KKT system
//!
//! ```text
//! [ P + δI   A_actᵀ ] [x]   [ −q    ]
//! [ A_act    −δI    ] [ν] = [ b_act ]
//! ```
//!
//! is solved once with LU, followed by iterative refinement against the
//! unregularized matrix (`δ = 0`). The caller decides whether to accept the
//! polished point by comparing residuals.
use nalgebra::DVector;
use ndarray::{Array1, Array2};

use crate::{linalg::to_dmatrix, qp::problem::QpProblem};

/// Regularization of the reduced KKT matrix.
pub const POLISH_DELTA: f64 = 1e-6;

/// Refinement stops once the KKT residual drops below this ∞-norm.
const REFINE_TOL: f64 = 1e-12;

/// A polished primal/dual pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Polished {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub z: Array1<f64>,
}

/// Polish `(x, z, y)` by solving the reduced KKT system on the guessed
/// active set. Returns `None` when the system cannot be factorized.
pub fn polish(
    problem: &QpProblem, z: &Array1<f64>, y: &Array1<f64>, refine_iter: usize,
) -> Option<Polished> {
    let n = problem.n();
    let (l, u, a) = (problem.l(), problem.u(), problem.a());

    // Active rows with the bound they are pinned to.
    let mut active: Vec<(usize, f64)> = Vec::new();
    for i in 0..problem.m() {
        if l[i] == u[i] {
            active.push((i, l[i]));
        } else if z[i] - l[i] < -y[i] {
            active.push((i, l[i]));
        } else if u[i] - z[i] < y[i] {
            active.push((i, u[i]));
        }
    }
    let nact = active.len();
    let dim = n + nact;

    let mut kkt = Array2::<f64>::zeros((dim, dim));
    kkt.slice_mut(ndarray::s![0..n, 0..n]).assign(problem.p());
    for (r, &(row, _)) in active.iter().enumerate() {
        for j in 0..n {
            kkt[[n + r, j]] = a[[row, j]];
            kkt[[j, n + r]] = a[[row, j]];
        }
    }
    let mut regularized = kkt.clone();
    for i in 0..dim {
        regularized[[i, i]] += if i < n { POLISH_DELTA } else { -POLISH_DELTA };
    }

    let mut rhs = DVector::<f64>::zeros(dim);
    for j in 0..n {
        rhs[j] = -problem.q()[j];
    }
    for (r, &(_, bound)) in active.iter().enumerate() {
        rhs[n + r] = bound;
    }

    let kkt = to_dmatrix(kkt.view());
    let lu = to_dmatrix(regularized.view()).lu();
    let mut sol = lu.solve(&rhs)?;
    for _ in 0..refine_iter {
        let residual = &rhs - &kkt * &sol;
        if residual.amax() < REFINE_TOL {
            break;
        }
        sol += lu.solve(&residual)?;
    }
    if sol.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let x = Array1::from_iter(sol.iter().take(n).copied());
    let mut y_full = Array1::<f64>::zeros(problem.m());
    for (r, &(row, _)) in active.iter().enumerate() {
        y_full[row] = sol[n + r];
    }
    let z = a.dot(&x);
    Some(Polished { x, y: y_full, z })
}
