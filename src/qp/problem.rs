//! QP problem data in operator-splitting form.
//!
//! ```text
//! minimize    ½ xᵀ P x + qᵀ x
//! subject to  l ≤ A x ≤ u
//! ```
//!
//! Equality rows have `l_i = u_i`; one-sided rows use `±∞` bounds.
use argmin::core::{CostFunction, Error};
use ndarray::{Array1, Array2};

use crate::qp::errors::{QpError, QpResult};

/// Validated QP data.
///
/// Invariants (checked in [`QpProblem::new`]):
/// - `P` is `n × n`, `q` has length `n`, `A` is `mc × n`, `l` and `u` have
///   length `mc`.
/// - `P`, `q`, `A` are finite; bounds are not NaN and `l_i ≤ u_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    p: Array2<f64>,
    q: Array1<f64>,
    a: Array2<f64>,
    l: Array1<f64>,
    u: Array1<f64>,
}

impl QpProblem {
    /// Build and validate a QP.
    ///
    /// # Errors
    /// - [`QpError::DimensionMismatch`] for inconsistent shapes.
    /// - [`QpError::NonFiniteData`] for NaN/∞ in `P`, `q`, `A` or NaN bounds.
    /// - [`QpError::InvalidBounds`] when `l_i > u_i`.
    pub fn new(
        p: Array2<f64>, q: Array1<f64>, a: Array2<f64>, l: Array1<f64>, u: Array1<f64>,
    ) -> QpResult<Self> {
        let n = q.len();
        if p.nrows() != n {
            return Err(QpError::DimensionMismatch { name: "P rows", expected: n, found: p.nrows() });
        }
        if p.ncols() != n {
            return Err(QpError::DimensionMismatch { name: "P cols", expected: n, found: p.ncols() });
        }
        if a.ncols() != n {
            return Err(QpError::DimensionMismatch { name: "A cols", expected: n, found: a.ncols() });
        }
        let mc = a.nrows();
        if l.len() != mc {
            return Err(QpError::DimensionMismatch { name: "l", expected: mc, found: l.len() });
        }
        if u.len() != mc {
            return Err(QpError::DimensionMismatch { name: "u", expected: mc, found: u.len() });
        }
        check_finite("P", p.iter())?;
        check_finite("q", q.iter())?;
        check_finite("A", a.iter())?;
        for (row, (&lower, &upper)) in l.iter().zip(u.iter()).enumerate() {
            if lower.is_nan() {
                return Err(QpError::NonFiniteData { name: "l", index: row, value: lower });
            }
            if upper.is_nan() {
                return Err(QpError::NonFiniteData { name: "u", index: row, value: upper });
            }
            if lower > upper {
                return Err(QpError::InvalidBounds { row, lower, upper });
            }
        }
        Ok(Self { p, q, a, l, u })
    }

    /// Number of variables.
    pub fn n(&self) -> usize {
        self.q.len()
    }

    /// Number of constraint rows.
    pub fn m(&self) -> usize {
        self.a.nrows()
    }

    pub fn p(&self) -> &Array2<f64> {
        &self.p
    }

    pub fn q(&self) -> &Array1<f64> {
        &self.q
    }

    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    pub fn l(&self) -> &Array1<f64> {
        &self.l
    }

    pub fn u(&self) -> &Array1<f64> {
        &self.u
    }

    /// `½ xᵀ P x + qᵀ x`.
    pub fn objective(&self, x: &Array1<f64>) -> f64 {
        0.5 * x.dot(&self.p.dot(x)) + self.q.dot(x)
    }

    /// `max_i dist(A_i x, [l_i, u_i])`.
    pub fn constraint_violation(&self, x: &Array1<f64>) -> f64 {
        let ax = self.a.dot(x);
        ax.iter()
            .zip(self.l.iter().zip(self.u.iter()))
            .map(|(&v, (&lo, &hi))| (lo - v).max(v - hi).max(0.0))
            .fold(0.0, f64::max)
    }
}

impl CostFunction for QpProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        if param.len() != self.n() {
            return Err(QpError::DimensionMismatch { name: "x", expected: self.n(), found: param.len() }
                .into());
        }
        Ok(self.objective(&Array1::from(param.clone())))
    }
}

fn check_finite<'a>(name: &'static str, values: impl Iterator<Item = &'a f64>) -> QpResult<()> {
    for (index, &value) in values.enumerate() {
        if !value.is_finite() {
            return Err(QpError::NonFiniteData { name, index, value });
        }
    }
    Ok(())
}
