//! reconciliation::covariance::shrink — covariance shrinkage capability.
//!
//! Purpose
//! -------
//! Define the [`Shrinker`] seam used by the `shr` covariance method and ship
//! two data-driven estimators behind it:
//!
//! - [`DiagonalTargetShrink`]: shrinks the residual second moment toward its
//!   own diagonal, `Ŵ = λ·diag(Ŝ) + (1 − λ)·Ŝ`, with the Schäfer–Strimmer
//!   intensity computed from the standardized residuals.
//! - [`CorrelationShrink`]: shrinks correlations toward zero and variances
//!   toward their median, each with its own intensity, then recombines.
//!
//! Invariants & assumptions
//! ------------------------
//! - Reported intensities are clamped to `[0, 1]`.
//! - Zero-variance columns are standardized to zero instead of dividing by
//!   zero; they contribute nothing to the intensity estimate.
//! - At least two residual periods are required.
//!
//! Testing notes
//! -------------
//! - Unit tests pin the intensity range, the diagonal-preservation property
//!   of the diagonal-target estimator and the fully-shrunk case.
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::reconciliation::{
    core::options::MeanCorrection,
    covariance::moments::{center_columns, second_moment},
    errors::{RecoError, RecoResult},
};

/// Result of a shrinkage estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct ShrinkOutcome {
    /// Shrunk `kt × kt` covariance.
    pub covariance: Array2<f64>,
    /// Intensity applied to the off-diagonal structure, in `[0, 1]`.
    pub lambda: f64,
}

/// Covariance shrinkage capability.
///
/// Implementations receive the `N × kt` residual matrix (stacked order) and
/// the moment convention, and return the shrunk matrix with its intensity.
pub trait Shrinker {
    fn shrink(
        &self, residuals: ArrayView2<'_, f64>, correction: MeanCorrection,
    ) -> RecoResult<ShrinkOutcome>;
}

/// Shrinkage toward the diagonal of the residual second moment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiagonalTargetShrink;

impl Shrinker for DiagonalTargetShrink {
    fn shrink(
        &self, residuals: ArrayView2<'_, f64>, correction: MeanCorrection,
    ) -> RecoResult<ShrinkOutcome> {
        let n = require_periods(residuals)?;
        let cov = second_moment(residuals, correction)?;
        let sd = cov.diag().mapv(|v| v.max(0.0).sqrt());
        let corr = correlation_from(&cov, &sd);
        let xs = standardize(residuals.to_owned(), &sd);

        let nf = n as f64;
        let xs2 = xs.mapv(|v| v * v);
        let cross = xs.t().dot(&xs);
        let cross_sq = xs2.t().dot(&xs2);
        let p = cov.nrows();
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..p {
            for j in 0..p {
                if i == j {
                    continue;
                }
                num += (cross_sq[[i, j]] - cross[[i, j]].powi(2) / nf) / (nf * (nf - 1.0));
                den += corr[[i, j]].powi(2);
            }
        }
        let lambda = intensity(num, den);

        let mut covariance = cov.mapv(|v| (1.0 - lambda) * v);
        for i in 0..p {
            covariance[[i, i]] = cov[[i, i]];
        }
        Ok(ShrinkOutcome { covariance, lambda })
    }
}

/// Correlation shrinkage toward zero with variance shrinkage toward the
/// median variance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorrelationShrink;

impl Shrinker for CorrelationShrink {
    fn shrink(
        &self, residuals: ArrayView2<'_, f64>, correction: MeanCorrection,
    ) -> RecoResult<ShrinkOutcome> {
        let n = require_periods(residuals)?;
        let nf = n as f64;
        let scale = nf / (nf - 1.0).powi(3);
        let base = match correction {
            MeanCorrection::Uncentered => residuals.to_owned(),
            MeanCorrection::Unbiased => center_columns(residuals),
        };
        let cov = second_moment(residuals, correction)?;
        let variances = cov.diag().to_owned();
        let sd = variances.mapv(|v| v.max(0.0).sqrt());
        let corr = correlation_from(&cov, &sd);
        let xs = standardize(base.clone(), &sd);
        let p = cov.nrows();

        // Correlation intensity.
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..p {
            for j in 0..p {
                if i == j {
                    continue;
                }
                let w = xs.column(i).to_owned() * &xs.column(j);
                num += scale * sum_sq_dev(&w);
                den += corr[[i, j]].powi(2);
            }
        }
        let lambda = intensity(num, den);

        // Variance intensity.
        let target = median(&variances);
        let mut v_num = 0.0;
        let mut v_den = 0.0;
        for i in 0..p {
            let w = base.column(i).mapv(|v| v * v);
            v_num += scale * sum_sq_dev(&w);
            v_den += (variances[i] - target).powi(2);
        }
        let lambda_var = intensity(v_num, v_den);

        let shrunk_var = variances.mapv(|v| lambda_var * target + (1.0 - lambda_var) * v);
        let shrunk_sd = shrunk_var.mapv(|v| v.max(0.0).sqrt());
        let covariance = Array2::from_shape_fn((p, p), |(i, j)| {
            let r = if i == j { 1.0 } else { (1.0 - lambda) * corr[[i, j]] };
            shrunk_sd[i] * r * shrunk_sd[j]
        });
        Ok(ShrinkOutcome { covariance, lambda })
    }
}

// ---- Helper Methods ----

fn require_periods(residuals: ArrayView2<'_, f64>) -> RecoResult<usize> {
    let n = residuals.nrows();
    if n < 2 {
        return Err(RecoError::InsufficientResiduals { needed: 2, found: n });
    }
    Ok(n)
}

/// `λ = num / den` clamped to `[0, 1]`; `1` when the target already matches.
fn intensity(num: f64, den: f64) -> f64 {
    if den <= 0.0 || !den.is_finite() {
        return 1.0;
    }
    (num / den).clamp(0.0, 1.0)
}

fn correlation_from(cov: &Array2<f64>, sd: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn(cov.dim(), |(i, j)| {
        if i == j {
            1.0
        } else if sd[i] > 0.0 && sd[j] > 0.0 {
            cov[[i, j]] / (sd[i] * sd[j])
        } else {
            0.0
        }
    })
}

fn standardize(mut data: Array2<f64>, sd: &Array1<f64>) -> Array2<f64> {
    for (mut col, &s) in data.axis_iter_mut(Axis(1)).zip(sd.iter()) {
        if s > 0.0 {
            col.mapv_inplace(|v| v / s);
        } else {
            col.fill(0.0);
        }
    }
    data
}

fn sum_sq_dev(values: &Array1<f64>) -> f64 {
    let mean = values.mean().unwrap_or(0.0);
    values.iter().map(|v| (v - mean).powi(2)).sum()
}

fn median(values: &Array1<f64>) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 { sorted[n / 2] } else { 0.5 * (sorted[n / 2 - 1] + sorted[n / 2]) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Intensity range and diagonal preservation for `DiagonalTargetShrink`.
    // - Full shrinkage when correlations are already zero.
    // - `CorrelationShrink` output symmetry and intensity range.
    // - Rejection of single-period histories.
    // -------------------------------------------------------------------------

    fn residuals() -> Array2<f64> {
        array![
            [0.5, 0.2, -0.1],
            [-0.3, 0.1, 0.4],
            [0.8, 0.6, -0.2],
            [-0.6, -0.4, 0.3],
            [0.1, 0.3, 0.0],
            [0.2, -0.1, -0.5],
        ]
    }

    #[test]
    // Purpose
    // -------
    // Diagonal-target shrinkage keeps the variances and damps covariances.
    //
    // Given
    // -----
    // - Six periods of three correlated residual series.
    //
    // Expect
    // ------
    // - λ ∈ [0, 1]; diagonal equals `EᵀE/N`; off-diagonals equal
    //   `(1 − λ)·Ŝ_ij`.
    fn diagonal_target_keeps_variances() {
        // Arrange
        let e = residuals();
        let sample = second_moment(e.view(), MeanCorrection::Uncentered).unwrap();

        // Act
        let out = DiagonalTargetShrink.shrink(e.view(), MeanCorrection::Uncentered).unwrap();

        // Assert
        assert!((0.0..=1.0).contains(&out.lambda));
        for i in 0..3 {
            assert_relative_eq!(out.covariance[[i, i]], sample[[i, i]], epsilon = 1e-12);
            for j in 0..3 {
                if i != j {
                    assert_relative_eq!(
                        out.covariance[[i, j]],
                        (1.0 - out.lambda) * sample[[i, j]],
                        epsilon = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Orthogonal columns give a zero denominator and full shrinkage.
    //
    // Given
    // -----
    // - Two columns with `Σ e1·e2 = 0`.
    //
    // Expect
    // ------
    // - λ = 1 and a diagonal result.
    fn uncorrelated_columns_shrink_fully() {
        // Arrange
        let e = array![[1.0, 1.0], [1.0, -1.0], [-1.0, 1.0], [-1.0, -1.0]];

        // Act
        let out = DiagonalTargetShrink.shrink(e.view(), MeanCorrection::Uncentered).unwrap();

        // Assert
        assert_relative_eq!(out.lambda, 1.0);
        assert_relative_eq!(out.covariance[[0, 1]], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // The correlation-shrink estimator is symmetric with a valid intensity.
    //
    // Given
    // -----
    // - The six-period fixture under the unbiased convention.
    //
    // Expect
    // ------
    // - λ ∈ [0, 1], symmetric output, positive diagonal.
    fn correlation_shrink_is_symmetric() {
        // Arrange
        let e = residuals();

        // Act
        let out = CorrelationShrink.shrink(e.view(), MeanCorrection::Unbiased).unwrap();

        // Assert
        assert!((0.0..=1.0).contains(&out.lambda));
        for i in 0..3 {
            assert!(out.covariance[[i, i]] > 0.0);
            for j in 0..3 {
                assert_relative_eq!(out.covariance[[i, j]], out.covariance[[j, i]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Shrinkage needs at least two periods.
    //
    // Given
    // -----
    // - A one-row residual matrix.
    //
    // Expect
    // ------
    // - `InsufficientResiduals { needed: 2, found: 1 }` from both estimators.
    fn single_period_is_rejected() {
        let e = array![[0.1, 0.2]];
        for shrinker in [&DiagonalTargetShrink as &dyn Shrinker, &CorrelationShrink] {
            let err = shrinker.shrink(e.view(), MeanCorrection::Uncentered).unwrap_err();
            assert_eq!(err, RecoError::InsufficientResiduals { needed: 2, found: 1 });
        }
    }
}
