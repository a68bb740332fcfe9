//! Residual moments shared by the covariance estimators.
//!
//! All functions take the `N × kt` residual matrix in stacked column order
//! (one row per historical top cycle).
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::reconciliation::{
    core::{options::MeanCorrection, structure::TemporalStructure},
    errors::{RecoError, RecoResult},
};

/// Residual second-moment matrix under the requested convention.
///
/// - `Uncentered`: `EᵀE / N`.
/// - `Unbiased`: column-centered `EᵀE / (N − 1)`.
///
/// # Errors
/// - [`RecoError::InsufficientResiduals`] for `Unbiased` with `N < 2` or for
///   an empty residual matrix.
pub fn second_moment(
    residuals: ArrayView2<'_, f64>, correction: MeanCorrection,
) -> RecoResult<Array2<f64>> {
    let n = residuals.nrows();
    match correction {
        MeanCorrection::Uncentered => {
            if n == 0 {
                return Err(RecoError::InsufficientResiduals { needed: 1, found: 0 });
            }
            Ok(residuals.t().dot(&residuals) / n as f64)
        }
        MeanCorrection::Unbiased => {
            if n < 2 {
                return Err(RecoError::InsufficientResiduals { needed: 2, found: n });
            }
            let centered = center_columns(residuals);
            Ok(centered.t().dot(&centered) / (n - 1) as f64)
        }
    }
}

/// Subtract each column's mean.
pub fn center_columns(residuals: ArrayView2<'_, f64>) -> Array2<f64> {
    match residuals.mean_axis(Axis(0)) {
        Some(mean) => &residuals - &mean,
        None => residuals.to_owned(),
    }
}

/// Residuals of aggregation order `k` flattened in time order.
///
/// Row `t` of the order's column block holds the `m/k` consecutive periods
/// of cycle `t`, so walking rows then columns yields chronological order.
pub fn level_series(
    structure: &TemporalStructure, residuals: ArrayView2<'_, f64>, level: usize,
) -> Vec<f64> {
    let offsets = structure.level_offsets();
    let k = structure.kset()[level];
    let start = offsets[level];
    let n = structure.block_size(k);
    let mut out = Vec::with_capacity(residuals.nrows() * n);
    for row in residuals.rows() {
        out.extend(row.iter().skip(start).take(n));
    }
    out
}

/// Pooled variance per aggregation order, replicated over the order's
/// columns (length `kt`).
///
/// # Errors
/// - [`RecoError::InsufficientResiduals`] when a level has too few values
///   for the requested convention.
pub fn pooled_level_variances(
    structure: &TemporalStructure, residuals: ArrayView2<'_, f64>, correction: MeanCorrection,
) -> RecoResult<Array1<f64>> {
    let mut out = Array1::<f64>::zeros(structure.kt());
    let offsets = structure.level_offsets();
    for (level, &k) in structure.kset().iter().enumerate() {
        let values = level_series(structure, residuals, level);
        let variance = pooled_variance(&values, correction)?;
        let start = offsets[level];
        for j in 0..structure.block_size(k) {
            out[start + j] = variance;
        }
    }
    Ok(out)
}

fn pooled_variance(values: &[f64], correction: MeanCorrection) -> RecoResult<f64> {
    let count = values.len();
    match correction {
        MeanCorrection::Uncentered => {
            if count == 0 {
                return Err(RecoError::InsufficientResiduals { needed: 1, found: 0 });
            }
            Ok(values.iter().map(|v| v * v).sum::<f64>() / count as f64)
        }
        MeanCorrection::Unbiased => {
            if count < 2 {
                return Err(RecoError::InsufficientResiduals { needed: 2, found: count });
            }
            let mean = values.iter().sum::<f64>() / count as f64;
            Ok(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64)
        }
    }
}

/// Classical lag-1 sample autocorrelation.
///
/// Centered at the series mean, denominator = total sum of squares. Returns
/// 0 for fewer than 2 values or a constant series.
pub fn lag1_autocorrelation(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let denom: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if denom <= 0.0 || !denom.is_finite() {
        return 0.0;
    }
    let num: f64 = values.windows(2).map(|w| (w[0] - mean) * (w[1] - mean)).sum();
    num / denom
}
