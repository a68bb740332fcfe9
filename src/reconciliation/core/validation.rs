//! reconciliation::core::validation — shared input guards.
//!
//! Purpose
//! -------
//! Centralize the cheap precondition checks that run before any numerical
//! work: top-frequency parsing for loosely typed callers, finiteness of flat
//! inputs and matrices, and "length is a positive multiple of" checks.
//!
//! Conventions
//! -----------
//! - Every guard returns [`RecoResult<()>`] (or the parsed value) and never
//!   panics; failures carry the argument name and the offending index.
use ndarray::ArrayView2;

use crate::reconciliation::errors::{RecoError, RecoResult};

/// Largest accepted top frequency.
pub const MAX_FREQUENCY: usize = u32::MAX as usize;

/// Parse a top frequency supplied as a float (e.g. from Python).
///
/// # Errors
/// - [`RecoError::InvalidFrequency`] if `value` is not finite, not integral,
///   smaller than 1 or larger than [`MAX_FREQUENCY`].
pub fn validate_frequency(value: f64) -> RecoResult<usize> {
    if !value.is_finite() {
        return Err(RecoError::InvalidFrequency { value, reason: "Top frequency must be finite." });
    }
    if value.fract() != 0.0 {
        return Err(RecoError::InvalidFrequency {
            value,
            reason: "Top frequency must be an integer.",
        });
    }
    if value < 1.0 {
        return Err(RecoError::InvalidFrequency {
            value,
            reason: "Top frequency must be a positive integer.",
        });
    }
    if value > MAX_FREQUENCY as f64 {
        return Err(RecoError::InvalidFrequency {
            value,
            reason: "Top frequency exceeds the supported maximum.",
        });
    }
    Ok(value as usize)
}

/// Reject NaN/±∞ entries in a flat input.
pub fn validate_finite(name: &'static str, data: &[f64]) -> RecoResult<()> {
    match data.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(RecoError::NonFiniteInput { name, index, value: data[index] }),
        None => Ok(()),
    }
}

/// Reject NaN/±∞ entries in a matrix (index reported in row-major order).
pub fn validate_finite_matrix(name: &'static str, data: ArrayView2<'_, f64>) -> RecoResult<()> {
    match data.iter().position(|v| !v.is_finite()) {
        Some(index) => {
            let value = data.iter().nth(index).copied().unwrap_or(f64::NAN);
            Err(RecoError::NonFiniteInput { name, index, value })
        }
        None => Ok(()),
    }
}

/// Check that `length` is a positive multiple of `block` and return the
/// number of blocks.
pub fn validate_multiple(name: &'static str, length: usize, block: usize) -> RecoResult<usize> {
    if block == 0 || length == 0 || length % block != 0 {
        return Err(RecoError::ShapeMismatch { name, length, expected_multiple_of: block });
    }
    Ok(length / block)
}
