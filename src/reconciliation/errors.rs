//! reconciliation::errors — error and warning types for temporal reconciliation.
//!
//! Purpose
//! -------
//! Provide the canonical error enum and result alias for the temporal
//! reconciliation subtree (structure building, covariance estimation, closed
//! form and QP solves), together with a non-fatal warning type that is
//! carried inside the reconciliation outcome instead of aborting the call.
//!
//! Key behaviors
//! -------------
//! - [`RecoError`] covers every fatal precondition violation: invalid
//!   frequency or aggregation orders, shape mismatches, missing residuals or
//!   Omega, non-finite inputs, and QP backend failures.
//! - [`RecoWarning`] covers advisory conditions (`SingularityRisk`,
//!   pseudo-inverse fallbacks, per-horizon QP non-convergence). These never
//!   abort a call; they are surfaced in [`ThfOutcome`](crate::reconciliation::outcome::ThfOutcome).
//! - `From<QpError>` lets QP failures propagate with `?`.
//! - `From<RecoError> for PyErr` maps errors to `ValueError` at the Python
//!   boundary when `python-bindings` is enabled.
//!
//! Conventions
//! -----------
//! - Messages name the violated precondition and the offending argument.
//! - Structural and shape errors are raised before any numerical work is
//!   performed, so a returned error never comes with a partial result.

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

use crate::qp::errors::QpError;

/// Result alias for temporal reconciliation routines.
pub type RecoResult<T> = Result<T, RecoError>;

/// RecoError — fatal error conditions for temporal reconciliation.
///
/// Variants
/// --------
/// - `InvalidFrequency`
///   Top frequency is not a positive integer.
/// - `InvalidAggregationOrder`
///   A user-supplied aggregation order does not divide `m`, or the order set
///   misses `m` or `1`.
/// - `ShapeMismatch`
///   A flat input vector length is not a positive multiple of the expected
///   stacked or bottom dimension.
/// - `ResidualShapeMismatch`
///   Residual matrix column count differs from the stacked dimension.
/// - `OmegaShapeMismatch`
///   A user-supplied weighting matrix is not `kt × kt`.
/// - `EmptyForecasts`
///   No base forecasts were supplied.
/// - `NonFiniteInput`
///   An input entry is NaN or ±∞.
/// - `MissingResiduals`
///   The selected covariance method needs residuals but none were given.
/// - `MissingOmega`
///   User-supplied mode selected without a matrix.
/// - `InsufficientResiduals`
///   Too few residual periods for the requested moment estimator.
/// - `InvalidOption`
///   A string selector (combination method, solver form, ...) is unknown.
/// - `Qp`
///   Propagated failure from the QP layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoError {
    // ---- Structure ----
    InvalidFrequency {
        value: f64,
        reason: &'static str,
    },
    InvalidAggregationOrder {
        order: usize,
        m: usize,
        reason: &'static str,
    },

    // ---- Shapes ----
    ShapeMismatch {
        name: &'static str,
        length: usize,
        expected_multiple_of: usize,
    },
    ResidualShapeMismatch {
        expected_cols: usize,
        found_cols: usize,
    },
    OmegaShapeMismatch {
        expected: usize,
        found: (usize, usize),
    },
    EmptyForecasts,

    // ---- Data ----
    NonFiniteInput {
        name: &'static str,
        index: usize,
        value: f64,
    },

    // ---- Covariance ----
    MissingResiduals {
        method: &'static str,
    },
    MissingOmega,
    InsufficientResiduals {
        needed: usize,
        found: usize,
    },

    // ---- Options ----
    InvalidOption {
        name: String,
        reason: &'static str,
    },

    // ---- QP ----
    Qp(QpError),
}

impl std::error::Error for RecoError {}

impl std::fmt::Display for RecoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Structure ----
            RecoError::InvalidFrequency { value, reason } => {
                write!(f, "Invalid top frequency m = {value}: {reason}")
            }
            RecoError::InvalidAggregationOrder { order, m, reason } => {
                write!(f, "Invalid aggregation order {order} for m = {m}: {reason}")
            }

            // ---- Shapes ----
            RecoError::ShapeMismatch { name, length, expected_multiple_of } => write!(
                f,
                "Shape mismatch for '{name}': length {length} is not a positive multiple of {expected_multiple_of}"
            ),
            RecoError::ResidualShapeMismatch { expected_cols, found_cols } => write!(
                f,
                "Residual matrix has {found_cols} columns, expected {expected_cols} (stacked dimension)"
            ),
            RecoError::OmegaShapeMismatch { expected, found } => write!(
                f,
                "Omega shape mismatch: expected ({expected}, {expected}), found {found:?}"
            ),
            RecoError::EmptyForecasts => write!(f, "No base forecasts supplied"),

            // ---- Data ----
            RecoError::NonFiniteInput { name, index, value } => {
                write!(f, "Non-finite value in '{name}' at index {index}: {value}")
            }

            // ---- Covariance ----
            RecoError::MissingResiduals { method } => {
                write!(f, "Covariance method '{method}' requires residuals, none were supplied")
            }
            RecoError::MissingOmega => {
                write!(f, "Covariance method 'omega' selected but no Omega matrix was supplied")
            }
            RecoError::InsufficientResiduals { needed, found } => write!(
                f,
                "Insufficient residual history: need at least {needed} periods, found {found}"
            ),

            // ---- Options ----
            RecoError::InvalidOption { name, reason } => {
                write!(f, "Invalid option '{name}': {reason}")
            }

            // ---- QP ----
            RecoError::Qp(err) => write!(f, "QP failure: {err}"),
        }
    }
}

impl From<QpError> for RecoError {
    fn from(err: QpError) -> Self {
        RecoError::Qp(err)
    }
}

#[cfg(feature = "python-bindings")]
impl From<RecoError> for PyErr {
    fn from(err: RecoError) -> PyErr {
        PyValueError::new_err(format!("RecoError: {err}"))
    }
}

/// RecoWarning — advisory conditions surfaced in the reconciliation outcome.
///
/// Variants
/// --------
/// - `SingularityRisk`
///   Residual history is shorter than the dimension the estimator needs for
///   a full-rank covariance (`kt` for sample covariance, `m` for blockwise
///   autocovariance).
/// - `PseudoInverse`
///   A matrix that should have been inverted was numerically singular and
///   the Moore–Penrose pseudo-inverse was used instead.
/// - `QpNonConvergence`
///   The QP for one horizon stopped without meeting its tolerances; the
///   best-effort iterate was kept.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoWarning {
    SingularityRisk {
        method: &'static str,
        periods: usize,
        required: usize,
    },
    PseudoInverse {
        stage: &'static str,
    },
    QpNonConvergence {
        horizon: usize,
        status: String,
    },
}

impl std::fmt::Display for RecoWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoWarning::SingularityRisk { method, periods, required } => write!(
                f,
                "Singularity risk for '{method}': {periods} residual periods < {required}"
            ),
            RecoWarning::PseudoInverse { stage } => {
                write!(f, "Numerically singular matrix in {stage}; pseudo-inverse used")
            }
            RecoWarning::QpNonConvergence { horizon, status } => {
                write!(f, "QP did not converge for horizon {horizon}: {status}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - `Display` payload embedding for the main `RecoError` variants.
    // - `From<QpError>` conversion.
    //
    // They intentionally DO NOT cover:
    // - The `From<RecoError> for PyErr` conversion (needs the Python C API).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that `InvalidFrequency` names the offending value.
    //
    // Given
    // -----
    // - `RecoError::InvalidFrequency` with value 0.
    //
    // Expect
    // ------
    // - Message contains "m = 0".
    fn invalid_frequency_includes_value_in_display() {
        // Arrange
        let err = RecoError::InvalidFrequency { value: 0.0, reason: "must be >= 1" };

        // Act
        let msg = err.to_string();

        // Assert
        assert!(msg.contains("m = 0"), "unexpected message: {msg}");
    }

    #[test]
    // Purpose
    // -------
    // Verify that `ShapeMismatch` reports both the length and the expected
    // multiple.
    //
    // Given
    // -----
    // - A mismatch of length 10 against multiple 7.
    //
    // Expect
    // ------
    // - Message contains "10" and "7" and the argument name.
    fn shape_mismatch_includes_payload_in_display() {
        // Arrange
        let err =
            RecoError::ShapeMismatch { name: "base_forecasts", length: 10, expected_multiple_of: 7 };

        // Act
        let msg = err.to_string();

        // Assert
        assert!(msg.contains("10") && msg.contains('7') && msg.contains("base_forecasts"));
    }

    #[test]
    // Purpose
    // -------
    // Ensure QP errors convert into `RecoError::Qp` without losing payload.
    //
    // Given
    // -----
    // - A `QpError::DimensionMismatch`.
    //
    // Expect
    // ------
    // - Conversion yields `RecoError::Qp` wrapping the same error.
    fn qp_error_converts_into_reco_error() {
        // Arrange
        let qp_err = QpError::DimensionMismatch { name: "q", expected: 3, found: 2 };

        // Act
        let err: RecoError = qp_err.clone().into();

        // Assert
        assert_eq!(err, RecoError::Qp(qp_err));
    }
}
