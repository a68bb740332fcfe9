use argmin::core::{ArgminError, Error};

/// Result alias for QP operations.
pub type QpResult<T> = Result<T, QpError>;

#[derive(Debug, Clone, PartialEq)]
pub enum QpError {
    // ---- QpSettings ----
    /// A solver setting is out of its admissible range.
    InvalidSetting {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    // ---- Problem data ----
    /// A vector or matrix does not match the problem dimension.
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    /// Lower bound exceeds upper bound for a constraint row.
    InvalidBounds {
        row: usize,
        lower: f64,
        upper: f64,
    },
    /// Problem data must be finite (bounds may be ±∞).
    NonFiniteData {
        name: &'static str,
        index: usize,
        value: f64,
    },
    /// The regularized KKT matrix could not be factorized.
    NonConvexObjective,

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Solver outcome ----
    /// The solver finished without producing an iterate.
    MissingSolution,

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for QpError {}

impl std::fmt::Display for QpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- QpSettings ----
            QpError::InvalidSetting { name, value, reason } => {
                write!(f, "Invalid QP setting '{name}' = {value}: {reason}")
            }

            // ---- Problem data ----
            QpError::DimensionMismatch { name, expected, found } => {
                write!(f, "QP dimension mismatch for '{name}': expected {expected}, found {found}")
            }
            QpError::InvalidBounds { row, lower, upper } => {
                write!(f, "Invalid bounds at row {row}: lower {lower} > upper {upper}")
            }
            QpError::NonFiniteData { name, index, value } => {
                write!(f, "Non-finite QP data in '{name}' at index {index}: {value}")
            }
            QpError::NonConvexObjective => {
                write!(f, "KKT matrix is not positive definite; objective may be non-convex")
            }

            // ---- Argmin ----
            QpError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            QpError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            QpError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            QpError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            QpError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            QpError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Solver outcome ----
            QpError::MissingSolution => {
                write!(f, "QP solver returned no solution iterate")
            }

            // ---- Fallback ----
            QpError::UnknownError => {
                write!(f, "Unknown QP error")
            }
        }
    }
}

impl From<Error> for QpError {
    fn from(original_err: Error) -> Self {
        // Solver-side errors are raised as `QpError` and boxed by argmin;
        // unwrap those first so callers see the original variant.
        let original_err = match original_err.downcast::<QpError>() {
            Ok(qp_err) => return qp_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => QpError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => QpError::NotImplemented { text },
                ArgminError::NotInitialized { text } => QpError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => QpError::ConditionViolated { text },
                ArgminError::PotentialBug { text } => QpError::PotentialBug { text },
                _ => QpError::UnknownError,
            },
            Err(err) => QpError::BackendError { text: err.to_string() },
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
    // - Round-tripping a `QpError` through `argmin::core::Error`.
    // - Mapping of `ArgminError` variants and foreign errors.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A `QpError` boxed into an argmin error must come back unchanged.
    //
    // Given
    // -----
    // - `QpError::NonConvexObjective` converted into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - `QpError::from` yields `NonConvexObjective`.
    fn qp_error_survives_argmin_round_trip() {
        // Arrange
        let boxed: Error = QpError::NonConvexObjective.into();

        // Act
        let back = QpError::from(boxed);

        // Assert
        assert_eq!(back, QpError::NonConvexObjective);
    }

    #[test]
    // Purpose
    // -------
    // Argmin's own error variants map to the matching wrapper.
    //
    // Given
    // -----
    // - `ArgminError::InvalidParameter` with a message.
    //
    // Expect
    // ------
    // - `QpError::InvalidParameter` with the same text.
    fn argmin_invalid_parameter_maps_to_wrapper() {
        // Arrange
        let boxed: Error = ArgminError::InvalidParameter { text: "rho".to_string() }.into();

        // Act
        let mapped = QpError::from(boxed);

        // Assert
        assert_eq!(mapped, QpError::InvalidParameter { text: "rho".to_string() });
    }
}
