//! linalg::bridge — `ndarray` ↔ `nalgebra` conversion and robust inversion.
//!
//! Purpose
//! -------
//! Keep all factorization-heavy work (SVD, Cholesky, LU) on `nalgebra`
//! while the rest of the crate stores data in `ndarray`. Conversions copy
//! column by column to match `DMatrix`'s column-major layout.
//!
//! Key behaviors
//! -------------
//! - [`to_dmatrix`] / [`from_dmatrix`] copy between the two representations.
//! - [`robust_inverse`] inverts a square matrix through its SVD and falls
//!   back to the Moore–Penrose pseudo-inverse when the reciprocal condition
//!   number drops below [`SINGULAR_RCOND`]. The caller learns which branch
//!   was taken through [`Inverse::pseudo`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite; callers validate data before it reaches this module.
//! - Zero-sized matrices are valid and invert to zero-sized matrices.
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2};

/// Reciprocal condition number below which a matrix is treated as singular.
pub const SINGULAR_RCOND: f64 = 1e-12;

/// Result of [`robust_inverse`].
#[derive(Debug, Clone, PartialEq)]
pub struct Inverse {
    /// Inverse (or pseudo-inverse) of the input.
    pub matrix: Array2<f64>,
    /// `true` when the input was numerically singular and the pseudo-inverse
    /// was returned.
    pub pseudo: bool,
}

/// Copy an `ndarray` view into a freshly allocated `DMatrix`.
pub fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    let mut out = DMatrix::<f64>::zeros(rows, cols);
    for j in 0..cols {
        for i in 0..rows {
            out[(i, j)] = a[[i, j]];
        }
    }
    out
}

/// Copy a `DMatrix` back into an `ndarray` matrix.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// robust_inverse — SVD-based inverse with pseudo-inverse fallback.
///
/// Parameters
/// ----------
/// - `a`: `ArrayView2<f64>`
///   Square matrix to invert. Typically a GLS bracket such as `RᵀΩ⁻¹R` or
///   `ZtΩZtᵀ`, or Omega itself.
///
/// Returns
/// -------
/// [`Inverse`]
///   - `pseudo = false`: `matrix` is the ordinary inverse.
///   - `pseudo = true`: `matrix` is the Moore–Penrose pseudo-inverse with
///     singular values below `SINGULAR_RCOND · σ_max` truncated.
///
/// Panics
/// ------
/// - Never panics for finite square input. A non-square input is a
///   programming error and is handled by inverting its square part through
///   the SVD pseudo-inverse (which is defined for any shape).
///
/// Notes
/// -----
/// - A zero matrix has pseudo-inverse zero and is reported as `pseudo`.
pub fn robust_inverse(a: ArrayView2<'_, f64>) -> Inverse {
    let (rows, cols) = a.dim();
    if rows == 0 || cols == 0 {
        return Inverse { matrix: Array2::zeros((cols, rows)), pseudo: false };
    }
    let svd = to_dmatrix(a).svd(true, true);
    let sigma_max = svd.singular_values.max();
    let sigma_min = svd.singular_values.min();
    let singular = rows != cols || !(sigma_max > 0.0) || sigma_min / sigma_max < SINGULAR_RCOND;
    let eps = if singular { sigma_max.max(0.0) * SINGULAR_RCOND } else { 0.0 };
    let inv = svd.pseudo_inverse(eps).unwrap_or_else(|_| DMatrix::zeros(cols, rows));
    Inverse { matrix: from_dmatrix(&inv), pseudo: singular }
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
    // - Lossless copies between `ndarray` and `nalgebra`.
    // - Ordinary inverse on a well-conditioned matrix.
    // - Pseudo-inverse fallback on a rank-deficient matrix.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Copying to `DMatrix` and back preserves every entry.
    //
    // Given
    // -----
    // - A non-symmetric 2×3 matrix.
    //
    // Expect
    // ------
    // - `from_dmatrix(to_dmatrix(a)) == a`.
    fn dmatrix_round_trip_preserves_entries() {
        // Arrange
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];

        // Act
        let back = from_dmatrix(&to_dmatrix(a.view()));

        // Assert
        assert_eq!(back, a);
    }

    #[test]
    // Purpose
    // -------
    // A well-conditioned matrix is inverted exactly (not flagged pseudo).
    //
    // Given
    // -----
    // - A 2×2 SPD matrix.
    //
    // Expect
    // ------
    // - `A · A⁻¹ ≈ I` and `pseudo == false`.
    fn robust_inverse_inverts_well_conditioned_matrix() {
        // Arrange
        let a = array![[4.0, 1.0], [1.0, 3.0]];

        // Act
        let inv = robust_inverse(a.view());
        let prod = a.dot(&inv.matrix);

        // Assert
        assert!(!inv.pseudo);
        assert_relative_eq!(prod[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(prod[[0, 1]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(prod[[1, 0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(prod[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A rank-one matrix falls back to the pseudo-inverse.
    //
    // Given
    // -----
    // - `A = [[1, 1], [1, 1]]` whose pseudo-inverse is `A / 4`.
    //
    // Expect
    // ------
    // - `pseudo == true` and every entry equals 0.25.
    fn robust_inverse_falls_back_to_pseudo_inverse() {
        // Arrange
        let a = array![[1.0, 1.0], [1.0, 1.0]];

        // Act
        let inv = robust_inverse(a.view());

        // Assert
        assert!(inv.pseudo);
        for v in inv.matrix.iter() {
            assert_relative_eq!(*v, 0.25, epsilon = 1e-12);
        }
    }
}
