//! reconciliation::core::layout — flat level-major vectors ↔ horizon matrices.
//!
//! Purpose
//! -------
//! Translate between the two orderings used by temporal reconciliation:
//!
//! - **Level-major flat vector** (the external convention for base
//!   forecasts, residuals and reconciled output): all values of `k = m`
//!   first, then `k = m/2`, … down to `k = 1`; within a level, values run
//!   forward in time across all `h` cycles.
//! - **Horizon matrix** (the internal convention): `h × kt`, one row per top
//!   cycle holding that cycle's stacked vector `[k=m | … | k=1]`.
//!
//! Key behaviors
//! -------------
//! - [`to_horizon_matrix`] / [`from_horizon_matrix`] are exact inverses.
//! - [`bottom_to_matrix`] reshapes a base-level-only vector (`h·m` values in
//!   time order) into an `h × m` matrix for bottom-up reconciliation.
//! - [`labels`] produces `"k{k} h{j}"` labels aligned with the flat layout.
use ndarray::{Array1, Array2, ArrayView2};

use crate::reconciliation::{
    core::{structure::TemporalStructure, validation::validate_multiple},
    errors::RecoResult,
};

/// Reshape a level-major flat vector into an `h × kt` horizon matrix.
///
/// # Errors
/// - [`RecoError::ShapeMismatch`](crate::reconciliation::errors::RecoError::ShapeMismatch)
///   if `data.len()` is not a positive multiple of `kt`.
pub fn to_horizon_matrix(
    structure: &TemporalStructure, data: &[f64], name: &'static str,
) -> RecoResult<Array2<f64>> {
    let kt = structure.kt();
    let h = validate_multiple(name, data.len(), kt)?;
    let mut out = Array2::<f64>::zeros((h, kt));
    for (&k, &offset) in structure.kset().iter().zip(structure.level_offsets().iter()) {
        let n = structure.block_size(k);
        let start = h * offset;
        for t in 0..h {
            for j in 0..n {
                out[[t, offset + j]] = data[start + t * n + j];
            }
        }
    }
    Ok(out)
}

/// Flatten an `h × kt` horizon matrix back into the level-major layout.
pub fn from_horizon_matrix(structure: &TemporalStructure, mat: ArrayView2<'_, f64>) -> Array1<f64> {
    let h = mat.nrows();
    let mut out = Vec::with_capacity(h * structure.kt());
    for (&k, &offset) in structure.kset().iter().zip(structure.level_offsets().iter()) {
        let n = structure.block_size(k);
        for t in 0..h {
            for j in 0..n {
                out.push(mat[[t, offset + j]]);
            }
        }
    }
    Array1::from(out)
}

/// Reshape `h·m` base-level values (time order) into an `h × m` matrix.
///
/// # Errors
/// - `ShapeMismatch` if `data.len()` is not a positive multiple of `m`.
pub fn bottom_to_matrix(
    structure: &TemporalStructure, data: &[f64], name: &'static str,
) -> RecoResult<Array2<f64>> {
    let m = structure.m();
    let h = validate_multiple(name, data.len(), m)?;
    Ok(Array2::from_shape_fn((h, m), |(t, j)| data[t * m + j]))
}

/// Labels `"k{k} h{j}"` (1-based `j`) for a level-major vector over `h` cycles.
pub fn labels(structure: &TemporalStructure, h: usize) -> Vec<String> {
    structure
        .kset()
        .iter()
        .flat_map(|&k| (1..=h * structure.block_size(k)).map(move |j| format!("k{k} h{j}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::errors::RecoError;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Placement of level-major entries into horizon rows.
    // - Exact inversion of the reshape.
    // - Label generation and bottom-only reshapes.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Level-major input lands in the right cycle/column.
    //
    // Given
    // -----
    // - m = 4 (kt = 7), h = 2, values 0..14 in level-major order:
    //   annual [0,1], semi-annual [2,3,4,5], quarterly [6..14).
    //
    // Expect
    // ------
    // - Row 0: [0, 2, 3, 6, 7, 8, 9]; row 1: [1, 4, 5, 10, 11, 12, 13].
    fn to_horizon_matrix_places_levels_per_cycle() {
        // Arrange
        let st = TemporalStructure::new(4).unwrap();
        let data: Vec<f64> = (0..14).map(|v| v as f64).collect();

        // Act
        let mat = to_horizon_matrix(&st, &data, "base_forecasts").unwrap();

        // Assert
        assert_eq!(mat.row(0).to_vec(), vec![0.0, 2.0, 3.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(mat.row(1).to_vec(), vec![1.0, 4.0, 5.0, 10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    // Purpose
    // -------
    // Flattening inverts the reshape exactly.
    //
    // Given
    // -----
    // - m = 12, h = 3, arbitrary values.
    //
    // Expect
    // ------
    // - `from_horizon_matrix(to_horizon_matrix(x)) == x`.
    fn horizon_matrix_round_trips() {
        // Arrange
        let st = TemporalStructure::new(12).unwrap();
        let data: Vec<f64> = (0..84).map(|v| (v as f64) * 0.5 - 3.0).collect();

        // Act
        let mat = to_horizon_matrix(&st, &data, "x").unwrap();
        let back = from_horizon_matrix(&st, mat.view());

        // Assert
        assert_eq!(back.to_vec(), data);
    }

    #[test]
    // Purpose
    // -------
    // Labels follow the flat layout and bad lengths are rejected.
    //
    // Given
    // -----
    // - m = 2, h = 2 (kt = 3); a length-5 vector.
    //
    // Expect
    // ------
    // - Labels ["k2 h1","k2 h2","k1 h1",…,"k1 h4"]; length 5 → ShapeMismatch.
    fn labels_follow_layout_and_lengths_are_checked() {
        // Arrange
        let st = TemporalStructure::new(2).unwrap();

        // Act
        let lab = labels(&st, 2);
        let bad = to_horizon_matrix(&st, &[0.0; 5], "x");
        let bottom = bottom_to_matrix(&st, &[1.0, 2.0, 3.0, 4.0], "x").unwrap();

        // Assert
        assert_eq!(lab, vec!["k2 h1", "k2 h2", "k1 h1", "k1 h2", "k1 h3", "k1 h4"]);
        assert!(matches!(bad, Err(RecoError::ShapeMismatch { length: 5, .. })));
        assert_eq!(bottom.row(1).to_vec(), vec![3.0, 4.0]);
    }
}
